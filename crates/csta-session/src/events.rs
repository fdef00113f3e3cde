//! What subscribers receive, and how a wait ends.

use std::any::Any;
use std::sync::Arc;

use csta_protocol::{CstaMessage, UniversalFailure, XmlMessage};
use csta_transport::InvokeId;

/// Opaque caller data attached to a request and handed back on its reply.
pub type UserContext = Arc<dyn Any + Send + Sync>;

/// One inbound message, as published to every subscriber.
#[derive(Debug, Clone)]
pub struct CstaEvent {
    /// `None` when the frame carried a non-numeric invoke field.
    pub invoke_id: Option<InvokeId>,
    pub message: CstaMessage,
    /// Context stored by the request this message answers, if any.
    pub context: Option<UserContext>,
}

impl CstaEvent {
    /// The attached context, if it is a `T`.
    pub fn context_as<T: Any>(&self) -> Option<&T> {
        self.context.as_deref()?.downcast_ref::<T>()
    }

    /// The message as a `T`, if it is one.
    pub fn message_as<T: XmlMessage>(&self) -> Option<&T> {
        T::from_message(&self.message)
    }
}

/// How a wait for a correlated reply ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WaitOutcome<T> {
    /// The expected reply arrived.
    Matched(T),
    /// The switch answered with a universal failure.
    Failed(UniversalFailure),
    /// Something else arrived under the same invoke id.
    Unexpected(CstaMessage),
    TimedOut,
    /// The event loop ended before a reply arrived.
    Disconnected,
}

impl<T: XmlMessage> WaitOutcome<T> {
    pub(crate) fn from_message(message: &CstaMessage) -> Self {
        if let Some(value) = T::from_message(message) {
            return Self::Matched(value.clone());
        }
        match message.as_failure() {
            Some(failure) => Self::Failed(failure.clone()),
            None => Self::Unexpected(message.clone()),
        }
    }
}

impl<T> WaitOutcome<T> {
    pub fn is_matched(&self) -> bool {
        matches!(self, Self::Matched(_))
    }

    /// The reply, discarding every other outcome.
    pub fn matched(self) -> Option<T> {
        match self {
            Self::Matched(value) => Some(value),
            _ => None,
        }
    }

    /// The failure, if the switch sent one.
    pub fn failure(&self) -> Option<&UniversalFailure> {
        match self {
            Self::Failed(failure) => Some(failure),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use csta_protocol::{
        CSTA_ED3_NS, MonitorStopResponse, OperationError, SystemRegisterResponse,
    };

    #[test]
    fn test_wait_outcome_classifies_failure_and_unexpected() {
        let failure = UniversalFailure::operation(CSTA_ED3_NS, OperationError::Generic);
        let outcome = WaitOutcome::<SystemRegisterResponse>::from_message(&failure.clone().into());
        assert_eq!(outcome.failure(), Some(&failure));

        let other: CstaMessage = MonitorStopResponse { xmlns: String::new() }.into();
        let outcome = WaitOutcome::<SystemRegisterResponse>::from_message(&other);
        assert_eq!(outcome, WaitOutcome::Unexpected(other));
        assert!(!outcome.is_matched());
    }

    #[test]
    fn test_event_context_downcasts_to_stored_type() {
        let event = CstaEvent {
            invoke_id: InvokeId::new(3),
            message: MonitorStopResponse { xmlns: String::new() }.into(),
            context: Some(Arc::new("agent-7".to_string())),
        };
        assert_eq!(event.context_as::<String>().map(String::as_str), Some("agent-7"));
        assert!(event.context_as::<u32>().is_none());
        assert!(event.message_as::<MonitorStopResponse>().is_some());
    }
}
