//! Invoke-id correlation: the 4-digit field every frame carries.
//!
//! Requests carry an id issued by [`InvokeIdService`]; the peer echoes it in
//! the matching response. Both ends render ids the same way, as four
//! zero-padded ASCII digits, so a response always has the same header
//! layout as the request it answers.

use std::fmt;
use std::sync::atomic::{AtomicU16, Ordering};

use crate::InvokeIdError;

/// Largest id that fits the 4-digit wire field.
pub const MAX_INVOKE_ID: u16 = 9999;

/// A correlation id in `0..=9999`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InvokeId(u16);

impl InvokeId {
    /// Creates an id, returning `None` if it does not fit in four digits.
    pub fn new(value: u16) -> Option<Self> {
        (value <= MAX_INVOKE_ID).then_some(Self(value))
    }

    /// Returns the numeric value.
    pub fn get(self) -> u16 {
        self.0
    }

    /// Renders the id as its 4-byte, zero-padded wire form.
    pub fn to_wire(self) -> [u8; 4] {
        let v = self.0;
        [
            b'0' + (v / 1000) as u8,
            b'0' + (v / 100 % 10) as u8,
            b'0' + (v / 10 % 10) as u8,
            b'0' + (v % 10) as u8,
        ]
    }

    /// Parses a wire field. Surrounding spaces are tolerated so peers that
    /// pad with blanks instead of zeros still correlate.
    pub fn from_wire(raw: &[u8; 4]) -> Option<Self> {
        let text = std::str::from_utf8(raw).ok()?.trim_matches(' ');
        if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        text.parse::<u16>().ok().and_then(Self::new)
    }
}

impl fmt::Display for InvokeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}", self.0)
    }
}

/// The invoke-id field of a received frame.
///
/// Unparsable fields are kept verbatim so a reply can echo them back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvokeField {
    /// A well-formed 4-digit id.
    Known(InvokeId),
    /// Raw bytes that are not a decimal id.
    Unknown([u8; 4]),
}

impl InvokeField {
    /// Classifies raw header bytes.
    pub fn from_wire(raw: [u8; 4]) -> Self {
        match InvokeId::from_wire(&raw) {
            Some(id) => Self::Known(id),
            None => Self::Unknown(raw),
        }
    }

    /// Returns the 4 bytes to put on the wire.
    pub fn to_wire(self) -> [u8; 4] {
        match self {
            Self::Known(id) => id.to_wire(),
            Self::Unknown(raw) => raw,
        }
    }

    /// Returns the parsed id, if any.
    pub fn id(self) -> Option<InvokeId> {
        match self {
            Self::Known(id) => Some(id),
            Self::Unknown(_) => None,
        }
    }
}

impl From<InvokeId> for InvokeField {
    fn from(id: InvokeId) -> Self {
        Self::Known(id)
    }
}

impl fmt::Display for InvokeField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Known(id) => id.fmt(f),
            Self::Unknown(_) => f.write_str("unknown"),
        }
    }
}

/// What [`InvokeIdService::next`] does after issuing [`MAX_INVOKE_ID`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverflowPolicy {
    /// Refuse further ids with [`InvokeIdError::Exhausted`].
    #[default]
    Fail,
    /// Start again at 1. Only safe when the caller retires ids promptly.
    Wrap,
}

/// Issues increasing invoke ids, starting at 1.
///
/// One service is owned per engine (or shared through an `Arc` when several
/// engines should draw from one sequence). Safe to call concurrently.
#[derive(Debug)]
pub struct InvokeIdService {
    last: AtomicU16,
    policy: OverflowPolicy,
}

impl InvokeIdService {
    /// Creates a service whose first id will be `0001`.
    pub fn new(policy: OverflowPolicy) -> Self {
        Self::starting_after(0, policy)
    }

    /// Creates a service that continues after `last`.
    pub fn starting_after(last: u16, policy: OverflowPolicy) -> Self {
        Self {
            last: AtomicU16::new(last.min(MAX_INVOKE_ID)),
            policy,
        }
    }

    /// Returns the overflow policy.
    pub fn policy(&self) -> OverflowPolicy {
        self.policy
    }

    /// Issues the next id.
    ///
    /// # Errors
    /// Returns [`InvokeIdError::Exhausted`] once `9999` has been issued
    /// under [`OverflowPolicy::Fail`].
    pub fn next(&self) -> Result<InvokeId, InvokeIdError> {
        let policy = self.policy;
        let advance = |last: u16| {
            if last < MAX_INVOKE_ID {
                Some(last + 1)
            } else if policy == OverflowPolicy::Wrap {
                Some(1)
            } else {
                None
            }
        };

        let updated = self
            .last
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, advance);
        match updated {
            Ok(prev) => {
                let id = advance(prev).unwrap_or(1);
                if id == 1 && prev == MAX_INVOKE_ID {
                    tracing::debug!("invoke id sequence wrapped");
                }
                Ok(InvokeId(id))
            }
            Err(last) => Err(InvokeIdError::Exhausted { last }),
        }
    }
}

impl Default for InvokeIdService {
    fn default() -> Self {
        Self::new(OverflowPolicy::default())
    }
}
