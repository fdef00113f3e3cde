//! The closed set of messages and the root-name decoder registry.
//!
//! An inbound payload is classified by its root element name; the
//! [`MessageRegistry`] maps that name to a decoder producing the matching
//! [`CstaMessage`] variant. Anything unknown, or known but undecodable,
//! becomes [`CstaMessage::Unmapped`] with the raw text preserved.

use std::collections::HashMap;

use serde::{Serialize, de::DeserializeOwned};

use crate::messages::*;
use crate::{Codec, ProtocolError, XmlCodec};

/// A message type with a fixed root element.
pub trait XmlMessage: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Root element name on the wire.
    const ROOT: &'static str;

    /// Wraps the message in its [`CstaMessage`] variant.
    fn into_message(self) -> CstaMessage;

    /// Borrows the message back out of its variant.
    fn from_message(message: &CstaMessage) -> Option<&Self>;
}

/// A payload whose type is not modeled, or that failed to decode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnmappedData {
    /// Root element name, if the text was XML at all.
    pub root: Option<String>,
    /// The raw payload (or a description of what went wrong).
    pub data: String,
}

type DecodeFn<C> = fn(&C, &str) -> Result<CstaMessage, ProtocolError>;

fn decode_as<C: Codec, T: XmlMessage>(codec: &C, text: &str) -> Result<CstaMessage, ProtocolError> {
    codec.decode::<T>(text).map(T::into_message)
}

macro_rules! csta_messages {
    ($($variant:ident => $root:literal),* $(,)?) => {
        /// Every message this crate understands, plus [`CstaMessage::Unmapped`].
        #[derive(Debug, Clone, PartialEq, Eq)]
        pub enum CstaMessage {
            $(
                #[doc = concat!("`", $root, "`")]
                $variant($variant),
            )*
            /// Unrecognized or undecodable payload.
            Unmapped(UnmappedData),
        }

        impl CstaMessage {
            /// The logical type name: the root element for known variants.
            pub fn type_name(&self) -> &str {
                match self {
                    $(Self::$variant(_) => $root,)*
                    Self::Unmapped(unmapped) => unmapped.root.as_deref().unwrap_or("UnmappedData"),
                }
            }

            /// Serializes the message. `Unmapped` yields its raw text.
            pub fn encode<C: Codec>(&self, codec: &C) -> Result<String, ProtocolError> {
                match self {
                    $(Self::$variant(message) => codec.encode(message),)*
                    Self::Unmapped(unmapped) => Ok(unmapped.data.clone()),
                }
            }
        }

        $(
            impl XmlMessage for $variant {
                const ROOT: &'static str = $root;

                fn into_message(self) -> CstaMessage {
                    CstaMessage::$variant(self)
                }

                fn from_message(message: &CstaMessage) -> Option<&Self> {
                    match message {
                        CstaMessage::$variant(inner) => Some(inner),
                        _ => None,
                    }
                }
            }

            impl From<$variant> for CstaMessage {
                fn from(message: $variant) -> Self {
                    CstaMessage::$variant(message)
                }
            }
        )*

        impl<C: Codec> MessageRegistry<C> {
            /// A registry that knows every [`CstaMessage`] variant.
            pub fn new(codec: C) -> Self {
                let mut registry = Self::empty(codec);
                $(registry.register::<$variant>();)*
                registry
            }
        }
    };
}

csta_messages! {
    StartApplicationSession => "StartApplicationSession",
    StartApplicationSessionPosResponse => "StartApplicationSessionPosResponse",
    StartApplicationSessionNegResponse => "StartApplicationSessionNegResponse",
    StopApplicationSession => "StopApplicationSession",
    StopApplicationSessionPosResponse => "StopApplicationSessionPosResponse",
    ResetApplicationSessionTimer => "ResetApplicationSessionTimer",
    ResetApplicationSessionTimerPosResponse => "ResetApplicationSessionTimerPosResponse",
    GetMonitorList => "GetMonitorList",
    GetMonitorListResponse => "GetMonitorListResponse",
    GetMonitorListEvent => "GetMonitorListEvent",
    SystemRegister => "SystemRegister",
    SystemRegisterResponse => "SystemRegisterResponse",
    SystemRegisterCancel => "SystemRegisterCancel",
    SystemRegisterCancelResponse => "SystemRegisterCancelResponse",
    RequestSystemStatus => "RequestSystemStatus",
    RequestSystemStatusResponse => "RequestSystemStatusResponse",
    GetDeviceId => "GetDeviceId",
    GetDeviceIdResponse => "GetDeviceIdResponse",
    GetThirdPartyDeviceId => "GetThirdPartyDeviceId",
    GetThirdPartyDeviceIdResponse => "GetThirdPartyDeviceIdResponse",
    ReleaseDeviceId => "ReleaseDeviceId",
    ReleaseDeviceIdResponse => "ReleaseDeviceIdResponse",
    MonitorStart => "MonitorStart",
    MonitorStartResponse => "MonitorStartResponse",
    MonitorStop => "MonitorStop",
    MonitorStopResponse => "MonitorStopResponse",
    MakeCall => "MakeCall",
    MakeCallResponse => "MakeCallResponse",
    AnswerCall => "AnswerCall",
    AnswerCallResponse => "AnswerCallResponse",
    RouteRegister => "RouteRegister",
    RouteRegisterResponse => "RouteRegisterResponse",
    RouteRegisterCancel => "RouteRegisterCancel",
    RouteRegisterCancelResponse => "RouteRegisterCancelResponse",
    OriginatedEvent => "OriginatedEvent",
    DeliveredEvent => "DeliveredEvent",
    EstablishedEvent => "EstablishedEvent",
    ConnectionClearedEvent => "ConnectionClearedEvent",
    CallClearedEvent => "CallClearedEvent",
    FailedEvent => "FailedEvent",
    TransferedEvent => "TransferedEvent",
    ConferencedEvent => "ConferencedEvent",
    UniversalFailure => "CSTAErrorCode",
}

impl CstaMessage {
    /// Returns the failure if this is a `CSTAErrorCode`.
    pub fn as_failure(&self) -> Option<&UniversalFailure> {
        UniversalFailure::from_message(self)
    }

    /// Whether this variant is [`CstaMessage::Unmapped`].
    pub fn is_unmapped(&self) -> bool {
        matches!(self, Self::Unmapped(_))
    }
}

/// Maps root element names to decoders.
pub struct MessageRegistry<C: Codec = XmlCodec> {
    codec: C,
    decoders: HashMap<&'static str, DecodeFn<C>>,
}

impl<C: Codec> MessageRegistry<C> {
    /// A registry with no decoders; everything decodes as `Unmapped`.
    pub fn empty(codec: C) -> Self {
        Self {
            codec,
            decoders: HashMap::new(),
        }
    }

    /// Adds (or replaces) the decoder for `T::ROOT`.
    pub fn register<T: XmlMessage>(&mut self) {
        self.decoders.insert(T::ROOT, decode_as::<C, T>);
    }

    /// Whether a decoder exists for `root`.
    pub fn knows(&self, root: &str) -> bool {
        self.decoders.contains_key(root)
    }

    /// The codec used for both directions.
    pub fn codec(&self) -> &C {
        &self.codec
    }

    /// Classifies and decodes a payload. Never fails: unknown roots and
    /// decode errors yield [`CstaMessage::Unmapped`] carrying the raw text.
    pub fn decode(&self, text: &str) -> CstaMessage {
        let root = self.codec.type_name(text);
        let decoder = root.as_deref().and_then(|name| self.decoders.get(name));

        match decoder {
            Some(decode) => match decode(&self.codec, text) {
                Ok(message) => message,
                Err(e) => {
                    tracing::debug!(
                        root = ?root,
                        error = %e,
                        "payload did not match its declared type"
                    );
                    CstaMessage::Unmapped(UnmappedData {
                        root,
                        data: text.to_string(),
                    })
                }
            },
            None => CstaMessage::Unmapped(UnmappedData {
                root,
                data: text.to_string(),
            }),
        }
    }

    /// Serializes a message with this registry's codec.
    pub fn encode(&self, message: &CstaMessage) -> Result<String, ProtocolError> {
        message.encode(&self.codec)
    }
}

impl<C: Codec + Default> Default for MessageRegistry<C> {
    fn default() -> Self {
        Self::new(C::default())
    }
}
