//! Negotiable protocol versions and their wire strings.

use std::fmt;
use std::str::FromStr;

use crate::ProtocolError;

const ECMA_323_PREFIX: &str = "http://www.ecma-international.org/standards/ecma-323/csta/";

/// A DMCC protocol version, as requested in `StartApplicationSession`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum ProtocolVersion {
    /// `3.0`
    V30,
    /// `ed2/priv1`
    V31,
    /// `ed3/priv1`
    V40,
    /// `ed3/priv2`
    V41,
    /// `ed3/priv3`
    V42,
    /// `ed3/priv4`
    V52,
    /// `ed3/priv5`
    V61,
    /// `ed3/priv6`
    V62,
    /// `ed3/priv7`
    #[default]
    V63,
    /// `ed3/priv8`
    V631,
    /// `ed3/priv9`
    V633,
    /// `ed3/privA`
    V70,
}

impl ProtocolVersion {
    /// Every version, oldest first.
    pub const ALL: [ProtocolVersion; 12] = [
        Self::V30,
        Self::V31,
        Self::V40,
        Self::V41,
        Self::V42,
        Self::V52,
        Self::V61,
        Self::V62,
        Self::V63,
        Self::V631,
        Self::V633,
        Self::V70,
    ];

    /// The short tag, e.g. `v63`.
    pub fn tag(self) -> &'static str {
        match self {
            Self::V30 => "v30",
            Self::V31 => "v31",
            Self::V40 => "v40",
            Self::V41 => "v41",
            Self::V42 => "v42",
            Self::V52 => "v52",
            Self::V61 => "v61",
            Self::V62 => "v62",
            Self::V63 => "v63",
            Self::V631 => "v631",
            Self::V633 => "v633",
            Self::V70 => "v70",
        }
    }

    /// The edition/private-data suffix below the ECMA-323 namespace.
    fn suffix(self) -> Option<&'static str> {
        match self {
            Self::V30 => None,
            Self::V31 => Some("ed2/priv1"),
            Self::V40 => Some("ed3/priv1"),
            Self::V41 => Some("ed3/priv2"),
            Self::V42 => Some("ed3/priv3"),
            Self::V52 => Some("ed3/priv4"),
            Self::V61 => Some("ed3/priv5"),
            Self::V62 => Some("ed3/priv6"),
            Self::V63 => Some("ed3/priv7"),
            Self::V631 => Some("ed3/priv8"),
            Self::V633 => Some("ed3/priv9"),
            Self::V70 => Some("ed3/privA"),
        }
    }

    /// The string sent in `protocolVersion` elements.
    pub fn wire_string(self) -> String {
        match self.suffix() {
            Some(suffix) => format!("{ECMA_323_PREFIX}{suffix}"),
            None => "3.0".to_string(),
        }
    }

    /// Looks a version up by its wire string.
    pub fn from_wire(text: &str) -> Option<Self> {
        let text = text.trim();
        if text == "3.0" {
            return Some(Self::V30);
        }
        let suffix = text.strip_prefix(ECMA_323_PREFIX)?;
        Self::ALL
            .into_iter()
            .find(|v| v.suffix() == Some(suffix))
    }
}

impl fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Parses either a tag (`v63`) or a wire string.
impl FromStr for ProtocolVersion {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|v| v.tag().eq_ignore_ascii_case(s.trim()))
            .or_else(|| Self::from_wire(s))
            .ok_or_else(|| ProtocolError::UnsupportedVersion(s.to_string()))
    }
}
