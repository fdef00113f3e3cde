//! Codec trait and the XML implementation.
//!
//! The engines never touch XML directly. They go through a [`Codec`], which
//! turns typed messages into payload text, parses text back into a chosen
//! type, and names a payload's logical type (its root element) so an inbound
//! frame can be routed to the right decoder before it is parsed.

use quick_xml::events::Event;
use quick_xml::Reader;
use serde::{de::DeserializeOwned, Serialize};

use crate::ProtocolError;

/// Declaration prefixed to every encoded payload.
pub const XML_DECLARATION: &str = r#"<?xml version="1.0" encoding="UTF-8"?>"#;

/// Converts typed messages to and from payload text.
///
/// `Send + Sync + 'static` so one codec can be shared by every task of an
/// engine.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a message into payload text.
    ///
    /// # Errors
    /// Returns [`ProtocolError::Encode`] if the value cannot be represented.
    fn encode<T: Serialize>(&self, value: &T) -> Result<String, ProtocolError>;

    /// Parses payload text into `T`.
    ///
    /// # Errors
    /// Returns [`ProtocolError::Decode`] if the text is malformed or does not
    /// match `T`.
    fn decode<T: DeserializeOwned>(&self, text: &str) -> Result<T, ProtocolError>;

    /// Returns the logical type name of a payload, without parsing all of it.
    fn type_name(&self, text: &str) -> Option<String>;
}

/// A [`Codec`] for the XML documents CSTA exchanges, built on `quick-xml`.
///
/// ```rust
/// use csta_protocol::{Codec, XmlCodec};
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Serialize, Deserialize, PartialEq, Debug)]
/// struct MonitorStop {
///     #[serde(rename = "monitorCrossRefID")]
///     cross_ref: String,
/// }
///
/// let codec = XmlCodec;
/// let text = codec.encode(&MonitorStop { cross_ref: "7".into() }).unwrap();
/// assert_eq!(codec.type_name(&text).as_deref(), Some("MonitorStop"));
/// let back: MonitorStop = codec.decode(&text).unwrap();
/// assert_eq!(back.cross_ref, "7");
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct XmlCodec;

impl Codec for XmlCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<String, ProtocolError> {
        let body = quick_xml::se::to_string(value)
            .map_err(|e| ProtocolError::Encode(e.to_string()))?;
        Ok(format!("{XML_DECLARATION}{body}"))
    }

    fn decode<T: DeserializeOwned>(&self, text: &str) -> Result<T, ProtocolError> {
        quick_xml::de::from_str(text).map_err(|e| ProtocolError::Decode(e.to_string()))
    }

    fn type_name(&self, text: &str) -> Option<String> {
        root_element_name(text)
    }
}

/// Local name of the first element in `text`, skipping the declaration,
/// comments and processing instructions. Namespace prefixes are dropped.
pub fn root_element_name(text: &str) -> Option<String> {
    let mut reader = Reader::from_str(text);
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
                let name = e.local_name();
                return Some(String::from_utf8_lossy(name.as_ref()).into_owned());
            }
            Ok(Event::Eof) | Err(_) => return None,
            Ok(_) => continue,
        }
    }
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;

    use super::*;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    #[serde(rename = "GetDeviceId")]
    struct Lookup {
        #[serde(rename = "@xmlns")]
        xmlns: String,
        #[serde(rename = "extension")]
        extension: String,
        #[serde(rename = "switchName", default, skip_serializing_if = "Option::is_none")]
        switch_name: Option<String>,
    }

    #[test]
    fn test_encode_prefixes_declaration_and_uses_struct_root() {
        let text = XmlCodec
            .encode(&Lookup {
                xmlns: "urn:x".into(),
                extension: "1233".into(),
                switch_name: None,
            })
            .unwrap();
        assert!(text.starts_with(XML_DECLARATION));
        assert!(text.contains(r#"<GetDeviceId xmlns="urn:x">"#));
        assert!(text.contains("<extension>1233</extension>"));
        assert!(!text.contains("switchName"));
    }

    #[test]
    fn test_decode_ignores_unknown_elements() {
        let text = concat!(
            r#"<?xml version="1.0"?><GetDeviceId xmlns="urn:x">"#,
            "<extension>1</extension><other>z</other><switchName>S1</switchName>",
            "</GetDeviceId>"
        );
        let lookup: Lookup = XmlCodec.decode(text).unwrap();
        assert_eq!(lookup.extension, "1");
        assert_eq!(lookup.switch_name.as_deref(), Some("S1"));
    }

    #[test]
    fn test_decode_missing_required_element_is_error() {
        let text = r#"<GetDeviceId xmlns="urn:x"><switchName>S1</switchName></GetDeviceId>"#;
        let result: Result<Lookup, _> = XmlCodec.decode(text);
        assert!(matches!(result, Err(ProtocolError::Decode(_))));
    }

    #[test]
    fn test_root_element_name_skips_prolog_and_prefix() {
        let text =
            "<?xml version=\"1.0\"?>\n<!-- note --><csta:MonitorStart xmlns:csta=\"urn:x\"/>";
        assert_eq!(root_element_name(text).as_deref(), Some("MonitorStart"));
    }

    #[test]
    fn test_root_element_name_of_non_xml_is_none() {
        assert_eq!(root_element_name("just text"), None);
        assert_eq!(root_element_name(""), None);
    }
}
