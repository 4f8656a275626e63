//! Event Types
//!
//! One owned variant per handler method.

use crate::config::EventKind;

/// A recorded handler call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum XmlEvent {
    /// `on_post_create` ran
    PostCreate,

    StartElement {
        name: String,
        /// `(name, value)` pairs in document order
        attributes: Vec<(String, String)>,
    },

    EndElement(String),

    CharacterData(String),

    ProcessingInstruction {
        target: String,
        data: String,
    },

    Comment(String),

    StartCdataSection,

    EndCdataSection,

    /// Raw text passed to the default handler
    Default(String),

    /// An encoding name the collector was asked to resolve
    UnknownEncoding(String),

    StartNamespaceDecl {
        prefix: Option<String>,
        uri: Option<String>,
    },

    EndNamespaceDecl(Option<String>),

    XmlDecl {
        version: String,
        encoding: Option<String>,
        standalone: Option<bool>,
    },

    StartDoctypeDecl {
        name: String,
        system_id: Option<String>,
        public_id: Option<String>,
        has_internal_subset: bool,
    },

    EndDoctypeDecl,
}

impl XmlEvent {
    /// Start element event from borrowed parts
    pub fn start(name: &str, attributes: &[(&str, &str)]) -> Self {
        XmlEvent::StartElement {
            name: name.to_string(),
            attributes: attributes
                .iter()
                .map(|&(n, v)| (n.to_string(), v.to_string()))
                .collect(),
        }
    }

    pub fn end(name: &str) -> Self {
        XmlEvent::EndElement(name.to_string())
    }

    pub fn text(text: &str) -> Self {
        XmlEvent::CharacterData(text.to_string())
    }

    /// The event kind that produced this event; `None` for `PostCreate`
    pub fn kind(&self) -> Option<EventKind> {
        let kind = match self {
            XmlEvent::PostCreate => return None,
            XmlEvent::StartElement { .. } => EventKind::StartElement,
            XmlEvent::EndElement(_) => EventKind::EndElement,
            XmlEvent::CharacterData(_) => EventKind::CharacterData,
            XmlEvent::ProcessingInstruction { .. } => EventKind::ProcessingInstruction,
            XmlEvent::Comment(_) => EventKind::Comment,
            XmlEvent::StartCdataSection => EventKind::StartCdataSection,
            XmlEvent::EndCdataSection => EventKind::EndCdataSection,
            XmlEvent::Default(_) => EventKind::Default,
            XmlEvent::UnknownEncoding(_) => EventKind::UnknownEncoding,
            XmlEvent::StartNamespaceDecl { .. } => EventKind::StartNamespaceDecl,
            XmlEvent::EndNamespaceDecl(_) => EventKind::EndNamespaceDecl,
            XmlEvent::XmlDecl { .. } => EventKind::XmlDecl,
            XmlEvent::StartDoctypeDecl { .. } => EventKind::StartDoctypeDecl,
            XmlEvent::EndDoctypeDecl => EventKind::EndDoctypeDecl,
        };
        Some(kind)
    }

    /// Check if this is a start or end element event
    #[inline]
    pub fn is_element(&self) -> bool {
        matches!(self, XmlEvent::StartElement { .. } | XmlEvent::EndElement(_))
    }

    /// Get the element name if this is a start or end element
    pub fn element_name(&self) -> Option<&str> {
        match self {
            XmlEvent::StartElement { name, .. } | XmlEvent::EndElement(name) => Some(name),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constructors() {
        assert_eq!(
            XmlEvent::start("a", &[("x", "1")]),
            XmlEvent::StartElement {
                name: "a".to_string(),
                attributes: vec![("x".to_string(), "1".to_string())],
            }
        );
        assert_eq!(XmlEvent::end("a").element_name(), Some("a"));
        assert!(!XmlEvent::text("a").is_element());
    }

    #[test]
    fn test_kinds() {
        assert_eq!(XmlEvent::PostCreate.kind(), None);
        assert_eq!(XmlEvent::text("t").kind(), Some(EventKind::CharacterData));
        assert_eq!(XmlEvent::EndNamespaceDecl(None).kind(), Some(EventKind::EndNamespaceDecl));
    }
}
