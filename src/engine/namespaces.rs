//! Namespace processing
//!
//! Active when the parser is created with a namespace separator. Tracks the
//! in-scope prefix bindings and expands qualified names to
//! `uri + separator + local`.

use crate::error::XmlError;

/// Namespace bound to the `xml` prefix
pub const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";
/// Namespace of `xmlns` attributes; may not be bound
pub const XMLNS_NAMESPACE: &str = "http://www.w3.org/2000/xmlns/";

#[derive(Debug, Clone, PartialEq, Eq)]
struct Binding {
    /// `None` is the default namespace
    prefix: Option<String>,
    /// `None` undeclares the default namespace
    uri: Option<String>,
}

/// Stack of in-scope namespace bindings
#[derive(Debug)]
pub struct NamespaceContext {
    separator: char,
    bindings: Vec<Binding>,
}

impl NamespaceContext {
    pub fn new(separator: char) -> Self {
        NamespaceContext {
            separator,
            bindings: Vec::new(),
        }
    }

    /// Prefix declared by an attribute name, if it is a namespace declaration.
    ///
    /// `Some(None)` for `xmlns`, `Some(Some(p))` for `xmlns:p`.
    pub fn declared_prefix(attr_name: &str) -> Option<Option<&str>> {
        if attr_name == "xmlns" {
            Some(None)
        } else {
            attr_name.strip_prefix("xmlns:").map(Some)
        }
    }

    /// Validate and push a declaration; returns the URI to report.
    pub fn declare<'v>(&mut self, prefix: Option<&str>, value: &'v str) -> Result<Option<&'v str>, XmlError> {
        match prefix {
            Some("xmlns") => return Err(XmlError::ReservedPrefixXmlns),
            Some("xml") if value != XML_NAMESPACE => return Err(XmlError::ReservedPrefixXml),
            Some("xml") => {}
            _ if value == XML_NAMESPACE => return Err(XmlError::ReservedNamespaceUri),
            Some(_) if value.is_empty() => return Err(XmlError::UndeclaringPrefix),
            _ => {}
        }
        if value == XMLNS_NAMESPACE {
            return Err(XmlError::ReservedNamespaceUri);
        }
        let uri = (!value.is_empty()).then_some(value);
        self.bindings.push(Binding {
            prefix: prefix.map(str::to_string),
            uri: uri.map(str::to_string),
        });
        Ok(uri)
    }

    /// Drop the innermost binding, returning its prefix
    pub fn pop(&mut self) -> Option<Option<String>> {
        self.bindings.pop().map(|b| b.prefix)
    }

    /// URI bound to a prefix (`None` = default namespace)
    pub fn lookup(&self, prefix: Option<&str>) -> Option<&str> {
        if prefix == Some("xml") {
            return Some(XML_NAMESPACE);
        }
        self.bindings
            .iter()
            .rev()
            .find(|b| b.prefix.as_deref() == prefix)
            .and_then(|b| b.uri.as_deref())
    }

    /// Expand an element name; unprefixed names take the default namespace
    pub fn expand_element(&self, qname: &str) -> Result<String, XmlError> {
        self.expand(qname, true)
    }

    /// Expand an attribute name; unprefixed names stay as they are
    pub fn expand_attribute(&self, qname: &str) -> Result<String, XmlError> {
        self.expand(qname, false)
    }

    fn expand(&self, qname: &str, use_default: bool) -> Result<String, XmlError> {
        let (prefix, local) = match qname.split_once(':') {
            Some((prefix, local)) => (Some(prefix), local),
            None => (None, qname),
        };
        if prefix.is_none() && !use_default {
            return Ok(qname.to_string());
        }
        match (self.lookup(prefix), prefix) {
            (Some(uri), _) => {
                let mut expanded = String::with_capacity(uri.len() + 1 + local.len());
                expanded.push_str(uri);
                expanded.push(self.separator);
                expanded.push_str(local);
                Ok(expanded)
            }
            (None, None) => Ok(qname.to_string()),
            (None, Some(_)) => Err(XmlError::UnboundPrefix),
        }
    }
}
