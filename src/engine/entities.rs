//! XML Entity Handling
//!
//! - Predefined entities: &lt; &gt; &amp; &quot; &apos;
//! - General entities declared in the internal DTD subset
//! - Attribute value normalization, with recursive expansion of internal
//!   entities
//!
//! Replacement text is stored with character references already expanded,
//! so it can be scanned again as content.

use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::Arc;

use memchr::memchr;

use super::tokenizer::{scan_reference, EntityDecl, Reference, ScanError, Scanned, Token};
use crate::error::XmlError;

/// Replacement text of a predefined entity
#[inline]
pub fn predefined(name: &str) -> Option<&'static str> {
    match name {
        "lt" => Some("<"),
        "gt" => Some(">"),
        "amp" => Some("&"),
        "quot" => Some("\""),
        "apos" => Some("'"),
        _ => None,
    }
}

/// A declared general entity
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntityDef {
    /// Replacement text of an internal entity
    Internal(Arc<str>),
    /// External parsed entity; its content is never fetched
    External,
    /// Unparsed entity (NDATA)
    Unparsed,
}

/// Entity expansion output that arms the amplification check
const AMPLIFICATION_THRESHOLD: u64 = 8 * 1024 * 1024;
/// Allowed ratio of expanded entity text to direct input
const MAX_AMPLIFICATION: u64 = 100;

/// Running totals of direct input and entity replacement text.
///
/// Content and attribute values charge the same budget.
#[derive(Debug, Default, Clone, Copy)]
pub struct ExpansionBudget {
    direct: u64,
    expanded: u64,
}

impl ExpansionBudget {
    /// Count bytes fed by the caller
    #[inline]
    pub fn add_direct(&mut self, len: usize) {
        self.direct += len as u64;
    }

    /// Count one expansion of replacement text
    pub fn charge(&mut self, len: usize) -> Result<(), XmlError> {
        self.expanded += len as u64;
        if self.expanded > AMPLIFICATION_THRESHOLD
            && self.expanded + self.direct > MAX_AMPLIFICATION * self.direct.max(1)
        {
            return Err(XmlError::AmplificationLimitBreach);
        }
        Ok(())
    }
}

/// General entities declared by the document
#[derive(Debug, Default)]
pub struct EntityTable {
    general: HashMap<String, EntityDef>,
}

impl EntityTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a declaration. The first declaration of a name is binding;
    /// later ones and parameter entities are ignored.
    pub fn declare(&mut self, decl: &EntityDecl<'_>) -> Result<(), XmlError> {
        if decl.parameter || self.general.contains_key(decl.name) {
            return Ok(());
        }
        let def = match (decl.value, decl.notation) {
            (Some(value), _) => EntityDef::Internal(Arc::from(expand_char_refs(value)?)),
            (None, Some(_)) => EntityDef::Unparsed,
            (None, None) => EntityDef::External,
        };
        self.general.insert(decl.name.to_string(), def);
        Ok(())
    }

    #[inline]
    pub fn get(&self, name: &str) -> Option<&EntityDef> {
        self.general.get(name)
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.general.len()
    }
}

/// Expand character references in an entity literal.
///
/// General entity references are left in place; they are expanded when the
/// replacement text is used.
pub fn expand_char_refs(literal: &str) -> Result<Cow<'_, str>, XmlError> {
    if memchr(b'&', literal.as_bytes()).is_none() {
        return Ok(Cow::Borrowed(literal));
    }
    let mut out = String::with_capacity(literal.len());
    let mut rest = literal;
    while let Some(amp) = memchr(b'&', rest.as_bytes()) {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];
        let Scanned { token, len } = scan_reference(rest).map_err(|e| match e {
            ScanError::Invalid {
                code: XmlError::BadCharRef,
                ..
            } => XmlError::BadCharRef,
            _ => XmlError::Syntax,
        })?;
        match token {
            Token::Reference(Reference::Char(c)) => out.push(c),
            _ => out.push_str(&rest[..len]),
        }
        rest = &rest[len..];
    }
    out.push_str(rest);
    Ok(Cow::Owned(out))
}

/// Normalizes attribute values against an entity table
pub struct AttributeNormalizer<'t> {
    entities: &'t EntityTable,
    /// Whether references to undeclared entities are errors
    strict: bool,
    budget: &'t mut ExpansionBudget,
    open: Vec<String>,
}

impl<'t> AttributeNormalizer<'t> {
    pub fn new(entities: &'t EntityTable, strict: bool, budget: &'t mut ExpansionBudget) -> Self {
        AttributeNormalizer {
            entities,
            strict,
            budget,
            open: Vec::new(),
        }
    }

    /// Normalize a raw attribute value onto `out`.
    ///
    /// References are replaced, and tab, newline, carriage return and CR LF
    /// each become one space. Characters produced by character references
    /// are kept as they are.
    pub fn normalize(&mut self, raw: &str, out: &mut String) -> Result<(), XmlError> {
        let bytes = raw.as_bytes();
        let mut i = 0;
        let mut run_start = 0;
        while i < bytes.len() {
            match bytes[i] {
                b'&' => {
                    out.push_str(&raw[run_start..i]);
                    let Scanned { token, len } =
                        scan_reference(&raw[i..]).map_err(|_| XmlError::InvalidToken)?;
                    match token {
                        Token::Reference(Reference::Char(c)) => out.push(c),
                        Token::Reference(Reference::Entity(name)) => self.entity(name, out)?,
                        _ => return Err(XmlError::InvalidToken),
                    }
                    i += len;
                    run_start = i;
                }
                b'\t' | b'\n' | b'\r' => {
                    out.push_str(&raw[run_start..i]);
                    out.push(' ');
                    i += if bytes[i] == b'\r' && bytes.get(i + 1) == Some(&b'\n') { 2 } else { 1 };
                    run_start = i;
                }
                _ => i += 1,
            }
        }
        out.push_str(&raw[run_start..]);
        Ok(())
    }

    fn entity(&mut self, name: &str, out: &mut String) -> Result<(), XmlError> {
        if let Some(text) = predefined(name) {
            out.push_str(text);
            return Ok(());
        }
        let text = match self.entities.get(name) {
            None if self.strict => return Err(XmlError::UndefinedEntity),
            None => return Ok(()),
            Some(EntityDef::External) => return Err(XmlError::AttributeExternalEntityRef),
            Some(EntityDef::Unparsed) => return Err(XmlError::BinaryEntityRef),
            Some(EntityDef::Internal(text)) => Arc::clone(text),
        };
        if self.open.iter().any(|open| open == name) {
            return Err(XmlError::RecursiveEntityRef);
        }
        if memchr(b'<', text.as_bytes()).is_some() {
            return Err(XmlError::InvalidToken);
        }
        self.budget.charge(text.len())?;
        self.open.push(name.to_string());
        let result = self.normalize(&text, out);
        self.open.pop();
        result
    }
}
