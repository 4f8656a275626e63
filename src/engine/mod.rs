//! Incremental XML engine
//!
//! `Engine<U>` is a push parser: input is fed in chunks of raw bytes and the
//! engine calls back into a table of plain function pointers as constructs
//! complete. Every callback receives the caller's context `&mut U`, passed in
//! again on each feed call.
//!
//! - Scanner: memchr-backed cursor over decoded text
//! - Encoding: encoding detection and decoders
//! - Input: raw byte queue, decoded text, scratch buffer
//! - Position: line/column tracking
//! - Tokenizer: token recognizers for prolog, content and DOCTYPE
//! - Entities: predefined and declared general entities
//! - Namespaces: prefix bindings and name expansion

mod encoding;
mod entities;
mod input;
mod namespaces;
mod position;
mod scanner;
mod tokenizer;

use std::borrow::Cow;
use std::sync::Arc;

use tracing::{debug, trace, warn};

use crate::error::XmlError;
use encoding::{declared_label, sniff, Decoder, Family, Label, Stop};
use entities::{predefined, AttributeNormalizer, EntityDef, EntityTable, ExpansionBudget};
use input::Input;
use namespaces::NamespaceContext;
use position::Locator;
use scanner::is_ncname;
use tokenizer::{
    parse_xml_decl, scan_content, scan_misc, split_lines, Doctype, Reference, ScanError, Scanned, StartTag,
    SubsetKind, Token,
};

pub use encoding::{ConvertFn, EncodingInfo};
pub use namespaces::{XMLNS_NAMESPACE, XML_NAMESPACE};

// ============================================================================
// Callback table
// ============================================================================

pub type StartElementFn<U> = fn(&mut U, &str, &[(&str, &str)]);
pub type EndElementFn<U> = fn(&mut U, &str);
pub type CharacterDataFn<U> = fn(&mut U, &str);
pub type ProcessingInstructionFn<U> = fn(&mut U, &str, &str);
pub type CommentFn<U> = fn(&mut U, &str);
pub type CdataSectionFn<U> = fn(&mut U);
pub type DefaultFn<U> = fn(&mut U, &str);
pub type UnknownEncodingFn<U> = fn(&mut U, &str) -> Option<EncodingInfo>;
pub type StartNamespaceDeclFn<U> = fn(&mut U, Option<&str>, Option<&str>);
pub type EndNamespaceDeclFn<U> = fn(&mut U, Option<&str>);
pub type XmlDeclFn<U> = fn(&mut U, &str, Option<&str>, Option<bool>);
pub type StartDoctypeDeclFn<U> = fn(&mut U, &str, Option<&str>, Option<&str>, bool);
pub type EndDoctypeDeclFn<U> = fn(&mut U);

/// Installed callbacks. `None` means the event is not reported, or falls
/// through to `default` where the engine has raw text for it.
pub struct Callbacks<U> {
    pub start_element: Option<StartElementFn<U>>,
    pub end_element: Option<EndElementFn<U>>,
    pub character_data: Option<CharacterDataFn<U>>,
    pub processing_instruction: Option<ProcessingInstructionFn<U>>,
    pub comment: Option<CommentFn<U>>,
    pub start_cdata_section: Option<CdataSectionFn<U>>,
    pub end_cdata_section: Option<CdataSectionFn<U>>,
    pub default: Option<DefaultFn<U>>,
    /// Expand internal entities even though `default` is installed
    pub default_expand: bool,
    pub unknown_encoding: Option<UnknownEncodingFn<U>>,
    pub start_namespace_decl: Option<StartNamespaceDeclFn<U>>,
    pub end_namespace_decl: Option<EndNamespaceDeclFn<U>>,
    pub xml_decl: Option<XmlDeclFn<U>>,
    pub start_doctype_decl: Option<StartDoctypeDeclFn<U>>,
    pub end_doctype_decl: Option<EndDoctypeDeclFn<U>>,
}

impl<U> Default for Callbacks<U> {
    fn default() -> Self {
        Callbacks {
            start_element: None,
            end_element: None,
            character_data: None,
            processing_instruction: None,
            comment: None,
            start_cdata_section: None,
            end_cdata_section: None,
            default: None,
            default_expand: false,
            unknown_encoding: None,
            start_namespace_decl: None,
            end_namespace_decl: None,
            xml_decl: None,
            start_doctype_decl: None,
            end_doctype_decl: None,
        }
    }
}

impl<U> Clone for Callbacks<U> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<U> Copy for Callbacks<U> {}

/// Callbacks bound to the caller's context for one feed call
struct Sink<'a, U> {
    cb: &'a Callbacks<U>,
    user: &'a mut U,
}

impl<U> Sink<'_, U> {
    #[inline]
    fn default(&mut self, raw: &str) {
        if let Some(f) = self.cb.default {
            f(self.user, raw);
        }
    }

    #[inline]
    fn text(&mut self, text: &str, raw: &str) {
        match self.cb.character_data {
            Some(f) => f(self.user, text),
            None => self.default(raw),
        }
    }

    fn comment(&mut self, body: &str, raw: &str) {
        match self.cb.comment {
            Some(f) => f(self.user, body),
            None => self.default(raw),
        }
    }

    fn pi(&mut self, target: &str, data: &str, raw: &str) {
        match self.cb.processing_instruction {
            Some(f) => f(self.user, target, data),
            None => self.default(raw),
        }
    }
}

// ============================================================================
// Document state
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Prolog,
    Content,
    Epilog,
}

#[derive(Debug)]
struct OpenElement {
    raw_name: String,
    name: String,
    /// Namespace bindings declared on this element
    bindings: usize,
}

#[derive(Debug)]
struct OpenEntity {
    name: String,
    /// Element depth when expansion started
    depth: usize,
}

/// Well-formedness state of the document being parsed
#[derive(Debug)]
struct Document {
    phase: Phase,
    /// No token has been dispatched yet
    at_start: bool,
    elements: Vec<OpenElement>,
    namespaces: Option<NamespaceContext>,
    entities: EntityTable,
    open_entities: Vec<OpenEntity>,
    has_doctype: bool,
    has_external_subset: bool,
    has_param_refs: bool,
    standalone: Option<bool>,
    budget: ExpansionBudget,
}

impl Document {
    fn new(namespace_separator: Option<char>) -> Self {
        Document {
            phase: Phase::Prolog,
            at_start: true,
            elements: Vec::new(),
            namespaces: namespace_separator.map(NamespaceContext::new),
            entities: EntityTable::new(),
            open_entities: Vec::new(),
            has_doctype: false,
            has_external_subset: false,
            has_param_refs: false,
            standalone: None,
            budget: ExpansionBudget::default(),
        }
    }

    /// Whether a reference to an undeclared entity is a well-formedness error
    fn undefined_is_error(&self) -> bool {
        !self.has_doctype || self.standalone == Some(true) || !(self.has_external_subset || self.has_param_refs)
    }

    fn dispatch<U>(&mut self, token: Token<'_>, raw: &str, sink: &mut Sink<'_, U>) -> Result<(), XmlError> {
        let result = match self.phase {
            Phase::Content => self.content(token, raw, sink),
            Phase::Prolog | Phase::Epilog => self.misc(token, raw, sink),
        };
        self.at_start = false;
        result
    }

    fn misc<U>(&mut self, token: Token<'_>, raw: &str, sink: &mut Sink<'_, U>) -> Result<(), XmlError> {
        let epilog = self.phase == Phase::Epilog;
        match token {
            Token::Whitespace(_) => sink.default(raw),
            Token::Comment(body) => sink.comment(body, raw),
            Token::Pi { target, data } => sink.pi(target, data, raw),
            Token::XmlDecl(body) if self.at_start => self.xml_decl(body, raw, sink)?,
            Token::XmlDecl(_) => return Err(XmlError::MisplacedXmlPi),
            Token::Doctype(doctype) if !epilog && !self.has_doctype => self.doctype(doctype, sink)?,
            Token::StartTag(tag) if !epilog => {
                self.phase = Phase::Content;
                self.start_tag(tag, raw, sink)?;
            }
            _ if epilog => return Err(XmlError::JunkAfterDocElement),
            _ => return Err(XmlError::Syntax),
        }
        Ok(())
    }

    fn content<U>(&mut self, token: Token<'_>, raw: &str, sink: &mut Sink<'_, U>) -> Result<(), XmlError> {
        match token {
            Token::Chars(text) => sink.text(text, raw),
            Token::Newline => sink.text("\n", raw),
            Token::Reference(Reference::Char(c)) => {
                let mut buf = [0u8; 4];
                sink.text(c.encode_utf8(&mut buf), raw);
            }
            Token::Reference(Reference::Entity(name)) => self.entity_ref(name, raw, sink)?,
            Token::StartTag(tag) => self.start_tag(tag, raw, sink)?,
            Token::EndTag(name) => self.end_tag(name, raw, sink)?,
            Token::Cdata(body) => self.cdata(body, sink),
            Token::Comment(body) => sink.comment(body, raw),
            Token::Pi { target, data } => sink.pi(target, data, raw),
            Token::XmlDecl(_) => return Err(XmlError::MisplacedXmlPi),
            Token::Doctype(_) | Token::Whitespace(_) | Token::Text(_) => return Err(XmlError::Syntax),
        }
        Ok(())
    }

    fn xml_decl<U>(&mut self, body: &str, raw: &str, sink: &mut Sink<'_, U>) -> Result<(), XmlError> {
        let decl = parse_xml_decl(body)?;
        self.standalone = decl.standalone;
        match sink.cb.xml_decl {
            Some(f) => f(sink.user, decl.version, decl.encoding, decl.standalone),
            None => sink.default(raw),
        }
        Ok(())
    }

    fn doctype<U>(&mut self, doctype: Doctype<'_>, sink: &mut Sink<'_, U>) -> Result<(), XmlError> {
        self.has_doctype = true;
        self.has_external_subset = doctype.system_id.is_some();
        match sink.cb.start_doctype_decl {
            Some(f) => f(
                sink.user,
                doctype.name,
                doctype.system_id,
                doctype.public_id,
                doctype.subset.is_some(),
            ),
            None => sink.default(doctype.header),
        }

        for item in doctype.subset.iter().flatten() {
            match &item.kind {
                SubsetKind::Comment(body) => sink.comment(body, item.raw),
                SubsetKind::Pi { target, data } => sink.pi(target, data, item.raw),
                SubsetKind::ParamRef(_) => {
                    self.has_param_refs = true;
                    sink.default(item.raw);
                }
                SubsetKind::Entity(decl) => {
                    // declarations after an unread parameter entity may depend on it
                    if !self.has_param_refs || self.standalone == Some(true) {
                        self.entities.declare(decl)?;
                    }
                    sink.default(item.raw);
                }
                SubsetKind::Whitespace | SubsetKind::Markup => sink.default(item.raw),
            }
        }

        match sink.cb.end_doctype_decl {
            Some(f) => f(sink.user),
            None => sink.default(doctype.trailer),
        }
        Ok(())
    }

    fn start_tag<U>(&mut self, tag: StartTag<'_>, raw: &str, sink: &mut Sink<'_, U>) -> Result<(), XmlError> {
        let attrs = &tag.attributes;
        for (i, attr) in attrs.iter().enumerate() {
            if attrs[..i].iter().any(|a| a.name == attr.name) {
                return Err(XmlError::DuplicateAttribute);
            }
        }

        let strict = self.undefined_is_error();
        let mut normalizer = AttributeNormalizer::new(&self.entities, strict, &mut self.budget);
        let mut values = Vec::with_capacity(attrs.len());
        for attr in attrs {
            let mut value = String::with_capacity(attr.value.len());
            normalizer.normalize(attr.value, &mut value)?;
            values.push(value);
        }

        let mut declared: Vec<(Option<&str>, String)> = Vec::new();
        let (name, attributes) = match self.namespaces.as_mut() {
            None => {
                let attributes: Vec<(Cow<'_, str>, String)> =
                    attrs.iter().map(|a| Cow::Borrowed(a.name)).zip(values).collect();
                (Cow::Borrowed(tag.name), attributes)
            }
            Some(ns) => {
                if !is_qname(tag.name) {
                    return Err(XmlError::InvalidToken);
                }
                let mut plain = Vec::with_capacity(attrs.len());
                for (attr, value) in attrs.iter().zip(values) {
                    if !is_qname(attr.name) {
                        return Err(XmlError::InvalidToken);
                    }
                    match NamespaceContext::declared_prefix(attr.name) {
                        Some(prefix) => {
                            ns.declare(prefix, &value)?;
                            declared.push((prefix, value));
                        }
                        None => plain.push((attr.name, value)),
                    }
                }

                let name = Cow::Owned(ns.expand_element(tag.name)?);
                let mut attributes = Vec::with_capacity(plain.len());
                for (attr_name, value) in plain {
                    let expanded = ns.expand_attribute(attr_name)?;
                    if attributes.iter().any(|(n, _): &(Cow<'_, str>, String)| *n == expanded) {
                        return Err(XmlError::DuplicateAttribute);
                    }
                    attributes.push((Cow::Owned(expanded), value));
                }
                (name, attributes)
            }
        };

        for (prefix, uri) in &declared {
            if let Some(f) = sink.cb.start_namespace_decl {
                f(sink.user, *prefix, (!uri.is_empty()).then_some(uri.as_str()));
            }
        }

        let start = sink.cb.start_element;
        let end = sink.cb.end_element;
        if let Some(f) = start {
            let pairs: Vec<(&str, &str)> = attributes.iter().map(|(n, v)| (&**n, v.as_str())).collect();
            f(sink.user, &name, &pairs);
        }

        if tag.empty {
            if let Some(f) = end {
                f(sink.user, &name);
            }
            if start.is_none() && end.is_none() {
                sink.default(raw);
            }
            self.end_scope(declared.len(), sink);
            if self.elements.is_empty() && self.open_entities.is_empty() {
                self.phase = Phase::Epilog;
            }
        } else {
            if start.is_none() {
                sink.default(raw);
            }
            self.elements.push(OpenElement {
                raw_name: tag.name.to_string(),
                name: name.into_owned(),
                bindings: declared.len(),
            });
        }
        Ok(())
    }

    fn end_tag<U>(&mut self, name: &str, raw: &str, sink: &mut Sink<'_, U>) -> Result<(), XmlError> {
        let floor = self.open_entities.last().map_or(0, |e| e.depth);
        match self.elements.last() {
            Some(_) if self.elements.len() <= floor => return Err(XmlError::AsyncEntity),
            Some(open) if open.raw_name == name => {}
            _ => return Err(XmlError::TagMismatch),
        }
        let Some(open) = self.elements.pop() else {
            return Err(XmlError::TagMismatch);
        };

        match sink.cb.end_element {
            Some(f) => f(sink.user, &open.name),
            None => sink.default(raw),
        }
        self.end_scope(open.bindings, sink);

        if self.elements.is_empty() && self.open_entities.is_empty() {
            self.phase = Phase::Epilog;
        }
        Ok(())
    }

    /// Pop the namespace bindings of a closed element
    fn end_scope<U>(&mut self, bindings: usize, sink: &mut Sink<'_, U>) {
        let Some(ns) = self.namespaces.as_mut() else {
            return;
        };
        for _ in 0..bindings {
            if let Some(prefix) = ns.pop() {
                if let Some(f) = sink.cb.end_namespace_decl {
                    f(sink.user, prefix.as_deref());
                }
            }
        }
    }

    fn cdata<U>(&mut self, body: &str, sink: &mut Sink<'_, U>) {
        match sink.cb.start_cdata_section {
            Some(f) => f(sink.user),
            None => sink.default("<![CDATA["),
        }
        for (text, raw) in split_lines(body) {
            sink.text(text, raw);
        }
        match sink.cb.end_cdata_section {
            Some(f) => f(sink.user),
            None => sink.default("]]>"),
        }
    }

    fn entity_ref<U>(&mut self, name: &str, raw: &str, sink: &mut Sink<'_, U>) -> Result<(), XmlError> {
        if let Some(text) = predefined(name) {
            sink.text(text, raw);
            return Ok(());
        }
        let text = match self.entities.get(name) {
            None if self.undefined_is_error() => return Err(XmlError::UndefinedEntity),
            None | Some(EntityDef::External) => {
                sink.default(raw);
                return Ok(());
            }
            Some(EntityDef::Unparsed) => return Err(XmlError::BinaryEntityRef),
            Some(EntityDef::Internal(text)) => Arc::clone(text),
        };
        if sink.cb.default.is_some() && !sink.cb.default_expand {
            sink.default(raw);
            return Ok(());
        }
        if self.open_entities.iter().any(|e| e.name == name) {
            return Err(XmlError::RecursiveEntityRef);
        }

        self.budget.charge(text.len())?;

        let depth = self.elements.len();
        self.open_entities.push(OpenEntity {
            name: name.to_string(),
            depth,
        });
        let result = self.expand(&text, sink);
        self.open_entities.pop();
        result?;

        if self.elements.len() != depth {
            return Err(XmlError::AsyncEntity);
        }
        Ok(())
    }

    /// Parse replacement text as content
    fn expand<U>(&mut self, text: &str, sink: &mut Sink<'_, U>) -> Result<(), XmlError> {
        let mut rest = text;
        while !rest.is_empty() {
            let Scanned { token, len } = scan_content(rest, true).map_err(|e| match e {
                ScanError::Partial(code) | ScanError::Invalid { code, .. } => code,
            })?;
            self.content(token, &rest[..len], sink)?;
            rest = &rest[len..];
        }
        Ok(())
    }
}

fn is_qname(name: &str) -> bool {
    match name.split_once(':') {
        Some((prefix, local)) => is_ncname(prefix) && is_ncname(local),
        None => true,
    }
}

// ============================================================================
// Engine
// ============================================================================

/// Lifecycle of an engine instance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParsingStatus {
    /// Created, nothing fed yet
    Initialized,
    Parsing,
    /// The final chunk was parsed successfully
    Finished,
    /// A feed call failed; the error code is sticky
    Failed,
}

/// View of the retained input around the current event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputContext<'a> {
    /// Retained decoded text
    pub buffer: &'a str,
    /// Start of the current event within `buffer`
    pub offset: usize,
    /// Length of the current event within `buffer`
    pub size: usize,
}

/// Incremental parser instance driving callbacks on a context `U`
pub struct Engine<U> {
    callbacks: Callbacks<U>,
    protocol_encoding: Option<String>,
    input: Input,
    doc: Document,
    locator: Locator,
    status: ParsingStatus,
    error: XmlError,
}

impl<U> Engine<U> {
    /// Create an engine.
    ///
    /// `encoding` overrides detection; `namespace_separator` turns on
    /// namespace processing.
    pub fn new(encoding: Option<&str>, namespace_separator: Option<char>) -> Result<Self, XmlError> {
        let engine = Engine {
            callbacks: Callbacks::default(),
            protocol_encoding: encoding.filter(|e| !e.is_empty()).map(str::to_string),
            input: Input::new()?,
            doc: Document::new(namespace_separator),
            locator: Locator::new(),
            status: ParsingStatus::Initialized,
            error: XmlError::None,
        };
        debug!(
            "engine created: encoding={:?}, namespace_separator={:?}",
            engine.protocol_encoding, namespace_separator
        );
        Ok(engine)
    }

    #[inline]
    pub fn callbacks(&self) -> &Callbacks<U> {
        &self.callbacks
    }

    #[inline]
    pub fn callbacks_mut(&mut self) -> &mut Callbacks<U> {
        &mut self.callbacks
    }

    #[inline]
    pub fn status(&self) -> ParsingStatus {
        self.status
    }

    /// Feed a chunk of the document
    pub fn parse(&mut self, data: &[u8], is_final: bool, user: &mut U) -> Result<(), XmlError> {
        self.check_open()?;
        trace!("parse chunk: {} bytes, final={}", data.len(), is_final);
        self.status = ParsingStatus::Parsing;

        let result = match self.input.push(data) {
            Ok(()) => {
                self.doc.budget.add_direct(data.len());
                self.run(is_final, user)
            }
            Err(code) => Err(code),
        };
        match result {
            Ok(()) => {
                if is_final {
                    self.status = ParsingStatus::Finished;
                }
                Ok(())
            }
            Err(code) => Err(self.fail(code)),
        }
    }

    /// Writable buffer for the next `parse_buffer` call
    pub fn get_buffer(&mut self, len: usize) -> Option<&mut [u8]> {
        match self.status {
            ParsingStatus::Finished | ParsingStatus::Failed => None,
            _ => self.input.get_buffer(len),
        }
    }

    /// Parse the first `len` bytes of the buffer from `get_buffer`
    pub fn parse_buffer(&mut self, len: usize, is_final: bool, user: &mut U) -> Result<(), XmlError> {
        self.check_open()?;
        let buffer = match self.input.take_buffer(len) {
            Ok(buffer) => buffer,
            Err(code) => return Err(self.fail(code)),
        };
        let result = self.parse(&buffer, is_final, user);
        self.input.restore_buffer(buffer);
        result
    }

    /// Error code of the last failure, `XmlError::None` if there was none
    #[inline]
    pub fn error_code(&self) -> XmlError {
        self.error
    }

    /// Source byte offset of the current event
    pub fn current_byte_index(&self) -> u64 {
        self.input.source_offset(self.locator.event_start())
    }

    pub fn current_line_number(&self) -> u64 {
        self.locator.line()
    }

    pub fn current_column_number(&self) -> u64 {
        self.locator.column()
    }

    /// Source length of the current event
    pub fn current_byte_count(&self) -> u64 {
        let start = self.input.source_offset(self.locator.event_start());
        let end = self.input.source_offset(self.locator.event_end());
        end.saturating_sub(start)
    }

    /// Retained input and the location of the current event in it
    pub fn input_context(&self) -> Option<InputContext<'_>> {
        let buffer = self.input.text();
        if buffer.is_empty() {
            return None;
        }
        let base = self.input.base();
        let offset = (self.locator.event_start().saturating_sub(base) as usize).min(buffer.len());
        let end = (self.locator.event_end().saturating_sub(base) as usize).clamp(offset, buffer.len());
        Some(InputContext {
            buffer,
            offset,
            size: end - offset,
        })
    }

    fn check_open(&mut self) -> Result<(), XmlError> {
        match self.status {
            ParsingStatus::Finished => {
                self.error = XmlError::Finished;
                Err(XmlError::Finished)
            }
            ParsingStatus::Failed => Err(self.error),
            ParsingStatus::Initialized | ParsingStatus::Parsing => Ok(()),
        }
    }

    fn fail(&mut self, code: XmlError) -> XmlError {
        self.status = ParsingStatus::Failed;
        self.error = code;
        debug!(
            "parse failed: {} at line {}, column {}",
            code,
            self.locator.line(),
            self.locator.column()
        );
        code
    }

    fn run(&mut self, is_final: bool, user: &mut U) -> Result<(), XmlError> {
        if !self.input.has_decoder() && !self.select_decoder(is_final, user)? {
            return Ok(());
        }
        self.input.decode(is_final)?;
        let text_final = is_final && self.input.fully_decoded();

        let Engine {
            callbacks,
            input,
            doc,
            locator,
            ..
        } = self;
        let mut sink = Sink { cb: callbacks, user };

        loop {
            let rest = input.rest();
            if rest.is_empty() {
                break;
            }
            let start = input.offset();
            let scanned = match doc.phase {
                Phase::Content => scan_content(rest, text_final),
                Phase::Prolog | Phase::Epilog => scan_misc(rest, text_final),
            };
            match scanned {
                Ok(Scanned { token, len }) => {
                    locator.set_event(start, start + len as u64, input.text(), input.base());
                    doc.dispatch(token, &rest[..len], &mut sink)?;
                    input.consume(len);
                }
                Err(ScanError::Partial(code)) if text_final => {
                    locator.set_event(start, start, input.text(), input.base());
                    return Err(code);
                }
                Err(ScanError::Partial(_)) => break,
                Err(ScanError::Invalid { code, offset }) => {
                    let at = start + offset as u64;
                    locator.set_event(at, at, input.text(), input.base());
                    return Err(code);
                }
            }
        }

        if let Some((stop, at)) = input.stop() {
            locator.set_event(at, at, input.text(), input.base());
            return Err(match stop {
                Stop::Invalid => XmlError::InvalidToken,
                Stop::Incomplete => XmlError::PartialChar,
            });
        }

        let end = input.offset();
        locator.set_event(end, end, input.text(), input.base());
        if is_final && doc.phase != Phase::Epilog {
            return Err(XmlError::NoElements);
        }
        input.compact(locator);
        Ok(())
    }

    /// Choose the decoder once enough input is available.
    /// Returns `Ok(false)` while waiting for more bytes.
    fn select_decoder(&mut self, is_final: bool, user: &mut U) -> Result<bool, XmlError> {
        let Some(sniffed) = sniff(self.input.raw(), is_final) else {
            return Ok(false);
        };
        let (label, from_document) = match &self.protocol_encoding {
            Some(name) => (Label::Named(name.clone()), false),
            None => {
                let after_bom = self.input.raw().get(sniffed.bom_len..).unwrap_or_default();
                (declared_label(after_bom, sniffed.family, is_final), true)
            }
        };

        let sixteen = sniffed.family != Family::EightBit;
        let decoder = match label {
            Label::Pending => return Ok(false),
            Label::Absent => Decoder::for_family(sniffed.family),
            Label::Named(name) => match Decoder::builtin(&name, sniffed.family) {
                Some(d) if from_document && d.is_sixteen_bit() != sixteen => {
                    return Err(XmlError::IncorrectEncoding);
                }
                // the detected byte order wins over the label
                Some(_) if from_document && sixteen => Decoder::for_family(sniffed.family),
                Some(d) => d,
                None if sixteen && from_document => return Err(XmlError::IncorrectEncoding),
                None => self.custom_decoder(&name, user)?,
            },
        };

        let skip = if decoder.is_sixteen_bit() == sixteen {
            sniffed.bom_len
        } else {
            0
        };
        debug!("selected decoder {} (skipping {} BOM bytes)", decoder.name(), skip);
        self.input.set_decoder(decoder, skip);
        Ok(true)
    }

    fn custom_decoder(&self, name: &str, user: &mut U) -> Result<Decoder, XmlError> {
        let Some(resolve) = self.callbacks.unknown_encoding else {
            warn!("unknown encoding {:?} and no resolver installed", name);
            return Err(XmlError::UnknownEncoding);
        };
        match resolve(user, name) {
            Some(info) if info.is_valid() => Ok(Decoder::Custom(info)),
            Some(_) => {
                warn!("encoding {:?} has an invalid byte map", name);
                Err(XmlError::UnknownEncoding)
            }
            None => {
                warn!("encoding {:?} refused by resolver", name);
                Err(XmlError::UnknownEncoding)
            }
        }
    }
}

impl<U> Drop for Engine<U> {
    fn drop(&mut self) {
        debug!("engine destroyed: status={:?}", self.status);
    }
}
