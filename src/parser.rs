//! Parser Adapter
//!
//! `XmlParser<H>` owns at most one engine and routes the engine's callbacks
//! to the methods of its handler `H`. Each event kind is routed only after
//! it has been enabled; enabling installs a monomorphized trampoline for `H`
//! into the engine's callback table.
//!
//! Lifecycle: `new` → `create` → `enable_*` → `parse`* → `destroy`. All
//! operations other than `create`, `destroy`, `is_created`, `status` and the
//! handler accessors require a created engine and panic without one.

use std::io::{self, Read};

use tracing::debug;

use crate::config::{EventKind, EventMask, ParserConfig};
use crate::engine::{
    CdataSectionFn, CharacterDataFn, CommentFn, DefaultFn, EndDoctypeDeclFn, EndElementFn, EndNamespaceDeclFn,
    Engine, InputContext, ParsingStatus, ProcessingInstructionFn, StartDoctypeDeclFn, StartElementFn,
    StartNamespaceDeclFn, UnknownEncodingFn, XmlDeclFn,
};
use crate::error::{ParseError, ReadError, XmlError};
use crate::handler::XmlHandler;

/// Chunk size used by `parse_reader`
const READ_CHUNK: usize = 8192;

/// Where an adapter is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParserStatus {
    /// No engine; call `create`
    NoHandle,
    /// Created and accepting input
    Ready,
    /// The final chunk was parsed
    Finished,
    /// A feed failed; destroy and create again to parse another document
    Failed,
}

/// Callback adapter binding an engine to a handler
pub struct XmlParser<H: XmlHandler> {
    engine: Option<Engine<H>>,
    handler: H,
}

impl<H: XmlHandler> XmlParser<H> {
    /// Bind a handler. No engine is created yet.
    pub fn new(handler: H) -> Self {
        XmlParser { engine: None, handler }
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Create a new engine, destroying any existing one.
    ///
    /// `encoding` overrides encoding detection (empty means autodetect).
    /// `namespace_separator` turns on namespace processing (`'\0'` means off).
    /// On success the handler's `on_post_create` runs before anything else.
    pub fn create(&mut self, encoding: Option<&str>, namespace_separator: Option<char>) -> Result<(), XmlError> {
        self.destroy();
        let separator = namespace_separator.filter(|&c| c != '\0');
        let engine = Engine::new(encoding, separator).inspect_err(|code| {
            debug!("engine creation failed: {}", code);
        })?;
        self.engine = Some(engine);

        let mut mask = EventMask::new();
        self.handler.on_post_create(&mut mask);
        self.apply_mask(&mask);
        Ok(())
    }

    pub fn create_with(&mut self, config: &ParserConfig) -> Result<(), XmlError> {
        self.create(config.encoding.as_deref(), config.namespace_separator)
    }

    /// Release the engine, if any. Invalidates buffers from `get_buffer`.
    pub fn destroy(&mut self) {
        self.engine = None;
    }

    #[inline]
    pub fn is_created(&self) -> bool {
        self.engine.is_some()
    }

    pub fn status(&self) -> ParserStatus {
        match self.engine.as_ref().map(Engine::status) {
            None => ParserStatus::NoHandle,
            Some(ParsingStatus::Initialized | ParsingStatus::Parsing) => ParserStatus::Ready,
            Some(ParsingStatus::Finished) => ParserStatus::Finished,
            Some(ParsingStatus::Failed) => ParserStatus::Failed,
        }
    }

    // ========================================================================
    // Feeding
    // ========================================================================

    /// Feed a chunk of the document. `is_final` marks the last chunk.
    ///
    /// # Panics
    ///
    /// Panics if no engine has been created.
    pub fn parse(&mut self, data: &[u8], is_final: bool) -> Result<(), XmlError> {
        let (engine, handler) = self.parts();
        engine.parse(data, is_final, handler)
    }

    /// Feed a string chunk
    pub fn parse_str(&mut self, data: &str, is_final: bool) -> Result<(), XmlError> {
        self.parse(data.as_bytes(), is_final)
    }

    /// Writable buffer of `len` bytes for the next `parse_buffer` call.
    ///
    /// Returns `None` if it can't be allocated or the document is finished
    /// or failed.
    pub fn get_buffer(&mut self, len: usize) -> Option<&mut [u8]> {
        self.engine_mut().get_buffer(len)
    }

    /// Parse the first `len` bytes written into the buffer from `get_buffer`
    pub fn parse_buffer(&mut self, len: usize, is_final: bool) -> Result<(), XmlError> {
        let (engine, handler) = self.parts();
        engine.parse_buffer(len, is_final, handler)
    }

    /// Feed everything `reader` produces, then finish the document
    pub fn parse_reader<R: Read>(&mut self, mut reader: R) -> Result<(), ReadError> {
        loop {
            let read = match self.get_buffer(READ_CHUNK) {
                Some(buffer) => loop {
                    match reader.read(buffer) {
                        Ok(n) => break n,
                        Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                        Err(e) => return Err(ReadError::Io(e)),
                    }
                },
                None => {
                    let code = match self.status() {
                        ParserStatus::Finished => XmlError::Finished,
                        ParserStatus::Failed => self.error_code(),
                        _ => XmlError::NoMemory,
                    };
                    return Err(self.error_at(code).into());
                }
            };
            let is_final = read == 0;
            self.parse_buffer(read, is_final).map_err(|code| self.error_at(code))?;
            if is_final {
                return Ok(());
            }
        }
    }

    // ========================================================================
    // Event routing
    // ========================================================================

    /// Route (or stop routing) one event kind to the handler.
    ///
    /// Turning the default kind on this way selects non-expanding mode; use
    /// `enable_default_handler` to choose.
    pub fn enable(&mut self, kind: EventKind, on: bool) {
        let cb = self.engine_mut().callbacks_mut();
        match kind {
            EventKind::StartElement => {
                cb.start_element = on.then_some(trampoline::start_element::<H> as StartElementFn<H>);
            }
            EventKind::EndElement => {
                cb.end_element = on.then_some(trampoline::end_element::<H> as EndElementFn<H>);
            }
            EventKind::CharacterData => {
                cb.character_data = on.then_some(trampoline::character_data::<H> as CharacterDataFn<H>);
            }
            EventKind::ProcessingInstruction => {
                cb.processing_instruction =
                    on.then_some(trampoline::processing_instruction::<H> as ProcessingInstructionFn<H>);
            }
            EventKind::Comment => {
                cb.comment = on.then_some(trampoline::comment::<H> as CommentFn<H>);
            }
            EventKind::StartCdataSection => {
                cb.start_cdata_section = on.then_some(trampoline::start_cdata_section::<H> as CdataSectionFn<H>);
            }
            EventKind::EndCdataSection => {
                cb.end_cdata_section = on.then_some(trampoline::end_cdata_section::<H> as CdataSectionFn<H>);
            }
            EventKind::Default => {
                cb.default = on.then_some(trampoline::default::<H> as DefaultFn<H>);
                cb.default_expand = false;
            }
            EventKind::UnknownEncoding => {
                cb.unknown_encoding = on.then_some(trampoline::unknown_encoding::<H> as UnknownEncodingFn<H>);
            }
            EventKind::StartNamespaceDecl => {
                cb.start_namespace_decl =
                    on.then_some(trampoline::start_namespace_decl::<H> as StartNamespaceDeclFn<H>);
            }
            EventKind::EndNamespaceDecl => {
                cb.end_namespace_decl = on.then_some(trampoline::end_namespace_decl::<H> as EndNamespaceDeclFn<H>);
            }
            EventKind::XmlDecl => {
                cb.xml_decl = on.then_some(trampoline::xml_decl::<H> as XmlDeclFn<H>);
            }
            EventKind::StartDoctypeDecl => {
                cb.start_doctype_decl = on.then_some(trampoline::start_doctype_decl::<H> as StartDoctypeDeclFn<H>);
            }
            EventKind::EndDoctypeDecl => {
                cb.end_doctype_decl = on.then_some(trampoline::end_doctype_decl::<H> as EndDoctypeDeclFn<H>);
            }
        }
    }

    /// Whether an event kind is currently routed to the handler
    pub fn is_enabled(&self, kind: EventKind) -> bool {
        let cb = self.engine().callbacks();
        match kind {
            EventKind::StartElement => cb.start_element.is_some(),
            EventKind::EndElement => cb.end_element.is_some(),
            EventKind::CharacterData => cb.character_data.is_some(),
            EventKind::ProcessingInstruction => cb.processing_instruction.is_some(),
            EventKind::Comment => cb.comment.is_some(),
            EventKind::StartCdataSection => cb.start_cdata_section.is_some(),
            EventKind::EndCdataSection => cb.end_cdata_section.is_some(),
            EventKind::Default => cb.default.is_some(),
            EventKind::UnknownEncoding => cb.unknown_encoding.is_some(),
            EventKind::StartNamespaceDecl => cb.start_namespace_decl.is_some(),
            EventKind::EndNamespaceDecl => cb.end_namespace_decl.is_some(),
            EventKind::XmlDecl => cb.xml_decl.is_some(),
            EventKind::StartDoctypeDecl => cb.start_doctype_decl.is_some(),
            EventKind::EndDoctypeDecl => cb.end_doctype_decl.is_some(),
        }
    }

    fn apply_mask(&mut self, mask: &EventMask) {
        for kind in mask.iter() {
            self.enable(kind, true);
        }
        if mask.is_enabled(EventKind::Default) {
            self.engine_mut().callbacks_mut().default_expand = mask.default_expand();
        }
    }

    pub fn enable_start_element_handler(&mut self, enable: bool) {
        self.enable(EventKind::StartElement, enable);
    }

    pub fn enable_end_element_handler(&mut self, enable: bool) {
        self.enable(EventKind::EndElement, enable);
    }

    /// Element start and end together
    pub fn enable_element_handler(&mut self, enable: bool) {
        self.enable(EventKind::StartElement, enable);
        self.enable(EventKind::EndElement, enable);
    }

    pub fn enable_character_data_handler(&mut self, enable: bool) {
        self.enable(EventKind::CharacterData, enable);
    }

    pub fn enable_processing_instruction_handler(&mut self, enable: bool) {
        self.enable(EventKind::ProcessingInstruction, enable);
    }

    pub fn enable_comment_handler(&mut self, enable: bool) {
        self.enable(EventKind::Comment, enable);
    }

    pub fn enable_start_cdata_section_handler(&mut self, enable: bool) {
        self.enable(EventKind::StartCdataSection, enable);
    }

    pub fn enable_end_cdata_section_handler(&mut self, enable: bool) {
        self.enable(EventKind::EndCdataSection, enable);
    }

    /// CDATA section start and end together
    pub fn enable_cdata_section_handler(&mut self, enable: bool) {
        self.enable(EventKind::StartCdataSection, enable);
        self.enable(EventKind::EndCdataSection, enable);
    }

    /// Route unhandled markup to `on_default`.
    ///
    /// With `expand` false, references to internal entities are reported raw
    /// and not expanded; with `expand` true they are expanded as usual.
    pub fn enable_default_handler(&mut self, enable: bool, expand: bool) {
        self.enable(EventKind::Default, enable);
        self.engine_mut().callbacks_mut().default_expand = enable && expand;
    }

    pub fn enable_unknown_encoding_handler(&mut self, enable: bool) {
        self.enable(EventKind::UnknownEncoding, enable);
    }

    pub fn enable_start_namespace_decl_handler(&mut self, enable: bool) {
        self.enable(EventKind::StartNamespaceDecl, enable);
    }

    pub fn enable_end_namespace_decl_handler(&mut self, enable: bool) {
        self.enable(EventKind::EndNamespaceDecl, enable);
    }

    /// Namespace declaration start and end together
    pub fn enable_namespace_decl_handler(&mut self, enable: bool) {
        self.enable(EventKind::StartNamespaceDecl, enable);
        self.enable(EventKind::EndNamespaceDecl, enable);
    }

    pub fn enable_xml_decl_handler(&mut self, enable: bool) {
        self.enable(EventKind::XmlDecl, enable);
    }

    pub fn enable_start_doctype_decl_handler(&mut self, enable: bool) {
        self.enable(EventKind::StartDoctypeDecl, enable);
    }

    pub fn enable_end_doctype_decl_handler(&mut self, enable: bool) {
        self.enable(EventKind::EndDoctypeDecl, enable);
    }

    /// DOCTYPE start and end together
    pub fn enable_doctype_decl_handler(&mut self, enable: bool) {
        self.enable(EventKind::StartDoctypeDecl, enable);
        self.enable(EventKind::EndDoctypeDecl, enable);
    }

    // ========================================================================
    // Diagnostics
    // ========================================================================

    /// Code of the last failure; `XmlError::None` if no feed has failed
    pub fn error_code(&self) -> XmlError {
        self.engine().error_code()
    }

    /// Message for the current error code
    pub fn error_string(&self) -> &'static str {
        self.error_code().description()
    }

    /// Byte offset of the current event, or of the error after a failure
    pub fn current_byte_index(&self) -> u64 {
        self.engine().current_byte_index()
    }

    /// 1-based line of the current event
    pub fn current_line_number(&self) -> u64 {
        self.engine().current_line_number()
    }

    /// 0-based column of the current event
    pub fn current_column_number(&self) -> u64 {
        self.engine().current_column_number()
    }

    /// Byte length of the current event
    pub fn current_byte_count(&self) -> u64 {
        self.engine().current_byte_count()
    }

    /// Retained input with the offset and size of the current event
    pub fn input_context(&self) -> Option<InputContext<'_>> {
        self.engine().input_context()
    }

    /// The last failure with its position, if a feed has failed
    pub fn last_error(&self) -> Option<ParseError> {
        let engine = self.engine.as_ref()?;
        match engine.error_code() {
            XmlError::None => None,
            code => Some(self.error_at(code)),
        }
    }

    fn error_at(&self, code: XmlError) -> ParseError {
        match self.engine.as_ref() {
            Some(engine) => ParseError {
                code,
                line: engine.current_line_number(),
                column: engine.current_column_number(),
                byte_index: engine.current_byte_index(),
            },
            None => ParseError {
                code,
                line: 1,
                column: 0,
                byte_index: 0,
            },
        }
    }

    // ========================================================================
    // Handler access
    // ========================================================================

    pub fn handler(&self) -> &H {
        &self.handler
    }

    pub fn handler_mut(&mut self) -> &mut H {
        &mut self.handler
    }

    /// Drop the engine and give the handler back
    pub fn into_handler(self) -> H {
        self.handler
    }

    fn engine(&self) -> &Engine<H> {
        match &self.engine {
            Some(engine) => engine,
            None => no_handle(),
        }
    }

    fn engine_mut(&mut self) -> &mut Engine<H> {
        match &mut self.engine {
            Some(engine) => engine,
            None => no_handle(),
        }
    }

    fn parts(&mut self) -> (&mut Engine<H>, &mut H) {
        match &mut self.engine {
            Some(engine) => (engine, &mut self.handler),
            None => no_handle(),
        }
    }
}

#[cold]
#[track_caller]
fn no_handle() -> ! {
    panic!("XmlParser has no engine; call create() first")
}

// ============================================================================
// Engine-level utilities
// ============================================================================

/// Engine name and version
pub fn engine_version() -> &'static str {
    concat!("rustysax_", env!("CARGO_PKG_VERSION"))
}

/// Engine version as `(major, minor, micro)`
pub fn engine_version_info() -> (u32, u32, u32) {
    (
        env!("CARGO_PKG_VERSION_MAJOR").parse().unwrap_or(0),
        env!("CARGO_PKG_VERSION_MINOR").parse().unwrap_or(0),
        env!("CARGO_PKG_VERSION_PATCH").parse().unwrap_or(0),
    )
}

/// Message for an error code
pub fn error_string(code: XmlError) -> &'static str {
    code.description()
}

/// Message for a numeric error code; `None` if the code is unknown
pub fn error_string_for_code(code: i32) -> Option<&'static str> {
    XmlError::from_code(code).map(XmlError::description)
}

/// Engine callbacks forwarding to handler methods
mod trampoline {
    use crate::engine::EncodingInfo;
    use crate::handler::XmlHandler;

    pub fn start_element<H: XmlHandler>(h: &mut H, name: &str, attributes: &[(&str, &str)]) {
        h.on_start_element(name, attributes);
    }

    pub fn end_element<H: XmlHandler>(h: &mut H, name: &str) {
        h.on_end_element(name);
    }

    pub fn character_data<H: XmlHandler>(h: &mut H, text: &str) {
        h.on_character_data(text);
    }

    pub fn processing_instruction<H: XmlHandler>(h: &mut H, target: &str, data: &str) {
        h.on_processing_instruction(target, data);
    }

    pub fn comment<H: XmlHandler>(h: &mut H, text: &str) {
        h.on_comment(text);
    }

    pub fn start_cdata_section<H: XmlHandler>(h: &mut H) {
        h.on_start_cdata_section();
    }

    pub fn end_cdata_section<H: XmlHandler>(h: &mut H) {
        h.on_end_cdata_section();
    }

    pub fn default<H: XmlHandler>(h: &mut H, raw: &str) {
        h.on_default(raw);
    }

    pub fn unknown_encoding<H: XmlHandler>(h: &mut H, name: &str) -> Option<EncodingInfo> {
        h.on_unknown_encoding(name)
    }

    pub fn start_namespace_decl<H: XmlHandler>(h: &mut H, prefix: Option<&str>, uri: Option<&str>) {
        h.on_start_namespace_decl(prefix, uri);
    }

    pub fn end_namespace_decl<H: XmlHandler>(h: &mut H, prefix: Option<&str>) {
        h.on_end_namespace_decl(prefix);
    }

    pub fn xml_decl<H: XmlHandler>(h: &mut H, version: &str, encoding: Option<&str>, standalone: Option<bool>) {
        h.on_xml_decl(version, encoding, standalone);
    }

    pub fn start_doctype_decl<H: XmlHandler>(
        h: &mut H,
        name: &str,
        system_id: Option<&str>,
        public_id: Option<&str>,
        has_internal_subset: bool,
    ) {
        h.on_start_doctype_decl(name, system_id, public_id, has_internal_subset);
    }

    pub fn end_doctype_decl<H: XmlHandler>(h: &mut H) {
        h.on_end_doctype_decl();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sax::{EventCollector, XmlEvent};

    fn created() -> XmlParser<EventCollector> {
        let mut parser = XmlParser::new(EventCollector::new());
        parser.create(None, None).unwrap();
        parser
    }

    #[test]
    fn test_status_lifecycle() {
        let mut parser = XmlParser::new(EventCollector::new());
        assert_eq!(parser.status(), ParserStatus::NoHandle);
        assert!(!parser.is_created());

        parser.create(None, None).unwrap();
        assert_eq!(parser.status(), ParserStatus::Ready);
        parser.parse_str("<a>", false).unwrap();
        assert_eq!(parser.status(), ParserStatus::Ready);
        parser.parse_str("</a>", true).unwrap();
        assert_eq!(parser.status(), ParserStatus::Finished);

        assert_eq!(parser.parse_str("", true), Err(XmlError::Finished));
        assert_eq!(parser.status(), ParserStatus::Finished);

        parser.destroy();
        parser.destroy();
        assert_eq!(parser.status(), ParserStatus::NoHandle);
    }

    #[test]
    #[should_panic(expected = "no engine")]
    fn test_parse_without_create_panics() {
        let mut parser = XmlParser::new(EventCollector::new());
        let _ = parser.parse(b"<a/>", true);
    }

    #[test]
    #[should_panic(expected = "no engine")]
    fn test_query_without_create_panics() {
        let parser = XmlParser::new(EventCollector::new());
        parser.current_line_number();
    }

    #[test]
    fn test_enable_toggles() {
        let mut parser = created();
        assert!(!parser.is_enabled(EventKind::Comment));
        parser.enable_comment_handler(true);
        assert!(parser.is_enabled(EventKind::Comment));
        parser.enable_element_handler(true);
        parser.enable_end_element_handler(false);
        assert!(parser.is_enabled(EventKind::StartElement));
        assert!(!parser.is_enabled(EventKind::EndElement));

        parser.parse_str("<a><!--hi--></a>", true).unwrap();
        assert_eq!(
            parser.handler().events(),
            &[
                XmlEvent::PostCreate,
                XmlEvent::start("a", &[]),
                XmlEvent::Comment("hi".to_string())
            ]
        );
    }

    #[test]
    fn test_post_create_mask_is_applied() {
        let mut mask = EventMask::new();
        mask.enable(EventKind::CharacterData).enable(EventKind::Default).set_default_expand(true);
        let mut parser = XmlParser::new(EventCollector::with_mask(mask));
        parser.create(None, None).unwrap();

        assert!(parser.is_enabled(EventKind::CharacterData));
        assert!(parser.is_enabled(EventKind::Default));
        assert!(!parser.is_enabled(EventKind::StartElement));

        parser.parse_str("<a>x</a>", true).unwrap();
        assert_eq!(
            parser.handler().events(),
            &[
                XmlEvent::PostCreate,
                XmlEvent::Default("<a>".to_string()),
                XmlEvent::text("x"),
                XmlEvent::Default("</a>".to_string()),
            ]
        );
    }

    #[test]
    fn test_last_error() {
        let mut parser = created();
        assert_eq!(parser.last_error(), None);
        assert_eq!(parser.error_string(), "no error");

        assert_eq!(parser.parse_str("<a>\n<b></a>", true), Err(XmlError::TagMismatch));
        let err = parser.last_error().unwrap();
        assert_eq!(err.code, XmlError::TagMismatch);
        assert_eq!((err.line, err.column, err.byte_index), (2, 3, 7));
        assert_eq!(parser.error_string(), "mismatched tag");
    }

    #[test]
    fn test_parse_reader() {
        let mut parser = created();
        parser.enable_element_handler(true);
        let doc = format!("<r>{}</r>", "<i/>".repeat(5000));
        parser.parse_reader(doc.as_bytes()).unwrap();
        assert_eq!(parser.status(), ParserStatus::Finished);
        // post-create, the root pair and one pair per child
        assert_eq!(parser.handler().event_count(), 1 + 2 + 2 * 5000);

        let mut parser = created();
        match parser.parse_reader(&b"<r><x></r>"[..]) {
            Err(ReadError::Parse(err)) => assert_eq!(err.code, XmlError::TagMismatch),
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[test]
    fn test_static_utilities() {
        assert_eq!(engine_version(), concat!("rustysax_", env!("CARGO_PKG_VERSION")));
        let (major, minor, micro) = engine_version_info();
        assert_eq!(format!("{}.{}.{}", major, minor, micro), env!("CARGO_PKG_VERSION"));
        assert_eq!(error_string(XmlError::NoElements), "no element found");
        assert_eq!(error_string_for_code(7), Some("mismatched tag"));
        assert_eq!(error_string_for_code(999), None);
    }

    #[test]
    fn test_into_handler() {
        let mut parser = created();
        parser.enable_character_data_handler(true);
        parser.parse_str("<a>hi</a>", true).unwrap();
        let collector = parser.into_handler();
        assert_eq!(collector.text(), "hi");
    }
}
