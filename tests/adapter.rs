//! Adapter behavior through the public API

use rustysax::{
    EncodingInfo, EventCollector, EventKind, EventMask, ParserStatus, XmlError, XmlEvent, XmlHandler, XmlParser,
};

fn mask(kinds: &[EventKind]) -> EventMask {
    let mut mask = EventMask::new();
    for &kind in kinds {
        mask.enable(kind);
    }
    mask
}

fn parser_with(kinds: &[EventKind]) -> XmlParser<EventCollector> {
    let mut parser = XmlParser::new(EventCollector::with_mask(mask(kinds)));
    parser.create(None, None).unwrap();
    parser
}

fn elements_and_text() -> XmlParser<EventCollector> {
    parser_with(&[EventKind::StartElement, EventKind::EndElement, EventKind::CharacterData])
}

// ============================================================================
// Scenarios
// ============================================================================

#[test]
fn test_element_and_text_events() {
    let mut parser = elements_and_text();
    parser.parse_str("<a x=\"1\"><b/>text</a>", true).unwrap();
    assert_eq!(
        parser.handler().events(),
        &[
            XmlEvent::PostCreate,
            XmlEvent::start("a", &[("x", "1")]),
            XmlEvent::start("b", &[]),
            XmlEvent::end("b"),
            XmlEvent::text("text"),
            XmlEvent::end("a"),
        ]
    );
    assert_eq!(parser.status(), ParserStatus::Finished);
}

#[test]
fn test_mismatched_tag_is_terminal() {
    let mut parser = elements_and_text();
    assert_eq!(parser.parse_str("<a><b></a>", true), Err(XmlError::TagMismatch));
    assert_eq!(parser.error_code(), XmlError::TagMismatch);
    assert_eq!(parser.error_string(), "mismatched tag");
    assert_eq!(parser.status(), ParserStatus::Failed);

    let seen = parser.handler().event_count();
    assert_eq!(parser.parse_str("<c/>", false), Err(XmlError::TagMismatch));
    assert_eq!(parser.parse_str("", true), Err(XmlError::TagMismatch));
    assert_eq!(parser.handler().event_count(), seen);
    assert!(parser.get_buffer(16).is_none());
}

#[test]
fn test_buffer_feed_parses_only_written_bytes() {
    let mut parser = elements_and_text();
    let doc = b"<doc>hello</doc>";
    let buffer = parser.get_buffer(64).unwrap();
    assert!(buffer.len() >= 64);
    buffer[..doc.len()].copy_from_slice(doc);
    parser.parse_buffer(doc.len(), true).unwrap();

    assert_eq!(
        parser.handler().events(),
        &[
            XmlEvent::PostCreate,
            XmlEvent::start("doc", &[]),
            XmlEvent::text("hello"),
            XmlEvent::end("doc"),
        ]
    );
}

#[test]
fn test_buffer_feed_across_chunks() {
    let mut parser = elements_and_text();
    for chunk in [&b"<r>ab"[..], b"cd</", b"r>"] {
        let buffer = parser.get_buffer(chunk.len() + 10).unwrap();
        buffer[..chunk.len()].copy_from_slice(chunk);
        parser.parse_buffer(chunk.len(), false).unwrap();
    }
    parser.parse_buffer(0, true).unwrap();
    assert_eq!(parser.handler().text(), "abcd");
    assert_eq!(parser.status(), ParserStatus::Finished);
}

// ============================================================================
// Properties
// ============================================================================

const CHUNKING_DOC: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
    <!DOCTYPE r [\n  <!ENTITY who \"w&#246;rld\">\n  <!-- subset -->\n]>\n\
    <r a=\"1\" b='&amp;&who;'>\r\n  hello &who;!\
    <![CDATA[<raw>\n]]><?pi some data?><?x?><!-- c --><e/>&#x263A;\u{E9}</r>\n<!-- after --><?end?>\n";

fn collect_chunked(doc: &[u8], chunk: usize, mask: EventMask) -> Vec<XmlEvent> {
    let mut parser = XmlParser::new(EventCollector::with_mask(mask));
    parser.create(None, None).unwrap();
    for piece in doc.chunks(chunk) {
        parser.parse(piece, false).unwrap();
    }
    parser.parse(b"", true).unwrap();
    parser.into_handler().take_events()
}

#[test]
fn test_chunking_invariance() {
    let doc = CHUNKING_DOC.as_bytes();
    for expand in [false, true] {
        let mut mask = EventMask::all();
        mask.set_default_expand(expand);

        let mut parser = XmlParser::new(EventCollector::with_mask(mask));
        parser.create(None, None).unwrap();
        parser.parse(doc, true).unwrap();
        let whole = parser.into_handler().take_events();
        assert!(whole.len() > 10);

        for chunk in [1, 2, 3, 5, 7, 16, 64] {
            assert_eq!(collect_chunked(doc, chunk, mask), whole, "chunk={} expand={}", chunk, expand);
        }
    }
}

/// Counts calls per handler method
#[derive(Default)]
struct Counter {
    calls: Vec<&'static str>,
}

impl Counter {
    fn count(&self, method: &str) -> usize {
        self.calls.iter().filter(|&&c| c == method).count()
    }
}

impl XmlHandler for Counter {
    fn on_post_create(&mut self, _events: &mut EventMask) {
        self.calls.push("post_create");
    }
    fn on_start_element(&mut self, _name: &str, _attributes: &[(&str, &str)]) {
        self.calls.push("start_element");
    }
    fn on_end_element(&mut self, _name: &str) {
        self.calls.push("end_element");
    }
    fn on_character_data(&mut self, _text: &str) {
        self.calls.push("character_data");
    }
    fn on_processing_instruction(&mut self, _target: &str, _data: &str) {
        self.calls.push("processing_instruction");
    }
    fn on_comment(&mut self, _text: &str) {
        self.calls.push("comment");
    }
    fn on_start_cdata_section(&mut self) {
        self.calls.push("start_cdata_section");
    }
    fn on_end_cdata_section(&mut self) {
        self.calls.push("end_cdata_section");
    }
    fn on_default(&mut self, _raw: &str) {
        self.calls.push("default");
    }
    fn on_xml_decl(&mut self, _version: &str, _encoding: Option<&str>, _standalone: Option<bool>) {
        self.calls.push("xml_decl");
    }
    fn on_start_doctype_decl(&mut self, _name: &str, _sys: Option<&str>, _pub: Option<&str>, _subset: bool) {
        self.calls.push("start_doctype_decl");
    }
    fn on_end_doctype_decl(&mut self) {
        self.calls.push("end_doctype_decl");
    }
}

#[test]
fn test_overrides_are_inert_until_enabled() {
    let mut parser = XmlParser::new(Counter::default());
    parser.create(None, None).unwrap();
    parser.parse_str(CHUNKING_DOC, true).unwrap();
    assert_eq!(parser.handler().calls, ["post_create"]);
}

#[test]
fn test_disabled_kinds_are_never_called() {
    let mut parser = XmlParser::new(Counter::default());
    parser.create(None, None).unwrap();
    for kind in EventKind::ALL {
        parser.enable(kind, true);
    }
    parser.enable_comment_handler(false);
    parser.enable_character_data_handler(false);
    parser.enable_cdata_section_handler(false);
    parser.parse_str(CHUNKING_DOC, true).unwrap();

    let counter = parser.handler();
    assert_eq!(counter.count("comment"), 0);
    assert_eq!(counter.count("character_data"), 0);
    assert_eq!(counter.count("start_cdata_section"), 0);
    assert_eq!(counter.count("end_cdata_section"), 0);
    // the disabled kinds fall through to the default handler
    assert!(counter.count("default") > 0);
    assert_eq!(counter.count("start_element"), 2);
    assert_eq!(counter.count("processing_instruction"), 3);
}

#[test]
fn test_post_create_runs_once_and_first() {
    let mut counter = Counter::default();
    {
        let mut parser = XmlParser::new(&mut counter);
        parser.create(None, None).unwrap();
        parser.enable_element_handler(true);
        parser.parse_str("<a/>", true).unwrap();

        parser.create(Some(""), None).unwrap();
        parser.enable_element_handler(true);
        parser.parse_str("<b/>", true).unwrap();
    }
    assert_eq!(
        counter.calls,
        ["post_create", "start_element", "end_element", "post_create", "start_element", "end_element"]
    );
}

#[test]
fn test_destroy_and_create_reset_position() {
    let mut parser = elements_and_text();
    parser.parse_str("<a>\n\n  <b/>", false).unwrap();
    assert_eq!(parser.current_line_number(), 3);
    assert_eq!(parser.current_column_number(), 6);
    assert_eq!(parser.current_byte_index(), 11);

    parser.destroy();
    assert!(!parser.is_created());
    parser.create(None, None).unwrap();
    assert_eq!(parser.status(), ParserStatus::Ready);
    assert_eq!(parser.error_code(), XmlError::None);
    assert_eq!(parser.current_line_number(), 1);
    assert_eq!(parser.current_column_number(), 0);
    assert_eq!(parser.current_byte_index(), 0);

    parser.parse_str("<x/>", true).unwrap();
    assert_eq!(parser.current_line_number(), 1);
    assert_eq!(parser.current_column_number(), 4);
    assert_eq!(parser.current_byte_index(), 4);
}

#[test]
fn test_create_after_failure_parses_again() {
    let mut parser = elements_and_text();
    assert!(parser.parse_str("<a></b>", true).is_err());
    parser.create(None, None).unwrap();
    parser.parse_str("<ok/>", true).unwrap();
    assert_eq!(parser.last_error(), None);
    assert_eq!(parser.handler().events().last(), Some(&XmlEvent::end("ok")));
}

// ============================================================================
// Event kinds
// ============================================================================

#[test]
fn test_namespace_processing() {
    let mut parser = XmlParser::new(EventCollector::with_mask(mask(&[
        EventKind::StartElement,
        EventKind::EndElement,
        EventKind::StartNamespaceDecl,
        EventKind::EndNamespaceDecl,
    ])));
    parser.create(None, Some('|')).unwrap();
    parser
        .parse_str("<r xmlns=\"urn:a\" xmlns:p=\"urn:p\"><p:c p:x=\"1\" y=\"2\"/></r>", true)
        .unwrap();

    assert_eq!(
        parser.handler().events(),
        &[
            XmlEvent::PostCreate,
            XmlEvent::StartNamespaceDecl {
                prefix: None,
                uri: Some("urn:a".to_string()),
            },
            XmlEvent::StartNamespaceDecl {
                prefix: Some("p".to_string()),
                uri: Some("urn:p".to_string()),
            },
            XmlEvent::start("urn:a|r", &[]),
            XmlEvent::start("urn:p|c", &[("urn:p|x", "1"), ("y", "2")]),
            XmlEvent::end("urn:p|c"),
            XmlEvent::end("urn:a|r"),
            XmlEvent::EndNamespaceDecl(Some("p".to_string())),
            XmlEvent::EndNamespaceDecl(None),
        ]
    );
}

#[test]
fn test_namespace_errors() {
    let mut parser = XmlParser::new(EventCollector::new());
    parser.create(None, Some(':')).unwrap();
    assert_eq!(parser.parse_str("<p:a/>", true), Err(XmlError::UnboundPrefix));

    parser.create(None, Some(':')).unwrap();
    assert_eq!(
        parser.parse_str("<a xmlns:p=\"u\" xmlns:q=\"u\" p:x=\"1\" q:x=\"2\"/>", true),
        Err(XmlError::DuplicateAttribute)
    );

    // without a separator prefixes are plain name characters
    parser.create(None, None).unwrap();
    assert_eq!(parser.parse_str("<p:a/>", true), Ok(()));
}

#[test]
fn test_internal_entity_expansion() {
    let doc = "<!DOCTYPE d [<!ENTITY who \"world\">]><d>hello &who;</d>";
    let mut parser = elements_and_text();
    parser.parse_str(doc, true).unwrap();
    assert_eq!(parser.handler().text(), "hello world");

    let mut parser = parser_with(&[EventKind::CharacterData]);
    parser.enable_default_handler(true, false);
    parser.parse_str(doc, true).unwrap();
    let events = parser.handler().events();
    assert!(events.contains(&XmlEvent::Default("&who;".to_string())));
    assert_eq!(parser.handler().text(), "hello ");

    let mut parser = parser_with(&[EventKind::CharacterData]);
    parser.enable_default_handler(true, true);
    parser.parse_str(doc, true).unwrap();
    assert_eq!(parser.handler().text(), "hello world");
}

#[test]
fn test_default_handler_reconstructs_input() {
    let doc = "<?xml version=\"1.0\"?>\n<!DOCTYPE r [<!ENTITY e \"x\">]>\n<r a=\"1\">t&e;<!--c--><?p d?></r>\n";
    let mut parser = parser_with(&[]);
    parser.enable_default_handler(true, false);
    parser.parse_str(doc, true).unwrap();

    let raw: String = parser
        .handler()
        .events()
        .iter()
        .filter_map(|e| match e {
            XmlEvent::Default(raw) => Some(raw.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(raw, doc);
}

#[test]
fn test_xml_decl_standalone_is_tri_state() {
    let cases = [
        ("<?xml version=\"1.0\"?><a/>", None, None),
        ("<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?><a/>", Some("UTF-8"), Some(true)),
        ("<?xml version=\"1.0\" standalone='no'?><a/>", None, Some(false)),
    ];
    for (doc, encoding, standalone) in cases {
        let mut parser = parser_with(&[EventKind::XmlDecl]);
        parser.parse_str(doc, true).unwrap();
        assert_eq!(
            parser.handler().events()[1],
            XmlEvent::XmlDecl {
                version: "1.0".to_string(),
                encoding: encoding.map(str::to_string),
                standalone,
            },
            "{}",
            doc
        );
    }
}

#[test]
fn test_doctype_events() {
    let mut parser = parser_with(&[EventKind::Comment, EventKind::ProcessingInstruction]);
    parser.enable_doctype_decl_handler(true);
    parser
        .parse_str("<!DOCTYPE r PUBLIC \"-//A//DTD r//EN\" \"r.dtd\" [<!-- c --><?pi x?>]><r/>", true)
        .unwrap();
    assert_eq!(
        parser.handler().events(),
        &[
            XmlEvent::PostCreate,
            XmlEvent::StartDoctypeDecl {
                name: "r".to_string(),
                system_id: Some("r.dtd".to_string()),
                public_id: Some("-//A//DTD r//EN".to_string()),
                has_internal_subset: true,
            },
            XmlEvent::Comment(" c ".to_string()),
            XmlEvent::ProcessingInstruction {
                target: "pi".to_string(),
                data: "x".to_string(),
            },
            XmlEvent::EndDoctypeDecl,
        ]
    );
}

#[test]
fn test_cdata_section_brackets_text() {
    let mut parser = parser_with(&[EventKind::CharacterData]);
    parser.enable_cdata_section_handler(true);
    parser.parse_str("<a><![CDATA[<x>&amp;]]></a>", true).unwrap();
    assert_eq!(
        parser.handler().events(),
        &[
            XmlEvent::PostCreate,
            XmlEvent::StartCdataSection,
            XmlEvent::text("<x>&amp;"),
            XmlEvent::EndCdataSection,
        ]
    );
}

// ============================================================================
// Encodings
// ============================================================================

/// Accepts one custom single-byte encoding
struct CustomCodec {
    text: String,
}

impl XmlHandler for CustomCodec {
    fn on_character_data(&mut self, text: &str) {
        self.text.push_str(text);
    }

    fn on_unknown_encoding(&mut self, name: &str) -> Option<EncodingInfo> {
        if name != "x-custom" {
            return None;
        }
        Some(EncodingInfo::single_byte(|b| match b {
            0x00..=0x7F => Some(b as char),
            0xE9 => Some('\u{3B1}'),
            _ => None,
        }))
    }
}

#[test]
fn test_unknown_encoding_resolved_by_handler() {
    let mut parser = XmlParser::new(CustomCodec { text: String::new() });
    parser.create(None, None).unwrap();
    parser.enable_character_data_handler(true);
    parser.enable_unknown_encoding_handler(true);
    parser
        .parse(b"<?xml version=\"1.0\" encoding=\"x-custom\"?><a>\xE9b</a>", true)
        .unwrap();
    assert_eq!(parser.handler().text, "\u{3B1}b");

    // an unmapped byte is invalid
    parser.create(None, None).unwrap();
    parser.enable_unknown_encoding_handler(true);
    assert_eq!(
        parser.parse(b"<?xml version=\"1.0\" encoding=\"x-custom\"?><a>\xEA</a>", true),
        Err(XmlError::InvalidToken)
    );
}

#[test]
fn test_unknown_encoding_refused() {
    let mut parser = parser_with(&[EventKind::UnknownEncoding]);
    let result = parser.parse_str("<?xml version=\"1.0\" encoding=\"x-other\"?><a/>", true);
    assert_eq!(result, Err(XmlError::UnknownEncoding));
    assert_eq!(
        parser.handler().events(),
        &[XmlEvent::PostCreate, XmlEvent::UnknownEncoding("x-other".to_string())]
    );

    // not routed: refused without asking
    let mut parser = parser_with(&[]);
    let result = parser.parse_str("<?xml version=\"1.0\" encoding=\"x-other\"?><a/>", true);
    assert_eq!(result, Err(XmlError::UnknownEncoding));
}

#[test]
fn test_utf16_without_bom() {
    let bytes: Vec<u8> = "<a>\u{E9}t\u{E9}</a>"
        .encode_utf16()
        .flat_map(|u| u.to_le_bytes())
        .collect();
    let mut parser = elements_and_text();
    for chunk in bytes.chunks(3) {
        parser.parse(chunk, false).unwrap();
    }
    parser.parse(b"", true).unwrap();
    assert_eq!(parser.handler().text(), "\u{E9}t\u{E9}");
    assert_eq!(parser.current_byte_index(), bytes.len() as u64);
}

#[test]
fn test_protocol_encoding_overrides_declaration() {
    let mut parser = XmlParser::new(EventCollector::with_mask(mask(&[EventKind::CharacterData])));
    parser.create(Some("ISO-8859-1"), None).unwrap();
    parser
        .parse(b"<?xml version=\"1.0\" encoding=\"UTF-8\"?><a>\xE9</a>", true)
        .unwrap();
    assert_eq!(parser.handler().text(), "\u{E9}");
}
