//! Event Collector
//!
//! Implements XmlHandler by recording every call as an `XmlEvent`, for batch
//! return to Elixir and for tests.

use super::events::XmlEvent;
use crate::config::EventMask;
use crate::engine::EncodingInfo;
use crate::handler::XmlHandler;

/// Handler that records the events it receives
#[derive(Debug, Default)]
pub struct EventCollector {
    /// Kinds enabled on the parser at creation
    mask: EventMask,
    /// Collected events
    events: Vec<XmlEvent>,
}

impl EventCollector {
    /// Collector that enables nothing by itself
    pub fn new() -> Self {
        Self::default()
    }

    /// Collector that enables `mask` whenever a parser engine is created
    pub fn with_mask(mask: EventMask) -> Self {
        EventCollector {
            mask,
            events: Vec::with_capacity(64),
        }
    }

    /// Get the collected events as a slice
    pub fn events(&self) -> &[XmlEvent] {
        &self.events
    }

    /// Take the collected events
    pub fn take_events(&mut self) -> Vec<XmlEvent> {
        std::mem::take(&mut self.events)
    }

    /// Get number of collected events
    pub fn event_count(&self) -> usize {
        self.events.len()
    }

    /// All character data received, concatenated
    pub fn text(&self) -> String {
        self.events
            .iter()
            .filter_map(|e| match e {
                XmlEvent::CharacterData(text) => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }
}

impl XmlHandler for EventCollector {
    fn on_post_create(&mut self, events: &mut EventMask) {
        *events = self.mask;
        self.events.push(XmlEvent::PostCreate);
    }

    fn on_start_element(&mut self, name: &str, attributes: &[(&str, &str)]) {
        self.events.push(XmlEvent::start(name, attributes));
    }

    fn on_end_element(&mut self, name: &str) {
        self.events.push(XmlEvent::end(name));
    }

    fn on_character_data(&mut self, text: &str) {
        // one text node can arrive in several calls
        if let Some(XmlEvent::CharacterData(last)) = self.events.last_mut() {
            last.push_str(text);
            return;
        }
        self.events.push(XmlEvent::text(text));
    }

    fn on_processing_instruction(&mut self, target: &str, data: &str) {
        self.events.push(XmlEvent::ProcessingInstruction {
            target: target.to_string(),
            data: data.to_string(),
        });
    }

    fn on_comment(&mut self, text: &str) {
        self.events.push(XmlEvent::Comment(text.to_string()));
    }

    fn on_start_cdata_section(&mut self) {
        self.events.push(XmlEvent::StartCdataSection);
    }

    fn on_end_cdata_section(&mut self) {
        self.events.push(XmlEvent::EndCdataSection);
    }

    fn on_default(&mut self, raw: &str) {
        self.events.push(XmlEvent::Default(raw.to_string()));
    }

    fn on_unknown_encoding(&mut self, name: &str) -> Option<EncodingInfo> {
        self.events.push(XmlEvent::UnknownEncoding(name.to_string()));
        None
    }

    fn on_start_namespace_decl(&mut self, prefix: Option<&str>, uri: Option<&str>) {
        self.events.push(XmlEvent::StartNamespaceDecl {
            prefix: prefix.map(str::to_string),
            uri: uri.map(str::to_string),
        });
    }

    fn on_end_namespace_decl(&mut self, prefix: Option<&str>) {
        self.events.push(XmlEvent::EndNamespaceDecl(prefix.map(str::to_string)));
    }

    fn on_xml_decl(&mut self, version: &str, encoding: Option<&str>, standalone: Option<bool>) {
        self.events.push(XmlEvent::XmlDecl {
            version: version.to_string(),
            encoding: encoding.map(str::to_string),
            standalone,
        });
    }

    fn on_start_doctype_decl(
        &mut self,
        name: &str,
        system_id: Option<&str>,
        public_id: Option<&str>,
        has_internal_subset: bool,
    ) {
        self.events.push(XmlEvent::StartDoctypeDecl {
            name: name.to_string(),
            system_id: system_id.map(str::to_string),
            public_id: public_id.map(str::to_string),
            has_internal_subset,
        });
    }

    fn on_end_doctype_decl(&mut self) {
        self.events.push(XmlEvent::EndDoctypeDecl);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EventKind;
    use crate::parser::XmlParser;

    fn parse_all(doc: &str) -> Vec<XmlEvent> {
        let mut parser = XmlParser::new(EventCollector::with_mask(EventMask::all()));
        parser.create(None, None).unwrap();
        parser.parse_str(doc, true).unwrap();
        parser.into_handler().take_events()
    }

    #[test]
    fn test_collects_everything() {
        let events = parse_all(
            "<?xml version=\"1.0\" standalone=\"no\"?><!DOCTYPE r SYSTEM \"r.dtd\">\
             <r><?pi data?><!--c--><![CDATA[x]]></r>",
        );
        assert_eq!(
            events,
            vec![
                XmlEvent::PostCreate,
                XmlEvent::XmlDecl {
                    version: "1.0".to_string(),
                    encoding: None,
                    standalone: Some(false),
                },
                XmlEvent::StartDoctypeDecl {
                    name: "r".to_string(),
                    system_id: Some("r.dtd".to_string()),
                    public_id: None,
                    has_internal_subset: false,
                },
                XmlEvent::EndDoctypeDecl,
                XmlEvent::start("r", &[]),
                XmlEvent::ProcessingInstruction {
                    target: "pi".to_string(),
                    data: "data".to_string(),
                },
                XmlEvent::Comment("c".to_string()),
                XmlEvent::StartCdataSection,
                XmlEvent::text("x"),
                XmlEvent::EndCdataSection,
                XmlEvent::end("r"),
            ]
        );
    }

    #[test]
    fn test_adjacent_text_is_merged() {
        let events = parse_all("<a>one&amp;two\nthree</a>");
        assert_eq!(events[2], XmlEvent::text("one&two\nthree"));
        assert_eq!(events.len(), 4);
    }

    #[test]
    fn test_text_and_counts() {
        let mut collector = EventCollector::new();
        collector.on_character_data("a");
        collector.on_comment("x");
        collector.on_character_data("b");
        assert_eq!(collector.text(), "ab");
        assert_eq!(collector.event_count(), 3);
        assert_eq!(collector.take_events().len(), 3);
        assert_eq!(collector.event_count(), 0);
    }

    #[test]
    fn test_post_create_sets_mask() {
        let mut mask = EventMask::new();
        mask.enable(EventKind::Comment);
        let mut collector = EventCollector::with_mask(mask);
        let mut requested = EventMask::new();
        collector.on_post_create(&mut requested);
        assert_eq!(requested, mask);
        assert_eq!(collector.events(), &[XmlEvent::PostCreate]);
    }
}
