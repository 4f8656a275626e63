//! Handler Interface
//!
//! One method per event kind, all no-ops by default. A handler only receives
//! an event when the parser has that kind enabled; overriding a method alone
//! changes nothing.

use crate::config::EventMask;
use crate::engine::EncodingInfo;

/// Receives parse events from an [`XmlParser`](crate::XmlParser)
pub trait XmlHandler {
    /// Called once after the parser created a new engine, before any other
    /// event.
    ///
    /// `events` starts empty; kinds enabled on it are turned on before the
    /// first feed.
    fn on_post_create(&mut self, events: &mut EventMask) {
        let _ = events;
    }

    /// Called when an element starts
    ///
    /// # Arguments
    /// * `name` - Element name, namespace-expanded if namespaces are on
    /// * `attributes` - `(name, value)` pairs in document order, values normalized
    fn on_start_element(&mut self, name: &str, attributes: &[(&str, &str)]) {
        let _ = (name, attributes);
    }

    /// Called when an element ends (also right after the start of `<e/>`)
    fn on_end_element(&mut self, name: &str) {
        let _ = name;
    }

    /// Called for character data.
    ///
    /// One text node may arrive in several calls.
    fn on_character_data(&mut self, text: &str) {
        let _ = text;
    }

    fn on_processing_instruction(&mut self, target: &str, data: &str) {
        let _ = (target, data);
    }

    fn on_comment(&mut self, text: &str) {
        let _ = text;
    }

    fn on_start_cdata_section(&mut self) {}

    fn on_end_cdata_section(&mut self) {}

    /// Called with the raw text of anything no enabled handler took
    fn on_default(&mut self, raw: &str) {
        let _ = raw;
    }

    /// Resolve an encoding the engine doesn't know.
    ///
    /// Returning `None` refuses it and the parse fails with
    /// `XmlError::UnknownEncoding`.
    fn on_unknown_encoding(&mut self, name: &str) -> Option<EncodingInfo> {
        let _ = name;
        None
    }

    /// Called before the start of the element declaring the binding
    ///
    /// # Arguments
    /// * `prefix` - `None` for the default namespace
    /// * `uri` - `None` when the default namespace is undeclared (`xmlns=""`)
    fn on_start_namespace_decl(&mut self, prefix: Option<&str>, uri: Option<&str>) {
        let _ = (prefix, uri);
    }

    fn on_end_namespace_decl(&mut self, prefix: Option<&str>) {
        let _ = prefix;
    }

    /// Called for the XML declaration.
    ///
    /// `standalone` is `None` when the declaration doesn't specify it.
    fn on_xml_decl(&mut self, version: &str, encoding: Option<&str>, standalone: Option<bool>) {
        let _ = (version, encoding, standalone);
    }

    fn on_start_doctype_decl(
        &mut self,
        name: &str,
        system_id: Option<&str>,
        public_id: Option<&str>,
        has_internal_subset: bool,
    ) {
        let _ = (name, system_id, public_id, has_internal_subset);
    }

    fn on_end_doctype_decl(&mut self) {}
}

impl<T: XmlHandler + ?Sized> XmlHandler for &mut T {
    fn on_post_create(&mut self, events: &mut EventMask) {
        (**self).on_post_create(events)
    }

    fn on_start_element(&mut self, name: &str, attributes: &[(&str, &str)]) {
        (**self).on_start_element(name, attributes)
    }

    fn on_end_element(&mut self, name: &str) {
        (**self).on_end_element(name)
    }

    fn on_character_data(&mut self, text: &str) {
        (**self).on_character_data(text)
    }

    fn on_processing_instruction(&mut self, target: &str, data: &str) {
        (**self).on_processing_instruction(target, data)
    }

    fn on_comment(&mut self, text: &str) {
        (**self).on_comment(text)
    }

    fn on_start_cdata_section(&mut self) {
        (**self).on_start_cdata_section()
    }

    fn on_end_cdata_section(&mut self) {
        (**self).on_end_cdata_section()
    }

    fn on_default(&mut self, raw: &str) {
        (**self).on_default(raw)
    }

    fn on_unknown_encoding(&mut self, name: &str) -> Option<EncodingInfo> {
        (**self).on_unknown_encoding(name)
    }

    fn on_start_namespace_decl(&mut self, prefix: Option<&str>, uri: Option<&str>) {
        (**self).on_start_namespace_decl(prefix, uri)
    }

    fn on_end_namespace_decl(&mut self, prefix: Option<&str>) {
        (**self).on_end_namespace_decl(prefix)
    }

    fn on_xml_decl(&mut self, version: &str, encoding: Option<&str>, standalone: Option<bool>) {
        (**self).on_xml_decl(version, encoding, standalone)
    }

    fn on_start_doctype_decl(
        &mut self,
        name: &str,
        system_id: Option<&str>,
        public_id: Option<&str>,
        has_internal_subset: bool,
    ) {
        (**self).on_start_doctype_decl(name, system_id, public_id, has_internal_subset)
    }

    fn on_end_doctype_decl(&mut self) {
        (**self).on_end_doctype_decl()
    }
}

impl<T: XmlHandler + ?Sized> XmlHandler for Box<T> {
    fn on_post_create(&mut self, events: &mut EventMask) {
        (**self).on_post_create(events)
    }

    fn on_start_element(&mut self, name: &str, attributes: &[(&str, &str)]) {
        (**self).on_start_element(name, attributes)
    }

    fn on_end_element(&mut self, name: &str) {
        (**self).on_end_element(name)
    }

    fn on_character_data(&mut self, text: &str) {
        (**self).on_character_data(text)
    }

    fn on_processing_instruction(&mut self, target: &str, data: &str) {
        (**self).on_processing_instruction(target, data)
    }

    fn on_comment(&mut self, text: &str) {
        (**self).on_comment(text)
    }

    fn on_start_cdata_section(&mut self) {
        (**self).on_start_cdata_section()
    }

    fn on_end_cdata_section(&mut self) {
        (**self).on_end_cdata_section()
    }

    fn on_default(&mut self, raw: &str) {
        (**self).on_default(raw)
    }

    fn on_unknown_encoding(&mut self, name: &str) -> Option<EncodingInfo> {
        (**self).on_unknown_encoding(name)
    }

    fn on_start_namespace_decl(&mut self, prefix: Option<&str>, uri: Option<&str>) {
        (**self).on_start_namespace_decl(prefix, uri)
    }

    fn on_end_namespace_decl(&mut self, prefix: Option<&str>) {
        (**self).on_end_namespace_decl(prefix)
    }

    fn on_xml_decl(&mut self, version: &str, encoding: Option<&str>, standalone: Option<bool>) {
        (**self).on_xml_decl(version, encoding, standalone)
    }

    fn on_start_doctype_decl(
        &mut self,
        name: &str,
        system_id: Option<&str>,
        public_id: Option<&str>,
        has_internal_subset: bool,
    ) {
        (**self).on_start_doctype_decl(name, system_id, public_id, has_internal_subset)
    }

    fn on_end_doctype_decl(&mut self) {
        (**self).on_end_doctype_decl()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Counter {
        elements: usize,
    }

    impl XmlHandler for Counter {
        fn on_start_element(&mut self, _name: &str, _attributes: &[(&str, &str)]) {
            self.elements += 1;
        }
    }

    #[test]
    fn test_defaults_are_inert() {
        let mut counter = Counter { elements: 0 };
        counter.on_end_element("a");
        counter.on_character_data("text");
        assert!(counter.on_unknown_encoding("KOI8-R").is_none());
        let mut mask = EventMask::new();
        counter.on_post_create(&mut mask);
        assert_eq!(mask, EventMask::new());
        assert_eq!(counter.elements, 0);
    }

    fn start<H: XmlHandler>(mut handler: H) {
        handler.on_start_element("a", &[]);
    }

    #[test]
    fn test_forwarding_impls() {
        let mut counter = Counter { elements: 0 };
        start(&mut counter);
        start(&mut counter);
        assert_eq!(counter.elements, 2);

        let boxed: Box<dyn XmlHandler> = Box::new(Counter { elements: 0 });
        start(boxed);
    }
}
