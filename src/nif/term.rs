//! Elixir Term Conversion Utilities
//!
//! Converts collected events and errors to Elixir terms.

use rustler::types::atom::nil;
use rustler::{Encoder, Env, NewBinary, Term};

use crate::error::ParseError;
use crate::sax::XmlEvent;

// Pre-defined atoms for efficiency - created once at compile time
rustler::atoms! {
    ok,
    error,
    post_create,
    start_element,
    end_element,
    character_data,
    processing_instruction,
    comment,
    start_cdata_section,
    end_cdata_section,
    default_event = "default",
    unknown_encoding,
    start_namespace_decl,
    end_namespace_decl,
    xml_decl,
    start_doctype_decl,
    end_doctype_decl,
    no_handle,
    mutex_poisoned,
}

/// Convert collected events to an Elixir list
pub fn events_to_term<'a>(env: Env<'a>, events: Vec<XmlEvent>) -> Term<'a> {
    let mut list = Term::list_new_empty(env);
    for event in events.into_iter().rev() {
        list = list.list_prepend(event_to_term(env, event));
    }
    list
}

/// Convert a single event to an Elixir term
pub fn event_to_term<'a>(env: Env<'a>, event: XmlEvent) -> Term<'a> {
    match event {
        XmlEvent::PostCreate => post_create().encode(env),
        XmlEvent::StartElement { name, attributes } => {
            let mut attrs = Term::list_new_empty(env);
            for (k, v) in attributes.iter().rev() {
                let tuple = (str_to_binary(env, k), str_to_binary(env, v));
                attrs = attrs.list_prepend(tuple.encode(env));
            }
            (start_element(), str_to_binary(env, &name), attrs).encode(env)
        }
        XmlEvent::EndElement(name) => (end_element(), str_to_binary(env, &name)).encode(env),
        XmlEvent::CharacterData(text) => (character_data(), str_to_binary(env, &text)).encode(env),
        XmlEvent::ProcessingInstruction { target, data } => (
            processing_instruction(),
            str_to_binary(env, &target),
            str_to_binary(env, &data),
        )
            .encode(env),
        XmlEvent::Comment(text) => (comment(), str_to_binary(env, &text)).encode(env),
        XmlEvent::StartCdataSection => start_cdata_section().encode(env),
        XmlEvent::EndCdataSection => end_cdata_section().encode(env),
        XmlEvent::Default(raw) => (default_event(), str_to_binary(env, &raw)).encode(env),
        XmlEvent::UnknownEncoding(name) => (unknown_encoding(), str_to_binary(env, &name)).encode(env),
        XmlEvent::StartNamespaceDecl { prefix, uri } => (
            start_namespace_decl(),
            opt_to_binary(env, prefix.as_deref()),
            opt_to_binary(env, uri.as_deref()),
        )
            .encode(env),
        XmlEvent::EndNamespaceDecl(prefix) => {
            (end_namespace_decl(), opt_to_binary(env, prefix.as_deref())).encode(env)
        }
        XmlEvent::XmlDecl {
            version,
            encoding,
            standalone,
        } => (
            xml_decl(),
            str_to_binary(env, &version),
            opt_to_binary(env, encoding.as_deref()),
            standalone.encode(env),
        )
            .encode(env),
        XmlEvent::StartDoctypeDecl {
            name,
            system_id,
            public_id,
            has_internal_subset,
        } => (
            start_doctype_decl(),
            str_to_binary(env, &name),
            opt_to_binary(env, system_id.as_deref()),
            opt_to_binary(env, public_id.as_deref()),
            has_internal_subset,
        )
            .encode(env),
        XmlEvent::EndDoctypeDecl => end_doctype_decl().encode(env),
    }
}

/// `{code, message, line, column}`
pub fn parse_error_to_term<'a>(env: Env<'a>, err: &ParseError) -> Term<'a> {
    (
        err.code.code(),
        str_to_binary(env, err.code.description()),
        err.line,
        err.column,
    )
        .encode(env)
}

/// Convert a string to a binary term (more efficient than .encode())
#[inline]
pub fn str_to_binary<'a>(env: Env<'a>, s: &str) -> Term<'a> {
    let bytes = s.as_bytes();
    let mut binary = NewBinary::new(env, bytes.len());
    binary.as_mut_slice().copy_from_slice(bytes);
    binary.into()
}

#[inline]
fn opt_to_binary<'a>(env: Env<'a>, s: Option<&str>) -> Term<'a> {
    match s {
        Some(s) => str_to_binary(env, s),
        None => nil().encode(env),
    }
}
