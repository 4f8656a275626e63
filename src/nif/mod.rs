//! Elixir NIF bindings
//!
//! Exposes a parser whose handler collects events; each feed returns the
//! events it produced. Built with the `nif` feature.

mod resource;
mod term;

use rustler::{Binary, Encoder, Env, Error, NifResult, ResourceArc, Term};

use crate::config::{EventKind, EventMask, ParserConfig};
use crate::error::{ParseError, XmlError};
use crate::parser::{self, ParserStatus};
use resource::{ParserRef, ParserResource};
use term::{events_to_term, parse_error_to_term, str_to_binary};

fn build_config(encoding: Option<String>, namespace_separator: Option<String>) -> ParserConfig {
    let mut config = ParserConfig::new();
    if let Some(encoding) = encoding {
        config = config.with_encoding(encoding);
    }
    if let Some(c) = namespace_separator.and_then(|s| s.chars().next()) {
        config = config.with_namespace_separator(c);
    }
    config
}

/// Decode a list of event-kind atoms
fn decode_mask(kinds: Vec<Term<'_>>, default_expand: bool) -> NifResult<EventMask> {
    let mut mask = EventMask::new();
    for kind in kinds {
        let name = kind.atom_to_string()?;
        let kind = EventKind::from_name(&name).ok_or(Error::BadArg)?;
        mask.enable(kind);
    }
    mask.set_default_expand(default_expand);
    Ok(mask)
}

fn error_tuple<'a>(env: Env<'a>, code: XmlError) -> Term<'a> {
    (term::error(), (code.code(), str_to_binary(env, code.description()))).encode(env)
}

fn poisoned(_reason: &'static str) -> Error {
    Error::Term(Box::new(term::mutex_poisoned()))
}

// ============================================================================
// Parser lifecycle
// ============================================================================

/// Create a parser. Returns `{:ok, ref}` or `{:error, {code, message}}`.
///
/// `events` lists the event kinds to collect, as atoms.
#[rustler::nif]
fn parser_new<'a>(
    env: Env<'a>,
    encoding: Option<String>,
    namespace_separator: Option<String>,
    events: Vec<Term<'a>>,
    default_expand: bool,
) -> NifResult<Term<'a>> {
    let mask = decode_mask(events, default_expand)?;
    let config = build_config(encoding, namespace_separator);
    match ParserResource::new(&config, mask) {
        Ok(resource) => Ok((term::ok(), ResourceArc::new(resource)).encode(env)),
        Err(code) => Ok(error_tuple(env, code)),
    }
}

/// Replace the parser's engine with a fresh one for a new document
#[rustler::nif]
fn parser_create<'a>(
    env: Env<'a>,
    parser: ParserRef,
    encoding: Option<String>,
    namespace_separator: Option<String>,
) -> NifResult<Term<'a>> {
    let mut inner = parser.lock().map_err(poisoned)?;
    let config = build_config(encoding, namespace_separator);
    match inner.create_with(&config) {
        Ok(()) => Ok(term::ok().encode(env)),
        Err(code) => Ok(error_tuple(env, code)),
    }
}

/// Release the parser's engine. Feeding afterwards returns `{:error, :no_handle}`.
#[rustler::nif]
fn parser_destroy<'a>(env: Env<'a>, parser: ParserRef) -> NifResult<Term<'a>> {
    let mut inner = parser.lock().map_err(poisoned)?;
    inner.destroy();
    Ok(term::ok().encode(env))
}

/// Turn collection of one event kind on or off
#[rustler::nif]
fn parser_enable<'a>(env: Env<'a>, parser: ParserRef, kind: Term<'a>, on: bool) -> NifResult<Term<'a>> {
    let name = kind.atom_to_string()?;
    let kind = EventKind::from_name(&name).ok_or(Error::BadArg)?;
    let mut inner = parser.lock().map_err(poisoned)?;
    if !inner.is_created() {
        return Ok((term::error(), term::no_handle()).encode(env));
    }
    inner.enable(kind, on);
    Ok(term::ok().encode(env))
}

// ============================================================================
// Feeding
// ============================================================================

/// Feed a chunk.
///
/// Returns `{:ok, events}` or `{:error, {code, message, line, column}, events}`,
/// where `events` are the events produced before the failure.
#[rustler::nif]
fn parser_feed<'a>(env: Env<'a>, parser: ParserRef, chunk: Binary<'a>, is_final: bool) -> NifResult<Term<'a>> {
    let mut inner = parser.lock().map_err(poisoned)?;
    if !inner.is_created() {
        return Ok((term::error(), term::no_handle()).encode(env));
    }
    let result = inner.parse(chunk.as_slice(), is_final);
    let events = events_to_term(env, inner.handler_mut().take_events());
    match result {
        Ok(()) => Ok((term::ok(), events).encode(env)),
        Err(code) => {
            let err = inner.last_error().unwrap_or(ParseError {
                code,
                line: inner.current_line_number(),
                column: inner.current_column_number(),
                byte_index: inner.current_byte_index(),
            });
            Ok((term::error(), parse_error_to_term(env, &err), events).encode(env))
        }
    }
}

/// `{line, column, byte_index}` of the current event
#[rustler::nif]
fn parser_position<'a>(env: Env<'a>, parser: ParserRef) -> NifResult<Term<'a>> {
    let inner = parser.lock().map_err(poisoned)?;
    if !inner.is_created() {
        return Ok((term::error(), term::no_handle()).encode(env));
    }
    Ok((
        inner.current_line_number(),
        inner.current_column_number(),
        inner.current_byte_index(),
    )
        .encode(env))
}

/// One of `"no_handle"`, `"ready"`, `"finished"`, `"failed"`
#[rustler::nif]
fn parser_status(parser: ParserRef) -> NifResult<&'static str> {
    let inner = parser.lock().map_err(poisoned)?;
    Ok(match inner.status() {
        ParserStatus::NoHandle => "no_handle",
        ParserStatus::Ready => "ready",
        ParserStatus::Finished => "finished",
        ParserStatus::Failed => "failed",
    })
}

// ============================================================================
// Engine utilities
// ============================================================================

#[rustler::nif]
fn engine_version() -> &'static str {
    parser::engine_version()
}

#[rustler::nif]
fn engine_version_info() -> (u32, u32, u32) {
    parser::engine_version_info()
}

/// Message for a numeric error code, or `nil`
#[rustler::nif]
fn error_string(code: i32) -> Option<&'static str> {
    parser::error_string_for_code(code)
}

rustler::init!("Elixir.RustySax.Native");
