//! ResourceArc Wrappers
//!
//! A parser bound to an `EventCollector`, held by the BEAM between feeds.

use std::sync::{Mutex, MutexGuard};

use rustler::ResourceArc;

use crate::config::{EventMask, ParserConfig};
use crate::error::XmlError;
use crate::parser::XmlParser;
use crate::sax::EventCollector;

/// Wrapper for XmlParser that can be stored in a ResourceArc
pub struct ParserResource {
    pub inner: Mutex<XmlParser<EventCollector>>,
}

impl ParserResource {
    /// Create a parser whose collector enables `mask` on every create
    pub fn new(config: &ParserConfig, mask: EventMask) -> Result<Self, XmlError> {
        let mut parser = XmlParser::new(EventCollector::with_mask(mask));
        parser.create_with(config)?;
        Ok(ParserResource {
            inner: Mutex::new(parser),
        })
    }

    /// Lock the parser.
    ///
    /// # Errors
    ///
    /// Returns `"mutex_poisoned"` if a previous holder panicked.
    pub fn lock(&self) -> Result<MutexGuard<'_, XmlParser<EventCollector>>, &'static str> {
        self.inner.lock().map_err(|_| "mutex_poisoned")
    }
}

#[rustler::resource_impl]
impl rustler::Resource for ParserResource {}

/// Type alias for the ResourceArc
pub type ParserRef = ResourceArc<ParserResource>;
