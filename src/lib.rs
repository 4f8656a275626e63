//! RustySax - callback-dispatch XML parsing
//!
//! An incremental, push-style XML engine plus an adapter that routes its
//! events to the methods of a handler trait.
//!
//! Layers:
//! - `engine`: the push parser, calling plain function pointers on a context
//! - `XmlParser<H>`: owns an engine, installs per-kind trampolines into `H`
//! - `XmlHandler`: the overridable event methods, all no-ops by default
//! - `sax`: an `EventCollector` handler recording owned `XmlEvent`s
//! - `nif` (feature `nif`): Elixir bindings over a collecting parser
//!
//! ```
//! use rustysax::{XmlHandler, XmlParser};
//!
//! #[derive(Default)]
//! struct Names(Vec<String>);
//!
//! impl XmlHandler for Names {
//!     fn on_start_element(&mut self, name: &str, _attributes: &[(&str, &str)]) {
//!         self.0.push(name.to_string());
//!     }
//! }
//!
//! let mut parser = XmlParser::new(Names::default());
//! parser.create(None, None).unwrap();
//! parser.enable_start_element_handler(true);
//! parser.parse(b"<a><b/></a>", true).unwrap();
//! assert_eq!(parser.handler().0, ["a", "b"]);
//! ```

mod config;
pub mod engine;
mod error;
mod handler;
mod parser;
pub mod sax;

#[cfg(feature = "nif")]
mod nif;

// ============================================================================
// Public API
// ============================================================================

pub use config::{EventKind, EventMask, ParserConfig};
pub use engine::{EncodingInfo, InputContext};
pub use error::{ParseError, ReadError, XmlError};
pub use handler::XmlHandler;
pub use parser::{engine_version, engine_version_info, error_string, error_string_for_code, ParserStatus, XmlParser};
pub use sax::{EventCollector, XmlEvent};
