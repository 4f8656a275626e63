//! Event collection
//!
//! Owned event records for handlers that want to keep what they saw instead
//! of reacting inline.
//!
//! ## Architecture
//!
//! ```text
//! XmlParser ---> EventCollector (XmlHandler) ---> XmlEvent[]
//!                                                    |
//!                                                    v
//!                                            Elixir terms (via NIF)
//! ```
//!
//! `EventCollector` enables the kinds in its mask from `on_post_create`, so a
//! freshly created parser reports exactly those kinds.

pub mod collector;
pub mod events;

pub use collector::EventCollector;
pub use events::XmlEvent;
