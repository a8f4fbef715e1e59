//! Core types and pipeline wiring for the binday bin-collection proxy.

/// Result assembly into the public response shape.
pub mod assemble;
/// Parsing of council date strings and relative day labels.
pub mod date;
/// Extraction of bin blocks from upstream HTML.
pub mod extract;
/// Domain models and identifiers shared by all adapters.
pub mod model;
/// Registry and helpers for plugging council adapters into the service.
pub mod plugin;
/// Traits describing the upstream adapter interface.
pub mod ports;
/// Outbound request description and transport helper.
pub mod request;
/// High-level pipeline service used by the HTTP layer.
pub mod service;

pub use assemble::*;
pub use date::*;
pub use extract::*;
pub use model::*;
pub use plugin::*;
pub use ports::*;
pub use request::*;
pub use service::*;
