//! Observability module providing structured logging.
//!
//! Formats are pretty, compact or JSON, selected through
//! `[observability.logging]`.

mod tracing_init;

pub use tracing_init::*;
