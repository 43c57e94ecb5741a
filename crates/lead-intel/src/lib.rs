//! Lead qualification intelligence for the real-estate CRM automation service.
//!
//! The [`evaluation`] module hosts the orchestrator; the remaining modules provide the
//! process configuration, error taxonomy, and tracing bootstrap shared with the API binary.

pub mod config;
pub mod error;
pub mod evaluation;
pub mod telemetry;
