//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming proxy request:
//!     → gate.rs (auth code, query decode, header bag cap, target block)
//!     → dispatch
//! Every response:
//!     → cors.rs (Access-Control-* headers)
//! ```
//!
//! # Design Decisions
//! - Fail closed: no origin fetch happens unless every gate check passes
//! - No trust in client input

pub mod cors;
pub mod gate;
pub mod targets;

pub use gate::{authorize, gate_middleware, Gate};
