//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware stack)
//!     → security::gate (auth, decode) on <prefix>/proxy
//!     → handlers.rs (build DispatchContext, call dispatcher)
//!     → request.rs (request ID, public base URL)
//!     → status.rs (<prefix>/health, <prefix>/status)
//!     → Send to client (CORS headers added on the way out)
//! ```

pub mod handlers;
pub mod request;
pub mod server;
pub mod status;

pub use request::X_REQUEST_ID;
pub use server::{AppState, HttpServer};
