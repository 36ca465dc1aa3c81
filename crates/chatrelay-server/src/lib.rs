//! Relay server library: application state, endpoint variant table, and the
//! HTTP routes. The `chatrelay` binary wires these to a TCP listener.

pub mod routes;
pub mod state;
pub mod variants;

pub use routes::build_router;
pub use state::AppState;
