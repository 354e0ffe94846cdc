//! Shared application state and placement of render batches.
//!
//! - `state`: the `AppState` injected into every handler.
//! - `dispatch`: runs a claimed batch either in the request or on a blocking
//!   worker so the request can return right away.

pub mod dispatch;
pub mod state;
