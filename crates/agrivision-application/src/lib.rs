//! Application layer: stateful coordinators between the core capabilities
//! and the presentation surface.
//!
//! - [`session_store`]: owns the auth state machine and notifies observers
//! - [`dashboard_controller`]: the single synchronization point between the
//!   change feed and the rendered dashboard state

pub mod dashboard_controller;
pub mod session_store;

pub use dashboard_controller::DashboardController;
pub use session_store::{SessionStore, Subscription};
