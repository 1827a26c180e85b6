//! Core systems for Horizon Select.
//!
//! This crate provides the plumbing shared by Horizon Select controls:
//!
//! - **Signal/Slot System**: Type-safe change notification for display consumers
//! - **Property System**: Change-detecting values for shared catalogs
//! - **Async Tasks**: Tokio task spawning with settle-able bookkeeping
//! - **Logging**: `tracing` targets and performance spans
//!
//! # Signal/Slot Example
//!
//! ```
//! use horizon_select_core::Signal;
//!
//! let value_changed = Signal::<i32>::new();
//! let conn_id = value_changed.connect(|value| {
//!     println!("Value changed to: {}", value);
//! });
//! value_changed.emit(42);
//! value_changed.disconnect(conn_id);
//! ```

pub mod async_runtime;
pub mod logging;
pub mod property;
pub mod signal;

pub use async_runtime::{AsyncRuntime, AsyncRuntimeConfig, AsyncRuntimeError, TaskTracker};
pub use logging::PerfSpan;
pub use property::Property;
pub use signal::{ConnectionGuard, ConnectionId, Signal};
