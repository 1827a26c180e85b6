//! Logging and tracing facilities for Horizon Select.
//!
//! Horizon Select uses the `tracing` crate for instrumentation. To see logs,
//! install a tracing subscriber in your application:
//!
//! ```ignore
//! tracing_subscriber::fmt()
//!     .with_env_filter("horizon_select=debug")
//!     .init();
//! ```
//!
//! Every event is emitted under one of the [`targets`] so a subscriber can
//! filter a single subsystem, e.g. `horizon_select::fetch=debug`.

/// Target names for log filtering.
pub mod targets {
    /// Signal/slot system target.
    pub const SIGNAL: &str = "horizon_select_core::signal";
    /// Spawned task bookkeeping target.
    pub const TASK: &str = "horizon_select_core::task";
    /// Option store recomputation target.
    pub const STORE: &str = "horizon_select::store";
    /// Remote fetch orchestration target.
    pub const FETCH: &str = "horizon_select::fetch";
    /// Selection mutation target.
    pub const SELECTION: &str = "horizon_select::selection";
    /// Open-control registry target.
    pub const REGISTRY: &str = "horizon_select::registry";
}

/// A guard that keeps a tracing span entered until it is dropped.
///
/// Wrap expensive recomputation in a `PerfSpan` to measure it with any
/// span-timing subscriber.
#[derive(Debug)]
pub struct PerfSpan {
    _span: tracing::span::EnteredSpan,
}

impl PerfSpan {
    /// Create a new performance span.
    pub fn new(name: &'static str) -> Self {
        let span = tracing::debug_span!(target: "horizon_select::perf", "perf", operation = name);
        Self {
            _span: span.entered(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_perf_span() {
        let _span = PerfSpan::new("test_operation");
    }

    #[test]
    fn test_targets_are_namespaced() {
        for target in [targets::STORE, targets::FETCH, targets::SELECTION, targets::REGISTRY] {
            assert!(target.starts_with("horizon_select::"));
        }
    }
}
