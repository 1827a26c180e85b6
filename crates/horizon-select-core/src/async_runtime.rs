//! Async runtime integration for Horizon Select.
//!
//! Store mutators are synchronous; the network-shaped refinement they trigger
//! (page fetches, selection resolution, deferred flag resets) is spawned on
//! tokio. This module provides:
//!
//! - [`AsyncRuntime`]: access to a runtime handle, preferring the ambient tokio
//!   runtime and falling back to a lazily created global one.
//! - [`TaskTracker`]: spawns tasks on that handle and remembers their join
//!   handles, so a host (or a test) can wait until all spawned work settled.
//!
//! # Example
//!
//! ```no_run
//! use horizon_select_core::TaskTracker;
//!
//! # async fn demo() {
//! let tracker = TaskTracker::new();
//! tracker.spawn(async {
//!     // background refinement
//! });
//! tracker.wait_idle().await;
//! # }
//! ```

use std::future::Future;
use std::sync::OnceLock;

use parking_lot::Mutex;
use tokio::runtime::{Builder, Handle, Runtime};
use tokio::task::JoinHandle;

use crate::logging::targets;

/// Global fallback runtime instance.
static GLOBAL_RUNTIME: OnceLock<AsyncRuntime> = OnceLock::new();

/// Errors that can occur when building an async runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AsyncRuntimeError {
    /// The tokio runtime could not be created.
    CreationFailed(String),
}

impl std::fmt::Display for AsyncRuntimeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CreationFailed(msg) => write!(f, "Failed to create async runtime: {msg}"),
        }
    }
}

impl std::error::Error for AsyncRuntimeError {}

/// Configuration for the fallback runtime.
#[derive(Debug, Clone)]
pub struct AsyncRuntimeConfig {
    /// Number of worker threads. Defaults to the number of CPU cores.
    pub worker_threads: Option<usize>,
    /// Name prefix for runtime threads.
    pub thread_name: String,
}

impl Default for AsyncRuntimeConfig {
    fn default() -> Self {
        Self {
            worker_threads: None,
            thread_name: "horizon-select".to_string(),
        }
    }
}

impl AsyncRuntimeConfig {
    /// Set the number of worker threads.
    pub fn with_worker_threads(mut self, count: usize) -> Self {
        self.worker_threads = Some(count);
        self
    }

    /// Set the thread name prefix.
    pub fn with_thread_name(mut self, name: impl Into<String>) -> Self {
        self.thread_name = name.into();
        self
    }
}

/// An owned multi-threaded tokio runtime.
#[derive(Debug)]
pub struct AsyncRuntime {
    runtime: Runtime,
}

impl AsyncRuntime {
    /// Create a new runtime with the given configuration.
    pub fn new(config: AsyncRuntimeConfig) -> Result<Self, AsyncRuntimeError> {
        let mut builder = Builder::new_multi_thread();
        builder.thread_name(&config.thread_name).enable_time();
        if let Some(workers) = config.worker_threads {
            builder.worker_threads(workers);
        }
        let runtime = builder
            .build()
            .map_err(|e| AsyncRuntimeError::CreationFailed(e.to_string()))?;
        Ok(Self { runtime })
    }

    /// Get the global fallback runtime, creating it on first use.
    ///
    /// # Panics
    ///
    /// Panics if the operating system refuses to start the runtime threads.
    pub fn global() -> &'static AsyncRuntime {
        GLOBAL_RUNTIME.get_or_init(|| {
            AsyncRuntime::new(AsyncRuntimeConfig::default())
                .expect("Failed to create global async runtime")
        })
    }

    /// The handle of this runtime.
    pub fn handle(&self) -> &Handle {
        self.runtime.handle()
    }

    /// The handle to spawn on from the calling context.
    ///
    /// Returns the ambient runtime when called from inside tokio, otherwise
    /// the global fallback runtime.
    pub fn current_handle() -> Handle {
        Handle::try_current().unwrap_or_else(|_| Self::global().handle().clone())
    }
}

/// Spawns tasks and keeps their join handles until they are awaited.
#[derive(Debug)]
pub struct TaskTracker {
    handle: Handle,
    pending: Mutex<Vec<JoinHandle<()>>>,
}

impl Default for TaskTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskTracker {
    /// Create a tracker spawning on [`AsyncRuntime::current_handle`].
    pub fn new() -> Self {
        Self::with_handle(AsyncRuntime::current_handle())
    }

    /// Create a tracker spawning on an explicit runtime handle.
    pub fn with_handle(handle: Handle) -> Self {
        Self {
            handle,
            pending: Mutex::new(Vec::new()),
        }
    }

    /// Spawn a task and track it.
    pub fn spawn<F>(&self, future: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let join = self.handle.spawn(future);
        let mut pending = self.pending.lock();
        pending.retain(|handle| !handle.is_finished());
        pending.push(join);
        tracing::trace!(target: targets::TASK, pending = pending.len(), "spawned task");
    }

    /// Number of tracked tasks that have not finished yet.
    pub fn active_count(&self) -> usize {
        self.pending
            .lock()
            .iter()
            .filter(|handle| !handle.is_finished())
            .count()
    }

    /// Wait until every tracked task, including tasks spawned by tracked
    /// tasks while waiting, has finished.
    pub async fn wait_idle(&self) {
        loop {
            let batch = std::mem::take(&mut *self.pending.lock());
            if batch.is_empty() {
                break;
            }
            for handle in batch {
                if let Err(err) = handle.await {
                    tracing::warn!(target: targets::TASK, "tracked task failed: {err}");
                }
            }
        }
    }
}
