//! Worker pools and the execution context carried by every stream.
//!
//! The engine never owns a process-wide pool. A parallel stream carries an
//! [`ExecutionContext`] holding an executor handle plus the
//! [`ExecutionConfig`] in force for that stream; deriving a stream copies the
//! context, and `parallel_*`/`sequential` derive a stream with a different one.

use std::fmt;
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::FutureExt;
use once_cell::sync::OnceCell;
use tokio::runtime::{Builder, Handle, Runtime};

use crate::error::{StreamError, StreamResult};
use crate::stream_configuration::ExecutionConfig;

/// One unit of work submitted to an executor.
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// Completes once the submitted task has finished running.
pub type TaskHandle = BoxFuture<'static, StreamResult<()>>;

/// The narrow interface the engine needs from an application-supplied pool:
/// submit one unit of work and get a handle to await its completion.
pub trait TaskExecutor: Send + Sync {
    fn submit(&self, task: Task) -> StreamResult<TaskHandle>;
}

// ================================
// WorkerPool
// ================================

struct OwnedRuntime(Option<Runtime>);

impl Drop for OwnedRuntime {
    fn drop(&mut self) {
        // The last stream holding the pool may be dropped from async code.
        if let Some(runtime) = self.0.take() {
            runtime.shutdown_background();
        }
    }
}

enum Backend {
    Owned {
        threads: usize,
        runtime: OnceCell<OwnedRuntime>,
    },
    Borrowed(Handle),
}

/// Default [`TaskExecutor`] running tasks on tokio's blocking pool.
///
/// A pool created with [`WorkerPool::new`] builds its runtime on first use
/// and caps the blocking pool at the requested thread count.
/// [`WorkerPool::from_handle`] runs on a runtime owned by the application.
pub struct WorkerPool {
    backend: Backend,
}

impl WorkerPool {
    pub fn new(threads: usize) -> Self {
        Self {
            backend: Backend::Owned {
                threads: threads.max(1),
                runtime: OnceCell::new(),
            },
        }
    }

    pub fn from_handle(handle: Handle) -> Self {
        Self {
            backend: Backend::Borrowed(handle),
        }
    }

    fn handle(&self) -> StreamResult<Handle> {
        match &self.backend {
            Backend::Owned { threads, runtime } => {
                let owned = runtime.get_or_try_init(|| build_runtime(*threads))?;
                owned
                    .0
                    .as_ref()
                    .map(|rt| rt.handle().clone())
                    .ok_or_else(|| StreamError::Executor("worker pool is shut down".to_string()))
            }
            Backend::Borrowed(handle) => Ok(handle.clone()),
        }
    }
}

fn build_runtime(threads: usize) -> StreamResult<OwnedRuntime> {
    let runtime = Builder::new_multi_thread()
        .worker_threads(1)
        .max_blocking_threads(threads)
        .thread_name("rstream-worker")
        .build()?;
    log::debug!("started worker pool with {} blocking threads", threads);
    Ok(OwnedRuntime(Some(runtime)))
}

impl TaskExecutor for WorkerPool {
    fn submit(&self, task: Task) -> StreamResult<TaskHandle> {
        let join = self.handle()?.spawn_blocking(task);
        Ok(async move {
            join.await.map_err(|e| {
                if e.is_panic() {
                    StreamError::from_panic(e.into_panic())
                } else {
                    StreamError::Executor(e.to_string())
                }
            })
        }
        .boxed())
    }
}

impl fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.backend {
            Backend::Owned { threads, runtime } => f
                .debug_struct("WorkerPool")
                .field("threads", threads)
                .field("started", &runtime.get().is_some())
                .finish(),
            Backend::Borrowed(_) => f.debug_struct("WorkerPool").field("borrowed", &true).finish(),
        }
    }
}

// ================================
// ExecutionContext
// ================================

/// Executor handle plus the configuration a parallel stream runs under.
#[derive(Clone)]
pub struct ExecutionContext {
    executor: Arc<dyn TaskExecutor>,
    config: ExecutionConfig,
}

impl ExecutionContext {
    pub fn new(executor: Arc<dyn TaskExecutor>, config: ExecutionConfig) -> Self {
        Self { executor, config }
    }

    /// Context backed by a fresh [`WorkerPool`] sized to the configuration.
    pub fn with_config(config: ExecutionConfig) -> Self {
        let pool = WorkerPool::new(config.max_threads);
        Self::new(Arc::new(pool), config)
    }

    pub fn config(&self) -> &ExecutionConfig {
        &self.config
    }

    pub fn executor(&self) -> &Arc<dyn TaskExecutor> {
        &self.executor
    }

    /// Same executor, different configuration.
    pub(crate) fn reconfigured(&self, config: ExecutionConfig) -> Self {
        Self {
            executor: Arc::clone(&self.executor),
            config,
        }
    }
}

impl fmt::Debug for ExecutionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutionContext")
            .field("config", &self.config)
            .field("executor", &"Arc<dyn TaskExecutor>")
            .finish()
    }
}
