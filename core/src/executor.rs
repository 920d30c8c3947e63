//! Selection of the thread pool the kernels run on.
use std::cell::RefCell;
use std::sync::{Arc, Mutex};

use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};

use crate::errors::LrnResult;

#[derive(Debug, Clone, Default)]
pub enum Executor {
    #[default]
    SingleThread,
    MultiThread(Arc<ThreadPool>),
}

impl Executor {
    pub fn multithread(n: usize) -> LrnResult<Executor> {
        Executor::multithread_with_name(n, "lrnorm-default")
    }

    pub fn multithread_with_name(n: usize, name: &str) -> LrnResult<Executor> {
        let name = name.to_string();
        let pool = ThreadPoolBuilder::new()
            .thread_name(move |n| format!("{name}-{n}"))
            .num_threads(n)
            .build()?;
        Ok(Executor::MultiThread(Arc::new(pool)))
    }

    /// Run `f` on every `chunk`-sized slice of `data`, passing the chunk index.
    ///
    /// `data.len()` must be a multiple of `chunk`. Chunks are independent, so
    /// the result does not depend on the executor.
    pub fn for_each_chunk_mut<T, F>(&self, data: &mut [T], chunk: usize, f: F)
    where
        T: Send,
        F: Fn(usize, &mut [T]) + Send + Sync,
    {
        if data.is_empty() || chunk == 0 {
            return;
        }
        match self {
            Executor::SingleThread => {
                data.chunks_mut(chunk).enumerate().for_each(|(ix, c)| f(ix, c))
            }
            Executor::MultiThread(pool) => pool.install(|| {
                data.par_chunks_mut(chunk).enumerate().for_each(|(ix, c)| f(ix, c))
            }),
        }
    }
}

static DEFAULT_EXECUTOR: Mutex<Executor> = Mutex::new(Executor::SingleThread);

thread_local! {
    static TLS_EXECUTOR_OVERRIDE: RefCell<Option<Executor>> = Default::default();
}

pub fn current_executor() -> Executor {
    if let Some(over_ride) = TLS_EXECUTOR_OVERRIDE.with_borrow(|tls| tls.clone()) {
        over_ride
    } else {
        DEFAULT_EXECUTOR.lock().map(|e| e.clone()).unwrap_or_default()
    }
}

pub fn set_default_executor(executor: Executor) {
    match DEFAULT_EXECUTOR.lock() {
        Ok(mut e) => *e = executor,
        Err(poisoned) => *poisoned.into_inner() = executor,
    }
}

/// Restores the previous thread-local executor when dropped, even on unwind.
struct ScopeGuard(Option<Executor>);

impl Drop for ScopeGuard {
    fn drop(&mut self) {
        TLS_EXECUTOR_OVERRIDE.set(self.0.take());
    }
}

pub fn multithread_scope<R, F: FnOnce() -> R>(pool: Executor, f: F) -> R {
    let _guard = ScopeGuard(TLS_EXECUTOR_OVERRIDE.replace(Some(pool)));
    f()
}
