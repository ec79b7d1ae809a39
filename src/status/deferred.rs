//! Deferred status reads executed on a dedicated worker thread
//!
//! Slow reads (pixel probes) are submitted to a [`ReadWorker`] and handed to
//! the keepers as [`Deferred`] fields. Accessing a field blocks until that
//! specific read finished. Jobs run strictly in submission order, and every job
//! still pending at a tick boundary can be cancelled without blocking.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use crate::core::error::{ReadError, Result};

/// Value a field degrades to when its read failed or was cancelled
pub trait ReadSentinel {
    fn read_error() -> Self;
}

enum DeferredState<T> {
    Ready(T),
    Pending(Receiver<std::result::Result<T, ReadError>>),
}

/// A status field whose value may still be computing
pub struct Deferred<T> {
    state: Mutex<DeferredState<T>>,
}

impl<T: Clone + ReadSentinel> Deferred<T> {
    /// An already-resolved field
    pub fn ready(value: T) -> Self {
        Self {
            state: Mutex::new(DeferredState::Ready(value)),
        }
    }

    fn pending(rx: Receiver<std::result::Result<T, ReadError>>) -> Self {
        Self {
            state: Mutex::new(DeferredState::Pending(rx)),
        }
    }

    /// Block until the value is available; failures resolve to the sentinel
    pub fn get(&self) -> T {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        let value = match &*state {
            DeferredState::Ready(value) => return value.clone(),
            DeferredState::Pending(rx) => match rx.recv() {
                Ok(Ok(value)) => value,
                Ok(Err(err)) => {
                    tracing::warn!("Status read failed: {}", err);
                    T::read_error()
                }
                Err(_) => {
                    tracing::warn!("Status read worker dropped a pending read");
                    T::read_error()
                }
            },
        };
        *state = DeferredState::Ready(value.clone());
        value
    }

    pub fn is_resolved(&self) -> bool {
        let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        matches!(&*state, DeferredState::Ready(_))
    }
}

impl<T: fmt::Debug> fmt::Debug for Deferred<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.state.try_lock().as_deref() {
            Ok(DeferredState::Ready(value)) => f.debug_tuple("Ready").field(value).finish(),
            Ok(DeferredState::Pending(_)) => f.write_str("Pending"),
            Err(_) => f.write_str("Resolving"),
        }
    }
}

type Job = Box<dyn FnOnce() + Send + 'static>;

/// Single worker thread that executes read jobs in FIFO order
pub struct ReadWorker {
    tx: Option<Sender<Job>>,
    handle: Option<JoinHandle<()>>,
    outstanding: Mutex<Vec<Arc<AtomicBool>>>,
}

impl ReadWorker {
    pub fn spawn(name: &str) -> Result<Self> {
        let (tx, rx) = mpsc::channel::<Job>();
        let span_name = name.to_string();
        let handle = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || {
                let span = tracing::debug_span!("read_worker", name = %span_name);
                let _enter = span.enter();
                for job in rx {
                    job();
                }
                tracing::debug!("Read worker exiting");
            })?;

        Ok(Self {
            tx: Some(tx),
            handle: Some(handle),
            outstanding: Mutex::new(Vec::new()),
        })
    }

    /// Queue a read; the returned field resolves once the job has run
    pub fn submit<T, F>(&self, read: F) -> Deferred<T>
    where
        T: Clone + ReadSentinel + Send + 'static,
        F: FnOnce() -> std::result::Result<T, ReadError> + Send + 'static,
    {
        let Some(worker_tx) = self.tx.as_ref() else {
            return Deferred::ready(T::read_error());
        };

        let (tx, rx) = mpsc::channel();
        let cancelled = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&cancelled);
        let job: Job = Box::new(move || {
            let result = if flag.load(Ordering::Acquire) {
                Err(ReadError::Cancelled)
            } else {
                read()
            };
            let _ = tx.send(result);
        });

        if worker_tx.send(job).is_err() {
            tracing::warn!("Read worker is gone, field degrades to its error value");
            return Deferred::ready(T::read_error());
        }

        self.outstanding
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(cancelled);
        Deferred::pending(rx)
    }

    /// Cancel every read submitted since the previous call, without blocking
    pub fn cancel_pending(&self) {
        let mut outstanding = self.outstanding.lock().unwrap_or_else(|e| e.into_inner());
        for flag in outstanding.drain(..) {
            flag.store(true, Ordering::Release);
        }
    }

    /// Stop accepting jobs and join the worker thread
    pub fn shutdown(&mut self) {
        self.tx.take();
        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle.join() {
                tracing::error!("Read worker thread panicked: {:?}", e);
            }
        }
    }
}

impl Drop for ReadWorker {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use std::time::Duration;

    #[derive(Debug, Clone, PartialEq)]
    struct Reading(i32);

    impl ReadSentinel for Reading {
        fn read_error() -> Self {
            Reading(-1)
        }
    }

    #[test]
    fn test_ready_field_resolves_immediately() {
        let field = Deferred::ready(Reading(3));
        assert!(field.is_resolved());
        assert_eq!(field.get(), Reading(3));
    }

    #[test]
    fn test_jobs_run_in_submission_order() {
        let worker = ReadWorker::spawn("test-reads").unwrap();
        let order = Arc::new(Mutex::new(Vec::new()));

        let fields: Vec<Deferred<Reading>> = (0..5)
            .map(|i| {
                let order = Arc::clone(&order);
                worker.submit(move || {
                    order.lock().unwrap().push(i);
                    Ok(Reading(i))
                })
            })
            .collect();

        for (i, field) in fields.iter().enumerate().rev() {
            assert_eq!(field.get(), Reading(i as i32));
        }
        assert_eq!(*order.lock().unwrap(), vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_failed_read_resolves_to_sentinel() {
        let worker = ReadWorker::spawn("test-reads").unwrap();
        let field: Deferred<Reading> =
            worker.submit(|| Err(ReadError::Failed("pixel out of bounds".into())));
        assert_eq!(field.get(), Reading(-1));
        // Cached after the first access
        assert!(field.is_resolved());
        assert_eq!(field.get(), Reading(-1));
    }

    #[test]
    fn test_cancel_skips_jobs_not_started() {
        let worker = ReadWorker::spawn("test-reads").unwrap();
        let (gate_tx, gate_rx) = mpsc::channel::<()>();
        let (started_tx, started_rx) = mpsc::channel::<()>();

        // Blocks the worker until the gate opens
        let first: Deferred<Reading> = worker.submit(move || {
            let _ = started_tx.send(());
            let _ = gate_rx.recv_timeout(Duration::from_secs(5));
            Ok(Reading(1))
        });
        let ran = Arc::new(AtomicBool::new(false));
        let ran_flag = Arc::clone(&ran);
        let second: Deferred<Reading> = worker.submit(move || {
            ran_flag.store(true, Ordering::SeqCst);
            Ok(Reading(2))
        });

        started_rx.recv_timeout(Duration::from_secs(5)).unwrap();
        worker.cancel_pending();
        gate_tx.send(()).unwrap();

        // The in-flight read still completes, the queued one is skipped
        assert_eq!(first.get(), Reading(1));
        assert_eq!(second.get(), Reading(-1));
        assert!(!ran.load(Ordering::SeqCst));
    }

    #[test]
    fn test_submit_after_shutdown_degrades() {
        let mut worker = ReadWorker::spawn("test-reads").unwrap();
        worker.shutdown();
        let field: Deferred<Reading> = worker.submit(|| Ok(Reading(9)));
        assert_eq!(field.get(), Reading(-1));
    }
}
