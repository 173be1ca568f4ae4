//! Fixed pool of worker threads, each draining its own work queue.
//!
//! Thread 0 is the control thread: configuration updates run there. Threads
//! 1..N serve traffic and own their proxy mirrors, which only they mutate.

use std::cell::Cell;
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};

use tokio::sync::{mpsc, oneshot};

use crate::agent::KvPairs;
use crate::proxy::{MirrorSet, MirrorSnapshot, Proxy, ProxyKey, ProxyMain};
use crate::work::collect::WorkCollect;

/// Index of the thread that runs configuration updates.
pub const CONTROL_THREAD: usize = 0;

thread_local! {
    static CURRENT_WORKER: Cell<Option<usize>> = const { Cell::new(None) };
}

/// Index of the pool thread running the caller, if any.
pub fn current_worker() -> Option<usize> {
    CURRENT_WORKER.with(Cell::get)
}

/// Error type for work dispatch.
#[derive(Debug, thiserror::Error)]
pub enum WorkError {
    #[error("no worker thread {0}")]
    NoSuchThread(usize),

    #[error("work queue of thread {0} is closed")]
    QueueClosed(usize),

    #[error("failed to spawn worker thread: {0}")]
    Spawn(#[source] std::io::Error),
}

/// A unit of work sent from the control path to one thread.
#[derive(Debug)]
pub enum WorkItem {
    /// Bring this thread's mirror of the proxy up to the proxy's version.
    RefreshMirror {
        proxy: Arc<Proxy>,
        collect: Arc<WorkCollect>,
    },
    /// Reconcile a whole configuration update (control thread only).
    ApplyConfig {
        update: KvPairs,
        completion: Arc<WorkCollect<Arc<ProxyMain>>>,
    },
    /// Forget this thread's mirror of a drained proxy.
    DropMirror {
        key: ProxyKey,
        collect: Arc<WorkCollect>,
    },
    /// Report this thread's mirror of a proxy.
    InspectMirror {
        key: ProxyKey,
        reply: oneshot::Sender<Option<MirrorSnapshot>>,
    },
    Stop,
}

/// Worker thread pool with one unbounded queue per thread.
#[derive(Debug)]
pub struct WorkerPool {
    senders: Vec<mpsc::UnboundedSender<WorkItem>>,
    handles: Mutex<Vec<JoinHandle<()>>>,
}

impl WorkerPool {
    /// Spawn `threads` threads; zero is normalized to one.
    pub fn start(threads: usize) -> Result<Self, WorkError> {
        let threads = threads.max(1);
        let mut senders = Vec::with_capacity(threads);
        let mut handles = Vec::with_capacity(threads);

        for index in 0..threads {
            let (tx, rx) = mpsc::unbounded_channel();
            let handle = thread::Builder::new()
                .name(format!("kvproxy-worker-{}", index))
                .spawn(move || worker_main(index, rx))
                .map_err(WorkError::Spawn)?;
            senders.push(tx);
            handles.push(handle);
        }

        tracing::info!(threads, "Worker pool started");

        Ok(Self {
            senders,
            handles: Mutex::new(handles),
        })
    }

    /// Total thread count, control thread included.
    pub fn thread_count(&self) -> usize {
        self.senders.len()
    }

    /// Enqueue one unit on a specific thread.
    pub fn submit_to(&self, thread: usize, item: WorkItem) -> Result<(), WorkError> {
        let sender = self.senders.get(thread).ok_or(WorkError::NoSuchThread(thread))?;
        sender.send(item).map_err(|_| WorkError::QueueClosed(thread))
    }

    /// Push the proxy's current configuration to every serving thread and
    /// block until all of them have applied it.
    ///
    /// Must not be called from a serving thread, which would wait on itself.
    pub fn refresh_mirrors(&self, proxy: &Arc<Proxy>) {
        self.fan_out("refresh", |collect| WorkItem::RefreshMirror {
            proxy: proxy.clone(),
            collect,
        });
    }

    /// Remove every serving thread's mirror of `key` and block until all of
    /// them are gone.
    pub fn drop_mirrors(&self, key: &ProxyKey) {
        self.fan_out("drop", |collect| WorkItem::DropMirror {
            key: key.clone(),
            collect,
        });
    }

    fn fan_out(&self, op: &'static str, make: impl Fn(Arc<WorkCollect>) -> WorkItem) {
        debug_assert!(
            current_worker().map_or(true, |i| i == CONTROL_THREAD),
            "mirror fan-out dispatched from a serving thread"
        );

        let collect = Arc::new(WorkCollect::new(self.thread_count() - 1, ()));

        for thread in 1..self.thread_count() {
            if let Err(e) = self.submit_to(thread, make(collect.clone())) {
                // The unit will never run; account for it so the barrier holds.
                tracing::warn!(thread, op, error = %e, "Mirror work not delivered");
                collect.signal_one();
            }
        }

        collect.wait();
    }

    /// Ask one thread for its mirror of a proxy.
    pub fn inspect_mirror(
        &self,
        thread: usize,
        key: &ProxyKey,
    ) -> Result<oneshot::Receiver<Option<MirrorSnapshot>>, WorkError> {
        let (reply, rx) = oneshot::channel();
        self.submit_to(
            thread,
            WorkItem::InspectMirror {
                key: key.clone(),
                reply,
            },
        )?;
        Ok(rx)
    }

    /// Stop every thread after it drains the work already queued, then join.
    pub fn shutdown(&self) {
        for sender in &self.senders {
            let _ = sender.send(WorkItem::Stop);
        }

        let handles = std::mem::take(
            &mut *self.handles.lock().unwrap_or_else(PoisonError::into_inner),
        );
        for handle in handles {
            if handle.join().is_err() {
                tracing::error!("Worker thread panicked");
            }
        }
        tracing::info!("Worker pool stopped");
    }
}

fn worker_main(index: usize, mut rx: mpsc::UnboundedReceiver<WorkItem>) {
    CURRENT_WORKER.with(|c| c.set(Some(index)));
    let mut mirrors = MirrorSet::new(index);

    while let Some(item) = rx.blocking_recv() {
        match item {
            WorkItem::RefreshMirror { proxy, collect } => {
                mirrors.refresh(&proxy);
                collect.signal_one();
            }
            WorkItem::DropMirror { key, collect } => {
                if mirrors.remove(&key).is_some() {
                    tracing::debug!(proxy = %key, thread = index, "Mirror dropped");
                }
                collect.signal_one();
            }
            WorkItem::ApplyConfig { update, completion } => {
                if let Err(e) = completion.payload().apply_config(&update) {
                    tracing::debug!(error = %e, "Configuration pass ended early");
                }
                completion.signal_one();
            }
            WorkItem::InspectMirror { key, reply } => {
                let _ = reply.send(mirrors.snapshot(&key));
            }
            WorkItem::Stop => break,
        }
    }

    tracing::debug!(thread = index, "Worker thread exiting");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_thread_count_normalized() {
        let pool = WorkerPool::start(0).unwrap();
        assert_eq!(pool.thread_count(), 1);
        pool.shutdown();
    }

    #[test]
    fn test_submit_to_unknown_thread() {
        let pool = WorkerPool::start(2).unwrap();
        let err = pool.submit_to(5, WorkItem::Stop).unwrap_err();
        assert!(matches!(err, WorkError::NoSuchThread(5)));
        pool.shutdown();
    }

    #[test]
    fn test_submit_after_shutdown() {
        let pool = WorkerPool::start(2).unwrap();
        pool.shutdown();
        let err = pool.submit_to(1, WorkItem::Stop).unwrap_err();
        assert!(matches!(err, WorkError::QueueClosed(1)));
    }

    #[test]
    fn test_drop_mirrors() {
        use crate::behavior::BehaviorPool;

        let pool = WorkerPool::start(3).unwrap();
        let proxy = Arc::new(Proxy::new(
            ProxyKey::new("p", 1),
            Some("h:1"),
            1,
            &BehaviorPool::default(),
        ));
        pool.refresh_mirrors(&proxy);
        for thread in 1..3 {
            let rx = pool.inspect_mirror(thread, proxy.key()).unwrap();
            assert!(rx.blocking_recv().unwrap().is_some());
        }

        pool.drop_mirrors(proxy.key());
        for thread in 1..3 {
            let rx = pool.inspect_mirror(thread, proxy.key()).unwrap();
            assert!(rx.blocking_recv().unwrap().is_none());
        }
        pool.shutdown();
    }

    #[test]
    fn test_inspect_unknown_mirror() {
        let pool = WorkerPool::start(3).unwrap();
        let key = ProxyKey::new("nobody", 1);
        let rx = pool.inspect_mirror(2, &key).unwrap();
        assert!(rx.blocking_recv().unwrap().is_none());
        pool.shutdown();
    }
}
