//! Background work.
//!
//! - [`TaskPool`]: growable worker pool fed over a `crossbeam-channel`
//! - [`TaskHandle`]: channel-backed handle to one task's result
//! - [`RenderThreadQueue`]: closures that must run on the render thread
//!   against the live [`SceneGraph`]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread::JoinHandle;

use crossbeam_channel::{Receiver, Sender};
use parking_lot::Mutex;

use crate::scene::SceneGraph;

type Job = Box<dyn FnOnce() + Send + 'static>;

/// Handle to the result of a task spawned on a [`TaskPool`].
pub struct TaskHandle<T> {
    receiver: Receiver<T>,
}

impl<T> TaskHandle<T> {
    fn new(receiver: Receiver<T>) -> Self {
        Self { receiver }
    }

    /// Take the result if the task has finished.
    pub fn try_recv(&self) -> Option<T> {
        self.receiver.try_recv().ok()
    }

    /// Block until the task finishes.
    ///
    /// Returns `None` if the task panicked.
    pub fn recv(self) -> Option<T> {
        self.receiver.recv().ok()
    }
}

struct Shared {
    workers: AtomicUsize,
    idle: AtomicUsize,
    max_workers: usize,
}

/// A worker pool that grows on demand.
///
/// Starts with `min_workers` threads. When a task is submitted while every
/// worker is busy, one more worker is started, up to `max_workers`.
/// Dropping the pool lets queued tasks finish and joins every worker.
pub struct TaskPool {
    sender: Option<Sender<Job>>,
    receiver: Receiver<Job>,
    shared: Arc<Shared>,
    threads: Mutex<Vec<JoinHandle<()>>>,
}

impl TaskPool {
    /// Create a pool.
    pub fn new(min_workers: usize, max_workers: usize) -> Self {
        let max_workers = max_workers.max(1);
        let (sender, receiver) = crossbeam_channel::unbounded();
        let pool = Self {
            sender: Some(sender),
            receiver,
            shared: Arc::new(Shared {
                workers: AtomicUsize::new(0),
                idle: AtomicUsize::new(0),
                max_workers,
            }),
            threads: Mutex::new(Vec::new()),
        };
        for _ in 0..min_workers.min(max_workers) {
            pool.try_grow();
        }
        pool
    }

    /// Number of worker threads started so far.
    pub fn worker_count(&self) -> usize {
        self.shared.workers.load(Ordering::Acquire)
    }

    /// Run `f` on a worker.
    pub fn spawn<T, F>(&self, f: F) -> TaskHandle<T>
    where
        T: Send + 'static,
        F: FnOnce() -> T + Send + 'static,
    {
        let (tx, rx) = crossbeam_channel::bounded(1);
        let job: Job = Box::new(move || {
            let _ = tx.send(f());
        });
        if self.shared.idle.load(Ordering::Acquire) == 0 {
            self.try_grow();
        }
        if let Some(sender) = &self.sender
            && sender.send(job).is_err()
        {
            log::error!("task pool queue closed");
        }
        TaskHandle::new(rx)
    }

    fn try_grow(&self) {
        let shared = &self.shared;
        let reserved = shared
            .workers
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| {
                (n < shared.max_workers).then_some(n + 1)
            });
        let Ok(index) = reserved else {
            return;
        };
        let receiver = self.receiver.clone();
        let worker_shared = Arc::clone(shared);
        let spawned = std::thread::Builder::new()
            .name(format!("vrscene-task-{index}"))
            .spawn(move || worker_loop(&receiver, &worker_shared));
        match spawned {
            Ok(handle) => {
                log::trace!("started task worker {index}");
                self.threads.lock().push(handle);
            }
            Err(err) => {
                shared.workers.fetch_sub(1, Ordering::AcqRel);
                log::error!("failed to start task worker: {err}");
            }
        }
    }
}

impl Default for TaskPool {
    fn default() -> Self {
        let cores = std::thread::available_parallelism().map_or(1, |n| n.get());
        Self::new(1, cores)
    }
}

impl Drop for TaskPool {
    fn drop(&mut self) {
        self.sender = None;
        let current = std::thread::current().id();
        for handle in self.threads.lock().drain(..) {
            // The last reference may be released by a job on one of our own
            // workers; that worker exits once the queue is closed.
            if handle.thread().id() == current {
                continue;
            }
            if handle.join().is_err() {
                log::error!("task worker panicked");
            }
        }
    }
}

fn worker_loop(receiver: &Receiver<Job>, shared: &Shared) {
    crate::set_thread_name!("vrscene-task");
    loop {
        shared.idle.fetch_add(1, Ordering::AcqRel);
        let job = receiver.recv();
        shared.idle.fetch_sub(1, Ordering::AcqRel);
        match job {
            Ok(job) => job(),
            Err(_) => break,
        }
    }
}

type RenderJob = Box<dyn FnOnce(&mut SceneGraph) + Send + 'static>;

/// Work posted from any thread, applied on the render thread.
///
/// Cloning yields another handle to the same queue.
#[derive(Clone)]
pub struct RenderThreadQueue {
    sender: Sender<RenderJob>,
    receiver: Receiver<RenderJob>,
}

impl RenderThreadQueue {
    /// Create an empty queue.
    pub fn new() -> Self {
        let (sender, receiver) = crossbeam_channel::unbounded();
        Self { sender, receiver }
    }

    /// Queue `f` for the next [`drain`](Self::drain).
    pub fn post<F>(&self, f: F)
    where
        F: FnOnce(&mut SceneGraph) + Send + 'static,
    {
        // The queue owns a receiver, so sending cannot fail.
        let _ = self.sender.send(Box::new(f));
    }

    /// Number of queued closures.
    pub fn len(&self) -> usize {
        self.receiver.len()
    }

    /// Whether nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }

    /// Run every queued closure against `graph`, in posting order.
    pub fn drain(&self, graph: &mut SceneGraph) -> usize {
        let mut count = 0;
        while let Ok(job) = self.receiver.try_recv() {
            job(graph);
            count += 1;
        }
        count
    }
}

impl Default for RenderThreadQueue {
    fn default() -> Self {
        Self::new()
    }
}
