//! Fixed-size worker pool.
//!
//! Workers pull boxed jobs from an unbounded crossbeam channel. A panicking
//! job is logged and the worker moves on.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::thread::{self, JoinHandle};

use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::Mutex;

use crate::error::{IndexError, Result};

pub type Job = Box<dyn FnOnce() + Send + 'static>;

pub struct WorkerPool {
    sender: Mutex<Option<Sender<Job>>>,
    receiver: Receiver<Job>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    size: usize,
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool")
            .field("size", &self.size)
            .field("queued", &self.queued())
            .finish()
    }
}

impl WorkerPool {
    pub fn new(size: usize) -> Result<Self> {
        if size == 0 {
            return Err(IndexError::InvalidConfig(
                "worker pool needs at least one thread".to_string(),
            ));
        }
        let (sender, receiver) = unbounded::<Job>();
        let mut workers = Vec::with_capacity(size);
        for id in 0..size {
            let jobs = receiver.clone();
            let worker = thread::Builder::new()
                .name(format!("wordindex-worker-{id}"))
                .spawn(move || worker_loop(jobs))
                .map_err(|error| {
                    IndexError::Internal(format!("failed to spawn worker {id}: {error}"))
                })?;
            workers.push(worker);
        }
        Ok(Self {
            sender: Mutex::new(Some(sender)),
            receiver,
            workers: Mutex::new(workers),
            size,
        })
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Jobs waiting for a worker.
    pub fn queued(&self) -> usize {
        self.receiver.len()
    }

    /// Queues `job`. Fails with `Terminated` after shutdown.
    pub fn execute(&self, job: Job) -> Result<()> {
        let sender = self.sender.lock();
        let Some(sender) = sender.as_ref() else {
            return Err(IndexError::Terminated);
        };
        sender.send(job).map_err(|_| IndexError::Terminated)
    }

    /// Stops accepting jobs, discards the queued ones and joins the workers.
    /// Jobs already running are allowed to finish. Returns the number of
    /// discarded jobs.
    pub fn shutdown(&self) -> usize {
        drop(self.sender.lock().take());
        let discarded = self.receiver.try_iter().count();

        let workers: Vec<JoinHandle<()>> = self.workers.lock().drain(..).collect();
        let current = thread::current().id();
        for worker in workers {
            if worker.thread().id() == current {
                continue;
            }
            if worker.join().is_err() {
                log::error!("index worker exited abnormally");
            }
        }
        discarded
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn worker_loop(jobs: Receiver<Job>) {
    while let Ok(job) = jobs.recv() {
        if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(job)) {
            log::error!("index task panicked: {}", panic_message(payload.as_ref()));
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "unknown panic"
    }
}
