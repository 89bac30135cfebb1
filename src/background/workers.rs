//! Background job threads, one FIFO queue per job kind.

use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use parking_lot::{Condvar, Mutex};
use tracing::{debug, error};

use crate::common::Result;

/// The kinds of work that can be pushed off the command path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobKind {
    CloseFile,
    AofFsync,
    /// Freeing values unlinked by lazy deletes.
    LazyFree,
}

impl JobKind {
    pub const ALL: [JobKind; 3] = [JobKind::CloseFile, JobKind::AofFsync, JobKind::LazyFree];

    #[inline]
    fn index(self) -> usize {
        match self {
            JobKind::CloseFile => 0,
            JobKind::AofFsync => 1,
            JobKind::LazyFree => 2,
        }
    }

    fn thread_name(self) -> &'static str {
        match self {
            JobKind::CloseFile => "bio-close-file",
            JobKind::AofFsync => "bio-aof-fsync",
            JobKind::LazyFree => "bio-lazy-free",
        }
    }
}

/// A unit of background work.
pub type Job = Box<dyn FnOnce() + Send + 'static>;

struct QueueState {
    jobs: VecDeque<Job>,
    /// Queued plus in-flight jobs.
    pending: u64,
    shutdown: bool,
}

struct JobQueue {
    state: Mutex<QueueState>,
    /// Signalled when a job is pushed.
    new_job: Condvar,
    /// Signalled when a job completes.
    step: Condvar,
}

impl JobQueue {
    fn new() -> Self {
        Self {
            state: Mutex::new(QueueState {
                jobs: VecDeque::new(),
                pending: 0,
                shutdown: false,
            }),
            new_job: Condvar::new(),
            step: Condvar::new(),
        }
    }
}

/// A fixed set of worker threads, one per [`JobKind`].
///
/// Jobs of the same kind run one at a time in submission order. Different
/// kinds never block each other.
///
/// # Example
/// ```
/// use maxmem::background::{BackgroundWorkers, JobKind};
/// use std::time::Duration;
///
/// let workers = BackgroundWorkers::start().unwrap();
/// workers.submit(JobKind::LazyFree, Box::new(|| { /* drop something big */ }));
/// while workers.pending(JobKind::LazyFree) > 0 {
///     workers.wait_step(JobKind::LazyFree, Duration::from_millis(1));
/// }
/// ```
pub struct BackgroundWorkers {
    queues: Vec<Arc<JobQueue>>,
    threads: Mutex<Vec<JoinHandle<()>>>,
}

impl BackgroundWorkers {
    /// Spawn one thread per job kind.
    ///
    /// # Errors
    /// Returns `Error::Io` if a thread can't be spawned.
    pub fn start() -> Result<Self> {
        let queues: Vec<Arc<JobQueue>> = JobKind::ALL
            .iter()
            .map(|_| Arc::new(JobQueue::new()))
            .collect();

        let workers = Self {
            queues,
            threads: Mutex::new(Vec::with_capacity(JobKind::ALL.len())),
        };

        for kind in JobKind::ALL {
            let queue = Arc::clone(&workers.queues[kind.index()]);
            let handle = thread::Builder::new()
                .name(kind.thread_name().to_string())
                .spawn(move || run_jobs(kind, queue))?;
            workers.threads.lock().push(handle);
        }

        debug!("started {} background workers", JobKind::ALL.len());
        Ok(workers)
    }

    /// Queue `job` behind any other job of the same kind.
    ///
    /// After [`BackgroundWorkers::shutdown`] no thread is left to pick the
    /// job up, so it runs inline on the caller and is never counted as
    /// pending.
    pub fn submit(&self, kind: JobKind, job: Job) {
        let queue = &self.queues[kind.index()];
        let mut state = queue.state.lock();
        if state.shutdown {
            drop(state);
            debug!(?kind, "workers shut down, running job inline");
            if panic::catch_unwind(AssertUnwindSafe(job)).is_err() {
                error!(?kind, "background job panicked");
            }
            return;
        }
        state.jobs.push_back(job);
        state.pending += 1;
        queue.new_job.notify_one();
    }

    /// Number of jobs of `kind` not yet finished, including one in flight.
    pub fn pending(&self, kind: JobKind) -> u64 {
        self.queues[kind.index()].state.lock().pending
    }

    /// Wait until one job of `kind` finishes, at most `timeout`.
    ///
    /// Returns immediately if nothing is pending. Returns the pending count
    /// observed after waking.
    pub fn wait_step(&self, kind: JobKind, timeout: Duration) -> u64 {
        let queue = &self.queues[kind.index()];
        let mut state = queue.state.lock();
        if state.pending != 0 {
            queue.step.wait_for(&mut state, timeout);
        }
        state.pending
    }

    /// Drain the queues and join all threads.
    pub fn shutdown(&self) {
        for queue in &self.queues {
            queue.state.lock().shutdown = true;
            queue.new_job.notify_all();
        }

        let handles: Vec<JoinHandle<()>> = self.threads.lock().drain(..).collect();
        for handle in handles {
            if handle.join().is_err() {
                error!("background worker exited abnormally");
            }
        }
    }
}

impl Drop for BackgroundWorkers {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for BackgroundWorkers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut dbg = f.debug_struct("BackgroundWorkers");
        for kind in JobKind::ALL {
            dbg.field(kind.thread_name(), &self.pending(kind));
        }
        dbg.finish()
    }
}

fn run_jobs(kind: JobKind, queue: Arc<JobQueue>) {
    loop {
        let job = {
            let mut state = queue.state.lock();
            loop {
                if let Some(job) = state.jobs.pop_front() {
                    break job;
                }
                if state.shutdown {
                    return;
                }
                queue.new_job.wait(&mut state);
            }
        };

        if panic::catch_unwind(AssertUnwindSafe(job)).is_err() {
            error!(?kind, "background job panicked");
        }

        let mut state = queue.state.lock();
        state.pending -= 1;
        queue.step.notify_all();
    }
}
