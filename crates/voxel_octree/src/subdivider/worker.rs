//! AdaptiveSubdivider - background workers that split leaves on demand.
//!
//! ```text
//!  rays ──try_send──► [bounded queue] ──► dispatcher ──spawn──► rayon pool
//!                                            ▲                     │
//!                          shutdown ─────────┘         subdivide + fill
//! ```
//!
//! The dispatcher thread only moves requests from the queue into the pool.
//! Dropping the subdivider closes the shutdown channel; the dispatcher then
//! discards whatever is still queued and exits.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam_channel::{bounded, select, Receiver, Sender};
use web_time::Instant;

use crate::bricks::BrickManager;
use crate::error::{OctreeError, Result};
use crate::octree::Octree;
use crate::oracle::FractalOracle;

use super::exposed::fill_exposed;
use super::subdivide::{subdivide, SubdivisionOutcome};
use super::{QueueCounters, SubdivisionQueue, SubdivisionRequest, DEFAULT_QUEUE_CAPACITY};

/// Worker pool settings.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SubdividerConfig {
  /// Pool size; 0 lets rayon pick one thread per core.
  pub threads: usize,
  /// Bound of the request queue.
  pub queue_capacity: usize,
  /// Run [`fill_exposed`] after every successful split.
  pub fill_exposed: bool,
}

impl Default for SubdividerConfig {
  fn default() -> Self {
    Self {
      threads: 0,
      queue_capacity: DEFAULT_QUEUE_CAPACITY,
      fill_exposed: false,
    }
  }
}

#[derive(Default)]
struct WorkCounters {
  processed: AtomicU64,
  subdivided: AtomicU64,
  emptied: AtomicU64,
  skipped: AtomicU64,
  failed: AtomicU64,
  oracle_failures: AtomicU64,
  exposed_filled: AtomicU64,
}

/// Snapshot of the subdivider's counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SubdivisionStats {
  pub processed: u64,
  pub subdivided: u64,
  pub emptied: u64,
  pub skipped: u64,
  /// Requests aborted by a tree error (arena full, broken links).
  pub failed: u64,
  pub oracle_failures: u64,
  pub exposed_filled: u64,
  /// Accepted and not yet finished.
  pub pending: u64,
  /// Refused because the queue was full.
  pub dropped: u64,
}

/// Everything a pool job needs.
struct WorkContext {
  tree: Arc<Octree>,
  oracle: Arc<dyn FractalOracle>,
  bricks: Arc<BrickManager>,
  fill_exposed: bool,
  counters: Arc<WorkCounters>,
  queue: Arc<QueueCounters>,
}

/// Decrements the pending count once a request is fully handled.
struct PendingGuard<'a>(&'a AtomicU64);

impl Drop for PendingGuard<'_> {
  fn drop(&mut self) {
    self.0.fetch_sub(1, Ordering::AcqRel);
  }
}

impl WorkContext {
  fn process(&self, request: SubdivisionRequest) {
    let _pending = PendingGuard(&self.queue.pending);
    self.counters.processed.fetch_add(1, Ordering::Relaxed);

    match subdivide(&self.tree, &*self.oracle, &self.bricks, request) {
      Ok(SubdivisionOutcome::Subdivided { bricked }) => {
        self.counters.subdivided.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(node = ?request.node, bricked, "subdivided");
        if self.fill_exposed {
          match fill_exposed(&self.tree, &*self.oracle, &self.bricks, request) {
            Ok(filled) => {
              self.counters.exposed_filled.fetch_add(u64::from(filled), Ordering::Relaxed);
            }
            Err(err) => self.record_error(request, err),
          }
        }
      }
      Ok(SubdivisionOutcome::Emptied { collapsed_ancestors }) => {
        self.counters.emptied.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(node = ?request.node, collapsed_ancestors, "leaf turned out empty");
      }
      Ok(SubdivisionOutcome::Skipped(reason)) => {
        self.counters.skipped.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(node = ?request.node, ?reason, "subdivision skipped");
      }
      Err(err) => self.record_error(request, err),
    }
  }

  fn record_error(&self, request: SubdivisionRequest, err: OctreeError) {
    match err {
      OctreeError::Oracle(err) => {
        self.counters.oracle_failures.fetch_add(1, Ordering::Relaxed);
        tracing::warn!(node = ?request.node, error = %err, "oracle failed, leaf kept unsplit");
      }
      err => {
        self.counters.failed.fetch_add(1, Ordering::Relaxed);
        tracing::error!(node = ?request.node, error = %err, "subdivision failed");
      }
    }
  }
}

/// Owner of the subdivision dispatcher and worker pool.
pub struct AdaptiveSubdivider {
  shutdown: Option<Sender<()>>,
  dispatcher: Option<JoinHandle<()>>,
  counters: Arc<WorkCounters>,
  queue: Arc<QueueCounters>,
  threads: usize,
}

impl AdaptiveSubdivider {
  /// Start the dispatcher and pool. Returns the subdivider and the producer
  /// handle rays submit to.
  pub fn spawn(
    tree: Arc<Octree>,
    oracle: Arc<dyn FractalOracle>,
    bricks: Arc<BrickManager>,
    config: SubdividerConfig,
  ) -> Result<(Self, SubdivisionQueue)> {
    let pool = rayon::ThreadPoolBuilder::new()
      .num_threads(config.threads)
      .thread_name(|i| format!("subdivide-{i}"))
      .build()
      .map_err(|source| OctreeError::ThreadPool {
        pool: "subdivision",
        source,
      })?;
    let threads = pool.current_num_threads();

    let (request_tx, request_rx) = bounded(config.queue_capacity.max(1));
    let (shutdown_tx, shutdown_rx) = bounded::<()>(1);
    let queue = Arc::new(QueueCounters::default());
    let counters = Arc::new(WorkCounters::default());
    let context = Arc::new(WorkContext {
      tree,
      oracle,
      bricks,
      fill_exposed: config.fill_exposed,
      counters: Arc::clone(&counters),
      queue: Arc::clone(&queue),
    });

    let dispatcher = std::thread::Builder::new()
      .name("subdivide-dispatch".into())
      .spawn(move || dispatch(pool, request_rx, shutdown_rx, context))
      .map_err(|source| OctreeError::Spawn {
        thread: "subdivision dispatcher",
        source,
      })?;

    tracing::debug!(threads, capacity = config.queue_capacity, "subdivider started");
    Ok((
      Self {
        shutdown: Some(shutdown_tx),
        dispatcher: Some(dispatcher),
        counters,
        queue: Arc::clone(&queue),
        threads,
      },
      SubdivisionQueue::new(request_tx, queue),
    ))
  }

  /// Worker threads in the pool.
  pub fn threads(&self) -> usize {
    self.threads
  }

  /// Requests accepted and not yet finished.
  pub fn pending(&self) -> u64 {
    self.queue.pending.load(Ordering::Acquire)
  }

  pub fn stats(&self) -> SubdivisionStats {
    let c = &self.counters;
    SubdivisionStats {
      processed: c.processed.load(Ordering::Relaxed),
      subdivided: c.subdivided.load(Ordering::Relaxed),
      emptied: c.emptied.load(Ordering::Relaxed),
      skipped: c.skipped.load(Ordering::Relaxed),
      failed: c.failed.load(Ordering::Relaxed),
      oracle_failures: c.oracle_failures.load(Ordering::Relaxed),
      exposed_filled: c.exposed_filled.load(Ordering::Relaxed),
      pending: self.pending(),
      dropped: self.queue.dropped.load(Ordering::Relaxed),
    }
  }

  /// Block until every accepted request has been processed, or `timeout`
  /// passes. Returns true if the queue drained.
  pub fn wait_idle(&self, timeout: Duration) -> bool {
    let deadline = Instant::now() + timeout;
    loop {
      if self.pending() == 0 {
        return true;
      }
      if Instant::now() >= deadline {
        return false;
      }
      std::thread::sleep(Duration::from_millis(1));
    }
  }
}

impl Drop for AdaptiveSubdivider {
  fn drop(&mut self) {
    // Disconnecting the shutdown channel wakes the dispatcher.
    self.shutdown.take();
    if let Some(handle) = self.dispatcher.take() {
      if handle.join().is_err() {
        tracing::error!("subdivision dispatcher panicked");
      }
    }
  }
}

fn dispatch(
  pool: rayon::ThreadPool,
  requests: Receiver<SubdivisionRequest>,
  shutdown: Receiver<()>,
  context: Arc<WorkContext>,
) {
  loop {
    select! {
      recv(requests) -> msg => match msg {
        Ok(request) => {
          let context = Arc::clone(&context);
          pool.spawn(move || context.process(request));
        }
        Err(_) => break,
      },
      recv(shutdown) -> _ => break,
    }
  }

  let mut discarded = 0usize;
  for request in requests.try_iter() {
    context.tree.clear_queued(request.node);
    context.queue.pending.fetch_sub(1, Ordering::AcqRel);
    discarded += 1;
  }
  tracing::debug!(discarded, "subdivision dispatcher stopped");
}
