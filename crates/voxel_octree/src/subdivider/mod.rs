//! Adaptive subdivision of full leaves.
//!
//! Following the stage pattern: Submit → Dispatch → Split
//!
//! - Rays submit [`SubdivisionRequest`]s through a [`SubdivisionSink`]; the
//!   node's `QUEUED` flag guarantees one outstanding request per node.
//! - The [`AdaptiveSubdivider`] drains the bounded queue on a dispatcher
//!   thread and hands each request to its rayon pool.
//! - [`subdivide`] splits one leaf: the oracle classifies the eight children
//!   without any lock held, then the children are wired and published under
//!   the node's lock.
//!
//! # Module Structure
//!
//! - [`subdivide`]: single-leaf split and empty-subtree collapse
//! - [`exposed`]: optional fill of empty cells the oracle disagrees with
//! - [`worker`]: dispatcher thread, pool and counters

pub mod exposed;
pub mod subdivide;
pub mod worker;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crossbeam_channel::{Sender, TrySendError};

use crate::octree::{NodeBox, NodeId};

pub use subdivide::{subdivide, SkipReason, SubdivisionOutcome};
pub use worker::{AdaptiveSubdivider, SubdividerConfig, SubdivisionStats};

/// Default capacity of the request queue.
pub const DEFAULT_QUEUE_CAPACITY: usize = 1 << 16;

/// Request to split one full leaf.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SubdivisionRequest {
  /// Leaf to split.
  pub node: NodeId,
  /// Cube of that leaf.
  pub bounds: NodeBox,
}

/// Where rays send subdivision requests.
pub trait SubdivisionSink: Send + Sync {
  /// Offer a request. Returns false if it was not accepted; the caller
  /// then releases the node's `QUEUED` flag.
  fn submit(&self, request: SubdivisionRequest) -> bool;
}

/// Counters shared between the queue handles and the dispatcher.
#[derive(Default)]
pub(crate) struct QueueCounters {
  /// Accepted but not yet finished.
  pub pending: AtomicU64,
  pub submitted: AtomicU64,
  pub dropped: AtomicU64,
}

/// Producer handle of the subdivider's bounded queue.
///
/// Never blocks: a full queue drops the request, and the node will be
/// requested again by a later ray.
#[derive(Clone)]
pub struct SubdivisionQueue {
  sender: Sender<SubdivisionRequest>,
  counters: Arc<QueueCounters>,
}

impl SubdivisionQueue {
  pub(crate) fn new(sender: Sender<SubdivisionRequest>, counters: Arc<QueueCounters>) -> Self {
    Self { sender, counters }
  }

  /// Requests accepted so far.
  pub fn submitted(&self) -> u64 {
    self.counters.submitted.load(Ordering::Relaxed)
  }

  /// Requests refused because the queue was full or closed.
  pub fn dropped(&self) -> u64 {
    self.counters.dropped.load(Ordering::Relaxed)
  }

  /// Requests accepted and not yet processed.
  pub fn pending(&self) -> u64 {
    self.counters.pending.load(Ordering::Acquire)
  }
}

impl SubdivisionSink for SubdivisionQueue {
  fn submit(&self, request: SubdivisionRequest) -> bool {
    // Count before sending so `pending` never dips below the true backlog.
    self.counters.pending.fetch_add(1, Ordering::AcqRel);
    match self.sender.try_send(request) {
      Ok(()) => {
        self.counters.submitted.fetch_add(1, Ordering::Relaxed);
        true
      }
      Err(err) => {
        self.counters.pending.fetch_sub(1, Ordering::AcqRel);
        self.counters.dropped.fetch_add(1, Ordering::Relaxed);
        match err {
          TrySendError::Full(req) => {
            tracing::debug!(node = ?req.node, "subdivision queue full, dropping request")
          }
          TrySendError::Disconnected(req) => {
            tracing::debug!(node = ?req.node, "subdivision queue closed, dropping request")
          }
        }
        false
      }
    }
  }
}

/// Sink that refuses every request. Rays cast through it never change the
/// tree.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullSink;

impl SubdivisionSink for NullSink {
  fn submit(&self, _request: SubdivisionRequest) -> bool {
    false
  }
}
