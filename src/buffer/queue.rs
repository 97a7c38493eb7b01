//! Bounded FIFO of request snapshots.
//!
//! # Slots
//! Capacity is enforced with a semaphore. Each queued item owns one permit.
//! Dequeuing hands the permit to a [`Claim`] instead of returning it, so an
//! item that is in flight to the backend still counts against capacity:
//! - delivered → drop the claim, the slot frees and one blocked producer wakes
//! - failed → [`RequestBuffer::requeue`] puts it back at the tail using the
//!   slot it already holds, which never waits
//!
//! The dispatcher can therefore never block on a full buffer.

use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{OwnedSemaphorePermit, Semaphore, TryAcquireError};

use crate::buffer::request::BufferedRequest;
use crate::config::OverflowPolicy;
use crate::observability::metrics;

/// Error returned when a request could not be queued. The request is handed
/// back to the caller.
#[derive(Debug, Error)]
pub enum BufferError {
    #[error("request buffer is full")]
    Full(Box<BufferedRequest>),

    #[error("request buffer is closed")]
    Closed(Box<BufferedRequest>),
}

impl BufferError {
    pub fn into_request(self) -> BufferedRequest {
        match self {
            BufferError::Full(r) | BufferError::Closed(r) => *r,
        }
    }
}

struct Queued {
    request: BufferedRequest,
    slot: OwnedSemaphorePermit,
}

/// A dequeued request that still holds its buffer slot.
///
/// Dropping the claim releases the slot.
#[derive(Debug)]
pub struct Claim {
    request: BufferedRequest,
    slot: OwnedSemaphorePermit,
}

impl Claim {
    pub fn request(&self) -> &BufferedRequest {
        &self.request
    }
}

/// Bounded, concurrency-safe request queue.
pub struct RequestBuffer {
    queue: Mutex<VecDeque<Queued>>,
    slots: Arc<Semaphore>,
    capacity: usize,
    overflow: OverflowPolicy,
}

impl RequestBuffer {
    pub fn new(capacity: usize, overflow: OverflowPolicy) -> Self {
        Self {
            queue: Mutex::new(VecDeque::with_capacity(capacity.min(1024))),
            slots: Arc::new(Semaphore::new(capacity)),
            capacity,
            overflow,
        }
    }

    /// Insert a request at the back.
    ///
    /// When the buffer is full the configured [`OverflowPolicy`] applies:
    /// `Block` waits for a slot, `Reject` returns [`BufferError::Full`], and
    /// `DropOldest` evicts queued items and returns them.
    pub async fn enqueue(
        &self,
        request: BufferedRequest,
    ) -> Result<Vec<BufferedRequest>, BufferError> {
        let mut evicted = Vec::new();

        let slot = match self.overflow {
            OverflowPolicy::Block => match self.slots.clone().acquire_owned().await {
                Ok(slot) => slot,
                Err(_) => return Err(BufferError::Closed(Box::new(request))),
            },
            OverflowPolicy::Reject => match self.slots.clone().try_acquire_owned() {
                Ok(slot) => slot,
                Err(TryAcquireError::NoPermits) => {
                    return Err(BufferError::Full(Box::new(request)))
                }
                Err(TryAcquireError::Closed) => {
                    return Err(BufferError::Closed(Box::new(request)))
                }
            },
            OverflowPolicy::DropOldest => loop {
                match self.slots.clone().try_acquire_owned() {
                    Ok(slot) => break slot,
                    Err(TryAcquireError::Closed) => {
                        return Err(BufferError::Closed(Box::new(request)))
                    }
                    Err(TryAcquireError::NoPermits) => {
                        let oldest = self.queue.lock().pop_front();
                        match oldest {
                            // dropping the victim's permit frees its slot
                            Some(victim) => evicted.push(victim.request),
                            // every slot is claimed by an in-flight replay
                            None => match self.slots.clone().acquire_owned().await {
                                Ok(slot) => break slot,
                                Err(_) => return Err(BufferError::Closed(Box::new(request))),
                            },
                        }
                    }
                }
            },
        };

        if !evicted.is_empty() {
            metrics::record_evicted(evicted.len());
        }

        let depth = {
            let mut queue = self.queue.lock();
            queue.push_back(Queued { request, slot });
            queue.len()
        };
        metrics::set_buffer_depth(depth);

        Ok(evicted)
    }

    /// Remove and return at most `n` queued requests, oldest first.
    ///
    /// Never waits; returns an empty vector when nothing is queued.
    pub fn try_dequeue_up_to(&self, n: usize) -> Vec<Claim> {
        let (claims, depth) = {
            let mut queue = self.queue.lock();
            let take = n.min(queue.len());
            let claims: Vec<Claim> = queue
                .drain(..take)
                .map(|q| Claim {
                    request: q.request,
                    slot: q.slot,
                })
                .collect();
            (claims, queue.len())
        };
        metrics::set_buffer_depth(depth);
        claims
    }

    /// Put a claimed request back at the tail, unchanged.
    pub fn requeue(&self, claim: Claim) {
        let depth = {
            let mut queue = self.queue.lock();
            queue.push_back(Queued {
                request: claim.request,
                slot: claim.slot,
            });
            queue.len()
        };
        metrics::set_buffer_depth(depth);
    }

    /// Number of queued requests (claims in flight are not counted).
    pub fn len(&self) -> usize {
        self.queue.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.lock().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn overflow_policy(&self) -> OverflowPolicy {
        self.overflow
    }

    /// Slots not held by a queued or in-flight request.
    pub fn available_slots(&self) -> usize {
        self.slots.available_permits()
    }

    /// Stop accepting requests. Producers waiting for a slot get
    /// [`BufferError::Closed`]; queued items and requeues are unaffected.
    pub fn close(&self) {
        self.slots.close();
    }
}

impl std::fmt::Debug for RequestBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestBuffer")
            .field("len", &self.len())
            .field("capacity", &self.capacity)
            .field("overflow", &self.overflow)
            .finish()
    }
}
