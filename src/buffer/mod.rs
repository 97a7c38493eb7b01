//! Request buffering subsystem.
//!
//! # Data Flow
//! ```text
//! IngestionGateway
//!     → request.rs (BufferedRequest snapshot)
//!     → queue.rs (RequestBuffer::enqueue, bounded FIFO)
//!
//! ReplayDispatcher
//!     → RequestBuffer::try_dequeue_up_to (claims)
//!     → delivered: drop claim / failed: RequestBuffer::requeue
//! ```
//!
//! # Design Decisions
//! - Snapshots own their body; nothing ties them to the inbound connection
//! - Requeued items go to the tail, so retries can be overtaken
//! - In-flight claims keep their slot so capacity covers them too

pub mod queue;
pub mod request;

pub use queue::{BufferError, Claim, RequestBuffer};
pub use request::{BufferedRequest, Scheme};
