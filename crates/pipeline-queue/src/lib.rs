//! Priority Queue / Dispatcher (component F): four named lanes with
//! strict-priority dequeue over the job store's atomic PENDING→RUNNING
//! claim.

pub mod dispatcher;
pub mod error;
pub mod lane;

pub use dispatcher::Dispatcher;
pub use error::QueueError;
pub use lane::Lane;
