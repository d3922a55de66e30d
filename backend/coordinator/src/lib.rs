//! Orchestrates verify requests: issues codes synchronously and runs
//! fetch-extract-match checks on a bounded worker pool, delivering exactly one
//! outcome per request.

pub mod coordinator;
pub mod pool;
pub mod sink;

pub use coordinator::{Dispatch, VerificationCoordinator, DEFAULT_POOL_SIZE};
pub use pool::WorkerPool;
pub use sink::LogSink;
