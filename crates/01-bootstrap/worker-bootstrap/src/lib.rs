//! Bootstrap protocol for a fixed-size pool of workers sharing one linear
//! memory segment.
//!
//! * [`start_workers`] the pool launcher: spawns every worker, posts its
//!   [`PoolInitMessage`] and waits on a [`ReadinessBarrier`].
//! * [`WorkerShim`] the per-context handshake state machine.
//! * [`await_once`] single-resolution wait used by both sides.
//! * [`Platform`] / [`WorkerHost`] seams implemented by the native and web
//!   runtimes.

mod barrier;
pub mod config;
mod error;
mod launcher;
pub mod message;
mod once;
mod pool;
pub mod queue;
mod shim;

pub use barrier::ReadinessBarrier;
pub use config::{BootstrapConfig, LoadingMode};
pub use error::{BootstrapError, BootstrapResult};
pub use launcher::{start_workers, start_workers_with_deadline, Platform, PoolRequest, WorkerEntry};
pub use message::{
    HandleSet, MessageKind, ModuleSource, PoolInitMessage, ReadinessSignal, SharedInit,
    WorkerMessage, INIT_MESSAGE_TYPE, READY_MESSAGE_TYPE,
};
pub use once::await_once;
pub use pool::{Pool, WorkerHandle};
pub use queue::{enter_worker_loop, Job, TaskChannels};
pub use shim::{ShimState, WorkerHost, WorkerShim};
