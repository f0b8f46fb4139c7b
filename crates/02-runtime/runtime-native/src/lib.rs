#![deny(missing_docs)]
//! Native backend for the worker bootstrap protocol.
//!
//! Each worker is a named OS thread running the shared [`WorkerShim`]
//! handshake. Modules are in-process values; the no-bundler path resolves
//! them by locator through a [`ModuleRegistry`] and spawns workers from
//! [`ScriptStore`] URLs so script lifetime can be observed in tests.
//!
//! [`WorkerShim`]: worker_bootstrap::WorkerShim

mod handles;
mod platform;
mod registry;
mod timer;

pub use handles::{
    InitContext, NativeHandles, NativeModule, ObjectDelivery, ShareObject, SharedMemory,
};
pub use platform::{NativeInbox, NativePlatform, NativeWorker};
pub use registry::{ModuleRegistry, ScriptBlob, ScriptStore};
pub use timer::sleep;
