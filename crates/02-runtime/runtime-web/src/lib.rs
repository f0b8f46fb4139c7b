//! Browser backend for the worker bootstrap protocol.
//!
//! Workers are module `Worker`s running `js/worker.js`. The launcher side
//! ([`WebPlatform`]) is Rust; the worker side of the handshake runs in the
//! shim script because the module is not instantiated yet when the init
//! message arrives. Once instantiated, the shim hands control back to Rust
//! through the `wbg_rayon_start_worker` export.
//!
//! Everything here needs `target_arch = "wasm32"`; other targets only get the
//! export stub so the crate still builds in a native workspace.
#![allow(missing_docs)]

// `atomics` is visible to `target_feature` detection while `bulk-memory` is
// not; checking the former catches a missing `RUSTFLAGS` setup.
#[cfg(all(target_arch = "wasm32", not(doc), not(target_feature = "atomics")))]
compile_error!(
    "runtime-web needs shared memory: build with \
     RUSTFLAGS=\"-C target-feature=+atomics,+bulk-memory\" and -Z build-std=std,panic_abort"
);

#[cfg(target_arch = "wasm32")]
mod wasm;

#[cfg(target_arch = "wasm32")]
pub use wasm::{
    deadline, main_js_url, module_source, shared_memory, wbg_rayon_start_worker, WebHandles,
    WebPlatform, WebWorker, WorkerInbox,
};

#[cfg(not(target_arch = "wasm32"))]
mod stubs {
    use log::warn;

    #[no_mangle]
    pub extern "C" fn wbg_rayon_start_worker(_receiver: u32, _share: u32, _obj_sender: u32) {
        warn!("wbg_rayon_start_worker is only available on wasm32");
    }
}

#[cfg(not(target_arch = "wasm32"))]
pub use stubs::*;
