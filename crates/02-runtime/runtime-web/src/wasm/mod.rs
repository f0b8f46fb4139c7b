mod codec;
mod handles;
mod inbox;
mod platform;

use std::time::Duration;

use crossbeam_channel::{Receiver, Sender};
use gloo_timers::future::TimeoutFuture;
use wasm_bindgen::prelude::*;
use worker_bootstrap::{enter_worker_loop, Job, LoadingMode, ModuleSource};

pub use handles::WebHandles;
pub use inbox::WorkerInbox;
pub use platform::{WebPlatform, WebWorker};

#[wasm_bindgen]
extern "C" {
    #[wasm_bindgen(thread_local_v2, js_namespace = ["import", "meta"], js_name = url)]
    static MAIN_JS_URL: String;
}

/// URL of the wasm-bindgen glue this module was loaded from.
pub fn main_js_url() -> String {
    MAIN_JS_URL.with(String::clone)
}

/// The running module's shared memory.
pub fn shared_memory() -> JsValue {
    wasm_bindgen::memory()
}

/// Module acquisition strategy for `loading`.
pub fn module_source(loading: &LoadingMode) -> ModuleSource<JsValue> {
    loading.source(wasm_bindgen::module())
}

/// Deadline future for `start_workers_with_deadline`.
pub fn deadline(timeout: Duration) -> TimeoutFuture {
    let millis = u32::try_from(timeout.as_millis()).unwrap_or(u32::MAX);
    TimeoutFuture::new(millis)
}

/// Worker loop entry, called by the shim once the module is instantiated.
///
/// `receiver` points at the pool's task receiver and stays owned by the pool;
/// `obj_sender` points at this worker's own sender, which is taken over here.
#[wasm_bindgen]
#[doc(hidden)]
pub fn wbg_rayon_start_worker(receiver: u32, share: JsValue, obj_sender: u32) {
    #[cfg(feature = "console-panic")]
    std::panic::set_hook(Box::new(console_error_panic_hook::hook));

    // SAFETY: both pointers were produced by `WebHandles` through
    // `Box::into_raw` in this module's memory. The receiver is never freed;
    // each object sender is reclaimed exactly once, by the worker it was
    // posted to.
    let receiver = unsafe { handles::ref_from_u32::<Receiver<Job>>(receiver) };
    let Some(receiver) = receiver else {
        log::error!("worker started without a task receiver");
        return;
    };
    let obj_sender = unsafe { handles::box_from_u32::<Sender<JsValue>>(obj_sender) };
    let Some(obj_sender) = obj_sender else {
        log::error!("worker started without an object sender");
        return;
    };
    enter_worker_loop(receiver, &obj_sender, share);
}
