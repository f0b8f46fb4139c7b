use js_sys::Promise;
use log::{debug, warn};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;
use web_sys::{Blob, Response, Url, Worker, WorkerOptions, WorkerType};
use worker_bootstrap::{BootstrapError, BootstrapResult, Platform, WorkerEntry, WorkerMessage};

use super::codec;
use super::handles::WebHandles;
use super::inbox::WorkerInbox;

#[wasm_bindgen(module = "/js/worker.js")]
extern "C" {
    #[wasm_bindgen(js_name = shimUrl)]
    fn shim_url() -> String;
}

#[wasm_bindgen]
extern "C" {
    #[wasm_bindgen(js_name = fetch)]
    fn fetch_with_str(input: &str) -> Promise;
}

/// Spawns module workers from the shim script.
#[derive(Clone, Debug)]
pub struct WebPlatform {
    shim_url: String,
    main_js: String,
}

impl WebPlatform {
    /// Workers start from the bundled `js/worker.js` and import the glue at
    /// `import.meta.url`.
    pub fn new() -> Self {
        Self {
            shim_url: shim_url(),
            main_js: super::main_js_url(),
        }
    }

    /// Overrides the glue URL workers import for a directly posted module.
    pub fn with_main_js(mut self, main_js: impl Into<String>) -> Self {
        self.main_js = main_js.into();
        self
    }

    pub fn shim_url(&self) -> &str {
        &self.shim_url
    }
}

impl Default for WebPlatform {
    fn default() -> Self {
        Self::new()
    }
}

/// A spawned module worker and its pool index.
#[derive(Clone, Debug)]
pub struct WebWorker {
    index: usize,
    worker: Worker,
}

impl WebWorker {
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn worker(&self) -> &Worker {
        &self.worker
    }

    /// Stops the worker immediately.
    pub fn terminate(&self) {
        self.worker.terminate();
    }
}

impl Platform for WebPlatform {
    type Handles = WebHandles;
    type Worker = WebWorker;
    type Inbox = WorkerInbox;
    type Script = Blob;

    fn spawn(&self, index: usize, entry: WorkerEntry<'_>) -> BootstrapResult<WebWorker> {
        let url = match entry {
            WorkerEntry::Bundled => self.shim_url.as_str(),
            WorkerEntry::ScriptUrl(url) => url,
        };
        let options = WorkerOptions::new();
        options.set_type(WorkerType::Module);
        let worker = Worker::new_with_options(url, &options)
            .map_err(|err| BootstrapError::spawn(index, describe(&err)))?;
        debug!("spawned worker {index} from {url}");
        Ok(WebWorker { index, worker })
    }

    fn listen(&self, worker: &WebWorker) -> BootstrapResult<WorkerInbox> {
        WorkerInbox::attach(&worker.worker).map_err(|err| {
            warn!("cannot listen to worker {}: {}", worker.index, describe(&err));
            BootstrapError::ChannelClosed
        })
    }

    fn post(&self, worker: &WebWorker, message: WorkerMessage<WebHandles>) -> BootstrapResult<()> {
        let value = codec::encode(message, &self.main_js)
            .map_err(|err| BootstrapError::post(worker.index, describe(&err)))?;
        worker
            .worker
            .post_message(&value)
            .map_err(|err| BootstrapError::post(worker.index, describe(&err)))
    }

    async fn fetch_own_script(&self) -> BootstrapResult<Blob> {
        let response = JsFuture::from(fetch_with_str(&self.shim_url))
            .await
            .and_then(|value| value.dyn_into::<Response>())
            .map_err(|err| BootstrapError::script_fetch(describe(&err)))?;
        if !response.ok() {
            return Err(BootstrapError::script_fetch(format!(
                "{} answered {}",
                self.shim_url,
                response.status()
            )));
        }
        let blob = response
            .blob()
            .map(JsFuture::from)
            .map_err(|err| BootstrapError::script_fetch(describe(&err)))?
            .await
            .and_then(|value| value.dyn_into::<Blob>())
            .map_err(|err| BootstrapError::script_fetch(describe(&err)))?;
        Ok(blob)
    }

    fn create_script_url(&self, script: &Blob) -> BootstrapResult<String> {
        Url::create_object_url_with_blob(script)
            .map_err(|err| BootstrapError::script_fetch(describe(&err)))
    }

    fn revoke_script_url(&self, url: &str) {
        if let Err(err) = Url::revoke_object_url(url) {
            warn!("failed to revoke {url}: {}", describe(&err));
        }
    }
}

fn describe(err: &JsValue) -> String {
    err.as_string().unwrap_or_else(|| format!("{err:?}"))
}
