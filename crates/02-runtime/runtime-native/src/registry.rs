use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use worker_bootstrap::{BootstrapError, BootstrapResult};

use crate::handles::NativeModule;

/// Modules reachable by locator, standing in for the platform's import of a
/// module URL.
#[derive(Clone, Debug, Default)]
pub struct ModuleRegistry {
    modules: Arc<RwLock<HashMap<String, NativeModule>>>,
}

impl ModuleRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes `module` importable as `locator`, replacing any previous entry.
    pub fn register(&self, locator: &str, module: NativeModule) {
        self.modules.write().insert(locator.to_owned(), module);
    }

    /// Imports the module published under `locator`.
    pub fn resolve(&self, locator: &str) -> BootstrapResult<NativeModule> {
        self.modules
            .read()
            .get(locator)
            .cloned()
            .ok_or_else(|| BootstrapError::instantiate(format!("no module at {locator}")))
    }
}

/// Bytes of a launcher script.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScriptBlob(Arc<[u8]>);

impl ScriptBlob {
    /// Wraps script bytes.
    pub fn new(bytes: impl AsRef<[u8]>) -> Self {
        Self(Arc::from(bytes.as_ref()))
    }

    /// Raw script bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

#[derive(Debug, Default)]
struct ScriptTable {
    next_id: u64,
    live: HashMap<String, ScriptBlob>,
    created: usize,
    revoked: usize,
}

/// Object-URL table for script blobs. URLs stay resolvable until revoked.
#[derive(Clone, Debug, Default)]
pub struct ScriptStore {
    table: Arc<Mutex<ScriptTable>>,
}

impl ScriptStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `blob` under a fresh `blob:native/<n>` URL.
    pub fn create(&self, blob: &ScriptBlob) -> String {
        let mut table = self.table.lock();
        let url = format!("blob:native/{}", table.next_id);
        table.next_id += 1;
        table.created += 1;
        table.live.insert(url.clone(), blob.clone());
        url
    }

    /// Invalidates `url`. Returns `false` if it was not live.
    pub fn revoke(&self, url: &str) -> bool {
        let mut table = self.table.lock();
        let removed = table.live.remove(url).is_some();
        if removed {
            table.revoked += 1;
        }
        removed
    }

    /// Looks up a live URL.
    pub fn resolve(&self, url: &str) -> Option<ScriptBlob> {
        self.table.lock().live.get(url).cloned()
    }

    /// Number of URLs that are currently resolvable.
    pub fn live_count(&self) -> usize {
        self.table.lock().live.len()
    }

    /// Number of URLs ever created.
    pub fn created_count(&self) -> usize {
        self.table.lock().created
    }

    /// Number of URLs revoked so far.
    pub fn revoked_count(&self) -> usize {
        self.table.lock().revoked
    }
}
