//! Bootstrap configuration as embedded applications deserialize it.

use std::time::Duration;

use serde::Deserialize;

use crate::error::{BootstrapError, BootstrapResult};
use crate::message::ModuleSource;

/// How workers get hold of the compiled module.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(tag = "mode", rename_all = "kebab-case")]
pub enum LoadingMode {
    /// A bundler emits the worker script; the live module is posted to it.
    #[default]
    Bundler,
    /// No bundler: the launcher re-spawns its own script and workers import
    /// `main_module` themselves.
    NoBundler { main_module: String },
}

impl LoadingMode {
    pub fn source<M>(&self, module: M) -> ModuleSource<M> {
        match self {
            LoadingMode::Bundler => ModuleSource::DirectHandle(module),
            LoadingMode::NoBundler { main_module } => {
                ModuleSource::LocatorFetch(main_module.clone())
            }
        }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct BootstrapConfig {
    pub num_workers: usize,
    #[serde(default)]
    pub loading: LoadingMode,
    /// Readiness deadline for the whole pool; `None` waits forever.
    #[serde(default)]
    pub ready_timeout_ms: Option<u64>,
}

impl BootstrapConfig {
    pub fn new(num_workers: usize) -> Self {
        Self {
            num_workers,
            loading: LoadingMode::default(),
            ready_timeout_ms: None,
        }
    }

    pub fn with_loading(mut self, loading: LoadingMode) -> Self {
        self.loading = loading;
        self
    }

    pub fn with_ready_timeout(mut self, timeout: Duration) -> Self {
        self.ready_timeout_ms = Some(u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX));
        self
    }

    pub fn ready_timeout(&self) -> Option<Duration> {
        self.ready_timeout_ms.map(Duration::from_millis)
    }

    pub fn validate(&self) -> BootstrapResult<()> {
        if self.num_workers == 0 {
            return Err(BootstrapError::InvalidConfig("num_workers must be at least 1"));
        }
        if let LoadingMode::NoBundler { main_module } = &self.loading {
            if main_module.is_empty() {
                return Err(BootstrapError::InvalidConfig(
                    "no-bundler loading needs a main_module locator",
                ));
            }
        }
        Ok(())
    }
}
