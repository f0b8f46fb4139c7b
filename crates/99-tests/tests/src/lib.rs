//! End-to-end tests for the worker bootstrap protocol on native threads.

#[cfg(all(test, not(target_arch = "wasm32")))]
mod support;

#[cfg(all(test, not(target_arch = "wasm32")))]
mod native_e2e;

#[cfg(all(test, not(target_arch = "wasm32")))]
mod no_bundler;

#[cfg(all(test, not(target_arch = "wasm32")))]
mod rayon_pool;
