use futures::executor::block_on;
use rayon::prelude::*;
use rayon::ThreadPoolBuilder;
use rayon_workers::{PoolBuildable, WorkersBuilder};
use runtime_native::{
    ModuleRegistry, NativeHandles, NativeModule, NativePlatform, ScriptBlob, ShareObject,
    SharedMemory,
};
use worker_bootstrap::{BootstrapConfig, LoadingMode};

use crate::support::{init_logging, RECV_TIMEOUT};

#[test]
fn rayon_pool_runs_on_self_fetched_workers() {
    init_logging();
    let config: BootstrapConfig = serde_json::from_str(
        r#"{
            "num_workers": 3,
            "loading": { "mode": "no-bundler", "main_module": "./pkg/app.js" },
            "ready_timeout_ms": 5000
        }"#,
    )
    .unwrap();
    assert_eq!(
        config.loading,
        LoadingMode::NoBundler {
            main_module: "./pkg/app.js".into()
        }
    );

    let modules = ModuleRegistry::new();
    modules.register("./pkg/app.js", NativeModule::inert("app"));
    let platform = NativePlatform::new()
        .with_modules(modules)
        .with_own_script(ScriptBlob::new("export default function init() {}"));

    let mut builder =
        WorkersBuilder::<NativeHandles>::from_config(&config, ShareObject::new(7u32)).unwrap();
    let deadline = runtime_native::sleep(config.ready_timeout().unwrap());
    let pool = block_on(builder.build_with_deadline(
        &platform,
        config.loading.source(NativeModule::inert("unused")),
        SharedMemory::new(1024),
        deadline,
    ))
    .unwrap();
    assert_eq!(pool.len(), 3);
    assert_eq!(platform.scripts().live_count(), 0);

    for receiver in builder.receivers() {
        let delivery = receiver.recv_timeout(RECV_TIMEOUT).unwrap();
        assert_eq!(delivery.object.downcast_ref::<u32>(), Some(&7));
    }

    let threads = ThreadPoolBuilder::new().build_on_workers(&builder).unwrap();
    let squares: u64 = threads.install(|| (0..100u64).into_par_iter().map(|n| n * n).sum());
    assert_eq!(squares, 328_350);

    drop(threads);
    for handle in pool {
        assert!(handle.worker().join());
    }
}

#[test]
fn zero_workers_in_config_are_rejected() {
    let config: BootstrapConfig = serde_json::from_str(r#"{ "num_workers": 0 }"#).unwrap();
    assert!(WorkersBuilder::<NativeHandles>::from_config(&config, ShareObject::default()).is_err());
}
