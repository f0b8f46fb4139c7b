use std::time::Duration;

use crossbeam_channel::unbounded;
use futures::executor::block_on;
use runtime_native::{sleep, ModuleRegistry, NativeModule, NativePlatform, ScriptBlob};
use worker_bootstrap::{start_workers, start_workers_with_deadline, BootstrapError, ModuleSource};

use crate::support::{
    fixture, init_logging, launch_in_background, shut_down, wait_until, RECV_TIMEOUT,
};

const MAIN_MODULE: &str = "./pkg/app.js";

fn self_fetching_platform(module: NativeModule) -> NativePlatform {
    let modules = ModuleRegistry::new();
    modules.register(MAIN_MODULE, module);
    NativePlatform::new()
        .with_modules(modules)
        .with_own_script(ScriptBlob::new("import init from './pkg/app.js';"))
}

#[test]
fn workers_import_the_module_by_locator() {
    init_logging();
    let (seen_tx, seen_rx) = unbounded();
    let platform = self_fetching_platform(NativeModule::new("app", move |cx| {
        let _ = seen_tx.send(cx.worker_index());
        Ok(())
    }));
    let fx = fixture(ModuleSource::LocatorFetch(MAIN_MODULE.into()), 2);

    let pool = block_on(start_workers(&platform, fx.request)).unwrap();
    let mut seen: Vec<_> = seen_rx.try_iter().collect();
    seen.sort_unstable();
    assert_eq!(seen, vec![0, 1]);
    assert_eq!(platform.scripts().created_count(), 2);

    shut_down(fx.jobs, pool);
}

#[test]
fn script_urls_are_revoked_before_workers_are_ready() {
    init_logging();
    let (release, gate) = unbounded::<()>();
    let platform = self_fetching_platform(NativeModule::new("app", move |_| {
        let _ = gate.recv();
        Ok(())
    }));
    let scripts = platform.scripts().clone();
    let fx = fixture(ModuleSource::LocatorFetch(MAIN_MODULE.into()), 3);
    let ready = launch_in_background(platform, fx.request);

    assert!(wait_until(|| scripts.revoked_count() == 3));
    assert_eq!(scripts.created_count(), 3);
    assert_eq!(scripts.live_count(), 0);
    assert!(ready.try_recv().is_err(), "no worker has been released yet");

    for _ in 0..3 {
        release.send(()).unwrap();
    }
    let pool = ready.recv_timeout(RECV_TIMEOUT).unwrap().unwrap();
    assert_eq!(pool.len(), 3);
    shut_down(fx.jobs, pool);
}

#[test]
fn missing_launcher_script_fails_before_spawning() {
    let platform = NativePlatform::new();
    let fx = fixture(ModuleSource::LocatorFetch(MAIN_MODULE.into()), 2);
    let err = block_on(start_workers(&platform, fx.request)).unwrap_err();
    assert!(matches!(err, BootstrapError::ScriptFetch(_)));
    assert_eq!(platform.scripts().created_count(), 0);
}

#[test]
fn unknown_locator_times_out_with_a_cause() {
    init_logging();
    let platform = self_fetching_platform(NativeModule::inert("app"));
    let fx = fixture(ModuleSource::LocatorFetch("./pkg/missing.js".into()), 1);

    let err = block_on(start_workers_with_deadline(
        &platform,
        fx.request,
        sleep(Duration::from_millis(300)),
    ))
    .unwrap_err();

    match err {
        BootstrapError::WorkerBootstrapTimeout { index, cause } => {
            assert_eq!(index, 0);
            assert!(cause.is_some());
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(platform.scripts().live_count(), 0);
}
