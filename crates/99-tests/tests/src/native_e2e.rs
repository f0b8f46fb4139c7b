use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{unbounded, Receiver, Sender};
use futures::executor::block_on;
use parking_lot::Mutex;
use runtime_native::{sleep, NativeModule, NativePlatform};
use worker_bootstrap::{start_workers, start_workers_with_deadline, BootstrapError, ModuleSource};

use crate::support::{fixture, init_logging, launch_in_background, shut_down, RECV_TIMEOUT};

/// Module whose init blocks until the test opens the worker's gate.
fn gated_module(
    workers: usize,
    arrivals: Arc<Mutex<Vec<usize>>>,
) -> (NativeModule, Vec<Sender<()>>) {
    let (gates, waits): (Vec<Sender<()>>, Vec<Receiver<()>>) =
        (0..workers).map(|_| unbounded()).unzip();
    let module = NativeModule::new("gated", move |cx| {
        let _ = waits[cx.worker_index()].recv();
        arrivals.lock().push(cx.worker_index());
        Ok(())
    });
    (module, gates)
}

#[test]
fn empty_pool_spawns_nothing() {
    let fx = fixture(ModuleSource::DirectHandle(NativeModule::inert("app")), 0);
    let pool = block_on(start_workers(&NativePlatform::new(), fx.request)).unwrap();
    assert!(pool.is_empty());
}

#[test]
fn mismatched_sender_count_is_rejected() {
    let mut fx = fixture(ModuleSource::DirectHandle(NativeModule::inert("app")), 3);
    fx.request.object_senders.pop();
    let err = block_on(start_workers(&NativePlatform::new(), fx.request)).unwrap_err();
    assert!(matches!(
        err,
        BootstrapError::SenderCountMismatch {
            expected: 3,
            actual: 2
        }
    ));
}

#[test]
fn worker_i_receives_object_sender_i() {
    init_logging();
    let fx = fixture(ModuleSource::DirectHandle(NativeModule::inert("app")), 4);
    let pool = block_on(start_workers(&NativePlatform::new(), fx.request)).unwrap();
    assert_eq!(pool.len(), 4);

    for (index, deliveries) in fx.deliveries.iter().enumerate() {
        let delivery = deliveries.recv_timeout(RECV_TIMEOUT).unwrap();
        assert_eq!(delivery.worker_index, index);
        assert_eq!(delivery.object.downcast_ref::<&str>(), Some(&"shared"));
        assert_eq!(pool[index].worker().index(), index);
        assert_eq!(pool[index].index(), index);
    }

    shut_down(fx.jobs, pool);
}

#[test]
fn out_of_order_readiness_resolves_only_after_the_last_worker() {
    init_logging();
    let arrivals = Arc::new(Mutex::new(Vec::new()));
    let (module, gates) = gated_module(3, Arc::clone(&arrivals));
    let fx = fixture(ModuleSource::DirectHandle(module), 3);
    let ready = launch_in_background(NativePlatform::new(), fx.request);

    for index in [1, 2] {
        gates[index].send(()).unwrap();
        let pending = ready.recv_timeout(Duration::from_millis(100));
        assert!(pending.is_err(), "pool observable before worker 0 was ready");
    }
    gates[0].send(()).unwrap();
    let pool = ready.recv_timeout(RECV_TIMEOUT).unwrap().unwrap();

    assert_eq!(*arrivals.lock(), vec![1, 2, 0]);
    let indices: Vec<_> = pool.iter().map(|handle| handle.worker().index()).collect();
    assert_eq!(indices, vec![0, 1, 2]);

    shut_down(fx.jobs, pool);
}

#[test]
fn workers_initialize_concurrently() {
    const INIT: Duration = Duration::from_millis(200);
    init_logging();
    let module = NativeModule::new("slow", |_| {
        thread::sleep(INIT);
        Ok(())
    });
    let fx = fixture(ModuleSource::DirectHandle(module), 4);

    let started = Instant::now();
    let pool = block_on(start_workers(&NativePlatform::new(), fx.request)).unwrap();
    let elapsed = started.elapsed();

    assert!(elapsed >= INIT);
    assert!(elapsed < INIT * 3, "bootstrap took {elapsed:?}");
    shut_down(fx.jobs, pool);
}

#[test]
fn unrelated_worker_traffic_does_not_count_as_readiness() {
    init_logging();
    let (release, gate) = unbounded::<()>();
    let module = NativeModule::new("chatty", move |cx| {
        cx.announce("loading");
        cx.announce("wasm_bindgen_worker_init");
        let _ = gate.recv();
        Ok(())
    });
    let fx = fixture(ModuleSource::DirectHandle(module), 1);
    let ready = launch_in_background(NativePlatform::new(), fx.request);

    assert!(ready.recv_timeout(Duration::from_millis(150)).is_err());
    release.send(()).unwrap();
    let pool = ready.recv_timeout(RECV_TIMEOUT).unwrap().unwrap();
    assert_eq!(pool.len(), 1);
    assert!(pool[0].worker().post_foreign("page_visibility").is_ok());

    shut_down(fx.jobs, pool);
}

#[test]
fn memory_written_during_init_is_visible_to_the_launcher() {
    let module = NativeModule::new("writer", |cx| {
        let index = cx.worker_index();
        assert!(cx.memory().store(index, &[index as u8 + 1]));
        Ok(())
    });
    let fx = fixture(ModuleSource::DirectHandle(module), 3);
    let pool = block_on(start_workers(&NativePlatform::new(), fx.request)).unwrap();
    assert_eq!(fx.memory.load(0, 3), Some(vec![1, 2, 3]));
    shut_down(fx.jobs, pool);
}

#[test]
fn deadline_names_the_first_unresponsive_worker() {
    init_logging();
    let arrivals = Arc::new(Mutex::new(Vec::new()));
    let (module, gates) = gated_module(3, Arc::clone(&arrivals));
    let fx = fixture(ModuleSource::DirectHandle(module), 3);
    gates[0].send(()).unwrap();
    gates[2].send(()).unwrap();

    let err = block_on(start_workers_with_deadline(
        &NativePlatform::new(),
        fx.request,
        sleep(Duration::from_millis(300)),
    ))
    .unwrap_err();

    match err {
        BootstrapError::WorkerBootstrapTimeout { index, cause } => {
            assert_eq!(index, 1);
            assert_eq!(cause, None);
        }
        other => panic!("unexpected error: {other}"),
    }
    gates[1].send(()).unwrap();
}

#[test]
fn failed_instantiation_is_not_retried_and_never_signals_ready() {
    init_logging();
    let attempts = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&attempts);
    let module = NativeModule::new("broken", move |cx| {
        if cx.worker_index() == 1 {
            counter.fetch_add(1, Ordering::SeqCst);
            return Err(BootstrapError::instantiate("memory import mismatch"));
        }
        Ok(())
    });
    let fx = fixture(ModuleSource::DirectHandle(module), 2);

    let err = block_on(start_workers_with_deadline(
        &NativePlatform::new(),
        fx.request,
        sleep(Duration::from_millis(500)),
    ))
    .unwrap_err();

    match err {
        BootstrapError::WorkerBootstrapTimeout { index, cause } => {
            assert_eq!(index, 1);
            let cause = cause.expect("closed channel recorded");
            assert!(cause.contains("channel closed"), "{cause}");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(attempts.load(Ordering::SeqCst), 1);
}
