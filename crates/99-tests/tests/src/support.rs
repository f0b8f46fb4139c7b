use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{bounded, Receiver, Sender};
use futures::executor::block_on;
use runtime_native::{
    NativeHandles, NativeModule, NativePlatform, NativeWorker, ObjectDelivery, ShareObject,
    SharedMemory,
};
use worker_bootstrap::{start_workers, BootstrapResult, Job, ModuleSource, Pool, PoolRequest};

pub const RECV_TIMEOUT: Duration = Duration::from_secs(5);

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// A pool request plus the test's ends of its channels.
pub struct Fixture {
    pub request: PoolRequest<NativeHandles>,
    pub jobs: Sender<Job>,
    pub deliveries: Vec<Receiver<ObjectDelivery>>,
    pub memory: SharedMemory,
}

pub fn fixture(source: ModuleSource<NativeModule>, length: usize) -> Fixture {
    let (jobs, task_receiver) = bounded(length.max(1));
    let memory = SharedMemory::new(64);
    let mut object_senders = Vec::with_capacity(length);
    let mut deliveries = Vec::with_capacity(length);
    for _ in 0..length {
        let (tx, rx) = bounded(1);
        object_senders.push(tx);
        deliveries.push(rx);
    }
    Fixture {
        request: PoolRequest {
            source,
            memory: memory.clone(),
            length,
            task_receiver,
            sync_object: ShareObject::new("shared"),
            object_senders,
        },
        jobs,
        deliveries,
        memory,
    }
}

/// Runs the launcher on its own thread; the result arrives on the returned
/// channel once the pool is ready.
pub fn launch_in_background(
    platform: NativePlatform,
    request: PoolRequest<NativeHandles>,
) -> Receiver<BootstrapResult<Pool<NativeWorker>>> {
    let (tx, rx) = bounded(1);
    thread::spawn(move || {
        let _ = tx.send(block_on(start_workers(&platform, request)));
    });
    rx
}

/// Closes the task queue and waits for every worker thread to exit.
pub fn shut_down(jobs: Sender<Job>, pool: Pool<NativeWorker>) {
    drop(jobs);
    for handle in pool {
        assert!(handle.worker().join(), "worker {} panicked", handle.index());
    }
}

pub fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + RECV_TIMEOUT;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    condition()
}
