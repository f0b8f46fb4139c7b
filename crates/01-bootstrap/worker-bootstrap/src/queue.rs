//! Task-queue contract between a bootstrapped pool and the scheduler that
//! drives it.

use crossbeam_channel::{Receiver, Sender};
use log::{debug, warn};

use crate::message::HandleSet;

/// Unit of work handed to a worker; for a rayon pool this is a thread's main loop.
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// Backends whose task receiver and object sender handles can be derived from
/// crossbeam channels owned by the pool builder.
pub trait TaskChannels: HandleSet {
    /// What a worker pushes through its object sender when it starts.
    type Delivery: 'static;

    fn task_receiver(receiver: &Receiver<Job>) -> Self::TaskReceiver;

    fn object_sender(sender: &Sender<Self::Delivery>) -> Self::ObjectSender;
}

/// Worker main loop: publishes `delivery` on the worker's object sender, then
/// takes one job from the shared queue and runs it to completion.
pub fn enter_worker_loop<D>(task_receiver: &Receiver<Job>, object_sender: &Sender<D>, delivery: D) {
    if object_sender.send(delivery).is_err() {
        warn!("worker loop: object receiver dropped before delivery");
    }
    match task_receiver.recv() {
        Ok(job) => job(),
        Err(_) => debug!("worker loop: task queue closed before a job arrived"),
    }
}
