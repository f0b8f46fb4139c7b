use std::convert::TryFrom;

use crossbeam_channel::{Receiver, Sender};
use wasm_bindgen::JsValue;
use worker_bootstrap::{HandleSet, Job, TaskChannels};

/// Handle types crossing the page/worker boundary. Channel ends travel as
/// addresses into the shared memory.
#[derive(Debug)]
pub struct WebHandles;

impl HandleSet for WebHandles {
    type Module = JsValue;
    type Memory = JsValue;
    type TaskReceiver = u32;
    type SyncObject = JsValue;
    type ObjectSender = u32;
}

impl TaskChannels for WebHandles {
    type Delivery = JsValue;

    fn task_receiver(receiver: &Receiver<Job>) -> u32 {
        into_u32(receiver.clone())
    }

    fn object_sender(sender: &Sender<JsValue>) -> u32 {
        into_u32(sender.clone())
    }
}

fn into_u32<T>(value: T) -> u32 {
    let addr = Box::into_raw(Box::new(value)) as usize;
    // wasm32 addresses are 32 bits wide.
    u32::try_from(addr).unwrap_or_default()
}

pub(super) unsafe fn ref_from_u32<T>(ptr: u32) -> Option<&'static T> {
    (ptr as usize as *const T).as_ref()
}

pub(super) unsafe fn box_from_u32<T>(ptr: u32) -> Option<Box<T>> {
    let ptr = ptr as usize as *mut T;
    if ptr.is_null() {
        None
    } else {
        Some(Box::from_raw(ptr))
    }
}
