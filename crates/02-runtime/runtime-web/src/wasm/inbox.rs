use std::pin::Pin;
use std::task::{Context, Poll};

use futures::channel::mpsc;
use futures::{Stream, StreamExt};
use log::warn;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{MessageEvent, Worker};
use worker_bootstrap::WorkerMessage;

use super::codec;
use super::handles::WebHandles;

const MESSAGE: &str = "message";

/// Messages posted by one worker. The event listener is removed when the
/// inbox is dropped.
pub struct WorkerInbox {
    worker: Worker,
    listener: Closure<dyn FnMut(MessageEvent)>,
    messages: mpsc::UnboundedReceiver<WorkerMessage<WebHandles>>,
}

impl WorkerInbox {
    pub(super) fn attach(worker: &Worker) -> Result<Self, JsValue> {
        let (sender, messages) = mpsc::unbounded();
        let listener = Closure::wrap(Box::new(move |event: MessageEvent| {
            let _ = sender.unbounded_send(codec::decode(&event.data()));
        }) as Box<dyn FnMut(MessageEvent)>);
        worker.add_event_listener_with_callback(MESSAGE, listener.as_ref().unchecked_ref())?;
        Ok(Self {
            worker: worker.clone(),
            listener,
            messages,
        })
    }
}

impl Stream for WorkerInbox {
    type Item = WorkerMessage<WebHandles>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.messages.poll_next_unpin(cx)
    }
}

impl Drop for WorkerInbox {
    fn drop(&mut self) {
        if let Err(err) = self
            .worker
            .remove_event_listener_with_callback(MESSAGE, self.listener.as_ref().unchecked_ref())
        {
            warn!("failed to detach worker listener: {err:?}");
        }
    }
}
