//! Worker entry shim: the first code a spawned context runs.

use std::future::Future;

use futures::Stream;
use log::{debug, error};

use crate::error::{BootstrapError, BootstrapResult};
use crate::message::{HandleSet, ModuleSource, ReadinessSignal, WorkerMessage};
use crate::once::await_once;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ShimState {
    AwaitingInit,
    Instantiating,
    SignalingReady,
    RunningLoop,
}

/// Services a worker context offers to its shim.
pub trait WorkerHost {
    type Handles: HandleSet;
    /// Live module instance bound to the shared memory.
    type Instance;

    /// Produces the module instance; resolves locators first when needed.
    fn instantiate(
        &self,
        module: ModuleSource<<Self::Handles as HandleSet>::Module>,
        memory: <Self::Handles as HandleSet>::Memory,
    ) -> impl Future<Output = BootstrapResult<Self::Instance>>;

    /// Sends the acknowledgment on the channel the launcher listens to.
    fn signal_ready(&self, signal: ReadinessSignal) -> BootstrapResult<()>;

    /// Enters the runtime's worker loop. Under normal operation this does not
    /// return while the pool is alive.
    fn run_worker_loop(
        &self,
        instance: Self::Instance,
        task_receiver: <Self::Handles as HandleSet>::TaskReceiver,
        sync_object: <Self::Handles as HandleSet>::SyncObject,
        object_sender: <Self::Handles as HandleSet>::ObjectSender,
    );
}

/// Per-context handshake state machine:
/// `AwaitingInit → Instantiating → SignalingReady → RunningLoop`.
pub struct WorkerShim<'h, H: WorkerHost> {
    host: &'h H,
    state: ShimState,
}

impl<'h, H: WorkerHost> WorkerShim<'h, H> {
    pub fn new(host: &'h H) -> Self {
        Self {
            host,
            state: ShimState::AwaitingInit,
        }
    }

    pub fn state(&self) -> ShimState {
        self.state
    }

    fn enter(&mut self, next: ShimState) {
        debug!("worker shim: {:?} -> {next:?}", self.state);
        self.state = next;
    }

    /// Performs one handshake cycle on `inbox`, then hands control to the
    /// worker loop.
    ///
    /// Instantiation failure is fatal for the worker: the error is returned
    /// without signaling readiness and is never retried.
    pub async fn run<S>(&mut self, inbox: S) -> BootstrapResult<()>
    where
        S: Stream<Item = WorkerMessage<H::Handles>> + Unpin,
    {
        if self.state != ShimState::AwaitingInit {
            return Err(BootstrapError::Unsupported(
                "worker shim can only run one handshake",
            ));
        }

        let init = await_once(inbox, WorkerMessage::is_init)
            .await?
            .into_init()
            .ok_or(BootstrapError::ChannelClosed)?;

        self.enter(ShimState::Instantiating);
        let instance = match self.host.instantiate(init.module, init.memory).await {
            Ok(instance) => instance,
            Err(err) => {
                error!("worker shim: instantiation failed: {err}");
                return Err(err);
            }
        };

        self.enter(ShimState::SignalingReady);
        self.host.signal_ready(ReadinessSignal)?;

        self.enter(ShimState::RunningLoop);
        self.host.run_worker_loop(
            instance,
            init.task_receiver,
            init.sync_object,
            init.object_sender,
        );
        Ok(())
    }
}
