//! Pool launcher: spawns `length` workers, hands each its init message and
//! suspends until every one of them has acknowledged readiness.

use std::future::Future;

use futures::future::{self, Either};
use futures::{pin_mut, Stream};
use log::{debug, error};

use crate::barrier::ReadinessBarrier;
use crate::error::{BootstrapError, BootstrapResult};
use crate::message::{HandleSet, ModuleSource, PoolInitMessage, SharedInit, WorkerMessage};
use crate::once::await_once;
use crate::pool::Pool;

/// Script a freshly spawned context starts from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WorkerEntry<'a> {
    /// The worker script emitted next to the module by the bundler.
    Bundled,
    /// A transient object URL derived from the launcher's own script.
    ScriptUrl(&'a str),
}

/// Execution-context facilities of one deployment environment.
pub trait Platform {
    type Handles: HandleSet;
    type Worker: 'static;
    /// Messages coming back from one worker.
    type Inbox: Stream<Item = WorkerMessage<Self::Handles>> + Unpin + 'static;
    /// Fetched copy of the launcher's own script.
    type Script;

    fn spawn(&self, index: usize, entry: WorkerEntry<'_>) -> BootstrapResult<Self::Worker>;

    fn listen(&self, worker: &Self::Worker) -> BootstrapResult<Self::Inbox>;

    fn post(
        &self,
        worker: &Self::Worker,
        message: WorkerMessage<Self::Handles>,
    ) -> BootstrapResult<()>;

    fn fetch_own_script(&self) -> impl Future<Output = BootstrapResult<Self::Script>> {
        future::ready(Err(BootstrapError::Unsupported("self-fetching worker scripts")))
    }

    fn create_script_url(&self, script: &Self::Script) -> BootstrapResult<String> {
        let _ = script;
        Err(BootstrapError::Unsupported("script object URLs"))
    }

    fn revoke_script_url(&self, url: &str) {
        let _ = url;
    }
}

/// Arguments of [`start_workers`].
pub struct PoolRequest<H: HandleSet> {
    pub source: ModuleSource<H::Module>,
    pub memory: H::Memory,
    pub length: usize,
    pub task_receiver: H::TaskReceiver,
    pub sync_object: H::SyncObject,
    /// `object_senders[i]` goes to worker `i`.
    pub object_senders: Vec<H::ObjectSender>,
}

/// Object URL that is revoked when the guard goes out of scope.
struct ScopedScriptUrl<'p, P: Platform> {
    platform: &'p P,
    url: String,
}

impl<'p, P: Platform> ScopedScriptUrl<'p, P> {
    fn create(platform: &'p P, script: &P::Script) -> BootstrapResult<Self> {
        let url = platform.create_script_url(script)?;
        Ok(Self { platform, url })
    }

    fn as_str(&self) -> &str {
        &self.url
    }
}

impl<P: Platform> Drop for ScopedScriptUrl<'_, P> {
    fn drop(&mut self) {
        self.platform.revoke_script_url(&self.url);
    }
}

/// Spawns the workers described by `request` and resolves once all of them
/// are ready.
///
/// Failures to spawn or reach a worker are logged and leave the returned
/// future pending forever; wrap the call with [`start_workers_with_deadline`]
/// to turn that into an error.
pub async fn start_workers<P: Platform>(
    platform: &P,
    request: PoolRequest<P::Handles>,
) -> BootstrapResult<Pool<P::Worker>> {
    let mut barrier = arm_pool(platform, request).await?;
    let workers = barrier.wait().await;
    debug!("pool ready with {} worker(s)", workers.len());
    Ok(Pool::from_ready(workers))
}

/// Like [`start_workers`], but gives up when `deadline` completes first and
/// reports the lowest worker index that never became ready.
pub async fn start_workers_with_deadline<P, D>(
    platform: &P,
    request: PoolRequest<P::Handles>,
    deadline: D,
) -> BootstrapResult<Pool<P::Worker>>
where
    P: Platform,
    D: Future<Output = ()>,
{
    let mut barrier = arm_pool(platform, request).await?;

    let outcome = {
        let wait = barrier.wait();
        pin_mut!(wait, deadline);
        match future::select(wait, deadline).await {
            Either::Left((workers, _)) => Some(workers),
            Either::Right(((), _)) => None,
        }
    };

    match outcome {
        Some(workers) => Ok(Pool::from_ready(workers)),
        None => {
            let index = barrier.outstanding().first().copied().unwrap_or_default();
            let cause = barrier.failure(index).map(str::to_owned);
            error!("worker {index} missed the bootstrap deadline");
            Err(BootstrapError::WorkerBootstrapTimeout { index, cause })
        }
    }
}

async fn arm_pool<P: Platform>(
    platform: &P,
    request: PoolRequest<P::Handles>,
) -> BootstrapResult<ReadinessBarrier<'static, P::Worker>> {
    let PoolRequest {
        source,
        memory,
        length,
        task_receiver,
        sync_object,
        object_senders,
    } = request;

    if object_senders.len() != length {
        return Err(BootstrapError::SenderCountMismatch {
            expected: length,
            actual: object_senders.len(),
        });
    }

    let script = match &source {
        ModuleSource::LocatorFetch(locator) if length > 0 => {
            debug!("fetching worker script for locator {locator}");
            Some(platform.fetch_own_script().await?)
        }
        _ => None,
    };

    let shared = SharedInit {
        module: source,
        memory,
        task_receiver,
        sync_object,
    };

    let mut barrier = ReadinessBarrier::new(length);
    for (index, object_sender) in object_senders.into_iter().enumerate() {
        let message = shared.for_worker(object_sender);
        match launch_worker(platform, index, script.as_ref(), message) {
            Ok((worker, inbox)) => barrier.track(index, async move {
                await_once(inbox, WorkerMessage::is_ready).await?;
                Ok::<_, BootstrapError>(worker)
            }),
            Err(err) => {
                error!("worker {index} failed to launch: {err}");
                barrier.track(index, future::ready(Err(err)));
            }
        }
    }
    Ok(barrier)
}

fn launch_worker<P: Platform>(
    platform: &P,
    index: usize,
    script: Option<&P::Script>,
    message: PoolInitMessage<P::Handles>,
) -> BootstrapResult<(P::Worker, P::Inbox)> {
    let worker = match script {
        Some(script) => {
            let url = ScopedScriptUrl::create(platform, script)?;
            platform.spawn(index, WorkerEntry::ScriptUrl(url.as_str()))?
        }
        None => platform.spawn(index, WorkerEntry::Bundled)?,
    };
    // Listen before posting so the acknowledgment cannot be missed.
    let inbox = platform.listen(&worker)?;
    platform.post(&worker, WorkerMessage::Init(message))?;
    debug!("worker {index} spawned, init delivered");
    Ok((worker, inbox))
}
