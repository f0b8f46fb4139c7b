use std::future::Future;

use futures::future::{self, FutureExt, LocalBoxFuture};
use futures::stream::{FuturesUnordered, StreamExt};
use log::{debug, warn};

use crate::error::BootstrapResult;

type Tracked<'a, T> = LocalBoxFuture<'a, (usize, BootstrapResult<T>)>;

/// All-of-N rendezvous over indexed participants.
///
/// Participants may complete in any order; [`ReadinessBarrier::wait`] hands
/// back their outputs ordered by index. A participant that fails is recorded
/// and the barrier then never resolves, so a caller can only ever observe a
/// fully populated result.
pub struct ReadinessBarrier<'a, T> {
    pending: FuturesUnordered<Tracked<'a, T>>,
    slots: Vec<Option<T>>,
    failures: Vec<Option<String>>,
}

impl<'a, T: 'a> ReadinessBarrier<'a, T> {
    pub fn new(participants: usize) -> Self {
        Self {
            pending: FuturesUnordered::new(),
            slots: (0..participants).map(|_| None).collect(),
            failures: vec![None; participants],
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn track<F>(&mut self, index: usize, participant: F)
    where
        F: Future<Output = BootstrapResult<T>> + 'a,
    {
        if index >= self.slots.len() {
            self.slots.resize_with(index + 1, || None);
            self.failures.resize(index + 1, None);
        }
        self.pending
            .push(async move { (index, participant.await) }.boxed_local());
    }

    /// Indices that have not completed yet, lowest first.
    pub fn outstanding(&self) -> Vec<usize> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.is_none())
            .map(|(index, _)| index)
            .collect()
    }

    pub fn failure(&self, index: usize) -> Option<&str> {
        self.failures.get(index).and_then(|f| f.as_deref())
    }

    /// Waits for every participant. Never resolves if any of them failed.
    pub async fn wait(&mut self) -> Vec<T> {
        while let Some((index, outcome)) = self.pending.next().await {
            match outcome {
                Ok(value) => {
                    debug!("barrier: participant {index} ready");
                    self.slots[index] = Some(value);
                }
                Err(err) => {
                    warn!("barrier: participant {index} will never become ready: {err}");
                    self.failures[index] = Some(err.to_string());
                }
            }
        }

        if self.slots.iter().any(Option::is_none) {
            future::pending::<()>().await;
        }

        std::mem::take(&mut self.slots)
            .into_iter()
            .flatten()
            .collect()
    }
}
