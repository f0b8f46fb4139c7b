use std::ops::Index;
use std::slice;

/// A spawned execution context, owned by the launcher's caller.
#[derive(Debug)]
pub struct WorkerHandle<W> {
    index: usize,
    worker: W,
}

impl<W> WorkerHandle<W> {
    pub(crate) fn new(index: usize, worker: W) -> Self {
        Self { index, worker }
    }

    /// Position in the pool; matches the object sender this worker received.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn worker(&self) -> &W {
        &self.worker
    }

    pub fn into_inner(self) -> W {
        self.worker
    }
}

/// Fully initialized workers, ordered by index.
#[derive(Debug)]
pub struct Pool<W> {
    workers: Vec<WorkerHandle<W>>,
}

impl<W> Pool<W> {
    pub(crate) fn from_ready(workers: Vec<W>) -> Self {
        Self {
            workers: workers
                .into_iter()
                .enumerate()
                .map(|(index, worker)| WorkerHandle::new(index, worker))
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.workers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&WorkerHandle<W>> {
        self.workers.get(index)
    }

    pub fn iter(&self) -> slice::Iter<'_, WorkerHandle<W>> {
        self.workers.iter()
    }

    pub fn into_workers(self) -> Vec<W> {
        self.workers
            .into_iter()
            .map(WorkerHandle::into_inner)
            .collect()
    }
}

impl<W> Index<usize> for Pool<W> {
    type Output = WorkerHandle<W>;

    fn index(&self, index: usize) -> &Self::Output {
        &self.workers[index]
    }
}

impl<W> IntoIterator for Pool<W> {
    type Item = WorkerHandle<W>;
    type IntoIter = std::vec::IntoIter<WorkerHandle<W>>;

    fn into_iter(self) -> Self::IntoIter {
        self.workers.into_iter()
    }
}

impl<'a, W> IntoIterator for &'a Pool<W> {
    type Item = &'a WorkerHandle<W>;
    type IntoIter = slice::Iter<'a, WorkerHandle<W>>;

    fn into_iter(self) -> Self::IntoIter {
        self.workers.iter()
    }
}
