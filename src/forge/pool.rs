//! Worker threads fed from a depth-ordered task queue.

use std::any::Any;
use std::cmp::Ordering as CmpOrdering;
use std::collections::{BinaryHeap, HashSet};
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender};
use tracing::{debug, error, trace, warn};

use super::message::{Completed, HeightResult, Task, TaskId, TaskOutput};
use super::ForgeError;
use crate::error::ProtocolError;
use crate::mesh::build_chunk;
use crate::terrain::{CraterField, TerrainFunction};

/// Pool sizing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForgeConfig {
    /// Worker threads; 0 uses one per logical CPU.
    pub workers: usize,
    /// Tasks that may wait in the queue before `submit` blocks (at least 1).
    pub queue_capacity: usize,
}

impl Default for ForgeConfig {
    fn default() -> Self {
        Self {
            workers: 0,
            queue_capacity: 64,
        }
    }
}

impl ForgeConfig {
    pub fn worker_count(&self) -> usize {
        if self.workers > 0 {
            self.workers
        } else {
            num_cpus::get().max(1)
        }
    }
}

/// Runs one task to completion on the calling thread.
pub fn execute(terrain: &TerrainFunction, task: Task) -> Result<TaskOutput, ForgeError> {
    task.validate()?;
    match task {
        Task::Build(request) => {
            let craters = CraterField::new(&request.craters, &request.crater_modifiers)?;
            let chunk = build_chunk(terrain, &request.patch(), &craters, request.normal_mode)?;
            Ok(TaskOutput::Chunk(chunk))
        }
        Task::Height(request) => {
            let craters = CraterField::new(&request.craters, &request.crater_modifiers)?;
            let unit = request.direction.normalize();
            let height = terrain
                .sample_height(unit, request.radius, &craters)
                .ok_or(ProtocolError::InvalidDirection(request.direction.to_array()))?;
            Ok(TaskOutput::Height(HeightResult {
                height,
                position: unit * height,
            }))
        }
    }
}

/// A waiting task. The heap's greatest element is the shallowest, oldest task.
#[derive(Debug)]
struct Queued {
    depth: u32,
    id: TaskId,
    task: Task,
}

impl PartialEq for Queued {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == CmpOrdering::Equal
    }
}

impl Eq for Queued {}

impl PartialOrd for Queued {
    fn partial_cmp(&self, other: &Self) -> Option<CmpOrdering> {
        Some(self.cmp(other))
    }
}

impl Ord for Queued {
    fn cmp(&self, other: &Self) -> CmpOrdering {
        (other.depth, other.id).cmp(&(self.depth, self.id))
    }
}

#[derive(Debug, Default)]
struct Backlog {
    heap: BinaryHeap<Queued>,
    closed: bool,
}

/// Queue shared between the forge and its workers.
#[derive(Debug)]
struct TaskQueue {
    backlog: Mutex<Backlog>,
    capacity: usize,
    /// Signalled when a task is pushed or the queue closes.
    ready: Condvar,
    /// Signalled when a task is popped or removed.
    space: Condvar,
}

impl TaskQueue {
    fn new(capacity: usize) -> Self {
        Self {
            backlog: Mutex::new(Backlog::default()),
            capacity: capacity.max(1),
            ready: Condvar::new(),
            space: Condvar::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Backlog> {
        self.backlog.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Pushes a task, waiting for room.
    fn push(&self, queued: Queued) -> Result<(), ForgeError> {
        let mut backlog = self.lock();
        while !backlog.closed && backlog.heap.len() >= self.capacity {
            backlog = self.space.wait(backlog).unwrap_or_else(PoisonError::into_inner);
        }
        if backlog.closed {
            return Err(ForgeError::Disconnected);
        }
        backlog.heap.push(queued);
        self.ready.notify_one();
        Ok(())
    }

    /// Pushes a task if there is room.
    fn try_push(&self, queued: Queued) -> Result<(), ForgeError> {
        let mut backlog = self.lock();
        if backlog.closed {
            return Err(ForgeError::Disconnected);
        }
        if backlog.heap.len() >= self.capacity {
            return Err(ForgeError::QueueFull);
        }
        backlog.heap.push(queued);
        self.ready.notify_one();
        Ok(())
    }

    /// Blocks until a task is available. `None` once the queue is closed,
    /// even if tasks remain.
    fn pop(&self) -> Option<Queued> {
        let mut backlog = self.lock();
        loop {
            if backlog.closed {
                return None;
            }
            if let Some(queued) = backlog.heap.pop() {
                self.space.notify_one();
                return Some(queued);
            }
            backlog = self.ready.wait(backlog).unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Removes a waiting task; `false` if it is not queued.
    fn remove(&self, id: TaskId) -> bool {
        let mut backlog = self.lock();
        let before = backlog.heap.len();
        backlog.heap.retain(|queued| queued.id != id);
        let removed = backlog.heap.len() < before;
        if removed {
            self.space.notify_one();
        }
        removed
    }

    fn close(&self) {
        self.lock().closed = true;
        self.ready.notify_all();
        self.space.notify_all();
    }
}

#[derive(Debug, Default)]
struct Ledger {
    outstanding: HashSet<TaskId>,
    cancelled: HashSet<TaskId>,
}

/// A pool of chunk-building workers.
///
/// Waiting tasks are handed out shallowest depth first, so coarse chunks
/// overtake finer ones already queued. `submit` blocks while the queue is
/// full; completions are collected with `recv`, `try_recv` or
/// `recv_timeout`. Dropping the forge stops the workers after their current
/// task and joins them.
pub struct ChunkForge {
    queue: Arc<TaskQueue>,
    completions: Receiver<Completed>,
    workers: Vec<JoinHandle<()>>,
    next_id: AtomicU64,
    ledger: Mutex<Ledger>,
}

impl ChunkForge {
    /// Starts the worker threads.
    ///
    /// # Arguments
    /// * `terrain` - Elevation field shared read-only by every worker
    /// * `config` - Worker count and queue capacity
    ///
    /// # Returns
    /// The running forge, or [`ForgeError::Spawn`] if a thread could not start
    pub fn new(terrain: Arc<TerrainFunction>, config: ForgeConfig) -> Result<Self, ForgeError> {
        let worker_count = config.worker_count();
        let queue = Arc::new(TaskQueue::new(config.queue_capacity));
        let (done_tx, done_rx) = channel::unbounded();

        let mut workers = Vec::with_capacity(worker_count);
        for index in 0..worker_count {
            let terrain = Arc::clone(&terrain);
            let tasks = Arc::clone(&queue);
            let done = done_tx.clone();
            let spawned = thread::Builder::new()
                .name(format!("forge-worker-{index}"))
                .spawn(move || worker_loop(index, &terrain, &tasks, &done));
            match spawned {
                Ok(handle) => workers.push(handle),
                Err(err) => {
                    queue.close();
                    for handle in workers {
                        let _ = handle.join();
                    }
                    return Err(err.into());
                }
            }
        }
        debug!(
            workers = worker_count,
            queue = queue.capacity,
            "chunk forge started"
        );

        Ok(Self {
            queue,
            completions: done_rx,
            workers,
            next_id: AtomicU64::new(0),
            ledger: Mutex::new(Ledger::default()),
        })
    }

    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    fn ledger(&self) -> MutexGuard<'_, Ledger> {
        self.ledger.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn register(&self, task: Task) -> Result<Queued, ForgeError> {
        task.validate()?;
        let id = TaskId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.ledger().outstanding.insert(id);
        Ok(Queued {
            depth: task.depth(),
            id,
            task,
        })
    }

    fn unregister(&self, id: TaskId) {
        self.ledger().outstanding.remove(&id);
    }

    /// Queues a task, blocking while the queue is full.
    ///
    /// Invalid tasks are rejected here, before reaching a worker.
    pub fn submit(&self, task: Task) -> Result<TaskId, ForgeError> {
        let queued = self.register(task)?;
        let id = queued.id;
        if let Err(err) = self.queue.push(queued) {
            self.unregister(id);
            return Err(err);
        }
        trace!(id = id.0, "task submitted");
        Ok(id)
    }

    /// Queues a task without blocking.
    pub fn try_submit(&self, task: Task) -> Result<TaskId, ForgeError> {
        let queued = self.register(task)?;
        let id = queued.id;
        if let Err(err) = self.queue.try_push(queued) {
            self.unregister(id);
            return Err(err);
        }
        trace!(id = id.0, "task submitted");
        Ok(id)
    }

    /// Cancels a task. A queued task is dropped before any worker sees it;
    /// a running one has its result discarded on arrival. Returns `false` if
    /// the task is unknown or already delivered.
    pub fn cancel(&self, id: TaskId) -> bool {
        let mut ledger = self.ledger();
        if !ledger.outstanding.contains(&id) {
            return false;
        }
        if self.queue.remove(id) {
            ledger.outstanding.remove(&id);
            trace!(id = id.0, "removed queued task");
            true
        } else {
            ledger.cancelled.insert(id)
        }
    }

    /// Tasks submitted, not cancelled, and not yet received.
    pub fn pending(&self) -> usize {
        let ledger = self.ledger();
        ledger.outstanding.len() - ledger.cancelled.len()
    }

    /// Books a completion; `None` if it belongs to a cancelled task.
    fn accept(&self, completed: Completed) -> Option<Completed> {
        let mut ledger = self.ledger();
        ledger.outstanding.remove(&completed.id);
        if ledger.cancelled.remove(&completed.id) {
            trace!(id = completed.id.0, "discarded cancelled result");
            return None;
        }
        Some(completed)
    }

    fn in_flight(&self) -> bool {
        !self.ledger().outstanding.is_empty()
    }

    /// Waits for the next completion. `None` once nothing is in flight.
    pub fn recv(&self) -> Option<Completed> {
        while self.in_flight() {
            let completed = self.completions.recv().ok()?;
            if let Some(completed) = self.accept(completed) {
                return Some(completed);
            }
        }
        None
    }

    /// Returns a completion if one is ready.
    pub fn try_recv(&self) -> Option<Completed> {
        while let Ok(completed) = self.completions.try_recv() {
            if let Some(completed) = self.accept(completed) {
                return Some(completed);
            }
        }
        None
    }

    /// Like [`ChunkForge::recv`] but gives up after `timeout`.
    pub fn recv_timeout(&self, timeout: Duration) -> Option<Completed> {
        let deadline = std::time::Instant::now() + timeout;
        while self.in_flight() {
            let remaining = deadline.saturating_duration_since(std::time::Instant::now());
            match self.completions.recv_timeout(remaining) {
                Ok(completed) => {
                    if let Some(completed) = self.accept(completed) {
                        return Some(completed);
                    }
                }
                Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => return None,
            }
        }
        None
    }

    /// Receives until every task in flight has completed.
    pub fn drain(&self) -> Vec<Completed> {
        std::iter::from_fn(|| self.recv()).collect()
    }
}

impl Drop for ChunkForge {
    fn drop(&mut self) {
        self.queue.close();
        for handle in self.workers.drain(..) {
            if handle.join().is_err() {
                warn!("forge worker panicked");
            }
        }
        debug!("chunk forge stopped");
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Runs `job`, turning a panic into a failed outcome so its task still completes.
fn run_caught(job: impl FnOnce() -> Result<TaskOutput, ForgeError>) -> Result<TaskOutput, ForgeError> {
    panic::catch_unwind(AssertUnwindSafe(job))
        .unwrap_or_else(|payload| Err(ForgeError::Panicked(panic_message(payload.as_ref()))))
}

fn worker_loop(index: usize, terrain: &TerrainFunction, queue: &TaskQueue, done: &Sender<Completed>) {
    while let Some(Queued { id, task, depth }) = queue.pop() {
        trace!(worker = index, id = id.0, depth, "task started");
        let outcome = run_caught(|| execute(terrain, task));
        match &outcome {
            Err(ForgeError::Panicked(message)) => {
                error!(worker = index, id = id.0, %message, "task panicked")
            }
            Err(err) => warn!(worker = index, id = id.0, error = %err, "task failed"),
            Ok(_) => {}
        }
        if done.send(Completed { id, outcome }).is_err() {
            break;
        }
    }
    trace!(worker = index, "worker exiting");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConfigError;
    use crate::forge::{ChunkRequest, HeightRequest};
    use crate::geometry::FaceDirection;
    use crate::terrain::{CraterModifiers, Seed, TerrainSettings};
    use glam::DVec3;

    fn terrain() -> Arc<TerrainFunction> {
        Arc::new(TerrainFunction::new(TerrainSettings::earth_like(), Seed::from(5)).unwrap())
    }

    fn forge(workers: usize, queue_capacity: usize) -> ChunkForge {
        ChunkForge::new(terrain(), ForgeConfig { workers, queue_capacity }).unwrap()
    }

    fn build(face: FaceDirection) -> Task {
        Task::Build(ChunkRequest::root(face, 1000.0, 4))
    }

    #[test]
    fn test_all_faces_complete() {
        let forge = forge(3, 8);
        let ids: HashSet<_> = FaceDirection::all()
            .into_iter()
            .map(|face| forge.submit(build(face)).unwrap())
            .collect();
        assert_eq!(forge.pending(), 6);

        let completed = forge.drain();
        assert_eq!(completed.len(), 6);
        let returned: HashSet<_> = completed.iter().map(|c| c.id).collect();
        assert_eq!(returned, ids);
        for c in completed {
            match c.outcome {
                Ok(TaskOutput::Chunk(chunk)) => assert_eq!(chunk.positions.len(), 75),
                other => panic!("unexpected outcome {other:?}"),
            }
        }
        assert_eq!(forge.pending(), 0);
        assert!(forge.recv().is_none());
    }

    #[test]
    fn test_pool_matches_direct_execution() {
        let terrain = terrain();
        let forge = ChunkForge::new(Arc::clone(&terrain), ForgeConfig { workers: 2, queue_capacity: 2 }).unwrap();
        let task = build(FaceDirection::Down);
        forge.submit(task.clone()).unwrap();
        let pooled = forge.recv().unwrap().outcome.unwrap();
        let direct = execute(&terrain, task).unwrap();
        assert_eq!(pooled, direct);
    }

    #[test]
    fn test_invalid_task_rejected_at_submit() {
        let forge = forge(1, 1);
        let err = forge
            .submit(Task::Build(ChunkRequest::root(FaceDirection::Up, 1000.0, 0)))
            .unwrap_err();
        assert!(matches!(err, ForgeError::Config(ConfigError::ZeroSubdivisions)));
        assert_eq!(forge.pending(), 0);
    }

    #[test]
    fn test_cancelled_results_are_discarded() {
        let forge = forge(1, 8);
        let keep = forge.submit(build(FaceDirection::Up)).unwrap();
        let drop_me = forge.submit(build(FaceDirection::Left)).unwrap();
        assert!(forge.cancel(drop_me));
        assert!(!forge.cancel(TaskId(999)));
        assert_eq!(forge.pending(), 1);

        let completed = forge.drain();
        assert_eq!(completed.len(), 1);
        assert_eq!(completed[0].id, keep);
        assert!(!forge.cancel(keep));
    }

    #[test]
    fn test_height_task() {
        let terrain = terrain();
        let forge = ChunkForge::new(Arc::clone(&terrain), ForgeConfig { workers: 1, queue_capacity: 1 }).unwrap();
        forge
            .submit(Task::Height(HeightRequest {
                direction: DVec3::new(0.0, 2.0, 0.0),
                radius: 6e6,
                craters: Vec::new(),
                crater_modifiers: CraterModifiers::default(),
            }))
            .unwrap();
        let Some(Completed { outcome: Ok(TaskOutput::Height(result)), .. }) = forge.recv() else {
            panic!("expected a height result");
        };
        let expected = terrain
            .sample_height(DVec3::Y, 6e6, &CraterField::empty())
            .unwrap();
        assert_eq!(result.height, expected);
        assert_eq!(result.position, DVec3::Y * expected);
    }

    #[test]
    fn test_try_submit_reports_full_queue() {
        let forge = forge(1, 1);
        // One task may be picked up by the worker, one waits; eventually the
        // queue is full.
        let mut accepted = 0;
        let mut full = false;
        for _ in 0..64 {
            match forge.try_submit(Task::Build(ChunkRequest::root(FaceDirection::Up, 1000.0, 256))) {
                Ok(_) => accepted += 1,
                Err(ForgeError::QueueFull) => {
                    full = true;
                    break;
                }
                Err(err) => panic!("unexpected error {err}"),
            }
        }
        assert!(full);
        assert_eq!(forge.pending(), accepted);
    }

    #[test]
    fn test_recv_timeout_and_try_recv_when_idle() {
        let forge = forge(1, 1);
        assert!(forge.try_recv().is_none());
        assert!(forge.recv_timeout(Duration::from_millis(10)).is_none());
        forge.submit(build(FaceDirection::Forward)).unwrap();
        assert!(forge.recv_timeout(Duration::from_secs(60)).is_some());
    }

    fn queued(depth: u32, id: u64) -> Queued {
        let mut request = ChunkRequest::root(FaceDirection::Up, 1000.0, 4);
        request.depth = depth;
        Queued {
            depth,
            id: TaskId(id),
            task: Task::Build(request),
        }
    }

    #[test]
    fn test_queue_pops_shallowest_then_oldest() {
        let queue = TaskQueue::new(8);
        for (depth, id) in [(3, 0), (1, 1), (3, 2), (0, 3), (1, 4)] {
            queue.try_push(queued(depth, id)).unwrap();
        }
        let order: Vec<_> = (0..5).filter_map(|_| queue.pop()).map(|q| (q.depth, q.id.0)).collect();
        assert_eq!(order, vec![(0, 3), (1, 1), (1, 4), (3, 0), (3, 2)]);
    }

    #[test]
    fn test_closed_queue_stops_workers_and_rejects_tasks() {
        let queue = TaskQueue::new(1);
        queue.try_push(queued(0, 0)).unwrap();
        assert!(matches!(queue.try_push(queued(0, 1)), Err(ForgeError::QueueFull)));
        queue.close();
        assert!(queue.pop().is_none());
        assert!(matches!(queue.push(queued(0, 2)), Err(ForgeError::Disconnected)));
    }

    #[test]
    fn test_shallow_chunk_overtakes_queued_deep_chunk() {
        let forge = forge(1, 8);
        let blocker = forge
            .submit(Task::Build(ChunkRequest::root(FaceDirection::Forward, 1000.0, 128)))
            .unwrap();
        let [child, ..] = ChunkRequest::root(FaceDirection::Up, 1000.0, 4).children();
        let [grandchild, ..] = child.children();
        assert_eq!(grandchild.depth, 2);
        let deep = forge.submit(Task::Build(grandchild)).unwrap();
        let shallow = forge.submit(build(FaceDirection::Down)).unwrap();

        let order: Vec<_> = forge.drain().into_iter().map(|c| c.id).collect();
        assert_eq!(order.len(), 3);
        let position = |id| order.iter().position(|&done| done == id).unwrap();
        assert!(position(blocker) < position(deep));
        assert!(
            position(shallow) < position(deep),
            "depth-2 chunk finished before the depth-0 chunk queued after it: {order:?}"
        );
    }

    #[test]
    fn test_cancel_removes_queued_task() {
        let forge = forge(1, 8);
        forge
            .submit(Task::Build(ChunkRequest::root(FaceDirection::Forward, 1000.0, 128)))
            .unwrap();
        let waiting = forge.submit(build(FaceDirection::Left)).unwrap();
        assert!(forge.cancel(waiting));
        assert!(!forge.cancel(waiting));
        assert_eq!(forge.pending(), 1);
        let completed = forge.drain();
        assert_eq!(completed.len(), 1);
        assert_ne!(completed[0].id, waiting);
    }

    #[test]
    fn test_panicking_job_becomes_failed_outcome() {
        let outcome = run_caught(|| panic!("normal buffer overflow"));
        match outcome {
            Err(ForgeError::Panicked(message)) => assert_eq!(message, "normal buffer overflow"),
            other => panic!("unexpected outcome {other:?}"),
        }
        let formatted = run_caught(|| panic!("chunk {}", 7));
        assert!(matches!(formatted, Err(ForgeError::Panicked(message)) if message == "chunk 7"));
        let fine = run_caught(|| {
            Ok(TaskOutput::Height(HeightResult {
                height: 1.0,
                position: DVec3::X,
            }))
        });
        assert!(fine.is_ok());
    }

    #[test]
    fn test_default_worker_count() {
        assert!(ForgeConfig::default().worker_count() >= 1);
        assert_eq!(ForgeConfig { workers: 3, queue_capacity: 1 }.worker_count(), 3);
    }
}
