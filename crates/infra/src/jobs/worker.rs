//! Single-consumer worker loop.

use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use rowmark_annotate::RowTransformer;
use rowmark_core::{BlobClass, JobId, JobState};
use tracing::{debug, error, info, warn};

use super::queue::{JobQueue, PendingQueue, QueueError, StateRegister};
use crate::blob_store::BlobStore;

/// Worker configuration.
#[derive(Debug, Clone)]
pub struct JobWorkerConfig {
    /// Wait between polls when the queue is empty.
    pub poll_interval: Duration,
    /// Thread name, also used in log fields.
    pub name: String,
}

impl Default for JobWorkerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(250),
            name: "job-worker".to_string(),
        }
    }
}

impl JobWorkerConfig {
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }
}

/// Step of the pipeline that failed. Only logged; the stored state is just
/// `failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureStage {
    LoadRaw,
    Transform,
    SaveProcessed,
    /// The output was stored but `done` could not be recorded.
    RecordState,
}

impl std::fmt::Display for FailureStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailureStage::LoadRaw => f.write_str("load_raw"),
            FailureStage::Transform => f.write_str("transform"),
            FailureStage::SaveProcessed => f.write_str("save_processed"),
            FailureStage::RecordState => f.write_str("record_state"),
        }
    }
}

/// What happened to one dequeued job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    Done,
    Failed { stage: FailureStage, error: String },
    /// The job was already terminal when popped (e.g. pushed twice); left as is.
    Skipped(JobState),
}

impl JobOutcome {
    fn failed(stage: FailureStage, error: impl std::fmt::Display) -> Self {
        JobOutcome::Failed {
            stage,
            error: error.to_string(),
        }
    }

    /// State the register ends up in.
    pub fn state(&self) -> JobState {
        match self {
            JobOutcome::Done => JobState::Done,
            JobOutcome::Failed { .. } => JobState::Failed,
            JobOutcome::Skipped(state) => *state,
        }
    }
}

/// Worker runtime statistics.
#[derive(Debug, Clone, Default)]
pub struct WorkerStats {
    pub jobs_processed: u64,
    pub jobs_succeeded: u64,
    pub jobs_failed: u64,
    pub jobs_skipped: u64,
    pub uptime_secs: u64,
}

/// Handle to control a running worker.
#[derive(Debug)]
pub struct JobWorkerHandle {
    shutdown: mpsc::Sender<()>,
    join: Option<thread::JoinHandle<()>>,
    stats: Arc<Mutex<WorkerStats>>,
}

impl JobWorkerHandle {
    /// Stop after the in-flight job (if any) and wait for the thread to exit.
    pub fn shutdown(mut self) {
        let _ = self.shutdown.send(());
        if let Some(j) = self.join.take() {
            let _ = j.join();
        }
    }

    pub fn stats(&self) -> WorkerStats {
        match self.stats.lock() {
            Ok(s) => s.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

/// Drains a [`JobQueue`]: load raw blob, transform, save processed blob,
/// record the terminal state.
///
/// Store, queue and transformer are injected so the loop can run against
/// in-memory fakes. Run at most one worker per queue unless the pending
/// back-end pops atomically.
pub struct JobWorker<B, P, S, T> {
    blobs: B,
    queue: JobQueue<P, S>,
    transformer: T,
}

impl<B, P, S, T> JobWorker<B, P, S, T>
where
    B: BlobStore,
    P: PendingQueue,
    S: StateRegister,
    T: RowTransformer,
{
    pub fn new(blobs: B, queue: JobQueue<P, S>, transformer: T) -> Self {
        Self {
            blobs,
            queue,
            transformer,
        }
    }

    /// Pop one job and process it. `Ok(None)` when the queue is empty.
    pub fn run_once(&self) -> Result<Option<(JobId, JobOutcome)>, QueueError> {
        let Some(id) = self.queue.dequeue()? else {
            return Ok(None);
        };

        match self.queue.get_state(id) {
            Ok(state) if state.is_terminal() => {
                warn!(job_id = %id, state = %state, "dequeued job is already terminal; skipping");
                return Ok(Some((id, JobOutcome::Skipped(state))));
            }
            Ok(_) | Err(QueueError::NotFound(_)) => {}
            Err(e) => {
                warn!(job_id = %id, error = %e, "could not read job state; processing anyway");
            }
        }

        Ok(Some((id, self.process_job(id))))
    }

    /// Run the pipeline for `id` and record the terminal state.
    ///
    /// Never returns an error: every failure becomes `failed` for this job.
    pub fn process_job(&self, id: JobId) -> JobOutcome {
        let started = Instant::now();
        let outcome = self.record(id, self.run_steps(id));

        let elapsed_ms = started.elapsed().as_millis() as u64;
        match &outcome {
            JobOutcome::Failed { stage, error } => {
                warn!(job_id = %id, stage = %stage, error = %error, elapsed_ms, "job failed");
            }
            _ => info!(job_id = %id, elapsed_ms, "job done"),
        }

        outcome
    }

    /// Write the terminal state for `outcome`.
    ///
    /// A processed blob must only exist for a `done` job. If `done` cannot be
    /// written the blob is removed and `failed` is attempted; should that also
    /// fail the job stays `processing`, which has no output either.
    fn record(&self, id: JobId, outcome: JobOutcome) -> JobOutcome {
        let state = outcome.state();
        let Err(e) = self.queue.set_state(id, state) else {
            return outcome;
        };
        error!(job_id = %id, state = %state, error = %e, "failed to record job state");

        if !matches!(outcome, JobOutcome::Done) {
            return outcome;
        }

        if let Err(rm) = self.blobs.remove(BlobClass::Processed, id) {
            error!(job_id = %id, error = %rm, "failed to discard unrecorded output");
        }
        if let Err(mark) = self.queue.set_state(id, JobState::Failed) {
            error!(job_id = %id, error = %mark, "failed to mark job failed");
        }
        JobOutcome::failed(FailureStage::RecordState, e)
    }

    fn run_steps(&self, id: JobId) -> JobOutcome {
        let raw = match self.blobs.load_raw(id) {
            Ok(bytes) => bytes,
            Err(e) => return JobOutcome::failed(FailureStage::LoadRaw, e),
        };

        let processed = match self.transformer.transform(&raw) {
            Ok(bytes) => bytes,
            Err(e) => return JobOutcome::failed(FailureStage::Transform, e),
        };

        if let Err(e) = self.blobs.save_processed(id, &processed) {
            return JobOutcome::failed(FailureStage::SaveProcessed, e);
        }

        debug!(
            job_id = %id,
            input_bytes = raw.len(),
            output_bytes = processed.len(),
            "processed blob saved"
        );
        JobOutcome::Done
    }
}

impl<B, P, S, T> JobWorker<B, P, S, T>
where
    B: BlobStore + 'static,
    P: PendingQueue + 'static,
    S: StateRegister + 'static,
    T: RowTransformer + 'static,
{
    /// Run the loop on a dedicated named thread.
    pub fn spawn(self, config: JobWorkerConfig) -> std::io::Result<JobWorkerHandle> {
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();
        let stats = Arc::new(Mutex::new(WorkerStats::default()));
        let stats_clone = stats.clone();

        let join = thread::Builder::new()
            .name(config.name.clone())
            .spawn(move || worker_loop(self, config, shutdown_rx, stats_clone))?;

        Ok(JobWorkerHandle {
            shutdown: shutdown_tx,
            join: Some(join),
            stats,
        })
    }
}

fn worker_loop<B, P, S, T>(
    worker: JobWorker<B, P, S, T>,
    config: JobWorkerConfig,
    shutdown_rx: mpsc::Receiver<()>,
    stats: Arc<Mutex<WorkerStats>>,
) where
    B: BlobStore,
    P: PendingQueue,
    S: StateRegister,
    T: RowTransformer,
{
    info!(worker = %config.name, poll_ms = config.poll_interval.as_millis() as u64, "job worker started");
    let start_time = Instant::now();

    loop {
        if shutdown_rx.try_recv().is_ok() {
            break;
        }

        let result = worker.run_once();

        if let Ok(mut s) = stats.lock() {
            s.uptime_secs = start_time.elapsed().as_secs();
            if let Ok(Some((_, outcome))) = &result {
                match outcome {
                    JobOutcome::Done => {
                        s.jobs_processed += 1;
                        s.jobs_succeeded += 1;
                    }
                    JobOutcome::Failed { .. } => {
                        s.jobs_processed += 1;
                        s.jobs_failed += 1;
                    }
                    JobOutcome::Skipped(_) => s.jobs_skipped += 1,
                }
            }
        }

        match result {
            // Go straight to the next job.
            Ok(Some(_)) => continue,
            Ok(None) => {}
            Err(e) => {
                error!(worker = %config.name, error = %e, "failed to dequeue job");
            }
        }

        if wait_for_shutdown(&shutdown_rx, config.poll_interval) {
            break;
        }
    }

    info!(worker = %config.name, "job worker stopped");
}

/// Idle wait between polls. Returns true when shutdown was requested.
fn wait_for_shutdown(rx: &mpsc::Receiver<()>, interval: Duration) -> bool {
    match rx.recv_timeout(interval) {
        Ok(()) => true,
        Err(RecvTimeoutError::Timeout) => false,
        // Handle dropped without calling shutdown: keep polling detached.
        Err(RecvTimeoutError::Disconnected) => {
            thread::sleep(interval);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blob_store::{BlobStoreError, InMemoryBlobStore};
    use crate::jobs::in_memory::InMemoryJobQueue;
    use crate::jobs::{InMemoryPendingQueue, InMemoryStateRegister, StateRegister};
    use rowmark_annotate::{annotate, EmailFlagTransformer};

    type TestWorker = JobWorker<
        Arc<InMemoryBlobStore>,
        Arc<crate::jobs::InMemoryPendingQueue>,
        Arc<crate::jobs::InMemoryStateRegister>,
        EmailFlagTransformer,
    >;

    fn setup() -> (Arc<InMemoryBlobStore>, InMemoryJobQueue, TestWorker) {
        let blobs = InMemoryBlobStore::arc();
        let queue = InMemoryJobQueue::in_memory();
        let worker = JobWorker::new(blobs.clone(), queue.clone(), EmailFlagTransformer);
        (blobs, queue, worker)
    }

    fn submit(blobs: &InMemoryBlobStore, queue: &InMemoryJobQueue, bytes: &[u8]) -> JobId {
        let id = JobId::new();
        blobs.save_raw(id, bytes).unwrap();
        queue.enqueue(id).unwrap();
        id
    }

    /// Blob store whose processed-class writes always fail.
    struct ReadOnlyOutputs(InMemoryBlobStore);

    impl BlobStore for ReadOnlyOutputs {
        fn save(&self, class: BlobClass, id: JobId, bytes: &[u8]) -> Result<(), BlobStoreError> {
            match class {
                BlobClass::Processed => Err(BlobStoreError::Storage("disk full".to_string())),
                BlobClass::Raw => self.0.save(class, id, bytes),
            }
        }

        fn load(&self, class: BlobClass, id: JobId) -> Result<Vec<u8>, BlobStoreError> {
            self.0.load(class, id)
        }

        fn exists(&self, class: BlobClass, id: JobId) -> Result<bool, BlobStoreError> {
            self.0.exists(class, id)
        }

        fn remove(&self, class: BlobClass, id: JobId) -> Result<(), BlobStoreError> {
            self.0.remove(class, id)
        }
    }

    /// State register that refuses to record `done`.
    struct DoneUnwritable(InMemoryStateRegister);

    impl StateRegister for DoneUnwritable {
        fn set(&self, id: JobId, state: JobState) -> Result<(), QueueError> {
            match state {
                JobState::Done => Err(QueueError::Storage("connection reset".to_string())),
                _ => self.0.set(id, state),
            }
        }

        fn get(&self, id: JobId) -> Result<Option<JobState>, QueueError> {
            self.0.get(id)
        }
    }

    #[test]
    fn empty_queue_yields_nothing() {
        let (_blobs, _queue, worker) = setup();
        assert!(worker.run_once().unwrap().is_none());
    }

    #[test]
    fn successful_job_matches_direct_transform() {
        let (blobs, queue, worker) = setup();
        let input = b"name,email\nJohn Doe,john@example.com\nJane Doe,none\n";
        let id = submit(&blobs, &queue, input);

        let (popped, outcome) = worker.run_once().unwrap().unwrap();
        assert_eq!(popped, id);
        assert_eq!(outcome, JobOutcome::Done);
        assert_eq!(queue.get_state(id).unwrap(), JobState::Done);

        let raw = blobs.load_raw(id).unwrap();
        assert_eq!(blobs.load_processed(id).unwrap(), annotate(&raw).unwrap());
    }

    #[test]
    fn missing_raw_blob_fails_job() {
        let (blobs, queue, worker) = setup();
        let id = JobId::new();
        queue.enqueue(id).unwrap();

        let (_, outcome) = worker.run_once().unwrap().unwrap();
        assert!(matches!(
            outcome,
            JobOutcome::Failed { stage: FailureStage::LoadRaw, .. }
        ));
        assert_eq!(queue.get_state(id).unwrap(), JobState::Failed);
        assert!(!blobs.exists(BlobClass::Processed, id).unwrap());
    }

    #[test]
    fn malformed_input_fails_without_output() {
        let (blobs, queue, worker) = setup();
        let id = submit(&blobs, &queue, b"a,b\n1,2,3\n");

        let (_, outcome) = worker.run_once().unwrap().unwrap();
        assert!(matches!(
            outcome,
            JobOutcome::Failed { stage: FailureStage::Transform, .. }
        ));
        assert_eq!(queue.get_state(id).unwrap(), JobState::Failed);
        assert!(!blobs.exists(BlobClass::Processed, id).unwrap());
    }

    #[test]
    fn malformed_quoting_fails_without_output() {
        let inputs: [&[u8]; 3] = [
            b"a,b\n1,x\"y\n",
            b"a\n\"x\n",
            b"a,b\n\"ab\"c,d\n",
        ];

        for input in inputs {
            let (blobs, queue, worker) = setup();
            let id = submit(&blobs, &queue, input);

            let (_, outcome) = worker.run_once().unwrap().unwrap();
            assert!(
                matches!(outcome, JobOutcome::Failed { stage: FailureStage::Transform, .. }),
                "input {:?} gave {outcome:?}",
                String::from_utf8_lossy(input)
            );
            assert_eq!(queue.get_state(id).unwrap(), JobState::Failed);
            assert!(!blobs.exists(BlobClass::Processed, id).unwrap());
        }
    }

    #[test]
    fn unrecorded_done_discards_output() {
        let blobs = InMemoryBlobStore::arc();
        let queue = JobQueue::new(
            Arc::new(InMemoryPendingQueue::new()),
            Arc::new(DoneUnwritable(InMemoryStateRegister::new())),
        );
        let worker = JobWorker::new(blobs.clone(), queue.clone(), EmailFlagTransformer);

        let id = JobId::new();
        blobs.save_raw(id, b"h\nv@x.io\n").unwrap();
        queue.enqueue(id).unwrap();

        let (_, outcome) = worker.run_once().unwrap().unwrap();
        assert!(matches!(
            outcome,
            JobOutcome::Failed { stage: FailureStage::RecordState, .. }
        ));
        assert_eq!(queue.get_state(id).unwrap(), JobState::Failed);
        assert!(!blobs.exists(BlobClass::Processed, id).unwrap());
    }

    #[test]
    fn save_failure_fails_job() {
        let blobs = Arc::new(ReadOnlyOutputs(InMemoryBlobStore::new()));
        let queue = InMemoryJobQueue::in_memory();
        let worker = JobWorker::new(blobs.clone(), queue.clone(), EmailFlagTransformer);

        let id = JobId::new();
        blobs.save_raw(id, b"a\nb\n").unwrap();
        queue.enqueue(id).unwrap();

        let (_, outcome) = worker.run_once().unwrap().unwrap();
        assert!(matches!(
            outcome,
            JobOutcome::Failed { stage: FailureStage::SaveProcessed, .. }
        ));
        assert_eq!(queue.get_state(id).unwrap(), JobState::Failed);
    }

    #[test]
    fn empty_upload_completes_with_empty_output() {
        let (blobs, queue, worker) = setup();
        let id = submit(&blobs, &queue, b"");

        let (_, outcome) = worker.run_once().unwrap().unwrap();
        assert_eq!(outcome, JobOutcome::Done);
        assert!(blobs.load_processed(id).unwrap().is_empty());
    }

    #[test]
    fn jobs_are_served_in_enqueue_order() {
        let (blobs, queue, worker) = setup();
        let ids: Vec<JobId> = (0..3).map(|_| submit(&blobs, &queue, b"h\nv\n")).collect();

        let served: Vec<JobId> = std::iter::from_fn(|| worker.run_once().unwrap().map(|(id, _)| id))
            .collect();
        assert_eq!(served, ids);
    }

    #[test]
    fn terminal_job_is_not_processed_twice() {
        let (blobs, queue, worker) = setup();
        let id = submit(&blobs, &queue, b"h\nv\n");
        worker.run_once().unwrap();
        let first = blobs.load_processed(id).unwrap();

        // Same identifier pushed again behind the facade's back.
        queue.enqueue(id).unwrap();
        queue.set_state(id, JobState::Done).unwrap();

        let (_, outcome) = worker.run_once().unwrap().unwrap();
        assert_eq!(outcome, JobOutcome::Skipped(JobState::Done));
        assert_eq!(blobs.load_processed(id).unwrap(), first);
    }

    #[test]
    fn failure_does_not_stop_the_loop() {
        let (blobs, queue, worker) = setup();
        let bad = submit(&blobs, &queue, b"a,b\n1\n");
        let good = submit(&blobs, &queue, b"x\ny@z.io\n");

        let handle = worker
            .spawn(
                JobWorkerConfig::default()
                    .with_name("test-worker")
                    .with_poll_interval(Duration::from_millis(10)),
            )
            .unwrap();

        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline {
            let done = [bad, good]
                .iter()
                .all(|id| queue.get_state(*id).unwrap().is_terminal());
            if done {
                break;
            }
            thread::sleep(Duration::from_millis(10));
        }

        assert_eq!(queue.get_state(bad).unwrap(), JobState::Failed);
        assert_eq!(queue.get_state(good).unwrap(), JobState::Done);
        assert_eq!(blobs.load_processed(good).unwrap(), b"x,has_email\ny@z.io,true\n");

        // Stats are updated after the state write.
        let mut stats = handle.stats();
        while stats.jobs_processed < 2 && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(10));
            stats = handle.stats();
        }
        assert_eq!(stats.jobs_processed, 2);
        assert_eq!(stats.jobs_succeeded, 1);
        assert_eq!(stats.jobs_failed, 1);

        handle.shutdown();
    }

    #[test]
    fn shutdown_stops_idle_worker() {
        let (_blobs, _queue, worker) = setup();
        let handle = worker
            .spawn(JobWorkerConfig::default().with_poll_interval(Duration::from_secs(30)))
            .unwrap();

        let started = Instant::now();
        handle.shutdown();
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn outcome_maps_to_state() {
        assert_eq!(JobOutcome::Done.state(), JobState::Done);
        assert_eq!(
            JobOutcome::failed(FailureStage::Transform, "bad").state(),
            JobState::Failed
        );
        assert_eq!(FailureStage::SaveProcessed.to_string(), "save_processed");
    }
}
