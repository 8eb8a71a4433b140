//! The generation service: admits requests, runs feature extraction and
//! inference on background workers, and applies finished grids from the
//! foreground tick loop.
//!
//! Background workers only ever read the world. The finished grid is sent
//! back over a channel and every write happens inside [`GenerationService::tick`].

use std::fmt;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{Receiver, Sender, TryRecvError, unbounded};

use crate::config::GenerationConfig;
use crate::constants::CHUNK_SIZE;
use crate::error::{EngineError, GenerationError};
use crate::features::FeatureTensorBuilder;
use crate::inference::{ClassificationGrid, InferenceEngine};
use crate::mutator::{BatchedWorldMutator, MutationEvent};
use crate::registry::{GenerationTaskRegistry, RequesterId, TaskHandle};
use crate::tables::CategoryTables;
use crate::world::SharedWorld;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenerationRequest {
    pub requester: RequesterId,
    /// Minimum corner of the 16x16 region.
    pub origin_x: i32,
    pub origin_z: i32,
}

impl GenerationRequest {
    pub fn for_chunk(requester: RequesterId, chunk_x: i32, chunk_z: i32) -> Self {
        Self {
            requester,
            origin_x: chunk_x * CHUNK_SIZE,
            origin_z: chunk_z * CHUNK_SIZE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineStatus {
    Available,
    /// The model or tables failed to load. Stays this way for the life of
    /// the process.
    Unavailable(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationEventKind {
    Started { origin_x: i32, origin_z: i32 },
    Gathering,
    Inferring,
    Applying,
    Progress { percent: u32, changed: usize },
    Completed { changed: usize },
    Cancelled,
    Failed { message: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationEvent {
    pub requester: RequesterId,
    pub kind: GenerationEventKind,
}

impl GenerationEvent {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self.kind,
            GenerationEventKind::Completed { .. }
                | GenerationEventKind::Cancelled
                | GenerationEventKind::Failed { .. }
        )
    }
}

impl fmt::Display for GenerationEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            GenerationEventKind::Started { origin_x, origin_z } => write!(
                f,
                "Starting terrain generation for region at {}, {}",
                origin_x, origin_z
            ),
            GenerationEventKind::Gathering => write!(f, "Gathering data and preparing model input..."),
            GenerationEventKind::Inferring => write!(f, "Running model inference..."),
            GenerationEventKind::Applying => write!(f, "Applying terrain changes to world..."),
            GenerationEventKind::Progress { percent, changed } => {
                write!(f, "Progress: {}% ({} blocks changed)", percent, changed)
            }
            GenerationEventKind::Completed { changed } => {
                write!(f, "Terrain generation complete! Changed {} blocks.", changed)
            }
            GenerationEventKind::Cancelled => write!(f, "Terrain generation canceled."),
            GenerationEventKind::Failed { message } => {
                write!(f, "Error during terrain generation: {}", message)
            }
        }
    }
}

/// Foreground pacing for grid application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Schedule {
    pub batch_size: usize,
    pub start_delay_ticks: u64,
    pub ticks_between_batches: u64,
}

impl From<&GenerationConfig> for Schedule {
    fn from(config: &GenerationConfig) -> Self {
        Self {
            batch_size: config.blocks_per_batch.max(1),
            start_delay_ticks: config.start_delay_ticks,
            ticks_between_batches: config.ticks_between_batches.max(1),
        }
    }
}

struct InferenceJob {
    request: GenerationRequest,
    task: TaskHandle,
}

struct InferenceOutcome {
    request: GenerationRequest,
    task: TaskHandle,
    grid: ClassificationGrid,
}

struct ActiveMutation {
    requester: RequesterId,
    mutator: BatchedWorldMutator,
    due_tick: u64,
}

/// Everything a background worker needs, cloned once per thread.
#[derive(Clone)]
struct WorkerContext {
    world: SharedWorld,
    engine: Arc<InferenceEngine>,
    tables: Arc<CategoryTables>,
    registry: Arc<GenerationTaskRegistry>,
    events: Sender<GenerationEvent>,
    outcomes: Sender<InferenceOutcome>,
}

impl WorkerContext {
    fn emit(&self, requester: RequesterId, kind: GenerationEventKind) {
        let _ = self.events.send(GenerationEvent { requester, kind });
    }

    fn run(&self, jobs: Receiver<InferenceJob>) {
        while let Ok(InferenceJob { request, task }) = jobs.recv() {
            let requester = request.requester;
            match self.infer_region(&request, &task) {
                Ok(Some(grid)) => {
                    let outcome = InferenceOutcome {
                        request,
                        task,
                        grid,
                    };
                    if self.outcomes.send(outcome).is_err() {
                        // Service is gone, nothing left to apply to.
                        self.registry.complete(requester);
                        break;
                    }
                }
                Ok(None) => {
                    self.registry.complete(requester);
                    self.emit(requester, GenerationEventKind::Cancelled);
                }
                Err(err) => {
                    tracing::error!("Model inference error for requester {}: {}", requester, err);
                    self.registry.complete(requester);
                    self.emit(
                        requester,
                        GenerationEventKind::Failed {
                            message: GenerationError::InferenceFailure.to_string(),
                        },
                    );
                }
            }
        }
    }

    /// `Ok(None)` when the task was cancelled at one of the checkpoints.
    fn infer_region(
        &self,
        request: &GenerationRequest,
        task: &TaskHandle,
    ) -> Result<Option<ClassificationGrid>, EngineError> {
        if task.is_cancelled() {
            return Ok(None);
        }
        self.emit(request.requester, GenerationEventKind::Gathering);
        let builder = FeatureTensorBuilder::new(&self.tables, self.engine.window());
        let tensor = {
            let world = self.world.read();
            let region_biome =
                FeatureTensorBuilder::region_biome(&*world, request.origin_x, request.origin_z);
            builder.build(&*world, request.origin_x, request.origin_z, region_biome)
        };

        if task.is_cancelled() {
            return Ok(None);
        }
        self.emit(request.requester, GenerationEventKind::Inferring);
        let grid = self.engine.infer(&tensor)?;

        if task.is_cancelled() {
            return Ok(None);
        }
        Ok(Some(grid))
    }
}

pub struct GenerationService {
    world: SharedWorld,
    registry: Arc<GenerationTaskRegistry>,
    tables: Arc<CategoryTables>,
    status: EngineStatus,
    schedule: Schedule,
    engine: Option<Arc<InferenceEngine>>,
    job_tx: Option<Sender<InferenceJob>>,
    outcome_rx: Receiver<InferenceOutcome>,
    event_tx: Sender<GenerationEvent>,
    event_rx: Receiver<GenerationEvent>,
    workers: Vec<JoinHandle<()>>,
    active: Vec<ActiveMutation>,
    tick: u64,
}

impl GenerationService {
    /// Loads tables and model from `config`. A load failure is logged and
    /// leaves the service permanently unavailable rather than failing here.
    pub fn start(world: SharedWorld, config: &GenerationConfig) -> Result<Self, EngineError> {
        let loaded = CategoryTables::load(&config.block_mapping_path(), &config.biome_mapping_path())
            .map_err(EngineError::from)
            .and_then(|tables| {
                let engine = InferenceEngine::load_model(
                    &config.model_path(),
                    &config.engine_options(),
                    config.window(),
                )?;
                Ok((engine, tables))
            });

        match loaded {
            Ok((engine, tables)) => Self::with_engine(
                world,
                engine,
                tables,
                Schedule::from(config),
                config.engine_options().worker_threads,
            ),
            Err(err) => {
                tracing::error!("Failed to load ONNX model: {}", err);
                Ok(Self::unavailable(world, err.to_string(), Schedule::from(config)))
            }
        }
    }

    pub fn with_engine(
        world: SharedWorld,
        engine: InferenceEngine,
        tables: CategoryTables,
        schedule: Schedule,
        worker_threads: usize,
    ) -> Result<Self, EngineError> {
        let mut service = Self::unavailable(world, String::new(), schedule);
        service.status = EngineStatus::Available;
        service.tables = Arc::new(tables);

        let engine = Arc::new(engine);
        let (job_tx, job_rx) = unbounded::<InferenceJob>();
        let (outcome_tx, outcome_rx) = unbounded::<InferenceOutcome>();
        service.outcome_rx = outcome_rx;

        let context = WorkerContext {
            world: Arc::clone(&service.world),
            engine: Arc::clone(&engine),
            tables: Arc::clone(&service.tables),
            registry: Arc::clone(&service.registry),
            events: service.event_tx.clone(),
            outcomes: outcome_tx,
        };

        for worker_id in 0..worker_threads.max(1) {
            let context = context.clone();
            let jobs = job_rx.clone();
            let handle = thread::Builder::new()
                .name(format!("terrain-infer-{}", worker_id))
                .spawn(move || context.run(jobs))
                .map_err(EngineError::Spawn)?;
            service.workers.push(handle);
        }

        service.engine = Some(engine);
        service.job_tx = Some(job_tx);
        tracing::info!(
            "Terrain generation service ready with {} inference workers",
            service.workers.len()
        );
        Ok(service)
    }

    /// A service that rejects every request with `reason`.
    pub fn unavailable(world: SharedWorld, reason: String, schedule: Schedule) -> Self {
        let (event_tx, event_rx) = unbounded();
        let (_, outcome_rx) = unbounded();
        Self {
            world,
            registry: Arc::new(GenerationTaskRegistry::new()),
            tables: Arc::new(CategoryTables::default()),
            status: EngineStatus::Unavailable(reason),
            schedule,
            engine: None,
            job_tx: None,
            outcome_rx,
            event_tx,
            event_rx,
            workers: Vec::new(),
            active: Vec::new(),
            tick: 0,
        }
    }

    pub fn status(&self) -> &EngineStatus {
        &self.status
    }

    pub fn registry(&self) -> &GenerationTaskRegistry {
        &self.registry
    }

    pub fn world(&self) -> &SharedWorld {
        &self.world
    }

    /// Receiver for requester-facing events. May be cloned and handed out.
    pub fn events(&self) -> &Receiver<GenerationEvent> {
        &self.event_rx
    }

    /// Drains every event emitted so far.
    pub fn poll_events(&self) -> Vec<GenerationEvent> {
        self.event_rx.try_iter().collect()
    }

    /// Number of grids currently being written by the foreground.
    pub fn applying_count(&self) -> usize {
        self.active.len()
    }

    fn emit(&self, requester: RequesterId, kind: GenerationEventKind) {
        let _ = self.event_tx.send(GenerationEvent { requester, kind });
    }

    pub fn submit(&self, request: GenerationRequest) -> Result<(), GenerationError> {
        if let EngineStatus::Unavailable(reason) = &self.status {
            return Err(GenerationError::Unavailable(reason.clone()));
        }
        let job_tx = self.job_tx.as_ref().ok_or(GenerationError::Shutdown)?;
        let task = self.registry.admit(request.requester)?;

        self.emit(
            request.requester,
            GenerationEventKind::Started {
                origin_x: request.origin_x,
                origin_z: request.origin_z,
            },
        );
        tracing::info!(
            "Requester {} started generation at {}, {}",
            request.requester,
            request.origin_x,
            request.origin_z
        );

        if job_tx.send(InferenceJob { request, task }).is_err() {
            self.registry.complete(request.requester);
            return Err(GenerationError::Shutdown);
        }
        Ok(())
    }

    /// Flags the requester's job. The job stops at its next checkpoint and
    /// reports `Cancelled` from there.
    pub fn cancel(&self, requester: RequesterId) -> Result<(), GenerationError> {
        self.registry.cancel(requester)?;
        tracing::info!("Requester {} asked to cancel generation", requester);
        Ok(())
    }

    /// One foreground tick: picks up finished grids and advances every due
    /// mutator by one batch.
    pub fn tick(&mut self) {
        self.tick += 1;

        loop {
            match self.outcome_rx.try_recv() {
                Ok(outcome) => self.begin_applying(outcome),
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }

        let now = self.tick;
        if !self.active.iter().any(|active| active.due_tick <= now) {
            return;
        }

        let mut finished = Vec::new();
        {
            let mut world = self.world.write();
            for active in self.active.iter_mut().filter(|active| active.due_tick <= now) {
                for event in active.mutator.step(&mut *world) {
                    let kind = match event {
                        MutationEvent::Progress { percent, changed } => {
                            GenerationEventKind::Progress { percent, changed }
                        }
                        MutationEvent::Completed { changed } => {
                            GenerationEventKind::Completed { changed }
                        }
                        MutationEvent::Cancelled => GenerationEventKind::Cancelled,
                    };
                    let _ = self.event_tx.send(GenerationEvent {
                        requester: active.requester,
                        kind,
                    });
                }
                active.due_tick = now + self.schedule.ticks_between_batches;
                if active.mutator.is_finished() {
                    finished.push(active.requester);
                }
            }
        }

        for requester in &finished {
            self.registry.complete(*requester);
        }
        self.active.retain(|active| !active.mutator.is_finished());
    }

    fn begin_applying(&mut self, outcome: InferenceOutcome) {
        let InferenceOutcome {
            request,
            task,
            grid,
        } = outcome;
        self.emit(request.requester, GenerationEventKind::Applying);
        let mutator = BatchedWorldMutator::new(
            grid,
            request.origin_x,
            request.origin_z,
            task,
            Arc::clone(&self.tables),
            self.schedule.batch_size,
        );
        self.active.push(ActiveMutation {
            requester: request.requester,
            mutator,
            due_tick: self.tick + self.schedule.start_delay_ticks,
        });
    }

    /// Process teardown: cancels every job, stops the workers and releases
    /// the model once.
    pub fn shutdown(mut self) {
        self.registry.cancel_all();
        self.active.clear();
        self.job_tx = None;
        for handle in self.workers.drain(..) {
            if handle.join().is_err() {
                tracing::warn!("Inference worker panicked during shutdown");
            }
        }
        if let Some(engine) = self.engine.take() {
            match Arc::try_unwrap(engine) {
                Ok(engine) => engine.shutdown(),
                Err(_) => tracing::warn!("Inference engine still referenced at shutdown"),
            }
        }
        tracing::info!("Terrain generation service stopped");
    }
}
