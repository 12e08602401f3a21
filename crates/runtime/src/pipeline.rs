//! Pipeline driver.
//!
//! A [`GeometryPipeline`] owns one pair of output slots (shape, outline) and
//! runs `Idle -> Loading -> {Succeeded, Failed}` for each [`execute`] call.
//! Runs on the same instance never overlap: a call made while another is
//! loading is rejected with [`PipelineError::AlreadyRunning`] instead of
//! being queued. Previous buffers are released before a new run starts.
//!
//! When runs happen on their own is decided by the request's [`RunPolicy`]:
//! [`GeometryPipeline::start`] runs once if `immediate` is set, and
//! [`GeometryPipeline::reconfigure`] runs again if `refresh` is set.
//!
//! [`execute`]: GeometryPipeline::execute

use std::sync::Arc;

use foundation::math::ProjectionError;
use geometry::{
    GenerationOptions, GenerationOptionsPatch, GenerationStats, MergedBuffer, OptionsError,
    generate_geometry,
};
use parking_lot::Mutex;
use tracing::{debug, error, info, warn};

use crate::event_bus::GenerationObserver;
use crate::source::{FeatureSource, RetrievalError};

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum GenerationPhase {
    Idle,
    Loading,
    Succeeded,
    Failed,
}

/// Automatic triggers for a request.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct RunPolicy {
    /// Run once when the pipeline is started.
    pub immediate: bool,
    /// Run again whenever the request is replaced.
    pub refresh: bool,
}

impl Default for RunPolicy {
    fn default() -> Self {
        Self {
            immediate: true,
            refresh: false,
        }
    }
}

/// Inputs of a run: where the features come from and how to project them.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub locator: String,
    /// `[lon_deg, lat_deg]`
    pub center: [f64; 2],
    pub options: GenerationOptions,
    pub policy: RunPolicy,
}

impl GenerationRequest {
    pub fn new(
        locator: impl Into<String>,
        center: [f64; 2],
        options: GenerationOptionsPatch,
    ) -> Self {
        Self {
            locator: locator.into(),
            center,
            options: options.resolve(),
            policy: RunPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: RunPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn validate(&self) -> Result<(), PipelineError> {
        self.options
            .validate()
            .map_err(PipelineError::InvalidOptions)?;
        self.options
            .projection(self.center)
            .validate()
            .map_err(PipelineError::InvalidProjection)
    }
}

/// Buffers handed to callers and observers. Callers own their clones; the
/// pipeline drops its own references on release.
#[derive(Debug, Clone)]
pub struct GenerationResult {
    pub shape: Option<Arc<MergedBuffer>>,
    pub outline: Option<Arc<MergedBuffer>>,
    pub stats: GenerationStats,
}

#[derive(Debug)]
pub enum PipelineError {
    AlreadyRunning,
    InvalidOptions(OptionsError),
    InvalidProjection(ProjectionError),
    Retrieval(RetrievalError),
}

impl std::fmt::Display for PipelineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PipelineError::AlreadyRunning => write!(f, "a generation run is already in progress"),
            PipelineError::InvalidOptions(e) => write!(f, "invalid options: {e}"),
            PipelineError::InvalidProjection(e) => write!(f, "invalid projection: {e}"),
            PipelineError::Retrieval(e) => write!(f, "retrieval failed: {e}"),
        }
    }
}

impl std::error::Error for PipelineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PipelineError::AlreadyRunning => None,
            PipelineError::InvalidOptions(e) => Some(e),
            PipelineError::InvalidProjection(e) => Some(e),
            PipelineError::Retrieval(e) => Some(e),
        }
    }
}

struct PipelineState {
    phase: GenerationPhase,
    request: GenerationRequest,
    shape: Option<Arc<MergedBuffer>>,
    outline: Option<Arc<MergedBuffer>>,
    stats: Option<GenerationStats>,
    last_error: Option<String>,
}

impl PipelineState {
    fn release(&mut self) -> (Option<Arc<MergedBuffer>>, Option<Arc<MergedBuffer>>) {
        self.stats = None;
        (self.shape.take(), self.outline.take())
    }
}

pub struct GeometryPipeline {
    source: Arc<dyn FeatureSource>,
    state: Mutex<PipelineState>,
    observers: Mutex<Vec<Arc<dyn GenerationObserver>>>,
}

impl GeometryPipeline {
    pub fn new(
        source: Arc<dyn FeatureSource>,
        request: GenerationRequest,
    ) -> Result<Self, PipelineError> {
        request.validate()?;
        Ok(Self {
            source,
            state: Mutex::new(PipelineState {
                phase: GenerationPhase::Idle,
                request,
                shape: None,
                outline: None,
                stats: None,
                last_error: None,
            }),
            observers: Mutex::new(Vec::new()),
        })
    }

    /// Builds a pipeline, subscribes `observers` and, if the request's policy
    /// is `immediate`, runs it once before returning.
    ///
    /// Only an invalid request is an error here. The outcome of the initial
    /// run is reported like any other run: through the phase, `last_error`
    /// and the observers.
    pub async fn start(
        source: Arc<dyn FeatureSource>,
        request: GenerationRequest,
        observers: impl IntoIterator<Item = Arc<dyn GenerationObserver>>,
    ) -> Result<Self, PipelineError> {
        let immediate = request.policy.immediate;
        let pipeline = Self::new(source, request)?;
        for observer in observers {
            pipeline.subscribe(observer);
        }
        if immediate {
            if let Err(e) = pipeline.execute().await {
                debug!("initial run did not succeed: {e}");
            }
        }
        Ok(pipeline)
    }

    pub fn subscribe(&self, observer: Arc<dyn GenerationObserver>) {
        self.observers.lock().push(observer);
    }

    /// Replaces the inputs used by the next run. A run already loading keeps
    /// the request it started with.
    ///
    /// With `policy.refresh` set the new request is run right away and its
    /// result returned; otherwise nothing runs and `Ok(None)` is returned.
    pub async fn reconfigure(
        &self,
        request: GenerationRequest,
    ) -> Result<Option<GenerationResult>, PipelineError> {
        request.validate()?;
        let refresh = request.policy.refresh;
        self.state.lock().request = request;
        if refresh {
            self.execute().await.map(Some)
        } else {
            Ok(None)
        }
    }

    pub fn request(&self) -> GenerationRequest {
        self.state.lock().request.clone()
    }

    pub fn phase(&self) -> GenerationPhase {
        self.state.lock().phase
    }

    pub fn is_generating(&self) -> bool {
        self.phase() == GenerationPhase::Loading
    }

    pub fn shape(&self) -> Option<Arc<MergedBuffer>> {
        self.state.lock().shape.clone()
    }

    pub fn outline(&self) -> Option<Arc<MergedBuffer>> {
        self.state.lock().outline.clone()
    }

    pub fn last_error(&self) -> Option<String> {
        self.state.lock().last_error.clone()
    }

    /// Buffers and stats of the last successful run, unless released since.
    pub fn result(&self) -> Option<GenerationResult> {
        let state = self.state.lock();
        let stats = state.stats?;
        Some(GenerationResult {
            shape: state.shape.clone(),
            outline: state.outline.clone(),
            stats,
        })
    }

    /// Drops the pipeline's references to the current buffers.
    pub fn dispose(&self) {
        let released = self.state.lock().release();
        log_release(released);
    }

    pub async fn execute(&self) -> Result<GenerationResult, PipelineError> {
        let (request, released) = {
            let mut state = self.state.lock();
            if state.phase == GenerationPhase::Loading {
                warn!(
                    locator = %state.request.locator,
                    "generation already in progress, rejecting new run"
                );
                return Err(PipelineError::AlreadyRunning);
            }
            state.phase = GenerationPhase::Loading;
            state.last_error = None;
            (state.request.clone(), state.release())
        };
        log_release(released);

        let guard = LoadingGuard::new(&self.state);
        debug!(locator = %request.locator, "loading feature collection");

        let collection = match self.source.fetch(&request.locator).await {
            Ok(collection) => collection,
            Err(e) => {
                let message = e.to_string();
                error!(locator = %request.locator, "generation failed: {message}");
                guard.fail(message.clone());
                self.notify(|o| o.on_error(&message));
                return Err(PipelineError::Retrieval(e));
            }
        };

        let generated = generate_geometry(&collection, request.center, &request.options);
        drop(collection);

        let result = GenerationResult {
            shape: generated.shape.map(Arc::new),
            outline: generated.outline.map(Arc::new),
            stats: generated.stats,
        };
        guard.succeed(&result);

        info!(
            locator = %request.locator,
            rings = result.stats.rings,
            shape_vertices = result.stats.shape_vertices,
            outline_vertices = result.stats.outline_vertices,
            "generation finished"
        );
        self.notify(|o| o.on_result(&result));
        Ok(result)
    }

    fn notify(&self, f: impl Fn(&dyn GenerationObserver)) {
        let observers = self.observers.lock().clone();
        for observer in &observers {
            f(observer.as_ref());
        }
    }
}

fn log_release(released: (Option<Arc<MergedBuffer>>, Option<Arc<MergedBuffer>>)) {
    for buffer in [released.0, released.1].into_iter().flatten() {
        debug!(
            id = %buffer.id,
            vertices = buffer.vertex_count(),
            "released buffer"
        );
    }
}

/// Settles the phase of a loading run. If the run future is dropped before
/// it settles, the phase goes back to `Idle`.
struct LoadingGuard<'a> {
    state: &'a Mutex<PipelineState>,
    settled: bool,
}

impl<'a> LoadingGuard<'a> {
    fn new(state: &'a Mutex<PipelineState>) -> Self {
        Self {
            state,
            settled: false,
        }
    }

    fn succeed(mut self, result: &GenerationResult) {
        let mut state = self.state.lock();
        state.shape = result.shape.clone();
        state.outline = result.outline.clone();
        state.stats = Some(result.stats);
        state.phase = GenerationPhase::Succeeded;
        self.settled = true;
    }

    fn fail(mut self, message: String) {
        let mut state = self.state.lock();
        state.last_error = Some(message);
        state.phase = GenerationPhase::Failed;
        self.settled = true;
    }
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        let mut state = self.state.lock();
        if state.phase == GenerationPhase::Loading {
            debug!("generation run dropped before completion");
            state.phase = GenerationPhase::Idle;
        }
    }
}
