//! Channel-driven prediction service.
//!
//! The service task exclusively owns the live model runtime. Callers talk to
//! it through a [`PredictionHandle`] and observe outcomes on an event
//! channel, or await per-request replies.

use std::sync::Arc;
use std::time::Instant;

use image::DynamicImage;
use tokio::sync::{mpsc, oneshot};
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, info, warn};

use crate::classifier::MonumentClassifier;
use crate::error::PredictionError;
use crate::labels::LabelTable;
use crate::models::{ModelLoader, ModelOrigin, ModelSource};
use crate::runtime::BackendFactory;
use crate::selector::Prediction;
use tugu_inference::InferenceBackend;

const COMMAND_BUFFER: usize = 32;

/// Events beyond this many unread ones are dropped.
pub const EVENT_BUFFER: usize = 64;

/// Notifications emitted by the service.
#[derive(Debug, Clone, PartialEq)]
pub enum PredictionEvent {
    /// A model finished loading and now serves predictions.
    ModelReady,
    /// A prediction succeeded.
    Result(Prediction),
    /// A load or prediction failed.
    Error(PredictionError),
}

type Reply<T> = oneshot::Sender<Result<T, PredictionError>>;

enum Command {
    Load {
        source: ModelSource,
        reply: Option<Reply<ModelOrigin>>,
    },
    Predict {
        image: DynamicImage,
        reply: Option<Reply<Prediction>>,
    },
    Close,
}

/// Holds at most one live classifier.
pub struct ClassifierSlot<B: InferenceBackend> {
    current: Option<Arc<MonumentClassifier<B>>>,
}

impl<B: InferenceBackend> ClassifierSlot<B> {
    pub fn new() -> Self {
        Self { current: None }
    }

    pub fn is_ready(&self) -> bool {
        self.current.is_some()
    }

    /// Store a classifier, releasing the previous one first.
    pub fn install(&mut self, classifier: MonumentClassifier<B>) {
        self.close();
        self.current = Some(Arc::new(classifier));
    }

    /// Release the current classifier. Returns whether one was held.
    pub fn close(&mut self) -> bool {
        match self.current.take() {
            Some(previous) => {
                drop(previous);
                debug!("Released model runtime");
                true
            }
            None => false,
        }
    }

    /// The live classifier, or [`PredictionError::NotReady`].
    pub fn get(&self) -> Result<Arc<MonumentClassifier<B>>, PredictionError> {
        self.current.clone().ok_or(PredictionError::NotReady)
    }
}

impl<B: InferenceBackend> Default for ClassifierSlot<B> {
    fn default() -> Self {
        Self::new()
    }
}

/// Cheap, cloneable handle to a running [`PredictionService`].
#[derive(Clone)]
pub struct PredictionHandle {
    commands: mpsc::Sender<Command>,
}

impl PredictionHandle {
    /// Start loading a model; the outcome arrives as an event.
    pub async fn load(&self, source: ModelSource) -> Result<(), PredictionError> {
        self.send(Command::Load { source, reply: None }).await
    }

    /// Load a model and wait until it serves predictions.
    pub async fn load_and_wait(&self, source: ModelSource) -> Result<ModelOrigin, PredictionError> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::Load {
            source,
            reply: Some(tx),
        })
        .await?;
        rx.await.map_err(|_| stopped())?
    }

    /// Queue an image; the outcome arrives as an event.
    pub async fn submit(&self, image: DynamicImage) -> Result<(), PredictionError> {
        self.send(Command::Predict { image, reply: None }).await
    }

    /// Classify an image and wait for the result.
    pub async fn predict(&self, image: DynamicImage) -> Result<Prediction, PredictionError> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::Predict {
            image,
            reply: Some(tx),
        })
        .await?;
        rx.await.map_err(|_| stopped())?
    }

    /// Release the loaded model. Later predictions fail until the next load.
    pub async fn close(&self) -> Result<(), PredictionError> {
        self.send(Command::Close).await
    }

    async fn send(&self, command: Command) -> Result<(), PredictionError> {
        self.commands.send(command).await.map_err(|_| stopped())
    }
}

fn stopped() -> PredictionError {
    PredictionError::Initialization("prediction service has stopped".to_string())
}

/// Builder for [`PredictionService`].
pub struct PredictionServiceBuilder<F: BackendFactory> {
    factory: F,
    loader: ModelLoader,
    labels: LabelTable,
}

impl<F: BackendFactory> PredictionServiceBuilder<F> {
    /// Set the label table.
    pub fn with_labels(mut self, labels: LabelTable) -> Self {
        self.labels = labels;
        self
    }

    /// Spawn the service on the current tokio runtime.
    ///
    /// The event receiver may be dropped by callers that only use replies.
    pub fn spawn(self) -> (PredictionHandle, mpsc::Receiver<PredictionEvent>) {
        let (command_tx, command_rx) = mpsc::channel(COMMAND_BUFFER);
        let (event_tx, event_rx) = mpsc::channel(EVENT_BUFFER);

        let service = PredictionService {
            factory: Arc::new(self.factory),
            loader: Arc::new(self.loader),
            labels: self.labels,
            slot: ClassifierSlot::new(),
            generation: 0,
            events: event_tx,
        };
        tokio::spawn(service.run(command_rx));

        (PredictionHandle { commands: command_tx }, event_rx)
    }
}

struct LoadOutcome<B: InferenceBackend> {
    generation: u64,
    result: Result<(MonumentClassifier<B>, ModelOrigin), PredictionError>,
    reply: Option<Reply<ModelOrigin>>,
}

/// Owns the model runtime and serves load/predict commands in arrival order.
///
/// A load releases the current runtime before the next one is created, so
/// at most one is ever alive. Until the load succeeds, predictions are
/// rejected with [`PredictionError::NotReady`] instead of queued.
pub struct PredictionService<F: BackendFactory> {
    factory: Arc<F>,
    loader: Arc<ModelLoader>,
    labels: LabelTable,
    slot: ClassifierSlot<F::Backend>,
    generation: u64,
    events: mpsc::Sender<PredictionEvent>,
}

impl<F: BackendFactory> PredictionService<F> {
    /// Start configuring a service.
    pub fn builder(factory: F, loader: ModelLoader) -> PredictionServiceBuilder<F> {
        PredictionServiceBuilder {
            factory,
            loader,
            labels: LabelTable::monuments(),
        }
    }

    async fn run(mut self, mut commands: mpsc::Receiver<Command>) {
        let (loaded_tx, mut loaded_rx) = mpsc::unbounded_channel();

        loop {
            tokio::select! {
                Some(outcome) = loaded_rx.recv() => self.finish_load(outcome),
                command = commands.recv() => match command {
                    Some(Command::Load { source, reply }) => {
                        self.start_load(source, reply, loaded_tx.clone())
                    }
                    Some(Command::Predict { image, reply }) => self.predict(image, reply).await,
                    Some(Command::Close) => {
                        self.slot.close();
                    }
                    None => break,
                },
            }
        }

        self.slot.close();
        debug!("Prediction service stopped");
    }

    fn start_load(
        &mut self,
        source: ModelSource,
        reply: Option<Reply<ModelOrigin>>,
        done: mpsc::UnboundedSender<LoadOutcome<F::Backend>>,
    ) {
        self.slot.close();
        self.generation += 1;
        let generation = self.generation;
        let loader = Arc::clone(&self.loader);
        let factory = Arc::clone(&self.factory);
        let labels = self.labels;

        info!("Loading {}", source);
        tokio::spawn(async move {
            let result = load_classifier(&loader, factory, &source)
                .await
                .map(|(backend, origin)| {
                    let classifier = MonumentClassifier::new(backend).with_labels(labels);
                    (classifier, origin)
                });
            // The service may have stopped; the result is then dropped.
            let _ = done.send(LoadOutcome {
                generation,
                result,
                reply,
            });
        });
    }

    fn finish_load(&mut self, outcome: LoadOutcome<F::Backend>) {
        let LoadOutcome {
            generation,
            result,
            reply,
        } = outcome;

        let current = generation == self.generation;
        let result = match result {
            Ok((classifier, origin)) if current => {
                self.slot.install(classifier);
                self.emit(PredictionEvent::ModelReady);
                Ok(origin)
            }
            Ok(_) => {
                warn!("Discarding model from superseded load #{}", generation);
                Err(superseded())
            }
            Err(e) if current => {
                warn!("Model load failed: {}", e);
                self.emit(PredictionEvent::Error(e.clone()));
                Err(e)
            }
            Err(e) => {
                debug!("Superseded load #{} failed: {}", generation, e);
                Err(superseded())
            }
        };

        if let Some(reply) = reply {
            let _ = reply.send(result);
        }
    }

    async fn predict(&mut self, image: DynamicImage, reply: Option<Reply<Prediction>>) {
        let result = match self.slot.get() {
            Ok(classifier) => tokio::task::spawn_blocking(move || classifier.classify(&image))
                .await
                .unwrap_or_else(|e| Err(PredictionError::Inference(e.to_string()))),
            Err(e) => {
                debug!("Rejecting prediction: no model loaded");
                Err(e)
            }
        };

        let event = match &result {
            Ok(prediction) => PredictionEvent::Result(prediction.clone()),
            Err(e) => PredictionEvent::Error(e.clone()),
        };
        self.emit(event);

        if let Some(reply) = reply {
            let _ = reply.send(result);
        }
    }

    fn emit(&self, event: PredictionEvent) {
        match self.events.try_send(event) {
            Ok(()) | Err(TrySendError::Closed(_)) => {}
            Err(TrySendError::Full(event)) => {
                debug!("Event channel full, dropping {:?}", event);
            }
        }
    }
}

fn superseded() -> PredictionError {
    PredictionError::Initialization("superseded by a newer load".to_string())
}

async fn load_classifier<F: BackendFactory>(
    loader: &ModelLoader,
    factory: Arc<F>,
    source: &ModelSource,
) -> Result<(F::Backend, ModelOrigin), PredictionError> {
    let file = loader.resolve(source).await?;
    let origin = file.origin();
    let start = Instant::now();

    let backend = tokio::task::spawn_blocking(move || {
        let model = file.map()?;
        factory
            .create(&model)
            .map_err(|e| PredictionError::Initialization(e.to_string()))
    })
    .await
    .map_err(|e| PredictionError::Initialization(e.to_string()))??;

    info!(
        "Model runtime initialized from {} source in {}ms",
        origin,
        start.elapsed().as_millis()
    );

    Ok((backend, origin))
}
