//! Memoizing, debouncing, batching front end for the remote classifier.
//!
//! Every distinct text is classified at most once per scheduler: the first
//! request queues it and (re)arms a short debounce timer, later requests for
//! the same text share the pending result. Once the queue has been quiet for
//! the debounce delay it is flushed in sub-batches of at most
//! [`DEFAULT_BATCH_SIZE`] items, each sent as its own request.

pub mod http;

pub use http::HttpClassifier;

use async_trait::async_trait;
use futures::channel::oneshot;
use futures::future::{self, BoxFuture, FutureExt, Shared};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

pub const DEFAULT_BATCH_SIZE: usize = 100;
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(10);
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(3);
/// Shortest time a recheck appears to take, so fast answers do not flicker.
pub const MIN_DISPLAY: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub prediction: bool,
    pub probability: f64,
}

impl Prediction {
    pub fn negative() -> Self {
        Self {
            prediction: false,
            probability: 0.0,
        }
    }
}

/// One item of a classifier request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Instance {
    pub modified_text: String,
    pub page_title: String,
    pub original_text: String,
    pub check_type: String,
    pub lang: String,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClassifyError {
    #[error("request failed: {0}")]
    Transport(String),

    #[error("classifier responded with HTTP {0}")]
    Status(u16),

    #[error("malformed classifier response: {0}")]
    Malformed(String),

    #[error("classifier returned {actual} predictions for {expected} inputs")]
    CountMismatch { expected: usize, actual: usize },

    #[error("no async runtime available to send the request")]
    NoRuntime,

    #[error("request was dropped before it completed")]
    Dropped,
}

/// Transport to a remote classifier. Predictions must be returned in the
/// order of the instances they answer.
#[async_trait]
pub trait Classifier: Send + Sync {
    async fn classify(&self, instances: Vec<Instance>) -> Result<Vec<Prediction>, ClassifyError>;
}

/// Context sent alongside every text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    pub page_title: String,
    pub lang: String,
    pub check_type: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerSettings {
    pub batch_size: usize,
    pub debounce: Duration,
    pub timeout: Duration,
    pub min_display: Duration,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            debounce: DEFAULT_DEBOUNCE,
            timeout: DEFAULT_TIMEOUT,
            min_display: MIN_DISPLAY,
        }
    }
}

/// `Ok(None)` means no answer arrived before the timeout.
pub type CheckTextResult = Result<Option<Prediction>, ClassifyError>;

type Outcome = Result<Prediction, ClassifyError>;
type SharedOutcome = Shared<BoxFuture<'static, Outcome>>;

struct Queued {
    text: String,
    reply: oneshot::Sender<Outcome>,
}

#[derive(Default)]
struct State {
    memo: HashMap<String, SharedOutcome>,
    queue: Vec<Queued>,
    /// Bumped on every enqueue; a flush only runs for the latest one.
    generation: u64,
    requests: usize,
}

struct Inner {
    classifier: Arc<dyn Classifier>,
    context: RequestContext,
    settings: SchedulerSettings,
    state: Mutex<State>,
}

#[derive(Clone)]
pub struct Scheduler {
    inner: Arc<Inner>,
}

impl Scheduler {
    pub fn new(classifier: Arc<dyn Classifier>, context: RequestContext) -> Self {
        Self::with_settings(classifier, context, SchedulerSettings::default())
    }

    pub fn with_settings(
        classifier: Arc<dyn Classifier>,
        context: RequestContext,
        settings: SchedulerSettings,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                classifier,
                context,
                settings: SchedulerSettings {
                    batch_size: settings.batch_size.max(1),
                    ..settings
                },
                state: Mutex::new(State::default()),
            }),
        }
    }

    pub fn context(&self) -> &RequestContext {
        &self.inner.context
    }

    pub fn settings(&self) -> SchedulerSettings {
        self.inner.settings
    }

    /// Number of outbound requests issued so far.
    pub fn requests_issued(&self) -> usize {
        self.inner.lock().requests
    }

    /// Classify `text`, sharing the request with every other caller asking
    /// about the same text.
    ///
    /// Must be called from within a Tokio runtime; otherwise the result is
    /// [`ClassifyError::NoRuntime`].
    pub fn check_text(&self, text: &str) -> BoxFuture<'static, CheckTextResult> {
        if text.trim().is_empty() {
            return future::ready(Ok(Some(Prediction::negative()))).boxed();
        }
        if tokio::runtime::Handle::try_current().is_err() {
            tracing::warn!("no Tokio runtime, classifier request rejected");
            return future::ready(Err(ClassifyError::NoRuntime)).boxed();
        }

        let outcome = self.outcome_for(text);
        let timeout = self.inner.settings.timeout;
        async move {
            match tokio::time::timeout(timeout, outcome).await {
                Ok(result) => result.map(Some),
                Err(_) => {
                    tracing::debug!(?timeout, "classifier did not answer in time");
                    Ok(None)
                }
            }
        }
        .boxed()
    }

    /// Like [`Scheduler::check_text`], but never resolves sooner than the
    /// minimum display time.
    pub fn check_text_paced(&self, text: &str) -> BoxFuture<'static, CheckTextResult> {
        let check = self.check_text(text);
        if tokio::runtime::Handle::try_current().is_err() {
            return check;
        }
        let min_display = self.inner.settings.min_display;
        async move {
            let (result, ()) = future::join(check, tokio::time::sleep(min_display)).await;
            result
        }
        .boxed()
    }

    fn outcome_for(&self, text: &str) -> SharedOutcome {
        let mut state = self.inner.lock();
        if let Some(existing) = state.memo.get(text) {
            return existing.clone();
        }

        let (reply, receiver) = oneshot::channel();
        let outcome = receiver
            .map(|reply| reply.unwrap_or(Err(ClassifyError::Dropped)))
            .boxed()
            .shared();
        state.memo.insert(text.to_string(), outcome.clone());
        state.queue.push(Queued {
            text: text.to_string(),
            reply,
        });
        state.generation += 1;
        let generation = state.generation;
        drop(state);

        self.schedule_flush(generation);
        outcome
    }

    fn schedule_flush(&self, generation: u64) {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            tracing::warn!("no async runtime, rejecting queued classifier requests");
            let mut state = self.inner.lock();
            for queued in std::mem::take(&mut state.queue) {
                state.memo.remove(&queued.text);
                let _ = queued.reply.send(Err(ClassifyError::NoRuntime));
            }
            return;
        };

        let inner = Arc::clone(&self.inner);
        runtime.spawn(async move {
            tokio::time::sleep(inner.settings.debounce).await;
            Inner::flush(&inner, generation);
        });
    }
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn flush(inner: &Arc<Inner>, generation: u64) {
        let batches = {
            let mut state = inner.lock();
            if state.generation != generation || state.queue.is_empty() {
                return;
            }
            let mut queued = std::mem::take(&mut state.queue).into_iter().peekable();
            let mut batches = Vec::new();
            while queued.peek().is_some() {
                batches.push(queued.by_ref().take(inner.settings.batch_size).collect::<Vec<_>>());
            }
            state.requests += batches.len();
            batches
        };

        tracing::debug!(batches = batches.len(), "flushing classifier queue");
        for batch in batches {
            tokio::spawn(Inner::send_batch(Arc::clone(inner), batch));
        }
    }

    fn instance(&self, text: &str) -> Instance {
        Instance {
            modified_text: text.to_string(),
            page_title: self.context.page_title.clone(),
            original_text: String::new(),
            check_type: self.context.check_type.clone(),
            lang: self.context.lang.clone(),
        }
    }

    async fn send_batch(inner: Arc<Inner>, batch: Vec<Queued>) {
        let instances = batch.iter().map(|queued| inner.instance(&queued.text)).collect();
        let expected = batch.len();

        let result = match inner.classifier.classify(instances).await {
            Ok(predictions) if predictions.len() == expected => Ok(predictions),
            Ok(predictions) => Err(ClassifyError::CountMismatch {
                expected,
                actual: predictions.len(),
            }),
            Err(e) => Err(e),
        };

        match result {
            Ok(predictions) => {
                for (queued, prediction) in batch.into_iter().zip(predictions) {
                    let _ = queued.reply.send(Ok(prediction));
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, size = expected, "classifier batch failed");
                for queued in batch {
                    let _ = queued.reply.send(Err(e.clone()));
                }
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;

    /// Classifier double: flags texts containing "bad", fails batches
    /// containing "boom", never answers batches containing "hang" and
    /// drops one prediction for batches containing "short".
    #[derive(Default)]
    pub(crate) struct MockClassifier {
        pub(crate) batches: Mutex<Vec<Vec<String>>>,
    }

    impl MockClassifier {
        pub(crate) fn batch_sizes(&self) -> Vec<usize> {
            self.batches.lock().unwrap().iter().map(Vec::len).collect()
        }
    }

    #[async_trait]
    impl Classifier for MockClassifier {
        async fn classify(&self, instances: Vec<Instance>) -> Result<Vec<Prediction>, ClassifyError> {
            let texts: Vec<String> = instances.iter().map(|i| i.modified_text.clone()).collect();
            self.batches.lock().unwrap().push(texts.clone());

            if texts.iter().any(|t| t.contains("hang")) {
                future::pending::<()>().await;
            }
            if texts.iter().any(|t| t.contains("boom")) {
                return Err(ClassifyError::Transport("connection reset".to_string()));
            }
            let mut predictions: Vec<Prediction> = texts
                .iter()
                .map(|t| Prediction {
                    prediction: t.contains("bad"),
                    probability: if t.contains("bad") { 0.9 } else { 0.1 },
                })
                .collect();
            if texts.iter().any(|t| t.contains("short")) {
                predictions.pop();
            }
            Ok(predictions)
        }
    }

    pub(crate) fn context() -> RequestContext {
        RequestContext {
            page_title: "Cats".to_string(),
            lang: "en".to_string(),
            check_type: "tone".to_string(),
        }
    }
}
