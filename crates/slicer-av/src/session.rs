//! Lazily initialised, process-wide transcoder session.
//!
//! A [`TranscoderSession`] wraps a [`TranscoderEngine`] and owns its
//! lifecycle: the engine is loaded on first use, concurrent callers share a
//! single load attempt, and every segmentation run leaves the engine's file
//! namespace empty no matter how it ends.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use parking_lot::RwLock;
use serde::Serialize;
use slicer_core::events::{EventBus, EventPayload};
use slicer_core::{Error, Result, SegmentMinutes};

use crate::engine::{segment_args, TranscoderEngine};
use crate::progress::ProgressSender;

/// Lifecycle of the engine behind a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "message", rename_all = "snake_case")]
pub enum EngineState {
    Unloaded,
    Loading,
    Ready,
    Failed(String),
}

impl EngineState {
    pub fn is_ready(&self) -> bool {
        matches!(self, EngineState::Ready)
    }

    /// Lowercase name used in events and status responses.
    pub fn label(&self) -> &'static str {
        match self {
            EngineState::Unloaded => "unloaded",
            EngineState::Loading => "loading",
            EngineState::Ready => "ready",
            EngineState::Failed(_) => "failed",
        }
    }
}

/// One file produced by a segmentation run, already copied out of the engine.
#[derive(Debug, Clone)]
pub struct EngineOutput {
    /// Engine-side name, e.g. `output_000.mp3`.
    pub name: String,
    pub bytes: Bytes,
    /// Exact duration, when the engine could inspect the file.
    pub duration_secs: Option<f64>,
}

/// Shared handle to a transcoder engine.
pub struct TranscoderSession {
    engine: Arc<dyn TranscoderEngine>,
    segment_extension: String,
    state: RwLock<EngineState>,
    init_lock: tokio::sync::Mutex<()>,
    /// Incremented each time a load attempt finishes.
    attempts: AtomicU64,
    events: Option<Arc<EventBus>>,
}

impl TranscoderSession {
    pub fn new(engine: Arc<dyn TranscoderEngine>, segment_extension: impl Into<String>) -> Self {
        Self {
            engine,
            segment_extension: segment_extension.into(),
            state: RwLock::new(EngineState::Unloaded),
            init_lock: tokio::sync::Mutex::new(()),
            attempts: AtomicU64::new(0),
            events: None,
        }
    }

    /// Broadcast [`EventPayload::EngineStateChanged`] on every transition.
    pub fn with_events(mut self, events: Arc<EventBus>) -> Self {
        self.events = Some(events);
        self
    }

    /// Snapshot of the current engine state.
    pub fn state(&self) -> EngineState {
        self.state.read().clone()
    }

    pub fn segment_extension(&self) -> &str {
        &self.segment_extension
    }

    fn set_state(&self, next: EngineState) {
        let message = match &next {
            EngineState::Failed(m) => Some(m.clone()),
            _ => None,
        };
        let label = next.label();
        *self.state.write() = next;
        tracing::debug!("Engine state -> {label}");
        if let Some(events) = &self.events {
            events.broadcast(EventPayload::EngineStateChanged {
                state: label.to_string(),
                message,
            });
        }
    }

    /// Make sure the engine is loaded.
    ///
    /// Returns immediately when already ready. Otherwise at most one caller
    /// performs the load; everyone who queued behind that attempt receives
    /// its outcome. A failed attempt is not retried here, but a later call
    /// starts a fresh one.
    pub async fn ensure_ready(&self) -> Result<()> {
        if self.state.read().is_ready() {
            return Ok(());
        }

        let seen = self.attempts.load(Ordering::Acquire);
        let _guard = self.init_lock.lock().await;

        if self.attempts.load(Ordering::Acquire) != seen {
            // Someone finished an attempt while we were waiting.
            return match self.state() {
                EngineState::Ready => Ok(()),
                EngineState::Failed(message) => Err(Error::EngineInit(message)),
                other => Err(Error::Internal(format!(
                    "engine in unexpected state {} after load",
                    other.label()
                ))),
            };
        }
        if self.state.read().is_ready() {
            return Ok(());
        }

        self.set_state(EngineState::Loading);
        tracing::info!("Loading transcoder engine");

        let result = self.engine.load().await;
        let outcome = match result {
            Ok(()) => {
                self.set_state(EngineState::Ready);
                Ok(())
            }
            Err(e) => {
                let message = match e {
                    Error::EngineInit(m) => m,
                    other => other.user_message(),
                };
                tracing::error!("Engine initialization failed: {message}");
                self.set_state(EngineState::Failed(message.clone()));
                Err(Error::EngineInit(message))
            }
        };
        self.attempts.fetch_add(1, Ordering::AcqRel);
        outcome
    }

    /// Run the fixed segmentation command over `input`.
    ///
    /// Outputs are returned in source order. On any failure nothing is
    /// returned, and in every case the input and all outputs are deleted
    /// from the engine before this returns. Files left behind by a run whose
    /// future was dropped are cleared before the input is written.
    pub async fn run(
        &self,
        input: Bytes,
        input_extension: &str,
        minutes: SegmentMinutes,
        progress: &ProgressSender,
    ) -> Result<Vec<EngineOutput>> {
        self.ensure_ready().await?;

        let input_name = format!("input.{}", sanitize_extension(input_extension));
        let pattern = format!("output_%03d.{}", self.segment_extension);

        self.cleanup().await;
        let result = self.segment(&input_name, input, minutes, &pattern, progress).await;
        self.cleanup().await;

        if let Err(ref e) = result {
            tracing::warn!("Segmentation failed: {e}");
        }
        result
    }

    async fn segment(
        &self,
        input_name: &str,
        input: Bytes,
        minutes: SegmentMinutes,
        pattern: &str,
        progress: &ProgressSender,
    ) -> Result<Vec<EngineOutput>> {
        self.engine.write_file(input_name, input).await?;

        let args = segment_args(input_name, minutes.as_seconds(), pattern);
        self.engine
            .exec(&args, progress)
            .await
            .map_err(|e| Error::Transcode(e.user_message()))?;

        let mut names: Vec<(u32, String)> = self
            .engine
            .list_dir()
            .await?
            .into_iter()
            .filter_map(|name| output_index(&name, &self.segment_extension).map(|i| (i, name)))
            .collect();
        names.sort();

        if names.is_empty() {
            return Err(Error::Transcode("no segments were produced".into()));
        }

        let mut outputs = Vec::with_capacity(names.len());
        for (_, name) in names {
            let bytes = self.engine.read_file(&name).await?;
            let duration_secs = self.engine.duration_of(&name).await;
            outputs.push(EngineOutput {
                name,
                bytes,
                duration_secs,
            });
        }
        Ok(outputs)
    }

    /// Delete everything in the engine's namespace. Failures are logged.
    async fn cleanup(&self) {
        let names = match self.engine.list_dir().await {
            Ok(names) => names,
            Err(e) => {
                tracing::warn!("Could not list engine files for cleanup: {e}");
                return;
            }
        };
        for name in names {
            if let Err(e) = self.engine.delete_file(&name).await {
                tracing::warn!("Failed to delete {name}: {e}");
            }
        }
    }
}

impl std::fmt::Debug for TranscoderSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TranscoderSession")
            .field("state", &self.state())
            .field("segment_extension", &self.segment_extension)
            .finish_non_exhaustive()
    }
}

/// Index of an `output_<N>.<ext>` file, or `None` for anything else.
fn output_index(name: &str, extension: &str) -> Option<u32> {
    let stem = name.strip_prefix("output_")?;
    let digits = stem.strip_suffix(extension)?.strip_suffix('.')?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// Keep only ASCII alphanumerics; an unusable extension becomes `bin`.
fn sanitize_extension(ext: &str) -> String {
    let clean: String = ext
        .trim_start_matches('.')
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .collect::<String>()
        .to_ascii_lowercase();
    if clean.is_empty() {
        "bin".to_string()
    } else {
        clean
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::BTreeMap;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    /// In-memory engine. `exec` writes `chunks` outputs, or fails with `fail_exec`.
    #[derive(Default)]
    struct MemoryEngine {
        files: parking_lot::Mutex<BTreeMap<String, Bytes>>,
        loads: AtomicUsize,
        fail_loads: AtomicUsize,
        chunks: usize,
        fail_exec: Option<String>,
    }

    #[async_trait]
    impl TranscoderEngine for MemoryEngine {
        async fn load(&self) -> Result<()> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            if self.fail_loads.load(Ordering::SeqCst) > 0 {
                self.fail_loads.fetch_sub(1, Ordering::SeqCst);
                return Err(Error::EngineInit("engine binary unavailable".into()));
            }
            Ok(())
        }

        async fn write_file(&self, name: &str, data: Bytes) -> Result<()> {
            self.files.lock().insert(name.to_string(), data);
            Ok(())
        }

        async fn list_dir(&self) -> Result<Vec<String>> {
            Ok(self.files.lock().keys().cloned().collect())
        }

        async fn read_file(&self, name: &str) -> Result<Bytes> {
            self.files
                .lock()
                .get(name)
                .cloned()
                .ok_or_else(|| Error::not_found("file", name))
        }

        async fn delete_file(&self, name: &str) -> Result<()> {
            self.files.lock().remove(name);
            Ok(())
        }

        async fn exec(&self, args: &[String], progress: &ProgressSender) -> Result<()> {
            if let Some(msg) = &self.fail_exec {
                // Leave a partial output behind to prove cleanup removes it.
                self.files
                    .lock()
                    .insert("output_000.mp3".into(), Bytes::from_static(b"partial"));
                return Err(Error::tool("ffmpeg", msg.clone()));
            }
            let pattern = args.last().cloned().unwrap_or_default();
            for i in 0..self.chunks {
                let name = pattern.replace("%03d", &format!("{i:03}"));
                self.files
                    .lock()
                    .insert(name, Bytes::from(format!("chunk-{i}")));
                progress.send((i + 1) as f32 / self.chunks as f32);
            }
            Ok(())
        }
    }

    fn session(engine: MemoryEngine) -> (Arc<MemoryEngine>, TranscoderSession) {
        let engine = Arc::new(engine);
        let session = TranscoderSession::new(engine.clone(), "mp3");
        (engine, session)
    }

    fn minutes(n: u32) -> SegmentMinutes {
        SegmentMinutes::new(n).unwrap()
    }

    #[tokio::test]
    async fn concurrent_ensure_ready_loads_once() {
        let (engine, session) = session(MemoryEngine::default());
        let session = Arc::new(session);

        let mut handles = Vec::new();
        for _ in 0..8 {
            let s = session.clone();
            handles.push(tokio::spawn(async move { s.ensure_ready().await }));
        }
        for h in handles {
            h.await.unwrap().unwrap();
        }

        assert_eq!(engine.loads.load(Ordering::SeqCst), 1);
        assert_eq!(session.state(), EngineState::Ready);

        session.ensure_ready().await.unwrap();
        assert_eq!(engine.loads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failed_load_is_shared_then_retried_on_next_call() {
        let engine = MemoryEngine::default();
        engine.fail_loads.store(1, Ordering::SeqCst);
        let (engine, session) = session(engine);
        let session = Arc::new(session);

        let a = tokio::spawn({
            let s = session.clone();
            async move { s.ensure_ready().await }
        });
        let b = tokio::spawn({
            let s = session.clone();
            async move { s.ensure_ready().await }
        });
        let (a, b) = (a.await.unwrap(), b.await.unwrap());

        assert!(matches!(a, Err(Error::EngineInit(_))));
        assert!(matches!(b, Err(Error::EngineInit(_))));
        assert_eq!(engine.loads.load(Ordering::SeqCst), 1);
        assert_eq!(
            session.state(),
            EngineState::Failed("engine binary unavailable".into())
        );

        session.ensure_ready().await.unwrap();
        assert_eq!(engine.loads.load(Ordering::SeqCst), 2);
        assert!(session.state().is_ready());
    }

    #[tokio::test]
    async fn run_returns_outputs_in_order_and_cleans_up() {
        let (engine, session) = session(MemoryEngine {
            chunks: 3,
            ..Default::default()
        });

        let outputs = session
            .run(Bytes::from_static(b"ID3"), "mp3", minutes(1), &ProgressSender::noop())
            .await
            .unwrap();

        let names: Vec<_> = outputs.iter().map(|o| o.name.as_str()).collect();
        assert_eq!(names, ["output_000.mp3", "output_001.mp3", "output_002.mp3"]);
        assert_eq!(&outputs[2].bytes[..], b"chunk-2");
        assert!(outputs.iter().all(|o| o.duration_secs.is_none()));
        assert!(engine.list_dir().await.unwrap().is_empty());
        assert_eq!(engine.loads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failed_run_returns_engine_message_and_cleans_up() {
        let (engine, session) = session(MemoryEngine {
            fail_exec: Some("input.mp3: Invalid data found when processing input".into()),
            ..Default::default()
        });

        let err = session
            .run(Bytes::from_static(b"junk"), "mp3", minutes(15), &ProgressSender::noop())
            .await
            .unwrap_err();

        match err {
            Error::Transcode(message) => {
                assert_eq!(message, "input.mp3: Invalid data found when processing input")
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(engine.list_dir().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn leftovers_of_an_abandoned_run_are_not_collected() {
        let (engine, session) = session(MemoryEngine {
            chunks: 2,
            ..Default::default()
        });
        for name in ["input.wav", "output_000.mp3", "output_003.mp3", "output_004.mp3"] {
            engine
                .write_file(name, Bytes::from_static(b"stale"))
                .await
                .unwrap();
        }

        let outputs = session
            .run(Bytes::from_static(b"ID3"), "mp3", minutes(1), &ProgressSender::noop())
            .await
            .unwrap();

        let names: Vec<_> = outputs.iter().map(|o| o.name.as_str()).collect();
        assert_eq!(names, ["output_000.mp3", "output_001.mp3"]);
        assert_eq!(&outputs[0].bytes[..], b"chunk-0");
        assert!(engine.list_dir().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn zero_outputs_is_a_failure() {
        let (engine, session) = session(MemoryEngine::default());
        let err = session
            .run(Bytes::from_static(b"ID3"), "mp3", minutes(15), &ProgressSender::noop())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "no segments were produced");
        assert!(engine.list_dir().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn state_changes_are_broadcast() {
        let events = Arc::new(EventBus::default());
        let engine = Arc::new(MemoryEngine::default());
        let session = TranscoderSession::new(engine, "mp3").with_events(events.clone());

        session.ensure_ready().await.unwrap();

        let states: Vec<String> = events
            .recent_events(10)
            .into_iter()
            .rev()
            .filter_map(|e| match e.payload {
                EventPayload::EngineStateChanged { state, .. } => Some(state),
                _ => None,
            })
            .collect();
        assert_eq!(states, ["loading", "ready"]);
    }

    #[test]
    fn output_names_are_indexed_numerically() {
        assert_eq!(output_index("output_000.mp3", "mp3"), Some(0));
        assert_eq!(output_index("output_1000.mp3", "mp3"), Some(1000));
        assert_eq!(output_index("output_.mp3", "mp3"), None);
        assert_eq!(output_index("output_001.wav", "mp3"), None);
        assert_eq!(output_index("input.mp3", "mp3"), None);
        assert_eq!(output_index("output_0a1.mp3", "mp3"), None);
    }

    #[test]
    fn extensions_are_sanitized() {
        assert_eq!(sanitize_extension("MP3"), "mp3");
        assert_eq!(sanitize_extension(".m4a"), "m4a");
        assert_eq!(sanitize_extension("../x"), "x");
        assert_eq!(sanitize_extension(""), "bin");
    }
}
