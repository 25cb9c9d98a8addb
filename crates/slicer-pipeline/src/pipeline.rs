//! One split run, from accepted input to published batch.
//!
//! Progress milestones:
//!
//! | %      | meaning                                 |
//! |--------|-----------------------------------------|
//! | 5      | engine load started                     |
//! | 10     | engine ready                            |
//! | 20     | input handed to the engine              |
//! | 20..80 | engine progress, scaled                 |
//! | 80     | segmentation complete                   |
//! | 100    | batch published (success only)          |

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use slicer_av::{EngineOutput, ProgressSender, TranscoderSession};
use slicer_core::events::{EventBus, EventPayload};
use slicer_core::{
    segment_name, AudioFormat, Error, InputFile, Result, RunId, Segment, SegmentBatch,
    SegmentId, SegmentMinutes,
};

use crate::progress::ProgressTracker;
use crate::store::SegmentStore;

const LOAD_STARTED: f32 = 5.0;
const ENGINE_READY: f32 = 10.0;
const INPUT_WRITTEN: u8 = 20;
const SEGMENTED: u8 = 80;
const DONE: f32 = 100.0;

/// Drives split runs against a shared session and owns the current batch.
pub struct SegmentPipeline {
    session: Arc<TranscoderSession>,
    store: Arc<SegmentStore>,
    events: Option<Arc<EventBus>>,
    busy: AtomicBool,
    current: RwLock<Option<SegmentBatch>>,
}

/// Releases the busy flag on drop.
struct BusyGuard<'a>(&'a AtomicBool);

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl SegmentPipeline {
    pub fn new(session: Arc<TranscoderSession>, store: Arc<SegmentStore>) -> Self {
        Self {
            session,
            store,
            events: None,
            busy: AtomicBool::new(false),
            current: RwLock::new(None),
        }
    }

    pub fn with_events(mut self, events: Arc<EventBus>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn session(&self) -> &Arc<TranscoderSession> {
        &self.session
    }

    pub fn store(&self) -> &Arc<SegmentStore> {
        &self.store
    }

    /// Whether a split is in flight right now.
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// The batch from the last successful run, if it has not been cleared.
    pub fn current(&self) -> Option<SegmentBatch> {
        self.current.read().clone()
    }

    /// Drop the current batch and revoke all of its handles.
    pub fn clear(&self) {
        let mut current = self.current.write();
        self.store.clear();
        *current = None;
    }

    /// Look up a segment of the current batch together with its bytes.
    pub fn segment(&self, id: SegmentId) -> Result<(Segment, bytes::Bytes)> {
        let segment = self
            .current
            .read()
            .as_ref()
            .and_then(|b| b.find(id).cloned())
            .ok_or_else(|| Error::not_found("segment", id))?;
        let bytes = self
            .store
            .fetch(segment.handle)
            .ok_or_else(|| Error::not_found("segment content", id))?;
        Ok((segment, bytes))
    }

    fn emit(&self, payload: EventPayload) {
        if let Some(events) = &self.events {
            events.broadcast(payload);
        }
    }

    /// Split `input` into `minutes`-long segments.
    ///
    /// Fails with [`Error::Busy`] while another split is running. On success
    /// the returned batch replaces the current one; on failure the current
    /// batch is left untouched and 100% is never reported.
    pub async fn split(
        &self,
        input: &InputFile,
        minutes: SegmentMinutes,
        progress: &ProgressTracker,
    ) -> Result<SegmentBatch> {
        if self
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(Error::Busy);
        }
        let _guard = BusyGuard(&self.busy);

        let run_id = RunId::new();
        tracing::info!(
            "Run {run_id}: splitting {} ({} bytes) into {minutes} segments",
            input.name(),
            input.size()
        );
        self.emit(EventPayload::RunStarted {
            run_id,
            source_name: input.name().to_string(),
            minutes: minutes.get(),
        });

        let tracker = self.run_tracker(run_id, progress.clone());

        match self.execute(input, minutes, run_id, &tracker).await {
            Ok(batch) => {
                tracing::info!("Run {run_id}: produced {} segments", batch.len());
                self.emit(EventPayload::RunCompleted {
                    run_id,
                    segments: batch.len(),
                });
                Ok(batch)
            }
            Err(e) => {
                tracing::error!("Run {run_id} failed: {e}");
                self.emit(EventPayload::RunFailed {
                    run_id,
                    error: e.user_message(),
                });
                Err(e)
            }
        }
    }

    /// A tracker that forwards to the caller's and publishes progress events.
    fn run_tracker(&self, run_id: RunId, outer: ProgressTracker) -> ProgressTracker {
        let events = self.events.clone();
        ProgressTracker::new(move |p| {
            outer.report(f32::from(p));
            if let Some(events) = &events {
                events.broadcast(EventPayload::RunProgress {
                    run_id,
                    progress: p,
                });
            }
        })
    }

    async fn execute(
        &self,
        input: &InputFile,
        minutes: SegmentMinutes,
        run_id: RunId,
        tracker: &ProgressTracker,
    ) -> Result<SegmentBatch> {
        tracker.report(LOAD_STARTED);
        self.session.ensure_ready().await?;
        tracker.report(ENGINE_READY);

        let engine_progress = {
            let tracker = tracker.clone();
            ProgressSender::new(move |fraction| {
                tracker.report_scaled(fraction, INPUT_WRITTEN, SEGMENTED);
            })
        };

        tracker.report(f32::from(INPUT_WRITTEN));
        let outputs = self
            .session
            .run(
                input.bytes().clone(),
                &input_extension(input),
                minutes,
                &engine_progress,
            )
            .await?;
        tracker.report(f32::from(SEGMENTED));

        let batch = self.publish(input, minutes, run_id, outputs);
        tracker.report(DONE);
        Ok(batch)
    }

    /// Register all outputs under fresh handles and make the batch current.
    fn publish(
        &self,
        input: &InputFile,
        minutes: SegmentMinutes,
        run_id: RunId,
        outputs: Vec<EngineOutput>,
    ) -> SegmentBatch {
        let base = input.base_name();
        let extension = self.session.segment_extension().to_string();
        let fallback_secs = f64::from(minutes.as_seconds());

        let mut current = self.current.write();
        let handles = self.store.publish(outputs.iter().map(|o| o.bytes.clone()));

        let segments = outputs
            .into_iter()
            .zip(handles)
            .enumerate()
            .map(|(i, (output, handle))| {
                let ordinal = i as u32 + 1;
                Segment {
                    id: SegmentId::new(),
                    ordinal,
                    name: segment_name(&base, ordinal, &extension),
                    size: output.bytes.len() as u64,
                    duration_secs: output
                        .duration_secs
                        .filter(|d| d.is_finite() && *d >= 0.0)
                        .unwrap_or(fallback_secs),
                    handle,
                }
            })
            .collect();

        let batch = SegmentBatch {
            run_id,
            source_name: input.name().to_string(),
            base_name: base,
            minutes,
            segments,
        };
        *current = Some(batch.clone());
        batch
    }
}

impl std::fmt::Debug for SegmentPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SegmentPipeline")
            .field("session", &self.session)
            .field("busy", &self.is_busy())
            .finish_non_exhaustive()
    }
}

/// Extension used for the engine-side input file: the name's own extension,
/// else the one implied by the declared media type.
fn input_extension(input: &InputFile) -> String {
    input
        .extension()
        .or_else(|| {
            AudioFormat::from_media_type(input.media_type()).map(|f| f.extension().to_string())
        })
        .unwrap_or_else(|| "bin".to_string())
}
