//! Application context shared across all route handlers via Axum state.

use std::sync::Arc;

use slicer_av::{ToolRegistry, TranscoderEngine, TranscoderSession};
use slicer_core::config::Config;
use slicer_core::events::EventBus;
use slicer_pipeline::{SegmentPipeline, SegmentStore};

#[derive(Clone)]
pub struct AppContext {
    /// Immutable application configuration snapshot.
    pub config: Arc<Config>,
    /// Broadcast event bus for SSE.
    pub event_bus: Arc<EventBus>,
    /// The split pipeline; owns the session, the content store, and the
    /// current batch.
    pub pipeline: Arc<SegmentPipeline>,
    /// External tool registry.
    pub tools: Arc<ToolRegistry>,
}

impl AppContext {
    /// Wire a context around `engine`. The engine is not loaded until the
    /// first split.
    pub fn new(config: Config, engine: Arc<dyn TranscoderEngine>) -> Self {
        let event_bus = Arc::new(EventBus::default());
        let session = Arc::new(
            TranscoderSession::new(engine, config.split.extension()).with_events(event_bus.clone()),
        );
        let pipeline = Arc::new(
            SegmentPipeline::new(session, Arc::new(SegmentStore::new()))
                .with_events(event_bus.clone()),
        );
        let tools = Arc::new(ToolRegistry::discover(&config.tools));

        Self {
            config: Arc::new(config),
            event_bus,
            pipeline,
            tools,
        }
    }
}
