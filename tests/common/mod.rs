//! Shared test harness for integration tests.
//!
//! Provides [`TestHarness`], which wires a full [`AppContext`] around an
//! in-memory [`FakeEngine`]. [`TestHarness::with_server`] starts Axum on a
//! random port for HTTP-level testing.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use tokio::sync::Notify;

use slicer_av::{ProgressSender, TranscoderEngine};
use slicer_core::config::Config;
use slicer_core::{Error, Result};
use slicer_server::context::AppContext;
use slicer_server::router::build_router;

/// Engine that "segments" its input into fixed-size byte chunks.
pub struct FakeEngine {
    files: Mutex<BTreeMap<String, Bytes>>,
    pub loads: AtomicUsize,
    chunk: usize,
    fail_with: Option<String>,
    /// When set, `exec` waits for a notification before doing anything.
    pub gate: Option<Arc<Notify>>,
}

impl FakeEngine {
    pub fn chunked(chunk: usize) -> Self {
        Self {
            files: Mutex::new(BTreeMap::new()),
            loads: AtomicUsize::new(0),
            chunk,
            fail_with: None,
            gate: None,
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            fail_with: Some(message.to_string()),
            ..Self::chunked(1)
        }
    }

    pub fn file_count(&self) -> usize {
        self.files.lock().len()
    }
}

#[async_trait]
impl TranscoderEngine for FakeEngine {
    async fn load(&self) -> Result<()> {
        self.loads.fetch_add(1, Ordering::SeqCst);
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
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        if let Some(message) = &self.fail_with {
            return Err(Error::tool("ffmpeg", message.clone()));
        }
        let input = self.read_file(&args[1]).await?;
        let pattern = args.last().cloned().unwrap_or_default();
        let total = input.len().div_ceil(self.chunk);
        for (i, chunk) in input.chunks(self.chunk).enumerate() {
            let name = pattern.replace("%03d", &format!("{i:03}"));
            self.files.lock().insert(name, Bytes::copy_from_slice(chunk));
            progress.send((i + 1) as f32 / total as f32);
        }
        Ok(())
    }
}

/// Test harness wrapping a fully-constructed [`AppContext`].
pub struct TestHarness {
    pub ctx: AppContext,
    pub engine: Arc<FakeEngine>,
}

impl TestHarness {
    pub fn new() -> Self {
        Self::with_engine(Config::default(), FakeEngine::chunked(4))
    }

    pub fn with_engine(config: Config, engine: FakeEngine) -> Self {
        let engine = Arc::new(engine);
        let ctx = AppContext::new(config, engine.clone());
        Self { ctx, engine }
    }

    /// Start an Axum server on a random port and return the harness together
    /// with the bound socket address.
    pub async fn with_server() -> (Self, SocketAddr) {
        Self::new().serve().await
    }

    pub async fn serve(self) -> (Self, SocketAddr) {
        let app = build_router(self.ctx.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind random port");
        let addr = listener.local_addr().expect("failed to get local addr");

        tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });

        (self, addr)
    }
}
