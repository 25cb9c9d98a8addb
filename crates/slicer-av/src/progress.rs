//! One-way progress notification from the engine to whoever started a run.

/// Sender for reporting engine progress.
///
/// Wraps a callback that receives a fraction in `0.0..=1.0`. Reports are
/// advisory: they carry no ordering or step-size guarantees and must never
/// drive control flow.
pub struct ProgressSender {
    callback: Box<dyn Fn(f32) + Send + Sync>,
}

impl ProgressSender {
    /// Create a new sender from the given callback.
    pub fn new(callback: impl Fn(f32) + Send + Sync + 'static) -> Self {
        Self {
            callback: Box::new(callback),
        }
    }

    /// Create a no-op sender that discards all progress reports.
    pub fn noop() -> Self {
        Self {
            callback: Box::new(|_| {}),
        }
    }

    /// Report progress. Values outside `0.0..=1.0` are clamped; NaN is dropped.
    pub fn send(&self, fraction: f32) {
        if fraction.is_nan() {
            return;
        }
        (self.callback)(fraction.clamp(0.0, 1.0));
    }
}

impl std::fmt::Debug for ProgressSender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressSender").finish_non_exhaustive()
    }
}
