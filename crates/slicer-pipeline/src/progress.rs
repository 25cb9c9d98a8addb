//! Monotonic percentage reporting for a single run.

use std::sync::Arc;

use parking_lot::Mutex;

/// Forwards run progress as whole percentages that never go backwards.
///
/// Values are clamped to `0..=100`; a report that would not raise the last
/// emitted value is swallowed. Clones share the same state.
#[derive(Clone)]
pub struct ProgressTracker {
    last: Arc<Mutex<Option<u8>>>,
    sink: Arc<dyn Fn(u8) + Send + Sync>,
}

impl ProgressTracker {
    pub fn new(sink: impl Fn(u8) + Send + Sync + 'static) -> Self {
        Self {
            last: Arc::new(Mutex::new(None)),
            sink: Arc::new(sink),
        }
    }

    pub fn noop() -> Self {
        Self::new(|_| {})
    }

    /// Report `percent`. Returns whether it was forwarded.
    pub fn report(&self, percent: f32) -> bool {
        if percent.is_nan() {
            return false;
        }
        let value = percent.clamp(0.0, 100.0).floor() as u8;

        let mut last = self.last.lock();
        if matches!(*last, Some(prev) if value <= prev) {
            return false;
        }
        *last = Some(value);
        (self.sink)(value);
        true
    }

    /// Map an engine fraction (`0.0..=1.0`) into the `[from, to]` band.
    pub fn report_scaled(&self, fraction: f32, from: u8, to: u8) -> bool {
        let fraction = fraction.clamp(0.0, 1.0);
        let span = f32::from(to.saturating_sub(from));
        self.report(f32::from(from) + fraction * span)
    }

    /// Last forwarded value, if any.
    pub fn current(&self) -> Option<u8> {
        *self.last.lock()
    }
}

impl std::fmt::Debug for ProgressTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressTracker")
            .field("last", &self.current())
            .finish_non_exhaustive()
    }
}
