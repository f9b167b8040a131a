//! Observable 0-100 progress value for a single `process_image` call.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

pub const DECODED: u8 = 10;
pub const MODEL_READY: u8 = 20;
pub const RESIZED: u8 = 40;
pub const INFERRED: u8 = 60;
pub const MASK_APPLIED: u8 = 80;
pub const SEGMENTED: u8 = 90;
pub const DONE: u8 = 100;

type Observer = Arc<dyn Fn(u8) + Send + Sync>;

/// Clonable handle; clones share the same value and observer.
#[derive(Clone, Default)]
pub struct Progress {
    value: Arc<AtomicU8>,
    observer: Option<Observer>,
}

impl Progress {
    pub fn new() -> Self {
        Self::default()
    }

    /// Calls `observer` with the new value every time it changes.
    pub fn with_observer(observer: impl Fn(u8) + Send + Sync + 'static) -> Self {
        Self {
            value: Arc::default(),
            observer: Some(Arc::new(observer)),
        }
    }

    pub fn get(&self) -> u8 {
        self.value.load(Ordering::SeqCst)
    }

    /// Moves forward to `value`; never moves backwards.
    pub fn advance(&self, value: u8) {
        let value = value.min(DONE);
        let previous = self.value.fetch_max(value, Ordering::SeqCst);
        if previous < value {
            self.notify(value);
        }
    }

    /// Back to zero, used when a run fails.
    pub fn reset(&self) {
        if self.value.swap(0, Ordering::SeqCst) != 0 {
            self.notify(0);
        }
    }

    fn notify(&self, value: u8) {
        if let Some(observer) = &self.observer {
            observer(value);
        }
    }
}

impl fmt::Debug for Progress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Progress")
            .field("value", &self.get())
            .field("observed", &self.observer.is_some())
            .finish()
    }
}
