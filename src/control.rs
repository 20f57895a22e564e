use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};

pub const MIN_INTENSITY: u8 = 0;
pub const MAX_INTENSITY: u8 = 100;

/// State shared by the input handler, the load workers and the display loop.
///
/// Each field is its own atomic. Nothing here spans both fields, so readers
/// never need a consistent snapshot of the pair.
#[derive(Debug)]
pub struct ControlState {
    running: AtomicBool,
    intensity: AtomicU8,
}

impl ControlState {
    pub fn new() -> Self {
        Self {
            running: AtomicBool::new(true),
            intensity: AtomicU8::new(MIN_INTENSITY),
        }
    }

    pub fn intensity(&self) -> u8 {
        self.intensity.load(Ordering::SeqCst)
    }

    /// Adds `delta` to the intensity, saturating at the bounds.
    pub fn adjust_intensity(&self, delta: i32) -> u8 {
        let previous = self
            .intensity
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |current| {
                Some(clamp_intensity(i64::from(current) + i64::from(delta)))
            })
            .unwrap_or_else(|current| current);
        clamp_intensity(i64::from(previous) + i64::from(delta))
    }

    pub fn set_intensity(&self, value: i32) -> u8 {
        let value = clamp_intensity(i64::from(value));
        self.intensity.store(value, Ordering::SeqCst);
        value
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Idempotent; nothing ever sets the flag back.
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }
}

impl Default for ControlState {
    fn default() -> Self {
        Self::new()
    }
}

fn clamp_intensity(value: i64) -> u8 {
    value.clamp(i64::from(MIN_INTENSITY), i64::from(MAX_INTENSITY)) as u8
}
