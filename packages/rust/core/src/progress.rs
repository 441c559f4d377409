//! Progress reporting seam between pipeline stages and the outer surface.

/// Progress callback for reporting stage status.
pub trait ProgressReporter: Send + Sync {
    /// Called when a stage starts.
    fn phase(&self, name: &str);
    /// Called before each item of a batch is processed.
    fn item(&self, label: &str, current: usize, total: usize);
    /// Called once when the stage completes.
    fn finish(&self, summary: &str);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn item(&self, _label: &str, _current: usize, _total: usize) {}
    fn finish(&self, _summary: &str) {}
}
