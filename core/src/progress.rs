//! Rendering progress observers

/// Observer of a renderer's progress through its pipeline steps.
///
/// Callbacks are informational only: there is no cancellation path. Progress
/// updates may arrive from any worker thread.
pub trait ProgressTracker: Send + Sync {
    /// A render pass started.
    fn rendering_started(&self);

    /// Progress within the current pipeline step.
    ///
    /// * `total_steps`   - Number of steps in this pass's pipeline.
    /// * `step_index`    - Zero-based index of the current step.
    /// * `step_progress` - Fractional progress within the step, in `[0, 1]`.
    /// * `step_label`    - Human-readable label of the step.
    fn rendering_progress_update(
        &self,
        total_steps: usize,
        step_index: usize,
        step_progress: f64,
        step_label: &str,
    );

    /// The render pass completed.
    fn rendering_completed(&self);
}
