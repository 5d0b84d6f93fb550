// Path: crates/telemetry/src/time.rs
use crate::sinks::ExecutionMetricsSink;
use std::time::Instant;

/// Reports the elapsed time of a block to the sink when dropped.
pub struct Timer<'a> {
    sink: &'a dyn ExecutionMetricsSink,
    start: Instant,
}

impl<'a> Timer<'a> {
    /// Starts the timer.
    pub fn new(sink: &'a dyn ExecutionMetricsSink) -> Self {
        Self {
            sink,
            start: Instant::now(),
        }
    }
}

impl Drop for Timer<'_> {
    fn drop(&mut self) {
        self.sink
            .observe_block_duration(self.start.elapsed().as_secs_f64());
    }
}
