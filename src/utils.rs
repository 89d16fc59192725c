/// Debounce window measured in logical stream milliseconds.
///
/// One `Debouncer` tracks one kind of event for one detector. The same truth
/// table serves two opposite call-site idioms:
/// - cooldown: `if debouncer.matched_in(now) { return false }` suppresses
///   re-firing within the window
/// - liveness: `if !debouncer.matched_in(now) { give_up() }` requires a
///   confirmation inside the window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Debouncer {
    last_event_ms: Option<u64>,
    window_ms: u64,
}

impl Debouncer {
    /// Create a new debouncer with specified window in milliseconds
    pub fn new(window_ms: u64) -> Self {
        Self {
            last_event_ms: None,
            window_ms,
        }
    }

    pub fn window_ms(&self) -> u64 {
        self.window_ms
    }

    pub fn last_event_ms(&self) -> Option<u64> {
        self.last_event_ms
    }

    /// Record that the guarded condition occurred at `now_ms`
    pub fn record(&mut self, now_ms: u64) {
        self.last_event_ms = Some(now_ms);
    }

    /// True while `now_ms` lies in `[last_event, last_event + window)`.
    ///
    /// Never true before the first recorded event. A timestamp earlier than
    /// the recorded event (stream rewound) counts as inside the window.
    pub fn matched_in(&self, now_ms: u64) -> bool {
        match self.last_event_ms {
            None => false,
            Some(last) => now_ms.saturating_sub(last) < self.window_ms,
        }
    }

    /// Forget the last event
    pub fn reset(&mut self) {
        self.last_event_ms = None;
    }
}

/// Timing measurements for a single replayed frame
#[derive(Debug, Clone, Copy, Default)]
pub struct IterationTiming {
    pub decode_us: f64,
    pub detect_us: f64,
    pub dispatch_us: f64,
    pub total_us: f64,
}

impl IterationTiming {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn total_ms(&self) -> f64 {
        self.total_us / 1000.0
    }
}

/// Statistics collector for latency measurements
#[derive(Default)]
pub struct LatencyStats {
    timings: Vec<IterationTiming>,
}

impl LatencyStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            timings: Vec::with_capacity(capacity),
        }
    }

    pub fn add(&mut self, timing: IterationTiming) {
        self.timings.push(timing);
    }

    pub fn len(&self) -> usize {
        self.timings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timings.is_empty()
    }

    /// Calculate percentile from sorted data
    fn percentile(sorted: &[f64], p: f64) -> f64 {
        if sorted.is_empty() {
            return 0.0;
        }

        let idx = (p / 100.0 * (sorted.len() - 1) as f64).round() as usize;
        sorted[idx]
    }

    /// Mean, p50, p95 and p99 for one stage
    pub fn stage_stats(&self, extract: impl Fn(&IterationTiming) -> f64) -> (f64, f64, f64, f64) {
        if self.timings.is_empty() {
            return (0.0, 0.0, 0.0, 0.0);
        }

        let mut values: Vec<f64> = self.timings.iter().map(&extract).collect();
        values.sort_by(|a, b| a.total_cmp(b));

        let mean = values.iter().sum::<f64>() / values.len() as f64;
        let p50 = Self::percentile(&values, 50.0);
        let p95 = Self::percentile(&values, 95.0);
        let p99 = Self::percentile(&values, 99.0);

        (mean, p50, p95, p99)
    }

    /// Log a benchmark report, one row per stage
    pub fn print_report(&self, frame_interval_ms: u64) {
        if self.timings.is_empty() {
            tracing::info!("No timing data collected");
            return;
        }

        tracing::info!("Sample size: {} frames", self.timings.len());

        let decode_stats = self.stage_stats(|t| t.decode_us);
        let detect_stats = self.stage_stats(|t| t.detect_us);
        let dispatch_stats = self.stage_stats(|t| t.dispatch_us);
        let total_stats = self.stage_stats(|t| t.total_us);

        tracing::info!("| Stage       |   Mean   |   p50    |   p95    |   p99    |");
        Self::print_row("Decode", decode_stats);
        Self::print_row("Detect", detect_stats);
        Self::print_row("Dispatch", dispatch_stats);
        Self::print_row("TOTAL", total_stats);

        let total_p95_ms = total_stats.2 / 1000.0;
        if total_p95_ms < frame_interval_ms as f64 {
            tracing::info!(
                "Real-time budget met (p95 {:.2} ms < {} ms per frame)",
                total_p95_ms,
                frame_interval_ms
            );
        } else {
            tracing::warn!(
                "Real-time budget missed (p95 {:.2} ms >= {} ms per frame)",
                total_p95_ms,
                frame_interval_ms
            );
        }
    }

    fn print_row(name: &str, stats: (f64, f64, f64, f64)) {
        tracing::info!(
            "| {:<11} | {:>6.0} us | {:>6.0} us | {:>6.0} us | {:>6.0} us |",
            name,
            stats.0,
            stats.1,
            stats.2,
            stats.3
        );
    }
}
