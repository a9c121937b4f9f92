//! Runtime metrics and instrumentation.
//!
//! Lightweight atomic counters for the hot paths (triggers, contagion,
//! resonance, weather, chambers) plus a tick budget monitor. Counters are
//! exported as Prometheus text for server dashboards.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use parking_lot::Mutex;

// ---------------------------------------------------------------------------
// Counters (lock-free)
// ---------------------------------------------------------------------------

/// Atomic counters for high-frequency events.
pub struct AffectCounters {
    /// Emotion triggers applied.
    pub triggers: AtomicU64,
    /// Triggers above the spike threshold.
    pub spikes: AtomicU64,
    /// Mood changes observed on write.
    pub mood_shifts: AtomicU64,
    /// Contagion transfers applied.
    pub contagion_transfers: AtomicU64,
    /// Memories tagged.
    pub memories_tagged: AtomicU64,
    /// Memories returned by resonance queries.
    pub memories_resonated: AtomicU64,
    /// Atmosphere snapshots computed.
    pub atmosphere_samples: AtomicU64,
    /// Weather changes.
    pub weather_changes: AtomicU64,
    /// Weather changes that were emotion-driven.
    pub weather_changes_emotional: AtomicU64,
    /// Chamber resonance events.
    pub chamber_resonances: AtomicU64,
    /// Save operations completed.
    pub saves_completed: AtomicU64,
}

impl AffectCounters {
    /// Create a new set of zeroed counters.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            triggers: AtomicU64::new(0),
            spikes: AtomicU64::new(0),
            mood_shifts: AtomicU64::new(0),
            contagion_transfers: AtomicU64::new(0),
            memories_tagged: AtomicU64::new(0),
            memories_resonated: AtomicU64::new(0),
            atmosphere_samples: AtomicU64::new(0),
            weather_changes: AtomicU64::new(0),
            weather_changes_emotional: AtomicU64::new(0),
            chamber_resonances: AtomicU64::new(0),
            saves_completed: AtomicU64::new(0),
        }
    }

    /// Increment a counter by one.
    pub fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Snapshot all counters for export.
    #[must_use]
    pub fn snapshot(&self) -> CounterSnapshot {
        CounterSnapshot {
            triggers: self.triggers.load(Ordering::Relaxed),
            spikes: self.spikes.load(Ordering::Relaxed),
            mood_shifts: self.mood_shifts.load(Ordering::Relaxed),
            contagion_transfers: self.contagion_transfers.load(Ordering::Relaxed),
            memories_tagged: self.memories_tagged.load(Ordering::Relaxed),
            memories_resonated: self.memories_resonated.load(Ordering::Relaxed),
            atmosphere_samples: self.atmosphere_samples.load(Ordering::Relaxed),
            weather_changes: self.weather_changes.load(Ordering::Relaxed),
            weather_changes_emotional: self.weather_changes_emotional.load(Ordering::Relaxed),
            chamber_resonances: self.chamber_resonances.load(Ordering::Relaxed),
            saves_completed: self.saves_completed.load(Ordering::Relaxed),
        }
    }
}

impl Default for AffectCounters {
    fn default() -> Self {
        Self::new()
    }
}

/// A snapshot of counter values at a point in time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CounterSnapshot {
    /// Emotion triggers applied.
    pub triggers: u64,
    /// Spikes.
    pub spikes: u64,
    /// Mood shifts.
    pub mood_shifts: u64,
    /// Contagion transfers.
    pub contagion_transfers: u64,
    /// Memories tagged.
    pub memories_tagged: u64,
    /// Memories resonated.
    pub memories_resonated: u64,
    /// Atmosphere samples.
    pub atmosphere_samples: u64,
    /// Weather changes.
    pub weather_changes: u64,
    /// Emotion-driven weather changes.
    pub weather_changes_emotional: u64,
    /// Chamber resonances.
    pub chamber_resonances: u64,
    /// Completed saves.
    pub saves_completed: u64,
}

impl CounterSnapshot {
    /// Format as Prometheus-compatible text.
    #[must_use]
    pub fn to_prometheus(&self) -> String {
        let rows: [(&str, &str, u64); 11] = [
            ("atmos_triggers_total", "Emotion triggers applied", self.triggers),
            ("atmos_spikes_total", "Triggers above the spike threshold", self.spikes),
            ("atmos_mood_shifts_total", "Mood changes on write", self.mood_shifts),
            (
                "atmos_contagion_transfers_total",
                "Contagion transfers applied",
                self.contagion_transfers,
            ),
            ("atmos_memories_tagged_total", "Emotion-tagged memories", self.memories_tagged),
            (
                "atmos_memories_resonated_total",
                "Memories returned by resonance",
                self.memories_resonated,
            ),
            (
                "atmos_atmosphere_samples_total",
                "Atmosphere snapshots computed",
                self.atmosphere_samples,
            ),
            ("atmos_weather_changes_total", "Weather changes", self.weather_changes),
            (
                "atmos_weather_changes_emotional_total",
                "Emotion-driven weather changes",
                self.weather_changes_emotional,
            ),
            ("atmos_chamber_resonances_total", "Chamber resonance events", self.chamber_resonances),
            ("atmos_saves_completed_total", "Save operations completed", self.saves_completed),
        ];
        let mut out = String::new();
        for (name, help, value) in rows {
            out.push_str(&format!("# HELP {name} {help}\n# TYPE {name} counter\n{name} {value}\n"));
        }
        out
    }
}

// ---------------------------------------------------------------------------
// Tick Budget Monitor
// ---------------------------------------------------------------------------

/// Tracks wall time spent per simulation tick.
pub struct TickBudgetMonitor {
    budget_ms: f64,
    history: Mutex<TickHistory>,
}

struct TickHistory {
    /// Ring buffer of recent tick timings (milliseconds).
    timings: Vec<f64>,
    write_idx: usize,
    count: u64,
    last_over_budget: bool,
}

impl TickBudgetMonitor {
    /// Create a monitor with the given budget (milliseconds).
    #[must_use]
    pub fn new(budget_ms: f64) -> Self {
        Self {
            budget_ms,
            history: Mutex::new(TickHistory {
                timings: vec![0.0; 128],
                write_idx: 0,
                count: 0,
                last_over_budget: false,
            }),
        }
    }

    /// Begin timing a tick. The guard records elapsed time on drop.
    pub fn begin_tick(&self) -> TickGuard<'_> {
        TickGuard {
            monitor: self,
            start: Instant::now(),
        }
    }

    /// Record a tick timing manually (milliseconds).
    pub fn record(&self, ms: f64) {
        let mut h = self.history.lock();
        let idx = h.write_idx;
        let len = h.timings.len();
        h.timings[idx] = ms;
        h.write_idx = (idx + 1) % len;
        h.count += 1;
        h.last_over_budget = ms > self.budget_ms;
    }

    /// Whether the last tick exceeded the budget.
    #[must_use]
    pub fn is_over_budget(&self) -> bool {
        self.history.lock().last_over_budget
    }

    /// Number of ticks recorded.
    #[must_use]
    pub fn tick_count(&self) -> u64 {
        self.history.lock().count
    }

    /// Mean of the recorded window (milliseconds).
    #[must_use]
    pub fn mean_ms(&self) -> f64 {
        let h = self.history.lock();
        let n = (h.count as usize).min(h.timings.len());
        if n == 0 {
            return 0.0;
        }
        h.timings[..n].iter().sum::<f64>() / n as f64
    }

    /// The configured budget in milliseconds.
    #[must_use]
    pub fn budget_ms(&self) -> f64 {
        self.budget_ms
    }
}

/// RAII guard that records elapsed time when dropped.
pub struct TickGuard<'a> {
    monitor: &'a TickBudgetMonitor,
    start: Instant,
}

impl Drop for TickGuard<'_> {
    fn drop(&mut self) {
        self.monitor.record(self.start.elapsed().as_secs_f64() * 1000.0);
    }
}

/// Span names used with `tracing` spans.
pub mod spans {
    /// Whole world tick.
    pub const TICK: &str = "atmos::tick";
    /// Atmosphere aggregation.
    pub const ATMOSPHERE: &str = "atmos::atmosphere";
    /// Weather update.
    pub const WEATHER: &str = "atmos::weather";
    /// Chamber pass.
    pub const CHAMBERS: &str = "atmos::chambers";
    /// Persistence save.
    pub const PERSIST_SAVE: &str = "atmos::persist::save";
    /// Persistence load.
    pub const PERSIST_LOAD: &str = "atmos::persist::load";
}
