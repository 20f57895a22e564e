use std::hint::black_box;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use log::{debug, trace};

use crate::control::{ControlState, MAX_INTENSITY};

/// Share of `cycle` a worker spends computing at the given intensity.
pub fn busy_budget(cycle: Duration, intensity: u8) -> Duration {
    let intensity = intensity.min(MAX_INTENSITY);
    cycle * u32::from(intensity) / u32::from(MAX_INTENSITY)
}

pub fn detect_core_count() -> i64 {
    i64::try_from(num_cpus::get()).unwrap_or(i64::MAX)
}

/// Number of workers to spawn for a detected core count. Never below one.
pub fn resolve_core_count(detected: i64) -> usize {
    usize::try_from(detected.max(1)).unwrap_or(usize::MAX)
}

/// Five chained floating point accumulators that keep the FPU busy.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Accumulators {
    a: f64,
    b: f64,
    c: f64,
    d: f64,
    e: f64,
}

impl Accumulators {
    pub fn new() -> Self {
        Self {
            a: 1.0,
            b: 1.0,
            c: 1.0,
            d: 1.0,
            e: 1.0,
        }
    }

    pub fn step(&mut self) {
        let Self { a, b, c, d, e } = &mut *self;

        *a = a.sin() * b.cos() * c.tan() * d.abs().sqrt() * e.abs().ln_1p();
        *b = b.cos() * c.tan() * d.abs().sqrt() * e.abs().ln_1p() * a.sin();
        *c = c.tan() * d.abs().sqrt() * e.abs().ln_1p() * a.sin() * b.cos();
        *d = d.abs().sqrt() * e.abs().ln_1p() * a.sin() * b.cos() * c.tan();
        *e = e.abs().ln_1p() * a.sin() * b.cos() * c.tan() * d.abs().sqrt();

        *a = (a.abs() + 1.0).powf(1.5) * b.sin().exp();
        *b = (b.abs() + 1.1).log10() * c.cos().asin();
        *c = (c.abs() * 0.1).sinh() * d.sin().acos();
        *d = (d.abs() * 0.1).cosh() * e.cos().atan();
        *e = (e.abs() * 0.1).tanh() * a.atan2(b.abs() + 0.1);

        black_box(&*self);
    }
}

impl Default for Accumulators {
    fn default() -> Self {
        Self::new()
    }
}

/// Time split of a single completed cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleReport {
    pub budget: Duration,
    pub busy: Duration,
    pub idle: Duration,
}

/// Holds one core at the configured intensity with a fixed-period duty cycle.
pub struct LoadWorker {
    id: usize,
    state: Arc<ControlState>,
    cycle: Duration,
    accumulators: Accumulators,
}

impl LoadWorker {
    pub fn new(id: usize, state: Arc<ControlState>, cycle: Duration) -> Self {
        Self {
            id,
            state,
            cycle,
            accumulators: Accumulators::new(),
        }
    }

    pub fn run(mut self) {
        debug!("worker {} started", self.id);
        while self.state.is_running() {
            let report = self.run_cycle();
            trace!(
                "worker {}: busy {:?} of {:?}, idle {:?}",
                self.id,
                report.busy,
                report.budget,
                report.idle
            );
        }
        debug!("worker {} exited", self.id);
    }

    /// Computes for this cycle's budget, then sleeps out the rest of the cycle.
    /// Each cycle reads the live intensity; nothing carries over between cycles.
    pub fn run_cycle(&mut self) -> CycleReport {
        let cycle_start = Instant::now();
        let budget = busy_budget(self.cycle, self.state.intensity());
        let busy_until = cycle_start + budget;

        while Instant::now() < busy_until && self.state.is_running() {
            self.accumulators.step();
        }

        let busy = cycle_start.elapsed();
        let idle = self.cycle.saturating_sub(busy);
        if !idle.is_zero() && self.state.is_running() {
            thread::sleep(idle);
        }

        CycleReport { budget, busy, idle }
    }
}

/// Starts one worker thread per core.
pub fn spawn_workers(
    count: usize,
    state: &Arc<ControlState>,
    cycle: Duration,
) -> std::io::Result<Vec<JoinHandle<()>>> {
    let mut handles = Vec::with_capacity(count);

    for id in 0..count {
        let worker = LoadWorker::new(id, Arc::clone(state), cycle);
        let handle = thread::Builder::new()
            .name(format!("load-{id}"))
            .spawn(move || worker.run());
        match handle {
            Ok(handle) => handles.push(handle),
            Err(err) => {
                state.stop();
                for handle in handles {
                    let _ = handle.join();
                }
                return Err(err);
            }
        }
    }

    Ok(handles)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn budget_is_zero_at_zero_intensity() {
        assert_eq!(busy_budget(Duration::from_millis(100), 0), Duration::ZERO);
    }

    #[test]
    fn budget_is_full_cycle_at_max_intensity() {
        let cycle = Duration::from_millis(100);
        assert_eq!(busy_budget(cycle, 100), cycle);
    }

    #[test]
    fn budget_scales_linearly() {
        let cycle = Duration::from_millis(100);
        assert_eq!(busy_budget(cycle, 37), Duration::from_millis(37));
        assert_eq!(busy_budget(cycle, 50), Duration::from_millis(50));
        assert_eq!(busy_budget(cycle, 200), cycle);
    }

    #[test]
    fn core_count_falls_back_to_one() {
        assert_eq!(resolve_core_count(0), 1);
        assert_eq!(resolve_core_count(-3), 1);
        assert_eq!(resolve_core_count(1), 1);
        assert_eq!(resolve_core_count(16), 16);
        assert!(resolve_core_count(detect_core_count()) >= 1);
    }

    #[test]
    fn accumulators_change_every_step() {
        let mut acc = Accumulators::new();
        let start = acc;
        acc.step();
        assert_ne!(acc, start);
        for _ in 0..10_000 {
            acc.step();
        }
    }

    #[test]
    fn idle_cycle_does_no_busy_work() {
        let state = Arc::new(ControlState::new());
        let mut worker = LoadWorker::new(0, state, Duration::from_millis(20));

        let report = worker.run_cycle();
        assert_eq!(report.budget, Duration::ZERO);
        assert!(report.busy < Duration::from_millis(10));
        assert!(report.idle > Duration::from_millis(10));
    }

    #[test]
    fn full_intensity_cycle_is_all_busy() {
        let state = Arc::new(ControlState::new());
        state.set_intensity(100);
        let mut worker = LoadWorker::new(0, state, Duration::from_millis(20));

        let report = worker.run_cycle();
        assert_eq!(report.budget, Duration::from_millis(20));
        assert!(report.busy >= Duration::from_millis(20));
        assert_eq!(report.idle, Duration::ZERO);
    }

    #[test]
    fn workers_exit_within_a_cycle_after_stop() {
        let state = Arc::new(ControlState::new());
        state.set_intensity(60);
        let cycle = Duration::from_millis(20);
        let handles = spawn_workers(3, &state, cycle).unwrap();
        assert_eq!(handles.len(), 3);

        thread::sleep(Duration::from_millis(50));
        let stopped_at = Instant::now();
        state.stop();
        for handle in handles {
            handle.join().unwrap();
        }
        assert!(stopped_at.elapsed() < Duration::from_secs(1));
    }
}
