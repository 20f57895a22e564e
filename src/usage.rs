use std::time::Instant;

use sysinfo::{System, MINIMUM_CPU_UPDATE_INTERVAL};

/// Samples the machine-wide CPU usage the OS reports.
///
/// sysinfo needs two refreshes at least `MINIMUM_CPU_UPDATE_INTERVAL` apart
/// before a reading means anything, so the first samples come back empty and
/// later ones are cached between refreshes.
pub struct UsageProbe {
    sys: System,
    last_refresh: Instant,
    latest: Option<f32>,
}

impl UsageProbe {
    pub fn new() -> Self {
        let mut sys = System::new();
        sys.refresh_cpu_usage();
        Self {
            sys,
            last_refresh: Instant::now(),
            latest: None,
        }
    }

    /// Latest global usage in percent, refreshed when enough time has passed.
    pub fn sample(&mut self) -> Option<f32> {
        if self.last_refresh.elapsed() >= MINIMUM_CPU_UPDATE_INTERVAL {
            self.sys.refresh_cpu_usage();
            self.last_refresh = Instant::now();
            self.latest = Some(self.sys.global_cpu_usage().clamp(0.0, 100.0));
        }
        self.latest
    }
}

impl Default for UsageProbe {
    fn default() -> Self {
        Self::new()
    }
}
