use std::io;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use log::debug;

use crate::control::{ControlState, MAX_INTENSITY};
use crate::terminal::{Palette, TerminalSurface};
use crate::usage::UsageProbe;

pub const BAR_WIDTH: usize = 50;
pub const STATUS_ROW: u16 = 12;
pub const USAGE_ROW: u16 = 13;

const LABEL_WIDTH: usize = 16;
const USAGE_WIDTH: usize = 40;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Maximum,
    High,
    Moderate,
}

impl Severity {
    pub fn for_intensity(intensity: u8) -> Self {
        match intensity {
            76.. => Severity::Maximum,
            41..=75 => Severity::High,
            _ => Severity::Moderate,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Severity::Maximum => "MAXIMUM LOAD",
            Severity::High => "HIGH LOAD",
            Severity::Moderate => "MODERATE LOAD",
        }
    }

    pub fn color(self) -> Palette {
        match self {
            Severity::Maximum => Palette::Hot,
            Severity::High => Palette::Warm,
            Severity::Moderate => Palette::Cool,
        }
    }
}

pub fn filled_units(intensity: u8) -> usize {
    usize::from(intensity.min(MAX_INTENSITY) / 2)
}

/// The bar line. Always the same width, so a rewrite covers the previous one.
pub fn status_line(intensity: u8) -> String {
    let filled = filled_units(intensity);
    format!(
        "Current Calculation Intensity: [{}{}] {:>3}% {:<LABEL_WIDTH$}",
        "#".repeat(filled),
        " ".repeat(BAR_WIDTH - filled),
        intensity,
        Severity::for_intensity(intensity).label(),
    )
}

pub fn usage_line(usage: Option<f32>) -> String {
    let line = match usage {
        Some(usage) => format!("Measured CPU usage: {usage:>5.1}%"),
        None => "Measured CPU usage: sampling...".to_string(),
    };
    format!("{line:<USAGE_WIDTH$}")
}

/// Redraws the dashboard from the control state at a fixed refresh period.
pub struct DisplayLoop<S> {
    state: Arc<ControlState>,
    surface: S,
    refresh: Duration,
    usage: Option<UsageProbe>,
}

impl<S: TerminalSurface> DisplayLoop<S> {
    pub fn new(state: Arc<ControlState>, surface: S, refresh: Duration) -> Self {
        Self {
            state,
            surface,
            refresh,
            usage: None,
        }
    }

    pub fn with_usage(mut self, probe: UsageProbe) -> Self {
        self.usage = Some(probe);
        self
    }

    pub fn render(&mut self) -> io::Result<()> {
        let intensity = self.state.intensity();
        let severity = Severity::for_intensity(intensity);

        self.surface.set_cursor_position(0, STATUS_ROW)?;
        self.surface.set_text_color(severity.color())?;
        self.surface.print(&status_line(intensity))?;

        if let Some(probe) = self.usage.as_mut() {
            let usage = probe.sample();
            self.surface.set_cursor_position(0, USAGE_ROW)?;
            self.surface.set_text_color(Palette::Default)?;
            self.surface.print(&usage_line(usage))?;
        }

        self.surface.set_text_color(Palette::Default)?;
        self.surface.flush()
    }

    /// Renders until the state stops. A terminal error stops everything.
    pub fn run(&mut self) -> io::Result<()> {
        while self.state.is_running() {
            if let Err(err) = self.render() {
                self.state.stop();
                return Err(err);
            }
            thread::sleep(self.refresh);
        }
        debug!("display loop exited");
        Ok(())
    }

    pub fn into_surface(self) -> S {
        self.surface
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::terminal::testing::{BrokenSurface, RecordingSurface, SurfaceOp};
    use std::time::Instant;

    #[test]
    fn severity_threshold_edges() {
        assert_eq!(Severity::for_intensity(100).label(), "MAXIMUM LOAD");
        assert_eq!(Severity::for_intensity(76).label(), "MAXIMUM LOAD");
        assert_eq!(Severity::for_intensity(75).label(), "HIGH LOAD");
        assert_eq!(Severity::for_intensity(41).label(), "HIGH LOAD");
        assert_eq!(Severity::for_intensity(40).label(), "MODERATE LOAD");
        assert_eq!(Severity::for_intensity(0).label(), "MODERATE LOAD");
    }

    #[test]
    fn severity_colors() {
        assert_eq!(Severity::for_intensity(76).color(), Palette::Hot);
        assert_eq!(Severity::for_intensity(75).color(), Palette::Warm);
        assert_eq!(Severity::for_intensity(40).color(), Palette::Cool);
    }

    #[test]
    fn bar_fill_is_half_the_intensity_rounded_down() {
        assert_eq!(filled_units(100), 50);
        assert_eq!(filled_units(75), 37);
        assert_eq!(filled_units(3), 1);
        assert_eq!(filled_units(1), 0);
        assert_eq!(filled_units(0), 0);
    }

    #[test]
    fn status_line_layout() {
        let line = status_line(75);
        let bar = format!("[{}{}]", "#".repeat(37), " ".repeat(13));
        assert!(line.starts_with("Current Calculation Intensity: "));
        assert!(line.contains(&bar));
        assert!(line.contains(" 75% HIGH LOAD"));
    }

    #[test]
    fn status_line_width_is_constant() {
        let widths: Vec<usize> = [0u8, 5, 40, 41, 75, 76, 100]
            .iter()
            .map(|&i| status_line(i).len())
            .collect();
        assert!(widths.windows(2).all(|w| w[0] == w[1]), "{widths:?}");
    }

    #[test]
    fn usage_line_is_padded() {
        assert_eq!(usage_line(Some(42.0)).len(), USAGE_WIDTH);
        assert!(usage_line(Some(42.0)).starts_with("Measured CPU usage:  42.0%"));
        assert!(usage_line(Some(100.0)).starts_with("Measured CPU usage: 100.0%"));
        assert_eq!(usage_line(None).len(), USAGE_WIDTH);
    }

    #[test]
    fn render_draws_the_status_row_in_the_severity_color() {
        let state = Arc::new(ControlState::new());
        state.set_intensity(80);
        let surface = RecordingSurface::default();
        let mut display = DisplayLoop::new(state, surface.clone(), Duration::from_millis(1));

        display.render().unwrap();

        assert_eq!(
            surface.ops(),
            vec![
                SurfaceOp::MoveTo(0, STATUS_ROW),
                SurfaceOp::Color(Palette::Hot),
                SurfaceOp::Print(status_line(80)),
                SurfaceOp::Color(Palette::Default),
                SurfaceOp::Flush,
            ]
        );
    }

    #[test]
    fn render_includes_usage_row_when_probing() {
        let state = Arc::new(ControlState::new());
        let surface = RecordingSurface::default();
        let mut display = DisplayLoop::new(state, surface.clone(), Duration::from_millis(1))
            .with_usage(UsageProbe::new());

        display.render().unwrap();

        assert!(surface.ops().contains(&SurfaceOp::MoveTo(0, USAGE_ROW)));
        assert!(surface.printed().contains("Measured CPU usage: sampling..."));
    }

    #[test]
    fn run_exits_after_stop() {
        let state = Arc::new(ControlState::new());
        let surface = RecordingSurface::default();
        let mut display = DisplayLoop::new(Arc::clone(&state), surface.clone(), Duration::from_millis(5));

        let join = thread::spawn(move || display.run());
        thread::sleep(Duration::from_millis(30));
        let stopped_at = Instant::now();
        state.stop();
        join.join().unwrap().unwrap();

        assert!(stopped_at.elapsed() < Duration::from_secs(1));
        assert!(surface.printed().contains("MODERATE LOAD"));
    }

    #[test]
    fn terminal_failure_stops_everything() {
        let state = Arc::new(ControlState::new());
        let mut display = DisplayLoop::new(Arc::clone(&state), BrokenSurface, Duration::from_millis(1));

        let err = display.run().unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
        assert!(!state.is_running());
    }
}
