use std::io;
use std::sync::Arc;
use std::thread;

use anyhow::{anyhow, Context, Result};
use log::{error, info, warn};

use crate::config::Timings;
use crate::control::ControlState;
use crate::cpu_stress;
use crate::display::DisplayLoop;
use crate::input::InputHandler;
use crate::keyboard::InputSource;
use crate::terminal::{Palette, TerminalSurface};
use crate::usage::UsageProbe;

const BANNER: [&str; 4] = [
    "+-----------------------------------------------+",
    "|   Central Processing Unit Crock Pot Utility   |",
    "|                    (CPU^2)                    |",
    "+-----------------------------------------------+",
];

const CONTROLS: [&str; 4] = [
    "Controls:",
    "  UP/DOWN arrows or +/- keys: Adjust calculation intensity",
    "  0: Minimum intensity (0%), 5: Half intensity (50%), 9: Maximum intensity (100%)",
    "  Q: Quit program",
];

const CORES_ROW: u16 = 5;
const CONTROLS_ROW: u16 = 7;
const FAREWELL_ROW: u16 = 15;

pub const FAREWELL: &str = "CPU load reduced.";

/// Owns every task: one load worker per core, the input handler and the
/// display loop. `run` returns only after all of them have exited.
pub struct Heater<S, I> {
    state: Arc<ControlState>,
    surface: S,
    input: I,
    cores: usize,
    timings: Timings,
    show_usage: bool,
}

impl<S, I> Heater<S, I>
where
    S: TerminalSurface + Send + 'static,
    I: InputSource + Send + 'static,
{
    pub fn new(surface: S, input: I, cores: usize, timings: Timings) -> Self {
        Self {
            state: Arc::new(ControlState::new()),
            surface,
            input,
            cores: cores.max(1),
            timings,
            show_usage: false,
        }
    }

    pub fn with_usage(mut self, show_usage: bool) -> Self {
        self.show_usage = show_usage;
        self
    }

    pub fn state(&self) -> Arc<ControlState> {
        Arc::clone(&self.state)
    }

    pub fn run(self) -> Result<()> {
        let Heater {
            state,
            mut surface,
            input,
            cores,
            timings,
            show_usage,
        } = self;

        if let Err(err) = draw_banner(&mut surface, cores) {
            restore_terminal(&mut surface);
            return Err(err).context("failed to draw the dashboard");
        }

        let workers = match cpu_stress::spawn_workers(cores, &state, timings.cycle) {
            Ok(workers) => workers,
            Err(err) => {
                restore_terminal(&mut surface);
                return Err(err).context("failed to spawn load workers");
            }
        };
        info!("started {} load workers", workers.len());

        let input_state = Arc::clone(&state);
        let input_thread = thread::Builder::new()
            .name("input".into())
            .spawn(move || InputHandler::new(input_state, input, timings.poll).run());

        let mut display = DisplayLoop::new(Arc::clone(&state), surface, timings.refresh);
        if show_usage {
            display = display.with_usage(UsageProbe::new());
        }
        let display_thread = thread::Builder::new()
            .name("display".into())
            .spawn(move || {
                let result = display.run();
                (display.into_surface(), result)
            });

        let mut failures = Vec::new();

        match input_thread {
            Ok(handle) => match handle.join() {
                Ok(Ok(())) => {}
                Ok(Err(err)) => {
                    failures.push(anyhow::Error::new(err).context("keyboard input failed"))
                }
                Err(_) => failures.push(anyhow!("input handler panicked")),
            },
            Err(err) => {
                failures.push(anyhow::Error::new(err).context("failed to spawn the input handler"))
            }
        }

        info!("shutting down");
        state.stop();

        let surface = match display_thread {
            Ok(handle) => match handle.join() {
                Ok((surface, result)) => {
                    if let Err(err) = result {
                        failures.push(anyhow::Error::new(err).context("terminal output failed"));
                    }
                    Some(surface)
                }
                Err(_) => {
                    failures.push(anyhow!("display loop panicked"));
                    None
                }
            },
            Err(err) => {
                failures.push(anyhow::Error::new(err).context("failed to spawn the display loop"));
                None
            }
        };

        for (id, worker) in workers.into_iter().enumerate() {
            if worker.join().is_err() {
                failures.push(anyhow!("load worker {id} panicked"));
            }
        }
        info!("all tasks stopped");

        if let Some(mut surface) = surface {
            if let Err(err) = say_goodbye(&mut surface) {
                warn!("failed to restore the terminal: {err}");
            }
        }

        let mut failures = failures.into_iter();
        match failures.next() {
            Some(first) => {
                for other in failures {
                    error!("{other:#}");
                }
                Err(first)
            }
            None => Ok(()),
        }
    }
}

fn draw_banner<S: TerminalSurface>(surface: &mut S, cores: usize) -> io::Result<()> {
    surface.clear_screen()?;
    surface.hide_cursor()?;

    surface.set_text_color(Palette::Title)?;
    for (row, line) in (0u16..).zip(BANNER) {
        surface.set_cursor_position(0, row)?;
        surface.print(line)?;
    }

    surface.set_text_color(Palette::Default)?;
    surface.set_cursor_position(0, CORES_ROW)?;
    surface.print(&format!(
        "Detected {cores} CPU cores - all will be used for calculations!"
    ))?;
    for (row, line) in (CONTROLS_ROW..).zip(CONTROLS) {
        surface.set_cursor_position(0, row)?;
        surface.print(line)?;
    }
    surface.flush()
}

fn say_goodbye<S: TerminalSurface>(surface: &mut S) -> io::Result<()> {
    surface.set_cursor_position(0, FAREWELL_ROW)?;
    surface.set_text_color(Palette::Default)?;
    surface.show_cursor()?;
    surface.print(FAREWELL)?;
    surface.print("\n")?;
    surface.flush()
}

fn restore_terminal<S: TerminalSurface>(surface: &mut S) {
    let restored = surface
        .set_text_color(Palette::Default)
        .and_then(|()| surface.show_cursor());
    if let Err(err) = restored {
        warn!("failed to restore the terminal: {err}");
    }
}
