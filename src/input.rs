use std::io;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use log::{debug, info};

use crate::control::ControlState;
use crate::keyboard::{InputSource, Key, KeyDecoder};

/// Change to the control state requested by one key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Quit,
    Adjust(i32),
    Set(i32),
}

pub fn command_for(key: Key) -> Option<Command> {
    match key {
        Key::Up => Some(Command::Adjust(1)),
        Key::Down => Some(Command::Adjust(-1)),
        Key::Char(b'q' | b'Q') => Some(Command::Quit),
        Key::Char(b'+' | b'=') => Some(Command::Adjust(5)),
        Key::Char(b'-' | b'_') => Some(Command::Adjust(-5)),
        Key::Char(b'0') => Some(Command::Set(0)),
        Key::Char(b'5') => Some(Command::Set(50)),
        Key::Char(b'9') => Some(Command::Set(100)),
        Key::Char(_) | Key::Unrecognized => None,
    }
}

pub fn apply(state: &ControlState, command: Command) {
    match command {
        Command::Quit => {
            info!("quit requested");
            state.stop();
        }
        Command::Adjust(delta) => {
            let intensity = state.adjust_intensity(delta);
            debug!("intensity adjusted by {delta} to {intensity}%");
        }
        Command::Set(value) => {
            let intensity = state.set_intensity(value);
            debug!("intensity set to {intensity}%");
        }
    }
}

/// Polls the keyboard and writes the resulting commands into the control state.
pub struct InputHandler<I> {
    state: Arc<ControlState>,
    source: I,
    decoder: KeyDecoder,
    poll: Duration,
}

impl<I: InputSource> InputHandler<I> {
    pub fn new(state: Arc<ControlState>, source: I, poll: Duration) -> Self {
        let decoder = KeyDecoder::new(source.key_table());
        Self {
            state,
            source,
            decoder,
            poll,
        }
    }

    /// Handles at most one key. Returns the command it applied, if any.
    pub fn poll_once(&mut self) -> io::Result<Option<Command>> {
        let command = self
            .decoder
            .next_key(&mut self.source)?
            .and_then(command_for);
        if let Some(command) = command {
            apply(&self.state, command);
        }
        Ok(command)
    }

    /// Runs until the state stops. A keyboard error stops everything.
    pub fn run(mut self) -> io::Result<()> {
        while self.state.is_running() {
            if let Err(err) = self.poll_once() {
                self.state.stop();
                return Err(err);
            }
            thread::sleep(self.poll);
        }
        debug!("input handler exited");
        Ok(())
    }
}
