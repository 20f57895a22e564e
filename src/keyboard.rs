use std::io;

/// One code as delivered by the keyboard, before any decoding.
pub type RawKey = u8;

/// A decoded keypress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Char(RawKey),
    Up,
    Down,
    /// A multi-code sequence that matched no table entry.
    Unrecognized,
}

/// A multi-code sequence a terminal sends for a single key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeySequence {
    pub codes: &'static [RawKey],
    pub key: Key,
}

const ESC: RawKey = 0x1b;

/// CSI and SS3 (application cursor mode) arrows.
#[cfg_attr(not(unix), allow(dead_code))]
pub const POSIX_SEQUENCES: &[KeySequence] = &[
    KeySequence { codes: &[ESC, b'[', b'A'], key: Key::Up },
    KeySequence { codes: &[ESC, b'[', b'B'], key: Key::Down },
    KeySequence { codes: &[ESC, b'O', b'A'], key: Key::Up },
    KeySequence { codes: &[ESC, b'O', b'B'], key: Key::Down },
];

/// Console extended-key prefixes followed by a scan code.
#[cfg_attr(not(windows), allow(dead_code))]
pub const WINDOWS_SEQUENCES: &[KeySequence] = &[
    KeySequence { codes: &[0xe0, 72], key: Key::Up },
    KeySequence { codes: &[0xe0, 80], key: Key::Down },
    KeySequence { codes: &[0x00, 72], key: Key::Up },
    KeySequence { codes: &[0x00, 80], key: Key::Down },
];

/// Raw, unbuffered keyboard. Neither method may block.
pub trait InputSource {
    fn has_key_available(&mut self) -> io::Result<bool>;

    /// `None` when nothing is waiting.
    fn read_key(&mut self) -> io::Result<Option<RawKey>>;

    /// Extended-key sequences this source produces.
    fn key_table(&self) -> &'static [KeySequence];
}

/// Turns raw codes into keys using a sequence table.
#[derive(Debug, Clone, Copy)]
pub struct KeyDecoder {
    table: &'static [KeySequence],
}

impl KeyDecoder {
    pub fn new(table: &'static [KeySequence]) -> Self {
        Self { table }
    }

    /// Reads at most one logical key. Returns `Ok(None)` if nothing is waiting.
    pub fn next_key<I: InputSource + ?Sized>(&self, source: &mut I) -> io::Result<Option<Key>> {
        if !source.has_key_available()? {
            return Ok(None);
        }
        let Some(first) = source.read_key()? else {
            return Ok(None);
        };

        let mut pending = vec![first];
        if !self.is_prefix(&pending) {
            return Ok(Some(Key::Char(first)));
        }

        loop {
            if let Some(sequence) = self.table.iter().find(|s| s.codes == pending.as_slice()) {
                return Ok(Some(sequence.key));
            }
            match source.read_key()? {
                Some(code) => pending.push(code),
                None => return Ok(Some(Key::Unrecognized)),
            }
            if !self.is_prefix(&pending) {
                return Ok(Some(Key::Unrecognized));
            }
        }
    }

    fn is_prefix(&self, codes: &[RawKey]) -> bool {
        self.table.iter().any(|s| s.codes.starts_with(codes))
    }
}

#[cfg(unix)]
pub use posix::PosixKeyboard as PlatformKeyboard;
#[cfg(windows)]
pub use windows::ConsoleKeyboard as PlatformKeyboard;

#[cfg(unix)]
mod posix {
    use std::io;
    use std::mem;

    use libc::{c_int, c_void, termios, STDIN_FILENO};
    use log::warn;

    use super::{InputSource, KeySequence, RawKey, POSIX_SEQUENCES};

    /// Stdin with echo and line buffering off and reads made non-blocking.
    /// Signal keys keep working. The original mode is restored on drop.
    pub struct PosixKeyboard {
        original_mode: termios,
        original_flags: c_int,
    }

    impl PosixKeyboard {
        pub fn open() -> io::Result<Self> {
            unsafe {
                let mut original_mode: termios = mem::zeroed();
                if libc::tcgetattr(STDIN_FILENO, &mut original_mode) != 0 {
                    return Err(io::Error::last_os_error());
                }

                let mut mode = original_mode;
                mode.c_lflag &= !(libc::ICANON | libc::ECHO);
                if libc::tcsetattr(STDIN_FILENO, libc::TCSANOW, &mode) != 0 {
                    return Err(io::Error::last_os_error());
                }

                let original_flags = libc::fcntl(STDIN_FILENO, libc::F_GETFL, 0);
                if original_flags < 0
                    || libc::fcntl(STDIN_FILENO, libc::F_SETFL, original_flags | libc::O_NONBLOCK) < 0
                {
                    let err = io::Error::last_os_error();
                    libc::tcsetattr(STDIN_FILENO, libc::TCSANOW, &original_mode);
                    return Err(err);
                }

                Ok(Self {
                    original_mode,
                    original_flags,
                })
            }
        }
    }

    impl InputSource for PosixKeyboard {
        fn has_key_available(&mut self) -> io::Result<bool> {
            let mut waiting: c_int = 0;
            let rc = unsafe { libc::ioctl(STDIN_FILENO, libc::FIONREAD, &mut waiting as *mut c_int) };
            if rc < 0 {
                return Err(io::Error::last_os_error());
            }
            Ok(waiting > 0)
        }

        fn read_key(&mut self) -> io::Result<Option<RawKey>> {
            let mut code: RawKey = 0;
            let buf = (&mut code as *mut RawKey).cast::<c_void>();
            let read = unsafe { libc::read(STDIN_FILENO, buf, 1) };
            match read {
                1 => Ok(Some(code)),
                0 => Ok(None),
                _ => {
                    let err = io::Error::last_os_error();
                    match err.kind() {
                        io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted => Ok(None),
                        _ => Err(err),
                    }
                }
            }
        }

        fn key_table(&self) -> &'static [KeySequence] {
            POSIX_SEQUENCES
        }
    }

    impl Drop for PosixKeyboard {
        fn drop(&mut self) {
            unsafe {
                if libc::tcsetattr(STDIN_FILENO, libc::TCSANOW, &self.original_mode) != 0 {
                    warn!("failed to restore terminal mode: {}", io::Error::last_os_error());
                }
                if libc::fcntl(STDIN_FILENO, libc::F_SETFL, self.original_flags) < 0 {
                    warn!("failed to restore stdin flags: {}", io::Error::last_os_error());
                }
            }
        }
    }
}

#[cfg(windows)]
mod windows {
    use std::io;

    use libc::c_int;

    use super::{InputSource, KeySequence, RawKey, WINDOWS_SEQUENCES};

    extern "C" {
        fn _kbhit() -> c_int;
        fn _getch() -> c_int;
    }

    /// The console's own unbuffered keyboard; no mode switch needed.
    pub struct ConsoleKeyboard;

    impl ConsoleKeyboard {
        pub fn open() -> io::Result<Self> {
            Ok(Self)
        }
    }

    impl InputSource for ConsoleKeyboard {
        fn has_key_available(&mut self) -> io::Result<bool> {
            Ok(unsafe { _kbhit() } != 0)
        }

        fn read_key(&mut self) -> io::Result<Option<RawKey>> {
            if unsafe { _kbhit() } == 0 {
                return Ok(None);
            }
            Ok(Some(unsafe { _getch() } as RawKey))
        }

        fn key_table(&self) -> &'static [KeySequence] {
            WINDOWS_SEQUENCES
        }
    }
}


#[cfg(test)]
mod tests {
    use super::testing::ScriptedInput;
    use super::*;

    fn decode_all(input: &mut ScriptedInput) -> Vec<Key> {
        let decoder = KeyDecoder::new(input.key_table());
        let mut keys = Vec::new();
        while let Some(key) = decoder.next_key(input).unwrap() {
            keys.push(key);
        }
        keys
    }

    #[test]
    fn nothing_waiting_yields_none() {
        let mut input = ScriptedInput::new(&[]);
        let decoder = KeyDecoder::new(POSIX_SEQUENCES);
        assert_eq!(decoder.next_key(&mut input).unwrap(), None);
    }

    #[test]
    fn plain_codes_pass_through() {
        let mut input = ScriptedInput::new(b"q+9");
        assert_eq!(
            decode_all(&mut input),
            vec![Key::Char(b'q'), Key::Char(b'+'), Key::Char(b'9')]
        );
    }

    #[test]
    fn posix_arrows_in_both_cursor_modes() {
        let mut input = ScriptedInput::new(b"\x1b[A\x1b[B\x1bOA\x1bOB");
        assert_eq!(
            decode_all(&mut input),
            vec![Key::Up, Key::Down, Key::Up, Key::Down]
        );
    }

    #[test]
    fn windows_arrows_with_either_prefix() {
        let codes = [0xe0, 72, 0xe0, 80, 0x00, 72, 0x00, 80];
        let mut input = ScriptedInput::with_table(&codes, WINDOWS_SEQUENCES);
        assert_eq!(
            decode_all(&mut input),
            vec![Key::Up, Key::Down, Key::Up, Key::Down]
        );
    }

    #[test]
    fn one_key_per_call() {
        let mut input = ScriptedInput::new(b"\x1b[Aq");
        let decoder = KeyDecoder::new(POSIX_SEQUENCES);
        assert_eq!(decoder.next_key(&mut input).unwrap(), Some(Key::Up));
        assert_eq!(input.remaining(), 1);
    }

    #[test]
    fn unknown_sequence_is_consumed_up_to_the_mismatch() {
        // Right arrow: ESC [ C
        let mut input = ScriptedInput::new(b"\x1b[Cq");
        assert_eq!(
            decode_all(&mut input),
            vec![Key::Unrecognized, Key::Char(b'q')]
        );
    }

    #[test]
    fn lone_escape_is_unrecognized() {
        let mut input = ScriptedInput::new(&[0x1b]);
        assert_eq!(decode_all(&mut input), vec![Key::Unrecognized]);
    }

    #[test]
    fn tables_have_no_sequence_shadowing_another() {
        for table in [POSIX_SEQUENCES, WINDOWS_SEQUENCES] {
            for a in table {
                for b in table {
                    if a != b {
                        assert!(!b.codes.starts_with(a.codes), "{a:?} shadows {b:?}");
                    }
                }
            }
        }
    }
}
