//! Timed collection of AT command responses.
//!
//! A response has no reliable terminator across firmware builds, so it is read
//! under two deadlines: an overall limit measured from the start of the read, and
//! an idle limit measured from the last byte received. Whichever fires first ends
//! the response.

use log::trace;
use std::io;
use std::time::{Duration, Instant};

/// A byte stream that can report how many bytes are buffered without blocking.
pub trait ResponseSource {
    /// Number of bytes that can be read right now.
    fn bytes_waiting(&mut self) -> io::Result<usize>;

    /// Reads buffered bytes into `buf`, returning how many were copied.
    fn read_waiting(&mut self, buf: &mut [u8]) -> io::Result<usize>;
}

/// Source of time for the read loop.
pub trait Clock {
    fn now(&self) -> Instant;
    fn sleep(&self, duration: Duration);
}

/// Wall clock backed by `std::thread::sleep`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now(&self) -> Instant {
        (**self).now()
    }

    fn sleep(&self, duration: Duration) {
        (**self).sleep(duration);
    }
}

// Timing limits applied to a single response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadPolicy {
    /// Hard limit on the whole read.
    pub overall_timeout: Duration,
    /// Gap after the last received byte that ends the read early.
    pub idle_timeout: Duration,
    /// Sleep between polls while nothing is buffered.
    pub poll_interval: Duration,
}

impl Default for ReadPolicy {
    fn default() -> Self {
        Self {
            overall_timeout: Duration::from_millis(2000),
            idle_timeout: Duration::from_millis(200),
            poll_interval: Duration::from_millis(10),
        }
    }
}

/// Collects response lines from `source` until the idle or overall deadline fires.
///
/// A source that never sends anything yields an empty vector after the idle
/// timeout. Bytes that are not valid UTF-8 are replaced with U+FFFD.
pub fn read_response<S, C>(source: &mut S, clock: &C, policy: &ReadPolicy) -> io::Result<Vec<String>>
where
    S: ResponseSource + ?Sized,
    C: Clock + ?Sized,
{
    let start = clock.now();
    let deadline = start + policy.overall_timeout;
    let mut last_data = start;
    let mut lines = Vec::new();
    let mut buf = Vec::new();

    while clock.now() < deadline {
        let waiting = source.bytes_waiting()?;
        if waiting > 0 {
            buf.resize(waiting, 0);
            let n = source.read_waiting(&mut buf)?;
            if n == 0 {
                clock.sleep(policy.poll_interval);
                continue;
            }
            let text = String::from_utf8_lossy(&buf[..n]);
            trace!("received {} byte(s): '{}'", n, text.escape_default());
            lines.extend(split_lines(&text));
            last_data = clock.now();
        } else if clock.now().duration_since(last_data) >= policy.idle_timeout {
            break;
        } else {
            clock.sleep(policy.poll_interval);
        }
    }

    Ok(lines)
}

// Characters that end a line on their own.
const LINE_BOUNDARIES: [char; 10] = [
    '\n', '\r', '\x0b', '\x0c', '\x1c', '\x1d', '\x1e', '\u{85}', '\u{2028}', '\u{2029}',
];

/// Splits `text` on `\r\n` or any single line boundary character (LF, CR, VT,
/// FF, the file/group/record separators, NEL, LINE and PARAGRAPH SEPARATOR).
///
/// A trailing terminator does not produce a trailing empty line, but empty lines
/// between terminators are kept.
pub fn split_lines(text: &str) -> Vec<String> {
    let mut lines = Vec::new();
    let mut rest = text;

    while !rest.is_empty() {
        match rest.char_indices().find(|(_, c)| LINE_BOUNDARIES.contains(c)) {
            Some((pos, boundary)) => {
                lines.push(rest[..pos].to_string());
                let skip = if rest[pos..].starts_with("\r\n") { 2 } else { boundary.len_utf8() };
                rest = &rest[pos + skip..];
            }
            None => {
                lines.push(rest.to_string());
                break;
            }
        }
    }

    lines
}
