// Deterministic clock and byte sources shared by the unit tests.

use crate::reader::{Clock, ResponseSource};
use std::cell::Cell;
use std::collections::{HashMap, VecDeque};
use std::io::{self, Write};
use std::time::{Duration, Instant};

/// A clock that only moves when something sleeps on it.
pub struct ManualClock {
    origin: Instant,
    now: Cell<Instant>,
}

impl ManualClock {
    pub fn new() -> Self {
        let origin = Instant::now();
        Self { origin, now: Cell::new(origin) }
    }

    pub fn advance(&self, duration: Duration) {
        self.now.set(self.now.get() + duration);
    }

    pub fn elapsed(&self) -> Duration {
        self.now.get() - self.origin
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.now.get()
    }

    fn sleep(&self, duration: Duration) {
        self.advance(duration);
    }
}

/// Releases each chunk once the clock reaches its offset from creation.
pub struct ScriptedSource<'a> {
    clock: &'a ManualClock,
    origin: Instant,
    chunks: VecDeque<(Duration, Vec<u8>)>,
    ready: Vec<u8>,
}

impl<'a> ScriptedSource<'a> {
    pub fn new(clock: &'a ManualClock, chunks: Vec<(Duration, Vec<u8>)>) -> Self {
        Self {
            clock,
            origin: clock.now(),
            chunks: chunks.into(),
            ready: Vec::new(),
        }
    }

    fn release(&mut self) {
        let elapsed = self.clock.now() - self.origin;
        while let Some((at, _)) = self.chunks.front() {
            if *at > elapsed {
                break;
            }
            if let Some((_, bytes)) = self.chunks.pop_front() {
                self.ready.extend(bytes);
            }
        }
    }
}

impl ResponseSource for ScriptedSource<'_> {
    fn bytes_waiting(&mut self) -> io::Result<usize> {
        self.release();
        Ok(self.ready.len())
    }

    fn read_waiting(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.release();
        let n = buf.len().min(self.ready.len());
        buf[..n].copy_from_slice(&self.ready[..n]);
        self.ready.drain(..n);
        Ok(n)
    }
}

/// Always has data; every read costs `per_read` on the clock.
pub struct StreamingSource<'a> {
    clock: &'a ManualClock,
    chunk: &'static [u8],
    per_read: Duration,
}

impl<'a> StreamingSource<'a> {
    pub fn new(clock: &'a ManualClock, chunk: &'static [u8], per_read: Duration) -> Self {
        Self { clock, chunk, per_read }
    }
}

impl ResponseSource for StreamingSource<'_> {
    fn bytes_waiting(&mut self) -> io::Result<usize> {
        Ok(self.chunk.len())
    }

    fn read_waiting(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = buf.len().min(self.chunk.len());
        buf[..n].copy_from_slice(&self.chunk[..n]);
        self.clock.advance(self.per_read);
        Ok(n)
    }
}

/// A fake AT device: every CR LF terminated line written to it queues the
/// scripted reply for that command, if any.
#[derive(Default)]
pub struct MockDevice {
    replies: HashMap<String, Vec<u8>>,
    line: Vec<u8>,
    pending: Vec<u8>,
    pub written: Vec<u8>,
    pub flushes: usize,
}

impl MockDevice {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(mut self, command: &str, response: &[u8]) -> Self {
        self.replies.insert(command.to_string(), response.to_vec());
        self
    }
}

impl Write for MockDevice {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.written.extend_from_slice(buf);
        for &byte in buf {
            self.line.push(byte);
            if self.line.ends_with(b"\r\n") {
                let command = String::from_utf8_lossy(&self.line[..self.line.len() - 2]).into_owned();
                if let Some(reply) = self.replies.get(&command) {
                    self.pending.extend_from_slice(reply);
                }
                self.line.clear();
            }
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.flushes += 1;
        Ok(())
    }
}

impl ResponseSource for MockDevice {
    fn bytes_waiting(&mut self) -> io::Result<usize> {
        Ok(self.pending.len())
    }

    fn read_waiting(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = buf.len().min(self.pending.len());
        buf[..n].copy_from_slice(&self.pending[..n]);
        self.pending.drain(..n);
        Ok(n)
    }
}
