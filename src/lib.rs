//! # ESP AT Probe Library
//!
//! This library sends a fixed list of AT commands to an ESP module on a serial
//! port, collects whatever the firmware answers, and classifies the answers to
//! guess which MQTT-related commands the firmware supports.

pub mod reader;
pub mod report;
#[cfg(feature = "serial")]
pub mod serial;
pub mod summary;
#[cfg(test)]
mod testing;

use chrono::Utc;
use log::{debug, info};
use reader::{read_response, Clock, ReadPolicy, ResponseSource};
use std::io::{self, Write};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

pub use reader::SystemClock;
pub use summary::{summarize, Verdict, VerdictReason};

/// Commands sent on every run, in order.
pub const COMMANDS: [&str; 18] = [
    "AT",
    "AT+GMR",
    "AT+HELP",
    "AT+SYSMSG",
    // MQTT commands of esp-at builds
    "AT+MQTTUSERCFG",
    "AT+MQTTUSERCFG?",
    "AT+MQTTCONN",
    "AT+MQTTCONN?",
    "AT+MQTTPUB",
    "AT+MQTTPUB?",
    "AT+MQTTSUB",
    "AT+MQTTSUB?",
    "AT+MQTTUNSUB",
    "AT+MQTTDISCONN",
    "AT+MQTTSTATE",
    "AT+MQTT?",
    // plain TCP fallback
    "AT+CIPSTART",
    "AT+CIPSEND",
];

pub const DEFAULT_BAUD_RATE: u32 = 57600;
pub const DEFAULT_OUTPUT_PATH: &str = "tools/esp_at_probe_results.txt";
pub const LINE_TERMINATOR: &str = "\r\n";

// Errors that end a probe run.
#[derive(Debug, Error)]
pub enum ProbeError {
    /// The serial port could not be opened.
    #[error("failed to open serial port '{port}'")]
    Open {
        port: String,
        #[source]
        source: io::Error,
    },
    /// The crate was built without the `serial` feature.
    #[error("serial support not enabled. Rebuild with --features serial")]
    SerialSupportDisabled,
    /// Writing a command or polling for a response failed.
    #[error("serial I/O error")]
    Io(#[from] io::Error),
    /// The results log could not be written.
    #[error("failed to write log file '{}'", path.display())]
    WriteLog {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

// Settings for a single run. Only `port` and `baud` come from the command line.
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeConfig {
    pub port: String,
    pub baud: u32,
    /// Read timeout configured on the port itself.
    pub port_timeout: Duration,
    /// Pause between opening the port and clearing its buffers.
    pub open_delay: Duration,
    /// Pause between writing a command and starting to read.
    pub settle_delay: Duration,
    pub read_policy: ReadPolicy,
    pub output_path: PathBuf,
}

impl ProbeConfig {
    /// Creates a configuration for `port` with every other setting at its default.
    pub fn new(port: impl Into<String>, baud: u32) -> Self {
        Self {
            port: port.into(),
            baud,
            port_timeout: Duration::from_millis(100),
            open_delay: Duration::from_millis(100),
            settle_delay: Duration::from_millis(50),
            read_policy: ReadPolicy::default(),
            output_path: PathBuf::from(DEFAULT_OUTPUT_PATH),
        }
    }
}

// One command and the lines the device sent back for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeResult {
    command: String,
    lines: Vec<String>,
}

impl ProbeResult {
    pub fn new(command: impl Into<String>, lines: Vec<String>) -> Self {
        Self {
            command: command.into(),
            lines,
        }
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// True when the device sent nothing back.
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

/// Drives the write/read cycle for each command over an open connection.
pub struct Prober<P, C = SystemClock> {
    port: P,
    clock: C,
    settle_delay: Duration,
    read_policy: ReadPolicy,
}

impl<P, C> Prober<P, C>
where
    P: ResponseSource + Write,
    C: Clock,
{
    pub fn new(port: P, clock: C, config: &ProbeConfig) -> Self {
        Self {
            port,
            clock,
            settle_delay: config.settle_delay,
            read_policy: config.read_policy,
        }
    }

    /// Sends one command and collects its response. Each command is sent exactly
    /// once; a silent device yields an empty result.
    pub fn send_command(&mut self, command: &str) -> Result<ProbeResult, ProbeError> {
        let line = format!("{}{}", command, LINE_TERMINATOR);
        debug!("sending '{}'", line.escape_default());

        self.port.write_all(line.as_bytes())?;
        self.port.flush()?;
        self.clock.sleep(self.settle_delay);

        let lines = read_response(&mut self.port, &self.clock, &self.read_policy)?;
        debug!("'{}' answered with {} line(s)", command, lines.len());
        Ok(ProbeResult::new(command, lines))
    }

    /// Sends every command in order, calling `on_result` as each one completes.
    pub fn run<'a, I, F>(&mut self, commands: I, mut on_result: F) -> Result<Vec<ProbeResult>, ProbeError>
    where
        I: IntoIterator<Item = &'a str>,
        F: FnMut(&ProbeResult),
    {
        let mut results = Vec::new();
        for command in commands {
            let result = self.send_command(command)?;
            on_result(&result);
            results.push(result);
        }
        Ok(results)
    }

    /// Gives the connection back, e.g. to inspect a test double.
    pub fn into_inner(self) -> P {
        self.port
    }
}

/// Opens the configured serial port and sends [`COMMANDS`] through it.
///
/// The port is closed when this returns, on success or failure.
#[cfg(feature = "serial")]
pub fn probe<F>(config: &ProbeConfig, on_result: F) -> Result<Vec<ProbeResult>, ProbeError>
where
    F: FnMut(&ProbeResult),
{
    let port = serial::open(config)?;
    let mut prober = Prober::new(port, SystemClock, config);
    prober.run(COMMANDS, on_result)
}

#[cfg(not(feature = "serial"))]
pub fn probe<F>(_config: &ProbeConfig, _on_result: F) -> Result<Vec<ProbeResult>, ProbeError>
where
    F: FnMut(&ProbeResult),
{
    Err(ProbeError::SerialSupportDisabled)
}

/// Runs a full probe and writes the results log.
///
/// The log is only written once every command has been answered or timed out,
/// so a failed run never leaves a partial file behind.
pub fn run<F>(config: &ProbeConfig, on_result: F) -> Result<Vec<ProbeResult>, ProbeError>
where
    F: FnMut(&ProbeResult),
{
    let results = probe(config, on_result)?;

    let log = report::render_log(&config.port, config.baud, Utc::now(), &results);
    report::write_log(&config.output_path, &log)?;
    info!("wrote {} result(s) to {}", results.len(), config.output_path.display());

    Ok(results)
}
