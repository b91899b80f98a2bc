use anyhow::{Context, Result};
use at_probe::{report, summarize, ProbeConfig, DEFAULT_BAUD_RATE};
use clap::error::ErrorKind;
use clap::Parser;
use std::ffi::OsString;
use std::process;

#[derive(Parser)]
#[command(name = "esp_at_probe", version)]
#[command(about = "Probe ESP AT firmware for MQTT-related command support", long_about = None)]
struct Cli {
    /// Serial port the module is attached to, e.g. /dev/ttyUSB0
    port: String,

    /// Baud rate
    #[arg(default_value_t = DEFAULT_BAUD_RATE)]
    baud: u32,
}

// The main entry point for the probe application.
fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = parse_args();
    let config = ProbeConfig::new(cli.port, cli.baud);
    run(&config)
}

fn parse_from<I, T>(args: I) -> Result<Cli, clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    Cli::try_parse_from(args)
}

// Usage errors exit with status 1 rather than clap's default of 2.
fn parse_args() -> Cli {
    match parse_from(std::env::args_os()) {
        Ok(cli) => cli,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => e.exit(),
        Err(e) => {
            let _ = e.print();
            process::exit(1);
        }
    }
}

fn run(config: &ProbeConfig) -> Result<()> {
    println!(
        "Probing {} at {} bps for MQTT-related AT commands...",
        config.port, config.baud
    );

    let results = at_probe::run(config, |result| println!("{}", report::render_progress(result)))
        .with_context(|| format!("probe of {} failed", config.port))?;

    let verdicts = summarize(&results);
    print!("{}", report::render_summary(&verdicts, &config.output_path));
    Ok(())
}
