mod settings;

use anyhow::{Context, Result};
use clap::Parser;
use lineport_core::AsyncLineChannel;
use settings::{unescape, Settings};
use std::path::PathBuf;
use std::time::Duration;

/// Open a serial port, wait for the device to talk, then poll for terminated lines.
#[derive(Debug, Parser)]
#[command(name = "lineport", version)]
struct Cli {
    /// Serial device, e.g. /dev/ttyUSB0 or COM3
    #[arg(short, long)]
    device: Option<String>,

    #[arg(short, long)]
    baud: Option<u32>,

    /// Line terminator; \r, \n, \t, \\ and \xHH are decoded
    #[arg(short, long)]
    terminator: Option<String>,

    /// How long to leave the device alone before polling
    #[arg(short, long)]
    wait_ms: Option<u64>,

    /// Number of read attempts
    #[arg(short, long)]
    polls: Option<usize>,

    /// Text to send right after opening (escapes as for --terminator)
    #[arg(short, long)]
    send: Option<String>,

    /// Settings file (defaults to <config dir>/lineport/settings.json)
    #[arg(long)]
    settings: Option<PathBuf>,
}

impl Cli {
    fn apply(&self, mut settings: Settings) -> Settings {
        if let Some(device) = &self.device {
            settings.device = device.clone();
        }
        if let Some(baud) = self.baud {
            settings.baud_rate = baud;
        }
        if let Some(terminator) = &self.terminator {
            settings.terminator = terminator.clone();
        }
        if let Some(wait_ms) = self.wait_ms {
            settings.wait_ms = wait_ms;
        }
        if let Some(polls) = self.polls {
            settings.polls = polls;
        }
        settings
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let settings = cli.apply(Settings::load(cli.settings.as_deref())?);
    log::debug!("{settings:?}");

    println!("Start");

    let channel = AsyncLineChannel::open(&settings.channel_config())
        .with_context(|| format!("opening {}", settings.device))?;

    if let Some(text) = &cli.send {
        channel.write_bytes(unescape(text))?;
    }

    // the reader keeps filling the buffer while we sleep
    std::thread::sleep(Duration::from_millis(settings.wait_ms));

    let terminator = settings.terminator_bytes();
    for _ in 0..settings.polls {
        let line = channel.read_line_if_available(&terminator)?.unwrap_or_default();
        println!("{}", String::from_utf8_lossy(&line));
    }

    channel.close()?;
    println!("End");
    Ok(())
}
