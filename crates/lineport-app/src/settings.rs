use anyhow::{Context, Result};
use lineport_core::ChannelConfig;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Demo defaults, read from `settings.json` and overridden by the command line.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub device: String,
    pub baud_rate: u32,
    /// Escaped, e.g. `"\\r"`.
    pub terminator: String,
    pub wait_ms: u64,
    pub polls: usize,
    pub poll_interval_ms: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            device: "/dev/ttyUSB0".to_string(),
            baud_rate: 9600,
            terminator: "\\r".to_string(),
            wait_ms: 2000,
            polls: 4,
            poll_interval_ms: 50,
        }
    }
}

impl Settings {
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("lineport").join("settings.json"))
    }

    /// Load from `path`, or from the default location. A missing file means defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => match Self::default_path() {
                Some(p) => p,
                None => return Ok(Self::default()),
            },
        };
        if !path.exists() {
            log::debug!("no settings at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(&path)
            .with_context(|| format!("reading {}", path.display()))?;
        serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))
    }

    pub fn channel_config(&self) -> ChannelConfig {
        ChannelConfig::new(&self.device, self.baud_rate)
            .poll_interval(Duration::from_millis(self.poll_interval_ms))
    }

    pub fn terminator_bytes(&self) -> Vec<u8> {
        unescape(&self.terminator)
    }
}

/// Decode `\r`, `\n`, `\t`, `\0`, `\\` and `\xHH`. Anything else is kept as written.
pub fn unescape(s: &str) -> Vec<u8> {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] != b'\\' || i + 1 == bytes.len() {
            out.push(bytes[i]);
            i += 1;
            continue;
        }
        let decoded = match bytes[i + 1] {
            b'r' => Some((b'\r', 2)),
            b'n' => Some((b'\n', 2)),
            b't' => Some((b'\t', 2)),
            b'0' => Some((0, 2)),
            b'\\' => Some((b'\\', 2)),
            b'x' => s
                .get(i + 2..i + 4)
                .filter(|hex| hex.bytes().all(|b| b.is_ascii_hexdigit()))
                .and_then(|hex| u8::from_str_radix(hex, 16).ok())
                .map(|b| (b, 4)),
            _ => None,
        };
        match decoded {
            Some((b, len)) => {
                out.push(b);
                i += len;
            }
            None => {
                out.push(b'\\');
                i += 1;
            }
        }
    }
    out
}
