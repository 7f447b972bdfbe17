//! Configuration management.

use anyhow::{bail, Context, Result};
use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use weather_board_hw::{BoardOptions, DEFAULT_DEVICE, SEA_LEVEL_HPA};

use crate::cli::Cli;
use crate::rollover::RolloverConfig;

/// Logfile name that selects the terminal dashboard.
const TTY: &str = "tty";

/// Longest accepted update period, in seconds.
pub const MAX_PERIOD_SECS: u64 = 86_400;

/// Cycle scheduling policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Timing {
    /// Sleep until the previous deadline plus the period.
    #[default]
    Aligned,
    /// Sleep the full period after every cycle.
    FixedSleep,
}

/// Main configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Seconds between samples
    #[serde(default = "default_period")]
    pub period: u64,

    /// Logfile base name, or "tty" for the terminal dashboard
    #[serde(default)]
    pub logfile: Option<String>,

    /// Publish on demand through the named pipe
    #[serde(default)]
    pub pipe: bool,

    /// Named pipe location
    #[serde(default = "default_pipe_path")]
    pub pipe_path: PathBuf,

    /// Daily rollover time (hh:mm:ss)
    #[serde(default)]
    pub rollover_time: Option<String>,

    /// Rollover period (hh:mm:ss)
    #[serde(default)]
    pub rollover_period: Option<String>,

    /// I2C bus device node
    #[serde(default = "default_device")]
    pub device: String,

    /// Reference sea-level pressure for altitude, in hPa
    #[serde(default = "default_sea_level")]
    pub sea_level_hpa: f64,

    /// Offset added to BME280 pressure, in hPa
    #[serde(default = "default_pressure_offset")]
    pub pressure_offset_hpa: f64,

    #[serde(default)]
    pub timing: Timing,

    #[serde(default)]
    pub verbose: bool,
}

// Default value functions
fn default_period() -> u64 {
    60
}

fn default_pipe_path() -> PathBuf {
    PathBuf::from("/tmp/weather_board.fifo")
}

fn default_device() -> String {
    DEFAULT_DEVICE.to_string()
}

fn default_sea_level() -> f64 {
    SEA_LEVEL_HPA
}

fn default_pressure_offset() -> f64 {
    BoardOptions::default().pressure_offset_hpa
}

impl Default for Config {
    fn default() -> Self {
        Self {
            period: default_period(),
            logfile: None,
            pipe: false,
            pipe_path: default_pipe_path(),
            rollover_time: None,
            rollover_period: None,
            device: default_device(),
            sea_level_hpa: default_sea_level(),
            pressure_offset_hpa: default_pressure_offset(),
            timing: Timing::default(),
            verbose: false,
        }
    }
}

/// Where samples go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Output {
    Terminal,
    Logfile(String),
    Stdout,
    Pipe(PathBuf),
}

/// Validated runtime settings.
#[derive(Debug, Clone)]
pub struct Settings {
    pub period: Duration,
    pub output: Output,
    pub rollover: Option<RolloverConfig>,
    pub device: String,
    pub sea_level_hpa: f64,
    pub board: BoardOptions,
    pub timing: Timing,
    pub verbose: bool,
}

impl Config {
    /// Loads configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content =
            std::fs::read_to_string(path.as_ref()).context("Failed to read configuration file")?;
        let config: Config = toml::from_str(&content).context("Failed to parse configuration")?;
        Ok(config)
    }

    /// Loads the file named by `--config` (if any) and applies the CLI overrides.
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        let mut config = match &cli.config {
            Some(path) => Self::load(path)
                .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
            None => Self::default(),
        };
        config.apply(cli);
        Ok(config)
    }

    /// Command-line values take precedence over file values.
    pub fn apply(&mut self, cli: &Cli) {
        if let Some(period) = cli.period {
            self.period = period;
        }
        if let Some(logfile) = &cli.logfile {
            self.logfile = Some(logfile.clone());
            self.pipe = false;
        }
        if cli.pipe {
            self.pipe = true;
            self.logfile = None;
        }
        if let Some(time) = &cli.rollover {
            self.rollover_time = Some(time.clone());
            self.rollover_period = None;
        }
        if let Some(period) = &cli.rperiod {
            self.rollover_period = Some(period.clone());
            self.rollover_time = None;
        }
        if let Some(timing) = cli.timing {
            self.timing = timing;
        }
        if let Some(device) = &cli.device {
            self.device = device.clone();
        }
        self.verbose |= cli.verbose;
    }

    /// Validates the merged configuration.
    pub fn resolve(&self) -> Result<Settings> {
        if self.period == 0 {
            bail!("Update period must be greater than zero");
        }
        if self.period > MAX_PERIOD_SECS {
            bail!("Update period must be at most {} seconds", MAX_PERIOD_SECS);
        }
        if !(self.sea_level_hpa.is_finite() && self.sea_level_hpa > 0.0) {
            bail!("Sea-level pressure must be a positive number of hPa");
        }

        let output = match (&self.logfile, self.pipe) {
            (Some(_), true) => bail!("A logfile and the named pipe cannot both be selected"),
            (Some(name), false) if name == TTY => Output::Terminal,
            (Some(name), false) if name.is_empty() => bail!("Logfile name is empty"),
            (Some(name), false) => Output::Logfile(name.clone()),
            (None, true) => Output::Pipe(self.pipe_path.clone()),
            (None, false) => Output::Stdout,
        };

        let rollover = match (&self.rollover_time, &self.rollover_period) {
            (Some(_), Some(_)) => bail!("Rollover time and rollover period are mutually exclusive"),
            (Some(time), None) => {
                let (h, m, s) = parse_hms(time)?;
                let at = NaiveTime::from_hms_opt(h, m, s)
                    .with_context(|| format!("Rollover time {:?} is not a time of day", time))?;
                Some(RolloverConfig::Fixed(at))
            }
            (None, Some(period)) => {
                let (h, m, s) = parse_hms(period)?;
                let secs = u64::from(h) * 3600 + u64::from(m) * 60 + u64::from(s);
                if secs == 0 {
                    bail!("Rollover period must be greater than zero");
                }
                Some(RolloverConfig::Period(Duration::from_secs(secs)))
            }
            (None, None) => None,
        };

        if rollover.is_some() && !matches!(output, Output::Logfile(_)) {
            bail!("Logfile rollover requires a logfile name");
        }

        Ok(Settings {
            period: Duration::from_secs(self.period),
            output,
            rollover,
            device: self.device.clone(),
            sea_level_hpa: self.sea_level_hpa,
            board: BoardOptions {
                pressure_offset_hpa: self.pressure_offset_hpa,
            },
            timing: self.timing,
            verbose: self.verbose,
        })
    }
}

/// Parses "hh:mm:ss" into its three fields.
pub fn parse_hms(value: &str) -> Result<(u32, u32, u32)> {
    let fields: Vec<&str> = value.trim().split(':').collect();
    if fields.len() != 3 {
        bail!("Expected hh:mm:ss, got {:?}", value);
    }
    let mut parsed = [0u32; 3];
    for (slot, field) in parsed.iter_mut().zip(&fields) {
        *slot = field
            .parse()
            .with_context(|| format!("Invalid field {:?} in {:?}", field, value))?;
    }
    let [h, m, s] = parsed;
    if m > 59 || s > 59 {
        bail!("Minutes and seconds must be below 60 in {:?}", value);
    }
    Ok((h, m, s))
}
