//! Command-line interface.

use clap::Parser;
use std::path::PathBuf;

use crate::config::{Timing, MAX_PERIOD_SECS};

/// Weather board acquisition daemon.
#[derive(Parser, Debug, Default)]
#[command(name = "weather-board")]
#[command(about = "Read the weather board and log, display or publish its readings")]
#[command(version)]
#[command(after_help = "Signals:
  SIGUSR1  force a logfile rollover
  SIGUSR2  write the latest sample to the named pipe
  SIGTSTP  pause data collection (logfile mode)
  SIGCONT  resume data collection (logfile mode)")]
pub struct Cli {
    /// Verbose diagnostics on stderr
    #[arg(short, long)]
    pub verbose: bool,

    /// Configuration file (TOML)
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Seconds between samples (at most one day)
    #[arg(short, long, value_parser = clap::value_parser!(u64).range(1..=MAX_PERIOD_SECS))]
    pub period: Option<u64>,

    /// Logfile base name, or "tty" for the terminal dashboard
    #[arg(short, long, value_name = "NAME", conflicts_with = "pipe")]
    pub logfile: Option<String>,

    /// Publish samples on demand through the named pipe
    #[arg(long)]
    pub pipe: bool,

    /// Roll the logfile over daily at this time of day
    #[arg(short = 'r', long, value_name = "HH:MM:SS", conflicts_with = "rperiod")]
    pub rollover: Option<String>,

    /// Roll the logfile over after this much time
    #[arg(short = 'R', long, value_name = "HH:MM:SS")]
    pub rperiod: Option<String>,

    /// Cycle scheduling policy
    #[arg(long, value_enum)]
    pub timing: Option<Timing>,

    /// I2C bus device node
    pub device: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_flags() {
        let cli = Cli::try_parse_from([
            "weather-board",
            "-v",
            "-p",
            "30",
            "-l",
            "weather.log",
            "-R",
            "01:00:00",
            "/dev/i2c-0",
        ])
        .unwrap();
        assert!(cli.verbose);
        assert_eq!(cli.period, Some(30));
        assert_eq!(cli.logfile.as_deref(), Some("weather.log"));
        assert_eq!(cli.rperiod.as_deref(), Some("01:00:00"));
        assert_eq!(cli.device.as_deref(), Some("/dev/i2c-0"));
    }

    #[test]
    fn test_rollover_flags_conflict() {
        let result = Cli::try_parse_from([
            "weather-board",
            "-l",
            "weather.log",
            "-r",
            "00:00:00",
            "-R",
            "01:00:00",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_logfile_and_pipe_conflict() {
        assert!(Cli::try_parse_from(["weather-board", "-l", "weather.log", "--pipe"]).is_err());
    }

    #[test]
    fn test_zero_period_rejected() {
        assert!(Cli::try_parse_from(["weather-board", "-p", "0"]).is_err());
    }

    #[test]
    fn test_period_longer_than_a_day_rejected() {
        assert!(Cli::try_parse_from(["weather-board", "-p", "86401"]).is_err());
        assert!(Cli::try_parse_from(["weather-board", "-p", "18446744073709551615"]).is_err());
        let cli = Cli::try_parse_from(["weather-board", "-p", "86400"]).unwrap();
        assert_eq!(cli.period, Some(86_400));
    }
}
