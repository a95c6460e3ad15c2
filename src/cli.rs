mod display;
mod render;
mod session;
mod shell;

use chrono_tz::Tz;
use clap::{Parser, Subcommand, ValueEnum};

pub use self::{render::RenderArgs, shell::ShellArgs};
use crate::prelude::*;

#[derive(Parser)]
#[command(author, version, about, propagate_version = true)]
#[must_use]
pub struct Args {
    /// Logging level.
    #[clap(long, env = "LOG_LEVEL", default_value = "warning", global = true)]
    pub level: LogLevel,

    /// Time zone of the account, the export's local times are in it.
    #[clap(
        long = "time-zone",
        env = "ACCOUNT_TIME_ZONE",
        default_value = "America/Los_Angeles",
        global = true
    )]
    pub time_zone: Tz,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Plot the export once: write the figures and print the summary.
    Render(Box<RenderArgs>),

    /// Interactive loop re-rendering on every change of the input or display options.
    Shell(Box<ShellArgs>),
}

impl Command {
    pub async fn run(self, time_zone: Tz) -> Result {
        match self {
            Self::Render(args) => args.run(time_zone).await,
            Self::Shell(args) => args.run(time_zone).await,
        }
    }
}

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum LogLevel {
    Info,
    Warning,
}

impl From<LogLevel> for Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Info => Self::INFO,
            LogLevel::Warning => Self::WARN,
        }
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_command_is_consistent() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_parse_render() -> Result {
        let args = Args::try_parse_from([
            "pge-plots",
            "--level",
            "info",
            "render",
            "--time-zone",
            "America/New_York",
        ])?;
        assert_eq!(Level::from(args.level), Level::INFO);
        assert_eq!(args.time_zone, chrono_tz::America::New_York);
        assert!(matches!(args.command, Command::Render(_)));
        Ok(())
    }
}
