use std::{
    io::{BufRead, Write},
    num::NonZeroUsize,
    path::{Path, PathBuf},
};

use chrono_tz::Tz;
use clap::{Parser, Subcommand};

use crate::{
    chart::DisplayOptions,
    cli::{display::DisplayArgs, render::present, session::SessionArgs},
    core::{granularity::Granularity, metric::Metric},
    export::PostalCode,
    prelude::*,
    quantity::temperature::TemperatureUnit,
    session::Session,
};

#[derive(Parser)]
pub struct ShellArgs {
    /// Initially loaded export, the bundled demo export by default.
    #[clap(long, env = "EXPORT_PATH", default_value = "data/pge_electric_usage_demo.csv")]
    export: PathBuf,

    /// Directory to write the SVG and JSON figures into on every render.
    #[clap(long = "output-dir", env = "OUTPUT_DIR", default_value = "plots")]
    output_dir: PathBuf,

    #[clap(flatten)]
    session: SessionArgs,

    #[clap(flatten)]
    display: DisplayArgs,
}

impl ShellArgs {
    pub async fn run(self, time_zone: Tz) -> Result {
        let mut session = self.session.new_session(time_zone)?;
        let mut state = State {
            export: self.export,
            postal_code: self.session.postal_code.clone(),
            options: self.display.options(),
        };
        state.render(&mut session, &self.output_dir).await;

        let mut stdin = std::io::stdin().lock();
        let mut line = String::new();
        loop {
            print!("> ");
            std::io::stdout().flush()?;
            line.clear();
            if stdin.read_line(&mut line).context("failed to read the command")? == 0 {
                break;
            }
            let words: Vec<_> = line.split_whitespace().collect();
            if words.is_empty() {
                continue;
            }
            let command = match Line::try_parse_from(words) {
                Ok(line) => line.command,
                Err(error) => {
                    let _ = error.print();
                    continue;
                }
            };
            match command {
                ShellCommand::Quit => break,
                command => {
                    state.apply(command);
                    state.render(&mut session, &self.output_dir).await;
                }
            }
        }

        info!("bye!");
        Ok(())
    }
}

#[derive(Parser)]
#[command(no_binary_name = true, disable_version_flag = true)]
struct Line {
    #[command(subcommand)]
    command: ShellCommand,
}

#[derive(Subcommand)]
enum ShellCommand {
    /// Load another export.
    Load { path: PathBuf },

    /// Look up the weather for this postal code, or for the service address when omitted.
    PostalCode { postal_code: Option<PostalCode> },

    /// Change the alignment granularity, or reset to the native one when omitted.
    Granularity { granularity: Option<Granularity> },

    /// Select the plotted metrics.
    Metrics {
        #[clap(value_delimiter = ',', required = true)]
        metrics: Vec<Metric>,
    },

    /// Set the rolling-average window in buckets, or drop it when omitted.
    Rolling { window: Option<NonZeroUsize> },

    /// Switch the temperature unit.
    Unit { unit: TemperatureUnit },

    /// Render again with the current settings.
    Render,

    Quit,
}

/// What the user has selected so far.
struct State {
    export: PathBuf,
    postal_code: Option<PostalCode>,
    options: DisplayOptions,
}

impl State {
    fn apply(&mut self, command: ShellCommand) {
        match command {
            ShellCommand::Load { path } => self.export = path,
            ShellCommand::PostalCode { postal_code } => self.postal_code = postal_code,
            ShellCommand::Granularity { granularity } => self.options.granularity = granularity,
            ShellCommand::Metrics { metrics } => {
                self.options.metrics = metrics.into_iter().collect();
            }
            ShellCommand::Rolling { window } => self.options.rolling_window = window,
            ShellCommand::Unit { unit } => self.options.temperature_unit = unit,
            ShellCommand::Render | ShellCommand::Quit => {}
        }
    }

    /// Errors are reported, the shell keeps going.
    async fn render(&self, session: &mut Session, output_dir: &Path) {
        if let Err(error) = self.try_render(session, output_dir).await {
            eprintln!("error: {error:#}");
        }
    }

    #[instrument(skip_all, fields(export = %self.export.display()))]
    async fn try_render(&self, session: &mut Session, output_dir: &Path) -> Result {
        let content = std::fs::read(&self.export)
            .with_context(|| format!("failed to read `{}`", self.export.display()))?;
        let dashboard =
            session.render(&content, self.postal_code.as_ref(), &self.options).await?;
        present(&dashboard, output_dir, self.options.temperature_unit)
    }
}
