use std::path::{Path, PathBuf};

use chrono_tz::Tz;
use clap::Parser;

use crate::{
    cli::{display::DisplayArgs, session::SessionArgs},
    prelude::*,
    quantity::temperature::TemperatureUnit,
    render::write_figures,
    session::Dashboard,
    tables::{build_billing_table, build_daily_table, build_summary_table},
};

#[derive(Parser)]
pub struct RenderArgs {
    /// Usage export downloaded from the utility, the bundled demo export by default.
    #[clap(long, env = "EXPORT_PATH", default_value = "data/pge_electric_usage_demo.csv")]
    export: PathBuf,

    /// Directory to write the SVG and JSON figures into.
    #[clap(long = "output-dir", env = "OUTPUT_DIR", default_value = "plots")]
    output_dir: PathBuf,

    #[clap(flatten)]
    session: SessionArgs,

    #[clap(flatten)]
    display: DisplayArgs,
}

impl RenderArgs {
    #[instrument(skip_all, fields(export = %self.export.display()))]
    pub async fn run(self, time_zone: Tz) -> Result {
        let content = std::fs::read(&self.export)
            .with_context(|| format!("failed to read `{}`", self.export.display()))?;
        let options = self.display.options();
        let dashboard = self
            .session
            .new_session(time_zone)?
            .render(&content, self.session.postal_code.as_ref(), &options)
            .await?;
        present(&dashboard, &self.output_dir, options.temperature_unit)
    }
}

/// Write the figures and print the tables.
pub fn present(dashboard: &Dashboard, output_dir: &Path, temperature_unit: TemperatureUnit) -> Result {
    let paths = write_figures(&dashboard.figures, output_dir)?;
    println!(
        "{}",
        build_summary_table(
            &dashboard.account,
            dashboard.postal_code.as_str(),
            &dashboard.series,
            &dashboard.notices,
        ),
    );
    println!("{}", build_daily_table(&dashboard.daily_totals, temperature_unit));
    if !dashboard.billing.is_empty() {
        println!("{}", build_billing_table(&dashboard.billing));
    }
    for path in paths {
        println!("{}", path.display());
    }
    Ok(())
}
