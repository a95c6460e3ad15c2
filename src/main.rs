#![allow(clippy::doc_markdown)]
#![doc = include_str!("../README.md")]

mod api;
mod chart;
mod cli;
mod core;
mod export;
mod prelude;
mod quantity;
mod render;
mod session;
mod tables;
mod weather;

use clap::{Parser, crate_version};

use crate::{cli::Args, prelude::*};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result {
    let _ = dotenvy::dotenv();
    let args = Args::parse();
    tracing_subscriber::fmt().without_time().compact().with_max_level(Level::from(args.level)).init();
    info!(version = crate_version!(), time_zone = %args.time_zone, "starting…");

    args.command.run(args.time_zone).await?;

    info!("done!");
    Ok(())
}
