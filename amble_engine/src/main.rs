#![warn(clippy::pedantic)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]

//! ** Amble **
//! Adventure game / engine project

use amble_engine::config::EngineConfig;
use amble_engine::repl::{default_io, load_engine_from_path, run_repl};

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use env_logger::Env;
use textwrap::{fill, termwidth};

use log::info;

use std::io::Write;

fn main() -> Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .format_timestamp(None)
        .init();
    info!("Starting the Amble engine");

    let config = EngineConfig::parse();
    let world_path = config
        .world
        .clone()
        .context("no --world path given; pass the path to a world definition file")?;

    info!("Start: loading game world from {}", world_path.display());
    let mut engine = load_engine_from_path(&world_path, &config).context("while loading the world")?;
    info!("World loaded successfully.");

    print!("\x1B[2J\x1B[H");
    std::io::stdout()
        .flush()
        .expect("failed to flush stdout after clearing the screen");

    let start = engine
        .state
        .locations
        .get(&engine.state.player.current_location_id)
        .map(|loc| (loc.name.as_str(), loc.description.as_str()))
        .unwrap_or(("an unknown place", ""));
    println!(
        "{}",
        fill(
            format!("\n{}\n\n{}\n", start.0.bold().blue(), start.1).as_str(),
            termwidth(),
        )
    );

    let mut io = default_io().context("while setting up the terminal")?;
    run_repl(&mut engine, &mut io);

    Ok(())
}
