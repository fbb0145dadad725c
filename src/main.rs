use std::path::PathBuf;

use bevy::app::ScheduleRunnerPlugin;
use bevy::log::LogPlugin;
use bevy::prelude::*;
use clap::Parser;
use mocap_eval::EvaluationPlugin;

/// Compares output motions against target recordings.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Cli {
    /// Json file listing the motion pairs and their load settings.
    config: PathBuf,
}

fn main() -> AppExit {
    let cli = Cli::parse();

    App::new()
        .add_plugins((
            MinimalPlugins.set(ScheduleRunnerPlugin::run_once()),
            LogPlugin::default(),
            EvaluationPlugin {
                config_path: cli.config,
            },
        ))
        .run()
}
