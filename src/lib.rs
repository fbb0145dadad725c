use std::path::PathBuf;

use bevy::prelude::*;

pub mod evaluation;
pub mod metrics;

use evaluation::{evaluate, EvaluationConfig};

/// Compares the motion pairs listed in a json config and logs their errors on startup.
pub struct EvaluationPlugin {
    pub config_path: PathBuf,
}

impl Plugin for EvaluationPlugin {
    fn build(&self, app: &mut App) {
        app.insert_resource(EvaluationConfigPath(self.config_path.clone()))
            .add_systems(Startup, run_evaluation);
    }
}

#[derive(Resource, Debug, Clone)]
pub struct EvaluationConfigPath(pub PathBuf);

fn run_evaluation(config_path: Res<EvaluationConfigPath>, mut exit: EventWriter<AppExit>) {
    let result = EvaluationConfig::from_file(&config_path.0)
        .and_then(|config| evaluate(&config))
        .map(|report| report.log());

    if let Err(err) = result {
        error!("Evaluation failed: {err}");
        exit.send(AppExit::error());
    }
}
