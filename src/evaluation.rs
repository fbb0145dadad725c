use std::fs;
use std::path::{Path, PathBuf};

use bevy::log::{info, warn};
use bvh_kinematics::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::metrics::{ErrorTerms, MetricsError, MotionError, WeightedErrors};

/// A target recording and the output motion it is compared against.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct MotionPair {
    pub target: PathBuf,
    pub output: PathBuf,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct EvaluationConfig {
    pub pairs: Vec<MotionPair>,
    pub target_settings: LoadSettings,
    pub output_settings: LoadSettings,
    /// Pin the root to the origin when composing world transforms.
    pub fix_root: bool,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            pairs: Vec::new(),
            target_settings: LoadSettings::default(),
            output_settings: LoadSettings::default(),
            fix_root: true,
        }
    }
}

impl EvaluationConfig {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, EvaluationError> {
        let contents = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }
}

#[derive(Debug, Error)]
pub enum EvaluationError {
    #[error("Could not read evaluation config: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid evaluation config: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("Failed to load {path}: {source}")]
    Bvh {
        path: PathBuf,
        #[source]
        source: BvhError,
    },
    #[error("Cannot compare {output} against {target}: {source}")]
    Metrics {
        target: PathBuf,
        output: PathBuf,
        #[source]
        source: MetricsError,
    },
    #[error("{output} has {found} joints, earlier pairs have {expected}")]
    SkeletonChanged {
        output: PathBuf,
        expected: usize,
        found: usize,
    },
    #[error("Evaluation config lists no motion pairs")]
    NoPairs,
}

#[derive(Debug, Clone)]
pub struct PairReport {
    pub pair: MotionPair,
    pub error: MotionError,
}

#[derive(Debug, Clone)]
pub struct EvaluationReport {
    pub pairs: Vec<PairReport>,
    /// Per-joint errors weighted by the length of each pair.
    pub average: MotionError,
}

impl EvaluationReport {
    pub fn log(&self) {
        for report in &self.pairs {
            info!(
                "{} vs {} ({} frames)",
                report.pair.output.display(),
                report.pair.target.display(),
                report.error.length
            );
            log_terms("root", report.error.root());
            log_terms("joints", report.error.joints_mean());
        }

        info!(
            "Average over {} pairs ({} frames)",
            self.pairs.len(),
            self.average.length
        );
        log_terms("root", self.average.root());
        log_terms("joints", self.average.joints_mean());
    }
}

fn log_terms(label: &str, terms: ErrorTerms) {
    info!(
        "  {label}: position {:.4}, rotation {:.4} deg, linear velocity {:.4}, angular velocity {:.4} deg",
        terms.position, terms.rotation, terms.linear_velocity, terms.angular_velocity
    );
}

/// Loads both motions of a pair, cuts them to a common length and compares them.
pub fn evaluate_pair(
    pair: &MotionPair,
    config: &EvaluationConfig,
) -> Result<MotionError, EvaluationError> {
    let load = |path: &Path, settings: &LoadSettings| {
        Animation::from_bvh_file(path, settings).map_err(|source| EvaluationError::Bvh {
            path: path.to_path_buf(),
            source,
        })
    };
    let mut target = load(&pair.target, &config.target_settings)?;
    let mut output = load(&pair.output, &config.output_settings)?;

    if target.length() != output.length() {
        warn!(
            "{} has {} frames and {} has {}, comparing the shorter span",
            pair.target.display(),
            target.length(),
            pair.output.display(),
            output.length()
        );
    }
    match_length([&mut target, &mut output]);

    target.compute_world_transform(config.fix_root);
    output.compute_world_transform(config.fix_root);

    MotionError::compare(&output, &target).map_err(|source| EvaluationError::Metrics {
        target: pair.target.clone(),
        output: pair.output.clone(),
        source,
    })
}

pub fn evaluate(config: &EvaluationConfig) -> Result<EvaluationReport, EvaluationError> {
    let mut weighted = WeightedErrors::default();
    let mut pairs = Vec::with_capacity(config.pairs.len());

    for pair in &config.pairs {
        let error = evaluate_pair(pair, config)?;
        if weighted.add(&error) == false {
            return Err(EvaluationError::SkeletonChanged {
                output: pair.output.clone(),
                expected: weighted.joint_count().unwrap_or_default(),
                found: error.joint_count(),
            });
        }
        pairs.push(PairReport {
            pair: pair.clone(),
            error,
        });
    }

    let average = weighted.average().ok_or(EvaluationError::NoPairs)?;
    Ok(EvaluationReport { pairs, average })
}
