use std::env;
use std::fs;
use std::path::PathBuf;

use anyhow::Context;
use log::info;

use fbf_optim::{AdaptiveMoment, PlainGradient};
use saddle_train::{RuleSpec, SaddleTrainer, TrainConfig};

const DEFAULT_REPORT: &str = "report.json";

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let mut args = env::args().skip(1);
    let config = match args.next() {
        Some(path) => TrainConfig::from_file(path.as_ref())
            .with_context(|| format!("failed to load config from {path}"))?,
        None => TrainConfig::default(),
    };
    let report_path: PathBuf = args
        .next()
        .unwrap_or_else(|| DEFAULT_REPORT.to_string())
        .into();

    info!(
        "training a {}-dimensional game, seed {}, rule {:?}",
        config.dim, config.seed, config.rule
    );

    let report = match config.rule {
        RuleSpec::Plain => SaddleTrainer::with_rule(config, PlainGradient)?.run()?,
        RuleSpec::Adaptive {
            beta1,
            beta2,
            epsilon,
        } => {
            let rule = AdaptiveMoment::new(beta1, beta2, epsilon)?;
            SaddleTrainer::with_rule(config, rule)?.run()?
        }
    };

    fs::write(&report_path, serde_json::to_string_pretty(&report)?)
        .with_context(|| format!("failed to write {}", report_path.display()))?;
    info!("report written to {}", report_path.display());
    Ok(())
}
