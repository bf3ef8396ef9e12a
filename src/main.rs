use std::env;

use dotenv::dotenv;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use greenwave::config::{ControlConfig, LearnConfig, SimConfig};
use greenwave::control::FixedTimeRunner;
use greenwave::infra::{CompositeObserver, DefaultObserver, EpisodeObserver, MetricsObserver};
use greenwave::learning::{GreedyRunner, Trainer};
use greenwave::SimConnection;

fn init_logging() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("greenwave=debug,info"));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");
}

fn observer(label: &str) -> Box<dyn EpisodeObserver> {
    let metrics_dir = env::var("GW_METRICS_DIR").unwrap_or_else(|_| "results".to_string());
    match MetricsObserver::create(&metrics_dir, label) {
        Ok(metrics) => Box::new(CompositeObserver::new(vec![
            Box::new(DefaultObserver),
            Box::new(metrics),
        ])),
        Err(err) => {
            tracing::warn!("Metrics file unavailable ({}), logging only", err);
            Box::new(DefaultObserver)
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();
    init_logging();

    let mode = env::args().nth(1).unwrap_or_else(|| "train".to_string());

    let sim = SimConfig::from_env();
    let control = ControlConfig::from_env();
    let learn = LearnConfig::from_env();

    let mut connection = SimConnection::connect(&sim.host).await?;

    match mode.as_str() {
        "train" => {
            let mut trainer = Trainer::new(control, learn.clone(), observer("train"));
            let table = trainer
                .train(&mut connection, &sim.scenario, sim.step_length)
                .await?;
            tracing::info!("Training done, {} table entries", table.len());
        }
        "run" => {
            let table =
                GreedyRunner::load_table(std::path::Path::new(&learn.table_path), control.profile)?;
            let mut runner =
                GreedyRunner::new(control, learn.max_steps, table, observer("qlearning"));
            let mut session = connection.open(&sim.scenario, sim.step_length).await?;
            runner.run(&mut session).await?;
            session.close().await?;
        }
        "fixed" => {
            let mut runner = FixedTimeRunner::new(control, learn.max_steps, observer("fixed"));
            let mut session = connection.open(&sim.scenario, sim.step_length).await?;
            runner.run(&mut session).await?;
            session.close().await?;
        }
        other => {
            return Err(format!("unknown mode '{}', expected train, run or fixed", other).into());
        }
    }

    Ok(())
}
