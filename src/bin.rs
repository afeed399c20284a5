use gradnet::{data, ComputationGraph, Error, TrainConfig, Trainer};
use rand::{rngs::StdRng, SeedableRng};
use tracing::info;
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = TrainConfig::default();
    if let Err(err) = run(&config) {
        println!("Error: {err}");
    }
}

fn run(config: &TrainConfig) -> Result<(), Error> {
    config.validate()?;

    let mut cg = ComputationGraph::<f64>::new();
    let xs = match data::load_features(&config.features_path, &mut cg) {
        Ok(xs) => xs,
        Err(err) => {
            println!("Error loading features data: {err}");
            return Ok(());
        }
    };
    let ys = match data::load_targets(&config.targets_path, &mut cg) {
        Ok(ys) => ys,
        Err(err) => {
            println!("Error loading targets data: {err}");
            return Ok(());
        }
    };
    info!(
        rows = xs.len(),
        features = xs.first().map_or(0, Vec::len),
        targets = ys.len(),
        "loaded data"
    );

    let mut rng = StdRng::seed_from_u64(config.seed);
    let mut trainer = Trainer::new(config, cg, &mut rng, xs, ys)?;
    trainer.fit(config.iterations, |k, loss| {
        println!("Iter: {k:2}, Loss: {loss}");
    })?;
    Ok(())
}
