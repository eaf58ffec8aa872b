use anyhow::Result;
use clap::Parser;
use env_logger::{Builder, Env};
use kibitz::{Cli, Config, EngineConfig, Frontend};

fn main() {
    Builder::from_env(Env::default().default_filter_or("warn")).init();

    if let Err(e) = run(Cli::parse()) {
        eprintln!("{} encountered an error: {e:#}", env!("CARGO_PKG_NAME"));
    }
}

fn run(cli: Cli) -> Result<()> {
    let mut config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };

    // Command line arguments take priority over the config file
    if let Some(path) = cli.engine {
        config.engine = Some(EngineConfig {
            path,
            args: cli.engine_args,
        });
    } else if let Some(engine) = config.engine.as_mut() {
        if !cli.engine_args.is_empty() {
            engine.args = cli.engine_args;
        }
    }

    let mut frontend = Frontend::new(config);

    // A bad starting position is reported, but the engine is already running
    let loaded = match (&cli.fen, &cli.pgn) {
        (Some(fen), _) => frontend.load_fen(fen),
        (None, Some(path)) => frontend.load_pgn(path, cli.game),
        (None, None) => Ok(()),
    };
    if let Err(e) = loaded {
        eprintln!("Error: {e:#}");
    }

    frontend.run()
}
