use std::{fs::File, io::BufReader};

use clap::Parser;
use dibc_bridge_runner::{
    cli::{Commands, RunnerCli},
    config::RunnerConfig,
    logging::init_subscriber,
    replay::replay_with_process,
};
use tracing::info;

fn main() -> anyhow::Result<()> {
    let cli = RunnerCli::parse();
    match cli.command {
        Commands::Replay(args) => {
            let config = RunnerConfig::load(&args.config)?;
            init_subscriber(config.log_level())?;
            info!(
                port = %config.bridge.port,
                packet_timeout = config.bridge.packet_timeout,
                "starting replay"
            );

            let events = BufReader::new(File::open(&args.events)?);
            let summary = replay_with_process(&config.bridge, &config.controller, events)?;

            println!("{}", serde_json::to_string_pretty(&summary)?);
            Ok(())
        }
    }
}
