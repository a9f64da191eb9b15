use clap::Parser;
use pollbot::cli::{self, Cli, Command, ConfigCommand};
use pollbot::{config, logging};
use std::time::Duration;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config_path = cli.config.as_deref();

    match cli.command.unwrap_or(Command::Run) {
        Command::Run => {
            let cfg = config::load_config(config_path)?;
            logging::init_logging(&cfg.logging)?;

            let runtime = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()?;
            let result = runtime.block_on(cli::handle_run(cfg));
            // A blocking stdin read would otherwise hold up shutdown until the next line.
            runtime.shutdown_timeout(Duration::from_secs(1));
            result
        }
        Command::Config(ConfigCommand::Show) => cli::handle_config_show(config_path),
        Command::Config(ConfigCommand::Get { key }) => cli::handle_config_get(config_path, &key),
        Command::Config(ConfigCommand::Path) => {
            cli::handle_config_path(config_path);
            Ok(())
        }
        Command::Config(ConfigCommand::Schema) => cli::handle_config_schema(),
        Command::Version => {
            cli::handle_version();
            Ok(())
        }
    }
}
