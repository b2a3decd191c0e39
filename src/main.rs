use clap::Parser;
use tracing::{error, info};

use dns_forward::cli::{check_config, Cli};
use dns_forward::config::ConfigFile;
use dns_forward::forwarder::Forwarder;
use dns_forward::logging::init_logging;

#[tokio::main(flavor = "current_thread")]
async fn main() -> std::process::ExitCode {
    let cli = Cli::parse();

    if cli.is_check_config() {
        return match check_config(&cli) {
            Ok(config) => {
                println!("config ok: {config}");
                std::process::ExitCode::SUCCESS
            }
            Err(error) => {
                eprintln!("config error: {error}");
                std::process::ExitCode::FAILURE
            }
        };
    }

    let log_level = if cli.debug() { "debug" } else { "info" };
    init_logging(log_level);

    let config: ConfigFile = match ConfigFile::try_from(cli.config_path().as_deref()) {
        Ok(config) => config,
        Err(error) => {
            error!(%error, "failed to load configuration");
            return std::process::ExitCode::FAILURE;
        }
    };

    info!(
        upstream = %config.upstream_address(),
        listen = %config.address,
        port = config.port,
        blacklist_entries = config.blacklist.len(),
        "starting dns-forward"
    );

    let forwarder = match Forwarder::bind(&config).await {
        Ok(forwarder) => forwarder,
        Err(error) => {
            error!(%error, "failed to start forwarder");
            return std::process::ExitCode::FAILURE;
        }
    };

    let shutdown = async {
        if let Err(error) = tokio::signal::ctrl_c().await {
            error!(%error, "failed to listen for ctrl-c, shutting down anyway");
        }
    };

    forwarder.run(shutdown).await;
    std::process::ExitCode::SUCCESS
}
