mod cli;
mod error;
mod output;

use std::time::Duration;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use certship_core::{
    DeployOptions, Deployer, KubeSecretStore, Reconciler, TransportConfig, all_succeeded,
};

use crate::cli::Cli;
use crate::error::{CliError, exit_code};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    match run(cli).await {
        Ok(true) => std::process::exit(exit_code::SUCCESS),
        Ok(false) => std::process::exit(exit_code::FAILED),
        Err(err) => {
            let code = err.exit_code();
            eprintln!("{:?}", miette::Report::new(err));
            std::process::exit(code);
        }
    }
}

fn init_tracing(verbosity: u8, quiet: bool) {
    let filter = if quiet {
        "error"
    } else {
        match verbosity {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();
}

/// Load, deploy, report. `Ok(true)` when every device succeeded.
async fn run(cli: Cli) -> Result<bool, CliError> {
    // Inventory problems surface before we touch the cluster.
    let devices = certship_config::load_devices(&cli.config)?;
    output::print_banner(&cli, devices.len());

    let client = kube::Client::try_default()
        .await
        .map_err(CliError::Kubernetes)?;
    let secrets = KubeSecretStore::new(client.clone(), &cli.namespace);
    let reconciler = (!cli.skip_resources).then(|| Reconciler::new(client, &cli.namespace));

    let options = DeployOptions {
        issuer_name: cli.issuer.clone(),
        issuer_kind: cli.issuer_kind.into(),
        domain_suffix: cli.domain_suffix.clone(),
        transport: TransportConfig {
            tls: cli.tls_mode(),
            timeout: Duration::from_secs(cli.timeout),
        },
    };

    let deployer = Deployer::new(secrets, reconciler, options);
    let outcomes = deployer.run(devices).await;

    output::print_summary(&outcomes, cli.quiet);
    Ok(all_succeeded(&outcomes))
}
