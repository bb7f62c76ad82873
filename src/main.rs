mod cli;
mod config;
mod error;
mod ethereum;
mod report;

use anyhow::Result;
use config::{Config, FileConfig};
use error::InvokeResult;
use ethereum::{
    abi::{AbiResolver, AbiSource},
    args,
    contract::ContractHandle,
    provider::{self, ContractBackend},
    utils, Mode, Outcome,
};
use report::Reporter;
use std::io::Write;
use std::path::Path;
use std::process::ExitCode;
use tracing::{debug, info};

#[tokio::main]
async fn main() -> ExitCode {
    let matches = cli::command().get_matches();

    // Logs go to stderr and stay quiet by default so that every outcome is one line.
    let level = match matches.get_count("verbose") {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        _ => tracing::Level::DEBUG,
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::builder()
                .with_default_directive(level.into())
                .from_env_lossy(),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    // Handle special commands first
    if matches.get_flag("generate-config") {
        println!("{}", FileConfig::generate_sample());
        return ExitCode::SUCCESS;
    }

    let mut reporter = Reporter::stdio();

    if matches.get_flag("config-path") {
        return match FileConfig::default_config_path() {
            Ok(path) => {
                println!("{}", path.display());
                ExitCode::SUCCESS
            }
            Err(e) => {
                reporter.error(&e);
                ExitCode::FAILURE
            }
        };
    }

    let config = match load_config(&matches).await {
        Ok(config) => config,
        Err(e) => {
            reporter.error(&e);
            return ExitCode::FAILURE;
        }
    };
    debug!("Configuration: {:?}", config);

    match run(&config, &mut reporter).await {
        Ok(outcome) => {
            debug!("Finished: {:?}", outcome);
            ExitCode::SUCCESS
        }
        Err(e) => {
            reporter.error(&e);
            ExitCode::FAILURE
        }
    }
}

async fn load_config(matches: &clap::ArgMatches) -> Result<Config> {
    let explicit = matches.get_one::<String>("config").map(Path::new);
    let file = FileConfig::load(explicit).await?;
    Config::from_matches(matches, &file)
}

/// Resolve the interface, coerce arguments, then dispatch once.
async fn run<O: Write, E: Write>(
    config: &Config,
    reporter: &mut Reporter<O, E>,
) -> InvokeResult<Outcome> {
    let address = utils::validate_address(&config.contract)?;
    let args = args::coerce_all(&config.args);

    let resolver = AbiResolver::new(&config.explorer_url, config.timeout)?;
    let source = AbiSource::from_arg(&config.abi);
    if matches!(source, AbiSource::Explorer { .. }) {
        info!("Fetching ABI from explorer...");
    }
    let interface = resolver.resolve(&source, &address).await?;

    let mode = config.mode();
    info!("Connecting to {} ({:?})", config.rpc_url, mode);

    match (&config.private_key, mode) {
        (Some(key), Mode::Estimate | Mode::Send) => {
            let backend = provider::connect_with_signer(&config.rpc_url, key)?;
            invoke(config, address, &interface, &backend, &args, mode, reporter).await
        }
        _ => {
            let backend = provider::connect(&config.rpc_url)?;
            invoke(config, address, &interface, &backend, &args, Mode::Call, reporter).await
        }
    }
}

async fn invoke<O: Write, E: Write>(
    config: &Config,
    address: alloy::primitives::Address,
    interface: &ethereum::abi::Interface,
    backend: &dyn ContractBackend,
    args: &[args::TypedArg],
    mode: Mode,
    reporter: &mut Reporter<O, E>,
) -> InvokeResult<Outcome> {
    ContractHandle::new(address, interface, backend, config.timeout)
        .with_confirmation_timeout(config.confirmation_timeout)
        .execute(&config.method, args, mode, reporter)
        .await
}
