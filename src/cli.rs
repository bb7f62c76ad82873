use clap::{value_parser, Arg, ArgAction, Command};

use crate::config::{DEFAULT_RPC_URL, DEFAULT_TIMEOUT_SECS};

const SPECIAL: [&str; 2] = ["generate-config", "config-path"];

pub fn command() -> Command {
    Command::new("chainrun")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Call, estimate or send a smart contract method over JSON-RPC")
        .override_usage(
            "chainrun --rpc <url> --contract <address> --abi <path or api-key> --method <name> [--args <values...>] [--pk <key>]",
        )
        .arg(
            Arg::new("rpc")
                .long("rpc")
                .value_name("URL")
                .help(format!("RPC URL (default: {})", DEFAULT_RPC_URL)),
        )
        .arg(
            Arg::new("contract")
                .long("contract")
                .value_name("ADDRESS")
                .help("Contract address")
                .required_unless_present_any(SPECIAL),
        )
        .arg(
            Arg::new("abi")
                .long("abi")
                .value_name("PATH|API_KEY")
                .help("ABI file path (*.json) or block-explorer API key")
                .required_unless_present_any(SPECIAL),
        )
        .arg(
            Arg::new("method")
                .long("method")
                .value_name("NAME")
                .help("Contract method to call, by name or full signature")
                .required_unless_present_any(SPECIAL),
        )
        .arg(
            Arg::new("args")
                .long("args")
                .value_name("VALUES")
                .help("Arguments for the method")
                .num_args(0..)
                .allow_negative_numbers(true)
                .action(ArgAction::Append),
        )
        .arg(
            Arg::new("pk")
                .long("pk")
                .value_name("KEY")
                .help("Private key for sending transactions"),
        )
        .arg(
            Arg::new("estimate")
                .long("estimate")
                .help("Estimate gas only")
                .requires("pk")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("explorer-url")
                .long("explorer-url")
                .value_name("URL")
                .help("Block-explorer API base URL used for ABI lookups"),
        )
        .arg(
            Arg::new("timeout")
                .long("timeout")
                .value_name("SECS")
                .help(format!(
                    "Seconds allowed for the ABI lookup and each node request, 0 for no limit (default: {})",
                    DEFAULT_TIMEOUT_SECS
                ))
                .value_parser(value_parser!(u64)),
        )
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Path to configuration file"),
        )
        .arg(
            Arg::new("generate-config")
                .long("generate-config")
                .help("Generate a sample configuration file and exit")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("config-path")
                .long("config-path")
                .help("Print the default configuration file path and exit")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Log progress to stderr (-v info, -vv debug)")
                .action(ArgAction::Count),
        )
}
