//! apimig command line
//!
//! Offline batch operations over a source tree plus debugging commands for
//! the rollout controller and interceptor optimizer.

#![warn(unreachable_pub)]

pub mod commands;
pub mod config;

use anyhow::Context;
use apimig_core::{InterceptorType, Preset};
use apimig_interceptor::HttpMethod;
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use config::ToolkitConfig;
use std::io::Write;
use std::path::PathBuf;

fn paths_arg() -> Arg {
    Arg::new("paths")
        .num_args(1..)
        .required(true)
        .value_parser(value_parser!(PathBuf))
        .help("Files or directories to scan")
}

fn json_arg() -> Arg {
    Arg::new("json")
        .long("json")
        .action(ArgAction::SetTrue)
        .help("Output as JSON")
}

/// Command definition
#[must_use]
pub fn build_cli() -> Command {
    Command::new("apimig")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Incremental API-client migration toolkit")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("config")
                .long("config")
                .short('c')
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("TOML configuration file"),
        )
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .short('v')
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Debug logging"),
        )
        .subcommand(
            Command::new("migrate")
                .about("Rewrite legacy client usage to preset-based clients")
                .arg(paths_arg())
                .arg(
                    Arg::new("write")
                        .long("write")
                        .action(ArgAction::SetTrue)
                        .help("Write changed files in place (default: dry run)"),
                )
                .arg(json_arg()),
        )
        .subcommand(
            Command::new("analyze")
                .about("Inventory legacy client usage as CSV")
                .arg(paths_arg()),
        )
        .subcommand(
            Command::new("verify")
                .about("Check migrated files for legacy leftovers")
                .arg(paths_arg())
                .arg(json_arg()),
        )
        .subcommand(
            Command::new("rollout")
                .about("Inspect the rollout controller")
                .subcommand_required(true)
                .subcommand(Command::new("status").about("Show configuration and assignment").arg(json_arg()))
                .subcommand(
                    Command::new("decide")
                        .about("Show the decision for each path")
                        .arg(Arg::new("paths").num_args(0..).help("Request paths")),
                )
                .subcommand(
                    Command::new("compare")
                        .about("Time one call through each variant (debug mode only)")
                        .arg(
                            Arg::new("preset")
                                .long("preset")
                                .default_value("default")
                                .value_parser(|s: &str| s.parse::<Preset>())
                                .help("Client preset"),
                        )
                        .arg(Arg::new("path").required(true).help("Path relative to the unified base URL")),
                ),
        )
        .subcommand(
            Command::new("interceptors")
                .about("Inspect the interceptor optimizer")
                .subcommand_required(true)
                .subcommand(
                    Command::new("order")
                        .about("Execution order for the given categories")
                        .arg(
                            Arg::new("types")
                                .num_args(0..)
                                .value_parser(|s: &str| s.parse::<InterceptorType>())
                                .help("Categories (default: all)"),
                        ),
                )
                .subcommand(
                    Command::new("check")
                        .about("Which stages run for a request")
                        .arg(
                            Arg::new("method")
                                .long("method")
                                .default_value("GET")
                                .value_parser(|s: &str| s.parse::<HttpMethod>())
                                .help("HTTP method"),
                        )
                        .arg(Arg::new("url").required(true).help("Request URL or path"))
                        .arg(
                            Arg::new("cached")
                                .long("cached")
                                .action(ArgAction::SetTrue)
                                .help("Response served from cache"),
                        )
                        .arg(
                            Arg::new("success")
                                .long("success")
                                .action(ArgAction::SetTrue)
                                .help("Call succeeded"),
                        ),
                ),
        )
}

fn paths(args: &ArgMatches) -> Vec<PathBuf> {
    args.get_many::<PathBuf>("paths")
        .map(|v| v.cloned().collect())
        .unwrap_or_default()
}

/// Run the parsed command, writing its report to `out`
///
/// Returns whether the run was clean.
///
/// # Errors
/// Configuration, discovery and output errors
pub async fn run<W: Write>(matches: &ArgMatches, out: &mut W) -> anyhow::Result<bool> {
    let config = ToolkitConfig::load(matches.get_one::<PathBuf>("config").map(PathBuf::as_path))
        .context("failed to load configuration")?;

    match matches.subcommand() {
        Some(("migrate", args)) => commands::migrate(
            &config,
            &paths(args),
            args.get_flag("write"),
            args.get_flag("json"),
            out,
        ),
        Some(("analyze", args)) => commands::analyze(&config, &paths(args), out),
        Some(("verify", args)) => commands::verify(&config, &paths(args), args.get_flag("json"), out),
        Some(("rollout", rollout)) => match rollout.subcommand() {
            Some(("status", args)) => commands::rollout_status(&config, args.get_flag("json"), out),
            Some(("decide", args)) => {
                let paths: Vec<String> = args
                    .get_many::<String>("paths")
                    .map(|v| v.cloned().collect())
                    .unwrap_or_default();
                commands::rollout_decide(&config, &paths, out)
            }
            Some(("compare", args)) => {
                let preset = args.get_one::<Preset>("preset").copied().unwrap_or_default();
                let path = args.get_one::<String>("path").map_or("/", String::as_str);
                commands::rollout_compare(&config, preset, path, out).await
            }
            _ => anyhow::bail!("unknown rollout command"),
        },
        Some(("interceptors", interceptors)) => match interceptors.subcommand() {
            Some(("order", args)) => {
                let types: Vec<InterceptorType> = args
                    .get_many::<InterceptorType>("types")
                    .map(|v| v.copied().collect())
                    .unwrap_or_default();
                commands::interceptors_order(&config, &types, out)
            }
            Some(("check", args)) => {
                let method = args.get_one::<HttpMethod>("method").copied().unwrap_or_default();
                let url = args.get_one::<String>("url").map_or("/", String::as_str);
                let context =
                    commands::request_context(method, url, args.get_flag("cached"), args.get_flag("success"));
                commands::interceptors_check(&config, &context, out)
            }
            _ => anyhow::bail!("unknown interceptors command"),
        },
        _ => anyhow::bail!("no command given"),
    }
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
