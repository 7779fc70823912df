//! `lookup` command line driver

mod commands;
mod scripted;

use anyhow::Result;
use clap::{value_parser, Arg, ArgAction, Command};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

fn profile_args(command: Command) -> Command {
    command
        .arg(
            Arg::new("profile")
                .long("profile")
                .default_value("statutes")
                .help("Feature preset: statutes, ordinances, traffic-violations, jury-instructions, regulations"),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .value_parser(value_parser!(PathBuf))
                .help("TOML engine configuration, replaces the profile preset"),
        )
}

fn endpoint_args(command: Command) -> Command {
    command
        .arg(
            Arg::new("resolver-url")
                .long("resolver-url")
                .help("Generative fallback endpoint"),
        )
        .arg(
            Arg::new("detail-url")
                .long("detail-url")
                .help("Full record endpoint; the dataset serves records when absent"),
        )
        .arg(
            Arg::new("generator-url")
                .long("generator-url")
                .help("Derived field endpoint"),
        )
        .arg(
            Arg::new("api-key")
                .long("api-key")
                .help("Bearer token for every endpoint (default: $LOOKUP_API_KEY)"),
        )
}

fn cli() -> Command {
    Command::new("lookup")
        .version(lookup_engine::VERSION)
        .about("Local-first lookup with debounced generative fallback")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("log-json")
                .long("log-json")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Emit logs as JSON lines"),
        )
        .subcommand(endpoint_args(profile_args(
            Command::new("search")
                .about("Run one query and print the settled result")
                .arg(
                    Arg::new("dataset")
                        .long("dataset")
                        .required(true)
                        .value_parser(value_parser!(PathBuf))
                        .help("JSON or YAML index dataset"),
                )
                .arg(Arg::new("query").required(true).help("Search text"))
                .arg(
                    Arg::new("expand")
                        .long("expand")
                        .action(ArgAction::SetTrue)
                        .help("Load and print the full record of every result"),
                )
                .arg(
                    Arg::new("derive")
                        .long("derive")
                        .action(ArgAction::SetTrue)
                        .help("Generate the derived field of every result"),
                ),
        )))
        .subcommand(profile_args(
            Command::new("simulate")
                .about("Replay typing against a canned resolver and print every transition")
                .arg(
                    Arg::new("dataset")
                        .long("dataset")
                        .value_parser(value_parser!(PathBuf))
                        .help("JSON or YAML index dataset (default: empty index)"),
                )
                .arg(
                    Arg::new("type")
                        .long("type")
                        .required(true)
                        .help("Text typed one character at a time"),
                )
                .arg(
                    Arg::new("interval-ms")
                        .long("interval-ms")
                        .default_value("120")
                        .value_parser(value_parser!(u64))
                        .help("Delay between keystrokes"),
                )
                .arg(
                    Arg::new("answer")
                        .long("answer")
                        .action(ArgAction::Append)
                        .help("Canned answer as query=identifier|title (repeatable)"),
                )
                .arg(
                    Arg::new("latency-ms")
                        .long("latency-ms")
                        .default_value("1500")
                        .value_parser(value_parser!(u64))
                        .help("Canned resolver latency"),
                )
                .arg(
                    Arg::new("debounce-ms")
                        .long("debounce-ms")
                        .value_parser(value_parser!(u64))
                        .help("Override the quiet period before the fallback fires"),
                ),
        ))
        .subcommand(profile_args(
            Command::new("categories")
                .about("Print dataset categories in display order")
                .arg(
                    Arg::new("dataset")
                        .long("dataset")
                        .required(true)
                        .value_parser(value_parser!(PathBuf))
                        .help("JSON or YAML index dataset"),
                ),
        ))
        .subcommand(profile_args(
            Command::new("config").about("Print the effective engine configuration as TOML"),
        ))
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let matches = cli().get_matches();
    init_tracing(matches.get_flag("log-json"));

    match matches.subcommand() {
        Some(("search", args)) => commands::search(args).await,
        Some(("simulate", args)) => commands::simulate(args).await,
        Some(("categories", args)) => commands::categories(args),
        Some(("config", args)) => commands::config(args),
        _ => {
            cli().print_help()?;
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_definition_is_consistent() {
        cli().debug_assert();
    }

    #[test]
    fn simulate_collects_repeated_answers() {
        let matches = cli()
            .try_get_matches_from([
                "lookup",
                "simulate",
                "--type",
                "theft",
                "--answer",
                "theft=F.S. 812.014|Theft",
                "--answer",
                "zzzz=N/A",
            ])
            .unwrap();
        let (name, args) = matches.subcommand().unwrap();
        assert_eq!(name, "simulate");
        let answers: Vec<&String> = args.get_many::<String>("answer").unwrap().collect();
        assert_eq!(answers.len(), 2);
        assert_eq!(args.get_one::<u64>("latency-ms"), Some(&1500));
    }

    #[test]
    fn search_requires_dataset() {
        assert!(cli()
            .try_get_matches_from(["lookup", "search", "burglary"])
            .is_err());
    }
}
