//! `strata` - list, describe, preflight and run filter pipelines

mod commands;
mod logging;

use anyhow::{Context, Result};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use std::path::PathBuf;
use strata_core::RunnerConfig;

fn cli() -> Command {
    let json = Arg::new("json")
        .long("json")
        .action(ArgAction::SetTrue)
        .help("Output as JSON");
    let pipeline = Arg::new("pipeline")
        .required(true)
        .value_parser(value_parser!(PathBuf))
        .help("Pipeline document (JSON)");

    Command::new("strata")
        .version(strata_core::VERSION)
        .about("Preflight and execute Strata filter pipelines")
        .subcommand_required(true)
        .arg(
            Arg::new("config")
                .long("config")
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("Runner configuration (TOML)"),
        )
        .subcommand(
            Command::new("list")
                .about("List the built-in filters")
                .arg(json.clone()),
        )
        .subcommand(
            Command::new("describe")
                .about("Show a filter's parameters")
                .arg(Arg::new("filter").required(true).help("Filter uuid or name"))
                .arg(json.clone()),
        )
        .subcommand(
            Command::new("preflight")
                .about("Validate a pipeline against an empty data structure")
                .arg(pipeline.clone())
                .arg(json.clone()),
        )
        .subcommand(
            Command::new("run")
                .about("Execute a pipeline and print the resulting data structure")
                .arg(pipeline)
                .arg(json.clone()),
        )
        .subcommand(
            Command::new("import-legacy")
                .about("Convert legacy filter parameters to current arguments")
                .arg(
                    Arg::new("filter")
                        .long("filter")
                        .required(true)
                        .help("Filter uuid or name"),
                )
                .arg(
                    Arg::new("input")
                        .required(true)
                        .value_parser(value_parser!(PathBuf))
                        .help("Legacy parameter JSON object"),
                )
                .arg(json),
        )
}

fn load_config(matches: &ArgMatches) -> Result<RunnerConfig> {
    match matches.get_one::<PathBuf>("config") {
        Some(path) => RunnerConfig::load(path).with_context(|| format!("config {}", path.display())),
        None => Ok(RunnerConfig::default()),
    }
}

fn configure_threads(config: &RunnerConfig) -> Result<()> {
    if config.worker_threads > 0 {
        rayon::ThreadPoolBuilder::new()
            .num_threads(config.worker_threads)
            .build_global()
            .context("failed to size the worker pool")?;
    }
    Ok(())
}

fn dispatch(matches: &ArgMatches) -> Result<i32> {
    let config = load_config(matches)?;
    logging::init(&config)?;
    configure_threads(&config)?;
    let registry = strata_filters::builtin_registry()?;

    let code = match matches.subcommand() {
        Some(("list", args)) => commands::list(&registry, args.get_flag("json"))?,
        Some(("describe", args)) => {
            let filter = args.get_one::<String>("filter").context("missing filter")?;
            commands::describe(&registry, filter, args.get_flag("json"))?
        }
        Some(("preflight", args)) => {
            let path = args.get_one::<PathBuf>("pipeline").context("missing pipeline")?;
            commands::preflight(&registry, path, &config, args.get_flag("json"))?
        }
        Some(("run", args)) => {
            let path = args.get_one::<PathBuf>("pipeline").context("missing pipeline")?;
            commands::run(&registry, path, &config, args.get_flag("json"))?
        }
        Some(("import-legacy", args)) => {
            let filter = args.get_one::<String>("filter").context("missing filter")?;
            let input = args.get_one::<PathBuf>("input").context("missing input")?;
            commands::import_legacy(&registry, filter, input, args.get_flag("json"))?
        }
        _ => commands::EXIT_FAILED,
    };
    Ok(code)
}

fn main() {
    let matches = cli().get_matches();
    let code = match dispatch(&matches) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e:#}");
            commands::EXIT_FAILED
        }
    };
    std::process::exit(code);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_is_well_formed() {
        cli().debug_assert();
    }

    #[test]
    fn config_is_global() {
        let matches = cli()
            .try_get_matches_from(["strata", "list", "--config", "strata.toml", "--json"])
            .unwrap();
        assert_eq!(
            matches.get_one::<PathBuf>("config"),
            Some(&PathBuf::from("strata.toml"))
        );
        let (name, sub) = matches.subcommand().unwrap();
        assert_eq!(name, "list");
        assert!(sub.get_flag("json"));
    }
}
