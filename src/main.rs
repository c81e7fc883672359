//! gg-learner command line entry point.
//!
//! ## CLI Subcommands
//!
//! - `gg-learner-cli config show|defaults|validate` - Inspect `GG_LEARNER_*` settings
//! - `gg-learner-cli model save PATH [ARGS..]` - Create a learner and save it
//! - `gg-learner-cli model inspect PATH [ARGS..]` - Load a saved model
//! - `gg-learner-cli model compat ARGS_A ARGS_B` - Compare feature configuration

use std::path::Path;
use std::process::ExitCode;

use gg_learner::cli::{config_cmd, merge_arguments, model_cmd};
use gg_learner::config as gg_config;
use gg_learner::telemetry::{init_logging, LogConfig};

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().collect();
    let command = args.get(1).map(|s| s.as_str()).unwrap_or("help");

    let env = gg_config::load();
    if let Err(e) = init_logging(&LogConfig::from_env(&env)) {
        eprintln!("Logging disabled: {}", e);
    }

    match command {
        "help" | "--help" | "-h" => {
            if let Some(subcommand) = args.get(2) {
                print_command_help(subcommand);
            } else {
                print_usage();
            }
            ExitCode::SUCCESS
        }
        "version" | "--version" | "-V" => {
            println!("gg-learner {}", env!("CARGO_PKG_VERSION"));
            ExitCode::SUCCESS
        }
        "config" => {
            let subcommand = args.get(2).map(|s| s.as_str()).unwrap_or("show");
            match subcommand {
                "show" => {
                    let json = args.get(3).map(|s| s.as_str()) == Some("--json");
                    ExitCode::from(config_cmd::run_show(json) as u8)
                }
                "defaults" => {
                    config_cmd::run_defaults();
                    ExitCode::SUCCESS
                }
                "validate" => ExitCode::from(config_cmd::run_validate() as u8),
                _ => {
                    eprintln!("Unknown config subcommand: {}", subcommand);
                    print_command_help("config");
                    ExitCode::FAILURE
                }
            }
        }
        "model" => run_model(&args, &env),
        _ => {
            eprintln!("Unknown command: {}", command);
            print_usage();
            ExitCode::FAILURE
        }
    }
}

fn run_model(args: &[String], env: &gg_config::EnvConfig) -> ExitCode {
    let subcommand = args.get(2).map(|s| s.as_str()).unwrap_or("");
    let rest = args.get(3..).unwrap_or_default();

    let code = match (subcommand, rest) {
        ("save", [path, overrides @ ..]) => {
            let arguments = merge_arguments(&env.arguments, overrides);
            model_cmd::run_save(env, &arguments, Path::new(path))
        }
        ("inspect", [path, overrides @ ..]) => {
            model_cmd::run_inspect(Path::new(path), &merge_arguments("", overrides))
        }
        ("compat", [first, second]) => model_cmd::run_compat(first, second),
        _ => {
            eprintln!("Unknown or incomplete model subcommand: {}", subcommand);
            print_command_help("model");
            1
        }
    };
    ExitCode::from(code as u8)
}

fn print_usage() {
    let version = env!("CARGO_PKG_VERSION");
    eprintln!(
        "gg-learner - Native learner lifecycle manager v{}

USAGE:
    gg-learner-cli [COMMAND] [OPTIONS]

COMMANDS:
    model        Save, inspect or compare models
    config       Inspect configuration (show, defaults, validate)
    version      Show version information
    help         Show this help message

EXAMPLES:
    gg-learner-cli model save out/model.bin --id demo -b 20
    gg-learner-cli model inspect out/model.bin
    gg-learner-cli model compat \"-b 18\" \"-b 20\"
    gg-learner-cli config show --json

ENVIRONMENT:
    GG_LEARNER_ARGS              Default argument text for new models
    GG_LEARNER_THREAD_SAFE_POOL  Synchronize example pool access (true/false)
    GG_LEARNER_LOG_LEVEL         Log filter (default: info)
    GG_LEARNER_LOG_FORMAT        json or pretty (default: json)

EXIT CODES:
    0  Success / Compatible
    1  Failure
    2  Incompatible feature configuration
",
        version
    );
}

/// Print detailed help for a specific command.
fn print_command_help(command: &str) {
    match command {
        "model" => {
            eprintln!(
                "gg-learner-cli model - Save, inspect or compare models

USAGE:
    gg-learner-cli model save PATH [ARGS..]
    gg-learner-cli model inspect PATH [ARGS..]
    gg-learner-cli model compat ARGS_A ARGS_B

DESCRIPTION:
    save     Creates a learner from GG_LEARNER_ARGS plus ARGS and saves it
             to PATH, creating the directory if needed.
    inspect  Loads the model at PATH and prints its effective arguments.
    compat   Builds two learners and reports the first feature difference.
"
            );
        }
        "config" => {
            eprintln!(
                "gg-learner-cli config - Inspect configuration

USAGE:
    gg-learner-cli config show [--json]
    gg-learner-cli config defaults
    gg-learner-cli config validate
"
            );
        }
        _ => {
            eprintln!("No detailed help for '{}'.", command);
            print_usage();
        }
    }
}
