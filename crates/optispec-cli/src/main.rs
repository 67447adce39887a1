mod config_file;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use config_file::{ConfigSource, load_config};
use optispec::parser::render_formula_errors;
use optispec::session::Session;
use optispec::{EngineConfig, FieldOutcome, Total, aggregate_total, parse_formula};
use serde_json::json;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "optispec")]
#[command(about = "Specification derivation engine CLI")]
struct Cli {
    /// Engine config (default: optispec.toml in the working directory or above)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Recompute every field of a session file and print the save shape
    Eval {
        /// Path to the session JSON
        session: PathBuf,
        /// Also print column totals
        #[arg(long)]
        totals: bool,
        /// Print a report for every formula that failed to stderr
        #[arg(long)]
        explain: bool,
    },
    /// Check if a formula parses
    Check {
        formula: String,
    },
    /// Apply a total formula to a list of numbers
    Total {
        formula: String,
        #[arg(allow_negative_numbers = true)]
        values: Vec<f64>,
    },
    /// List the variables formulas of a session can reference
    Variables {
        session: PathBuf,
    },
}

fn main() -> Result<()> {
    env_logger::Builder::from_default_env().init();

    let cli = Cli::parse();
    let (config, source) = load_config(cli.config.as_deref())?;
    match &source {
        ConfigSource::File(path) => log::debug!("config loaded from {}", path.display()),
        ConfigSource::Default => log::debug!("no config file found, using defaults"),
    }

    match cli.command {
        Commands::Eval {
            session,
            totals,
            explain,
        } => eval_session(&session, config, totals, explain),
        Commands::Check { formula } => {
            check_formula(&formula);
            Ok(())
        }
        Commands::Total { formula, values } => {
            let total = aggregate_total(&formula, &values);
            println!("{total}");
            if matches!(total, Total::Error | Total::InvalidFormula) {
                std::process::exit(1);
            }
            Ok(())
        }
        Commands::Variables { session } => list_variables(&session, config),
    }
}

fn read_session(path: &Path) -> Result<Session> {
    let json = fs::read_to_string(path).with_context(|| format!("reading session {}", path.display()))?;
    Session::from_json(&json).with_context(|| format!("decoding session {}", path.display()))
}

fn eval_session(path: &Path, config: EngineConfig, totals: bool, explain: bool) -> Result<()> {
    eprintln!("Evaluating: {}", path.display());
    let controller = read_session(path)?.into_controller(config);

    let failures: Vec<_> = controller
        .report()
        .failures()
        .map(|(field, error)| json!({ "field": field, "error": error.to_string() }))
        .collect();

    if explain {
        for (field, outcome) in controller.fields().iter().zip(controller.report().fields()) {
            let FieldOutcome::Failed(error) = &outcome.outcome else {
                continue;
            };
            let formula = field.formula().unwrap_or_default();
            eprint!("{}", render_formula_errors(&field.name, formula, std::slice::from_ref(error))?);
        }
    }

    let mut output = json!({
        "fields": controller.specification().to_saved(),
        "failures": failures,
    });
    if totals {
        output["totals"] = serde_json::to_value(controller.totals(std::iter::empty()))?;
    }
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn check_formula(formula: &str) {
    match parse_formula(formula) {
        Ok(parsed) => {
            let output = json!({
                "status": "ok",
                "references": parsed.referenced_names(),
            });
            println!("{output}");
        }
        Err(errors) => {
            match render_formula_errors("formula", formula, &errors) {
                Ok(report) => eprint!("{report}"),
                Err(error) => eprintln!("Parser errors: {errors:?} ({error})"),
            }
            std::process::exit(1);
        }
    }
}

fn list_variables(path: &Path, config: EngineConfig) -> Result<()> {
    let controller = read_session(path)?.into_controller(config);
    let variables: Vec<_> = controller
        .available_variables()
        .map(|(name, entry)| {
            json!({
                "name": name,
                "value": entry.value,
                "origin": entry.origin.to_string(),
            })
        })
        .collect();
    println!("{}", serde_json::to_string_pretty(&variables)?);
    Ok(())
}
