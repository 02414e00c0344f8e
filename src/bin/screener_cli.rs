//! Screener CLI - translate, validate and compile a natural-language
//! screen without standing up the HTTP surface or a store connection.
//!
//! Usage:
//!   screener-cli run "market cap above 10 billion and pe ratio below 20"
//!   screener-cli run --dsl rule.json
//!   screener-cli validate "price below analyst target"
//!   screener-cli fields

use clap::{Parser, Subcommand};
use screener::catalog::CATALOG;
use screener::config::Settings;
use screener::dsl;
use screener::translation::translate;
use screener::validation::{validate, ValidatorSettings};
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "screener-cli")]
#[command(about = "Translate, validate and compile screener queries from the command line")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Translate, validate and compile a query to SQL.
    Run {
        /// Natural-language query text (mutually exclusive with --dsl).
        query: Option<String>,

        /// Path to a DSL JSON file instead of natural language.
        #[arg(long)]
        dsl: Option<PathBuf>,

        /// Print the compiled SQL with bound parameters listed below it.
        #[arg(short, long)]
        verbose: bool,
    },

    /// Translate and validate a query, printing diagnostics only.
    Validate {
        query: Option<String>,
        #[arg(long)]
        dsl: Option<PathBuf>,
    },

    /// List every field in the catalog with its aliases.
    Fields,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Run { query, dsl, verbose } => cmd_run(query, dsl, verbose),
        Commands::Validate { query, dsl } => cmd_validate(query, dsl),
        Commands::Fields => cmd_fields(),
    }
}

fn load_rule(query: Option<String>, dsl_path: Option<PathBuf>) -> Result<dsl::Rule, String> {
    match (query, dsl_path) {
        (Some(q), None) => Ok(translate(&q, &CATALOG)),
        (None, Some(path)) => {
            let content = fs::read_to_string(&path).map_err(|e| format!("reading {}: {e}", path.display()))?;
            let value: serde_json::Value = serde_json::from_str(&content).map_err(|e| format!("parsing {}: {e}", path.display()))?;
            dsl::parse(&value).map_err(|e| e.to_string())
        }
        (None, None) => Err("either a query string or --dsl <file> is required".to_string()),
        (Some(_), Some(_)) => Err("pass a query string or --dsl <file>, not both".to_string()),
    }
}

fn validator_settings() -> ValidatorSettings {
    let settings = Settings::load().unwrap_or_default();
    ValidatorSettings::from(&settings.validator)
}

fn cmd_run(query: Option<String>, dsl_path: Option<PathBuf>, verbose: bool) -> ExitCode {
    let rule = match load_rule(query, dsl_path) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::FAILURE;
        }
    };

    let settings = Settings::load().unwrap_or_default();
    let validator_settings = ValidatorSettings::from(&settings.validator);

    let validated = match validate(rule, &CATALOG, &validator_settings) {
        Ok(v) => v,
        Err(diagnostics) => {
            eprintln!("validation failed:");
            for d in &diagnostics {
                eprintln!("  {d}");
            }
            return ExitCode::FAILURE;
        }
    };

    if !validated.warnings.is_empty() {
        for w in &validated.warnings {
            eprintln!("warning: {w}");
        }
    }

    let compiled = match screener::compile::compile(&validated.rule, &CATALOG, &settings.compiler) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("compile error: {e}");
            return ExitCode::FAILURE;
        }
    };

    if verbose {
        println!("-- {} bound parameter(s)", compiled.params.len());
        for (i, p) in compiled.params.iter().enumerate() {
            println!("--   ${} = {}", i + 1, p);
        }
        println!();
    }
    println!("{}", compiled.sql_text);
    ExitCode::SUCCESS
}

fn cmd_validate(query: Option<String>, dsl_path: Option<PathBuf>) -> ExitCode {
    let rule = match load_rule(query, dsl_path) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::FAILURE;
        }
    };

    let validator_settings = validator_settings();
    match validate(rule, &CATALOG, &validator_settings) {
        Ok(validated) => {
            println!("OK");
            for w in &validated.warnings {
                println!("warning: {w}");
            }
            ExitCode::SUCCESS
        }
        Err(diagnostics) => {
            for d in &diagnostics {
                println!("{d}");
            }
            ExitCode::FAILURE
        }
    }
}

fn cmd_fields() -> ExitCode {
    for field in CATALOG.all_fields() {
        println!("{} ({:?}, table: {:?})", field.name, field.kind, field.table());
        if !field.aliases.is_empty() {
            println!("  aliases: {}", field.aliases.join(", "));
        }
    }
    ExitCode::SUCCESS
}
