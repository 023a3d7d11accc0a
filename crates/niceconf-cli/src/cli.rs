//! niceconf CLI - Command-line interface for niceconf documents
//!
//! Usage:
//!   niceconf get app.conf database.host --env env.json
//!   niceconf dump app.conf --format yaml
//!   niceconf check app.conf other.conf

use clap::{Parser, Subcommand};
use colored::Colorize;
use niceconf_core::{Config, ConfigOptions, Environment, Error, ErrorKind, Value};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

/// niceconf - read and export niceconf configuration documents
#[derive(Parser)]
#[command(name = "niceconf")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Get a specific value from the configuration
    Get {
        /// Configuration file
        file: PathBuf,

        /// Path to the value (e.g., database.host)
        path: String,

        /// JSON or YAML file that $references resolve against
        #[arg(short, long)]
        env: Option<PathBuf>,

        /// Default value if the path is not present
        #[arg(short, long)]
        default: Option<String>,

        /// Output format: text, json, yaml
        #[arg(short, long, default_value = "text", value_parser = ["text", "json", "yaml"])]
        format: String,

        /// Feed the file to the parser line by line as it is read
        #[arg(long)]
        streaming: bool,
    },

    /// Export the parsed configuration as JSON or YAML
    Dump {
        /// Configuration file
        file: PathBuf,

        /// JSON or YAML file that $references resolve against
        #[arg(short, long)]
        env: Option<PathBuf>,

        /// Output format: json, yaml
        #[arg(short, long, default_value = "json", value_parser = ["json", "yaml"])]
        format: String,

        /// Write to file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Feed the file to the parser line by line as it is read
        #[arg(long)]
        streaming: bool,
    },

    /// Parse files and report the first fatal error in each
    Check {
        /// Configuration file(s) to check
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// JSON or YAML file that $references resolve against
        #[arg(short, long)]
        env: Option<PathBuf>,
    },
}

/// Run the CLI with the given arguments
pub fn run() -> ExitCode {
    let cli = Cli::parse();

    match cli.command {
        Commands::Get {
            file,
            path,
            env,
            default,
            format,
            streaming,
        } => cmd_get(&file, &path, env.as_deref(), default, &format, streaming),

        Commands::Dump {
            file,
            env,
            format,
            output,
            streaming,
        } => cmd_dump(&file, env.as_deref(), &format, output, streaming),

        Commands::Check { files, env } => cmd_check(files, env.as_deref()),
    }
}

/// Exit status for a failed load: 1 for a bad document, 2 for I/O trouble
fn exit_status_for(err: &Error) -> u8 {
    match err.kind {
        ErrorKind::Io | ErrorKind::Environment => 2,
        _ => 1,
    }
}

fn load_options(env: Option<&Path>) -> Result<ConfigOptions, Error> {
    let Some(path) = env else {
        return Ok(ConfigOptions::default());
    };
    let environment = Environment::from_file(path)?;
    Ok(ConfigOptions::with_environment(environment))
}

fn load_config(file: &Path, env: Option<&Path>, streaming: bool) -> Result<Config, Error> {
    let options = load_options(env)?;
    if streaming {
        Config::load_streaming(file, &options)
    } else {
        Config::load_with_options(file, &options)
    }
}

/// Render a value for `get`
fn render(value: &Value, format: &str) -> Result<String, String> {
    match format {
        "json" => serde_json::to_string_pretty(value)
            .map(|s| s + "\n")
            .map_err(|e| e.to_string()),
        "yaml" => serde_yaml::to_string(value).map_err(|e| e.to_string()),
        _ => match value {
            Value::String(s) => Ok(format!("{}\n", s)),
            Value::Integer(i) => Ok(format!("{}\n", i)),
            Value::Bool(b) => Ok(format!("{}\n", b)),
            Value::Unresolved => Ok("null\n".to_string()),
            // For complex values, output as YAML
            _ => serde_yaml::to_string(value).map_err(|e| e.to_string()),
        },
    }
}

fn cmd_get(
    file: &Path,
    path: &str,
    env: Option<&Path>,
    default: Option<String>,
    format: &str,
    streaming: bool,
) -> ExitCode {
    let config = match load_config(file, env, streaming) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("{} {}\n{}", "✗".red(), file.display(), e);
            return ExitCode::from(exit_status_for(&e));
        }
    };

    let fallback = default.map(Value::String);
    let value = match &fallback {
        Some(fallback) => config.get_or(path, fallback),
        None => match config.get(path) {
            Ok(value) => value,
            Err(_) => {
                eprintln!("{}: Path '{}' not found", "Error".red(), path);
                return ExitCode::from(1);
            }
        },
    };

    match render(value, format) {
        Ok(content) => {
            print!("{}", content);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("{}: {}", "Error".red(), e);
            ExitCode::from(1)
        }
    }
}

fn cmd_dump(
    file: &Path,
    env: Option<&Path>,
    format: &str,
    output: Option<PathBuf>,
    streaming: bool,
) -> ExitCode {
    let config = match load_config(file, env, streaming) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("{} {}\n{}", "✗".red(), file.display(), e);
            return ExitCode::from(exit_status_for(&e));
        }
    };

    let result = match format {
        "yaml" => config.to_yaml(),
        _ => config.to_json().map(|s| s + "\n"),
    };

    match result {
        Ok(content) => {
            if let Some(output_path) = output {
                if let Err(e) = std::fs::write(&output_path, &content) {
                    eprintln!("{}: {}", "Error writing file".red(), e);
                    return ExitCode::from(2);
                }
                eprintln!("{} Wrote to {}", "✓".green(), output_path.display());
            } else {
                print!("{}", content);
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("{}: {}", "Error".red(), e);
            ExitCode::from(1)
        }
    }
}

fn cmd_check(files: Vec<PathBuf>, env: Option<&Path>) -> ExitCode {
    let options = match load_options(env) {
        Ok(o) => o,
        Err(e) => {
            eprintln!("{}", e.to_string().red());
            return ExitCode::from(2);
        }
    };

    let mut worst: u8 = 0;

    for file in files {
        match Config::load_with_options(&file, &options) {
            Ok(config) => {
                let entries = config.value().as_mapping().map_or(0, |m| m.len());
                println!(
                    "{} {}: {} top-level entr{}",
                    "✓".green(),
                    file.display(),
                    entries,
                    if entries == 1 { "y" } else { "ies" }
                );
            }
            Err(e) => {
                eprintln!("{} {}: {}", "✗".red(), file.display(), e);
                // an unreadable file outranks a malformed one
                worst = worst.max(exit_status_for(&e));
            }
        }
    }

    ExitCode::from(worst)
}
