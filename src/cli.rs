use clap::{Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "sapagent")]
#[command(version)]
#[command(about = "Transactional cluster and SAP operations on this host", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Configuration file (defaults to /etc/sapagent/config.toml)
    #[arg(long, env = "SAPAGENT_CONFIG", global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// List registered operators and their versions
    Operators,

    /// Run one operation and print its execution report
    Run(RunArgs),

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Parser)]
pub struct RunArgs {
    /// Operator to run, as name or name@version
    pub operator: String,

    /// Operator argument; the value is read as JSON when it parses, else as a string
    #[arg(short, long = "arg", value_name = "KEY=VALUE", value_parser = parse_key_value)]
    pub args: Vec<(String, serde_json::Value)>,

    /// Operator arguments as a JSON object, applied before --arg
    #[arg(long, value_name = "JSON")]
    pub args_json: Option<String>,

    /// Operation id echoed in the report
    #[arg(long)]
    pub operation_id: Option<String>,
}

/// Parse `key=value`, reading `value` as a JSON literal when possible.
fn parse_key_value(s: &str) -> Result<(String, serde_json::Value), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("invalid argument '{s}', expected KEY=VALUE"))?;
    if key.is_empty() {
        return Err(format!("invalid argument '{s}', key cannot be empty"));
    }
    let value = serde_json::from_str(value)
        .unwrap_or_else(|_| serde_json::Value::String(value.to_string()));
    Ok((key.to_string(), value))
}
