//! CLI command definitions

use clap::{Parser, Subcommand, ValueEnum};
use conductor_domain::ToolCategory;
use std::path::PathBuf;

/// Output format for command results
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable, colored output
    Full,
    /// JSON output
    Json,
}

/// CLI arguments for conductor
#[derive(Parser, Debug)]
#[command(name = "conductor")]
#[command(author, version, about = "Tool orchestration engine - run tools and chains with caching, retries and circuit breakers")]
#[command(long_about = r#"
Conductor runs registered tools behind a uniform execution engine.

Every call goes through the same pipeline:
1. Validation: unknown tools and malformed parameters are rejected up front
2. Dependency health: tools whose upstream group is unhealthy are not called
3. Cache: identical calls to cacheable tools are answered from memory
4. Circuit breaker: tools that keep failing are skipped until they cool down
5. Timeout and retry: one retry with backoff for transient failures

Configuration files are loaded from (in priority order):
1. CONDUCTOR_* environment variables
2. --config <path>          Explicit config file
3. ./conductor.toml         Project-level config
4. ~/.config/conductor/config.toml   Global config

Example:
  conductor tools
  conductor run echo --params '{"zip": "94110"}'
  conductor run unstable_upstream --params '{"fail": true}' --repeat 6
  conductor chain echo summarize --params '{"listing": {"beds": 3}}'
  conductor -o json status
"#)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "full", global = true)]
    pub output: OutputFormat,

    /// Verbosity level (-v = info, -vv = debug, -vvv = trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Disable loading of configuration files
    #[arg(long, global = true)]
    pub no_config: bool,

    /// Show configuration file locations and exit
    #[arg(long)]
    pub show_config: bool,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// List registered tools
    Tools {
        /// Only show tools in this category
        #[arg(long, value_parser = parse_category)]
        category: Option<ToolCategory>,
    },

    /// Execute a single tool
    Run {
        /// Tool id
        tool: String,

        /// Parameters as a JSON object
        #[arg(short, long, value_name = "JSON", default_value = "{}")]
        params: String,

        /// Caller identity recorded on the execution
        #[arg(long, value_name = "ID")]
        caller: Option<String>,

        /// Run the same call this many times (shows caching and the breaker)
        #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
        repeat: u32,
    },

    /// Execute tools in order, feeding each output to the next
    Chain {
        /// Tool ids, in execution order
        #[arg(required = true, num_args = 1..)]
        tools: Vec<String>,

        /// Initial parameters as a JSON object
        #[arg(short, long, value_name = "JSON", default_value = "{}")]
        params: String,

        /// Mark every step as required (no recovery from failed steps)
        #[arg(long)]
        strict: bool,
    },

    /// Probe dependency groups once and print the operational snapshot
    Status,
}

fn parse_category(s: &str) -> Result<ToolCategory, String> {
    s.parse()
}
