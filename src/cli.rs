use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};

/// Call-graph explorer for Temporal workflow codebases written in Go.
///
/// workflow-graph parses a Go module with tree-sitter, classifies every function
/// as a workflow, activity, signal, query, update, timer or plain function, and
/// wires the call sites between them into a navigable graph.
#[derive(Parser, Debug)]
#[command(
    name = "workflow-graph",
    version,
    about,
    long_about = None,
    propagate_version = true,
)]
pub struct Cli {
    /// Increase log verbosity (-v debug, -vv trace). `RUST_LOG` overrides.
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

/// Output format for query results.
#[derive(Clone, Debug, ValueEnum, Default)]
pub enum OutputFormat {
    /// Compact one-line-per-result format (default).
    #[default]
    Compact,
    /// Human-readable layout with optional ANSI bold when stdout is a terminal.
    Table,
    /// Structured JSON suitable for programmatic consumption.
    Json,
}

/// Options shared by every command that builds the graph.
#[derive(Args, Debug, Clone)]
pub struct AnalyzeArgs {
    /// Root directory of the Go code to analyze.
    pub path: PathBuf,

    /// Also analyze `*_test.go` files.
    #[arg(long)]
    pub include_tests: bool,

    /// Directory basenames to skip (comma-separated). Replaces the defaults (vendor,.git,node_modules).
    #[arg(long, value_delimiter = ',')]
    pub exclude_dir: Vec<String>,

    /// Only keep nodes whose package name matches this regex.
    #[arg(long)]
    pub package: Option<String>,

    /// Only keep nodes whose function name matches this regex.
    #[arg(long)]
    pub name: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Analyze a directory and print graph statistics and warnings.
    Index {
        #[command(flatten)]
        analyze: AnalyzeArgs,

        /// Output format.
        #[arg(long, value_enum, default_value_t = OutputFormat::Compact)]
        format: OutputFormat,
    },

    /// Print the call hierarchy, rooted at nodes nobody calls.
    Tree {
        #[command(flatten)]
        analyze: AnalyzeArgs,

        /// Only expand the listed row keys (comma-separated `/`-joined name paths).
        /// Everything is expanded when omitted.
        #[arg(long, value_delimiter = ',')]
        expand: Vec<String>,

        /// Output format.
        #[arg(long, value_enum, default_value_t = OutputFormat::Compact)]
        format: OutputFormat,
    },

    /// Print nodes grouped by package directory.
    Packages {
        #[command(flatten)]
        analyze: AnalyzeArgs,

        /// Output format.
        #[arg(long, value_enum, default_value_t = OutputFormat::Compact)]
        format: OutputFormat,
    },

    /// Show one node: signature, callers, call sites, internal calls and definitions.
    Show {
        /// Exact node name.
        node: String,

        #[command(flatten)]
        analyze: AnalyzeArgs,

        /// Output format.
        #[arg(long, value_enum, default_value_t = OutputFormat::Compact)]
        format: OutputFormat,
    },

    /// Find nodes by name (regex).
    Find {
        /// Name or regex pattern (e.g. "Order.*Workflow").
        pattern: String,

        #[command(flatten)]
        analyze: AnalyzeArgs,

        /// Case-insensitive pattern matching.
        #[arg(short = 'i', long)]
        case_insensitive: bool,

        /// Filter by classification (comma-separated: workflow,activity,signal,query,update,timer,function,...).
        #[arg(long, value_delimiter = ',')]
        kind: Vec<String>,

        /// Output format.
        #[arg(long, value_enum, default_value_t = OutputFormat::Compact)]
        format: OutputFormat,
    },

    /// Locate and analyze a single function outside the static graph.
    ///
    /// Searches the starting file, then its directory, then the enclosing Go module.
    Resolve {
        /// Function or method name.
        name: String,

        /// File or directory to start searching from.
        search_path: PathBuf,

        /// Record this node as the caller of the resolved function.
        #[arg(long)]
        caller: Option<String>,

        /// Output format.
        #[arg(long, value_enum, default_value_t = OutputFormat::Compact)]
        format: OutputFormat,
    },

    /// List groups of mutually recursive call sites.
    Cycles {
        #[command(flatten)]
        analyze: AnalyzeArgs,

        /// Output format.
        #[arg(long, value_enum, default_value_t = OutputFormat::Compact)]
        format: OutputFormat,
    },
}
