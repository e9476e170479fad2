use std::path::{Path, PathBuf};

use anyhow::{Result, anyhow, bail};
use clap::Parser;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use workflow_graph::builder::{AnalysisOptions, BuildOutput, build_graph};
use workflow_graph::cli::{AnalyzeArgs, Cli, Commands};
use workflow_graph::config::WorkflowGraphConfig;
use workflow_graph::graph::NodeFilter;
use workflow_graph::query::call_tree::call_hierarchy;
use workflow_graph::query::cycles::find_cycles;
use workflow_graph::query::find::find_nodes;
use workflow_graph::query::output::{
    format_cycles, format_find_results, format_node, format_stats, format_tree, print_warnings,
};
use workflow_graph::query::package_tree::package_hierarchy;
use workflow_graph::query::Expansion;
use workflow_graph::resolver::{Resolver, find_module_root, start_location};

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Index { analyze, format } => {
            let out = run_analysis(&analyze)?;
            format_stats(out.graph.stats(), out.files_analyzed, &format);
        }

        Commands::Tree {
            analyze,
            expand,
            format,
        } => {
            let out = run_analysis(&analyze)?;
            let expansion = if expand.is_empty() {
                Expansion::expanded()
            } else {
                let mut e = Expansion::collapsed();
                for key in expand {
                    e.set(key, true);
                }
                e
            };
            format_tree(&call_hierarchy(&out.graph, &expansion), &format);
        }

        Commands::Packages { analyze, format } => {
            let out = run_analysis(&analyze)?;
            format_tree(&package_hierarchy(&out.graph, &Expansion::expanded()), &format);
        }

        Commands::Show {
            node,
            analyze,
            format,
        } => {
            let out = run_analysis(&analyze)?;
            let found = out
                .graph
                .get(&node)
                .ok_or_else(|| anyhow!("no node named '{}'", node))?;
            format_node(found, Some(&out.graph), &format, &display_root(&analyze.path));
        }

        Commands::Find {
            pattern,
            analyze,
            case_insensitive,
            kind,
            format,
        } => {
            let out = run_analysis(&analyze)?;
            let results = find_nodes(&out.graph, &pattern, case_insensitive, &kind)?;
            format_find_results(&results, &format, &display_root(&analyze.path));
        }

        Commands::Resolve {
            name,
            search_path,
            caller,
            format,
        } => {
            let (_, start_dir) = start_location(&search_path);
            let config_root = find_module_root(&start_dir).unwrap_or_else(|| start_dir.clone());
            let options =
                AnalysisOptions::new(&config_root).with_config(WorkflowGraphConfig::load(&config_root));
            let resolver = Resolver::from_options(&options);

            let resolved = match &caller {
                Some(caller) => resolver.resolve_from(caller, &name, &search_path),
                None => resolver.resolve(&name, &search_path),
            };
            let Some(node) = resolved else {
                bail!("'{}' not found from {}", name, search_path.display());
            };
            format_node(&node, None, &format, &display_root(&config_root));
        }

        Commands::Cycles { analyze, format } => {
            let out = run_analysis(&analyze)?;
            format_cycles(&find_cycles(&out.graph), &format);
        }
    }

    Ok(())
}

/// Logs go to stderr; `RUST_LOG` wins over `-v`.
fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "workflow_graph=warn",
        1 => "workflow_graph=debug",
        _ => "workflow_graph=trace",
    };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Config file first, then command-line flags on top.
fn run_analysis(args: &AnalyzeArgs) -> Result<BuildOutput> {
    let config = WorkflowGraphConfig::load(&args.path);
    let mut options = AnalysisOptions::new(&args.path).with_config(config);
    if args.include_tests {
        options.walk.include_tests = true;
    }
    if !args.exclude_dir.is_empty() {
        options.walk.exclude_dirs = args.exclude_dir.clone();
    }
    options.filter = NodeFilter::new(args.name.as_deref(), args.package.as_deref())?;

    let out = build_graph(&options)?;
    print_warnings(&out.warnings);
    Ok(out)
}

/// Node paths are canonical; print them relative to the canonical root.
fn display_root(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}
