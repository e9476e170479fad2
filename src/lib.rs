//! Static call-graph analysis for Temporal workflow codebases written in Go.
//!
//! [`builder::build_graph`] walks a source tree once and produces a
//! [`graph::WorkflowGraph`]; [`resolver::Resolver`] analyzes single functions on
//! demand; the [`query`] module derives statistics and navigable trees.

pub mod builder;
pub mod classify;
pub mod cli;
pub mod config;
pub mod graph;
pub mod parser;
pub mod query;
pub mod resolver;
pub mod walker;
