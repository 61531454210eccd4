//! Command line argument parsing for the halberd CLI using clap.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};

use crate::query::{QueryKind, QueryParams};

/// Halberd - search and agent queries over in-memory collections
#[derive(Parser, Debug, Clone)]
#[command(name = "halberd")]
#[command(about = "Keyword, vector, hybrid and agent queries over in-memory collections")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(long_about = None)]
pub struct HalberdArgs {
    /// Verbosity level (0=quiet, 1=normal, 2=verbose, 3=debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (overrides verbose)
    #[arg(short, long)]
    pub quiet: bool,

    /// Output format
    #[arg(short = 'f', long = "format", default_value = "human")]
    pub output_format: OutputFormat,

    /// Pretty-print JSON output
    #[arg(long)]
    pub pretty: bool,

    /// Dataset file (JSON) with collection definitions and objects
    #[arg(short, long, env = "HALBERD_DATA", value_name = "DATASET")]
    pub data: Option<PathBuf>,

    /// Configuration file (TOML)
    #[arg(short, long, env = "HALBERD_CONFIG", value_name = "CONFIG")]
    pub config: Option<PathBuf>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

impl HalberdArgs {
    /// Get the effective verbosity level
    pub fn verbosity(&self) -> u8 {
        if self.quiet {
            0
        } else {
            match self.verbose {
                0 => 1,
                n => n,
            }
        }
    }
}

/// Available CLI commands
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// List collections in the dataset
    Collections(CollectionsArgs),

    /// Show a collection's schema
    Schema(SchemaArgs),

    /// Search one collection
    Search(SearchArgs),

    /// Ask a question across collections
    Ask(AskArgs),
}

/// Arguments for listing collections
#[derive(Parser, Debug, Clone)]
pub struct CollectionsArgs {
    /// Include object counts and vector spaces
    #[arg(short, long)]
    pub long: bool,
}

/// Arguments for showing a schema
#[derive(Parser, Debug, Clone)]
pub struct SchemaArgs {
    /// Collection name
    #[arg(value_name = "COLLECTION")]
    pub collection: String,
}

/// Arguments for searching
#[derive(Parser, Debug, Clone)]
pub struct SearchArgs {
    /// Collection name
    #[arg(value_name = "COLLECTION")]
    pub collection: String,

    /// Query text, or the query vector for `--type vector` (e.g. "0.1,0.2,0.3")
    #[arg(value_name = "QUERY")]
    pub query: String,

    /// Search type
    #[arg(short = 't', long = "type", default_value = "keyword")]
    pub search_type: SearchType,

    /// Maximum number of results to return
    #[arg(short, long)]
    pub limit: Option<usize>,

    /// Hybrid blend weight; 0 is pure keyword, 1 is pure vector
    #[arg(short, long)]
    pub alpha: Option<f32>,

    /// Target vector space
    #[arg(long, value_name = "SPACE")]
    pub target: Option<String>,

    /// Explicit query vector for hybrid search
    #[arg(long, value_name = "VECTOR", allow_hyphen_values = true)]
    pub vector: Option<String>,
}

impl SearchArgs {
    /// Optional parameters as passed to the query normalizer.
    pub fn params(&self) -> QueryParams {
        QueryParams {
            limit: self.limit,
            alpha: self.alpha,
            target_space: self.target.clone(),
            vector: self.vector.clone(),
        }
    }
}

/// Search types available in CLI
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchType {
    /// BM25 keyword search
    Keyword,
    /// Vector similarity search
    Vector,
    /// Keyword and vector search, fused
    Hybrid,
}

impl From<SearchType> for QueryKind {
    fn from(search_type: SearchType) -> Self {
        match search_type {
            SearchType::Keyword => QueryKind::Keyword,
            SearchType::Vector => QueryKind::Vector,
            SearchType::Hybrid => QueryKind::Hybrid,
        }
    }
}

/// Arguments for agent questions
#[derive(Parser, Debug, Clone)]
pub struct AskArgs {
    /// Natural-language question
    #[arg(value_name = "QUESTION")]
    pub question: String,

    /// Collections to consult (comma-separated or repeated)
    #[arg(short, long = "collection", value_delimiter = ',', required = true)]
    pub collections: Vec<String>,

    /// Instructions passed to the planner and synthesizer
    #[arg(short, long)]
    pub system_prompt: Option<String>,

    /// Timeout in seconds
    #[arg(short, long)]
    pub timeout: Option<u64>,
}

/// Output formats for CLI
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable output
    Human,
    /// JSON output
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_command() {
        let args = HalberdArgs::try_parse_from([
            "halberd",
            "--data",
            "data/articles.json",
            "search",
            "Articles",
            "weaviate",
            "--type",
            "hybrid",
            "--alpha",
            "0.25",
            "--limit",
            "3",
        ])
        .unwrap();

        assert_eq!(args.data, Some(PathBuf::from("data/articles.json")));
        if let Command::Search(search_args) = args.command {
            assert_eq!(search_args.collection, "Articles");
            assert_eq!(search_args.query, "weaviate");
            assert_eq!(search_args.search_type, SearchType::Hybrid);
            let params = search_args.params();
            assert_eq!(params.limit, Some(3));
            assert_eq!(params.alpha, Some(0.25));
        } else {
            panic!("Expected Search command");
        }
    }

    #[test]
    fn test_ask_command() {
        let args = HalberdArgs::try_parse_from([
            "halberd",
            "ask",
            "What is HNSW?",
            "-c",
            "Articles,Authors",
            "--collection",
            "Notes",
            "--timeout",
            "30",
        ])
        .unwrap();

        if let Command::Ask(ask_args) = args.command {
            assert_eq!(ask_args.collections, vec!["Articles", "Authors", "Notes"]);
            assert_eq!(ask_args.timeout, Some(30));
            assert!(ask_args.system_prompt.is_none());
        } else {
            panic!("Expected Ask command");
        }
    }

    #[test]
    fn test_ask_requires_collections() {
        assert!(HalberdArgs::try_parse_from(["halberd", "ask", "question"]).is_err());
    }

    #[test]
    fn test_verbosity_levels() {
        let args = HalberdArgs::try_parse_from(["halberd", "collections"]).unwrap();
        assert_eq!(args.verbosity(), 1);

        let args = HalberdArgs::try_parse_from(["halberd", "-vv", "collections"]).unwrap();
        assert_eq!(args.verbosity(), 2);

        let args = HalberdArgs::try_parse_from(["halberd", "--quiet", "collections"]).unwrap();
        assert_eq!(args.verbosity(), 0);
    }

    #[test]
    fn test_output_format() {
        let args =
            HalberdArgs::try_parse_from(["halberd", "--format", "json", "collections"]).unwrap();
        assert_eq!(args.output_format, OutputFormat::Json);
    }
}
