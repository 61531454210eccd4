//! Output formatting for CLI commands.

use std::time::Duration;

use serde::Serialize;

use crate::agent::AgentAnswer;
use crate::cli::args::{HalberdArgs, OutputFormat};
use crate::collection::schema::CollectionConfig;
use crate::error::Result;
use crate::search::{ResultSet, ScoreKind};

/// Summary of one collection.
#[derive(Debug, Serialize)]
pub struct CollectionSummary {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub objects: usize,
    pub properties: usize,
    pub vector_spaces: Vec<String>,
}

/// Result structure for listing collections.
#[derive(Debug, Serialize)]
pub struct CollectionsList {
    pub collections: Vec<CollectionSummary>,
    pub detailed: bool,
}

/// Result structure for search operations.
#[derive(Debug, Serialize)]
pub struct SearchOutput {
    pub collection: String,
    pub query: String,
    pub results: ResultSet,
}

/// Rendering for the human output format.
pub trait HumanOutput {
    fn print_human(&self, args: &HalberdArgs);
}

/// Output a result in the requested format.
pub fn output_result<T: Serialize + HumanOutput>(result: &T, args: &HalberdArgs) -> Result<()> {
    match args.output_format {
        OutputFormat::Human => {
            result.print_human(args);
            Ok(())
        }
        OutputFormat::Json => output_json(result, args),
    }
}

/// Output in JSON format.
fn output_json<T: Serialize>(result: &T, args: &HalberdArgs) -> Result<()> {
    let json = if args.pretty {
        serde_json::to_string_pretty(result)?
    } else {
        serde_json::to_string(result)?
    };

    println!("{json}");
    Ok(())
}

impl HumanOutput for CollectionsList {
    fn print_human(&self, _args: &HalberdArgs) {
        if self.collections.is_empty() {
            println!("No collections");
            return;
        }
        for summary in &self.collections {
            if self.detailed {
                println!(
                    "{:<24} {:>8} objects  {:>3} properties  spaces: [{}]",
                    summary.name,
                    summary.objects,
                    summary.properties,
                    summary.vector_spaces.join(", ")
                );
            } else {
                println!("{}", summary.name);
            }
        }
    }
}

impl HumanOutput for CollectionConfig {
    fn print_human(&self, _args: &HalberdArgs) {
        println!("Collection: {}", self.name);
        println!("════════════");
        if let Some(description) = &self.description {
            println!("{description}");
        }
        println!();
        println!("Properties:");
        for property in &self.properties {
            let searchable = if property.is_keyword_searchable() {
                " (searchable)"
            } else {
                ""
            };
            println!("  {:<20} {}{searchable}", property.name, property.type_name());
        }
        println!();
        println!("Vector spaces:");
        for space in &self.vector_spaces {
            let vectorizer = if space.vectorizer.is_enabled() {
                ", vectorized"
            } else {
                ""
            };
            println!(
                "  {:<20} {} dims, {}{vectorizer}",
                space.name,
                space.dimension,
                space.metric.name()
            );
        }
        println!();
        println!(
            "BM25: k1={} b={}",
            self.inverted_index.bm25.k1, self.inverted_index.bm25.b
        );
        println!("Replication factor: {}", self.replication.factor);
    }
}

impl HumanOutput for SearchOutput {
    fn print_human(&self, args: &HalberdArgs) {
        if args.verbosity() > 1 {
            println!("{}: {}", self.collection, self.query);
            println!();
        }

        for (i, hit) in self.results.hits.iter().enumerate() {
            let label = match hit.score_kind {
                ScoreKind::Distance => "Distance",
                ScoreKind::Bm25 => "BM25",
                ScoreKind::Fused => "Score",
            };
            println!("Result {}: ({label}: {:.4})", i + 1, hit.score);
            println!("─────────────");
            println!("id: {}", hit.id);
            for (name, text) in &hit.rendered {
                println!("{name}: {text}");
            }
            if args.verbosity() > 1
                && let Some(explain) = &hit.metadata.explain_score
            {
                println!("explain: {explain}");
            }
            println!();
        }

        println!("{}", self.results.message);
        println!("Search time: {}", format_elapsed(self.results.elapsed));
    }
}

impl HumanOutput for AgentAnswer {
    fn print_human(&self, args: &HalberdArgs) {
        println!("{}", self.answer);
        println!();

        if !self.contributors.is_empty() {
            println!("Sources:");
            for contribution in &self.contributors {
                println!(
                    "  {} ({} objects): {}",
                    contribution.collection,
                    contribution.hit_ids.len(),
                    contribution.sub_query
                );
                if args.verbosity() > 1 {
                    for id in &contribution.hit_ids {
                        println!("    {id}");
                    }
                }
            }
        }
        if !self.failures.is_empty() {
            println!("Failures:");
            for failure in &self.failures {
                println!("  {failure}");
            }
        }
        println!("Time: {}", format_elapsed(self.elapsed));
    }
}

/// Format a duration as seconds with the millisecond equivalent.
pub fn format_elapsed(elapsed: Duration) -> String {
    format!(
        "{:.4}s ({:.2}ms)",
        elapsed.as_secs_f64(),
        elapsed.as_secs_f64() * 1000.0
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_elapsed() {
        assert_eq!(
            format_elapsed(Duration::from_micros(1500)),
            "0.0015s (1.50ms)"
        );
        assert_eq!(format_elapsed(Duration::from_secs(2)), "2.0000s (2000.00ms)");
    }
}
