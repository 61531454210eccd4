//! Answer synthesis from sub-query results.

use crate::agent::answer::SubQueryOutcome;
use crate::collection::value::PropertyValue;
use crate::error::Result;
use crate::search::Hit;

/// Produces the final answer text from successful sub-queries.
pub trait AnswerSynthesizer: Send + Sync {
    fn synthesize(
        &self,
        question: &str,
        system_prompt: Option<&str>,
        outcomes: &[SubQueryOutcome],
    ) -> Result<String>;
}

/// Builds an answer from the top hit of each collection.
#[derive(Debug, Clone)]
pub struct ExtractiveSynthesizer {
    max_snippet_chars: usize,
}

impl ExtractiveSynthesizer {
    pub fn new(max_snippet_chars: usize) -> Self {
        ExtractiveSynthesizer { max_snippet_chars }
    }

    fn snippet(&self, hit: &Hit) -> Option<String> {
        let text = hit.properties.values().find_map(|value| match value {
            PropertyValue::Text(text) if !text.trim().is_empty() => Some(text.trim()),
            _ => None,
        })?;
        if text.chars().count() <= self.max_snippet_chars {
            Some(text.to_string())
        } else {
            let cut: String = text.chars().take(self.max_snippet_chars).collect();
            Some(format!("{}...", cut.trim_end()))
        }
    }
}

impl Default for ExtractiveSynthesizer {
    fn default() -> Self {
        ExtractiveSynthesizer::new(160)
    }
}

impl AnswerSynthesizer for ExtractiveSynthesizer {
    fn synthesize(
        &self,
        _question: &str,
        _system_prompt: Option<&str>,
        outcomes: &[SubQueryOutcome],
    ) -> Result<String> {
        let with_hits: Vec<&SubQueryOutcome> =
            outcomes.iter().filter(|o| !o.results.is_empty()).collect();

        if with_hits.is_empty() {
            let names: Vec<&str> = outcomes.iter().map(|o| o.collection.as_str()).collect();
            return Ok(format!(
                "No relevant objects were found in {}.",
                names.join(", ")
            ));
        }

        let total: usize = with_hits.iter().map(|o| o.results.len()).sum();
        let mut lines = vec![format!(
            "Found {total} relevant object(s) across {} collection(s).",
            with_hits.len()
        )];
        for outcome in with_hits {
            let top = &outcome.results.hits[0];
            match self.snippet(top) {
                Some(snippet) => lines.push(format!("- {}: {snippet}", outcome.collection)),
                None => lines.push(format!("- {}: object {}", outcome.collection, top.id)),
            }
        }
        Ok(lines.join("\n"))
    }
}
