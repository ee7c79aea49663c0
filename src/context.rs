//! Query context builder.
//!
//! Picks summary statistics for a free-text question from an ordered rule
//! table. Each rule pairs a predicate over the question with a producer over
//! the dataset; the output is plain text handed to the Q&A collaborator.

use crate::cadre::CADRE_COLUMN;
use crate::dataset;
use polars::prelude::DataFrame;
use tracing::debug;

/// Upper bound on the context text, in characters.
pub const MAX_CONTEXT_CHARS: usize = 4000;

/// Rows listed in a top-N value-count table.
pub const TOP_N: usize = 5;

const SUPERLATIVES: [&str; 4] = ["most", "highest", "maximum", "top"];

/// Which columns play which part in the summaries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnRoles {
    pub district: String,
    pub designation: String,
    pub cadre: String,
}

impl Default for ColumnRoles {
    fn default() -> Self {
        Self {
            district: "district_name".to_string(),
            designation: "designation_title".to_string(),
            cadre: CADRE_COLUMN.to_string(),
        }
    }
}

/// A question normalized for keyword checks.
#[derive(Debug, Clone)]
pub struct Question {
    text: String,
    lower: String,
}

impl Question {
    pub fn new(text: &str) -> Self {
        Self {
            text: text.to_string(),
            lower: text.to_lowercase(),
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn mentions(&self, keyword: &str) -> bool {
        self.lower.contains(keyword)
    }

    pub fn is_superlative(&self) -> bool {
        SUPERLATIVES.iter().any(|w| self.lower.contains(w))
    }
}

pub struct ContextRule {
    pub name: &'static str,
    pub applies: fn(&Question) -> bool,
    pub produce: fn(&DataFrame, &ColumnRoles) -> Option<String>,
}

/// Evaluated in order; every matching rule contributes one section.
pub const CONTEXT_RULES: &[ContextRule] = &[
    ContextRule {
        name: "overview",
        applies: always,
        produce: overview,
    },
    ContextRule {
        name: "district_counts",
        applies: asks_about_district,
        produce: district_counts,
    },
    ContextRule {
        name: "cadre_counts",
        applies: asks_about_cadre,
        produce: cadre_counts,
    },
    ContextRule {
        name: "designation_counts",
        applies: asks_about_designation,
        produce: designation_counts,
    },
    ContextRule {
        name: "top_district",
        applies: asks_for_top_district,
        produce: top_district,
    },
];

fn always(_: &Question) -> bool {
    true
}

fn asks_about_district(q: &Question) -> bool {
    q.mentions("district")
}

fn asks_about_cadre(q: &Question) -> bool {
    q.mentions("cadre")
}

fn asks_about_designation(q: &Question) -> bool {
    q.mentions("designation")
}

fn asks_for_top_district(q: &Question) -> bool {
    q.is_superlative() && q.mentions("district")
}

/// Names of the rules that fire for a question, in order.
pub fn matching_rules(question: &str) -> Vec<&'static str> {
    let question = Question::new(question);
    CONTEXT_RULES
        .iter()
        .filter(|rule| (rule.applies)(&question))
        .map(|rule| rule.name)
        .collect()
}

pub fn build_context(df: &DataFrame, question: &str, roles: &ColumnRoles) -> String {
    let question = Question::new(question);
    let mut sections = Vec::new();

    for rule in CONTEXT_RULES.iter().filter(|rule| (rule.applies)(&question)) {
        match (rule.produce)(df, roles) {
            Some(section) => sections.push(section),
            None => debug!("Context rule '{}' produced nothing", rule.name),
        }
    }

    truncate(sections.join("\n"), MAX_CONTEXT_CHARS)
}

fn truncate(text: String, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => text[..cut].to_string(),
        None => text,
    }
}

fn counts(df: &DataFrame, column: &str) -> Option<Vec<(String, usize)>> {
    if !dataset::has_column(df, column) {
        return None;
    }
    dataset::value_counts(df, column).ok()
}

fn count_lines(counts: &[(String, usize)]) -> String {
    counts
        .iter()
        .map(|(value, count)| format!("{}: {}", value, count))
        .collect::<Vec<_>>()
        .join("\n")
}

fn overview(df: &DataFrame, _roles: &ColumnRoles) -> Option<String> {
    Some(format!(
        "Total Records: {}\nAvailable Columns: {}",
        df.height(),
        dataset::column_names(df).join(", ")
    ))
}

fn district_counts(df: &DataFrame, roles: &ColumnRoles) -> Option<String> {
    let counts = counts(df, &roles.district)?;
    let top: Vec<_> = counts.iter().take(TOP_N).cloned().collect();
    Some(format!(
        "\nDistrict Information:\nTotal Districts: {}\nTop Districts by Count:\n{}",
        counts.len(),
        count_lines(&top)
    ))
}

fn cadre_counts(df: &DataFrame, roles: &ColumnRoles) -> Option<String> {
    let counts = counts(df, &roles.cadre)?;
    Some(format!("\nCadre Information:\n{}", count_lines(&counts)))
}

fn designation_counts(df: &DataFrame, roles: &ColumnRoles) -> Option<String> {
    let counts = counts(df, &roles.designation)?;
    let top: Vec<_> = counts.iter().take(TOP_N).cloned().collect();
    Some(format!("\nDesignation Information:\n{}", count_lines(&top)))
}

fn top_district(df: &DataFrame, roles: &ColumnRoles) -> Option<String> {
    let counts = counts(df, &roles.district)?;
    let (name, count) = counts.first()?;
    Some(format!("\nHighest Count District:\n{}: {} records", name, count))
}
