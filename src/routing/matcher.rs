//! Capability matching
//!
//! Maps free-text requirements onto tools whose declared capability tags,
//! name or description overlap the requirement. Exact tag hits weigh more
//! than fuzzy hits; tools with no overlap at all are dropped.

use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::sync::Arc;

use crate::catalog::ToolRecord;

/// Share of the score carried by capability tags
pub const TAG_WEIGHT: f64 = 0.7;
/// Share of the score carried by name/description tokens
pub const TEXT_WEIGHT: f64 = 0.3;
/// Credit for a tag whose every token appears in the requirement
pub const EXACT_MATCH: f64 = 1.0;
/// Credit for substring or shared-stem matches
pub const FUZZY_MATCH: f64 = 0.5;

const STOPWORDS: &[&str] = &[
    "a", "an", "and", "any", "are", "as", "at", "be", "by", "can", "could", "do", "does", "for", "from", "i", "in",
    "into", "is", "it", "its", "me", "my", "of", "on", "or", "please", "should", "some", "that", "the", "these",
    "this", "those", "to", "us", "we", "with", "would", "you",
];

/// A tool that plausibly satisfies a requirement
#[derive(Debug, Clone)]
pub struct Candidate {
    pub tool: Arc<ToolRecord>,
    /// In (0, 1]
    pub capability_match_score: f64,
}

/// Normalized requirement text
#[derive(Debug, Clone)]
struct Requirement {
    text: String,
    tokens: BTreeSet<String>,
    content: BTreeSet<String>,
}

impl Requirement {
    fn parse(raw: &str) -> Self {
        let text = raw.to_lowercase();
        let tokens: BTreeSet<String> = tokenize(&text).collect();
        let content = tokens.iter().filter(|t| !is_stopword(t)).cloned().collect();
        Self { text, tokens, content }
    }
}

/// Split lowercase text into alphanumeric runs
fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(String::from)
}

fn is_stopword(token: &str) -> bool {
    STOPWORDS.binary_search(&token).is_ok()
}

/// Two tokens share a stem when their common prefix covers most of the shorter one
fn shares_stem(a: &str, b: &str) -> bool {
    let shorter = a.chars().count().min(b.chars().count());
    if shorter < 4 {
        return false;
    }
    let common = a.chars().zip(b.chars()).take_while(|(x, y)| x == y).count();
    common >= 4 && (common as f64) >= 0.75 * shorter as f64
}

/// Tags of non-ASCII scripts are often written without spaces, so they are
/// looked up as substrings of the requirement.
fn substring_eligible(tag: &str) -> bool {
    if tag.is_ascii() { tag.len() >= 4 } else { tag.chars().count() >= 2 }
}

/// Matches requirement text against catalog snapshots
#[derive(Debug, Clone, Copy, Default)]
pub struct CapabilityMatcher;

impl CapabilityMatcher {
    pub fn new() -> Self {
        Self
    }

    /// Produce candidates ordered by match score, then reliability, then id
    pub fn match_requirement(&self, requirement: &str, snapshot: &[Arc<ToolRecord>]) -> Vec<Candidate> {
        let requirement = Requirement::parse(requirement);
        if requirement.tokens.is_empty() {
            return Vec::new();
        }

        let mut candidates: Vec<Candidate> = snapshot
            .iter()
            .filter_map(|tool| {
                let score = score_tool(&requirement, tool);
                (score > 0.0).then(|| Candidate {
                    tool: Arc::clone(tool),
                    capability_match_score: score,
                })
            })
            .collect();

        candidates.sort_by(compare_candidates);
        candidates
    }
}

fn compare_candidates(a: &Candidate, b: &Candidate) -> Ordering {
    b.capability_match_score
        .total_cmp(&a.capability_match_score)
        .then_with(|| {
            b.tool
                .performance_metrics
                .reliability_score
                .total_cmp(&a.tool.performance_metrics.reliability_score)
        })
        .then_with(|| a.tool.id.cmp(&b.tool.id))
}

fn score_tool(requirement: &Requirement, tool: &ToolRecord) -> f64 {
    let tag_score = if tool.capabilities.is_empty() {
        0.0
    } else {
        let total: f64 = tool.capabilities.iter().map(|tag| tag_match(tag, requirement)).sum();
        total / tool.capabilities.len() as f64
    };

    let text_score = text_match(requirement, tool);
    (TAG_WEIGHT * tag_score + TEXT_WEIGHT * text_score).clamp(0.0, 1.0)
}

fn tag_match(tag: &str, requirement: &Requirement) -> f64 {
    let tag_tokens: Vec<String> = tokenize(tag).collect();
    if !tag_tokens.is_empty() && tag_tokens.iter().all(|t| requirement.tokens.contains(t)) {
        return EXACT_MATCH;
    }
    if substring_eligible(tag) && requirement.text.contains(tag) {
        return FUZZY_MATCH;
    }
    let stem_hit = tag_tokens
        .iter()
        .any(|t| requirement.content.iter().any(|r| shares_stem(t, r)));
    if stem_hit { FUZZY_MATCH } else { 0.0 }
}

/// Fraction of the requirement's content words found in the tool's name or description
fn text_match(requirement: &Requirement, tool: &ToolRecord) -> f64 {
    if requirement.content.is_empty() {
        return 0.0;
    }
    let text = format!("{} {}", tool.name, tool.description).to_lowercase();
    let words: BTreeSet<String> = tokenize(&text).filter(|t| !is_stopword(t)).collect();
    if words.is_empty() {
        return 0.0;
    }

    let hits: f64 = requirement
        .content
        .iter()
        .map(|r| {
            if words.contains(r) {
                EXACT_MATCH
            } else if words.iter().any(|w| shares_stem(w, r)) {
                FUZZY_MATCH
            } else {
                0.0
            }
        })
        .sum();
    hits / requirement.content.len() as f64
}
