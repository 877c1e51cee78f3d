//! Turning raw model output into an [`Enrichment`].
//!
//! Models wrap JSON in code fences, prepend chatter, or emit `<think>` blocks
//! despite being told not to. The first balanced-looking `{ ... }` span is
//! taken as the answer.

use std::sync::OnceLock;

use regex::Regex;
use serde::Deserialize;

use scaffold_core::{Enrichment, Error, Result};

fn think_block() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)<think>.*?(</think>|$)").expect("static regex"))
}

#[derive(Deserialize)]
struct RawEnrichment {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    tags: Option<TagsField>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum TagsField {
    List(Vec<String>),
    Csv(String),
}

impl TagsField {
    fn into_vec(self) -> Vec<String> {
        match self {
            TagsField::List(tags) => tags,
            TagsField::Csv(s) => s.split(',').map(str::to_string).collect(),
        }
    }
}

/// Extract the JSON object from a model response.
pub fn extract_json_object(response: &str) -> Option<&str> {
    let start = response.find('{')?;
    let end = response.rfind('}')?;
    (end > start).then(|| &response[start..=end])
}

/// Parse a model response into a normalized enrichment.
pub fn parse_enrichment(response: &str) -> Result<Enrichment> {
    let cleaned = think_block().replace_all(response, "");
    let json = extract_json_object(&cleaned).ok_or_else(|| {
        Error::Upstream(format!(
            "describe response contains no JSON object: {}",
            truncate(response, 120)
        ))
    })?;
    let raw: RawEnrichment = serde_json::from_str(json)
        .map_err(|e| Error::Upstream(format!("describe response is not valid JSON: {}", e)))?;

    Enrichment {
        title: raw.title.unwrap_or_default(),
        tags: raw.tags.map(TagsField::into_vec).unwrap_or_default(),
    }
    .normalized()
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
