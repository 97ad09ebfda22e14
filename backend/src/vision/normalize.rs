use shared::AnalysisResult;

pub const FALLBACK_SPECIES: &str = "Unknown";
pub const FALLBACK_FACT: &str = "This does not look like a fish to me";

/// Result returned when the model reply cannot be validated. A domain
/// answer, not a failure: it always travels with a success status.
pub fn fallback_result() -> AnalysisResult {
    AnalysisResult {
        species: FALLBACK_SPECIES.to_string(),
        facts: vec![FALLBACK_FACT.to_string()],
    }
}

/// Normalizes the raw text of a model reply into an `AnalysisResult`.
/// The model is not guaranteed to emit pure JSON, so the reply is scanned
/// for an embedded object first. Anything that fails to parse, or parses
/// without a non-empty species and a non-empty array of string facts,
/// becomes the fallback result.
pub fn normalize_reply(content: &str) -> AnalysisResult {
    parse_reply(content).unwrap_or_else(fallback_result)
}

fn parse_reply(content: &str) -> Option<AnalysisResult> {
    let candidate = extract_json_object(content).unwrap_or(content);
    let value: serde_json::Value = serde_json::from_str(candidate).ok()?;

    let species = value.get("species")?.as_str()?;
    if species.is_empty() {
        return None;
    }

    let facts = value.get("facts")?.as_array()?;
    if facts.is_empty() {
        return None;
    }
    let facts: Vec<String> = facts
        .iter()
        .map(|fact| fact.as_str().map(str::to_string))
        .collect::<Option<_>>()?;

    Some(AnalysisResult {
        species: species.to_string(),
        facts,
    })
}

/// First `{` through last `}`. Nested or repeated objects are not
/// disambiguated; the greedy match wins.
fn extract_json_object(content: &str) -> Option<&str> {
    let start = content.find('{')?;
    let end = content.rfind('}')?;
    if end < start {
        return None;
    }
    Some(&content[start..=end])
}
