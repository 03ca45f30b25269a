//! Fenced code block extraction from model replies

use regex::Regex;
use std::sync::LazyLock;

/// Tried in order; the first pattern with any match decides
static FENCE_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    let patterns = [
        r"(?is)```\s*python\s*(.*?)```",
        r"(?is)```\s*py\s*(.*?)```",
        r"(?is)```\s*(.*?)```",
    ];

    patterns
        .iter()
        .filter_map(|p| Regex::new(p).ok())
        .collect()
});

/// Extract the program from a model reply.
///
/// Among the blocks matched by the most specific fence pattern, the longest
/// one is returned (the earliest on ties), trimmed. `None` means the reply
/// had no fenced block at all.
pub fn extract_code(llm_output: &str) -> Option<String> {
    for re in FENCE_PATTERNS.iter() {
        let mut best: Option<&str> = None;
        for caps in re.captures_iter(llm_output) {
            let Some(block) = caps.get(1).map(|m| m.as_str()) else {
                continue;
            };
            let longer = best.map_or(true, |b| block.chars().count() > b.chars().count());
            if longer {
                best = Some(block);
            }
        }
        if let Some(block) = best {
            return Some(block.trim().to_string());
        }
    }
    None
}
