//! Key learning insight (KLI) distillation
//!
//! An insight is a short takeaway lifted from the inferential layer of a
//! manifested response.

use crate::db::LayerKind;
use crate::parser::ParsedResponse;
use regex::Regex;
use std::sync::LazyLock;

/// Maximum characters kept from the inferential layer
pub const MAX_INSIGHT_CHARS: usize = 180;

const ELLIPSIS: &str = "...";

static KLI_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)KLI:|Key Learning Insight:").expect("KLI prefix pattern is valid")
});

/// Distill the insight text for a parsed response.
///
/// Returns `None` when there is no inferential layer, and also for a
/// soft-failed parse: its inferential layer is only the collapse diagnostic.
pub fn distill(parsed: &ParsedResponse) -> Option<String> {
    if parsed.fallback {
        return None;
    }
    let layer = parsed.layer(LayerKind::Inferential)?;
    Some(condense(&layer.content))
}

/// Strip the first KLI label, trim and truncate to [`MAX_INSIGHT_CHARS`].
fn condense(text: &str) -> String {
    let stripped = KLI_PREFIX.replace(text, "");
    let stripped = stripped.trim();

    if stripped.chars().nth(MAX_INSIGHT_CHARS).is_none() {
        return stripped.to_string();
    }
    let mut out: String = stripped.chars().take(MAX_INSIGHT_CHARS).collect();
    out.push_str(ELLIPSIS);
    out
}
