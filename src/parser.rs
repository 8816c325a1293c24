//! Response parser
//!
//! Coerces free-form model output into manifested layers. The model is
//! instructed to wrap its answer in a single `<R>` block holding up to three
//! inner sections (`<L1>`, `<L2>`, `<L3>`). Anything less structured degrades
//! instead of failing.


use crate::db::{Layer, LayerKind};

/// Diagnostic placed in the inferential layer when no `<R>` block exists
pub const COLLAPSE_FAILED_NOTICE: &str =
    "WARNING: Axiomatic Collapse Failed. Raw output manifested.";

const RESULTANT_TAG: &str = "R";

/// Parser output
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedResponse {
    /// The untouched input text
    pub raw: String,
    /// Layers in `direct`, `structural`, `inferential` order
    pub layers: Vec<Layer>,
    /// True when the outer block was missing and the soft-failure layers
    /// were synthesized
    pub fallback: bool,
}

impl ParsedResponse {
    /// First layer of the given kind, if any
    pub fn layer(&self, kind: LayerKind) -> Option<&Layer> {
        self.layers.iter().find(|l| l.kind == kind)
    }
}

/// Parse one complete model response.
///
/// Never fails. Only the first `<R>...</R>` block is honored; inside it each
/// layer tag is matched independently (first, shortest match) and trimmed.
pub fn parse(text: &str) -> ParsedResponse {
    let Some(inner) = tagged_section(text, RESULTANT_TAG) else {
        return ParsedResponse {
            raw: text.to_string(),
            layers: vec![
                Layer::new(LayerKind::Direct, text),
                Layer::new(LayerKind::Inferential, COLLAPSE_FAILED_NOTICE),
            ],
            fallback: true,
        };
    };

    let layers = LayerKind::ALL
        .into_iter()
        .filter_map(|kind| {
            tagged_section(inner, kind.tag()).map(|body| Layer::new(kind, body.trim()))
        })
        .collect();

    ParsedResponse {
        raw: text.to_string(),
        layers,
        fallback: false,
    }
}

/// Body of the first `<tag>...</tag>` section, closing at the nearest end tag.
///
/// If the first opening tag has no closing tag after it, no later opening
/// tag can have one either, so the search stops there.
fn tagged_section<'a>(text: &'a str, tag: &str) -> Option<&'a str> {
    let open = format!("<{tag}>");
    let close = format!("</{tag}>");

    let (_, after_open) = text.split_once(open.as_str())?;
    let (body, _) = after_open.split_once(close.as_str())?;
    Some(body)
}
