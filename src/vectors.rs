//! Expert vectors
//!
//! Named cognitive-mode labels. They carry no behavior of their own: the
//! console highlights a subset while weaving a response, and a user may pin
//! one as an override for a single request.

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Chance that a vector lights up during weaving when nothing is pinned
const ACTIVATION_PROBABILITY: f64 = 0.4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VectorCategory {
    Analytic,
    Synthetic,
    Metacognitive,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpertVector {
    pub id: String,
    pub name: String,
    pub description: String,
    pub category: VectorCategory,
    pub active: bool,
}

impl ExpertVector {
    fn new(id: &str, name: &str, description: &str, category: VectorCategory) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            description: description.to_string(),
            category,
            active: false,
        }
    }
}

/// Built-in vector catalogue, all inactive
pub fn initial_vectors() -> Vec<ExpertVector> {
    use VectorCategory::{Analytic, Metacognitive, Synthetic};

    vec![
        ExpertVector::new(
            "ve-faro",
            "vE_Faro",
            "Intent Isolation & Focus Anchoring",
            Analytic,
        ),
        ExpertVector::new(
            "ve-sonar",
            "vE_Sonar",
            "Deep Semantic Scan & Latent Pattern Detection",
            Analytic,
        ),
        ExpertVector::new(
            "ve-crit",
            "vE_LenteCritica",
            "Axiomatic Integrity & Bias Filter",
            Metacognitive,
        ),
        ExpertVector::new(
            "ve-brainstorm",
            "vE_Brainstorm",
            "Divergent Generator",
            Synthetic,
        ),
        ExpertVector::new(
            "ve-planner",
            "vE_Planner",
            "Sequential Architect",
            Analytic,
        ),
        ExpertVector::new(
            "ve-writer",
            "vE_Writer",
            "Content Synthesizer",
            Synthetic,
        ),
        ExpertVector::new(
            "ve-fucina",
            "vE_Fucina",
            "Autopoietic Evolution Engine",
            Metacognitive,
        ),
    ]
}

/// Light up vectors for the weaving phase.
///
/// With a pinned name exactly that vector is active (none, if the name is
/// unknown). Otherwise each vector is drawn independently.
pub fn highlight<R: Rng + ?Sized>(
    vectors: &mut [ExpertVector],
    pinned: Option<&str>,
    rng: &mut R,
) {
    for vector in vectors.iter_mut() {
        vector.active = match pinned {
            Some(name) => vector.name == name,
            None => rng.gen_bool(ACTIVATION_PROBABILITY),
        };
    }
}

/// Switch every vector off
pub fn reset(vectors: &mut [ExpertVector]) {
    for vector in vectors.iter_mut() {
        vector.active = false;
    }
}
