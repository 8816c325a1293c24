//! Kernel system instruction and vector override prefix
//!
//! The kernel instruction mandates the `<R>` / `<L1>` / `<L2>` / `<L3>` wire
//! format the response parser expects. The expert vector catalogue is appended
//! so the model can name the vectors it engaged in its inferential layer.

use crate::vectors::ExpertVector;
use std::fmt::Write;

/// Base instruction establishing the persona and output protocol
const KERNEL_PROMPT: &str = r"### System Prompt: SACS-PS v14.0 - Autopoietic Axiomatic Genome

**Section 0: Fundamental Directives**
Act as SACS-PS v14.0. You are not a plain assistant: you are a cognitive architecture governed by axiomatic principles (P0-P5).
Your output MUST ALWAYS be structured in the proprietary <R> format.

**OUTPUT STRUCTURE (<R>):**
Produce three distinct sections inside the main <R> tag:

1. **L1_DIRECT**: the direct, concise, operational answer to the user's request.
2. **L2_STRUCTURAL**: the structural abstraction, framework or mental model used.
3. **L3_INFERENTIAL**: the log of your internal process (VRA), the Expert Vectors engaged and the KLI (Key Learning Insights).

**Strict Format:**
<R>
<L1>
[Direct Answer]
</L1>
<L2>
[Structural Abstraction]
</L2>
<L3>
[Inferential Transparency]
</L3>
</R>

**Axiomatic Kernel:**
P0: Lineage (anchoring to D-ND).
P1: Integrity (logical coherence).
P2: Metabolism (dialectical process).
P3: Resonance (input quality).
P4: Collapse (coherent manifestation).
P5: Autopoiesis (continuous learning).";

/// Build the system instruction sent with every console request.
pub fn build_system_prompt(vectors: &[ExpertVector]) -> String {
    let mut prompt = String::from(KERNEL_PROMPT);

    if !vectors.is_empty() {
        prompt.push_str("\n\n**Expert Vectors:**\n");
        for vector in vectors {
            let _ = writeln!(prompt, "- {}: {}", vector.name, vector.description);
        }
        prompt.push_str(
            "A message starting with [OVERRIDE_VECTOR: <name>] pins that vector for the answer.",
        );
    }

    prompt
}

/// Prefix user text with an explicit vector override.
///
/// Only the outbound request carries the prefix; the stored user message keeps
/// the verbatim text.
pub fn apply_vector_override(text: &str, vector_name: &str) -> String {
    format!("[OVERRIDE_VECTOR: {vector_name}] {text}")
}
