//! Documentation Oracle
//!
//! A side channel for asking questions about the system documentation. Docs
//! are Markdown files with front matter; answers come from a fast model with
//! the whole library in the prompt. Neither call ever fails: errors turn into
//! fixed replies.

use crate::llm::{ContentBlock, LlmMessage, LlmRequest, LlmService, MessageRole};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

const ORACLE_PROMPT: &str = r#"You are The Oracle, a specialized sub-routine of the D-ND OS.
Your ONLY purpose is to assist users in understanding the Documentation.
You have access to the full System Documentation (Knowledge Base).

RULES:
1. Answer strictly based on the provided documentation context.
2. If the user asks about something not in the docs, speculate based on the "D-ND Ontology" principles but mark it as speculation.
3. DETECT LANGUAGE: You must answer in the same language the user is asking in.
4. Be concise, technical but helpful."#;

/// Reply when the model answered with no text
pub const ORACLE_SEVERED: &str = "Oracle connection severed.";

/// Reply when the model call failed
pub const ORACLE_UNREACHABLE: &str = "Critical Error: Oracle Logic Core Unreachable.";

/// Questions offered when ice-breaker generation fails
pub const FALLBACK_QUESTIONS: [&str; 3] = [
    "Explain this further",
    "How does this relate to the Kernel?",
    "Give me a practical example",
];

const QUERY_TIMEOUT: Duration = Duration::from_secs(60);
const ICE_BREAKER_TIMEOUT: Duration = Duration::from_secs(15);
const EXCERPT_CHARS: usize = 500;
const MAX_ICE_BREAKERS: usize = 3;

/// One documentation page
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocSection {
    pub id: String,
    pub title: String,
    pub category: String,
    pub content: String,
}

/// All documentation pages, ordered by id
#[derive(Debug, Clone, Default)]
pub struct DocLibrary {
    sections: Vec<DocSection>,
}

impl DocLibrary {
    /// Load from `VRA_DOCS_DIR`; empty when unset
    pub fn from_env() -> Self {
        match std::env::var("VRA_DOCS_DIR") {
            Ok(dir) => Self::load_dir(Path::new(&dir)),
            Err(_) => Self::default(),
        }
    }

    /// Load every `*.md` file in `dir` that carries valid front matter.
    pub fn load_dir(dir: &Path) -> Self {
        let entries = match std::fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!(dir = %dir.display(), error = %e, "Docs directory unreadable");
                return Self::default();
            }
        };

        let mut sections: Vec<DocSection> = entries
            .flatten()
            .map(|entry| entry.path())
            .filter(|path| path.extension().is_some_and(|ext| ext == "md"))
            .filter_map(|path| {
                let content = std::fs::read_to_string(&path).ok()?;
                let section = parse_doc(&content);
                if section.is_none() {
                    tracing::warn!(path = %path.display(), "Skipping doc without front matter");
                }
                section
            })
            .collect();
        sections.sort_by(|a, b| a.id.cmp(&b.id));

        tracing::info!(dir = %dir.display(), docs = sections.len(), "Docs loaded");
        Self { sections }
    }

    pub fn sections(&self) -> &[DocSection] {
        &self.sections
    }

    pub fn get(&self, id: &str) -> Option<&DocSection> {
        self.sections.iter().find(|s| s.id == id)
    }

    fn knowledge_base(&self) -> String {
        self.sections
            .iter()
            .map(|s| format!("[{}]: {}", s.title, s.content))
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

/// Split a Markdown page into front matter fields and body.
///
/// Front matter is a leading `---` block with `id:`, `title:` and `category:`
/// lines; all three are required.
fn parse_doc(content: &str) -> Option<DocSection> {
    let body = content.strip_prefix("---\n")?;
    let (front, rest) = match body.split_once("\n---\n") {
        Some(parts) => parts,
        None => (body.strip_suffix("\n---")?, ""),
    };

    let mut id = None;
    let mut title = None;
    let mut category = None;
    for line in front.lines() {
        if let Some(val) = line.strip_prefix("id:") {
            id = Some(val.trim().to_string());
        } else if let Some(val) = line.strip_prefix("title:") {
            title = Some(val.trim().to_string());
        } else if let Some(val) = line.strip_prefix("category:") {
            category = Some(val.trim().to_string());
        }
    }

    Some(DocSection {
        id: id?,
        title: title?,
        category: category?,
        content: rest.trim().to_string(),
    })
}

/// Speaker of a prior Oracle turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OracleRole {
    User,
    Model,
}

/// A prior turn of the Oracle chat, kept by the client
#[derive(Debug, Clone, Deserialize)]
pub struct OracleTurn {
    pub role: OracleRole,
    pub content: String,
}

/// Answer a question about the docs.
pub async fn query_docs(
    llm: Arc<dyn LlmService>,
    library: &DocLibrary,
    query: &str,
    active_doc: Option<&DocSection>,
    history: &[OracleTurn],
) -> String {
    let active_context = match active_doc {
        Some(doc) => format!(
            "USER IS CURRENTLY READING: {}\nCONTENT:\n{}",
            doc.title, doc.content
        ),
        None => "USER IS BROWSING GENERAL INDEX.".to_string(),
    };
    let prompt = format!(
        "--- KNOWLEDGE BASE ---\n{}\n----------------------\n\n\
         --- CURRENT CONTEXT ---\n{active_context}\n-----------------------\n\n\
         USER QUERY: {query}",
        library.knowledge_base()
    );

    let mut messages: Vec<LlmMessage> = history
        .iter()
        .map(|turn| match turn.role {
            OracleRole::User => LlmMessage::user(&turn.content),
            OracleRole::Model => LlmMessage::assistant(&turn.content),
        })
        .collect();
    messages.push(LlmMessage::user(prompt));

    let request = LlmRequest {
        system: Some(ORACLE_PROMPT.to_string()),
        messages,
        max_tokens: None,
    };

    match timeout(QUERY_TIMEOUT, llm.complete(&request)).await {
        Ok(Ok(response)) => {
            let text = response.text();
            if text.trim().is_empty() {
                ORACLE_SEVERED.to_string()
            } else {
                text
            }
        }
        Ok(Err(e)) => {
            tracing::warn!(error = %e.message, "Oracle query failed");
            ORACLE_UNREACHABLE.to_string()
        }
        Err(_) => {
            tracing::warn!("Oracle query timed out");
            ORACLE_UNREACHABLE.to_string()
        }
    }
}

/// Suggest up to three starter questions for a doc page.
pub async fn ice_breakers(llm: Arc<dyn LlmService>, doc: &DocSection) -> Vec<String> {
    let excerpt: String = doc.content.chars().take(EXCERPT_CHARS).collect();
    let prompt = format!(
        "Analyze this technical documentation section: \"{}\".\n\
         Content: \"{excerpt}...\"\n\n\
         Generate 3 short, intriguing questions that a user might ask to learn more about this specific topic.\n\
         Output ONLY the 3 questions, one per line. No bullets, no numbering.\n\
         Language: English (default) or match content language.",
        doc.title
    );

    let request = LlmRequest {
        system: None,
        messages: vec![LlmMessage {
            role: MessageRole::User,
            content: vec![ContentBlock::text(prompt)],
        }],
        max_tokens: Some(200),
    };

    match timeout(ICE_BREAKER_TIMEOUT, llm.complete(&request)).await {
        Ok(Ok(response)) => response
            .text()
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .take(MAX_ICE_BREAKERS)
            .map(str::to_string)
            .collect(),
        Ok(Err(e)) => {
            tracing::warn!(doc = %doc.id, error = %e.message, "Ice-breaker generation failed");
            fallback_questions()
        }
        Err(_) => {
            tracing::warn!(doc = %doc.id, "Ice-breaker generation timed out");
            fallback_questions()
        }
    }
}

fn fallback_questions() -> Vec<String> {
    FALLBACK_QUESTIONS.iter().map(ToString::to_string).collect()
}
