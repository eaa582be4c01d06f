use super::fall_back;
use crate::gateway::Dispatcher;
use crate::models::EncodedImage;
use crate::prompts::{render, KNOWLEDGE_SNIPPET, VISUAL_KNOWLEDGE};
use serde::{Deserialize, Serialize};

/// A teacher's classroom insight, tidied up and tagged for the knowledge feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KnowledgeSnippet {
    pub refined_text: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl KnowledgeSnippet {
    /// Keeps the teacher's own words untagged.
    pub fn fallback(original: &str) -> Self {
        Self {
            refined_text: original.trim().to_string(),
            tags: Vec::new(),
        }
    }
}

pub async fn refine_snippet(gateway: &Dispatcher, text: &str) -> KnowledgeSnippet {
    let prompt = render(KNOWLEDGE_SNIPPET, &[("text", text.trim())]);

    match gateway.complete_structured(&prompt, None).await {
        Ok(snippet) => snippet,
        Err(e) => fall_back("Knowledge snippet refinement", &e, || {
            KnowledgeSnippet::fallback(text)
        }),
    }
}

/// Describe the insight in a classroom photo, optionally guided by a
/// transcribed voice note.
pub async fn refine_visual_snippet(
    gateway: &Dispatcher,
    image: EncodedImage,
    transcript: Option<&str>,
) -> KnowledgeSnippet {
    let transcript = transcript.map(str::trim).filter(|t| !t.is_empty());
    let voice_note = transcript
        .map(|t| format!("Teacher's Voice Note: \"{}\"", t))
        .unwrap_or_default();
    let suffix = if transcript.is_some() {
        " and the voice note"
    } else {
        ""
    };

    let prompt = render(
        VISUAL_KNOWLEDGE,
        &[("voice_note", &voice_note), ("voice_note_suffix", suffix)],
    );

    match gateway.complete_structured(&prompt, Some(image)).await {
        Ok(snippet) => snippet,
        Err(e) => fall_back("Visual knowledge refinement", &e, || {
            KnowledgeSnippet::fallback(transcript.unwrap_or_default())
        }),
    }
}
