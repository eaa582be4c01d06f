use super::fall_back;
use crate::gateway::Dispatcher;
use crate::prompts::{render, TRANSLATE_AND_EXPLAIN};
use serde::{Deserialize, Serialize};

/// A regional-language module rendered into plain English.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslatedModule {
    pub english_title: String,
    pub explanation: String,
    #[serde(default)]
    pub action_items: Vec<String>,
}

impl TranslatedModule {
    /// Passes the original text through untranslated.
    pub fn fallback(original_title: &str, content: &str) -> Self {
        Self {
            english_title: original_title.to_string(),
            explanation: content.to_string(),
            action_items: vec![
                "Review the module content".to_string(),
                "Identify applicable techniques".to_string(),
                "Implement in your classroom".to_string(),
            ],
        }
    }
}

pub async fn translate_and_explain(
    gateway: &Dispatcher,
    original_title: &str,
    content: &str,
) -> TranslatedModule {
    let prompt = render(
        TRANSLATE_AND_EXPLAIN,
        &[("title", original_title), ("content", content)],
    );

    match gateway.complete_structured(&prompt, None).await {
        Ok(translated) => translated,
        Err(e) => fall_back("Module translation", &e, || {
            TranslatedModule::fallback(original_title, content)
        }),
    }
}
