use super::fall_back;
use crate::gateway::Dispatcher;
use crate::models::EncodedImage;
use crate::prompts::{render, ASSESSMENT_ANALYSIS};
use serde::{Deserialize, Serialize};

/// What a class assessment says about learning levels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssessmentInsights {
    pub summary: String,
    #[serde(default)]
    pub strengths: Vec<String>,
    #[serde(default)]
    pub gaps: Vec<String>,
    #[serde(default)]
    pub recommendations: Vec<String>,
}

impl AssessmentInsights {
    pub fn fallback(subject: &str) -> Self {
        Self {
            summary: format!(
                "Automatic analysis of this {} assessment is unavailable right now. \
                 Review the answer sheets manually and note recurring mistakes.",
                subject
            ),
            strengths: Vec::new(),
            gaps: Vec::new(),
            recommendations: vec![
                "Group students by the questions they missed".to_string(),
                "Re-teach the most missed concept with concrete objects".to_string(),
                "Re-assess the same concept in one week".to_string(),
            ],
        }
    }
}

/// Analyze a class assessment from the teacher's notes and, optionally, a
/// photo of an answer sheet or marks register.
pub async fn analyze_assessment(
    gateway: &Dispatcher,
    subject: &str,
    notes: &str,
    image: Option<EncodedImage>,
) -> AssessmentInsights {
    let image_hint = if image.is_some() {
        " shown in the attached photo"
    } else {
        ""
    };
    let prompt = render(
        ASSESSMENT_ANALYSIS,
        &[
            ("subject", subject),
            ("notes", notes.trim()),
            ("image_hint", image_hint),
        ],
    );

    match gateway.complete_structured(&prompt, image).await {
        Ok(insights) => insights,
        Err(e) => fall_back("Assessment analysis", &e, || {
            AssessmentInsights::fallback(subject)
        }),
    }
}
