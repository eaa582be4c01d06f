use super::fall_back;
use crate::gateway::Dispatcher;
use crate::prompts::{render, MICRO_LESSON, MODULE_SUMMARY, TRAINING_MODULE};
use serde::{Deserialize, Serialize};

/// The teacher cluster a training module is contextualised for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterContext {
    pub name: String,
    #[serde(rename = "type")]
    pub region_type: String,
    pub primary_issue: String,
    pub infrastructure: String,
    pub language: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ModuleSection {
    Concept { title: String, body: String },
    Activity { title: String, body: String },
    Assessment { title: String, questions: Vec<String> },
}

/// A 15-minute micro-learning module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrainingModule {
    pub title: String,
    pub duration: String,
    pub objective: String,
    pub content: Vec<ModuleSection>,
    #[serde(default)]
    pub resources: Vec<String>,
    /// Set on the templated module served when generation failed.
    #[serde(default)]
    pub is_fallback: bool,
}

impl TrainingModule {
    pub fn fallback(topic: &str, context: &ClusterContext) -> Self {
        Self {
            title: format!("Contextualized Module: {}", topic),
            duration: "15 mins".to_string(),
            objective: format!(
                "To address {} using locally available resources.",
                context.primary_issue
            ),
            content: vec![
                ModuleSection::Concept {
                    title: "Understanding the Core Issue".to_string(),
                    body: format!(
                        "Specifically in {}, we observe that {} is affecting learning outcomes. \
                         This module focuses on root cause mitigation.",
                        context.name, context.primary_issue
                    ),
                },
                ModuleSection::Activity {
                    title: "Community-Driven Solution".to_string(),
                    body: format!(
                        "Engage with parents in {} to build trust. Create a simple feedback \
                         loop using WhatsApp or local meetings.",
                        context.language
                    ),
                },
                ModuleSection::Assessment {
                    title: "Knowledge Check".to_string(),
                    questions: vec![
                        "How does local context impact this issue?".to_string(),
                        "Name one immediate strategy you can apply.".to_string(),
                    ],
                },
            ],
            resources: vec![
                "State Framework 2024".to_string(),
                "Cluster-Specific Case Studies".to_string(),
            ],
            is_fallback: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleSummary {
    pub title: String,
    pub overview: String,
    pub key_learnings: Vec<String>,
    pub practical_steps: Vec<String>,
    pub estimated_time: String,
    pub target_audience: String,
}

impl ModuleSummary {
    /// Echoes the module as given, with generic learnings.
    pub fn fallback(title: &str, description: &str) -> Self {
        Self {
            title: title.to_string(),
            overview: description.to_string(),
            key_learnings: vec![
                "Understanding core concepts".to_string(),
                "Practical implementation strategies".to_string(),
                "Assessment methods".to_string(),
                "Follow-up activities".to_string(),
            ],
            practical_steps: vec![
                "Step 1: Read through the key concepts carefully".to_string(),
                "Step 2: Plan how to apply these in your classroom".to_string(),
                "Step 3: Try one technique this week".to_string(),
            ],
            estimated_time: "30-45 minutes".to_string(),
            target_audience: "All teachers".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LessonSectionKind {
    Concept,
    Activity,
    Tip,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LessonSection {
    pub heading: String,
    pub content: String,
    #[serde(rename = "type")]
    pub kind: LessonSectionKind,
}

/// A 10-minute lesson a teacher can try the next day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MicroLesson {
    pub title: String,
    pub duration: String,
    pub sections: Vec<LessonSection>,
    #[serde(default)]
    pub quick_quiz: Vec<String>,
}

impl MicroLesson {
    pub fn fallback(topic: &str) -> Self {
        Self {
            title: format!("Getting Started with {}", topic),
            duration: "10 mins".to_string(),
            sections: vec![
                LessonSection {
                    heading: "What You'll Learn".to_string(),
                    content: format!(
                        "This lesson covers the fundamentals of {} and how to apply them in \
                         your classroom.",
                        topic
                    ),
                    kind: LessonSectionKind::Concept,
                },
                LessonSection {
                    heading: "Try This Tomorrow".to_string(),
                    content: "Start with a simple activity: Ask your students one question \
                              about what they learned yesterday before starting today's lesson."
                        .to_string(),
                    kind: LessonSectionKind::Activity,
                },
                LessonSection {
                    heading: "Pro Tip".to_string(),
                    content: "Keep a small notebook to jot down what works and what doesn't. \
                              This will help you improve over time."
                        .to_string(),
                    kind: LessonSectionKind::Tip,
                },
            ],
            quick_quiz: vec![
                "What is one thing you can try in your classroom tomorrow?".to_string(),
                "How will you know if it worked?".to_string(),
            ],
        }
    }
}

pub async fn generate_training_module(
    gateway: &Dispatcher,
    topic: &str,
    context: &ClusterContext,
) -> TrainingModule {
    let prompt = render(
        TRAINING_MODULE,
        &[
            ("topic", topic),
            ("region_type", &context.region_type),
            ("primary_issue", &context.primary_issue),
            ("infrastructure", &context.infrastructure),
            ("language", &context.language),
        ],
    );

    match gateway
        .complete_structured::<TrainingModule>(&prompt, None)
        .await
    {
        Ok(mut module) => {
            module.is_fallback = false;
            module
        }
        Err(e) => fall_back("Training module generation", &e, || {
            TrainingModule::fallback(topic, context)
        }),
    }
}

pub async fn summarize_module(gateway: &Dispatcher, title: &str, description: &str) -> ModuleSummary {
    let prompt = render(
        MODULE_SUMMARY,
        &[("title", title), ("description", description)],
    );

    match gateway.complete_structured(&prompt, None).await {
        Ok(summary) => summary,
        Err(e) => fall_back("Module summarization", &e, || {
            ModuleSummary::fallback(title, description)
        }),
    }
}

/// `challenge` is the teacher's own description of what is going wrong, if any.
pub async fn generate_micro_lesson(
    gateway: &Dispatcher,
    topic: &str,
    category: &str,
    challenge: Option<&str>,
) -> MicroLesson {
    let challenge_line = challenge
        .map(|c| format!("**Teacher's Challenge:** {}", c))
        .unwrap_or_default();
    let prompt = render(
        MICRO_LESSON,
        &[
            ("topic", topic),
            ("category", category),
            ("challenge", &challenge_line),
        ],
    );

    match gateway.complete_structured(&prompt, None).await {
        Ok(lesson) => lesson,
        Err(e) => fall_back("Micro-lesson generation", &e, || MicroLesson::fallback(topic)),
    }
}
