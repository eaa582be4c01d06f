//! Product features built on the gateway
//!
//! Each adapter renders its prompt, dispatches it, and on any terminal error
//! logs a warning and hands back its own statically-defined fallback, so the
//! caller always gets a value it can render.

pub mod assessment;
pub mod knowledge;
pub mod module;
pub mod resources;
pub mod simulation;
pub mod translation;

pub use assessment::{analyze_assessment, AssessmentInsights};
pub use knowledge::{refine_snippet, refine_visual_snippet, KnowledgeSnippet};
pub use module::{
    generate_micro_lesson, generate_training_module, summarize_module, ClusterContext,
    LessonSection, LessonSectionKind, MicroLesson, ModuleSection, ModuleSummary, TrainingModule,
};
pub use resources::{fallback_resource_plan, recommend_resources, ResourcePlan, TlmActivity};
pub use simulation::{coach_reply, ChatTurn, Speaker, FALLBACK_COACH_REPLY};
pub use translation::{translate_and_explain, TranslatedModule};

use crate::Error;

/// Log a terminal failure and substitute the feature's fallback.
pub(crate) fn fall_back<T>(feature: &str, error: &Error, fallback: impl FnOnce() -> T) -> T {
    tracing::warn!("{} failed, using fallback: {}", feature, error);
    fallback()
}

#[cfg(test)]
pub(crate) fn test_gateway(transport: &crate::ai::MockTransport) -> crate::gateway::Dispatcher {
    use crate::gateway::{Dispatcher, RetryPolicy};
    use std::sync::Arc;
    use std::time::Duration;

    Dispatcher::new(Arc::new(transport.clone())).with_policy(RetryPolicy {
        rate_limit_backoff: Duration::from_millis(1),
        max_jitter: Duration::ZERO,
        network_retry_delay: Duration::from_millis(1),
        ..RetryPolicy::default()
    })
}
