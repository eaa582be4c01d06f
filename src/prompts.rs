pub const ASSESSMENT_ANALYSIS: &str = include_str!("../data/prompts/assessment_analysis.txt");
pub const TRAINING_MODULE: &str = include_str!("../data/prompts/training_module.txt");
pub const MODULE_SUMMARY: &str = include_str!("../data/prompts/module_summary.txt");
pub const MICRO_LESSON: &str = include_str!("../data/prompts/micro_lesson.txt");
pub const TRANSLATE_AND_EXPLAIN: &str = include_str!("../data/prompts/translate_explain.txt");
pub const COACH_SYSTEM: &str = include_str!("../data/prompts/coach_system.txt");
pub const KNOWLEDGE_SNIPPET: &str = include_str!("../data/prompts/knowledge_snippet.txt");
pub const VISUAL_KNOWLEDGE: &str = include_str!("../data/prompts/visual_knowledge.txt");
pub const RESOURCE_RECOMMENDATION: &str =
    include_str!("../data/prompts/resource_recommendation.txt");

/// Replace `{{key}}` placeholders in a template string.
///
/// Substitution is a single pass over the template, so values are inserted
/// verbatim even when they contain `{{...}}` themselves. Unknown placeholders
/// are left as they are.
pub fn render(template: &str, vars: &[(&str, &str)]) -> String {
    let mut result = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find("{{") {
        result.push_str(&rest[..open]);
        let after_open = &rest[open + 2..];
        let Some(close) = after_open.find("}}") else {
            result.push_str(&rest[open..]);
            return result;
        };

        let key = &after_open[..close];
        match vars.iter().find(|(name, _)| *name == key) {
            Some((_, value)) => result.push_str(value),
            None => result.push_str(&rest[open..open + 2 + close + 2]),
        }
        rest = &after_open[close + 2..];
    }

    result.push_str(rest);
    result
}
