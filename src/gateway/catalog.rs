//! Ordered model candidates per request class.
//!
//! Order encodes preference and doubles as the fallback sequence. The vision
//! list is walked monotonically when a model is rejected; the text list only
//! ever toggles between its first two entries when capacity runs out.

use super::FailureReason;
use crate::models::RequestClass;
use crate::{Error, Result};
use std::collections::HashSet;
use std::fmt;

pub const DEFAULT_TEXT_MODELS: &[&str] = &["llama-3.3-70b-versatile", "llama-3.1-8b-instant"];

pub const DEFAULT_VISION_MODELS: &[&str] = &[
    "meta-llama/llama-4-scout-17b-16e-instruct",
    "meta-llama/llama-4-maverick-17b-128e-instruct",
    "llama-3.2-90b-vision-preview",
];

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ModelCandidate {
    pub id: String,
    pub class: RequestClass,
}

impl ModelCandidate {
    fn new(id: impl Into<String>, class: RequestClass) -> Self {
        Self {
            id: id.into(),
            class,
        }
    }
}

impl fmt::Display for ModelCandidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.id)
    }
}

#[derive(Debug, Clone)]
pub struct ModelCatalog {
    text: Vec<ModelCandidate>,
    vision: Vec<ModelCandidate>,
}

impl Default for ModelCatalog {
    fn default() -> Self {
        Self {
            text: DEFAULT_TEXT_MODELS
                .iter()
                .map(|id| ModelCandidate::new(*id, RequestClass::Text))
                .collect(),
            vision: DEFAULT_VISION_MODELS
                .iter()
                .map(|id| ModelCandidate::new(*id, RequestClass::Vision))
                .collect(),
        }
    }
}

impl ModelCatalog {
    pub fn new(text: Vec<String>, vision: Vec<String>) -> Result<Self> {
        if text.is_empty() {
            return Err(Error::Config("text model list must not be empty".to_string()));
        }
        if vision.is_empty() {
            return Err(Error::Config(
                "vision model list must not be empty".to_string(),
            ));
        }

        Ok(Self {
            text: candidates(text, RequestClass::Text),
            vision: candidates(vision, RequestClass::Vision),
        })
    }

    pub fn candidates(&self, class: RequestClass) -> &[ModelCandidate] {
        match class {
            RequestClass::Text => &self.text,
            RequestClass::Vision => &self.vision,
        }
    }

    /// Preferred candidate for `class`.
    pub fn initial_model(&self, class: RequestClass) -> ModelCandidate {
        // Lists are non-empty by construction.
        self.candidates(class)[0].clone()
    }

    /// Candidate to use after `current` failed for `reason`.
    ///
    /// `None` means there is nothing left to try for this request.
    pub fn next_model(
        &self,
        current: &ModelCandidate,
        class: RequestClass,
        reason: FailureReason,
    ) -> Option<ModelCandidate> {
        match (reason, class) {
            (FailureReason::ModelUnavailable, RequestClass::Vision) => {
                let position = self.vision.iter().position(|m| m == current)?;
                self.vision.get(position + 1).cloned()
            }
            (FailureReason::ModelUnavailable, RequestClass::Text) => None,
            (r, RequestClass::Text) if r.is_capacity() => Some(self.toggle_text(current)),
            (r, RequestClass::Vision) if r.is_capacity() => Some(current.clone()),
            (FailureReason::TransientNetwork, _) => Some(current.clone()),
            _ => None,
        }
    }

    fn toggle_text(&self, current: &ModelCandidate) -> ModelCandidate {
        match self.text.as_slice() {
            [primary, backup, ..] => {
                if current == primary {
                    backup.clone()
                } else {
                    primary.clone()
                }
            }
            _ => self.text[0].clone(),
        }
    }
}

/// Keep the first occurrence of each id so the cascade never lands on a
/// model it already abandoned.
fn candidates(ids: Vec<String>, class: RequestClass) -> Vec<ModelCandidate> {
    let mut seen = HashSet::new();
    ids.into_iter()
        .filter(|id| {
            let fresh = seen.insert(id.clone());
            if !fresh {
                tracing::warn!("Ignoring duplicate {} model '{}'", class, id);
            }
            fresh
        })
        .map(|id| ModelCandidate::new(id, class))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> ModelCatalog {
        ModelCatalog::new(
            vec!["text-primary".into(), "text-backup".into()],
            vec!["vision-a".into(), "vision-b".into(), "vision-c".into()],
        )
        .unwrap()
    }

    #[test]
    fn test_initial_model_per_class() {
        let catalog = catalog();
        assert_eq!(catalog.initial_model(RequestClass::Text).id, "text-primary");
        assert_eq!(catalog.initial_model(RequestClass::Vision).id, "vision-a");
        assert_eq!(
            catalog.initial_model(RequestClass::Vision).class,
            RequestClass::Vision
        );
    }

    #[test]
    fn test_vision_cascade_is_monotonic_and_ends() {
        let catalog = catalog();
        let a = catalog.initial_model(RequestClass::Vision);
        let b = catalog
            .next_model(&a, RequestClass::Vision, FailureReason::ModelUnavailable)
            .unwrap();
        let c = catalog
            .next_model(&b, RequestClass::Vision, FailureReason::ModelUnavailable)
            .unwrap();
        assert_eq!((b.id.as_str(), c.id.as_str()), ("vision-b", "vision-c"));
        assert!(catalog
            .next_model(&c, RequestClass::Vision, FailureReason::ModelUnavailable)
            .is_none());
    }

    #[test]
    fn test_text_rate_limit_toggles_between_two_models() {
        let catalog = catalog();
        let primary = catalog.initial_model(RequestClass::Text);
        let backup = catalog
            .next_model(&primary, RequestClass::Text, FailureReason::RateLimited)
            .unwrap();
        let again = catalog
            .next_model(&backup, RequestClass::Text, FailureReason::RateLimited)
            .unwrap();
        assert_eq!(backup.id, "text-backup");
        assert_eq!(again, primary);
    }

    #[test]
    fn test_payload_too_large_toggles_like_rate_limit() {
        let catalog = catalog();
        let primary = catalog.initial_model(RequestClass::Text);
        let next = catalog
            .next_model(&primary, RequestClass::Text, FailureReason::PayloadTooLarge)
            .unwrap();
        assert_eq!(next.id, "text-backup");
    }

    #[test]
    fn test_vision_rate_limit_keeps_model() {
        let catalog = catalog();
        let a = catalog.initial_model(RequestClass::Vision);
        let next = catalog
            .next_model(&a, RequestClass::Vision, FailureReason::RateLimited)
            .unwrap();
        assert_eq!(next, a);
    }

    #[test]
    fn test_transient_network_keeps_model_and_fatal_stops() {
        let catalog = catalog();
        let primary = catalog.initial_model(RequestClass::Text);
        assert_eq!(
            catalog.next_model(&primary, RequestClass::Text, FailureReason::TransientNetwork),
            Some(primary.clone())
        );
        assert!(catalog
            .next_model(&primary, RequestClass::Text, FailureReason::Fatal)
            .is_none());
    }

    #[test]
    fn test_single_text_model_stays_put() {
        let catalog = ModelCatalog::new(vec!["only".into()], vec!["v".into()]).unwrap();
        let only = catalog.initial_model(RequestClass::Text);
        assert_eq!(
            catalog.next_model(&only, RequestClass::Text, FailureReason::RateLimited),
            Some(only.clone())
        );
    }

    #[test]
    fn test_empty_lists_are_rejected() {
        assert!(matches!(
            ModelCatalog::new(vec![], vec!["v".into()]),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            ModelCatalog::new(vec!["t".into()], vec![]),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_default_tables_are_disjoint() {
        let catalog = ModelCatalog::default();
        for text in catalog.candidates(RequestClass::Text) {
            assert!(!catalog
                .candidates(RequestClass::Vision)
                .iter()
                .any(|v| v.id == text.id));
        }
    }

    #[test]
    fn test_duplicate_ids_are_collapsed_in_order() {
        let catalog = ModelCatalog::new(
            vec!["t".into(), "t".into()],
            vec!["vision-a".into(), "vision-a".into(), "vision-b".into()],
        )
        .unwrap();

        let vision: Vec<&str> = catalog
            .candidates(RequestClass::Vision)
            .iter()
            .map(|m| m.id.as_str())
            .collect();
        assert_eq!(vision, vec!["vision-a", "vision-b"]);
        assert_eq!(catalog.candidates(RequestClass::Text).len(), 1);

        let first = catalog.initial_model(RequestClass::Vision);
        let next = catalog
            .next_model(&first, RequestClass::Vision, FailureReason::ModelUnavailable)
            .unwrap();
        assert_eq!(next.id, "vision-b");
        assert_eq!(
            catalog.next_model(&next, RequestClass::Vision, FailureReason::ModelUnavailable),
            None
        );
    }
}
