//! Teaching-learning material (TLM) suggestions from a photo of whatever is
//! lying around the classroom.

use super::fall_back;
use crate::gateway::Dispatcher;
use crate::models::EncodedImage;
use crate::prompts::RESOURCE_RECOMMENDATION;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TlmActivity {
    pub title: String,
    pub subject: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourcePlan {
    pub detected_resources: Vec<String>,
    pub activities: Vec<TlmActivity>,
}

/// Served when the photo could not be analysed: a plastic bottle works in
/// almost any classroom.
pub fn fallback_resource_plan() -> ResourcePlan {
    ResourcePlan {
        detected_resources: vec![
            "Plastic Bottle".to_string(),
            "Water".to_string(),
            "Sunlight (Context)".to_string(),
        ],
        activities: vec![
            TlmActivity {
                title: "Refraction of Light".to_string(),
                subject: "Science".to_string(),
                description: "Fill the bottle with water and place it in sunlight. Observe how \
                              it bends light or acts as a magnifying lens."
                    .to_string(),
            },
            TlmActivity {
                title: "Volume vs. Capacity".to_string(),
                subject: "Math".to_string(),
                description: "Use the bottle as a standard unit to measure the capacity of \
                              other containers (buckets, mugs)."
                    .to_string(),
            },
            TlmActivity {
                title: "Vibration & Sound".to_string(),
                subject: "Physics".to_string(),
                description: "Blow across the mouth of the empty vs. half-filled bottle to \
                              demonstrate how air column length affects pitch."
                    .to_string(),
            },
        ],
    }
}

pub async fn recommend_resources(gateway: &Dispatcher, image: EncodedImage) -> ResourcePlan {
    match gateway
        .complete_structured(RESOURCE_RECOMMENDATION, Some(image))
        .await
    {
        Ok(plan) => plan,
        Err(e) => fall_back("TLM recommendation", &e, fallback_resource_plan),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::MockTransport;
    use crate::features::test_gateway as gateway;
    use crate::gateway::DEFAULT_VISION_MODELS;
    use pretty_assertions::assert_eq;

    fn photo() -> EncodedImage {
        EncodedImage::jpeg(vec![0xFF, 0xD8, 0xFF, 0xDB, 0x00]).unwrap()
    }

    #[tokio::test]
    async fn test_recommend_resources_decodes_plan() {
        let transport = MockTransport::new().with_text(
            r#"Here you go:
            {"detectedResources": ["Cardboard", "Chalk"],
             "activities": [{"title": "Shape Hunt", "subject": "Math", "description": "Cut shapes."}]}"#,
        );

        let plan = recommend_resources(&gateway(&transport), photo()).await;
        assert_eq!(plan.detected_resources, vec!["Cardboard", "Chalk"]);
        assert_eq!(plan.activities[0].title, "Shape Hunt");
    }

    #[tokio::test]
    async fn test_recommend_resources_falls_back_when_every_vision_model_is_gone() {
        let transport = MockTransport::new()
            .with_status(400, "model_decommissioned")
            .with_status(400, "model_decommissioned")
            .with_status(400, "model_decommissioned");

        let plan = recommend_resources(&gateway(&transport), photo()).await;
        assert_eq!(plan, fallback_resource_plan());
        assert_eq!(transport.models_called(), DEFAULT_VISION_MODELS.to_vec());
    }

    #[test]
    fn test_fallback_plan_has_three_activities() {
        let plan = fallback_resource_plan();
        assert_eq!(plan.activities.len(), 3);
        assert_eq!(plan, fallback_resource_plan());
    }
}
