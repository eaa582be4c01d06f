use super::fall_back;
use crate::gateway::Dispatcher;
use crate::prompts::{render, COACH_SYSTEM};
use serde::{Deserialize, Serialize};

pub const FALLBACK_COACH_REPLY: &str = "I'm having trouble connecting right now, but please take a \
moment to write down one thing you'll try tomorrow!";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    Teacher,
    Coach,
}

impl Speaker {
    fn label(self) -> &'static str {
        match self {
            Speaker::Teacher => "Teacher",
            Speaker::Coach => "Coach",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub speaker: Speaker,
    pub text: String,
}

impl ChatTurn {
    pub fn teacher(text: impl Into<String>) -> Self {
        Self {
            speaker: Speaker::Teacher,
            text: text.into(),
        }
    }

    pub fn coach(text: impl Into<String>) -> Self {
        Self {
            speaker: Speaker::Coach,
            text: text.into(),
        }
    }
}

fn transcript(history: &[ChatTurn]) -> String {
    if history.is_empty() {
        return "(no messages yet)".to_string();
    }
    history
        .iter()
        .map(|turn| format!("{}: {}", turn.speaker.label(), turn.text.trim()))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Next message from the post-training implementation coach. Free text, not
/// structured.
pub async fn coach_reply(gateway: &Dispatcher, topic: &str, history: &[ChatTurn]) -> String {
    let prompt = render(
        COACH_SYSTEM,
        &[("topic", topic), ("history", &transcript(history))],
    );

    match gateway.complete(&prompt, None).await {
        Ok(reply) => reply.trim().to_string(),
        Err(e) => fall_back("Coach reply", &e, || FALLBACK_COACH_REPLY.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::{MockTransport, ScriptedReply};
    use crate::features::test_gateway as gateway;

    #[test]
    fn test_transcript_labels_speakers() {
        let history = vec![
            ChatTurn::coach("How will you start tomorrow?"),
            ChatTurn::teacher(" With a song. "),
        ];
        assert_eq!(
            transcript(&history),
            "Coach: How will you start tomorrow?\nTeacher: With a song."
        );
        assert_eq!(transcript(&[]), "(no messages yet)");
    }

    #[tokio::test]
    async fn test_coach_reply_returns_raw_text() {
        let transport = MockTransport::new().with_text("  Love it! Try a clap pattern too 👏 \n");
        let history = vec![ChatTurn::teacher("I'll start with a song")];

        let reply = coach_reply(&gateway(&transport), "Joyful Learning", &history).await;
        assert_eq!(reply, "Love it! Try a clap pattern too 👏");

        let prompt = &transport.calls()[0].prompt;
        assert!(prompt.contains("\"Joyful Learning\""));
        assert!(prompt.contains("Teacher: I'll start with a song"));
    }

    #[tokio::test]
    async fn test_coach_reply_falls_back_on_fatal_error() {
        let transport = MockTransport::new().with_reply(ScriptedReply::Malformed);

        let reply = coach_reply(&gateway(&transport), "Joyful Learning", &[]).await;
        assert_eq!(reply, FALLBACK_COACH_REPLY);
        assert_eq!(transport.get_call_count(), 1);
    }

    #[test]
    fn test_speaker_serializes_lowercase() {
        let json = serde_json::to_string(&ChatTurn::coach("hi")).unwrap();
        assert_eq!(json, r#"{"speaker":"coach","text":"hi"}"#);
    }
}
