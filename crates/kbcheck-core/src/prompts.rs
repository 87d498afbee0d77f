//! Prompt templates that embed the knowledge base.
//!
//! The knowledge text is interpolated verbatim between
//! [`KNOWLEDGE_START`] and [`KNOWLEDGE_END`].

use crate::models::{ChatRole, ChatTurn, MediaKind};

pub const KNOWLEDGE_START: &str = "--- KNOWLEDGE BASE START ---";
pub const KNOWLEDGE_END: &str = "--- KNOWLEDGE BASE END ---";

const ANALYSIS_INSTRUCTIONS: &str = "You are a strict content compliance reviewer. \
Check the attached media against every rule in the knowledge base below. \
Judge only by the rules given; do not invent rules.";

const ANALYSIS_OUTPUT_FORMAT: &str = "Respond in markdown with:\n\
1. An overall verdict line: **OK** or **NG**.\n\
2. A table with columns | Rule | Verdict | Evidence | for each relevant rule.\n\
3. Concrete suggestions to fix every NG item.";

const CHAT_INSTRUCTIONS: &str = "You are an assistant that answers questions about \
the rules in the knowledge base below. Answer only from the knowledge base; \
if it does not cover the question, say so.";

fn knowledge_block(knowledge: &str) -> String {
    format!("{KNOWLEDGE_START}\n{knowledge}\n{KNOWLEDGE_END}")
}

/// Prompt sent alongside an image or video for a compliance check.
pub fn analysis_prompt(knowledge: &str, kind: MediaKind) -> String {
    let subject = match kind {
        MediaKind::Image => "an image",
        MediaKind::Video => "a video (consider both visuals and audio)",
    };
    format!(
        "{ANALYSIS_INSTRUCTIONS}\n\nThe attached media is {subject}.\n\n{}\n\n{ANALYSIS_OUTPUT_FORMAT}",
        knowledge_block(knowledge)
    )
}

/// Single-shot chat prompt. Earlier exchanges from `history` are rendered
/// when there are any; a question whose answer failed is left out.
pub fn chat_prompt(knowledge: &str, question: &str, history: &[ChatTurn]) -> String {
    let mut prompt = format!("{CHAT_INSTRUCTIONS}\n\n{}\n\n", knowledge_block(knowledge));

    let answered = answered_turns(history);
    if !answered.is_empty() {
        prompt.push_str("Conversation so far:\n");
        for turn in answered {
            let speaker = match turn.role {
                ChatRole::User => "User",
                ChatRole::Assistant => "Assistant",
            };
            prompt.push_str(&format!("{}: {}\n", speaker, turn.text));
        }
        prompt.push('\n');
    }

    prompt.push_str(&format!("Question: {}", question));
    prompt
}

/// Drop user turns not followed by an assistant turn.
fn answered_turns(history: &[ChatTurn]) -> Vec<&ChatTurn> {
    history
        .iter()
        .enumerate()
        .filter(|(i, turn)| {
            turn.role == ChatRole::Assistant
                || history
                    .get(i + 1)
                    .is_some_and(|next| next.role == ChatRole::Assistant)
        })
        .map(|(_, turn)| turn)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn between_markers(prompt: &str) -> &str {
        let start = prompt.find(KNOWLEDGE_START).expect("start marker") + KNOWLEDGE_START.len();
        let end = prompt.find(KNOWLEDGE_END).expect("end marker");
        &prompt[start..end]
    }

    #[test]
    fn test_analysis_prompt_embeds_knowledge_verbatim() {
        let knowledges = [
            "",
            "Rule 1: no alcohol",
            "multi\nline\n\n| table | row |",
            "contains the marker text --- KNOWLEDGE BASE END --- inside",
            "日本語のルール：ロゴ禁止",
        ];
        for knowledge in knowledges {
            for kind in [MediaKind::Image, MediaKind::Video] {
                let prompt = analysis_prompt(knowledge, kind);
                assert!(prompt.contains(knowledge));
                assert!(prompt.contains(&format!("{KNOWLEDGE_START}\n{knowledge}\n{KNOWLEDGE_END}")));
            }
        }
    }

    #[test]
    fn test_analysis_prompt_markers_surround_knowledge() {
        let prompt = analysis_prompt("Rule A", MediaKind::Image);
        assert_eq!(between_markers(&prompt), "\nRule A\n");
    }

    #[test]
    fn test_analysis_prompt_mentions_media_kind() {
        assert!(analysis_prompt("r", MediaKind::Video).contains("video"));
        assert!(analysis_prompt("r", MediaKind::Image).contains("image"));
    }

    #[test]
    fn test_chat_prompt_without_history() {
        let prompt = chat_prompt("Rule B", "Can I show a logo?", &[]);
        assert!(prompt.contains("Rule B"));
        assert!(prompt.ends_with("Question: Can I show a logo?"));
        assert!(!prompt.contains("Conversation so far"));
        assert_eq!(between_markers(&prompt), "\nRule B\n");
    }

    #[test]
    fn test_chat_prompt_with_history() {
        let history = vec![
            ChatTurn {
                role: ChatRole::User,
                text: "Is red ok?".to_string(),
                at: Utc::now(),
            },
            ChatTurn {
                role: ChatRole::Assistant,
                text: "Yes.".to_string(),
                at: Utc::now(),
            },
        ];
        let prompt = chat_prompt("Rule C", "And blue?", &history);

        let convo = prompt.find("Conversation so far:").unwrap();
        let user = prompt.find("User: Is red ok?").unwrap();
        let assistant = prompt.find("Assistant: Yes.").unwrap();
        let question = prompt.find("Question: And blue?").unwrap();
        assert!(convo < user && user < assistant && assistant < question);
    }

    #[test]
    fn test_chat_prompt_skips_unanswered_questions() {
        let turn = |role, text: &str| ChatTurn {
            role,
            text: text.to_string(),
            at: Utc::now(),
        };
        let history = vec![
            turn(ChatRole::User, "Is red ok?"),
            turn(ChatRole::Assistant, "Yes."),
            turn(ChatRole::User, "lost to a timeout"),
            turn(ChatRole::User, "Is green ok?"),
            turn(ChatRole::Assistant, "No."),
            turn(ChatRole::User, "also lost"),
        ];
        let prompt = chat_prompt("Rule D", "And blue?", &history);

        assert!(prompt.contains("User: Is red ok?"));
        assert!(prompt.contains("User: Is green ok?"));
        assert!(prompt.contains("Assistant: No."));
        assert!(!prompt.contains("lost to a timeout"));
        assert!(!prompt.contains("also lost"));
    }

    #[test]
    fn test_chat_prompt_only_unanswered_history() {
        let history = vec![ChatTurn {
            role: ChatRole::User,
            text: "never answered".to_string(),
            at: Utc::now(),
        }];
        let prompt = chat_prompt("Rule E", "Again?", &history);
        assert!(!prompt.contains("Conversation so far"));
        assert!(!prompt.contains("never answered"));
    }
}
