//! Knowledge-base question answering.
//!
//! Every question is a fresh remote call carrying the chat template, the
//! current knowledge document, and the question. Prior turns are rendered
//! into the prompt only when history is enabled.

use std::sync::Arc;

use tracing::{debug, field, info_span, warn, Instrument, Span};

use kbcheck_core::{
    logging, prompts, ChatRole, ChatTranscript, ChatTurn, Error, KnowledgeStore, MediaInput,
    RemoteAnalysisClient, Result,
};

/// Answers operator questions against the knowledge base.
pub struct ChatService {
    client: Arc<dyn RemoteAnalysisClient>,
    knowledge: KnowledgeStore,
    include_history: bool,
}

impl ChatService {
    /// Stateless service: prior turns are not sent to the model.
    pub fn new(client: Arc<dyn RemoteAnalysisClient>, knowledge: KnowledgeStore) -> Self {
        Self {
            client,
            knowledge,
            include_history: false,
        }
    }

    pub fn with_history(mut self, include_history: bool) -> Self {
        self.include_history = include_history;
        self
    }

    pub fn includes_history(&self) -> bool {
        self.include_history
    }

    /// Get an answer without touching any transcript.
    pub async fn answer(&self, history: &[ChatTurn], question: &str) -> Result<String> {
        let question = question.trim();
        if question.is_empty() {
            return Err(Error::InvalidInput("Question cannot be empty".to_string()));
        }

        let knowledge = self.knowledge.load().await;
        let history: &[ChatTurn] = if self.include_history { history } else { &[] };
        let prompt = prompts::chat_prompt(knowledge.text(), question, history);

        let span = info_span!(
            "chat",
            op = "ask",
            history_turns = history.len(),
            prompt_len = prompt.len(),
            response_len = field::Empty,
            success = field::Empty,
        );
        async {
            let answer = self.client.run_prompt(&MediaInput::TextOnly, &prompt).await;
            let span = Span::current();
            span.record(logging::SUCCESS, answer.is_ok());
            match &answer {
                Ok(text) => {
                    span.record(logging::RESPONSE_LEN, text.len());
                    debug!("Chat answered");
                }
                Err(e) => warn!(error = %e, "Chat request failed"),
            }
            answer
        }
        .instrument(span)
        .await
    }

    /// Ask a question and record the exchange.
    ///
    /// The user turn is appended once the question passes validation. The
    /// assistant turn is appended only when the remote call succeeds.
    pub async fn ask(&self, transcript: &mut ChatTranscript, question: &str) -> Result<String> {
        if question.trim().is_empty() {
            return Err(Error::InvalidInput("Question cannot be empty".to_string()));
        }

        let history = transcript.turns().to_vec();
        transcript.append_turn(ChatRole::User, question.trim());

        let answer = self.answer(&history, question).await?;
        transcript.append_turn(ChatRole::Assistant, answer.clone());
        Ok(answer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kbcheck_inference::mock::{MockAnalysisClient, MockFailure};
    use std::io::Write;

    fn knowledge_file(text: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(text.as_bytes()).unwrap();
        file
    }

    fn service(client: &MockAnalysisClient, knowledge: &tempfile::NamedTempFile) -> ChatService {
        ChatService::new(Arc::new(client.clone()), KnowledgeStore::new(knowledge.path()))
    }

    #[tokio::test]
    async fn test_ask_appends_both_turns() {
        let kb = knowledge_file("Rule 1: no logos");
        let client = MockAnalysisClient::new().with_fixed_response("Logos are not allowed.");
        let chat = service(&client, &kb);

        let mut transcript = ChatTranscript::new();
        let answer = chat.ask(&mut transcript, "Can I show a logo?").await.unwrap();

        assert_eq!(answer, "Logos are not allowed.");
        assert_eq!(transcript.len(), 2);
        assert_eq!(transcript.turns()[0].role, ChatRole::User);
        assert_eq!(transcript.turns()[0].text, "Can I show a logo?");
        assert_eq!(transcript.turns()[1].role, ChatRole::Assistant);

        let calls = client.calls();
        assert_eq!(calls.inputs, vec![MediaInput::TextOnly]);
        assert!(calls.prompts[0].contains("Rule 1: no logos"));
        assert!(calls.prompts[0].ends_with("Question: Can I show a logo?"));
    }

    #[tokio::test]
    async fn test_failed_answer_keeps_only_user_turn() {
        let kb = knowledge_file("rules");
        let client = MockAnalysisClient::new().with_prompt_outcomes([Err(MockFailure::Transport)]);
        let chat = service(&client, &kb);

        let mut transcript = ChatTranscript::new();
        let err = chat.ask(&mut transcript, "hello?").await.unwrap_err();

        assert!(matches!(err, Error::Transport(_)));
        assert_eq!(transcript.len(), 1);
        assert_eq!(transcript.turns()[0].role, ChatRole::User);
    }

    #[tokio::test]
    async fn test_chat_does_not_retry_on_quota() {
        let kb = knowledge_file("rules");
        let client = MockAnalysisClient::new().with_prompt_outcomes([Err(MockFailure::Quota)]);
        let chat = service(&client, &kb);

        let err = chat.answer(&[], "q").await.unwrap_err();
        assert!(err.is_quota_exceeded());
        assert_eq!(client.calls().prompts.len(), 1);
    }

    #[tokio::test]
    async fn test_blank_question_is_rejected_without_call() {
        let kb = knowledge_file("rules");
        let client = MockAnalysisClient::new();
        let chat = service(&client, &kb);

        let mut transcript = ChatTranscript::new();
        let err = chat.ask(&mut transcript, "   ").await.unwrap_err();

        assert!(matches!(err, Error::InvalidInput(_)));
        assert!(transcript.is_empty());
        assert!(client.calls().prompts.is_empty());
    }

    #[tokio::test]
    async fn test_stateless_by_default() {
        let kb = knowledge_file("rules");
        let client = MockAnalysisClient::new().with_fixed_response("answer");
        let chat = service(&client, &kb);
        assert!(!chat.includes_history());

        let mut transcript = ChatTranscript::new();
        chat.ask(&mut transcript, "first question").await.unwrap();
        chat.ask(&mut transcript, "second question").await.unwrap();

        let prompts = client.calls().prompts;
        assert!(!prompts[1].contains("first question"));
        assert!(!prompts[1].contains("Conversation so far"));
    }

    #[tokio::test]
    async fn test_history_rendered_when_enabled() {
        let kb = knowledge_file("rules");
        let client = MockAnalysisClient::new().with_fixed_response("first answer");
        let chat = service(&client, &kb).with_history(true);

        let mut transcript = ChatTranscript::new();
        chat.ask(&mut transcript, "first question").await.unwrap();
        chat.ask(&mut transcript, "second question").await.unwrap();

        let prompts = client.calls().prompts;
        assert!(prompts[1].contains("User: first question"));
        assert!(prompts[1].contains("Assistant: first answer"));
        assert!(prompts[1].ends_with("Question: second question"));
    }

    #[tokio::test]
    async fn test_history_omits_question_whose_answer_failed() {
        let kb = knowledge_file("rules");
        let client = MockAnalysisClient::new()
            .with_prompt_outcomes([Ok("first answer".to_string()), Err(MockFailure::Transport)])
            .with_fixed_response("third answer");
        let chat = service(&client, &kb).with_history(true);

        let mut transcript = ChatTranscript::new();
        chat.ask(&mut transcript, "first question").await.unwrap();
        chat.ask(&mut transcript, "failed question").await.unwrap_err();
        chat.ask(&mut transcript, "third question").await.unwrap();

        assert_eq!(transcript.len(), 5);
        let prompts = client.calls().prompts;
        assert!(prompts[2].contains("User: first question"));
        assert!(prompts[2].contains("Assistant: first answer"));
        assert!(!prompts[2].contains("failed question"));
        assert!(prompts[2].ends_with("Question: third question"));
    }

    #[tokio::test]
    async fn test_knowledge_reread_per_question() {
        let kb = knowledge_file("version one");
        let client = MockAnalysisClient::new();
        let chat = service(&client, &kb);

        chat.answer(&[], "q").await.unwrap();
        std::fs::write(kb.path(), "version two").unwrap();
        chat.answer(&[], "q").await.unwrap();

        let prompts = client.calls().prompts;
        assert!(prompts[0].contains("version one"));
        assert!(prompts[1].contains("version two"));
    }
}
