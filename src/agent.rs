use crate::cli::Args;
use crate::error::{ ChatError, EmbeddingError };
use crate::history::{ initialize_history_store, ChatMemory, HistoryLookup };
use crate::llm::chat::{ completion_options, new_client as new_chat_client, ChatClient, CompletionOptions };
use crate::llm::embedding::{ new_client as new_embedding_client, Embedder };
use crate::llm::{ parse_llm_type, LlmConfig };
use crate::models::chat::{ ChatMessage, ChatTurn, HistoryMatch, Role };

use log::{ debug, error, info, warn };
use std::error::Error;
use std::sync::Arc;

/// The conversation sent upstream: retrieved history in rank order, then
/// the current user message last.
pub fn build_conversation(history: Vec<HistoryMatch>, message: &str) -> Vec<ChatTurn> {
    let mut conversation: Vec<ChatTurn> = history.into_iter().map(ChatTurn::from).collect();
    conversation.push(ChatTurn {
        role: Role::User,
        content: message.to_string(),
    });
    conversation
}

/// Application context built once at startup and shared by every request.
/// Holds only read-mostly handles; nothing here is reassigned after `new`.
#[derive(Clone)]
pub struct ChatAgent {
    chat_client: Arc<dyn ChatClient>,
    memory: ChatMemory,
    options: CompletionOptions,
    history_limit: usize,
}

impl ChatAgent {
    pub fn new(
        chat_client: Arc<dyn ChatClient>,
        memory: ChatMemory,
        options: CompletionOptions,
        history_limit: usize
    ) -> Self {
        Self {
            chat_client,
            memory,
            options,
            history_limit,
        }
    }

    /// Like `new`, but first checks that the embedder produces vectors of
    /// the collection's dimension. A mismatch would otherwise disable chat
    /// memory for the lifetime of the process.
    pub async fn start(
        chat_client: Arc<dyn ChatClient>,
        memory: ChatMemory,
        options: CompletionOptions,
        history_limit: usize
    ) -> Result<Self, EmbeddingError> {
        memory.verify_embedder().await?;
        info!("Embedding dimension verified against the vector collection");
        Ok(Self::new(chat_client, memory, options, history_limit))
    }

    async fn initialize_llm_clients(
        args: &Args
    ) -> Result<(Arc<dyn ChatClient>, CompletionOptions, Embedder), Box<dyn Error + Send + Sync>> {
        let chat_config = LlmConfig {
            llm_type: parse_llm_type(&args.chat_llm_type)?,
            base_url: args.chat_base_url.clone(),
            api_key: Args::non_empty(&args.chat_api_key),
            completion_model: args.chat_model.clone(),
            embedding_model: None,
        };
        let chat_client = new_chat_client(&chat_config)?;
        let options = completion_options(&chat_config, args.chat_temperature, args.chat_max_tokens)?;
        info!(
            "Completion options: Model={}, Temperature={}, MaxTokens={}",
            options.model,
            options.temperature,
            options.max_tokens
        );

        let embedding_config = LlmConfig {
            llm_type: parse_llm_type(&args.embedding_llm_type)?,
            base_url: args.embedding_base_url.clone(),
            api_key: Args::non_empty(&args.embedding_api_key),
            completion_model: None,
            embedding_model: args.embedding_model.clone(),
        };
        let embedding_client = new_embedding_client(
            &embedding_config,
            args.dimension,
            args.embedding_cache_dir.as_deref()
        )?;

        Ok((chat_client, options, Embedder::new(embedding_client, args.dimension)))
    }

    pub async fn from_args(args: &Args) -> Result<Self, Box<dyn Error + Send + Sync>> {
        let history_store = initialize_history_store(args).await?;
        let (chat_client, options, embedder) = Self::initialize_llm_clients(args).await?;
        let memory = ChatMemory::new(embedder, history_store);

        let agent = Self::start(chat_client, memory, options, usize::from(args.history_limit)).await.map_err(
            |e| format!("Embedding model does not fit collection '{}': {}", args.collection, e)
        )?;
        Ok(agent)
    }

    /// Runs one exchange: history lookup, completion, then persistence of the
    /// user message and reply. Only validation and completion failures reach
    /// the caller.
    pub async fn process_message(&self, message: Option<&str>) -> Result<String, ChatError> {
        let message = match message {
            Some(m) if !m.is_empty() => m,
            _ => {
                return Err(ChatError::Validation("Message is required".to_string()));
            }
        };
        debug!("Received message ({} bytes)", message.len());

        let history = match self.memory.query_similar(message, self.history_limit).await {
            HistoryLookup::Found(matches) => matches,
            HistoryLookup::NoMatches => {
                debug!("No related history found");
                Vec::new()
            }
            HistoryLookup::Unavailable(reason) => {
                warn!("Continuing without history: {}", reason);
                Vec::new()
            }
        };
        debug!("History fetched: {} related messages", history.len());

        let conversation = build_conversation(history, message);
        let reply = self.chat_client.complete(&conversation, &self.options).await.map_err(|e| {
            error!("Completion failed: {}", e);
            ChatError::Completion(e)
        })?;
        debug!("Completion received ({} bytes)", reply.len());

        self.persist(ChatMessage::new(Role::User, message)).await;
        self.persist(ChatMessage::new(Role::Assistant, reply.as_str())).await;

        Ok(reply)
    }

    async fn persist(&self, message: ChatMessage) {
        if let Err(e) = self.memory.store(&message).await {
            warn!("Error storing {} message {}: {}", message.role, message.id, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::embedding::Embedder;
    use crate::test_support::{ agent_with, HashEmbeddingClient, RecordingStore, StubChatClient };

    fn history(n: usize) -> Vec<HistoryMatch> {
        (0..n)
            .map(|i| HistoryMatch {
                content: format!("past {}", i),
                role: if i % 2 == 0 { Role::User } else { Role::Assistant },
            })
            .collect()
    }

    #[tokio::test]
    async fn reply_is_whatever_the_model_returned() {
        let chat = Arc::new(StubChatClient::replying("stubbed answer"));
        let store = Arc::new(RecordingStore::default());
        let agent = agent_with(chat.clone(), store);

        let reply = agent.process_message(Some("hello there")).await.unwrap();
        assert_eq!(reply, "stubbed answer");
        assert_eq!(chat.calls().len(), 1);
    }

    #[tokio::test]
    async fn missing_or_empty_message_never_reaches_the_model() {
        let chat = Arc::new(StubChatClient::replying("unused"));
        let store = Arc::new(RecordingStore::default());
        let agent = agent_with(chat.clone(), store.clone());

        for message in [None, Some("")] {
            let err = agent.process_message(message).await.unwrap_err();
            assert!(matches!(err, ChatError::Validation(_)));
        }
        assert!(chat.calls().is_empty());
        assert!(store.queried_k().is_empty());
        assert!(store.added().is_empty());
    }

    #[tokio::test]
    async fn empty_history_sends_only_the_current_message() {
        let chat = Arc::new(StubChatClient::replying("ok"));
        let agent = agent_with(chat.clone(), Arc::new(RecordingStore::default()));

        agent.process_message(Some("first ever message")).await.unwrap();

        let calls = chat.calls();
        assert_eq!(calls[0].0, vec![ChatTurn { role: Role::User, content: "first ever message".into() }]);
    }

    #[tokio::test]
    async fn k_matches_precede_the_current_message_in_order() {
        let matches = history(3);
        let chat = Arc::new(StubChatClient::replying("ok"));
        let store = Arc::new(RecordingStore::with_matches(matches.clone()));
        let agent = agent_with(chat.clone(), store.clone());

        agent.process_message(Some("follow-up")).await.unwrap();

        let conversation = &chat.calls()[0].0;
        assert_eq!(conversation.len(), 4);
        for (turn, expected) in conversation.iter().zip(matches.iter()) {
            assert_eq!(turn.role, expected.role);
            assert_eq!(turn.content, expected.content);
        }
        assert_eq!(conversation[3], ChatTurn { role: Role::User, content: "follow-up".into() });
        assert_eq!(store.queried_k(), vec![5]);
    }

    #[tokio::test]
    async fn unreachable_history_is_treated_as_empty() {
        let chat = Arc::new(StubChatClient::replying("still answered"));
        let agent = agent_with(chat.clone(), Arc::new(RecordingStore::unavailable()));

        let reply = agent.process_message(Some("hi")).await.unwrap();
        assert_eq!(reply, "still answered");
        assert_eq!(chat.calls()[0].0.len(), 1);
    }

    #[tokio::test]
    async fn completion_failure_persists_nothing() {
        let chat = Arc::new(StubChatClient::failing());
        let store = Arc::new(RecordingStore::with_matches(history(2)));
        let agent = agent_with(chat, store.clone());

        let err = agent.process_message(Some("hi")).await.unwrap_err();
        assert!(matches!(err, ChatError::Completion(_)));
        assert!(store.added().is_empty());
    }

    #[tokio::test]
    async fn exchange_is_stored_user_first_then_assistant() {
        let chat = Arc::new(StubChatClient::replying("the reply"));
        let store = Arc::new(RecordingStore::default());
        let agent = agent_with(chat, store.clone());

        agent.process_message(Some("the question")).await.unwrap();

        let added = store.added();
        assert_eq!(added.len(), 2);
        assert_eq!(added[0].0.role, Role::User);
        assert_eq!(added[0].0.content, "the question");
        assert_eq!(added[1].0.role, Role::Assistant);
        assert_eq!(added[1].0.content, "the reply");
        assert_ne!(added[0].0.id, added[1].0.id);
        assert!(added[0].0.timestamp <= added[1].0.timestamp);
    }

    #[tokio::test]
    async fn store_write_failures_do_not_change_the_reply() {
        let chat = Arc::new(StubChatClient::replying("answer"));
        let store = Arc::new(RecordingStore::rejecting_writes());
        let agent = agent_with(chat, store.clone());

        let reply = agent.process_message(Some("question")).await.unwrap();
        assert_eq!(reply, "answer");
        assert_eq!(store.add_attempts(), 2);
    }

    #[tokio::test]
    async fn model_options_are_forwarded_unchanged() {
        let chat = Arc::new(StubChatClient::replying("ok"));
        let agent = agent_with(chat.clone(), Arc::new(RecordingStore::default()));

        agent.process_message(Some("hi")).await.unwrap();

        let options = &chat.calls()[0].1;
        assert!((options.temperature - 0.7).abs() < f32::EPSILON);
        assert_eq!(options.max_tokens, 1024);
    }

    fn options() -> CompletionOptions {
        CompletionOptions { model: "test-model".into(), temperature: 0.7, max_tokens: 1024 }
    }

    #[tokio::test]
    async fn embedder_with_wrong_dimension_aborts_startup() {
        let store = Arc::new(RecordingStore::default());
        let embedder = Embedder::new(Arc::new(HashEmbeddingClient::new(768)), 384);
        let memory = ChatMemory::new(embedder, store.clone());

        let started = ChatAgent::start(
            Arc::new(StubChatClient::replying("unused")),
            memory,
            options(),
            5
        ).await;

        assert!(matches!(started, Err(EmbeddingError::DimensionMismatch { expected: 384, actual: 768 })));
        assert!(store.added().is_empty());
    }

    #[tokio::test]
    async fn embedder_with_matching_dimension_starts() {
        let dim = HashEmbeddingClient::DIM;
        let embedder = Embedder::new(Arc::new(HashEmbeddingClient::new(dim)), dim);
        let memory = ChatMemory::new(embedder, Arc::new(RecordingStore::default()));

        let agent = ChatAgent::start(Arc::new(StubChatClient::replying("ok")), memory, options(), 5).await;
        assert!(agent.is_ok());
    }

    #[test]
    fn conversation_ends_with_the_user_turn() {
        let conversation = build_conversation(history(2), "now");
        assert_eq!(conversation.len(), 3);
        assert_eq!(conversation[0].content, "past 0");
        assert_eq!(conversation[1].role, Role::Assistant);
        assert_eq!(conversation[2], ChatTurn { role: Role::User, content: "now".into() });
    }
}
