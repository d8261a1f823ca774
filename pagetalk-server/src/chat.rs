//! Chat exchange: conversation persistence, context assembly, and the
//! `/api/chat` handler.
//!
//! The handler is the only place the pipeline pieces meet: URL extraction,
//! the scrape orchestrator, the context assembler, and the completion
//! client. Per-URL scrape failures never surface here; only a completion
//! failure turns into an error response.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use pagetalk_common::{ConversationTurn, TurnRole};
use pagetalk_llm::ChatMessage;
use pagetalk_web::cache::KvStore;
use pagetalk_web::extract_urls;
use pagetalk_web::ScrapedContent;

use crate::error::AppError;
use crate::prompt::SYSTEM_PROMPT;
use crate::routes::AppState;

/// How long an idle conversation survives in the store.
const CONVERSATION_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub message: String,
    /// Prior turns supplied by the client. Empty means "look the
    /// conversation up server-side".
    #[serde(default)]
    pub context: Vec<ConversationTurn>,
    #[serde(default)]
    pub conversation_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatResponse {
    pub role: &'static str,
    pub content: String,
    pub conversation_id: String,
}

/// Conversation history behind the shared key-value contract. Reads are
/// self-healing like the content cache: corrupt history is dropped rather
/// than poisoning every later request.
#[derive(Clone)]
pub struct ConversationStore {
    store: Arc<dyn KvStore>,
}

impl ConversationStore {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self { store }
    }

    fn key(id: &str) -> String {
        format!("conversation:{id}")
    }

    pub async fn load(&self, id: &str) -> Vec<ConversationTurn> {
        let key = Self::key(id);
        let raw = match self.store.get(&key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return Vec::new(),
            Err(err) => {
                tracing::warn!(conversation = %id, error = %err, "conversation.read_error");
                return Vec::new();
            }
        };
        match serde_json::from_str(&raw) {
            Ok(turns) => turns,
            Err(err) => {
                tracing::warn!(conversation = %id, error = %err, "conversation.corrupt_evicted");
                if let Err(del_err) = self.store.del(&key).await {
                    tracing::debug!(conversation = %id, error = %del_err, "conversation.evict_failed");
                }
                Vec::new()
            }
        }
    }

    /// Best-effort write-back; a failed save costs continuity, not the
    /// response that was already generated.
    pub async fn save(&self, id: &str, turns: &[ConversationTurn]) {
        let serialized = match serde_json::to_string(turns) {
            Ok(s) => s,
            Err(err) => {
                tracing::warn!(conversation = %id, error = %err, "conversation.serialize_failed");
                return;
            }
        };
        if let Err(err) = self
            .store
            .set(&Self::key(id), serialized, CONVERSATION_TTL)
            .await
        {
            tracing::warn!(conversation = %id, error = %err, "conversation.write_error");
        }
    }
}

/// Build the outbound message sequence: the fixed system prompt, the most
/// recent `max_turns` of history (oldest dropped, order preserved), then a
/// final user message folding the question and the scraped page blocks
/// together.
pub fn assemble(
    history: &[ConversationTurn],
    max_turns: usize,
    message: &str,
    scraped: &[ScrapedContent],
) -> Vec<ChatMessage> {
    let start = history.len().saturating_sub(max_turns);
    let mut messages = Vec::with_capacity(history.len() - start + 2);

    messages.push(ChatMessage::system(SYSTEM_PROMPT));
    for turn in &history[start..] {
        messages.push(ChatMessage {
            role: turn.role.as_str().to_string(),
            content: turn.content.clone(),
        });
    }
    messages.push(ChatMessage::user(final_user_message(message, scraped)));
    messages
}

fn final_user_message(message: &str, scraped: &[ScrapedContent]) -> String {
    let blocks: Vec<String> = scraped.iter().map(content_block).collect();
    format!(
        "Question: {message}\n\nScraped Context:\n{}",
        blocks.join("\n\n")
    )
}

fn content_block(content: &ScrapedContent) -> String {
    let lines: Vec<String> = content
        .sections
        .iter()
        .map(|s| format!("{}: {}", s.kind.label(), s.content))
        .collect();
    format!(
        "Content from {}:\nTitle: {}\n{}",
        content.url,
        content.title,
        lines.join("\n")
    )
}

pub async fn chat_handler(
    State(state): State<AppState>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, AppError> {
    let conversation_id = req
        .conversation_id
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    let history = if req.context.is_empty() {
        state.conversations.load(&conversation_id).await
    } else {
        req.context
    };

    let urls = extract_urls(&req.message);
    tracing::info!(
        conversation = %conversation_id,
        urls = urls.len(),
        history_turns = history.len(),
        "chat.request"
    );

    let scraped = state.orchestrator.scrape_all(&urls).await;
    let messages = assemble(&history, state.max_context_turns, &req.message, &scraped);

    let content = state.completions.complete(&messages).await?;

    let mut updated = history;
    updated.push(ConversationTurn {
        role: TurnRole::User,
        content: req.message,
        timestamp: Some(Utc::now()),
    });
    updated.push(ConversationTurn {
        role: TurnRole::System,
        content: content.clone(),
        timestamp: Some(Utc::now()),
    });
    state.conversations.save(&conversation_id, &updated).await;

    Ok(Json(ChatResponse {
        role: "system",
        content,
        conversation_id,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pagetalk_web::{Section, SectionKind};

    fn turn(role: TurnRole, content: &str) -> ConversationTurn {
        ConversationTurn {
            role,
            content: content.into(),
            timestamp: None,
        }
    }

    fn scraped(url: &str, title: &str, sections: Vec<(SectionKind, &str)>) -> ScrapedContent {
        ScrapedContent {
            url: url.into(),
            title: title.into(),
            sections: sections
                .into_iter()
                .map(|(kind, content)| Section {
                    kind,
                    content: content.into(),
                })
                .collect(),
            cached_at: None,
        }
    }

    #[test]
    fn assembles_prompt_history_and_question_in_order() {
        let history = vec![
            turn(TurnRole::User, "hi"),
            turn(TurnRole::System, "hello"),
        ];
        let pages = vec![scraped(
            "https://example.com/a",
            "Example",
            vec![
                (SectionKind::Heading, "Example"),
                (SectionKind::Paragraph, "Hello world"),
            ],
        )];

        let messages = assemble(&history, 10, "summarize https://example.com/a", &pages);

        assert_eq!(messages.len(), 4);
        assert_eq!(messages[0].role, "system");
        assert_eq!(messages[0].content, SYSTEM_PROMPT);
        assert_eq!(messages[1].role, "user");
        assert_eq!(messages[1].content, "hi");
        assert_eq!(messages[2].role, "system");
        assert_eq!(messages[3].role, "user");
        assert_eq!(
            messages[3].content,
            "Question: summarize https://example.com/a\n\nScraped Context:\n\
             Content from https://example.com/a:\nTitle: Example\n\
             HEADING: Example\nPARAGRAPH: Hello world"
        );
    }

    #[test]
    fn history_is_truncated_to_the_most_recent_turns() {
        let history: Vec<ConversationTurn> = (0..15)
            .map(|i| turn(TurnRole::User, &format!("turn {i}")))
            .collect();

        let messages = assemble(&history, 10, "question", &[]);

        // system prompt + 10 retained turns + final user message
        assert_eq!(messages.len(), 12);
        assert_eq!(messages[1].content, "turn 5");
        assert_eq!(messages[10].content, "turn 14");
    }

    #[test]
    fn blocks_are_separated_by_a_blank_line() {
        let pages = vec![
            scraped("https://a.test", "A", vec![(SectionKind::Paragraph, "pa")]),
            scraped("https://b.test", "B", vec![(SectionKind::List, "lb")]),
        ];

        let body = final_user_message("q", &pages);
        assert!(body.contains(
            "Content from https://a.test:\nTitle: A\nPARAGRAPH: pa\n\n\
             Content from https://b.test:\nTitle: B\nLIST: lb"
        ));
    }

    #[test]
    fn empty_scrape_still_carries_the_context_header() {
        let body = final_user_message("no links here", &[]);
        assert_eq!(body, "Question: no links here\n\nScraped Context:\n");
    }

    #[test]
    fn degraded_page_renders_header_with_no_section_lines() {
        let pages = vec![scraped("https://down.test", "", vec![])];
        let body = final_user_message("q", &pages);
        assert!(body.ends_with("Content from https://down.test:\nTitle: \n"));
    }

    struct StubCompletion;

    #[async_trait::async_trait]
    impl pagetalk_llm::CompletionClient for StubCompletion {
        async fn complete(&self, messages: &[ChatMessage]) -> pagetalk_common::Result<String> {
            Ok(format!("answered from {} messages", messages.len()))
        }
        async fn health_check(&self) -> pagetalk_common::Result<bool> {
            Ok(true)
        }
        fn model_name(&self) -> &str {
            "stub"
        }
    }

    struct NoFetch;

    #[async_trait::async_trait]
    impl pagetalk_web::scrape::PageFetcher for NoFetch {
        async fn fetch(&self, _url: &str) -> anyhow::Result<String> {
            anyhow::bail!("unavailable")
        }
    }

    struct NoRender;

    #[async_trait::async_trait]
    impl pagetalk_web::browser::PageRenderer for NoRender {
        async fn render(&self, _url: &str) -> anyhow::Result<String> {
            anyhow::bail!("unavailable")
        }
    }

    #[tokio::test]
    async fn handler_answers_and_persists_both_turns() {
        use pagetalk_web::cache::{ContentCache, MemoryStore};
        use pagetalk_web::ScrapeOrchestrator;

        let kv = Arc::new(MemoryStore::new());
        let state = AppState {
            orchestrator: ScrapeOrchestrator::new(
                Arc::new(NoFetch),
                Arc::new(NoRender),
                ContentCache::new(kv.clone(), Duration::from_secs(60), 1_000_000),
                4,
            ),
            completions: Arc::new(StubCompletion),
            conversations: ConversationStore::new(kv),
            max_context_turns: 10,
        };

        let req = ChatRequest {
            message: "hello there".into(),
            context: Vec::new(),
            conversation_id: Some("c9".into()),
        };
        let Json(resp) = chat_handler(State(state.clone()), Json(req))
            .await
            .expect("completion succeeds");

        // system prompt + final user message, no history yet
        assert_eq!(resp.role, "system");
        assert_eq!(resp.content, "answered from 2 messages");
        assert_eq!(resp.conversation_id, "c9");

        let history = state.conversations.load("c9").await;
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].role, TurnRole::User);
        assert_eq!(history[0].content, "hello there");
        assert_eq!(history[1].role, TurnRole::System);
        assert_eq!(history[1].content, resp.content);
    }

    #[tokio::test]
    async fn conversation_store_round_trips_and_heals_corruption() {
        use pagetalk_web::cache::MemoryStore;

        let kv = Arc::new(MemoryStore::new());
        let store = ConversationStore::new(kv.clone());

        assert!(store.load("c1").await.is_empty());

        let turns = vec![turn(TurnRole::User, "hi"), turn(TurnRole::System, "hello")];
        store.save("c1", &turns).await;
        let loaded = store.load("c1").await;
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].content, "hi");

        kv.set(
            &ConversationStore::key("c1"),
            "[broken".into(),
            Duration::from_secs(60),
        )
        .await
        .unwrap();
        assert!(store.load("c1").await.is_empty());
        assert!(kv
            .get(&ConversationStore::key("c1"))
            .await
            .unwrap()
            .is_none());
    }
}
