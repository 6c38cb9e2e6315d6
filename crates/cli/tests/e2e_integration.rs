//! End-to-end tests for the research pipeline: scripted model, real tools,
//! in-memory corpus, streamed events.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use quranlens_agent::prompt::BUDGET_EXHAUSTED_HEADER;
use quranlens_agent::{AgentEvent, AgentSettings, ResearchAgent, RunInput};
use quranlens_core::error::CompletionError;
use quranlens_core::message::{Message, MessageToolCall, Role};
use quranlens_core::provider::{
    EmbeddingRequest, EmbeddingResponse, Provider, ProviderRequest, ProviderResponse, Usage,
};
use quranlens_core::quran::{Surah, TafsirChunk};
use quranlens_core::store::RequestId;
use quranlens_store::InMemoryStore;
use quranlens_tools::{QueryEmbedder, QuranTools};
use tokio_util::sync::CancellationToken;

// ── Mock Provider ────────────────────────────────────────────────────────

/// Replays scripted turns in order and embeds every query as a fixed vector.
struct ScriptedProvider {
    responses: Mutex<VecDeque<ProviderResponse>>,
    requests: Mutex<Vec<ProviderRequest>>,
}

impl ScriptedProvider {
    fn new(responses: Vec<ProviderResponse>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            requests: Mutex::new(vec![]),
        }
    }

    fn tool_then_text(tool_calls: Vec<MessageToolCall>, answer: &str) -> Self {
        Self::new(vec![tool_response(tool_calls), text_response(answer)])
    }

    fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    fn last_request(&self) -> ProviderRequest {
        self.requests.lock().unwrap().last().cloned().unwrap()
    }
}

#[async_trait::async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "e2e_mock"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, CompletionError> {
        self.requests.lock().unwrap().push(request);
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| CompletionError::Network("ScriptedProvider exhausted".into()))
    }

    async fn embed(&self, request: EmbeddingRequest) -> Result<EmbeddingResponse, CompletionError> {
        Ok(EmbeddingResponse {
            embeddings: vec![vec![1.0, 0.0, 0.0]],
            model: request.model,
            usage: None,
        })
    }
}

fn usage() -> Option<Usage> {
    Some(Usage {
        prompt_tokens: 10,
        completion_tokens: 5,
        total_tokens: 15,
    })
}

fn text_response(text: &str) -> ProviderResponse {
    ProviderResponse {
        message: Message::assistant(text),
        finish_reason: Some("stop".into()),
        usage: usage(),
        model: "mock".into(),
    }
}

fn tool_response(tool_calls: Vec<MessageToolCall>) -> ProviderResponse {
    ProviderResponse {
        message: Message::assistant_with_tools("", tool_calls),
        finish_reason: Some("tool_calls".into()),
        usage: usage(),
        model: "mock".into(),
    }
}

fn make_tool_call(id: &str, name: &str, args: serde_json::Value) -> MessageToolCall {
    MessageToolCall {
        id: id.to_string(),
        name: name.to_string(),
        arguments: serde_json::to_string(&args).unwrap(),
    }
}

// ── Corpus ───────────────────────────────────────────────────────────────

async fn corpus() -> Arc<InMemoryStore> {
    let store = Arc::new(InMemoryStore::new());
    store.insert_request(RequestId(1)).await;

    let ayahs = [
        ("1:1", "بِسْمِ اللَّهِ الرَّحْمَٰنِ الرَّحِيمِ", vec![0.0, 1.0, 0.0]),
        ("1:2", "الْحَمْدُ لِلَّهِ رَبِّ الْعَالَمِينَ", vec![0.0, 0.0, 1.0]),
        (
            "2:153",
            "يَا أَيُّهَا الَّذِينَ آمَنُوا اسْتَعِينُوا بِالصَّبْرِ وَالصَّلَاةِ",
            vec![1.0, 0.0, 0.0],
        ),
        ("2:255", "اللَّهُ لَا إِلَٰهَ إِلَّا هُوَ الْحَيُّ الْقَيُّومُ", vec![0.0, 0.6, 0.8]),
    ];
    for (key, text, embedding) in ayahs {
        store.insert_ayah(1, key.parse().unwrap(), text, Some(embedding)).await;
    }

    store
        .insert_tafsir(TafsirChunk {
            id: 7,
            edition_id: 1,
            surah: 2,
            ayah: 255,
            ayah_keys: vec!["2:255".into()],
            chunk_idx: 0,
            text: "هذه آية الكرسي وهي أعظم آية في كتاب الله".into(),
            score: None,
        })
        .await;
    store
        .insert_surah(Surah {
            id: 1,
            name_ar: "الفاتحة".into(),
            name_en: "Al-Fatiha".into(),
            revelation: "meccan".into(),
            ayah_count: 7,
            page_start: Some(1),
            page_end: Some(1),
        })
        .await;

    store
}

async fn research_agent(provider: Arc<ScriptedProvider>) -> Arc<ResearchAgent> {
    let embedder = QueryEmbedder::new(provider.clone(), "text-embedding-3-large", None);
    let tools = Arc::new(QuranTools::new(corpus().await, embedder));
    Arc::new(ResearchAgent::new(provider, tools, AgentSettings::default()))
}

async fn collect(agent: &Arc<ResearchAgent>, input: RunInput) -> Vec<AgentEvent> {
    let mut rx = agent.run_stream(input, CancellationToken::new());
    let mut events = Vec::new();
    while let Some(event) = rx.recv().await {
        events.push(event);
    }
    events
}

fn streamed_text(events: &[AgentEvent]) -> String {
    events
        .iter()
        .filter_map(|e| match e {
            AgentEvent::Chunk { content } => Some(content.as_str()),
            _ => None,
        })
        .collect()
}

fn final_response(events: &[AgentEvent]) -> &str {
    match events.last() {
        Some(AgentEvent::Done { full_response, .. }) => full_response,
        other => panic!("expected done, got {other:?}"),
    }
}

// ── E2E: keyword search then answer ──────────────────────────────────────

#[tokio::test]
async fn e2e_keyword_search_then_answer() {
    let provider = Arc::new(ScriptedProvider::tool_then_text(
        vec![make_tool_call(
            "call_1",
            "search_quran_by_keywords",
            serde_json::json!({"query": "الرَّحْمَنِ الرَّحِيمِ"}),
        )],
        "وردت في البسملة",
    ));
    let agent = research_agent(provider.clone()).await;

    let events = collect(&agent, RunInput::new("أين ورد الرحمن الرحيم؟")).await;

    let tool_calls: Vec<_> = events
        .iter()
        .filter_map(|e| match e {
            AgentEvent::ToolCall { data } => Some(data),
            _ => None,
        })
        .collect();
    assert_eq!(tool_calls.len(), 1);
    assert_eq!(tool_calls[0].tool, "search_quran_by_keywords");
    assert_eq!(tool_calls[0].result[0]["ayah_key"], "1:1");

    let text = streamed_text(&events);
    assert!(text.contains("✅ تم العثور على 1 نتيجة"));
    assert!(text.ends_with("وردت في البسملة"));
    assert_eq!(final_response(&events), text);
    assert_eq!(provider.calls(), 2);

    // The tool result travels back to the model under the call's id.
    let second = provider.last_request();
    let tool_message = second
        .messages
        .iter()
        .find(|m| m.role == Role::Tool)
        .expect("tool result message");
    assert_eq!(tool_message.tool_call_id.as_deref(), Some("call_1"));
}

// ── E2E: two tools in one turn ───────────────────────────────────────────

#[tokio::test]
async fn e2e_tafsir_and_surah_info_in_one_turn() {
    let provider = Arc::new(ScriptedProvider::tool_then_text(
        vec![
            make_tool_call("call_a", "get_tafsir_for_ayah", serde_json::json!({"ayah_key": "2:255"})),
            make_tool_call("call_b", "get_surah_info", serde_json::json!({"surah_number": 1})),
        ],
        "آية الكرسي أعظم آية",
    ));
    let agent = research_agent(provider.clone()).await;

    let events = collect(&agent, RunInput::new("ما تفسير آية الكرسي؟")).await;

    let tools: Vec<_> = events
        .iter()
        .filter_map(|e| match e {
            AgentEvent::ToolCall { data } => Some(data.tool.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(tools, ["get_tafsir_for_ayah", "get_surah_info"]);

    let second = provider.last_request();
    let ids: Vec<_> = second
        .messages
        .iter()
        .filter(|m| m.role == Role::Tool)
        .filter_map(|m| m.tool_call_id.clone())
        .collect();
    assert_eq!(ids, ["call_a", "call_b"]);

    match events.last() {
        Some(AgentEvent::Done { usage, .. }) => assert_eq!(usage.total_tokens, 30),
        other => panic!("expected done, got {other:?}"),
    }
}

// ── E2E: semantic search ─────────────────────────────────────────────────

#[tokio::test]
async fn e2e_meaning_search_uses_embeddings() {
    let provider = Arc::new(ScriptedProvider::tool_then_text(
        vec![make_tool_call(
            "call_1",
            "search_quran_by_meaning",
            serde_json::json!({"query": "الصبر عند الشدائد", "similarity_threshold": 0.9}),
        )],
        "الاستعانة بالصبر والصلاة",
    ));
    let agent = research_agent(provider.clone()).await;

    let events = collect(&agent, RunInput::new("ماذا يقول القرآن عن الصبر؟")).await;

    let result = events
        .iter()
        .find_map(|e| match e {
            AgentEvent::ToolCall { data } => Some(data.result.clone()),
            _ => None,
        })
        .unwrap();
    let hits = result.as_array().unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0]["ayah_key"], "2:153");
    assert!(hits[0]["similarity_score"].as_f64().unwrap() > 0.99);
}

// ── E2E: empty results reach the model as a sentinel ─────────────────────

#[tokio::test]
async fn e2e_no_results_reported_to_model() {
    let provider = Arc::new(ScriptedProvider::tool_then_text(
        vec![make_tool_call(
            "call_1",
            "search_tafsir",
            serde_json::json!({"query": "zzzz"}),
        )],
        "لم أجد شيئاً",
    ));
    let agent = research_agent(provider.clone()).await;

    let events = collect(&agent, RunInput::new("zzzz")).await;

    assert!(streamed_text(&events).contains("⚠️ لم يتم العثور على نتائج"));
    let second = provider.last_request();
    let tool_message = second.messages.iter().find(|m| m.role == Role::Tool).unwrap();
    assert!(tool_message.content.contains("no_results"));
}

// ── E2E: iteration budget ────────────────────────────────────────────────

#[tokio::test]
async fn e2e_budget_exhaustion_falls_back_to_last_result() {
    let turns = (0..5)
        .map(|i| {
            tool_response(vec![make_tool_call(
                &format!("call_{i}"),
                "get_surah_info",
                serde_json::json!({"surah_number": 1}),
            )])
        })
        .collect();
    let provider = Arc::new(ScriptedProvider::new(turns));
    let agent = research_agent(provider.clone()).await;

    let events = collect(&agent, RunInput::new("حدثني عن الفاتحة")).await;

    assert_eq!(provider.calls(), 5);
    let answer = final_response(&events);
    assert!(answer.contains(BUDGET_EXHAUSTED_HEADER));
    assert!(answer.contains("الفاتحة"));
    match events.last() {
        Some(AgentEvent::Done { usage, .. }) => assert_eq!(usage.total_tokens, 75),
        other => panic!("expected done, got {other:?}"),
    }
}

// ── E2E: bad arguments do not end the run ────────────────────────────────

#[tokio::test]
async fn e2e_invalid_arguments_are_reported_and_run_continues() {
    let provider = Arc::new(ScriptedProvider::tool_then_text(
        vec![make_tool_call(
            "call_1",
            "get_surah_ayahs",
            serde_json::json!({"surah_number": 200}),
        )],
        "رقم السورة غير صحيح",
    ));
    let agent = research_agent(provider.clone()).await;

    let events = collect(&agent, RunInput::new("اعرض السورة 200")).await;

    let failure = events
        .iter()
        .find_map(|e| match e {
            AgentEvent::ToolCall { data } => Some(data.result.clone()),
            _ => None,
        })
        .unwrap();
    assert!(failure["error"].is_string());
    assert!(streamed_text(&events).contains("❌ تعذّر تنفيذ الأداة"));
    assert_eq!(final_response(&events), streamed_text(&events));
}
