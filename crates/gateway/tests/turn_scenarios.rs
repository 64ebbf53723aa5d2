//! End-to-end turn scenarios against a scripted model provider.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::Barrier;

use ellis_domain::config::Config;
use ellis_domain::persona::{GREETING, NON_TEXT_REPLY, PERSONA_PROMPT};
use ellis_domain::{Error, Message, ProviderErrorKind, Role};
use ellis_gateway::bootstrap::build_with_provider;
use ellis_gateway::channel::{respond, Inbound, Reply};
use ellis_gateway::state::AppState;
use ellis_providers::{ChatRequest, ChatResponse, LlmProvider};

// ── Scripted provider ─────────────────────────────────────────────────

enum Step {
    Reply(String),
    Fail(Error),
    Hang,
}

#[derive(Default)]
struct ScriptedProvider {
    steps: Mutex<VecDeque<Step>>,
    requests: Mutex<Vec<ChatRequest>>,
    delay: Option<Duration>,
    barrier: Option<Arc<Barrier>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl ScriptedProvider {
    fn with_steps(steps: impl IntoIterator<Item = Step>) -> Self {
        Self {
            steps: Mutex::new(steps.into_iter().collect()),
            ..Self::default()
        }
    }

    fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().clone()
    }
}

#[async_trait::async_trait]
impl LlmProvider for ScriptedProvider {
    async fn chat(&self, req: &ChatRequest) -> ellis_domain::Result<ChatResponse> {
        self.requests.lock().push(req.clone());
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if let Some(barrier) = &self.barrier {
            barrier.wait().await;
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let step = self.steps.lock().pop_front();
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        match step {
            Some(Step::Reply(text)) => Ok(ChatResponse {
                content: text,
                usage: None,
                model: "scripted".into(),
                finish_reason: Some("stop".into()),
            }),
            Some(Step::Fail(e)) => Err(e),
            Some(Step::Hang) => std::future::pending().await,
            None => Ok(ChatResponse {
                content: "ok".into(),
                usage: None,
                model: "scripted".into(),
                finish_reason: Some("stop".into()),
            }),
        }
    }

    fn provider_id(&self) -> &str {
        "scripted"
    }

    fn default_model(&self) -> &str {
        "scripted"
    }
}

fn state_with(config: Config, provider: Arc<ScriptedProvider>) -> AppState {
    build_with_provider(Arc::new(config), provider).unwrap()
}

fn provider_error(kind: ProviderErrorKind) -> Error {
    Error::Provider {
        provider: "groq".into(),
        kind,
        message: "HTTP - upstream said no".into(),
    }
}

// ── Scenarios ─────────────────────────────────────────────────────────

#[tokio::test]
async fn successful_turn_stores_user_and_reply() {
    let provider = Arc::new(ScriptedProvider::with_steps([Step::Reply(
        "Did you fail an exam, or are you a failure?".into(),
    )]));
    let state = state_with(Config::default(), provider.clone());

    let reply = state
        .executor
        .handle_turn("42", "I failed my exam and I'm worthless")
        .await;
    assert_eq!(reply, "Did you fail an exam, or are you a failure?");

    let requests = provider.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(
        requests[0].messages,
        vec![
            Message::system(PERSONA_PROMPT),
            Message::user("I failed my exam and I'm worthless"),
        ]
    );

    assert_eq!(
        state.store.get_history("42"),
        vec![
            Message::user("I failed my exam and I'm worthless"),
            Message::assistant("Did you fail an exam, or are you a failure?"),
        ]
    );
}

#[tokio::test]
async fn rate_limit_keeps_only_user_message() {
    let provider = Arc::new(ScriptedProvider::with_steps([Step::Fail(provider_error(
        ProviderErrorKind::RateLimited,
    ))]));
    let state = state_with(Config::default(), provider);

    let reply = state.executor.handle_turn("42", "hello").await;
    assert_eq!(reply, "Rate limit exceeded. Try again later.");
    assert_eq!(state.store.get_history("42"), vec![Message::user("hello")]);
}

#[tokio::test]
async fn every_failure_class_maps_to_its_reply() {
    let cases = [
        (provider_error(ProviderErrorKind::BadRequest), "Invalid request. Please check your input.".to_owned()),
        (provider_error(ProviderErrorKind::Unauthorized), "Unauthorized. Check the API key.".to_owned()),
        (provider_error(ProviderErrorKind::NotFound), "Model not found. Verify the model name.".to_owned()),
        (provider_error(ProviderErrorKind::Internal), "Internal server error. Try again later.".to_owned()),
        (
            provider_error(ProviderErrorKind::Other),
            "An unexpected error occurred: provider groq (other): HTTP - upstream said no".to_owned(),
        ),
        (
            Error::Http("connection reset".into()),
            "An unexpected error occurred: HTTP: connection reset".to_owned(),
        ),
    ];

    for (i, (err, expected)) in cases.into_iter().enumerate() {
        let provider = Arc::new(ScriptedProvider::with_steps([Step::Fail(err)]));
        let state = state_with(Config::default(), provider);
        let thread = format!("t{i}");

        assert_eq!(state.executor.handle_turn(&thread, "hi").await, expected);
        assert_eq!(state.store.get_history(&thread).len(), 1);
    }
}

#[tokio::test(start_paused = true)]
async fn model_timeout_is_a_failed_turn() {
    let provider = Arc::new(ScriptedProvider::with_steps([Step::Hang]));
    let mut config = Config::default();
    config.llm.timeout_ms = 50;
    let state = state_with(config, provider);

    let reply = state.executor.handle_turn("42", "hello?").await;
    assert!(reply.starts_with("An unexpected error occurred: timeout"), "{reply}");
    assert_eq!(state.store.get_history("42"), vec![Message::user("hello?")]);
}

#[tokio::test]
async fn history_is_trimmed_before_the_call() {
    let provider = Arc::new(ScriptedProvider::default());
    let mut config = Config::default();
    config.history.budget = 3;
    let state = state_with(config, provider.clone());

    for i in 0..3 {
        state.store.append("7", Message::user(format!("q{i}")));
        state.store.append("7", Message::assistant(format!("a{i}")));
    }

    state.executor.handle_turn("7", "q3").await;

    let sent = &provider.requests()[0].messages;
    assert_eq!(
        sent,
        &vec![
            Message::system(PERSONA_PROMPT),
            Message::user("q2"),
            Message::assistant("a2"),
            Message::user("q3"),
        ]
    );
    // The store keeps everything; only the request is trimmed.
    assert_eq!(state.store.get_history("7").len(), 8);
}

#[tokio::test]
async fn same_thread_turns_are_serialized() {
    let provider = Arc::new(ScriptedProvider {
        delay: Some(Duration::from_millis(20)),
        ..ScriptedProvider::default()
    });
    let state = state_with(Config::default(), provider.clone());

    let handles: Vec<_> = (0..5)
        .map(|i| {
            let executor = state.executor.clone();
            tokio::spawn(async move { executor.handle_turn("42", &format!("m{i}")).await })
        })
        .collect();
    for h in handles {
        assert_eq!(h.await.unwrap(), "ok");
    }

    assert_eq!(provider.max_in_flight.load(Ordering::SeqCst), 1);

    // Turns queue on the thread lock in the order they were started.
    let history = state.store.get_history("42");
    assert_eq!(history.len(), 10);
    for (i, pair) in history.chunks(2).enumerate() {
        assert_eq!(pair[0], Message::user(format!("m{i}")));
        assert_eq!(pair[1].role, Role::Assistant);
    }
}

#[tokio::test]
async fn different_threads_run_concurrently() {
    // Both calls must be inside the provider at once to pass the barrier.
    let provider = Arc::new(ScriptedProvider {
        barrier: Some(Arc::new(Barrier::new(2))),
        ..ScriptedProvider::default()
    });
    let state = state_with(Config::default(), provider.clone());

    let a = state.executor.clone();
    let b = state.executor.clone();
    let both = async {
        tokio::join!(a.handle_turn("1", "from one"), b.handle_turn("2", "from two"))
    };
    let (ra, rb) = tokio::time::timeout(Duration::from_secs(5), both)
        .await
        .expect("turns on different threads blocked each other");

    assert_eq!((ra.as_str(), rb.as_str()), ("ok", "ok"));
    assert_eq!(provider.max_in_flight.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn non_text_and_start_never_reach_the_model() {
    let provider = Arc::new(ScriptedProvider::default());
    let state = state_with(Config::default(), provider.clone());

    let reply = respond(&state.executor, GREETING, "42", Inbound::NonText("photo")).await;
    assert_eq!(
        reply,
        Reply {
            text: NON_TEXT_REPLY.into(),
            quote: true
        }
    );

    let reply = respond(&state.executor, GREETING, "42", Inbound::Start).await;
    assert_eq!(reply.text, GREETING);
    assert!(!reply.quote);

    assert!(provider.requests().is_empty());
    assert!(state.store.get_history("42").is_empty());

    let reply = respond(&state.executor, GREETING, "42", Inbound::Text("hi".into())).await;
    assert_eq!(reply.text, "ok");
    assert_eq!(state.store.get_history("42").len(), 2);
}

#[tokio::test]
async fn persistent_store_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = Config::default();
    config.sessions.persist = true;
    config.sessions.dir = dir.path().to_path_buf();

    {
        let provider = Arc::new(ScriptedProvider::with_steps([Step::Reply("first reply".into())]));
        let state = state_with(config.clone(), provider);
        state.executor.handle_turn("42", "first").await;
    }

    let provider = Arc::new(ScriptedProvider::default());
    let state = state_with(config, provider.clone());
    state.executor.handle_turn("42", "second").await;

    assert_eq!(
        provider.requests()[0].messages,
        vec![
            Message::system(PERSONA_PROMPT),
            Message::user("first"),
            Message::assistant("first reply"),
            Message::user("second"),
        ]
    );
}
