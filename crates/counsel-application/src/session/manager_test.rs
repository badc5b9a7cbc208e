use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use counsel_core::backend::{ByteStream, ChatReply};
use counsel_core::chat::SessionType;
use counsel_core::connectivity::ConnectivityFlag;
use counsel_core::council::Stage;
use counsel_core::identity::StaticIdentity;
use counsel_core::notice::{Notice, NoticeLevel};
use futures::StreamExt;
use tokio::sync::mpsc::UnboundedReceiver;

use super::*;

/// What the next `open_stream` call does.
enum MockStream {
    Chunks(Vec<Vec<u8>>),
    Fail(CounselError),
    FailAfter(Vec<Vec<u8>>, CounselError),
    /// Yields the chunks, then never ends.
    Hang(Vec<Vec<u8>>),
}

#[derive(Default)]
struct MockBackend {
    streams: Mutex<VecDeque<MockStream>>,
    replies: Mutex<VecDeque<Result<ChatReply>>>,
    histories: Mutex<HashMap<String, Vec<ChatMessage>>>,
    requests: Mutex<Vec<ChatRequest>>,
    stream_calls: AtomicUsize,
    created: AtomicUsize,
    /// Marked unreachable when a scripted failure surfaces, reachable on
    /// every opened stream.
    connectivity: Option<ConnectivityFlag>,
}

impl MockBackend {
    fn script(&self, stream: MockStream) {
        self.streams.lock().unwrap().push_back(stream);
    }

    fn reply(&self, reply: Result<ChatReply>) {
        self.replies.lock().unwrap().push_back(reply);
    }

    fn history(&self, session_id: &str, messages: Vec<ChatMessage>) {
        self.histories
            .lock()
            .unwrap()
            .insert(session_id.to_string(), messages);
    }

    fn stream_calls(&self) -> usize {
        self.stream_calls.load(Ordering::SeqCst)
    }

    fn mark_reachable(&self, reachable: bool) {
        if let Some(flag) = &self.connectivity {
            flag.mark_reachable(reachable);
        }
    }
}

fn session(id: &str) -> ChatSession {
    ChatSession {
        id: id.to_string(),
        title: DEFAULT_SESSION_TITLE.to_string(),
        session_type: SessionType::Main,
        created_at: None,
        last_message_at: None,
    }
}

/// Yields `chunks`, then `tail` as a read error. Like the HTTP backend, the
/// server is marked unreachable only once that error is read.
fn body(
    chunks: Vec<Vec<u8>>,
    tail: Option<CounselError>,
    connectivity: Option<ConnectivityFlag>,
) -> ByteStream {
    let head = futures::stream::iter(chunks).map(|chunk| Ok(Bytes::from(chunk)));
    let tail = futures::stream::iter(tail).map(move |err| {
        if let Some(flag) = &connectivity {
            flag.mark_reachable(false);
        }
        Err::<Bytes, _>(err)
    });
    Box::pin(head.chain(tail))
}

#[async_trait]
impl ChatBackend for MockBackend {
    async fn list_sessions(&self, _session_type: SessionType) -> Result<Vec<ChatSession>> {
        let mut ids: Vec<String> = self.histories.lock().unwrap().keys().cloned().collect();
        ids.sort();
        Ok(ids.iter().map(|id| session(id)).collect())
    }

    async fn get_session(&self, session_id: &str) -> Result<ChatSession> {
        if self.histories.lock().unwrap().contains_key(session_id) {
            Ok(session(session_id))
        } else {
            Err(CounselError::not_found("session", session_id))
        }
    }

    async fn get_messages(&self, session_id: &str) -> Result<Vec<ChatMessage>> {
        Ok(self
            .histories
            .lock()
            .unwrap()
            .get(session_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn create_session(&self, request: &CreateSessionRequest) -> Result<ChatSession> {
        let n = self.created.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(ChatSession {
            title: request.title.clone(),
            session_type: request.session_type,
            ..session(&format!("s-new-{n}"))
        })
    }

    async fn send_message(&self, request: &ChatRequest) -> Result<ChatReply> {
        self.requests.lock().unwrap().push(request.clone());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(CounselError::internal("no scripted reply")))
    }

    async fn open_stream(&self, request: &ChatRequest) -> Result<ByteStream> {
        self.stream_calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request.clone());
        let next = self
            .streams
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| MockStream::Chunks(vec![b"data: [DONE]\n\n".to_vec()]));

        match next {
            MockStream::Chunks(chunks) => {
                self.mark_reachable(true);
                Ok(body(chunks, None, None))
            }
            MockStream::Fail(err) => {
                self.mark_reachable(false);
                Err(err)
            }
            MockStream::FailAfter(chunks, err) => {
                self.mark_reachable(true);
                Ok(body(chunks, Some(err), self.connectivity.clone()))
            }
            MockStream::Hang(chunks) => {
                self.mark_reachable(true);
                let pending = futures::stream::pending();
                Ok(Box::pin(body(chunks, None, None).chain(pending)))
            }
        }
    }
}

struct Harness {
    manager: Arc<ChatSessionManager>,
    backend: Arc<MockBackend>,
    connectivity: ConnectivityFlag,
    notices: UnboundedReceiver<Notice>,
}

impl Harness {
    fn drain_notices(&mut self) -> Vec<Notice> {
        let mut notices = Vec::new();
        while let Ok(notice) = self.notices.try_recv() {
            notices.push(notice);
        }
        notices
    }

    fn messages(&self) -> Vec<ChatMessage> {
        self.manager.store().read(|s| s.messages.clone())
    }
}

fn harness_with(settings: ClientSettings, user_id: Option<&str>, flip_offline: bool) -> Harness {
    let connectivity = ConnectivityFlag::new(true);
    let backend = Arc::new(MockBackend {
        connectivity: flip_offline.then(|| connectivity.clone()),
        ..Default::default()
    });
    let (notifier, notices) = Notifier::channel();
    let identity = StaticIdentity::new(Some("token".into()), user_id.map(str::to_string));
    let manager = ChatSessionManager::new(
        backend.clone(),
        Arc::new(identity),
        Arc::new(connectivity.clone()),
        settings,
    )
    .with_notifier(notifier);

    Harness {
        manager: Arc::new(manager),
        backend,
        connectivity,
        notices,
    }
}

fn harness() -> Harness {
    harness_with(ClientSettings::default(), Some("user-1"), false)
}

fn frame(json: &str) -> String {
    format!("data: {json}\n\n")
}

fn done() -> String {
    "data: [DONE]\n\n".to_string()
}

/// Splits `text` into chunks of `size` bytes, ignoring char boundaries.
fn chunked(text: &str, size: usize) -> Vec<Vec<u8>> {
    text.as_bytes().chunks(size).map(<[u8]>::to_vec).collect()
}

#[tokio::test]
async fn test_streaming_send_end_to_end() {
    let h = harness();
    let question = "ما هي جلساتي القادمة؟";
    let script = [
        frame(r#"{"type":"stage_change","stage":"ROUTING"}"#),
        frame(r#"{"type":"user_message_saved","message_id":"srv-u"}"#),
        frame(r#"{"type":"step_update","payload":{"actor":"Scheduler","message":"Checking the calendar"}}"#),
        frame(r#"{"type":"stage_change","stage":"DELIBERATING"}"#),
        frame(r#"{"type":"reasoning_chunk","content":"جلستان "}"#),
        frame(r#"{"type":"reasoning_chunk","content":"هذا الأسبوع"}"#),
        frame(r#"{"type":"token","content":"لديك "}"#),
        frame(r#"{"type":"token","content":"جلستان."}"#),
        frame(r#"{"type":"ai_message_saved","message_id":"srv-a"}"#),
        done(),
    ]
    .concat();
    h.backend.script(MockStream::Chunks(chunked(&script, 7)));

    let outcome = h.manager.send(question, SendOptions::default()).await.unwrap();
    assert_eq!(outcome, SendOutcome::Completed);

    let messages = h.messages();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].role, MessageRole::User);
    assert_eq!(messages[0].content, question);
    assert_eq!(messages[1].role, MessageRole::Assistant);
    assert_eq!(messages[1].content, "لديك جلستان.");
    assert_eq!(messages[1].reasoning.as_deref(), Some("جلستان هذا الأسبوع"));
    assert!(messages.iter().all(|m| !m.is_optimistic));

    h.manager.store().read(|state| {
        assert_eq!(state.activity.stage, Stage::Verdict);
        assert!(!state.activity.is_thinking);
        assert_eq!(state.active_agents, vec!["Scheduler"]);
        assert_eq!(state.monologue.len(), 1);
    });

    let requests = h.backend.requests.lock().unwrap().clone();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].message, question);
    assert_eq!(requests[0].mode, "council");
    assert_eq!(requests[0].session_id, "s-new-1");
    assert!(!h.manager.is_sending());
}

#[tokio::test]
async fn test_optimistic_message_and_exclusive_send() {
    let h = harness();
    h.backend.script(MockStream::Hang(Vec::new()));
    let mut updates = h.manager.store().subscribe();

    let manager = h.manager.clone();
    let first =
        tokio::spawn(async move { manager.send("Draft a reply", SendOptions::default()).await });

    updates
        .wait_for(|state| !state.messages.is_empty())
        .await
        .unwrap();
    let staged = h.messages();
    assert_eq!(staged.len(), 1);
    assert!(staged[0].is_optimistic);
    assert!(staged[0].has_temp_id());
    assert!(h.manager.is_sending());

    let second = h
        .manager
        .send("Draft a reply", SendOptions::default())
        .await
        .unwrap();
    assert_eq!(second, SendOutcome::Ignored);
    assert_eq!(h.messages().len(), 1);

    h.manager.cancel();
    let outcome = first.await.unwrap().unwrap();
    assert_eq!(outcome, SendOutcome::Aborted);
    assert!(!h.manager.is_sending());
    assert!(!h.manager.store().read(|s| s.activity.is_thinking));
}

#[tokio::test(start_paused = true)]
async fn test_reconnection_is_bounded() {
    let mut h = harness_with(ClientSettings::default(), Some("user-1"), true);
    for _ in 0..5 {
        h.backend
            .script(MockStream::Fail(CounselError::network("connection refused")));
    }

    let err = h
        .manager
        .send("Is the filing late?", SendOptions::default())
        .await
        .unwrap_err();
    assert!(err.is_network());
    assert_eq!(h.backend.stream_calls(), 4);

    let notices = h.drain_notices();
    let warnings: Vec<&str> = notices
        .iter()
        .filter(|n| n.level == NoticeLevel::Warning)
        .map(|n| n.message.as_str())
        .collect();
    assert_eq!(warnings.len(), 3);
    assert!(warnings[0].contains("attempt 1/3"));
    assert!(warnings[2].contains("attempt 3/3"));
    let last = notices.last().unwrap();
    assert_eq!(last.level, NoticeLevel::Error);
    assert!(last.message.contains("after 3 attempts"));

    let messages = h.messages();
    assert_eq!(messages.len(), 1);
    assert!(messages[0].is_failed());
    assert!(!h.manager.is_sending());
}

#[tokio::test(start_paused = true)]
async fn test_send_after_reconnect_give_up_reaches_server() {
    let mut h = harness_with(ClientSettings::default(), Some("user-1"), true);
    for _ in 0..4 {
        h.backend
            .script(MockStream::Fail(CounselError::network("connection refused")));
    }
    let err = h
        .manager
        .send("first", SendOptions::default())
        .await
        .unwrap_err();
    assert!(err.is_network());
    assert_eq!(h.backend.stream_calls(), 4);
    assert!(!h.connectivity.is_online());
    assert!(h.connectivity.runtime_online());
    h.drain_notices();

    h.backend
        .script(MockStream::Chunks(vec![done().into_bytes()]));
    let outcome = h
        .manager
        .send("second", SendOptions::default())
        .await
        .unwrap();

    assert_eq!(outcome, SendOutcome::Completed);
    assert_eq!(h.backend.stream_calls(), 5);
    assert!(h.connectivity.is_online());
    assert!(h.drain_notices().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_reconnect_discards_partial_answer() {
    let mut h = harness_with(ClientSettings::default(), Some("user-1"), true);
    h.backend.script(MockStream::FailAfter(
        vec![frame(r#"{"type":"token","content":"The deadl"}"#).into_bytes()],
        CounselError::network("connection reset"),
    ));
    h.backend.script(MockStream::Chunks(vec![
        frame(r#"{"type":"user_message_saved"}"#).into_bytes(),
        frame(r#"{"type":"token","content":"The deadline is Friday."}"#).into_bytes(),
        frame(r#"{"type":"ai_message_saved"}"#).into_bytes(),
        done().into_bytes(),
    ]));

    let outcome = h
        .manager
        .send("When is the deadline?", SendOptions::default())
        .await
        .unwrap();
    assert_eq!(outcome, SendOutcome::Completed);
    assert_eq!(h.backend.stream_calls(), 2);

    let messages = h.messages();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[1].content, "The deadline is Friday.");
    assert!(messages.iter().all(|m| !m.is_optimistic));

    let notices = h.drain_notices();
    assert_eq!(notices.len(), 1);
    assert!(notices[0].message.contains("attempt 1/3"));
    assert!(h.connectivity.is_online());
}

#[tokio::test(start_paused = true)]
async fn test_timeout_is_not_retried() {
    let mut h = harness_with(ClientSettings::default(), Some("user-1"), true);
    h.backend.script(MockStream::Hang(Vec::new()));

    let err = h
        .manager
        .send("Summarize the contract", SendOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, CounselError::Timeout { seconds: 300 }));
    assert_eq!(h.backend.stream_calls(), 1);

    let notices = h.drain_notices();
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].level, NoticeLevel::Error);
    assert!(notices[0].message.contains("too long"));
    assert!(h.messages()[0].is_failed());
}

#[tokio::test]
async fn test_other_failures_are_not_retried() {
    let mut h = harness();
    h.backend.script(MockStream::Fail(CounselError::Http {
        status: 500,
        message: "orchestrator crashed".into(),
    }));
    let err = h
        .manager
        .send("Hello", SendOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, CounselError::Http { status: 500, .. }));

    // Network failure while the runtime still reports connectivity.
    h.backend
        .script(MockStream::Fail(CounselError::network("connection reset")));
    h.manager
        .send("Hello", SendOptions::default())
        .await
        .unwrap_err();

    assert_eq!(h.backend.stream_calls(), 2);
    let notices = h.drain_notices();
    assert_eq!(notices.len(), 2);
    assert!(notices[0].message.contains("orchestrator crashed"));
}

#[tokio::test]
async fn test_oversized_frame_fails_without_retry() {
    let mut settings = ClientSettings::default();
    settings.stream.max_buffer_bytes = 64;
    let h = harness_with(settings, Some("user-1"), false);
    h.backend.script(MockStream::Chunks(vec![vec![b'x'; 200]]));

    let err = h
        .manager
        .send("Hello", SendOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, CounselError::FrameTooLarge { limit: 64 }));
    assert_eq!(h.backend.stream_calls(), 1);
}

#[tokio::test]
async fn test_failed_message_is_reused_on_retry() {
    let h = harness();
    h.backend.script(MockStream::Fail(CounselError::Http {
        status: 503,
        message: "busy".into(),
    }));
    h.manager
        .send("Review clause 7", SendOptions::default())
        .await
        .unwrap_err();
    let failed_id = h.messages()[0].id.clone();

    h.backend.script(MockStream::Chunks(vec![
        frame(r#"{"type":"user_message_saved","message_id":"srv-1"}"#).into_bytes(),
        done().into_bytes(),
    ]));
    h.manager
        .send("Review clause 7", SendOptions::default())
        .await
        .unwrap();

    let messages = h.messages();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].id, failed_id);
    assert!(!messages[0].is_failed());
    assert!(!messages[0].is_optimistic);
}

#[tokio::test]
async fn test_malformed_frames_and_server_errors_do_not_abort() {
    let mut h = harness();
    h.backend.script(MockStream::Chunks(vec![
        b"garbage without prefix\n\n".to_vec(),
        b"data: {not json}\n\n".to_vec(),
        frame(r#"{"type":"mystery","content":"?"}"#).into_bytes(),
        frame(r#"{"type":"error","content":"Agent unavailable"}"#).into_bytes(),
        frame(r#"{"type":"token","content":"Still here."}"#).into_bytes(),
        done().into_bytes(),
    ]));

    let outcome = h
        .manager
        .send("Hello", SendOptions::default())
        .await
        .unwrap();
    assert_eq!(outcome, SendOutcome::Completed);
    assert_eq!(h.messages()[1].content, "Still here.");

    let notices = h.drain_notices();
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].message, "Agent unavailable");
}

#[tokio::test]
async fn test_trailing_frame_without_done_completes() {
    let h = harness();
    h.backend.script(MockStream::Chunks(vec![
        frame(r#"{"type":"token","content":"Part one, "}"#).into_bytes(),
        br#"data: {"type":"token","content":"part two."}"#.to_vec(),
    ]));

    let outcome = h
        .manager
        .send("Hello", SendOptions::default())
        .await
        .unwrap();
    assert_eq!(outcome, SendOutcome::Completed);
    assert_eq!(h.messages()[1].content, "Part one, part two.");
}

#[tokio::test]
async fn test_simple_send_applies_suggested_title() {
    let h = harness();
    h.backend.reply(Ok(ChatReply {
        user_message: ChatMessage::new("srv-u", "s-new-1", MessageRole::User, "Lease question")
            .with_created_at("2026-03-01T10:00:00Z"),
        ai_message: ChatMessage::new("srv-a", "s-new-1", MessageRole::Assistant, "It renews.")
            .with_created_at("2026-03-01T10:00:05Z"),
        suggested_title: Some("Lease renewal".into()),
    }));

    let options = SendOptions {
        stream: false,
        mode: Some("quick".into()),
        context_summary: Some("Tenant dispute".into()),
    };
    let outcome = h.manager.send("Lease question", options).await.unwrap();
    assert_eq!(outcome, SendOutcome::Completed);

    let ids: Vec<String> = h.messages().into_iter().map(|m| m.id).collect();
    assert_eq!(ids, vec!["srv-u", "srv-a"]);
    assert_eq!(
        h.manager.current_session().await.unwrap().title,
        "Lease renewal"
    );
    assert_eq!(h.manager.sessions().await[0].title, "Lease renewal");

    let request = h.backend.requests.lock().unwrap()[0].clone();
    assert_eq!(request.mode, "quick");
    assert_eq!(request.context_summary.as_deref(), Some("Tenant dispute"));
    assert_eq!(h.backend.stream_calls(), 0);
}

#[tokio::test]
async fn test_simple_send_failure_marks_message() {
    let mut h = harness();
    h.backend.reply(Err(CounselError::Http {
        status: 502,
        message: "bad gateway".into(),
    }));

    let options = SendOptions {
        stream: false,
        ..SendOptions::default()
    };
    h.manager.send("Hello", options).await.unwrap_err();

    assert!(h.messages()[0].is_failed());
    assert_eq!(h.drain_notices()[0].level, NoticeLevel::Error);
}

#[tokio::test]
async fn test_send_preconditions() {
    let mut h = harness();

    let err = h
        .manager
        .send("   ", SendOptions::default())
        .await
        .unwrap_err();
    assert!(err.is_precondition());

    h.connectivity.set_online(false);
    let err = h
        .manager
        .send("Hello", SendOptions::default())
        .await
        .unwrap_err();
    assert!(err.is_precondition());

    assert_eq!(h.backend.stream_calls(), 0);
    assert!(h.messages().is_empty());
    assert_eq!(h.drain_notices().len(), 2);
    assert!(!h.manager.is_sending());
}

#[tokio::test]
async fn test_create_session_requires_user() {
    let mut h = harness_with(ClientSettings::default(), None, false);

    let err = h.manager.create_session(Some("Matter 12")).await.unwrap_err();
    assert!(err.is_auth());

    let err = h
        .manager
        .send("Hello", SendOptions::default())
        .await
        .unwrap_err();
    assert!(err.is_auth());
    assert_eq!(h.drain_notices().len(), 1);
    assert!(h.messages().is_empty());
}

#[tokio::test]
async fn test_create_session_resets_messages() {
    let h = harness();
    h.manager
        .store()
        .dispatch(CouncilAction::UpsertMessage(ChatMessage::new(
            "m-1",
            "s-old",
            MessageRole::User,
            "Old",
        )));

    let created = h.manager.create_session(Some("Matter 12")).await.unwrap();
    assert_eq!(created.title, "Matter 12");
    assert!(h.messages().is_empty());
    assert_eq!(h.manager.current_session().await.unwrap().id, created.id);
    assert_eq!(h.manager.sessions().await[0].id, created.id);
}

#[tokio::test]
async fn test_clear_session_by_type() {
    let main = harness();
    main.manager.create_session(None).await.unwrap();
    assert_eq!(main.manager.clear_session().await.unwrap(), None);
    assert!(main.manager.current_session().await.is_none());

    let mut settings = ClientSettings::default();
    settings.session.session_type = SessionType::Sidebar;
    let sidebar = harness_with(settings, Some("user-1"), false);
    let first = sidebar.manager.create_session(None).await.unwrap();
    sidebar
        .manager
        .store()
        .dispatch(CouncilAction::SetStage(Stage::Deliberating));

    let replacement = sidebar.manager.clear_session().await.unwrap().unwrap();
    assert_ne!(replacement.id, first.id);
    assert_eq!(replacement.session_type, SessionType::Sidebar);
    assert_eq!(
        sidebar.manager.current_session().await.unwrap().id,
        replacement.id
    );
    assert_eq!(
        sidebar.manager.store().read(|s| s.activity.stage),
        Stage::Idle
    );
}

#[tokio::test]
async fn test_load_session_merges_history() {
    let h = harness();
    h.backend.history(
        "s-1",
        vec![
            ChatMessage::new("srv-1", "s-1", MessageRole::User, "Hello")
                .with_created_at("2026-03-01T10:00:00Z"),
            ChatMessage::new("srv-2", "s-1", MessageRole::Assistant, "Hi there")
                .with_created_at("2026-03-01T10:00:01Z"),
        ],
    );
    h.manager
        .store()
        .dispatch(CouncilAction::UpsertMessage(ChatMessage::optimistic(
            "s-1",
            MessageRole::User,
            " Hello ",
        )));

    h.manager.load_session("s-1").await.unwrap();
    h.manager.load_session("s-1").await.unwrap();

    let ids: Vec<String> = h.messages().into_iter().map(|m| m.id).collect();
    assert_eq!(ids, vec!["srv-1", "srv-2"]);
    assert_eq!(h.manager.current_session().await.unwrap().id, "s-1");
}

#[tokio::test]
async fn test_switch_session_clears_previous_state() {
    let h = harness();
    h.backend.history(
        "s-1",
        vec![ChatMessage::new("a-1", "s-1", MessageRole::User, "First matter")],
    );
    h.backend.history(
        "s-2",
        vec![ChatMessage::new("b-1", "s-2", MessageRole::User, "Second matter")],
    );

    h.manager.switch_session("s-1").await.unwrap();
    h.manager
        .store()
        .dispatch(CouncilAction::AppendMonologue {
            agent: "Clerk".into(),
            content: "noted".into(),
        });

    h.manager.switch_session("s-2").await.unwrap();
    let ids: Vec<String> = h.messages().into_iter().map(|m| m.id).collect();
    assert_eq!(ids, vec!["b-1"]);
    assert!(h.manager.store().read(|s| s.monologue.is_empty()));

    let err = h.manager.switch_session("missing").await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_load_other_session_replaces_messages() {
    let h = harness();
    h.backend.history(
        "s-1",
        vec![ChatMessage::new("a-1", "s-1", MessageRole::User, "First matter")],
    );
    h.backend.history(
        "s-2",
        vec![ChatMessage::new("b-1", "s-2", MessageRole::User, "Second matter")],
    );

    h.manager.load_session("s-1").await.unwrap();
    h.manager
        .store()
        .dispatch(CouncilAction::AppendMonologue {
            agent: "Clerk".into(),
            content: "noted".into(),
        });
    h.manager.load_session("s-2").await.unwrap();

    let ids: Vec<String> = h.messages().into_iter().map(|m| m.id).collect();
    assert_eq!(ids, vec!["b-1"]);
    assert!(h.manager.store().read(|s| s.monologue.is_empty()));
    assert_eq!(h.manager.current_session().await.unwrap().id, "s-2");
}

#[tokio::test]
async fn test_switch_session_waits_for_in_flight_send() {
    let h = harness();
    h.backend.history(
        "s-1",
        vec![ChatMessage::new("a-1", "s-1", MessageRole::User, "First matter")],
    );
    h.backend.history(
        "s-2",
        vec![ChatMessage::new("b-1", "s-2", MessageRole::User, "Second matter")],
    );
    h.manager.switch_session("s-1").await.unwrap();
    h.backend.script(MockStream::Hang(vec![
        frame(r#"{"type":"token","content":"The first matter"}"#).into_bytes(),
    ]));

    let mut state = h.manager.store().subscribe();
    let send = h.manager.send("Draft a reply", SendOptions::default());
    let switch = async {
        state
            .wait_for(|s| s.messages.iter().any(|m| m.role == MessageRole::Assistant))
            .await
            .unwrap();
        let session = h.manager.switch_session("s-2").await.unwrap();
        // The aborted send must be fully stopped before the new history lands.
        assert!(!h.manager.is_sending());
        session
    };
    let (outcome, session) = tokio::join!(send, switch);

    assert_eq!(outcome.unwrap(), SendOutcome::Aborted);
    assert_eq!(session.id, "s-2");
    let ids: Vec<String> = h.messages().into_iter().map(|m| m.id).collect();
    assert_eq!(ids, vec!["b-1"]);
    assert!(!h.manager.store().read(|s| s.activity.is_thinking));
}

#[tokio::test]
async fn test_list_sessions_overwrites_local_list() {
    let h = harness();
    h.manager.create_session(None).await.unwrap();
    h.backend.history("s-1", Vec::new());
    h.backend.history("s-2", Vec::new());

    let listed = h.manager.list_sessions().await.unwrap();
    assert_eq!(listed.len(), 2);
    let ids: Vec<String> = h.manager.sessions().await.into_iter().map(|s| s.id).collect();
    assert_eq!(ids, vec!["s-1", "s-2"]);
}

#[tokio::test]
async fn test_dispose_stops_state_writes() {
    let h = harness();
    h.manager.dispose();

    let outcome = h
        .manager
        .send("Hello", SendOptions::default())
        .await
        .unwrap();
    assert_eq!(outcome, SendOutcome::Ignored);
    assert_eq!(h.backend.stream_calls(), 0);
    assert!(h.backend.requests.lock().unwrap().is_empty());
    assert_eq!(h.backend.created.load(Ordering::SeqCst), 0);
    assert!(h.messages().is_empty());
    assert!(h.manager.store().is_disposed());
}

#[tokio::test]
async fn test_reset_activity_keeps_messages() {
    let h = harness();
    h.backend.script(MockStream::Chunks(chunked(
        &[
            frame(r#"{"type":"stage_change","stage":"DELIBERATING"}"#),
            frame(r#"{"type":"step_update","payload":{"actor":"Clerk","message":"Filing"}}"#),
            done(),
        ]
        .concat(),
        16,
    )));
    h.manager
        .send("Status of case 12?", SendOptions::default())
        .await
        .unwrap();
    assert_eq!(h.manager.store().read(|s| s.monologue.len()), 1);

    h.manager.reset_activity();

    let state = h.manager.store().snapshot();
    assert_eq!(state.activity.stage, Stage::Idle);
    assert!(state.active_agents.is_empty());
    assert!(state.monologue.is_empty());
    assert_eq!(state.messages.len(), 1);
}
