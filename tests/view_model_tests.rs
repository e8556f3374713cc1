//! Main and settings view flows with stub senders and a scripted recogniser

use async_trait::async_trait;
use crossbeam_channel::{bounded, Receiver, Sender};
use httpmock::Method::POST;
use httpmock::MockServer;
use inboxhub::api::MessageSender;
use inboxhub::profiles::{EndpointProfile, MemoryStore, ProfileEdit, ProfileStore};
use inboxhub::speech::{SpeechEvent, SpeechRecognitionError, SpeechRecognizer};
use inboxhub::ui::{MainViewModel, SendPhase, SettingsViewModel};
use inboxhub::{AppConfig, InboxError, SendError, WorkflowClient};
use parking_lot::Mutex;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

const WAIT: Duration = Duration::from_secs(5);

/// Records every call and answers with a fixed outcome
struct StubSender {
    outcome: Result<String, SendError>,
    calls: Mutex<Vec<(String, String)>>,
    gate: Option<Receiver<()>>,
}

impl StubSender {
    fn ok(output: &str) -> Arc<Self> {
        Arc::new(Self {
            outcome: Ok(output.to_string()),
            calls: Mutex::new(Vec::new()),
            gate: None,
        })
    }

    fn failing(error: SendError) -> Arc<Self> {
        Arc::new(Self {
            outcome: Err(error),
            calls: Mutex::new(Vec::new()),
            gate: None,
        })
    }

    /// Holds every send until the returned sender is signalled
    fn gated(output: &str) -> (Arc<Self>, Sender<()>) {
        let (tx, rx) = bounded(4);
        let sender = Arc::new(Self {
            outcome: Ok(output.to_string()),
            calls: Mutex::new(Vec::new()),
            gate: Some(rx),
        });
        (sender, tx)
    }

    fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl MessageSender for StubSender {
    async fn send(&self, text: &str, profile: &EndpointProfile) -> Result<String, SendError> {
        self.calls.lock().push((text.to_string(), profile.id.clone()));
        if let Some(gate) = &self.gate {
            let _ = gate.recv_timeout(WAIT);
        }
        self.outcome.clone()
    }
}

/// Fails the first call, succeeds afterwards
struct FlakySender {
    calls: Mutex<u32>,
}

#[async_trait]
impl MessageSender for FlakySender {
    async fn send(&self, _text: &str, _profile: &EndpointProfile) -> Result<String, SendError> {
        let call = {
            let mut calls = self.calls.lock();
            *calls += 1;
            *calls
        };
        if call == 1 {
            Err(SendError::Network("connection reset".to_string()))
        } else {
            Ok("Saved".to_string())
        }
    }
}

/// Takes the worker thread down with it
struct PanickingSender;

#[async_trait]
impl MessageSender for PanickingSender {
    async fn send(&self, _text: &str, _profile: &EndpointProfile) -> Result<String, SendError> {
        panic!("sender crashed");
    }
}

/// Emits a partial on start and a final transcript on stop
struct ScriptedRecognizer {
    partial: String,
    transcript: String,
    events: Option<Sender<SpeechEvent>>,
}

impl ScriptedRecognizer {
    fn new(partial: &str, transcript: &str) -> Box<Self> {
        Box::new(Self {
            partial: partial.to_string(),
            transcript: transcript.to_string(),
            events: None,
        })
    }
}

impl SpeechRecognizer for ScriptedRecognizer {
    fn start_listening(&mut self, events: Sender<SpeechEvent>) {
        let _ = events.send(SpeechEvent::Started);
        let _ = events.send(SpeechEvent::Partial(self.partial.clone()));
        self.events = Some(events);
    }

    fn stop_listening(&mut self) {
        if let Some(events) = self.events.take() {
            let _ = events.send(SpeechEvent::Result(self.transcript.clone()));
            let _ = events.send(SpeechEvent::Ended);
        }
    }

    fn cancel(&mut self) {
        self.events = None;
    }

    fn is_available(&self) -> bool {
        true
    }
}

/// Fails as soon as it starts
struct BrokenRecognizer;

impl SpeechRecognizer for BrokenRecognizer {
    fn start_listening(&mut self, events: Sender<SpeechEvent>) {
        let _ = events.send(SpeechEvent::Error(SpeechRecognitionError::Network));
    }

    fn stop_listening(&mut self) {}

    fn cancel(&mut self) {}

    fn is_available(&self) -> bool {
        true
    }
}

fn config() -> AppConfig {
    AppConfig::default().with_success_display(Duration::from_millis(200))
}

fn complete_profile(id: &str) -> EndpointProfile {
    EndpointProfile::new(id, "Work", "https://example.com/", "pat", "7499")
}

#[test]
fn test_successful_send_clears_draft_then_expires() {
    let store = ProfileStore::new(MemoryStore::new());
    let sender = StubSender::ok("Saved");
    let mut view = MainViewModel::new(store, sender.clone(), &config()).unwrap();

    view.update_message_content("  buy milk  ");
    view.send_message();
    assert!(view.state().is_sending());
    assert!(!view.state().can_send());

    assert!(view.wait_for_send(WAIT));
    let state = view.state();
    assert_eq!(state.phase, SendPhase::Succeeded);
    assert!(state.message_content.is_empty());
    assert_eq!(state.last_output.as_deref(), Some("Saved"));
    assert!(state.error_message.is_none());
    assert_eq!(sender.calls(), vec![("buy milk".to_string(), "default".to_string())]);

    std::thread::sleep(Duration::from_millis(300));
    view.poll_events();
    assert_eq!(view.state().phase, SendPhase::Idle);
}

#[test]
fn test_failed_send_keeps_draft_until_edit() {
    let store = ProfileStore::new(MemoryStore::new());
    let sender = StubSender::failing(SendError::Http {
        status: 500,
        reason: "Internal Server Error".to_string(),
    });
    let mut view = MainViewModel::new(store, sender, &config()).unwrap();

    view.update_message_content("note");
    view.send_message();
    assert!(view.wait_for_send(WAIT));

    let state = view.state();
    assert_eq!(state.phase, SendPhase::Failed);
    assert_eq!(state.message_content, "note");
    assert_eq!(
        state.error_message.as_deref(),
        Some("Send failed: 500 Internal Server Error")
    );

    view.update_message_content("note 2");
    assert_eq!(view.state().phase, SendPhase::Idle);
    assert!(view.state().error_message.is_none());
}

#[test]
fn test_clear_error_resets_failure() {
    let store = ProfileStore::new(MemoryStore::new());
    let sender = StubSender::failing(SendError::Network("connection refused".to_string()));
    let mut view = MainViewModel::new(store, sender, &config()).unwrap();

    view.update_message_content("note");
    view.send_message();
    assert!(view.wait_for_send(WAIT));
    assert_eq!(view.state().error_message.as_deref(), Some("connection refused"));

    view.clear_error();
    assert_eq!(view.state().phase, SendPhase::Idle);
    assert!(view.state().error_message.is_none());
}

#[test]
fn test_blank_draft_sends_nothing() {
    let store = ProfileStore::new(MemoryStore::new());
    let sender = StubSender::ok("Saved");
    let mut view = MainViewModel::new(store, sender.clone(), &config()).unwrap();

    view.update_message_content("   \n ");
    view.send_message();
    assert_eq!(view.state().phase, SendPhase::Idle);

    std::thread::sleep(Duration::from_millis(50));
    view.poll_events();
    assert!(sender.calls().is_empty());
}

#[test]
fn test_second_send_while_sending_is_ignored() {
    let store = ProfileStore::new(MemoryStore::new());
    let (sender, release) = StubSender::gated("Saved");
    let mut view = MainViewModel::new(store, sender.clone(), &config()).unwrap();

    view.update_message_content("first");
    view.send_message();
    view.update_message_content("second");
    view.send_message();

    release.send(()).unwrap();
    assert!(view.wait_for_send(WAIT));
    assert_eq!(view.state().phase, SendPhase::Succeeded);
    assert_eq!(sender.calls().len(), 1);
    assert_eq!(sender.calls()[0].0, "first");
}

#[test]
fn test_resend_after_failure() {
    let store = ProfileStore::new(MemoryStore::new());
    let sender = Arc::new(FlakySender {
        calls: Mutex::new(0),
    });
    let mut view = MainViewModel::new(store, sender, &config()).unwrap();

    view.update_message_content("note");
    view.send_message();
    assert!(view.wait_for_send(WAIT));
    assert_eq!(view.state().phase, SendPhase::Failed);
    assert_eq!(view.state().message_content, "note");

    view.send_message();
    assert_eq!(view.state().phase, SendPhase::Sending);
    assert!(view.state().error_message.is_none());

    assert!(view.wait_for_send(WAIT));
    assert_eq!(view.state().phase, SendPhase::Succeeded);
    assert!(view.state().message_content.is_empty());
}

#[test]
fn test_worker_crash_fails_pending_send() {
    let store = ProfileStore::new(MemoryStore::new());
    let mut view = MainViewModel::new(store, Arc::new(PanickingSender), &config()).unwrap();

    view.update_message_content("note");
    view.send_message();
    assert!(view.wait_for_send(WAIT));

    let state = view.state();
    assert_eq!(state.phase, SendPhase::Failed);
    assert!(state.error_message.is_some());
    assert_eq!(state.message_content, "note");
}

#[test]
fn test_send_uses_selected_profile() {
    let store = ProfileStore::new(MemoryStore::new());
    store.save(complete_profile("work")).unwrap();
    let sender = StubSender::ok("Saved");
    let mut view = MainViewModel::new(store, sender.clone(), &config()).unwrap();

    view.set_current_profile("work").unwrap();
    assert!(view.state().has_api_config);

    view.update_message_content("note");
    view.send_message();
    assert!(view.wait_for_send(WAIT));
    assert_eq!(sender.calls()[0].1, "work");
}

#[test]
fn test_selecting_unknown_profile_is_rejected() {
    let store = ProfileStore::new(MemoryStore::new());
    store.save(complete_profile("work")).unwrap();
    let mut main = MainViewModel::new(store.clone(), StubSender::ok("ok"), &config()).unwrap();
    let mut settings = SettingsViewModel::new(store.clone());

    let err = main.set_current_profile("ghost").unwrap_err();
    assert!(matches!(err, InboxError::ProfileNotFound(ref id) if id == "ghost"));
    assert_eq!(main.current_profile().id, "work");

    let err = settings.set_current_profile("ghost").unwrap_err();
    assert!(matches!(err, InboxError::ProfileNotFound(_)));
    assert_eq!(settings.current_profile().id, "work");
    assert_eq!(store.current().id, "work");
}

#[test]
fn test_settings_changes_reach_main_view() {
    let store = ProfileStore::new(MemoryStore::new());
    let mut main = MainViewModel::new(store.clone(), StubSender::ok("ok"), &config()).unwrap();
    let mut settings = SettingsViewModel::new(store);

    // The seeded profile has no credentials
    assert!(!main.state().has_api_config);

    settings.start_create_new_profile();
    settings.update_editing_profile(ProfileEdit {
        name: Some("Work".to_string()),
        api_key: Some("pat".to_string()),
        workflow_id: Some("7499".to_string()),
        is_default: Some(true),
        ..Default::default()
    });
    settings.finish_edit().unwrap();
    assert!(!settings.state().is_editing);
    assert_eq!(settings.current_profile().name, "Work");

    main.poll_events();
    assert_eq!(main.current_profile().name, "Work");
    assert!(main.state().has_api_config);
    assert_eq!(main.profiles().len(), 2);
}

#[test]
fn test_settings_edit_and_delete() {
    let store = ProfileStore::new(MemoryStore::new());
    store.save(complete_profile("work")).unwrap();
    let mut settings = SettingsViewModel::new(store.clone());

    let work = settings.profiles()[1].clone();
    settings.start_edit_profile(work);
    settings.update_editing_profile(ProfileEdit {
        name: Some("Office".to_string()),
        ..Default::default()
    });
    settings.finish_edit().unwrap();
    assert_eq!(store.list()[1].name, "Office");

    settings.set_current_profile("work").unwrap();
    settings.delete_profile("work").unwrap();
    assert_eq!(settings.profiles().len(), 1);
    assert_eq!(settings.current_profile().id, "default");

    settings.delete_profile("default").unwrap();
    assert_eq!(settings.profiles().len(), 1);
}

#[test]
fn test_settings_generated_ids_are_fresh() {
    let store = ProfileStore::new(MemoryStore::new());
    let settings = SettingsViewModel::new(store);

    let a = settings.generate_profile_id();
    let b = settings.generate_profile_id();
    assert_ne!(a, b);
    assert!(settings.profiles().iter().all(|p| p.id != a && p.id != b));
}

#[test]
fn test_settings_set_editing_profile() {
    let store = ProfileStore::new(MemoryStore::new());
    let mut settings = SettingsViewModel::new(store.clone());

    let draft = complete_profile("draft");
    settings.set_editing_profile(Some(draft.clone()));
    assert_eq!(settings.state().editing_profile.as_ref(), Some(&draft));
    assert!(!settings.state().is_editing);

    settings.update_editing_profile(ProfileEdit {
        name: Some("Renamed".to_string()),
        ..Default::default()
    });
    assert_eq!(
        settings.state().editing_profile.as_ref().map(|p| p.name.as_str()),
        Some("Renamed")
    );

    settings.set_editing_profile(None);
    assert!(settings.state().editing_profile.is_none());
    assert_eq!(store.list().len(), 1);
}

#[test]
fn test_settings_poll_picks_up_external_writes() {
    let store = ProfileStore::new(MemoryStore::new());
    let mut settings = SettingsViewModel::new(store.clone());
    assert_eq!(settings.profiles().len(), 1);

    store.save(complete_profile("a")).unwrap();
    store.save(complete_profile("b")).unwrap();
    assert_eq!(settings.profiles().len(), 1);

    settings.poll_events();
    assert_eq!(settings.profiles().len(), 3);
}

#[test]
fn test_dictation_appends_to_draft() {
    let store = ProfileStore::new(MemoryStore::new());
    let mut view = MainViewModel::new(store, StubSender::ok("ok"), &config())
        .unwrap()
        .with_recognizer(ScriptedRecognizer::new("buy", "buy milk"));

    view.update_message_content("Remember to");
    view.start_speech_recognition();
    view.poll_events();
    assert!(view.state().is_listening);
    assert_eq!(view.state().partial_speech_result, "buy");

    view.stop_speech_recognition();
    view.poll_events();
    let state = view.state();
    assert!(!state.is_listening);
    assert!(state.partial_speech_result.is_empty());
    assert_eq!(state.message_content, "Remember to buy milk");
}

#[test]
fn test_cancel_dictation_keeps_draft() {
    let store = ProfileStore::new(MemoryStore::new());
    let mut view = MainViewModel::new(store, StubSender::ok("ok"), &config())
        .unwrap()
        .with_recognizer(ScriptedRecognizer::new("buy", "buy milk"));

    view.update_message_content("Remember to");
    view.start_speech_recognition();
    view.poll_events();
    assert!(view.state().is_listening);
    assert_eq!(view.state().partial_speech_result, "buy");

    view.cancel_speech_recognition();
    view.poll_events();
    let state = view.state();
    assert!(!state.is_listening);
    assert!(state.partial_speech_result.is_empty());
    assert_eq!(state.message_content, "Remember to");

    // A cancelled session delivers nothing on stop
    view.stop_speech_recognition();
    view.poll_events();
    assert_eq!(view.state().message_content, "Remember to");
}

#[test]
fn test_dictation_into_empty_draft() {
    let store = ProfileStore::new(MemoryStore::new());
    let mut view = MainViewModel::new(store, StubSender::ok("ok"), &config())
        .unwrap()
        .with_recognizer(ScriptedRecognizer::new("call", "call mom"));

    view.start_speech_recognition();
    view.stop_speech_recognition();
    view.poll_events();
    assert_eq!(view.state().message_content, "call mom");
}

#[test]
fn test_dictation_errors_surface() {
    let store = ProfileStore::new(MemoryStore::new());
    let mut view = MainViewModel::new(store, StubSender::ok("ok"), &config())
        .unwrap()
        .with_recognizer(Box::new(BrokenRecognizer));

    view.start_speech_recognition();
    view.poll_events();
    assert!(!view.state().is_listening);
    assert_eq!(
        view.state().error_message.as_deref(),
        Some("Network connection problem")
    );
}

#[test]
fn test_dictation_unavailable_without_recognizer() {
    let store = ProfileStore::new(MemoryStore::new());
    let mut view = MainViewModel::new(store, StubSender::ok("ok"), &config()).unwrap();

    view.start_speech_recognition();
    assert!(!view.state().is_listening);
    assert_eq!(
        view.state().error_message.as_deref(),
        Some("Speech recognition is not available")
    );

    view.on_permission_denied();
    assert_eq!(
        view.state().error_message.as_deref(),
        Some("Microphone permission is required to use voice input")
    );
}

#[test]
fn test_end_to_end_against_mock_server() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST)
            .path("/v1/workflow/run")
            .header("authorization", "Bearer pat")
            .json_body(json!({
                "parameters": {"input": "ship it"},
                "workflow_id": "7499"
            }));
        then.status(200)
            .json_body(json!({"result": {"output": "Added to inbox"}}));
    });

    let store = ProfileStore::new(MemoryStore::new());
    store
        .save(
            EndpointProfile::new("e2e", "Mock", server.base_url(), "pat", "7499")
                .with_default(true),
        )
        .unwrap();

    let config = config();
    let client = WorkflowClient::from_config(&config).unwrap();
    let mut view = MainViewModel::new(store, Arc::new(client), &config).unwrap();
    assert_eq!(view.current_profile().id, "e2e");

    view.update_message_content("ship it");
    view.send_message();
    assert!(view.wait_for_send(WAIT));

    assert_eq!(view.state().last_output.as_deref(), Some("Added to inbox"));
    mock.assert();
}
