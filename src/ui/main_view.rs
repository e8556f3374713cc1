//! State holder for the main screen
//!
//! Owns the draft text and the send flags. Sends run on a [`SendPipeline`]
//! worker; results, profile changes and dictation progress arrive on channels
//! and are applied by [`MainViewModel::poll_events`], which the UI loop calls
//! once per frame.
//!
//! Send lifecycle:
//!
//! ```text
//! Idle -> Sending -> Succeeded -> Idle   (after the success display delay)
//!                 -> Failed    -> Idle   (on the next edit or send)
//! ```

use crate::api::{MessageSender, SendCommand, SendEvent, SendPipeline};
use crate::config::AppConfig;
use crate::messages::OutgoingMessage;
use crate::profiles::{EndpointProfile, ProfileSnapshot, ProfileStore};
use crate::speech::{SpeechEvent, SpeechRecognitionError, SpeechRecognizer};
use crate::{InboxError, Result};
use crossbeam_channel::{unbounded, Receiver, Sender, TryRecvError};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Where the current send stands
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SendPhase {
    /// Nothing in flight
    #[default]
    Idle,
    /// Waiting for the workflow to answer
    Sending,
    /// Last send succeeded; reverts to idle after the display delay
    Succeeded,
    /// Last send failed; reverts to idle on the next edit or send
    Failed,
}

impl std::fmt::Display for SendPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SendPhase::Idle => write!(f, "Idle"),
            SendPhase::Sending => write!(f, "Sending"),
            SendPhase::Succeeded => write!(f, "Succeeded"),
            SendPhase::Failed => write!(f, "Failed"),
        }
    }
}

/// Everything the main screen renders
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MainUiState {
    /// Draft note text
    pub message_content: String,
    /// Send progress
    pub phase: SendPhase,
    /// Error text shown under the input
    pub error_message: Option<String>,
    /// Output of the last successful send
    pub last_output: Option<String>,
    /// Whether dictation is running
    pub is_listening: bool,
    /// Interim dictation text
    pub partial_speech_result: String,
    /// Whether the current profile has everything needed to send
    pub has_api_config: bool,
}

impl MainUiState {
    pub fn is_sending(&self) -> bool {
        self.phase == SendPhase::Sending
    }

    pub fn is_success(&self) -> bool {
        self.phase == SendPhase::Succeeded
    }

    /// Whether the send affordance should be enabled
    pub fn can_send(&self) -> bool {
        !self.is_sending() && !self.message_content.trim().is_empty()
    }
}

/// View model for the main screen
pub struct MainViewModel {
    state: MainUiState,
    store: ProfileStore,
    current_profile: EndpointProfile,
    profile_rx: Receiver<ProfileSnapshot>,
    command_tx: Sender<SendCommand>,
    event_rx: Receiver<SendEvent>,
    pending_request: Option<Uuid>,
    success_since: Option<Instant>,
    success_display: Duration,
    recognizer: Option<Box<dyn SpeechRecognizer>>,
    speech_tx: Sender<SpeechEvent>,
    speech_rx: Receiver<SpeechEvent>,
}

impl MainViewModel {
    /// Create the view model and start its send worker
    pub fn new(
        store: ProfileStore,
        sender: Arc<dyn MessageSender>,
        config: &AppConfig,
    ) -> Result<Self> {
        let pipeline = SendPipeline::new(sender);
        let command_tx = pipeline.command_sender();
        let event_rx = pipeline.event_receiver();
        pipeline.start_worker()?;

        let profile_rx = store.subscribe();
        let current_profile = store.current();
        let (speech_tx, speech_rx) = unbounded();

        let state = MainUiState {
            has_api_config: current_profile.is_complete(),
            ..Default::default()
        };
        info!("Main view ready with profile {}", current_profile.id);

        Ok(Self {
            state,
            store,
            current_profile,
            profile_rx,
            command_tx,
            event_rx,
            pending_request: None,
            success_since: None,
            success_display: config.success_display(),
            recognizer: None,
            speech_tx,
            speech_rx,
        })
    }

    /// Attach a speech recogniser for dictation
    pub fn with_recognizer(mut self, recognizer: Box<dyn SpeechRecognizer>) -> Self {
        self.recognizer = Some(recognizer);
        self
    }

    pub fn state(&self) -> &MainUiState {
        &self.state
    }

    /// The profile the next send will use
    pub fn current_profile(&self) -> &EndpointProfile {
        &self.current_profile
    }

    /// All profiles, for a profile picker
    pub fn profiles(&self) -> Vec<EndpointProfile> {
        self.store.list()
    }

    /// Replace the draft text
    pub fn update_message_content(&mut self, text: impl Into<String>) {
        self.state.message_content = text.into();
        if self.state.phase == SendPhase::Failed {
            self.state.phase = SendPhase::Idle;
            self.state.error_message = None;
        }
    }

    /// Send the draft with the current profile
    ///
    /// Blank drafts are ignored, as are sends while one is in flight.
    pub fn send_message(&mut self) {
        if self.state.is_sending() {
            debug!("Send already in flight, ignoring");
            return;
        }
        let Some(message) = OutgoingMessage::from_draft(&self.state.message_content) else {
            debug!("Draft is empty, nothing to send");
            return;
        };

        let request_id = Uuid::new_v4();
        info!(
            "Sending message {} ({} chars) with profile {}",
            request_id,
            message.char_count(),
            self.current_profile.name
        );

        let command = SendCommand::Send {
            message,
            profile: self.current_profile.clone(),
            request_id,
        };
        match self.command_tx.send(command) {
            Ok(()) => {
                self.state.phase = SendPhase::Sending;
                self.state.error_message = None;
                self.pending_request = Some(request_id);
                self.success_since = None;
            }
            Err(e) => {
                let err = InboxError::ChannelError(format!("Send worker unavailable: {}", e));
                error!("{}", err);
                self.state.phase = SendPhase::Failed;
                self.state.error_message = Some(err.user_message());
            }
        }
    }

    /// Select a different profile for the next send
    ///
    /// Unknown ids are rejected and the selection is left alone.
    pub fn set_current_profile(&mut self, id: &str) -> Result<()> {
        if !self.store.list().iter().any(|p| p.id == id) {
            warn!("Cannot select unknown profile {}", id);
            return Err(InboxError::ProfileNotFound(id.to_string()));
        }
        self.store.set_current(id)?;
        self.current_profile = self.store.current();
        self.state.has_api_config = self.current_profile.is_complete();
        Ok(())
    }

    /// Dismiss the error text
    pub fn clear_error(&mut self) {
        self.state.error_message = None;
        if self.state.phase == SendPhase::Failed {
            self.state.phase = SendPhase::Idle;
        }
    }

    /// Apply everything that arrived since the last call
    pub fn poll_events(&mut self) {
        loop {
            match self.event_rx.try_recv() {
                Ok(event) => self.handle_send_event(event),
                Err(TryRecvError::Empty) => break,
                // Worker died without saying goodbye
                Err(TryRecvError::Disconnected) => {
                    self.handle_send_event(SendEvent::Shutdown);
                    break;
                }
            }
        }

        let snapshots: Vec<ProfileSnapshot> = self.profile_rx.try_iter().collect();
        if let Some(latest) = snapshots.into_iter().last() {
            self.apply_snapshot(latest);
        }

        while let Ok(event) = self.speech_rx.try_recv() {
            self.handle_speech_event(event);
        }

        if self.state.phase == SendPhase::Succeeded {
            let expired = self
                .success_since
                .map_or(true, |since| since.elapsed() >= self.success_display);
            if expired {
                self.state.phase = SendPhase::Idle;
                self.success_since = None;
            }
        }
    }

    /// Poll until the in-flight send settles; false if `timeout` ran out first
    pub fn wait_for_send(&mut self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            self.poll_events();
            if !self.state.is_sending() {
                return true;
            }
            if Instant::now() >= deadline {
                warn!("Send did not settle within {:?}", timeout);
                return false;
            }
            std::thread::sleep(Duration::from_millis(10));
        }
    }

    // === Dictation ===

    /// Start dictation into the draft
    pub fn start_speech_recognition(&mut self) {
        match self.recognizer.as_mut() {
            Some(recognizer) if recognizer.is_available() => {
                self.state.is_listening = true;
                self.state.error_message = None;
                recognizer.start_listening(self.speech_tx.clone());
            }
            _ => {
                warn!("Speech recognition requested but unavailable");
                self.state.is_listening = false;
                self.state.error_message =
                    Some(SpeechRecognitionError::ServiceUnavailable.user_message());
            }
        }
    }

    /// Finish dictation; the final result arrives as an event
    pub fn stop_speech_recognition(&mut self) {
        if let Some(recognizer) = self.recognizer.as_mut() {
            recognizer.stop_listening();
        }
    }

    /// Abort dictation without a result
    pub fn cancel_speech_recognition(&mut self) {
        if let Some(recognizer) = self.recognizer.as_mut() {
            recognizer.cancel();
        }
        self.state.is_listening = false;
        self.state.partial_speech_result.clear();
    }

    /// The platform refused microphone access
    pub fn on_permission_denied(&mut self) {
        self.state.is_listening = false;
        self.state.error_message =
            Some("Microphone permission is required to use voice input".to_string());
    }

    fn handle_send_event(&mut self, event: SendEvent) {
        match event {
            SendEvent::Started { request_id } => {
                debug!("Request {} started", request_id);
            }
            SendEvent::Completed {
                request_id,
                output,
                elapsed_ms,
            } => {
                if self.pending_request != Some(request_id) {
                    debug!("Ignoring completion for stale request {}", request_id);
                    return;
                }
                info!("Message {} delivered in {}ms", request_id, elapsed_ms);
                self.pending_request = None;
                self.state.phase = SendPhase::Succeeded;
                self.state.message_content.clear();
                self.state.error_message = None;
                self.state.last_output = Some(output);
                self.success_since = Some(Instant::now());
            }
            SendEvent::Failed { request_id, error } => {
                if request_id.is_some() && request_id != self.pending_request {
                    debug!("Ignoring failure for stale request {:?}", request_id);
                    return;
                }
                warn!("Message send failed: {}", error);
                self.pending_request = None;
                self.state.phase = SendPhase::Failed;
                self.state.error_message = Some(error.to_string());
            }
            SendEvent::Shutdown => {
                debug!("Send pipeline shut down");
                if self.pending_request.take().is_some() {
                    self.state.phase = SendPhase::Failed;
                    self.state.error_message = Some(
                        InboxError::ChannelError("send worker stopped".to_string())
                            .user_message(),
                    );
                }
            }
        }
    }

    fn apply_snapshot(&mut self, snapshot: ProfileSnapshot) {
        if snapshot.current != self.current_profile {
            info!("Current profile is now {}", snapshot.current.name);
        }
        self.current_profile = snapshot.current;
        self.state.has_api_config = self.current_profile.is_complete();
    }

    fn handle_speech_event(&mut self, event: SpeechEvent) {
        match event {
            SpeechEvent::Started => self.state.is_listening = true,
            SpeechEvent::Partial(text) => self.state.partial_speech_result = text,
            SpeechEvent::Result(text) => {
                let text = text.trim();
                let draft = if self.state.message_content.is_empty() {
                    text.to_string()
                } else if text.is_empty() {
                    self.state.message_content.clone()
                } else {
                    format!("{} {}", self.state.message_content, text)
                };
                self.update_message_content(draft);
                self.state.is_listening = false;
                self.state.partial_speech_result.clear();
            }
            SpeechEvent::Error(e) => {
                warn!("Speech recognition failed: {}", e);
                self.state.is_listening = false;
                self.state.partial_speech_result.clear();
                self.state.error_message = Some(e.user_message());
            }
            SpeechEvent::Ended => self.state.is_listening = false,
        }
    }
}

impl Drop for MainViewModel {
    fn drop(&mut self) {
        let _ = self.command_tx.try_send(SendCommand::Shutdown);
    }
}
