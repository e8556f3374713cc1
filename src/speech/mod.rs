//! Speech input capability
//!
//! Dictation is provided by a platform recogniser behind the
//! [`SpeechRecognizer`] trait. Recognisers report progress as
//! [`SpeechEvent`]s on a channel handed to them when listening starts; the
//! main view model drains that channel in its event loop.

use crossbeam_channel::Sender;
use thiserror::Error;

/// Why recognition stopped without a result
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SpeechRecognitionError {
    /// The user has not granted microphone access
    #[error("microphone permission denied")]
    Permission,

    /// The recogniser needs the network and could not reach it
    #[error("network unavailable")]
    Network,

    /// No recogniser is available on this device
    #[error("speech service unavailable")]
    ServiceUnavailable,

    /// Any other recogniser failure
    #[error("{0}")]
    Other(String),
}

impl SpeechRecognitionError {
    /// Get a user-friendly description of the error
    pub fn user_message(&self) -> String {
        match self {
            SpeechRecognitionError::Permission => "Microphone permission is required".to_string(),
            SpeechRecognitionError::Network => "Network connection problem".to_string(),
            SpeechRecognitionError::ServiceUnavailable => {
                "Speech recognition is not available".to_string()
            }
            SpeechRecognitionError::Other(msg) => format!("Speech recognition error: {}", msg),
        }
    }
}

/// Progress reported by a recogniser
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpeechEvent {
    /// Listening has begun
    Started,
    /// Interim transcription, replaced by later partials
    Partial(String),
    /// Final transcription for this session
    Result(String),
    /// Recognition failed
    Error(SpeechRecognitionError),
    /// Listening has ended
    Ended,
}

/// A speech-to-text engine
pub trait SpeechRecognizer: Send {
    /// Start listening, reporting progress on `events`
    fn start_listening(&mut self, events: Sender<SpeechEvent>);

    /// Stop listening and deliver the final result
    fn stop_listening(&mut self);

    /// Abort without a result
    fn cancel(&mut self);

    /// Whether recognition can be used right now
    fn is_available(&self) -> bool;
}
