//! Send pipeline running workflow calls off the UI thread
//!
//! The worker owns a tokio runtime and handles one command at a time, so at
//! most one request is in flight per pipeline. Results come back as events
//! tagged with the request id they belong to.

use super::client::MessageSender;
use crate::error::SendError;
use crate::messages::OutgoingMessage;
use crate::profiles::EndpointProfile;
use crate::{InboxError, Result};
use crossbeam_channel::{bounded, Receiver, Sender};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Instant;
use tokio::runtime::Runtime;
use tracing::{debug, error, info};
use uuid::Uuid;

/// Commands that can be sent to the send pipeline
#[derive(Debug, Clone)]
pub enum SendCommand {
    /// Deliver a message using the given profile
    Send {
        message: OutgoingMessage,
        profile: EndpointProfile,
        request_id: Uuid,
    },

    /// Stop the worker
    Shutdown,
}

/// Events emitted by the send pipeline
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendEvent {
    /// The request has been handed to the transport
    Started { request_id: Uuid },

    /// The workflow accepted the message
    Completed {
        request_id: Uuid,
        output: String,
        elapsed_ms: u64,
    },

    /// The send failed
    Failed {
        request_id: Option<Uuid>,
        error: SendError,
    },

    /// Worker has stopped
    Shutdown,
}

/// Send pipeline with channel-based communication
pub struct SendPipeline {
    sender: Arc<dyn MessageSender>,
    command_tx: Sender<SendCommand>,
    command_rx: Receiver<SendCommand>,
    event_tx: Sender<SendEvent>,
    event_rx: Receiver<SendEvent>,
}

impl SendPipeline {
    /// Create a new pipeline around a message sender
    pub fn new(sender: Arc<dyn MessageSender>) -> Self {
        let (command_tx, command_rx) = bounded(16);
        let (event_tx, event_rx) = bounded(64);

        Self {
            sender,
            command_tx,
            command_rx,
            event_tx,
            event_rx,
        }
    }

    /// Get a sender for commands
    pub fn command_sender(&self) -> Sender<SendCommand> {
        self.command_tx.clone()
    }

    /// Get a receiver for events
    pub fn event_receiver(&self) -> Receiver<SendEvent> {
        self.event_rx.clone()
    }

    /// Start the worker thread
    pub fn start_worker(self) -> Result<JoinHandle<()>> {
        let sender = Arc::clone(&self.sender);
        let command_rx = self.command_rx.clone();
        let event_tx = self.event_tx.clone();

        std::thread::Builder::new()
            .name("inboxhub-send".to_string())
            .spawn(move || run_worker(sender, command_rx, event_tx))
            .map_err(|e| InboxError::ChannelError(format!("Failed to spawn send worker: {}", e)))
    }
}

fn run_worker(
    sender: Arc<dyn MessageSender>,
    command_rx: Receiver<SendCommand>,
    event_tx: Sender<SendEvent>,
) {
    info!("Send pipeline worker starting");

    let runtime = match Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            let _ = event_tx.send(SendEvent::Failed {
                request_id: None,
                error: SendError::Network(format!("Runtime creation failed: {}", e)),
            });
            let _ = event_tx.send(SendEvent::Shutdown);
            return;
        }
    };

    loop {
        match command_rx.recv() {
            Ok(SendCommand::Send {
                message,
                profile,
                request_id,
            }) => {
                debug!(
                    "Processing send request {} with profile {}",
                    request_id, profile.id
                );
                let _ = event_tx.send(SendEvent::Started { request_id });

                let start_time = Instant::now();
                let result = runtime.block_on(sender.send(&message.content, &profile));
                let elapsed_ms = start_time.elapsed().as_millis() as u64;

                let event = match result {
                    Ok(output) => {
                        info!("Request {} completed in {}ms", request_id, elapsed_ms);
                        SendEvent::Completed {
                            request_id,
                            output,
                            elapsed_ms,
                        }
                    }
                    Err(error) => {
                        error!("Request {} failed: {}", request_id, error);
                        SendEvent::Failed {
                            request_id: Some(request_id),
                            error,
                        }
                    }
                };

                if event_tx.send(event).is_err() {
                    debug!("Event receiver dropped, stopping send worker");
                    break;
                }
            }
            Ok(SendCommand::Shutdown) => {
                info!("Send pipeline shutting down");
                break;
            }
            Err(_) => {
                debug!("Command channel closed, stopping send worker");
                break;
            }
        }
    }

    let _ = event_tx.send(SendEvent::Shutdown);
}
