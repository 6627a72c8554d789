// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Supervisor client
//!
//! Sends `{"agent_id":N,"state":0|1}` lines to the action monitor over a TCP
//! connection opened once at startup. [`ActionNotifier::notify`] only enqueues;
//! a background task owns the socket.

use crate::domain::node_config::SupervisorConfig;
use crate::domain::notification::{ActionNotification, ActionNotifier, NotificationError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

const QUEUE_CAPACITY: usize = 64;

pub struct SupervisorClient {
    sender: mpsc::Sender<ActionNotification>,
    connected: Arc<AtomicBool>,
}

impl SupervisorClient {
    /// Open the connection and start the writer.
    ///
    /// A supervisor that cannot be reached is not an error: the client is
    /// returned disconnected and every notification reports `NotConnected`.
    pub async fn connect(config: &SupervisorConfig, cancellation_token: CancellationToken) -> Self {
        let (sender, receiver) = mpsc::channel(QUEUE_CAPACITY);
        let connected = Arc::new(AtomicBool::new(false));
        let timeout = Duration::from_millis(config.connect_timeout_ms);

        match tokio::time::timeout(timeout, TcpStream::connect(config.address.as_str())).await {
            Ok(Ok(stream)) => {
                info!("Connected to supervisor at {}", config.address);
                connected.store(true, Ordering::SeqCst);
                tokio::spawn(run_writer(
                    stream,
                    receiver,
                    connected.clone(),
                    cancellation_token,
                ));
            }
            Ok(Err(e)) => {
                warn!("Supervisor at {} unavailable: {}", config.address, e);
            }
            Err(_) => {
                warn!(
                    "Supervisor at {} unavailable: no answer within {} ms",
                    config.address, config.connect_timeout_ms
                );
            }
        }

        Self { sender, connected }
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}

impl ActionNotifier for SupervisorClient {
    fn notify(&self, notification: ActionNotification) -> Result<(), NotificationError> {
        if !self.is_connected() {
            return Err(NotificationError::NotConnected);
        }
        self.sender.try_send(notification).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => NotificationError::QueueFull,
            mpsc::error::TrySendError::Closed(_) => NotificationError::NotConnected,
        })
    }
}

async fn run_writer(
    mut stream: TcpStream,
    mut receiver: mpsc::Receiver<ActionNotification>,
    connected: Arc<AtomicBool>,
    cancellation_token: CancellationToken,
) {
    loop {
        let notification = tokio::select! {
            _ = cancellation_token.cancelled() => break,
            next = receiver.recv() => match next {
                Some(notification) => notification,
                None => break,
            },
        };

        if let Err(e) = write_line(&mut stream, &notification).await {
            warn!("Lost supervisor connection: {}", e);
            break;
        }
        debug!(agent_id = %notification.agent_id, state = notification.state, "Notified supervisor");
    }

    connected.store(false, Ordering::SeqCst);
    let _ = stream.shutdown().await;
}

async fn write_line(
    stream: &mut TcpStream,
    notification: &ActionNotification,
) -> Result<(), NotificationError> {
    let mut line = serde_json::to_vec(notification)?;
    line.push(b'\n');
    stream.write_all(&line).await?;
    stream.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::agent::AgentId;
    use tokio::io::{AsyncBufReadExt, BufReader};
    use tokio::net::TcpListener;

    fn config(address: String) -> SupervisorConfig {
        SupervisorConfig {
            address,
            connect_timeout_ms: 500,
        }
    }

    #[tokio::test]
    async fn test_notifications_written_as_json_lines() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap().to_string();

        let token = CancellationToken::new();
        let client = SupervisorClient::connect(&config(address), token.clone()).await;
        assert!(client.is_connected());

        let (socket, _) = listener.accept().await.unwrap();
        let mut lines = BufReader::new(socket).lines();

        client.notify(ActionNotification::new(AgentId(12), true)).unwrap();
        client.notify(ActionNotification::new(AgentId(12), false)).unwrap();

        assert_eq!(lines.next_line().await.unwrap().unwrap(), r#"{"agent_id":12,"state":1}"#);
        assert_eq!(lines.next_line().await.unwrap().unwrap(), r#"{"agent_id":12,"state":0}"#);
        token.cancel();
    }

    #[tokio::test]
    async fn test_unreachable_supervisor_reports_not_connected() {
        // Bind then drop to get a port nobody listens on
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap().to_string();
        drop(listener);

        let client = SupervisorClient::connect(&config(address), CancellationToken::new()).await;
        assert!(!client.is_connected());
        assert!(matches!(
            client.notify(ActionNotification::new(AgentId(3), true)),
            Err(NotificationError::NotConnected)
        ));
    }
}
