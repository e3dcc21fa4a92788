//! Scripted in-memory transport for tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use bytes::Bytes;

use super::Transport;
use crate::error::{Result, TransportError};

enum Reply {
    Output(Vec<Bytes>),
    Eof,
}

/// Replays canned device output keyed by the command that was sent.
pub(crate) struct MockTransport {
    replies: Vec<(String, Reply)>,
    pending: VecDeque<Bytes>,
    sent: Arc<Mutex<Vec<String>>>,
    transcript: Arc<Mutex<Vec<String>>>,
    eof: bool,
    connected: bool,
}

impl MockTransport {
    pub(crate) fn new() -> Self {
        Self {
            replies: Vec::new(),
            pending: VecDeque::new(),
            sent: Arc::new(Mutex::new(Vec::new())),
            transcript: Arc::new(Mutex::new(Vec::new())),
            eof: false,
            connected: true,
        }
    }

    /// Output available before anything is sent (login banner and prompt).
    pub(crate) fn banner(mut self, output: &str) -> Self {
        self.pending.push_back(Bytes::copy_from_slice(output.as_bytes()));
        self
    }

    /// Reply to `command` with `chunks`, delivered one per read.
    pub(crate) fn on(mut self, command: &str, chunks: &[&str]) -> Self {
        let chunks = chunks
            .iter()
            .map(|c| Bytes::copy_from_slice(c.as_bytes()))
            .collect();
        self.replies.push((command.to_string(), Reply::Output(chunks)));
        self
    }

    /// Close the session when `command` is sent.
    pub(crate) fn on_eof(mut self, command: &str) -> Self {
        self.replies.push((command.to_string(), Reply::Eof));
        self
    }

    /// Handle to the list of everything sent, newline-trimmed.
    pub(crate) fn sent_log(&self) -> Arc<Mutex<Vec<String>>> {
        self.sent.clone()
    }

    /// Handle to the interleaved log of sends (`> cmd`) and reads (`< chunk`).
    pub(crate) fn transcript(&self) -> Arc<Mutex<Vec<String>>> {
        self.transcript.clone()
    }
}

impl Transport for MockTransport {
    async fn send(&mut self, data: &[u8]) -> Result<()> {
        if !self.connected {
            return Err(TransportError::Disconnected.into());
        }
        let text = String::from_utf8_lossy(data)
            .trim_end_matches(['\r', '\n'])
            .to_string();
        self.sent.lock().unwrap().push(text.clone());
        self.transcript.lock().unwrap().push(format!("> {text}"));

        if let Some(pos) = self.replies.iter().position(|(cmd, _)| *cmd == text) {
            match self.replies.remove(pos).1 {
                Reply::Output(chunks) => self.pending.extend(chunks),
                Reply::Eof => self.eof = true,
            }
        }
        Ok(())
    }

    async fn read(&mut self) -> Result<Option<Bytes>> {
        if let Some(chunk) = self.pending.pop_front() {
            // Let other tasks run between chunks, like a real socket.
            tokio::task::yield_now().await;
            self.transcript
                .lock()
                .unwrap()
                .push(format!("< {}", String::from_utf8_lossy(&chunk)));
            return Ok(Some(chunk));
        }
        if self.eof {
            self.connected = false;
            return Ok(None);
        }
        // Nothing scripted: behave like a silent device.
        std::future::pending::<()>().await;
        Ok(None)
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    async fn close(&mut self) -> Result<()> {
        self.connected = false;
        Ok(())
    }
}
