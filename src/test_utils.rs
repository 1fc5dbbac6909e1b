//! Test utilities for Parley
//!
//! A scripted completion client and an observer that records what it sees.

use crate::client::{ChatMessage, CompletionClient, FragmentStream};
use crate::controller::ChatObserver;
use crate::error::{ParleyError, Result};
use crate::reconciler::FragmentOutcome;
use async_trait::async_trait;
use std::sync::{Arc, Mutex};

/// Requests captured by a [`ScriptedClient`]
pub type RecordedRequests = Arc<Mutex<Vec<Vec<ChatMessage>>>>;

#[derive(Debug, Clone)]
enum Script {
    Fragments(Vec<String>),
    FragmentsThenError(Vec<String>, String),
    Fail(String),
    StalledOnce(Vec<String>),
}

/// Completion client that replays a fixed script for every request
#[derive(Debug, Clone)]
pub struct ScriptedClient {
    script: Script,
    requests: RecordedRequests,
}

impl ScriptedClient {
    fn with_script(script: Script) -> Self {
        Self {
            script,
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Streams `fragments` and ends normally
    pub fn fragments(fragments: &[&str]) -> Self {
        Self::with_script(Script::Fragments(
            fragments.iter().map(|f| f.to_string()).collect(),
        ))
    }

    /// Streams `fragments`, then yields an error item
    pub fn fragments_then_error(fragments: &[&str], error: &str) -> Self {
        Self::with_script(Script::FragmentsThenError(
            fragments.iter().map(|f| f.to_string()).collect(),
            error.to_string(),
        ))
    }

    /// First request returns a stream that never yields; later requests
    /// stream `fragments`
    pub fn stalled_once(fragments: &[&str]) -> Self {
        Self::with_script(Script::StalledOnce(
            fragments.iter().map(|f| f.to_string()).collect(),
        ))
    }

    /// Fails the request before any stream is returned
    pub fn failing(error: &str) -> Self {
        Self::with_script(Script::Fail(error.to_string()))
    }

    /// Shared handle to the requests received so far
    pub fn requests(&self) -> RecordedRequests {
        Arc::clone(&self.requests)
    }
}

#[async_trait]
impl CompletionClient for ScriptedClient {
    async fn stream_chat(&self, _model: &str, messages: &[ChatMessage]) -> Result<FragmentStream> {
        let call = match self.requests.lock() {
            Ok(mut requests) => {
                requests.push(messages.to_vec());
                requests.len()
            }
            Err(_) => 0,
        };

        let items: Vec<Result<String>> = match &self.script {
            Script::Fail(error) => return Err(ParleyError::Client(error.clone()).into()),
            Script::StalledOnce(_) if call == 1 => {
                return Ok(Box::pin(futures::stream::pending::<Result<String>>()));
            }
            Script::Fragments(fragments) | Script::StalledOnce(fragments) => {
                fragments.iter().cloned().map(Ok).collect()
            }
            Script::FragmentsThenError(fragments, error) => fragments
                .iter()
                .cloned()
                .map(Ok)
                .chain(std::iter::once(Err(ParleyError::Stream(error.clone()).into())))
                .collect(),
        };

        Ok(Box::pin(futures::stream::iter(items)))
    }
}

/// Observer that records every callback
#[derive(Debug, Default)]
pub struct RecordingObserver {
    /// Loading transitions in order
    pub loading: Vec<bool>,
    /// Event names in order: `placeholder`, `fragment`, `failure`
    pub events: Vec<String>,
    /// Fragments and what happened to them
    pub fragments: Vec<(String, FragmentOutcome)>,
    /// Fallback texts shown
    pub failures: Vec<String>,
}

impl ChatObserver for RecordingObserver {
    fn on_loading(&mut self, loading: bool) {
        self.loading.push(loading);
    }

    fn on_placeholder(&mut self, _session_id: &str, _message_id: &str) {
        self.events.push("placeholder".to_string());
    }

    fn on_fragment(&mut self, fragment: &str, outcome: FragmentOutcome) {
        self.events.push("fragment".to_string());
        self.fragments.push((fragment.to_string(), outcome));
    }

    fn on_failure(&mut self, fallback: &str) {
        self.events.push("failure".to_string());
        self.failures.push(fallback.to_string());
    }
}
