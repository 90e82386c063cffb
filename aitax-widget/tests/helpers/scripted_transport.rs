//! In-memory transport with scripted responses

use aitax_widget::adapters::{IdentifyRequest, RawResponse};
use aitax_widget::error::TransportError;
use aitax_widget::services::Transport;
use async_trait::async_trait;
use reqwest::Url;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

/// Scripted step: what the next exchange returns, after how long
pub type Step = (Duration, Result<RawResponse, TransportError>);

/// Transport that replays a script and records every request
#[derive(Default)]
pub struct ScriptedTransport {
    script: Mutex<VecDeque<Step>>,
    sent: Mutex<Vec<IdentifyRequest>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn then_ok(self, body: &str) -> Self {
        self.then(Duration::ZERO, Ok(RawResponse::ok(body)))
    }

    pub fn then(self, delay: Duration, response: Result<RawResponse, TransportError>) -> Self {
        self.script.lock().unwrap().push_back((delay, response));
        self
    }

    pub fn sent(&self) -> Vec<IdentifyRequest> {
        self.sent.lock().unwrap().clone()
    }

    async fn next(&self) -> Result<RawResponse, TransportError> {
        let step = self.script.lock().unwrap().pop_front();
        match step {
            Some((delay, response)) => {
                tokio::time::sleep(delay).await;
                response
            }
            None => Err(TransportError::Request("script exhausted".to_string())),
        }
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: IdentifyRequest) -> Result<RawResponse, TransportError> {
        self.sent.lock().unwrap().push(request);
        self.next().await
    }

    async fn get(&self, _url: &Url) -> Result<RawResponse, TransportError> {
        self.next().await
    }
}
