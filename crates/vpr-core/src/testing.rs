//! In-memory fakes shared by the unit tests.

use std::{collections::HashMap, sync::Mutex, time::Duration};

use async_trait::async_trait;

use crate::{
    domain::{ChatId, MessageId, MessageRef},
    errors::Error,
    messaging::{port::MessagingPort, types::MessagingCapabilities},
    ports::{HttpClient, HttpResponse},
    Result,
};

/// `HttpClient` answering from a script and recording every request key.
///
/// Keys are `url` or `url?k=v&k=v` with raw (unencoded) query values.
/// Unscripted requests fail like a transport error.
#[derive(Default)]
pub struct ScriptedHttp {
    routes: Mutex<HashMap<String, std::result::Result<HttpResponse, String>>>,
    calls: Mutex<Vec<String>>,
    stalls: Mutex<HashMap<String, Duration>>,
}

impl ScriptedHttp {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn key(url: &str, query: &[(&str, &str)]) -> String {
        if query.is_empty() {
            return url.to_string();
        }
        let qs = query
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("&");
        format!("{url}?{qs}")
    }

    pub fn respond(&self, key: &str, status: u16, body: &str) {
        let final_url = key.split('?').next().unwrap_or(key).to_string();
        self.insert(
            key,
            Ok(HttpResponse {
                status,
                final_url,
                body: body.to_string(),
            }),
        );
    }

    pub fn page(&self, url: &str, body: &str) {
        self.respond(url, 200, body);
    }

    pub fn redirect(&self, url: &str, final_url: &str, body: &str) {
        self.insert(
            url,
            Ok(HttpResponse {
                status: 200,
                final_url: final_url.to_string(),
                body: body.to_string(),
            }),
        );
    }

    pub fn fail(&self, key: &str, reason: &str) {
        self.insert(key, Err(reason.to_string()));
    }

    /// Hold requests for `key` for `delay` before answering.
    pub fn stall(&self, key: &str, delay: Duration) {
        self.stalls.lock().unwrap().insert(key.to_string(), delay);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn insert(&self, key: &str, answer: std::result::Result<HttpResponse, String>) {
        self.routes.lock().unwrap().insert(key.to_string(), answer);
    }
}

#[async_trait]
impl HttpClient for ScriptedHttp {
    async fn get(
        &self,
        url: &str,
        query: &[(&str, &str)],
        _timeout: Duration,
    ) -> Result<HttpResponse> {
        let key = Self::key(url, query);
        self.calls.lock().unwrap().push(key.clone());
        let stall = self.stalls.lock().unwrap().get(&key).copied();
        if let Some(delay) = stall {
            tokio::time::sleep(delay).await;
        }
        match self.routes.lock().unwrap().get(&key) {
            Some(Ok(resp)) => Ok(resp.clone()),
            Some(Err(reason)) => Err(Error::Http(reason.clone())),
            None => Err(Error::Http(format!("unscripted request: {key}"))),
        }
    }
}

/// `MessagingPort` that records posts, optionally failing them.
#[derive(Default)]
pub struct FakeMessenger {
    pub sent: Mutex<Vec<(ChatId, String, bool)>>,
    pub fail_with: Option<String>,
}

impl FakeMessenger {
    pub fn failing(reason: &str) -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail_with: Some(reason.to_string()),
        }
    }

    pub fn texts(&self) -> Vec<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .map(|(_, t, _)| t.clone())
            .collect()
    }
}

#[async_trait]
impl MessagingPort for FakeMessenger {
    fn capabilities(&self) -> MessagingCapabilities {
        MessagingCapabilities {
            supports_link_previews: true,
            max_message_len: 4096,
        }
    }

    async fn send_text(&self, chat_id: ChatId, text: &str, preview: bool) -> Result<MessageRef> {
        if let Some(reason) = &self.fail_with {
            return Err(Error::External(reason.clone()));
        }
        let mut sent = self.sent.lock().unwrap();
        sent.push((chat_id, text.to_string(), preview));
        Ok(MessageRef {
            chat_id,
            message_id: MessageId(sent.len() as i32),
        })
    }
}
