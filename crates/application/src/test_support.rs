//! Shared test doubles.
#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use waypoint_domain::{AppSettings, AuthEntry, CertEntry, Cookie, ProxyEntry};

use crate::ports::{
    CancellationToken, ConfigStore, CookieStore, HttpTransport, SettingsProvider, StoreError,
    TransportError, TransportRequest, TransportResponse,
};

/// A transport that replays a fixed script of outcomes and records
/// every request it was handed.
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    script: Mutex<VecDeque<Result<TransportResponse, TransportError>>>,
    requests: Mutex<Vec<TransportRequest>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_response(&self, response: TransportResponse) {
        self.script.lock().unwrap().push_back(Ok(response));
    }

    pub fn push_error(&self, error: TransportError) {
        self.script.lock().unwrap().push_back(Err(error));
    }

    pub fn requests(&self) -> Vec<TransportRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl HttpTransport for ScriptedTransport {
    async fn perform(
        &self,
        request: TransportRequest,
        _cancel: CancellationToken,
    ) -> Result<TransportResponse, TransportError> {
        self.requests.lock().unwrap().push(request);
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .expect("scripted transport ran out of responses")
    }
}

/// A settings provider returning a fixed snapshot.
pub struct StaticSettings(pub AppSettings);

impl SettingsProvider for StaticSettings {
    fn settings(&self) -> AppSettings {
        self.0
    }
}

/// A config store serving fixed entry lists.
#[derive(Debug, Default)]
pub struct InMemoryConfigStore {
    pub auths: Vec<AuthEntry>,
    pub proxies: Vec<ProxyEntry>,
    pub certs: Vec<CertEntry>,
}

#[async_trait]
impl ConfigStore for InMemoryConfigStore {
    async fn load_auths(&self) -> Result<Vec<AuthEntry>, StoreError> {
        Ok(self.auths.clone())
    }

    async fn load_proxies(&self) -> Result<Vec<ProxyEntry>, StoreError> {
        Ok(self.proxies.clone())
    }

    async fn load_certs(&self) -> Result<Vec<CertEntry>, StoreError> {
        Ok(self.certs.clone())
    }
}

/// A cookie store backed by a plain vector.
#[derive(Debug, Default)]
pub struct InMemoryCookieStore {
    pub cookies: Mutex<Vec<Cookie>>,
}

#[async_trait]
impl CookieStore for InMemoryCookieStore {
    async fn load_all(&self) -> Result<Vec<Cookie>, StoreError> {
        Ok(self.cookies.lock().unwrap().clone())
    }

    async fn save_all(&self, cookies: &[Cookie]) -> Result<(), StoreError> {
        *self.cookies.lock().unwrap() = cookies.to_vec();
        Ok(())
    }
}

/// Builds a response with the given status and headers and an empty
/// body.
pub fn response(status: u16, headers: &[(&str, &str)]) -> TransportResponse {
    TransportResponse {
        status,
        status_text: String::new(),
        headers: headers
            .iter()
            .map(|(n, v)| ((*n).to_string(), (*v).to_string()))
            .collect(),
        body: Vec::new(),
    }
}

/// Builds a 200 response with the given body.
pub fn ok_body(body: &str) -> TransportResponse {
    TransportResponse {
        status: 200,
        status_text: "OK".to_string(),
        headers: Vec::new(),
        body: body.as_bytes().to_vec(),
    }
}
