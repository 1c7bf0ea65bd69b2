use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, LINK};
use reqwest::{StatusCode, Url};
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use crate::github::transport::{RawResponse, Transport, TransportError};

/// One scripted reply.
#[derive(Debug, Clone)]
pub struct MockReply {
    result: Result<RawResponse, TransportError>,
}

impl MockReply {
    pub fn json(status: u16, body: Value) -> Self {
        Self::raw(status, &body.to_string())
    }

    pub fn raw(status: u16, body: &str) -> Self {
        Self {
            result: Ok(RawResponse {
                status: StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
                headers: HeaderMap::new(),
                body: body.to_string(),
            }),
        }
    }

    pub fn status(status: u16) -> Self {
        Self::raw(status, "")
    }

    pub fn timeout() -> Self {
        Self {
            result: Err(TransportError::Timeout("operation timed out".to_string())),
        }
    }

    pub fn connection_error() -> Self {
        Self {
            result: Err(TransportError::Connection("connection refused".to_string())),
        }
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        if let Ok(response) = &mut self.result {
            if let (Ok(name), Ok(value)) = (
                HeaderName::from_bytes(name.as_bytes()),
                HeaderValue::from_str(value),
            ) {
                response.headers.append(name, value);
            }
        }
        self
    }

    /// Adds a `Link` relation, merging with any relation already present.
    pub fn with_link(mut self, rel: &str, url: &str) -> Self {
        if let Ok(response) = &mut self.result {
            let entry = format!("<{}>; rel=\"{}\"", url, rel);
            let merged = match response.headers.get(LINK).and_then(|v| v.to_str().ok()) {
                Some(existing) => format!("{}, {}", existing, entry),
                None => entry,
            };
            if let Ok(value) = HeaderValue::from_str(&merged) {
                response.headers.insert(LINK, value);
            }
        }
        self
    }
}

struct Route {
    path: String,
    query: Vec<(String, String)>,
    replies: VecDeque<MockReply>,
}

impl Route {
    fn matches(&self, url: &Url) -> bool {
        url.path() == self.path
            && self
                .query
                .iter()
                .all(|(k, v)| url.query_pairs().any(|(qk, qv)| qk == *k && qv == *v))
    }
}

/// Serves scripted replies by path. The last reply of a route repeats once
/// the rest are used up; unmatched requests get a 404.
#[derive(Default)]
pub struct MockTransport {
    routes: Mutex<Vec<Route>>,
    requests: Mutex<Vec<(Url, HeaderMap)>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(&self, path: &str, replies: Vec<MockReply>) {
        self.on_query(path, &[], replies);
    }

    /// Routes are checked in registration order, so register the more
    /// specific query before a catch-all for the same path.
    pub fn on_query(&self, path: &str, query: &[(&str, &str)], replies: Vec<MockReply>) {
        let mut routes = self.routes.lock().unwrap_or_else(|p| p.into_inner());
        routes.push(Route {
            path: path.to_string(),
            query: query
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            replies: replies.into(),
        });
    }

    pub fn requests(&self) -> Vec<Url> {
        self.requests
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .iter()
            .map(|(url, _)| url.clone())
            .collect()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap_or_else(|p| p.into_inner()).len()
    }

    pub fn requests_to(&self, path: &str) -> usize {
        self.requests().iter().filter(|u| u.path() == path).count()
    }

    pub fn last_headers(&self) -> Option<HeaderMap> {
        self.requests
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .last()
            .map(|(_, headers)| headers.clone())
    }

    fn next_reply(&self, url: &Url) -> MockReply {
        let mut routes = self.routes.lock().unwrap_or_else(|p| p.into_inner());
        match routes.iter_mut().find(|route| route.matches(url)) {
            Some(route) if route.replies.len() > 1 => route.replies.pop_front().unwrap_or_else(|| MockReply::status(404)),
            Some(route) => route.replies.front().cloned().unwrap_or_else(|| MockReply::status(404)),
            None => MockReply::status(404),
        }
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn get(
        &self,
        url: &Url,
        headers: &HeaderMap,
        _timeout: Duration,
    ) -> Result<RawResponse, TransportError> {
        self.requests
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .push((url.clone(), headers.clone()));
        self.next_reply(url).result
    }
}
