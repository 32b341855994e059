//! Transport abstraction.
//!
//! A [`Transport`] carries one [`Request`] to the store and hands back the raw
//! [`Response`]. Status handling and body decoding happen above it, in
//! [`crate::EntitiesApi`], so every backend behaves the same on errors.

use crate::error::{ClientError, ClientResult};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::fmt;

/// HTTP verbs used by the store API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A request relative to the API root, e.g. `entities/abc/values`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub method: Method,
    pub path: String,
    pub headers: Vec<(String, String)>,
    pub query: Vec<(String, String)>,
    pub body: Option<String>,
}

impl Request {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            headers: Vec::new(),
            query: Vec::new(),
            body: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::Get, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::Post, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::Delete, path)
    }

    /// Adds a header, replacing any existing header with the same name.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let name = name.into();
        self.headers.retain(|(n, _)| !n.eq_ignore_ascii_case(&name));
        self.headers.push((name, value.into()));
        self
    }

    pub fn query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((name.into(), value.into()));
        self
    }

    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Looks up a header by case-insensitive name.
    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn query_value(&self, name: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }
}

/// A raw response from the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: u16,
    pub body: String,
    pub headers: Vec<(String, String)>,
}

impl Response {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
            headers: Vec::new(),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn ok(body: impl Into<String>) -> Self {
        Self::new(200, body)
    }

    pub fn json(status: u16, value: &serde_json::Value) -> Self {
        Self::new(status, value.to_string())
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Turns a non-2xx response into [`ClientError::Status`].
    pub fn error_for_status(self) -> ClientResult<Self> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(ClientError::Status {
                status: self.status,
                body: self.body,
            })
        }
    }

    /// Decodes the body as JSON.
    pub fn decode<T: DeserializeOwned>(&self) -> ClientResult<T> {
        Ok(serde_json::from_str(&self.body)?)
    }
}

/// Carries requests to the store.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Sends the request and returns the raw response, whatever its status.
    async fn request(&self, request: Request) -> ClientResult<Response>;
}

/// A scripted transport for testing.
pub mod mock {
    use super::*;
    use std::sync::{Mutex, PoisonError};

    struct Route {
        method: Method,
        path: String,
        query: Vec<(String, String)>,
        response: Response,
    }

    impl Route {
        fn matches(&self, request: &Request) -> bool {
            self.method == request.method
                && self.path == request.path
                && self
                    .query
                    .iter()
                    .all(|(k, v)| request.query_value(k) == Some(v.as_str()))
        }
    }

    /// Answers requests from a list of scripted routes and records every
    /// request it sees.
    ///
    /// The most recently registered matching route wins. Unmatched `GET`s
    /// answer 404; unmatched writes answer 200 with an empty body.
    #[derive(Default)]
    pub struct MockTransport {
        routes: Mutex<Vec<Route>>,
        requests: Mutex<Vec<Request>>,
        failures: Mutex<Vec<(Method, String)>>,
    }

    impl MockTransport {
        pub fn new() -> Self {
            Self::default()
        }

        /// Scripts a response for `method path`.
        pub fn on(&self, method: Method, path: impl Into<String>, response: Response) {
            self.on_query(method, path, &[], response);
        }

        /// Scripts a response for `method path` when every given query
        /// parameter is present with the given value.
        pub fn on_query(
            &self,
            method: Method,
            path: impl Into<String>,
            query: &[(&str, &str)],
            response: Response,
        ) {
            self.routes
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(Route {
                    method,
                    path: path.into(),
                    query: query
                        .iter()
                        .map(|(k, v)| (k.to_string(), v.to_string()))
                        .collect(),
                    response,
                });
        }

        /// Makes requests to `method path` fail with a network error.
        pub fn fail(&self, method: Method, path: impl Into<String>) {
            self.failures
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push((method, path.into()));
        }

        /// All requests seen so far, oldest first.
        pub fn requests(&self) -> Vec<Request> {
            self.requests
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clone()
        }

        /// Requests other than `GET`, oldest first.
        pub fn writes(&self) -> Vec<Request> {
            self.requests()
                .into_iter()
                .filter(|r| r.method != Method::Get)
                .collect()
        }

        pub fn clear_requests(&self) {
            self.requests
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clear();
        }
    }

    #[async_trait]
    impl Transport for MockTransport {
        async fn request(&self, request: Request) -> ClientResult<Response> {
            self.requests
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(request.clone());

            let failing = self
                .failures
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .iter()
                .any(|(m, p)| *m == request.method && *p == request.path);
            if failing {
                return Err(ClientError::Network(format!(
                    "{} {} unreachable",
                    request.method, request.path
                )));
            }

            let routes = self.routes.lock().unwrap_or_else(PoisonError::into_inner);
            let scripted = routes.iter().rev().find(|r| r.matches(&request));
            Ok(match scripted {
                Some(route) => route.response.clone(),
                None if request.method == Method::Get => Response::new(404, ""),
                None => Response::ok(""),
            })
        }
    }
}
