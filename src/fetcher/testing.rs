use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use reqwest::StatusCode;

use crate::app::{FetchError, Result};
use crate::domain::FetchTarget;
use crate::fetcher::{ProbeResponse, RemoteResponse, Transport};

enum HeadScript {
    Response {
        status: StatusCode,
        last_modified: Option<String>,
    },
    Error(String),
    Hang,
}

enum GetScript {
    Response { status: StatusCode, chunks: Vec<Vec<u8>> },
    BrokenStream { prefix: Vec<u8>, message: String },
    Error(String),
    Hang,
}

/// Transport double answering from a script and counting requests.
///
/// Every HEAD gets the same answer; GETs consume the script in order.
pub(crate) struct ScriptedTransport {
    head: HeadScript,
    gets: Mutex<VecDeque<GetScript>>,
    head_calls: AtomicUsize,
    get_calls: AtomicUsize,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self {
            head: HeadScript::Response {
                status: StatusCode::OK,
                last_modified: None,
            },
            gets: Mutex::new(VecDeque::new()),
            head_calls: AtomicUsize::new(0),
            get_calls: AtomicUsize::new(0),
        }
    }

    pub fn head_last_modified(mut self, value: &str) -> Self {
        self.head = HeadScript::Response {
            status: StatusCode::OK,
            last_modified: Some(value.to_string()),
        };
        self
    }

    pub fn head_status(mut self, status: StatusCode, last_modified: &str) -> Self {
        self.head = HeadScript::Response {
            status,
            last_modified: Some(last_modified.to_string()),
        };
        self
    }

    pub fn head_error(mut self, message: &str) -> Self {
        self.head = HeadScript::Error(message.to_string());
        self
    }

    pub fn head_hang(mut self) -> Self {
        self.head = HeadScript::Hang;
        self
    }

    pub fn get_ok(self, body: &[u8]) -> Self {
        self.get_chunked(vec![body.to_vec()])
    }

    pub fn get_chunked(self, chunks: Vec<Vec<u8>>) -> Self {
        self.push(GetScript::Response {
            status: StatusCode::OK,
            chunks,
        })
    }

    pub fn get_status(self, status: StatusCode) -> Self {
        self.push(GetScript::Response {
            status,
            chunks: vec![b"error page".to_vec()],
        })
    }

    pub fn get_broken_stream(self, prefix: &[u8], message: &str) -> Self {
        self.push(GetScript::BrokenStream {
            prefix: prefix.to_vec(),
            message: message.to_string(),
        })
    }

    pub fn get_error(self, message: &str) -> Self {
        self.push(GetScript::Error(message.to_string()))
    }

    /// A GET that never answers.
    pub fn get_hang(self) -> Self {
        self.push(GetScript::Hang)
    }

    pub fn head_calls(&self) -> usize {
        self.head_calls.load(Ordering::SeqCst)
    }

    pub fn get_calls(&self) -> usize {
        self.get_calls.load(Ordering::SeqCst)
    }

    fn push(self, script: GetScript) -> Self {
        self.gets.lock().unwrap().push_back(script);
        self
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn head(&self, _target: &FetchTarget) -> Result<ProbeResponse> {
        self.head_calls.fetch_add(1, Ordering::SeqCst);
        match &self.head {
            HeadScript::Response {
                status,
                last_modified,
            } => Ok(ProbeResponse {
                status: *status,
                last_modified: last_modified.clone(),
            }),
            HeadScript::Error(message) => Err(FetchError::Other(message.clone())),
            HeadScript::Hang => futures::future::pending().await,
        }
    }

    async fn get(&self, _target: &FetchTarget) -> Result<RemoteResponse> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        let script = self
            .gets
            .lock()
            .unwrap()
            .pop_front()
            .expect("unexpected GET: script exhausted");

        match script {
            GetScript::Response { status, chunks } => Ok(RemoteResponse {
                status,
                body: futures::stream::iter(chunks.into_iter().map(|c| Ok(Bytes::from(c))))
                    .boxed(),
            }),
            GetScript::BrokenStream { prefix, message } => {
                let items: Vec<Result<Bytes>> =
                    vec![Ok(Bytes::from(prefix)), Err(FetchError::Other(message))];
                Ok(RemoteResponse {
                    status: StatusCode::OK,
                    body: futures::stream::iter(items).boxed(),
                })
            }
            GetScript::Error(message) => Err(FetchError::Other(message)),
            GetScript::Hang => futures::future::pending().await,
        }
    }
}
