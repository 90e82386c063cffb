//! In-process identification backend
//!
//! An axum server on `127.0.0.1:0` that records every multipart submission
//! and answers from a script of canned replies. GET requests are answered
//! per path (`/status`, `/taxa`, ...).

use axum::extract::{Multipart, Query, State};
use axum::http::{header, StatusCode, Uri};
use axum::response::IntoResponse;
use axum::routing::any;
use axum::Router;
use reqwest::Url;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;

/// One canned HTTP reply
#[derive(Debug, Clone)]
pub struct MockReply {
    pub status: StatusCode,
    pub body: String,
    pub delay: Duration,
}

impl MockReply {
    pub fn json(body: &str) -> Self {
        Self {
            status: StatusCode::OK,
            body: body.to_string(),
            delay: Duration::ZERO,
        }
    }

    pub fn status(status: StatusCode, body: &str) -> Self {
        Self {
            status,
            body: body.to_string(),
            delay: Duration::ZERO,
        }
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

/// Multipart part as received by the backend
#[derive(Debug, Clone)]
pub struct RecordedField {
    pub name: String,
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub data: Vec<u8>,
}

/// Submission as received by the backend
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub query: HashMap<String, String>,
    pub fields: Vec<RecordedField>,
}

impl RecordedRequest {
    /// Text values of all parts named `name`
    pub fn text_fields(&self, name: &str) -> Vec<String> {
        self.fields
            .iter()
            .filter(|f| f.name == name && f.file_name.is_none())
            .map(|f| String::from_utf8_lossy(&f.data).into_owned())
            .collect()
    }

    /// File names of all file parts named `name`
    pub fn file_fields(&self, name: &str) -> Vec<String> {
        self.fields
            .iter()
            .filter(|f| f.name == name)
            .filter_map(|f| f.file_name.clone())
            .collect()
    }

    /// Part names in the order they were sent
    pub fn field_names(&self) -> Vec<&str> {
        self.fields.iter().map(|f| f.name.as_str()).collect()
    }
}

#[derive(Clone, Default)]
struct MockState {
    posts: Arc<Mutex<VecDeque<MockReply>>>,
    fallback: Arc<Mutex<Option<MockReply>>>,
    gets: Arc<Mutex<HashMap<String, MockReply>>>,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

/// Running mock backend; stops when dropped
pub struct MockBackend {
    base: Url,
    state: MockState,
    handle: JoinHandle<()>,
}

impl MockBackend {
    pub async fn start() -> Self {
        let state = MockState::default();
        let app = Router::new()
            .route("/*path", any(handle))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base: Url::parse(&format!("http://{}", addr)).unwrap(),
            state,
            handle,
        }
    }

    /// Absolute URL for `path` on this backend
    pub fn url(&self, path: &str) -> Url {
        self.base.join(path).unwrap()
    }

    /// Queue a reply for the next POST
    pub fn push_reply(&self, reply: MockReply) {
        self.state.posts.lock().unwrap().push_back(reply);
    }

    /// Reply used once the POST queue is exhausted
    pub fn set_fallback(&self, reply: MockReply) {
        *self.state.fallback.lock().unwrap() = Some(reply);
    }

    /// Reply for GET requests whose path ends with `suffix`
    pub fn on_get(&self, suffix: &str, reply: MockReply) {
        self.state
            .gets
            .lock()
            .unwrap()
            .insert(suffix.to_string(), reply);
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.requests.lock().unwrap().clone()
    }

    pub fn posts(&self) -> Vec<RecordedRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.method == "POST")
            .collect()
    }
}

impl Drop for MockBackend {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn handle(
    State(state): State<MockState>,
    method: axum::http::Method,
    uri: Uri,
    Query(query): Query<HashMap<String, String>>,
    multipart: Option<Multipart>,
) -> impl IntoResponse {
    let mut fields = Vec::new();
    if let Some(mut multipart) = multipart {
        while let Ok(Some(field)) = multipart.next_field().await {
            let name = field.name().unwrap_or_default().to_string();
            let file_name = field.file_name().map(str::to_string);
            let content_type = field.content_type().map(str::to_string);
            let data = field.bytes().await.map(|b| b.to_vec()).unwrap_or_default();
            fields.push(RecordedField {
                name,
                file_name,
                content_type,
                data,
            });
        }
    }

    let path = uri.path().to_string();
    state.requests.lock().unwrap().push(RecordedRequest {
        method: method.to_string(),
        path: path.clone(),
        query,
        fields,
    });

    let reply = if method == axum::http::Method::GET {
        state
            .gets
            .lock()
            .unwrap()
            .iter()
            .find(|(suffix, _)| path.ends_with(suffix.as_str()))
            .map(|(_, reply)| reply.clone())
    } else {
        let queued = state.posts.lock().unwrap().pop_front();
        queued.or_else(|| state.fallback.lock().unwrap().clone())
    };
    let reply = reply.unwrap_or_else(|| MockReply::status(StatusCode::NOT_FOUND, ""));

    tokio::time::sleep(reply.delay).await;
    (
        reply.status,
        [(header::CONTENT_TYPE, "application/json")],
        reply.body,
    )
}
