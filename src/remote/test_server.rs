//! Local axum server for driving the client end to end in tests

use axum::extract::State;
use axum::http::StatusCode;
use axum::{Json, Router};
use futures::future::BoxFuture;
use serde_json::Value;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::net::TcpListener;

type Handler = Arc<dyn Fn(Value) -> BoxFuture<'static, (u16, Value)> + Send + Sync>;

#[derive(Clone)]
struct MockState {
    handler: Handler,
    hits: Arc<AtomicUsize>,
}

/// Local server answering every JSON `POST` through a handler
pub struct TestServer {
    pub base_url: String,
    hits: Arc<AtomicUsize>,
}

impl TestServer {
    /// Bind to an ephemeral port; `handler` maps a request body to
    /// `(status, response body)`
    pub async fn start<F, Fut>(handler: F) -> Self
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = (u16, Value)> + Send + 'static,
    {
        let hits = Arc::new(AtomicUsize::new(0));
        let state = MockState {
            handler: Arc::new(move |body| Box::pin(handler(body)) as BoxFuture<'static, _>),
            hits: hits.clone(),
        };
        let app = Router::new().fallback(respond).with_state(state);

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind test server");
        let addr = listener.local_addr().expect("test server address");
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self {
            base_url: format!("http://{addr}"),
            hits,
        }
    }

    /// Requests received so far
    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}

async fn respond(
    State(state): State<MockState>,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    state.hits.fetch_add(1, Ordering::SeqCst);
    let (status, reply) = (state.handler)(body).await;
    let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(reply))
}
