//! Client tests against a fake backend on an ephemeral port.

use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{
        IntoResponse, Response,
        sse::{Event, Sse},
    },
    routing::{get, post},
};
use futures::StreamExt;
use serde_json::json;

use newschat::Error;
use newschat::api::{Backend, Client, Role, StreamEvent};

#[derive(Clone, Default)]
struct FakeState {
    deleted: Arc<Mutex<Vec<String>>>,
    asked: Arc<Mutex<Vec<(String, String)>>>,
}

async fn create_session() -> impl IntoResponse {
    Json(json!({ "sessionId": "sess-42" }))
}

async fn history(Path(id): Path<String>) -> Response {
    match id.as_str() {
        "broken" => (StatusCode::INTERNAL_SERVER_ERROR, "database down").into_response(),
        _ => Json(json!({
            "history": [
                { "role": "user", "content": "What happened today?" },
                {
                    "role": "assistant",
                    "content": "* Markets\nStocks rose.",
                    "sources": [
                        { "title": "Rally", "link": "https://news.example/rally", "source": "Wire" }
                    ]
                }
            ]
        }))
        .into_response(),
    }
}

async fn delete_history(State(state): State<FakeState>, Path(id): Path<String>) -> StatusCode {
    if id == "missing" {
        return StatusCode::NOT_FOUND;
    }
    state.deleted.lock().unwrap().push(id);
    StatusCode::OK
}

async fn chat(
    State(state): State<FakeState>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let session = params.get("sessionId").cloned().unwrap_or_default();
    let message = params.get("message").cloned().unwrap_or_default();
    state
        .asked
        .lock()
        .unwrap()
        .push((session.clone(), message));

    let events: Vec<Event> = match session.as_str() {
        "unavailable" => return (StatusCode::SERVICE_UNAVAILABLE, "busy").into_response(),
        "failing" => vec![
            Event::default().data(json!({ "chunk": "Partial" }).to_string()),
            Event::default().event("error").data("model overloaded"),
        ],
        "dropped" => vec![Event::default().data(json!({ "chunk": "Cut" }).to_string())],
        _ => vec![
            Event::default().comment("keep-alive"),
            Event::default().data(json!({ "chunk": "Stocks" }).to_string()),
            Event::default().event("progress").data("{}"),
            Event::default().data(json!({ "chunk": "rose" }).to_string()),
            Event::default().event("sources").data(
                json!({ "sources": [
                    { "title": "Rally", "link": "https://news.example/rally", "source": "Wire" }
                ] })
                .to_string(),
            ),
            Event::default()
                .event("complete")
                .data(json!({ "success": true }).to_string()),
        ],
    };

    Sse::new(futures::stream::iter(events.into_iter().map(Ok::<_, Infallible>))).into_response()
}

async fn spawn_backend() -> (Client, FakeState) {
    let state = FakeState::default();
    let app = Router::new()
        .route("/api/session", post(create_session))
        .route(
            "/api/session/{id}/history",
            get(history).delete(delete_history),
        )
        .route("/api/chat", get(chat))
        .with_state(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let client = Client::new(format!("http://{addr}")).unwrap();
    (client, state)
}

#[tokio::test]
async fn test_create_session() {
    let (client, _) = spawn_backend().await;
    assert_eq!(client.create_session().await.unwrap(), "sess-42");
}

#[tokio::test]
async fn test_fetch_history() {
    let (client, _) = spawn_backend().await;
    let history = client.fetch_history("sess-42").await.unwrap();

    assert_eq!(history.len(), 2);
    assert_eq!(history[0].role, Role::User);
    assert!(history[0].sources.is_none());
    assert_eq!(history[1].role, Role::Assistant);
    assert_eq!(history[1].sources.as_ref().unwrap()[0].source, "Wire");
}

#[tokio::test]
async fn test_fetch_history_error_status() {
    let (client, _) = spawn_backend().await;
    let err = client.fetch_history("broken").await.unwrap_err();
    assert!(
        matches!(err, Error::Api { status: 500, ref message } if message == "database down"),
        "unexpected error: {err:?}"
    );
}

#[tokio::test]
async fn test_delete_history() {
    let (client, state) = spawn_backend().await;
    client.delete_history("sess-42").await.unwrap();
    assert_eq!(*state.deleted.lock().unwrap(), vec!["sess-42".to_string()]);

    let err = client.delete_history("missing").await.unwrap_err();
    assert!(matches!(err, Error::Api { status: 404, .. }));
}

#[tokio::test]
async fn test_chat_stream_decodes_events_in_order() {
    let (client, state) = spawn_backend().await;
    let stream = client
        .open_chat("sess-42", "Markets & rates today?")
        .await
        .unwrap();
    let events: Vec<StreamEvent> = stream.map(Result::unwrap).collect().await;

    assert_eq!(events.len(), 4);
    assert_eq!(events[0], StreamEvent::Chunk("Stocks".into()));
    assert_eq!(events[1], StreamEvent::Chunk("rose".into()));
    assert!(matches!(&events[2], StreamEvent::Sources(s) if s.len() == 1));
    assert_eq!(events[3], StreamEvent::Complete { success: true });

    assert_eq!(
        *state.asked.lock().unwrap(),
        vec![("sess-42".to_string(), "Markets & rates today?".to_string())]
    );
}

#[tokio::test]
async fn test_chat_error_event_is_a_stream_error() {
    let (client, _) = spawn_backend().await;
    let mut stream = client.open_chat("failing", "hi").await.unwrap();

    assert_eq!(
        stream.next().await.unwrap().unwrap(),
        StreamEvent::Chunk("Partial".into())
    );
    let err = stream.next().await.unwrap().unwrap_err();
    assert!(matches!(err, Error::Stream(ref msg) if msg == "model overloaded"));
}

#[tokio::test]
async fn test_chat_stream_ending_without_complete() {
    let (client, _) = spawn_backend().await;
    let events: Vec<_> = client
        .open_chat("dropped", "hi")
        .await
        .unwrap()
        .collect()
        .await;

    assert_eq!(events.len(), 1);
    assert!(!events[0].as_ref().unwrap().is_terminal());
}

#[tokio::test]
async fn test_chat_rejected_status() {
    let (client, _) = spawn_backend().await;
    let Err(err) = client.open_chat("unavailable", "hi").await else {
        panic!("expected the chat request to be refused");
    };
    assert!(matches!(err, Error::Api { status: 503, .. }));
}

#[tokio::test]
async fn test_slow_session_call_times_out() {
    let app = Router::new().route(
        "/api/session",
        post(|| async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Json(json!({ "sessionId": "too-late" }))
        }),
    );
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let client =
        Client::with_request_timeout(format!("http://{addr}"), Duration::from_millis(200)).unwrap();
    let err = client.create_session().await.unwrap_err();
    assert!(
        matches!(err, Error::Http(ref e) if e.is_timeout()),
        "unexpected error: {err:?}"
    );
}
