//! HTTP surface: local command triggers, the stream upgrade, and health.

use axum::{
    Router,
    extract::{State, WebSocketUpgrade},
    http::StatusCode,
    response::Response,
    routing::get,
};

use crate::AppState;
use crate::command::Command;
use crate::stream;

/// All routes, state-generic so tests can mount them on their own state.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/stream", get(stream_handler))
        .route("/command/on", get(command_on))
        .route("/command/off", get(command_off))
        .route("/command/send", get(command_send))
}

async fn health() -> &'static str {
    "ok"
}

/// Upgrade to a WebSocket and hand the connection its own streaming session.
/// Sessions are fully independent; each gets its own ticker and ack gate.
async fn stream_handler(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| {
        stream::run_session(socket, state.frames.clone(), state.frame_period)
    })
}

// One operation per command keyword, as the dashboard expects. The empty 200
// means "accepted", not "completed": the command is queued for the executor
// and the real-world effect happens after we have answered.

async fn command_on(State(state): State<AppState>) -> StatusCode {
    trigger(&state, Command::On).await
}

async fn command_off(State(state): State<AppState>) -> StatusCode {
    trigger(&state, Command::Off).await
}

async fn command_send(State(state): State<AppState>) -> StatusCode {
    trigger(&state, Command::Send).await
}

async fn trigger(state: &AppState, command: Command) -> StatusCode {
    state.commands.dispatch(command).await;
    StatusCode::OK
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::CommandBus;
    use crate::frame::FrameSource;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::mpsc;
    use tower::ServiceExt;

    fn test_app() -> (Router, mpsc::Receiver<Command>) {
        let (commands, rx) = CommandBus::new(8);
        let dir = tempfile::tempdir().unwrap();
        let state = AppState {
            frames: Arc::new(FrameSource::new(dir.path().join("latest.jpg"), None)),
            commands,
            frame_period: Duration::from_millis(66),
        };
        (routes().with_state(state), rx)
    }

    async fn get_status(app: Router, uri: &str) -> StatusCode {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        response.status()
    }

    #[tokio::test]
    async fn health_answers_ok() {
        let (app, _rx) = test_app();
        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], b"ok");
    }

    #[tokio::test]
    async fn command_trigger_dispatches_exactly_once() {
        let (app, mut rx) = test_app();
        assert_eq!(get_status(app, "/command/on").await, StatusCode::OK);
        assert_eq!(rx.try_recv(), Ok(Command::On));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn each_keyword_maps_to_its_token() {
        let (app, mut rx) = test_app();
        assert_eq!(get_status(app.clone(), "/command/off").await, StatusCode::OK);
        assert_eq!(get_status(app, "/command/send").await, StatusCode::OK);
        assert_eq!(rx.try_recv(), Ok(Command::Off));
        assert_eq!(rx.try_recv(), Ok(Command::Send));
    }

    #[tokio::test]
    async fn unknown_command_path_is_not_found() {
        let (app, mut rx) = test_app();
        assert_eq!(
            get_status(app, "/command/reboot").await,
            StatusCode::NOT_FOUND
        );
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn trigger_succeeds_even_with_executor_gone() {
        let (app, rx) = test_app();
        drop(rx);
        // The caller only learns "accepted"; a dead executor is not its
        // problem.
        assert_eq!(get_status(app, "/command/on").await, StatusCode::OK);
    }

    #[tokio::test]
    async fn stream_route_requires_websocket_upgrade() {
        let (app, _rx) = test_app();
        // A plain GET without upgrade headers cannot become a session.
        let status = get_status(app, "/stream").await;
        assert!(status.is_client_error(), "got {}", status);
    }
}
