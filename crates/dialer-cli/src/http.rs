//! HTTP - 操作 API・Webhook・状態配信
//!
//! # ルート
//! - `/api/*`: オペレーターのコマンドと状態取得（JSON）
//! - `/webhooks/status`: プロバイダからのステータス通知（常に 200）
//! - `/twiml/outbound`: 発信先が応答したときの音声指示
//! - `/ws`: 接続時に現在の状態を 1 回送り、以後は変化のたびに送る
//! - それ以外: 操作パネルの静的ファイル
//!
//! CORS は全オリジンに開いています。

use std::path::Path;
use std::sync::Arc;

use axum::extract::rejection::{FormRejection, JsonRejection};
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::http::{StatusCode, header};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Form, Json, Router};
use dialer_core::{
    CallStatus, CommandReport, DialerEngine, DialerError, DialerSnapshot, StatusNotification,
};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tracing::{debug, warn};

type AppState = Arc<DialerEngine>;

const ANSWER_DOCUMENT: &str =
    r#"<?xml version="1.0" encoding="UTF-8"?><Response><Say>Connecting your call.</Say></Response>"#;

pub fn router(engine: Arc<DialerEngine>, public_dir: &Path) -> Router {
    Router::new()
        .route("/api/start", post(start))
        .route("/api/start-from", post(start_from))
        .route("/api/stop", post(stop))
        .route("/api/reset", post(reset))
        .route("/api/auto-next", post(auto_next))
        .route("/api/next", post(next))
        .route("/api/state", get(state))
        .route("/webhooks/status", post(status_webhook))
        .route("/twiml/outbound", post(answer))
        .route("/ws", get(ws))
        .fallback_service(ServeDir::new(public_dir))
        .layer(CorsLayer::permissive())
        .with_state(engine)
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CommandResponse {
    success: bool,
    status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    current_target: Option<String>,
}

impl CommandResponse {
    fn failure(status: impl Into<String>) -> Json<Self> {
        Json(Self {
            success: false,
            status: status.into(),
            current_target: None,
        })
    }
}

fn respond(result: Result<CommandReport, DialerError>) -> Json<CommandResponse> {
    match result {
        Ok(report) => Json(CommandResponse {
            success: true,
            status: report.status,
            current_target: None,
        }),
        Err(err) => CommandResponse::failure(err.to_string()),
    }
}

#[derive(Debug, Deserialize)]
struct StartFromRequest {
    index: i64,
}

#[derive(Debug, Deserialize)]
struct AutoNextRequest {
    enabled: bool,
}

/// Form fields the provider posts to the status callback.
#[derive(Debug, Deserialize)]
struct StatusForm {
    #[serde(rename = "CallSid")]
    call_sid: String,
    #[serde(rename = "CallStatus")]
    call_status: String,
    #[serde(rename = "Direction")]
    direction: Option<String>,
    #[serde(rename = "ConferenceSid")]
    conference_sid: Option<String>,
}

impl From<StatusForm> for StatusNotification {
    fn from(form: StatusForm) -> Self {
        Self {
            call_id: form.call_sid.as_str().into(),
            status: CallStatus::from(form.call_status.as_str()),
            direction: form.direction,
            conference_id: form.conference_sid,
        }
    }
}

async fn start(State(engine): State<AppState>) -> Json<CommandResponse> {
    respond(engine.start().await)
}

async fn start_from(
    State(engine): State<AppState>,
    payload: Result<Json<StartFromRequest>, JsonRejection>,
) -> Json<CommandResponse> {
    match payload {
        Ok(Json(request)) => respond(engine.start_from(request.index).await),
        Err(rejection) => CommandResponse::failure(format!("Invalid index: {}", rejection.body_text())),
    }
}

async fn stop(State(engine): State<AppState>) -> Json<CommandResponse> {
    respond(engine.stop().await)
}

async fn reset(State(engine): State<AppState>) -> Json<CommandResponse> {
    respond(engine.reset().await)
}

async fn auto_next(
    State(engine): State<AppState>,
    payload: Result<Json<AutoNextRequest>, JsonRejection>,
) -> Json<CommandResponse> {
    match payload {
        Ok(Json(request)) => respond(engine.set_auto_next(request.enabled).await),
        Err(rejection) => {
            CommandResponse::failure(format!("Invalid payload: {}", rejection.body_text()))
        }
    }
}

async fn next(State(engine): State<AppState>) -> Json<CommandResponse> {
    match engine.next().await {
        Ok(report) => Json(CommandResponse {
            success: true,
            status: report.status,
            current_target: report.snapshot.current_target,
        }),
        Err(err) => CommandResponse::failure(err.to_string()),
    }
}

async fn state(State(engine): State<AppState>) -> Json<DialerSnapshot> {
    Json(engine.snapshot())
}

/// Always acknowledged, whatever the payload or its effect.
async fn status_webhook(
    State(engine): State<AppState>,
    form: Result<Form<StatusForm>, FormRejection>,
) -> StatusCode {
    match form {
        Ok(Form(form)) => {
            let reduction = engine.handle_status(&form.into()).await;
            debug!(?reduction, "status webhook handled");
        }
        Err(rejection) => warn!(error = %rejection.body_text(), "unreadable status webhook"),
    }
    StatusCode::OK
}

async fn answer() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "text/xml")], ANSWER_DOCUMENT)
}

async fn ws(State(engine): State<AppState>, upgrade: WebSocketUpgrade) -> impl IntoResponse {
    let updates = engine.subscribe();
    upgrade.on_upgrade(move |socket| stream_state(socket, updates))
}

/// Send the current snapshot, then every change until either side goes away.
async fn stream_state(mut socket: WebSocket, mut updates: watch::Receiver<DialerSnapshot>) {
    loop {
        let snapshot = updates.borrow_and_update().clone();
        if send_snapshot(&mut socket, &snapshot).await.is_err() {
            return;
        }

        loop {
            tokio::select! {
                changed = updates.changed() => match changed {
                    Ok(()) => break,
                    Err(_) => return,
                },
                incoming = socket.recv() => match incoming {
                    None | Some(Err(_)) | Some(Ok(Message::Close(_))) => return,
                    // observers are read-only
                    Some(Ok(_)) => {}
                },
            }
        }
    }
}

async fn send_snapshot(socket: &mut WebSocket, snapshot: &DialerSnapshot) -> Result<(), ()> {
    let text = serde_json::to_string(snapshot).map_err(|err| {
        warn!(error = %err, "failed to encode snapshot");
    })?;
    socket.send(Message::Text(text)).await.map_err(|err| {
        debug!(error = %err, "observer went away");
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use dialer_core::{DialerBuilder, DialerConfig};
    use dialer_core::impls::{MemoryEventSink, RecordingTelephony, StaticTargetSource};
    use futures::StreamExt;
    use serde_json::{Value, json};
    use std::time::Duration;
    use tempfile::TempDir;
    use tokio::net::{TcpListener, TcpStream};
    use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
    use tower::ServiceExt;

    type Observer = WebSocketStream<MaybeTlsStream<TcpStream>>;

    struct TestApp {
        engine: Arc<DialerEngine>,
        telephony: Arc<RecordingTelephony>,
        public: TempDir,
    }

    fn app(phones: &[&str]) -> TestApp {
        let telephony = Arc::new(RecordingTelephony::new());
        let engine = DialerBuilder::new()
            .telephony(telephony.clone())
            .target_source(Arc::new(StaticTargetSource::from_phones(phones.iter().copied())))
            .event_sink(Arc::new(MemoryEventSink::new()))
            .config(DialerConfig::from_base_url("+15559999", "https://dialer.test"))
            .build()
            .unwrap();
        let public = tempfile::tempdir().unwrap();
        std::fs::write(public.path().join("index.html"), "<h1>Dialer</h1>").unwrap();
        TestApp {
            engine: Arc::new(engine),
            telephony,
            public,
        }
    }

    impl TestApp {
        fn router(&self) -> Router {
            router(self.engine.clone(), self.public.path())
        }

        async fn call(&self, request: Request<Body>) -> (StatusCode, Vec<u8>) {
            let response = self.router().oneshot(request).await.unwrap();
            let status = response.status();
            let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
            (status, body.to_vec())
        }

        async fn post_json(&self, uri: &str, body: Value) -> Value {
            let request = Request::post(uri)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap();
            let (status, body) = self.call(request).await;
            assert_eq!(status, StatusCode::OK);
            serde_json::from_slice(&body).unwrap()
        }

        async fn get_state(&self) -> Value {
            let (_, body) = self
                .call(Request::get("/api/state").body(Body::empty()).unwrap())
                .await;
            serde_json::from_slice(&body).unwrap()
        }

        /// Serve the router on an ephemeral port and connect one observer.
        async fn observe(&self) -> Observer {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            let addr = listener.local_addr().unwrap();
            let router = self.router();
            tokio::spawn(async move { axum::serve(listener, router).await });
            let (socket, _) = connect_async(format!("ws://{addr}/ws")).await.unwrap();
            socket
        }

        async fn webhook(&self, form: &str) -> StatusCode {
            let request = Request::post("/webhooks/status")
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from(form.to_string()))
                .unwrap();
            self.call(request).await.0
        }
    }

    #[tokio::test]
    async fn start_then_state() {
        let app = app(&["+15550001", "+15550002"]);
        let response = app.post_json("/api/start", json!({})).await;
        assert_eq!(response, json!({"success": true, "status": "Started"}));

        let state = app.get_state().await;
        assert_eq!(
            state,
            json!({
                "currentTarget": "+15550001",
                "index": 0,
                "calling": true,
                "autoNext": true,
                "remaining": 2
            })
        );
    }

    #[tokio::test]
    async fn start_from_out_of_range_fails() {
        let app = app(&["+15550001"]);
        let response = app.post_json("/api/start-from", json!({"index": -1})).await;
        assert_eq!(response["success"], false);

        let response = app.post_json("/api/start-from", json!({"index": "zero"})).await;
        assert_eq!(response["success"], false);
        assert!(app.telephony.placed().is_empty());
    }

    #[tokio::test]
    async fn malformed_auto_next_payload_changes_nothing() {
        let app = app(&["+15550001"]);
        let response = app.post_json("/api/auto-next", json!({"enabled": "yes"})).await;
        assert_eq!(response["success"], false);
        assert_eq!(app.get_state().await["autoNext"], true);

        let response = app.post_json("/api/auto-next", json!({"enabled": false})).await;
        assert_eq!(response, json!({"success": true, "status": "AutoNext OFF"}));
        assert_eq!(app.get_state().await["autoNext"], false);
    }

    #[tokio::test]
    async fn next_reports_target_or_exhaustion() {
        let app = app(&["+15550001", "+15550002"]);
        let response = app.post_json("/api/next", json!({})).await;
        assert_eq!(response, json!({"success": false, "status": "Not running"}));

        app.post_json("/api/start", json!({})).await;
        let response = app.post_json("/api/next", json!({})).await;
        assert_eq!(response["success"], true);
        assert_eq!(response["currentTarget"], "+15550002");

        let response = app.post_json("/api/next", json!({})).await;
        assert_eq!(response, json!({"success": false, "status": "No more numbers"}));
        assert_eq!(app.get_state().await["calling"], false);
    }

    #[tokio::test]
    async fn webhook_advances_and_always_acknowledges() {
        let app = app(&["+15550001", "+15550002"]);
        app.post_json("/api/start", json!({})).await;
        let call_id = app.telephony.last_call_id().unwrap();

        let status = app
            .webhook(&format!("CallSid={call_id}&CallStatus=ringing&Direction=outbound-api"))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(app.get_state().await["index"], 0);

        let status = app
            .webhook(&format!("CallSid={call_id}&CallStatus=completed&Direction=outbound-api"))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(app.get_state().await["index"], 1);

        assert_eq!(app.webhook("garbage=1").await, StatusCode::OK);
        assert_eq!(app.get_state().await["index"], 1);
    }

    #[tokio::test]
    async fn stop_and_reset() {
        let app = app(&["+15550001", "+15550002"]);
        app.post_json("/api/start", json!({})).await;

        let response = app.post_json("/api/stop", json!({})).await;
        assert_eq!(response, json!({"success": true, "status": "Stopped"}));
        assert_eq!(app.telephony.hung_up().len(), 1);

        let response = app.post_json("/api/reset", json!({})).await;
        assert_eq!(response, json!({"success": true, "status": "State reset"}));
        let state = app.get_state().await;
        assert_eq!(state["index"], 0);
        assert_eq!(state["calling"], false);
    }

    #[tokio::test]
    async fn answer_document_is_xml() {
        let app = app(&[]);
        let request = Request::post("/twiml/outbound?type=autodialer")
            .body(Body::empty())
            .unwrap();
        let response = app.router().oneshot(request).await.unwrap();
        assert_eq!(response.headers()[header::CONTENT_TYPE], "text/xml");
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert!(String::from_utf8_lossy(&body).contains("<Say>Connecting your call.</Say>"));
    }

    async fn next_snapshot(socket: &mut Observer) -> Value {
        loop {
            let message = tokio::time::timeout(Duration::from_secs(5), socket.next())
                .await
                .expect("no snapshot within 5s")
                .unwrap()
                .unwrap();
            if message.is_text() {
                return serde_json::from_str(message.to_text().unwrap()).unwrap();
            }
        }
    }

    /// Later snapshots may coalesce, so read until one matches.
    async fn snapshot_where(socket: &mut Observer, matches: impl Fn(&Value) -> bool) -> Value {
        loop {
            let snapshot = next_snapshot(socket).await;
            if matches(&snapshot) {
                return snapshot;
            }
        }
    }

    #[tokio::test]
    async fn observer_gets_snapshot_on_connect_then_changes() {
        let app = app(&["+15550001", "+15550002"]);
        let mut socket = app.observe().await;

        let first = next_snapshot(&mut socket).await;
        assert_eq!(
            first,
            json!({
                "currentTarget": null,
                "index": 0,
                "calling": false,
                "autoNext": true,
                "remaining": 0
            })
        );

        app.engine.start().await.unwrap();
        let started = snapshot_where(&mut socket, |s| s["calling"] == true).await;
        assert_eq!(started["currentTarget"], "+15550001");

        let call_id = app.telephony.last_call_id().unwrap();
        app.webhook(&format!("CallSid={call_id}&CallStatus=completed")).await;
        let advanced = snapshot_where(&mut socket, |s| s["index"] == 1).await;
        assert_eq!(advanced["currentTarget"], "+15550002");
        assert_eq!(advanced["remaining"], 1);
    }

    #[tokio::test]
    async fn late_observer_starts_from_current_state() {
        let app = app(&["+15550001", "+15550002"]);
        app.engine.start().await.unwrap();
        app.engine.set_auto_next(false).await.unwrap();

        let mut socket = app.observe().await;
        let first = next_snapshot(&mut socket).await;
        assert_eq!(first["calling"], true);
        assert_eq!(first["autoNext"], false);
        assert_eq!(first["currentTarget"], "+15550001");
    }

    #[tokio::test]
    async fn panel_is_served_from_public_dir() {
        let app = app(&[]);
        let (status, body) = app
            .call(Request::get("/").body(Body::empty()).unwrap())
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, b"<h1>Dialer</h1>");

        let (status, _) = app
            .call(Request::get("/missing.js").body(Body::empty()).unwrap())
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn api_allows_cross_origin_callers() {
        let app = app(&[]);
        let request = Request::get("/api/state")
            .header(header::ORIGIN, "http://panel.test")
            .body(Body::empty())
            .unwrap();
        let response = app.router().oneshot(request).await.unwrap();
        assert_eq!(response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
    }
}
