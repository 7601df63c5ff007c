//! In-process leaderboard server for integration tests
//!
//! Serves the REST endpoints and a minimal Socket.IO endpoint over both
//! WebSocket and long-polling.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Path, Query, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};
use tokio::sync::mpsc;

use podium::RankedEntity;

const OPEN_PACKET: &str =
    r#"0{"sid":"test-sid","upgrades":[],"pingInterval":25000,"pingTimeout":20000,"maxPayload":1000000}"#;

/// Polling session queue: sender for the server, receiver for GET requests
type PollQueue = (
    mpsc::UnboundedSender<String>,
    Arc<tokio::sync::Mutex<mpsc::UnboundedReceiver<String>>>,
);

#[derive(Clone)]
pub struct MockServer {
    teams: Arc<Vec<RankedEntity>>,
    members: Arc<HashMap<String, Vec<RankedEntity>>>,
    requests: Arc<Mutex<Vec<Value>>>,
    polling: Arc<Mutex<Option<PollQueue>>>,
    broken_teams: bool,
    websocket: bool,
}

impl MockServer {
    pub fn new() -> Self {
        let mut members = HashMap::new();
        members.insert(
            "a".to_string(),
            vec![
                RankedEntity::new("u1", "Ada", 1200),
                RankedEntity::new("u2", "Brian", 800),
            ],
        );
        members.insert(
            "b".to_string(),
            vec![RankedEntity::new("u3", "Cleo", 50)],
        );

        Self {
            teams: Arc::new(vec![
                RankedEntity::new("a", "Alpha", 10),
                RankedEntity::new("b", "Beta", 20),
            ]),
            members: Arc::new(members),
            requests: Arc::new(Mutex::new(Vec::new())),
            polling: Arc::new(Mutex::new(None)),
            broken_teams: false,
            websocket: true,
        }
    }

    /// Serve a non-JSON body from `/api/teams`
    pub fn with_broken_teams(mut self) -> Self {
        self.broken_teams = true;
        self
    }

    /// Refuse WebSocket upgrades so clients must poll
    pub fn without_websocket(mut self) -> Self {
        self.websocket = false;
        self
    }

    /// `request_leaderboard` payloads received so far
    pub fn requests(&self) -> Vec<Value> {
        self.requests.lock().unwrap().clone()
    }

    pub async fn wait_for_requests(&self, count: usize) -> Vec<Value> {
        for _ in 0..400 {
            let requests = self.requests();
            if requests.len() >= count {
                return requests;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        self.requests()
    }

    fn ranking_for(&self, team_id: Option<&str>) -> Vec<RankedEntity> {
        match team_id {
            Some(id) => self.members.get(id).cloned().unwrap_or_default(),
            None => {
                let mut teams = self.teams.as_ref().clone();
                teams.sort_by(|a, b| b.score.cmp(&a.score));
                teams
            }
        }
    }

    /// Engine.IO packets to send back for one inbound packet
    fn respond(&self, packet: &str) -> Vec<String> {
        if packet == "40" {
            return vec![
                r#"40{"sid":"socket-1"}"#.to_string(),
                format!(
                    "42{}",
                    json!(["connection_response", {"data": "Connected to leaderboard"}])
                ),
            ];
        }

        let Some(body) = packet.strip_prefix("42") else {
            return Vec::new();
        };
        let Ok(Value::Array(parts)) = serde_json::from_str::<Value>(body) else {
            return Vec::new();
        };
        if parts.first().and_then(Value::as_str) != Some("request_leaderboard") {
            return Vec::new();
        }

        let payload = parts.get(1).cloned().unwrap_or(Value::Null);
        self.requests.lock().unwrap().push(payload.clone());

        let team_id = payload.get("team_id").and_then(Value::as_str);
        let update = json!(["leaderboard_update", {"leaderboard": self.ranking_for(team_id)}]);
        vec![format!("42{}", update)]
    }

    pub async fn spawn(self) -> String {
        let app = Router::new()
            .route("/api/teams", get(list_teams))
            .route("/api/teams/:id", get(get_team))
            .route("/api/leaderboard", get(leaderboard))
            .route("/socket.io/", get(socket_get).post(socket_post))
            .with_state(self);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        format!("http://{}", addr)
    }
}

async fn list_teams(State(server): State<MockServer>) -> Response {
    if server.broken_teams {
        return (StatusCode::OK, "<html>oops</html>").into_response();
    }
    Json(server.teams.as_ref().clone()).into_response()
}

async fn get_team(State(server): State<MockServer>, Path(id): Path<String>) -> Response {
    match server.teams.iter().find(|t| t.id == id) {
        Some(team) => Json(team.clone()).into_response(),
        None => (StatusCode::NOT_FOUND, "team not found").into_response(),
    }
}

async fn leaderboard(
    State(server): State<MockServer>,
    Query(params): Query<HashMap<String, String>>,
) -> Json<Vec<RankedEntity>> {
    Json(server.ranking_for(params.get("team_id").map(String::as_str)))
}

async fn socket_get(
    State(server): State<MockServer>,
    Query(params): Query<HashMap<String, String>>,
    ws: Option<WebSocketUpgrade>,
) -> Response {
    if params.get("transport").map(String::as_str) == Some("websocket") {
        return match ws.filter(|_| server.websocket) {
            Some(ws) => ws.on_upgrade(move |socket| handle_socket(socket, server)),
            None => (StatusCode::BAD_REQUEST, "expected websocket upgrade").into_response(),
        };
    }

    match params.get("sid") {
        None => {
            let (tx, rx) = mpsc::unbounded_channel();
            *server.polling.lock().unwrap() = Some((tx, Arc::new(tokio::sync::Mutex::new(rx))));
            OPEN_PACKET.to_string().into_response()
        }
        Some(_) => {
            let queue = server.polling.lock().unwrap().as_ref().map(|(_, rx)| Arc::clone(rx));
            let Some(queue) = queue else {
                return (StatusCode::BAD_REQUEST, "unknown sid").into_response();
            };

            let mut rx = queue.lock().await;
            let first = tokio::time::timeout(Duration::from_secs(5), rx.recv()).await;
            let mut packets = match first {
                Ok(Some(packet)) => vec![packet],
                Ok(None) => vec!["1".to_string()],
                Err(_) => vec!["6".to_string()],
            };
            while let Ok(packet) = rx.try_recv() {
                packets.push(packet);
            }
            packets.join("\u{1e}").into_response()
        }
    }
}

async fn socket_post(State(server): State<MockServer>, body: String) -> StatusCode {
    let sender = server.polling.lock().unwrap().as_ref().map(|(tx, _)| tx.clone());
    let Some(sender) = sender else {
        return StatusCode::BAD_REQUEST;
    };

    for packet in body.split('\u{1e}') {
        for reply in server.respond(packet) {
            let _ = sender.send(reply);
        }
    }
    StatusCode::OK
}

async fn handle_socket(mut socket: WebSocket, server: MockServer) {
    if socket.send(Message::Text(OPEN_PACKET.to_string())).await.is_err() {
        return;
    }

    while let Some(Ok(message)) = socket.recv().await {
        let Message::Text(text) = message else {
            continue;
        };
        if text == "41" {
            break;
        }
        for reply in server.respond(&text) {
            if socket.send(Message::Text(reply)).await.is_err() {
                return;
            }
        }
    }
}
