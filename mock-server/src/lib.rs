use std::time::Duration;

use axum::{
    body::Bytes,
    extract::Path,
    http::{Method, StatusCode},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;

/// Longest delay `/delay/{ms}` will honor.
pub const MAX_DELAY_MS: u64 = 30_000;

/// What `POST /echo` saw.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct EchoReply {
    pub method: String,
    pub length: usize,
    pub body: String,
}

pub fn app() -> Router {
    Router::new()
        .route("/", get(hello))
        .route("/status/{code}", get(status))
        .route("/delay/{ms}", get(delay))
        .route("/echo", post(echo))
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

async fn hello() -> &'static str {
    "hello"
}

async fn status(Path(code): Path<u16>) -> (StatusCode, String) {
    match StatusCode::from_u16(code) {
        Ok(status) => (status, format!("status {code}")),
        Err(_) => (StatusCode::BAD_REQUEST, format!("invalid status {code}")),
    }
}

async fn delay(Path(ms): Path<u64>) -> String {
    let ms = ms.min(MAX_DELAY_MS);
    tokio::time::sleep(Duration::from_millis(ms)).await;
    format!("waited {ms}ms")
}

async fn echo(method: Method, body: Bytes) -> Json<EchoReply> {
    Json(EchoReply {
        method: method.to_string(),
        length: body.len(),
        body: String::from_utf8_lossy(&body).into_owned(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn echo_reply_serializes_to_json() {
        let reply = EchoReply {
            method: "POST".to_string(),
            length: 2,
            body: "hi".to_string(),
        };
        let json = serde_json::to_value(&reply).unwrap();
        assert_eq!(json["method"], "POST");
        assert_eq!(json["length"], 2);
        assert_eq!(json["body"], "hi");
    }

    #[test]
    fn echo_reply_roundtrips_through_json() {
        let reply = EchoReply {
            method: "POST".to_string(),
            length: 0,
            body: String::new(),
        };
        let json = serde_json::to_string(&reply).unwrap();
        let back: EchoReply = serde_json::from_str(&json).unwrap();
        assert_eq!(back, reply);
    }

    #[test]
    fn echo_reply_rejects_missing_fields() {
        let result: Result<EchoReply, _> = serde_json::from_str(r#"{"method":"POST"}"#);
        assert!(result.is_err());
    }
}
