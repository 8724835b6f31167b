//! Matrix client-server adapter (reqwest).
//!
//! Implements the `mxbot-core` [`Transport`] port against the homeserver's `r0`
//! endpoints: register/login, profile, room creation, message send and `/sync`.

use std::{
    sync::atomic::{AtomicU64, Ordering},
    time::{Duration, SystemTime, UNIX_EPOCH},
};

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Response, Url};
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::json;
use tracing::debug;

use mxbot_core::{
    domain::{AccessToken, RoomId, UserId},
    errors::Error,
    transport::{
        AuthResponse, CreateRoomRequest, Credentials, SyncRequest, SyncResponse, Transport,
        MESSAGE_EVENT_TYPE,
    },
    Result,
};

/// Timeout for every call except `/sync`, which carries its own.
const API_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug)]
pub struct MatrixClient {
    base: Url,
    http: reqwest::Client,
    txn_counter: AtomicU64,
}

#[derive(Deserialize)]
struct ErrorBody {
    errcode: Option<String>,
    error: Option<String>,
}

#[derive(Deserialize)]
struct CreateRoomResponse {
    room_id: RoomId,
}

#[derive(Deserialize)]
struct SendResponse {
    #[serde(default)]
    event_id: Option<String>,
}

impl MatrixClient {
    pub fn new(homeserver_url: &str) -> Result<Self> {
        let base = Url::parse(homeserver_url)
            .map_err(|e| Error::Config(format!("invalid homeserver url {homeserver_url:?}: {e}")))?;
        if base.cannot_be_a_base() {
            return Err(Error::Config(format!(
                "homeserver url {homeserver_url:?} cannot carry a path"
            )));
        }

        let http = reqwest::Client::builder()
            .user_agent(concat!("mxbot/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::Config(format!("http client build failed: {e}")))?;

        Ok(Self {
            base,
            http,
            txn_counter: AtomicU64::new(0),
        })
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| Error::Config("homeserver url cannot carry a path".to_string()))?
            .pop_if_empty()
            .extend(["_matrix", "client", "r0"])
            .extend(segments);
        Ok(url)
    }

    fn request(&self, method: Method, url: Url, token: Option<&AccessToken>) -> RequestBuilder {
        let req = self.http.request(method, url).timeout(API_TIMEOUT);
        match token {
            Some(t) => req.bearer_auth(t.as_str()),
            None => req,
        }
    }

    /// Unique per process: wall-clock millis plus a counter.
    fn next_txn_id(&self) -> String {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis();
        let n = self.txn_counter.fetch_add(1, Ordering::Relaxed);
        format!("mxbot_{millis}_{n}")
    }
}

fn map_http_err(e: reqwest::Error) -> Error {
    if e.is_timeout() {
        Error::Timeout
    } else {
        Error::Transport(e.to_string())
    }
}

fn remote_error(status: u16, body: &str) -> Error {
    let parsed: Option<ErrorBody> = serde_json::from_str(body).ok();
    let (errcode, message) = match parsed {
        Some(b) => (b.errcode, b.error.unwrap_or_default()),
        None => (None, body.chars().take(200).collect()),
    };
    Error::Remote {
        status,
        errcode,
        message,
    }
}

async fn decode<T: DeserializeOwned>(resp: Response) -> Result<T> {
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(remote_error(status.as_u16(), &body));
    }

    resp.json::<T>().await.map_err(|e| {
        if e.is_timeout() {
            Error::Timeout
        } else {
            Error::Protocol(format!("unexpected response body: {e}"))
        }
    })
}

#[async_trait]
impl Transport for MatrixClient {
    async fn register(&self, creds: &Credentials) -> Result<AuthResponse> {
        let url = self.endpoint(&["register"])?;
        debug!(username = %creds.username, "registering");
        let resp = self
            .request(Method::POST, url, None)
            .json(&json!({
                "username": creds.username,
                "password": creds.password,
                "auth": { "type": "m.login.dummy" },
            }))
            .send()
            .await
            .map_err(map_http_err)?;
        decode(resp).await
    }

    async fn login(&self, creds: &Credentials) -> Result<AuthResponse> {
        let url = self.endpoint(&["login"])?;
        debug!(username = %creds.username, "logging in");
        let resp = self
            .request(Method::POST, url, None)
            .json(&json!({
                "type": "m.login.password",
                "identifier": { "type": "m.id.user", "user": creds.username },
                "user": creds.username,
                "password": creds.password,
            }))
            .send()
            .await
            .map_err(map_http_err)?;
        decode(resp).await
    }

    async fn set_display_name(
        &self,
        token: &AccessToken,
        user_id: &UserId,
        display_name: &str,
    ) -> Result<()> {
        let url = self.endpoint(&["profile", &user_id.0, "displayname"])?;
        let resp = self
            .request(Method::PUT, url, Some(token))
            .json(&json!({ "displayname": display_name }))
            .send()
            .await
            .map_err(map_http_err)?;
        decode::<serde_json::Value>(resp).await?;
        Ok(())
    }

    async fn create_room(&self, token: &AccessToken, req: &CreateRoomRequest) -> Result<RoomId> {
        let url = self.endpoint(&["createRoom"])?;
        let resp = self
            .request(Method::POST, url, Some(token))
            .json(&json!({
                "name": req.name,
                "topic": req.topic,
                "preset": "public_chat",
            }))
            .send()
            .await
            .map_err(map_http_err)?;
        let created: CreateRoomResponse = decode(resp).await?;
        Ok(created.room_id)
    }

    async fn send_text(&self, token: &AccessToken, room_id: &RoomId, body: &str) -> Result<()> {
        let txn_id = self.next_txn_id();
        let url = self.endpoint(&["rooms", &room_id.0, "send", MESSAGE_EVENT_TYPE, &txn_id])?;
        let resp = self
            .request(Method::PUT, url, Some(token))
            .json(&json!({ "msgtype": "m.text", "body": body }))
            .send()
            .await
            .map_err(map_http_err)?;
        let sent: SendResponse = decode(resp).await?;
        debug!(room_id = %room_id, txn_id, event_id = ?sent.event_id, "sent");
        Ok(())
    }

    async fn sync(&self, token: &AccessToken, req: &SyncRequest) -> Result<SyncResponse> {
        let url = self.endpoint(&["sync"])?;
        let mut query = vec![("timeout", req.timeout.as_millis().to_string())];
        if let Some(since) = &req.since {
            query.push(("since", since.as_str().to_string()));
        }

        let resp = self
            .request(Method::GET, url, Some(token))
            .query(&query)
            .timeout(req.request_timeout)
            .send()
            .await
            .map_err(map_http_err)?;
        decode(resp).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoints_keep_base_path_and_encode_segments() {
        let c = MatrixClient::new("https://hs.example.org/prefix/").unwrap();
        let url = c
            .endpoint(&["rooms", "!abc:hs", "send", "m.room.message", "t 1"])
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://hs.example.org/prefix/_matrix/client/r0/rooms/!abc:hs/send/m.room.message/t%201"
        );

        let c = MatrixClient::new("http://localhost:6167").unwrap();
        assert_eq!(
            c.endpoint(&["sync"]).unwrap().as_str(),
            "http://localhost:6167/_matrix/client/r0/sync"
        );
    }

    #[test]
    fn rejects_unusable_urls() {
        assert!(matches!(MatrixClient::new("not a url"), Err(Error::Config(_))));
        assert!(matches!(
            MatrixClient::new("mailto:bot@example.org"),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn txn_ids_are_unique() {
        let c = MatrixClient::new("http://localhost:6167").unwrap();
        let a = c.next_txn_id();
        let b = c.next_txn_id();
        assert_ne!(a, b);
        assert!(a.starts_with("mxbot_"));
    }

    #[test]
    fn remote_errors_parse_matrix_body() {
        let e = remote_error(400, r#"{"errcode":"M_USER_IN_USE","error":"taken"}"#);
        assert_eq!(e.errcode(), Some("M_USER_IN_USE"));

        let e = remote_error(502, "<html>bad gateway</html>");
        assert!(matches!(
            e,
            Error::Remote { status: 502, errcode: None, ref message } if message.contains("bad gateway")
        ));
    }
}
