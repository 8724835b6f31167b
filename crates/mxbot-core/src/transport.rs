//! Port for the remote messaging service plus the wire shapes the core consumes.

use std::{collections::BTreeMap, time::Duration};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{
    domain::{AccessToken, DeviceId, RoomId, SyncToken, UserId},
    Result,
};

/// Event type of a room message.
pub const MESSAGE_EVENT_TYPE: &str = "m.room.message";

/// Username/password pair used for both register and login.
#[derive(Clone, Debug)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

/// Successful register/login response.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct AuthResponse {
    pub user_id: UserId,
    pub access_token: AccessToken,
    #[serde(default)]
    pub device_id: Option<DeviceId>,
}

#[derive(Clone, Debug)]
pub struct CreateRoomRequest {
    pub name: String,
    pub topic: String,
}

/// One long-poll request.
#[derive(Clone, Debug)]
pub struct SyncRequest {
    pub since: Option<SyncToken>,
    /// Server-side wait before answering with an empty batch.
    pub timeout: Duration,
    /// Client-side ceiling for the whole request.
    pub request_timeout: Duration,
}

/// Raw result of one poll round.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct SyncResponse {
    pub next_batch: SyncToken,
    #[serde(default)]
    pub rooms: Rooms,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct Rooms {
    /// Sorted by room id so a batch is always walked in the same order.
    #[serde(default)]
    pub join: BTreeMap<RoomId, JoinedRoom>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct JoinedRoom {
    #[serde(default)]
    pub timeline: Timeline,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct Timeline {
    #[serde(default)]
    pub events: Vec<RawEvent>,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct RawEvent {
    /// Empty when the server omits `type`; such events are never routed.
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub sender: Option<UserId>,
    #[serde(default)]
    pub event_id: Option<String>,
    #[serde(default)]
    pub content: serde_json::Value,
}

impl RawEvent {
    /// `content.body` when the event carries a textual body.
    pub fn body(&self) -> Option<&str> {
        self.content.get("body").and_then(|b| b.as_str())
    }
}

/// Authenticated access to the homeserver.
///
/// Implemented over HTTP by `mxbot-matrix`; tests drive the core with an in-memory fake.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn register(&self, creds: &Credentials) -> Result<AuthResponse>;
    async fn login(&self, creds: &Credentials) -> Result<AuthResponse>;

    async fn set_display_name(
        &self,
        token: &AccessToken,
        user_id: &UserId,
        display_name: &str,
    ) -> Result<()>;

    async fn create_room(&self, token: &AccessToken, req: &CreateRoomRequest) -> Result<RoomId>;

    /// Send a plain-text message. Each call uses a fresh transaction id.
    async fn send_text(&self, token: &AccessToken, room_id: &RoomId, body: &str) -> Result<()>;

    async fn sync(&self, token: &AccessToken, req: &SyncRequest) -> Result<SyncResponse>;
}
