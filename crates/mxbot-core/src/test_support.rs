//! In-memory `Transport` used by the core's unit tests.

use std::{collections::VecDeque, sync::Mutex};

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::{
    domain::{AccessToken, DeviceId, RoomId, SyncToken, UserId},
    errors::Error,
    transport::{
        AuthResponse, CreateRoomRequest, Credentials, JoinedRoom, RawEvent, SyncRequest,
        SyncResponse, Timeline, Transport,
    },
    Result,
};

pub fn auth(user: &str, token: &str) -> AuthResponse {
    AuthResponse {
        user_id: UserId(user.to_string()),
        access_token: AccessToken(token.to_string()),
        device_id: Some(DeviceId("DEV1".to_string())),
    }
}

pub fn remote(status: u16, errcode: &str) -> Error {
    Error::Remote {
        status,
        errcode: Some(errcode.to_string()),
        message: errcode.to_string(),
    }
}

pub fn text_event(sender: &str, body: &str) -> RawEvent {
    RawEvent {
        kind: "m.room.message".to_string(),
        sender: Some(UserId(sender.to_string())),
        event_id: None,
        content: serde_json::json!({ "msgtype": "m.text", "body": body }),
    }
}

pub fn batch(next: &str, rooms: Vec<(&str, Vec<RawEvent>)>) -> SyncResponse {
    let mut resp = SyncResponse {
        next_batch: SyncToken(next.to_string()),
        ..Default::default()
    };
    for (room, events) in rooms {
        resp.rooms.join.insert(
            RoomId(room.to_string()),
            JoinedRoom {
                timeline: Timeline { events },
            },
        );
    }
    resp
}

#[derive(Default)]
pub struct FakeTransport {
    pub register_results: Mutex<VecDeque<Result<AuthResponse>>>,
    pub login_results: Mutex<VecDeque<Result<AuthResponse>>>,
    pub sync_results: Mutex<VecDeque<Result<SyncResponse>>>,
    pub display_name_error: Mutex<Option<Error>>,
    pub fail_sends: Mutex<bool>,
    /// Cancelled once the scripted sync results run out.
    pub cancel_when_drained: Mutex<Option<CancellationToken>>,

    pub register_calls: Mutex<usize>,
    pub login_calls: Mutex<usize>,
    pub display_names: Mutex<Vec<String>>,
    pub sync_sinces: Mutex<Vec<Option<SyncToken>>>,
    pub sends: Mutex<Vec<(RoomId, String)>>,
    pub created_rooms: Mutex<Vec<String>>,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_register(&self, r: Result<AuthResponse>) {
        self.register_results.lock().unwrap().push_back(r);
    }

    pub fn push_login(&self, r: Result<AuthResponse>) {
        self.login_results.lock().unwrap().push_back(r);
    }

    pub fn push_sync(&self, r: Result<SyncResponse>) {
        self.sync_results.lock().unwrap().push_back(r);
    }

    pub fn sent_bodies(&self) -> Vec<String> {
        self.sends
            .lock()
            .unwrap()
            .iter()
            .map(|(_, body)| body.clone())
            .collect()
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn register(&self, _creds: &Credentials) -> Result<AuthResponse> {
        *self.register_calls.lock().unwrap() += 1;
        self.register_results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(Error::Transport("no scripted register".into())))
    }

    async fn login(&self, _creds: &Credentials) -> Result<AuthResponse> {
        *self.login_calls.lock().unwrap() += 1;
        self.login_results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(Error::Transport("no scripted login".into())))
    }

    async fn set_display_name(
        &self,
        _token: &AccessToken,
        _user_id: &UserId,
        display_name: &str,
    ) -> Result<()> {
        self.display_names
            .lock()
            .unwrap()
            .push(display_name.to_string());
        match self.display_name_error.lock().unwrap().take() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    async fn create_room(&self, _token: &AccessToken, req: &CreateRoomRequest) -> Result<RoomId> {
        let mut rooms = self.created_rooms.lock().unwrap();
        rooms.push(req.name.clone());
        Ok(RoomId(format!("!demo{}:hs", rooms.len())))
    }

    async fn send_text(&self, _token: &AccessToken, room_id: &RoomId, body: &str) -> Result<()> {
        if *self.fail_sends.lock().unwrap() {
            return Err(Error::Transport("send refused".into()));
        }
        self.sends
            .lock()
            .unwrap()
            .push((room_id.clone(), body.to_string()));
        Ok(())
    }

    async fn sync(&self, _token: &AccessToken, req: &SyncRequest) -> Result<SyncResponse> {
        self.sync_sinces.lock().unwrap().push(req.since.clone());
        let next = self.sync_results.lock().unwrap().pop_front();
        match next {
            Some(r) => r,
            None => {
                if let Some(cancel) = self.cancel_when_drained.lock().unwrap().as_ref() {
                    cancel.cancel();
                }
                Err(Error::Timeout)
            }
        }
    }
}
