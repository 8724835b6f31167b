//! Startup wiring: authenticate, set up the profile, open the demo room, then sync.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::{
    config::Config,
    domain::RoomId,
    errors::AuthError,
    session::{self, Session},
    stats::BotState,
    sync::SyncLoop,
    transport::{CreateRoomRequest, Credentials, Transport},
};

pub const WELCOME_MESSAGE: &str = "🤖 Hello! I'm your Demo AI Assistant Bot!\n\n\
Type !help to see available commands, or just chat with me naturally!";

/// Authenticate and prepare a ready-to-run sync loop.
///
/// Only authentication can fail; profile and demo-room setup are best-effort.
pub async fn start(cfg: &Config, transport: Arc<dyn Transport>) -> Result<SyncLoop, AuthError> {
    let creds = Credentials {
        username: cfg.username.clone(),
        password: cfg.password.clone(),
    };

    let session = session::establish(transport.as_ref(), &creds).await?;
    session::setup_profile(transport.as_ref(), &session, &cfg.display_name).await;

    let state = BotState::new();
    let mut sync = SyncLoop::new(transport.clone(), cfg.sync_settings(), session, state);

    if cfg.create_demo_room {
        if let Some(room_id) = create_demo_room(cfg, transport.as_ref(), sync.session()).await {
            sync.note_room(room_id.clone(), Some(cfg.demo_room_name.clone()));
            sync.send(&room_id, WELCOME_MESSAGE).await;
            info!(room_id = %room_id, "demo room ready");
        }
    }

    Ok(sync)
}

async fn create_demo_room(
    cfg: &Config,
    transport: &dyn Transport,
    session: &Session,
) -> Option<RoomId> {
    let req = CreateRoomRequest {
        name: cfg.demo_room_name.clone(),
        topic: cfg.demo_room_topic.clone(),
    };
    match transport.create_room(session.access_token(), &req).await {
        Ok(room_id) => {
            info!(room_id = %room_id, "demo room created");
            Some(room_id)
        }
        Err(e) => {
            warn!(error = %e, "demo room creation failed (non-critical)");
            None
        }
    }
}

/// Start up and sync until `cancel` fires.
pub async fn run(
    cfg: &Config,
    transport: Arc<dyn Transport>,
    cancel: CancellationToken,
) -> Result<(), AuthError> {
    let mut sync = start(cfg, transport).await?;
    sync.run(cancel).await;

    let snap = sync.state().stats.snapshot();
    info!(
        messages_sent = snap.messages_sent,
        commands_processed = snap.commands_processed,
        rooms_joined = snap.rooms_joined,
        "bot shut down"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::USER_IN_USE;
    use crate::test_support::{auth, remote, FakeTransport};
    use std::collections::HashMap;

    fn cfg(create_demo_room: bool) -> Config {
        let mut env = HashMap::new();
        env.insert("MXBOT_CREATE_DEMO_ROOM", if create_demo_room { "1" } else { "0" });
        env.insert("MXBOT_REPLY_DELAY_MS", "0");
        env.insert("MXBOT_IDLE_DELAY_MS", "0");
        Config::from_lookup(|k| env.get(k).map(|v| v.to_string())).unwrap()
    }

    #[tokio::test]
    async fn start_creates_demo_room_and_greets() {
        let t = Arc::new(FakeTransport::new());
        t.push_register(Ok(auth("@demo_ai_bot:hs", "tok")));

        let sync = start(&cfg(true), t.clone()).await.unwrap();

        assert_eq!(t.created_rooms.lock().unwrap().as_slice(), ["AI Bot Demo Room"]);
        assert_eq!(t.sent_bodies(), vec![WELCOME_MESSAGE.to_string()]);
        let snap = sync.state().stats.snapshot();
        assert_eq!(snap.rooms_joined, 1);
        assert_eq!(snap.messages_sent, 1);
        assert_eq!(t.display_names.lock().unwrap().as_slice(), ["Demo AI Assistant 🤖"]);
    }

    #[tokio::test]
    async fn start_survives_profile_failure_and_skips_room_when_disabled() {
        let t = Arc::new(FakeTransport::new());
        t.push_register(Err(remote(400, USER_IN_USE)));
        t.push_login(Ok(auth("@demo_ai_bot:hs", "tok")));
        *t.display_name_error.lock().unwrap() = Some(remote(500, "M_UNKNOWN"));

        let sync = start(&cfg(false), t.clone()).await.unwrap();
        assert!(t.created_rooms.lock().unwrap().is_empty());
        assert!(t.sent_bodies().is_empty());
        assert_eq!(sync.session().access_token().as_str(), "tok");
    }

    #[tokio::test]
    async fn auth_failure_aborts_startup() {
        let t = Arc::new(FakeTransport::new());
        t.push_register(Err(remote(403, "M_FORBIDDEN")));

        let res = run(&cfg(true), t.clone(), CancellationToken::new()).await;
        assert!(matches!(res, Err(AuthError::Registration(_))));
        assert!(t.sync_sinces.lock().unwrap().is_empty());
    }
}
