//! Session establishment (register, falling back to login) and the sync cursor.

use tracing::{info, warn};

use crate::{
    domain::{AccessToken, DeviceId, SyncToken, UserId},
    errors::AuthError,
    transport::{AuthResponse, Credentials, Transport},
};

/// Homeserver error code for "this username is taken".
pub const USER_IN_USE: &str = "M_USER_IN_USE";

/// Authenticated identity plus the position in the event stream.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Session {
    user_id: UserId,
    access_token: AccessToken,
    device_id: Option<DeviceId>,
    cursor: Option<SyncToken>,
}

impl Session {
    pub fn new(user_id: UserId, access_token: AccessToken, device_id: Option<DeviceId>) -> Self {
        Self {
            user_id,
            access_token,
            device_id,
            cursor: None,
        }
    }

    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    pub fn access_token(&self) -> &AccessToken {
        &self.access_token
    }

    pub fn device_id(&self) -> Option<&DeviceId> {
        self.device_id.as_ref()
    }

    pub fn cursor(&self) -> Option<&SyncToken> {
        self.cursor.as_ref()
    }

    /// Move the cursor to the token returned by the last successful poll.
    pub fn advance_cursor(&mut self, next: SyncToken) {
        self.cursor = Some(next);
    }

    /// Forget the cursor; the next poll starts from the server's initial state.
    pub fn reset_cursor(&mut self) {
        self.cursor = None;
    }
}

impl From<AuthResponse> for Session {
    fn from(r: AuthResponse) -> Self {
        Session::new(r.user_id, r.access_token, r.device_id)
    }
}

/// Register the bot account, or log in if it already exists.
///
/// No retries: any failure here is fatal for startup.
pub async fn establish(
    transport: &dyn Transport,
    creds: &Credentials,
) -> Result<Session, AuthError> {
    let session: Session = match transport.register(creds).await {
        Ok(resp) => {
            info!(user_id = %resp.user_id, "bot registered");
            resp.into()
        }
        Err(e) if e.errcode() == Some(USER_IN_USE) => {
            info!(username = %creds.username, "bot user already exists, logging in");
            let resp = transport.login(creds).await.map_err(AuthError::Login)?;
            info!(user_id = %resp.user_id, "bot logged in");
            resp.into()
        }
        Err(e) => return Err(AuthError::Registration(e)),
    };

    info!(
        user_id = %session.user_id(),
        device_id = session.device_id().map(|d| d.0.as_str()).unwrap_or("-"),
        "session established"
    );
    Ok(session)
}

/// Set the display name. Failure is logged and otherwise ignored.
pub async fn setup_profile(transport: &dyn Transport, session: &Session, display_name: &str) {
    match transport
        .set_display_name(session.access_token(), session.user_id(), display_name)
        .await
    {
        Ok(()) => info!(display_name, "bot profile configured"),
        Err(e) => warn!(error = %e, "profile setup failed (non-critical)"),
    }
}
