/// Core error type for the bot.
///
/// The transport adapter maps its HTTP failures into this type so the sync loop can
/// tell an expected long-poll timeout apart from a degraded backend.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("request timed out")]
    Timeout,

    #[error("remote error {status}: {}: {message}", .errcode.as_deref().unwrap_or("UNKNOWN"))]
    Remote {
        status: u16,
        errcode: Option<String>,
        message: String,
    },

    #[error("protocol error: {0}")]
    Protocol(String),
}

impl Error {
    /// Matrix error code reported by the homeserver, if any.
    pub fn errcode(&self) -> Option<&str> {
        match self {
            Error::Remote { errcode, .. } => errcode.as_deref(),
            _ => None,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::Timeout)
    }
}

/// Startup authentication failure. Never retried.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("registration failed: {0}")]
    Registration(#[source] Error),

    #[error("login failed: {0}")]
    Login(#[source] Error),
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remote_error_renders_errcode() {
        let e = Error::Remote {
            status: 400,
            errcode: Some("M_USER_IN_USE".to_string()),
            message: "User ID already taken.".to_string(),
        };
        assert_eq!(e.errcode(), Some("M_USER_IN_USE"));
        assert_eq!(
            e.to_string(),
            "remote error 400: M_USER_IN_USE: User ID already taken."
        );
    }

    #[test]
    fn non_remote_errors_have_no_errcode() {
        assert_eq!(Error::Timeout.errcode(), None);
        assert!(Error::Timeout.is_timeout());
        assert!(!Error::Transport("x".into()).is_timeout());
    }
}
