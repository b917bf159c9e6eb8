//! Convenience gate in front of the moderation routes.
//!
//! The credential only flips a flag on the caller's session; it is checked here on the server,
//! but the session id itself is a bearer value held by the browser.

use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    dto::session::SessionResponse,
    error::ServiceError,
    services::session_service,
    state::{SharedState, session::SessionIdentity},
};

/// Flip the admin flag of `session_id` when `password` matches the configured credential.
pub async fn login(
    state: &SharedState,
    session_id: Uuid,
    password: &str,
) -> Result<SessionResponse, ServiceError> {
    let Some(expected) = state.config().admin_password() else {
        warn!(session = %session_id, "admin login attempted but no credential is configured");
        return Err(ServiceError::Unauthorized("admin login is disabled".into()));
    };
    state.require_session(session_id)?;

    if password != expected {
        warn!(session = %session_id, "rejected admin credential");
        return Err(ServiceError::Unauthorized("Incorrect password".into()));
    }

    let identity = state
        .sessions()
        .update(session_id, |identity| identity.is_admin = true)
        .await
        .ok_or_else(|| ServiceError::Unauthorized(format!("unknown session `{session_id}`")))?;
    info!(session = %session_id, "admin mode enabled");
    Ok(session_service::view(state, session_id, identity).await)
}

/// Clear the admin flag of `session_id`.
pub async fn logout(state: &SharedState, session_id: Uuid) -> Result<SessionResponse, ServiceError> {
    let identity = state
        .sessions()
        .update(session_id, |identity| identity.is_admin = false)
        .await
        .ok_or_else(|| ServiceError::Unauthorized(format!("unknown session `{session_id}`")))?;
    info!(session = %session_id, "admin mode disabled");
    Ok(session_service::view(state, session_id, identity).await)
}

/// Resolve `session_id` and make sure its admin flag is set.
pub fn require_admin(state: &SharedState, session_id: Uuid) -> Result<SessionIdentity, ServiceError> {
    let identity = state.require_session(session_id)?;
    if !identity.is_admin {
        return Err(ServiceError::Unauthorized(
            "admin mode is required for this operation".into(),
        ));
    }
    Ok(identity)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        services::controller::tests::test_config,
        state::{AppState, SessionRegistry},
    };

    #[tokio::test]
    async fn credential_flips_the_flag() {
        let state = AppState::new(test_config(11), SessionRegistry::in_memory());
        let id = state.sessions().create(SessionIdentity::named("Eve")).await;

        assert!(require_admin(&state, id).is_err());
        assert!(matches!(
            login(&state, id, "wrong").await,
            Err(ServiceError::Unauthorized(_))
        ));
        assert!(login(&state, id, "letmein").await.unwrap().is_admin);
        assert!(require_admin(&state, id).is_ok());

        // Dropping the display name does not drop admin mode.
        session_service::logout(&state, id).await.unwrap();
        assert!(require_admin(&state, id).is_ok());

        assert!(!logout(&state, id).await.unwrap().is_admin);
        assert!(require_admin(&state, id).is_err());
    }

    #[tokio::test]
    async fn missing_credential_disables_login() {
        let config = crate::config::AppConfig::default().with_session_file(None);
        let state = AppState::new(config, SessionRegistry::in_memory());
        let id = state.sessions().create(SessionIdentity::default()).await;

        let err = login(&state, id, "").await.unwrap_err();
        assert!(matches!(err, ServiceError::Unauthorized(ref m) if m.contains("disabled")));
    }
}
