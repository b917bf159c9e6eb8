//! Per-device identity flows: name entry, rename, logout and picking a club.

use tracing::info;
use uuid::Uuid;

use crate::{
    dto::session::{SelectClubRequest, SelectionSummary, SessionResponse},
    error::ServiceError,
    services::controller,
    state::{Participation, SharedState, session::SessionIdentity},
};

/// Open a session for a freshly entered display name.
pub async fn open_session(state: &SharedState, name: &str) -> Result<SessionResponse, ServiceError> {
    let name = trimmed_name(name)?;
    let id = state
        .sessions()
        .create(SessionIdentity::named(name.clone()))
        .await;
    info!(session = %id, user = %name, "session opened");
    describe(state, id).await
}

/// Current identity and phase of a session.
pub async fn describe(state: &SharedState, id: Uuid) -> Result<SessionResponse, ServiceError> {
    let identity = state.require_session(id)?;
    Ok(view(state, id, identity).await)
}

/// Replace the display name of an existing session.
pub async fn rename(
    state: &SharedState,
    id: Uuid,
    name: &str,
) -> Result<SessionResponse, ServiceError> {
    let name = trimmed_name(name)?;
    let identity = state
        .sessions()
        .update(id, |identity| identity.user_name = Some(name.clone()))
        .await
        .ok_or_else(|| unknown_session(id))?;
    info!(session = %id, user = %name, "display name changed");
    Ok(view(state, id, identity).await)
}

/// Forget the display name, returning the session to the anonymous phase.
///
/// The admin flag is kept; it is only cleared by an explicit admin logout.
pub async fn logout(state: &SharedState, id: Uuid) -> Result<SessionResponse, ServiceError> {
    let identity = state
        .sessions()
        .update(id, |identity| identity.user_name = None)
        .await
        .ok_or_else(|| unknown_session(id))?;
    info!(session = %id, "session logged out");
    Ok(view(state, id, identity).await)
}

/// Claim a club for the session's display name.
pub async fn select_club(
    state: &SharedState,
    id: Uuid,
    request: SelectClubRequest,
) -> Result<SelectionSummary, ServiceError> {
    let identity = state.require_session(id)?;
    let selection = controller::select_club(
        state,
        identity.user_name.as_deref(),
        &request.club_id,
        request.confirm,
    )
    .await?;
    Ok(selection.into())
}

pub(crate) async fn view(
    state: &SharedState,
    id: Uuid,
    identity: SessionIdentity,
) -> SessionResponse {
    let participation = state
        .read_board(|board| Participation::derive(identity.user_name.as_deref(), board))
        .await;
    SessionResponse {
        session_id: id,
        user_name: identity.user_name,
        is_admin: identity.is_admin,
        participation,
    }
}

fn trimmed_name(name: &str) -> Result<String, ServiceError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ServiceError::InvalidInput(
            "display name cannot be empty".into(),
        ));
    }
    Ok(name.to_string())
}

fn unknown_session(id: Uuid) -> ServiceError {
    ServiceError::Unauthorized(format!("unknown session `{id}`"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        dao::selection_store::MemorySelectionStore, services::controller::tests::booted,
    };

    #[tokio::test]
    async fn participation_follows_the_session() {
        let store = MemorySelectionStore::new();
        let state = booted(&store, 11).await;

        let opened = open_session(&state, "  Alice ").await.unwrap();
        assert_eq!(opened.user_name.as_deref(), Some("Alice"));
        assert_eq!(opened.participation, Participation::Selecting);

        select_club(
            &state,
            opened.session_id,
            SelectClubRequest {
                club_id: "a".into(),
                confirm: true,
            },
        )
        .await
        .unwrap();
        let locked = describe(&state, opened.session_id).await.unwrap();
        assert_eq!(locked.participation.club_id(), Some("a"));

        let anonymous = logout(&state, opened.session_id).await.unwrap();
        assert_eq!(anonymous.participation, Participation::Anonymous);
        assert!(anonymous.user_name.is_none());
    }

    #[tokio::test]
    async fn blank_names_are_refused() {
        let store = MemorySelectionStore::new();
        let state = booted(&store, 11).await;

        assert!(matches!(
            open_session(&state, "   ").await,
            Err(ServiceError::InvalidInput(_))
        ));
        assert!(state.sessions().is_empty());

        let opened = open_session(&state, "Bob").await.unwrap();
        assert!(rename(&state, opened.session_id, "").await.is_err());
        let renamed = rename(&state, opened.session_id, "Robert").await.unwrap();
        assert_eq!(renamed.user_name.as_deref(), Some("Robert"));
    }

    #[tokio::test]
    async fn anonymous_session_cannot_pick() {
        let store = MemorySelectionStore::new();
        let state = booted(&store, 11).await;
        let opened = open_session(&state, "Carol").await.unwrap();
        logout(&state, opened.session_id).await.unwrap();

        let err = select_club(
            &state,
            opened.session_id,
            SelectClubRequest {
                club_id: "a".into(),
                confirm: true,
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidInput(_)));

        assert!(matches!(
            describe(&state, Uuid::new_v4()).await,
            Err(ServiceError::Unauthorized(_))
        ));
    }
}
