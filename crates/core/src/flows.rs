//! Registration, login and session flows over the store.
//!
//! The key exchange itself is an external collaborator reached through
//! [`PakeServer`]; the flows never look inside its payloads. What lives
//! here is the decision order around the store: the conflict checks
//! (already registered, login already started) run before the
//! corresponding store write, because the store itself takes any write.

use std::sync::Arc;

use uuid::Uuid;

use crate::error::{FlowError, FlowResult, PakeError};
use crate::store::{AuthStateStore, SessionData};

/// Output of [`PakeServer::start_login`].
#[derive(Debug, Clone)]
pub struct StartedLogin {
    /// Opaque server-side handshake state, held by the store until the
    /// finish step.
    pub login_state: String,
    /// Opaque response forwarded to the client.
    pub login_response: String,
}

/// Server side of the password-authenticated key exchange.
///
/// Every parameter and return value is an opaque payload produced and
/// consumed by the external implementation.
pub trait PakeServer: Send + Sync {
    /// Answer a registration request for a not-yet-registered identifier.
    fn registration_response(
        &self,
        user_identifier: &str,
        registration_request: &str,
    ) -> Result<String, PakeError>;

    /// Begin the login handshake against a stored registration record.
    fn start_login(
        &self,
        user_identifier: &str,
        registration_record: &str,
        start_login_request: &str,
    ) -> Result<StartedLogin, PakeError>;

    /// Complete the login handshake, yielding the negotiated session key.
    fn finish_login(
        &self,
        login_state: &str,
        finish_login_request: &str,
    ) -> Result<String, PakeError>;
}

/// Mint a fresh session identifier: a random v4 UUID.
pub fn generate_session_id() -> String {
    Uuid::new_v4().to_string()
}

/// The user-facing flows, bound to a store and a key-exchange
/// implementation.
pub struct AuthFlows<P> {
    store: Arc<AuthStateStore>,
    pake: P,
}

impl<P: PakeServer> AuthFlows<P> {
    pub fn new(store: Arc<AuthStateStore>, pake: P) -> Self {
        Self { store, pake }
    }

    /// Registration step 1: refuse identifiers that already have a record,
    /// then let the key exchange answer the client's request.
    pub async fn register_start(
        &self,
        user_identifier: &str,
        registration_request: &str,
    ) -> FlowResult<String> {
        if self.store.has_user(user_identifier).await {
            return Err(FlowError::UserAlreadyRegistered);
        }
        Ok(self
            .pake
            .registration_response(user_identifier, registration_request)?)
    }

    /// Registration step 2: store the finished record.
    ///
    /// If a record appeared since the start step, the earlier registration
    /// wins and this finish is silently ignored.
    pub async fn register_finish(
        &self,
        user_identifier: &str,
        registration_record: &str,
    ) -> FlowResult<()> {
        if self.store.get_user(user_identifier).await.is_none() {
            self.store.set_user(user_identifier, registration_record).await;
            tracing::info!(user = user_identifier, "user registered");
        } else {
            tracing::debug!(
                user = user_identifier,
                "registration record already present, finish ignored"
            );
        }
        Ok(())
    }

    /// Login step 1: require a registered user and no live handshake, then
    /// stash the server-side state and return the response for the client.
    pub async fn login_start(
        &self,
        user_identifier: &str,
        start_login_request: &str,
    ) -> FlowResult<String> {
        let registration_record = self
            .store
            .get_user(user_identifier)
            .await
            .ok_or(FlowError::UserNotRegistered)?;

        if self.store.has_login(user_identifier).await {
            return Err(FlowError::LoginAlreadyStarted);
        }

        let started =
            self.pake
                .start_login(user_identifier, &registration_record, start_login_request)?;
        self.store
            .set_login(user_identifier, &started.login_state)
            .await;
        Ok(started.login_response)
    }

    /// Login step 2: consume the in-flight handshake, mint a session, and
    /// return its identifier for the caller to hand to the client.
    pub async fn login_finish(
        &self,
        user_identifier: &str,
        finish_login_request: &str,
    ) -> FlowResult<String> {
        let login_state = self
            .store
            .get_login(user_identifier)
            .await
            .ok_or(FlowError::LoginNotStarted)?;

        let session_key = self.pake.finish_login(&login_state, finish_login_request)?;

        let session_id = generate_session_id();
        self.store
            .set_session(
                &session_id,
                SessionData {
                    user_identifier: user_identifier.to_string(),
                    session_key,
                },
            )
            .await;
        self.store.remove_login(user_identifier).await;
        tracing::info!(user = user_identifier, "login completed");
        Ok(session_id)
    }

    /// End a session. Errors when the session is already gone or expired.
    pub async fn logout(&self, session_id: &str) -> FlowResult<()> {
        self.store
            .get_session(session_id)
            .await
            .ok_or(FlowError::InvalidSession)?;
        self.store.clear_session(session_id).await;
        Ok(())
    }

    /// Resolve a session for a restricted-resource check.
    pub async fn authorize(&self, session_id: &str) -> FlowResult<SessionData> {
        self.store
            .get_session(session_id)
            .await
            .ok_or(FlowError::InvalidSession)
    }
}
