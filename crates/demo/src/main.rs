//! Credstore Demo
//!
//! Walks the full register → login → authorize → logout cycle against a
//! snapshot-file-backed store, using a deterministic stand-in for the key
//! exchange. Run it twice to watch the registration survive the restart
//! while the session does not.
//!
//! Configuration comes from the environment (and `.env` if present):
//! `AUTH_DB_PATH` and `DISABLE_PERSISTENCE`.

use std::sync::Arc;

use credstore_core::{AuthFlows, PakeError, PakeServer, StartedLogin, SystemClock};
use credstore_persist::PersistConfig;
use tracing::info;

/// Stand-in key exchange that derives every payload from its inputs.
///
/// A real deployment plugs an actual PAKE implementation in here; the
/// store and flows only ever see opaque strings either way.
struct LoopbackPake;

impl PakeServer for LoopbackPake {
    fn registration_response(
        &self,
        user_identifier: &str,
        registration_request: &str,
    ) -> Result<String, PakeError> {
        Ok(format!("reg-response:{user_identifier}:{registration_request}"))
    }

    fn start_login(
        &self,
        user_identifier: &str,
        registration_record: &str,
        start_login_request: &str,
    ) -> Result<StartedLogin, PakeError> {
        Ok(StartedLogin {
            login_state: format!("state:{user_identifier}:{registration_record}"),
            login_response: format!("login-response:{start_login_request}"),
        })
    }

    fn finish_login(
        &self,
        login_state: &str,
        _finish_login_request: &str,
    ) -> Result<String, PakeError> {
        Ok(format!("session-key:{login_state}"))
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    // Load environment
    dotenvy::dotenv().ok();

    info!("Starting credstore demo");

    let config = PersistConfig::from_env();
    info!(
        path = %config.snapshot_path.display(),
        disabled = config.disable_persistence,
        "Persistence configured"
    );

    let (store, _subscription) = credstore_persist::init(&config, Arc::new(SystemClock)).await;
    let flows = AuthFlows::new(Arc::clone(&store), LoopbackPake);

    let user = "alice@example.com";

    if store.has_user(user).await {
        info!(user = user, "User already registered from a previous run");
    } else {
        let response = flows.register_start(user, "registration-request").await?;
        info!(user = user, response = %response, "Registration started");
        flows.register_finish(user, "registration-record").await?;
        info!(user = user, "Registration finished");
    }

    let response = flows.login_start(user, "start-login-request").await?;
    info!(user = user, response = %response, "Login started");

    let session_id = flows.login_finish(user, "finish-login-request").await?;
    info!(user = user, session_id = %session_id, "Login finished, session minted");

    let session = flows.authorize(&session_id).await?;
    info!(
        user = %session.user_identifier,
        "Restricted resource check passed"
    );

    flows.logout(&session_id).await?;
    info!(session_id = %session_id, "Logged out");

    // Give the write-behind task a beat to flush the last mutation.
    tokio::time::sleep(std::time::Duration::from_millis(100)).await;

    info!("Demo complete");
    Ok(())
}
