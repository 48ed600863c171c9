//! TCP accept loop.

use std::future::Future;
use std::net::SocketAddr;

use chrono::Utc;
use common::errors::AppResult;
use common::utils::IdGenerator;
use tokio::net::{TcpListener, TcpStream};
use tracing::{error, info, Instrument};

use crate::session::{run_session, SessionConfig};
use crate::state::AppState;

/// Accepts connections until `shutdown` resolves, serving each one on its own
/// task.
///
/// # Errors
/// Returns the accept error if the listener fails; session failures are
/// handled inside their own task.
pub async fn serve<F>(state: AppState, listener: TcpListener, shutdown: F) -> AppResult<()>
where
    F: Future<Output = ()> + Send,
{
    let session_config = SessionConfig::from(&state.config);
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            accepted = listener.accept() => {
                let (socket, peer) = accepted?;
                tokio::spawn(handle_connection(state.clone(), session_config.clone(), socket, peer));
            }
            _ = &mut shutdown => {
                info!("shutdown requested, no longer accepting connections");
                return Ok(());
            }
        }
    }
}

async fn handle_connection(state: AppState, config: SessionConfig, socket: TcpStream, peer: SocketAddr) {
    let session_id = IdGenerator::session_id();
    let span = tracing::info_span!("session", session_id = %session_id, peer = %peer);

    async move {
        let started = Utc::now();
        info!("session opened");

        match run_session(socket, &state.dispatcher, &config).await {
            Ok(summary) => info!(
                end = ?summary.end,
                requests = summary.requests,
                duration_ms = (Utc::now() - started).num_milliseconds(),
                "session closed"
            ),
            Err(e) => error!(
                error = %e,
                duration_ms = (Utc::now() - started).num_milliseconds(),
                "session aborted"
            ),
        }
    }
    .instrument(span)
    .await
}
