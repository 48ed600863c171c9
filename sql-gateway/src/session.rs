//! Per-connection session loop.
//!
//! Each iteration reads one chunk, decodes, validates and dispatches it, then
//! writes the reply. Malformed or invalid requests produce error replies and
//! the session keeps reading. Only end of stream, an idle deadline or an I/O
//! failure end a session, and they only end this one.

use std::time::Duration;

use common::codec;
use common::config::AppConfig;
use common::errors::AppResult;
use common::models::reply::UNKNOWN_METHOD;
use common::models::Reply;
use common::utils::RequestValidator;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::dispatcher::Dispatcher;

/// Session tuning taken from the application config.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Fixed capacity of the read buffer; one read is one request.
    pub read_buffer_size: usize,
    /// Close the session after this long without input.
    pub idle_timeout: Option<Duration>,
}

impl From<&AppConfig> for SessionConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            read_buffer_size: config.read_buffer_size,
            idle_timeout: config.idle_timeout(),
        }
    }
}

/// Why a session ended without an I/O failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// The peer closed its side.
    Disconnected,
    /// No input arrived within the idle deadline.
    IdleTimeout,
}

/// What a finished session did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSummary {
    pub end: SessionEnd,
    pub requests: u64,
}

/// Serves one connection until it closes.
///
/// # Errors
/// Returns the I/O error that aborted the session. Callers treat it as fatal
/// for this connection only.
pub async fn run_session<S>(
    mut stream: S,
    dispatcher: &Dispatcher,
    config: &SessionConfig,
) -> AppResult<SessionSummary>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut buf = vec![0u8; config.read_buffer_size.max(1)];
    let mut requests = 0;

    loop {
        // Reading
        let read = match config.idle_timeout {
            Some(deadline) => match tokio::time::timeout(deadline, stream.read(&mut buf)).await {
                Ok(read) => read,
                Err(_) => {
                    return Ok(SessionSummary {
                        end: SessionEnd::IdleTimeout,
                        requests,
                    })
                }
            },
            None => stream.read(&mut buf).await,
        };
        let n = read?;
        if n == 0 {
            return Ok(SessionSummary {
                end: SessionEnd::Disconnected,
                requests,
            });
        }

        // Dispatching
        let reply = process(dispatcher, &buf[..n]).await;

        // Responding
        write_reply(&mut stream, &reply).await?;
        requests += 1;
    }
}

/// Decodes, validates and dispatches one raw request.
pub async fn process(dispatcher: &Dispatcher, bytes: &[u8]) -> Reply {
    let request = match codec::decode(bytes) {
        Ok(request) => request,
        Err(e) => {
            tracing::debug!(error = %e, "malformed request");
            return Reply::error(UNKNOWN_METHOD, e);
        }
    };

    let command = match RequestValidator::validate(&request) {
        Ok(command) => command,
        Err(e) => {
            tracing::debug!(db_kind = %request.db_kind, method = %request.method, error = %e, "invalid request");
            return Reply::error(request.method, e);
        }
    };

    tracing::debug!(db_kind = %command.db_type, method = %command.method, "dispatching");
    dispatcher.handle(command).await
}

async fn write_reply<W>(stream: &mut W, reply: &Reply) -> AppResult<()>
where
    W: AsyncWrite + Unpin,
{
    let bytes = match codec::encode(reply) {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!(error = %e, "reply encoding failed");
            codec::encode(&Reply::error(reply.method.clone(), e))?
        }
    };
    stream.write_all(&bytes).await?;
    stream.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use common::models::ReplyStatus;
    use tokio::io::{AsyncBufReadExt, BufReader};

    use super::*;
    use crate::registry::ConnectionRegistry;
    use crate::service::SqlService;

    fn dispatcher() -> Dispatcher {
        let registry = Arc::new(ConnectionRegistry::new());
        Dispatcher::new(Arc::new(SqlService::new(AppConfig::default(), registry)))
    }

    fn session_config() -> SessionConfig {
        SessionConfig::from(&AppConfig::default())
    }

    #[tokio::test]
    async fn test_process_malformed_request() {
        let reply = process(&dispatcher(), b"sqlite3: nonsense").await;
        assert_eq!(reply.status, ReplyStatus::Error);
        assert_eq!(reply.method, "unknown");
    }

    #[tokio::test]
    async fn test_process_echoes_method_on_validation_failure() {
        let reply = process(&dispatcher(), b"sqlite3: nonsense\nbody").await;
        assert_eq!(reply.status, ReplyStatus::Error);
        assert_eq!(reply.method, "nonsense");
        assert!(reply.body.starts_with("not support method"));

        let reply = process(&dispatcher(), b"oracle: query\nselect 1").await;
        assert_eq!(reply.method, "query");
        assert!(reply.body.starts_with("not support db type"));
    }

    #[tokio::test]
    async fn test_session_survives_bad_requests() {
        let (client, server) = tokio::io::duplex(4096);
        let dispatcher = dispatcher();
        let session = tokio::spawn(async move { run_session(server, &dispatcher, &session_config()).await });

        let (read, mut write) = tokio::io::split(client);
        let mut lines = BufReader::new(read).lines();

        let requests: [&[u8]; 3] = [
            b"garbage",
            b"sqlite3: exec\ncreate table t(id int)\n",
            b"sqlite3: connection\ndsn=:memory:\n",
        ];
        let mut replies = Vec::new();
        for request in requests {
            write.write_all(request).await.unwrap();
            let line = lines.next_line().await.unwrap().unwrap();
            replies.push(serde_json::from_str::<Reply>(&line).unwrap());
        }

        assert_eq!(replies[0].method, "unknown");
        assert_eq!(replies[1].body, "no db connection: sqlite3");
        assert_eq!(replies[2], Reply::success("connection", "sqlite3"));

        drop(write);
        drop(lines);
        let summary = session.await.unwrap().unwrap();
        assert_eq!(
            summary,
            SessionSummary {
                end: SessionEnd::Disconnected,
                requests: 3
            }
        );
    }

    #[tokio::test]
    async fn test_idle_session_is_closed() {
        let (_client, server) = tokio::io::duplex(64);
        let config = SessionConfig {
            read_buffer_size: 64,
            idle_timeout: Some(Duration::from_millis(20)),
        };
        let summary = run_session(server, &dispatcher(), &config).await.unwrap();
        assert_eq!(summary.end, SessionEnd::IdleTimeout);
        assert_eq!(summary.requests, 0);
    }
}
