//! Request dispatcher.
//!
//! Routes a validated command to the SQL operation named by its method and
//! turns the outcome into a reply. Failures never escape as errors; they
//! become error replies.

use std::sync::Arc;

use common::codec;
use common::errors::{AppError, AppResult};
use common::models::{Command, Method, Reply};

use crate::service::SqlServiceTrait;

/// Reply body for a successful `exec`.
pub const EXEC_SUCCESS: &str = "execute sql success";

/// Routes commands to the SQL service.
#[derive(Clone)]
pub struct Dispatcher {
    service: Arc<dyn SqlServiceTrait>,
}

impl Dispatcher {
    pub fn new(service: Arc<dyn SqlServiceTrait>) -> Self {
        Self { service }
    }

    /// Runs a command and builds its reply.
    pub async fn handle(&self, cmd: Command) -> Reply {
        let method = cmd.method;
        match self.route(cmd).await {
            Ok(body) => Reply::success(method.as_str(), body),
            Err(e) => {
                log_failure(method, &e);
                Reply::error(method.as_str(), e)
            }
        }
    }

    async fn route(&self, cmd: Command) -> AppResult<String> {
        match cmd.method {
            Method::Connection => {
                let dsn = codec::decode_dsn(&cmd.body)?;
                self.service.connect(cmd.db_type, &dsn).await?;
                Ok(cmd.db_type.to_string())
            }
            Method::Exec => {
                self.service.exec(cmd.db_type, &cmd.body).await?;
                Ok(EXEC_SUCCESS.to_string())
            }
            Method::Query => {
                let rows = self.service.query(cmd.db_type, &cmd.body).await?;
                codec::encode_rows(&rows)
            }
        }
    }
}

fn log_failure(method: Method, e: &AppError) {
    if e.is_backend_failure() {
        tracing::warn!(%method, code = e.code(), error = %e, "backend rejected request");
    } else {
        tracing::debug!(%method, code = e.code(), error = %e, "request failed");
    }
}
