use bson::Document;
use mimic_backend::Backend;
use mimic_db::{Database, DbError};
use tokio_util::sync::CancellationToken;

use crate::commands;
use crate::error;
use crate::wire::OpMsg;

/// The closed set of commands the proxy understands.
///
/// Dispatch is a tagged enumeration rather than a handler registry so the
/// compiler checks exhaustiveness when the surface grows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Find,
    Insert,
    Update,
    Delete,
    Create,
    Drop,
    ListCollections,
    ListDatabases,
    Hello,
    Ping,
    BuildInfo,
}

impl Command {
    /// Look up a command by its wire name.
    pub fn parse(name: &str) -> Option<Command> {
        match name {
            "find" => Some(Command::Find),
            "insert" => Some(Command::Insert),
            "update" => Some(Command::Update),
            "delete" => Some(Command::Delete),
            "create" => Some(Command::Create),
            "drop" => Some(Command::Drop),
            "listCollections" => Some(Command::ListCollections),
            "listDatabases" => Some(Command::ListDatabases),
            "hello" | "isMaster" | "ismaster" => Some(Command::Hello),
            "ping" => Some(Command::Ping),
            "buildInfo" | "buildinfo" => Some(Command::BuildInfo),
            _ => None,
        }
    }
}

/// One client connection's view of the database.
pub struct Session<B: Backend> {
    db: Database<B>,
}

impl<B: Backend> Session<B> {
    pub fn new(db: Database<B>) -> Self {
        Self { db }
    }

    /// Handle one request frame, rewriting it in place into the reply
    /// frame. Errors become error replies here; only transport failures
    /// propagate past this point.
    pub async fn handle(&self, msg: &mut OpMsg, token: &CancellationToken) {
        let reply = match self.dispatch(msg.document(), token).await {
            Ok(reply) => reply,
            Err(err) => {
                tracing::debug!(error = %err, "command failed");
                error::error_reply(&err)
            }
        };
        msg.set_sections(reply);
    }

    async fn dispatch(
        &self,
        document: &Document,
        token: &CancellationToken,
    ) -> Result<Document, DbError> {
        let name = document
            .keys()
            .next()
            .ok_or_else(|| DbError::BadValue("empty command document".into()))?;
        let command =
            Command::parse(name).ok_or_else(|| DbError::CommandNotFound(name.clone()))?;
        tracing::debug!(?command, "dispatching");

        match command {
            Command::Find => commands::find::handle(&self.db, document, token).await,
            Command::Insert => commands::insert::handle(&self.db, document, token).await,
            Command::Update => commands::update::handle(&self.db, document, token).await,
            Command::Delete => commands::delete::handle(&self.db, document, token).await,
            Command::Create => commands::create::handle(&self.db, document, token).await,
            Command::Drop => commands::drop::handle(&self.db, document, token).await,
            Command::ListCollections => {
                commands::list_collections::handle(&self.db, document, token).await
            }
            Command::ListDatabases => {
                commands::list_databases::handle(&self.db, document, token).await
            }
            Command::Hello => commands::hello::handle(document),
            Command::Ping => Ok(commands::ping::handle()),
            Command::BuildInfo => Ok(commands::build_info::handle()),
        }
    }
}
