use mimic_backend::Backend;
use mimic_db::Database;
use tokio::net::{TcpListener, TcpStream};
use tokio_util::sync::CancellationToken;

use crate::session::Session;
use crate::wire;

pub struct Server<B: Backend> {
    db: Database<B>,
    addr: String,
}

impl<B: Backend> Server<B> {
    pub fn new(db: Database<B>, addr: impl Into<String>) -> Self {
        Self {
            db,
            addr: addr.into(),
        }
    }

    pub async fn serve(&self) -> std::io::Result<()> {
        let listener = TcpListener::bind(&self.addr).await?;
        tracing::info!("mimic-server listening on {}", self.addr);

        loop {
            let (socket, peer) = listener.accept().await?;
            let db = self.db.clone();
            tokio::spawn(async move {
                tracing::debug!(%peer, "connection opened");
                if let Err(e) = handle_connection(socket, db).await {
                    tracing::debug!(%peer, error = %e, "connection closed");
                }
            });
        }
    }
}

async fn handle_connection<B: Backend>(
    socket: TcpStream,
    db: Database<B>,
) -> std::io::Result<()> {
    let session = Session::new(db);
    // Dropping the guard (task exit, panic, disconnect) cancels everything
    // still running under this connection.
    let token = CancellationToken::new();
    let _guard = token.clone().drop_guard();

    let (mut reader, mut writer) = socket.into_split();
    let mut next_id = 0i32;

    loop {
        let Some((header, mut msg)) = wire::read_message(&mut reader).await? else {
            return Ok(());
        };
        session.handle(&mut msg, &token.child_token()).await;
        next_id = next_id.wrapping_add(1);
        wire::write_message(&mut writer, &msg, next_id, header.request_id).await?;
    }
}
