use mimic_backend::MemoryBackend;
use mimic_db::Database;
use mimic_server::Server;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let addr = std::env::var("MIMIC_ADDR").unwrap_or_else(|_| "127.0.0.1:27017".to_string());

    #[cfg(feature = "postgres")]
    if let Ok(url) = std::env::var("MIMIC_POSTGRES_URL") {
        let db = Database::new(mimic_backend::PgBackend::new(url));
        Server::new(db, &addr).serve().await.expect("server failed");
        return;
    }

    let db = Database::new(MemoryBackend::new());
    Server::new(db, &addr).serve().await.expect("server failed");
}
