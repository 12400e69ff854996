use bson::{doc, Document};
use mimic_backend::MemoryBackend;
use mimic_db::Database;
use mimic_server::wire::OpMsg;
use mimic_server::Session;
use tokio_util::sync::CancellationToken;

pub fn session() -> Session<MemoryBackend> {
    Session::new(Database::new(MemoryBackend::new()))
}

/// Run one command document through the session, as a frame would: the
/// request frame is rewritten in place into the reply frame.
pub async fn run(session: &Session<MemoryBackend>, command: Document) -> Document {
    let mut msg = OpMsg::new(command);
    session.handle(&mut msg, &CancellationToken::new()).await;
    msg.document().clone()
}

pub fn first_batch(reply: &Document) -> Vec<Document> {
    reply
        .get_document("cursor")
        .unwrap()
        .get_array("firstBatch")
        .unwrap()
        .iter()
        .map(|d| d.as_document().unwrap().clone())
        .collect()
}

pub fn assert_ok(reply: &Document) {
    assert_eq!(reply.get_f64("ok").unwrap(), 1.0, "reply: {reply}");
}

pub fn assert_error(reply: &Document, code: i32) {
    assert_eq!(reply.get_f64("ok").unwrap(), 0.0, "reply: {reply}");
    assert_eq!(reply.get_i32("code").unwrap(), code, "reply: {reply}");
}

/// Insert three documents into `acme.users`.
pub async fn seed_users(session: &Session<MemoryBackend>) {
    let reply = run(
        session,
        doc! {
            "insert": "users",
            "documents": [
                { "id": "1", "status": "active" },
                { "id": "2", "status": "snoozed" },
                { "id": "3", "status": "active" },
            ],
            "$db": "acme",
        },
    )
    .await;
    assert_ok(&reply);
    assert_eq!(reply.get_i32("n").unwrap(), 3);
}
