mod common;
use common::*;

use bson::doc;

// ── find / insert ───────────────────────────────────────────────

#[tokio::test]
async fn insert_then_find_round_trips_in_order() {
    let session = session();

    let reply = run(
        &session,
        doc! {
            "insert": "users",
            "documents": [ { "id": "1" }, { "id": "2" }, { "id": "3" } ],
            "$db": "acme",
        },
    )
    .await;
    assert_ok(&reply);
    assert_eq!(reply.get_i32("n").unwrap(), 3);

    let reply = run(&session, doc! { "find": "users", "$db": "acme" }).await;
    assert_ok(&reply);
    assert_eq!(
        first_batch(&reply),
        vec![doc! { "id": "1" }, doc! { "id": "2" }, doc! { "id": "3" }]
    );
    assert_eq!(
        reply.get_document("cursor").unwrap().get_str("ns").unwrap(),
        "acme.users"
    );
}

#[tokio::test]
async fn find_on_unknown_collection_succeeds_with_nothing() {
    let session = session();

    let reply = run(&session, doc! { "find": "ghost", "$db": "acme" }).await;
    assert_ok(&reply);
    assert!(first_batch(&reply).is_empty());
}

#[tokio::test]
async fn find_applies_filter_sort_skip_limit_and_projection() {
    let session = session();
    let reply = run(
        &session,
        doc! {
            "insert": "accounts",
            "documents": [
                { "_id": "a", "name": "Acme", "revenue": 50000, "status": "active" },
                { "_id": "b", "name": "Globex", "revenue": 80000, "status": "active" },
                { "_id": "c", "name": "Initech", "revenue": 12000, "status": "rejected" },
                { "_id": "d", "name": "Umbrella", "revenue": 95000, "status": "active" },
            ],
            "$db": "acme",
        },
    )
    .await;
    assert_ok(&reply);

    let reply = run(
        &session,
        doc! {
            "find": "accounts",
            "filter": { "status": "active" },
            "sort": { "revenue": -1 },
            "skip": 1,
            "limit": 2,
            "projection": { "name": 1, "_id": 0 },
            "$db": "acme",
        },
    )
    .await;
    assert_ok(&reply);
    assert_eq!(
        first_batch(&reply),
        vec![doc! { "name": "Globex" }, doc! { "name": "Acme" }]
    );
}

#[tokio::test]
async fn find_with_bad_filter_is_a_request_error() {
    let session = session();
    seed_users(&session).await;

    let reply = run(
        &session,
        doc! { "find": "users", "filter": { "$bad": 1 }, "$db": "acme" },
    )
    .await;
    assert_error(&reply, 2);
}

#[tokio::test]
async fn insert_rejects_let_as_unimplemented() {
    let session = session();

    let reply = run(
        &session,
        doc! {
            "insert": "users",
            "documents": [ { "id": "1" } ],
            "let": { "x": 1 },
            "$db": "acme",
        },
    )
    .await;
    assert_error(&reply, 238);
}

#[tokio::test]
async fn insert_with_mistyped_documents_is_a_type_mismatch() {
    let session = session();

    let reply = run(
        &session,
        doc! { "insert": "users", "documents": "nope", "$db": "acme" },
    )
    .await;
    assert_error(&reply, 14);
}

#[tokio::test]
async fn ordered_insert_stops_at_the_first_bad_statement() {
    let session = session();

    let reply = run(
        &session,
        doc! {
            "insert": "users",
            "documents": [ { "id": "1" }, 12, { "id": "3" } ],
            "$db": "acme",
        },
    )
    .await;
    assert!(reply.get("ok").is_none());
    assert_eq!(reply.get_i32("n").unwrap(), 1);

    let errors = reply.get_array("writeErrors").unwrap();
    assert_eq!(errors.len(), 1);
    let entry = errors[0].as_document().unwrap();
    assert_eq!(entry.get_i32("index").unwrap(), 1);
    assert_eq!(entry.get_i32("code").unwrap(), 14);

    // The third document was never attempted.
    let reply = run(&session, doc! { "find": "users", "$db": "acme" }).await;
    assert_eq!(first_batch(&reply), vec![doc! { "id": "1" }]);
}

// ── delete ──────────────────────────────────────────────────────

#[tokio::test]
async fn delete_reports_only_matched_rows() {
    let session = session();
    seed_users(&session).await;

    let reply = run(
        &session,
        doc! {
            "delete": "users",
            "deletes": [
                { "q": { "id": "1" }, "limit": 1 },
                { "q": { "id": "nope" }, "limit": 1 },
            ],
            "$db": "acme",
        },
    )
    .await;
    assert_ok(&reply);
    assert_eq!(reply.get_i32("n").unwrap(), 1);
}

#[tokio::test]
async fn ordered_delete_stops_after_the_failing_statement() {
    let session = session();
    seed_users(&session).await;

    let reply = run(
        &session,
        doc! {
            "delete": "users",
            "deletes": [
                { "q": { "id": "1" }, "limit": 1 },
                { "q": { "$bad": 1 }, "limit": 1 },
                { "q": { "id": "3" }, "limit": 1 },
            ],
            "ordered": true,
            "$db": "acme",
        },
    )
    .await;

    assert!(reply.get("ok").is_none());
    assert_eq!(reply.get_i32("n").unwrap(), 1);
    let errors = reply.get_array("writeErrors").unwrap();
    assert_eq!(errors.len(), 1);
    let entry = errors[0].as_document().unwrap();
    assert_eq!(entry.get_i32("index").unwrap(), 1);

    // Statement three never ran, so "3" is still there.
    let reply = run(&session, doc! { "find": "users", "$db": "acme" }).await;
    assert_eq!(first_batch(&reply).len(), 2);
}

#[tokio::test]
async fn unordered_delete_attempts_every_statement() {
    let session = session();
    seed_users(&session).await;

    let reply = run(
        &session,
        doc! {
            "delete": "users",
            "deletes": [
                { "q": { "id": "1" }, "limit": 1 },
                { "q": { "$bad": 1 }, "limit": 1 },
                { "q": { "id": "3" }, "limit": 1 },
            ],
            "ordered": false,
            "$db": "acme",
        },
    )
    .await;

    assert!(reply.get("ok").is_none());
    assert_eq!(reply.get_i32("n").unwrap(), 2);
    let errors = reply.get_array("writeErrors").unwrap();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].as_document().unwrap().get_i32("index").unwrap(), 1);

    let reply = run(&session, doc! { "find": "users", "$db": "acme" }).await;
    assert_eq!(first_batch(&reply), vec![doc! { "id": "2", "status": "snoozed" }]);
}

#[tokio::test]
async fn delete_statement_rejects_hint() {
    let session = session();
    seed_users(&session).await;

    let reply = run(
        &session,
        doc! {
            "delete": "users",
            "deletes": [ { "q": {}, "limit": 1, "hint": { "id": 1 } } ],
            "$db": "acme",
        },
    )
    .await;
    let errors = reply.get_array("writeErrors").unwrap();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].as_document().unwrap().get_i32("code").unwrap(), 238);
}

// ── update ──────────────────────────────────────────────────────

#[tokio::test]
async fn update_with_set_rewrites_matching_documents() {
    let session = session();
    seed_users(&session).await;

    let reply = run(
        &session,
        doc! {
            "update": "users",
            "updates": [ { "q": { "id": "2" }, "u": { "$set": { "status": "active" } } } ],
            "$db": "acme",
        },
    )
    .await;
    assert_ok(&reply);
    assert_eq!(reply.get_i32("n").unwrap(), 1);
    assert_eq!(reply.get_i32("nModified").unwrap(), 1);

    let reply = run(
        &session,
        doc! { "find": "users", "filter": { "status": "active" }, "$db": "acme" },
    )
    .await;
    assert_eq!(first_batch(&reply).len(), 3);
}

#[tokio::test]
async fn update_without_multi_touches_one_document() {
    let session = session();
    seed_users(&session).await;

    let reply = run(
        &session,
        doc! {
            "update": "users",
            "updates": [ { "q": { "status": "active" }, "u": { "$set": { "seen": true } } } ],
            "$db": "acme",
        },
    )
    .await;
    assert_ok(&reply);
    assert_eq!(reply.get_i32("n").unwrap(), 1);

    let reply = run(
        &session,
        doc! {
            "update": "users",
            "updates": [
                { "q": { "status": "active" }, "u": { "$set": { "seen": true } }, "multi": true }
            ],
            "$db": "acme",
        },
    )
    .await;
    assert_ok(&reply);
    assert_eq!(reply.get_i32("n").unwrap(), 2);
    // One of the two already carried the change.
    assert_eq!(reply.get_i32("nModified").unwrap(), 1);
}

#[tokio::test]
async fn update_upsert_is_rejected_per_statement() {
    let session = session();
    seed_users(&session).await;

    let reply = run(
        &session,
        doc! {
            "update": "users",
            "updates": [ { "q": { "id": "9" }, "u": { "id": "9" }, "upsert": true } ],
            "$db": "acme",
        },
    )
    .await;
    assert!(reply.get("ok").is_none());
    let errors = reply.get_array("writeErrors").unwrap();
    assert_eq!(errors[0].as_document().unwrap().get_i32("code").unwrap(), 238);
}

// ── catalog commands ────────────────────────────────────────────

#[tokio::test]
async fn create_then_list_collections_and_databases() {
    let session = session();

    let reply = run(&session, doc! { "create": "users", "$db": "acme" }).await;
    assert_ok(&reply);

    let reply = run(&session, doc! { "listCollections": 1, "$db": "acme" }).await;
    assert_ok(&reply);
    assert_eq!(
        first_batch(&reply),
        vec![doc! { "name": "users", "type": "collection" }]
    );

    let reply = run(&session, doc! { "listDatabases": 1, "$db": "admin" }).await;
    assert_ok(&reply);
    let databases = reply.get_array("databases").unwrap();
    assert_eq!(databases.len(), 1);
    assert_eq!(
        databases[0].as_document().unwrap().get_str("name").unwrap(),
        "acme"
    );
}

#[tokio::test]
async fn create_duplicate_collection_is_namespace_exists() {
    let session = session();

    assert_ok(&run(&session, doc! { "create": "users", "$db": "acme" }).await);
    let reply = run(&session, doc! { "create": "users", "$db": "acme" }).await;
    assert_error(&reply, 48);
}

#[tokio::test]
async fn create_with_invalid_name_creates_nothing() {
    let session = session();

    let reply = run(&session, doc! { "create": "1bad", "$db": "acme" }).await;
    assert_error(&reply, 73);

    // Validation happened before any side effect: no database appeared.
    let reply = run(&session, doc! { "listDatabases": 1, "$db": "admin" }).await;
    assert!(reply.get_array("databases").unwrap().is_empty());
}

#[tokio::test]
async fn drop_of_a_missing_collection_is_namespace_not_found() {
    let session = session();
    assert_ok(&run(&session, doc! { "create": "users", "$db": "acme" }).await);

    let reply = run(&session, doc! { "drop": "ghost", "$db": "acme" }).await;
    assert_error(&reply, 26);

    // The catalog is untouched.
    let reply = run(&session, doc! { "listCollections": 1, "$db": "acme" }).await;
    assert_eq!(first_batch(&reply).len(), 1);
}

#[tokio::test]
async fn drop_removes_the_collection() {
    let session = session();
    seed_users(&session).await;

    let reply = run(&session, doc! { "drop": "users", "$db": "acme" }).await;
    assert_ok(&reply);
    assert_eq!(reply.get_str("ns").unwrap(), "acme.users");

    let reply = run(&session, doc! { "listCollections": 1, "$db": "acme" }).await;
    assert!(first_batch(&reply).is_empty());

    let reply = run(&session, doc! { "find": "users", "$db": "acme" }).await;
    assert!(first_batch(&reply).is_empty());
}

#[tokio::test]
async fn list_collections_on_untouched_database_is_empty() {
    let session = session();

    let reply = run(&session, doc! { "listCollections": 1, "$db": "nowhere" }).await;
    assert_ok(&reply);
    assert!(first_batch(&reply).is_empty());
}

// ── acknowledgments ─────────────────────────────────────────────

#[tokio::test]
async fn hello_and_is_master_acknowledge_the_topology() {
    let session = session();

    for name in ["hello", "isMaster", "ismaster"] {
        let mut command = bson::Document::new();
        command.insert(name, 1_i32);
        command.insert("$db", "admin");

        let reply = run(&session, command).await;
        assert_ok(&reply);
        assert!(reply.get_bool("ismaster").unwrap());
        assert_eq!(reply.get_i32("maxWireVersion").unwrap(), 13);
    }
}

#[tokio::test]
async fn ping_and_build_info_reply_ok() {
    let session = session();

    let reply = run(&session, doc! { "ping": 1, "$db": "admin" }).await;
    assert_ok(&reply);

    let reply = run(&session, doc! { "buildInfo": 1, "$db": "admin" }).await;
    assert_ok(&reply);
    assert!(reply.get_str("version").is_ok());
}

#[tokio::test]
async fn unknown_commands_are_command_not_found() {
    let session = session();

    let reply = run(&session, doc! { "frobnicate": 1, "$db": "admin" }).await;
    assert_error(&reply, 59);
}
