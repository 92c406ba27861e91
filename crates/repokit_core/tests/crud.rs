mod common;

use common::{int, open_ticket_db, text, uuid_config, Counter, Ticket};
use repokit_core::{CrudRepository, RecordId, RepoConfig, RepoError, SqliteCrudRepository};
use rusqlite::types::Value;
use uuid::Uuid;

#[test]
fn create_and_find_roundtrip_with_generated_uuid_key() {
    let conn = open_ticket_db();
    let config = uuid_config();
    let repo = SqliteCrudRepository::<Ticket>::try_new(&conn, &config).unwrap();

    let created = repo
        .create(&[
            ("title", text("first ticket")),
            ("status", text("open")),
            ("priority", int(2)),
        ])
        .unwrap();

    let parsed = Uuid::parse_str(&created.id).unwrap();
    assert_eq!(parsed.get_version_num(), 4);

    let loaded = repo.find_or_fail(&RecordId::from(created.id.clone())).unwrap();
    assert_eq!(loaded.title, "first ticket");
    assert_eq!(loaded.status, "open");
    assert_eq!(loaded.priority, 2);
}

#[test]
fn create_generates_distinct_keys() {
    let conn = open_ticket_db();
    let config = uuid_config();
    let repo = SqliteCrudRepository::<Ticket>::try_new(&conn, &config).unwrap();

    let first = repo.create(&[("title", text("a"))]).unwrap();
    let second = repo.create(&[("title", text("b"))]).unwrap();
    assert_ne!(first.id, second.id);
}

#[test]
fn create_replaces_caller_supplied_key_under_uuid_mode() {
    let conn = open_ticket_db();
    let config = uuid_config();
    let repo = SqliteCrudRepository::<Ticket>::try_new(&conn, &config).unwrap();

    let created = repo
        .create(&[("id", text("custom-key")), ("title", text("keyed"))])
        .unwrap();
    assert_ne!(created.id, "custom-key");
    assert_eq!(created.title, "keyed");
}

#[test]
fn create_drops_non_fillable_fields() {
    let conn = open_ticket_db();
    let config = uuid_config();
    let repo = SqliteCrudRepository::<Ticket>::try_new(&conn, &config).unwrap();

    let created = repo
        .create(&[("title", text("guarded")), ("secret", text("hidden"))])
        .unwrap();
    assert!(created.secret.is_none());
}

#[test]
fn create_uses_rowid_key_without_uuid_mode() {
    let conn = open_ticket_db();
    let config = RepoConfig::default();
    let repo = SqliteCrudRepository::<Counter>::try_new(&conn, &config).unwrap();

    let first = repo
        .create(&[("label", text("clicks")), ("value", int(1))])
        .unwrap();
    let second = repo
        .create(&[("label", text("views")), ("value", int(9))])
        .unwrap();
    assert!(first.id >= 1);
    assert_eq!(second.id, first.id + 1);

    let loaded = repo.find_or_fail(&RecordId::Int(second.id)).unwrap();
    assert_eq!(loaded.label, "views");
    assert_eq!(loaded.value, 9);
}

#[test]
fn find_returns_none_and_find_or_fail_errors_for_missing_row() {
    let conn = open_ticket_db();
    let config = uuid_config();
    let repo = SqliteCrudRepository::<Ticket>::try_new(&conn, &config).unwrap();

    let missing = RecordId::from("absent");
    assert!(repo.find(&missing).unwrap().is_none());

    let err = repo.find_or_fail(&missing).unwrap_err();
    assert!(matches!(err, RepoError::NotFound { entity: "Ticket", .. }));
}

#[test]
fn update_changes_fillable_fields_only() {
    let conn = open_ticket_db();
    let config = uuid_config();
    let repo = SqliteCrudRepository::<Ticket>::try_new(&conn, &config).unwrap();

    let created = repo.create(&[("title", text("draft"))]).unwrap();
    let id = RecordId::from(created.id.clone());

    let updated = repo
        .update(
            &id,
            &[
                ("title", text("renamed")),
                ("secret", text("hidden")),
                ("id", text("evil")),
            ],
        )
        .unwrap();
    assert_eq!(updated.id, created.id);
    assert_eq!(updated.title, "renamed");
    assert!(updated.secret.is_none());
}

#[test]
fn update_without_fillable_fields_returns_current_row() {
    let conn = open_ticket_db();
    let config = uuid_config();
    let repo = SqliteCrudRepository::<Ticket>::try_new(&conn, &config).unwrap();

    let created = repo.create(&[("title", text("stable"))]).unwrap();
    let id = RecordId::from(created.id.clone());

    let unchanged = repo.update(&id, &[("secret", text("hidden"))]).unwrap();
    assert_eq!(unchanged.title, "stable");
}

#[test]
fn update_missing_row_returns_not_found() {
    let conn = open_ticket_db();
    let config = uuid_config();
    let repo = SqliteCrudRepository::<Ticket>::try_new(&conn, &config).unwrap();

    let err = repo
        .update(&RecordId::from("absent"), &[("title", text("x"))])
        .unwrap_err();
    assert!(matches!(err, RepoError::NotFound { .. }));
}

#[test]
fn delete_removes_row_and_errors_on_missing() {
    let conn = open_ticket_db();
    let config = uuid_config();
    let repo = SqliteCrudRepository::<Ticket>::try_new(&conn, &config).unwrap();

    let created = repo.create(&[("title", text("short lived"))]).unwrap();
    let id = RecordId::from(created.id.clone());

    repo.delete(&id).unwrap();
    assert!(repo.find(&id).unwrap().is_none());

    let err = repo.delete(&id).unwrap_err();
    assert!(matches!(err, RepoError::NotFound { .. }));
}

#[test]
fn count_reflects_stored_rows() {
    let conn = open_ticket_db();
    let config = uuid_config();
    let repo = SqliteCrudRepository::<Ticket>::try_new(&conn, &config).unwrap();

    assert_eq!(repo.count().unwrap(), 0);
    for title in ["a", "b", "c"] {
        repo.create(&[("title", text(title))]).unwrap();
    }
    assert_eq!(repo.count().unwrap(), 3);
}

#[test]
fn bulk_insert_writes_rows_exactly_as_given() {
    let conn = open_ticket_db();
    let config = uuid_config();
    let repo = SqliteCrudRepository::<Ticket>::try_new(&conn, &config).unwrap();

    let inserted = repo
        .insert(&[
            vec![("id", text("t-1")), ("title", text("imported a"))],
            vec![("id", text("t-2")), ("title", text("imported b"))],
        ])
        .unwrap();
    assert_eq!(inserted, 2);

    // No key generation on the bulk path, even in uuid mode.
    let loaded = repo.find_or_fail(&RecordId::from("t-1")).unwrap();
    assert_eq!(loaded.title, "imported a");
}

#[test]
fn bulk_insert_accepts_non_fillable_columns() {
    let conn = open_ticket_db();
    let config = uuid_config();
    let repo = SqliteCrudRepository::<Ticket>::try_new(&conn, &config).unwrap();

    repo.insert(&[vec![
        ("id", text("t-3")),
        ("title", text("raw")),
        ("secret", text("kept")),
    ]])
    .unwrap();

    let loaded = repo.find_or_fail(&RecordId::from("t-3")).unwrap();
    assert_eq!(loaded.secret.as_deref(), Some("kept"));
}

#[test]
fn bulk_insert_empty_slice_is_a_noop() {
    let conn = open_ticket_db();
    let config = uuid_config();
    let repo = SqliteCrudRepository::<Ticket>::try_new(&conn, &config).unwrap();

    assert_eq!(repo.insert(&[]).unwrap(), 0);
    assert_eq!(repo.count().unwrap(), 0);
}

#[test]
fn bulk_insert_rejects_row_missing_a_column() {
    let conn = open_ticket_db();
    let config = uuid_config();
    let repo = SqliteCrudRepository::<Ticket>::try_new(&conn, &config).unwrap();

    let err = repo
        .insert(&[
            vec![("id", text("t-1")), ("title", text("a"))],
            vec![("id", text("t-2"))],
        ])
        .unwrap_err();
    assert!(matches!(err, RepoError::InvalidData(_)));
}

#[test]
fn bulk_insert_rejects_unknown_column() {
    let conn = open_ticket_db();
    let config = uuid_config();
    let repo = SqliteCrudRepository::<Ticket>::try_new(&conn, &config).unwrap();

    let err = repo
        .insert(&[vec![("id", text("t-1")), ("bogus", Value::Null)]])
        .unwrap_err();
    assert!(matches!(err, RepoError::UnknownColumn { .. }));
}
