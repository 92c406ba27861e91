#![allow(dead_code)]

use repokit_core::db::open_db_in_memory;
use repokit_core::{Model, ModelDescriptor, RepoConfig, RepoResult};
use rusqlite::types::Value;
use rusqlite::{Connection, Row};
use serde::Serialize;

pub static TICKET_DESCRIPTOR: ModelDescriptor = ModelDescriptor {
    entity: "Ticket",
    table: "tickets",
    primary_key: "id",
    columns: &["id", "title", "status", "priority", "secret"],
    fillable: &["title", "status", "priority"],
};

/// Fixture entity with a text primary key and a `tags` relation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Ticket {
    pub id: String,
    pub title: String,
    pub status: String,
    pub priority: i64,
    pub secret: Option<String>,
    pub tags: Vec<String>,
}

impl Model for Ticket {
    fn descriptor() -> &'static ModelDescriptor {
        &TICKET_DESCRIPTOR
    }

    fn from_row(row: &Row<'_>) -> RepoResult<Self> {
        Ok(Self {
            id: row.get("id")?,
            title: row.get("title")?,
            status: row.get("status")?,
            priority: row.get("priority")?,
            secret: row.get("secret")?,
            tags: Vec::new(),
        })
    }

    fn load_relations(&mut self, conn: &Connection, relations: &[&str]) -> RepoResult<()> {
        if relations.contains(&"tags") {
            let mut stmt = conn
                .prepare("SELECT name FROM ticket_tags WHERE ticket_id = ?1 ORDER BY name ASC;")?;
            let mut rows = stmt.query([self.id.as_str()])?;
            let mut tags = Vec::new();
            while let Some(row) = rows.next()? {
                tags.push(row.get(0)?);
            }
            self.tags = tags;
        }
        Ok(())
    }
}

pub static COUNTER_DESCRIPTOR: ModelDescriptor = ModelDescriptor {
    entity: "Counter",
    table: "counters",
    primary_key: "id",
    columns: &["id", "label", "value"],
    fillable: &["label", "value"],
};

/// Fixture entity with an autoincrement integer primary key.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Counter {
    pub id: i64,
    pub label: String,
    pub value: i64,
}

impl Model for Counter {
    fn descriptor() -> &'static ModelDescriptor {
        &COUNTER_DESCRIPTOR
    }

    fn from_row(row: &Row<'_>) -> RepoResult<Self> {
        Ok(Self {
            id: row.get("id")?,
            label: row.get("label")?,
            value: row.get("value")?,
        })
    }
}

pub fn open_ticket_db() -> Connection {
    let conn = open_db_in_memory().expect("in-memory database should open");
    conn.execute_batch(
        "CREATE TABLE tickets (
            id TEXT PRIMARY KEY NOT NULL,
            title TEXT NOT NULL DEFAULT '',
            status TEXT NOT NULL DEFAULT 'open',
            priority INTEGER NOT NULL DEFAULT 0,
            secret TEXT
        );
        CREATE TABLE ticket_tags (
            ticket_id TEXT NOT NULL,
            name TEXT NOT NULL
        );
        CREATE TABLE counters (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            label TEXT NOT NULL DEFAULT '',
            value INTEGER NOT NULL DEFAULT 0
        );",
    )
    .expect("fixture schema should apply");
    conn
}

pub fn uuid_config() -> RepoConfig {
    RepoConfig::default().with_uuid(true)
}

pub fn text(value: &str) -> Value {
    Value::Text(value.to_string())
}

pub fn int(value: i64) -> Value {
    Value::Integer(value)
}
