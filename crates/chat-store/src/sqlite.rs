//! SQLite-backed chat persistence.

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{Connection, OptionalExtension};
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

use chat_core::{ChatId, ChatSession, ChatStore, Message, Role};

use crate::error::{Result, StoreError};
use crate::migrations;

/// Chat store over a single SQLite connection
pub struct SqliteChatStore {
    conn: Mutex<Connection>,
    path: Option<PathBuf>,
}

impl SqliteChatStore {
    /// Open (and migrate) the database at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(&path)?;
        tracing::info!(path = %path.display(), "Opened chat database");
        Self::init(conn, Some(path))
    }

    /// Private database that disappears with the store.
    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?, None)
    }

    fn init(conn: Connection, path: Option<PathBuf>) -> Result<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        migrations::run_migrations(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
            path,
        })
    }

    /// Database file, `None` for in-memory stores
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}

fn parse_chat_id(raw: &str) -> Result<ChatId> {
    raw.parse()
        .map_err(|_| StoreError::Corrupt(format!("invalid chat id '{}'", raw)))
}

fn format_created(created: &DateTime<Utc>) -> String {
    created.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn parse_created(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StoreError::Corrupt(format!("invalid timestamp '{}': {}", raw, e)))
}

fn session_exists(conn: &Connection, id: &ChatId) -> Result<bool> {
    Ok(conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM chats WHERE id = ?)",
        [id.to_string()],
        |row| row.get(0),
    )?)
}

fn insert_messages(conn: &Connection, id: &ChatId, messages: &[Message]) -> Result<()> {
    let mut stmt = conn.prepare(
        "INSERT INTO messages (chat_id, created, role, content, chain_of_reason)
         VALUES (?, ?, ?, ?, ?)",
    )?;
    for message in messages {
        stmt.execute(rusqlite::params![
            id.to_string(),
            format_created(&message.created),
            message.role.as_str(),
            message.content,
            message.chain_of_reason,
        ])?;
    }
    Ok(())
}

#[async_trait]
impl ChatStore for SqliteChatStore {
    async fn list_sessions(&self) -> chat_core::Result<Vec<ChatSession>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn
            .prepare("SELECT id, title, model FROM chats ORDER BY created_at, rowid")
            .map_err(StoreError::from)?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                ))
            })
            .map_err(StoreError::from)?;

        let mut sessions = Vec::new();
        for row in rows {
            let (id, title, model) = row.map_err(StoreError::from)?;
            sessions.push(ChatSession {
                id: parse_chat_id(&id)?,
                title,
                model,
            });
        }
        Ok(sessions)
    }

    async fn get_session(&self, id: &ChatId) -> chat_core::Result<Option<ChatSession>> {
        let conn = self.conn.lock().await;
        let row = conn
            .query_row(
                "SELECT title, model FROM chats WHERE id = ?",
                [id.to_string()],
                |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)),
            )
            .optional()
            .map_err(StoreError::from)?;

        Ok(row.map(|(title, model)| ChatSession { id: *id, title, model }))
    }

    async fn create_session(
        &self,
        title: &str,
        id: ChatId,
        model: &str,
    ) -> chat_core::Result<ChatSession> {
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT INTO chats (id, title, model, created_at) VALUES (?, ?, ?, unixepoch())",
            rusqlite::params![id.to_string(), title, model],
        )
        .map_err(StoreError::from)?;

        tracing::debug!(chat_id = %id, model, "Created chat");
        Ok(ChatSession {
            id,
            title: title.to_string(),
            model: model.to_string(),
        })
    }

    async fn update_session_title(&self, id: &ChatId, title: &str) -> chat_core::Result<()> {
        let conn = self.conn.lock().await;
        let updated = conn
            .execute(
                "UPDATE chats SET title = ? WHERE id = ?",
                rusqlite::params![title, id.to_string()],
            )
            .map_err(StoreError::from)?;

        if updated == 0 {
            return Err(StoreError::NotFound(id.to_string()).into());
        }
        Ok(())
    }

    async fn get_messages(&self, id: &ChatId) -> chat_core::Result<Vec<Message>> {
        let conn = self.conn.lock().await;
        if !session_exists(&conn, id)? {
            return Err(StoreError::NotFound(id.to_string()).into());
        }

        let mut stmt = conn
            .prepare(
                "SELECT created, role, content, chain_of_reason FROM messages
                 WHERE chat_id = ? ORDER BY created, id",
            )
            .map_err(StoreError::from)?;
        let rows = stmt
            .query_map([id.to_string()], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, Option<String>>(2)?,
                    row.get::<_, Option<String>>(3)?,
                ))
            })
            .map_err(StoreError::from)?;

        let mut messages = Vec::new();
        for row in rows {
            let (created, role, content, chain_of_reason) = row.map_err(StoreError::from)?;
            let role = Role::parse(&role)
                .ok_or_else(|| StoreError::Corrupt(format!("unknown role '{}'", role)))?;
            messages.push(Message {
                role,
                created: parse_created(&created)?,
                content,
                chain_of_reason,
            });
        }
        Ok(messages)
    }

    async fn create_messages(&self, id: &ChatId, messages: &[Message]) -> chat_core::Result<()> {
        let conn = self.conn.lock().await;
        if !session_exists(&conn, id)? {
            return Err(StoreError::NotFound(id.to_string()).into());
        }

        conn.execute_batch("BEGIN").map_err(StoreError::from)?;
        match insert_messages(&conn, id, messages) {
            Ok(()) => {
                conn.execute_batch("COMMIT").map_err(StoreError::from)?;
                tracing::debug!(chat_id = %id, count = messages.len(), "Stored messages");
                Ok(())
            }
            Err(e) => {
                let _ = conn.execute_batch("ROLLBACK");
                Err(e.into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chat_core::ChatError;
    use chrono::Duration;

    #[tokio::test]
    async fn test_sessions_round_trip() {
        let store = SqliteChatStore::open_in_memory().unwrap();
        let first = ChatId::new();
        let second = ChatId::new();

        store.create_session("New Chat", first, "deepseek-r1:8b").await.unwrap();
        store.create_session("Recipes", second, "llama3.2").await.unwrap();

        let sessions = store.list_sessions().await.unwrap();
        assert_eq!(sessions.len(), 2);
        assert_eq!(sessions[0].id, first);
        assert_eq!(sessions[1].model, "llama3.2");

        store.update_session_title(&first, "Rust questions").await.unwrap();
        let loaded = store.get_session(&first).await.unwrap().unwrap();
        assert_eq!(loaded.title, "Rust questions");

        assert!(store.get_session(&ChatId::new()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_id_is_rejected() {
        let store = SqliteChatStore::open_in_memory().unwrap();
        let id = ChatId::new();
        store.create_session("New Chat", id, "llama3.2").await.unwrap();

        let result = store.create_session("Again", id, "llama3.2").await;
        assert!(matches!(result, Err(ChatError::Storage(_))));
    }

    #[tokio::test]
    async fn test_messages_keep_all_fields_and_order() {
        let store = SqliteChatStore::open_in_memory().unwrap();
        let id = ChatId::new();
        store.create_session("New Chat", id, "deepseek-r1:8b").await.unwrap();

        let user = Message::user("Who wrote Dune?");
        let answer = Message::assistant(
            user.created + Duration::milliseconds(5),
            Some("Frank Herbert.".into()),
            Some("The user asks about a novel.".into()),
        );
        let mut tool = Message::tool(r#"{"message":"m","content":[]}"#);
        tool.created = user.created + Duration::milliseconds(10);

        // Stored out of order; read back sorted by creation time
        store.create_messages(&id, &[answer.clone(), user.clone()]).await.unwrap();
        store.create_messages(&id, std::slice::from_ref(&tool)).await.unwrap();

        let messages = store.get_messages(&id).await.unwrap();
        assert_eq!(messages, vec![user, answer, tool]);
    }

    #[tokio::test]
    async fn test_unknown_chat() {
        let store = SqliteChatStore::open_in_memory().unwrap();
        let id = ChatId::new();

        assert!(matches!(
            store.get_messages(&id).await,
            Err(ChatError::SessionNotFound(_))
        ));
        assert!(matches!(
            store.create_messages(&id, &[Message::user("hi")]).await,
            Err(ChatError::SessionNotFound(_))
        ));
        assert!(matches!(
            store.update_session_title(&id, "x").await,
            Err(ChatError::SessionNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_open_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data").join("chats.db");
        let id = ChatId::new();

        {
            let store = SqliteChatStore::open(&path).unwrap();
            store.create_session("Kept", id, "llama3.2").await.unwrap();
            store.create_messages(&id, &[Message::user("hello")]).await.unwrap();
        }

        let store = SqliteChatStore::open(&path).unwrap();
        assert_eq!(store.path(), Some(path.as_path()));
        assert_eq!(store.get_messages(&id).await.unwrap()[0].text(), "hello");
    }
}
