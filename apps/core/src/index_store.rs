use std::path::Path;
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use rusqlite::{params, Connection};
use thiserror::Error;

use crate::discovery::{DiscoveryProvider, ProviderError};
use crate::model::{ItemKind, SearchItem};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("history database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("failed to create history directory: {0}")]
    Io(#[from] std::io::Error),
    #[error("history database lock poisoned")]
    Poisoned,
}

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS launch_history (
    id TEXT PRIMARY KEY,
    kind TEXT NOT NULL,
    title TEXT NOT NULL,
    path TEXT NOT NULL,
    use_count INTEGER NOT NULL DEFAULT 0,
    last_used_epoch_secs INTEGER NOT NULL DEFAULT 0
)";

/// Launch history backing the "recently used" candidate set.
pub struct RecentStore {
    conn: Mutex<Connection>,
    limit: usize,
}

impl RecentStore {
    pub fn open(path: &Path, limit: usize) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Self::from_connection(Connection::open(path)?, limit)
    }

    pub fn open_memory(limit: usize) -> Result<Self, StoreError> {
        Self::from_connection(Connection::open_in_memory()?, limit)
    }

    fn from_connection(conn: Connection, limit: usize) -> Result<Self, StoreError> {
        conn.execute(SCHEMA, [])?;
        Ok(Self {
            conn: Mutex::new(conn),
            limit,
        })
    }

    pub fn record_use(&self, item: &SearchItem) -> Result<(), StoreError> {
        self.record_use_at(item, now_epoch_secs())
    }

    pub fn record_use_at(&self, item: &SearchItem, epoch_secs: i64) -> Result<(), StoreError> {
        let conn = self.conn.lock().map_err(|_| StoreError::Poisoned)?;
        conn.execute(
            "INSERT INTO launch_history (id, kind, title, path, use_count, last_used_epoch_secs)
             VALUES (?1, ?2, ?3, ?4, 1, ?5)
             ON CONFLICT(id) DO UPDATE SET
                kind = excluded.kind,
                title = excluded.title,
                path = excluded.path,
                use_count = launch_history.use_count + 1,
                last_used_epoch_secs = excluded.last_used_epoch_secs",
            params![item.id, kind_to_str(item.kind), item.title, item.path, epoch_secs],
        )?;
        Ok(())
    }

    /// Most recently used first, bounded by the configured limit.
    pub fn recent_items(&self) -> Result<Vec<SearchItem>, StoreError> {
        let conn = self.conn.lock().map_err(|_| StoreError::Poisoned)?;
        let mut stmt = conn.prepare(
            "SELECT id, kind, title, path FROM launch_history
             ORDER BY last_used_epoch_secs DESC, use_count DESC, id ASC
             LIMIT ?1",
        )?;
        let limit = i64::try_from(self.limit).unwrap_or(i64::MAX);
        let rows = stmt.query_map(params![limit], |row| {
            let kind: String = row.get(1)?;
            Ok(SearchItem::from_owned(
                row.get(0)?,
                kind_from_str(&kind),
                row.get(2)?,
                row.get(3)?,
            ))
        })?;

        let mut items = Vec::new();
        for row in rows {
            items.push(row?);
        }
        Ok(items)
    }

    pub fn use_count(&self, id: &str) -> Result<u32, StoreError> {
        let conn = self.conn.lock().map_err(|_| StoreError::Poisoned)?;
        let mut stmt = conn.prepare("SELECT use_count FROM launch_history WHERE id = ?1")?;
        let mut rows = stmt.query(params![id])?;
        match rows.next()? {
            Some(row) => Ok(row.get(0)?),
            None => Ok(0),
        }
    }
}

impl DiscoveryProvider for RecentStore {
    fn provider_name(&self) -> &'static str {
        "recent"
    }

    fn discover(&self) -> Result<Vec<SearchItem>, ProviderError> {
        self.recent_items()
            .map_err(|error| ProviderError::new("recent", error.to_string()))
    }
}

fn kind_to_str(kind: ItemKind) -> &'static str {
    match kind {
        ItemKind::Application => "app",
        ItemKind::File => "file",
        ItemKind::Folder => "folder",
    }
}

fn kind_from_str(raw: &str) -> ItemKind {
    match raw {
        "app" => ItemKind::Application,
        "folder" => ItemKind::Folder,
        _ => ItemKind::File,
    }
}

fn now_epoch_secs() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::RecentStore;
    use crate::model::{ItemKind, SearchItem};

    #[test]
    fn recent_items_are_ordered_by_last_use_and_bounded() {
        let store = RecentStore::open_memory(2).unwrap();
        let a = SearchItem::new("a", ItemKind::File, "a.txt", "/a.txt");
        let b = SearchItem::new("b", ItemKind::Folder, "b", "/b");
        let c = SearchItem::new("c", ItemKind::Application, "C", "/c.desktop");

        store.record_use_at(&a, 10).unwrap();
        store.record_use_at(&b, 20).unwrap();
        store.record_use_at(&c, 30).unwrap();
        store.record_use_at(&a, 40).unwrap();

        let recent = store.recent_items().unwrap();
        assert_eq!(recent, vec![a, c]);
        assert_eq!(store.use_count("a").unwrap(), 2);
        assert_eq!(store.use_count("missing").unwrap(), 0);
    }
}
