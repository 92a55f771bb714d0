//! Storage layer for teamdeck
//!
//! Aggregates are persisted as one JSON document per entity under a data
//! directory. Every mutation is a whole-document read-modify-write under a
//! file lock; multi-document mutations (the tag cascade) go through a staged
//! transaction that commits every write or restores every touched file.
//!
//! # Directory Structure
//!
//! ```text
//! <data_dir>/
//!   teamdeck.toml             # Optional configuration
//!   users.json                # Registry of known user ids
//!   boards/<id>.json          # Board aggregates (columns, tasks, tag refs)
//!   tags/<id>.json            # Tag entities, referenced by boards
//!   roadmaps/<id>.json        # Roadmap aggregates
//!   tasks/<id>.json           # Delegated-work tasks
//!   subtasks/<id>.json        # Delegated-work subtasks
//!   categories/<id>.json      # Actor-owned category labels
//!   notifications.jsonl       # Append-only notification records
//! ```

use std::collections::HashSet;
use std::fs::{self, File};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::lock::{self, FileLock, DEFAULT_LOCK_TIMEOUT_MS};

/// Storage manager over a teamdeck data directory
#[derive(Debug, Clone)]
pub struct Storage {
    data_dir: PathBuf,
}

impl Storage {
    pub fn new(data_dir: PathBuf) -> Self {
        Self { data_dir }
    }

    // =========================================================================
    // Path accessors
    // =========================================================================

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn boards_dir(&self) -> PathBuf {
        self.data_dir.join("boards")
    }

    pub fn board_file(&self, board_id: &str) -> PathBuf {
        self.boards_dir().join(format!("{board_id}.json"))
    }

    pub fn tags_dir(&self) -> PathBuf {
        self.data_dir.join("tags")
    }

    pub fn tag_file(&self, tag_id: &str) -> PathBuf {
        self.tags_dir().join(format!("{tag_id}.json"))
    }

    pub fn roadmaps_dir(&self) -> PathBuf {
        self.data_dir.join("roadmaps")
    }

    pub fn roadmap_file(&self, roadmap_id: &str) -> PathBuf {
        self.roadmaps_dir().join(format!("{roadmap_id}.json"))
    }

    pub fn tasks_dir(&self) -> PathBuf {
        self.data_dir.join("tasks")
    }

    pub fn task_file(&self, task_id: &str) -> PathBuf {
        self.tasks_dir().join(format!("{task_id}.json"))
    }

    pub fn subtasks_dir(&self) -> PathBuf {
        self.data_dir.join("subtasks")
    }

    pub fn subtask_file(&self, subtask_id: &str) -> PathBuf {
        self.subtasks_dir().join(format!("{subtask_id}.json"))
    }

    pub fn categories_dir(&self) -> PathBuf {
        self.data_dir.join("categories")
    }

    pub fn category_file(&self, category_id: &str) -> PathBuf {
        self.categories_dir().join(format!("{category_id}.json"))
    }

    pub fn users_file(&self) -> PathBuf {
        self.data_dir.join("users.json")
    }

    pub fn notifications_file(&self) -> PathBuf {
        self.data_dir.join("notifications.jsonl")
    }

    // =========================================================================
    // Initialization
    // =========================================================================

    /// Initialize the data directory structure
    pub fn init_all(&self) -> Result<()> {
        fs::create_dir_all(&self.data_dir)?;
        fs::create_dir_all(self.boards_dir())?;
        fs::create_dir_all(self.tags_dir())?;
        fs::create_dir_all(self.roadmaps_dir())?;
        fs::create_dir_all(self.tasks_dir())?;
        fs::create_dir_all(self.subtasks_dir())?;
        fs::create_dir_all(self.categories_dir())?;

        let users_file = self.users_file();
        if !users_file.exists() {
            self.write_json(&users_file, &UserRegistry::default())?;
        }

        let notifications = self.notifications_file();
        if !notifications.exists() {
            File::create(&notifications)?;
        }

        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.boards_dir().exists()
    }

    // =========================================================================
    // Document I/O
    // =========================================================================

    /// Write a JSON document atomically (temp file + rename)
    pub fn write_json<T: Serialize>(&self, path: &Path, data: &T) -> Result<()> {
        let json = serde_json::to_string_pretty(data)?;
        lock::write_atomic(path, json.as_bytes())
    }

    /// Read a JSON document
    pub fn read_json<T: DeserializeOwned>(&self, path: &Path) -> Result<T> {
        let content = fs::read_to_string(path)?;
        let data: T = serde_json::from_str(&content)?;
        Ok(data)
    }

    /// Read an entity document, mapping a missing file to `NotFound`
    pub fn read_entity<T: DeserializeOwned>(&self, path: &Path, label: &str) -> Result<T> {
        if !path.exists() {
            return Err(Error::NotFound(label.to_string()));
        }
        self.read_json(path)
    }

    /// Read-modify-write an entity document under its file lock.
    ///
    /// The mutator runs against the freshly loaded document; the document is
    /// only written back when it returns `Ok`.
    pub fn update_entity<T, R, F>(&self, path: &Path, label: &str, mutator: F) -> Result<R>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce(&mut T) -> Result<R>,
    {
        let _lock = FileLock::acquire(lock::lock_path_for(path), DEFAULT_LOCK_TIMEOUT_MS)?;
        let mut entity: T = self.read_entity(path, label)?;
        let result = mutator(&mut entity)?;
        self.write_json(path, &entity)?;
        Ok(result)
    }

    /// Append a record to a JSONL log
    pub fn append_jsonl<T: Serialize>(&self, path: &Path, record: &T) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string(record)?;
        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)?;

        writeln!(file, "{}", json)?;
        file.sync_all()?;

        Ok(())
    }

    /// Read all records from a JSONL log
    pub fn read_jsonl<T: DeserializeOwned>(&self, path: &Path) -> Result<Vec<T>> {
        if !path.exists() {
            return Ok(Vec::new());
        }

        let file = File::open(path)?;
        let reader = BufReader::new(file);
        let mut records = Vec::new();

        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let record: T = serde_json::from_str(&line)?;
            records.push(record);
        }

        Ok(records)
    }

    /// List every entity document in a directory
    pub fn list_entities<T: DeserializeOwned>(&self, dir: &Path) -> Result<Vec<T>> {
        if !dir.exists() {
            return Ok(Vec::new());
        }
        let mut entities = Vec::new();
        let mut paths: Vec<PathBuf> = fs::read_dir(dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.extension().map(|ext| ext == "json").unwrap_or(false))
            .collect();
        paths.sort();
        for path in paths {
            entities.push(self.read_json(&path)?);
        }
        Ok(entities)
    }

    // =========================================================================
    // Multi-document transactions
    // =========================================================================

    /// Begin a staged transaction
    pub fn transaction(&self) -> Transaction {
        Transaction::default()
    }

    /// Apply a staged transaction.
    ///
    /// Every touched file is backed up in memory first; if any write or
    /// delete fails part-way the already-applied operations are rolled back
    /// and the failure surfaces as `TransactionAborted`.
    pub fn commit(&self, txn: Transaction) -> Result<()> {
        let mut applied: Vec<(PathBuf, Option<Vec<u8>>)> = Vec::new();

        for op in &txn.ops {
            let path = op.path().to_path_buf();
            let previous = if path.exists() {
                match fs::read(&path) {
                    Ok(bytes) => Some(bytes),
                    Err(err) => {
                        self.rollback(&applied);
                        return Err(Error::TransactionAborted(err.to_string()));
                    }
                }
            } else {
                None
            };

            let outcome = match op {
                TxOp::Put { bytes, .. } => lock::write_atomic(&path, bytes),
                TxOp::Delete { .. } => {
                    if path.exists() {
                        fs::remove_file(&path).map_err(Error::Io)
                    } else {
                        Err(Error::NotFound(format!(
                            "document not found: {}",
                            path.display()
                        )))
                    }
                }
            };

            if let Err(err) = outcome {
                self.rollback(&applied);
                return Err(Error::TransactionAborted(err.to_string()));
            }
            applied.push((path, previous));
        }

        Ok(())
    }

    fn rollback(&self, applied: &[(PathBuf, Option<Vec<u8>>)]) {
        for (path, previous) in applied.iter().rev() {
            let restored = match previous {
                Some(bytes) => lock::write_atomic(path, bytes).is_ok(),
                None => !path.exists() || fs::remove_file(path).is_ok(),
            };
            if !restored {
                tracing::error!(path = %path.display(), "transaction rollback failed");
            }
        }
    }

    // =========================================================================
    // User registry
    // =========================================================================

    pub fn read_users(&self) -> Result<UserRegistry> {
        let path = self.users_file();
        if !path.exists() {
            return Ok(UserRegistry::default());
        }
        self.read_json(&path)
    }

    /// Register a user id, failing on duplicates
    pub fn add_user(&self, user_id: &str, name: &str) -> Result<()> {
        let path = self.users_file();
        let _lock = FileLock::acquire(lock::lock_path_for(&path), DEFAULT_LOCK_TIMEOUT_MS)?;
        let mut registry = self.read_users()?;
        if registry.contains(user_id) {
            return Err(Error::Conflict(format!("user already exists: {user_id}")));
        }
        registry.users.push(UserEntry {
            id: user_id.to_string(),
            name: name.to_string(),
            joined_at: Utc::now(),
        });
        self.write_json(&path, &registry)
    }

    pub fn user_exists(&self, user_id: &str) -> Result<bool> {
        Ok(self.read_users()?.contains(user_id))
    }

    /// Count how many of the given ids are registered users.
    ///
    /// Batch existence check for assignee validation: the caller compares the
    /// count against the number of distinct ids it asked about.
    pub fn count_existing_users(&self, user_ids: &HashSet<String>) -> Result<usize> {
        let registry = self.read_users()?;
        Ok(user_ids
            .iter()
            .filter(|id| registry.contains(id))
            .count())
    }
}

/// A staged multi-document write set
#[derive(Default)]
pub struct Transaction {
    ops: Vec<TxOp>,
}

enum TxOp {
    Put { path: PathBuf, bytes: Vec<u8> },
    Delete { path: PathBuf },
}

impl TxOp {
    fn path(&self) -> &Path {
        match self {
            TxOp::Put { path, .. } | TxOp::Delete { path } => path,
        }
    }
}

impl Transaction {
    /// Stage a document write
    pub fn put<T: Serialize>(&mut self, path: PathBuf, value: &T) -> Result<()> {
        let bytes = serde_json::to_string_pretty(value)?.into_bytes();
        self.ops.push(TxOp::Put { path, bytes });
        Ok(())
    }

    /// Stage a document delete
    pub fn delete(&mut self, path: PathBuf) {
        self.ops.push(TxOp::Delete { path });
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}

/// Registry of known user ids
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UserRegistry {
    pub users: Vec<UserEntry>,
}

impl UserRegistry {
    pub fn contains(&self, user_id: &str) -> bool {
        self.users.iter().any(|user| user.id == user_id)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserEntry {
    pub id: String,
    pub name: String,
    pub joined_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn storage() -> (tempfile::TempDir, Storage) {
        let dir = tempdir().expect("tempdir");
        let storage = Storage::new(dir.path().to_path_buf());
        storage.init_all().expect("init");
        (dir, storage)
    }

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Doc {
        id: String,
        value: u32,
    }

    #[test]
    fn init_creates_layout() {
        let (_dir, storage) = storage();
        assert!(storage.is_initialized());
        assert!(storage.users_file().exists());
        assert!(storage.notifications_file().exists());
    }

    #[test]
    fn update_entity_persists_mutation() {
        let (_dir, storage) = storage();
        let path = storage.board_file("board_1");
        storage
            .write_json(
                &path,
                &Doc {
                    id: "board_1".to_string(),
                    value: 1,
                },
            )
            .unwrap();

        storage
            .update_entity::<Doc, _, _>(&path, "board", |doc| {
                doc.value = 2;
                Ok(())
            })
            .unwrap();

        let doc: Doc = storage.read_json(&path).unwrap();
        assert_eq!(doc.value, 2);
    }

    #[test]
    fn update_entity_error_leaves_document_unchanged() {
        let (_dir, storage) = storage();
        let path = storage.board_file("board_1");
        storage
            .write_json(
                &path,
                &Doc {
                    id: "board_1".to_string(),
                    value: 1,
                },
            )
            .unwrap();

        let err = storage
            .update_entity::<Doc, (), _>(&path, "board", |doc| {
                doc.value = 99;
                Err(Error::BadRequest("nope".to_string()))
            })
            .unwrap_err();
        assert!(matches!(err, Error::BadRequest(_)));

        let doc: Doc = storage.read_json(&path).unwrap();
        assert_eq!(doc.value, 1);
    }

    #[test]
    fn missing_entity_maps_to_not_found() {
        let (_dir, storage) = storage();
        let err = storage
            .read_entity::<Doc>(&storage.board_file("board_x"), "board not found: board_x")
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[test]
    fn transaction_commits_all_ops() {
        let (_dir, storage) = storage();
        let a = storage.tag_file("tag_a");
        let b = storage.board_file("board_b");

        let mut txn = storage.transaction();
        txn.put(
            a.clone(),
            &Doc {
                id: "tag_a".to_string(),
                value: 1,
            },
        )
        .unwrap();
        txn.put(
            b.clone(),
            &Doc {
                id: "board_b".to_string(),
                value: 2,
            },
        )
        .unwrap();
        storage.commit(txn).unwrap();

        assert!(a.exists());
        assert!(b.exists());
    }

    #[test]
    fn failed_delete_rolls_back_prior_writes() {
        let (_dir, storage) = storage();
        let board_path = storage.board_file("board_b");
        storage
            .write_json(
                &board_path,
                &Doc {
                    id: "board_b".to_string(),
                    value: 1,
                },
            )
            .unwrap();

        // Deleting a missing tag aborts the transaction after the board
        // write, which must be restored to its prior contents.
        let mut txn = storage.transaction();
        txn.put(
            board_path.clone(),
            &Doc {
                id: "board_b".to_string(),
                value: 99,
            },
        )
        .unwrap();
        txn.delete(storage.tag_file("tag_missing"));

        let err = storage.commit(txn).unwrap_err();
        assert!(matches!(err, Error::TransactionAborted(_)));

        let doc: Doc = storage.read_json(&board_path).unwrap();
        assert_eq!(doc.value, 1);
    }

    #[test]
    fn user_registry_round_trip() {
        let (_dir, storage) = storage();
        storage.add_user("user_ada", "Ada").unwrap();
        storage.add_user("user_brin", "Brin").unwrap();
        assert!(storage.user_exists("user_ada").unwrap());
        assert!(!storage.user_exists("user_zoe").unwrap());

        let err = storage.add_user("user_ada", "Ada").unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));

        let ids: HashSet<String> = ["user_ada", "user_zoe"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(storage.count_existing_users(&ids).unwrap(), 1);
    }
}
