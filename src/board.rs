//! Board aggregate manager.
//!
//! A board owns its columns, the tasks inside them, and a list of tag
//! references as one consistency unit: every mutation loads the whole board
//! document, mutates it in memory, and writes it back under the board's file
//! lock. Tag entities live in their own documents, so tag lifecycle
//! operations pair the tag write with the board write in one transaction.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::LimitsConfig;
use crate::error::{Error, Result};
use crate::id;
use crate::lock::{self, FileLock, DEFAULT_LOCK_TIMEOUT_MS};
use crate::ordering::{self, Ordered};
use crate::storage::Storage;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Board {
    pub id: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub owner_id: String,
    /// Always contains the owner
    pub member_ids: Vec<String>,
    pub columns: Vec<Column>,
    /// Ids of tag entities scoped to this board
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Board {
    pub fn is_member(&self, user_id: &str) -> bool {
        self.member_ids.iter().any(|member| member == user_id)
    }

    fn column_mut(&mut self, column_id: &str) -> Result<&mut Column> {
        self.columns
            .iter_mut()
            .find(|column| column.id == column_id)
            .ok_or_else(|| Error::NotFound(format!("column not found: {column_id}")))
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Column {
    pub id: String,
    pub title: String,
    pub order: usize,
    pub tasks: Vec<BoardTask>,
    pub updated_at: DateTime<Utc>,
}

impl Ordered for Column {
    fn item_id(&self) -> &str {
        &self.id
    }

    fn order(&self) -> usize {
        self.order
    }

    fn set_order(&mut self, order: usize) {
        self.order = order;
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoardTask {
    pub id: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub assignee_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tag_ids: Vec<String>,
    pub order: usize,
}

impl Ordered for BoardTask {
    fn item_id(&self) -> &str {
        &self.id
    }

    fn order(&self) -> usize {
        self.order
    }

    fn set_order(&mut self, order: usize) {
        self.order = order;
    }
}

/// Tag entity, persisted separately and referenced by boards and tasks
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tag {
    pub id: String,
    pub board_id: String,
    pub title: String,
    pub color: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewBoardTask {
    pub title: String,
    pub description: Option<String>,
    #[serde(default)]
    pub assignee_ids: Vec<String>,
    #[serde(default)]
    pub tag_ids: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BoardTaskPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub assignee_ids: Option<Vec<String>>,
    pub tag_ids: Option<Vec<String>>,
    pub order: Option<usize>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ColumnPatch {
    pub title: Option<String>,
    pub order: Option<usize>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TagPatch {
    pub title: Option<String>,
    pub color: Option<String>,
}

/// Board operations over the storage layer
#[derive(Debug, Clone)]
pub struct BoardService {
    storage: Storage,
    limits: LimitsConfig,
}

impl BoardService {
    pub fn new(storage: Storage, limits: LimitsConfig) -> Self {
        Self { storage, limits }
    }

    // =========================================================================
    // Boards and membership
    // =========================================================================

    pub fn create_board(
        &self,
        actor_id: &str,
        title: &str,
        description: Option<String>,
    ) -> Result<Board> {
        let title = non_empty(title, "title")?;
        let now = Utc::now();
        let board = Board {
            id: id::new_id("board"),
            title,
            description,
            owner_id: actor_id.to_string(),
            member_ids: vec![actor_id.to_string()],
            columns: Vec::new(),
            tags: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        self.storage
            .write_json(&self.storage.board_file(&board.id), &board)?;
        info!(board_id = %board.id, owner = %actor_id, "board created");
        Ok(board)
    }

    /// Load a board the actor can see
    pub fn get_board(&self, actor_id: &str, board_id: &str) -> Result<Board> {
        let board: Board = self.storage.read_entity(
            &self.storage.board_file(board_id),
            &format!("board not found: {board_id}"),
        )?;
        require_member(&board, actor_id)?;
        Ok(board)
    }

    /// List every board the actor is a member of
    pub fn list_boards(&self, actor_id: &str) -> Result<Vec<Board>> {
        let mut boards: Vec<Board> = self.storage.list_entities(&self.storage.boards_dir())?;
        boards.retain(|board| board.is_member(actor_id));
        Ok(boards)
    }

    pub fn update_board(
        &self,
        actor_id: &str,
        board_id: &str,
        title: Option<String>,
        description: Option<String>,
    ) -> Result<Board> {
        self.mutate_board(board_id, |board| {
            require_owner(board, actor_id)?;
            if let Some(title) = title {
                board.title = non_empty(&title, "title")?;
            }
            if let Some(description) = description {
                board.description = Some(description);
            }
            Ok(())
        })
    }

    /// Delete a board and every tag entity scoped to it, in one transaction
    pub fn delete_board(&self, actor_id: &str, board_id: &str) -> Result<()> {
        let path = self.storage.board_file(board_id);
        let _lock = FileLock::acquire(lock::lock_path_for(&path), DEFAULT_LOCK_TIMEOUT_MS)?;
        let board: Board = self
            .storage
            .read_entity(&path, &format!("board not found: {board_id}"))?;
        require_owner(&board, actor_id)?;

        let mut txn = self.storage.transaction();
        for tag_id in &board.tags {
            txn.delete(self.storage.tag_file(tag_id));
        }
        txn.delete(path);
        self.storage.commit(txn)?;
        info!(board_id, "board deleted");
        Ok(())
    }

    /// Add a registered user to the board. Owner only.
    pub fn add_member(&self, actor_id: &str, board_id: &str, target_id: &str) -> Result<Board> {
        if !self.storage.user_exists(target_id)? {
            return Err(Error::NotFound(format!("user not found: {target_id}")));
        }
        let max_members = self.limits.max_members;
        self.mutate_board(board_id, |board| {
            require_owner(board, actor_id)?;
            if board.is_member(target_id) {
                return Err(Error::Conflict(format!(
                    "user is already a member: {target_id}"
                )));
            }
            if board.member_ids.len() >= max_members {
                return Err(Error::CapacityExceeded {
                    what: "members",
                    max: max_members,
                });
            }
            board.member_ids.push(target_id.to_string());
            debug!(board_id = %board.id, member = %target_id, "member added");
            Ok(())
        })
    }

    /// Remove a member from the board. Owner only; the owner cannot be removed.
    pub fn remove_member(&self, actor_id: &str, board_id: &str, target_id: &str) -> Result<Board> {
        self.mutate_board(board_id, |board| {
            require_owner(board, actor_id)?;
            remove_membership(board, target_id)
        })
    }

    /// Leave a board. The owner cannot leave.
    pub fn leave(&self, actor_id: &str, board_id: &str) -> Result<()> {
        self.mutate_board(board_id, |board| {
            require_member(board, actor_id)?;
            remove_membership(board, actor_id)
        })?;
        Ok(())
    }

    // =========================================================================
    // Columns
    // =========================================================================

    pub fn create_column(&self, actor_id: &str, board_id: &str, title: &str) -> Result<Board> {
        let title = non_empty(title, "title")?;
        let max_columns = self.limits.max_columns;
        self.mutate_board(board_id, |board| {
            require_member(board, actor_id)?;
            let column = Column {
                id: id::new_id("col"),
                title,
                order: 0,
                tasks: Vec::new(),
                updated_at: Utc::now(),
            };
            ordering::insert_at_end(&mut board.columns, column, max_columns, "columns")
        })
    }

    pub fn update_column(
        &self,
        actor_id: &str,
        board_id: &str,
        column_id: &str,
        patch: ColumnPatch,
    ) -> Result<Board> {
        self.mutate_board(board_id, |board| {
            require_member(board, actor_id)?;
            if let Some(order) = patch.order {
                ordering::reorder(&mut board.columns, column_id, order)?;
            }
            let column = board.column_mut(column_id)?;
            if let Some(title) = patch.title {
                column.title = non_empty(&title, "title")?;
            }
            column.updated_at = Utc::now();
            Ok(())
        })
    }

    pub fn delete_column(&self, actor_id: &str, board_id: &str, column_id: &str) -> Result<Board> {
        self.mutate_board(board_id, |board| {
            require_member(board, actor_id)?;
            ordering::remove(&mut board.columns, column_id)?;
            Ok(())
        })
    }

    // =========================================================================
    // Tasks
    // =========================================================================

    pub fn create_task(
        &self,
        actor_id: &str,
        board_id: &str,
        column_id: &str,
        new_task: NewBoardTask,
    ) -> Result<Board> {
        let title = non_empty(&new_task.title, "title")?;
        let assignee_ids = self.validate_assignees(&new_task.assignee_ids)?;
        let max_tasks = self.limits.max_tasks_per_column;
        let max_tags = self.limits.max_tags_per_task;
        self.mutate_board(board_id, |board| {
            require_member(board, actor_id)?;
            let tag_ids = validate_tag_refs(board, &new_task.tag_ids, max_tags)?;
            let column = board.column_mut(column_id)?;
            let task = BoardTask {
                id: id::new_id("btask"),
                title,
                description: new_task.description,
                assignee_ids,
                tag_ids,
                order: 0,
            };
            ordering::insert_at_end(&mut column.tasks, task, max_tasks, "tasks")?;
            column.updated_at = Utc::now();
            Ok(())
        })
    }

    pub fn update_task(
        &self,
        actor_id: &str,
        board_id: &str,
        column_id: &str,
        task_id: &str,
        patch: BoardTaskPatch,
    ) -> Result<Board> {
        let assignee_ids = match &patch.assignee_ids {
            Some(ids) => Some(self.validate_assignees(ids)?),
            None => None,
        };
        let max_tags = self.limits.max_tags_per_task;
        self.mutate_board(board_id, |board| {
            require_member(board, actor_id)?;
            let tag_ids = match &patch.tag_ids {
                Some(ids) => Some(validate_tag_refs(board, ids, max_tags)?),
                None => None,
            };
            let column = board.column_mut(column_id)?;
            if let Some(order) = patch.order {
                ordering::reorder(&mut column.tasks, task_id, order)?;
            }
            let task = column
                .tasks
                .iter_mut()
                .find(|task| task.id == task_id)
                .ok_or_else(|| Error::NotFound(format!("task not found: {task_id}")))?;
            if let Some(title) = patch.title {
                task.title = non_empty(&title, "title")?;
            }
            if let Some(description) = patch.description {
                task.description = Some(description);
            }
            if let Some(assignee_ids) = assignee_ids {
                task.assignee_ids = assignee_ids;
            }
            if let Some(tag_ids) = tag_ids {
                task.tag_ids = tag_ids;
            }
            column.updated_at = Utc::now();
            Ok(())
        })
    }

    pub fn delete_task(
        &self,
        actor_id: &str,
        board_id: &str,
        column_id: &str,
        task_id: &str,
    ) -> Result<Board> {
        self.mutate_board(board_id, |board| {
            require_member(board, actor_id)?;
            let column = board.column_mut(column_id)?;
            ordering::remove(&mut column.tasks, task_id)?;
            column.updated_at = Utc::now();
            Ok(())
        })
    }

    /// Move a task between columns, keeping both columns densely ordered
    pub fn move_task(
        &self,
        actor_id: &str,
        board_id: &str,
        from_column_id: &str,
        to_column_id: &str,
        task_id: &str,
        dest_order: Option<usize>,
    ) -> Result<Board> {
        if from_column_id == to_column_id {
            return Err(Error::BadRequest(
                "source and destination columns are the same".to_string(),
            ));
        }
        let max_tasks = self.limits.max_tasks_per_column;
        self.mutate_board(board_id, |board| {
            require_member(board, actor_id)?;
            let from_index = column_index(board, from_column_id)?;
            let to_index = column_index(board, to_column_id)?;

            // Split-borrow the two columns out of the board.
            let (from, to) = if from_index < to_index {
                let (head, tail) = board.columns.split_at_mut(to_index);
                (&mut head[from_index], &mut tail[0])
            } else {
                let (head, tail) = board.columns.split_at_mut(from_index);
                (&mut tail[0], &mut head[to_index])
            };

            ordering::move_between(
                &mut from.tasks,
                &mut to.tasks,
                task_id,
                dest_order,
                max_tasks,
                "tasks",
            )?;
            let now = Utc::now();
            from.updated_at = now;
            to.updated_at = now;
            debug!(board_id = %board.id, task_id, from_column_id, to_column_id, "task moved");
            Ok(())
        })
    }

    // =========================================================================
    // Tags
    // =========================================================================

    /// Create a tag entity and register it on the board, in one transaction
    pub fn create_tag(
        &self,
        actor_id: &str,
        board_id: &str,
        title: &str,
        color: &str,
    ) -> Result<Tag> {
        let title = non_empty(title, "title")?;
        let path = self.storage.board_file(board_id);
        let _lock = FileLock::acquire(lock::lock_path_for(&path), DEFAULT_LOCK_TIMEOUT_MS)?;
        let mut board: Board = self
            .storage
            .read_entity(&path, &format!("board not found: {board_id}"))?;
        require_member(&board, actor_id)?;

        let tag = Tag {
            id: id::new_id("tag"),
            board_id: board_id.to_string(),
            title,
            color: color.to_string(),
        };
        board.tags.push(tag.id.clone());
        board.touch();

        let mut txn = self.storage.transaction();
        txn.put(self.storage.tag_file(&tag.id), &tag)?;
        txn.put(path, &board)?;
        self.storage.commit(txn)?;
        info!(board_id, tag_id = %tag.id, "tag created");
        Ok(tag)
    }

    pub fn update_tag(
        &self,
        actor_id: &str,
        board_id: &str,
        tag_id: &str,
        patch: TagPatch,
    ) -> Result<Tag> {
        let path = self.storage.board_file(board_id);
        let _lock = FileLock::acquire(lock::lock_path_for(&path), DEFAULT_LOCK_TIMEOUT_MS)?;
        let mut board: Board = self
            .storage
            .read_entity(&path, &format!("board not found: {board_id}"))?;
        require_member(&board, actor_id)?;
        require_board_tag(&board, tag_id)?;

        let mut tag: Tag = self
            .storage
            .read_entity(&self.storage.tag_file(tag_id), &format!("tag not found: {tag_id}"))?;
        if let Some(title) = patch.title {
            tag.title = non_empty(&title, "title")?;
        }
        if let Some(color) = patch.color {
            tag.color = color;
        }
        board.touch();

        let mut txn = self.storage.transaction();
        txn.put(self.storage.tag_file(tag_id), &tag)?;
        txn.put(path, &board)?;
        self.storage.commit(txn)?;
        Ok(tag)
    }

    /// Delete a tag entity and prune every reference to it from the board
    /// and its tasks, in one transaction.
    pub fn delete_tag(&self, actor_id: &str, board_id: &str, tag_id: &str) -> Result<Board> {
        let path = self.storage.board_file(board_id);
        let _lock = FileLock::acquire(lock::lock_path_for(&path), DEFAULT_LOCK_TIMEOUT_MS)?;
        let mut board: Board = self
            .storage
            .read_entity(&path, &format!("board not found: {board_id}"))?;
        require_member(&board, actor_id)?;
        require_board_tag(&board, tag_id)?;

        board.tags.retain(|id| id != tag_id);
        for column in &mut board.columns {
            for task in &mut column.tasks {
                task.tag_ids.retain(|id| id != tag_id);
            }
        }
        board.touch();

        // The tag delete is staged first: if the entity cannot be removed the
        // transaction aborts with the board document untouched on disk.
        let mut txn = self.storage.transaction();
        txn.delete(self.storage.tag_file(tag_id));
        txn.put(path, &board)?;
        self.storage.commit(txn)?;
        info!(board_id, tag_id, "tag deleted");
        Ok(board)
    }

    /// Load the tag entities referenced by a board
    pub fn get_tags(&self, actor_id: &str, board_id: &str) -> Result<Vec<Tag>> {
        let board = self.get_board(actor_id, board_id)?;
        board
            .tags
            .iter()
            .map(|tag_id| {
                self.storage.read_entity(
                    &self.storage.tag_file(tag_id),
                    &format!("tag not found: {tag_id}"),
                )
            })
            .collect()
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn mutate_board<F>(&self, board_id: &str, mutator: F) -> Result<Board>
    where
        F: FnOnce(&mut Board) -> Result<()>,
    {
        let path = self.storage.board_file(board_id);
        self.storage
            .update_entity::<Board, _, _>(&path, &format!("board not found: {board_id}"), |board| {
                mutator(board)?;
                board.touch();
                Ok(board.clone())
            })
    }

    /// Deduplicate and batch-check assignee existence
    fn validate_assignees(&self, assignee_ids: &[String]) -> Result<Vec<String>> {
        let distinct: HashSet<String> = assignee_ids.iter().cloned().collect();
        if distinct.len() > self.limits.max_assignees {
            return Err(Error::CapacityExceeded {
                what: "assignees",
                max: self.limits.max_assignees,
            });
        }
        if self.storage.count_existing_users(&distinct)? != distinct.len() {
            return Err(Error::NotFound(
                "one or more assignees do not exist".to_string(),
            ));
        }
        let mut ordered: Vec<String> = distinct.into_iter().collect();
        ordered.sort();
        Ok(ordered)
    }
}

/// Membership check; misses are reported as a missing board so non-members
/// cannot probe for existence.
fn require_member(board: &Board, actor_id: &str) -> Result<()> {
    if board.is_member(actor_id) {
        Ok(())
    } else {
        Err(Error::NotFound(format!("board not found: {}", board.id)))
    }
}

/// Owner check, conflated with `NotFound` the same way
fn require_owner(board: &Board, actor_id: &str) -> Result<()> {
    if board.owner_id == actor_id {
        Ok(())
    } else {
        Err(Error::NotFound(format!("board not found: {}", board.id)))
    }
}

fn require_board_tag(board: &Board, tag_id: &str) -> Result<()> {
    if board.tags.iter().any(|id| id == tag_id) {
        Ok(())
    } else {
        Err(Error::NotFound(format!("tag not found: {tag_id}")))
    }
}

fn remove_membership(board: &mut Board, target_id: &str) -> Result<()> {
    if target_id == board.owner_id {
        return Err(Error::BadRequest(
            "the board owner cannot be removed".to_string(),
        ));
    }
    if !board.is_member(target_id) {
        return Err(Error::NotFound(format!("member not found: {target_id}")));
    }
    board.member_ids.retain(|member| member != target_id);
    Ok(())
}

/// Every tag reference must point at a tag registered on this board
fn validate_tag_refs(board: &Board, tag_ids: &[String], max_tags: usize) -> Result<Vec<String>> {
    let distinct: HashSet<&String> = tag_ids.iter().collect();
    if distinct.len() > max_tags {
        return Err(Error::CapacityExceeded {
            what: "tags per task",
            max: max_tags,
        });
    }
    for tag_id in &distinct {
        if !board.tags.iter().any(|id| &id == tag_id) {
            return Err(Error::Conflict(format!(
                "tag is not on this board: {tag_id}"
            )));
        }
    }
    let mut ordered: Vec<String> = distinct.into_iter().cloned().collect();
    ordered.sort();
    Ok(ordered)
}

fn column_index(board: &Board, column_id: &str) -> Result<usize> {
    board
        .columns
        .iter()
        .position(|column| column.id == column_id)
        .ok_or_else(|| Error::NotFound(format!("column not found: {column_id}")))
}

fn non_empty(value: &str, field: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(Error::BadRequest(format!("{field} cannot be empty")));
    }
    Ok(trimmed.to_string())
}
