//! Delegated-work tasks and subtasks.
//!
//! A subtask is created by an owner and assigned to another actor. Until the
//! assignee confirms it, the assignee cannot edit it; rejecting it is
//! permanent. What an actor may write depends on their role relative to the
//! subtask: `Owner` (created it for someone else), `Assignee` (received it),
//! or `Dual` (delegated it to themselves, which auto-confirms).
//!
//! Confirm, reject, and completion transitions emit notifications through
//! the relay.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::id;
use crate::lock::{self, FileLock, DEFAULT_LOCK_TIMEOUT_MS};
use crate::notify::{NotificationKind, NotificationRelay};
use crate::storage::Storage;

/// An actor's relationship to a subtask
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Owner = 0,
    Assignee = 1,
    Dual = 2,
}

impl Role {
    /// Compute the role, or `None` when the actor is neither party
    pub fn of(actor_id: &str, owner_id: &str, assignee_id: &str) -> Option<Role> {
        match (actor_id == owner_id, actor_id == assignee_id) {
            (true, true) => Some(Role::Dual),
            (true, false) => Some(Role::Owner),
            (false, true) => Some(Role::Assignee),
            (false, false) => None,
        }
    }
}

/// Field classes with distinct write permissions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldClass {
    /// title, description, links, deadline
    Core = 0,
    /// category references, validated against the actor's own categories
    Categories = 1,
    /// the is_completed flag
    Completion = 2,
}

/// Write permission lookup: rows are field classes, columns are roles
/// (Owner, Assignee, Dual). Assignee writes additionally require a confirmed,
/// non-rejected subtask, checked before this table is consulted.
const MAY_WRITE: [[bool; 3]; 3] = [
    [true, false, true],  // Core
    [false, true, true],  // Categories
    [true, true, true],   // Completion
];

pub fn may_write(role: Role, field: FieldClass) -> bool {
    MAY_WRITE[field as usize][role as usize]
}

/// Actor-owned label attached to tasks and subtasks
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub id: String,
    pub owner_id: String,
    pub title: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub owner_id: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub categories: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub links: Vec<String>,
    /// Back-references to subtask documents, not ownership
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub subtasks: Vec<String>,
    pub is_completed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deadline: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_of_completion: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subtask {
    pub id: String,
    pub task_id: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub owner_id: String,
    pub assignee_id: String,
    pub is_completed: bool,
    pub is_confirmed: bool,
    pub is_rejected: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub categories: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub links: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deadline: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_of_completion: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewTask {
    pub title: String,
    pub description: Option<String>,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub links: Vec<String>,
    pub deadline: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub categories: Option<Vec<String>>,
    pub links: Option<Vec<String>>,
    pub deadline: Option<DateTime<Utc>>,
    pub is_completed: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewSubtask {
    pub title: String,
    pub description: Option<String>,
    pub assignee_id: String,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub links: Vec<String>,
    pub deadline: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SubtaskPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub categories: Option<Vec<String>>,
    pub links: Option<Vec<String>>,
    pub deadline: Option<DateTime<Utc>>,
    pub is_completed: Option<bool>,
}

impl SubtaskPatch {
    fn touches_core(&self) -> bool {
        self.title.is_some()
            || self.description.is_some()
            || self.links.is_some()
            || self.deadline.is_some()
    }
}

/// Task and subtask operations over the storage layer
#[derive(Clone)]
pub struct TaskService {
    storage: Storage,
    relay: NotificationRelay,
}

impl TaskService {
    pub fn new(storage: Storage, relay: NotificationRelay) -> Self {
        Self { storage, relay }
    }

    // =========================================================================
    // Categories
    // =========================================================================

    pub fn create_category(&self, actor_id: &str, title: &str) -> Result<Category> {
        let title = non_empty(title, "title")?;
        let category = Category {
            id: id::new_id("cat"),
            owner_id: actor_id.to_string(),
            title,
            created_at: Utc::now(),
        };
        self.storage
            .write_json(&self.storage.category_file(&category.id), &category)?;
        Ok(category)
    }

    pub fn list_categories(&self, actor_id: &str) -> Result<Vec<Category>> {
        let mut categories: Vec<Category> =
            self.storage.list_entities(&self.storage.categories_dir())?;
        categories.retain(|category| category.owner_id == actor_id);
        Ok(categories)
    }

    pub fn delete_category(&self, actor_id: &str, category_id: &str) -> Result<()> {
        let category: Category = self.storage.read_entity(
            &self.storage.category_file(category_id),
            &format!("category not found: {category_id}"),
        )?;
        if category.owner_id != actor_id {
            return Err(Error::NotFound(format!(
                "category not found: {category_id}"
            )));
        }
        std::fs::remove_file(self.storage.category_file(category_id))?;
        Ok(())
    }

    /// Count how many of the given categories the actor owns.
    ///
    /// Category writes are only valid when every referenced id is one of the
    /// actor's own categories, so callers compare this against the distinct
    /// reference count.
    fn owned_category_count(&self, actor_id: &str, ids: &HashSet<String>) -> Result<usize> {
        let mut count = 0;
        for category_id in ids {
            let path = self.storage.category_file(category_id);
            if !path.exists() {
                continue;
            }
            let category: Category = self.storage.read_json(&path)?;
            if category.owner_id == actor_id {
                count += 1;
            }
        }
        Ok(count)
    }

    fn validate_categories(&self, actor_id: &str, ids: &[String]) -> Result<Vec<String>> {
        let distinct: HashSet<String> = ids.iter().cloned().collect();
        if self.owned_category_count(actor_id, &distinct)? != distinct.len() {
            return Err(Error::Conflict(
                "one or more categories are not owned by the actor".to_string(),
            ));
        }
        let mut ordered: Vec<String> = distinct.into_iter().collect();
        ordered.sort();
        Ok(ordered)
    }

    // =========================================================================
    // Tasks
    // =========================================================================

    pub fn create_task(&self, actor_id: &str, new_task: NewTask) -> Result<Task> {
        let title = non_empty(&new_task.title, "title")?;
        let categories = self.validate_categories(actor_id, &new_task.categories)?;
        let now = Utc::now();
        let task = Task {
            id: id::new_id("task"),
            title,
            description: new_task.description,
            owner_id: actor_id.to_string(),
            categories,
            links: new_task.links,
            subtasks: Vec::new(),
            is_completed: false,
            deadline: new_task.deadline,
            date_of_completion: None,
            created_at: now,
            updated_at: now,
        };
        self.storage
            .write_json(&self.storage.task_file(&task.id), &task)?;
        info!(task_id = %task.id, owner = %actor_id, "task created");
        Ok(task)
    }

    pub fn get_task(&self, actor_id: &str, task_id: &str) -> Result<Task> {
        let task: Task = self.storage.read_entity(
            &self.storage.task_file(task_id),
            &format!("task not found: {task_id}"),
        )?;
        if task.owner_id != actor_id {
            return Err(Error::NotFound(format!("task not found: {task_id}")));
        }
        Ok(task)
    }

    pub fn list_tasks(&self, actor_id: &str) -> Result<Vec<Task>> {
        let mut tasks: Vec<Task> = self.storage.list_entities(&self.storage.tasks_dir())?;
        tasks.retain(|task| task.owner_id == actor_id);
        Ok(tasks)
    }

    pub fn update_task(&self, actor_id: &str, task_id: &str, patch: TaskPatch) -> Result<Task> {
        let categories = match &patch.categories {
            Some(ids) => Some(self.validate_categories(actor_id, ids)?),
            None => None,
        };
        let path = self.storage.task_file(task_id);
        self.storage.update_entity::<Task, _, _>(
            &path,
            &format!("task not found: {task_id}"),
            |task| {
                if task.owner_id != actor_id {
                    return Err(Error::NotFound(format!("task not found: {task_id}")));
                }
                if let Some(title) = patch.title {
                    task.title = non_empty(&title, "title")?;
                }
                if let Some(description) = patch.description {
                    task.description = Some(description);
                }
                if let Some(categories) = categories {
                    task.categories = categories;
                }
                if let Some(links) = patch.links {
                    task.links = links;
                }
                if let Some(deadline) = patch.deadline {
                    task.deadline = Some(deadline);
                }
                if let Some(is_completed) = patch.is_completed {
                    task.is_completed = is_completed;
                    task.date_of_completion = is_completed.then(Utc::now);
                }
                task.updated_at = Utc::now();
                Ok(task.clone())
            },
        )
    }

    /// Delete a task. Its subtasks are left in place and must be removed
    /// explicitly; the back-reference list is only maintained while the task
    /// document exists.
    pub fn delete_task(&self, actor_id: &str, task_id: &str) -> Result<()> {
        let task = self.get_task(actor_id, task_id)?;
        if !task.subtasks.is_empty() {
            debug!(task_id, remaining = task.subtasks.len(), "task deleted with subtasks still attached");
        }
        std::fs::remove_file(self.storage.task_file(task_id))?;
        info!(task_id, "task deleted");
        Ok(())
    }

    // =========================================================================
    // Subtasks
    // =========================================================================

    /// Create a subtask under one of the actor's tasks.
    ///
    /// Self-assignment auto-confirms; delegating to another actor leaves the
    /// subtask pending until that actor responds. Creation itself emits no
    /// notification.
    pub fn create_subtask(
        &self,
        actor_id: &str,
        task_id: &str,
        new_subtask: NewSubtask,
    ) -> Result<Subtask> {
        let title = non_empty(&new_subtask.title, "title")?;
        if !self.storage.user_exists(&new_subtask.assignee_id)? {
            return Err(Error::NotFound(format!(
                "user not found: {}",
                new_subtask.assignee_id
            )));
        }
        let categories = self.validate_categories(actor_id, &new_subtask.categories)?;

        let task_path = self.storage.task_file(task_id);
        let _lock = FileLock::acquire(lock::lock_path_for(&task_path), DEFAULT_LOCK_TIMEOUT_MS)?;
        let mut task: Task = self
            .storage
            .read_entity(&task_path, &format!("task not found: {task_id}"))?;
        if task.owner_id != actor_id {
            return Err(Error::NotFound(format!("task not found: {task_id}")));
        }

        let now = Utc::now();
        let subtask = Subtask {
            id: id::new_id("subtask"),
            task_id: task_id.to_string(),
            title,
            description: new_subtask.description,
            owner_id: actor_id.to_string(),
            assignee_id: new_subtask.assignee_id.clone(),
            is_completed: false,
            is_confirmed: actor_id == new_subtask.assignee_id,
            is_rejected: false,
            categories,
            links: new_subtask.links,
            deadline: new_subtask.deadline,
            date_of_completion: None,
            created_at: now,
            updated_at: now,
        };
        task.subtasks.push(subtask.id.clone());
        task.updated_at = now;

        let mut txn = self.storage.transaction();
        txn.put(self.storage.subtask_file(&subtask.id), &subtask)?;
        txn.put(task_path, &task)?;
        self.storage.commit(txn)?;
        info!(subtask_id = %subtask.id, task_id, assignee = %subtask.assignee_id, "subtask created");
        Ok(subtask)
    }

    pub fn get_subtask(&self, actor_id: &str, subtask_id: &str) -> Result<Subtask> {
        let subtask: Subtask = self.storage.read_entity(
            &self.storage.subtask_file(subtask_id),
            &format!("subtask not found: {subtask_id}"),
        )?;
        Role::of(actor_id, &subtask.owner_id, &subtask.assignee_id)
            .ok_or_else(|| Error::NotFound(format!("subtask not found: {subtask_id}")))?;
        Ok(subtask)
    }

    /// Subtasks assigned to the actor by someone else
    pub fn list_assigned(&self, actor_id: &str) -> Result<Vec<Subtask>> {
        let mut subtasks: Vec<Subtask> =
            self.storage.list_entities(&self.storage.subtasks_dir())?;
        subtasks.retain(|subtask| subtask.assignee_id == actor_id);
        Ok(subtasks)
    }

    /// Apply a field patch under the role permission matrix.
    ///
    /// A `false -> true` completion edge stamps `date_of_completion` and
    /// notifies the other party; `true -> false` clears the stamp silently.
    pub fn update_subtask(
        &self,
        actor_id: &str,
        subtask_id: &str,
        patch: SubtaskPatch,
    ) -> Result<Subtask> {
        let categories = match &patch.categories {
            Some(ids) => Some(self.validate_categories(actor_id, ids)?),
            None => None,
        };

        let path = self.storage.subtask_file(subtask_id);
        let mut completion_edge = false;
        let updated = self.storage.update_entity::<Subtask, _, _>(
            &path,
            &format!("subtask not found: {subtask_id}"),
            |subtask| {
                let role = Role::of(actor_id, &subtask.owner_id, &subtask.assignee_id)
                    .ok_or_else(|| {
                        Error::NotFound(format!("subtask not found: {subtask_id}"))
                    })?;

                if role == Role::Assignee && !subtask.is_confirmed {
                    return Err(Error::Forbidden(
                        "could not update subtask: awaiting confirmation".to_string(),
                    ));
                }
                if role == Role::Assignee && subtask.is_rejected {
                    return Err(Error::Forbidden(
                        "could not update subtask: it was rejected".to_string(),
                    ));
                }

                if patch.touches_core() && !may_write(role, FieldClass::Core) {
                    return Err(Error::Forbidden(
                        "role does not permit editing subtask fields".to_string(),
                    ));
                }
                if categories.is_some() && !may_write(role, FieldClass::Categories) {
                    return Err(Error::Forbidden(
                        "role does not permit editing subtask categories".to_string(),
                    ));
                }
                if patch.is_completed.is_some() && !may_write(role, FieldClass::Completion) {
                    return Err(Error::Forbidden(
                        "role does not permit completing the subtask".to_string(),
                    ));
                }

                if let Some(title) = patch.title {
                    subtask.title = non_empty(&title, "title")?;
                }
                if let Some(description) = patch.description {
                    subtask.description = Some(description);
                }
                if let Some(categories) = categories {
                    subtask.categories = categories;
                }
                if let Some(links) = patch.links {
                    subtask.links = links;
                }
                if let Some(deadline) = patch.deadline {
                    subtask.deadline = Some(deadline);
                }
                if let Some(is_completed) = patch.is_completed {
                    completion_edge = is_completed && !subtask.is_completed;
                    subtask.is_completed = is_completed;
                    subtask.date_of_completion = is_completed.then(Utc::now);
                }
                subtask.updated_at = Utc::now();
                Ok(subtask.clone())
            },
        )?;

        if completion_edge {
            if let Some(recipient) = completion_recipient(actor_id, &updated) {
                self.relay.notify(
                    recipient,
                    actor_id,
                    NotificationKind::SubtaskCompleted,
                    Some(subtask_id),
                )?;
            }
        }
        Ok(updated)
    }

    /// Assignee response to a pending delegation: confirm or reject.
    ///
    /// Rejection is permanent. Both outcomes notify the owner.
    pub fn respond_subtask(
        &self,
        actor_id: &str,
        subtask_id: &str,
        accept: bool,
    ) -> Result<Subtask> {
        let path = self.storage.subtask_file(subtask_id);
        let updated = self.storage.update_entity::<Subtask, _, _>(
            &path,
            &format!("subtask not found: {subtask_id}"),
            |subtask| {
                let role = Role::of(actor_id, &subtask.owner_id, &subtask.assignee_id)
                    .ok_or_else(|| {
                        Error::NotFound(format!("subtask not found: {subtask_id}"))
                    })?;
                if role != Role::Assignee {
                    return Err(Error::Forbidden(
                        "only the assignee may confirm or reject a subtask".to_string(),
                    ));
                }
                if subtask.is_rejected {
                    return Err(Error::Forbidden(
                        "the subtask was already rejected".to_string(),
                    ));
                }
                if subtask.is_confirmed {
                    return Err(Error::BadRequest(
                        "the subtask is already confirmed".to_string(),
                    ));
                }
                subtask.is_confirmed = accept;
                if !accept {
                    subtask.is_rejected = true;
                }
                subtask.updated_at = Utc::now();
                Ok(subtask.clone())
            },
        )?;

        let kind = if accept {
            NotificationKind::SubtaskConfirmed
        } else {
            NotificationKind::SubtaskRejected
        };
        self.relay
            .notify(&updated.owner_id, actor_id, kind, Some(subtask_id))?;
        Ok(updated)
    }

    /// Remove a subtask and detach it from its parent task.
    ///
    /// Only the owner (or dual) side may remove; an assignee cannot delete
    /// work delegated to them.
    pub fn remove_subtask(&self, actor_id: &str, subtask_id: &str) -> Result<()> {
        let subtask: Subtask = self.storage.read_entity(
            &self.storage.subtask_file(subtask_id),
            &format!("subtask not found: {subtask_id}"),
        )?;
        let role = Role::of(actor_id, &subtask.owner_id, &subtask.assignee_id)
            .ok_or_else(|| Error::NotFound(format!("subtask not found: {subtask_id}")))?;
        if role == Role::Assignee {
            return Err(Error::Forbidden(
                "only the owner may remove a subtask".to_string(),
            ));
        }

        let task_path = self.storage.task_file(&subtask.task_id);
        let _lock = FileLock::acquire(lock::lock_path_for(&task_path), DEFAULT_LOCK_TIMEOUT_MS)?;

        let mut txn = self.storage.transaction();
        txn.delete(self.storage.subtask_file(subtask_id));
        if task_path.exists() {
            let mut task: Task = self.storage.read_json(&task_path)?;
            task.subtasks.retain(|id| id != subtask_id);
            task.updated_at = Utc::now();
            txn.put(task_path, &task)?;
        }
        self.storage.commit(txn)?;
        info!(subtask_id, "subtask removed");
        Ok(())
    }
}

/// Who learns about a completion edge: the party that did not flip the flag.
/// Dual-role completions notify nobody.
fn completion_recipient<'a>(actor_id: &str, subtask: &'a Subtask) -> Option<&'a str> {
    if subtask.owner_id == subtask.assignee_id {
        return None;
    }
    if actor_id == subtask.owner_id {
        Some(&subtask.assignee_id)
    } else {
        Some(&subtask.owner_id)
    }
}

fn non_empty(value: &str, field: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(Error::BadRequest(format!("{field} cannot be empty")));
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_computation() {
        assert_eq!(Role::of("a", "a", "b"), Some(Role::Owner));
        assert_eq!(Role::of("b", "a", "b"), Some(Role::Assignee));
        assert_eq!(Role::of("a", "a", "a"), Some(Role::Dual));
        assert_eq!(Role::of("c", "a", "b"), None);
    }

    #[test]
    fn permission_table_matches_matrix() {
        assert!(may_write(Role::Owner, FieldClass::Core));
        assert!(!may_write(Role::Assignee, FieldClass::Core));
        assert!(may_write(Role::Dual, FieldClass::Core));

        assert!(!may_write(Role::Owner, FieldClass::Categories));
        assert!(may_write(Role::Assignee, FieldClass::Categories));
        assert!(may_write(Role::Dual, FieldClass::Categories));

        assert!(may_write(Role::Owner, FieldClass::Completion));
        assert!(may_write(Role::Assignee, FieldClass::Completion));
        assert!(may_write(Role::Dual, FieldClass::Completion));
    }

    #[test]
    fn completion_recipient_is_the_other_party() {
        let now = Utc::now();
        let subtask = Subtask {
            id: "subtask_1".to_string(),
            task_id: "task_1".to_string(),
            title: "t".to_string(),
            description: None,
            owner_id: "user_owner".to_string(),
            assignee_id: "user_assignee".to_string(),
            is_completed: false,
            is_confirmed: true,
            is_rejected: false,
            categories: Vec::new(),
            links: Vec::new(),
            deadline: None,
            date_of_completion: None,
            created_at: now,
            updated_at: now,
        };
        assert_eq!(
            completion_recipient("user_assignee", &subtask),
            Some("user_owner")
        );
        assert_eq!(
            completion_recipient("user_owner", &subtask),
            Some("user_assignee")
        );

        let mut dual = subtask;
        dual.assignee_id = "user_owner".to_string();
        assert_eq!(completion_recipient("user_owner", &dual), None);
    }
}
