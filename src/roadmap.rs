//! Roadmap aggregate manager.
//!
//! Structurally a sibling of the board manager: one roadmap document owns its
//! quarters, milestones, and category rows, and every mutation is a locked
//! whole-document read-modify-write. Roadmap tasks differ from board tasks in
//! that they are positioned by a `(start, end)` range instead of a renumbered
//! order, so moving one never shifts its siblings.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::LimitsConfig;
use crate::error::{Error, Result};
use crate::id;
use crate::ordering::{self, Ordered};
use crate::storage::Storage;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Roadmap {
    pub id: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub owner_id: String,
    pub member_ids: Vec<String>,
    pub quarters: Vec<Quarter>,
    pub milestones: Vec<Milestone>,
    pub categories: Vec<Category>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Roadmap {
    pub fn is_member(&self, user_id: &str) -> bool {
        self.member_ids.iter().any(|member| member == user_id)
    }

    fn category_mut(&mut self, category_id: &str) -> Result<&mut Category> {
        self.categories
            .iter_mut()
            .find(|category| category.id == category_id)
            .ok_or_else(|| Error::NotFound(format!("category not found: {category_id}")))
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Quarter {
    pub id: String,
    pub title: String,
    pub order: usize,
}

impl Ordered for Quarter {
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
pub struct Milestone {
    pub id: String,
    pub title: String,
    pub order: usize,
}

impl Ordered for Milestone {
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
pub struct Category {
    pub id: String,
    pub title: String,
    pub order: usize,
    pub rows: Vec<Row>,
}

impl Ordered for Category {
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
pub struct Row {
    pub id: String,
    pub title: String,
    pub order: usize,
    pub tasks: Vec<RoadmapTask>,
}

impl Ordered for Row {
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

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RoadmapTaskStatus {
    Planned,
    InProgress,
    Done,
}

/// A time-ranged task inside a roadmap row
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoadmapTask {
    pub id: String,
    pub title: String,
    /// Completion percentage, 0..=100
    pub progress: u8,
    pub start: i64,
    pub end: i64,
    pub status: RoadmapTaskStatus,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewRoadmapTask {
    pub title: String,
    #[serde(default)]
    pub progress: u8,
    pub start: i64,
    pub end: i64,
    #[serde(default = "default_status")]
    pub status: RoadmapTaskStatus,
}

fn default_status() -> RoadmapTaskStatus {
    RoadmapTaskStatus::Planned
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RoadmapTaskPatch {
    pub title: Option<String>,
    pub progress: Option<u8>,
    pub start: Option<i64>,
    pub end: Option<i64>,
    pub status: Option<RoadmapTaskStatus>,
}

/// Roadmap operations over the storage layer
#[derive(Debug, Clone)]
pub struct RoadmapService {
    storage: Storage,
    limits: LimitsConfig,
}

impl RoadmapService {
    pub fn new(storage: Storage, limits: LimitsConfig) -> Self {
        Self { storage, limits }
    }

    // =========================================================================
    // Roadmaps and membership
    // =========================================================================

    pub fn create_roadmap(
        &self,
        actor_id: &str,
        title: &str,
        description: Option<String>,
    ) -> Result<Roadmap> {
        let title = non_empty(title, "title")?;
        let now = Utc::now();
        let roadmap = Roadmap {
            id: id::new_id("roadmap"),
            title,
            description,
            owner_id: actor_id.to_string(),
            member_ids: vec![actor_id.to_string()],
            quarters: Vec::new(),
            milestones: Vec::new(),
            categories: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        self.storage
            .write_json(&self.storage.roadmap_file(&roadmap.id), &roadmap)?;
        info!(roadmap_id = %roadmap.id, owner = %actor_id, "roadmap created");
        Ok(roadmap)
    }

    pub fn get_roadmap(&self, actor_id: &str, roadmap_id: &str) -> Result<Roadmap> {
        let roadmap: Roadmap = self.storage.read_entity(
            &self.storage.roadmap_file(roadmap_id),
            &format!("roadmap not found: {roadmap_id}"),
        )?;
        require_member(&roadmap, actor_id)?;
        Ok(roadmap)
    }

    pub fn list_roadmaps(&self, actor_id: &str) -> Result<Vec<Roadmap>> {
        let mut roadmaps: Vec<Roadmap> =
            self.storage.list_entities(&self.storage.roadmaps_dir())?;
        roadmaps.retain(|roadmap| roadmap.is_member(actor_id));
        Ok(roadmaps)
    }

    pub fn update_roadmap(
        &self,
        actor_id: &str,
        roadmap_id: &str,
        title: Option<String>,
        description: Option<String>,
    ) -> Result<Roadmap> {
        self.mutate(roadmap_id, |roadmap| {
            require_owner(roadmap, actor_id)?;
            if let Some(title) = title {
                roadmap.title = non_empty(&title, "title")?;
            }
            if let Some(description) = description {
                roadmap.description = Some(description);
            }
            Ok(())
        })
    }

    pub fn delete_roadmap(&self, actor_id: &str, roadmap_id: &str) -> Result<()> {
        let roadmap = self.get_roadmap(actor_id, roadmap_id)?;
        require_owner(&roadmap, actor_id)?;
        std::fs::remove_file(self.storage.roadmap_file(roadmap_id))?;
        info!(roadmap_id, "roadmap deleted");
        Ok(())
    }

    pub fn add_member(
        &self,
        actor_id: &str,
        roadmap_id: &str,
        target_id: &str,
    ) -> Result<Roadmap> {
        if !self.storage.user_exists(target_id)? {
            return Err(Error::NotFound(format!("user not found: {target_id}")));
        }
        let max_members = self.limits.max_members;
        self.mutate(roadmap_id, |roadmap| {
            require_owner(roadmap, actor_id)?;
            if roadmap.is_member(target_id) {
                return Err(Error::Conflict(format!(
                    "user is already a member: {target_id}"
                )));
            }
            if roadmap.member_ids.len() >= max_members {
                return Err(Error::CapacityExceeded {
                    what: "members",
                    max: max_members,
                });
            }
            roadmap.member_ids.push(target_id.to_string());
            Ok(())
        })
    }

    pub fn remove_member(
        &self,
        actor_id: &str,
        roadmap_id: &str,
        target_id: &str,
    ) -> Result<Roadmap> {
        self.mutate(roadmap_id, |roadmap| {
            require_owner(roadmap, actor_id)?;
            remove_membership(roadmap, target_id)
        })
    }

    pub fn leave(&self, actor_id: &str, roadmap_id: &str) -> Result<()> {
        self.mutate(roadmap_id, |roadmap| {
            require_member(roadmap, actor_id)?;
            remove_membership(roadmap, actor_id)
        })?;
        Ok(())
    }

    // =========================================================================
    // Quarters and milestones
    // =========================================================================

    pub fn create_quarter(&self, actor_id: &str, roadmap_id: &str, title: &str) -> Result<Roadmap> {
        let title = non_empty(title, "title")?;
        let max = self.limits.max_quarters;
        self.mutate(roadmap_id, |roadmap| {
            require_member(roadmap, actor_id)?;
            let quarter = Quarter {
                id: id::new_id("quarter"),
                title,
                order: 0,
            };
            ordering::insert_at_end(&mut roadmap.quarters, quarter, max, "quarters")
        })
    }

    pub fn update_quarter(
        &self,
        actor_id: &str,
        roadmap_id: &str,
        quarter_id: &str,
        title: Option<String>,
        order: Option<usize>,
    ) -> Result<Roadmap> {
        self.mutate(roadmap_id, |roadmap| {
            require_member(roadmap, actor_id)?;
            if let Some(order) = order {
                ordering::reorder(&mut roadmap.quarters, quarter_id, order)?;
            }
            if let Some(title) = title {
                let quarter = roadmap
                    .quarters
                    .iter_mut()
                    .find(|quarter| quarter.id == quarter_id)
                    .ok_or_else(|| Error::NotFound(format!("quarter not found: {quarter_id}")))?;
                quarter.title = non_empty(&title, "title")?;
            }
            Ok(())
        })
    }

    pub fn delete_quarter(
        &self,
        actor_id: &str,
        roadmap_id: &str,
        quarter_id: &str,
    ) -> Result<Roadmap> {
        self.mutate(roadmap_id, |roadmap| {
            require_member(roadmap, actor_id)?;
            ordering::remove(&mut roadmap.quarters, quarter_id)?;
            Ok(())
        })
    }

    pub fn create_milestone(
        &self,
        actor_id: &str,
        roadmap_id: &str,
        title: &str,
    ) -> Result<Roadmap> {
        let title = non_empty(title, "title")?;
        let max = self.limits.max_milestones;
        self.mutate(roadmap_id, |roadmap| {
            require_member(roadmap, actor_id)?;
            let milestone = Milestone {
                id: id::new_id("milestone"),
                title,
                order: 0,
            };
            ordering::insert_at_end(&mut roadmap.milestones, milestone, max, "milestones")
        })
    }

    pub fn update_milestone(
        &self,
        actor_id: &str,
        roadmap_id: &str,
        milestone_id: &str,
        title: Option<String>,
        order: Option<usize>,
    ) -> Result<Roadmap> {
        self.mutate(roadmap_id, |roadmap| {
            require_member(roadmap, actor_id)?;
            if let Some(order) = order {
                ordering::reorder(&mut roadmap.milestones, milestone_id, order)?;
            }
            if let Some(title) = title {
                let milestone = roadmap
                    .milestones
                    .iter_mut()
                    .find(|milestone| milestone.id == milestone_id)
                    .ok_or_else(|| {
                        Error::NotFound(format!("milestone not found: {milestone_id}"))
                    })?;
                milestone.title = non_empty(&title, "title")?;
            }
            Ok(())
        })
    }

    pub fn delete_milestone(
        &self,
        actor_id: &str,
        roadmap_id: &str,
        milestone_id: &str,
    ) -> Result<Roadmap> {
        self.mutate(roadmap_id, |roadmap| {
            require_member(roadmap, actor_id)?;
            ordering::remove(&mut roadmap.milestones, milestone_id)?;
            Ok(())
        })
    }

    // =========================================================================
    // Categories and rows
    // =========================================================================

    pub fn create_category(
        &self,
        actor_id: &str,
        roadmap_id: &str,
        title: &str,
    ) -> Result<Roadmap> {
        let title = non_empty(title, "title")?;
        let max = self.limits.max_categories;
        self.mutate(roadmap_id, |roadmap| {
            require_member(roadmap, actor_id)?;
            let category = Category {
                id: id::new_id("rcat"),
                title,
                order: 0,
                rows: Vec::new(),
            };
            ordering::insert_at_end(&mut roadmap.categories, category, max, "categories")
        })
    }

    pub fn update_category(
        &self,
        actor_id: &str,
        roadmap_id: &str,
        category_id: &str,
        title: Option<String>,
        order: Option<usize>,
    ) -> Result<Roadmap> {
        self.mutate(roadmap_id, |roadmap| {
            require_member(roadmap, actor_id)?;
            if let Some(order) = order {
                ordering::reorder(&mut roadmap.categories, category_id, order)?;
            }
            if let Some(title) = title {
                let category = roadmap.category_mut(category_id)?;
                category.title = non_empty(&title, "title")?;
            }
            Ok(())
        })
    }

    pub fn delete_category(
        &self,
        actor_id: &str,
        roadmap_id: &str,
        category_id: &str,
    ) -> Result<Roadmap> {
        self.mutate(roadmap_id, |roadmap| {
            require_member(roadmap, actor_id)?;
            ordering::remove(&mut roadmap.categories, category_id)?;
            Ok(())
        })
    }

    pub fn create_row(
        &self,
        actor_id: &str,
        roadmap_id: &str,
        category_id: &str,
        title: &str,
    ) -> Result<Roadmap> {
        let title = non_empty(title, "title")?;
        let max = self.limits.max_rows_per_category;
        self.mutate(roadmap_id, |roadmap| {
            require_member(roadmap, actor_id)?;
            let category = roadmap.category_mut(category_id)?;
            let row = Row {
                id: id::new_id("row"),
                title,
                order: 0,
                tasks: Vec::new(),
            };
            ordering::insert_at_end(&mut category.rows, row, max, "rows")
        })
    }

    pub fn update_row(
        &self,
        actor_id: &str,
        roadmap_id: &str,
        category_id: &str,
        row_id: &str,
        title: Option<String>,
        order: Option<usize>,
    ) -> Result<Roadmap> {
        self.mutate(roadmap_id, |roadmap| {
            require_member(roadmap, actor_id)?;
            let category = roadmap.category_mut(category_id)?;
            if let Some(order) = order {
                ordering::reorder(&mut category.rows, row_id, order)?;
            }
            if let Some(title) = title {
                let row = category
                    .rows
                    .iter_mut()
                    .find(|row| row.id == row_id)
                    .ok_or_else(|| Error::NotFound(format!("row not found: {row_id}")))?;
                row.title = non_empty(&title, "title")?;
            }
            Ok(())
        })
    }

    pub fn delete_row(
        &self,
        actor_id: &str,
        roadmap_id: &str,
        category_id: &str,
        row_id: &str,
    ) -> Result<Roadmap> {
        self.mutate(roadmap_id, |roadmap| {
            require_member(roadmap, actor_id)?;
            let category = roadmap.category_mut(category_id)?;
            ordering::remove(&mut category.rows, row_id)?;
            Ok(())
        })
    }

    // =========================================================================
    // Roadmap tasks
    // =========================================================================

    pub fn create_task(
        &self,
        actor_id: &str,
        roadmap_id: &str,
        category_id: &str,
        row_id: &str,
        new_task: NewRoadmapTask,
    ) -> Result<Roadmap> {
        let title = non_empty(&new_task.title, "title")?;
        validate_range(new_task.start, new_task.end)?;
        validate_progress(new_task.progress)?;
        let max = self.limits.max_tasks_per_row;
        self.mutate(roadmap_id, |roadmap| {
            require_member(roadmap, actor_id)?;
            let row = row_mut(roadmap.category_mut(category_id)?, row_id)?;
            if row.tasks.len() >= max {
                return Err(Error::CapacityExceeded {
                    what: "tasks per row",
                    max,
                });
            }
            row.tasks.push(RoadmapTask {
                id: id::new_id("rtask"),
                title,
                progress: new_task.progress,
                start: new_task.start,
                end: new_task.end,
                status: new_task.status,
            });
            Ok(())
        })
    }

    pub fn update_task(
        &self,
        actor_id: &str,
        roadmap_id: &str,
        category_id: &str,
        row_id: &str,
        task_id: &str,
        patch: RoadmapTaskPatch,
    ) -> Result<Roadmap> {
        if let Some(progress) = patch.progress {
            validate_progress(progress)?;
        }
        self.mutate(roadmap_id, |roadmap| {
            require_member(roadmap, actor_id)?;
            let row = row_mut(roadmap.category_mut(category_id)?, row_id)?;
            let task = task_mut(row, task_id)?;
            if let Some(title) = patch.title {
                task.title = non_empty(&title, "title")?;
            }
            if let Some(progress) = patch.progress {
                task.progress = progress;
            }
            if let Some(start) = patch.start {
                task.start = start;
            }
            if let Some(end) = patch.end {
                task.end = end;
            }
            validate_range(task.start, task.end)?;
            if let Some(status) = patch.status {
                task.status = status;
            }
            Ok(())
        })
    }

    pub fn delete_task(
        &self,
        actor_id: &str,
        roadmap_id: &str,
        category_id: &str,
        row_id: &str,
        task_id: &str,
    ) -> Result<Roadmap> {
        self.mutate(roadmap_id, |roadmap| {
            require_member(roadmap, actor_id)?;
            let row = row_mut(roadmap.category_mut(category_id)?, row_id)?;
            let before = row.tasks.len();
            row.tasks.retain(|task| task.id != task_id);
            if row.tasks.len() == before {
                return Err(Error::NotFound(format!("task not found: {task_id}")));
            }
            Ok(())
        })
    }

    /// Move a task to another category/row and re-range it. Range-positioned
    /// tasks carry no order index, so nothing else shifts.
    pub fn move_task(
        &self,
        actor_id: &str,
        roadmap_id: &str,
        from_category_id: &str,
        from_row_id: &str,
        task_id: &str,
        to_category_id: &str,
        to_row_id: &str,
        start: i64,
        end: i64,
    ) -> Result<Roadmap> {
        validate_range(start, end)?;
        let max = self.limits.max_tasks_per_row;
        self.mutate(roadmap_id, |roadmap| {
            require_member(roadmap, actor_id)?;

            let source = row_mut(roadmap.category_mut(from_category_id)?, from_row_id)?;
            let position = source
                .tasks
                .iter()
                .position(|task| task.id == task_id)
                .ok_or_else(|| Error::NotFound(format!("task not found: {task_id}")))?;

            // Destination must exist and have room before the task is pulled
            // out of its source row.
            {
                let dest = row_mut(roadmap.category_mut(to_category_id)?, to_row_id)?;
                let same_row = from_category_id == to_category_id && from_row_id == to_row_id;
                if !same_row && dest.tasks.len() >= max {
                    return Err(Error::CapacityExceeded {
                        what: "tasks per row",
                        max,
                    });
                }
            }

            let source = row_mut(roadmap.category_mut(from_category_id)?, from_row_id)?;
            let mut task = source.tasks.remove(position);
            task.start = start;
            task.end = end;

            let dest = row_mut(roadmap.category_mut(to_category_id)?, to_row_id)?;
            dest.tasks.push(task);
            debug!(roadmap_id, task_id, to_category_id, to_row_id, "roadmap task moved");
            Ok(())
        })
    }

    fn mutate<F>(&self, roadmap_id: &str, mutator: F) -> Result<Roadmap>
    where
        F: FnOnce(&mut Roadmap) -> Result<()>,
    {
        let path = self.storage.roadmap_file(roadmap_id);
        self.storage.update_entity::<Roadmap, _, _>(
            &path,
            &format!("roadmap not found: {roadmap_id}"),
            |roadmap| {
                mutator(roadmap)?;
                roadmap.touch();
                Ok(roadmap.clone())
            },
        )
    }
}

fn require_member(roadmap: &Roadmap, actor_id: &str) -> Result<()> {
    if roadmap.is_member(actor_id) {
        Ok(())
    } else {
        Err(Error::NotFound(format!("roadmap not found: {}", roadmap.id)))
    }
}

fn require_owner(roadmap: &Roadmap, actor_id: &str) -> Result<()> {
    if roadmap.owner_id == actor_id {
        Ok(())
    } else {
        Err(Error::NotFound(format!("roadmap not found: {}", roadmap.id)))
    }
}

fn remove_membership(roadmap: &mut Roadmap, target_id: &str) -> Result<()> {
    if target_id == roadmap.owner_id {
        return Err(Error::BadRequest(
            "the roadmap owner cannot be removed".to_string(),
        ));
    }
    if !roadmap.is_member(target_id) {
        return Err(Error::NotFound(format!("member not found: {target_id}")));
    }
    roadmap.member_ids.retain(|member| member != target_id);
    Ok(())
}

fn row_mut<'a>(category: &'a mut Category, row_id: &str) -> Result<&'a mut Row> {
    category
        .rows
        .iter_mut()
        .find(|row| row.id == row_id)
        .ok_or_else(|| Error::NotFound(format!("row not found: {row_id}")))
}

fn task_mut<'a>(row: &'a mut Row, task_id: &str) -> Result<&'a mut RoadmapTask> {
    row.tasks
        .iter_mut()
        .find(|task| task.id == task_id)
        .ok_or_else(|| Error::NotFound(format!("task not found: {task_id}")))
}

fn validate_range(start: i64, end: i64) -> Result<()> {
    if end < start {
        return Err(Error::BadRequest(format!(
            "task range end {end} precedes start {start}"
        )));
    }
    Ok(())
}

fn validate_progress(progress: u8) -> Result<()> {
    if progress > 100 {
        return Err(Error::BadRequest(format!(
            "progress must be 0-100, got {progress}"
        )));
    }
    Ok(())
}

fn non_empty(value: &str, field: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(Error::BadRequest(format!("{field} cannot be empty")));
    }
    Ok(trimmed.to_string())
}
