//! teamdeck task commands: personal tasks, categories, and delegated subtasks.

use chrono::{DateTime, Utc};

use crate::delegation::{NewSubtask, NewTask, Subtask, SubtaskPatch, Task, TaskPatch};
use crate::error::{Error, Result};
use crate::output::{emit_success, HumanOutput};

use super::{CliContext, TaskCommands};

pub fn run(ctx: &CliContext, cmd: TaskCommands) -> Result<()> {
    let actor = ctx.actor()?;
    let tasks = ctx.tasks();

    match cmd {
        TaskCommands::New {
            title,
            description,
            categories,
            links,
            deadline,
        } => {
            let task = tasks.create_task(
                actor,
                NewTask {
                    title,
                    description,
                    categories,
                    links,
                    deadline: parse_deadline(deadline.as_deref())?,
                },
            )?;
            let human = task_summary("task new", &task);
            emit_success(ctx.out, "task new", &task, Some(&human))
        }
        TaskCommands::Ls => {
            let list = tasks.list_tasks(actor)?;
            let mut human = HumanOutput::new(format!("task ls: {} task(s)", list.len()));
            for task in &list {
                let state = if task.is_completed { "done" } else { "open" };
                human.push_detail(format!("{} [{}] {}", task.id, state, task.title));
            }
            emit_success(ctx.out, "task ls", &list, Some(&human))
        }
        TaskCommands::Show { task } => {
            let task = tasks.get_task(actor, &task)?;
            let human = task_summary("task show", &task);
            emit_success(ctx.out, "task show", &task, Some(&human))
        }
        TaskCommands::Edit {
            task,
            title,
            description,
            categories,
            links,
            deadline,
            completed,
        } => {
            let task = tasks.update_task(
                actor,
                &task,
                TaskPatch {
                    title,
                    description,
                    categories,
                    links,
                    deadline: parse_deadline(deadline.as_deref())?,
                    is_completed: completed,
                },
            )?;
            let human = task_summary("task edit", &task);
            emit_success(ctx.out, "task edit", &task, Some(&human))
        }
        TaskCommands::Rm { task } => {
            tasks.delete_task(actor, &task)?;
            let mut human = HumanOutput::new(format!("task rm: deleted {task}"));
            human.push_summary("id", task.clone());
            emit_success(ctx.out, "task rm", &Deleted { id: &task }, Some(&human))
        }
        TaskCommands::CategoryNew { title } => {
            let category = tasks.create_category(actor, &title)?;
            let mut human = HumanOutput::new(format!("task category-new: created {}", category.id));
            human.push_summary("id", category.id.clone());
            human.push_summary("title", category.title.clone());
            emit_success(ctx.out, "task category-new", &category, Some(&human))
        }
        TaskCommands::CategoryLs => {
            let list = tasks.list_categories(actor)?;
            let mut human =
                HumanOutput::new(format!("task category-ls: {} categor(ies)", list.len()));
            for category in &list {
                human.push_detail(format!("{} {}", category.id, category.title));
            }
            emit_success(ctx.out, "task category-ls", &list, Some(&human))
        }
        TaskCommands::CategoryRm { category } => {
            tasks.delete_category(actor, &category)?;
            let mut human = HumanOutput::new(format!("task category-rm: deleted {category}"));
            human.push_summary("id", category.clone());
            emit_success(
                ctx.out,
                "task category-rm",
                &Deleted { id: &category },
                Some(&human),
            )
        }
        TaskCommands::SubtaskNew {
            task,
            title,
            assignee,
            description,
            categories,
            links,
            deadline,
        } => {
            let subtask = tasks.create_subtask(
                actor,
                &task,
                NewSubtask {
                    title,
                    description,
                    assignee_id: assignee,
                    categories,
                    links,
                    deadline: parse_deadline(deadline.as_deref())?,
                },
            )?;
            let mut human = subtask_summary("task subtask-new", &subtask);
            if !subtask.is_confirmed {
                human.push_next_step(format!(
                    "the assignee confirms with: teamdeck task confirm {}",
                    subtask.id
                ));
            }
            emit_success(ctx.out, "task subtask-new", &subtask, Some(&human))
        }
        TaskCommands::SubtaskShow { subtask } => {
            let subtask = tasks.get_subtask(actor, &subtask)?;
            let human = subtask_summary("task subtask-show", &subtask);
            emit_success(ctx.out, "task subtask-show", &subtask, Some(&human))
        }
        TaskCommands::SubtaskEdit {
            subtask,
            title,
            description,
            categories,
            links,
            deadline,
            completed,
        } => {
            let subtask = tasks.update_subtask(
                actor,
                &subtask,
                SubtaskPatch {
                    title,
                    description,
                    categories,
                    links,
                    deadline: parse_deadline(deadline.as_deref())?,
                    is_completed: completed,
                },
            )?;
            let human = subtask_summary("task subtask-edit", &subtask);
            emit_success(ctx.out, "task subtask-edit", &subtask, Some(&human))
        }
        TaskCommands::SubtaskRm { subtask } => {
            tasks.remove_subtask(actor, &subtask)?;
            let mut human = HumanOutput::new(format!("task subtask-rm: removed {subtask}"));
            human.push_summary("id", subtask.clone());
            emit_success(
                ctx.out,
                "task subtask-rm",
                &Deleted { id: &subtask },
                Some(&human),
            )
        }
        TaskCommands::Confirm { subtask } => {
            let subtask = tasks.respond_subtask(actor, &subtask, true)?;
            let human = subtask_summary("task confirm", &subtask);
            emit_success(ctx.out, "task confirm", &subtask, Some(&human))
        }
        TaskCommands::Reject { subtask } => {
            let subtask = tasks.respond_subtask(actor, &subtask, false)?;
            let human = subtask_summary("task reject", &subtask);
            emit_success(ctx.out, "task reject", &subtask, Some(&human))
        }
        TaskCommands::Inbox => {
            let list = tasks.list_assigned(actor)?;
            let mut human = HumanOutput::new(format!("task inbox: {} subtask(s)", list.len()));
            for subtask in &list {
                human.push_detail(format!(
                    "{} [{}] {} (from {})",
                    subtask.id,
                    subtask_state(subtask),
                    subtask.title,
                    subtask.owner_id
                ));
            }
            emit_success(ctx.out, "task inbox", &list, Some(&human))
        }
    }
}

#[derive(serde::Serialize)]
struct Deleted<'a> {
    id: &'a str,
}

fn parse_deadline(raw: Option<&str>) -> Result<Option<DateTime<Utc>>> {
    match raw {
        None => Ok(None),
        Some(raw) => DateTime::parse_from_rfc3339(raw)
            .map(|parsed| Some(parsed.with_timezone(&Utc)))
            .map_err(|_| {
                Error::BadRequest(format!(
                    "invalid deadline '{raw}': expected an RFC 3339 timestamp"
                ))
            }),
    }
}

fn subtask_state(subtask: &Subtask) -> &'static str {
    if subtask.is_rejected {
        "rejected"
    } else if subtask.is_completed {
        "done"
    } else if subtask.is_confirmed {
        "confirmed"
    } else {
        "pending"
    }
}

fn task_summary(command: &str, task: &Task) -> HumanOutput {
    let mut human = HumanOutput::new(format!("{command}: {}", task.id));
    human.push_summary("title", task.title.clone());
    human.push_summary("completed", task.is_completed.to_string());
    human.push_summary("subtasks", task.subtasks.len().to_string());
    human
}

fn subtask_summary(command: &str, subtask: &Subtask) -> HumanOutput {
    let mut human = HumanOutput::new(format!("{command}: {}", subtask.id));
    human.push_summary("title", subtask.title.clone());
    human.push_summary("assignee", subtask.assignee_id.clone());
    human.push_summary("state", subtask_state(subtask));
    human
}
