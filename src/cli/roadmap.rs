//! teamdeck roadmap commands: quarters, milestones, categories, rows, tasks.

use crate::error::{Error, Result};
use crate::output::{emit_success, HumanOutput};
use crate::roadmap::{NewRoadmapTask, Roadmap, RoadmapTaskPatch, RoadmapTaskStatus};

use super::{CliContext, RoadmapCommands};

pub fn run(ctx: &CliContext, cmd: RoadmapCommands) -> Result<()> {
    let actor = ctx.actor()?;
    let roadmaps = ctx.roadmaps();

    match cmd {
        RoadmapCommands::New { title, description } => {
            let roadmap = roadmaps.create_roadmap(actor, &title, description)?;
            let mut human = HumanOutput::new(format!("roadmap new: created {}", roadmap.id));
            human.push_summary("id", roadmap.id.clone());
            human.push_summary("title", roadmap.title.clone());
            human.push_next_step(format!(
                "teamdeck roadmap category-new {} <title>",
                roadmap.id
            ));
            emit_success(ctx.out, "roadmap new", &roadmap, Some(&human))
        }
        RoadmapCommands::Ls => {
            let list = roadmaps.list_roadmaps(actor)?;
            let mut human = HumanOutput::new(format!("roadmap ls: {} roadmap(s)", list.len()));
            for roadmap in &list {
                human.push_detail(format!("{} {}", roadmap.id, roadmap.title));
            }
            emit_success(ctx.out, "roadmap ls", &list, Some(&human))
        }
        RoadmapCommands::Show { roadmap } => {
            let roadmap = roadmaps.get_roadmap(actor, &roadmap)?;
            let human = roadmap_summary("roadmap show", &roadmap);
            emit_success(ctx.out, "roadmap show", &roadmap, Some(&human))
        }
        RoadmapCommands::Edit {
            roadmap,
            title,
            description,
        } => {
            let roadmap = roadmaps.update_roadmap(actor, &roadmap, title, description)?;
            let human = roadmap_summary("roadmap edit", &roadmap);
            emit_success(ctx.out, "roadmap edit", &roadmap, Some(&human))
        }
        RoadmapCommands::Rm { roadmap } => {
            roadmaps.delete_roadmap(actor, &roadmap)?;
            let mut human = HumanOutput::new(format!("roadmap rm: deleted {roadmap}"));
            human.push_summary("id", roadmap.clone());
            emit_success(ctx.out, "roadmap rm", &Deleted { id: &roadmap }, Some(&human))
        }
        RoadmapCommands::Invite { roadmap, user } => {
            let roadmap = roadmaps.add_member(actor, &roadmap, &user)?;
            let mut human = HumanOutput::new(format!("roadmap invite: added {user}"));
            human.push_summary("members", roadmap.member_ids.len().to_string());
            emit_success(ctx.out, "roadmap invite", &roadmap, Some(&human))
        }
        RoadmapCommands::Kick { roadmap, user } => {
            let roadmap = roadmaps.remove_member(actor, &roadmap, &user)?;
            let mut human = HumanOutput::new(format!("roadmap kick: removed {user}"));
            human.push_summary("members", roadmap.member_ids.len().to_string());
            emit_success(ctx.out, "roadmap kick", &roadmap, Some(&human))
        }
        RoadmapCommands::Leave { roadmap } => {
            roadmaps.leave(actor, &roadmap)?;
            let mut human = HumanOutput::new(format!("roadmap leave: left {roadmap}"));
            human.push_summary("id", roadmap.clone());
            emit_success(ctx.out, "roadmap leave", &Deleted { id: &roadmap }, Some(&human))
        }
        RoadmapCommands::QuarterNew { roadmap, title } => {
            let roadmap = roadmaps.create_quarter(actor, &roadmap, &title)?;
            let human = roadmap_summary("roadmap quarter-new", &roadmap);
            emit_success(ctx.out, "roadmap quarter-new", &roadmap, Some(&human))
        }
        RoadmapCommands::QuarterEdit {
            roadmap,
            quarter,
            title,
            order,
        } => {
            let roadmap = roadmaps.update_quarter(actor, &roadmap, &quarter, title, order)?;
            let human = roadmap_summary("roadmap quarter-edit", &roadmap);
            emit_success(ctx.out, "roadmap quarter-edit", &roadmap, Some(&human))
        }
        RoadmapCommands::QuarterRm { roadmap, quarter } => {
            let roadmap = roadmaps.delete_quarter(actor, &roadmap, &quarter)?;
            let human = roadmap_summary("roadmap quarter-rm", &roadmap);
            emit_success(ctx.out, "roadmap quarter-rm", &roadmap, Some(&human))
        }
        RoadmapCommands::MilestoneNew { roadmap, title } => {
            let roadmap = roadmaps.create_milestone(actor, &roadmap, &title)?;
            let human = roadmap_summary("roadmap milestone-new", &roadmap);
            emit_success(ctx.out, "roadmap milestone-new", &roadmap, Some(&human))
        }
        RoadmapCommands::MilestoneEdit {
            roadmap,
            milestone,
            title,
            order,
        } => {
            let roadmap = roadmaps.update_milestone(actor, &roadmap, &milestone, title, order)?;
            let human = roadmap_summary("roadmap milestone-edit", &roadmap);
            emit_success(ctx.out, "roadmap milestone-edit", &roadmap, Some(&human))
        }
        RoadmapCommands::MilestoneRm { roadmap, milestone } => {
            let roadmap = roadmaps.delete_milestone(actor, &roadmap, &milestone)?;
            let human = roadmap_summary("roadmap milestone-rm", &roadmap);
            emit_success(ctx.out, "roadmap milestone-rm", &roadmap, Some(&human))
        }
        RoadmapCommands::CategoryNew { roadmap, title } => {
            let roadmap = roadmaps.create_category(actor, &roadmap, &title)?;
            let human = roadmap_summary("roadmap category-new", &roadmap);
            emit_success(ctx.out, "roadmap category-new", &roadmap, Some(&human))
        }
        RoadmapCommands::CategoryEdit {
            roadmap,
            category,
            title,
            order,
        } => {
            let roadmap = roadmaps.update_category(actor, &roadmap, &category, title, order)?;
            let human = roadmap_summary("roadmap category-edit", &roadmap);
            emit_success(ctx.out, "roadmap category-edit", &roadmap, Some(&human))
        }
        RoadmapCommands::CategoryRm { roadmap, category } => {
            let roadmap = roadmaps.delete_category(actor, &roadmap, &category)?;
            let human = roadmap_summary("roadmap category-rm", &roadmap);
            emit_success(ctx.out, "roadmap category-rm", &roadmap, Some(&human))
        }
        RoadmapCommands::RowNew {
            roadmap,
            category,
            title,
        } => {
            let roadmap = roadmaps.create_row(actor, &roadmap, &category, &title)?;
            let human = roadmap_summary("roadmap row-new", &roadmap);
            emit_success(ctx.out, "roadmap row-new", &roadmap, Some(&human))
        }
        RoadmapCommands::RowEdit {
            roadmap,
            category,
            row,
            title,
            order,
        } => {
            let roadmap = roadmaps.update_row(actor, &roadmap, &category, &row, title, order)?;
            let human = roadmap_summary("roadmap row-edit", &roadmap);
            emit_success(ctx.out, "roadmap row-edit", &roadmap, Some(&human))
        }
        RoadmapCommands::RowRm {
            roadmap,
            category,
            row,
        } => {
            let roadmap = roadmaps.delete_row(actor, &roadmap, &category, &row)?;
            let human = roadmap_summary("roadmap row-rm", &roadmap);
            emit_success(ctx.out, "roadmap row-rm", &roadmap, Some(&human))
        }
        RoadmapCommands::TaskNew {
            roadmap,
            category,
            row,
            title,
            progress,
            start,
            end,
            status,
        } => {
            let roadmap = roadmaps.create_task(
                actor,
                &roadmap,
                &category,
                &row,
                NewRoadmapTask {
                    title,
                    progress,
                    start,
                    end,
                    status: parse_status(&status)?,
                },
            )?;
            let human = roadmap_summary("roadmap task-new", &roadmap);
            emit_success(ctx.out, "roadmap task-new", &roadmap, Some(&human))
        }
        RoadmapCommands::TaskEdit {
            roadmap,
            category,
            row,
            task,
            title,
            progress,
            start,
            end,
            status,
        } => {
            let status = match status {
                Some(raw) => Some(parse_status(&raw)?),
                None => None,
            };
            let roadmap = roadmaps.update_task(
                actor,
                &roadmap,
                &category,
                &row,
                &task,
                RoadmapTaskPatch {
                    title,
                    progress,
                    start,
                    end,
                    status,
                },
            )?;
            let human = roadmap_summary("roadmap task-edit", &roadmap);
            emit_success(ctx.out, "roadmap task-edit", &roadmap, Some(&human))
        }
        RoadmapCommands::TaskRm {
            roadmap,
            category,
            row,
            task,
        } => {
            let roadmap = roadmaps.delete_task(actor, &roadmap, &category, &row, &task)?;
            let human = roadmap_summary("roadmap task-rm", &roadmap);
            emit_success(ctx.out, "roadmap task-rm", &roadmap, Some(&human))
        }
        RoadmapCommands::TaskMove {
            roadmap,
            from_category,
            from_row,
            task,
            to_category,
            to_row,
            start,
            end,
        } => {
            let roadmap = roadmaps.move_task(
                actor,
                &roadmap,
                &from_category,
                &from_row,
                &task,
                &to_category,
                &to_row,
                start,
                end,
            )?;
            let human = roadmap_summary("roadmap task-move", &roadmap);
            emit_success(ctx.out, "roadmap task-move", &roadmap, Some(&human))
        }
    }
}

#[derive(serde::Serialize)]
struct Deleted<'a> {
    id: &'a str,
}

fn parse_status(raw: &str) -> Result<RoadmapTaskStatus> {
    match raw.to_lowercase().as_str() {
        "planned" => Ok(RoadmapTaskStatus::Planned),
        "in_progress" | "in-progress" => Ok(RoadmapTaskStatus::InProgress),
        "done" => Ok(RoadmapTaskStatus::Done),
        _ => Err(Error::BadRequest(format!(
            "invalid status '{raw}': must be planned, in_progress, or done"
        ))),
    }
}

fn roadmap_summary(command: &str, roadmap: &Roadmap) -> HumanOutput {
    let rows: usize = roadmap
        .categories
        .iter()
        .map(|category| category.rows.len())
        .sum();
    let mut human = HumanOutput::new(format!("{command}: {}", roadmap.id));
    human.push_summary("title", roadmap.title.clone());
    human.push_summary("members", roadmap.member_ids.len().to_string());
    human.push_summary("quarters", roadmap.quarters.len().to_string());
    human.push_summary("categories", roadmap.categories.len().to_string());
    human.push_summary("rows", rows.to_string());
    human
}
