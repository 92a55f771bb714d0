//! teamdeck board commands: boards, columns, tasks, and tags.

use crate::board::{Board, BoardTaskPatch, ColumnPatch, NewBoardTask, Tag, TagPatch};
use crate::error::Result;
use crate::output::{emit_success, HumanOutput};

use super::{BoardCommands, CliContext};

pub fn run(ctx: &CliContext, cmd: BoardCommands) -> Result<()> {
    let actor = ctx.actor()?;
    let boards = ctx.boards();

    match cmd {
        BoardCommands::New { title, description } => {
            let board = boards.create_board(actor, &title, description)?;
            let mut human = HumanOutput::new(format!("board new: created {}", board.id));
            human.push_summary("id", board.id.clone());
            human.push_summary("title", board.title.clone());
            human.push_next_step(format!("teamdeck board column-new {} <title>", board.id));
            emit_success(ctx.out, "board new", &board, Some(&human))
        }
        BoardCommands::Ls => {
            let list = boards.list_boards(actor)?;
            let mut human = HumanOutput::new(format!("board ls: {} board(s)", list.len()));
            for board in &list {
                human.push_detail(format!("{} {}", board.id, board.title));
            }
            emit_success(ctx.out, "board ls", &list, Some(&human))
        }
        BoardCommands::Show { board } => {
            let board = boards.get_board(actor, &board)?;
            let human = board_summary("board show", &board);
            emit_success(ctx.out, "board show", &board, Some(&human))
        }
        BoardCommands::Edit {
            board,
            title,
            description,
        } => {
            let board = boards.update_board(actor, &board, title, description)?;
            let human = board_summary("board edit", &board);
            emit_success(ctx.out, "board edit", &board, Some(&human))
        }
        BoardCommands::Rm { board } => {
            boards.delete_board(actor, &board)?;
            let mut human = HumanOutput::new(format!("board rm: deleted {board}"));
            human.push_summary("id", board.clone());
            emit_success(ctx.out, "board rm", &Deleted { id: &board }, Some(&human))
        }
        BoardCommands::Invite { board, user } => {
            let board = boards.add_member(actor, &board, &user)?;
            let mut human = HumanOutput::new(format!("board invite: added {user}"));
            human.push_summary("members", board.member_ids.len().to_string());
            emit_success(ctx.out, "board invite", &board, Some(&human))
        }
        BoardCommands::Kick { board, user } => {
            let board = boards.remove_member(actor, &board, &user)?;
            let mut human = HumanOutput::new(format!("board kick: removed {user}"));
            human.push_summary("members", board.member_ids.len().to_string());
            emit_success(ctx.out, "board kick", &board, Some(&human))
        }
        BoardCommands::Leave { board } => {
            boards.leave(actor, &board)?;
            let mut human = HumanOutput::new(format!("board leave: left {board}"));
            human.push_summary("id", board.clone());
            emit_success(ctx.out, "board leave", &Deleted { id: &board }, Some(&human))
        }
        BoardCommands::ColumnNew { board, title } => {
            let board = boards.create_column(actor, &board, &title)?;
            let human = board_summary("board column-new", &board);
            emit_success(ctx.out, "board column-new", &board, Some(&human))
        }
        BoardCommands::ColumnEdit {
            board,
            column,
            title,
            order,
        } => {
            let board = boards.update_column(actor, &board, &column, ColumnPatch { title, order })?;
            let human = board_summary("board column-edit", &board);
            emit_success(ctx.out, "board column-edit", &board, Some(&human))
        }
        BoardCommands::ColumnRm { board, column } => {
            let board = boards.delete_column(actor, &board, &column)?;
            let human = board_summary("board column-rm", &board);
            emit_success(ctx.out, "board column-rm", &board, Some(&human))
        }
        BoardCommands::TaskNew {
            board,
            column,
            title,
            description,
            assignees,
            tags,
        } => {
            let board = boards.create_task(
                actor,
                &board,
                &column,
                NewBoardTask {
                    title,
                    description,
                    assignee_ids: assignees,
                    tag_ids: tags,
                },
            )?;
            let human = board_summary("board task-new", &board);
            emit_success(ctx.out, "board task-new", &board, Some(&human))
        }
        BoardCommands::TaskEdit {
            board,
            column,
            task,
            title,
            description,
            assignees,
            tags,
            order,
        } => {
            let board = boards.update_task(
                actor,
                &board,
                &column,
                &task,
                BoardTaskPatch {
                    title,
                    description,
                    assignee_ids: assignees,
                    tag_ids: tags,
                    order,
                },
            )?;
            let human = board_summary("board task-edit", &board);
            emit_success(ctx.out, "board task-edit", &board, Some(&human))
        }
        BoardCommands::TaskRm {
            board,
            column,
            task,
        } => {
            let board = boards.delete_task(actor, &board, &column, &task)?;
            let human = board_summary("board task-rm", &board);
            emit_success(ctx.out, "board task-rm", &board, Some(&human))
        }
        BoardCommands::TaskMove {
            board,
            from,
            to,
            task,
            order,
        } => {
            let board = boards.move_task(actor, &board, &from, &to, &task, order)?;
            let human = board_summary("board task-move", &board);
            emit_success(ctx.out, "board task-move", &board, Some(&human))
        }
        BoardCommands::TagNew {
            board,
            title,
            color,
        } => {
            let tag = boards.create_tag(actor, &board, &title, &color)?;
            let human = tag_summary("board tag-new", &tag);
            emit_success(ctx.out, "board tag-new", &tag, Some(&human))
        }
        BoardCommands::TagLs { board } => {
            let tags = boards.get_tags(actor, &board)?;
            let mut human = HumanOutput::new(format!("board tag-ls: {} tag(s)", tags.len()));
            for tag in &tags {
                human.push_detail(format!("{} {} ({})", tag.id, tag.title, tag.color));
            }
            emit_success(ctx.out, "board tag-ls", &tags, Some(&human))
        }
        BoardCommands::TagEdit {
            board,
            tag,
            title,
            color,
        } => {
            let tag = boards.update_tag(actor, &board, &tag, TagPatch { title, color })?;
            let human = tag_summary("board tag-edit", &tag);
            emit_success(ctx.out, "board tag-edit", &tag, Some(&human))
        }
        BoardCommands::TagRm { board, tag } => {
            let board = boards.delete_tag(actor, &board, &tag)?;
            let human = board_summary("board tag-rm", &board);
            emit_success(ctx.out, "board tag-rm", &board, Some(&human))
        }
    }
}

#[derive(serde::Serialize)]
struct Deleted<'a> {
    id: &'a str,
}

fn board_summary(command: &str, board: &Board) -> HumanOutput {
    let tasks: usize = board.columns.iter().map(|column| column.tasks.len()).sum();
    let mut human = HumanOutput::new(format!("{command}: {}", board.id));
    human.push_summary("title", board.title.clone());
    human.push_summary("members", board.member_ids.len().to_string());
    human.push_summary("columns", board.columns.len().to_string());
    human.push_summary("tasks", tasks.to_string());
    human
}

fn tag_summary(command: &str, tag: &Tag) -> HumanOutput {
    let mut human = HumanOutput::new(format!("{command}: {}", tag.id));
    human.push_summary("title", tag.title.clone());
    human.push_summary("color", tag.color.clone());
    human
}
