//! teamdeck notify commands: the persisted notification inbox.

use crate::error::Result;
use crate::notify::{Notification, NotificationKind};
use crate::output::{emit_success, HumanOutput};

use super::CliContext;

pub fn run_ls(ctx: &CliContext, unread_only: bool) -> Result<()> {
    let actor = ctx.actor()?;
    let notifications = ctx.relay().list_for_user(actor, unread_only)?;

    let mut human = HumanOutput::new(format!(
        "notify ls: {} notification(s)",
        notifications.len()
    ));
    for notification in &notifications {
        human.push_detail(format!(
            "{} [{}] {} by {}",
            notification.id,
            if notification.is_read { "read" } else { "unread" },
            kind_label(notification),
            notification.action_by_user_id
        ));
    }

    emit_success(ctx.out, "notify ls", &notifications, Some(&human))?;
    Ok(())
}

pub fn run_read(ctx: &CliContext, notification_id: &str) -> Result<()> {
    let actor = ctx.actor()?;
    let notification = ctx.relay().mark_read(actor, notification_id)?;

    let mut human = HumanOutput::new(format!("notify read: {notification_id}"));
    human.push_summary("kind", kind_label(&notification));
    human.push_summary("by", notification.action_by_user_id.clone());

    emit_success(ctx.out, "notify read", &notification, Some(&human))?;
    Ok(())
}

fn kind_label(notification: &Notification) -> &'static str {
    match notification.kind {
        NotificationKind::SubtaskConfirmed => "subtask confirmed",
        NotificationKind::SubtaskRejected => "subtask rejected",
        NotificationKind::SubtaskCompleted => "subtask completed",
    }
}
