//! teamdeck user commands: the registry of known user ids.

use crate::error::Result;
use crate::output::{emit_success, HumanOutput};
use crate::storage::UserRegistry;

use super::CliContext;

pub fn run_add(ctx: &CliContext, id: &str, name: &str) -> Result<()> {
    ctx.storage.add_user(id, name)?;

    #[derive(serde::Serialize)]
    struct AddReport<'a> {
        id: &'a str,
        name: &'a str,
    }

    let mut human = HumanOutput::new(format!("user add: registered {id}"));
    human.push_summary("id", id);
    human.push_summary("name", name);

    emit_success(ctx.out, "user add", &AddReport { id, name }, Some(&human))?;
    Ok(())
}

pub fn run_ls(ctx: &CliContext) -> Result<()> {
    let registry: UserRegistry = ctx.storage.read_users()?;

    let mut human = HumanOutput::new(format!("user ls: {} registered", registry.users.len()));
    for user in &registry.users {
        human.push_detail(format!("{} ({})", user.id, user.name));
    }

    emit_success(ctx.out, "user ls", &registry, Some(&human))?;
    Ok(())
}
