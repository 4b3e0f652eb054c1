// `folio whoami`: show the signed-in user and organization.

use clap::Args;
use folio_common::types::CurrentUser;

use super::{block_on, CommandContext};
use crate::exit_code::NotSignedIn;
use crate::output;

#[derive(Debug, Args)]
pub struct WhoamiArgs {}

pub fn run(_args: WhoamiArgs, ctx: &CommandContext) -> anyhow::Result<()> {
    let client = ctx.client()?;
    let user = block_on(client.current_user())??.ok_or(NotSignedIn)?;
    output::print_output(ctx.format, &user, format_human)?;
    Ok(())
}

fn format_human(user: &CurrentUser) -> String {
    format!(
        "{} <{}>\norganization: {} (invite code {})\nrole: {}",
        user.name, user.email, user.org_name, user.org_code, user.role
    )
}
