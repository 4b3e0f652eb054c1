// `folio members`: list everyone in the caller's organization.

use clap::Args;
use folio_common::types::MemberSummary;
use serde::Serialize;

use super::{block_on, CommandContext};
use crate::output;

#[derive(Debug, Args)]
pub struct MembersArgs {}

#[derive(Debug, Serialize)]
struct MembersOutput {
    members: Vec<MemberSummary>,
}

pub fn run(_args: MembersArgs, ctx: &CommandContext) -> anyhow::Result<()> {
    let client = ctx.client()?;
    let members = block_on(client.list_members())??;
    output::print_output(ctx.format, &MembersOutput { members }, format_human)?;
    Ok(())
}

fn format_human(result: &MembersOutput) -> String {
    if result.members.is_empty() {
        return "No members visible. Your session may have expired.".into();
    }

    let mut lines = vec![format!("{} member(s)", result.members.len())];
    for m in &result.members {
        lines.push(format!("  {:<24} {:<32} {}", m.name, m.email, m.role));
    }
    lines.join("\n")
}
