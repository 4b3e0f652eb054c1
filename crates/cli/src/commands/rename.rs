// `folio rename`: change a document's title.

use clap::Args;
use serde_json::json;
use uuid::Uuid;

use super::{block_on, CommandContext};
use crate::output;

#[derive(Debug, Args)]
pub struct RenameArgs {
    /// Document id.
    id: Uuid,
    /// New title.
    title: String,
}

pub fn run(args: RenameArgs, ctx: &CommandContext) -> anyhow::Result<()> {
    let client = ctx.client()?;
    block_on(client.update_title(args.id, &args.title))??;
    let title = args.title.trim();
    output::print_output(ctx.format, &json!({ "id": args.id, "title": title }), |_| {
        format!("Renamed to \"{title}\"")
    })?;
    Ok(())
}
