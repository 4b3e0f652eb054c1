// `folio rm`: delete a document. Only its creator or an admin may.

use clap::Args;
use serde_json::json;
use uuid::Uuid;

use super::{block_on, CommandContext};
use crate::output;

#[derive(Debug, Args)]
pub struct RmArgs {
    /// Document id.
    id: Uuid,
}

pub fn run(args: RmArgs, ctx: &CommandContext) -> anyhow::Result<()> {
    let client = ctx.client()?;
    block_on(client.delete_document(args.id))??;
    output::print_output(ctx.format, &json!({ "deleted": args.id }), |_| {
        format!("Deleted {}.", args.id)
    })?;
    Ok(())
}
