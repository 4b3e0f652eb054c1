// `folio show`: print one document.

use anyhow::bail;
use clap::Args;
use folio_common::types::DocumentSummary;
use uuid::Uuid;

use super::{block_on, CommandContext};
use crate::output;

#[derive(Debug, Args)]
pub struct ShowArgs {
    /// Document id.
    id: Uuid,
}

pub fn run(args: ShowArgs, ctx: &CommandContext) -> anyhow::Result<()> {
    let client = ctx.client()?;
    let Some(document) = block_on(client.get_document(args.id))?? else {
        bail!("document `{}` not found in your organization", args.id);
    };
    output::print_output(ctx.format, &document, format_human)?;
    Ok(())
}

fn format_human(document: &DocumentSummary) -> String {
    let mut out = format!(
        "# {}\ncreated by {} on {}, last edited by {}\n",
        document.title,
        document.creator_name,
        document.created_at.format("%Y-%m-%d"),
        document.last_editor_name,
    );
    match document.content.as_deref() {
        Some(content) if !content.is_empty() => {
            out.push('\n');
            out.push_str(content);
        }
        _ => out.push_str("\n(empty)"),
    }
    out
}
