// `folio new`: create a document in the caller's organization.

use clap::Args;
use serde::Serialize;
use uuid::Uuid;

use super::{block_on, CommandContext};
use crate::output;

#[derive(Debug, Args)]
pub struct NewArgs {
    /// Title of the new document.
    title: String,
    /// Initial content.
    #[arg(long)]
    content: Option<String>,
}

#[derive(Debug, Serialize)]
struct NewResult {
    id: Uuid,
    title: String,
}

pub fn run(args: NewArgs, ctx: &CommandContext) -> anyhow::Result<()> {
    let NewArgs { title, content } = args;
    let client = ctx.client()?;
    let id = block_on(async {
        let id = client.create_document(&title).await?;
        if let Some(content) = content {
            client.update_content(id, content).await?;
        }
        anyhow::Ok(id)
    })??;

    let result = NewResult { id, title: title.trim().to_owned() };
    output::print_output(ctx.format, &result, format_human)?;
    Ok(())
}

fn format_human(result: &NewResult) -> String {
    format!("Created \"{}\" ({})", result.title, result.id)
}
