// `folio write`: replace a document's content from a flag, a file or stdin.

use std::io::Read;
use std::path::PathBuf;

use anyhow::Context;
use clap::Args;
use serde_json::json;
use uuid::Uuid;

use super::{block_on, CommandContext};
use crate::output;

#[derive(Debug, Args)]
pub struct WriteArgs {
    /// Document id.
    id: Uuid,
    /// New content. Reads stdin when neither --content nor --file is given.
    #[arg(long, conflicts_with = "file")]
    content: Option<String>,
    /// Read new content from this file.
    #[arg(long)]
    file: Option<PathBuf>,
}

pub fn run(args: WriteArgs, ctx: &CommandContext) -> anyhow::Result<()> {
    let content = resolve_content(args.content, args.file.as_deref(), &mut std::io::stdin())?;
    let bytes = content.len();
    let client = ctx.client()?;
    block_on(client.update_content(args.id, content))??;

    let result = json!({ "id": args.id, "bytes": bytes });
    output::print_output(ctx.format, &result, |r| format!("Wrote {} byte(s).", r["bytes"]))?;
    Ok(())
}

fn resolve_content<R: Read>(
    inline: Option<String>,
    file: Option<&std::path::Path>,
    stdin: &mut R,
) -> anyhow::Result<String> {
    if let Some(content) = inline {
        return Ok(content);
    }
    if let Some(path) = file {
        return std::fs::read_to_string(path)
            .with_context(|| format!("failed to read `{}`", path.display()));
    }
    let mut content = String::new();
    stdin.read_to_string(&mut content).context("failed to read content from stdin")?;
    Ok(content)
}
