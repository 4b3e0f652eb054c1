// `folio ls`: list the organization's documents, newest first.

use clap::Args;
use folio_common::types::DocumentSummary;
use serde::Serialize;

use super::{block_on, CommandContext};
use crate::output;

#[derive(Debug, Args)]
pub struct LsArgs {}

#[derive(Debug, Serialize)]
pub struct LsResult {
    pub documents: Vec<DocumentSummary>,
}

pub fn run(_args: LsArgs, ctx: &CommandContext) -> anyhow::Result<()> {
    let client = ctx.client()?;
    let documents = block_on(client.list_documents())??;
    output::print_output(ctx.format, &LsResult { documents }, format_human)?;
    Ok(())
}

fn format_human(result: &LsResult) -> String {
    if result.documents.is_empty() {
        return "No documents in your organization.".into();
    }

    let mut lines = Vec::new();
    lines.push(format!("{} document(s)", result.documents.len()));
    for d in &result.documents {
        let edited = if d.last_editor_name != d.creator_name {
            format!(", last edited by {}", d.last_editor_name)
        } else {
            String::new()
        };
        lines.push(format!(
            "  {}  {} (by {}{}, updated {})",
            d.id,
            d.title,
            d.creator_name,
            edited,
            d.updated_at.format("%Y-%m-%d %H:%M")
        ));
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use uuid::Uuid;

    fn doc(title: &str, creator: &str, editor: &str) -> DocumentSummary {
        let at = Utc.with_ymd_and_hms(2026, 3, 1, 9, 30, 0).unwrap();
        DocumentSummary {
            id: Uuid::new_v4(),
            title: title.into(),
            content: Some(String::new()),
            org_id: Uuid::nil(),
            created_by: Uuid::nil(),
            creator_name: creator.into(),
            last_edited_by: Some(Uuid::nil()),
            last_editor_name: editor.into(),
            created_at: at,
            updated_at: at,
        }
    }

    #[test]
    fn human_format_shows_documents() {
        let result = LsResult {
            documents: vec![doc("Roadmap", "Bob", "Alice"), doc("Notes", "Alice", "Alice")],
        };
        let output = format_human(&result);
        assert!(output.contains("2 document(s)"));
        assert!(output.contains("Roadmap (by Bob, last edited by Alice, updated 2026-03-01 09:30)"));
        let notes = output.lines().find(|l| l.contains("Notes")).unwrap();
        assert!(!notes.contains("last edited"));
    }

    #[test]
    fn human_format_empty() {
        let output = format_human(&LsResult { documents: vec![] });
        assert!(output.contains("No documents"));
    }
}
