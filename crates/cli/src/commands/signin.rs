// `folio signin`: exchange email and password for a stored session.

use clap::Args;
use folio_common::protocol::rest::SignInRequest;
use serde::Serialize;
use uuid::Uuid;

use super::{block_on, password_or_prompt, CommandContext};
use crate::output;

#[derive(Debug, Args)]
pub struct SigninArgs {
    #[arg(long)]
    email: String,
    /// Password; read from stdin when omitted.
    #[arg(long)]
    password: Option<String>,
}

#[derive(Debug, Serialize)]
struct SigninOutput {
    user_id: Uuid,
    name: String,
    org_id: Uuid,
}

pub fn run(args: SigninArgs, mut ctx: CommandContext) -> anyhow::Result<()> {
    let request =
        SignInRequest { email: args.email, password: password_or_prompt(args.password)? };
    let client = ctx.anonymous_client()?;
    let result = block_on(client.sign_in(&request))??;

    ctx.credentials.signed_in(ctx.relay_url.clone(), result.token, result.user_id, result.org_id);
    ctx.save_credentials()?;

    let shown = SigninOutput { user_id: result.user_id, name: result.name, org_id: result.org_id };
    output::print_output(ctx.format, &shown, format_human)?;
    Ok(())
}

fn format_human(result: &SigninOutput) -> String {
    format!("Signed in as {}.", result.name)
}
