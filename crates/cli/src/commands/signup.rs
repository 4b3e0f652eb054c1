// `folio signup org|join`: create an account.

use clap::{Args, Subcommand};
use folio_common::protocol::rest::{SignUpJoinOrgRequest, SignUpResult, SignUpWithOrgRequest};

use super::{block_on, password_or_prompt, CommandContext};
use crate::output;

#[derive(Debug, Args)]
pub struct SignupArgs {
    #[command(subcommand)]
    mode: SignupMode,
}

#[derive(Debug, Subcommand)]
enum SignupMode {
    /// Create a new organization and become its admin
    Org {
        /// Name of the new organization.
        #[arg(long)]
        org: String,
        #[command(flatten)]
        account: AccountArgs,
    },
    /// Join an existing organization with its invite code
    Join {
        /// Six-character invite code (case-insensitive).
        #[arg(long)]
        code: String,
        #[command(flatten)]
        account: AccountArgs,
    },
}

#[derive(Debug, Args)]
struct AccountArgs {
    #[arg(long)]
    email: String,
    /// Display name.
    #[arg(long)]
    name: String,
    /// Password; read from stdin when omitted.
    #[arg(long)]
    password: Option<String>,
}

pub fn run(args: SignupArgs, mut ctx: CommandContext) -> anyhow::Result<()> {
    let client = ctx.anonymous_client()?;
    let result = match args.mode {
        SignupMode::Org { org, account } => {
            let request = SignUpWithOrgRequest {
                email: account.email,
                name: account.name,
                password: password_or_prompt(account.password)?,
                org_name: org,
            };
            block_on(client.sign_up_with_org(&request))??
        }
        SignupMode::Join { code, account } => {
            let request = SignUpJoinOrgRequest {
                email: account.email,
                name: account.name,
                password: password_or_prompt(account.password)?,
                code,
            };
            block_on(client.sign_up_join(&request))??
        }
    };

    ctx.credentials.signed_in(
        ctx.relay_url.clone(),
        result.token.clone(),
        result.user_id,
        result.org_id,
    );
    ctx.save_credentials()?;

    output::print_output(ctx.format, &Redacted::from(&result), format_human)?;
    Ok(())
}

/// What gets printed: everything except the session token.
#[derive(Debug, serde::Serialize)]
struct Redacted<'a> {
    user_id: uuid::Uuid,
    org_id: uuid::Uuid,
    org_code: &'a str,
}

impl<'a> From<&'a SignUpResult> for Redacted<'a> {
    fn from(result: &'a SignUpResult) -> Self {
        Self { user_id: result.user_id, org_id: result.org_id, org_code: &result.org_code }
    }
}

fn format_human(result: &Redacted<'_>) -> String {
    format!(
        "Signed up. Organization invite code: {}\nShare it with teammates: folio signup join --code {}",
        result.org_code, result.org_code
    )
}
