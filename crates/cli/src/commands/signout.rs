// `folio signout`: revoke the session on the relay and forget it locally.

use clap::Args;
use serde_json::json;

use super::{block_on, CommandContext};
use crate::output;

#[derive(Debug, Args)]
pub struct SignoutArgs {}

pub fn run(_args: SignoutArgs, mut ctx: CommandContext) -> anyhow::Result<()> {
    if ctx.credentials.token.is_some() {
        let client = ctx.client()?;
        // The local session is dropped even when the relay cannot be told.
        if let Err(error) = block_on(client.sign_out())? {
            output::print_warning(
                ctx.format,
                "SIGNOUT_NOT_CONFIRMED",
                &format!("relay did not confirm sign-out: {error:#}"),
            );
        }
        ctx.credentials.signed_out();
        ctx.save_credentials()?;
    }

    output::print_output(ctx.format, &json!({ "signed_out": true }), |_| {
        "Signed out.".to_owned()
    })?;
    Ok(())
}
