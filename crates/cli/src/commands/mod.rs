// CLI subcommand dispatch.

use std::future::Future;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Subcommand};

use crate::client::RelayClient;
use crate::credentials::{self, Credentials};
use crate::exit_code::NotSignedIn;
use crate::output::OutputFormat;

pub mod ls;
pub mod members;
pub mod new;
pub mod rename;
pub mod rm;
pub mod show;
pub mod signin;
pub mod signout;
pub mod signup;
pub mod whoami;
pub mod write;

/// Flags accepted by every subcommand.
#[derive(Debug, Clone, Default, Args)]
pub struct GlobalArgs {
    /// Relay base URL (overrides FOLIO_RELAY_URL and the stored session).
    #[arg(long, global = true)]
    pub relay: Option<String>,
    /// Force JSON output.
    #[arg(long, global = true)]
    pub json: bool,
}

#[derive(Subcommand)]
pub enum Command {
    /// Create an account, either with a new organization or by invite code
    Signup(signup::SignupArgs),
    /// Sign in with email and password
    Signin(signin::SigninArgs),
    /// End the stored session
    Signout(signout::SignoutArgs),
    /// Show the signed-in user and organization
    Whoami(whoami::WhoamiArgs),
    /// List members of your organization
    Members(members::MembersArgs),
    /// List documents in your organization
    Ls(ls::LsArgs),
    /// Create a document
    New(new::NewArgs),
    /// Show a single document
    Show(show::ShowArgs),
    /// Rename a document
    Rename(rename::RenameArgs),
    /// Replace a document's content
    Write(write::WriteArgs),
    /// Delete a document (creator or admin only)
    Rm(rm::RmArgs),
}

pub fn run(cmd: Command, global: &GlobalArgs) -> Result<()> {
    let ctx = CommandContext::load(global)?;
    match cmd {
        Command::Signup(args) => signup::run(args, ctx),
        Command::Signin(args) => signin::run(args, ctx),
        Command::Signout(args) => signout::run(args, ctx),
        Command::Whoami(args) => whoami::run(args, &ctx),
        Command::Members(args) => members::run(args, &ctx),
        Command::Ls(args) => ls::run(args, &ctx),
        Command::New(args) => new::run(args, &ctx),
        Command::Show(args) => show::run(args, &ctx),
        Command::Rename(args) => rename::run(args, &ctx),
        Command::Write(args) => write::run(args, &ctx),
        Command::Rm(args) => rm::run(args, &ctx),
    }
}

/// Everything a command needs: output format, relay URL and the stored session.
pub struct CommandContext {
    pub format: OutputFormat,
    pub relay_url: String,
    pub credentials: Credentials,
    credentials_path: Option<PathBuf>,
}

impl CommandContext {
    pub fn load(global: &GlobalArgs) -> Result<Self> {
        let credentials_path = credentials::default_path();
        let credentials = match &credentials_path {
            Some(path) => Credentials::load_from(path)?,
            None => Credentials::default(),
        };
        let relay_url = credentials.resolve_relay_url(global.relay.as_deref());
        Ok(Self {
            format: OutputFormat::detect(global.json),
            relay_url,
            credentials,
            credentials_path,
        })
    }

    /// A client that sends no token.
    pub fn anonymous_client(&self) -> Result<RelayClient> {
        RelayClient::new(&self.relay_url, None)
    }

    /// A client carrying the stored token; fails when signed out.
    pub fn client(&self) -> Result<RelayClient> {
        let token = self.credentials.token.clone().ok_or(NotSignedIn)?;
        RelayClient::new(&self.relay_url, Some(token))
    }

    pub fn save_credentials(&self) -> Result<()> {
        let path = self
            .credentials_path
            .as_deref()
            .context("could not determine a config directory for credentials")?;
        self.credentials.save_to(path)
    }
}

/// Run `future` to completion on a fresh current-thread runtime.
pub fn block_on<F: Future>(future: F) -> Result<F::Output> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to build tokio runtime")?;
    Ok(runtime.block_on(future))
}

/// Use `flag` when given, otherwise prompt on stderr and read one line from stdin.
pub fn password_or_prompt(flag: Option<String>) -> Result<String> {
    if let Some(password) = flag {
        return Ok(password);
    }
    eprint!("Password: ");
    io::stderr().flush().ok();
    read_password_line(&mut io::stdin().lock())
}

fn read_password_line<R: BufRead>(reader: &mut R) -> Result<String> {
    let mut line = String::new();
    reader.read_line(&mut line).context("failed to read password from stdin")?;
    Ok(line.trim_end_matches(['\r', '\n']).to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_flag_skips_prompt() {
        assert_eq!(password_or_prompt(Some("hunter22".into())).unwrap(), "hunter22");
    }

    #[test]
    fn password_line_strips_only_line_ending() {
        let mut input = io::Cursor::new(" spaced pass \r\nignored\n");
        assert_eq!(read_password_line(&mut input).unwrap(), " spaced pass ");
    }

    #[test]
    fn signed_out_context_refuses_authenticated_client() {
        let ctx = CommandContext {
            format: OutputFormat::Json,
            relay_url: "http://localhost:8080".into(),
            credentials: Credentials::default(),
            credentials_path: None,
        };
        let error = ctx.client().expect_err("no token should fail");
        assert!(error.downcast_ref::<NotSignedIn>().is_some());
        assert!(ctx.anonymous_client().is_ok());
        assert!(ctx.save_credentials().is_err());
    }
}
