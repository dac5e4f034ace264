pub mod files;
pub mod manifests;
pub mod repos;
pub mod tree;

pub use files::{CatCommand, PutCommand, RmCommand};
pub use manifests::{ApplyCommand, DeleteAppCommand, ManifestsCommand};
pub use repos::{BranchesCommand, ReposCommand};
pub use tree::{LsCommand, ScanCommand};

use argodeck_git::{Credential, GitProvider, GitProviderFactory, Lookup, ProviderKind};
use clap::Args;
use colored::Colorize;
use serde::Serialize;

/// Options shared by every subcommand
#[derive(Args, Clone, Debug)]
pub struct GlobalArgs {
    /// Git hosting provider: github or gitlab
    #[arg(long, env = "ARGODECK_PROVIDER", default_value = "github", global = true)]
    pub provider: String,

    /// Access token for the provider
    #[arg(long, env = "ARGODECK_TOKEN", hide_env_values = true, global = true)]
    pub token: Option<String>,

    /// Print JSON instead of formatted output
    #[arg(long, global = true)]
    pub json: bool,
}

impl GlobalArgs {
    pub fn credential(&self) -> anyhow::Result<Credential> {
        let provider: ProviderKind = self.provider.parse()?;
        let token = self
            .token
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| {
                anyhow::anyhow!("No access token: pass --token or set ARGODECK_TOKEN")
            })?;
        Ok(Credential::new(token.trim(), provider))
    }

    /// Adapter for the selected provider, host settings from the environment
    pub fn connect(&self) -> anyhow::Result<Box<dyn GitProvider>> {
        let credential = self.credential()?;
        let factory = GitProviderFactory::from_env()?;
        Ok(factory.create_for(&credential)?)
    }
}

/// Unwrap a degraded read for display
///
/// Absence is `None`. Other failures are reported on stderr and also give `None`,
/// except a rejected credential, which aborts the command.
pub fn settle<T>(lookup: Lookup<T>, what: &str) -> anyhow::Result<Option<T>> {
    match lookup {
        Lookup::Found(value) => Ok(Some(value)),
        Lookup::NotFound => Ok(None),
        Lookup::Failed(e) if e.is_auth_failure() => Err(anyhow::anyhow!(
            "{} failed: {}. Check the access token and sign in again.",
            what,
            e
        )),
        Lookup::Failed(e) => {
            eprintln!("{} {} failed: {}", "warning:".bright_yellow().bold(), what, e);
            Ok(None)
        }
    }
}

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
