//! Argodeck CLI
//!
//! Browse repositories on GitHub or GitLab, find Argo CD manifests in them and
//! commit changes, all through the same provider interface.

mod commands;

use anyhow::Context;
use clap::{Parser, Subcommand};
use commands::{
    ApplyCommand, BranchesCommand, CatCommand, DeleteAppCommand, GlobalArgs, LsCommand,
    ManifestsCommand, PutCommand, ReposCommand, RmCommand, ScanCommand,
};
use tracing_subscriber::{layer::SubscriberExt, Layer};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", env = "ARGODECK_LOG_LEVEL", global = true)]
    log_level: String,

    /// Log format: compact, full
    #[arg(
        long,
        default_value = "compact",
        env = "ARGODECK_LOG_FORMAT",
        global = true
    )]
    log_format: String,

    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List repositories visible to the token, most recently updated first
    Repos(ReposCommand),
    /// List branches of a repository
    Branches(BranchesCommand),
    /// List every file in a repository
    Scan(ScanCommand),
    /// List one directory of a repository
    Ls(LsCommand),
    /// Print a file
    Cat(CatCommand),
    /// Create or update a file in one commit
    Put(PutCommand),
    /// Delete a file in one commit
    Rm(RmCommand),
    /// Find Argo CD Applications and ApplicationSets in a repository
    Manifests(ManifestsCommand),
    /// Commit an Argo CD manifest from a local YAML file
    Apply(ApplyCommand),
    /// Delete an Argo CD manifest file
    DeleteApp(DeleteAppCommand),
}

fn init_tracing(log_level: &str, log_format: &str) -> anyhow::Result<()> {
    // RUST_LOG wins when set; otherwise our crates at the requested level and
    // HTTP internals at warn
    let filter = if std::env::var("RUST_LOG").is_ok() {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .context("Invalid RUST_LOG environment variable")?
    } else {
        tracing_subscriber::EnvFilter::new(format!(
            "argodeck={level},\
             argodeck_git={level},\
             argodeck_manifests={level},\
             h2=warn,\
             hyper=warn,\
             hyper_util=warn,\
             reqwest=warn,\
             rustls=warn",
            level = log_level
        ))
    };

    // Logs go to stderr so that stdout stays parseable with --json
    let fmt_layer = match log_format {
        "full" => tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_thread_ids(false)
            .with_thread_names(false)
            .boxed(),
        _ => tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .compact()
            .with_target(false)
            .with_thread_ids(false)
            .with_thread_names(false)
            .boxed(),
    };

    let subscriber = tracing_subscriber::registry().with(filter).with(fmt_layer);
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set global default subscriber")?;
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level, &cli.log_format)?;

    let global = cli.global;
    match cli.command {
        Commands::Repos(cmd) => cmd.execute(&global),
        Commands::Branches(cmd) => cmd.execute(&global),
        Commands::Scan(cmd) => cmd.execute(&global),
        Commands::Ls(cmd) => cmd.execute(&global),
        Commands::Cat(cmd) => cmd.execute(&global),
        Commands::Put(cmd) => cmd.execute(&global),
        Commands::Rm(cmd) => cmd.execute(&global),
        Commands::Manifests(cmd) => cmd.execute(&global),
        Commands::Apply(cmd) => cmd.execute(&global),
        Commands::DeleteApp(cmd) => cmd.execute(&global),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_put_with_globals() {
        let cli = Cli::try_parse_from([
            "argodeck",
            "put",
            "acme/deploy",
            "apps/web.yaml",
            "--file",
            "web.yaml",
            "-m",
            "Bump web",
            "--provider",
            "gitlab",
            "--token",
            "glpat-x",
            "--json",
        ])
        .unwrap();

        assert_eq!(cli.global.provider, "gitlab");
        assert_eq!(cli.global.token.as_deref(), Some("glpat-x"));
        assert!(cli.global.json);
        assert!(matches!(cli.command, Commands::Put(_)));
    }

    #[test]
    fn test_provider_and_token_from_environment() {
        temp_env::with_vars(
            [
                ("ARGODECK_PROVIDER", Some("gitlab")),
                ("ARGODECK_TOKEN", Some("from-env")),
            ],
            || {
                let cli = Cli::try_parse_from(["argodeck", "repos"]).unwrap();
                assert_eq!(cli.global.provider, "gitlab");
                assert_eq!(cli.global.token.as_deref(), Some("from-env"));
            },
        );
    }
}
