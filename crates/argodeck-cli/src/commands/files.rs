use anyhow::Context;
use clap::Args;
use colored::Colorize;
use serde::Serialize;
use std::path::PathBuf;

use super::{print_json, settle, GlobalArgs};

#[derive(Serialize)]
struct CommitSummary<'a> {
    repo: &'a str,
    path: &'a str,
    message: &'a str,
    branch: Option<&'a str>,
}

#[derive(Args)]
pub struct CatCommand {
    /// Repository full name
    repo: String,

    /// File path inside the repository
    path: String,

    /// Branch to read from (default branch when omitted)
    #[arg(long, short)]
    branch: Option<String>,
}

impl CatCommand {
    pub fn execute(self, global: &GlobalArgs) -> anyhow::Result<()> {
        let provider = global.connect()?;

        let rt = tokio::runtime::Runtime::new()?;
        let content = settle(
            rt.block_on(provider.get_file(&self.repo, &self.path, self.branch.as_deref())),
            "File read",
        )?
        .ok_or_else(|| anyhow::anyhow!("{} not found in {}", self.path, self.repo))?;

        if global.json {
            return print_json(&serde_json::json!({
                "path": self.path,
                "content": content,
            }));
        }

        print!("{}", content);
        Ok(())
    }
}

#[derive(Args)]
pub struct PutCommand {
    /// Repository full name
    repo: String,

    /// Destination path inside the repository
    path: String,

    /// Local file to upload
    #[arg(long, short)]
    file: PathBuf,

    /// Commit message
    #[arg(long, short)]
    message: String,

    /// Branch to commit to (default branch when omitted)
    #[arg(long, short)]
    branch: Option<String>,
}

impl PutCommand {
    pub fn execute(self, global: &GlobalArgs) -> anyhow::Result<()> {
        let content = std::fs::read_to_string(&self.file)
            .with_context(|| format!("Failed to read {}", self.file.display()))?;
        let provider = global.connect()?;

        let rt = tokio::runtime::Runtime::new()?;
        rt.block_on(provider.save_file(
            &self.repo,
            &self.path,
            &content,
            &self.message,
            self.branch.as_deref(),
        ))?;

        report_commit(
            global,
            &CommitSummary {
                repo: &self.repo,
                path: &self.path,
                message: &self.message,
                branch: self.branch.as_deref(),
            },
        )
    }
}

#[derive(Args)]
pub struct RmCommand {
    /// Repository full name
    repo: String,

    /// File path inside the repository
    path: String,

    /// Commit message
    #[arg(long, short)]
    message: String,

    /// Branch to commit to (default branch when omitted)
    #[arg(long, short)]
    branch: Option<String>,
}

impl RmCommand {
    pub fn execute(self, global: &GlobalArgs) -> anyhow::Result<()> {
        let provider = global.connect()?;

        let rt = tokio::runtime::Runtime::new()?;
        rt.block_on(provider.delete_file(
            &self.repo,
            &self.path,
            &self.message,
            self.branch.as_deref(),
        ))?;

        report_commit(
            global,
            &CommitSummary {
                repo: &self.repo,
                path: &self.path,
                message: &self.message,
                branch: self.branch.as_deref(),
            },
        )
    }
}

fn report_commit(global: &GlobalArgs, summary: &CommitSummary<'_>) -> anyhow::Result<()> {
    if global.json {
        return print_json(summary);
    }

    println!(
        "{} {}",
        "✓".bright_green().bold(),
        summary.message.bright_white().bold()
    );
    println!(
        "  {} {}:{}",
        "File:".bright_white(),
        summary.repo.bright_cyan(),
        summary.path
    );
    println!(
        "  {} {}",
        "Branch:".bright_white(),
        summary.branch.unwrap_or("(default)").bright_green()
    );
    Ok(())
}
