use argodeck_git::PageCursor;
use clap::Args;
use colored::Colorize;
use tracing::debug;

use super::{print_json, settle, GlobalArgs};

#[derive(Args)]
pub struct ReposCommand {
    /// Cursor printed by a previous call, to fetch the next page
    #[arg(long)]
    cursor: Option<String>,
}

impl ReposCommand {
    pub fn execute(self, global: &GlobalArgs) -> anyhow::Result<()> {
        let cursor = self
            .cursor
            .as_deref()
            .map(str::parse::<PageCursor>)
            .transpose()?;
        let provider = global.connect()?;

        let rt = tokio::runtime::Runtime::new()?;
        let page = rt.block_on(provider.list_repos(cursor.as_ref()))?;
        debug!("Fetched {} repositories", page.repos.len());

        if global.json {
            return print_json(&page);
        }

        if page.repos.is_empty() {
            println!("{}", "No repositories found.".bright_yellow());
            return Ok(());
        }

        for repo in &page.repos {
            println!(
                "{} {} {}",
                repo.full_name.bright_cyan().bold(),
                format!("[{}]", repo.default_branch).bright_white(),
                repo.url.dimmed()
            );
        }

        if let Some(next) = &page.next_cursor {
            println!();
            println!(
                "{} argodeck repos --cursor {}",
                "More:".bright_white().bold(),
                next.to_string().bright_green()
            );
        }
        Ok(())
    }
}

#[derive(Args)]
pub struct BranchesCommand {
    /// Repository full name, e.g. owner/name or group/subgroup/name
    repo: String,
}

impl BranchesCommand {
    pub fn execute(self, global: &GlobalArgs) -> anyhow::Result<()> {
        let provider = global.connect()?;

        let rt = tokio::runtime::Runtime::new()?;
        let branches = settle(
            rt.block_on(provider.list_branches(&self.repo)),
            "Branch listing",
        )?
        .unwrap_or_default();

        if global.json {
            return print_json(&branches);
        }

        if branches.is_empty() {
            println!("{}", "No branches found.".bright_yellow());
        }
        for branch in &branches {
            println!("{}", branch.bright_green());
        }
        Ok(())
    }
}
