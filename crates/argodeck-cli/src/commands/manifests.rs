use anyhow::Context;
use argodeck_git::Lookup;
use argodeck_manifests::{
    Discovery, ManifestKind, ManifestScanner, ManifestWriter, DEFAULT_CONCURRENCY,
    DEFAULT_FILE_LIMIT,
};
use clap::Args;
use colored::Colorize;
use std::path::PathBuf;

use super::{print_json, GlobalArgs};

#[derive(Args)]
pub struct ManifestsCommand {
    /// Repository full name
    repo: String,

    /// Branch to search (default branch when omitted)
    #[arg(long, short)]
    branch: Option<String>,

    /// Maximum number of YAML files to download
    #[arg(long, default_value_t = DEFAULT_FILE_LIMIT)]
    limit: usize,

    /// Maximum number of concurrent downloads
    #[arg(long, default_value_t = DEFAULT_CONCURRENCY)]
    concurrency: usize,
}

impl ManifestsCommand {
    pub fn execute(self, global: &GlobalArgs) -> anyhow::Result<()> {
        let provider = global.connect()?;

        let rt = tokio::runtime::Runtime::new()?;
        let discovery = rt.block_on(
            ManifestScanner::new(provider.as_ref())
                .with_file_limit(self.limit)
                .with_concurrency(self.concurrency)
                .discover(&self.repo, self.branch.as_deref()),
        )?;

        if global.json {
            return print_json(&discovery);
        }

        print_discovery(&self.repo, self.branch.as_deref(), self.limit, &discovery);
        Ok(())
    }
}

fn print_discovery(repo: &str, branch: Option<&str>, limit: usize, discovery: &Discovery) {
    println!();
    println!(
        "{} {}",
        repo.bright_white().bold(),
        format!("@ {}", branch.unwrap_or("(default branch)")).bright_green()
    );
    if !discovery.branches.is_empty() {
        println!(
            "  {} {}",
            "Branches:".bright_white(),
            discovery.branches.join(", ")
        );
    }
    println!();

    if discovery.manifests.is_empty() {
        println!("{}", "No Argo CD manifests found.".bright_yellow());
    }

    for manifest in &discovery.manifests {
        let kind = match manifest.kind {
            ManifestKind::Application => manifest.kind.to_string().bright_blue(),
            ManifestKind::ApplicationSet => manifest.kind.to_string().bright_magenta(),
        };
        println!(
            "{} {}",
            kind.bold(),
            manifest.name().unwrap_or("<unnamed>").bright_cyan()
        );
        println!("  {} {}", "File:".bright_white(), manifest.path);
        if let Some(project) = manifest.project() {
            println!("  {} {}", "Project:".bright_white(), project);
        }
        if let Some(url) = manifest.source_repo_url() {
            println!("  {} {}", "Source:".bright_white(), url.bright_green());
        }
        if let Some(namespace) = manifest.destination_namespace() {
            println!("  {} {}", "Destination:".bright_white(), namespace);
        }
        println!();
    }

    for skipped in &discovery.skipped {
        eprintln!(
            "{} {}: {}",
            "skipped".bright_yellow(),
            skipped.path,
            skipped.reason
        );
    }
    if discovery.truncated {
        eprintln!(
            "{} only the first {} of {} YAML files were read",
            "note:".bright_yellow().bold(),
            limit,
            discovery.candidates
        );
    }
}

#[derive(Args)]
pub struct ApplyCommand {
    /// Repository full name
    repo: String,

    /// Destination path inside the repository (.yaml or .yml)
    path: String,

    /// Local YAML file holding a single Argo CD document
    #[arg(long, short)]
    file: PathBuf,

    /// Branch to commit to (default branch when omitted)
    #[arg(long, short)]
    branch: Option<String>,
}

impl ApplyCommand {
    pub fn execute(self, global: &GlobalArgs) -> anyhow::Result<()> {
        let text = std::fs::read_to_string(&self.file)
            .with_context(|| format!("Failed to read {}", self.file.display()))?;
        let document: serde_yaml::Value = serde_yaml::from_str(&text)
            .with_context(|| format!("{} is not a single YAML document", self.file.display()))?;
        if ManifestKind::of(&document).is_none() {
            anyhow::bail!(
                "{} is not an Argo CD Application or ApplicationSet",
                self.file.display()
            );
        }

        let provider = global.connect()?;
        let rt = tokio::runtime::Runtime::new()?;

        rt.block_on(async {
            let is_new = match provider
                .get_file(&self.repo, &self.path, self.branch.as_deref())
                .await
            {
                Lookup::Found(_) => false,
                Lookup::NotFound => true,
                Lookup::Failed(e) => return Err(anyhow::Error::from(e)),
            };

            ManifestWriter::new(provider.as_ref())
                .save(
                    &self.repo,
                    &self.path,
                    &document,
                    is_new,
                    self.branch.as_deref(),
                )
                .await?;

            if global.json {
                print_json(&serde_json::json!({
                    "repo": self.repo,
                    "path": self.path,
                    "created": is_new,
                }))
            } else {
                println!(
                    "{} {} {}",
                    "✓".bright_green().bold(),
                    if is_new { "Created" } else { "Updated" },
                    self.path.bright_cyan()
                );
                Ok(())
            }
        })
    }
}

#[derive(Args)]
pub struct DeleteAppCommand {
    /// Repository full name
    repo: String,

    /// Manifest path inside the repository
    path: String,

    /// Branch to commit to (default branch when omitted)
    #[arg(long, short)]
    branch: Option<String>,
}

impl DeleteAppCommand {
    pub fn execute(self, global: &GlobalArgs) -> anyhow::Result<()> {
        let provider = global.connect()?;

        let rt = tokio::runtime::Runtime::new()?;
        rt.block_on(
            ManifestWriter::new(provider.as_ref()).delete(
                &self.repo,
                &self.path,
                self.branch.as_deref(),
            ),
        )?;

        if global.json {
            return print_json(&serde_json::json!({
                "repo": self.repo,
                "path": self.path,
                "deleted": true,
            }));
        }

        println!(
            "{} Deleted {}",
            "✓".bright_green().bold(),
            self.path.bright_cyan()
        );
        Ok(())
    }
}
