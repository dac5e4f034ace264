use argodeck_git::{EntryKind, FileEntry};
use clap::Args;
use colored::Colorize;

use super::{print_json, settle, GlobalArgs};

#[derive(Args)]
pub struct ScanCommand {
    /// Repository full name
    repo: String,

    /// Branch to scan (default branch when omitted)
    #[arg(long, short)]
    branch: Option<String>,
}

impl ScanCommand {
    pub fn execute(self, global: &GlobalArgs) -> anyhow::Result<()> {
        let provider = global.connect()?;

        let rt = tokio::runtime::Runtime::new()?;
        let files = settle(
            rt.block_on(provider.scan_repo(&self.repo, self.branch.as_deref())),
            "Repository scan",
        )?
        .unwrap_or_default();

        if global.json {
            return print_json(&files);
        }

        for file in &files {
            println!("{}", file.path);
        }
        eprintln!(
            "{} {}",
            "Total files:".bright_white().bold(),
            files.len().to_string().bright_cyan()
        );
        Ok(())
    }
}

#[derive(Args)]
pub struct LsCommand {
    /// Repository full name
    repo: String,

    /// Directory to list (repository root when omitted)
    path: Option<String>,
}

impl LsCommand {
    pub fn execute(self, global: &GlobalArgs) -> anyhow::Result<()> {
        let provider = global.connect()?;

        let rt = tokio::runtime::Runtime::new()?;
        let mut entries = settle(
            rt.block_on(provider.list_files(&self.repo, self.path.as_deref())),
            "Directory listing",
        )?
        .unwrap_or_default();

        if global.json {
            return print_json(&entries);
        }

        sort_for_display(&mut entries);
        for entry in &entries {
            match entry.kind {
                EntryKind::Dir => println!("{}/", entry.name.bright_blue().bold()),
                EntryKind::File => println!("{}", entry.name),
            }
        }
        Ok(())
    }
}

/// Directories first, then by name
fn sort_for_display(entries: &mut [FileEntry]) {
    entries.sort_by(|a, b| {
        (a.kind != EntryKind::Dir)
            .cmp(&(b.kind != EntryKind::Dir))
            .then_with(|| a.name.cmp(&b.name))
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sort_for_display() {
        let mut entries = vec![
            FileEntry::file("README.md"),
            FileEntry::dir("charts"),
            FileEntry::file("Chart.yaml"),
            FileEntry::dir("apps"),
        ];
        sort_for_display(&mut entries);

        let names: Vec<&str> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["apps", "charts", "Chart.yaml", "README.md"]);
    }
}
