//! In-memory `GitProvider` used by the unit tests

use argodeck_git::{
    FileEntry, GitProvider, GitProviderError, Lookup, PageCursor, ProviderKind, RepoPage,
};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCommit {
    pub path: String,
    pub content: Option<String>,
    pub message: String,
    pub branch: Option<String>,
}

type ErrorFactory = fn() -> GitProviderError;

pub struct FakeProvider {
    branches: Vec<String>,
    files: Mutex<Vec<(String, String)>>,
    scan_error: Option<ErrorFactory>,
    read_delay_ms: u64,
    reverse_delays: bool,
    fetched: Mutex<Vec<(String, Option<String>)>>,
    commits: Mutex<Vec<RecordedCommit>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl FakeProvider {
    pub fn new() -> Self {
        Self {
            branches: Vec::new(),
            files: Mutex::new(Vec::new()),
            scan_error: None,
            read_delay_ms: 0,
            reverse_delays: false,
            fetched: Mutex::new(Vec::new()),
            commits: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    pub fn with_branches(mut self, branches: &[&str]) -> Self {
        self.branches = branches.iter().map(|b| b.to_string()).collect();
        self
    }

    pub fn with_file(self, path: &str, content: &str) -> Self {
        self.files
            .lock()
            .unwrap()
            .push((path.to_string(), content.to_string()));
        self
    }

    pub fn with_scan_error(mut self, error: ErrorFactory) -> Self {
        self.scan_error = Some(error);
        self
    }

    pub fn with_read_delay_ms(mut self, delay: u64) -> Self {
        self.read_delay_ms = delay;
        self
    }

    /// Earlier files take longer to read
    pub fn with_reverse_delays(mut self) -> Self {
        self.reverse_delays = true;
        self
    }

    pub fn fetched_paths(&self) -> Vec<String> {
        self.fetched
            .lock()
            .unwrap()
            .iter()
            .map(|(path, _)| path.clone())
            .collect()
    }

    pub fn fetched_branches(&self) -> Vec<Option<String>> {
        self.fetched
            .lock()
            .unwrap()
            .iter()
            .map(|(_, branch)| branch.clone())
            .collect()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn commits(&self) -> Vec<RecordedCommit> {
        self.commits.lock().unwrap().clone()
    }

    fn position(&self, path: &str) -> Option<(usize, usize)> {
        let files = self.files.lock().unwrap();
        files
            .iter()
            .position(|(p, _)| p == path)
            .map(|index| (index, files.len()))
    }

    fn content(&self, path: &str) -> Option<String> {
        self.files
            .lock()
            .unwrap()
            .iter()
            .find(|(p, _)| p == path)
            .map(|(_, content)| content.clone())
    }
}

#[async_trait]
impl GitProvider for FakeProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::GitHub
    }

    async fn list_repos(&self, _cursor: Option<&PageCursor>) -> Result<RepoPage, GitProviderError> {
        Ok(RepoPage {
            repos: Vec::new(),
            next_cursor: None,
        })
    }

    async fn list_branches(&self, _repo: &str) -> Lookup<Vec<String>> {
        Lookup::Found(self.branches.clone())
    }

    async fn scan_repo(&self, _repo: &str, _branch: Option<&str>) -> Lookup<Vec<FileEntry>> {
        if let Some(error) = self.scan_error {
            return Lookup::Failed(error());
        }
        let files = self.files.lock().unwrap();
        Lookup::Found(files.iter().map(|(p, _)| FileEntry::file(p.clone())).collect())
    }

    async fn get_file(&self, _repo: &str, path: &str, branch: Option<&str>) -> Lookup<String> {
        self.fetched
            .lock()
            .unwrap()
            .push((path.to_string(), branch.map(str::to_string)));

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        let delay = match (self.reverse_delays, self.position(path)) {
            (true, Some((index, len))) => ((len - index) * 10) as u64,
            _ => self.read_delay_ms,
        };
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        match self.content(path) {
            Some(content) => Lookup::Found(content),
            None => Lookup::NotFound,
        }
    }

    async fn save_file(
        &self,
        _repo: &str,
        path: &str,
        content: &str,
        message: &str,
        branch: Option<&str>,
    ) -> Result<(), GitProviderError> {
        self.commits.lock().unwrap().push(RecordedCommit {
            path: path.to_string(),
            content: Some(content.to_string()),
            message: message.to_string(),
            branch: branch.map(str::to_string),
        });
        Ok(())
    }

    async fn delete_file(
        &self,
        _repo: &str,
        path: &str,
        message: &str,
        branch: Option<&str>,
    ) -> Result<(), GitProviderError> {
        self.commits.lock().unwrap().push(RecordedCommit {
            path: path.to_string(),
            content: None,
            message: message.to_string(),
            branch: branch.map(str::to_string),
        });
        Ok(())
    }

    async fn list_files(&self, _repo: &str, _path: Option<&str>) -> Lookup<Vec<FileEntry>> {
        Lookup::NotFound
    }
}
