//! Durable per-project log sink.
//!
//! Logs live at `{log_dir}/{project}/{kind}.log`. Opening a sink truncates the
//! previous log of the same kind, so each run starts from an empty file.
use std::{
    io,
    path::{Path, PathBuf},
};

use tokio::{
    fs::{self, File, OpenOptions},
    io::AsyncWriteExt,
    sync::Mutex,
};
use tracing::trace;

use foreman_model::{LogKind, Project};

/// Append-only log file of one project.
#[derive(Debug)]
pub struct ProjectLog {
    path: PathBuf,
    file: Mutex<File>,
}

impl ProjectLog {
    /// Location of the `kind` log of `project` under `log_dir`.
    pub fn path_for(log_dir: &Path, project: &Project, kind: LogKind) -> PathBuf {
        log_dir
            .join(sanitize(&project.name))
            .join(kind.file_name())
    }

    /// Create (or truncate) the log and open it for appending.
    pub async fn open(log_dir: &Path, project: &Project, kind: LogKind) -> io::Result<Self> {
        Self::open_with(log_dir, project, kind, true).await
    }

    /// Open the log for appending, keeping what is already there.
    pub async fn append(log_dir: &Path, project: &Project, kind: LogKind) -> io::Result<Self> {
        Self::open_with(log_dir, project, kind, false).await
    }

    async fn open_with(
        log_dir: &Path,
        project: &Project,
        kind: LogKind,
        truncate: bool,
    ) -> io::Result<Self> {
        let path = Self::path_for(log_dir, project, kind);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        let mut options = OpenOptions::new();
        options.create(true);
        if truncate {
            options.write(true).truncate(true);
        } else {
            options.append(true);
        }
        let file = options.open(&path).await?;

        trace!(path = %path.display(), truncate, "project log opened");
        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append `text` as-is and flush.
    pub async fn log(&self, text: &str) -> io::Result<()> {
        let mut file = self.file.lock().await;
        file.write_all(text.as_bytes()).await?;
        file.flush().await
    }

    /// Append `line` followed by a newline and flush.
    pub async fn log_line(&self, line: &str) -> io::Result<()> {
        let mut file = self.file.lock().await;
        file.write_all(line.as_bytes()).await?;
        file.write_all(b"\n").await?;
        file.flush().await
    }

    /// Full current contents.
    pub async fn read(&self) -> io::Result<String> {
        fs::read_to_string(&self.path).await
    }

    /// Contents of a log without opening (and truncating) it; empty when absent.
    pub async fn read_existing(log_dir: &Path, project: &Project, kind: LogKind) -> io::Result<String> {
        match fs::read_to_string(Self::path_for(log_dir, project, kind)).await {
            Ok(text) => Ok(text),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(String::new()),
            Err(e) => Err(e),
        }
    }
}

/// Keep project names from escaping the log directory.
fn sanitize(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| match c {
            'a'..='z' | 'A'..='Z' | '0'..='9' | '-' | '_' | '.' => c,
            _ => '_',
        })
        .collect();

    match cleaned.trim_matches('.') {
        "" => "_".to_string(),
        _ => cleaned,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn project(name: &str) -> Project {
        Project::new(name, "true")
    }

    #[tokio::test]
    async fn open_truncates_previous_contents() {
        let dir = tempfile::tempdir().unwrap();
        let p = project("api");

        let log = ProjectLog::open(dir.path(), &p, LogKind::Runtime).await.unwrap();
        log.log_line("first run").await.unwrap();
        drop(log);

        let log = ProjectLog::open(dir.path(), &p, LogKind::Runtime).await.unwrap();
        log.log("second ").await.unwrap();
        log.log("run\n").await.unwrap();

        assert_eq!(log.read().await.unwrap(), "second run\n");
    }

    #[tokio::test]
    async fn kinds_are_separate_files() {
        let dir = tempfile::tempdir().unwrap();
        let p = project("api");

        let runtime = ProjectLog::open(dir.path(), &p, LogKind::Runtime).await.unwrap();
        let build = ProjectLog::open(dir.path(), &p, LogKind::Build).await.unwrap();
        runtime.log_line("serving").await.unwrap();
        build.log_line("compiling").await.unwrap();

        assert_ne!(runtime.path(), build.path());
        assert_eq!(
            ProjectLog::read_existing(dir.path(), &p, LogKind::Build).await.unwrap(),
            "compiling\n"
        );
    }

    #[tokio::test]
    async fn append_keeps_previous_contents() {
        let dir = tempfile::tempdir().unwrap();
        let p = project("api");

        let log = ProjectLog::open(dir.path(), &p, LogKind::Runtime).await.unwrap();
        log.log_line("step one").await.unwrap();
        drop(log);

        let log = ProjectLog::append(dir.path(), &p, LogKind::Runtime).await.unwrap();
        log.log_line("step two").await.unwrap();

        assert_eq!(log.read().await.unwrap(), "step one\nstep two\n");
    }

    #[tokio::test]
    async fn read_existing_is_empty_for_missing_log() {
        let dir = tempfile::tempdir().unwrap();
        let text = ProjectLog::read_existing(dir.path(), &project("nope"), LogKind::Runtime)
            .await
            .unwrap();
        assert!(text.is_empty());
    }

    #[test]
    fn sanitize_blocks_path_traversal() {
        assert_eq!(sanitize("../../etc"), ".._.._etc");
        assert_eq!(sanitize(".."), "_");
        assert_eq!(sanitize("my app/v2"), "my_app_v2");
        assert_eq!(sanitize("web-1.api"), "web-1.api");
    }
}
