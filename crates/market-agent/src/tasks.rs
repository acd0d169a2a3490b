//! Task store backed by a JSONL file
//!
//! The file is re-read only when its modification time differs from the last
//! one observed, so a rewrite that keeps the same mtime goes unnoticed.

use serde::{Deserialize, Serialize};
use serde_json::json;
use std::fs;
use std::io;
use std::path::PathBuf;
use std::time::SystemTime;
use tracing::{info, warn};

use crate::trajectory::{TrajectoryEvent, TrajectoryRecorder};

/// Task priority
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
    Critical,
}

/// A pending work item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    #[serde(rename = "desc", alias = "description")]
    pub description: String,
    pub cost: u64,
    #[serde(default)]
    pub priority: Priority,
}

impl Task {
    pub fn new(description: impl Into<String>, cost: u64, priority: Priority) -> Self {
        Self {
            description: description.into(),
            cost,
            priority,
        }
    }
}

/// Result of polling the task source
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskLoad {
    /// The source changed; this replaces the previous task set
    Loaded(Vec<Task>),
    /// Same modification time as the last load
    Unchanged,
}

/// Tasks written when the source does not exist yet
pub fn default_tasks() -> Vec<Task> {
    vec![
        Task::new("Fix memory leak in login module", 5000, Priority::High),
        Task::new("Implement user authentication", 7500, Priority::Medium),
        Task::new(
            "Fix security vulnerability in payment processing",
            8000,
            Priority::Critical,
        ),
        Task::new("Add dark mode support", 3500, Priority::Low),
        Task::new("Fix database connection timeout", 4200, Priority::Medium),
    ]
}

/// Parse one task per line, skipping lines that are not tasks
pub fn parse_tasks(content: &str) -> Vec<Task> {
    content
        .lines()
        .filter_map(|line| serde_json::from_str(line.trim()).ok())
        .collect()
}

/// Change-tracked view of the task source
#[derive(Debug)]
pub struct TaskStore {
    path: PathBuf,
    last_modified: Option<SystemTime>,
    recorder: TrajectoryRecorder,
}

impl TaskStore {
    pub fn new(path: impl Into<PathBuf>, recorder: TrajectoryRecorder) -> Self {
        Self {
            path: path.into(),
            last_modified: None,
            recorder,
        }
    }

    /// Poll the source. Never fails: unreadable sources yield an empty task set.
    pub fn load(&mut self) -> TaskLoad {
        match self.reload_if_changed() {
            Ok(load) => load,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                println!(
                    "Data file {} not found, creating with sample data",
                    self.path.display()
                );
                if let Err(e) = self.write_defaults() {
                    return self.degrade(e);
                }
                match self.reload_if_changed() {
                    Ok(load) => load,
                    Err(e) => self.degrade(e),
                }
            }
            Err(e) => self.degrade(e),
        }
    }

    fn reload_if_changed(&mut self) -> io::Result<TaskLoad> {
        let modified = fs::metadata(&self.path)?.modified()?;
        if self.last_modified == Some(modified) {
            return Ok(TaskLoad::Unchanged);
        }

        let content = fs::read_to_string(&self.path)?;
        self.last_modified = Some(modified);

        let tasks = parse_tasks(&content);
        info!(path = %self.path.display(), tasks = tasks.len(), "Loaded tasks");
        println!("Loaded {} issues from {}", tasks.len(), self.path.display());
        self.recorder.record(
            TrajectoryEvent::DataReload,
            json!({"file": self.path.display().to_string(), "issues_count": tasks.len()}),
        );

        Ok(TaskLoad::Loaded(tasks))
    }

    fn write_defaults(&self) -> io::Result<()> {
        let tasks = default_tasks();
        let mut content = String::new();
        for task in &tasks {
            content.push_str(&serde_json::to_string(task)?);
            content.push('\n');
        }
        fs::write(&self.path, content)?;

        self.recorder.record(
            TrajectoryEvent::DataCreated,
            json!({"file": self.path.display().to_string(), "issues_count": tasks.len()}),
        );
        Ok(())
    }

    fn degrade(&self, error: io::Error) -> TaskLoad {
        warn!(path = %self.path.display(), error = %error, "Error loading agent data");
        println!("Error loading agent data: {}", error);
        self.recorder.record(
            TrajectoryEvent::DataError,
            json!({"file": self.path.display().to_string(), "error": error.to_string()}),
        );
        TaskLoad::Loaded(Vec::new())
    }
}
