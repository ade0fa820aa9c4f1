use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::models::Template;

pub type JobId = i64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    #[default]
    Instagram,
    Facebook,
    Twitter,
    Tiktok,
    Youtube,
    Linkedin,
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Platform::Instagram => "instagram",
            Platform::Facebook => "facebook",
            Platform::Twitter => "twitter",
            Platform::Tiktok => "tiktok",
            Platform::Youtube => "youtube",
            Platform::Linkedin => "linkedin",
        };
        f.pad(name)
    }
}

/// Backend-reported lifecycle of a search or message task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    #[default]
    Pending,
    Running,
    Processing,
    Completed,
    Failed,
    Stopped,
    /// Any status string this client does not know yet.
    #[serde(other)]
    Unknown,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed | JobStatus::Stopped)
    }

    pub fn is_active(self) -> bool {
        matches!(self, JobStatus::Running | JobStatus::Processing)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            JobStatus::Pending => "pending",
            JobStatus::Running => "running",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
            JobStatus::Stopped => "stopped",
            JobStatus::Unknown => "unknown",
        };
        f.pad(name)
    }
}

/// Common view over anything a job poller can track.
pub trait JobSummary {
    fn job_id(&self) -> JobId;
    fn job_status(&self) -> JobStatus;

    fn is_terminal(&self) -> bool {
        self.job_status().is_terminal()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_followers: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_followers: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_following: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_following: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_posts: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_posts: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_verified: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_private: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_website: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchTask {
    pub id: JobId,
    pub name: String,
    #[serde(default)]
    pub platform: Platform,
    #[serde(default)]
    pub search_params: SearchParams,
    #[serde(default)]
    pub status: JobStatus,
    #[serde(default)]
    pub result_count: u64,
    #[serde(default)]
    pub results_limit: Option<u32>,
    #[serde(default)]
    pub is_completed: bool,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub completed_at: Option<String>,
}

impl JobSummary for SearchTask {
    fn job_id(&self) -> JobId {
        self.id
    }

    fn job_status(&self) -> JobStatus {
        self.status
    }

    fn is_terminal(&self) -> bool {
        self.is_completed || self.status.is_terminal()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchTaskCreate {
    pub name: String,
    pub platform: Platform,
    pub search_params: SearchParams,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub results_limit: Option<u32>,
}

/// Row returned by `GET /search-tasks/status`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchTaskStatus {
    pub id: JobId,
    #[serde(default)]
    pub status: JobStatus,
    #[serde(default)]
    pub result_count: u64,
    #[serde(default)]
    pub is_completed: bool,
    #[serde(default)]
    pub error_message: Option<String>,
}

impl From<SearchTask> for SearchTaskStatus {
    fn from(task: SearchTask) -> Self {
        Self {
            id: task.id,
            status: task.status,
            result_count: task.result_count,
            is_completed: task.is_completed,
            error_message: task.error_message,
        }
    }
}

impl JobSummary for SearchTaskStatus {
    fn job_id(&self) -> JobId {
        self.id
    }

    fn job_status(&self) -> JobStatus {
        self.status
    }

    fn is_terminal(&self) -> bool {
        self.is_completed || self.status.is_terminal()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageTask {
    pub id: JobId,
    pub name: String,
    #[serde(default)]
    pub template: Option<Template>,
    #[serde(default)]
    pub total_users: u64,
    #[serde(default)]
    pub success_count: u64,
    #[serde(default)]
    pub failed_count: u64,
    #[serde(default)]
    pub status: JobStatus,
    #[serde(default)]
    pub progress: f64,
    #[serde(default)]
    pub speed: Option<f64>,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
    #[serde(default)]
    pub started_at: Option<String>,
    #[serde(default)]
    pub completed_at: Option<String>,
}

impl JobSummary for MessageTask {
    fn job_id(&self) -> JobId {
        self.id
    }

    fn job_status(&self) -> JobStatus {
        self.status
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageTaskSettings {
    /// Seconds between two messages.
    pub interval: u32,
    pub daily_limit: u32,
}

impl Default for MessageTaskSettings {
    fn default() -> Self {
        Self {
            interval: 60,
            daily_limit: 50,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageTaskCreate {
    pub name: String,
    pub template_id: i64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub user_ids: Vec<i64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub group_ids: Vec<i64>,
    pub settings: MessageTaskSettings,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub variables: BTreeMap<String, String>,
}

impl From<MessageTask> for MessageTaskStatus {
    fn from(task: MessageTask) -> Self {
        Self {
            id: task.id,
            status: task.status,
            progress: task.progress,
            success_count: task.success_count,
            failed_count: task.failed_count,
            speed: task.speed,
        }
    }
}

/// Row returned by `GET /messages/message-tasks/status`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageTaskStatus {
    pub id: JobId,
    #[serde(default)]
    pub status: JobStatus,
    #[serde(default)]
    pub progress: f64,
    #[serde(default)]
    pub success_count: u64,
    #[serde(default)]
    pub failed_count: u64,
    #[serde(default)]
    pub speed: Option<f64>,
}

impl JobSummary for MessageTaskStatus {
    fn job_id(&self) -> JobId {
        self.id
    }

    fn job_status(&self) -> JobStatus {
        self.status
    }
}
