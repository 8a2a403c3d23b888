use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: Uuid,
    pub title: String,
    pub completed: bool,
    pub created_at: DateTime<Utc>,
}

/// Body of `POST /api/tasks`. `title` stays optional so a missing title is
/// reported as a validation error instead of a deserialization failure.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct CreateTaskRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
}

/// Body of `PUT /api/tasks/:id`. Absent fields keep their stored value; any
/// other task field sent along (`id`, `createdAt`) is ignored.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct UpdateTaskRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageBody {
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub version: String,
    pub timestamp: DateTime<Utc>,
}

impl Task {
    pub fn new(title: String, completed: bool) -> Self {
        Self {
            id: Uuid::new_v4(),
            title,
            completed,
            created_at: Utc::now(),
        }
    }

    /// Merge the supplied fields of `patch` into this task.
    ///
    /// The title is checked before anything is changed, so a rejected patch
    /// leaves the task untouched.
    pub fn apply(&mut self, patch: UpdateTaskRequest) -> Result<(), String> {
        if let Some(title) = &patch.title {
            validate_title(title)?;
        }
        if let Some(title) = patch.title {
            self.title = title;
        }
        if let Some(completed) = patch.completed {
            self.completed = completed;
        }
        Ok(())
    }
}

/// A title is required and must contain something other than whitespace.
pub fn validate_title(title: &str) -> Result<&str, String> {
    if title.trim().is_empty() {
        Err("title is required".to_string())
    } else {
        Ok(title)
    }
}
