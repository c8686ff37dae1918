//! Task payload and stored record types

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::ValidationError;

/// Maximum length of a caller-assigned task_id
pub const MAX_TASK_ID_LEN: usize = 128;

/// Points given to a rubric item when the caller omits them
const DEFAULT_RUBRIC_POINTS: i32 = 10;

/// Task difficulty
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Easy => "easy",
            Self::Medium => "medium",
            Self::Hard => "hard",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Difficulty {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "easy" => Ok(Self::Easy),
            "medium" => Ok(Self::Medium),
            "hard" => Ok(Self::Hard),
            other => Err(ValidationError::InvalidVariant {
                field: "difficulty",
                value: other.to_owned(),
            }),
        }
    }
}

/// One rubric item as submitted. Its position in `NewTask::rubrics`
/// becomes the stored `sort_order`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RubricItem {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "default_points")]
    pub points: i32,
}

fn default_points() -> i32 {
    DEFAULT_RUBRIC_POINTS
}

/// File metadata, shared by solution files and data files
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileMetadata {
    pub name: String,
    pub size: i64,
    pub extension: String,
    #[serde(default)]
    pub width: Option<i32>,
    #[serde(default)]
    pub height: Option<i32>,
    #[serde(default)]
    pub resolution: Option<String>,
    #[serde(default)]
    pub duration_seconds: Option<f64>,
    #[serde(default)]
    pub duration_formatted: Option<String>,
}

/// The two physically separate file-metadata collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileCategory {
    Solution,
    Data,
}

impl FileCategory {
    /// Backing table. Never derived from caller input.
    pub fn table(&self) -> &'static str {
        match self {
            Self::Solution => "gdpval_solution_files",
            Self::Data => "gdpval_data_files",
        }
    }

    pub fn list_name(&self) -> &'static str {
        match self {
            Self::Solution => "solution_files",
            Self::Data => "data_files",
        }
    }
}

/// Task submission payload (POST /api/tasks)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewTask {
    pub task_id: String,
    pub task_name: String,
    pub sector: String,
    pub occupation: String,
    pub instruction: String,
    #[serde(default)]
    pub difficulty: Difficulty,
    pub expert_time_min: i32,
    pub junior_time_min: i32,
    pub rubrics: Vec<RubricItem>,
    pub solution_files: Vec<FileMetadata>,
    #[serde(default)]
    pub data_files: Vec<FileMetadata>,
    pub task_yaml: String,
    pub solution_sh: String,
}

impl NewTask {
    /// Check value rules that serde cannot express.
    pub fn validate(&self) -> Result<(), ValidationError> {
        non_empty("task_id", &self.task_id)?;
        if self.task_id.chars().count() > MAX_TASK_ID_LEN {
            return Err(ValidationError::TooLong {
                field: "task_id",
                max: MAX_TASK_ID_LEN,
            });
        }
        if self.task_id.trim() != self.task_id {
            return Err(ValidationError::InvalidFormat {
                field: "task_id",
                reason: "must not have leading or trailing whitespace",
            });
        }
        non_empty("task_name", &self.task_name)?;
        non_empty("sector", &self.sector)?;
        non_empty("occupation", &self.occupation)?;
        non_empty("instruction", &self.instruction)?;
        non_negative("expert_time_min", i64::from(self.expert_time_min))?;
        non_negative("junior_time_min", i64::from(self.junior_time_min))?;

        if self.rubrics.is_empty() {
            return Err(ValidationError::Empty { field: "rubrics" });
        }
        for (index, rubric) in self.rubrics.iter().enumerate() {
            non_empty("name", &rubric.name)
                .map_err(|e| ValidationError::in_item("rubrics", index, e))?;
        }

        validate_files(FileCategory::Solution, &self.solution_files)?;
        validate_files(FileCategory::Data, &self.data_files)?;
        Ok(())
    }

    /// Files of one category, in submission order.
    pub fn files(&self, category: FileCategory) -> &[FileMetadata] {
        match category {
            FileCategory::Solution => &self.solution_files,
            FileCategory::Data => &self.data_files,
        }
    }
}

fn non_empty(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::Empty { field });
    }
    Ok(())
}

fn non_negative(field: &'static str, value: i64) -> Result<(), ValidationError> {
    if value < 0 {
        return Err(ValidationError::Negative { field });
    }
    Ok(())
}

fn validate_files(category: FileCategory, files: &[FileMetadata]) -> Result<(), ValidationError> {
    for (index, file) in files.iter().enumerate() {
        file.validate()
            .map_err(|e| ValidationError::in_item(category.list_name(), index, e))?;
    }
    Ok(())
}

impl FileMetadata {
    fn validate(&self) -> Result<(), ValidationError> {
        non_empty("name", &self.name)?;
        non_negative("size", self.size)?;
        if let Some(width) = self.width {
            non_negative("width", i64::from(width))?;
        }
        if let Some(height) = self.height {
            non_negative("height", i64::from(height))?;
        }
        if let Some(duration) = self.duration_seconds {
            if !duration.is_finite() {
                return Err(ValidationError::InvalidFormat {
                    field: "duration_seconds",
                    reason: "must be a finite number",
                });
            }
            if duration < 0.0 {
                return Err(ValidationError::Negative {
                    field: "duration_seconds",
                });
            }
        }
        Ok(())
    }
}

/// Task header as stored. This is the whole read/write response shape.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct TaskHeader {
    pub id: Uuid,
    pub task_id: String,
    pub task_name: String,
    pub sector: String,
    pub occupation: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

/// Rubric item read back with its stored position
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredRubric {
    pub name: String,
    pub description: Option<String>,
    pub points: i32,
    pub sort_order: i32,
}

/// Header plus every child row of one task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskDetail {
    #[serde(flatten)]
    pub header: TaskHeader,
    pub instruction: String,
    pub difficulty: String,
    pub expert_time_min: i32,
    pub junior_time_min: i32,
    pub rubrics: Vec<StoredRubric>,
    pub solution_files: Vec<FileMetadata>,
    pub data_files: Vec<FileMetadata>,
    pub task_yaml: String,
    pub solution_sh: String,
}
