//! In-process task store
//!
//! Same contract as `PgTaskStore` (duplicate detection, header-only reads,
//! filter and ordering rules) without a database. Used to exercise the
//! HTTP surface in tests.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use super::filters::{FilterField, ListQuery};
use super::{StoreError, TaskStore};
use crate::models::{NewTask, StoredRubric, TaskDetail, TaskHeader};

/// Status the schema assigns to a freshly inserted task
pub const INITIAL_STATUS: &str = "draft";

#[derive(Default)]
struct Inner {
    tasks: HashMap<String, Entry>,
    next_seq: u64,
}

struct Entry {
    seq: u64,
    detail: TaskDetail,
}

/// Mutex-guarded map of task_id to stored task
#[derive(Default)]
pub struct MemoryTaskStore {
    inner: Mutex<Inner>,
}

impl MemoryTaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored tasks
    pub fn len(&self) -> usize {
        self.lock().tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl TaskStore for MemoryTaskStore {
    async fn create_task(&self, task: &NewTask) -> Result<TaskHeader, StoreError> {
        let mut inner = self.lock();
        if inner.tasks.contains_key(&task.task_id) {
            return Err(StoreError::DuplicateTaskId {
                task_id: task.task_id.clone(),
            });
        }

        let header = TaskHeader {
            id: Uuid::new_v4(),
            task_id: task.task_id.clone(),
            task_name: task.task_name.clone(),
            sector: task.sector.clone(),
            occupation: task.occupation.clone(),
            status: INITIAL_STATUS.to_owned(),
            created_at: Utc::now(),
        };

        let rubrics = task
            .rubrics
            .iter()
            .zip(0..)
            .map(|(r, sort_order)| StoredRubric {
                name: r.name.clone(),
                description: r.description.clone(),
                points: r.points,
                sort_order,
            })
            .collect();

        let detail = TaskDetail {
            header: header.clone(),
            instruction: task.instruction.clone(),
            difficulty: task.difficulty.as_str().to_owned(),
            expert_time_min: task.expert_time_min,
            junior_time_min: task.junior_time_min,
            rubrics,
            solution_files: task.solution_files.clone(),
            data_files: task.data_files.clone(),
            task_yaml: task.task_yaml.clone(),
            solution_sh: task.solution_sh.clone(),
        };

        let seq = inner.next_seq;
        inner.next_seq += 1;
        inner.tasks.insert(task.task_id.clone(), Entry { seq, detail });
        Ok(header)
    }

    async fn get_task(&self, task_id: &str) -> Result<TaskHeader, StoreError> {
        self.get_task_detail(task_id).await.map(|d| d.header)
    }

    async fn get_task_detail(&self, task_id: &str) -> Result<TaskDetail, StoreError> {
        self.lock()
            .tasks
            .get(task_id)
            .map(|e| e.detail.clone())
            .ok_or_else(|| StoreError::NotFound {
                task_id: task_id.to_owned(),
            })
    }

    async fn list_tasks(&self, query: &ListQuery) -> Result<Vec<TaskHeader>, StoreError> {
        let inner = self.lock();
        let mut matching: Vec<&Entry> = inner
            .tasks
            .values()
            .filter(|e| {
                query.filter.predicates().all(|(field, value)| {
                    let header = &e.detail.header;
                    let actual = match field {
                        FilterField::Sector => &header.sector,
                        FilterField::Occupation => &header.occupation,
                        FilterField::Status => &header.status,
                    };
                    actual == value
                })
            })
            .collect();

        matching.sort_by(|a, b| {
            b.detail
                .header
                .created_at
                .cmp(&a.detail.header.created_at)
                .then(b.seq.cmp(&a.seq))
        });

        let offset = usize::try_from(query.offset).unwrap_or(usize::MAX);
        let limit = usize::try_from(query.limit).unwrap_or(usize::MAX);
        Ok(matching
            .into_iter()
            .skip(offset)
            .take(limit)
            .map(|e| e.detail.header.clone())
            .collect())
    }
}
