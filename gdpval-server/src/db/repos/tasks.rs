//! Task repository
//!
//! - create: one transaction fanning out over six tables
//! - get: header by task_id
//! - get_detail: header plus children, in one read-only snapshot
//! - list: filtered, paginated headers via `ListQuery::build`

use async_trait::async_trait;
use sqlx::postgres::{PgConnection, PgRow};
use sqlx::{FromRow, PgPool, Row};

use crate::db::filters::ListQuery;
use crate::db::{StoreError, TaskStore};
use crate::models::{
    FileCategory, FileMetadata, NewTask, StoredRubric, TaskDetail, TaskHeader, ValidationError,
};

/// PostgreSQL-backed task store
#[derive(Clone)]
pub struct PgTaskStore {
    pool: PgPool,
}

impl PgTaskStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl TaskStore for PgTaskStore {
    /// Insert header, rubrics, both file categories and both artifacts.
    ///
    /// The header insert goes first so the task_id unique constraint is the
    /// one that catches a duplicate; there is no existence pre-check. Any
    /// early return drops `tx` uncommitted, which rolls everything back.
    async fn create_task(&self, task: &NewTask) -> Result<TaskHeader, StoreError> {
        let write_err = |e: sqlx::Error| StoreError::from_write(e, &task.task_id);

        let mut tx = self.pool.begin().await.map_err(write_err)?;

        let header: TaskHeader = sqlx::query_as(
            r#"
            INSERT INTO gdpval_tasks
                (task_id, task_name, sector, occupation, instruction,
                 difficulty, expert_time_min, junior_time_min)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id, task_id, task_name, sector, occupation, status, created_at
            "#,
        )
        .bind(&task.task_id)
        .bind(&task.task_name)
        .bind(&task.sector)
        .bind(&task.occupation)
        .bind(&task.instruction)
        .bind(task.difficulty.as_str())
        .bind(task.expert_time_min)
        .bind(task.junior_time_min)
        .fetch_one(&mut *tx)
        .await
        .map_err(write_err)?;

        for (index, rubric) in task.rubrics.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO gdpval_rubrics (task_id, name, description, points, sort_order)
                VALUES ($1, $2, $3, $4, $5)
                "#,
            )
            .bind(&task.task_id)
            .bind(&rubric.name)
            .bind(rubric.description.as_deref())
            .bind(rubric.points)
            .bind(position("rubrics", index)?)
            .execute(&mut *tx)
            .await
            .map_err(write_err)?;
        }

        for category in [FileCategory::Solution, FileCategory::Data] {
            insert_files(&mut tx, category, &task.task_id, task.files(category)).await?;
        }

        sqlx::query("INSERT INTO gdpval_task_yaml (task_id, yaml_content) VALUES ($1, $2)")
            .bind(&task.task_id)
            .bind(&task.task_yaml)
            .execute(&mut *tx)
            .await
            .map_err(write_err)?;

        sqlx::query("INSERT INTO gdpval_solution_sh (task_id, script_content) VALUES ($1, $2)")
            .bind(&task.task_id)
            .bind(&task.solution_sh)
            .execute(&mut *tx)
            .await
            .map_err(write_err)?;

        tx.commit().await.map_err(write_err)?;

        tracing::info!(
            task_id = %header.task_id,
            rubrics = task.rubrics.len(),
            solution_files = task.solution_files.len(),
            data_files = task.data_files.len(),
            "task stored"
        );
        Ok(header)
    }

    async fn get_task(&self, task_id: &str) -> Result<TaskHeader, StoreError> {
        let header: TaskHeader = sqlx::query_as(
            r#"
            SELECT id, task_id, task_name, sector, occupation, status, created_at
            FROM gdpval_tasks
            WHERE task_id = $1
            "#,
        )
        .bind(task_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| not_found(task_id))?;

        Ok(header)
    }

    async fn get_task_detail(&self, task_id: &str) -> Result<TaskDetail, StoreError> {
        let mut tx = self.pool.begin().await?;

        // Every read below sees the same snapshot.
        sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ, READ ONLY")
            .execute(&mut *tx)
            .await?;

        let row = sqlx::query(
            r#"
            SELECT id, task_id, task_name, sector, occupation, status, created_at,
                   instruction, difficulty, expert_time_min, junior_time_min
            FROM gdpval_tasks
            WHERE task_id = $1
            "#,
        )
        .bind(task_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| not_found(task_id))?;

        let header = TaskHeader::from_row(&row)?;

        let rubrics = sqlx::query(
            r#"
            SELECT name, description, points, sort_order
            FROM gdpval_rubrics
            WHERE task_id = $1
            ORDER BY sort_order
            "#,
        )
        .bind(task_id)
        .fetch_all(&mut *tx)
        .await?
        .iter()
        .map(|r| -> Result<StoredRubric, sqlx::Error> {
            Ok(StoredRubric {
                name: r.try_get("name")?,
                description: r.try_get("description")?,
                points: r.try_get("points")?,
                sort_order: r.try_get("sort_order")?,
            })
        })
        .collect::<Result<Vec<_>, sqlx::Error>>()?;

        let solution_files = select_files(&mut tx, FileCategory::Solution, task_id).await?;
        let data_files = select_files(&mut tx, FileCategory::Data, task_id).await?;

        let task_yaml: String =
            sqlx::query_scalar("SELECT yaml_content FROM gdpval_task_yaml WHERE task_id = $1")
                .bind(task_id)
                .fetch_one(&mut *tx)
                .await?;

        let solution_sh: String =
            sqlx::query_scalar("SELECT script_content FROM gdpval_solution_sh WHERE task_id = $1")
                .bind(task_id)
                .fetch_one(&mut *tx)
                .await?;

        tx.commit().await?;

        Ok(TaskDetail {
            header,
            instruction: row.try_get("instruction")?,
            difficulty: row.try_get("difficulty")?,
            expert_time_min: row.try_get("expert_time_min")?,
            junior_time_min: row.try_get("junior_time_min")?,
            rubrics,
            solution_files,
            data_files,
            task_yaml,
            solution_sh,
        })
    }

    async fn list_tasks(&self, query: &ListQuery) -> Result<Vec<TaskHeader>, StoreError> {
        let mut builder = query.build();
        tracing::debug!(sql = builder.sql(), "listing tasks");

        let headers = builder
            .build_query_as::<TaskHeader>()
            .fetch_all(&self.pool)
            .await?;

        Ok(headers)
    }
}

fn not_found(task_id: &str) -> StoreError {
    StoreError::NotFound {
        task_id: task_id.to_owned(),
    }
}

/// Zero-based position in the submitted sequence, as stored.
fn position(list: &'static str, index: usize) -> Result<i32, StoreError> {
    i32::try_from(index).map_err(|_| {
        StoreError::Validation(ValidationError::TooLong {
            field: list,
            max: i32::MAX as usize,
        })
    })
}

/// Insert one category's file rows, keeping submission order in `position`.
async fn insert_files(
    conn: &mut PgConnection,
    category: FileCategory,
    task_id: &str,
    files: &[FileMetadata],
) -> Result<(), StoreError> {
    let sql = format!(
        r#"
        INSERT INTO {}
            (task_id, file_name, file_size, extension,
             width, height, resolution, duration_seconds, duration_formatted, position)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        "#,
        category.table()
    );

    for (index, file) in files.iter().enumerate() {
        sqlx::query(&sql)
            .bind(task_id)
            .bind(&file.name)
            .bind(file.size)
            .bind(&file.extension)
            .bind(file.width)
            .bind(file.height)
            .bind(file.resolution.as_deref())
            .bind(file.duration_seconds)
            .bind(file.duration_formatted.as_deref())
            .bind(position(category.list_name(), index)?)
            .execute(&mut *conn)
            .await
            .map_err(|e| StoreError::from_write(e, task_id))?;
    }
    Ok(())
}

async fn select_files(
    conn: &mut PgConnection,
    category: FileCategory,
    task_id: &str,
) -> Result<Vec<FileMetadata>, StoreError> {
    let sql = format!(
        r#"
        SELECT file_name, file_size, extension,
               width, height, resolution, duration_seconds, duration_formatted
        FROM {}
        WHERE task_id = $1
        ORDER BY position
        "#,
        category.table()
    );

    let rows = sqlx::query(&sql).bind(task_id).fetch_all(&mut *conn).await?;
    let files = rows
        .iter()
        .map(file_from_row)
        .collect::<Result<Vec<_>, sqlx::Error>>()?;
    Ok(files)
}

fn file_from_row(row: &PgRow) -> Result<FileMetadata, sqlx::Error> {
    Ok(FileMetadata {
        name: row.try_get("file_name")?,
        size: row.try_get("file_size")?,
        extension: row.try_get("extension")?,
        width: row.try_get("width")?,
        height: row.try_get("height")?,
        resolution: row.try_get("resolution")?,
        duration_seconds: row.try_get("duration_seconds")?,
        duration_formatted: row.try_get("duration_formatted")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positions_are_zero_based() {
        assert_eq!(position("rubrics", 0).unwrap(), 0);
        assert_eq!(position("rubrics", 7).unwrap(), 7);
    }

    #[test]
    fn oversized_position_is_validation_error() {
        let err = position("rubrics", usize::MAX).unwrap_err();
        assert_eq!(err.kind(), "validation_error");
    }

    #[test]
    fn position_error_names_file_list() {
        for category in [FileCategory::Solution, FileCategory::Data] {
            let err = position(category.list_name(), usize::MAX).unwrap_err();
            assert!(err.to_string().contains(category.list_name()), "{err}");
        }
    }
}
