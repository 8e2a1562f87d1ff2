//! Task entity model: the tracking record for in-flight engine work.

use serde::{Deserialize, Serialize};
use sheetflow_core::processing::{ProcessType, TaskStatus};
use sheetflow_core::types::{EntityId, Timestamp};
use sqlx::FromRow;

/// A row from the `tasks` table.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Task {
    pub id: EntityId,
    pub user_id: EntityId,
    #[sqlx(rename = "status_id", try_from = "i16")]
    pub status: TaskStatus,
    #[sqlx(json)]
    pub process_types: Vec<ProcessType>,
    /// Display names of the CAD files this task covers.
    pub cad_files: Vec<String>,
    /// Number of sub-jobs dispatched under this task.
    pub quantity: i64,
    /// Number of sub-jobs whose completion has been applied.
    pub completed: i64,
    pub processing_time_ns: i64,
    pub created_at: Timestamp,
}

impl Task {
    /// A new task in `Processing` with no sub-jobs yet.
    pub fn processing(id: EntityId, user_id: EntityId) -> Self {
        Self {
            id,
            user_id,
            status: TaskStatus::Processing,
            process_types: Vec::new(),
            cad_files: Vec::new(),
            quantity: 0,
            completed: 0,
            processing_time_ns: 0,
            created_at: chrono::Utc::now(),
        }
    }

    /// Count one applied completion and its duration, flipping the task to
    /// `Complete` once every dispatched sub-job has reported back.
    pub fn apply_completion(&mut self, duration_ns: i64) {
        self.completed += 1;
        self.processing_time_ns = self.processing_time_ns.saturating_add(duration_ns);
        if self.completed >= self.quantity {
            self.status = TaskStatus::Complete;
        }
    }
}

/// Dedup key of one applied completion event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CompletionKey {
    pub task_id: EntityId,
    pub cad_file_id: EntityId,
    pub process_type: ProcessType,
}

#[cfg(test)]
mod tests {
    use super::*;
    use sheetflow_core::types::new_id;

    #[test]
    fn single_job_task_completes_with_event_duration() {
        let mut task = Task::processing(new_id(), new_id());
        task.quantity = 1;

        task.apply_completion(2_000);

        assert_eq!(task.status, TaskStatus::Complete);
        assert_eq!(task.processing_time_ns, 2_000);
    }

    #[test]
    fn batch_task_stays_processing_until_all_jobs_report() {
        let mut task = Task::processing(new_id(), new_id());
        task.quantity = 3;

        task.apply_completion(10);
        task.apply_completion(20);
        assert_eq!(task.status, TaskStatus::Processing);

        task.apply_completion(30);
        assert_eq!(task.status, TaskStatus::Complete);
        assert_eq!(task.completed, 3);
        assert_eq!(task.processing_time_ns, 60);
    }
}
