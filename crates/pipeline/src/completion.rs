//! Completion Handler.
//!
//! Folds the engine's completion events into CAD file, processing plan and
//! task records. Events are handled one at a time by a single consumer, so no
//! two completions race on the same record.
//!
//! Each completion is folded in with one [`EntityStore::apply_completion`]
//! call, which also records it in the completion ledger under
//! `(task, CAD file, process type)`. A replay whose key is already recorded,
//! or whose task is already complete, is skipped without writes. A failed
//! apply leaves nothing behind, so the redelivered event starts clean.
//!
//! [`EntityStore::apply_completion`]: sheetflow_db::EntityStore::apply_completion
//!
//! Any missing record or store failure is returned as a [`CompletionError`];
//! the consumer stops on it.

use sheetflow_core::codec::duration_to_nanos;
use sheetflow_core::processing::{ProcessType, TaskStatus};
use sheetflow_core::types::new_id;
use sheetflow_db::models::cad_file::{BendFeature, CadFile, FeatureProps};
use sheetflow_db::models::processing_plan::ProcessingPlan;
use sheetflow_db::models::task::{CompletionKey, Task};
use sheetflow_events::contracts::{
    BendFeatureReport, FeatureRecognitionComplete, ProcessPlanningComplete,
};
use sheetflow_events::InboundEvent;

use crate::context::ServiceContext;
use crate::error::CompletionError;

/// What handling one event amounted to.
#[derive(Debug, Clone, PartialEq)]
pub enum CompletionOutcome {
    /// Records were updated; carries the task as persisted.
    Applied(Task),
    /// The completion had already been applied.
    Duplicate,
    /// Not a completion kind; dropped.
    Ignored,
}

#[derive(Clone)]
pub struct CompletionHandler {
    ctx: ServiceContext,
}

impl CompletionHandler {
    pub fn new(ctx: ServiceContext) -> Self {
        Self { ctx }
    }

    pub async fn handle(&self, event: InboundEvent) -> Result<CompletionOutcome, CompletionError> {
        match event {
            InboundEvent::FeatureRecognitionComplete(e) => self.feature_recognition_complete(e).await,
            InboundEvent::ProcessPlanningComplete(e) => self.process_planning_complete(e).await,
            InboundEvent::Unknown(kind) => {
                tracing::warn!(kind = %kind, "Unknown event kind, dropping");
                Ok(CompletionOutcome::Ignored)
            }
        }
    }

    async fn feature_recognition_complete(
        &self,
        e: FeatureRecognitionComplete,
    ) -> Result<CompletionOutcome, CompletionError> {
        let key = CompletionKey {
            task_id: e.task_id,
            cad_file_id: e.cad_file_id,
            process_type: ProcessType::FeatureRecognition,
        };
        let Some((mut cad_file, mut task)) = self.load_targets(&key).await? else {
            return Ok(CompletionOutcome::Duplicate);
        };

        let mut bend_features = Vec::with_capacity(e.bend_features.len());
        for report in e.bend_features {
            bend_features.push(self.resolve_tool(report).await?);
        }

        let fre_time_ns = duration_to_nanos(e.feature_props.fre_time);
        cad_file.feature_props = FeatureProps {
            process_level: e.feature_props.process_level,
            bend_count: e.feature_props.bend_count,
            fre_time_ns,
            serial_data: e.feature_props.serial_data,
        };
        cad_file.bend_features = bend_features;
        task.apply_completion(fre_time_ns);

        let Some(task) = self.commit(&key, &cad_file, None, &task).await? else {
            return Ok(CompletionOutcome::Duplicate);
        };

        tracing::info!(
            user_id = %e.user_id,
            task_id = %task.id,
            task_status = %task.status,
            cad_file_id = %cad_file.id,
            bends = cad_file.bend_features.len(),
            "CAD file features saved",
        );
        Ok(CompletionOutcome::Applied(task))
    }

    async fn process_planning_complete(
        &self,
        e: ProcessPlanningComplete,
    ) -> Result<CompletionOutcome, CompletionError> {
        let key = CompletionKey {
            task_id: e.task_id,
            cad_file_id: e.cad_file_id,
            process_type: ProcessType::ProcessPlanning,
        };
        let Some((mut cad_file, mut task)) = self.load_targets(&key).await? else {
            return Ok(CompletionOutcome::Duplicate);
        };

        let report = e.processing_plan;
        let estimated_ns = duration_to_nanos(report.estimated_manufacturing_time);
        let plan = ProcessingPlan {
            id: new_id(),
            cad_file_id: cad_file.id,
            rotations: report.rotations,
            flips: report.flips,
            tools: report.tools,
            modules: report.modules,
            bending_sequences: report.bending_sequences,
            processing_time_ns: duration_to_nanos(report.processing_time),
            estimated_manufacturing_time_ns: estimated_ns,
            total_tool_distance: report.total_tool_distance,
            quantity: report.quantity,
            created_at: chrono::Utc::now(),
        };
        cad_file.feature_props.process_level = e.process_level;
        task.apply_completion(estimated_ns);

        let Some(task) = self.commit(&key, &cad_file, Some(&plan), &task).await? else {
            return Ok(CompletionOutcome::Duplicate);
        };

        tracing::info!(
            user_id = %e.user_id,
            task_id = %task.id,
            task_status = %task.status,
            cad_file_id = %cad_file.id,
            plan_id = %plan.id,
            "CAD file processing plan saved",
        );
        Ok(CompletionOutcome::Applied(task))
    }

    /// Load the CAD file and task an event refers to.
    ///
    /// Returns `None` when the completion was already applied.
    async fn load_targets(
        &self,
        key: &CompletionKey,
    ) -> Result<Option<(CadFile, Task)>, CompletionError> {
        let store = &self.ctx.store;

        if store.completion_recorded(key).await? {
            tracing::warn!(
                task_id = %key.task_id,
                cad_file_id = %key.cad_file_id,
                process_type = %key.process_type,
                "Completion already applied, skipping replay",
            );
            return Ok(None);
        }

        let cad_file = store
            .find_cad_file(key.cad_file_id)
            .await?
            .ok_or_else(|| CompletionError::not_found("CADFile", key.cad_file_id))?;
        let task = store
            .find_task(key.task_id)
            .await?
            .ok_or_else(|| CompletionError::not_found("Task", key.task_id))?;

        if task.status == TaskStatus::Complete {
            tracing::warn!(
                task_id = %task.id,
                cad_file_id = %key.cad_file_id,
                "Task already complete, skipping replay",
            );
            return Ok(None);
        }

        Ok(Some((cad_file, task)))
    }

    /// Attach the tool registered for the bend's angle.
    async fn resolve_tool(&self, report: BendFeatureReport) -> Result<BendFeature, CompletionError> {
        let tool = self
            .ctx
            .store
            .find_tool_by_angle(report.angle)
            .await?
            .ok_or_else(|| CompletionError::not_found("Tool", format!("for angle {}", report.angle)))?;

        let mut attributes = report.attributes;
        attributes.remove("tool_id");
        Ok(BendFeature {
            angle: report.angle,
            tool_id: Some(tool.tool_id),
            attributes,
        })
    }

    /// Apply every write of the completion at once and evict the task list.
    ///
    /// `None` means another delivery of the same completion got there first.
    async fn commit(
        &self,
        key: &CompletionKey,
        cad_file: &CadFile,
        plan: Option<&ProcessingPlan>,
        task: &Task,
    ) -> Result<Option<Task>, CompletionError> {
        let applied = self
            .ctx
            .store
            .apply_completion(key, cad_file, plan, task)
            .await?;
        match &applied {
            Some(_) => self.ctx.invalidate_task_list(),
            None => tracing::warn!(
                task_id = %key.task_id,
                cad_file_id = %key.cad_file_id,
                process_type = %key.process_type,
                "Completion recorded concurrently, skipping",
            ),
        }
        Ok(applied)
    }
}
