//! Work Dispatcher.
//!
//! The processing level stored on a CAD file decides the next external job:
//! level 0 starts feature recognition, level 1 starts process planning, and
//! anything above is served from the stored processing plan. Each started job
//! is announced with one `*Started` event and tracked by a [`Task`].
//!
//! The task id is allocated up front and travels in the event so the engine
//! can echo it back. A single dispatch writes its task before emitting; a
//! batch emits every event first and writes its one task afterwards.

use serde::Serialize;
use sheetflow_core::error::CoreError;
use sheetflow_core::processing::{DispatchAction, ProcessType};
use sheetflow_core::types::{new_id, EntityId};
use sheetflow_db::models::cad_file::CadFile;
use sheetflow_db::models::processing_plan::ProcessingPlan;
use sheetflow_db::models::task::Task;
use sheetflow_events::contracts::{FeatureRecognitionStarted, ProcessPlanningStarted};
use sheetflow_events::emit_event;

use crate::context::ServiceContext;
use crate::error::PipelineError;
use crate::projects::owned_project;

/// Result of dispatching one CAD file.
#[derive(Debug, Clone)]
pub enum DispatchOutcome {
    /// A job was started and is tracked by `task`.
    Started {
        process_type: ProcessType,
        task: Task,
    },
    /// The file is fully processed; here is its plan.
    AlreadyProcessed { plan: ProcessingPlan },
}

impl DispatchOutcome {
    /// Human message returned to the caller.
    pub fn message(&self) -> &'static str {
        match self {
            Self::Started {
                process_type: ProcessType::FeatureRecognition,
                ..
            } => "Feature recognition started",
            Self::Started {
                process_type: ProcessType::ProcessPlanning,
                ..
            } => "Process planning started",
            Self::AlreadyProcessed { .. } => "CAD file has been fully processed",
        }
    }
}

/// One sub-job started by a batch dispatch.
#[derive(Debug, Clone, Serialize)]
pub struct StartedJob {
    pub cad_file_id: EntityId,
    pub file_name: String,
    pub process_type: ProcessType,
}

/// Result of dispatching every CAD file of a project.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchDispatch {
    /// The aggregate task; `None` when nothing was eligible.
    pub task: Option<Task>,
    pub started: Vec<StartedJob>,
}

/// The outbound event that starts one job.
enum StartEvent {
    FeatureRecognition(FeatureRecognitionStarted),
    ProcessPlanning(ProcessPlanningStarted),
}

impl StartEvent {
    /// Build the event for `process_type`. Feature recognition needs the
    /// step geometry to be stored already.
    fn build(
        user_id: EntityId,
        task_id: EntityId,
        cad_file: &CadFile,
        process_type: ProcessType,
    ) -> Result<Self, CoreError> {
        match process_type {
            ProcessType::FeatureRecognition => {
                let url = cad_file.step_url.clone().ok_or_else(|| {
                    CoreError::Validation(format!(
                        "CAD file {} has no step geometry yet",
                        cad_file.file_name
                    ))
                })?;
                Ok(Self::FeatureRecognition(FeatureRecognitionStarted {
                    user_id,
                    cad_file_id: cad_file.id,
                    task_id,
                    url,
                }))
            }
            ProcessType::ProcessPlanning => Ok(Self::ProcessPlanning(ProcessPlanningStarted {
                cad_file_id: cad_file.id,
                user_id,
                task_id,
                bend_count: i64::from(cad_file.feature_props.bend_count),
                serialized_data: cad_file.feature_props.serial_data.clone(),
            })),
        }
    }

    async fn emit(&self, ctx: &ServiceContext) -> Result<EntityId, PipelineError> {
        let emitter = ctx.emitter.as_ref();
        let event_id = match self {
            Self::FeatureRecognition(event) => emit_event(emitter, event).await?,
            Self::ProcessPlanning(event) => emit_event(emitter, event).await?,
        };
        Ok(event_id)
    }
}

/// Start the next job for one CAD file, or return its stored plan.
///
/// The task is written before its event goes out, so a completion can never
/// name a task that does not exist. If the emit then fails, the task stays
/// in `Processing` and the error is returned.
pub async fn dispatch_cad_file(
    ctx: &ServiceContext,
    user_id: EntityId,
    cad_file: &CadFile,
) -> Result<DispatchOutcome, PipelineError> {
    match DispatchAction::for_level(cad_file.feature_props.process_level) {
        DispatchAction::Start(process_type) => {
            let task_id = new_id();
            let event = StartEvent::build(user_id, task_id, cad_file, process_type)?;

            let mut task = Task::processing(task_id, user_id);
            task.quantity = 1;
            task.process_types.push(process_type);
            task.cad_files.push(cad_file.file_name.clone());
            let task = ctx.store.create_task(&task).await?;
            ctx.invalidate_task_list();

            let event_id = match event.emit(ctx).await {
                Ok(id) => id,
                Err(e) => {
                    tracing::error!(
                        task_id = %task.id,
                        cad_file_id = %cad_file.id,
                        error = %e,
                        "Task recorded but its job was not dispatched",
                    );
                    return Err(e);
                }
            };

            tracing::info!(
                user_id = %user_id,
                cad_file_id = %cad_file.id,
                task_id = %task.id,
                event_id = %event_id,
                process_type = %process_type,
                "Job dispatched",
            );
            Ok(DispatchOutcome::Started { process_type, task })
        }
        DispatchAction::AlreadyPlanned => {
            let plan = ctx
                .store
                .find_processing_plan(cad_file.id)
                .await?
                .ok_or_else(|| CoreError::not_found("ProcessingPlan", cad_file.id))?;
            Ok(DispatchOutcome::AlreadyProcessed { plan })
        }
    }
}

/// Start the next job for every eligible CAD file of a project under one
/// aggregate task.
///
/// Fully processed files are skipped, as are records still waiting for their
/// pair. Events are emitted in upload order; the task is written once, after
/// the last event, with `quantity` equal to the number of jobs started. If an
/// emit fails partway, the task is still written for the jobs already out
/// before the error is returned.
pub async fn dispatch_project(
    ctx: &ServiceContext,
    user_id: EntityId,
    project_id: EntityId,
) -> Result<BatchDispatch, PipelineError> {
    owned_project(ctx, project_id, user_id).await?;
    let cad_files = ctx.store.list_cad_files(project_id).await?;

    let mut task = Task::processing(new_id(), user_id);
    let mut started = Vec::new();

    for cad_file in &cad_files {
        let DispatchAction::Start(process_type) =
            DispatchAction::for_level(cad_file.feature_props.process_level)
        else {
            tracing::debug!(cad_file_id = %cad_file.id, "Already processed, skipping");
            continue;
        };
        if !cad_file.is_complete() {
            tracing::warn!(cad_file_id = %cad_file.id, "CAD file is missing half of its pair, skipping");
            continue;
        }

        let sent = match StartEvent::build(user_id, task.id, cad_file, process_type) {
            Ok(event) => event.emit(ctx).await,
            Err(e) => Err(e.into()),
        };
        let event_id = match sent {
            Ok(id) => id,
            Err(e) => {
                if !started.is_empty() {
                    record_partial_batch(ctx, &task, project_id).await;
                }
                return Err(e);
            }
        };
        tracing::debug!(
            cad_file_id = %cad_file.id,
            task_id = %task.id,
            event_id = %event_id,
            process_type = %process_type,
            "Batch job dispatched",
        );

        if !task.process_types.contains(&process_type) {
            task.process_types.push(process_type);
        }
        task.cad_files.push(cad_file.file_name.clone());
        task.quantity += 1;
        started.push(StartedJob {
            cad_file_id: cad_file.id,
            file_name: cad_file.file_name.clone(),
            process_type,
        });
    }

    if started.is_empty() {
        tracing::info!(project_id = %project_id, "Nothing to dispatch");
        return Ok(BatchDispatch::default());
    }

    let task = ctx.store.create_task(&task).await?;
    ctx.invalidate_task_list();

    tracing::info!(
        project_id = %project_id,
        task_id = %task.id,
        quantity = task.quantity,
        "Batch dispatched",
    );
    Ok(BatchDispatch {
        task: Some(task),
        started,
    })
}

/// Write the aggregate task of a batch that stopped partway. Failures are
/// logged; the caller returns the error that stopped the batch.
async fn record_partial_batch(ctx: &ServiceContext, task: &Task, project_id: EntityId) {
    match ctx.store.create_task(task).await {
        Ok(task) => {
            ctx.invalidate_task_list();
            tracing::warn!(
                project_id = %project_id,
                task_id = %task.id,
                quantity = task.quantity,
                "Batch stopped partway, task recorded for the jobs already dispatched",
            );
        }
        Err(e) => tracing::error!(
            project_id = %project_id,
            task_id = %task.id,
            error = %e,
            "Batch stopped partway and its task could not be recorded",
        ),
    }
}
