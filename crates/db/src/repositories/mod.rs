//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async CRUD methods
//! that accept `&PgPool` as the first argument. Writes that take part in
//! the completion transaction accept any [`sqlx::PgExecutor`] instead.

pub mod bus_event_repo;
pub mod cad_file_repo;
pub mod completion_repo;
pub mod processing_plan_repo;
pub mod project_repo;
pub mod task_repo;
pub mod tool_repo;

pub use bus_event_repo::BusEventRepo;
pub use cad_file_repo::CadFileRepo;
pub use completion_repo::CompletionRepo;
pub use processing_plan_repo::ProcessingPlanRepo;
pub use project_repo::ProjectRepo;
pub use task_repo::TaskRepo;
pub use tool_repo::ToolRepo;
