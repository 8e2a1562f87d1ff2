//! Row types and DTOs, one module per table.

pub mod bus_event;
pub mod cad_file;
pub mod processing_plan;
pub mod project;
pub mod task;
pub mod tool;
