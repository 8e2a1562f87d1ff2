pub mod cad_files;
pub mod processing;
pub mod projects;
pub mod tasks;
