//! Utility modules shared by the pipeline and the CLI.

pub mod html;
pub mod mime;
pub mod size;
