//! Bridge between the page and the remote app: form commands and the connection task.

pub mod commands;
pub mod runtime;
