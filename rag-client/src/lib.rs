//! Terminal front-end for the WiiDcos API: upload documents, pick one (or
//! all) and ask questions.

mod api_types;
pub mod client;
mod command;
mod error;
pub mod repl;
mod state;

pub use api_types::{QueryReply, SourceRef, UploadReply};
pub use client::{ApiClient, DEFAULT_BASE_URL, DEFAULT_TIMEOUT};
pub use command::{Command, HELP};
pub use error::ClientError;
pub use repl::{EMPTY_ANSWER_HINT, Flow, Repl};
pub use state::{DocEntry, UiState};
