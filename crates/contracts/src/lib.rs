//! Response contracts — declarative shape rules for every reply.
//!
//! Each response type carries a contract: a word ceiling and a question
//! policy. The synthesizer builds a reply as [`ResponseParts`] and hands it
//! to the [`ContractEngine`], which checks it and repairs violations
//! before the reply leaves the pipeline.
//!
//! ```text
//! ┌─────────────┐    ┌──────────────┐    ┌─────────────┐
//! │ Synthesizer │───▶│  Contract    │───▶│   Reply     │
//! │   (parts)   │    │  Engine      │    │ + metadata  │
//! └─────────────┘    └──────────────┘    └─────────────┘
//!                          │
//!                    ┌─────┴──────┐
//!                    │ compress   │
//!                    │ add ?      │
//!                    │ prompts    │
//!                    └────────────┘
//! ```
//!
//! # Example contract file
//!
//! ```toml
//! [[contracts]]
//! response_type = "cognitive_intervention"
//! max_words = 160
//! question_policy = { kind = "guided_choice", min_prompts = 2, max_prompts = 3 }
//! ```

mod engine;
mod model;
pub mod text;

pub use engine::{ContractEngine, ContractLogEntry, Enforced, Violation};
pub use model::{ContractSet, QuestionPolicy, ResponseContract};
pub use text::ResponseParts;

/// Re-export for convenience.
pub type ContractResult<T> = std::result::Result<T, ContractError>;

/// Errors from the contract subsystem.
#[derive(Debug, thiserror::Error)]
pub enum ContractError {
    #[error("invalid contract '{name}': {reason}")]
    InvalidContract { name: String, reason: String },

    #[error("TOML parse error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("failed to read contract file {path}: {reason}")]
    ReadError { path: String, reason: String },
}
