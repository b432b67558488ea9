// SPDX-License-Identifier: MIT

//! Provider-agnostic LLM kit: model adapters, the provider registry and the
//! resilient JSON completion client built on top of them.

pub mod completion;
pub mod error;
pub mod model;
pub mod registry;

pub use completion::{extract_json, Completion, CompletionClient, Payload};
pub use error::{ModelError, OracleError, StorageError, WorkflowError};
pub use model::{Content, GenerationConfig, Model, Part};
pub use registry::ModelRegistry;
