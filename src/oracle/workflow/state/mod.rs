// SPDX-License-Identifier: MIT

//! State management for the oracle workflow
//!
//! This module provides:
//! - `WorkflowState` - the request-scoped state and its patch merge
//! - the typed values its fields hold (`Domain`, `Tone`, `Intent`, `Tool`, `Turn`)

mod schema;
mod store;

pub use schema::{Domain, Intent, Tone, Tool, Turn};
pub use store::WorkflowState;
