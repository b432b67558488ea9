// SPDX-License-Identifier: MIT

//! Stage graph construction and execution

pub mod executor;
pub mod types;

pub use executor::{CompiledGraph, MAX_STEPS};
pub use types::{Edge, Stage, StageError, StageGraph};
