// SPDX-License-Identifier: MIT

//! Oracle's Choice: question classification, divination and narration on
//! top of the stage graph

pub mod agent;
pub mod config;
pub mod divination;
pub mod server;
pub mod stages;
pub mod storage;
pub mod workflow;

pub use agent::{ChatEvent, ChatRequest, ChatResponse, OracleAgent};
pub use config::Settings;
