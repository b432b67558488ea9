// SPDX-License-Identifier: MIT

pub mod graph;
pub mod state;
pub mod trace;
