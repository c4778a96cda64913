// SPDX-License-Identifier: MIT

pub mod catalog;
pub mod classifier;
pub mod config;
pub mod graph;
pub mod pipeline;
pub mod proposer;
pub mod resolver;
pub mod server;
pub mod validator;
