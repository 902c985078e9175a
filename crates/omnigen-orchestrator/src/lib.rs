// SPDX-FileCopyrightText: 2026 Omnigen Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Task lifecycle orchestration for the Omnigen provider aggregator.
//!
//! This crate ties the adapter registry, the task store, the poll queue,
//! and the cost engine into one driver: [`Orchestrator`] handles
//! submission, status, refresh, and cancellation, and executes claimed
//! poll tickets; [`PollWorker`] sweeps the durable queue in the
//! background.

pub mod orchestrator;
pub mod worker;

pub use orchestrator::{Orchestrator, PollSettings, TaskView};
pub use worker::PollWorker;
