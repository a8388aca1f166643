// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod activity;
pub mod credentials;
pub mod sync;

pub use activity::ActivityRecord;
pub use credentials::{Credentials, TokenKind};
pub use sync::{RecordError, SchedulerStatus, SyncKind, SyncRunResult};
