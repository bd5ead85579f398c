// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the export pipeline.

pub mod activity;
pub mod credentials;
pub mod progress;
pub mod stream;

pub use activity::{Activity, ActivityFilter};
pub use credentials::Credentials;
pub use progress::ProgressRecord;
pub use stream::{Position, Stream};
