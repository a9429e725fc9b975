// Copyright (c) The playbill Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

#![warn(missing_docs)]

//! Concurrent performance-reporting engine for screenplay-style automation
//! sessions.
//!
//! A session is composed of many independently-executing *performances*
//! (logical units of work, each possibly running in parallel with others).
//! Each performance raises a flat stream of lifecycle events — operations
//! beginning and ending, results, failures, recorded assets, actor notices —
//! and this crate turns that stream into a nested report tree per
//! performance, then streams each finished tree to an append-only document on
//! disk the moment the performance finishes.
//!
//! The entry point is [`reporter::SessionReporter`], built via
//! [`reporter::SessionReporterBuilder`] and subscribed to a
//! [`notifier::SessionNotifier`]. The document format lives in
//! [`playbill_metadata`].

pub mod errors;
mod helpers;
pub mod notifier;
pub mod reporter;
