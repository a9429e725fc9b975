// Copyright (c) The playbill Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

#![warn(missing_docs)]

//! Structured access to playbill session report documents.
//!
//! A playbill document is the durable record of one automation session: a
//! metadata header followed by an array of performance reports, each holding
//! a recursively nested tree of reportable nodes. The engine in
//! `playbill-reporter` streams the document to disk as performances finish;
//! this crate defines the format itself so that downstream tools can read
//! documents without depending on the engine.

mod errors;
mod ids;
mod report;

pub use errors::*;
pub use ids::*;
pub use report::*;
