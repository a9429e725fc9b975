// Copyright (c) The playbill Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Errors produced by the reporting engine.

use crate::helpers::plural;
use camino::Utf8PathBuf;
use playbill_metadata::PerformanceUuid;
use std::io;
use thiserror::Error;

/// An event arrived that violates the expected nesting order for a single
/// performance.
///
/// This always indicates a bug in the event-emitting layer, not a runtime or
/// environment failure, and is surfaced loudly rather than absorbed: a
/// silently-dropped violation would corrupt the report tree for the rest of
/// that performance.
#[derive(Clone, Debug, Error)]
pub enum ProtocolViolation {
    /// A result, asset, end, or failure was recorded while no operation was
    /// in progress.
    #[error("`{event}` recorded with no operation in progress")]
    NoCurrentOperation {
        /// The event that was being recorded.
        event: &'static str,
    },

    /// The performance finished while operations were still in progress.
    #[error(
        "performance finished with {depth} unended {}, innermost `{innermost}`",
        plural::operations_str(*.depth)
    )]
    DanglingOperations {
        /// How many operations were still on the nesting stack.
        depth: usize,

        /// The declared type name of the most recently begun operation.
        innermost: String,
    },
}

/// An error produced by the report registry while managing per-performance
/// builders.
#[derive(Clone, Debug, Error)]
pub enum RegistryError {
    /// A performance began with an identity that is already being tracked.
    ///
    /// Indicates a reused or colliding identity in the emitting layer.
    #[error("performance {performance_id} is already being tracked")]
    DuplicateIdentity {
        /// The colliding identity.
        performance_id: PerformanceUuid,
    },

    /// An event arrived for a performance that never began, or that already
    /// finished.
    #[error("no performance {performance_id} is currently tracked")]
    UnknownPerformance {
        /// The unrecognized identity.
        performance_id: PerformanceUuid,
    },

    /// A nesting violation surfaced while finalizing a performance.
    #[error(transparent)]
    Protocol(#[from] ProtocolViolation),
}

/// An error produced while streaming reports to the output document.
///
/// The engine never retries: the failure propagates to the caller, which
/// decides whether to continue in a reporting-disabled mode. Elements written
/// before the failure remain intact in the document.
#[derive(Debug, Error)]
pub enum StreamWriteError {
    /// Creating the output document (or its parent directory) failed.
    #[error("error creating report document `{path}`")]
    Create {
        /// The document path.
        path: Utf8PathBuf,

        /// The underlying error.
        #[source]
        error: io::Error,
    },

    /// Writing to the output document failed.
    #[error("error writing to report document `{path}`")]
    Write {
        /// The document path.
        path: Utf8PathBuf,

        /// The underlying error.
        #[source]
        error: io::Error,
    },

    /// Serializing a report or the session header failed.
    #[error("error serializing session report data")]
    Serialize {
        /// The underlying error.
        #[source]
        error: serde_json::Error,
    },

    /// `append` or `close` was called before the document was opened.
    #[error("report document was not opened")]
    NotOpen,

    /// `open` was called on a document that is already open.
    #[error("report document is already open")]
    AlreadyOpen,

    /// The document was already sealed by a previous `close`.
    #[error("report document is already closed")]
    AlreadyClosed,
}

/// An error that occurred while handling a single session event.
///
/// This is the error surface of the reporting facade: every registry,
/// builder, and stream failure funnels through it.
#[derive(Debug, Error)]
pub enum WriteEventError {
    /// A registry-level failure.
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// A nesting violation in the performance the event belongs to.
    #[error(transparent)]
    Protocol(#[from] ProtocolViolation),

    /// A failure writing to the output document.
    #[error(transparent)]
    Stream(#[from] StreamWriteError),
}
