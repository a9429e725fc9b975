// Copyright (c) The playbill Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use camino::Utf8PathBuf;
use chrono::{DateTime, FixedOffset, Local};
use playbill_metadata::{PerformanceOutcome, PerformanceUuid, ScopeSegment};

/// A session event.
///
/// Events are produced by the screenplay execution layer and consumed by a
/// [`SessionReporter`](crate::reporter::SessionReporter) through a
/// [`SessionNotifier`](crate::notifier::SessionNotifier).
#[derive(Clone, Debug)]
pub struct SessionEvent {
    /// The time at which the event was generated, including the offset from
    /// UTC.
    pub timestamp: DateTime<FixedOffset>,

    /// The kind of session event this is.
    pub kind: SessionEventKind,
}

impl SessionEvent {
    /// Creates an event stamped with the current local time.
    pub fn now(kind: SessionEventKind) -> Self {
        Self {
            timestamp: Local::now().fixed_offset(),
            kind,
        }
    }
}

/// The kind of session event this is.
///
/// Forms part of [`SessionEvent`]. Every variant that belongs to one
/// performance carries that performance's identity as the correlation key.
#[derive(Clone, Debug)]
pub enum SessionEventKind {
    /// The session started. Raised once, before any performance begins.
    SessionStarted,

    /// The session ended. Raised once, after every performance has finished.
    SessionFinished,

    /// A performance started running.
    PerformanceBegun {
        /// The new performance's identity.
        performance_id: PerformanceUuid,

        /// The performance's place in the organizational hierarchy,
        /// outermost level first.
        scope: Vec<ScopeSegment>,
    },

    /// A performance finished running.
    PerformanceFinished {
        /// The performance that finished.
        performance_id: PerformanceUuid,

        /// How it concluded. Decided by the execution layer, not by the
        /// reporting engine.
        outcome: PerformanceOutcome,
    },

    /// An operation started. The operation becomes the performance's current
    /// operation until it ends or fails.
    OperationBegun {
        /// The performance the operation belongs to.
        performance_id: PerformanceUuid,

        /// The operation's declared type name.
        type_name: String,

        /// The name of the acting entity.
        actor: String,

        /// Free-form phase tag, e.g. `setup`, `action` or `assertion`.
        /// Empty if untagged.
        phase: String,
    },

    /// The current operation completed normally.
    OperationEnded {
        /// The performance the operation belongs to.
        performance_id: PerformanceUuid,

        /// The rendered human-readable report for the operation.
        description: String,
    },

    /// The current operation produced a result value.
    OperationResult {
        /// The performance the operation belongs to.
        performance_id: PerformanceUuid,

        /// The rendered result value.
        rendered_value: String,
    },

    /// The current operation failed. A failure always ends the operation.
    ///
    /// When a failure unwinds through nested operations, the emitting layer
    /// raises this event once per open operation, innermost first. The
    /// `from_nested` flag is an input contract of the emitting layer: false
    /// on the operation where the failure originated, true on every
    /// enclosing operation it surfaced through. It is recorded as supplied,
    /// never inferred.
    OperationFailed {
        /// The performance the operation belongs to.
        performance_id: PerformanceUuid,

        /// The rendered exception text.
        message: String,

        /// True if the failure surfaced from a nested operation.
        from_nested: bool,
    },

    /// A file-system asset was recorded against the current operation.
    AssetRecorded {
        /// The performance the asset belongs to.
        performance_id: PerformanceUuid,

        /// Path to the asset on disk. Produced and owned by an external
        /// collaborator; recorded without validation.
        path: Utf8PathBuf,

        /// A human-readable summary of what the asset shows.
        summary: String,
    },

    /// An actor was created.
    ActorCreated {
        /// The performance the actor belongs to.
        performance_id: PerformanceUuid,

        /// The actor's name.
        actor: String,
    },

    /// An actor gained an ability.
    AbilityGained {
        /// The performance the actor belongs to.
        performance_id: PerformanceUuid,

        /// The actor's name.
        actor: String,

        /// The rendered description of the ability.
        description: String,
    },

    /// The spotlight moved to an actor.
    ActorSpotlit {
        /// The performance the actor belongs to.
        performance_id: PerformanceUuid,

        /// The actor's name.
        actor: String,
    },

    /// The spotlight was cleared.
    SpotlightCleared {
        /// The performance whose spotlight was cleared.
        performance_id: PerformanceUuid,
    },
}
