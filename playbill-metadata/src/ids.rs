// Copyright (c) The playbill Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed identifiers for sessions and performances.

use newtype_uuid::{TypedUuid, TypedUuidKind, TypedUuidTag};

/// UUID kind for a reporting session.
pub enum SessionKind {}

impl TypedUuidKind for SessionKind {
    fn tag() -> TypedUuidTag {
        const TAG: TypedUuidTag = TypedUuidTag::new("playbill_session");
        TAG
    }
}

/// A unique identifier for one reporting session.
pub type SessionUuid = TypedUuid<SessionKind>;

/// UUID kind for a performance.
pub enum PerformanceKind {}

impl TypedUuidKind for PerformanceKind {
    fn tag() -> TypedUuidTag {
        const TAG: TypedUuidTag = TypedUuidTag::new("playbill_performance");
        TAG
    }
}

/// A unique identifier for one performance within a session.
///
/// Assigned when the performance begins and used as the correlation key for
/// every event belonging to that performance.
pub type PerformanceUuid = TypedUuid<PerformanceKind>;
