// Copyright (c) The playbill Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use super::builder::PerformanceReportBuilder;
use crate::errors::RegistryError;
use chrono::{DateTime, FixedOffset};
use dashmap::{DashMap, mapref::entry::Entry};
use playbill_metadata::{PerformanceOutcome, PerformanceReportSummary, PerformanceUuid, ScopeSegment};

/// Tracks one [`PerformanceReportBuilder`] per live performance.
///
/// The map is sharded by identity, so `begin`/`with_builder`/`end` calls for
/// unrelated performances proceed without contending on a single lock. Events
/// for one performance arrive from a single logical flow; the shard lock held
/// while routing is what hands that flow exclusive access to its builder.
#[derive(Debug, Default)]
pub struct ReportRegistry {
    performances: DashMap<PerformanceUuid, PerformanceReportBuilder>,
}

impl ReportRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts tracking a performance, creating its builder.
    ///
    /// The mapping for an identity is created exactly once; a second `begin`
    /// for a live identity indicates a reused or colliding identity.
    pub fn begin(
        &self,
        performance_id: PerformanceUuid,
        scope: Vec<ScopeSegment>,
        started_at: DateTime<FixedOffset>,
    ) -> Result<(), RegistryError> {
        match self.performances.entry(performance_id) {
            Entry::Occupied(_) => Err(RegistryError::DuplicateIdentity { performance_id }),
            Entry::Vacant(entry) => {
                entry.insert(PerformanceReportBuilder::new(
                    performance_id,
                    scope,
                    started_at,
                ));
                Ok(())
            }
        }
    }

    /// Routes an in-flight event to the performance's builder.
    ///
    /// Runs `f` with exclusive access to the builder and returns its value.
    /// Fails if the performance never began or already ended — both are
    /// defects in the emitting layer.
    pub fn with_builder<T>(
        &self,
        performance_id: PerformanceUuid,
        f: impl FnOnce(&mut PerformanceReportBuilder) -> T,
    ) -> Result<T, RegistryError> {
        match self.performances.get_mut(&performance_id) {
            Some(mut builder) => Ok(f(&mut builder)),
            None => Err(RegistryError::UnknownPerformance { performance_id }),
        }
    }

    /// Stops tracking a performance and returns its sealed report.
    ///
    /// The entry is removed even if sealing fails on a nesting violation: a
    /// builder known to be corrupt must not keep accepting events for that
    /// identity. The violation propagates to the caller either way.
    pub fn end(
        &self,
        performance_id: PerformanceUuid,
        outcome: PerformanceOutcome,
        finished_at: DateTime<FixedOffset>,
    ) -> Result<PerformanceReportSummary, RegistryError> {
        let (_, builder) = self
            .performances
            .remove(&performance_id)
            .ok_or(RegistryError::UnknownPerformance { performance_id })?;
        Ok(builder.finish(outcome, finished_at)?)
    }

    /// The number of performances currently being tracked.
    pub fn in_flight(&self) -> usize {
        self.performances.len()
    }

    /// Snapshot of the performances still being tracked.
    ///
    /// Non-empty at session end means performances began but never finished:
    /// a leak in the emitting layer that callers should surface.
    pub fn abandoned(&self) -> Vec<(PerformanceUuid, Vec<ScopeSegment>)> {
        self.performances
            .iter()
            .map(|entry| (entry.performance_id(), entry.scope().to_vec()))
            .collect()
    }
}
