// Copyright (c) The playbill Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Routes session events to builders and the streaming writer.
//!
//! The main structure in this module is [`SessionReporter`].

use super::{SessionEvent, SessionEventKind, SessionStream, StreamingWriter};
use crate::{
    errors::WriteEventError,
    helpers::{DisplayScopePath, plural, truncate_rendered},
    notifier::EventSubscriber,
    reporter::registry::ReportRegistry,
};
use camino::Utf8PathBuf;
use playbill_metadata::{SessionHeaderSummary, SessionUuid};
use std::sync::atomic::{AtomicBool, Ordering};
use swrite::{SWrite, swrite};

/// Session reporter builder.
///
/// Destination and title are plain data here: the external configuration
/// layer decides them and populates the builder. Leaving the output path
/// unset disables reporting entirely — the reporter still subscribes and
/// routes, but nothing touches the file system.
#[derive(Debug, Default)]
pub struct SessionReporterBuilder {
    output_path: Option<Utf8PathBuf>,
    title: Option<String>,
}

impl SessionReporterBuilder {
    /// Sets the path the session report document is written to. Unset means
    /// reporting is disabled.
    pub fn set_output_path(&mut self, output_path: Utf8PathBuf) -> &mut Self {
        self.output_path = Some(output_path);
        self
    }

    /// Sets a human-readable title recorded in the document header.
    pub fn set_title(&mut self, title: impl Into<String>) -> &mut Self {
        self.title = Some(title.into());
        self
    }

    /// Creates a new session reporter, assigning the session identity.
    pub fn build(&self) -> SessionReporter {
        let stream = match &self.output_path {
            Some(path) => SessionStream::File(StreamingWriter::new(path.clone())),
            None => SessionStream::Disabled,
        };
        SessionReporter {
            session_id: SessionUuid::new_v4(),
            title: self.title.clone(),
            registry: ReportRegistry::new(),
            stream,
            degraded: AtomicBool::new(false),
        }
    }
}

/// The reporting facade: the one subscriber to the session notifier.
///
/// Translates each event into exactly one registry, builder, or stream call.
/// When a performance finishes, its sealed report is appended to the output
/// document immediately — the session is never buffered in memory as a whole.
pub struct SessionReporter {
    session_id: SessionUuid,
    title: Option<String>,
    registry: ReportRegistry,
    stream: SessionStream,
    /// Set after the first reporting failure seen through `handle_event`;
    /// all further events are ignored so a reporting malfunction never
    /// blocks the session it is observing.
    degraded: AtomicBool,
}

impl SessionReporter {
    /// The identity stamped into the document header.
    pub fn session_id(&self) -> SessionUuid {
        self.session_id
    }

    /// True if reports are actually being persisted.
    pub fn is_enabled(&self) -> bool {
        self.stream.is_enabled()
    }

    /// True once a reporting failure has disabled further event handling.
    pub fn is_degraded(&self) -> bool {
        self.degraded.load(Ordering::Relaxed)
    }

    /// The number of performances currently in flight.
    pub fn in_flight(&self) -> usize {
        self.registry.in_flight()
    }

    /// Handles one session event, propagating any failure to the caller.
    ///
    /// Routing is total: every event kind maps to exactly one action. Errors
    /// are never absorbed here — a silently-dropped violation would corrupt
    /// the report tree for the rest of that performance.
    pub fn write_event(&self, event: SessionEvent) -> Result<(), WriteEventError> {
        let timestamp = event.timestamp;
        match event.kind {
            SessionEventKind::SessionStarted => {
                let header = SessionHeaderSummary {
                    session_id: self.session_id,
                    title: self.title.clone(),
                    producer_version: env!("CARGO_PKG_VERSION").to_owned(),
                    started_at: timestamp,
                };
                self.stream.open(&header)?;
                tracing::debug!(session_id = %self.session_id, "session report opened");
                Ok(())
            }
            SessionEventKind::SessionFinished => {
                self.warn_on_abandoned();
                let appended = self.stream.close()?;
                tracing::debug!(
                    session_id = %self.session_id,
                    appended,
                    "session report sealed"
                );
                Ok(())
            }
            SessionEventKind::PerformanceBegun {
                performance_id,
                scope,
            } => {
                self.registry.begin(performance_id, scope, timestamp)?;
                Ok(())
            }
            SessionEventKind::PerformanceFinished {
                performance_id,
                outcome,
            } => {
                let report = self.registry.end(performance_id, outcome, timestamp)?;
                self.stream.append(&report)?;
                tracing::debug!(%performance_id, %outcome, "performance report appended");
                Ok(())
            }
            SessionEventKind::OperationBegun {
                performance_id,
                type_name,
                actor,
                phase,
            } => {
                self.registry.with_builder(performance_id, |builder| {
                    builder.begin_operation(type_name, actor, phase)
                })?;
                Ok(())
            }
            SessionEventKind::OperationEnded {
                performance_id,
                description,
            } => {
                self.registry
                    .with_builder(performance_id, |builder| builder.end_operation(description))??;
                Ok(())
            }
            SessionEventKind::OperationResult {
                performance_id,
                rendered_value,
            } => {
                tracing::trace!(
                    %performance_id,
                    value = %truncate_rendered(&rendered_value, 120),
                    "operation result"
                );
                self.registry.with_builder(performance_id, |builder| {
                    builder.record_result(rendered_value)
                })??;
                Ok(())
            }
            SessionEventKind::OperationFailed {
                performance_id,
                message,
                from_nested,
            } => {
                self.registry.with_builder(performance_id, |builder| {
                    builder.record_failure(message, from_nested)
                })??;
                Ok(())
            }
            SessionEventKind::AssetRecorded {
                performance_id,
                path,
                summary,
            } => {
                self.registry.with_builder(performance_id, |builder| {
                    builder.record_asset(path, summary)
                })??;
                Ok(())
            }
            SessionEventKind::ActorCreated {
                performance_id,
                actor,
            } => {
                self.registry
                    .with_builder(performance_id, |builder| builder.actor_created(&actor))?;
                Ok(())
            }
            SessionEventKind::AbilityGained {
                performance_id,
                actor,
                description,
            } => {
                self.registry.with_builder(performance_id, |builder| {
                    builder.ability_gained(&actor, &description)
                })?;
                Ok(())
            }
            SessionEventKind::ActorSpotlit {
                performance_id,
                actor,
            } => {
                self.registry
                    .with_builder(performance_id, |builder| builder.actor_spotlit(&actor))?;
                Ok(())
            }
            SessionEventKind::SpotlightCleared { performance_id } => {
                self.registry
                    .with_builder(performance_id, |builder| builder.spotlight_cleared())?;
                Ok(())
            }
        }
    }

    /// Logs performances that began but never finished. Called once, as the
    /// session ends, before the document is sealed.
    fn warn_on_abandoned(&self) {
        let abandoned = self.registry.abandoned();
        if abandoned.is_empty() {
            return;
        }
        let mut list = String::new();
        for (performance_id, scope) in &abandoned {
            swrite!(
                list,
                "\n  {performance_id} ({})",
                DisplayScopePath(scope)
            );
        }
        tracing::warn!(
            "{} {} began but never finished:{list}",
            abandoned.len(),
            plural::performances_str(abandoned.len()),
        );
    }
}

impl EventSubscriber for SessionReporter {
    fn handle_event(&self, event: &SessionEvent) {
        if self.degraded.load(Ordering::Relaxed) {
            return;
        }
        if let Err(error) = self.write_event(event.clone()) {
            self.degraded.store(true, Ordering::Relaxed);
            tracing::error!("error writing session report, disabling reporting: {error}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino_tempfile::Utf8TempDir;
    use chrono::Local;
    use playbill_metadata::{
        PerformanceOutcome, PerformanceUuid, ReportNodeSummary, ScopeSegment,
        SessionReportSummary,
    };
    use pretty_assertions::assert_eq;

    fn event(kind: SessionEventKind) -> SessionEvent {
        SessionEvent {
            timestamp: Local::now().fixed_offset(),
            kind,
        }
    }

    #[test]
    fn simple_success_scenario() {
        let dir = Utf8TempDir::new().expect("temp dir created");
        let path = dir.path().join("session.json");
        let reporter = SessionReporterBuilder::default()
            .set_output_path(path.clone())
            .set_title("smoke")
            .build();
        assert!(reporter.is_enabled());

        let id = PerformanceUuid::new_v4();
        reporter
            .write_event(event(SessionEventKind::SessionStarted))
            .unwrap();
        reporter
            .write_event(event(SessionEventKind::PerformanceBegun {
                performance_id: id,
                scope: vec![ScopeSegment::new("buttons", "Buttons")],
            }))
            .unwrap();
        reporter
            .write_event(event(SessionEventKind::OperationBegun {
                performance_id: id,
                type_name: "Click".to_owned(),
                actor: "Joe".to_owned(),
                phase: String::new(),
            }))
            .unwrap();
        reporter
            .write_event(event(SessionEventKind::OperationEnded {
                performance_id: id,
                description: "Joe clicks the button".to_owned(),
            }))
            .unwrap();
        reporter
            .write_event(event(SessionEventKind::PerformanceFinished {
                performance_id: id,
                outcome: PerformanceOutcome::Success,
            }))
            .unwrap();
        reporter
            .write_event(event(SessionEventKind::SessionFinished))
            .unwrap();

        let contents = std::fs::read_to_string(&path).expect("document is readable");
        let summary = SessionReportSummary::from_json(&contents).expect("document parses");
        assert_eq!(summary.performances.len(), 1);

        let report = &summary.performances[0];
        assert_eq!(report.performance_id, id);
        assert_eq!(report.outcome, PerformanceOutcome::Success);
        assert_eq!(report.nodes.len(), 1);
        match &report.nodes[0] {
            ReportNodeSummary::Operation(operation) => {
                assert_eq!(operation.type_name, "Click");
                assert_eq!(
                    operation.description.as_deref(),
                    Some("Joe clicks the button")
                );
                assert!(operation.children.is_empty());
            }
            other => panic!("expected an operation node, got {other:?}"),
        }
    }

    #[test]
    fn disabled_reporter_touches_nothing() {
        let reporter = SessionReporterBuilder::default().build();
        assert!(!reporter.is_enabled());

        let id = PerformanceUuid::new_v4();
        reporter
            .write_event(event(SessionEventKind::SessionStarted))
            .unwrap();
        reporter
            .write_event(event(SessionEventKind::PerformanceBegun {
                performance_id: id,
                scope: Vec::new(),
            }))
            .unwrap();
        reporter
            .write_event(event(SessionEventKind::PerformanceFinished {
                performance_id: id,
                outcome: PerformanceOutcome::Completed,
            }))
            .unwrap();
        reporter
            .write_event(event(SessionEventKind::SessionFinished))
            .unwrap();
    }

    #[test]
    fn event_for_unknown_performance_propagates() {
        let reporter = SessionReporterBuilder::default().build();
        let error = reporter
            .write_event(event(SessionEventKind::OperationEnded {
                performance_id: PerformanceUuid::new_v4(),
                description: "nothing".to_owned(),
            }))
            .unwrap_err();
        assert!(matches!(error, WriteEventError::Registry(_)), "got {error:?}");
    }

    #[test]
    fn handle_event_degrades_instead_of_panicking() {
        let reporter = SessionReporterBuilder::default().build();
        assert!(!reporter.is_degraded());

        // An event for a performance that never began is a routing error;
        // through the subscriber surface it flips the reporter into the
        // degraded state rather than unwinding into the emitting layer.
        reporter.handle_event(&event(SessionEventKind::SpotlightCleared {
            performance_id: PerformanceUuid::new_v4(),
        }));
        assert!(reporter.is_degraded());

        // Later events are ignored, including ones that would otherwise be
        // tracked.
        reporter.handle_event(&event(SessionEventKind::PerformanceBegun {
            performance_id: PerformanceUuid::new_v4(),
            scope: Vec::new(),
        }));
        assert_eq!(reporter.in_flight(), 0);
    }

    #[test]
    fn nested_failure_scenario_through_the_facade() {
        let dir = Utf8TempDir::new().expect("temp dir created");
        let path = dir.path().join("session.json");
        let reporter = SessionReporterBuilder::default()
            .set_output_path(path.clone())
            .build();

        let id = PerformanceUuid::new_v4();
        reporter
            .write_event(event(SessionEventKind::SessionStarted))
            .unwrap();
        reporter
            .write_event(event(SessionEventKind::PerformanceBegun {
                performance_id: id,
                scope: Vec::new(),
            }))
            .unwrap();
        for type_name in ["Task", "SubStep"] {
            reporter
                .write_event(event(SessionEventKind::OperationBegun {
                    performance_id: id,
                    type_name: type_name.to_owned(),
                    actor: "Joe".to_owned(),
                    phase: String::new(),
                }))
                .unwrap();
        }
        reporter
            .write_event(event(SessionEventKind::OperationFailed {
                performance_id: id,
                message: "boom".to_owned(),
                from_nested: false,
            }))
            .unwrap();
        reporter
            .write_event(event(SessionEventKind::OperationFailed {
                performance_id: id,
                message: "boom".to_owned(),
                from_nested: true,
            }))
            .unwrap();
        reporter
            .write_event(event(SessionEventKind::PerformanceFinished {
                performance_id: id,
                outcome: PerformanceOutcome::Failure,
            }))
            .unwrap();
        reporter
            .write_event(event(SessionEventKind::SessionFinished))
            .unwrap();

        let contents = std::fs::read_to_string(&path).expect("document is readable");
        let summary = SessionReportSummary::from_json(&contents).expect("document parses");
        let report = &summary.performances[0];
        assert_eq!(report.outcome, PerformanceOutcome::Failure);

        let task = match &report.nodes[0] {
            ReportNodeSummary::Operation(operation) => operation,
            other => panic!("expected an operation node, got {other:?}"),
        };
        assert!(task.failure.as_ref().unwrap().from_nested);
        let substep = match &task.children[0] {
            ReportNodeSummary::Operation(operation) => operation,
            other => panic!("expected an operation node, got {other:?}"),
        };
        assert!(!substep.failure.as_ref().unwrap().from_nested);
    }
}
