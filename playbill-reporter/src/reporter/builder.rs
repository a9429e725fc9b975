// Copyright (c) The playbill Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-performance report assembly.
//!
//! One [`PerformanceReportBuilder`] exists per in-flight performance. It
//! consumes that performance's events in emission order and infers the report
//! tree purely from begin/end nesting: no caller ever passes a parent
//! reference. Events for one performance arrive from a single logical flow,
//! so the builder itself needs no locking; the registry provides exclusive
//! access while routing.

use crate::errors::ProtocolViolation;
use camino::Utf8PathBuf;
use chrono::{DateTime, FixedOffset};
use playbill_metadata::{
    AttachmentSummary, FailureSummary, OperationSummary, PerformanceOutcome,
    PerformanceReportSummary, PerformanceUuid, ReportNodeSummary, ScopeSegment,
};

/// Index of an operation node in the builder's arena.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
struct OpIndex(usize);

/// One entry of an open list: either a rendered notice leaf or a handle to an
/// operation node in the arena.
#[derive(Clone, Debug)]
enum ReportEntry {
    Notice(String),
    Operation(OpIndex),
}

/// An operation node under construction.
///
/// Children hold arena indices rather than owned nodes; the tree is
/// materialized into owned [`ReportNodeSummary`] values once at `finish`.
#[derive(Debug)]
struct OperationNode {
    type_name: String,
    actor: String,
    phase: String,
    description: Option<String>,
    result: Option<String>,
    failure: Option<FailureSummary>,
    attachments: Vec<AttachmentSummary>,
    children: Vec<ReportEntry>,
    sealed: bool,
}

/// Builds the report for a single performance from its ordered event stream.
///
/// Constructing the builder is the "performance begun" step: the naming
/// hierarchy and start time are fixed at construction and immutable after.
#[derive(Debug)]
pub struct PerformanceReportBuilder {
    performance_id: PerformanceUuid,
    scope: Vec<ScopeSegment>,
    started_at: DateTime<FixedOffset>,
    arena: Vec<OperationNode>,
    roots: Vec<ReportEntry>,
    // Invariant: indices of unsealed nodes, in begin order. The top entry is
    // the current operation; its children list is the open list.
    stack: Vec<OpIndex>,
}

impl PerformanceReportBuilder {
    /// Creates a builder for a performance that has just begun.
    pub fn new(
        performance_id: PerformanceUuid,
        scope: Vec<ScopeSegment>,
        started_at: DateTime<FixedOffset>,
    ) -> Self {
        Self {
            performance_id,
            scope,
            started_at,
            arena: Vec::new(),
            roots: Vec::new(),
            stack: Vec::new(),
        }
    }

    /// The identity of the performance this builder belongs to.
    pub fn performance_id(&self) -> PerformanceUuid {
        self.performance_id
    }

    /// The performance's naming hierarchy.
    pub fn scope(&self) -> &[ScopeSegment] {
        &self.scope
    }

    /// The number of operations currently in progress.
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// Records that an actor was created.
    pub fn actor_created(&mut self, actor: &str) {
        self.push_notice(format!("{actor} enters the stage"));
    }

    /// Records that an actor gained an ability, with the ability's rendered
    /// description.
    pub fn ability_gained(&mut self, actor: &str, description: &str) {
        self.push_notice(format!("{actor} can {description}"));
    }

    /// Records that the spotlight moved to an actor.
    pub fn actor_spotlit(&mut self, actor: &str) {
        self.push_notice(format!("the spotlight is on {actor}"));
    }

    /// Records that the spotlight was cleared.
    pub fn spotlight_cleared(&mut self) {
        self.push_notice("the spotlight is cleared".to_owned());
    }

    /// Begins a new operation: appends a node to the open list and makes it
    /// the current operation.
    pub fn begin_operation(
        &mut self,
        type_name: impl Into<String>,
        actor: impl Into<String>,
        phase: impl Into<String>,
    ) {
        let index = OpIndex(self.arena.len());
        self.arena.push(OperationNode {
            type_name: type_name.into(),
            actor: actor.into(),
            phase: phase.into(),
            description: None,
            result: None,
            failure: None,
            attachments: Vec::new(),
            children: Vec::new(),
            sealed: false,
        });
        self.open_list().push(ReportEntry::Operation(index));
        self.stack.push(index);
    }

    /// Attaches a rendered result value to the current operation.
    pub fn record_result(&mut self, rendered_value: impl Into<String>) -> Result<(), ProtocolViolation> {
        let node = self.current("result")?;
        node.result = Some(rendered_value.into());
        Ok(())
    }

    /// Records an asset against the current operation.
    pub fn record_asset(
        &mut self,
        path: Utf8PathBuf,
        summary: impl Into<String>,
    ) -> Result<(), ProtocolViolation> {
        let node = self.current("asset")?;
        node.attachments.push(AttachmentSummary {
            path,
            summary: summary.into(),
        });
        Ok(())
    }

    /// Ends the current operation normally, attaching its rendered report.
    pub fn end_operation(
        &mut self,
        description: impl Into<String>,
    ) -> Result<(), ProtocolViolation> {
        let node = self.current("end")?;
        node.description = Some(description.into());
        self.seal_current();
        Ok(())
    }

    /// Fails the current operation. A failure always ends the operation.
    ///
    /// `from_nested` is recorded as supplied by the emitting layer (see
    /// [`SessionEventKind::OperationFailed`](crate::reporter::SessionEventKind::OperationFailed)).
    /// Any previously recorded result is discarded: a failing operation never
    /// produced an observable answer.
    pub fn record_failure(
        &mut self,
        message: impl Into<String>,
        from_nested: bool,
    ) -> Result<(), ProtocolViolation> {
        let node = self.current("failure")?;
        node.result = None;
        node.failure = Some(FailureSummary {
            message: message.into(),
            from_nested,
        });
        self.seal_current();
        Ok(())
    }

    /// Seals the report and returns it.
    ///
    /// Fails if any operation is still in progress: an operation that began
    /// but never ended is a defect in the emitting layer, and a report must
    /// never be sealed around one.
    pub fn finish(
        self,
        outcome: PerformanceOutcome,
        finished_at: DateTime<FixedOffset>,
    ) -> Result<PerformanceReportSummary, ProtocolViolation> {
        if let Some(&top) = self.stack.last() {
            return Err(ProtocolViolation::DanglingOperations {
                depth: self.stack.len(),
                innermost: self.arena[top.0].type_name.clone(),
            });
        }

        let mut arena: Vec<Option<OperationNode>> = self.arena.into_iter().map(Some).collect();
        let nodes = materialize(&mut arena, &self.roots);

        Ok(PerformanceReportSummary {
            performance_id: self.performance_id,
            scope: self.scope,
            outcome,
            started_at: self.started_at,
            finished_at,
            nodes,
        })
    }

    /// Appends a rendered notice leaf to the open list.
    fn push_notice(&mut self, description: String) {
        self.open_list().push(ReportEntry::Notice(description));
    }

    /// The list new entries append to: the current operation's children, or
    /// the report's root list when no operation is in progress.
    fn open_list(&mut self) -> &mut Vec<ReportEntry> {
        match self.stack.last() {
            Some(&OpIndex(ix)) => &mut self.arena[ix].children,
            None => &mut self.roots,
        }
    }

    /// The current operation, or a violation naming the event that had no
    /// operation to attach to.
    fn current(&mut self, event: &'static str) -> Result<&mut OperationNode, ProtocolViolation> {
        match self.stack.last() {
            Some(&OpIndex(ix)) => Ok(&mut self.arena[ix]),
            None => Err(ProtocolViolation::NoCurrentOperation { event }),
        }
    }

    /// Marks the current operation ended and pops it off the stack.
    fn seal_current(&mut self) {
        let OpIndex(ix) = self
            .stack
            .pop()
            .expect("seal_current is only called after current() succeeds");
        debug_assert!(!self.arena[ix].sealed, "operation sealed twice");
        self.arena[ix].sealed = true;
    }
}

/// Materializes arena-indexed entries into owned summary nodes, recursively.
fn materialize(
    arena: &mut [Option<OperationNode>],
    entries: &[ReportEntry],
) -> Vec<ReportNodeSummary> {
    entries
        .iter()
        .map(|entry| match entry {
            ReportEntry::Notice(description) => ReportNodeSummary::Notice {
                description: description.clone(),
            },
            ReportEntry::Operation(OpIndex(ix)) => {
                let node = arena[*ix]
                    .take()
                    .expect("each operation is referenced exactly once");
                let children = materialize(arena, &node.children);
                ReportNodeSummary::Operation(OperationSummary {
                    type_name: node.type_name,
                    actor: node.actor,
                    phase: node.phase,
                    description: node.description,
                    result: node.result,
                    failure: node.failure,
                    attachments: node.attachments,
                    children,
                })
            }
        })
        .collect()
}
