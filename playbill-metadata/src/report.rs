// Copyright (c) The playbill Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Serializable types forming the session report document.
//!
//! The document is written incrementally by the engine: the header and the
//! opening of the `performances` array first, then one array element per
//! finished performance, then the closing markers. The types here describe
//! the fully-sealed document as a reader sees it.

use crate::{FormatError, PerformanceUuid, SessionUuid};
use camino::Utf8PathBuf;
use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The current version of the session report document format.
pub const FORMAT_VERSION: FormatVersion = FormatVersion::new(1);

/// Version of the session report document format.
///
/// Increment when adding new semantically important fields. Readers can read
/// newer versions (assuming append-only evolution with serde defaults), but
/// should refuse versions higher than the one they were built against if they
/// need exact semantics.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Deserialize, Serialize)]
#[serde(transparent)]
pub struct FormatVersion(u32);

impl FormatVersion {
    /// Creates a new `FormatVersion`.
    pub const fn new(version: u32) -> Self {
        Self(version)
    }
}

impl fmt::Display for FormatVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One level of the organizational hierarchy a performance belongs to,
/// e.g. a feature or a scenario.
#[derive(Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct ScopeSegment {
    /// A stable identifier for this level, unique among its siblings.
    pub id: String,

    /// The human-readable name shown in rendered reports.
    pub display_name: String,
}

impl ScopeSegment {
    /// Creates a new `ScopeSegment`.
    pub fn new(id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
        }
    }
}

/// How a performance concluded.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum PerformanceOutcome {
    /// The performance passed.
    Success,

    /// The performance failed.
    Failure,

    /// The performance finished without an explicit outcome being supplied.
    Completed,
}

impl PerformanceOutcome {
    /// Returns the outcome as a static string, matching the serialized form.
    pub fn as_str(self) -> &'static str {
        match self {
            PerformanceOutcome::Success => "success",
            PerformanceOutcome::Failure => "failure",
            PerformanceOutcome::Completed => "completed",
        }
    }
}

impl fmt::Display for PerformanceOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry in a performance's report tree.
#[derive(Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum ReportNodeSummary {
    /// An actor-lifecycle notice: actor created, ability gained, actor
    /// spotlit, or spotlight cleared. Always a leaf, carrying a pre-rendered
    /// description.
    Notice {
        /// The rendered description, e.g. `Joe can BrowseTheWeb`.
        description: String,
    },

    /// One performed operation, possibly composed of nested operations.
    Operation(OperationSummary),
}

/// A performed action, question, or task within a performance.
#[derive(Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct OperationSummary {
    /// The operation's declared type name.
    pub type_name: String,

    /// The name of the acting entity.
    pub actor: String,

    /// Free-form phase tag, e.g. `setup`, `action` or `assertion`. Empty if
    /// the emitting layer did not tag the operation.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub phase: String,

    /// The rendered human-readable report, attached when the operation ends.
    /// Absent if the operation failed instead of ending normally.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// The rendered result value, if the operation produced one.
    ///
    /// Never present together with `failure`. An operation carrying neither
    /// completed with no observable output.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,

    /// The failure that ended the operation, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<FailureSummary>,

    /// Assets recorded while this operation was current.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<AttachmentSummary>,

    /// Nested operations and notices, in the order they were raised.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<ReportNodeSummary>,
}

/// A failure recorded against an operation.
#[derive(Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct FailureSummary {
    /// The rendered exception text.
    pub message: String,

    /// True if the failure surfaced from a nested operation rather than
    /// originating in this one. Supplied by the emitting layer.
    pub from_nested: bool,
}

/// A file-system asset recorded against an operation, e.g. a screenshot.
///
/// The path references a file produced elsewhere; the engine records it
/// without creating or validating the file.
#[derive(Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct AttachmentSummary {
    /// Path to the asset on disk.
    pub path: Utf8PathBuf,

    /// A human-readable summary of what the asset shows.
    pub summary: String,
}

/// The sealed report for one performance: one element of the document's
/// `performances` array.
#[derive(Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct PerformanceReportSummary {
    /// The performance's unique identity.
    pub performance_id: PerformanceUuid,

    /// The performance's place in the organizational hierarchy, outermost
    /// level first. Immutable once the performance begins.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub scope: Vec<ScopeSegment>,

    /// How the performance concluded.
    pub outcome: PerformanceOutcome,

    /// When the performance began.
    pub started_at: DateTime<FixedOffset>,

    /// When the performance finished.
    pub finished_at: DateTime<FixedOffset>,

    /// The report tree: top-level operations and notices in the order they
    /// were raised.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub nodes: Vec<ReportNodeSummary>,
}

/// The metadata header written before any performance finishes.
#[derive(Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct SessionHeaderSummary {
    /// The session's unique identity.
    pub session_id: SessionUuid,

    /// A human-readable title for the session, if one was configured.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// Version of the tool that produced the document.
    pub producer_version: String,

    /// When the session started.
    pub started_at: DateTime<FixedOffset>,
}

/// A complete, sealed session report document.
#[derive(Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct SessionReportSummary {
    /// The document format version.
    pub format_version: FormatVersion,

    /// The session metadata header.
    pub session: SessionHeaderSummary,

    /// One report per finished performance, in completion order.
    #[serde(default)]
    pub performances: Vec<PerformanceReportSummary>,
}

impl SessionReportSummary {
    /// Parses a sealed session report document from JSON.
    pub fn from_json(json: &str) -> Result<Self, FormatError> {
        let summary: Self = serde_json::from_str(json).map_err(FormatError::Json)?;
        if summary.format_version > FORMAT_VERSION {
            return Err(FormatError::UnsupportedVersion {
                version: summary.format_version,
                supported: FORMAT_VERSION,
            });
        }
        Ok(summary)
    }

    /// Returns the reports whose outcome is [`PerformanceOutcome::Failure`].
    pub fn failed_performances(&self) -> impl Iterator<Item = &PerformanceReportSummary> {
        self.performances
            .iter()
            .filter(|report| report.outcome == PerformanceOutcome::Failure)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn outcome_serialized_form_matches_as_str() {
        for outcome in [
            PerformanceOutcome::Success,
            PerformanceOutcome::Failure,
            PerformanceOutcome::Completed,
        ] {
            let json = serde_json::to_string(&outcome).expect("outcome serializes");
            assert_eq!(json, format!("\"{}\"", outcome.as_str()));
        }
    }

    #[test]
    fn operation_summary_omits_empty_fields() {
        let operation = OperationSummary {
            type_name: "Click".to_owned(),
            actor: "Joe".to_owned(),
            phase: String::new(),
            description: Some("Joe clicks the button".to_owned()),
            result: None,
            failure: None,
            attachments: Vec::new(),
            children: Vec::new(),
        };

        let json = serde_json::to_value(&operation).expect("operation serializes");
        let object = json.as_object().expect("operation is an object");
        for absent in ["phase", "result", "failure", "attachments", "children"] {
            assert!(!object.contains_key(absent), "`{absent}` should be omitted");
        }
        assert_eq!(object["type-name"], "Click");
        assert_eq!(object["description"], "Joe clicks the button");
    }

    #[test]
    fn from_json_rejects_future_format_version() {
        let json = r#"{
            "format-version": 99,
            "session": {
                "session-id": "3aa0a78e-6c07-4a75-b972-bbb24ac0b3f5",
                "producer-version": "0.1.0",
                "started-at": "2026-02-11T10:00:00+00:00"
            },
            "performances": []
        }"#;

        let error = SessionReportSummary::from_json(json).unwrap_err();
        assert!(
            matches!(error, FormatError::UnsupportedVersion { .. }),
            "expected UnsupportedVersion, got {error:?}"
        );
    }

    #[test]
    fn node_tree_round_trips() {
        let tree = ReportNodeSummary::Operation(OperationSummary {
            type_name: "LogIn".to_owned(),
            actor: "Joe".to_owned(),
            phase: "action".to_owned(),
            description: Some("Joe logs in".to_owned()),
            result: None,
            failure: None,
            attachments: vec![AttachmentSummary {
                path: "shots/login.png".into(),
                summary: "login page".to_owned(),
            }],
            children: vec![
                ReportNodeSummary::Notice {
                    description: "Joe can BrowseTheWeb".to_owned(),
                },
                ReportNodeSummary::Operation(OperationSummary {
                    type_name: "Click".to_owned(),
                    actor: "Joe".to_owned(),
                    phase: String::new(),
                    description: None,
                    result: None,
                    failure: Some(FailureSummary {
                        message: "element not found".to_owned(),
                        from_nested: false,
                    }),
                    attachments: Vec::new(),
                    children: Vec::new(),
                }),
            ],
        });

        let json = serde_json::to_string(&tree).expect("tree serializes");
        let parsed: ReportNodeSummary = serde_json::from_str(&json).expect("tree parses");
        assert_eq!(parsed, tree);
    }
}
