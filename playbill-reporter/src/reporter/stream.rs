// Copyright (c) The playbill Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Streaming persistence for finished performance reports.
//!
//! The output document is built incrementally so that a crash mid-session
//! loses at most the performances still in flight: the header and array
//! opener are written and flushed up front, each finished report is written
//! and flushed as one complete array element, and the closing markers are
//! written when the session ends.

use crate::errors::StreamWriteError;
use camino::{Utf8Path, Utf8PathBuf};
use debug_ignore::DebugIgnore;
use playbill_metadata::{FORMAT_VERSION, PerformanceReportSummary, SessionHeaderSummary};
use std::{fs::File, io::Write, sync::Mutex};

/// Writer lifecycle. `open` happens-before all `append`s, which happen-before
/// `close`; each transition is enforced here rather than trusted.
#[derive(Debug)]
enum WriterState {
    Created,
    Open {
        file: DebugIgnore<File>,
        appended: u64,
    },
    Closed {
        appended: u64,
    },
}

/// Appends finished performance reports to a document on disk.
///
/// The whole write path — serialize, write, flush — runs under one mutex, so
/// two performances finishing at nearly the same moment can never interleave
/// bytes within the document. Ordering between elements is whatever order the
/// lock is acquired in; only element integrity is guaranteed.
#[derive(Debug)]
pub struct StreamingWriter {
    path: Utf8PathBuf,
    state: Mutex<WriterState>,
}

impl StreamingWriter {
    /// Creates a writer for the given document path.
    ///
    /// No file-system side effects happen until [`open`](Self::open).
    pub fn new(path: Utf8PathBuf) -> Self {
        Self {
            path,
            state: Mutex::new(WriterState::Created),
        }
    }

    /// The path the document is written to.
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    /// Creates the document and writes the metadata header and the opening
    /// of the performances array, flushing before returning.
    pub fn open(&self, header: &SessionHeaderSummary) -> Result<(), StreamWriteError> {
        let mut state = self.state.lock().expect("writer state lock poisoned");
        match &*state {
            WriterState::Created => {}
            WriterState::Open { .. } => return Err(StreamWriteError::AlreadyOpen),
            WriterState::Closed { .. } => return Err(StreamWriteError::AlreadyClosed),
        }

        if let Some(parent) = self.path.parent().filter(|parent| !parent.as_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|error| StreamWriteError::Create {
                path: parent.to_path_buf(),
                error,
            })?;
        }
        let mut file = File::create(&self.path).map_err(|error| StreamWriteError::Create {
            path: self.path.clone(),
            error,
        })?;

        let header_json =
            serde_json::to_string(header).map_err(|error| StreamWriteError::Serialize { error })?;
        let prefix =
            format!("{{\"format-version\":{FORMAT_VERSION},\"session\":{header_json},\"performances\":[");
        self.write_all(&mut file, prefix.as_bytes())?;

        *state = WriterState::Open {
            file: DebugIgnore(file),
            appended: 0,
        };
        Ok(())
    }

    /// Appends one finished report as the next array element and flushes.
    ///
    /// Safe to call from many threads at once; each element is written in
    /// full before the lock is released.
    pub fn append(&self, report: &PerformanceReportSummary) -> Result<(), StreamWriteError> {
        let mut state = self.state.lock().expect("writer state lock poisoned");
        let (file, appended) = match &mut *state {
            WriterState::Open { file, appended } => (file, appended),
            WriterState::Created => return Err(StreamWriteError::NotOpen),
            WriterState::Closed { .. } => return Err(StreamWriteError::AlreadyClosed),
        };

        let element =
            serde_json::to_string(report).map_err(|error| StreamWriteError::Serialize { error })?;
        let separator: &[u8] = if *appended == 0 { b"\n" } else { b",\n" };

        let mut bytes = Vec::with_capacity(separator.len() + element.len());
        bytes.extend_from_slice(separator);
        bytes.extend_from_slice(element.as_bytes());
        Self::write_all_locked(&self.path, file, &bytes)?;

        *appended += 1;
        Ok(())
    }

    /// Writes the closing markers, flushes, and seals the document.
    ///
    /// Must be called exactly once, after every performance has finished.
    /// Returns the number of reports appended.
    pub fn close(&self) -> Result<u64, StreamWriteError> {
        let mut state = self.state.lock().expect("writer state lock poisoned");
        let (file, appended) = match &mut *state {
            WriterState::Open { file, appended } => (file, *appended),
            WriterState::Created => return Err(StreamWriteError::NotOpen),
            WriterState::Closed { .. } => return Err(StreamWriteError::AlreadyClosed),
        };

        Self::write_all_locked(&self.path, file, b"\n]}\n")?;

        *state = WriterState::Closed { appended };
        Ok(appended)
    }

    fn write_all(&self, file: &mut File, bytes: &[u8]) -> Result<(), StreamWriteError> {
        Self::write_all_locked(&self.path, file, bytes)
    }

    fn write_all_locked(
        path: &Utf8Path,
        file: &mut File,
        bytes: &[u8],
    ) -> Result<(), StreamWriteError> {
        file.write_all(bytes)
            .and_then(|()| file.flush())
            .map_err(|error| StreamWriteError::Write {
                path: path.to_path_buf(),
                error,
            })
    }
}

/// The session's report destination: a real streaming writer, or a no-op
/// when reporting is disabled.
///
/// With reporting disabled the facade still subscribes and routes, but none
/// of `open`/`append`/`close` performs any side effect.
#[derive(Debug)]
pub enum SessionStream {
    /// Reporting is disabled; all operations are no-ops.
    Disabled,

    /// Reports stream to a document on disk.
    File(StreamingWriter),
}

impl SessionStream {
    /// True if reports are actually being persisted.
    pub fn is_enabled(&self) -> bool {
        match self {
            SessionStream::Disabled => false,
            SessionStream::File(_) => true,
        }
    }

    /// Opens the destination. No-op when disabled.
    pub fn open(&self, header: &SessionHeaderSummary) -> Result<(), StreamWriteError> {
        match self {
            SessionStream::Disabled => Ok(()),
            SessionStream::File(writer) => writer.open(header),
        }
    }

    /// Appends one finished report. No-op when disabled.
    pub fn append(&self, report: &PerformanceReportSummary) -> Result<(), StreamWriteError> {
        match self {
            SessionStream::Disabled => Ok(()),
            SessionStream::File(writer) => writer.append(report),
        }
    }

    /// Seals the destination, returning the number of reports appended.
    /// No-op returning 0 when disabled.
    pub fn close(&self) -> Result<u64, StreamWriteError> {
        match self {
            SessionStream::Disabled => Ok(0),
            SessionStream::File(writer) => writer.close(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino_tempfile::Utf8TempDir;
    use chrono::Local;
    use playbill_metadata::{
        PerformanceOutcome, PerformanceUuid, SessionReportSummary, SessionUuid,
    };
    use pretty_assertions::assert_eq;

    fn header() -> SessionHeaderSummary {
        SessionHeaderSummary {
            session_id: SessionUuid::new_v4(),
            title: Some("suite".to_owned()),
            producer_version: env!("CARGO_PKG_VERSION").to_owned(),
            started_at: Local::now().fixed_offset(),
        }
    }

    fn report() -> PerformanceReportSummary {
        PerformanceReportSummary {
            performance_id: PerformanceUuid::new_v4(),
            scope: Vec::new(),
            outcome: PerformanceOutcome::Success,
            started_at: Local::now().fixed_offset(),
            finished_at: Local::now().fixed_offset(),
            nodes: Vec::new(),
        }
    }

    #[test]
    fn open_append_close_produces_a_parseable_document() {
        let dir = Utf8TempDir::new().expect("temp dir created");
        let path = dir.path().join("reports").join("session.json");
        let writer = StreamingWriter::new(path.clone());

        writer.open(&header()).unwrap();
        writer.append(&report()).unwrap();
        writer.append(&report()).unwrap();
        assert_eq!(writer.close().unwrap(), 2);

        let contents = std::fs::read_to_string(&path).expect("document is readable");
        let summary = SessionReportSummary::from_json(&contents).expect("document parses");
        assert_eq!(summary.performances.len(), 2);
        assert_eq!(summary.session.title.as_deref(), Some("suite"));
    }

    #[test]
    fn empty_session_still_seals_an_empty_array() {
        let dir = Utf8TempDir::new().expect("temp dir created");
        let path = dir.path().join("session.json");
        let writer = StreamingWriter::new(path.clone());

        writer.open(&header()).unwrap();
        assert_eq!(writer.close().unwrap(), 0);

        let contents = std::fs::read_to_string(&path).expect("document is readable");
        let summary = SessionReportSummary::from_json(&contents).expect("document parses");
        assert!(summary.performances.is_empty());
    }

    #[test]
    fn state_machine_rejects_out_of_order_calls() {
        let dir = Utf8TempDir::new().expect("temp dir created");
        let writer = StreamingWriter::new(dir.path().join("session.json"));

        assert!(matches!(
            writer.append(&report()).unwrap_err(),
            StreamWriteError::NotOpen
        ));
        assert!(matches!(writer.close().unwrap_err(), StreamWriteError::NotOpen));

        writer.open(&header()).unwrap();
        assert!(matches!(
            writer.open(&header()).unwrap_err(),
            StreamWriteError::AlreadyOpen
        ));

        writer.close().unwrap();
        assert!(matches!(writer.close().unwrap_err(), StreamWriteError::AlreadyClosed));
        assert!(matches!(
            writer.append(&report()).unwrap_err(),
            StreamWriteError::AlreadyClosed
        ));
    }

    #[test]
    fn prior_elements_survive_without_close() {
        // A crash mid-session leaves the document unsealed, but every sealed
        // element must already be on disk in full.
        let dir = Utf8TempDir::new().expect("temp dir created");
        let path = dir.path().join("session.json");
        let writer = StreamingWriter::new(path.clone());

        writer.open(&header()).unwrap();
        let first = report();
        writer.append(&first).unwrap();

        let contents = std::fs::read_to_string(&path).expect("document is readable");
        let sealed = format!("{contents}\n]}}\n");
        let summary = SessionReportSummary::from_json(&sealed).expect("repaired document parses");
        assert_eq!(summary.performances.len(), 1);
        assert_eq!(summary.performances[0].performance_id, first.performance_id);
    }

    #[test]
    fn disabled_stream_is_a_no_op() {
        let stream = SessionStream::Disabled;
        assert!(!stream.is_enabled());
        stream.open(&header()).unwrap();
        stream.append(&report()).unwrap();
        assert_eq!(stream.close().unwrap(), 0);
    }

    #[test]
    fn concurrent_appends_never_corrupt_elements() {
        let dir = Utf8TempDir::new().expect("temp dir created");
        let path = dir.path().join("session.json");
        let writer = StreamingWriter::new(path.clone());
        writer.open(&header()).unwrap();

        let n: u64 = 16;
        std::thread::scope(|scope| {
            for _ in 0..n {
                scope.spawn(|| {
                    writer.append(&report()).unwrap();
                });
            }
        });
        assert_eq!(writer.close().unwrap(), n);

        let contents = std::fs::read_to_string(&path).expect("document is readable");
        let summary = SessionReportSummary::from_json(&contents).expect("document parses");
        assert_eq!(summary.performances.len(), n as usize);
    }
}
