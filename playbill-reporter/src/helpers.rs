// Copyright (c) The playbill Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! General support code for playbill-reporter.

use playbill_metadata::ScopeSegment;
use std::{borrow::Cow, fmt};

/// Utilities for pluralizing various words based on count.
pub mod plural {
    /// Returns "operation" if `count` is 1, otherwise "operations".
    pub fn operations_str(count: usize) -> &'static str {
        if count == 1 { "operation" } else { "operations" }
    }

    /// Returns "performance" if `count` is 1, otherwise "performances".
    pub fn performances_str(count: usize) -> &'static str {
        if count == 1 {
            "performance"
        } else {
            "performances"
        }
    }
}

/// Displays a naming hierarchy as a single path, outermost level first.
///
/// An empty hierarchy displays as `(no scope)`.
pub struct DisplayScopePath<'a>(pub &'a [ScopeSegment]);

impl fmt::Display for DisplayScopePath<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("(no scope)");
        }
        for (ix, segment) in self.0.iter().enumerate() {
            if ix > 0 {
                f.write_str(" > ")?;
            }
            f.write_str(&segment.display_name)?;
        }
        Ok(())
    }
}

/// Bounds a rendered value for quoting in log output.
///
/// Truncation happens on a character boundary and appends an ellipsis; the
/// document itself always stores the full value.
pub fn truncate_rendered(value: &str, max_chars: usize) -> Cow<'_, str> {
    match value.char_indices().nth(max_chars) {
        None => Cow::Borrowed(value),
        Some((boundary, _)) => {
            let mut truncated = value[..boundary].to_owned();
            truncated.push('…');
            Cow::Owned(truncated)
        }
    }
}
