// Copyright (c) The playbill Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::FormatVersion;
use std::{error, fmt};

/// An error that occurs while reading a session report document.
#[derive(Debug)]
#[non_exhaustive]
pub enum FormatError {
    /// The document is not valid JSON, or does not match the expected shape.
    Json(serde_json::Error),

    /// The document was produced by a newer tool than this reader supports.
    UnsupportedVersion {
        /// The version declared by the document.
        version: FormatVersion,

        /// The highest version this reader supports.
        supported: FormatVersion,
    },
}

impl fmt::Display for FormatError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Json(_) => {
                write!(f, "parsing session report document failed")
            }
            Self::UnsupportedVersion { version, supported } => {
                write!(
                    f,
                    "session report document is format version {version}, \
                     but only versions up to {supported} are supported"
                )
            }
        }
    }
}

impl error::Error for FormatError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            Self::Json(err) => Some(err),
            Self::UnsupportedVersion { .. } => None,
        }
    }
}
