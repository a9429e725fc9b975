// Copyright (c) The playbill Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Build and persist session reports from a stream of performance events.
//!
//! The main type here is [`SessionReporter`], which is constructed via a
//! [`SessionReporterBuilder`] and subscribed to a
//! [`SessionNotifier`](crate::notifier::SessionNotifier).

mod builder;
mod events;
mod imp;
mod registry;
mod stream;

pub use builder::*;
pub use events::*;
pub use imp::*;
pub use registry::*;
pub use stream::*;
