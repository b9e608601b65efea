// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Streaming reader and writer for the vobject family of text records
//! (vCard and iCalendar), covering both the OLD dialect (vCard 2.1 /
//! iCalendar 1.0) and the NEW dialect (vCard 3.0+ / iCalendar 2.0).
//!
//! The reader ([`reader::Reader`]) drives a character-at-a-time state
//! machine over a [`reader::CharSource`] and reports components,
//! properties, version markers, and warnings through a [`reader::Listener`]
//! callback. The writer ([`emitter::FoldWriter`] and
//! [`emitter::property`]) performs the inverse: folding, escaping, and
//! quoted-printable encoding on the way out.
//!
//! This crate does not interpret property values semantically (no date
//! parsing, no vCard/iCalendar schema) and performs no networking or
//! concurrency; see `DESIGN.md` in the repository root for the full
//! design rationale.

#![warn(
    trivial_casts,
    trivial_numeric_casts,
    missing_copy_implementations,
    missing_debug_implementations,
    missing_docs,
    unsafe_code,
    unused_import_braces,
    unused_qualifications,
    clippy::dbg_macro
)]

pub mod chars;
pub mod dialect;
pub mod emitter;
pub mod error;
mod keyword;
pub mod property;
pub mod qp;
pub mod reader;
pub mod value;

pub use crate::dialect::{ComponentStack, Dialect, SyntaxRules};
pub use crate::emitter::FoldWriter;
pub use crate::error::{EmitError, WriteError};
pub use crate::property::{Parameters, Property};
pub use crate::qp::{QuotedPrintableCodec, StdQuotedPrintableCodec};
pub use crate::reader::{CharSource, Listener, ParseContext, Reader};
