// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Error and warning types, tiered per the reader/writer contract:
//! parse-time surprises are non-fatal [`Warning`]s delivered through the
//! listener; write-time rule violations are [`WriteError`]s; I/O failures
//! from the underlying source or sink are propagated untouched and, on
//! the write side, folded into [`EmitError`] alongside `WriteError`.

/// A non-fatal condition observed by the reader. The reader never aborts
/// on its own account; every `Warning` is handed to
/// [`crate::reader::Listener::on_warning`] and parsing continues unless the
/// listener requests a stop.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Warning {
    /// A content line never reached its `:` before end of stream and was
    /// discarded.
    #[error("line {line}: malformed content line, no ':' found before end of input")]
    MalformedLine {
        /// Physical line on which the property began.
        line: u64,
    },

    /// `BEGIN` was seen with an empty (or all-whitespace) component name.
    #[error("line {line}: BEGIN with empty component name")]
    EmptyBegin {
        /// Physical line of the directive.
        line: u64,
    },

    /// `END` was seen with an empty (or all-whitespace) component name.
    #[error("line {line}: END with empty component name")]
    EmptyEnd {
        /// Physical line of the directive.
        line: u64,
    },

    /// `END:<name>` did not match any component currently open on the
    /// stack.
    #[error("line {line}: END:{name} has no matching open component")]
    UnmatchedEnd {
        /// The (trimmed, upper-cased) name that failed to match.
        name: String,
        /// Physical line of the directive.
        line: u64,
    },

    /// `VERSION` was seen for a component that has rules in the syntax
    /// table, but the value did not match any known dialect.
    #[error("line {line}: unknown VERSION {value:?} for component {component}")]
    UnknownVersion {
        /// Upper-cased component name the VERSION was read inside.
        component: String,
        /// The raw (unparsed) VERSION value.
        value: String,
        /// Physical line of the directive.
        line: u64,
    },

    /// A property declared a `CHARSET` parameter that the charset bridge
    /// could not resolve; the raw (non-transcoded) bytes/text are used as
    /// a fallback.
    #[error("line {line}: unknown charset {charset:?} on property {property}")]
    UnknownCharset {
        /// Name of the property carrying the parameter.
        property: String,
        /// The raw charset label.
        charset: String,
        /// Physical line of the property.
        line: u64,
    },

    /// A property was marked quoted-printable but decoding failed; the
    /// raw, still-encoded value is kept as a fallback.
    #[error("line {line}: quoted-printable decoding failed for property {property}: {cause}")]
    QuotedPrintableError {
        /// Name of the property carrying the value.
        property: String,
        /// Physical line of the property.
        line: u64,
        /// Description of the underlying decode failure.
        cause: String,
    },
}

/// A tier-2 validation failure raised while emitting a property: the data
/// supplied to the writer cannot be represented in the target dialect
/// without loss or ambiguity.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WriteError {
    /// A character outside the allowed set for `field` was found in
    /// `value`.
    #[error("{field} {value:?} contains a character not permitted by the active dialect")]
    IllegalCharacters {
        /// Which structural field rejected the value (`"group"`,
        /// `"property name"`, `"parameter name"`, `"parameter value"`, or
        /// `"value"`).
        field: &'static str,
        /// The offending text.
        value: String,
    },

    /// The NEW dialect requires every parameter to carry a name; a
    /// legacy nameless (value-only) parameter from the `Parameters`
    /// model cannot be represented there.
    #[error("NEW dialect does not permit a nameless (value-only) parameter")]
    NamelessParameterInNewDialect,

    /// The property name was empty.
    #[error("property name must not be empty")]
    EmptyPropertyName,

    /// `group` or `name` began with SPACE or TAB, which would be
    /// indistinguishable from fold-continuation whitespace when read back.
    #[error("{field} {value:?} must not begin with SPACE or TAB")]
    LeadingWhitespace {
        /// Which structural field rejected the value (`"group"` or
        /// `"property name"`).
        field: &'static str,
        /// The offending text.
        value: String,
    },

    /// A charset label could not be resolved by the charset bridge while
    /// transcoding an outbound value.
    #[error("unknown charset {0:?}")]
    UnknownCharset(String),

    /// The configured fold indent is not legal for the active dialect: it
    /// must consist only of SPACE/TAB, and the NEW dialect requires
    /// exactly one indent character.
    #[error("illegal fold indent {indent:?}: {reason}")]
    IllegalIndent {
        /// The offending indent text.
        indent: String,
        /// Which requirement was violated.
        reason: &'static str,
    },
}

/// Top-level error returned by the emitter: either a validation failure
/// or an I/O error from the underlying sink.
#[derive(Debug, thiserror::Error)]
pub enum EmitError {
    /// The property could not be validated against the active dialect.
    #[error(transparent)]
    Validation(#[from] WriteError),

    /// Writing to the sink failed.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
