// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! The property and parameter data model (component C): a plain,
//! dialect-agnostic representation of a single content line, with no
//! semantic interpretation of its value.

use crate::keyword::{KW_CHARSET, KW_ENCODING, KW_VALUE_QUOTED_PRINTABLE};

/// Raised by [`Parameters::charset`] when a `CHARSET` parameter is present
/// but its name cannot even be syntactically a charset label (as opposed
/// to naming a charset the codec doesn't recognize, which the reader
/// discovers only when it tries to use it; see
/// [`crate::error::Warning::UnknownCharset`]).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("charset name {0:?} is not a legal charset label")]
pub struct IllegalCharsetName(pub String);

/// An ordered multimap of parameter names to one-or-more values, plus a
/// single legacy "nameless" slot for the OLD dialect's bare
/// `;QUOTED-PRINTABLE`-style parameters that carry no `NAME=` prefix.
///
/// Parameter names are canonicalized to upper-case ASCII on insertion (the
/// case policy applies uniformly here); insertion order among distinct
/// names is preserved.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Parameters {
    entries: Vec<(String, Vec<String>)>,
    nameless: Vec<String>,
}

impl Parameters {
    /// An empty parameter set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `value` to the values recorded under `name`, creating the
    /// entry (at the end of iteration order) if it does not already
    /// exist. `name` is upper-cased before lookup/insertion.
    pub fn add_value(&mut self, name: &str, value: String) {
        let key = name.to_ascii_uppercase();
        if let Some((_, values)) = self.entries.iter_mut().find(|(n, _)| *n == key) {
            values.push(value);
        } else {
            self.entries.push((key, vec![value]));
        }
    }

    /// Appends `value` to the legacy nameless slot (OLD dialect only).
    pub fn add_nameless_value(&mut self, value: String) {
        self.nameless.push(value);
    }

    /// Replaces all values under `name` with the single `value`, creating
    /// the entry (at the end of iteration order) if it does not already
    /// exist. Unlike [`Self::add_value`], this discards any values already
    /// recorded under `name`; used by the writer to correct a parameter it
    /// injected or fell back on.
    pub fn set_value(&mut self, name: &str, value: String) {
        let key = name.to_ascii_uppercase();
        if let Some((_, values)) = self.entries.iter_mut().find(|(n, _)| *n == key) {
            *values = vec![value];
        } else {
            self.entries.push((key, vec![value]));
        }
    }

    /// The first value recorded under `name`, if any. `name` is matched
    /// case-insensitively.
    #[must_use]
    pub fn get_first(&self, name: &str) -> Option<&str> {
        self.get_all(name).first().map(String::as_str)
    }

    /// All values recorded under `name`, in insertion order. Returns an
    /// empty slice if `name` was never recorded.
    #[must_use]
    pub fn get_all(&self, name: &str) -> &[String] {
        self.entries
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map_or(&[], |(_, values)| values.as_slice())
    }

    /// The legacy nameless values (OLD dialect), in insertion order.
    #[must_use]
    pub fn nameless_values(&self) -> &[String] {
        &self.nameless
    }

    /// Iterates over `(name, values)` pairs in insertion order. Does not
    /// include the nameless slot; see [`Self::nameless_values`].
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries
            .iter()
            .map(|(name, values)| (name.as_str(), values.as_slice()))
    }

    /// Whether this parameter set marks its property as
    /// quoted-printable-encoded: either an `ENCODING=QUOTED-PRINTABLE`
    /// parameter (any dialect) or a bare nameless `QUOTED-PRINTABLE`
    /// token (legacy OLD form).
    #[must_use]
    pub fn is_quoted_printable(&self) -> bool {
        self.get_all(KW_ENCODING)
            .iter()
            .any(|v| v.eq_ignore_ascii_case(KW_VALUE_QUOTED_PRINTABLE))
            || self
                .nameless
                .iter()
                .any(|v| v.eq_ignore_ascii_case(KW_VALUE_QUOTED_PRINTABLE))
    }

    /// The `CHARSET` parameter value, if present. Fails distinguishably
    /// when the label itself is not well-formed (empty, or containing
    /// characters no charset registry would accept); a syntactically
    /// legal but unrecognized label is not an error here, since
    /// `Parameters` has no charset registry of its own — that check
    /// happens where the quoted-printable bridge is available, see
    /// [`crate::error::Warning::UnknownCharset`].
    ///
    /// # Errors
    ///
    /// Returns [`IllegalCharsetName`] if the label contains characters
    /// outside printable ASCII.
    pub fn charset(&self) -> Result<Option<&str>, IllegalCharsetName> {
        match self.get_first(KW_CHARSET) {
            None => Ok(None),
            Some(name) if !name.is_empty() && name.chars().all(|c| c.is_ascii_graphic()) => {
                Ok(Some(name))
            }
            Some(name) => Err(IllegalCharsetName(name.to_string())),
        }
    }

    /// Whether no parameters (named or nameless) have been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty() && self.nameless.is_empty()
    }
}

/// A single parsed content line: an optional `group.` prefix, the
/// property name, its parameters, and its (already QP-decoded, if
/// applicable) value. No further semantic interpretation (date parsing,
/// schema validation) is performed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Property {
    /// The `group` prefix before the property name, if one was present.
    pub group: Option<String>,
    /// The property name, in its original input case.
    pub name: String,
    /// The parameters attached to this property.
    pub parameters: Parameters,
    /// The decoded value text (after quoted-printable decoding and
    /// charset transcoding, if signalled by parameters; escape sequences
    /// within the value are left for [`crate::value`] helpers to
    /// interpret, since the tokenizer does not know the target value
    /// shape).
    pub value: String,
}

impl Property {
    /// Creates a property with no parameters and an empty value.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            group: None,
            name: name.into(),
            parameters: Parameters::new(),
            value: String::new(),
        }
    }

    /// Sets the value, for building a property inline.
    #[must_use]
    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = value.into();
        self
    }
}
