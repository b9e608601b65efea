// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! The folding writer (component D) and the property emitter (component
//! F): the inverse of [`crate::reader`]. [`FoldWriter`] owns line-length
//! bookkeeping and CRLF-plus-continuation folding; [`property`] validates
//! a [`Property`] against the active dialect, escapes and (if needed)
//! quoted-printable-encodes its value, and drives a [`FoldWriter`] to
//! produce one content line.

use std::borrow::Cow;
use std::io::{self, Write};

use crate::chars::{self, Position};
use crate::dialect::Dialect;
use crate::error::{EmitError, WriteError};
use crate::keyword::{KW_CHARSET, KW_ENCODING, KW_VALUE_QUOTED_PRINTABLE};
use crate::property::{Parameters, Property};
use crate::qp::QuotedPrintableCodec;

/// Construction-time options for a [`FoldWriter`].
#[derive(Debug, Clone)]
pub struct FoldOptions {
    /// The column at which a line is folded, counting from the start of
    /// the logical line.
    ///
    /// - `None`: no line folding.
    /// - `Some(n)`: fold lines longer than `n` octets.
    ///
    /// Default: `Some(75)`, the conventional vCard/iCalendar line length.
    pub fold_column: Option<usize>,
    /// The text written at the start of each continuation line, after
    /// the fold's CRLF. Default: a single space.
    pub indent: String,
}

impl Default for FoldOptions {
    fn default() -> Self {
        Self {
            fold_column: Some(75),
            indent: " ".to_string(),
        }
    }
}

impl FoldOptions {
    /// Sets the fold column.
    #[must_use]
    pub const fn fold_column(mut self, fold_column: Option<usize>) -> Self {
        self.fold_column = fold_column;
        self
    }

    /// Sets the continuation-line indent.
    #[must_use]
    pub fn indent(mut self, indent: impl Into<String>) -> Self {
        self.indent = indent.into();
        self
    }
}

/// Wraps any [`Write`] sink with RFC 6350/5545-style line folding. Once
/// the current logical line reaches [`FoldOptions::fold_column`], a CRLF
/// plus [`FoldOptions::indent`] is inserted before the next byte.
///
/// A fold never splits a multi-byte UTF-8 sequence, and never splits a
/// quoted-printable escape triple (`=XX`) that is already in flight —
/// the same way the surrounding logical line never splits a backslash
/// escape sequence it happens to be writing.
#[derive(Debug)]
pub struct FoldWriter<W: Write> {
    writer: W,
    options: FoldOptions,
    line_length: usize,
}

impl<W: Write> FoldWriter<W> {
    /// Creates a folding writer over `writer` with default options.
    #[must_use]
    pub fn new(writer: W) -> Self {
        Self::with_options(writer, FoldOptions::default())
    }

    /// Creates a folding writer over `writer` with explicit `options`.
    #[must_use]
    pub fn with_options(writer: W, options: FoldOptions) -> Self {
        Self {
            writer,
            options,
            line_length: 0,
        }
    }

    /// Returns a mutable reference to the underlying sink.
    #[must_use]
    pub fn writer_mut(&mut self) -> &mut W {
        &mut self.writer
    }

    /// The continuation-line indent this writer was configured with.
    #[must_use]
    pub fn indent(&self) -> &str {
        &self.options.indent
    }

    /// Consumes the writer, returning the underlying sink.
    #[must_use]
    pub fn into_writer(self) -> W {
        self.writer
    }

    /// Terminates the current logical line with a CRLF and resets the
    /// line-length counter.
    ///
    /// # Errors
    ///
    /// Propagates I/O failures from the underlying sink.
    pub fn writeln(&mut self) -> io::Result<()> {
        self.writer.write_all(b"\r\n")?;
        self.line_length = 0;
        Ok(())
    }

    /// Inserts a CRLF-plus-indent fold and resets the line-length counter
    /// to the indent's width.
    fn insert_fold(&mut self) -> io::Result<()> {
        self.writer.write_all(b"\r\n")?;
        self.writer.write_all(self.options.indent.as_bytes())?;
        self.line_length = self.options.indent.len();
        Ok(())
    }
}

impl<W: Write> Write for FoldWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let text = std::str::from_utf8(buf)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        self.fold_chars(text, false)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }
}

impl<W: Write> FoldWriter<W> {
    /// Writes `text`, applying ordinary fold rules or, when
    /// `quoted_printable` is set, the narrower quoted-printable
    /// soft-break variant: the effective column limit is reduced by one
    /// to leave room for a trailing `=`, continuation lines carry no
    /// indent, and the fold marker itself is `=` rather than bare CRLF.
    ///
    /// # Errors
    ///
    /// Propagates I/O failures from the underlying sink.
    pub fn write_value(&mut self, text: &str, quoted_printable: bool) -> io::Result<()> {
        self.fold_chars(text, quoted_printable)
    }

    /// Character-at-a-time fold loop shared by the generic [`Write`]
    /// impl and [`Self::write_value`]. Operating per-`char` rather than
    /// per-byte sidesteps UTF-8-boundary splitting entirely (a `char` is
    /// always written whole) and lets us recognize whitespace and
    /// embedded line breaks without re-decoding.
    fn fold_chars(&mut self, text: &str, quoted_printable: bool) -> io::Result<()> {
        let Some(base_max) = self.options.fold_column else {
            self.writer.write_all(text.as_bytes())?;
            return Ok(());
        };
        let max_len = if quoted_printable {
            base_max.saturating_sub(1)
        } else {
            base_max
        };

        // Tracks how many more characters complete a quoted-printable
        // `=XX` triple already in progress; a fold must not land inside
        // one even when `quoted_printable` is false, since callers may
        // hand us pre-escaped text (e.g. a caret- or backslash-escaped
        // parameter value) that happens to contain a literal `=`.
        let mut qp_remaining: usize = 0;

        let mut chars = text.chars().peekable();
        while let Some(c) = chars.next() {
            // Embedded newlines reset the column and pass through
            // untouched; they are never themselves a fold point.
            if c == '\r' || c == '\n' {
                if c == '\r' && chars.peek() == Some(&'\n') {
                    self.writer.write_all(b"\r\n")?;
                    chars.next();
                } else {
                    let mut buf = [0u8; 4];
                    self.writer.write_all(c.encode_utf8(&mut buf).as_bytes())?;
                }
                self.line_length = 0;
                qp_remaining = 0;
                continue;
            }

            let clen = c.len_utf8();
            // Trailing-whitespace protection: a break point that would
            // land on whitespace is deferred until the run ends, rather
            // than folding in a way an OLD-dialect reader might mistake
            // the trailing spaces for fold indent.
            let is_whitespace = c == ' ' || c == '\t';
            if qp_remaining == 0 && self.line_length + clen > max_len && !is_whitespace {
                self.insert_fold_point(quoted_printable)?;
            }

            if c == '=' {
                qp_remaining = 2;
            } else if qp_remaining > 0 {
                qp_remaining -= 1;
            }

            let mut buf = [0u8; 4];
            self.writer.write_all(c.encode_utf8(&mut buf).as_bytes())?;
            self.line_length += clen;
        }
        Ok(())
    }

    /// Inserts one fold: a bare `CRLF` plus [`FoldOptions::indent`] in
    /// the ordinary case, or `=CRLF` with no indent when
    /// `quoted_printable` is set (the QP soft-break form).
    fn insert_fold_point(&mut self, quoted_printable: bool) -> io::Result<()> {
        if quoted_printable {
            self.writer.write_all(b"=\r\n")?;
            self.line_length = 0;
        } else {
            self.insert_fold()?;
        }
        Ok(())
    }
}

fn check_allowed(
    position: Position,
    dialect: Dialect,
    strict: bool,
    caret: bool,
    field: &'static str,
    value: &str,
) -> Result<(), WriteError> {
    let table = chars::table(position, dialect, strict, caret);
    if table.all_allowed(value) {
        Ok(())
    } else {
        Err(WriteError::IllegalCharacters {
            field,
            value: value.to_string(),
        })
    }
}

/// `group` and `name` must not begin with SPACE or TAB: a leading fold
/// whitespace character there would be indistinguishable from a
/// continuation line when the document is read back.
fn check_not_leading_whitespace(field: &'static str, value: &str) -> Result<(), WriteError> {
    if value.starts_with([' ', '\t']) {
        Err(WriteError::LeadingWhitespace {
            field,
            value: value.to_string(),
        })
    } else {
        Ok(())
    }
}

/// Validates a configured fold indent: it must consist only of SPACE/TAB,
/// and the NEW dialect requires exactly one indent character.
fn check_indent(indent: &str, dialect: Dialect) -> Result<(), WriteError> {
    if !indent.chars().all(|c| c == ' ' || c == '\t') {
        return Err(WriteError::IllegalIndent {
            indent: indent.to_string(),
            reason: "must consist only of SPACE/TAB",
        });
    }
    if dialect == Dialect::New && indent.chars().count() != 1 {
        return Err(WriteError::IllegalIndent {
            indent: indent.to_string(),
            reason: "NEW dialect requires exactly one indent character",
        });
    }
    Ok(())
}

/// Applies the OLD dialect's backslash escaping (`\` and `;`) to a
/// parameter value.
fn escape_old_param_value(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            ';' => out.push_str("\\;"),
            other => out.push(other),
        }
    }
    out
}

/// Applies NEW-dialect caret escaping (`^^`, `^n`, `^'`) to a parameter
/// or property value.
fn caret_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '^' => out.push_str("^^"),
            '"' => out.push_str("^'"),
            '\r' => {
                if chars.peek() == Some(&'\n') {
                    chars.next();
                }
                out.push_str("^n");
            }
            '\n' => out.push_str("^n"),
            other => out.push(other),
        }
    }
    out
}

/// Whether a NEW-dialect parameter value needs its own double quotes to
/// round-trip (it contains a structural delimiter that would otherwise
/// be read as ending the value).
fn needs_quoting(s: &str) -> bool {
    s.contains([',', ';', ':'])
}

fn write_new_param_value<W: Write>(writer: &mut FoldWriter<W>, value: &str, caret: bool) -> io::Result<()> {
    let escaped = if caret { caret_escape(value) } else { value.to_string() };
    if needs_quoting(&escaped) {
        write!(writer, "\"{escaped}\"")
    } else {
        writer.write_all(escaped.as_bytes())
    }
}

/// Whether `value` must be protected before it can be written as an
/// OLD-dialect content line: OLD has no in-value newline escape (that
/// is a NEW-only facility via `^n`), so any value carrying an embedded
/// CR or LF has to go out quoted-printable-encoded instead.
fn old_dialect_needs_qp(value: &str) -> bool {
    value.contains(['\r', '\n'])
}

/// Validates `property` against `dialect`, escaping and (if needed)
/// quoted-printable-encoding its value, then writes it as one content
/// line through `writer`. The `CHARSET`/`ENCODING` parameters are
/// injected automatically when quoted-printable-encoding becomes
/// necessary; existing parameters are otherwise passed through
/// untouched (a [`Cow`] avoids cloning the common case where no
/// injection is needed).
///
/// # Errors
///
/// Returns [`WriteError`] if any field contains a character the active
/// dialect forbids, if the property name is empty, if `group`/`name`
/// begins with SPACE or TAB, if the writer's configured fold indent is
/// not legal for `dialect`, or if a NEW-dialect property carries a
/// legacy nameless parameter. Returns an I/O error if writing to the
/// sink fails.
pub fn property<W: Write>(
    writer: &mut FoldWriter<W>,
    dialect: Dialect,
    strict: bool,
    caret_encode: bool,
    codec: &dyn QuotedPrintableCodec,
    prop: &Property,
) -> Result<(), EmitError> {
    check_indent(writer.indent(), dialect)?;

    if prop.name.is_empty() {
        return Err(WriteError::EmptyPropertyName.into());
    }
    if let Some(group) = &prop.group {
        check_not_leading_whitespace("group", group)?;
    }
    check_not_leading_whitespace("property name", &prop.name)?;

    if let Some(group) = &prop.group {
        check_allowed(Position::Group, dialect, strict, caret_encode, "group", group)?;
    }
    check_allowed(
        Position::PropertyName,
        dialect,
        strict,
        caret_encode,
        "property name",
        &prop.name,
    )?;

    if dialect == Dialect::New && !prop.parameters.nameless_values().is_empty() {
        return Err(WriteError::NamelessParameterInNewDialect.into());
    }

    for (name, values) in prop.parameters.iter() {
        check_allowed(Position::ParameterName, dialect, strict, caret_encode, "parameter name", name)?;
        for value in values {
            check_allowed(
                Position::ParameterValue,
                dialect,
                strict,
                caret_encode,
                "parameter value",
                value,
            )?;
        }
    }
    for value in prop.parameters.nameless_values() {
        check_allowed(
            Position::ParameterValue,
            dialect,
            strict,
            caret_encode,
            "parameter value",
            value,
        )?;
    }

    let mut parameters: Cow<'_, Parameters> = Cow::Borrowed(&prop.parameters);
    let mut is_qp = prop.parameters.is_quoted_printable();

    if !is_qp && dialect == Dialect::Old && old_dialect_needs_qp(&prop.value) {
        is_qp = true;
        parameters
            .to_mut()
            .add_value(KW_ENCODING, KW_VALUE_QUOTED_PRINTABLE.to_string());
    }

    // `Property::value` is always the decoded text, by contract (see
    // `Property` docs); a quoted-printable-marked property is encoded
    // here regardless of whether `ENCODING=QUOTED-PRINTABLE` came from
    // the caller or was just injected above. An unresolvable declared
    // `CHARSET` falls back to UTF-8, correcting the parameter to match
    // what was actually written, per spec "QP encoding resolution."
    let encoded_value = if is_qp {
        let declared = parameters.charset().ok().flatten().map(str::to_string);
        match codec.encode(&prop.value, declared.as_deref()) {
            Ok(out) if declared.is_some() => out,
            Ok(out) => {
                parameters.to_mut().set_value(KW_CHARSET, "UTF-8".to_string());
                out
            }
            Err(WriteError::UnknownCharset(_)) => {
                parameters.to_mut().set_value(KW_CHARSET, "UTF-8".to_string());
                codec.encode(&prop.value, Some("UTF-8"))?
            }
            Err(other) => return Err(other.into()),
        }
    } else {
        prop.value.clone()
    };

    if let Some(group) = &prop.group {
        write!(writer, "{group}.")?;
    }
    writer.write_all(prop.name.as_bytes())?;

    for (name, values) in parameters.iter() {
        match dialect {
            // OLD has no comma-joined multi-value syntax: repeat the
            // whole `;NAME=value` segment once per value instead.
            Dialect::Old => {
                for value in values {
                    write!(writer, ";{name}=")?;
                    writer.write_all(escape_old_param_value(value).as_bytes())?;
                }
            }
            Dialect::New => {
                write!(writer, ";{name}=")?;
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        writer.write_all(b",")?;
                    }
                    write_new_param_value(writer, value, caret_encode)?;
                }
            }
        }
    }
    for value in parameters.nameless_values() {
        write!(writer, ";{}", escape_old_param_value(value))?;
    }

    writer.write_all(b":")?;

    let value_text = if dialect == Dialect::New && caret_encode && !is_qp {
        caret_escape(&encoded_value)
    } else {
        encoded_value
    };
    writer.write_value(&value_text, is_qp)?;
    writer.writeln()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::qp::StdQuotedPrintableCodec;

    fn render(dialect: Dialect, caret: bool, prop: &Property) -> String {
        let options = FoldOptions::default().fold_column(None);
        let mut writer = FoldWriter::with_options(Vec::new(), options);
        property(&mut writer, dialect, true, caret, &StdQuotedPrintableCodec, prop).unwrap();
        String::from_utf8(writer.into_writer()).unwrap()
    }

    #[test]
    fn writes_simple_new_dialect_property() {
        let prop = Property::new("FN").with_value("Fox Mulder");
        assert_eq!(render(Dialect::New, true, &prop), "FN:Fox Mulder\r\n");
    }

    #[test]
    fn caret_escapes_new_dialect_parameter_value() {
        let mut prop = Property::new("NOTE").with_value("hi");
        prop.parameters.add_value("X-AUTHOR", "Fox \"Spooky\" Mulder".to_string());
        assert_eq!(
            render(Dialect::New, true, &prop),
            "NOTE;X-AUTHOR=Fox ^'Spooky^' Mulder:hi\r\n"
        );
    }

    #[test]
    fn old_dialect_auto_encodes_embedded_newline() {
        let prop = Property::new("NOTE").with_value("line one\r\nline two");
        let out = render(Dialect::Old, false, &prop);
        assert!(out.contains("ENCODING=QUOTED-PRINTABLE"));
        assert!(out.contains("=0D=0A") || out.contains("=0A"));
    }

    #[test]
    fn caller_supplied_encoding_parameter_still_qp_encodes_the_value() {
        let mut prop = Property::new("NOTE").with_value("caf\u{e9}=done");
        prop.parameters.add_value("ENCODING", "QUOTED-PRINTABLE".to_string());
        let out = render(Dialect::New, true, &prop);
        assert!(out.contains("CHARSET=UTF-8"));
        let encoded = out.trim_end_matches("\r\n").split_once(':').unwrap().1;
        assert_eq!(
            StdQuotedPrintableCodec.decode(encoded, Some("UTF-8")).unwrap(),
            "caf\u{e9}=done"
        );
    }

    #[test]
    fn declared_charset_is_used_to_encode_and_left_untouched() {
        let mut prop = Property::new("NOTE").with_value("caf\u{e9}");
        prop.parameters.add_value("ENCODING", "QUOTED-PRINTABLE".to_string());
        prop.parameters.add_value("CHARSET", "ISO-8859-1".to_string());
        let out = render(Dialect::New, true, &prop);
        assert!(out.contains("CHARSET=ISO-8859-1"));
        assert!(!out.contains("CHARSET=UTF-8"));
        let encoded = out.trim_end_matches("\r\n").split_once(':').unwrap().1;
        assert_eq!(
            StdQuotedPrintableCodec.decode(encoded, Some("ISO-8859-1")).unwrap(),
            "caf\u{e9}"
        );
    }

    #[test]
    fn unresolvable_declared_charset_falls_back_to_utf8() {
        let mut prop = Property::new("NOTE").with_value("caf\u{e9}");
        prop.parameters.add_value("ENCODING", "QUOTED-PRINTABLE".to_string());
        prop.parameters.add_value("CHARSET", "not-a-real-charset".to_string());
        let out = render(Dialect::New, true, &prop);
        assert!(out.contains("CHARSET=UTF-8"));
        let encoded = out.trim_end_matches("\r\n").split_once(':').unwrap().1;
        assert_eq!(
            StdQuotedPrintableCodec.decode(encoded, Some("UTF-8")).unwrap(),
            "caf\u{e9}"
        );
    }

    #[test]
    fn nameless_parameter_rejected_in_new_dialect() {
        let mut prop = Property::new("TEL").with_value("555-1234");
        prop.parameters.add_nameless_value("WORK".to_string());
        let mut writer = FoldWriter::new(Vec::new());
        let err = property(&mut writer, Dialect::New, true, true, &StdQuotedPrintableCodec, &prop);
        assert!(matches!(err, Err(EmitError::Validation(WriteError::NamelessParameterInNewDialect))));
    }

    #[test]
    fn old_dialect_repeats_the_segment_for_each_parameter_value() {
        let mut prop = Property::new("TEL").with_value("555-1234");
        prop.parameters.add_value("TYPE", "WORK".to_string());
        prop.parameters.add_value("TYPE", "VOICE".to_string());
        assert_eq!(
            render(Dialect::Old, false, &prop),
            "TEL;TYPE=WORK;TYPE=VOICE:555-1234\r\n"
        );
    }

    #[test]
    fn new_dialect_parameter_value_is_quoted_when_it_contains_a_colon() {
        let mut prop = Property::new("NOTE").with_value("hi");
        prop.parameters.add_value("X-URI", "http://example.com".to_string());
        assert_eq!(
            render(Dialect::New, true, &prop),
            "NOTE;X-URI=\"http://example.com\":hi\r\n"
        );
    }

    #[test]
    fn fold_writer_wraps_long_lines_at_the_configured_column() {
        let options = FoldOptions::default().fold_column(Some(10));
        let mut writer = FoldWriter::with_options(Vec::new(), options);
        writer.write_all(b"ABCDEFGHIJKLMNOP").unwrap();
        let out = String::from_utf8(writer.into_writer()).unwrap();
        for line in out.split("\r\n") {
            assert!(line.len() <= 10);
        }
        assert!(out.contains("\r\n "));
    }

    #[test]
    fn fold_writer_never_splits_a_quoted_printable_triple() {
        let options = FoldOptions::default().fold_column(Some(10));
        let mut writer = FoldWriter::with_options(Vec::new(), options);
        writer.write_all(b"ABCDEFGHIJ=41KLMNOP").unwrap();
        let out = String::from_utf8(writer.into_writer()).unwrap();
        assert!(!out.contains("=4\r\n 1"));
    }

    #[test]
    fn fold_writer_never_splits_a_multibyte_character() {
        let options = FoldOptions::default().fold_column(Some(20));
        let mut writer = FoldWriter::with_options(Vec::new(), options);
        writer
            .write_all("Caf\u{e9} au lait, r\u{e9}sum\u{e9} writer test".as_bytes())
            .unwrap();
        let bytes = writer.into_writer();
        for chunk in bytes.split(|&b| b == b'\n') {
            assert!(std::str::from_utf8(chunk).is_ok());
        }
    }

    #[test]
    fn fold_writer_defers_break_past_a_whitespace_run() {
        let options = FoldOptions::default().fold_column(Some(10)).indent("");
        let mut writer = FoldWriter::with_options(Vec::new(), options);
        writer.write_all(b"ABCDEFGHI   JKLM").unwrap();
        let out = String::from_utf8(writer.into_writer()).unwrap();
        // The break lands after the whole run of spaces, not mid-run,
        // even though that means the first line runs over 10 columns.
        assert_eq!(out, "ABCDEFGHI   \r\nJKLM");
    }

    #[test]
    fn fold_writer_passes_embedded_newlines_through_and_resets_column() {
        let options = FoldOptions::default().fold_column(Some(5));
        let mut writer = FoldWriter::with_options(Vec::new(), options);
        writer.write_all(b"AB\r\nCDEFGH").unwrap();
        let out = String::from_utf8(writer.into_writer()).unwrap();
        assert!(out.starts_with("AB\r\n"));
        assert!(!out["AB\r\n".len()..].starts_with(' '));
    }

    #[test]
    fn quoted_printable_soft_break_uses_trailing_equals_and_no_indent() {
        let options = FoldOptions::default().fold_column(Some(10));
        let mut writer = FoldWriter::with_options(Vec::new(), options);
        writer.write_value("ABCDEFGHIJKLMNOP", true).unwrap();
        let out = String::from_utf8(writer.into_writer()).unwrap();
        assert!(out.contains("=\r\n"));
        assert!(!out.contains("\r\n "));
        for line in out.split("\r\n") {
            assert!(line.len() <= 10);
        }
    }
}
