// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! The tokenizing reader (component E): a hand-rolled, forward-only
//! character state machine that unfolds lines, splits a content line
//! into group/name/parameters/value, decodes parameter escapes, and
//! reports components, properties, version markers, and warnings
//! through a [`Listener`].
//!
//! This is a streaming `struct Reader<R> { source, state... }` wrapping
//! a pull-based [`CharSource`], in the manner of the corpus's other
//! hand-rolled text state machines (a small `match` over `(state-ish
//! flags, char)` rather than a whole-buffer tokenizer), because the
//! contract here is one character of look-ahead and a resumable `stop`
//! flag — properties a batch lexer can't give us.

use std::io;

use crate::dialect::{ComponentStack, Dialect, SyntaxRules};
use crate::error::Warning;
use crate::keyword::{KW_BEGIN, KW_CHARSET, KW_END, KW_VERSION};
use crate::property::{Parameters, Property};
use crate::qp::{QuotedPrintableCodec, StdQuotedPrintableCodec};

/// The external collaborator that hands the reader one character at a
/// time. A blanket implementation is provided for every
/// `Iterator<Item = char>`, so `"...".chars()` and any custom iterator
/// work directly — no adapter type is required for the common case.
pub trait CharSource {
    /// Returns the next character, or `Ok(None)` once the source is
    /// exhausted.
    ///
    /// # Errors
    ///
    /// Propagates I/O failures from the underlying source untouched.
    fn next_char(&mut self) -> io::Result<Option<char>>;
}

impl<I: Iterator<Item = char>> CharSource for I {
    fn next_char(&mut self) -> io::Result<Option<char>> {
        Ok(self.next())
    }
}

/// An immutable view handed to every listener callback: the component
/// path the event occurred in, the raw unfolded logical line, and the
/// physical line number the content line started on. Callbacks that
/// want to suspend parsing call [`Self::stop`]; the reader observes
/// this flag once the callback returns and, for any event inside the
/// same property dispatch, stops issuing further callbacks.
#[derive(Debug, Clone)]
pub struct ParseContext {
    path: Vec<String>,
    raw_line: String,
    line_number: u64,
    stop: bool,
}

impl ParseContext {
    fn new(path: Vec<String>, raw_line: String, line_number: u64) -> Self {
        Self {
            path,
            raw_line,
            line_number,
            stop: false,
        }
    }

    /// The names of the components currently open, outermost first.
    #[must_use]
    pub fn path(&self) -> &[String] {
        &self.path
    }

    /// The raw, already-unfolded text of the logical line this event
    /// was produced from.
    #[must_use]
    pub fn raw_line(&self) -> &str {
        &self.raw_line
    }

    /// The physical line number the content line started on.
    #[must_use]
    pub fn line_number(&self) -> u64 {
        self.line_number
    }

    /// Requests that parsing suspend after the current property has
    /// been fully dispatched. A later call to [`Reader::parse`] resumes
    /// from the next character, with all reader state (component stack,
    /// dialect, look-ahead) intact.
    pub fn stop(&mut self) {
        self.stop = true;
    }

    fn is_stopped(&self) -> bool {
        self.stop
    }
}

/// The five events a [`Reader`] reports, modeled as five named methods
/// rather than a class hierarchy. Every method has a no-op default, so
/// a listener only needs to implement the events it cares about.
pub trait Listener {
    /// A component was opened (`BEGIN:<name>`).
    fn on_component_start(&mut self, _ctx: &mut ParseContext, _name: &str) {}

    /// A component was closed (`END:<name>`), including force-closes of
    /// intervening components when `END` named an outer frame.
    fn on_component_end(&mut self, _ctx: &mut ParseContext, _name: &str) {}

    /// An ordinary content line was parsed into a property.
    fn on_property(&mut self, _ctx: &mut ParseContext, _property: Property) {}

    /// A `VERSION` property triggered a dialect switch via the active
    /// [`SyntaxRules`].
    fn on_version(&mut self, _ctx: &mut ParseContext, _dialect: Dialect, _property: Property) {}

    /// A non-fatal condition was observed; parsing continues unless the
    /// listener calls [`ParseContext::stop`].
    fn on_warning(&mut self, _ctx: &mut ParseContext, _warning: Warning) {}
}

/// Construction-time options for a [`Reader`]. Mirrors the options-
/// struct-plus-builder shape used for [`crate::emitter::FoldOptions`].
#[derive(Debug, Clone)]
pub struct ReaderOptions {
    /// Maps `(component, VERSION value)` to a dialect switch. Defaults
    /// to [`SyntaxRules::standard`].
    pub rules: SyntaxRules,
    /// The dialect in effect before any `BEGIN` (or VERSION switch).
    /// Defaults to [`Dialect::New`].
    pub default_dialect: Dialect,
    /// Whether `^`-introduced caret escapes are decoded in NEW-dialect
    /// parameter values. Defaults to `true`.
    pub caret_decode: bool,
    /// The text substituted for `^n` (and, on the value side, left to
    /// the value-codec helpers) decoding. Construction-time rather than
    /// a process-wide constant, so parsing is deterministic under test.
    /// Defaults to `"\n"`.
    pub newline: String,
    /// The charset assumed for quoted-printable decoding when a
    /// property carries no `CHARSET` parameter. `None` means UTF-8 (the
    /// [`StdQuotedPrintableCodec`] default).
    pub default_charset: Option<String>,
}

impl Default for ReaderOptions {
    fn default() -> Self {
        Self {
            rules: SyntaxRules::standard(),
            default_dialect: Dialect::New,
            caret_decode: true,
            newline: "\n".to_string(),
            default_charset: None,
        }
    }
}

impl ReaderOptions {
    /// Sets the syntax-rule table used for VERSION-triggered dialect
    /// switching.
    #[must_use]
    pub fn rules(mut self, rules: SyntaxRules) -> Self {
        self.rules = rules;
        self
    }

    /// Sets the dialect in effect outside any component, before any
    /// VERSION switch.
    #[must_use]
    pub const fn default_dialect(mut self, dialect: Dialect) -> Self {
        self.default_dialect = dialect;
        self
    }

    /// Enables or disables caret-escape decoding in NEW-dialect
    /// parameter values.
    #[must_use]
    pub const fn caret_decode(mut self, enabled: bool) -> Self {
        self.caret_decode = enabled;
        self
    }

    /// Sets the newline text substituted for `^n`.
    #[must_use]
    pub fn newline(mut self, newline: impl Into<String>) -> Self {
        self.newline = newline.into();
        self
    }

    /// Sets the charset assumed when quoted-printable decoding a
    /// property with no `CHARSET` parameter.
    #[must_use]
    pub fn default_charset(mut self, charset: impl Into<String>) -> Self {
        self.default_charset = Some(charset.into());
        self
    }
}

/// Which multi-character fold whitespace run, if any, is currently
/// being consumed. Only OLD folds more than one leading whitespace
/// character; NEW always folds exactly one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FoldRun {
    None,
    Consuming,
}

/// A forward-only, character-at-a-time vCard/iCalendar content-line
/// tokenizer. Owns its [`CharSource`] outright (plain ownership, so
/// `Drop` releases it along every exit path); holds the character
/// accumulator, the property under construction, and the one-character
/// look-ahead slot across `parse` calls so a caller can resume after a
/// listener-requested stop.
pub struct Reader<R: CharSource> {
    source: R,
    codec: Box<dyn QuotedPrintableCodec>,
    rules: SyntaxRules,
    stack: ComponentStack,
    caret_decode: bool,
    newline: String,
    default_charset: Option<String>,

    buffer: String,
    raw_line: String,
    group: Option<String>,
    name: Option<String>,
    parameters: Parameters,
    current_param_name: Option<String>,
    in_value: bool,
    in_param_region: bool,
    in_quotes: bool,
    pending_escape: bool,
    folded_qp_continuation: bool,
    fold_run: FoldRun,
    prev: Option<char>,
    lookahead: Option<char>,
    physical_line: u64,
    property_start_line: u64,
    stopped: bool,
}

impl<R: CharSource> std::fmt::Debug for Reader<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reader")
            .field("stack", &self.stack)
            .field("in_value", &self.in_value)
            .field("physical_line", &self.physical_line)
            .field("stopped", &self.stopped)
            .finish_non_exhaustive()
    }
}

impl<R: CharSource> Reader<R> {
    /// Creates a reader over `source` with default options (standard
    /// vCard/iCalendar syntax rules, NEW default dialect, caret
    /// decoding enabled, `StdQuotedPrintableCodec`).
    #[must_use]
    pub fn new(source: R) -> Self {
        Self::with_codec(source, ReaderOptions::default(), Box::new(StdQuotedPrintableCodec))
    }

    /// Creates a reader with explicit `options`, using
    /// [`StdQuotedPrintableCodec`] as the quoted-printable bridge.
    #[must_use]
    pub fn with_options(source: R, options: ReaderOptions) -> Self {
        Self::with_codec(source, options, Box::new(StdQuotedPrintableCodec))
    }

    /// Creates a reader with explicit `options` and a custom
    /// quoted-printable/charset bridge.
    #[must_use]
    pub fn with_codec(
        source: R,
        options: ReaderOptions,
        codec: Box<dyn QuotedPrintableCodec>,
    ) -> Self {
        Self {
            source,
            codec,
            stack: ComponentStack::new(options.default_dialect),
            rules: options.rules,
            caret_decode: options.caret_decode,
            newline: options.newline,
            default_charset: options.default_charset,

            buffer: String::new(),
            raw_line: String::new(),
            group: None,
            name: None,
            parameters: Parameters::new(),
            current_param_name: None,
            in_value: false,
            in_param_region: false,
            in_quotes: false,
            pending_escape: false,
            folded_qp_continuation: false,
            fold_run: FoldRun::None,
            prev: None,
            lookahead: None,
            physical_line: 1,
            property_start_line: 1,
            stopped: false,
        }
    }

    /// The dialect currently in effect (the innermost open component's,
    /// or the document default).
    #[must_use]
    pub fn current_dialect(&self) -> Dialect {
        self.stack.current_dialect()
    }

    /// The names of the components currently open, outermost first.
    #[must_use]
    pub fn path(&self) -> Vec<String> {
        self.stack.path()
    }

    /// Drives the state machine, delivering events to `listener` in
    /// document order, until the source is exhausted or the listener
    /// requests a stop. A subsequent call resumes from the next
    /// character.
    ///
    /// # Errors
    ///
    /// Propagates I/O failures from the underlying [`CharSource`].
    pub fn parse<L: Listener>(&mut self, listener: &mut L) -> io::Result<()> {
        loop {
            if self.stopped {
                return Ok(());
            }

            let ch = match self.lookahead.take() {
                Some(c) => c,
                None => match self.source.next_char()? {
                    Some(c) => c,
                    None => {
                        self.finish_property(listener)?;
                        return Ok(());
                    }
                },
            };

            if let Some(next) = self.feed(ch)? {
                self.finish_property(listener)?;
                self.reset_property_state();
                if self.stopped {
                    return Ok(());
                }
                self.lookahead = Some(next);
            }
        }
    }

    /// Feeds one character through items 1-13 of the state machine.
    /// Returns `Some(next)` when a logical line just terminated and
    /// `next` is the first character of whatever follows (to be
    /// reprocessed as a fresh look-ahead); returns `None` when `ch` was
    /// fully consumed and parsing should continue.
    fn feed(&mut self, ch: char) -> io::Result<Option<char>> {
        // Item 4 continuation: OLD folds more than one leading
        // whitespace character, so once we're inside that run we keep
        // swallowing whitespace without re-running the break detector.
        if self.fold_run == FoldRun::Consuming {
            if ch == ' ' || ch == '\t' {
                return Ok(None);
            }
            self.fold_run = FoldRun::None;
            self.core_char(ch)?;
            self.prev = Some(ch);
            return Ok(None);
        }

        // Item 1: CRLF collapse.
        if self.prev == Some('\r') && ch == '\n' {
            self.prev = Some(ch);
            return Ok(None);
        }

        // Item 2: line break.
        if ch == '\r' || ch == '\n' {
            if self.in_value && self.buffer.ends_with('=') && self.parameters.is_quoted_printable()
            {
                self.buffer.pop();
                self.raw_line.pop();
                self.folded_qp_continuation = true;
            }
            self.physical_line += 1;
            self.prev = Some(ch);
            return Ok(None);
        }

        // Item 3: post-newline dispatch.
        if matches!(self.prev, Some('\r') | Some('\n')) {
            if ch == ' ' || ch == '\t' {
                if self.stack.current_dialect() == Dialect::Old {
                    self.fold_run = FoldRun::Consuming;
                }
                self.prev = Some(ch);
                return Ok(None);
            }
            if self.folded_qp_continuation {
                self.folded_qp_continuation = false;
                self.core_char(ch)?;
                self.prev = Some(ch);
                return Ok(None);
            }
            // The previous line was the terminator; `ch` belongs to
            // whatever comes after.
            return Ok(Some(ch));
        }

        self.core_char(ch)?;
        self.prev = Some(ch);
        Ok(None)
    }

    /// Items 5-13: everything that happens once we know `ch` is not
    /// part of a fold or a line break.
    fn core_char(&mut self, ch: char) -> io::Result<()> {
        self.raw_line.push(ch);
        let dialect = self.stack.current_dialect();

        // Item 5: in-value accumulation.
        if self.in_value {
            self.buffer.push(ch);
            return Ok(());
        }

        // Item 6: escape-pending.
        if self.pending_escape {
            self.pending_escape = false;
            match dialect {
                Dialect::Old => match ch {
                    '\\' => self.buffer.push('\\'),
                    ';' => self.buffer.push(';'),
                    other => {
                        self.buffer.push('\\');
                        self.buffer.push(other);
                    }
                },
                Dialect::New => match ch {
                    '^' => self.buffer.push('^'),
                    'n' => self.buffer.push_str(&self.newline),
                    '\'' => self.buffer.push('"'),
                    other => {
                        self.buffer.push('^');
                        self.buffer.push(other);
                    }
                },
            }
            return Ok(());
        }

        // Item 7: escape-initiation, only inside a parameter value.
        if self.in_param_region {
            match dialect {
                Dialect::Old if ch == '\\' => {
                    self.pending_escape = true;
                    return Ok(());
                }
                Dialect::New if self.caret_decode && ch == '^' => {
                    self.pending_escape = true;
                    return Ok(());
                }
                _ => {}
            }
        }

        // Item 8: group boundary.
        if ch == '.' && self.group.is_none() && self.name.is_none() {
            self.group = Some(std::mem::take(&mut self.buffer));
            return Ok(());
        }

        // Item 9: delimiter ';' or ':' (not inside NEW quotes).
        if (ch == ';' || ch == ':') && !self.in_quotes {
            if self.name.is_none() {
                self.name = Some(std::mem::take(&mut self.buffer));
            } else {
                let mut value = std::mem::take(&mut self.buffer);
                if dialect == Dialect::Old {
                    value = value.trim_start().to_string();
                }
                match self.current_param_name.take() {
                    Some(pname) => self.parameters.add_value(&pname, value),
                    None => self.parameters.add_nameless_value(value),
                }
            }
            self.in_quotes = false;
            if ch == ':' {
                self.in_value = true;
                self.in_param_region = false;
            } else {
                self.in_param_region = true;
            }
            return Ok(());
        }

        // Item 10: parameter-value comma (NEW only, named, unquoted).
        if ch == ','
            && dialect == Dialect::New
            && !self.in_quotes
            && self.current_param_name.is_some()
        {
            let value = std::mem::take(&mut self.buffer);
            if let Some(pname) = self.current_param_name.clone() {
                self.parameters.add_value(&pname, value);
            }
            return Ok(());
        }

        // Item 11: parameter-name '=' (only when no current name yet).
        if ch == '=' && self.current_param_name.is_none() && self.in_param_region {
            let mut pname = std::mem::take(&mut self.buffer);
            if dialect == Dialect::Old {
                pname = pname.trim_end().to_string();
            }
            self.current_param_name = Some(pname.to_ascii_uppercase());
            return Ok(());
        }

        // Item 12: double quote (NEW only, parameter name active).
        if ch == '"' && dialect == Dialect::New && self.current_param_name.is_some() {
            self.in_quotes = !self.in_quotes;
            return Ok(());
        }

        // Item 13: default.
        self.buffer.push(ch);
        Ok(())
    }

    fn has_pending_content(&self) -> bool {
        !self.buffer.is_empty()
            || self.group.is_some()
            || self.name.is_some()
            || !self.parameters.is_empty()
            || self.current_param_name.is_some()
    }

    fn context(&self, raw_line: String, line: u64) -> ParseContext {
        ParseContext::new(self.stack.path(), raw_line, line)
    }

    fn emit_warning<L: Listener>(&mut self, listener: &mut L, raw_line: String, line: u64, warning: Warning) {
        let mut ctx = self.context(raw_line, line);
        listener.on_warning(&mut ctx, warning);
        if ctx.is_stopped() {
            self.stopped = true;
        }
    }

    /// Finalizes whatever is pending when a logical line ends (or the
    /// source is exhausted): dispatches a completed property, or warns
    /// `MALFORMED_LINE` if the terminating `:` was never reached.
    fn finish_property<L: Listener>(&mut self, listener: &mut L) -> io::Result<()> {
        if self.in_value {
            self.dispatch_completed_property(listener);
        } else if self.has_pending_content() {
            let line = self.property_start_line;
            let raw_line = self.raw_line.clone();
            self.emit_warning(listener, raw_line, line, Warning::MalformedLine { line });
        }
        Ok(())
    }

    fn reset_property_state(&mut self) {
        self.buffer.clear();
        self.raw_line.clear();
        self.group = None;
        self.name = None;
        self.parameters = Parameters::new();
        self.current_param_name = None;
        self.in_value = false;
        self.in_param_region = false;
        self.in_quotes = false;
        self.pending_escape = false;
        self.folded_qp_continuation = false;
        self.fold_run = FoldRun::None;
        self.prev = None;
        self.property_start_line = self.physical_line;
    }

    fn dispatch_completed_property<L: Listener>(&mut self, listener: &mut L) {
        let group = self.group.take();
        let name = self.name.take().unwrap_or_default();
        let parameters = std::mem::take(&mut self.parameters);
        let mut value = std::mem::take(&mut self.buffer);
        let line = self.property_start_line;
        let raw_line = self.raw_line.clone();

        let charset = match parameters.charset() {
            Ok(c) => c.map(str::to_string),
            Err(_) => {
                let bad = parameters.get_first(KW_CHARSET).unwrap_or_default().to_string();
                self.emit_warning(
                    listener,
                    raw_line.clone(),
                    line,
                    Warning::UnknownCharset {
                        property: name.clone(),
                        charset: bad,
                        line,
                    },
                );
                None
            }
        };

        if parameters.is_quoted_printable() {
            let resolved = charset.clone().or_else(|| self.default_charset.clone());
            match self.codec.decode(&value, resolved.as_deref()) {
                Ok(decoded) => value = decoded,
                Err(cause) => {
                    let warning = if cause.to_ascii_lowercase().contains("charset") {
                        Warning::UnknownCharset {
                            property: name.clone(),
                            charset: resolved.unwrap_or_default(),
                            line,
                        }
                    } else {
                        Warning::QuotedPrintableError {
                            property: name.clone(),
                            line,
                            cause,
                        }
                    };
                    self.emit_warning(listener, raw_line.clone(), line, warning);
                }
            }
        }

        let property = Property {
            group,
            name: name.clone(),
            parameters,
            value,
        };
        let upper_name = name.to_ascii_uppercase();

        if upper_name == KW_BEGIN {
            let trimmed = property.value.trim();
            if trimmed.is_empty() {
                self.emit_warning(listener, raw_line, line, Warning::EmptyBegin { line });
            } else {
                let component_name = trimmed.to_string();
                self.stack.push(component_name.clone());
                let mut ctx = self.context(raw_line, line);
                listener.on_component_start(&mut ctx, &component_name);
                if ctx.is_stopped() {
                    self.stopped = true;
                }
            }
            return;
        }

        if upper_name == KW_END {
            let trimmed = property.value.trim().to_string();
            if trimmed.is_empty() {
                self.emit_warning(listener, raw_line, line, Warning::EmptyEnd { line });
            } else {
                match self.stack.find_from_top(&trimmed) {
                    Some(idx) => {
                        while self.stack.depth() > idx {
                            if let Some(closing) = self.stack.pop() {
                                let mut ctx = self.context(raw_line.clone(), line);
                                listener.on_component_end(&mut ctx, &closing);
                                if ctx.is_stopped() {
                                    self.stopped = true;
                                }
                            }
                        }
                    }
                    None => {
                        let name = trimmed.to_ascii_uppercase();
                        self.emit_warning(listener, raw_line, line, Warning::UnmatchedEnd { name, line });
                    }
                }
            }
            return;
        }

        if upper_name == KW_VERSION && self.rules.has_rules_for(self.stack.innermost()) {
            let version_value = property.value.trim().to_string();
            let resolved = self.rules.dialect_for(self.stack.innermost(), &version_value);
            match resolved {
                Some(dialect) => {
                    self.stack.set_current_dialect(dialect);
                    let mut ctx = self.context(raw_line, line);
                    listener.on_version(&mut ctx, dialect, property);
                    if ctx.is_stopped() {
                        self.stopped = true;
                    }
                }
                None => {
                    let component = self
                        .stack
                        .innermost()
                        .unwrap_or_default()
                        .to_ascii_uppercase();
                    self.emit_warning(
                        listener,
                        raw_line.clone(),
                        line,
                        Warning::UnknownVersion {
                            component,
                            value: version_value,
                            line,
                        },
                    );
                    let mut ctx = self.context(raw_line, line);
                    listener.on_property(&mut ctx, property);
                    if ctx.is_stopped() {
                        self.stopped = true;
                    }
                }
            }
            return;
        }

        let mut ctx = self.context(raw_line, line);
        listener.on_property(&mut ctx, property);
        if ctx.is_stopped() {
            self.stopped = true;
        }
    }
}
