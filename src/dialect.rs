// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! The OLD/NEW dialect split, the syntax-rule table that maps a
//! component name and a `VERSION` value to a dialect, and the component
//! stack that tracks nesting and per-level dialect during a parse.

use std::collections::HashMap;

/// Which generation of the vobject grammar is currently in effect.
///
/// `Old` covers vCard 2.1 and iCalendar 1.0: semicolon-repeated
/// parameters, no quoting, backslash escaping limited to `\\`, `\;`, and
/// bare newline escapes. `New` covers vCard 3.0+ and iCalendar 2.0:
/// quoted parameter values, comma-joined multi-valued parameters, and
/// (optionally) caret-encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
pub enum Dialect {
    /// vCard 2.1 / iCalendar 1.0.
    #[strum(serialize = "OLD")]
    Old,
    /// vCard 3.0+ / iCalendar 2.0.
    #[strum(serialize = "NEW")]
    New,
}

/// Maps `(component name, VERSION value)` to a [`Dialect`], used when the
/// reader observes a `VERSION` property to decide whether (and how) to
/// switch dialect for the component it appears in. A `None` component key
/// represents the top level, outside any `BEGIN`.
#[derive(Debug, Clone, Default)]
pub struct SyntaxRules {
    rules: HashMap<Option<String>, HashMap<String, Dialect>>,
}

impl SyntaxRules {
    /// An empty rule table: no component recognizes `VERSION` as a
    /// dialect switch, so every `VERSION` property is treated as an
    /// ordinary property.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// The conventional vCard/iCalendar rule table: `VCARD` switches on
    /// `2.1` (OLD) or `3.0`/`4.0` (NEW); `VCALENDAR` switches on `1.0`
    /// (OLD) or `2.0` (NEW).
    #[must_use]
    pub fn standard() -> Self {
        let mut rules = Self::empty();
        rules.add_rule(Some("VCARD"), "2.1", Dialect::Old);
        rules.add_rule(Some("VCARD"), "3.0", Dialect::New);
        rules.add_rule(Some("VCARD"), "4.0", Dialect::New);
        rules.add_rule(Some("VCALENDAR"), "1.0", Dialect::Old);
        rules.add_rule(Some("VCALENDAR"), "2.0", Dialect::New);
        rules
    }

    /// Registers a `(component, version) -> dialect` mapping. `component`
    /// is matched case-insensitively and should already be trimmed;
    /// `None` registers a top-level (outside any component) mapping.
    pub fn add_rule(&mut self, component: Option<&str>, version: &str, dialect: Dialect) {
        let key = component.map(|c| c.to_ascii_uppercase());
        self.rules
            .entry(key)
            .or_default()
            .insert(version.to_string(), dialect);
    }

    /// Whether `component` has any registered versions at all. Used to
    /// distinguish "unknown VERSION value for a ruled component" from
    /// "VERSION inside a component with no rules, treat as an ordinary
    /// property."
    #[must_use]
    pub fn has_rules_for(&self, component: Option<&str>) -> bool {
        let key = component.map(str::to_ascii_uppercase);
        self.rules.contains_key(&key)
    }

    /// Looks up the dialect for `(component, version)`, if any.
    #[must_use]
    pub fn dialect_for(&self, component: Option<&str>, version: &str) -> Option<Dialect> {
        let key = component.map(str::to_ascii_uppercase);
        self.rules.get(&key)?.get(version).copied()
    }
}

/// Tracks open component names and the dialect in effect at each nesting
/// level. There is always one more dialect slot than there are open
/// components: the bottom slot is the document-level default dialect,
/// used before any `BEGIN` (or after every component has closed).
#[derive(Debug, Clone)]
pub struct ComponentStack {
    frames: Vec<(String, Dialect)>,
    default_dialect: Dialect,
}

impl ComponentStack {
    /// Creates an empty stack with `default_dialect` in effect at the
    /// top level.
    #[must_use]
    pub fn new(default_dialect: Dialect) -> Self {
        Self {
            frames: Vec::new(),
            default_dialect,
        }
    }

    /// Number of currently open components.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// The names of all currently open components, outermost first.
    #[must_use]
    pub fn path(&self) -> Vec<String> {
        self.frames.iter().map(|(name, _)| name.clone()).collect()
    }

    /// The name of the innermost open component, if any.
    #[must_use]
    pub fn innermost(&self) -> Option<&str> {
        self.frames.last().map(|(name, _)| name.as_str())
    }

    /// The dialect in effect right now: the innermost open component's
    /// dialect, or the document default if nothing is open.
    #[must_use]
    pub fn current_dialect(&self) -> Dialect {
        self.frames
            .last()
            .map_or(self.default_dialect, |(_, dialect)| *dialect)
    }

    /// Pushes a new component, inheriting the current dialect.
    pub fn push(&mut self, name: String) {
        let dialect = self.current_dialect();
        self.frames.push((name, dialect));
    }

    /// Updates the dialect of the innermost open component (or the
    /// document default, if nothing is open).
    pub fn set_current_dialect(&mut self, dialect: Dialect) {
        if let Some(frame) = self.frames.last_mut() {
            frame.1 = dialect;
        } else {
            self.default_dialect = dialect;
        }
    }

    /// Finds the nearest open frame (searching from the top) whose name
    /// equals `upper_name` (already upper-cased), returning its index.
    #[must_use]
    pub fn find_from_top(&self, upper_name: &str) -> Option<usize> {
        self.frames
            .iter()
            .rposition(|(name, _)| name.eq_ignore_ascii_case(upper_name))
    }

    /// Pops and returns the name of the innermost open component.
    pub fn pop(&mut self) -> Option<String> {
        self.frames.pop().map(|(name, _)| name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_rules_switch_vcard_dialect() {
        let rules = SyntaxRules::standard();
        assert_eq!(
            rules.dialect_for(Some("VCARD"), "2.1"),
            Some(Dialect::Old)
        );
        assert_eq!(
            rules.dialect_for(Some("vcard"), "3.0"),
            Some(Dialect::New)
        );
        assert_eq!(rules.dialect_for(Some("VCARD"), "9.9"), None);
        assert!(rules.has_rules_for(Some("VCARD")));
        assert!(!rules.has_rules_for(Some("VALARM")));
    }

    #[test]
    fn stack_inherits_dialect_on_push() {
        let mut stack = ComponentStack::new(Dialect::New);
        stack.push("VCALENDAR".to_string());
        stack.set_current_dialect(Dialect::Old);
        stack.push("VEVENT".to_string());
        assert_eq!(stack.current_dialect(), Dialect::Old);
        assert_eq!(stack.path(), vec!["VCALENDAR", "VEVENT"]);
    }

    #[test]
    fn find_from_top_searches_most_recent_first() {
        let mut stack = ComponentStack::new(Dialect::New);
        stack.push("A".to_string());
        stack.push("B".to_string());
        stack.push("A".to_string());
        assert_eq!(stack.find_from_top("A"), Some(2));
    }
}
