//! Field validation against a [`ColumnRule`].
//!
//! Checks run in a fixed order (nullable, pattern, uniqueness) and the first
//! violation wins. Uniqueness state lives in a [`UniquenessTracker`] owned by
//! the session, so values from different sessions never conflict. A row's
//! unique values are only staged in [`PendingValues`] while it is checked; the
//! session commits them once the row has been accepted.

use std::collections::{HashMap, HashSet};

use crate::{
    column::ColumnRule,
    error::{Position, ValidationError},
    normalize::is_blank,
};

/// Values already seen per unique column during one session.
#[derive(Debug, Default)]
pub struct UniquenessTracker {
    seen: HashMap<String, HashSet<String>>,
}

impl UniquenessTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `value` for `column`; returns false when it was already present.
    pub fn insert(&mut self, column: &str, value: &str) -> bool {
        let values = match self.seen.get_mut(column) {
            Some(values) => values,
            None => self.seen.entry(column.to_string()).or_default(),
        };
        values.insert(value.to_string())
    }

    pub fn contains(&self, column: &str, value: &str) -> bool {
        self.seen
            .get(column)
            .is_some_and(|values| values.contains(value))
    }

    pub fn seen(&self, column: &str) -> usize {
        self.seen.get(column).map_or(0, HashSet::len)
    }

    pub fn clear(&mut self) {
        self.seen.clear();
    }
}

/// Unique-column values of one row, held back until the whole row is accepted.
#[derive(Debug, Default)]
pub struct PendingValues {
    entries: Vec<(String, String)>,
}

impl PendingValues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Moves every staged value into `tracker`.
    pub fn commit(self, tracker: &mut UniquenessTracker) {
        for (column, value) in self.entries {
            tracker.insert(&column, &value);
        }
    }
}

/// Checks `value` against `rule` without touching `tracker`; a non-blank value
/// of a unique column is staged in `pending` instead.
pub fn validate(
    value: &str,
    rule: &ColumnRule,
    tracker: &UniquenessTracker,
    pending: &mut PendingValues,
    position: &Position,
) -> Result<(), ValidationError> {
    let blank = is_blank(value);
    if !rule.nullable() && blank {
        return Err(ValidationError::NotNullable {
            column: rule.name().to_string(),
            position: position.clone(),
        });
    }
    let pattern = rule.pattern();
    if !pattern.is_any() && !pattern.is_match(value) {
        return Err(ValidationError::PatternMismatch {
            column: rule.name().to_string(),
            value: value.to_string(),
            pattern: pattern.to_string(),
            position: position.clone(),
        });
    }
    if rule.unique() && !blank {
        if tracker.contains(rule.name(), value) {
            return Err(ValidationError::DuplicateValue {
                column: rule.name().to_string(),
                value: value.to_string(),
                position: position.clone(),
            });
        }
        pending
            .entries
            .push((rule.name().to_string(), value.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column::ColumnAttrs;

    fn position(line: usize) -> Position {
        Position::new("words.csv", line)
    }

    fn rule(attrs: ColumnAttrs) -> ColumnRule {
        attrs.compile("hanzi", "Word").expect("rule")
    }

    /// Validates one value and commits it, as a single-column row would be.
    fn check(
        value: &str,
        rule: &ColumnRule,
        tracker: &mut UniquenessTracker,
        position: &Position,
    ) -> Result<(), ValidationError> {
        let mut pending = PendingValues::new();
        validate(value, rule, tracker, &mut pending, position)?;
        pending.commit(tracker);
        Ok(())
    }

    #[test]
    fn blank_value_fails_non_nullable_column() {
        let rule = rule(ColumnAttrs::new().nullable(false));
        let mut tracker = UniquenessTracker::new();
        let err = check("\u{3000}", &rule, &mut tracker, &position(2)).expect_err("blank");
        assert_eq!(
            err,
            ValidationError::NotNullable {
                column: "hanzi".to_string(),
                position: position(2),
            }
        );
        assert_eq!(err.to_string(), "words.csv#2: column[hanzi] should not be blank");
    }

    #[test]
    fn nullable_check_runs_before_pattern_check() {
        let rule = rule(ColumnAttrs::new().nullable(false).matches("[a-z]+"));
        let mut tracker = UniquenessTracker::new();
        let err = check("", &rule, &mut tracker, &position(2)).expect_err("blank");
        assert!(matches!(err, ValidationError::NotNullable { .. }));
    }

    #[test]
    fn pattern_mismatch_reports_value_and_pattern() {
        let rule = rule(ColumnAttrs::new().matches("[a-z0-4\\-]+"));
        let mut tracker = UniquenessTracker::new();
        assert!(check("ni3-hao3", &rule, &mut tracker, &position(2)).is_ok());
        let err = check("你好", &rule, &mut tracker, &position(3)).expect_err("mismatch");
        assert_eq!(
            err.to_string(),
            "words.csv#3: column[hanzi]'s value[你好] should match regex [[a-z0-4\\-]+]"
        );
    }

    #[test]
    fn pattern_applies_to_blank_nullable_values() {
        let rule = rule(ColumnAttrs::new().matches("[a-z]+"));
        let mut tracker = UniquenessTracker::new();
        let err = check("", &rule, &mut tracker, &position(2)).expect_err("empty");
        assert!(matches!(err, ValidationError::PatternMismatch { .. }));
    }

    #[test]
    fn duplicate_value_fails_on_second_occurrence() {
        let rule = rule(ColumnAttrs::new().unique(true));
        let mut tracker = UniquenessTracker::new();
        check("你好", &rule, &mut tracker, &position(2)).expect("first");
        check("再见", &rule, &mut tracker, &position(3)).expect("other");
        let err = check("你好", &rule, &mut tracker, &position(4)).expect_err("dup");
        assert_eq!(err.to_string(), "words.csv#4: duplicate [你好] for column[hanzi]");
        assert_eq!(tracker.seen("hanzi"), 2);
    }

    #[test]
    fn blank_values_never_conflict() {
        let rule = rule(ColumnAttrs::new().unique(true));
        let mut tracker = UniquenessTracker::new();
        check("", &rule, &mut tracker, &position(2)).expect("first blank");
        check("  ", &rule, &mut tracker, &position(3)).expect("second blank");
        assert_eq!(tracker.seen("hanzi"), 0);
    }

    #[test]
    fn separate_trackers_do_not_share_values() {
        let rule = rule(ColumnAttrs::new().unique(true));
        let mut first = UniquenessTracker::new();
        let mut second = UniquenessTracker::new();
        check("你好", &rule, &mut first, &position(2)).expect("first session");
        check("你好", &rule, &mut second, &position(2)).expect("second session");
        assert!(first.contains("hanzi", "你好"));
        assert!(second.contains("hanzi", "你好"));
    }

    #[test]
    fn validation_stages_unique_values_without_recording_them() {
        let rule = rule(ColumnAttrs::new().unique(true));
        let mut tracker = UniquenessTracker::new();
        let mut pending = PendingValues::new();
        validate("你好", &rule, &tracker, &mut pending, &position(2)).expect("staged");
        assert!(!tracker.contains("hanzi", "你好"));
        assert!(!pending.is_empty());

        validate("你好", &rule, &tracker, &mut PendingValues::new(), &position(3))
            .expect("nothing committed yet");
        pending.commit(&mut tracker);
        assert!(tracker.contains("hanzi", "你好"));
    }
}
