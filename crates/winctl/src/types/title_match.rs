/*! Text matching for window-title and app-name searches. */

/// How a [`TitleMatch`] compares its pattern against a title.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchCondition {
  Is,
  Contains,
  StartsWith,
  EndsWith,
  IsNot,
  NotContains,
  NotStartsWith,
  NotEndsWith,
}

/// A title (or app name) filter.
///
/// ```
/// use winctl::{MatchCondition, TitleMatch};
///
/// let m = TitleMatch::new(MatchCondition::Contains, "notepad").ignore_case();
/// assert!(m.matches("Untitled - Notepad"));
/// assert!(!m.matches("Calculator"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TitleMatch {
  condition: MatchCondition,
  pattern: String,
  ignore_case: bool,
  apps: Vec<String>,
}

impl TitleMatch {
  pub fn new(condition: MatchCondition, pattern: impl Into<String>) -> Self {
    Self {
      condition,
      pattern: pattern.into(),
      ignore_case: false,
      apps: Vec::new(),
    }
  }

  /// Exact match shorthand.
  pub fn is(pattern: impl Into<String>) -> Self {
    Self::new(MatchCondition::Is, pattern)
  }

  pub fn contains(pattern: impl Into<String>) -> Self {
    Self::new(MatchCondition::Contains, pattern)
  }

  #[must_use]
  pub const fn ignore_case(mut self) -> Self {
    self.ignore_case = true;
    self
  }

  /// Only consider windows owned by apps with one of these names.
  /// Ignored by app-name searches.
  #[must_use]
  pub fn in_apps<I, S>(mut self, apps: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    self.apps = apps.into_iter().map(Into::into).collect();
    self
  }

  pub(crate) fn app_filter(&self) -> &[String] {
    &self.apps
  }

  /// Test a title against this filter. An empty pattern never matches.
  pub fn matches(&self, title: &str) -> bool {
    if self.pattern.is_empty() {
      return false;
    }
    let (title, pattern) = if self.ignore_case {
      (title.to_lowercase(), self.pattern.to_lowercase())
    } else {
      (title.to_owned(), self.pattern.clone())
    };
    let title = title.as_str();
    let pattern = pattern.as_str();
    match self.condition {
      MatchCondition::Is => title == pattern,
      MatchCondition::Contains => title.contains(pattern),
      MatchCondition::StartsWith => title.starts_with(pattern),
      MatchCondition::EndsWith => title.ends_with(pattern),
      MatchCondition::IsNot => title != pattern,
      MatchCondition::NotContains => !title.contains(pattern),
      MatchCondition::NotStartsWith => !title.starts_with(pattern),
      MatchCondition::NotEndsWith => !title.ends_with(pattern),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn exact_is_case_sensitive_by_default() {
    let m = TitleMatch::is("Notepad");
    assert!(m.matches("Notepad"));
    assert!(!m.matches("notepad"));
    assert!(m.clone().ignore_case().matches("NOTEPAD"));
  }

  #[test]
  fn prefix_and_suffix() {
    assert!(TitleMatch::new(MatchCondition::StartsWith, "Untitled").matches("Untitled - Notepad"));
    assert!(TitleMatch::new(MatchCondition::EndsWith, "Notepad").matches("Untitled - Notepad"));
    assert!(!TitleMatch::new(MatchCondition::NotEndsWith, "Notepad").matches("Untitled - Notepad"));
  }

  #[test]
  fn negations_invert() {
    let title = "Inbox - Mail";
    for (pos, neg) in [
      (MatchCondition::Is, MatchCondition::IsNot),
      (MatchCondition::Contains, MatchCondition::NotContains),
      (MatchCondition::StartsWith, MatchCondition::NotStartsWith),
      (MatchCondition::EndsWith, MatchCondition::NotEndsWith),
    ] {
      assert_ne!(
        TitleMatch::new(pos, "Mail").matches(title),
        TitleMatch::new(neg, "Mail").matches(title),
        "{pos:?} vs {neg:?}"
      );
    }
  }

  #[test]
  fn empty_pattern_matches_nothing() {
    assert!(!TitleMatch::new(MatchCondition::NotContains, "").matches("anything"));
  }

  #[test]
  fn app_filter_is_recorded() {
    let m = TitleMatch::contains("x").in_apps(["code", "firefox"]);
    assert_eq!(m.app_filter(), ["code".to_string(), "firefox".to_string()]);
  }
}
