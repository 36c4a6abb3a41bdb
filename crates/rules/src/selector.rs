use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// The set of label field names to redact. An empty selector means every
/// field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldSelector(BTreeSet<String>);

impl FieldSelector {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn new<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(fields.into_iter().map(Into::into).collect())
    }

    /// Parses a comma separated list. Blank entries are ignored, so `""`
    /// selects every field.
    pub fn parse(list: &str) -> Self {
        list.split(',')
            .map(str::trim)
            .filter(|field| !field.is_empty())
            .collect()
    }

    pub fn is_all(&self) -> bool {
        self.0.is_empty()
    }

    pub fn is_selected(&self, field: &str) -> bool {
        self.is_all() || self.0.contains(field)
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl<S: Into<String>> FromIterator<S> for FieldSelector {
    fn from_iter<T: IntoIterator<Item = S>>(iter: T) -> Self {
        Self::new(iter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_selects_everything() {
        let selector = FieldSelector::all();
        assert!(selector.is_all());
        assert!(selector.is_selected("Name"));
        assert!(selector.is_selected(""));
    }

    #[test]
    fn test_explicit_fields() {
        let selector = FieldSelector::new(["Name", "Date"]);
        assert!(selector.is_selected("Name"));
        assert!(!selector.is_selected("Total"));
        assert!(!selector.is_selected("name"));
    }

    #[test]
    fn test_parse() {
        let selector = FieldSelector::parse(" Name, Date ,,");
        assert_eq!(selector.fields().collect::<Vec<_>>(), vec!["Date", "Name"]);
        assert!(FieldSelector::parse("").is_all());
        assert!(FieldSelector::parse(" , ").is_all());
    }

    #[test]
    fn test_serde_as_list() {
        let selector: FieldSelector = serde_json::from_str(r#"["Total"]"#).unwrap();
        assert!(selector.is_selected("Total"));
        assert_eq!(serde_json::to_string(&selector).unwrap(), r#"["Total"]"#);
    }
}
