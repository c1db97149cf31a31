use std::borrow::Cow;
use std::collections::HashSet;
use std::fmt;

use indexmap::{IndexMap, IndexSet};
use serde::Serialize;

pub const NAME_KEY: &str = "name";
pub const SOURCE_URL_KEY: &str = "source URL";

/// Value of one info-box row. List items stay separate; flat sinks join them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Text(String),
    List(Vec<String>),
}

impl FieldValue {
    pub fn text(s: impl Into<String>) -> Self {
        FieldValue::Text(s.into())
    }

    pub fn list<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        FieldValue::List(items.into_iter().map(Into::into).collect())
    }

    /// Flat rendering, list items joined with ", ".
    pub fn joined(&self) -> Cow<'_, str> {
        match self {
            FieldValue::Text(s) => Cow::Borrowed(s),
            FieldValue::List(items) => Cow::Owned(items.join(", ")),
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.joined())
    }
}

/// One character: the fixed `name` and `source URL` keys followed by whatever
/// labels the page's info-box had, in page order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CharacterRecord {
    fields: IndexMap<String, FieldValue>,
}

impl CharacterRecord {
    pub fn new(name: impl Into<String>, source_url: impl Into<String>) -> Self {
        let mut fields = IndexMap::new();
        fields.insert(NAME_KEY.to_string(), FieldValue::Text(name.into()));
        fields.insert(SOURCE_URL_KEY.to_string(), FieldValue::Text(source_url.into()));
        Self { fields }
    }

    /// Add an info-box field. A repeated label replaces the earlier value in place;
    /// the fixed keys cannot be overwritten.
    pub fn insert_field(&mut self, label: impl Into<String>, value: FieldValue) {
        let label = label.into();
        if label == NAME_KEY || label == SOURCE_URL_KEY {
            return;
        }
        self.fields.insert(label, value);
    }

    pub fn with_field(mut self, label: impl Into<String>, value: FieldValue) -> Self {
        self.insert_field(label, value);
        self
    }

    pub fn name(&self) -> &str {
        self.fixed(NAME_KEY)
    }

    pub fn source_url(&self) -> &str {
        self.fixed(SOURCE_URL_KEY)
    }

    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.fields.get(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of keys, fixed ones included.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    fn fixed(&self, key: &str) -> &str {
        match self.fields.get(key) {
            Some(FieldValue::Text(s)) => s,
            _ => "",
        }
    }
}

/// Final, de-duplicated output of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordSet {
    records: Vec<CharacterRecord>,
}

impl RecordSet {
    /// Keep the first record per name and drop the one named `excluded`.
    pub fn finalize(records: Vec<CharacterRecord>, excluded: &str) -> Self {
        let mut seen = HashSet::new();
        let records = records
            .into_iter()
            .filter(|r| r.name() != excluded)
            .filter(|r| seen.insert(r.name().to_string()))
            .collect();
        Self { records }
    }

    /// Union of keys across all records, in first-seen order.
    pub fn columns(&self) -> Vec<&str> {
        let mut columns: IndexSet<&str> = IndexSet::new();
        columns.insert(NAME_KEY);
        columns.insert(SOURCE_URL_KEY);
        for record in &self.records {
            columns.extend(record.keys());
        }
        columns.into_iter().collect()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, CharacterRecord> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn into_vec(self) -> Vec<CharacterRecord> {
        self.records
    }
}

impl<'a> IntoIterator for &'a RecordSet {
    type Item = &'a CharacterRecord;
    type IntoIter = std::slice::Iter<'a, CharacterRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(name: &str, url: &str) -> CharacterRecord {
        CharacterRecord::new(name, url)
    }

    #[test]
    fn duplicate_names_keep_first() {
        let set = RecordSet::finalize(
            vec![
                rec("Harry Potter", "https://a.test/1").with_field("Casa", FieldValue::text("Grifinória")),
                rec("Hermione Granger", "https://a.test/2"),
                rec("Harry Potter", "https://a.test/3"),
            ],
            "Joanne Rowling",
        );

        assert_eq!(set.len(), 2);
        let harry = set.iter().next().unwrap();
        assert_eq!(harry.source_url(), "https://a.test/1");
        assert_eq!(harry.get("Casa"), Some(&FieldValue::text("Grifinória")));
    }

    #[test]
    fn excluded_name_is_dropped_wherever_it_appears() {
        for position in 0..3 {
            let mut records = vec![rec("Harry Potter", "h"), rec("Rony Weasley", "r")];
            records.insert(position, rec("Joanne Rowling", "j"));
            let set = RecordSet::finalize(records, "Joanne Rowling");
            assert_eq!(set.len(), 2);
            assert!(set.iter().all(|r| r.name() != "Joanne Rowling"));
        }
    }

    #[test]
    fn names_are_compared_exactly() {
        let set = RecordSet::finalize(
            vec![rec("Harry Potter", "a"), rec("harry potter", "b"), rec("Harry Potter ", "c")],
            "Joanne Rowling",
        );
        assert_eq!(set.len(), 3);
    }

    #[test]
    fn columns_are_the_union_of_keys() {
        let set = RecordSet::finalize(
            vec![
                rec("A", "a").with_field("Nascimento", FieldValue::text("1980")),
                rec("B", "b")
                    .with_field("Casa", FieldValue::text("Lufa-Lufa"))
                    .with_field("Nascimento", FieldValue::text("1979")),
            ],
            "Joanne Rowling",
        );
        assert_eq!(set.columns(), vec!["name", "source URL", "Nascimento", "Casa"]);
        assert!(set.iter().next().unwrap().get("Casa").is_none());
    }

    #[test]
    fn fixed_keys_cannot_be_overwritten() {
        let r = rec("Harry Potter", "https://a.test/h")
            .with_field(NAME_KEY, FieldValue::text("Other"))
            .with_field("Olhos", FieldValue::text("Verdes"))
            .with_field("Olhos", FieldValue::text("Verde-esmeralda"));
        assert_eq!(r.name(), "Harry Potter");
        assert_eq!(r.keys().collect::<Vec<_>>(), vec!["name", "source URL", "Olhos"]);
        assert_eq!(r.get("Olhos"), Some(&FieldValue::text("Verde-esmeralda")));
    }

    #[test]
    fn list_values_join_with_comma() {
        assert_eq!(FieldValue::list(["p", "q"]).joined(), "p, q");
        assert_eq!(FieldValue::text("x").to_string(), "x");
    }
}
