//! Named configuration sections: entries, flag options, nested children.

use super::entry::Entry;
use super::value::Value;

/// An insertion-order-preserving map of `Option` directives.
///
/// The grammar allows two shapes: `Option "<key>" <value>` and the bare
/// flag form `Option "<key>"`. A flag is stored with a `None` value and
/// reads back as `"true"` through [`Options::get`], so callers never see
/// the difference unless they ask for it. Insertion order is kept so
/// serialization is deterministic.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Options {
    items: Vec<(String, Option<String>)>,
}

impl Options {
    /// Set an option value, replacing any existing value for the key in
    /// place, or appending a new one.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.upsert(key.into(), Some(value.into()));
    }

    /// Set a valueless flag option, e.g. `Option "omit xfree86-dga"`.
    pub fn set_flag(&mut self, key: impl Into<String>) {
        self.upsert(key.into(), None);
    }

    fn upsert(&mut self, key: String, value: Option<String>) {
        match self.items.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.items.push((key, value)),
        }
    }

    /// Look up an option value. Valueless flags read as `"true"`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.items
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_deref().unwrap_or("true"))
    }

    pub fn contains(&self, key: &str) -> bool {
        self.items.iter().any(|(k, _)| k == key)
    }

    /// Iterate in insertion order. Flags yield `None` values.
    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&str>)> {
        self.items.iter().map(|(k, v)| (k.as_str(), v.as_deref()))
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl<'a> Extend<(&'a str, &'a str)> for Options {
    fn extend<T: IntoIterator<Item = (&'a str, &'a str)>>(&mut self, iter: T) {
        for (key, value) in iter {
            self.set(key, value);
        }
    }
}

/// One `Section`/`SubSection … End…` block: a name, the ordered plain
/// entries, the option map, and the nested child sections.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Section {
    pub name: String,
    pub entries: Vec<Entry>,
    pub options: Options,
    pub children: Vec<Section>,
}

impl Section {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// First entry with the given key. Key comparison is case-sensitive;
    /// real-world files are consistent enough that this has never mattered.
    pub fn entry(&self, key: &str) -> Option<&Entry> {
        self.entries.iter().find(|e| e.key == key)
    }

    fn entry_mut(&mut self, key: &str) -> Option<&mut Entry> {
        self.entries.iter_mut().find(|e| e.key == key)
    }

    /// The value at `index` of the first entry with the given key.
    pub fn value(&self, key: &str, index: usize) -> Option<&Value> {
        self.entry(key).and_then(|e| e.values.get(index))
    }

    /// The first value of the entry as plain text, for string-like values.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.value(key, 0).and_then(Value::as_str)
    }

    /// The first value of the entry as an integer.
    pub fn get_int(&self, key: &str) -> Option<i64> {
        self.value(key, 0).and_then(Value::as_int)
    }

    /// Idempotent upsert: replace the values of an existing entry in place,
    /// or append a new entry when the key is absent.
    pub fn set(&mut self, key: &str, values: Vec<Value>) {
        match self.entry_mut(key) {
            Some(entry) => entry.values = values,
            None => self.entries.push(Entry::new(key, values)),
        }
    }

    /// Upsert a single quoted-string value.
    pub fn set_str(&mut self, key: &str, value: &str) {
        self.set(key, vec![Value::quoted(value)]);
    }

    /// Upsert a single bare-token value.
    pub fn set_token(&mut self, key: &str, value: &str) {
        self.set(key, vec![Value::token(value)]);
    }

    /// Upsert a single integer value.
    pub fn set_int(&mut self, key: &str, value: i64) {
        self.set(key, vec![Value::Integer(value)]);
    }

    /// Append an entry, allowing repeated keys (e.g. `Load`, `FontPath`).
    pub fn add(&mut self, key: &str, values: Vec<Value>) {
        self.entries.push(Entry::new(key, values));
    }

    /// Append an entry holding a single quoted-string value.
    pub fn add_str(&mut self, key: &str, value: &str) {
        self.add(key, vec![Value::quoted(value)]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_is_idempotent_and_position_preserving() {
        let mut sec = Section::new("Screen");
        sec.set_str("Identifier", "Screen0");
        sec.set_str("Device", "VideoCard0");
        sec.set_int("DefaultDepth", 16);

        // Re-setting an existing key must not duplicate or move the entry
        sec.set_int("DefaultDepth", 24);
        sec.set_str("Identifier", "Screen1");

        assert_eq!(sec.entries.len(), 3);
        assert_eq!(sec.entries[0].key, "Identifier");
        assert_eq!(sec.get_str("Identifier"), Some("Screen1"));
        assert_eq!(sec.entries[2].key, "DefaultDepth");
        assert_eq!(sec.get_int("DefaultDepth"), Some(24));
    }

    #[test]
    fn test_add_allows_repeated_keys() {
        let mut sec = Section::new("Module");
        sec.add_str("Load", "dbe");
        sec.add_str("Load", "glx");
        assert_eq!(sec.entries.len(), 2);
        // entry() returns the first match
        assert_eq!(sec.get_str("Load"), Some("dbe"));
    }

    #[test]
    fn test_entry_lookup_is_case_sensitive() {
        let mut sec = Section::new("Device");
        sec.set_str("Driver", "intel");
        assert!(sec.entry("driver").is_none());
        assert!(sec.entry("Driver").is_some());
    }

    #[test]
    fn test_options_preserve_insertion_order() {
        let mut opts = Options::default();
        opts.set("AllowMouseOpenFail", "true");
        opts.set("BlankTime", "0");
        opts.set("StandbyTime", "0");
        opts.set("AllowMouseOpenFail", "false");

        let keys: Vec<&str> = opts.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, ["AllowMouseOpenFail", "BlankTime", "StandbyTime"]);
        assert_eq!(opts.get("AllowMouseOpenFail"), Some("false"));
    }

    #[test]
    fn test_flag_option_reads_as_true() {
        let mut opts = Options::default();
        opts.set_flag("omit xfree86-dga");
        assert_eq!(opts.get("omit xfree86-dga"), Some("true"));
        assert_eq!(opts.iter().next(), Some(("omit xfree86-dga", None)));
    }
}
