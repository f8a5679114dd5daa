//! The full configuration document: parsing, rendering, section lookup.

use std::fmt::Write as _;

use tracing::warn;

use super::entry::Entry;
use super::error::ParseError;
use super::section::Section;
use super::value::Value;

/// An ordered list of top-level sections, parsed from or serialized to one
/// configuration file. Section names are not required to be unique.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document {
    pub sections: Vec<Section>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse full configuration text into a document.
    ///
    /// Structural keywords (`Section`, `SubSection`, the closers, `Option`)
    /// match case-insensitively. Directives outside any open section are
    /// skipped with a warning, as are closers with nothing to close; real
    /// files accumulate such stray lines and rejecting them outright helps
    /// nobody. An opener left unclosed at end-of-input is a hard error.
    pub fn parse(text: &str) -> Result<Self, ParseError> {
        let mut doc = Self::new();
        let mut stack: Vec<Section> = Vec::new();

        for (idx, raw) in text.lines().enumerate() {
            let line_no = idx + 1;
            let Some(entry) = Entry::parse(raw, line_no)? else {
                continue;
            };

            match entry.key.to_ascii_lowercase().as_str() {
                "section" | "subsection" => {
                    let name = entry
                        .values
                        .first()
                        .map(Value::to_plain_string)
                        .unwrap_or_default();
                    stack.push(Section::new(name));
                }
                "endsection" | "endsubsection" => match stack.pop() {
                    Some(done) => match stack.last_mut() {
                        Some(parent) => parent.children.push(done),
                        None => doc.sections.push(done),
                    },
                    None => {
                        warn!(line = line_no, "closing directive with no open section, skipping");
                    }
                },
                "option" if !stack.is_empty() && !entry.values.is_empty() => {
                    let mut values = entry.values.into_iter();
                    if let (Some(section), Some(key)) = (stack.last_mut(), values.next()) {
                        let key = key.to_plain_string();
                        match values.next() {
                            Some(value) => section.options.set(key, value.to_plain_string()),
                            None => section.options.set_flag(key),
                        }
                    }
                }
                _ => match stack.last_mut() {
                    Some(section) => section.entries.push(entry),
                    None => {
                        warn!(
                            line = line_no,
                            key = %entry.key,
                            "directive outside any section, skipping"
                        );
                    }
                },
            }
        }

        if let Some(open) = stack.last() {
            return Err(ParseError::UnterminatedSection {
                name: open.name.clone(),
            });
        }
        Ok(doc)
    }

    /// Render the document back to configuration text.
    ///
    /// Output is deterministic: entries in order, options in insertion
    /// order, children indented one tab per nesting depth, top-level
    /// sections separated by a blank line.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for section in &self.sections {
            let _ = writeln!(out, "Section \"{}\"", section.name);
            Self::render_body(&mut out, section, 1);
            out.push_str("EndSection\n\n");
        }
        out
    }

    fn render_body(out: &mut String, section: &Section, depth: usize) {
        let tabs = "\t".repeat(depth);
        for entry in &section.entries {
            let _ = writeln!(out, "{tabs}{entry}");
        }
        for (key, value) in section.options.iter() {
            match value {
                Some(value) => {
                    let _ = writeln!(out, "{tabs}Option\t\"{key}\" \"{value}\"");
                }
                None => {
                    let _ = writeln!(out, "{tabs}Option\t\"{key}\"");
                }
            }
        }
        for child in &section.children {
            let _ = writeln!(out, "{tabs}SubSection \"{}\"", child.name);
            Self::render_body(out, child, depth + 1);
            let _ = writeln!(out, "{tabs}EndSubSection");
        }
    }

    /// All top-level sections whose name matches any of `names`, in
    /// document order. Pure query, never mutates.
    pub fn find_sections(&self, names: &[&str]) -> Vec<&Section> {
        self.sections
            .iter()
            .filter(|s| names.contains(&s.name.as_str()))
            .collect()
    }

    /// First top-level section with the given name.
    pub fn find_section(&self, name: &str) -> Option<&Section> {
        self.sections.iter().find(|s| s.name == name)
    }

    /// First top-level section with the given name, appending an empty one
    /// when absent.
    pub fn get_or_create(&mut self, name: &str) -> &mut Section {
        if let Some(i) = self.sections.iter().position(|s| s.name == name) {
            return &mut self.sections[i];
        }
        self.sections.push(Section::new(name));
        self.sections.last_mut().expect("just pushed")
    }

    /// Section lookup with auto-creation: for every requested name that has
    /// zero matches, an empty section is created and appended. Returns
    /// indices into [`Document::sections`], existing matches first in
    /// document order, then the created ones in request order.
    ///
    /// The mutation is the point: the builder workflow expects its
    /// canonical sections to exist after this call, which is why this lives
    /// apart from the pure [`Document::find_sections`].
    pub fn get_or_create_sections(&mut self, names: &[&str]) -> Vec<usize> {
        let mut found: Vec<usize> = (0..self.sections.len())
            .filter(|&i| names.contains(&self.sections[i].name.as_str()))
            .collect();

        for name in names {
            if !self.sections.iter().any(|s| s.name == *name) {
                self.sections.push(Section::new(*name));
                found.push(self.sections.len() - 1);
            }
        }
        found
    }

    /// Remove every top-level section whose name matches any of `names`.
    pub fn remove_sections(&mut self, names: &[&str]) {
        self.sections.retain(|s| !names.contains(&s.name.as_str()));
    }

    /// Mutable iteration over top-level sections with the given name.
    pub fn sections_named_mut(&mut self, name: &str) -> impl Iterator<Item = &mut Section> {
        self.sections.iter_mut().filter(move |s| s.name == name)
    }
}
