//! Pulling text out of decoded documents and writing translations back
//!
//! Both directions visit the same candidate sites: inline string records
//! inside class and array value lists, chosen by the extraction mode. A site
//! is addressed only through its content key, never through its position.

use std::collections::{HashMap, HashSet};

use super::heuristic::{HeuristicOptions, classify};
use super::key::{LineBreakStyle, normalize_line_breaks, restore_line_breaks, stable_key};
use super::{ExtractionMode, TextCategory, TextEntry, TranslationTable};
use crate::formats::nrbf::{Record, Value};
use crate::formats::udlg::UdlgDocument;

/// Language marker that precedes dialog text in english mode
pub const DEFAULT_MARKER: &str = "English";

/// Extraction settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractOptions {
    pub mode: ExtractionMode,
    /// String that arms the next string value in english mode
    pub marker: String,
    pub heuristic: HeuristicOptions,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            mode: ExtractionMode::default(),
            marker: DEFAULT_MARKER.to_string(),
            heuristic: HeuristicOptions::default(),
        }
    }
}

impl ExtractOptions {
    #[must_use]
    pub fn with_mode(mut self, mode: ExtractionMode) -> Self {
        self.mode = mode;
        self
    }
}

/// Outcome of applying a table to a document
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApplyReport {
    /// Sites whose text was replaced
    pub applied: usize,
    /// Sites whose key matched an entry recorded for different text
    pub stale: usize,
    /// Sites left as they were (no entry, empty or identical translation)
    pub untouched: usize,
}

impl ApplyReport {
    /// Sum two reports
    #[must_use]
    pub fn combine(self, other: Self) -> Self {
        Self {
            applied: self.applied + other.applied,
            stale: self.stale + other.stale,
            untouched: self.untouched + other.untouched,
        }
    }
}

/// Collect translatable text from `doc`.
///
/// Entries come out in document order; text seen twice keeps its first entry.
/// `file` is recorded on every entry when given.
pub fn extract_entries(
    doc: &UdlgDocument,
    options: &ExtractOptions,
    file: Option<&str>,
) -> TranslationTable {
    let sites = SiteContext::new(&doc.records, options);
    let category = options.mode.category();
    let mut table = TranslationTable::new();
    let mut rejected = 0usize;

    sites.for_each(&doc.records, &mut |text, name| {
        let normalized = normalize_line_breaks(text);
        let (accepted, rule) = classify(&normalized, &options.heuristic);
        if !accepted {
            tracing::debug!("Skipping {:?} ({})", normalized, rule);
            rejected += 1;
            return;
        }
        let entry = TextEntry::new(normalized, category)
            .with_file(file.map(ToString::to_string))
            .with_name(name.map(ToString::to_string));
        table.insert(entry);
    });

    tracing::debug!(
        "Extracted {} entries in {} mode ({} candidates rejected)",
        table.len(),
        options.mode,
        rejected
    );
    table
}

/// Substitute translations into `doc`.
///
/// A site changes only when its key is in `table`, the entry has a
/// non-empty translation, and the entry's original equals the site's
/// current normalized text. Line breaks follow the replaced text's style.
pub fn apply_translations(
    doc: &mut UdlgDocument,
    table: &TranslationTable,
    options: &ExtractOptions,
) -> ApplyReport {
    let sites = SiteContext::new(&doc.records, options);
    let category = options.mode.category();
    let mut report = ApplyReport::default();

    sites.for_each_mut(&mut doc.records, &mut |text, _name| {
        match substitution(table, text, category) {
            Substitution::Replace(translated) => {
                *text = translated;
                report.applied += 1;
            }
            Substitution::Stale => report.stale += 1,
            Substitution::Keep => report.untouched += 1,
        }
    });

    tracing::debug!(
        "Applied {} translations ({} stale, {} untouched)",
        report.applied,
        report.stale,
        report.untouched
    );
    report
}

/// What should happen to one piece of text
pub(crate) enum Substitution {
    /// Replace with this text (line breaks already restored)
    Replace(String),
    /// Key matched an entry recorded for different text
    Stale,
    /// Nothing to apply
    Keep,
}

/// Look `text` up in `table` by key and decide whether to replace it
pub(crate) fn substitution(
    table: &TranslationTable,
    text: &str,
    category: TextCategory,
) -> Substitution {
    let normalized = normalize_line_breaks(text);
    let key = stable_key(&normalized, category);

    let Some(entry) = table.get(&key) else {
        return Substitution::Keep;
    };
    if entry.original != normalized {
        tracing::debug!("Stale key {} (table has {:?})", key, entry.original);
        return Substitution::Stale;
    }
    if !entry.is_translated() || entry.translation == entry.original {
        return Substitution::Keep;
    }
    Substitution::Replace(restore_line_breaks(
        &entry.translation,
        LineBreakStyle::detect(text),
    ))
}

/// What the walkers need to know about the whole document up front
struct SiteContext<'a> {
    mode: ExtractionMode,
    marker: &'a str,
    /// Object ids of strings equal to the marker
    marker_ids: HashSet<i32>,
    /// Member names by class object id
    member_names: HashMap<i32, Vec<String>>,
}

impl<'a> SiteContext<'a> {
    fn new(records: &[Record], options: &'a ExtractOptions) -> Self {
        let mut context = Self {
            mode: options.mode,
            marker: &options.marker,
            marker_ids: HashSet::new(),
            member_names: HashMap::new(),
        };
        for record in records {
            context.index(record);
        }
        context
    }

    fn index(&mut self, record: &Record) {
        match record {
            Record::BinaryObjectString { object_id, value } if value == self.marker => {
                self.marker_ids.insert(*object_id);
            }
            _ => {}
        }
        if let Some(info) = record.class_info() {
            self.member_names
                .insert(info.object_id, info.member_names.clone());
        }
        for value in record.values().unwrap_or_default() {
            if let Value::Record(inner) = value {
                self.index(inner);
            }
        }
    }

    fn names_for(&self, record: &Record) -> Option<&[String]> {
        if !record.is_class() {
            return None;
        }
        record
            .layout_id()
            .and_then(|id| self.member_names.get(&id))
            .map(Vec::as_slice)
    }

    /// Indices of candidate strings in one value list, with member names
    fn candidates<'s>(
        &'s self,
        values: &[Value],
        names: Option<&'s [String]>,
    ) -> Vec<(usize, Option<&'s str>)> {
        match self.mode {
            ExtractionMode::English => self
                .marked_strings(values)
                .into_iter()
                .map(|index| (index, None))
                .collect(),
            ExtractionMode::Variables => names
                .map(|names| named_strings(values, names))
                .unwrap_or_default(),
        }
    }

    /// A marker string, or a reference to one, arms the next string value.
    /// Inline primitives disarm; other records leave the state alone.
    fn marked_strings(&self, values: &[Value]) -> Vec<usize> {
        let mut found = Vec::new();
        let mut armed = false;
        let mut pending_ref: Option<i32> = None;

        for (index, value) in values.iter().enumerate() {
            let record = match value {
                Value::Primitive(_) => {
                    armed = false;
                    pending_ref = None;
                    continue;
                }
                Value::Record(record) => record.as_ref(),
            };
            match record {
                Record::MemberReference { id_ref } => pending_ref = Some(*id_ref),
                Record::BinaryObjectString { value, .. } if value == self.marker => armed = true,
                Record::BinaryObjectString { .. } => {
                    let referenced = pending_ref.is_some_and(|id| self.marker_ids.contains(&id));
                    if armed || referenced {
                        found.push(index);
                        pending_ref = None;
                    }
                    armed = false;
                }
                _ => {}
            }
        }
        found
    }

    fn for_each(&self, records: &[Record], visit: &mut dyn FnMut(&str, Option<&str>)) {
        for record in records {
            self.visit(record, visit);
        }
    }

    fn visit(&self, record: &Record, visit: &mut dyn FnMut(&str, Option<&str>)) {
        let Some(values) = record.values() else {
            return;
        };
        for (index, name) in self.candidates(values, self.names_for(record)) {
            if let Some(Record::BinaryObjectString { value, .. }) = values[index].as_record() {
                visit(value, name);
            }
        }
        for value in values {
            if let Value::Record(inner) = value {
                self.visit(inner, visit);
            }
        }
    }

    fn for_each_mut(&self, records: &mut [Record], visit: &mut dyn FnMut(&mut String, Option<&str>)) {
        for record in records {
            self.visit_mut(record, visit);
        }
    }

    fn visit_mut(&self, record: &mut Record, visit: &mut dyn FnMut(&mut String, Option<&str>)) {
        let names = self.names_for(record);
        let Some(values) = record.values_mut() else {
            return;
        };
        for (index, name) in self.candidates(values, names) {
            if let Value::Record(inner) = &mut values[index] {
                if let Record::BinaryObjectString { value, .. } = inner.as_mut() {
                    visit(value, name);
                }
            }
        }
        for value in values.iter_mut() {
            if let Value::Record(inner) = value {
                self.visit_mut(inner, visit);
            }
        }
    }
}

/// Inline strings of a class record paired with their member names.
/// Libraries fill no member slot and null runs fill several.
fn named_strings<'n>(values: &[Value], names: &'n [String]) -> Vec<(usize, Option<&'n str>)> {
    let mut found = Vec::new();
    let mut member = 0;
    for (index, value) in values.iter().enumerate() {
        let slots = value.slot_count();
        if slots == 0 {
            continue;
        }
        if let Some(Record::BinaryObjectString { .. }) = value.as_record() {
            if let Some(name) = names.get(member) {
                found.push((index, Some(name.as_str())));
            }
        }
        member += slots;
    }
    found
}
