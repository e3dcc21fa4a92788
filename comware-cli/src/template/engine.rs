//! Line parser and renderer driven by a [`RuleSet`].

use std::fmt;

use indexmap::IndexMap;
use log::trace;
use serde::Serialize;
use serde_json::Value;

use super::Record;
use super::rule::RuleSet;

/// Key of a parsed record: the values captured by the identifying rule
/// that opened it. Empty for records without an identifying line.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct RecordKey(Vec<String>);

impl RecordKey {
    fn from_fields(fields: &Record) -> Self {
        Self(fields.values().map(value_text).collect())
    }

    pub fn parts(&self) -> &[String] {
        &self.0
    }
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join(" "))
    }
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Merge `fields` into `record`. Lists accumulate, everything else is
/// overwritten.
pub(crate) fn merge(record: &mut Record, fields: Record) {
    for (name, value) in fields {
        if let Value::Array(more) = &value {
            if let Some(Value::Array(existing)) = record.get_mut(&name) {
                existing.extend(more.iter().cloned());
                continue;
            }
        }
        record.insert(name, value);
    }
}

struct Parser {
    shared: Record,
    open: Option<(RecordKey, Record)>,
    records: IndexMap<RecordKey, Record>,
}

impl Parser {
    fn finalize(&mut self) {
        if let Some((key, record)) = self.open.take() {
            match self.records.get_mut(&key) {
                Some(existing) => merge(existing, record),
                None => {
                    self.records.insert(key, record);
                }
            }
        }
    }
}

/// Parse device lines into records, in first-appearance order.
///
/// Each line is matched against the rules in order and the first match
/// wins; unmatched lines are skipped. The result depends only on the
/// input lines.
pub fn parse<'a, I>(rules: &RuleSet, lines: I) -> IndexMap<RecordKey, Record>
where
    I: IntoIterator<Item = &'a str>,
{
    let implicit_records = !rules.has_identifying();
    let mut parser = Parser {
        shared: Record::new(),
        open: None,
        records: IndexMap::new(),
    };

    for line in lines {
        let line = line.trim_end_matches('\r');
        let Some((rule, captures)) = rules.find(line) else {
            continue;
        };
        let fields = rule.extract(&captures);
        trace!("rule {} matched {:?}", rule.name(), line);

        if rule.is_shared() {
            if let Some((_, record)) = parser.open.as_mut() {
                merge(record, fields.clone());
            }
            merge(&mut parser.shared, fields);
        } else if rule.is_identifying() {
            parser.finalize();
            let key = RecordKey::from_fields(&fields);
            let mut record = parser.shared.clone();
            merge(&mut record, fields);
            parser.open = Some((key, record));
        } else if rule.is_closing() {
            if let Some((_, record)) = parser.open.as_mut() {
                merge(record, fields);
            }
            parser.finalize();
        } else {
            if parser.open.is_none() && implicit_records {
                parser.open = Some((RecordKey::default(), parser.shared.clone()));
            }
            match parser.open.as_mut() {
                Some((_, record)) => merge(record, fields),
                None => trace!("dropping fields of {} outside a record", rule.name()),
            }
        }
    }
    parser.finalize();

    if parser.records.is_empty() && !parser.shared.is_empty() {
        parser.records.insert(RecordKey::default(), parser.shared);
    }
    parser.records
}

/// Render a record back into device lines, in rule order.
///
/// A renderer may return several lines joined by `\n`.
pub fn render(rules: &RuleSet, record: &Record) -> Vec<String> {
    rules
        .rules()
        .iter()
        .filter_map(|rule| rule.render(record))
        .flat_map(|text| text.lines().map(str::to_string).collect::<Vec<_>>())
        .collect()
}
