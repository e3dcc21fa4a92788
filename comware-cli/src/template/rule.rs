//! Declarative pattern rules.
//!
//! A rule pairs a named-capture regex with how its captures become record
//! fields, and optionally how a record turns back into the device line.

use std::fmt;

use regex::{Captures, Regex};

use super::Record;
use crate::error::TemplateError;

/// Turns the captures of a matching line into record fields.
pub type Extractor = fn(&Captures<'_>) -> Record;

/// Renders a record back into one device line, or `None` if the record
/// carries nothing for this rule.
pub type Renderer = fn(&Record) -> Option<String>;

/// A single line rule.
#[derive(Clone)]
pub struct PatternRule {
    name: String,
    matcher: Regex,
    extractor: Option<Extractor>,
    renderer: Option<Renderer>,
    shared: bool,
    identifying: bool,
    closes_record: bool,
}

impl PatternRule {
    /// Create a rule. Without an extractor every participating named group
    /// is captured as a string field.
    pub fn new(name: impl Into<String>, pattern: &str) -> Result<Self, TemplateError> {
        let name = name.into();
        let matcher = Regex::new(pattern).map_err(|source| TemplateError::InvalidPattern {
            name: name.clone(),
            source,
        })?;
        Ok(Self {
            name,
            matcher,
            extractor: None,
            renderer: None,
            shared: false,
            identifying: false,
            closes_record: false,
        })
    }

    /// Fields from this rule carry into every following record.
    pub fn shared(mut self) -> Self {
        self.shared = true;
        self
    }

    /// A match starts a new record keyed by this rule's captures.
    pub fn identifying(mut self) -> Self {
        self.identifying = true;
        self
    }

    /// A match ends the open record.
    pub fn closes_record(mut self) -> Self {
        self.closes_record = true;
        self
    }

    pub fn with_extractor(mut self, extractor: Extractor) -> Self {
        self.extractor = Some(extractor);
        self
    }

    pub fn with_renderer(mut self, renderer: Renderer) -> Self {
        self.renderer = Some(renderer);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_shared(&self) -> bool {
        self.shared
    }

    pub fn is_identifying(&self) -> bool {
        self.identifying
    }

    pub fn is_closing(&self) -> bool {
        self.closes_record
    }

    /// Named capture groups of the pattern.
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.matcher.capture_names().flatten()
    }

    pub fn captures<'h>(&self, line: &'h str) -> Option<Captures<'h>> {
        self.matcher.captures(line)
    }

    /// Fields for a matching line.
    pub fn extract(&self, captures: &Captures<'_>) -> Record {
        if let Some(extractor) = self.extractor {
            return extractor(captures);
        }
        self.fields()
            .filter_map(|field| {
                captures
                    .name(field)
                    .map(|m| (field.to_string(), m.as_str().into()))
            })
            .collect()
    }

    /// The device line for `record`, if this rule renders and applies.
    pub fn render(&self, record: &Record) -> Option<String> {
        self.renderer.and_then(|render| render(record))
    }
}

impl fmt::Debug for PatternRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PatternRule")
            .field("name", &self.name)
            .field("pattern", &self.matcher.as_str())
            .field("shared", &self.shared)
            .field("identifying", &self.identifying)
            .field("closes_record", &self.closes_record)
            .finish()
    }
}

/// Ordered rules; the first match for a line wins.
#[derive(Debug, Clone)]
pub struct RuleSet {
    rules: Vec<PatternRule>,
}

impl RuleSet {
    pub fn new(rules: Vec<PatternRule>) -> Result<Self, TemplateError> {
        for (i, rule) in rules.iter().enumerate() {
            if rules[..i].iter().any(|r| r.name == rule.name) {
                return Err(TemplateError::DuplicateRule(rule.name.clone()));
            }
        }
        Ok(Self { rules })
    }

    /// The first rule matching `line`, with its captures.
    pub fn find<'h>(&self, line: &'h str) -> Option<(&PatternRule, Captures<'h>)> {
        self.rules
            .iter()
            .find_map(|rule| rule.captures(line).map(|caps| (rule, caps)))
    }

    pub fn rules(&self) -> &[PatternRule] {
        &self.rules
    }

    pub fn get(&self, name: &str) -> Option<&PatternRule> {
        self.rules.iter().find(|r| r.name == name)
    }

    pub(crate) fn has_identifying(&self) -> bool {
        self.rules.iter().any(|r| r.identifying)
    }
}
