//! Argument specs: declared record schemas, validation and redaction.
//!
//! A spec names every field a record may carry, with its type and
//! constraints. [`validate`] checks a candidate against it, fills in
//! defaults, converts loosely typed values (`"10"` for an int, `"yes"` for
//! a bool) and, when asked, masks fields marked `no_log` so secrets never
//! leave the library in clear text.

use indexmap::IndexMap;
use serde_json::Value;

use super::Record;
use crate::error::ValidationError;

/// Replacement text for redacted values.
pub const NO_LOG_PLACEHOLDER: &str = "VALUE_SPECIFIED_IN_NO_LOG_PARAMETER";

/// Declared type of a field.
#[derive(Debug, Clone)]
pub enum FieldType {
    Str,
    Int,
    Bool,
    /// A list whose elements all have the given type.
    List(Box<FieldType>),
    /// A nested record with its own spec.
    Dict(ArgumentSpec),
}

impl FieldType {
    fn name(&self) -> &'static str {
        match self {
            FieldType::Str => "str",
            FieldType::Int => "int",
            FieldType::Bool => "bool",
            FieldType::List(_) => "list",
            FieldType::Dict(_) => "dict",
        }
    }
}

/// One field of an [`ArgumentSpec`].
#[derive(Debug, Clone)]
pub struct FieldSpec {
    kind: FieldType,
    required: bool,
    default: Option<Value>,
    no_log: bool,
    choices: Vec<Value>,
}

impl FieldSpec {
    pub fn new(kind: FieldType) -> Self {
        Self {
            kind,
            required: false,
            default: None,
            no_log: false,
            choices: Vec::new(),
        }
    }

    pub fn str() -> Self {
        Self::new(FieldType::Str)
    }

    pub fn int() -> Self {
        Self::new(FieldType::Int)
    }

    pub fn bool() -> Self {
        Self::new(FieldType::Bool)
    }

    pub fn list(elements: FieldType) -> Self {
        Self::new(FieldType::List(Box::new(elements)))
    }

    pub fn dict(options: ArgumentSpec) -> Self {
        Self::new(FieldType::Dict(options))
    }

    /// A list of nested records.
    pub fn list_of(options: ArgumentSpec) -> Self {
        Self::list(FieldType::Dict(options))
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    /// Mask this field's value when validating with redaction.
    pub fn no_log(mut self) -> Self {
        self.no_log = true;
        self
    }

    pub fn choices<V: Into<Value> + Clone>(mut self, choices: &[V]) -> Self {
        self.choices = choices.iter().cloned().map(Into::into).collect();
        self
    }

    pub fn kind(&self) -> &FieldType {
        &self.kind
    }

    pub fn is_no_log(&self) -> bool {
        self.no_log
    }
}

/// Ordered field declarations for one record shape.
#[derive(Debug, Clone, Default)]
pub struct ArgumentSpec {
    fields: IndexMap<String, FieldSpec>,
}

impl ArgumentSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(mut self, name: impl Into<String>, spec: FieldSpec) -> Self {
        self.fields.insert(name.into(), spec);
        self
    }

    pub fn get(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.get(name)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &FieldSpec)> {
        self.fields.iter().map(|(name, spec)| (name.as_str(), spec))
    }
}

/// Validate `candidate` against `spec`.
///
/// The result carries every declared field, in declaration order. Absent
/// optional fields without a default are `null`; run [`remove_empties`]
/// afterwards to drop them.
pub fn validate(
    spec: &ArgumentSpec,
    candidate: &Record,
    redact: bool,
) -> Result<Record, ValidationError> {
    validate_at(spec, candidate, redact, "")
}

fn validate_at(
    spec: &ArgumentSpec,
    candidate: &Record,
    redact: bool,
    prefix: &str,
) -> Result<Record, ValidationError> {
    if let Some(unknown) = candidate.keys().find(|k| spec.get(k).is_none()) {
        return Err(ValidationError::Unsupported(join(prefix, unknown)));
    }

    let mut out = Record::new();
    for (name, field) in spec.fields() {
        let path = join(prefix, name);
        let value = match candidate.get(name) {
            Some(Value::Null) | None => match &field.default {
                Some(default) => default.clone(),
                None if field.required => return Err(ValidationError::MissingRequired(path)),
                None => {
                    out.insert(name.to_string(), Value::Null);
                    continue;
                }
            },
            Some(value) => value.clone(),
        };

        let value = coerce(&field.kind, value, redact, &path)?;
        check_choices(field, &value, &path)?;

        let value = if redact && field.no_log {
            Value::from(NO_LOG_PLACEHOLDER)
        } else {
            value
        };
        out.insert(name.to_string(), value);
    }
    Ok(out)
}

fn join(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{prefix}.{name}")
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(n) if n.is_f64() => "float",
        Value::Number(_) => "int",
        Value::String(_) => "str",
        Value::Array(_) => "list",
        Value::Object(_) => "dict",
    }
}

fn coerce(kind: &FieldType, value: Value, redact: bool, path: &str) -> Result<Value, ValidationError> {
    let mismatch = |value: &Value| ValidationError::TypeMismatch {
        field: path.to_string(),
        expected: kind.name(),
        found: type_name(value),
    };

    match kind {
        FieldType::Str => match value {
            Value::String(_) => Ok(value),
            Value::Number(ref n) => Ok(Value::String(n.to_string())),
            Value::Bool(b) => Ok(Value::String(b.to_string())),
            other => Err(mismatch(&other)),
        },
        FieldType::Int => match value {
            Value::Number(n) if n.is_i64() || n.is_u64() => Ok(Value::Number(n)),
            Value::String(ref s) => s
                .trim()
                .parse::<i64>()
                .map(Value::from)
                .map_err(|_| mismatch(&value)),
            other => Err(mismatch(&other)),
        },
        FieldType::Bool => match value {
            Value::Bool(_) => Ok(value),
            Value::String(ref s) => match s.to_ascii_lowercase().as_str() {
                "yes" | "on" | "true" | "1" | "y" => Ok(Value::Bool(true)),
                "no" | "off" | "false" | "0" | "n" => Ok(Value::Bool(false)),
                _ => Err(mismatch(&value)),
            },
            Value::Number(ref n) => match n.as_i64() {
                Some(1) => Ok(Value::Bool(true)),
                Some(0) => Ok(Value::Bool(false)),
                _ => Err(mismatch(&value)),
            },
            other => Err(mismatch(&other)),
        },
        FieldType::List(elements) => {
            let items = match value {
                Value::Array(items) => items,
                Value::String(s) => s
                    .split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(Value::from)
                    .collect(),
                Value::Object(_) => return Err(mismatch(&value)),
                scalar => vec![scalar],
            };
            items
                .into_iter()
                .map(|item| coerce(elements, item, redact, path))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array)
        }
        FieldType::Dict(options) => match value {
            Value::Object(ref map) => validate_at(options, map, redact, path).map(Value::Object),
            other => Err(mismatch(&other)),
        },
    }
}

fn check_choices(field: &FieldSpec, value: &Value, path: &str) -> Result<(), ValidationError> {
    if field.choices.is_empty() {
        return Ok(());
    }
    let allowed = |v: &Value| field.choices.contains(v);
    let ok = match value {
        Value::Array(items) => items.iter().all(allowed),
        other => allowed(other),
    };
    if ok {
        return Ok(());
    }
    let choices = field
        .choices
        .iter()
        .map(|c| c.as_str().map(str::to_string).unwrap_or_else(|| c.to_string()))
        .collect::<Vec<_>>()
        .join(", ");
    Err(ValidationError::InvalidChoice {
        field: path.to_string(),
        choices,
        value: value.to_string(),
    })
}

/// Drop nulls, empty strings, empty lists and empty maps, recursively.
/// `false` and `0` are kept.
pub fn remove_empties(record: &Record) -> Record {
    record
        .iter()
        .filter_map(|(k, v)| prune(v).map(|v| (k.clone(), v)))
        .collect()
}

fn prune(value: &Value) -> Option<Value> {
    match value {
        Value::Null => None,
        Value::String(s) if s.is_empty() => None,
        Value::Array(items) => {
            let items: Vec<Value> = items.iter().filter_map(prune).collect();
            (!items.is_empty()).then_some(Value::Array(items))
        }
        Value::Object(map) => {
            let map = remove_empties(map);
            (!map.is_empty()).then_some(Value::Object(map))
        }
        other => Some(other.clone()),
    }
}
