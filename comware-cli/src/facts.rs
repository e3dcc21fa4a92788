//! Resource facts: which command feeds which template.
//!
//! Parsing and rendering here work offline, on text the caller already
//! has. [`Session::gather_facts`](crate::Session::gather_facts) adds the
//! device round trip.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use serde_json::Value;

use crate::error::{Error, Result};
use crate::template::{
    self, ArgumentSpec, Record, RuleSet, interfaces, local_users, manuinfo, remove_empties,
    validate,
};

/// A gatherable network resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Resource {
    Manuinfo,
    Interfaces,
    LocalUsers,
}

impl Resource {
    pub const ALL: [Resource; 3] = [Resource::Manuinfo, Resource::Interfaces, Resource::LocalUsers];

    pub fn name(&self) -> &'static str {
        match self {
            Resource::Manuinfo => "manuinfo",
            Resource::Interfaces => "interfaces",
            Resource::LocalUsers => "local_users",
        }
    }

    /// The display command whose output the template parses.
    pub fn command(&self) -> &'static str {
        match self {
            Resource::Manuinfo => "display device manuinfo",
            Resource::Interfaces | Resource::LocalUsers => "display current-configuration",
        }
    }

    pub fn rules(&self) -> &'static RuleSet {
        match self {
            Resource::Manuinfo => &manuinfo::RULES,
            Resource::Interfaces => &interfaces::RULES,
            Resource::LocalUsers => &local_users::RULES,
        }
    }

    pub fn argument_spec(&self) -> &'static ArgumentSpec {
        match self {
            Resource::Manuinfo => &manuinfo::ARGUMENT_SPEC,
            Resource::Interfaces => &interfaces::ARGUMENT_SPEC,
            Resource::LocalUsers => &local_users::ARGUMENT_SPEC,
        }
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Resource {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Resource::ALL
            .into_iter()
            .find(|r| r.name() == s)
            .ok_or_else(|| Error::invalid_argument(format!("unknown network resource '{s}'")))
    }
}

/// Parse device output into validated, redacted facts for `resource`.
pub fn parse_resource(resource: Resource, text: &str) -> Result<Vec<Value>> {
    let records = template::parse(resource.rules(), text.lines())
        .into_values()
        .map(Value::Object)
        .collect();
    checked(resource, records, true)
}

/// Render records of `resource` back into device configuration lines.
///
/// Records are validated first, without redaction.
pub fn render_resource(resource: Resource, records: &[Record]) -> Result<Vec<String>> {
    let records = records.iter().cloned().map(Value::Object).collect();
    let mut lines = Vec::new();
    for record in checked(resource, records, false)? {
        if let Value::Object(record) = record {
            lines.extend(template::render(resource.rules(), &record));
        }
    }
    Ok(lines)
}

fn checked(resource: Resource, records: Vec<Value>, redact: bool) -> Result<Vec<Value>> {
    let mut candidate = Record::new();
    candidate.insert("config".into(), Value::Array(records));
    let mut params = remove_empties(&validate(resource.argument_spec(), &candidate, redact)?);
    Ok(match params.remove("config") {
        Some(Value::Array(records)) => records,
        _ => Vec::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::template::argspec::NO_LOG_PLACEHOLDER;
    use serde_json::json;

    #[test]
    fn test_resource_names() {
        for resource in Resource::ALL {
            assert_eq!(resource.name().parse::<Resource>().unwrap(), resource);
        }
        let err = "vlans".parse::<Resource>().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }

    #[test]
    fn test_parse_manuinfo() {
        let facts = parse_resource(Resource::Manuinfo, "DEVICE_NAME : SW-CORE-01\n").unwrap();
        assert_eq!(facts, vec![json!({"device_name": "SW-CORE-01"})]);
    }

    #[test]
    fn test_parse_empty_output() {
        assert!(parse_resource(Resource::Interfaces, "").unwrap().is_empty());
    }

    #[test]
    fn test_parse_local_users_redacts() {
        let text = "local-user admin class manage\n password hash $h$6$secret\n#\n";
        let facts = parse_resource(Resource::LocalUsers, text).unwrap();
        assert_eq!(facts[0]["password"], json!(NO_LOG_PLACEHOLDER));
        assert_eq!(facts[0]["password_format"], json!("hash"));
    }

    #[test]
    fn test_render_resource() {
        let record = json!({"name": "GigabitEthernet1/0/3", "description": "printer", "enabled": "no"});
        let Value::Object(record) = record else { unreachable!() };
        let lines = render_resource(Resource::Interfaces, &[record]).unwrap();
        assert_eq!(
            lines,
            vec!["interface GigabitEthernet1/0/3", " description printer", " shutdown", "#"]
        );
    }

    #[test]
    fn test_render_resource_rejects_unknown_fields() {
        let Value::Object(record) = json!({"name": "Gi1/0/1", "speed": 1000}) else { unreachable!() };
        let err = render_resource(Resource::Interfaces, &[record]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValidationError);
    }
}
