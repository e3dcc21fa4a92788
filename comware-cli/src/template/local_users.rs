//! Local user sections of `display current-configuration`.
//!
//! Passwords are declared `no_log`: gathered facts carry the placeholder,
//! never the hash.

use once_cell::sync::Lazy;
use regex::Captures;
use serde_json::Value;

use super::Record;
use super::argspec::{ArgumentSpec, FieldSpec, FieldType};
use super::rule::{PatternRule, RuleSet};

pub static RULES: Lazy<RuleSet> = Lazy::new(|| {
    RuleSet::new(vec![
        PatternRule::new(
            "user",
            r"^local-user (?P<name>\S+)(?: class (?P<class>manage|network))?$",
        )
        .unwrap()
        .identifying()
        .with_extractor(user)
        .with_renderer(render_user),
        PatternRule::new(
            "password",
            r"^ password (?P<password_format>hash|cipher|simple) (?P<password>\S+)$",
        )
        .unwrap()
        .with_renderer(|r| {
            Some(format!(
                " password {} {}",
                r.get("password_format")?.as_str()?,
                r.get("password")?.as_str()?
            ))
        }),
        PatternRule::new("service_types", r"^ service-type (?P<service_types>.+?)\s*$")
            .unwrap()
            .with_extractor(|c| words(c, "service_types"))
            .with_renderer(|r| Some(format!(" service-type {}", joined(r, "service_types")?))),
        PatternRule::new(
            "user_roles",
            r"^ authorization-attribute user-role (?P<user_roles>\S+)$",
        )
        .unwrap()
        .with_extractor(|c| words(c, "user_roles"))
        .with_renderer(render_roles),
        PatternRule::new("end", r"^#$")
            .unwrap()
            .closes_record()
            .with_renderer(|_| Some("#".to_string())),
    ])
    .unwrap()
});

pub static ARGUMENT_SPEC: Lazy<ArgumentSpec> = Lazy::new(|| {
    ArgumentSpec::new().field(
        "config",
        FieldSpec::list_of(
            ArgumentSpec::new()
                .field("name", FieldSpec::str().required())
                .field(
                    "class",
                    FieldSpec::str()
                        .choices(&["manage", "network"])
                        .default_value("manage"),
                )
                .field(
                    "password_format",
                    FieldSpec::str().choices(&["hash", "cipher", "simple"]),
                )
                .field("password", FieldSpec::str().no_log())
                .field("service_types", FieldSpec::list(FieldType::Str))
                .field("user_roles", FieldSpec::list(FieldType::Str)),
        ),
    )
});

fn user(caps: &Captures<'_>) -> Record {
    let mut fields = Record::new();
    fields.insert("name".into(), caps["name"].into());
    // Comware omits the class for pre-7 style users; those are manage users.
    let class = caps.name("class").map_or("manage", |m| m.as_str());
    fields.insert("class".into(), class.into());
    fields
}

fn render_user(record: &Record) -> Option<String> {
    let name = record.get("name")?.as_str()?;
    Some(match record.get("class").and_then(Value::as_str) {
        Some(class) => format!("local-user {name} class {class}"),
        None => format!("local-user {name}"),
    })
}

fn words(caps: &Captures<'_>, name: &str) -> Record {
    let mut fields = Record::new();
    if let Some(m) = caps.name(name) {
        let list: Vec<Value> = m.as_str().split_whitespace().map(Value::from).collect();
        fields.insert(name.to_string(), list.into());
    }
    fields
}

fn strings<'r>(record: &'r Record, name: &str) -> Option<Vec<&'r str>> {
    let items: Vec<&str> = record.get(name)?.as_array()?.iter().filter_map(Value::as_str).collect();
    (!items.is_empty()).then_some(items)
}

fn joined(record: &Record, name: &str) -> Option<String> {
    strings(record, name).map(|items| items.join(" "))
}

fn render_roles(record: &Record) -> Option<String> {
    let lines: Vec<String> = strings(record, "user_roles")?
        .into_iter()
        .map(|role| format!(" authorization-attribute user-role {role}"))
        .collect();
    Some(lines.join("\n"))
}
