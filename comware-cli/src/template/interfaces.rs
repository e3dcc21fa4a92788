//! Interface sections of `display current-configuration`.

use once_cell::sync::Lazy;
use regex::Captures;
use serde_json::Value;

use super::Record;
use super::argspec::{ArgumentSpec, FieldSpec};
use super::rule::{PatternRule, RuleSet};

pub static RULES: Lazy<RuleSet> = Lazy::new(|| {
    RuleSet::new(vec![
        PatternRule::new("interface", r"^interface (?P<name>\S+)$")
            .unwrap()
            .identifying()
            .with_renderer(|r| Some(format!("interface {}", r.get("name")?.as_str()?))),
        PatternRule::new("link_mode", r"^ port link-mode (?P<link_mode>bridge|route)$")
            .unwrap()
            .with_renderer(|r| Some(format!(" port link-mode {}", r.get("link_mode")?.as_str()?))),
        PatternRule::new("description", r"^ description (?P<description>.+?)\s*$")
            .unwrap()
            .with_renderer(|r| Some(format!(" description {}", r.get("description")?.as_str()?))),
        PatternRule::new("link_type", r"^ port link-type (?P<link_type>access|trunk|hybrid)$")
            .unwrap()
            .with_renderer(|r| Some(format!(" port link-type {}", r.get("link_type")?.as_str()?))),
        PatternRule::new("access_vlan", r"^ port access vlan (?P<access_vlan>\d+)$")
            .unwrap()
            .with_extractor(|c| int_field(c, "access_vlan"))
            .with_renderer(|r| Some(format!(" port access vlan {}", r.get("access_vlan")?.as_i64()?))),
        PatternRule::new("pvid", r"^ port (?:trunk|hybrid) pvid vlan (?P<pvid>\d+)$")
            .unwrap()
            .with_extractor(|c| int_field(c, "pvid"))
            .with_renderer(render_pvid),
        PatternRule::new("ipv4", r"^ ip address (?P<ipv4_address>\S+) (?P<ipv4_mask>\S+)$")
            .unwrap()
            .with_renderer(|r| {
                Some(format!(
                    " ip address {} {}",
                    r.get("ipv4_address")?.as_str()?,
                    r.get("ipv4_mask")?.as_str()?
                ))
            }),
        PatternRule::new("shutdown", r"^ (?P<undo>undo )?shutdown$")
            .unwrap()
            .with_extractor(shutdown)
            .with_renderer(|r| match r.get("enabled")?.as_bool()? {
                true => Some(" undo shutdown".to_string()),
                false => Some(" shutdown".to_string()),
            }),
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
                .field("description", FieldSpec::str())
                .field("link_mode", FieldSpec::str().choices(&["bridge", "route"]))
                .field("link_type", FieldSpec::str().choices(&["access", "trunk", "hybrid"]))
                .field("access_vlan", FieldSpec::int())
                .field("pvid", FieldSpec::int())
                .field("ipv4_address", FieldSpec::str())
                .field("ipv4_mask", FieldSpec::str())
                .field("enabled", FieldSpec::bool()),
        ),
    )
});

fn int_field(caps: &Captures<'_>, name: &str) -> Record {
    let mut fields = Record::new();
    if let Some(n) = caps.name(name).and_then(|m| m.as_str().parse::<i64>().ok()) {
        fields.insert(name.to_string(), n.into());
    }
    fields
}

fn shutdown(caps: &Captures<'_>) -> Record {
    let mut fields = Record::new();
    fields.insert("enabled".into(), Value::Bool(caps.name("undo").is_some()));
    fields
}

fn render_pvid(record: &Record) -> Option<String> {
    let pvid = record.get("pvid")?.as_i64()?;
    let mode = match record.get("link_type").and_then(Value::as_str) {
        Some("hybrid") => "hybrid",
        _ => "trunk",
    };
    Some(format!(" port {mode} pvid vlan {pvid}"))
}
