//! `display device manuinfo` template.
//!
//! ```text
//! Slot 1 CPU 0:
//! DEVICE_NAME          : S5130-28S-HPWR-EI
//! DEVICE_SERIAL_NUMBER : 219801A11VC17B000089
//! MAC_ADDRESS          : 70BA-EF6A-6D8F
//! MANUFACTURING_DATE   : 2017-11-24
//! VENDOR_NAME          : H3C
//! Fan 1:
//!  The operation is not supported on the specified fan.
//! ```

use once_cell::sync::Lazy;
use regex::Captures;
use serde_json::Value;

use super::Record;
use super::argspec::{ArgumentSpec, FieldSpec};
use super::rule::{PatternRule, RuleSet};

/// Rules for manufacturing information.
pub static RULES: Lazy<RuleSet> = Lazy::new(|| {
    RuleSet::new(vec![
        PatternRule::new(
            "component",
            r"^(?P<component>Slot|Chassis|Fan|Power|Subslot)\s+(?P<index>\w+)(?:\s+CPU\s+(?P<cpu>\d+))?\s*:\s*$",
        )
        .unwrap()
        .identifying()
        .with_extractor(component)
        .with_renderer(render_component),
        PatternRule::new(
            "device_name",
            r"^DEVICE_NAME[ ]*:\s(?P<device_name>\S.*?)\s*$",
        )
        .unwrap()
        .shared()
        .with_renderer(|r| field_line(r, "DEVICE_NAME", "device_name")),
        PatternRule::new(
            "serial_number",
            r"^DEVICE_SERIAL_NUMBER[ ]*:\s(?P<serial_number>\S+)\s*$",
        )
        .unwrap()
        .with_renderer(|r| field_line(r, "DEVICE_SERIAL_NUMBER", "serial_number")),
        PatternRule::new("mac_address", r"^MAC_ADDRESS[ ]*:\s(?P<mac_address>\S+)\s*$")
            .unwrap()
            .with_renderer(|r| field_line(r, "MAC_ADDRESS", "mac_address")),
        PatternRule::new(
            "manufacturing_date",
            r"^MANUFACTURING_DATE[ ]*:\s(?P<manufacturing_date>\S+)\s*$",
        )
        .unwrap()
        .with_renderer(|r| field_line(r, "MANUFACTURING_DATE", "manufacturing_date")),
        PatternRule::new("vendor_name", r"^VENDOR_NAME[ ]*:\s(?P<vendor_name>\S.*?)\s*$")
            .unwrap()
            .with_renderer(|r| field_line(r, "VENDOR_NAME", "vendor_name")),
    ])
    .unwrap()
});

/// Schema of gathered manufacturing records.
pub static ARGUMENT_SPEC: Lazy<ArgumentSpec> = Lazy::new(|| {
    ArgumentSpec::new().field(
        "config",
        FieldSpec::list_of(
            ArgumentSpec::new()
                .field("component", FieldSpec::str().choices(&["Slot", "Chassis", "Fan", "Power", "Subslot"]))
                .field("index", FieldSpec::str())
                .field("cpu", FieldSpec::int())
                .field("device_name", FieldSpec::str())
                .field("serial_number", FieldSpec::str())
                .field("mac_address", FieldSpec::str())
                .field("manufacturing_date", FieldSpec::str())
                .field("vendor_name", FieldSpec::str()),
        ),
    )
});

fn component(caps: &Captures<'_>) -> Record {
    let mut fields = Record::new();
    fields.insert("component".into(), caps["component"].into());
    fields.insert("index".into(), caps["index"].into());
    if let Some(cpu) = caps.name("cpu").and_then(|m| m.as_str().parse::<i64>().ok()) {
        fields.insert("cpu".into(), cpu.into());
    }
    fields
}

fn render_component(record: &Record) -> Option<String> {
    let component = record.get("component")?.as_str()?;
    let index = match record.get("index")? {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    Some(match record.get("cpu").and_then(Value::as_i64) {
        Some(cpu) => format!("{component} {index} CPU {cpu}:"),
        None => format!("{component} {index}:"),
    })
}

fn field_line(record: &Record, label: &str, field: &str) -> Option<String> {
    let value = record.get(field)?.as_str()?;
    Some(format!("{label:<20} : {value}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::{parse, render};
    use serde_json::json;

    const OUTPUT: &str = "\
Slot 1 CPU 0:\r
DEVICE_NAME          : S5130-28S-HPWR-EI\r
DEVICE_SERIAL_NUMBER : 219801A11VC17B000089\r
MAC_ADDRESS          : 70BA-EF6A-6D8F\r
MANUFACTURING_DATE   : 2017-11-24\r
VENDOR_NAME          : H3C\r
Fan 1:\r
 The operation is not supported on the specified fan.\r
";

    #[test]
    fn test_device_name_only() {
        let records = parse(&RULES, ["DEVICE_NAME : SW-CORE-01"]);
        assert_eq!(records.len(), 1);
        assert_eq!(Value::Object(records[0].clone()), json!({"device_name": "SW-CORE-01"}));
    }

    #[test]
    fn test_slot_and_fan() {
        let records = parse(&RULES, OUTPUT.lines());
        assert_eq!(records.len(), 2);
        assert_eq!(
            Value::Object(records[0].clone()),
            json!({
                "component": "Slot",
                "index": "1",
                "cpu": 0,
                "device_name": "S5130-28S-HPWR-EI",
                "serial_number": "219801A11VC17B000089",
                "mac_address": "70BA-EF6A-6D8F",
                "manufacturing_date": "2017-11-24",
                "vendor_name": "H3C",
            })
        );
        // The fan inherits the device name seen under the slot.
        assert_eq!(records[1].get("component"), Some(&json!("Fan")));
        assert_eq!(records[1].get("device_name"), Some(&json!("S5130-28S-HPWR-EI")));
    }

    #[test]
    fn test_render_round_trip() {
        let records = parse(&RULES, OUTPUT.lines());
        let slot = &records[0];
        let lines = render(&RULES, slot);
        assert_eq!(lines[0], "Slot 1 CPU 0:");
        assert_eq!(lines[1], "DEVICE_NAME          : S5130-28S-HPWR-EI");

        let reparsed = parse(&RULES, lines.iter().map(String::as_str));
        assert_eq!(&reparsed[0], slot);
    }
}
