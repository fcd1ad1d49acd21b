use domain::{DeviceFamily, FieldValue, Point};

#[test]
fn family_round_trips_registry_labels() {
    for family in [
        DeviceFamily::ShellyEm,
        DeviceFamily::NousAt,
        DeviceFamily::ZigbeeSensor,
        DeviceFamily::AutoDetected,
    ] {
        assert_eq!(DeviceFamily::parse(family.as_str()), Some(family));
    }
    assert_eq!(DeviceFamily::parse("toaster"), None);
}

#[test]
fn shelly_templates_cover_meter_channel() {
    let topics = DeviceFamily::ShellyEm.topic_templates("em-7");
    assert_eq!(topics.len(), 4);
    assert!(topics.contains(&"shellies/em-7/emeter/0/power".to_string()));
    assert!(DeviceFamily::AutoDetected.topic_templates("x").is_empty());
}

#[test]
fn point_carries_base_tags() {
    let point = Point::new("em-7", "shelly", "power_meter", 10)
        .with_field("Power", FieldValue::F64(1.5));
    assert_eq!(point.measurement, "devices");
    assert_eq!(point.device(), Some("em-7"));
    assert_eq!(point.tags.get("type").map(String::as_str), Some("power_meter"));
    assert_eq!(point.fields.get("Power"), Some(&FieldValue::F64(1.5)));
}
