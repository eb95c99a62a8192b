//! Integration tests for the common library.

use t100_telemetry_common::{
    Format, LinkStatus, LogFormat, LoggingConfig, TelemetrySample, decode, encode, parse_config,
};

#[test]
fn test_sample_roundtrip_both_formats() {
    let sample = TelemetrySample {
        timestamp: 1703500000000,
        device: "stbd_aft".to_string(),
        address: 0x2D,
        rpm: 312.0,
        temperature_c: Some(18.4),
        voltage_v: 12.1,
        current_a: -0.7,
        status: LinkStatus::Connected,
    };

    for format in [Format::Json, Format::Cbor] {
        let encoded = encode(&sample, format).unwrap();
        let decoded: TelemetrySample = decode(&encoded, format).unwrap();
        assert_eq!(sample, decoded);
    }
}

#[test]
fn test_disconnected_sample_json_shape() {
    let sample = TelemetrySample::new("port_aft", 0x2B);

    let encoded = encode(&sample, Format::Json).unwrap();
    let json: serde_json::Value = serde_json::from_slice(&encoded).unwrap();

    assert_eq!(json["status"], "disconnected");
    assert_eq!(json["address"], 0x2B);
    assert_eq!(json["temperature_c"], serde_json::Value::Null);
}

#[test]
fn test_logging_config_from_json5() {
    let config: LoggingConfig = parse_config(
        r#"
        {
            // JSON5 comments are allowed in config files
            level: "warn",
        }
        "#,
    )
    .unwrap();

    assert_eq!(config.level, "warn");
    assert_eq!(config.format, LogFormat::Text);
}
