use std::collections::BTreeMap;

use anyhow::Result;
use byte_unit::{Byte, ByteUnit};

/// Render a byte count with decimal units and three significant digits,
/// e.g. `5.59MB`, `120kB` or `0B`.
pub fn human_size(size: u64) -> String {
    let adjusted = Byte::from_bytes(size as u128).get_appropriate_unit(false);

    let unit = match adjusted.get_unit() {
        ByteUnit::KB => "kB".to_string(),
        unit => unit.to_string(),
    };

    format!("{}{}", significant_digits(adjusted.get_value(), 3), unit)
}

// Behaves like printf's %.*g for the magnitudes human_size produces.
fn significant_digits(value: f64, digits: i32) -> String {
    if value == 0.0 {
        return "0".to_string();
    }

    let integer_digits = value.abs().log10().floor() as i32 + 1;
    let decimals = (digits - integer_digits).max(0) as usize;

    let s = format!("{:.*}", decimals, value);
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.').to_string()
    } else {
        s
    }
}

/// Merge an image status with the runtime's free-form info map.
///
/// The image lands under `status`. Each info value is embedded as JSON when
/// it parses as JSON, and as a plain string otherwise.
pub fn status_with_info(status: &crate::proto::Image, info: &BTreeMap<String, String>) -> Result<serde_json::Value> {
    let mut merged = serde_json::Map::new();
    merged.insert("status".to_string(), serde_json::to_value(status)?);

    for (key, raw) in info {
        let value = serde_json::from_str(raw).unwrap_or_else(|_| serde_json::Value::String(raw.to_string()));
        merged.insert(key.to_string(), value);
    }

    Ok(serde_json::Value::Object(merged))
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_human_size() {
        let tests = vec![
            (0, "0B"),
            (999, "999B"),
            (120_000, "120kB"),
            (1_234_567, "1.23MB"),
            (5_592_405, "5.59MB"),
            (72_800_000, "72.8MB"),
            (1_500_000_000, "1.5GB"),
        ];

        for (size, want) in tests {
            assert_eq!(human_size(size), want, "size {}", size);
        }
    }

    #[test]
    fn test_status_with_info() {
        let image = crate::proto::Image {
            id: "sha256:abc".to_string(),
            repo_tags: vec!["busybox:latest".to_string()],
            ..Default::default()
        };

        let mut info = BTreeMap::new();
        info.insert("info".to_string(), r#"{"chainID":"sha256:def"}"#.to_string());
        info.insert("note".to_string(), "not json".to_string());

        let merged = status_with_info(&image, &info).unwrap();

        assert_eq!(merged["status"]["id"], "sha256:abc");
        assert_eq!(merged["status"]["repoTags"][0], "busybox:latest");
        assert_eq!(merged["info"]["chainID"], "sha256:def");
        assert_eq!(merged["note"], "not json");
    }

    #[test]
    fn test_status_without_info() {
        let image = crate::proto::Image::default();

        let merged = status_with_info(&image, &BTreeMap::new()).unwrap();

        assert_eq!(merged.as_object().unwrap().len(), 1);
        assert!(merged.get("status").is_some());
    }
}
