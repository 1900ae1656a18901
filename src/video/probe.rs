//! Bit-depth detection with ffprobe.

use std::ffi::OsStr;
use std::path::Path;

use serde_json::Value;

use super::{VideoToolchain, runner};

/// Bit depth assumed whenever probing fails.
pub const DEFAULT_BIT_DEPTH: u32 = 8;

/// Largest bit depth accepted from a probe.
const MAX_BIT_DEPTH: u32 = 32;

/// Bit depth of the first video stream of `path`.
///
/// Never fails: a missing probe tool, a timeout, a non-zero exit or
/// unparsable output all fall back to [`DEFAULT_BIT_DEPTH`] with a warning.
#[must_use]
pub fn probe_bit_depth(toolchain: &VideoToolchain, path: &Path) -> u32 {
    let args: [&OsStr; 9] = [
        OsStr::new("-v"),
        OsStr::new("error"),
        OsStr::new("-select_streams"),
        OsStr::new("v:0"),
        OsStr::new("-show_entries"),
        OsStr::new("stream=bits_per_raw_sample,bits_per_sample"),
        OsStr::new("-of"),
        OsStr::new("json"),
        path.as_os_str(),
    ];

    let output = match runner::run_tool("ffprobe", &toolchain.ffprobe, args, toolchain.probe_timeout) {
        Ok(output) => output,
        Err(e) => {
            tracing::warn!(path = %path.display(), "bit depth probe failed, assuming 8-bit: {}", e);
            return DEFAULT_BIT_DEPTH;
        }
    };

    match parse_bit_depth(&output.stdout) {
        Some(depth) => depth,
        None => {
            tracing::warn!(
                path = %path.display(),
                "no bit depth in probe output, assuming 8-bit"
            );
            DEFAULT_BIT_DEPTH
        }
    }
}

/// Extract the first stream's bit depth from ffprobe JSON.
///
/// `bits_per_raw_sample` wins over `bits_per_sample`. Values may be strings
/// or numbers; zero, absent or out-of-range values are ignored.
#[must_use]
pub fn parse_bit_depth(json: &str) -> Option<u32> {
    let root: Value = serde_json::from_str(json).ok()?;
    let stream = root.get("streams")?.as_array()?.first()?;

    ["bits_per_raw_sample", "bits_per_sample"]
        .iter()
        .filter_map(|field| stream.get(*field).and_then(as_depth))
        .next()
}

fn as_depth(value: &Value) -> Option<u32> {
    let depth = match value {
        Value::String(s) => s.trim().parse::<u32>().ok()?,
        Value::Number(n) => u32::try_from(n.as_u64()?).ok()?,
        _ => return None,
    };
    (1..=MAX_BIT_DEPTH).contains(&depth).then_some(depth)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_sample_string() {
        let json = r#"{"programs": [], "streams": [{"bits_per_raw_sample": "10"}]}"#;
        assert_eq!(parse_bit_depth(json), Some(10));
    }

    #[test]
    fn test_falls_through_zero() {
        let json = r#"{"streams": [{"bits_per_raw_sample": "0", "bits_per_sample": 12}]}"#;
        assert_eq!(parse_bit_depth(json), Some(12));
    }

    #[test]
    fn test_no_usable_field() {
        assert_eq!(parse_bit_depth(r#"{"streams": [{}]}"#), None);
        assert_eq!(parse_bit_depth(r#"{"streams": []}"#), None);
        assert_eq!(parse_bit_depth(r#"{"streams": [{"bits_per_raw_sample": "N/A"}]}"#), None);
        assert_eq!(parse_bit_depth("not json"), None);
    }

    #[test]
    fn test_missing_probe_falls_back() {
        let toolchain = VideoToolchain {
            ffprobe: "/nonexistent/ffprobe".into(),
            ..VideoToolchain::default()
        };
        assert_eq!(
            probe_bit_depth(&toolchain, Path::new("clip.mp4")),
            DEFAULT_BIT_DEPTH
        );
    }
}
