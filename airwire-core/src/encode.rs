//! JSON encoding of transformed samples
//!
//! Produces `{"timestamp":<ms>,"co2_eq_ppm_mean":<ppm>}` with
//! `serde-json-core`, into a caller-provided buffer.

use heapless::String;
use serde::Serialize;

use crate::sample::TransformedSample;

/// Buffer size that always fits one encoded sample
pub const MAX_JSON_LEN: usize = 96;

/// Encoding errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EncodeError {
    /// Output buffer too small
    BufferFull,
}

#[derive(Serialize)]
struct JsonSample {
    timestamp: u64,
    co2_eq_ppm_mean: f32,
}

impl From<&TransformedSample> for JsonSample {
    fn from(sample: &TransformedSample) -> Self {
        Self {
            timestamp: sample.timestamp_ms,
            co2_eq_ppm_mean: sample.mean_ppm(),
        }
    }
}

/// Encode into `buf`, returning the number of bytes written
pub fn encode_json(sample: &TransformedSample, buf: &mut [u8]) -> Result<usize, EncodeError> {
    serde_json_core::to_slice(&JsonSample::from(sample), buf).map_err(|_| EncodeError::BufferFull)
}

/// Encode into an owned string
pub fn to_json(sample: &TransformedSample) -> Result<String<MAX_JSON_LEN>, EncodeError> {
    let mut buf = [0u8; MAX_JSON_LEN];
    let len = encode_json(sample, &mut buf)?;
    let text = core::str::from_utf8(&buf[..len]).map_err(|_| EncodeError::BufferFull)?;

    let mut json = String::new();
    json.push_str(text).map_err(|_| EncodeError::BufferFull)?;
    Ok(json)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_integer_mean() {
        let sample = TransformedSample {
            timestamp_ms: 1_700_000,
            co2_eq_ppm_mean_x100: 41_200,
        };
        let json = to_json(&sample).unwrap();
        assert_eq!(json.as_str(), r#"{"timestamp":1700000,"co2_eq_ppm_mean":412.0}"#);
    }

    #[test]
    fn test_encode_fractional_mean() {
        let sample = TransformedSample {
            timestamp_ms: 5,
            co2_eq_ppm_mean_x100: 40_050,
        };
        let json = to_json(&sample).unwrap();
        assert_eq!(json.as_str(), r#"{"timestamp":5,"co2_eq_ppm_mean":400.5}"#);
    }

    #[test]
    fn test_buffer_too_small() {
        let sample = TransformedSample {
            timestamp_ms: 5,
            co2_eq_ppm_mean_x100: 40_050,
        };
        let mut buf = [0u8; 8];
        assert_eq!(encode_json(&sample, &mut buf), Err(EncodeError::BufferFull));
    }
}
