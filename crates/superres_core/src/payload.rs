//! Base64 transport of `.npy` arrays.

use base64::{engine::general_purpose, Engine as _};
use ndarray::ArrayD;
use tracing::{debug, error, warn};

use crate::error::PayloadError;
use crate::{npy, tensor};

/// Decode a base64 `.npy` payload into an `f32` array.
///
/// A payload that fails to decode or parse is retried once after
/// [`sanitize`]; the retry's error is returned if that fails too.
pub fn decode(input: &str) -> Result<ArrayD<f32>, PayloadError> {
    match decode_once(input.trim()) {
        Ok(array) => Ok(array),
        Err(first) => {
            warn!(error = %first, "failed to decode payload, retrying with non-base64 characters removed");
            let cleaned = sanitize(input);
            decode_once(&cleaned).inspect_err(|second| {
                warn!(error = %second, "sanitized payload failed to decode");
            })
        }
    }
}

/// Keep only characters of the standard base64 alphabet and its `=` padding.
pub fn sanitize(input: &str) -> String {
    input
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '/' | '='))
        .collect()
}

fn decode_once(input: &str) -> Result<ArrayD<f32>, PayloadError> {
    let bytes = general_purpose::STANDARD.decode(input)?;
    debug!(bytes = bytes.len(), "decoded base64 payload");
    Ok(npy::read_npy(&bytes)?)
}

/// Serialize an array to `.npy` and base64-encode it.
pub fn encode(array: &ArrayD<f32>) -> Result<String, PayloadError> {
    Ok(encode_bytes(&npy::write_npy(array)?))
}

/// Base64-encode raw `.npy` bytes without line breaks.
pub fn encode_bytes(bytes: &[u8]) -> String {
    general_purpose::STANDARD.encode(bytes)
}

/// The encoded `(1, 1, 128, 128)` zero array written on failure.
pub fn placeholder() -> String {
    encode(&tensor::placeholder()).unwrap_or_else(|err| {
        error!(error = %err, "failed to encode placeholder");
        String::new()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array2, IxDyn};

    fn sample() -> ArrayD<f32> {
        Array2::from_shape_fn((4, 6), |(y, x)| (y as f32 - x as f32) / 7.0).into_dyn()
    }

    #[test]
    fn reencoding_preserves_bytes() {
        let encoded = encode(&sample()).unwrap();
        let decoded = decode(&encoded).unwrap();
        assert_eq!(encode(&decoded).unwrap(), encoded);
    }

    #[test]
    fn surrounding_whitespace_is_ignored() {
        let encoded = format!("  {}\n", encode(&sample()).unwrap());
        assert_eq!(decode(&encoded).unwrap(), sample());
    }

    #[test]
    fn non_ascii_noise_is_recovered_by_retry() {
        let encoded = encode(&sample()).unwrap();
        let (head, tail) = encoded.split_at(20);
        let noisy = format!("\u{feff}{head}é\u{200b}{tail}");
        assert_eq!(decode(&noisy).unwrap(), sample());
    }

    #[test]
    fn wrapped_lines_are_recovered_by_retry() {
        let encoded = encode(&sample()).unwrap();
        let wrapped: String = encoded
            .as_bytes()
            .chunks(76)
            .map(|line| format!("{}\n", std::str::from_utf8(line).unwrap()))
            .collect();
        assert_eq!(decode(&wrapped).unwrap(), sample());
    }

    #[test]
    fn ascii_punctuation_is_recovered_by_retry() {
        let encoded = encode(&sample()).unwrap();
        let (head, tail) = encoded.split_at(12);
        let noisy = format!("*{head}-_\t{tail}*");
        assert_eq!(sanitize(&noisy), encoded);
        assert_eq!(decode(&noisy).unwrap(), sample());
    }

    #[test]
    fn oversized_shape_raises_instead_of_panicking() {
        let dict = "{'descr': '<f4', 'fortran_order': False, 'shape': (4294967296, 4294967296), }";
        let mut bytes = b"\x93NUMPY\x01\x00".to_vec();
        bytes.extend_from_slice(&(dict.len() as u16 + 1).to_le_bytes());
        bytes.extend_from_slice(dict.as_bytes());
        bytes.push(b'\n');
        bytes.extend_from_slice(&[0; 16]);

        let result = decode(&encode_bytes(&bytes));
        assert!(matches!(result, Err(PayloadError::Npy(_))), "got {result:?}");
    }

    #[test]
    fn garbage_raises_after_retry() {
        assert!(matches!(
            decode("this is not base64!!"),
            Err(PayloadError::Base64(_))
        ));
        // Valid base64, but not an .npy buffer.
        let not_npy = general_purpose::STANDARD.encode(b"hello world");
        assert!(matches!(decode(&not_npy), Err(PayloadError::Npy(_))));
    }

    #[test]
    fn placeholder_decodes_to_zero_tensor() {
        let array = decode(&placeholder()).unwrap();
        assert_eq!(array.shape(), &[1, 1, 128, 128]);
        assert!(array.iter().all(|&v| v == 0.0));
        assert_eq!(array, ArrayD::<f32>::zeros(IxDyn(&[1, 1, 128, 128])));
    }
}
