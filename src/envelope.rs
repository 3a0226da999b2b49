//! Binary envelope wrapping ciphertext with its key version.
//!
//! Wire format (wire-compatibility-critical, byte-for-byte):
//! `[magic:1][key version i64 BE:8][ciphertext length i32 BE:4][ciphertext:N]`
//!
//! The format carries no version of its own; the magic byte is the format
//! identifier.

use crate::error::{Error, Result};

/// Sentinel first byte of every envelope.
pub const MAGIC_BYTE: u8 = 0x69;

/// Fixed header size: magic + version + length.
pub const HEADER_LEN: usize = 13;

/// Frame `ciphertext` under `version`. Always yields `HEADER_LEN + N` bytes.
pub fn encode(version: i64, ciphertext: &[u8]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(HEADER_LEN + ciphertext.len());
    buf.push(MAGIC_BYTE);
    buf.extend_from_slice(&version.to_be_bytes());
    buf.extend_from_slice(&(ciphertext.len() as i32).to_be_bytes());
    buf.extend_from_slice(ciphertext);
    buf
}

/// Split an envelope into its key version and ciphertext slice.
///
/// Bytes beyond the declared ciphertext length are ignored.
pub fn decode(bytes: &[u8]) -> Result<(i64, &[u8])> {
    if bytes.len() < HEADER_LEN {
        return Err(Error::EnvelopeTooShort {
            got: bytes.len(),
            min: HEADER_LEN,
        });
    }
    if bytes[0] != MAGIC_BYTE {
        return Err(Error::EnvelopeBadMagic { got: bytes[0] });
    }

    // Slices are exact after the length check above.
    let mut version_bytes = [0u8; 8];
    version_bytes.copy_from_slice(&bytes[1..9]);
    let version = i64::from_be_bytes(version_bytes);

    let mut len_bytes = [0u8; 4];
    len_bytes.copy_from_slice(&bytes[9..13]);
    let declared = i32::from_be_bytes(len_bytes);

    let available = bytes.len() - HEADER_LEN;
    if declared < 0 || declared as usize > available {
        return Err(Error::EnvelopeTruncated {
            declared: declared.max(0) as usize,
            available,
        });
    }

    Ok((version, &bytes[HEADER_LEN..HEADER_LEN + declared as usize]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip() {
        let ciphertext = [0xde, 0xad, 0xbe, 0xef];
        let encoded = encode(1000, &ciphertext);
        let (version, ct) = decode(&encoded).unwrap();
        assert_eq!(version, 1000);
        assert_eq!(ct, ciphertext);
    }

    #[test]
    fn exact_byte_layout() {
        let encoded = encode(0x0102030405060708, &[0xaa, 0xbb]);
        assert_eq!(encoded.len(), HEADER_LEN + 2);
        assert_eq!(encoded[0], MAGIC_BYTE);
        assert_eq!(
            &encoded[1..9],
            &[0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08]
        );
        assert_eq!(&encoded[9..13], &[0x00, 0x00, 0x00, 0x02]);
        assert_eq!(&encoded[13..], &[0xaa, 0xbb]);
    }

    #[test]
    fn empty_ciphertext() {
        let encoded = encode(7, &[]);
        assert_eq!(encoded.len(), HEADER_LEN);
        let (version, ct) = decode(&encoded).unwrap();
        assert_eq!(version, 7);
        assert!(ct.is_empty());
    }

    #[test]
    fn negative_version_round_trip() {
        let encoded = encode(-1, &[1, 2, 3]);
        let (version, ct) = decode(&encoded).unwrap();
        assert_eq!(version, -1);
        assert_eq!(ct, &[1, 2, 3]);
    }

    #[test]
    fn extreme_versions_round_trip() {
        for version in [i64::MIN, i64::MAX, 0] {
            let (decoded, _) = decode(&encode(version, b"x")).unwrap();
            assert_eq!(decoded, version);
        }
    }

    #[test]
    fn rejects_short_buffer() {
        for len in 0..HEADER_LEN {
            let err = decode(&vec![MAGIC_BYTE; len]).unwrap_err();
            assert!(matches!(err, Error::EnvelopeTooShort { .. }));
        }
    }

    #[test]
    fn rejects_wrong_magic() {
        let mut encoded = encode(1, &[9]);
        encoded[0] = 0x00;
        assert!(matches!(
            decode(&encoded),
            Err(Error::EnvelopeBadMagic { got: 0x00 })
        ));
    }

    #[test]
    fn rejects_over_declared_length() {
        let mut encoded = encode(1, &[1, 2, 3, 4]);
        encoded.truncate(HEADER_LEN + 2);
        assert!(matches!(
            decode(&encoded),
            Err(Error::EnvelopeTruncated {
                declared: 4,
                available: 2
            })
        ));
    }

    #[test]
    fn rejects_negative_declared_length() {
        let mut encoded = encode(1, &[]);
        encoded[9] = 0xff;
        assert!(matches!(decode(&encoded), Err(Error::EnvelopeTruncated { .. })));
    }

    #[test]
    fn trailing_bytes_ignored() {
        let mut encoded = encode(42, &[5, 6]);
        encoded.extend_from_slice(&[0xff; 8]);
        let (version, ct) = decode(&encoded).unwrap();
        assert_eq!(version, 42);
        assert_eq!(ct, &[5, 6]);
    }
}
