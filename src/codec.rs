//! Binary format of a bucket file.
//!
//! # Layout
//!
//! All integers little-endian.
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │ Magic (4B): "LSHB"                      │
//! │ Version (4B): u32                       │
//! │ Count (4B): number of sketches          │
//! ├─────────────────────────────────────────┤
//! │ For each sketch:                        │
//! │   Name length (4B)                      │
//! │   Name (UTF-8)                          │
//! │   Signature length (4B)                 │
//! │   Signature values (4B each)            │
//! └─────────────────────────────────────────┘
//! ```
//!
//! The header alone is enough to count a bucket's sketches without decoding
//! the records, see [`read_count`].

use std::io::{self, Read};

use thiserror::Error;

use crate::bucket::Bucket;
use crate::sketch::Sketch;

/// Magic bytes of a bucket file.
pub const BUCKET_MAGIC: &[u8; 4] = b"LSHB";

/// Current bucket format version.
pub const FORMAT_VERSION: u32 = 1;

/// Size of magic + version + count.
pub const HEADER_SIZE: usize = 12;

/// Why a bucket file could not be decoded.
#[derive(Debug, Error)]
pub enum FormatError {
    #[error("bad magic bytes {0:?}")]
    BadMagic([u8; 4]),

    #[error("unsupported format version {0} (expected {})", FORMAT_VERSION)]
    UnsupportedVersion(u32),

    #[error("truncated input: {0}")]
    Truncated(&'static str),

    #[error("sketch name is not valid UTF-8")]
    InvalidName,

    #[error("{0} trailing bytes after last sketch")]
    TrailingBytes(usize),

    #[error("bucket too large to encode: {0}")]
    TooLarge(&'static str),

    #[error("sketch {index} has signature width {actual}, table width is {expected}")]
    WidthMismatch {
        index: usize,
        expected: usize,
        actual: usize,
    },
}

fn len_u32(len: usize, what: &'static str) -> Result<u32, FormatError> {
    u32::try_from(len).map_err(|_| FormatError::TooLarge(what))
}

/// Encode the sketches of `bucket`.
pub fn encode(bucket: &Bucket) -> Result<Vec<u8>, FormatError> {
    let body: usize = bucket
        .iter()
        .map(|s| 8 + s.name().len() + 4 * s.signature().len())
        .sum();
    let mut buf = Vec::with_capacity(HEADER_SIZE + body);

    buf.extend_from_slice(BUCKET_MAGIC);
    buf.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
    buf.extend_from_slice(&len_u32(bucket.len(), "sketch count")?.to_le_bytes());

    for sketch in bucket {
        let name = sketch.name().as_bytes();
        buf.extend_from_slice(&len_u32(name.len(), "name length")?.to_le_bytes());
        buf.extend_from_slice(name);

        let signature = sketch.signature();
        buf.extend_from_slice(&len_u32(signature.len(), "signature length")?.to_le_bytes());
        for value in signature.iter() {
            buf.extend_from_slice(&value.to_le_bytes());
        }
    }
    Ok(buf)
}

struct Cursor<'a> {
    bytes: &'a [u8],
}

impl<'a> Cursor<'a> {
    fn take(&mut self, n: usize, what: &'static str) -> Result<&'a [u8], FormatError> {
        if self.bytes.len() < n {
            return Err(FormatError::Truncated(what));
        }
        let (head, tail) = self.bytes.split_at(n);
        self.bytes = tail;
        Ok(head)
    }

    fn u32(&mut self, what: &'static str) -> Result<u32, FormatError> {
        let mut buf = [0u8; 4];
        buf.copy_from_slice(self.take(4, what)?);
        Ok(u32::from_le_bytes(buf))
    }
}

fn check_header(cursor: &mut Cursor<'_>) -> Result<u32, FormatError> {
    let mut magic = [0u8; 4];
    magic.copy_from_slice(cursor.take(4, "magic")?);
    if &magic != BUCKET_MAGIC {
        return Err(FormatError::BadMagic(magic));
    }
    let version = cursor.u32("version")?;
    if version != FORMAT_VERSION {
        return Err(FormatError::UnsupportedVersion(version));
    }
    cursor.u32("sketch count")
}

/// Decode a bucket whose signatures must all have `width` values.
///
/// The result is not marked modified.
pub fn decode(bytes: &[u8], width: usize) -> Result<Bucket, FormatError> {
    let mut cursor = Cursor { bytes };
    let count = check_header(&mut cursor)? as usize;

    // Each record is at least 8 bytes; do not trust `count` for allocation.
    let mut sketches = Vec::with_capacity(count.min(cursor.bytes.len() / 8));
    for index in 0..count {
        let name_len = cursor.u32("name length")? as usize;
        let name = std::str::from_utf8(cursor.take(name_len, "name")?)
            .map_err(|_| FormatError::InvalidName)?
            .to_string();

        let sig_len = cursor.u32("signature length")? as usize;
        if sig_len != width {
            return Err(FormatError::WidthMismatch {
                index,
                expected: width,
                actual: sig_len,
            });
        }
        let raw = cursor.take(
            sig_len
                .checked_mul(4)
                .ok_or(FormatError::Truncated("signature"))?,
            "signature",
        )?;
        let values = raw
            .chunks_exact(4)
            .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect::<Vec<u32>>();

        sketches.push(Sketch::new(values, name));
    }

    if !cursor.bytes.is_empty() {
        return Err(FormatError::TrailingBytes(cursor.bytes.len()));
    }
    Ok(Bucket::from_sketches(sketches))
}

/// Read the sketch count from the header without decoding the records.
pub fn read_count<R: Read>(reader: &mut R) -> io::Result<Result<usize, FormatError>> {
    let mut header = [0u8; HEADER_SIZE];
    match reader.read_exact(&mut header) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
            return Ok(Err(FormatError::Truncated("header")));
        }
        Err(e) => return Err(e),
    }
    let mut cursor = Cursor { bytes: &header };
    Ok(check_header(&mut cursor).map(|count| count as usize))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Bucket {
        let mut b = Bucket::new();
        b.add(Sketch::new(vec![1, 2, 3], "alpha"));
        b.add(Sketch::new(vec![u32::MAX, 0, 42], "βeta"));
        b.add(Sketch::new(vec![7, 7, 7], ""));
        b
    }

    #[test]
    fn test_roundtrip_preserves_order_and_content() {
        let original = sample();
        let bytes = encode(&original).unwrap();
        let decoded = decode(&bytes, 3).unwrap();

        assert!(!decoded.is_modified());
        assert_eq!(decoded.sketches(), original.sketches());
    }

    #[test]
    fn test_header_layout() {
        let bytes = encode(&sample()).unwrap();
        assert_eq!(&bytes[0..4], b"LSHB");
        assert_eq!(u32::from_le_bytes(bytes[4..8].try_into().unwrap()), 1);
        assert_eq!(u32::from_le_bytes(bytes[8..12].try_into().unwrap()), 3);
        // name_len of the first record
        assert_eq!(u32::from_le_bytes(bytes[12..16].try_into().unwrap()), 5);
        assert_eq!(&bytes[16..21], b"alpha");
    }

    #[test]
    fn test_read_count() {
        let bytes = encode(&sample()).unwrap();
        let count = read_count(&mut bytes.as_slice()).unwrap().unwrap();
        assert_eq!(count, 3);

        let short = read_count(&mut &bytes[..5]).unwrap();
        assert!(matches!(short, Err(FormatError::Truncated("header"))));
    }

    #[test]
    fn test_rejects_bad_magic() {
        let mut bytes = encode(&sample()).unwrap();
        bytes[0] = b'X';
        assert!(matches!(decode(&bytes, 3), Err(FormatError::BadMagic(_))));
    }

    #[test]
    fn test_rejects_unknown_version() {
        let mut bytes = encode(&sample()).unwrap();
        bytes[4..8].copy_from_slice(&7u32.to_le_bytes());
        assert!(matches!(
            decode(&bytes, 3),
            Err(FormatError::UnsupportedVersion(7))
        ));
    }

    #[test]
    fn test_rejects_truncation_and_trailing_bytes() {
        let bytes = encode(&sample()).unwrap();
        assert!(matches!(
            decode(&bytes[..bytes.len() - 1], 3),
            Err(FormatError::Truncated(_))
        ));

        let mut longer = bytes.clone();
        longer.push(0);
        assert!(matches!(decode(&longer, 3), Err(FormatError::TrailingBytes(1))));
    }

    #[test]
    fn test_rejects_invalid_utf8_name() {
        let mut b = Bucket::new();
        b.add(Sketch::new(vec![1], "ab"));
        let mut bytes = encode(&b).unwrap();
        bytes[16] = 0xFF;
        assert!(matches!(decode(&bytes, 1), Err(FormatError::InvalidName)));
    }

    #[test]
    fn test_rejects_signature_of_other_width() {
        let bytes = encode(&sample()).unwrap();
        assert!(matches!(
            decode(&bytes, 4),
            Err(FormatError::WidthMismatch {
                index: 0,
                expected: 4,
                actual: 3
            })
        ));

        let mut mixed = sample();
        mixed.add(Sketch::new(vec![1, 2], "short"));
        let bytes = encode(&mixed).unwrap();
        assert!(matches!(
            decode(&bytes, 3),
            Err(FormatError::WidthMismatch { index: 3, .. })
        ));
    }
}
