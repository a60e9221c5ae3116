//! Decoding of `FSCTL_GET_REPARSE_POINT` output for symbolic links
//!
//! The buffer layout is the symbolic-link arm of `REPARSE_DATA_BUFFER`:
//!
//! ```text
//! u32 ReparseTag
//! u16 ReparseDataLength
//! u16 Reserved
//! u16 SubstituteNameOffset   (relative to PathBuffer)
//! u16 SubstituteNameLength   (bytes)
//! u16 PrintNameOffset
//! u16 PrintNameLength
//! u32 Flags                  (bit 0: target is relative)
//! u16 PathBuffer[]
//! ```
//!
//! Only the substitute name is used; the print name is for display.

use std::path::Path;

use crate::core::constants::reparse::{MAX_PATH, SYMLINK_FLAG_RELATIVE, SYMLINK_HEADER_LEN};
use crate::core::errors::LinkError;

/// Fixed-size header of a symbolic link reparse buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReparseHeader {
    pub tag: u32,
    pub data_length: u16,
    pub reserved: u16,
    pub substitute_name_offset: u16,
    pub substitute_name_length: u16,
    pub print_name_offset: u16,
    pub print_name_length: u16,
    pub flags: u32,
}

impl ReparseHeader {
    /// Parse the header from the front of `bytes`; `None` if too short
    pub fn parse(bytes: &[u8]) -> Option<Self> {
        let header = bytes.get(..SYMLINK_HEADER_LEN)?;
        let u16_at = |at: usize| u16::from_le_bytes([header[at], header[at + 1]]);
        let u32_at = |at: usize| {
            u32::from_le_bytes([header[at], header[at + 1], header[at + 2], header[at + 3]])
        };
        Some(Self {
            tag: u32_at(0),
            data_length: u16_at(4),
            reserved: u16_at(6),
            substitute_name_offset: u16_at(8),
            substitute_name_length: u16_at(10),
            print_name_offset: u16_at(12),
            print_name_length: u16_at(14),
            flags: u32_at(16),
        })
    }

    pub fn is_relative(&self) -> bool {
        self.flags & SYMLINK_FLAG_RELATIVE != 0
    }

    /// Bytes needed to hold the header plus the whole substitute name
    pub fn required_len(&self) -> usize {
        SYMLINK_HEADER_LEN
            + self.substitute_name_offset as usize
            + self.substitute_name_length as usize
    }
}

/// Decoded symbolic link target
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymlinkPayload {
    pub substitute_name: String,
    pub relative: bool,
}

/// Outcome of one device-control round
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReparseRead {
    /// The payload was fully present
    Complete(SymlinkPayload),
    /// Retry with a buffer of at least this many bytes
    Grow(usize),
}

/// Initial buffer size for the device-control call
pub fn initial_buffer_len() -> usize {
    SYMLINK_HEADER_LEN + MAX_PATH
}

/// Interpret the bytes returned by one `FSCTL_GET_REPARSE_POINT` call
///
/// `returned` is the filled prefix of a buffer of `capacity` bytes.
/// `call_succeeded` is false when the OS reported an insufficient buffer.
pub fn decode(
    path: &Path,
    returned: &[u8],
    capacity: usize,
    call_succeeded: bool,
) -> Result<ReparseRead, LinkError> {
    let Some(header) = ReparseHeader::parse(returned) else {
        if call_succeeded {
            return Err(LinkError::data_format(
                path,
                format!(
                    "FSCTL_GET_REPARSE_POINT returned {} bytes, header needs {SYMLINK_HEADER_LEN}",
                    returned.len()
                ),
            ));
        }
        return Ok(ReparseRead::Grow(capacity + MAX_PATH));
    };

    let required = header.required_len();
    if returned.len() >= required {
        let start = SYMLINK_HEADER_LEN + header.substitute_name_offset as usize;
        let name = &returned[start..required];
        let substitute_name = decode_utf16le(path, name)?;
        return Ok(ReparseRead::Complete(SymlinkPayload {
            substitute_name,
            relative: header.is_relative(),
        }));
    }

    if required < capacity {
        return Err(LinkError::data_format(
            path,
            format!(
                "FSCTL_GET_REPARSE_POINT did not return sufficient data ({required}) when provided buffer ({capacity})"
            ),
        ));
    }

    Ok(ReparseRead::Grow(required))
}

fn decode_utf16le(path: &Path, bytes: &[u8]) -> Result<String, LinkError> {
    if bytes.len() % 2 != 0 {
        return Err(LinkError::data_format(
            path,
            format!("substitute name has odd byte length {}", bytes.len()),
        ));
    }
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
        .collect();
    String::from_utf16(&units)
        .map_err(|e| LinkError::data_format(path, format!("substitute name is not UTF-16: {e}")))
}

#[cfg(test)]
pub(crate) fn encode_symlink_buffer(substitute: &str, print: &str, flags: u32) -> Vec<u8> {
    use crate::core::constants::reparse::IO_REPARSE_TAG_SYMLINK;

    let encode = |s: &str| -> Vec<u8> { s.encode_utf16().flat_map(u16::to_le_bytes).collect() };
    let sub = encode(substitute);
    let prn = encode(print);
    let mut buf = Vec::new();
    buf.extend_from_slice(&IO_REPARSE_TAG_SYMLINK.to_le_bytes());
    buf.extend_from_slice(&((12 + sub.len() + prn.len()) as u16).to_le_bytes());
    buf.extend_from_slice(&0u16.to_le_bytes());
    // print name first, substitute name second, as NTFS lays them out
    buf.extend_from_slice(&(prn.len() as u16).to_le_bytes());
    buf.extend_from_slice(&(sub.len() as u16).to_le_bytes());
    buf.extend_from_slice(&0u16.to_le_bytes());
    buf.extend_from_slice(&(prn.len() as u16).to_le_bytes());
    buf.extend_from_slice(&flags.to_le_bytes());
    buf.extend_from_slice(&prn);
    buf.extend_from_slice(&sub);
    buf
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::constants::reparse::IO_REPARSE_TAG_SYMLINK;
    use pretty_assertions::assert_eq;

    fn link() -> &'static Path {
        Path::new(r"C:\a\b\link")
    }

    #[test]
    fn test_header_parse() {
        let buf = encode_symlink_buffer(r"\??\C:\t.json", r"C:\t.json", 0);
        let header = ReparseHeader::parse(&buf).unwrap();
        assert_eq!(header.tag, IO_REPARSE_TAG_SYMLINK);
        assert_eq!(header.print_name_offset, 0);
        assert_eq!(header.substitute_name_offset, header.print_name_length);
        assert!(!header.is_relative());
        assert_eq!(header.required_len(), buf.len());
    }

    #[test]
    fn test_decode_uses_substitute_name_not_print_name() {
        let buf = encode_symlink_buffer(r"..\target.json", "display only", SYMLINK_FLAG_RELATIVE);
        let read = decode(link(), &buf, 1024, true).unwrap();
        assert_eq!(
            read,
            ReparseRead::Complete(SymlinkPayload {
                substitute_name: r"..\target.json".to_string(),
                relative: true,
            })
        );
    }

    #[test]
    fn test_short_header_with_success_is_data_format_error() {
        let err = decode(link(), &[0u8; 8], 280, true).unwrap_err();
        assert!(matches!(err, LinkError::DataFormat { .. }));
    }

    #[test]
    fn test_short_header_with_insufficient_buffer_grows() {
        let read = decode(link(), &[0u8; 8], 280, false).unwrap();
        assert_eq!(read, ReparseRead::Grow(280 + MAX_PATH));
    }

    #[test]
    fn test_truncated_payload_grows_to_required_size() {
        let buf = encode_symlink_buffer(&"x".repeat(300), "p", 0);
        let required = buf.len();
        let read = decode(link(), &buf[..100], 100, false).unwrap();
        assert_eq!(read, ReparseRead::Grow(required));
    }

    #[test]
    fn test_truncated_payload_in_large_buffer_is_data_format_error() {
        let buf = encode_symlink_buffer("target", "p", 0);
        let err = decode(link(), &buf[..buf.len() - 2], 4096, true).unwrap_err();
        assert!(matches!(err, LinkError::DataFormat { .. }));
    }

    #[test]
    fn test_odd_length_substitute_name_rejected() {
        let mut buf = encode_symlink_buffer("ab", "", 0);
        // shrink the declared substitute length by one byte
        buf[10] = 3;
        let err = decode(link(), &buf, 4096, true).unwrap_err();
        assert!(matches!(err, LinkError::DataFormat { .. }));
    }
}
