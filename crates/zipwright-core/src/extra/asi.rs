//! Info-ZIP "ASi" Unix extra field (header id `0x756e`).
//!
//! Payload layout, all little-endian:
//!
//! | Offset | Size | Field |
//! |---|---|---|
//! | 0 | 4 | CRC32 of bytes 4.. |
//! | 4 | 2 | mode (file-type bits and permission bits) |
//! | 6 | 4 | symbolic link target length |
//! | 10 | 2 | uid |
//! | 12 | 2 | gid |
//! | 14 | n | link target |

use flate2::Crc;

use crate::ArchiveError;
use crate::Result;

/// Header id of the ASi extra field.
pub const ASI_HEADER_ID: u16 = 0x756e;

/// File-type mask of a Unix mode.
pub const S_IFMT: u32 = 0o170_000;
/// Regular file type bits.
pub const S_IFREG: u32 = 0o100_000;
/// Directory type bits.
pub const S_IFDIR: u32 = 0o040_000;
/// Symbolic link type bits.
pub const S_IFLNK: u32 = 0o120_000;

/// Permission bits, including setuid, setgid and sticky.
pub const PERMISSION_MASK: u32 = 0o7777;

const FULL_HEADER_LEN: usize = 14;
const MODE_ONLY_LEN: usize = 2;

/// Decoded ASi record.
///
/// Records built with [`from_mode`](Self::from_mode) or
/// [`from_directory_mode`](Self::from_directory_mode) always encode to the
/// full 14-byte layout. Records decoded from a non-canonical payload (the
/// 2-byte mode-only form, a short payload, or trailing bytes after the link
/// target) keep their original bytes and encode back to them unchanged.
///
/// # Examples
///
/// ```
/// use zipwright_core::extra::AsiExtraField;
///
/// let field = AsiExtraField::from_mode(0o4755);
/// assert_eq!(field.to_mode(), 0o4755);
///
/// let decoded = AsiExtraField::decode(&field.encode())?;
/// assert_eq!(decoded, field);
/// # Ok::<(), zipwright_core::ArchiveError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AsiExtraField {
    mode: u16,
    uid: u16,
    gid: u16,
    link_target: Vec<u8>,
    original: Option<Vec<u8>>,
}

impl AsiExtraField {
    /// Creates a regular-file record carrying `mode`'s permission bits.
    ///
    /// Bits outside `0o7777` are ignored.
    #[must_use]
    pub fn from_mode(mode: u32) -> Self {
        Self::with_type(S_IFREG, mode)
    }

    /// Creates a directory record carrying `mode`'s permission bits.
    #[must_use]
    pub fn from_directory_mode(mode: u32) -> Self {
        Self::with_type(S_IFDIR, mode)
    }

    fn with_type(file_type: u32, mode: u32) -> Self {
        Self {
            mode: (file_type | (mode & PERMISSION_MASK)) as u16,
            uid: 0,
            gid: 0,
            link_target: Vec::new(),
            original: None,
        }
    }

    /// Sets the owner ids.
    #[must_use]
    pub fn with_owner(mut self, uid: u16, gid: u16) -> Self {
        self.uid = uid;
        self.gid = gid;
        self.original = None;
        self
    }

    /// Returns the permission bits (`mode & 0o7777`).
    #[must_use]
    pub fn to_mode(&self) -> u32 {
        u32::from(self.mode) & PERMISSION_MASK
    }

    /// Returns the file-type bits (`mode & 0o170000`).
    #[must_use]
    pub fn file_type(&self) -> u32 {
        u32::from(self.mode) & S_IFMT
    }

    /// Returns the raw 16-bit mode as stored.
    #[must_use]
    pub fn raw_mode(&self) -> u16 {
        self.mode
    }

    /// Returns `true` if the record describes a directory.
    #[must_use]
    pub fn is_directory(&self) -> bool {
        self.file_type() == S_IFDIR
    }

    /// Returns `true` if the record describes a symbolic link.
    #[must_use]
    pub fn is_symlink(&self) -> bool {
        self.file_type() == S_IFLNK
    }

    /// Returns the owner user id.
    #[must_use]
    pub fn uid(&self) -> u16 {
        self.uid
    }

    /// Returns the owner group id.
    #[must_use]
    pub fn gid(&self) -> u16 {
        self.gid
    }

    /// Returns the symbolic link target bytes (empty for non-links).
    #[must_use]
    pub fn link_target(&self) -> &[u8] {
        &self.link_target
    }

    /// Encodes the record payload (without the 4-byte block header).
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        if let Some(original) = &self.original {
            return original.clone();
        }

        let mut body = Vec::with_capacity(FULL_HEADER_LEN - 4 + self.link_target.len());
        body.extend_from_slice(&self.mode.to_le_bytes());
        body.extend_from_slice(&(self.link_target.len() as u32).to_le_bytes());
        body.extend_from_slice(&self.uid.to_le_bytes());
        body.extend_from_slice(&self.gid.to_le_bytes());
        body.extend_from_slice(&self.link_target);

        let mut payload = Vec::with_capacity(4 + body.len());
        payload.extend_from_slice(&crc32(&body).to_le_bytes());
        payload.extend_from_slice(&body);
        payload
    }

    /// Decodes a record payload.
    ///
    /// A 2-byte payload carries the mode only. Any other payload shorter than
    /// 14 bytes is zero-padded and its CRC is not checked.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError::Format`] if a full payload fails its CRC check
    /// or declares a link target longer than the payload.
    pub fn decode(payload: &[u8]) -> Result<Self> {
        if payload.len() == MODE_ONLY_LEN {
            return Ok(Self {
                mode: u16::from_le_bytes([payload[0], payload[1]]),
                uid: 0,
                gid: 0,
                link_target: Vec::new(),
                original: Some(payload.to_vec()),
            });
        }

        if payload.len() < FULL_HEADER_LEN {
            let mut padded = [0u8; FULL_HEADER_LEN];
            padded[..payload.len()].copy_from_slice(payload);
            return Ok(Self {
                mode: read_u16(&padded, 4),
                uid: read_u16(&padded, 10),
                gid: read_u16(&padded, 12),
                link_target: Vec::new(),
                original: Some(payload.to_vec()),
            });
        }

        let stored_crc = read_u32(payload, 0);
        let actual_crc = crc32(&payload[4..]);
        if stored_crc != actual_crc {
            return Err(ArchiveError::format(format!(
                "ASi extra field CRC mismatch: stored {stored_crc:#010x}, computed {actual_crc:#010x}"
            )));
        }

        let link_len = read_u32(payload, 6) as usize;
        let link_end = FULL_HEADER_LEN
            .checked_add(link_len)
            .filter(|end| *end <= payload.len())
            .ok_or_else(|| {
                ArchiveError::format(format!(
                    "ASi link length {link_len} exceeds payload of {} bytes",
                    payload.len()
                ))
            })?;

        Ok(Self {
            mode: read_u16(payload, 4),
            uid: read_u16(payload, 10),
            gid: read_u16(payload, 12),
            link_target: payload[FULL_HEADER_LEN..link_end].to_vec(),
            original: (link_end != payload.len()).then(|| payload.to_vec()),
        })
    }
}

fn crc32(bytes: &[u8]) -> u32 {
    let mut crc = Crc::new();
    crc.update(bytes);
    crc.sum()
}

fn read_u16(bytes: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes([bytes[offset], bytes[offset + 1]])
}

fn read_u32(bytes: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([
        bytes[offset],
        bytes[offset + 1],
        bytes[offset + 2],
        bytes[offset + 3],
    ])
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_from_mode_sets_regular_file_type() {
        let field = AsiExtraField::from_mode(0o644);
        assert_eq!(field.file_type(), S_IFREG);
        assert_eq!(field.raw_mode(), 0o100_644);
        assert!(!field.is_directory());
        assert!(!field.is_symlink());
    }

    #[test]
    fn test_directory_mode() {
        let field = AsiExtraField::from_directory_mode(0o755);
        assert!(field.is_directory());
        assert_eq!(field.to_mode(), 0o755);
    }

    #[test]
    fn test_special_bits_survive() {
        for mode in [0o4755, 0o2755, 0o1777, 0o7777, 0] {
            assert_eq!(AsiExtraField::from_mode(mode).to_mode(), mode);
        }
    }

    #[test]
    fn test_high_bits_ignored() {
        let field = AsiExtraField::from_mode(0o170_644);
        assert_eq!(field.to_mode(), 0o644);
        assert_eq!(field.file_type(), S_IFREG);
    }

    #[test]
    fn test_encode_layout() {
        let bytes = AsiExtraField::from_mode(0o755).with_owner(1000, 100).encode();
        assert_eq!(bytes.len(), 14);
        assert_eq!(read_u16(&bytes, 4), 0o100_755);
        assert_eq!(read_u32(&bytes, 6), 0);
        assert_eq!(read_u16(&bytes, 10), 1000);
        assert_eq!(read_u16(&bytes, 12), 100);
        assert_eq!(read_u32(&bytes, 0), crc32(&bytes[4..]));
    }

    #[test]
    fn test_decode_full_roundtrip() {
        let field = AsiExtraField::from_mode(0o600).with_owner(7, 8);
        let decoded = AsiExtraField::decode(&field.encode()).unwrap();
        assert_eq!(decoded, field);
        assert_eq!(decoded.uid(), 7);
        assert_eq!(decoded.gid(), 8);
    }

    #[test]
    fn test_decode_with_link_target() {
        let mut body = Vec::new();
        body.extend_from_slice(&((S_IFLNK | 0o777) as u16).to_le_bytes());
        body.extend_from_slice(&6u32.to_le_bytes());
        body.extend_from_slice(&0u16.to_le_bytes());
        body.extend_from_slice(&0u16.to_le_bytes());
        body.extend_from_slice(b"target");
        let mut payload = crc32(&body).to_le_bytes().to_vec();
        payload.extend_from_slice(&body);

        let field = AsiExtraField::decode(&payload).unwrap();
        assert!(field.is_symlink());
        assert_eq!(field.link_target(), b"target");
        assert_eq!(field.encode(), payload);
    }

    #[test]
    fn test_decode_crc_mismatch() {
        let mut bytes = AsiExtraField::from_mode(0o644).encode();
        bytes[0] ^= 0xff;
        let err = AsiExtraField::decode(&bytes).unwrap_err();
        assert!(matches!(err, ArchiveError::Format(_)));
    }

    #[test]
    fn test_decode_mode_only() {
        let payload = (0o100_640u16).to_le_bytes();
        let field = AsiExtraField::decode(&payload).unwrap();
        assert_eq!(field.to_mode(), 0o640);
        assert_eq!(field.encode(), payload.to_vec());
    }

    #[test]
    fn test_decode_short_payload_is_padded() {
        // CRC is garbage but not checked for short payloads
        let payload = [0xde, 0xad, 0xbe, 0xef, 0xa4, 0x81];
        let field = AsiExtraField::decode(&payload).unwrap();
        assert_eq!(field.raw_mode(), 0o100_644);
        assert_eq!(field.to_mode(), 0o644);
        assert_eq!(field.uid(), 0);
        assert_eq!(field.encode(), payload.to_vec());
    }

    #[test]
    fn test_decode_empty_payload() {
        let field = AsiExtraField::decode(&[]).unwrap();
        assert_eq!(field.to_mode(), 0);
    }

    #[test]
    fn test_decode_link_length_overrun() {
        let mut body = Vec::new();
        body.extend_from_slice(&(S_IFREG as u16).to_le_bytes());
        body.extend_from_slice(&100u32.to_le_bytes());
        body.extend_from_slice(&[0u8; 4]);
        let mut payload = crc32(&body).to_le_bytes().to_vec();
        payload.extend_from_slice(&body);

        assert!(AsiExtraField::decode(&payload).is_err());
    }
}
