//! Tagged extra-field blocks: parsing, serialization and decoder registry.
//!
//! The ZIP extra field is a sequence of `(u16 id, u16 length, payload)`
//! blocks, little-endian, with no padding between blocks.

use std::collections::HashMap;
use std::sync::OnceLock;

use super::asi::ASI_HEADER_ID;
use super::asi::AsiExtraField;
use crate::ArchiveError;
use crate::Result;

const BLOCK_HEADER_LEN: usize = 4;

/// Decoder for one header id's payload.
pub type DecodeFn = fn(&[u8]) -> Result<ExtraFieldRecord>;

/// One decoded extra-field block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtraFieldRecord {
    /// Info-ZIP Unix permission record (`0x756e`).
    Permission(AsiExtraField),
    /// Any block without a registered decoder, kept byte for byte.
    Unrecognized {
        /// Block header id.
        header_id: u16,
        /// Raw payload.
        data: Vec<u8>,
    },
}

impl ExtraFieldRecord {
    /// Returns the block header id.
    #[must_use]
    pub fn header_id(&self) -> u16 {
        match self {
            Self::Permission(_) => ASI_HEADER_ID,
            Self::Unrecognized { header_id, .. } => *header_id,
        }
    }

    /// Returns the encoded payload, without the block header.
    #[must_use]
    pub fn payload(&self) -> Vec<u8> {
        match self {
            Self::Permission(asi) => asi.encode(),
            Self::Unrecognized { data, .. } => data.clone(),
        }
    }
}

/// Immutable mapping from header id to decoder.
///
/// # Examples
///
/// ```
/// use zipwright_core::extra::{ExtraFieldRecord, ExtraFieldRegistry, parse_with};
///
/// // A registry with no decoders keeps every block unrecognized
/// let registry = ExtraFieldRegistry::builder().build();
/// let records = parse_with(&registry, &[0x6e, 0x75, 0x02, 0x00, 0xa4, 0x81])?;
/// assert!(matches!(records[0], ExtraFieldRecord::Unrecognized { header_id: 0x756e, .. }));
/// # Ok::<(), zipwright_core::ArchiveError>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct ExtraFieldRegistry {
    decoders: HashMap<u16, DecodeFn>,
}

impl ExtraFieldRegistry {
    /// Returns the process-wide registry with the built-in decoders.
    pub fn default_registry() -> &'static Self {
        static DEFAULT: OnceLock<ExtraFieldRegistry> = OnceLock::new();
        DEFAULT.get_or_init(|| {
            Self::builder()
                .register(ASI_HEADER_ID, decode_asi)
                .build()
        })
    }

    /// Starts an empty registry.
    #[must_use]
    pub fn builder() -> ExtraFieldRegistryBuilder {
        ExtraFieldRegistryBuilder::default()
    }

    /// Returns the decoder registered for `header_id`.
    #[must_use]
    pub fn decoder(&self, header_id: u16) -> Option<DecodeFn> {
        self.decoders.get(&header_id).copied()
    }

    /// Returns `true` if a decoder is registered for `header_id`.
    #[must_use]
    pub fn contains(&self, header_id: u16) -> bool {
        self.decoders.contains_key(&header_id)
    }
}

/// Builder for [`ExtraFieldRegistry`].
#[derive(Debug, Default)]
pub struct ExtraFieldRegistryBuilder {
    decoders: HashMap<u16, DecodeFn>,
}

impl ExtraFieldRegistryBuilder {
    /// Registers `decoder` for `header_id`, replacing any earlier one.
    #[must_use]
    pub fn register(mut self, header_id: u16, decoder: DecodeFn) -> Self {
        self.decoders.insert(header_id, decoder);
        self
    }

    /// Adds the built-in decoders.
    #[must_use]
    pub fn with_defaults(self) -> Self {
        self.register(ASI_HEADER_ID, decode_asi)
    }

    /// Finishes the registry.
    #[must_use]
    pub fn build(self) -> ExtraFieldRegistry {
        ExtraFieldRegistry {
            decoders: self.decoders,
        }
    }
}

fn decode_asi(payload: &[u8]) -> Result<ExtraFieldRecord> {
    AsiExtraField::decode(payload).map(ExtraFieldRecord::Permission)
}

/// Parses an extra-field blob with the default registry.
///
/// # Errors
///
/// Returns [`ArchiveError::Format`] on a truncated block header, a declared
/// length that overruns the input, or a payload its decoder rejects.
///
/// # Examples
///
/// ```
/// use zipwright_core::extra::{AsiExtraField, ExtraFieldRecord, parse, serialize};
///
/// let records = vec![
///     ExtraFieldRecord::Permission(AsiExtraField::from_mode(0o755)),
///     ExtraFieldRecord::Unrecognized { header_id: 0xcafe, data: vec![1, 2, 3] },
/// ];
/// let bytes = serialize(&records)?;
/// assert_eq!(parse(&bytes)?, records);
/// # Ok::<(), zipwright_core::ArchiveError>(())
/// ```
pub fn parse(bytes: &[u8]) -> Result<Vec<ExtraFieldRecord>> {
    parse_with(ExtraFieldRegistry::default_registry(), bytes)
}

/// Parses an extra-field blob with an explicit registry.
///
/// Blocks keep their order, duplicates included.
///
/// # Errors
///
/// See [`parse`].
pub fn parse_with(registry: &ExtraFieldRegistry, bytes: &[u8]) -> Result<Vec<ExtraFieldRecord>> {
    let mut records = Vec::new();
    let mut rest = bytes;

    while !rest.is_empty() {
        if rest.len() < BLOCK_HEADER_LEN {
            return Err(ArchiveError::format(format!(
                "truncated extra-field block header: {} trailing bytes",
                rest.len()
            )));
        }

        let header_id = u16::from_le_bytes([rest[0], rest[1]]);
        let len = usize::from(u16::from_le_bytes([rest[2], rest[3]]));
        let body = &rest[BLOCK_HEADER_LEN..];
        if len > body.len() {
            return Err(ArchiveError::format(format!(
                "extra-field block {header_id:#06x} declares {len} bytes, {} remain",
                body.len()
            )));
        }

        let payload = &body[..len];
        let record = match registry.decoder(header_id) {
            Some(decode) => decode(payload)?,
            None => ExtraFieldRecord::Unrecognized {
                header_id,
                data: payload.to_vec(),
            },
        };
        records.push(record);
        rest = &body[len..];
    }

    Ok(records)
}

/// Serializes records, recomputing every block length.
///
/// # Errors
///
/// Returns [`ArchiveError::Format`] if a payload exceeds 65535 bytes.
pub fn serialize(records: &[ExtraFieldRecord]) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    for record in records {
        let payload = record.payload();
        let len = u16::try_from(payload.len()).map_err(|_| {
            ArchiveError::format(format!(
                "extra-field block {:#06x} payload of {} bytes exceeds 65535",
                record.header_id(),
                payload.len()
            ))
        })?;
        out.extend_from_slice(&record.header_id().to_le_bytes());
        out.extend_from_slice(&len.to_le_bytes());
        out.extend_from_slice(&payload);
    }
    Ok(out)
}

/// Returns the first permission record, if any.
#[must_use]
pub fn find_permission(records: &[ExtraFieldRecord]) -> Option<&AsiExtraField> {
    records.iter().find_map(|record| match record {
        ExtraFieldRecord::Permission(asi) => Some(asi),
        ExtraFieldRecord::Unrecognized { .. } => None,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn block(id: u16, payload: &[u8]) -> Vec<u8> {
        let mut out = id.to_le_bytes().to_vec();
        out.extend_from_slice(&(payload.len() as u16).to_le_bytes());
        out.extend_from_slice(payload);
        out
    }

    #[test]
    fn test_parse_empty() {
        assert!(parse(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_parse_unrecognized_preserves_bytes() {
        let bytes = block(0x5455, &[1, 0x10, 0x20, 0x30, 0x40]);
        let records = parse(&bytes).unwrap();
        assert_eq!(
            records,
            vec![ExtraFieldRecord::Unrecognized {
                header_id: 0x5455,
                data: vec![1, 0x10, 0x20, 0x30, 0x40],
            }]
        );
        assert_eq!(serialize(&records).unwrap(), bytes);
    }

    #[test]
    fn test_parse_permission_block() {
        let asi = AsiExtraField::from_mode(0o750);
        let bytes = block(ASI_HEADER_ID, &asi.encode());
        let records = parse(&bytes).unwrap();
        assert_eq!(find_permission(&records).unwrap().to_mode(), 0o750);
    }

    #[test]
    fn test_parse_keeps_order_and_duplicates() {
        let mut bytes = block(0x0001, &[9; 8]);
        bytes.extend(block(0xaaaa, &[]));
        bytes.extend(block(0xaaaa, &[7]));
        let ids: Vec<u16> = parse(&bytes)
            .unwrap()
            .iter()
            .map(ExtraFieldRecord::header_id)
            .collect();
        assert_eq!(ids, vec![0x0001, 0xaaaa, 0xaaaa]);
    }

    #[test]
    fn test_parse_length_overrun() {
        let mut bytes = block(0x1234, &[1, 2, 3]);
        bytes[2] = 10;
        let err = parse(&bytes).unwrap_err();
        assert!(matches!(err, ArchiveError::Format(_)));
    }

    #[test]
    fn test_parse_truncated_header() {
        let mut bytes = block(0x1234, &[1]);
        bytes.extend_from_slice(&[0x34, 0x12, 0x00]);
        assert!(parse(&bytes).is_err());
    }

    #[test]
    fn test_parse_bad_permission_crc_fails() {
        let mut payload = AsiExtraField::from_mode(0o644).encode();
        payload[1] ^= 0x01;
        assert!(parse(&block(ASI_HEADER_ID, &payload)).is_err());
    }

    #[test]
    fn test_serialize_recomputes_length() {
        let records = vec![ExtraFieldRecord::Unrecognized {
            header_id: 0xbeef,
            data: vec![0; 300],
        }];
        let bytes = serialize(&records).unwrap();
        assert_eq!(u16::from_le_bytes([bytes[2], bytes[3]]), 300);
        assert_eq!(bytes.len(), 304);
    }

    #[test]
    fn test_serialize_rejects_oversized_payload() {
        let records = vec![ExtraFieldRecord::Unrecognized {
            header_id: 0xbeef,
            data: vec![0; 65_536],
        }];
        assert!(matches!(
            serialize(&records).unwrap_err(),
            ArchiveError::Format(_)
        ));
    }

    #[test]
    fn test_empty_registry_leaves_asi_unrecognized() {
        let registry = ExtraFieldRegistry::builder().build();
        let payload = AsiExtraField::from_mode(0o644).encode();
        let records = parse_with(&registry, &block(ASI_HEADER_ID, &payload)).unwrap();
        assert!(find_permission(&records).is_none());
        assert!(!registry.contains(ASI_HEADER_ID));
    }

    #[test]
    fn test_custom_decoder() {
        fn reject(_: &[u8]) -> Result<ExtraFieldRecord> {
            Err(ArchiveError::format("rejected"))
        }
        let registry = ExtraFieldRegistry::builder()
            .with_defaults()
            .register(0x9999, reject)
            .build();
        assert!(registry.contains(ASI_HEADER_ID));
        assert!(parse_with(&registry, &block(0x9999, &[1])).is_err());
    }

    #[test]
    fn test_default_registry_is_shared() {
        let a = ExtraFieldRegistry::default_registry();
        let b = ExtraFieldRegistry::default_registry();
        assert!(std::ptr::eq(a, b));
    }
}
