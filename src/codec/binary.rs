// ---------------------------------------------------------------------------
// binary – Native compact blueprint format
// ---------------------------------------------------------------------------
//
// Header (20 bytes, little-endian):
//   [0..4]   Magic bytes: "BPRT"
//   [4..8]   Format version (u32)
//   [8..12]  Flags (u32: bit 0 = icon and previews included)
//   [12..16] Payload size (u32)
//   [16..20] xxHash32 checksum of the payload
//
// Payload: a bitcode-encoded `WireBlueprint`. Object identifiers are a
// two-variant enum, so the variant tag records whether a name was stored.
//
// On save: encode WireBlueprint -> prepend header (with checksum of payload)
// On load: check magic and version -> validate checksum -> decode payload

use bitcode::{Decode, Encode};
use glam::Vec3;
use thiserror::Error;
use xxhash_rust::xxh32::xxh32;

use crate::blueprints::{BlueprintObject, BlueprintRoot, EntityIdentifier};

/// Magic bytes identifying a native binary blueprint.
pub const MAGIC: [u8; 4] = *b"BPRT";

/// Size of the file header in bytes.
pub const HEADER_SIZE: usize = 20;

/// Current format version. Files from newer builds are rejected.
pub const FORMAT_VERSION: u32 = 1;

/// Header flag: icon and previews follow the objects.
pub const FLAG_MEDIA: u32 = 1;

const XXHASH_SEED: u32 = 0;

/// Failure to decode a native binary blueprint
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DecodeError {
    #[error("not a blueprint file (bad magic bytes)")]
    BadMagic,
    #[error("format version {found} is newer than supported version {supported}")]
    UnsupportedVersion { found: u32, supported: u32 },
    #[error("truncated data: needed {needed} bytes at offset {offset}")]
    Truncated { offset: usize, needed: usize },
    #[error("checksum mismatch: header says {expected:#010x}, payload hashes to {found:#010x}")]
    ChecksumMismatch { expected: u32, found: u32 },
    #[error("header media flag does not match the payload")]
    MediaFlagMismatch,
    #[error("{0} unexpected trailing bytes")]
    TrailingBytes(usize),
    #[error("malformed payload: {0}")]
    Payload(String),
}

impl From<bitcode::Error> for DecodeError {
    fn from(e: bitcode::Error) -> Self {
        DecodeError::Payload(e.to_string())
    }
}

/// Encoding options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BinaryOptions {
    /// Write icon and previews
    pub include_media: bool,
}

impl BinaryOptions {
    /// Everything, for files on disk
    pub const FULL: BinaryOptions = BinaryOptions {
        include_media: true,
    };
    /// No images, for the wire
    pub const LEAN: BinaryOptions = BinaryOptions {
        include_media: false,
    };
}

impl Default for BinaryOptions {
    fn default() -> Self {
        Self::FULL
    }
}

#[derive(Debug, Clone, PartialEq, Encode, Decode)]
enum WireId {
    Name(String),
    Hash(i32),
}

#[derive(Debug, Clone, PartialEq, Encode, Decode)]
struct WireObject {
    id: WireId,
    position: [f32; 3],
    rotation: [f32; 3],
    state: Option<Vec<u8>>,
    source_template_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Encode, Decode)]
struct WireMedia {
    icon: Option<Vec<u8>>,
    previews: Vec<Vec<u8>>,
}

#[derive(Debug, Clone, PartialEq, Encode, Decode)]
struct WireBlueprint {
    name: String,
    author: Option<String>,
    description: Option<String>,
    category: Option<String>,
    box_rotation: [f32; 3],
    objects: Vec<WireObject>,
    media: Option<WireMedia>,
}

impl WireObject {
    fn from_object(object: &BlueprintObject) -> Self {
        let id = match &object.id {
            EntityIdentifier::Name { name, .. } => WireId::Name(name.clone()),
            EntityIdentifier::Hash(hash) => WireId::Hash(*hash),
        };
        Self {
            id,
            position: object.relative_position.to_array(),
            rotation: object.relative_rotation.to_array(),
            state: object.state.clone(),
            source_template_name: object.source_template_name.clone(),
        }
    }

    fn into_object(self) -> BlueprintObject {
        let id = match self.id {
            WireId::Name(name) => EntityIdentifier::from_name(name),
            WireId::Hash(hash) => EntityIdentifier::from_hash(hash),
        };
        BlueprintObject {
            id,
            relative_position: Vec3::from_array(self.position),
            relative_rotation: Vec3::from_array(self.rotation),
            state: self.state,
            source_template_name: self.source_template_name,
        }
    }
}

impl WireBlueprint {
    fn from_root(root: &BlueprintRoot, options: BinaryOptions) -> Self {
        let media = options.include_media.then(|| WireMedia {
            icon: root.icon.clone(),
            previews: root.previews.clone(),
        });
        Self {
            name: root.name.clone(),
            author: root.author.clone(),
            description: root.description.clone(),
            category: root.category.clone(),
            box_rotation: root.box_rotation.to_array(),
            objects: root.objects.iter().map(WireObject::from_object).collect(),
            media,
        }
    }

    fn into_root(self) -> BlueprintRoot {
        let mut root = BlueprintRoot::new(self.name);
        root.author = self.author;
        root.description = self.description;
        root.category = self.category;
        root.box_rotation = Vec3::from_array(self.box_rotation);
        root.objects = self.objects.into_iter().map(WireObject::into_object).collect();
        if let Some(media) = self.media {
            root.icon = media.icon;
            root.previews = media.previews;
        }
        root
    }
}

/// Encode a blueprint to bytes
pub fn encode(root: &BlueprintRoot, options: BinaryOptions) -> Vec<u8> {
    let payload = bitcode::encode(&WireBlueprint::from_root(root, options));
    let flags = if options.include_media { FLAG_MEDIA } else { 0 };

    let mut out = Vec::with_capacity(HEADER_SIZE + payload.len());
    out.extend_from_slice(&MAGIC);
    out.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
    out.extend_from_slice(&flags.to_le_bytes());
    out.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    out.extend_from_slice(&xxh32(&payload, XXHASH_SEED).to_le_bytes());
    out.extend_from_slice(&payload);
    out
}

/// Decode a blueprint, verifying the header and checksum
///
/// A decode error means nothing from `bytes` is usable.
pub fn decode(bytes: &[u8]) -> Result<BlueprintRoot, DecodeError> {
    if bytes.len() < HEADER_SIZE {
        if bytes.len() >= 4 && bytes[..4] != MAGIC {
            return Err(DecodeError::BadMagic);
        }
        return Err(DecodeError::Truncated {
            offset: bytes.len(),
            needed: HEADER_SIZE - bytes.len(),
        });
    }
    if bytes[..4] != MAGIC {
        return Err(DecodeError::BadMagic);
    }

    let version = read_u32(bytes, 4);
    if version > FORMAT_VERSION {
        return Err(DecodeError::UnsupportedVersion {
            found: version,
            supported: FORMAT_VERSION,
        });
    }
    let flags = read_u32(bytes, 8);
    let payload_len = read_u32(bytes, 12) as usize;
    let expected = read_u32(bytes, 16);

    let body = &bytes[HEADER_SIZE..];
    if body.len() < payload_len {
        return Err(DecodeError::Truncated {
            offset: bytes.len(),
            needed: payload_len - body.len(),
        });
    }
    if body.len() > payload_len {
        return Err(DecodeError::TrailingBytes(body.len() - payload_len));
    }
    let found = xxh32(body, XXHASH_SEED);
    if found != expected {
        return Err(DecodeError::ChecksumMismatch { expected, found });
    }

    let wire: WireBlueprint = bitcode::decode(body)?;
    if wire.media.is_some() != (flags & FLAG_MEDIA != 0) {
        return Err(DecodeError::MediaFlagMismatch);
    }
    Ok(wire.into_root())
}

/// Little-endian u32 at `offset`; callers have checked the header length.
fn read_u32(bytes: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([
        bytes[offset],
        bytes[offset + 1],
        bytes[offset + 2],
        bytes[offset + 3],
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_blueprint() -> BlueprintRoot {
        let mut root = BlueprintRoot::new("Watchtower");
        root.author = Some("Builder".to_string());
        root.category = Some("Defense".to_string());
        root.box_rotation = Vec3::new(0.0, 90.0, 0.0);
        root.objects.push(
            BlueprintObject::new("stone_floor", Vec3::ZERO, Vec3::ZERO).with_state(vec![9, 8, 7]),
        );
        root.objects.push(BlueprintObject::new(
            EntityIdentifier::from_hash(-77),
            Vec3::new(1.5, 2.0, -0.25),
            Vec3::new(0.0, 180.0, 0.0),
        ));
        root.icon = Some(vec![1, 2]);
        root.previews = vec![vec![3, 4, 5], vec![6]];
        root
    }

    #[test]
    fn test_full_round_trip() {
        let root = make_blueprint();
        let decoded = decode(&encode(&root, BinaryOptions::FULL)).unwrap();

        assert_eq!(decoded, root);
        assert!(decoded.objects[0].id.is_string());
        assert_eq!(decoded.objects[0].id.name(), Some("stone_floor"));
        assert!(!decoded.objects[1].id.is_string());
    }

    #[test]
    fn test_lean_drops_media() {
        let root = make_blueprint();
        let decoded = decode(&encode(&root, BinaryOptions::LEAN)).unwrap();

        assert!(decoded.icon.is_none());
        assert!(decoded.previews.is_empty());
        assert_eq!(decoded.objects, root.objects);
    }

    #[test]
    fn test_header_layout() {
        let bytes = encode(&make_blueprint(), BinaryOptions::FULL);
        assert_eq!(&bytes[0..4], b"BPRT");
        assert_eq!(u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]), FORMAT_VERSION);
        let payload_len = u32::from_le_bytes([bytes[12], bytes[13], bytes[14], bytes[15]]) as usize;
        assert_eq!(payload_len, bytes.len() - HEADER_SIZE);
    }

    #[test]
    fn test_truncated_stream_fails() {
        let bytes = encode(&make_blueprint(), BinaryOptions::FULL);
        for cut in [3, HEADER_SIZE - 1, HEADER_SIZE + 5, bytes.len() - 1] {
            assert!(
                matches!(decode(&bytes[..cut]), Err(DecodeError::Truncated { .. })),
                "cut at {}",
                cut
            );
        }
    }

    #[test]
    fn test_corruption_detected() {
        let mut bytes = encode(&make_blueprint(), BinaryOptions::FULL);
        let last = bytes.len() - 1;
        bytes[last] ^= 0xFF;
        assert!(matches!(
            decode(&bytes),
            Err(DecodeError::ChecksumMismatch { .. })
        ));
    }

    #[test]
    fn test_bad_magic() {
        assert_eq!(decode(b"NOPE0000000000000000"), Err(DecodeError::BadMagic));
    }

    #[test]
    fn test_newer_version_rejected() {
        let mut bytes = encode(&make_blueprint(), BinaryOptions::FULL);
        bytes[4..8].copy_from_slice(&(FORMAT_VERSION + 1).to_le_bytes());
        assert!(matches!(
            decode(&bytes),
            Err(DecodeError::UnsupportedVersion { .. })
        ));
    }

    #[test]
    fn test_media_flag_must_match_payload() {
        let mut bytes = encode(&make_blueprint(), BinaryOptions::LEAN);
        bytes[8..12].copy_from_slice(&FLAG_MEDIA.to_le_bytes());
        assert_eq!(decode(&bytes), Err(DecodeError::MediaFlagMismatch));
    }

    #[test]
    fn test_malformed_payload_with_valid_checksum() {
        let payload: [u8; 0] = [];
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&MAGIC);
        bytes.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
        bytes.extend_from_slice(&0u32.to_le_bytes());
        bytes.extend_from_slice(&(payload.len() as u32).to_le_bytes());
        bytes.extend_from_slice(&xxh32(&payload, XXHASH_SEED).to_le_bytes());
        bytes.extend_from_slice(&payload);

        assert!(matches!(decode(&bytes), Err(DecodeError::Payload(_))));
    }

    #[test]
    fn test_identifier_variant_survives() {
        let mut root = BlueprintRoot::new("Odd");
        root.objects
            .push(BlueprintObject::new("12345", Vec3::ZERO, Vec3::ZERO));
        let decoded = decode(&encode(&root, BinaryOptions::LEAN)).unwrap();
        assert_eq!(decoded.objects[0].id.name(), Some("12345"));
    }
}
