//! PMX format constants and header structures.

use serde::{Deserialize, Serialize};

use crate::util::{Error, Result};

/// Signature at the start of a PMX file.
pub const PMX_SIGNATURE: &[u8; 4] = b"PMX ";

/// Number of info bytes written after the version.
pub const INFO_LENGTH: u8 = 8;

/// Highest additional uv count a vertex may carry.
pub const MAX_ADDITIONAL_UV: u8 = 4;

/// Label item type tags.
pub const LABEL_ITEM_BONE: u8 = 0;
pub const LABEL_ITEM_MORPH: u8 = 1;

/// Text encoding of every string in the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Codec {
    #[default]
    Utf16,
    Utf8,
}

impl Codec {
    pub fn from_u8(value: u8) -> Result<Self> {
        match value {
            0 => Ok(Self::Utf16),
            1 => Ok(Self::Utf8),
            _ => Err(Error::invalid(format!("unknown codec {value}"))),
        }
    }

    pub fn as_u8(self) -> u8 {
        match self {
            Self::Utf16 => 0,
            Self::Utf8 => 1,
        }
    }

    /// Encode a string into file bytes.
    pub fn encode(self, value: &str) -> Vec<u8> {
        match self {
            Self::Utf8 => value.as_bytes().to_vec(),
            Self::Utf16 => value.encode_utf16().flat_map(u16::to_le_bytes).collect(),
        }
    }

    /// Decode file bytes into a string.
    pub fn decode(self, bytes: &[u8]) -> Result<String> {
        match self {
            Self::Utf8 => Ok(String::from_utf8(bytes.to_vec())?),
            Self::Utf16 => {
                if bytes.len() % 2 != 0 {
                    return Err(Error::invalid(format!("odd UTF-16 byte length {}", bytes.len())));
                }
                let units: Vec<u16> = bytes
                    .chunks_exact(2)
                    .map(|c| u16::from_le_bytes([c[0], c[1]]))
                    .collect();
                Ok(String::from_utf16(&units)?)
            }
        }
    }
}

/// Byte widths of the index kinds stored in the header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexWidths {
    pub vertex: u8,
    pub texture: u8,
    pub material: u8,
    pub bone: u8,
    pub morph: u8,
    pub rigid_body: u8,
}

impl IndexWidths {
    /// Widths able to address sequences of the given lengths.
    pub fn for_counts(
        vertices: usize,
        textures: usize,
        materials: usize,
        bones: usize,
        morphs: usize,
        rigid_bodies: usize,
    ) -> Self {
        Self {
            vertex: vertex_index_width(vertices),
            texture: object_index_width(textures),
            material: object_index_width(materials),
            bone: object_index_width(bones),
            morph: object_index_width(morphs),
            rigid_body: object_index_width(rigid_bodies),
        }
    }

    pub fn to_bytes(self) -> [u8; 6] {
        [self.vertex, self.texture, self.material, self.bone, self.morph, self.rigid_body]
    }

    pub fn from_bytes(bytes: [u8; 6]) -> Result<Self> {
        for &width in &bytes {
            if !matches!(width, 1 | 2 | 4) {
                return Err(Error::invalid(format!("index width {width}")));
            }
        }
        Ok(Self {
            vertex: bytes[0],
            texture: bytes[1],
            material: bytes[2],
            bone: bytes[3],
            morph: bytes[4],
            rigid_body: bytes[5],
        })
    }
}

/// Unsigned vertex index width for a vertex count.
#[inline]
pub const fn vertex_index_width(count: usize) -> u8 {
    if count < 0x100 {
        1
    } else if count < 0x10000 {
        2
    } else {
        4
    }
}

/// Signed object index width for a sequence length.
#[inline]
pub const fn object_index_width(count: usize) -> u8 {
    if count < 0x80 {
        1
    } else if count < 0x8000 {
        2
    } else {
        4
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_widths() {
        assert_eq!(vertex_index_width(255), 1);
        assert_eq!(vertex_index_width(256), 2);
        assert_eq!(vertex_index_width(70000), 4);
        assert_eq!(object_index_width(127), 1);
        assert_eq!(object_index_width(128), 2);
        assert_eq!(object_index_width(40000), 4);
    }

    #[test]
    fn test_codec_strings() {
        for codec in [Codec::Utf16, Codec::Utf8] {
            let bytes = codec.encode("全ての親");
            assert_eq!(codec.decode(&bytes).unwrap(), "全ての親");
        }
        assert_eq!(Codec::Utf16.encode("a"), vec![b'a', 0]);
        assert!(Codec::Utf16.decode(&[0x61]).is_err());
    }
}
