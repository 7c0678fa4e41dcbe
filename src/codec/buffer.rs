//! Append-only byte sink and immutable read cursor.
//!
//! Every object kind serializes by appending its fields in a fixed order to a
//! [`MutableBuffer`]; [`Buffer`] reads them back in the same order.

use byteorder::{ByteOrder, LittleEndian, WriteBytesExt};

use crate::util::{Error, Result, Vec2, Vec3, Vec4};

// ============================================================================
// MutableBuffer
// ============================================================================

/// Growable little-endian byte sink.
#[derive(Debug, Default, Clone)]
pub struct MutableBuffer {
    data: Vec<u8>,
}

impl MutableBuffer {
    /// Create an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty buffer with reserved capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self { data: Vec::with_capacity(capacity) }
    }

    /// Number of bytes written so far.
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Written bytes.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    fn reserve(&mut self, additional: usize) -> Result<()> {
        self.data
            .try_reserve(additional)
            .map_err(|e| Error::AllocationFailure(e.to_string()))
    }

    /// Write a single byte.
    pub fn write_byte(&mut self, value: u8) -> Result<()> {
        self.reserve(1)?;
        self.data.write_u8(value)?;
        Ok(())
    }

    /// Write an i16 value (little-endian).
    pub fn write_i16(&mut self, value: i16) -> Result<()> {
        self.reserve(2)?;
        self.data.write_i16::<LittleEndian>(value)?;
        Ok(())
    }

    /// Write a u16 value (little-endian).
    pub fn write_u16(&mut self, value: u16) -> Result<()> {
        self.reserve(2)?;
        self.data.write_u16::<LittleEndian>(value)?;
        Ok(())
    }

    /// Write an i32 value (little-endian).
    pub fn write_i32(&mut self, value: i32) -> Result<()> {
        self.reserve(4)?;
        self.data.write_i32::<LittleEndian>(value)?;
        Ok(())
    }

    /// Write a u32 value (little-endian).
    pub fn write_u32(&mut self, value: u32) -> Result<()> {
        self.reserve(4)?;
        self.data.write_u32::<LittleEndian>(value)?;
        Ok(())
    }

    /// Write an f32 value (little-endian).
    pub fn write_f32(&mut self, value: f32) -> Result<()> {
        self.reserve(4)?;
        self.data.write_f32::<LittleEndian>(value)?;
        Ok(())
    }

    pub fn write_vec2(&mut self, value: Vec2) -> Result<()> {
        self.write_f32(value.x)?;
        self.write_f32(value.y)
    }

    pub fn write_vec3(&mut self, value: Vec3) -> Result<()> {
        self.write_f32(value.x)?;
        self.write_f32(value.y)?;
        self.write_f32(value.z)
    }

    pub fn write_vec4(&mut self, value: Vec4) -> Result<()> {
        self.write_vec3(value.truncate())?;
        self.write_f32(value.w)
    }

    /// Write raw bytes.
    pub fn write_byte_array(&mut self, bytes: &[u8]) -> Result<()> {
        self.reserve(bytes.len())?;
        self.data.extend_from_slice(bytes);
        Ok(())
    }

    /// Write a signed index with the given byte width (1, 2 or 4).
    ///
    /// A null index is stored as all ones for the narrow widths.
    pub fn write_index(&mut self, value: i32, width: u8) -> Result<()> {
        match width {
            1 => self.write_byte(value as i8 as u8),
            2 => self.write_i16(value as i16),
            4 => self.write_i32(value),
            _ => Err(Error::invalid(format!("index width {width}"))),
        }
    }

    /// Write an unsigned vertex index with the given byte width.
    pub fn write_vertex_index(&mut self, value: u32, width: u8) -> Result<()> {
        match width {
            1 => self.write_byte(value as u8),
            2 => self.write_u16(value as u16),
            4 => self.write_u32(value),
            _ => Err(Error::invalid(format!("vertex index width {width}"))),
        }
    }

    /// Freeze the written bytes into an immutable [`Buffer`].
    pub fn into_buffer(self) -> Buffer {
        Buffer::new(self.data)
    }
}

// ============================================================================
// Buffer
// ============================================================================

/// Immutable byte buffer with a forward read cursor.
#[derive(Debug, Clone)]
pub struct Buffer {
    data: Vec<u8>,
    offset: usize,
}

impl Buffer {
    /// Create a buffer over owned bytes.
    pub fn new(data: Vec<u8>) -> Self {
        Self { data, offset: 0 }
    }

    /// Create a buffer copying a byte slice.
    pub fn from_slice(bytes: &[u8]) -> Self {
        Self::new(bytes.to_vec())
    }

    /// Current read offset.
    #[inline]
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Total length.
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Bytes left to read.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.data.len() - self.offset
    }

    #[inline]
    pub fn is_end(&self) -> bool {
        self.remaining() == 0
    }

    /// Whole underlying byte slice.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Take `len` bytes and advance.
    pub fn read_bytes(&mut self, len: usize) -> Result<&[u8]> {
        if len > self.remaining() {
            return Err(Error::UnexpectedEof(self.offset));
        }
        let start = self.offset;
        self.offset += len;
        Ok(&self.data[start..start + len])
    }

    pub fn read_byte(&mut self) -> Result<u8> {
        Ok(self.read_bytes(1)?[0])
    }

    pub fn read_i16(&mut self) -> Result<i16> {
        Ok(LittleEndian::read_i16(self.read_bytes(2)?))
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        Ok(LittleEndian::read_u16(self.read_bytes(2)?))
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        Ok(LittleEndian::read_i32(self.read_bytes(4)?))
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        Ok(LittleEndian::read_u32(self.read_bytes(4)?))
    }

    pub fn read_f32(&mut self) -> Result<f32> {
        Ok(LittleEndian::read_f32(self.read_bytes(4)?))
    }

    /// Read an f32 clamped to `[0, 1]`.
    pub fn read_clamped_f32(&mut self) -> Result<f32> {
        Ok(self.read_f32()?.clamp(0.0, 1.0))
    }

    pub fn read_vec2(&mut self) -> Result<Vec2> {
        Ok(Vec2::new(self.read_f32()?, self.read_f32()?))
    }

    pub fn read_vec3(&mut self) -> Result<Vec3> {
        Ok(Vec3::new(self.read_f32()?, self.read_f32()?, self.read_f32()?))
    }

    pub fn read_vec4(&mut self) -> Result<Vec4> {
        Ok(Vec4::new(
            self.read_f32()?,
            self.read_f32()?,
            self.read_f32()?,
            self.read_f32()?,
        ))
    }

    /// Read a non-negative i32 length.
    pub fn read_length(&mut self) -> Result<usize> {
        let value = self.read_i32()?;
        if value < 0 {
            return Err(Error::invalid(format!(
                "negative length {value} at offset {}",
                self.offset - 4
            )));
        }
        let len = value as usize;
        // every element takes at least one byte
        if len > self.remaining() {
            return Err(Error::UnexpectedEof(self.offset));
        }
        Ok(len)
    }

    /// Read a signed object index of the given width.
    ///
    /// Narrow widths are sign-extended. Every negative value means null and
    /// comes back as -1.
    pub fn read_index(&mut self, width: u8) -> Result<i32> {
        let value = match width {
            1 => self.read_byte()? as i8 as i32,
            2 => self.read_u16()? as i16 as i32,
            4 => self.read_i32()?,
            _ => return Err(Error::invalid(format!("index width {width}"))),
        };
        Ok(value.max(-1))
    }

    /// Read an unsigned vertex index of the given width.
    pub fn read_vertex_index(&mut self, width: u8) -> Result<u32> {
        match width {
            1 => Ok(self.read_byte()? as u32),
            2 => Ok(self.read_u16()? as u32),
            4 => Ok(self.read_u32()?),
            _ => Err(Error::invalid(format!("vertex index width {width}"))),
        }
    }
}

impl From<MutableBuffer> for Buffer {
    fn from(value: MutableBuffer) -> Self {
        value.into_buffer()
    }
}
