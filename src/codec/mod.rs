//! Low-level PMX binary format implementation.
//!
//! PMX is a little-endian format of length-prefixed blocks. Every
//! cross-reference is stored as a signed position of a width chosen per kind
//! in the header, so the writer recomputes positions from the current order.
//!
//! ## File Structure
//!
//! ```text
//! +--------------------+
//! | Magic: "PMX "      |  4 bytes
//! +--------------------+
//! | Version            |  f32 (2.0 or 2.1)
//! +--------------------+
//! | Info length        |  1 byte (8)
//! | Codec, extra uvs   |  2 bytes
//! | Index widths       |  6 bytes (1, 2 or 4 each)
//! +--------------------+
//! | Names, comments    |  i32 length + encoded text, x4
//! +--------------------+
//! | Vertices ... Joints|  i32 count + records, per block
//! +--------------------+
//! | Soft bodies        |  2.1 only
//! +--------------------+
//! ```

mod buffer;
mod format;
mod reader;
mod writer;

pub use buffer::*;
pub use format::*;
pub use reader::*;
pub use writer::*;
