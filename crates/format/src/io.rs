//! Little-endian integer framing shared by the block, SSTable, and metadata
//! file formats, so all three wire formats read and write through one place
//! instead of three hand-rolled copies.

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{self, Read, Write};

pub fn write_u64<W: Write>(w: &mut W, v: u64) -> io::Result<()> {
    w.write_u64::<LittleEndian>(v)
}

pub fn read_u64<R: Read>(r: &mut R) -> io::Result<u64> {
    r.read_u64::<LittleEndian>()
}

pub fn write_u32<W: Write>(w: &mut W, v: u32) -> io::Result<()> {
    w.write_u32::<LittleEndian>(v)
}

pub fn read_u32<R: Read>(r: &mut R) -> io::Result<u32> {
    r.read_u32::<LittleEndian>()
}

pub fn write_u8<W: Write>(w: &mut W, v: u8) -> io::Result<()> {
    w.write_u8(v)
}

pub fn read_u8<R: Read>(r: &mut R) -> io::Result<u8> {
    r.read_u8()
}

/// Writes `[len: u64][bytes]`.
pub fn write_bytes<W: Write>(w: &mut W, bytes: &[u8]) -> io::Result<()> {
    write_u64(w, bytes.len() as u64)?;
    w.write_all(bytes)
}

/// Reads a `[len: u64][bytes]` record written by [`write_bytes`].
pub fn read_bytes<R: Read>(r: &mut R) -> io::Result<Vec<u8>> {
    let len = read_u64(r)? as usize;
    let mut buf = vec![0u8; len];
    r.read_exact(&mut buf)?;
    Ok(buf)
}
