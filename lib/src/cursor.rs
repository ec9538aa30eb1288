//! Bounds-checked reads over a borrowed byte region.
//!
//! Firmware tables arrive as raw memory. Instead of casting pointers to packed
//! structs and trusting length fields, both table readers walk the region with
//! a [`ByteCursor`]: every read checks the remaining length first and fails
//! with [`GicError::Truncated`] rather than touching memory past the slice.
//!
//! ACPI structures are little-endian; devicetree cells are big-endian 32-bit
//! words, high word first. The cursor offers both.

use gicmap_abi::{GicError, GicResult};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Endian {
    Little,
    Big,
}

#[derive(Clone, Copy, Debug)]
pub struct ByteCursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteCursor<'a> {
    #[inline]
    pub const fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Cursor positioned at `pos`, which may equal `data.len()`.
    pub fn at(data: &'a [u8], pos: usize) -> GicResult<Self> {
        if pos > data.len() {
            return Err(GicError::Truncated { offset: pos });
        }
        Ok(Self { data, pos })
    }

    #[inline]
    pub fn position(&self) -> usize {
        self.pos
    }

    #[inline]
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    #[inline]
    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    pub fn seek(&mut self, pos: usize) -> GicResult {
        if pos > self.data.len() {
            return Err(GicError::Truncated { offset: pos });
        }
        self.pos = pos;
        Ok(())
    }

    pub fn skip(&mut self, count: usize) -> GicResult {
        let end = self
            .pos
            .checked_add(count)
            .ok_or(GicError::Truncated { offset: self.pos })?;
        self.seek(end)
    }

    /// Advance to the next multiple of `align` (a power of two).
    pub fn align(&mut self, align: usize) -> GicResult {
        debug_assert!(align.is_power_of_two());
        let aligned = self
            .pos
            .checked_add(align - 1)
            .ok_or(GicError::Truncated { offset: self.pos })?
            & !(align - 1);
        self.seek(aligned)
    }

    pub fn read_bytes(&mut self, count: usize) -> GicResult<&'a [u8]> {
        let end = self
            .pos
            .checked_add(count)
            .filter(|&end| end <= self.data.len())
            .ok_or(GicError::Truncated { offset: self.pos })?;
        let bytes = &self.data[self.pos..end];
        self.pos = end;
        Ok(bytes)
    }

    fn read_array<const N: usize>(&mut self) -> GicResult<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.read_bytes(N)?);
        Ok(out)
    }

    pub fn read_u8(&mut self) -> GicResult<u8> {
        Ok(self.read_array::<1>()?[0])
    }

    pub fn read_u16(&mut self, endian: Endian) -> GicResult<u16> {
        let raw = self.read_array::<2>()?;
        Ok(match endian {
            Endian::Little => u16::from_le_bytes(raw),
            Endian::Big => u16::from_be_bytes(raw),
        })
    }

    pub fn read_u32(&mut self, endian: Endian) -> GicResult<u32> {
        let raw = self.read_array::<4>()?;
        Ok(match endian {
            Endian::Little => u32::from_le_bytes(raw),
            Endian::Big => u32::from_be_bytes(raw),
        })
    }

    pub fn read_u64(&mut self, endian: Endian) -> GicResult<u64> {
        let raw = self.read_array::<8>()?;
        Ok(match endian {
            Endian::Little => u64::from_le_bytes(raw),
            Endian::Big => u64::from_be_bytes(raw),
        })
    }

    #[inline]
    pub fn read_u16_le(&mut self) -> GicResult<u16> {
        self.read_u16(Endian::Little)
    }

    #[inline]
    pub fn read_u32_le(&mut self) -> GicResult<u32> {
        self.read_u32(Endian::Little)
    }

    #[inline]
    pub fn read_u64_le(&mut self) -> GicResult<u64> {
        self.read_u64(Endian::Little)
    }

    #[inline]
    pub fn read_u32_be(&mut self) -> GicResult<u32> {
        self.read_u32(Endian::Big)
    }

    /// Read a devicetree value spanning `cells` big-endian 32-bit words.
    ///
    /// Only 1- and 2-cell values are representable in 64 bits.
    pub fn read_cells(&mut self, cells: u32) -> GicResult<u64> {
        match cells {
            1 => Ok(u64::from(self.read_u32_be()?)),
            2 => {
                let high = u64::from(self.read_u32_be()?);
                let low = u64::from(self.read_u32_be()?);
                Ok((high << 32) | low)
            }
            _ => Err(GicError::CellsOutOfRange {
                name: "cell count",
                cells,
            }),
        }
    }

    /// Read a NUL-terminated string, consuming the terminator.
    ///
    /// The returned slice excludes the NUL.
    pub fn read_cstr(&mut self) -> GicResult<&'a [u8]> {
        let rest = &self.data[self.pos..];
        let len = rest
            .iter()
            .position(|&b| b == 0)
            .ok_or(GicError::Truncated {
                offset: self.data.len(),
            })?;
        let s = &rest[..len];
        self.pos += len + 1;
        Ok(s)
    }
}
