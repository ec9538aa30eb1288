//! Synthetic firmware images for the harness suites.
//!
//! Both builders write into a fixed `[u8; N]` so they work without an
//! allocator. Writing past `N` sets a sticky overflow flag and `finish()`
//! returns `None` instead of a truncated image.

const MADT_HEADER_LEN: usize = 44;
const MADT_LENGTH_OFFSET: usize = 4;
const MADT_CHECKSUM_OFFSET: usize = 9;

const FDT_MAGIC: u32 = 0xd00d_feed;
const FDT_HEADER_LEN: usize = 40;
const FDT_RSVMAP_LEN: usize = 16;
const FDT_BEGIN_NODE: u32 = 1;
const FDT_END_NODE: u32 = 2;
const FDT_PROP: u32 = 3;
const FDT_END: u32 = 9;

struct FixedBuf<const N: usize> {
    bytes: [u8; N],
    len: usize,
    overflow: bool,
}

impl<const N: usize> FixedBuf<N> {
    const fn new() -> Self {
        Self {
            bytes: [0; N],
            len: 0,
            overflow: false,
        }
    }

    fn push(&mut self, data: &[u8]) {
        match self.bytes.get_mut(self.len..self.len + data.len()) {
            Some(dst) => {
                dst.copy_from_slice(data);
                self.len += data.len();
            }
            None => self.overflow = true,
        }
    }

    fn pad_to(&mut self, align: usize) {
        while self.len % align != 0 && !self.overflow {
            self.push(&[0]);
        }
    }

    fn as_slice(&self) -> &[u8] {
        &self.bytes[..self.len]
    }
}

/// MADT image with a valid header and checksum.
pub struct MadtImage<const N: usize> {
    buf: FixedBuf<N>,
}

impl<const N: usize> Default for MadtImage<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> MadtImage<N> {
    pub fn new() -> Self {
        let mut buf = FixedBuf::new();
        buf.push(b"APIC");
        buf.push(&0u32.to_le_bytes());
        buf.push(&[5, 0]);
        buf.push(b"GICMAP");
        buf.push(b"SYNTHMDT");
        buf.push(&1u32.to_le_bytes());
        buf.push(b"GMAP");
        buf.push(&1u32.to_le_bytes());
        // Local interrupt controller address and flags.
        buf.push(&0u32.to_le_bytes());
        buf.push(&0u32.to_le_bytes());
        Self { buf }
    }

    /// Append a record of `entry_type` whose body follows the two-byte header.
    pub fn raw(&mut self, entry_type: u8, body: &[u8]) -> &mut Self {
        self.buf.push(&[entry_type, (body.len() + 2) as u8]);
        self.buf.push(body);
        self
    }

    pub fn gicc(
        &mut self,
        cpu_interface: u32,
        physical_base: u64,
        gicr_base: u64,
        mpidr: u64,
    ) -> &mut Self {
        self.gicc_full(cpu_interface, physical_base, 0, gicr_base, mpidr, 25)
    }

    pub fn gicc_full(
        &mut self,
        cpu_interface: u32,
        physical_base: u64,
        gich_base: u64,
        gicr_base: u64,
        mpidr: u64,
        maintenance_gsiv: u32,
    ) -> &mut Self {
        let mut body = [0u8; 78];
        body[2..6].copy_from_slice(&cpu_interface.to_le_bytes());
        body[6..10].copy_from_slice(&cpu_interface.to_le_bytes());
        // Enabled.
        body[10..14].copy_from_slice(&1u32.to_le_bytes());
        body[30..38].copy_from_slice(&physical_base.to_le_bytes());
        body[46..54].copy_from_slice(&gich_base.to_le_bytes());
        body[54..58].copy_from_slice(&maintenance_gsiv.to_le_bytes());
        body[58..66].copy_from_slice(&gicr_base.to_le_bytes());
        body[66..74].copy_from_slice(&mpidr.to_le_bytes());
        self.raw(0x0B, &body)
    }

    pub fn gicd(&mut self, base: u64, version: u8) -> &mut Self {
        let mut body = [0u8; 22];
        body[6..14].copy_from_slice(&base.to_le_bytes());
        body[18] = version;
        self.raw(0x0C, &body)
    }

    pub fn msi_frame(&mut self, id: u32, base: u64, spi_base: u16, spi_count: u16) -> &mut Self {
        let mut body = [0u8; 22];
        body[2..6].copy_from_slice(&id.to_le_bytes());
        body[6..14].copy_from_slice(&base.to_le_bytes());
        body[14..18].copy_from_slice(&1u32.to_le_bytes());
        body[18..20].copy_from_slice(&spi_count.to_le_bytes());
        body[20..22].copy_from_slice(&spi_base.to_le_bytes());
        self.raw(0x0D, &body)
    }

    pub fn gicr(&mut self, base: u64, length: u32) -> &mut Self {
        let mut body = [0u8; 14];
        body[2..10].copy_from_slice(&base.to_le_bytes());
        body[10..14].copy_from_slice(&length.to_le_bytes());
        self.raw(0x0E, &body)
    }

    pub fn its(&mut self, id: u32, base: u64) -> &mut Self {
        let mut body = [0u8; 18];
        body[2..6].copy_from_slice(&id.to_le_bytes());
        body[6..14].copy_from_slice(&base.to_le_bytes());
        self.raw(0x0F, &body)
    }

    /// Bytes written so far, header included.
    pub fn len(&self) -> usize {
        self.buf.len
    }

    pub fn is_empty(&self) -> bool {
        self.buf.len == 0
    }

    /// Seal the header with the real length.
    pub fn finish(&mut self) -> Option<&[u8]> {
        let len = self.buf.len as u32;
        self.finish_with_length(len)
    }

    /// Seal the header with a declared length that may disagree with the
    /// bytes actually written.
    pub fn finish_with_length(&mut self, declared: u32) -> Option<&[u8]> {
        if self.buf.overflow || self.buf.len < MADT_HEADER_LEN {
            return None;
        }
        self.buf.bytes[MADT_LENGTH_OFFSET..MADT_LENGTH_OFFSET + 4]
            .copy_from_slice(&declared.to_le_bytes());
        self.buf.bytes[MADT_CHECKSUM_OFFSET] = 0;
        let sum = self
            .buf
            .as_slice()
            .iter()
            .fold(0u8, |acc, b| acc.wrapping_add(*b));
        self.buf.bytes[MADT_CHECKSUM_OFFSET] = 0u8.wrapping_sub(sum);
        Some(self.buf.as_slice())
    }
}

/// Flattened devicetree image (version 17).
///
/// `S` bounds the structure block, `T` the strings block and `N` the
/// assembled blob.
pub struct DtbImage<const N: usize, const S: usize = 2048, const T: usize = 512> {
    structs: FixedBuf<S>,
    strings: FixedBuf<T>,
    out: FixedBuf<N>,
}

impl<const N: usize, const S: usize, const T: usize> Default for DtbImage<N, S, T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize, const S: usize, const T: usize> DtbImage<N, S, T> {
    pub fn new() -> Self {
        Self {
            structs: FixedBuf::new(),
            strings: FixedBuf::new(),
            out: FixedBuf::new(),
        }
    }

    fn word(&mut self, value: u32) {
        self.structs.push(&value.to_be_bytes());
    }

    /// Offset of `name` in the strings block, appending it if new.
    fn string_offset(&mut self, name: &str) -> u32 {
        let mut offset = 0;
        for existing in self.strings.as_slice().split(|&b| b == 0) {
            if existing == name.as_bytes() && offset < self.strings.len {
                return offset as u32;
            }
            offset += existing.len() + 1;
        }
        let offset = self.strings.len as u32;
        self.strings.push(name.as_bytes());
        self.strings.push(&[0]);
        offset
    }

    pub fn begin_node(&mut self, name: &str) -> &mut Self {
        self.word(FDT_BEGIN_NODE);
        self.structs.push(name.as_bytes());
        self.structs.push(&[0]);
        self.structs.pad_to(4);
        self
    }

    pub fn end_node(&mut self) -> &mut Self {
        self.word(FDT_END_NODE);
        self
    }

    pub fn prop(&mut self, name: &str, value: &[u8]) -> &mut Self {
        let name_off = self.string_offset(name);
        self.word(FDT_PROP);
        self.word(value.len() as u32);
        self.word(name_off);
        self.structs.push(value);
        self.structs.pad_to(4);
        self
    }

    pub fn prop_cells(&mut self, name: &str, cells: &[u32]) -> &mut Self {
        let name_off = self.string_offset(name);
        self.word(FDT_PROP);
        self.word((cells.len() * 4) as u32);
        self.word(name_off);
        for cell in cells {
            self.word(*cell);
        }
        self
    }

    pub fn prop_u32(&mut self, name: &str, value: u32) -> &mut Self {
        self.prop_cells(name, &[value])
    }

    /// String property; a single value needs no trailing NUL from the caller.
    pub fn prop_str(&mut self, name: &str, value: &str) -> &mut Self {
        let name_off = self.string_offset(name);
        self.word(FDT_PROP);
        self.word(value.len() as u32 + 1);
        self.word(name_off);
        self.structs.push(value.as_bytes());
        self.structs.push(&[0]);
        self.structs.pad_to(4);
        self
    }

    pub fn finish(&mut self) -> Option<&[u8]> {
        self.word(FDT_END);
        if self.structs.overflow || self.strings.overflow {
            return None;
        }
        let off_struct = FDT_HEADER_LEN + FDT_RSVMAP_LEN;
        let off_strings = off_struct + self.structs.len;
        let total = off_strings + self.strings.len;
        let header = [
            FDT_MAGIC,
            total as u32,
            off_struct as u32,
            off_strings as u32,
            FDT_HEADER_LEN as u32,
            17,
            16,
            0,
            self.strings.len as u32,
            self.structs.len as u32,
        ];
        self.out.len = 0;
        for word in header {
            self.out.push(&word.to_be_bytes());
        }
        self.out.push(&[0; FDT_RSVMAP_LEN]);
        self.out.push(self.structs.as_slice());
        self.out.push(self.strings.as_slice());
        if self.out.overflow {
            return None;
        }
        Some(self.out.as_slice())
    }
}
