use gicmap_abi::GicResult;
use gicmap_lib::{ByteCursor, klog_info};

/// Size of the common system description table header.
pub const SDT_HEADER_LEN: usize = 36;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SdtHeader {
    pub signature: [u8; 4],
    pub length: u32,
    pub revision: u8,
    pub checksum: u8,
    pub oem_id: [u8; 6],
    pub oem_table_id: [u8; 8],
    pub oem_revision: u32,
    pub creator_id: u32,
    pub creator_revision: u32,
}

fn read_array<const N: usize>(cur: &mut ByteCursor<'_>) -> GicResult<[u8; N]> {
    let mut out = [0u8; N];
    out.copy_from_slice(cur.read_bytes(N)?);
    Ok(out)
}

impl SdtHeader {
    /// Decode the header at the start of `data`.
    ///
    /// Only the header bytes are read; `length` is reported as declared and
    /// is not checked against `data`.
    pub fn parse(data: &[u8]) -> GicResult<Self> {
        let mut cur = ByteCursor::new(data);
        Ok(Self {
            signature: read_array(&mut cur)?,
            length: cur.read_u32_le()?,
            revision: cur.read_u8()?,
            checksum: cur.read_u8()?,
            oem_id: read_array(&mut cur)?,
            oem_table_id: read_array(&mut cur)?,
            oem_revision: cur.read_u32_le()?,
            creator_id: cur.read_u32_le()?,
            creator_revision: cur.read_u32_le()?,
        })
    }
}

/// Byte sum modulo 256. A valid table sums to zero.
pub fn checksum(data: &[u8]) -> u8 {
    data.iter().fold(0u8, |sum, &b| sum.wrapping_add(b))
}

/// True when the declared length fits in `data` and the declared bytes sum to
/// zero.
pub fn validate_table(data: &[u8]) -> bool {
    let Ok(header) = SdtHeader::parse(data) else {
        return false;
    };
    let length = header.length as usize;
    if length < SDT_HEADER_LEN || length > data.len() {
        return false;
    }
    checksum(&data[..length]) == 0
}

/// Find the first table carrying `signature` among already-mapped tables.
///
/// A checksum mismatch is reported but the table is still returned; the
/// readers trust the declared header.
pub fn find_table<'a>(tables: &[&'a [u8]], signature: &[u8; 4]) -> Option<&'a [u8]> {
    let table = tables.iter().copied().find(|table| {
        SdtHeader::parse(table).is_ok_and(|header| header.signature == *signature)
    })?;
    if !validate_table(table) {
        klog_info!(
            "ACPI: table {} has an invalid checksum",
            core::str::from_utf8(signature).unwrap_or("????")
        );
    }
    Some(table)
}
