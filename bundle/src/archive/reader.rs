//! Independent archive parser: the trust boundary for third-party verification.
//!
//! Parses an opaque byte buffer into borrowed entries without decompressing
//! anything. Every structural violation produces a typed [`ArchiveError`]
//! naming the failing check; there is no partial success.
//!
//! The recorded CRC-32 is surfaced but not enforced here. Content integrity is
//! the verifier's job, which reports tampering as a digest mismatch naming
//! the artifact.

use std::collections::HashSet;

use super::{
    CENTRAL_HEADER_LEN, CENTRAL_HEADER_SIGNATURE, EOCD_LEN, EOCD_SIGNATURE, FLAG_ENCRYPTED,
    LOCAL_HEADER_LEN, LOCAL_HEADER_SIGNATURE, MAX_COMMENT_LEN, METHOD_STORED, ZIP64_SENTINEL_U16,
    ZIP64_SENTINEL_U32,
};

/// Structural archive parse error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ArchiveError {
    /// No end-of-central-directory record within the trailing search window.
    #[error("not a recognized archive: end-of-central-directory record not found")]
    EocdNotFound,
    #[error("multi-disk archives are not supported (disk {disk}, cd disk {cd_disk})")]
    MultiDisk { disk: u16, cd_disk: u16 },
    /// A field holds a ZIP64 sentinel value.
    #[error("ZIP64 archives are not supported ({field})")]
    Zip64Unsupported { field: &'static str },
    /// Entries-on-disk disagrees with total entries.
    #[error("end record entry counts disagree: {on_disk} on disk, {total} total")]
    EntryCountMismatch { on_disk: u16, total: u16 },
    #[error("central directory (offset {offset}, size {size}) lies outside the archive")]
    CentralDirectoryOutOfBounds { offset: u32, size: u32 },
    #[error("central directory entry {index} is truncated")]
    CentralEntryTruncated { index: usize },
    #[error("central directory entry {index} has bad signature at offset {offset}")]
    BadCentralSignature { index: usize, offset: usize },
    /// Walking the declared entries did not consume exactly the declared size.
    #[error("central directory size mismatch: declared {declared}, walked {walked}")]
    CentralDirectorySizeMismatch { declared: usize, walked: usize },
    #[error("entry {index} name is not valid UTF-8")]
    NonUtf8Name { index: usize },
    #[error("duplicate entry name: {name}")]
    DuplicateEntry { name: String },
    #[error("entry {name} is encrypted")]
    Encrypted { name: String },
    /// Compression method other than stored.
    #[error("unsupported compression method {method} for entry {name}")]
    UnsupportedCompression { name: String, method: u16 },
    /// A stored entry whose compressed and uncompressed sizes differ.
    #[error("entry {name} declares {compressed} stored bytes but {uncompressed} uncompressed")]
    StoredSizeMismatch {
        name: String,
        compressed: u32,
        uncompressed: u32,
    },
    #[error("local header for {name} at offset {offset} lies outside the archive")]
    LocalHeaderOutOfBounds { name: String, offset: u32 },
    #[error("local header for {name} has bad signature at offset {offset}")]
    BadLocalSignature { name: String, offset: u32 },
    #[error("local header for {name} disagrees with central directory: {detail}")]
    LocalHeaderMismatch { name: String, detail: &'static str },
    #[error("data for {name} (offset {offset}, {size} bytes) lies outside the archive")]
    EntryDataOutOfBounds { name: String, offset: usize, size: u32 },
}

/// One parsed entry, borrowing from the input buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArchiveEntry<'a> {
    pub name: &'a str,
    pub data: &'a [u8],
    /// CRC-32 as recorded in the central directory (not checked).
    pub crc32: u32,
    pub local_header_offset: u32,
}

struct Cursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn at(data: &'a [u8], pos: usize) -> Self {
        Self { data, pos }
    }

    fn read_bytes(&mut self, n: usize) -> Result<&'a [u8], ()> {
        let end = self.pos.checked_add(n).ok_or(())?;
        if end > self.data.len() {
            return Err(());
        }
        let slice = &self.data[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn read_u16(&mut self) -> Result<u16, ()> {
        let b = self.read_bytes(2)?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }

    fn read_u32(&mut self) -> Result<u32, ()> {
        let b = self.read_bytes(4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }
}

struct EndRecord {
    total: u16,
    cd_size: u32,
    cd_offset: u32,
}

/// Scan backward for an end record whose declared comment length exactly
/// reaches the end of the buffer.
fn find_eocd(bytes: &[u8]) -> Result<usize, ArchiveError> {
    if bytes.len() < EOCD_LEN {
        return Err(ArchiveError::EocdNotFound);
    }
    let last = bytes.len() - EOCD_LEN;
    let floor = last.saturating_sub(MAX_COMMENT_LEN);
    let sig = EOCD_SIGNATURE.to_le_bytes();
    for pos in (floor..=last).rev() {
        if bytes[pos..pos + 4] != sig {
            continue;
        }
        let comment_len = usize::from(u16::from_le_bytes([bytes[pos + 20], bytes[pos + 21]]));
        if pos + EOCD_LEN + comment_len == bytes.len() {
            return Ok(pos);
        }
    }
    Err(ArchiveError::EocdNotFound)
}

fn read_eocd(bytes: &[u8], pos: usize) -> Result<EndRecord, ArchiveError> {
    let mut c = Cursor::at(bytes, pos + 4);
    let short = |()| ArchiveError::EocdNotFound;
    let disk = c.read_u16().map_err(short)?;
    let cd_disk = c.read_u16().map_err(short)?;
    let on_disk = c.read_u16().map_err(short)?;
    let total = c.read_u16().map_err(short)?;
    let cd_size = c.read_u32().map_err(short)?;
    let cd_offset = c.read_u32().map_err(short)?;

    if disk != 0 || cd_disk != 0 {
        return Err(ArchiveError::MultiDisk { disk, cd_disk });
    }
    if total == ZIP64_SENTINEL_U16 || on_disk == ZIP64_SENTINEL_U16 {
        return Err(ArchiveError::Zip64Unsupported { field: "entry count" });
    }
    if cd_size == ZIP64_SENTINEL_U32 {
        return Err(ArchiveError::Zip64Unsupported {
            field: "central directory size",
        });
    }
    if cd_offset == ZIP64_SENTINEL_U32 {
        return Err(ArchiveError::Zip64Unsupported {
            field: "central directory offset",
        });
    }
    if on_disk != total {
        return Err(ArchiveError::EntryCountMismatch { on_disk, total });
    }
    Ok(EndRecord {
        total,
        cd_size,
        cd_offset,
    })
}

/// Parse `bytes` as a stored-only archive, returning entries in
/// central-directory order.
///
/// # Errors
///
/// Returns [`ArchiveError`] on any structural violation, including any
/// compression method other than stored.
#[allow(clippy::too_many_lines)]
pub fn parse_archive(bytes: &[u8]) -> Result<Vec<ArchiveEntry<'_>>, ArchiveError> {
    let eocd_pos = find_eocd(bytes)?;
    let eocd = read_eocd(bytes, eocd_pos)?;

    let cd_start = eocd.cd_offset as usize;
    let cd_end = cd_start
        .checked_add(eocd.cd_size as usize)
        .filter(|end| *end <= eocd_pos)
        .ok_or(ArchiveError::CentralDirectoryOutOfBounds {
            offset: eocd.cd_offset,
            size: eocd.cd_size,
        })?;

    // Bounded view: central entries cannot read past the declared size.
    let cd = &bytes[cd_start..cd_end];
    let mut cursor = Cursor::new(cd);
    let mut entries = Vec::with_capacity(usize::from(eocd.total));
    let mut seen: HashSet<&str> = HashSet::new();

    for index in 0..usize::from(eocd.total) {
        let entry_start = cursor.pos;
        let truncated = |()| ArchiveError::CentralEntryTruncated { index };
        let header = cursor.read_bytes(CENTRAL_HEADER_LEN).map_err(truncated)?;
        let mut h = Cursor::new(header);

        // Reads below are within the fixed 46 bytes just sliced.
        let signature = h.read_u32().map_err(truncated)?;
        if signature != CENTRAL_HEADER_SIGNATURE {
            return Err(ArchiveError::BadCentralSignature {
                index,
                offset: cd_start + entry_start,
            });
        }
        let _made_by = h.read_u16().map_err(truncated)?;
        let _needed = h.read_u16().map_err(truncated)?;
        let flags = h.read_u16().map_err(truncated)?;
        let method = h.read_u16().map_err(truncated)?;
        let _time = h.read_u16().map_err(truncated)?;
        let _date = h.read_u16().map_err(truncated)?;
        let crc32 = h.read_u32().map_err(truncated)?;
        let compressed = h.read_u32().map_err(truncated)?;
        let uncompressed = h.read_u32().map_err(truncated)?;
        let name_len = usize::from(h.read_u16().map_err(truncated)?);
        let extra_len = usize::from(h.read_u16().map_err(truncated)?);
        let comment_len = usize::from(h.read_u16().map_err(truncated)?);
        let _disk_start = h.read_u16().map_err(truncated)?;
        let _internal = h.read_u16().map_err(truncated)?;
        let _external = h.read_u32().map_err(truncated)?;
        let local_offset = h.read_u32().map_err(truncated)?;

        let name_bytes = cursor.read_bytes(name_len).map_err(truncated)?;
        cursor.read_bytes(extra_len).map_err(truncated)?;
        cursor.read_bytes(comment_len).map_err(truncated)?;

        let name = std::str::from_utf8(name_bytes).map_err(|_| ArchiveError::NonUtf8Name { index })?;
        if !seen.insert(name) {
            return Err(ArchiveError::DuplicateEntry {
                name: name.to_string(),
            });
        }
        if flags & FLAG_ENCRYPTED != 0 {
            return Err(ArchiveError::Encrypted {
                name: name.to_string(),
            });
        }
        if method != METHOD_STORED {
            return Err(ArchiveError::UnsupportedCompression {
                name: name.to_string(),
                method,
            });
        }
        if compressed == ZIP64_SENTINEL_U32
            || uncompressed == ZIP64_SENTINEL_U32
            || local_offset == ZIP64_SENTINEL_U32
        {
            return Err(ArchiveError::Zip64Unsupported { field: "entry size or offset" });
        }
        if compressed != uncompressed {
            return Err(ArchiveError::StoredSizeMismatch {
                name: name.to_string(),
                compressed,
                uncompressed,
            });
        }

        let data = read_local(bytes, cd_start, name, name_bytes, local_offset, compressed)?;
        entries.push(ArchiveEntry {
            name,
            data,
            crc32,
            local_header_offset: local_offset,
        });
    }

    if cursor.pos != cd.len() {
        return Err(ArchiveError::CentralDirectorySizeMismatch {
            declared: cd.len(),
            walked: cursor.pos,
        });
    }

    Ok(entries)
}

/// Confirm the local header for one entry and slice its data.
///
/// Local headers and data must lie entirely before the central directory.
fn read_local<'a>(
    bytes: &'a [u8],
    cd_start: usize,
    name: &str,
    name_bytes: &[u8],
    offset: u32,
    size: u32,
) -> Result<&'a [u8], ArchiveError> {
    let region = &bytes[..cd_start];
    let start = offset as usize;
    let out_of_bounds = || ArchiveError::LocalHeaderOutOfBounds {
        name: name.to_string(),
        offset,
    };
    let mut c = Cursor::at(region, start);
    let header = c.read_bytes(LOCAL_HEADER_LEN).map_err(|()| out_of_bounds())?;
    let mut h = Cursor::new(header);
    let signature = h.read_u32().map_err(|()| out_of_bounds())?;
    if signature != LOCAL_HEADER_SIGNATURE {
        return Err(ArchiveError::BadLocalSignature {
            name: name.to_string(),
            offset,
        });
    }
    let _needed = h.read_u16().map_err(|()| out_of_bounds())?;
    let flags = h.read_u16().map_err(|()| out_of_bounds())?;
    let method = h.read_u16().map_err(|()| out_of_bounds())?;
    let _time = h.read_u16().map_err(|()| out_of_bounds())?;
    let _date = h.read_u16().map_err(|()| out_of_bounds())?;
    let _crc = h.read_u32().map_err(|()| out_of_bounds())?;
    let _compressed = h.read_u32().map_err(|()| out_of_bounds())?;
    let _uncompressed = h.read_u32().map_err(|()| out_of_bounds())?;
    let name_len = usize::from(h.read_u16().map_err(|()| out_of_bounds())?);
    let extra_len = usize::from(h.read_u16().map_err(|()| out_of_bounds())?);

    if method != METHOD_STORED {
        return Err(ArchiveError::UnsupportedCompression {
            name: name.to_string(),
            method,
        });
    }
    if flags & FLAG_ENCRYPTED != 0 {
        return Err(ArchiveError::Encrypted {
            name: name.to_string(),
        });
    }

    let local_name = c.read_bytes(name_len).map_err(|()| out_of_bounds())?;
    if local_name != name_bytes {
        return Err(ArchiveError::LocalHeaderMismatch {
            name: name.to_string(),
            detail: "entry name differs",
        });
    }
    c.read_bytes(extra_len).map_err(|()| out_of_bounds())?;

    let data_start = c.pos;
    c.read_bytes(size as usize)
        .map_err(|()| ArchiveError::EntryDataOutOfBounds {
            name: name.to_string(),
            offset: data_start,
            size,
        })
}
