//! Stored-only archive writer.
//!
//! Entries are written in caller order: local header, name, raw bytes; then
//! the central directory in the same order; then the end record with an
//! empty comment. Output is a pure function of the inputs.

use super::{
    crc32, DosDateTime, CENTRAL_HEADER_SIGNATURE, EOCD_SIGNATURE, LOCAL_HEADER_SIGNATURE,
    METHOD_STORED, VERSION_MADE_BY, VERSION_NEEDED, ZIP64_SENTINEL_U16, ZIP64_SENTINEL_U32,
};

/// Error writing an archive.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ArchiveWriteError {
    #[error("archive entry name is empty")]
    EmptyName,
    #[error("duplicate archive entry name: {name}")]
    DuplicateName { name: String },
    #[error("archive entry name too long: {len} bytes")]
    NameTooLong { len: usize },
    /// Entry or archive offsets would need ZIP64.
    #[error("archive too large for 32-bit offsets at entry {name}")]
    TooLarge { name: String },
    #[error("too many archive entries: {count}")]
    TooManyEntries { count: usize },
}

/// One entry to write.
#[derive(Debug, Clone, Copy)]
pub struct EntrySpec<'a> {
    pub name: &'a str,
    pub data: &'a [u8],
}

fn put_u16(buf: &mut Vec<u8>, v: u16) {
    buf.extend_from_slice(&v.to_le_bytes());
}

fn put_u32(buf: &mut Vec<u8>, v: u32) {
    buf.extend_from_slice(&v.to_le_bytes());
}

/// Below the ZIP64 sentinel, or an error naming the entry.
fn fits_u32(value: usize, name: &str) -> Result<u32, ArchiveWriteError> {
    u32::try_from(value)
        .ok()
        .filter(|v| *v != ZIP64_SENTINEL_U32)
        .ok_or_else(|| ArchiveWriteError::TooLarge {
            name: name.to_string(),
        })
}

struct CentralRecord {
    name_len: u16,
    crc: u32,
    size: u32,
    offset: u32,
}

/// Write `entries` as a stored-only archive stamped with `modified`.
///
/// # Errors
///
/// Returns [`ArchiveWriteError`] for empty, duplicate or over-long names, or
/// sizes that would require ZIP64.
pub fn write_stored_archive(
    entries: &[EntrySpec<'_>],
    modified: DosDateTime,
) -> Result<Vec<u8>, ArchiveWriteError> {
    let count = u16::try_from(entries.len())
        .ok()
        .filter(|c| *c != ZIP64_SENTINEL_U16)
        .ok_or(ArchiveWriteError::TooManyEntries {
            count: entries.len(),
        })?;

    let mut out = Vec::new();
    let mut central = Vec::with_capacity(entries.len());

    for (i, entry) in entries.iter().enumerate() {
        if entry.name.is_empty() {
            return Err(ArchiveWriteError::EmptyName);
        }
        if entries[..i].iter().any(|e| e.name == entry.name) {
            return Err(ArchiveWriteError::DuplicateName {
                name: entry.name.to_string(),
            });
        }
        let name = entry.name.as_bytes();
        let name_len = u16::try_from(name.len())
            .map_err(|_| ArchiveWriteError::NameTooLong { len: name.len() })?;
        let size = fits_u32(entry.data.len(), entry.name)?;
        let offset = fits_u32(out.len(), entry.name)?;
        let crc = crc32(entry.data);

        put_u32(&mut out, LOCAL_HEADER_SIGNATURE);
        put_u16(&mut out, VERSION_NEEDED);
        put_u16(&mut out, 0); // flags
        put_u16(&mut out, METHOD_STORED);
        put_u16(&mut out, modified.time);
        put_u16(&mut out, modified.date);
        put_u32(&mut out, crc);
        put_u32(&mut out, size); // compressed
        put_u32(&mut out, size); // uncompressed
        put_u16(&mut out, name_len);
        put_u16(&mut out, 0); // extra
        out.extend_from_slice(name);
        out.extend_from_slice(entry.data);

        central.push(CentralRecord {
            name_len,
            crc,
            size,
            offset,
        });
    }

    let last_name = entries.last().map_or("", |e| e.name);
    let cd_offset = fits_u32(out.len(), last_name)?;
    for (entry, rec) in entries.iter().zip(&central) {
        put_u32(&mut out, CENTRAL_HEADER_SIGNATURE);
        put_u16(&mut out, VERSION_MADE_BY);
        put_u16(&mut out, VERSION_NEEDED);
        put_u16(&mut out, 0); // flags
        put_u16(&mut out, METHOD_STORED);
        put_u16(&mut out, modified.time);
        put_u16(&mut out, modified.date);
        put_u32(&mut out, rec.crc);
        put_u32(&mut out, rec.size);
        put_u32(&mut out, rec.size);
        put_u16(&mut out, rec.name_len);
        put_u16(&mut out, 0); // extra
        put_u16(&mut out, 0); // comment
        put_u16(&mut out, 0); // disk start
        put_u16(&mut out, 0); // internal attrs
        put_u32(&mut out, 0); // external attrs
        put_u32(&mut out, rec.offset);
        out.extend_from_slice(entry.name.as_bytes());
    }
    let cd_size = fits_u32(out.len() - cd_offset as usize, last_name)?;

    put_u32(&mut out, EOCD_SIGNATURE);
    put_u16(&mut out, 0); // this disk
    put_u16(&mut out, 0); // cd disk
    put_u16(&mut out, count);
    put_u16(&mut out, count);
    put_u32(&mut out, cd_size);
    put_u32(&mut out, cd_offset);
    put_u16(&mut out, 0); // comment length

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::super::{CENTRAL_HEADER_LEN, EOCD_LEN, LOCAL_HEADER_LEN};
    use super::*;

    fn u16_at(b: &[u8], at: usize) -> u16 {
        u16::from_le_bytes([b[at], b[at + 1]])
    }

    fn u32_at(b: &[u8], at: usize) -> u32 {
        u32::from_le_bytes([b[at], b[at + 1], b[at + 2], b[at + 3]])
    }

    #[test]
    fn layout_of_single_entry() {
        let out = write_stored_archive(
            &[EntrySpec {
                name: "a.txt",
                data: b"hello",
            }],
            DosDateTime::EPOCH,
        )
        .unwrap();
        assert_eq!(
            out.len(),
            LOCAL_HEADER_LEN + 5 + 5 + CENTRAL_HEADER_LEN + 5 + EOCD_LEN
        );
        assert_eq!(u32_at(&out, 0), LOCAL_HEADER_SIGNATURE);
        assert_eq!(u16_at(&out, 4), 20);
        assert_eq!(u16_at(&out, 8), 0);
        assert_eq!(u32_at(&out, 14), crc32(b"hello"));
        assert_eq!(u32_at(&out, 18), 5);
        assert_eq!(&out[30..35], b"a.txt");
        assert_eq!(&out[35..40], b"hello");

        let cd = 40;
        assert_eq!(u32_at(&out, cd), CENTRAL_HEADER_SIGNATURE);
        assert_eq!(u32_at(&out, cd + 42), 0);

        let eocd = out.len() - EOCD_LEN;
        assert_eq!(u32_at(&out, eocd), EOCD_SIGNATURE);
        assert_eq!(u16_at(&out, eocd + 10), 1);
        assert_eq!(u32_at(&out, eocd + 12), 51);
        assert_eq!(u32_at(&out, eocd + 16), 40);
    }

    #[test]
    fn output_is_deterministic() {
        let entries = [
            EntrySpec { name: "x", data: b"1" },
            EntrySpec { name: "y", data: b"22" },
        ];
        let stamp = DosDateTime::from_rfc3339("2026-01-31T23:59:59.999Z");
        assert_eq!(
            write_stored_archive(&entries, stamp).unwrap(),
            write_stored_archive(&entries, stamp).unwrap()
        );
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let entries = [
            EntrySpec { name: "x", data: b"1" },
            EntrySpec { name: "x", data: b"2" },
        ];
        assert_eq!(
            write_stored_archive(&entries, DosDateTime::EPOCH).unwrap_err(),
            ArchiveWriteError::DuplicateName { name: "x".into() }
        );
    }

    #[test]
    fn empty_name_is_rejected() {
        let entries = [EntrySpec { name: "", data: b"1" }];
        assert_eq!(
            write_stored_archive(&entries, DosDateTime::EPOCH).unwrap_err(),
            ArchiveWriteError::EmptyName
        );
    }

    #[test]
    fn empty_archive_is_just_an_end_record() {
        let out = write_stored_archive(&[], DosDateTime::EPOCH).unwrap();
        assert_eq!(out.len(), EOCD_LEN);
        assert_eq!(u32_at(&out, 0), EOCD_SIGNATURE);
    }
}
