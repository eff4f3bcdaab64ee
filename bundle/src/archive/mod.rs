//! Stored-only archive container: the one format contract shared by the
//! packager ([`writer`]) and the independent parser ([`reader`]).
//!
//! All integers are little-endian.
//!
//! ```text
//! Local header (30 bytes + name)
//!   0  u32 signature 0x04034b50
//!   4  u16 version needed (20)
//!   6  u16 flags (0)
//!   8  u16 method (0 = stored)
//!  10  u16 dos time
//!  12  u16 dos date
//!  14  u32 crc32
//!  18  u32 compressed size
//!  22  u32 uncompressed size
//!  26  u16 name length
//!  28  u16 extra length (0)
//!
//! Central entry (46 bytes + name)
//!   0  u32 signature 0x02014b50
//!   4  u16 version made by (20)
//!   6  u16 version needed (20)
//!   8  u16 flags
//!  10  u16 method
//!  12  u16 dos time
//!  14  u16 dos date
//!  16  u32 crc32
//!  20  u32 compressed size
//!  24  u32 uncompressed size
//!  28  u16 name length
//!  30  u16 extra length
//!  32  u16 comment length
//!  34  u16 disk number start
//!  36  u16 internal attributes
//!  38  u32 external attributes
//!  42  u32 local header offset
//!
//! End of central directory (22 bytes + comment)
//!   0  u32 signature 0x06054b50
//!   4  u16 this disk (0)
//!   6  u16 central directory disk (0)
//!   8  u16 entries on this disk
//!  10  u16 total entries
//!  12  u32 central directory size
//!  16  u32 central directory offset
//!  20  u16 comment length
//! ```

pub mod reader;
pub mod writer;

use chrono::{DateTime, Datelike, Timelike, Utc};

pub const LOCAL_HEADER_SIGNATURE: u32 = 0x0403_4b50;
pub const CENTRAL_HEADER_SIGNATURE: u32 = 0x0201_4b50;
pub const EOCD_SIGNATURE: u32 = 0x0605_4b50;

pub const LOCAL_HEADER_LEN: usize = 30;
pub const CENTRAL_HEADER_LEN: usize = 46;
pub const EOCD_LEN: usize = 22;
/// Largest comment an EOCD record can declare.
pub const MAX_COMMENT_LEN: usize = 0xFFFF;

pub const VERSION_NEEDED: u16 = 20;
pub const VERSION_MADE_BY: u16 = 20;
pub const METHOD_STORED: u16 = 0;

/// General-purpose flag bit 0: entry is encrypted.
pub const FLAG_ENCRYPTED: u16 = 0x0001;

/// 32-bit values reserved as ZIP64 sentinels.
pub const ZIP64_SENTINEL_U32: u32 = 0xFFFF_FFFF;
pub const ZIP64_SENTINEL_U16: u16 = 0xFFFF;

const CRC32_TABLE: [u32; 256] = build_crc32_table();

const fn build_crc32_table() -> [u32; 256] {
    let mut table = [0u32; 256];
    let mut i = 0;
    while i < 256 {
        #[allow(clippy::cast_possible_truncation)]
        let mut c = i as u32;
        let mut k = 0;
        while k < 8 {
            c = if c & 1 == 1 { 0xEDB8_8320 ^ (c >> 1) } else { c >> 1 };
            k += 1;
        }
        table[i] = c;
        i += 1;
    }
    table
}

/// CRC-32 (IEEE 802.3, reflected, as used by the archive format).
#[must_use]
pub fn crc32(data: &[u8]) -> u32 {
    let mut crc = 0xFFFF_FFFFu32;
    for &b in data {
        crc = CRC32_TABLE[((crc ^ u32::from(b)) & 0xFF) as usize] ^ (crc >> 8);
    }
    crc ^ 0xFFFF_FFFF
}

/// MS-DOS packed date and time, as stored in entry headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DosDateTime {
    pub time: u16,
    pub date: u16,
}

impl DosDateTime {
    /// 1980-01-01 00:00:00, the earliest representable instant.
    pub const EPOCH: Self = Self {
        time: 0,
        date: (1 << 5) | 1,
    };

    /// Pack a UTC instant. Years before 1980 clamp to [`DosDateTime::EPOCH`];
    /// years after 2107 clamp to 2107-12-31 23:59:58. Seconds round down to
    /// even.
    #[must_use]
    pub fn from_utc(ts: &DateTime<Utc>) -> Self {
        let year = ts.year();
        if year < 1980 {
            return Self::EPOCH;
        }
        let (year, month, day, hour, minute, second) = if year > 2107 {
            (2107, 12, 31, 23, 59, 58)
        } else {
            (
                year,
                ts.month(),
                ts.day(),
                ts.hour(),
                ts.minute(),
                ts.second().min(59),
            )
        };
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let date = (((year - 1980) as u16) << 9) | ((month as u16) << 5) | day as u16;
        #[allow(clippy::cast_possible_truncation)]
        let time = ((hour as u16) << 11) | ((minute as u16) << 5) | (second as u16 / 2);
        Self { time, date }
    }

    /// Pack an RFC 3339 timestamp; unparseable input maps to the epoch.
    #[must_use]
    pub fn from_rfc3339(s: &str) -> Self {
        DateTime::parse_from_rfc3339(s)
            .map_or(Self::EPOCH, |dt| Self::from_utc(&dt.with_timezone(&Utc)))
    }
}
