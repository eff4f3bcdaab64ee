//! Proof module: artifact digests and canonical JSON bytes.

pub mod canon;
pub mod hash;
