//! CRC-32 checksum as used by ZIP (and PNG, gzip).
//!
//! The reflected polynomial `0xEDB88320` is folded through a 256-entry
//! lookup table, one byte at a time. The table is immutable; a single
//! process-wide instance is built on first use by [`Crc32Table::global`]
//! and shared by reference afterwards.

use std::sync::OnceLock;

/// Reflected CRC-32 polynomial (IEEE 802.3).
pub const CRC32_POLYNOMIAL: u32 = 0xEDB8_8320;

const INITIAL: u32 = 0xFFFF_FFFF;
const FINAL_XOR: u32 = 0xFFFF_FFFF;

static GLOBAL_TABLE: OnceLock<Crc32Table> = OnceLock::new();

/// 256-entry CRC-32 lookup table.
#[derive(Clone)]
pub struct Crc32Table {
    entries: [u32; 256],
}

impl Crc32Table {
    /// Compute the table. `entries[i]` is `i` reflected through the
    /// polynomial for 8 bits.
    pub const fn new() -> Self {
        let mut entries = [0u32; 256];
        let mut i = 0;
        while i < 256 {
            let mut c = i as u32;
            let mut bit = 0;
            while bit < 8 {
                c = if c & 1 != 0 {
                    CRC32_POLYNOMIAL ^ (c >> 1)
                } else {
                    c >> 1
                };
                bit += 1;
            }
            entries[i] = c;
            i += 1;
        }
        Self { entries }
    }

    /// The shared table, computed once on first call.
    pub fn global() -> &'static Crc32Table {
        GLOBAL_TABLE.get_or_init(Crc32Table::new)
    }

    /// Raw table entry for index `i`.
    pub fn entry(&self, i: u8) -> u32 {
        self.entries[i as usize]
    }

    /// Checksum of a complete buffer.
    pub fn checksum(&self, data: &[u8]) -> u32 {
        let mut crc = INITIAL;
        for &byte in data {
            crc = (crc >> 8) ^ self.entries[((crc ^ byte as u32) & 0xFF) as usize];
        }
        crc ^ FINAL_XOR
    }
}

impl Default for Crc32Table {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Crc32Table {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Crc32Table")
            .field("polynomial", &format_args!("{:#010x}", CRC32_POLYNOMIAL))
            .finish()
    }
}

/// CRC-32 of `data` using the shared table.
pub fn calculate_crc32(data: &[u8]) -> u32 {
    Crc32Table::global().checksum(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_vectors() {
        assert_eq!(calculate_crc32(b""), 0x0000_0000);
        assert_eq!(calculate_crc32(b"123456789"), 0xCBF4_3926);
        assert_eq!(calculate_crc32(b"hello"), 0x3610_A686);
        assert_eq!(
            calculate_crc32(b"The quick brown fox jumps over the lazy dog"),
            0x414F_A339
        );
    }

    #[test]
    fn table_known_entries() {
        let table = Crc32Table::new();
        assert_eq!(table.entry(0), 0);
        assert_eq!(table.entry(1), 0x7707_3096);
        assert_eq!(table.entry(255), 0x2D02_EF8D);
    }

    #[test]
    fn global_table_is_shared() {
        let a = Crc32Table::global() as *const Crc32Table;
        let b = Crc32Table::global() as *const Crc32Table;
        assert_eq!(a, b);
    }

    #[test]
    fn matches_flate2() {
        let data = "ünïcödé content\n".repeat(50);
        let mut reference = flate2::Crc::new();
        reference.update(data.as_bytes());
        assert_eq!(calculate_crc32(data.as_bytes()), reference.sum());
    }
}
