//! The configuration record consumed by the disassembly core.

//===========================================================================//

/// Where and how to read the input image.  Offsets are positions within
/// the input file; the byte at `start_offset` is assigned the target
/// address `base_address`, and every other byte follows from there.
#[derive(Clone, Debug)]
pub struct Config {
    /// File offset of the first byte to disassemble.
    pub start_offset: u32,
    /// File offset of the last byte to disassemble (inclusive).  May lie
    /// beyond the end of the file; scanning stops at whichever comes
    /// first.
    pub end_offset: u32,
    /// Target address assigned to the byte at `start_offset`.
    pub base_address: u32,
    /// Whether to emit the `$hhhh` address column in the listing.
    pub address_column: bool,
    /// Whether to pre-install the 8085 interrupt-vector labels.
    pub hw_labels: bool,
}

impl Default for Config {
    fn default() -> Config {
        Config {
            start_offset: 0,
            end_offset: u32::MAX,
            base_address: 0,
            address_column: false,
            hw_labels: false,
        }
    }
}

//===========================================================================//
