#![no_std]

//! Bit-packed field access over little-endian entry buffers.
//!
//! A [`BitField`] names one group of bits inside a fixed-size storage word
//! (a page table entry, typically 32/64/128 bits wide) as (offset, width),
//! and reads/writes that group through a byte buffer without disturbing
//! neighboring bits.

/// One group of bits inside a fixed-size storage word.
///
/// Bit `n` of the storage word lives in byte `n / 8` of the buffer, at bit
/// `n % 8` (little-endian bit addressing, matching how entry values are
/// laid out in page table memory).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BitField {
    bit_offset: u32,
    bit_width: u32,
    storage_size_bits: u32,
}

impl BitField {
    /// Describe `bit_width` bits starting at `bit_offset` within a storage
    /// word of `storage_size_bits` bits.
    ///
    /// Field descriptions are static configuration; a description that does
    /// not fit its storage word is a programming error and panics. Usable in
    /// `const` context, where the panic becomes a compile error.
    pub const fn new(bit_offset: u32, bit_width: u32, storage_size_bits: u32) -> Self {
        assert!(bit_width >= 1, "zero-width field");
        assert!(bit_width <= 64, "field wider than 64 bits");
        assert!(
            storage_size_bits % 8 == 0 && storage_size_bits <= 128,
            "storage size must be a multiple of 8, at most 128 bits"
        );
        assert!(
            bit_offset + bit_width <= storage_size_bits,
            "field exceeds storage word"
        );
        BitField {
            bit_offset,
            bit_width,
            storage_size_bits,
        }
    }

    /// Describe a single-bit flag at `bit_offset`.
    pub const fn flag(bit_offset: u32, storage_size_bits: u32) -> Self {
        Self::new(bit_offset, 1, storage_size_bits)
    }

    pub const fn bit_offset(&self) -> u32 {
        self.bit_offset
    }

    pub const fn bit_width(&self) -> u32 {
        self.bit_width
    }

    pub const fn storage_size_bits(&self) -> u32 {
        self.storage_size_bits
    }

    /// Right-justified mask covering the field's value range.
    pub const fn mask(&self) -> u64 {
        if self.bit_width == 64 {
            u64::MAX
        } else {
            (1u64 << self.bit_width) - 1
        }
    }

    /// number of buffer bytes the storage word occupies
    const fn storage_bytes(&self) -> usize {
        (self.storage_size_bits / 8) as usize
    }

    /// Extract the field from `buffer`, right-justified.
    ///
    /// `buffer` must hold at least the full storage word; a shorter buffer
    /// is a caller bug and panics.
    pub fn get(&self, buffer: &[u8]) -> u64 {
        assert!(
            buffer.len() >= self.storage_bytes(),
            "buffer smaller than field storage"
        );
        let mut value = 0u64;
        for i in 0..self.bit_width {
            let bit = (self.bit_offset + i) as usize;
            if buffer[bit / 8] & (1 << (bit % 8)) != 0 {
                value |= 1 << i;
            }
        }
        value
    }

    /// Write `value` into the field, leaving all other bits of `buffer`
    /// untouched.
    ///
    /// Bits of `value` above `bit_width` are masked off silently, matching
    /// hardware register-field write semantics.
    pub fn set(&self, buffer: &mut [u8], value: u64) {
        assert!(
            buffer.len() >= self.storage_bytes(),
            "buffer smaller than field storage"
        );
        let value = value & self.mask();
        for i in 0..self.bit_width {
            let bit = (self.bit_offset + i) as usize;
            let mask = 1u8 << (bit % 8);
            if value & (1u64 << i) != 0 {
                buffer[bit / 8] |= mask;
            } else {
                buffer[bit / 8] &= !mask;
            }
        }
    }

    /// Read a single-bit field as a flag.
    pub fn get_bool(&self, buffer: &[u8]) -> bool {
        self.get(buffer) != 0
    }

    /// Write a single-bit field as a flag.
    pub fn set_bool(&self, buffer: &mut [u8], value: bool) {
        self.set(buffer, value as u64)
    }
}
