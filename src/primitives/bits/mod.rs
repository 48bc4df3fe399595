#![forbid(unsafe_code)]
//! Bit-packed arrays for per-node and per-edge bookkeeping.

use std::marker::PhantomData;

const WORD_BITS: usize = u64::BITS as usize;

/// Fixed-size array of booleans packed one bit per element.
#[derive(Clone, Debug)]
pub struct OneBitArray {
    words: Vec<u64>,
    len: usize,
}

impl OneBitArray {
    /// Creates an array of `len` cleared bits.
    pub fn new(len: usize) -> Self {
        Self {
            words: vec![0; len.div_ceil(WORD_BITS)],
            len,
        }
    }

    /// Number of addressable elements.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` when the array holds no elements.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Reads the bit at `i`.
    #[inline]
    pub fn get(&self, i: usize) -> bool {
        debug_assert!(i < self.len, "bit {i} out of bounds ({})", self.len);
        (self.words[i / WORD_BITS] >> (i % WORD_BITS)) & 1 == 1
    }

    /// Writes the bit at `i`.
    #[inline]
    pub fn set(&mut self, i: usize, value: bool) {
        debug_assert!(i < self.len, "bit {i} out of bounds ({})", self.len);
        let mask = 1u64 << (i % WORD_BITS);
        let word = &mut self.words[i / WORD_BITS];
        if value {
            *word |= mask;
        } else {
            *word &= !mask;
        }
    }

    /// Sets the bit at `i`, returning `true` if it was previously clear.
    #[inline]
    pub fn insert(&mut self, i: usize) -> bool {
        if self.get(i) {
            return false;
        }
        self.set(i, true);
        true
    }

    /// Number of set bits.
    pub fn count_ones(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }
}

/// A value that fits in two bits.
pub trait TwoBitValue: Copy {
    /// Encodes the value into the low two bits.
    fn to_bits(self) -> u8;
    /// Decodes the value from the low two bits.
    fn from_bits(bits: u8) -> Self;
}

impl TwoBitValue for u8 {
    fn to_bits(self) -> u8 {
        self & 0b11
    }

    fn from_bits(bits: u8) -> Self {
        bits
    }
}

const SLOTS_PER_WORD: usize = WORD_BITS / 2;

/// Fixed-size array of 4-valued elements packed two bits per element.
///
/// Freshly created arrays read back as `T::from_bits(0)` everywhere.
#[derive(Clone, Debug)]
pub struct TwoBitArray<T: TwoBitValue = u8> {
    words: Vec<u64>,
    len: usize,
    _marker: PhantomData<T>,
}

impl<T: TwoBitValue> TwoBitArray<T> {
    /// Creates an array of `len` zeroed elements.
    pub fn new(len: usize) -> Self {
        Self {
            words: vec![0; len.div_ceil(SLOTS_PER_WORD)],
            len,
            _marker: PhantomData,
        }
    }

    /// Number of addressable elements.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` when the array holds no elements.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Reads the element at `i`.
    #[inline]
    pub fn get(&self, i: usize) -> T {
        debug_assert!(i < self.len, "slot {i} out of bounds ({})", self.len);
        let shift = (i % SLOTS_PER_WORD) * 2;
        T::from_bits(((self.words[i / SLOTS_PER_WORD] >> shift) & 0b11) as u8)
    }

    /// Writes the element at `i`.
    #[inline]
    pub fn set(&mut self, i: usize, value: T) {
        debug_assert!(i < self.len, "slot {i} out of bounds ({})", self.len);
        let shift = (i % SLOTS_PER_WORD) * 2;
        let word = &mut self.words[i / SLOTS_PER_WORD];
        *word = (*word & !(0b11u64 << shift)) | (u64::from(value.to_bits() & 0b11) << shift);
    }

    /// Sets every element to `value`.
    pub fn fill(&mut self, value: T) {
        let bits = u64::from(value.to_bits() & 0b11);
        let mut pattern = 0u64;
        for slot in 0..SLOTS_PER_WORD {
            pattern |= bits << (slot * 2);
        }
        self.words.fill(pattern);
    }
}
