//! Nucleotide symbols.
//!
//! Sequences are stored as ASCII bytes.
//! The scoring index of a base is A=0, C=1, G=2, T=3, and 4 for `N` and any other symbol.
//! Softmasking is the ASCII lowercase bit layered over the same symbols.

use gbwt::support;

//-----------------------------------------------------------------------------

/// Gap symbol in gapped alignments.
pub const GAP: u8 = b'-';

/// Scoring index of `N` and unknown symbols.
pub const N_INDEX: usize = 4;

/// Size of the scoring alphabet.
pub const ALPHABET_SIZE: usize = 5;

const fn generate_encoding() -> [u8; 256] {
    let mut result = [N_INDEX as u8; 256];
    result[b'a' as usize] = 0; result[b'A' as usize] = 0;
    result[b'c' as usize] = 1; result[b'C' as usize] = 1;
    result[b'g' as usize] = 2; result[b'G' as usize] = 2;
    result[b't' as usize] = 3; result[b'T' as usize] = 3;
    result
}

const ENCODE: [u8; 256] = generate_encoding();

const MASK_BIT: u8 = 0x20;

/// Returns the scoring index of the base.
#[inline]
pub fn base_index(base: u8) -> usize {
    ENCODE[base as usize] as usize
}

/// Returns `true` if the symbol is one of `ACGT` in either case.
#[inline]
pub fn is_acgt(base: u8) -> bool {
    (ENCODE[base as usize] as usize) < N_INDEX
}

/// Returns `true` if the base is softmasked.
#[inline]
pub fn is_masked(base: u8) -> bool {
    base.is_ascii_alphabetic() && base & MASK_BIT != 0
}

/// Returns the softmasked version of the base.
#[inline]
pub fn mask(base: u8) -> u8 {
    base.to_ascii_lowercase()
}

/// Returns the unmasked version of the base.
#[inline]
pub fn unmask(base: u8) -> u8 {
    base.to_ascii_uppercase()
}

/// Removes the softmask from the entire sequence in place.
pub fn unmask_in_place(sequence: &mut [u8]) {
    sequence.make_ascii_uppercase();
}

/// Returns the reverse complement of the sequence.
///
/// Unknown symbols become `N`.
pub fn reverse_complement(sequence: &[u8]) -> Vec<u8> {
    support::reverse_complement(sequence)
}

//-----------------------------------------------------------------------------


//-----------------------------------------------------------------------------
