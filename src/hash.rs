//! Poly37: the polynomial rolling hash used to pick a key's bucket.
//!
//! `h = h * 37 + byte` over the key's bytes, accumulated in a wrapping
//! `u64`. The accumulator is unsigned so the final reduction modulo the
//! slot count is always a valid index.

use core::hash::{BuildHasher, Hasher};

const MULTIPLIER: u64 = 37;

/// Hash `bytes` with the polynomial rolling hash.
#[inline]
pub fn poly37(bytes: &[u8]) -> u64 {
    let mut h = Poly37Hasher::default();
    h.write(bytes);
    h.finish()
}

/// `BuildHasher` for [`Poly37Hasher`]. Stateless, so every instance hashes
/// identically.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Poly37;

impl BuildHasher for Poly37 {
    type Hasher = Poly37Hasher;

    fn build_hasher(&self) -> Self::Hasher {
        Poly37Hasher::default()
    }
}

#[derive(Copy, Clone, Debug, Default)]
pub struct Poly37Hasher {
    state: u64,
}

impl Hasher for Poly37Hasher {
    #[inline]
    fn write(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.state = self
                .state
                .wrapping_mul(MULTIPLIER)
                .wrapping_add(u64::from(b));
        }
    }

    #[inline]
    fn finish(&self) -> u64 {
        self.state
    }
}
