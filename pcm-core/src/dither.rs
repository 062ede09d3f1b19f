use rand::rngs::SmallRng;
use rand::{RngCore, SeedableRng};

const FIRST_SEED: u64 = 22222;
const SECOND_SEED: u64 = 5555555;

/// Number of bits of dither relative to a 16-bit sample.
const DITHER_BITS: u32 = 15;
/// Shift applied to each uniform source so that their sum spans
/// `DITHER_BITS` bits.
const DITHER_SHIFT: u32 = 32 - DITHER_BITS + 1;
/// Scale which maps the integer dither onto one float LSB.
const FLOAT_DITHER_SCALE: f32 = 1.0 / ((1 << DITHER_BITS) - 1) as f32;

/// A high-passed triangular dither generator.
///
/// Two independent uniform sources are summed to get a triangular
/// distribution, and the difference against the previous value is emitted to
/// push the noise towards higher frequencies.
///
/// The generator is seeded with fixed values so that conversions are
/// reproducible.
///
/// # Examples
///
/// ```
/// use pcm_core::TriangularDither;
///
/// let mut a = TriangularDither::new();
/// let mut b = TriangularDither::new();
///
/// for _ in 0..16 {
///     let d = a.next_i16();
///     assert_eq!(d, b.next_i16());
///     assert!(d.abs() <= 1 << 15);
/// }
/// ```
#[derive(Debug, Clone)]
pub struct TriangularDither {
    first: SmallRng,
    second: SmallRng,
    previous: i32,
}

impl TriangularDither {
    /// Construct a new generator with the default seeds.
    pub fn new() -> Self {
        Self::with_seed(FIRST_SEED, SECOND_SEED)
    }

    /// Construct a new generator with custom seeds for the two uniform
    /// sources.
    pub fn with_seed(first: u64, second: u64) -> Self {
        Self {
            first: SmallRng::seed_from_u64(first),
            second: SmallRng::seed_from_u64(second),
            previous: 0,
        }
    }

    /// Generate the next dither value scaled to one LSB of a 16-bit sample
    /// positioned in bit 15 of an `i32`.
    #[inline]
    pub fn next_i16(&mut self) -> i32 {
        let first = (self.first.next_u32() as i32) >> DITHER_SHIFT;
        let second = (self.second.next_u32() as i32) >> DITHER_SHIFT;
        let current = first + second;
        let high_pass = current - self.previous;
        self.previous = current;
        high_pass
    }

    /// Generate the next dither value in the range of about `-1.0` to `1.0`.
    #[inline]
    pub fn next_f32(&mut self) -> f32 {
        self.next_i16() as f32 * FLOAT_DITHER_SCALE
    }
}

impl Default for TriangularDither {
    fn default() -> Self {
        Self::new()
    }
}
