use crate::format::SampleFormat;

/// A sample which corresponds to exactly one [SampleFormat].
///
/// Sample types have the following guarantees:
///
/// * The type does not need to be dropped (by implementing [Copy]).
/// * The in-memory representation is the native-endian encoding of its
///   [SampleFormat] and nothing else.
///
/// # Safety
///
/// Implementors must be plain data: every bit pattern of
/// `size_of::<Self>()` bytes must be a legal value, the type must not contain
/// padding, and its size must be [SampleFormat::bytes] of [Sample::FORMAT].
/// Typed views over raw sample bytes rely on this.
pub unsafe trait Sample: Copy + Default + 'static {
    /// The format this sample is encoded as.
    const FORMAT: SampleFormat;

    /// The value which represents silence.
    const SILENCE: Self;

    /// Read a sample from the start of `bytes`.
    ///
    /// # Panics
    ///
    /// Panics if `bytes` is shorter than the sample.
    fn read(bytes: &[u8]) -> Self;

    /// Write the sample to the start of `bytes`.
    ///
    /// # Panics
    ///
    /// Panics if `bytes` is shorter than the sample.
    fn write(self, bytes: &mut [u8]);
}

// Helper macro to implement [Sample] for primitive types.
macro_rules! impl_primitive {
    ($ty:ty, $format:ident, $silence:expr) => {
        unsafe impl Sample for $ty {
            const FORMAT: SampleFormat = SampleFormat::$format;
            const SILENCE: Self = $silence;

            #[inline]
            fn read(bytes: &[u8]) -> Self {
                let mut b = [0; std::mem::size_of::<$ty>()];
                b.copy_from_slice(&bytes[..std::mem::size_of::<$ty>()]);
                <$ty>::from_ne_bytes(b)
            }

            #[inline]
            fn write(self, bytes: &mut [u8]) {
                bytes[..std::mem::size_of::<$ty>()].copy_from_slice(&self.to_ne_bytes());
            }
        }
    };
}

impl_primitive!(f32, F32, 0.0);
impl_primitive!(i32, I32, 0);
impl_primitive!(i16, I16, 0);
impl_primitive!(i8, I8, 0);
impl_primitive!(u8, U8, 0x80);

/// A signed 24-bit sample packed into three native-endian bytes.
///
/// # Examples
///
/// ```
/// use pcm_core::I24;
///
/// let sample = I24::from_i32(-2);
/// assert_eq!(sample.to_i32(), -2);
/// assert_eq!(sample.to_wide(), -2 << 8);
///
/// assert_eq!(I24::from_wide(0x12345678).to_i32(), 0x123456);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct I24([u8; 3]);

impl I24 {
    /// The smallest value.
    pub const MIN: Self = Self::from_i32(-0x80_0000);

    /// The largest value.
    pub const MAX: Self = Self::from_i32(0x7f_ffff);

    /// Construct from a value in the range `-2^23..2^23`. Higher bits are
    /// discarded.
    pub const fn from_i32(value: i32) -> Self {
        Self::from_wide(value << 8)
    }

    /// The value sign extended into an `i32`.
    pub const fn to_i32(self) -> i32 {
        self.to_wide() >> 8
    }

    /// Construct from the top 24 bits of a left-justified 32-bit value.
    #[cfg(target_endian = "little")]
    pub const fn from_wide(wide: i32) -> Self {
        let b = wide.to_le_bytes();
        Self([b[1], b[2], b[3]])
    }

    /// Construct from the top 24 bits of a left-justified 32-bit value.
    #[cfg(target_endian = "big")]
    pub const fn from_wide(wide: i32) -> Self {
        let b = wide.to_be_bytes();
        Self([b[0], b[1], b[2]])
    }

    /// The value left-justified in an `i32`, with the low byte cleared.
    #[cfg(target_endian = "little")]
    pub const fn to_wide(self) -> i32 {
        let [a, b, c] = self.0;
        i32::from_le_bytes([0, a, b, c])
    }

    /// The value left-justified in an `i32`, with the low byte cleared.
    #[cfg(target_endian = "big")]
    pub const fn to_wide(self) -> i32 {
        let [a, b, c] = self.0;
        i32::from_be_bytes([a, b, c, 0])
    }

    /// Construct from native-endian bytes.
    pub const fn from_ne_bytes(bytes: [u8; 3]) -> Self {
        Self(bytes)
    }

    /// The native-endian bytes of the sample.
    pub const fn to_ne_bytes(self) -> [u8; 3] {
        self.0
    }
}

unsafe impl Sample for I24 {
    const FORMAT: SampleFormat = SampleFormat::I24;
    const SILENCE: Self = Self([0; 3]);

    #[inline]
    fn read(bytes: &[u8]) -> Self {
        Self([bytes[0], bytes[1], bytes[2]])
    }

    #[inline]
    fn write(self, bytes: &mut [u8]) {
        bytes[..3].copy_from_slice(&self.0);
    }
}
