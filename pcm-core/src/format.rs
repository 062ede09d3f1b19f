use std::fmt;
use std::iter::FromIterator;
use std::ops;


/// The sample encodings understood by the converters.
///
/// Variants are declared from the highest to the lowest quality, which is the
/// order [closest_available] relies on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SampleFormat {
    /// 32-bit float in the range `-1.0` to `1.0`.
    F32,
    /// Signed 32-bit integer.
    I32,
    /// Signed 24-bit integer packed into three native-endian bytes.
    I24,
    /// Signed 16-bit integer.
    I16,
    /// Signed 8-bit integer.
    I8,
    /// Unsigned 8-bit integer with silence at `128`.
    U8,
}

impl SampleFormat {
    /// Every sample format, best quality first.
    pub const ALL: [SampleFormat; 6] = [
        SampleFormat::F32,
        SampleFormat::I32,
        SampleFormat::I24,
        SampleFormat::I16,
        SampleFormat::I8,
        SampleFormat::U8,
    ];

    /// The number of bytes a single sample occupies.
    ///
    /// # Examples
    ///
    /// ```
    /// use pcm_core::SampleFormat;
    ///
    /// assert_eq!(SampleFormat::I24.bytes(), 3);
    /// assert_eq!(SampleFormat::U8.bytes(), 1);
    /// ```
    pub const fn bytes(self) -> usize {
        match self {
            SampleFormat::F32 | SampleFormat::I32 => 4,
            SampleFormat::I24 => 3,
            SampleFormat::I16 => 2,
            SampleFormat::I8 | SampleFormat::U8 => 1,
        }
    }

    /// The number of significant bits in a sample.
    pub const fn bits(self) -> u32 {
        match self {
            SampleFormat::F32 | SampleFormat::I32 => 32,
            SampleFormat::I24 => 24,
            SampleFormat::I16 => 16,
            SampleFormat::I8 | SampleFormat::U8 => 8,
        }
    }

    /// Test if the format is a floating point format.
    pub const fn is_float(self) -> bool {
        matches!(self, SampleFormat::F32)
    }

    const fn rank(self) -> usize {
        match self {
            SampleFormat::F32 => 0,
            SampleFormat::I32 => 1,
            SampleFormat::I24 => 2,
            SampleFormat::I16 => 3,
            SampleFormat::I8 => 4,
            SampleFormat::U8 => 5,
        }
    }

    const fn mask(self) -> u8 {
        1 << self.rank()
    }
}

impl fmt::Display for SampleFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SampleFormat::F32 => "f32",
            SampleFormat::I32 => "i32",
            SampleFormat::I24 => "i24",
            SampleFormat::I16 => "i16",
            SampleFormat::I8 => "i8",
            SampleFormat::U8 => "u8",
        };

        f.write_str(name)
    }
}

/// A set of sample formats, such as the formats a device supports natively.
///
/// # Examples
///
/// ```
/// use pcm_core::{FormatSet, SampleFormat};
///
/// let set = FormatSet::EMPTY.with(SampleFormat::I16) | SampleFormat::F32;
/// assert!(set.contains(SampleFormat::F32));
/// assert!(!set.contains(SampleFormat::U8));
/// assert_eq!(set.iter().collect::<Vec<_>>(), [SampleFormat::F32, SampleFormat::I16]);
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct FormatSet(u8);

impl FormatSet {
    /// The set without any formats.
    pub const EMPTY: Self = Self(0);

    /// The set with every format.
    pub const ALL: Self = Self(0b11_1111);

    /// Construct a set containing a single format.
    pub const fn single(format: SampleFormat) -> Self {
        Self(format.mask())
    }

    /// Return a copy of this set with the given format added.
    pub const fn with(self, format: SampleFormat) -> Self {
        Self(self.0 | format.mask())
    }

    /// Test if the set contains the given format.
    pub const fn contains(self, format: SampleFormat) -> bool {
        self.0 & format.mask() != 0
    }

    /// Test if the set is empty.
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Iterate over the formats in the set, best quality first.
    pub fn iter(self) -> impl Iterator<Item = SampleFormat> {
        let all: &'static [SampleFormat] = &SampleFormat::ALL;
        all.iter().copied().filter(move |f| self.contains(*f))
    }
}

impl ops::BitOr<SampleFormat> for FormatSet {
    type Output = Self;

    fn bitor(self, format: SampleFormat) -> Self {
        self.with(format)
    }
}

impl ops::BitOr for FormatSet {
    type Output = Self;

    fn bitor(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }
}

impl FromIterator<SampleFormat> for FormatSet {
    fn from_iter<I: IntoIterator<Item = SampleFormat>>(iter: I) -> Self {
        iter.into_iter().fold(Self::EMPTY, Self::with)
    }
}

impl fmt::Debug for FormatSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

/// Select the available format which is closest to `wanted`.
///
/// If `wanted` is available it is returned as-is. Otherwise formats of higher
/// quality are tried from the closest upwards, and only after that formats of
/// lower quality. Returns `None` if the set is empty.
///
/// # Examples
///
/// ```
/// use pcm_core::{closest_available, FormatSet, SampleFormat};
///
/// let available = FormatSet::single(SampleFormat::F32) | SampleFormat::I16;
///
/// assert_eq!(closest_available(available, SampleFormat::I16), Some(SampleFormat::I16));
/// assert_eq!(closest_available(available, SampleFormat::I24), Some(SampleFormat::F32));
/// assert_eq!(closest_available(FormatSet::single(SampleFormat::U8), SampleFormat::F32), Some(SampleFormat::U8));
/// ```
pub fn closest_available(available: FormatSet, wanted: SampleFormat) -> Option<SampleFormat> {
    if available.contains(wanted) {
        return Some(wanted);
    }

    let rank = wanted.rank();

    let better = SampleFormat::ALL[..rank].iter().rev();
    let worse = SampleFormat::ALL[rank + 1..].iter();

    better
        .chain(worse)
        .copied()
        .find(|format| available.contains(*format))
}
