//! Converters and zeroers for runs of strided samples.
//!
//! A [Converter] reads `frames` samples from `src`, stepping `src_stride`
//! samples between reads, and writes them to `dst` stepping `dst_stride`
//! samples between writes. Strides are counted in samples of the respective
//! format, so an interleaved stereo buffer has a stride of `2` and a
//! sequential buffer a stride of `1`.
//!
//! Both functions stop early rather than reading or writing out of bounds if
//! a buffer is too short for the requested number of frames.
//!
//! Integer conversions go through a left-justified 32-bit intermediate.
//! Narrowing applies triangular dither unless [StreamFlags::DITHER_OFF] is
//! set, and float to integer conversions clip unless [StreamFlags::CLIP_OFF]
//! is set.

use crate::dither::TriangularDither;
use crate::flags::StreamFlags;
use crate::format::SampleFormat;
use crate::sample::{Sample, I24};

#[cfg(test)]
mod tests;

/// A function converting a run of strided samples from one format to
/// another.
///
/// The arguments are `(dst, dst_stride, src, src_stride, frames, dither)`.
pub type Converter = fn(&mut [u8], usize, &[u8], usize, usize, &mut TriangularDither);

/// A function writing `frames` samples of silence with the given stride.
///
/// The arguments are `(dst, dst_stride, frames)`.
pub type Zeroer = fn(&mut [u8], usize, usize);

/// Integer samples and how they map onto a left-justified `i32`.
trait Integer: Sample {
    /// Number of bits used when quantizing from float. Packed 24-bit samples
    /// are quantized through the full 32-bit range.
    const QUANT_BITS: u32;

    fn to_wide(self) -> i32;

    fn from_wide(wide: i32) -> Self;

    fn from_quantized(value: i32) -> Self;
}

impl Integer for i32 {
    const QUANT_BITS: u32 = 32;

    #[inline]
    fn to_wide(self) -> i32 {
        self
    }

    #[inline]
    fn from_wide(wide: i32) -> Self {
        wide
    }

    #[inline]
    fn from_quantized(value: i32) -> Self {
        value
    }
}

impl Integer for I24 {
    const QUANT_BITS: u32 = 32;

    #[inline]
    fn to_wide(self) -> i32 {
        I24::to_wide(self)
    }

    #[inline]
    fn from_wide(wide: i32) -> Self {
        I24::from_wide(wide)
    }

    #[inline]
    fn from_quantized(value: i32) -> Self {
        I24::from_wide(value)
    }
}

impl Integer for i16 {
    const QUANT_BITS: u32 = 16;

    #[inline]
    fn to_wide(self) -> i32 {
        (self as i32) << 16
    }

    #[inline]
    fn from_wide(wide: i32) -> Self {
        (wide >> 16) as i16
    }

    #[inline]
    fn from_quantized(value: i32) -> Self {
        value as i16
    }
}

impl Integer for i8 {
    const QUANT_BITS: u32 = 8;

    #[inline]
    fn to_wide(self) -> i32 {
        (self as i32) << 24
    }

    #[inline]
    fn from_wide(wide: i32) -> Self {
        (wide >> 24) as i8
    }

    #[inline]
    fn from_quantized(value: i32) -> Self {
        value as i8
    }
}

impl Integer for u8 {
    const QUANT_BITS: u32 = 8;

    #[inline]
    fn to_wide(self) -> i32 {
        (self as i32 - 128) << 24
    }

    #[inline]
    fn from_wide(wide: i32) -> Self {
        ((wide >> 24) + 128) as u8
    }

    #[inline]
    fn from_quantized(value: i32) -> Self {
        (value as i8 as u8).wrapping_add(128)
    }
}

/// Drive a per-sample mapping over two strided runs.
#[inline]
fn run<S, D, F>(
    dst: &mut [u8],
    dst_stride: usize,
    src: &[u8],
    src_stride: usize,
    frames: usize,
    mut map: F,
) where
    S: Sample,
    D: Sample,
    F: FnMut(S) -> D,
{
    let src_bytes = S::FORMAT.bytes();
    let dst_bytes = D::FORMAT.bytes();
    let src_step = src_stride * src_bytes;
    let dst_step = dst_stride * dst_bytes;

    for n in 0..frames {
        let s = match src.get(n * src_step..) {
            Some(s) if s.len() >= src_bytes => s,
            _ => break,
        };

        let d = match dst.get_mut(n * dst_step..) {
            Some(d) if d.len() >= dst_bytes => d,
            _ => break,
        };

        map(S::read(s)).write(d);
    }
}

fn copy<S>(
    dst: &mut [u8],
    dst_stride: usize,
    src: &[u8],
    src_stride: usize,
    frames: usize,
    _: &mut TriangularDither,
) where
    S: Sample,
{
    run(dst, dst_stride, src, src_stride, frames, |s: S| s);
}

fn int_to_float<S>(
    dst: &mut [u8],
    dst_stride: usize,
    src: &[u8],
    src_stride: usize,
    frames: usize,
    _: &mut TriangularDither,
) where
    S: Integer,
{
    const SCALE: f64 = 1.0 / 2147483648.0;

    run(dst, dst_stride, src, src_stride, frames, |s: S| {
        (s.to_wide() as f64 * SCALE) as f32
    });
}

fn int_to_int<S, D>(
    dst: &mut [u8],
    dst_stride: usize,
    src: &[u8],
    src_stride: usize,
    frames: usize,
    _: &mut TriangularDither,
) where
    S: Integer,
    D: Integer,
{
    run(dst, dst_stride, src, src_stride, frames, |s: S| {
        D::from_wide(s.to_wide())
    });
}

fn int_to_int_dither<S, D>(
    dst: &mut [u8],
    dst_stride: usize,
    src: &[u8],
    src_stride: usize,
    frames: usize,
    dither: &mut TriangularDither,
) where
    S: Integer,
    D: Integer,
{
    let bits = D::FORMAT.bits();
    let max = (1i32 << (bits - 1)) - 1;
    let min = -max - 1;

    run(dst, dst_stride, src, src_stride, frames, |s: S| {
        // Dither is generated for a 16-bit destination, so rescale it to
        // one LSB of the actual destination.
        let d = dither.next_i16();

        let d = if bits > 16 {
            d >> (bits - 16)
        } else {
            d << (16 - bits)
        };

        let value = (((s.to_wide() >> 1) + d) >> (31 - bits)).clamp(min, max);
        D::from_wide(value << (32 - bits))
    });
}

fn float_to_int<D, const CLIP: bool, const DITHER: bool>(
    dst: &mut [u8],
    dst_stride: usize,
    src: &[u8],
    src_stride: usize,
    frames: usize,
    dither: &mut TriangularDither,
) where
    D: Integer,
{
    let max = ((1u64 << (D::QUANT_BITS - 1)) - 1) as f64;

    run(dst, dst_stride, src, src_stride, frames, |s: f32| {
        let mut value = if DITHER {
            // Smaller scale to leave room for the dither.
            s as f64 * (max - 1.0) + dither.next_f32() as f64
        } else {
            s as f64 * max
        };

        if CLIP {
            value = value.clamp(-(max + 1.0), max);
        }

        D::from_quantized(value as i32)
    });
}

fn zero<S>(dst: &mut [u8], dst_stride: usize, frames: usize)
where
    S: Sample,
{
    let bytes = S::FORMAT.bytes();
    let step = dst_stride * bytes;

    for n in 0..frames {
        match dst.get_mut(n * step..) {
            Some(d) if d.len() >= bytes => S::SILENCE.write(d),
            _ => break,
        }
    }
}

fn float_to<D>(clip: bool, dither: bool) -> Converter
where
    D: Integer,
{
    match (clip, dither) {
        (false, false) => float_to_int::<D, false, false>,
        (false, true) => float_to_int::<D, false, true>,
        (true, false) => float_to_int::<D, true, false>,
        (true, true) => float_to_int::<D, true, true>,
    }
}

fn narrow<S, D>(dither: bool) -> Converter
where
    S: Integer,
    D: Integer,
{
    if dither {
        int_to_int_dither::<S, D>
    } else {
        int_to_int::<S, D>
    }
}

/// Select the converter from `src` to `dst`.
///
/// Float to integer conversions honor both [StreamFlags::CLIP_OFF] and
/// [StreamFlags::DITHER_OFF]. Integer conversions to a narrower format
/// honor [StreamFlags::DITHER_OFF]. Everything else is an exact widening or
/// a plain copy.
///
/// # Examples
///
/// ```
/// use pcm_core::{convert, SampleFormat, StreamFlags, TriangularDither};
///
/// let src = [0x7fffi16.to_ne_bytes(), 0i16.to_ne_bytes()].concat();
/// let mut dst = [0u8; 2];
///
/// let converter = convert::select_converter(SampleFormat::I16, SampleFormat::U8, StreamFlags::DITHER_OFF);
/// converter(&mut dst, 1, &src, 1, 2, &mut TriangularDither::new());
/// assert_eq!(dst, [0xff, 0x80]);
/// ```
pub fn select_converter(src: SampleFormat, dst: SampleFormat, flags: StreamFlags) -> Converter {
    let clip = !flags.contains(StreamFlags::CLIP_OFF);
    let dither = !flags.contains(StreamFlags::DITHER_OFF);

    match (src, dst) {
        (SampleFormat::F32, SampleFormat::F32) => copy::<f32>,
        (SampleFormat::F32, SampleFormat::I32) => float_to::<i32>(clip, dither),
        (SampleFormat::F32, SampleFormat::I24) => float_to::<I24>(clip, dither),
        (SampleFormat::F32, SampleFormat::I16) => float_to::<i16>(clip, dither),
        (SampleFormat::F32, SampleFormat::I8) => float_to::<i8>(clip, dither),
        (SampleFormat::F32, SampleFormat::U8) => float_to::<u8>(clip, dither),

        (SampleFormat::I32, SampleFormat::F32) => int_to_float::<i32>,
        (SampleFormat::I32, SampleFormat::I32) => copy::<i32>,
        (SampleFormat::I32, SampleFormat::I24) => narrow::<i32, I24>(dither),
        (SampleFormat::I32, SampleFormat::I16) => narrow::<i32, i16>(dither),
        (SampleFormat::I32, SampleFormat::I8) => narrow::<i32, i8>(dither),
        (SampleFormat::I32, SampleFormat::U8) => narrow::<i32, u8>(dither),

        (SampleFormat::I24, SampleFormat::F32) => int_to_float::<I24>,
        (SampleFormat::I24, SampleFormat::I32) => int_to_int::<I24, i32>,
        (SampleFormat::I24, SampleFormat::I24) => copy::<I24>,
        (SampleFormat::I24, SampleFormat::I16) => narrow::<I24, i16>(dither),
        (SampleFormat::I24, SampleFormat::I8) => narrow::<I24, i8>(dither),
        (SampleFormat::I24, SampleFormat::U8) => narrow::<I24, u8>(dither),

        (SampleFormat::I16, SampleFormat::F32) => int_to_float::<i16>,
        (SampleFormat::I16, SampleFormat::I32) => int_to_int::<i16, i32>,
        (SampleFormat::I16, SampleFormat::I24) => int_to_int::<i16, I24>,
        (SampleFormat::I16, SampleFormat::I16) => copy::<i16>,
        (SampleFormat::I16, SampleFormat::I8) => narrow::<i16, i8>(dither),
        (SampleFormat::I16, SampleFormat::U8) => narrow::<i16, u8>(dither),

        (SampleFormat::I8, SampleFormat::F32) => int_to_float::<i8>,
        (SampleFormat::I8, SampleFormat::I32) => int_to_int::<i8, i32>,
        (SampleFormat::I8, SampleFormat::I24) => int_to_int::<i8, I24>,
        (SampleFormat::I8, SampleFormat::I16) => int_to_int::<i8, i16>,
        (SampleFormat::I8, SampleFormat::I8) => copy::<i8>,
        (SampleFormat::I8, SampleFormat::U8) => int_to_int::<i8, u8>,

        (SampleFormat::U8, SampleFormat::F32) => int_to_float::<u8>,
        (SampleFormat::U8, SampleFormat::I32) => int_to_int::<u8, i32>,
        (SampleFormat::U8, SampleFormat::I24) => int_to_int::<u8, I24>,
        (SampleFormat::U8, SampleFormat::I16) => int_to_int::<u8, i16>,
        (SampleFormat::U8, SampleFormat::I8) => int_to_int::<u8, i8>,
        (SampleFormat::U8, SampleFormat::U8) => copy::<u8>,
    }
}

/// Select the zeroer which writes silence in the given format.
///
/// # Examples
///
/// ```
/// use pcm_core::{convert, SampleFormat};
///
/// let mut buf = [1u8; 4];
/// convert::select_zeroer(SampleFormat::U8)(&mut buf, 2, 2);
/// assert_eq!(buf, [0x80, 1, 0x80, 1]);
/// ```
pub fn select_zeroer(format: SampleFormat) -> Zeroer {
    match format {
        SampleFormat::F32 => zero::<f32>,
        SampleFormat::I32 => zero::<i32>,
        SampleFormat::I24 => zero::<I24>,
        SampleFormat::I16 => zero::<i16>,
        SampleFormat::I8 => zero::<i8>,
        SampleFormat::U8 => zero::<u8>,
    }
}
