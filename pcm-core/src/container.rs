//! Host sample containers which differ from the native sample formats in
//! byte order, width, or justification.
//!
//! Some hosts exchange samples in containers that are wider than their
//! significant bits or in a foreign byte order. Such buffers are converted in
//! place: [ContainerFormat::unpack] turns a host buffer into the native
//! [SampleFormat] reported by [ContainerFormat::sample_format], and
//! [ContainerFormat::pack] turns it back.
//!
//! Containers with fewer significant bits than their width store the value
//! right-justified and sign-extended, while the native [SampleFormat::I32] is
//! left-justified. Unpacking shifts left by `32 - bits`, packing shifts right
//! by the same amount.

use crate::format::SampleFormat;


/// The shift and byte order adjustment needed to bring a container to and
/// from its native sample format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContainerLayout {
    /// Number of bits the value has to be shifted left when unpacking.
    pub shift: u32,
    /// If the bytes of each sample have to be reversed.
    pub swap: bool,
}

/// A host sample container.
///
/// `Msb` variants are big-endian and `Lsb` variants little-endian. The
/// `Int32*NN` variants carry `NN` significant bits in a 32-bit container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ContainerFormat {
    /// Big-endian 16-bit integer.
    Int16Msb,
    /// Little-endian 16-bit integer.
    Int16Lsb,
    /// Big-endian packed 24-bit integer.
    Int24Msb,
    /// Little-endian packed 24-bit integer.
    Int24Lsb,
    /// Big-endian 32-bit integer.
    Int32Msb,
    /// Little-endian 32-bit integer.
    Int32Lsb,
    /// Big-endian 32-bit float.
    Float32Msb,
    /// Little-endian 32-bit float.
    Float32Lsb,
    /// Big-endian 64-bit float.
    Float64Msb,
    /// Little-endian 64-bit float.
    Float64Lsb,
    /// Big-endian 32-bit container with 16 significant bits.
    Int32Msb16,
    /// Big-endian 32-bit container with 18 significant bits.
    Int32Msb18,
    /// Big-endian 32-bit container with 20 significant bits.
    Int32Msb20,
    /// Big-endian 32-bit container with 24 significant bits.
    Int32Msb24,
    /// Little-endian 32-bit container with 16 significant bits.
    Int32Lsb16,
    /// Little-endian 32-bit container with 18 significant bits.
    Int32Lsb18,
    /// Little-endian 32-bit container with 20 significant bits.
    Int32Lsb20,
    /// Little-endian 32-bit container with 24 significant bits.
    Int32Lsb24,
}

impl ContainerFormat {
    /// Every container format.
    pub const ALL: [ContainerFormat; 18] = [
        ContainerFormat::Int16Msb,
        ContainerFormat::Int16Lsb,
        ContainerFormat::Int24Msb,
        ContainerFormat::Int24Lsb,
        ContainerFormat::Int32Msb,
        ContainerFormat::Int32Lsb,
        ContainerFormat::Float32Msb,
        ContainerFormat::Float32Lsb,
        ContainerFormat::Float64Msb,
        ContainerFormat::Float64Lsb,
        ContainerFormat::Int32Msb16,
        ContainerFormat::Int32Msb18,
        ContainerFormat::Int32Msb20,
        ContainerFormat::Int32Msb24,
        ContainerFormat::Int32Lsb16,
        ContainerFormat::Int32Lsb18,
        ContainerFormat::Int32Lsb20,
        ContainerFormat::Int32Lsb24,
    ];

    const fn is_msb(self) -> bool {
        use ContainerFormat::*;

        matches!(
            self,
            Int16Msb
                | Int24Msb
                | Int32Msb
                | Float32Msb
                | Float64Msb
                | Int32Msb16
                | Int32Msb18
                | Int32Msb20
                | Int32Msb24
        )
    }

    /// The number of significant bits in a sample.
    ///
    /// # Examples
    ///
    /// ```
    /// use pcm_core::container::ContainerFormat;
    ///
    /// assert_eq!(ContainerFormat::Int32Lsb18.significant_bits(), 18);
    /// assert_eq!(ContainerFormat::Int32Msb.significant_bits(), 32);
    /// ```
    pub const fn significant_bits(self) -> u32 {
        use ContainerFormat::*;

        match self {
            Int16Msb | Int16Lsb | Int32Msb16 | Int32Lsb16 => 16,
            Int32Msb18 | Int32Lsb18 => 18,
            Int32Msb20 | Int32Lsb20 => 20,
            Int24Msb | Int24Lsb | Int32Msb24 | Int32Lsb24 => 24,
            Int32Msb | Int32Lsb | Float32Msb | Float32Lsb => 32,
            Float64Msb | Float64Lsb => 64,
        }
    }

    /// The number of bytes one sample occupies in the host buffer.
    pub const fn container_bytes(self) -> usize {
        use ContainerFormat::*;

        match self {
            Int16Msb | Int16Lsb => 2,
            Int24Msb | Int24Lsb => 3,
            Float64Msb | Float64Lsb => 8,
            _ => 4,
        }
    }

    /// The native sample format the container unpacks into.
    pub const fn sample_format(self) -> SampleFormat {
        use ContainerFormat::*;

        match self {
            Int16Msb | Int16Lsb => SampleFormat::I16,
            Int24Msb | Int24Lsb => SampleFormat::I24,
            Float32Msb | Float32Lsb | Float64Msb | Float64Lsb => SampleFormat::F32,
            _ => SampleFormat::I32,
        }
    }

    /// The shift and swap needed for this container on the current target.
    ///
    /// # Examples
    ///
    /// ```
    /// use pcm_core::container::ContainerFormat;
    ///
    /// let layout = ContainerFormat::Int32Lsb20.layout();
    /// assert_eq!(layout.shift, 12);
    /// assert_eq!(layout.swap, cfg!(target_endian = "big"));
    /// ```
    pub const fn layout(self) -> ContainerLayout {
        use ContainerFormat::*;

        let shift = match self {
            Int32Msb16 | Int32Msb18 | Int32Msb20 | Int32Msb24 | Int32Lsb16 | Int32Lsb18
            | Int32Lsb20 | Int32Lsb24 => 32 - self.significant_bits(),
            _ => 0,
        };

        ContainerLayout {
            shift,
            swap: self.is_msb() != cfg!(target_endian = "big"),
        }
    }

    /// Convert the first `count` samples of `buf` from this container into
    /// [ContainerFormat::sample_format] in place.
    ///
    /// 64-bit floats are narrowed, so the unpacked samples occupy the first
    /// half of the region. Only whole samples within `buf` are converted.
    pub fn unpack(self, buf: &mut [u8], count: usize) {
        let bytes = self.container_bytes();
        let count = count.min(buf.len() / bytes);
        let layout = self.layout();
        let buf = &mut buf[..count * bytes];

        if layout.swap {
            swap(buf, bytes);
        }

        if layout.shift != 0 {
            for chunk in buf.chunks_exact_mut(4) {
                let value = read_i32(chunk) << layout.shift;
                chunk.copy_from_slice(&value.to_ne_bytes());
            }
        }

        if bytes == 8 {
            for n in 0..count {
                let value = read_f64(&buf[n * 8..]) as f32;
                buf[n * 4..n * 4 + 4].copy_from_slice(&value.to_ne_bytes());
            }
        }
    }

    /// Convert the first `count` samples of `buf` from
    /// [ContainerFormat::sample_format] into this container in place.
    ///
    /// For 64-bit floats the native samples are read from the first half of
    /// the region and widened. Only whole containers within `buf` are
    /// written.
    pub fn pack(self, buf: &mut [u8], count: usize) {
        let bytes = self.container_bytes();
        let count = count.min(buf.len() / bytes);
        let layout = self.layout();
        let buf = &mut buf[..count * bytes];

        if bytes == 8 {
            // Back to front, since containers are wider than the samples.
            for n in (0..count).rev() {
                let value = read_f32(&buf[n * 4..]) as f64;
                buf[n * 8..n * 8 + 8].copy_from_slice(&value.to_ne_bytes());
            }
        }

        if layout.shift != 0 {
            for chunk in buf.chunks_exact_mut(4) {
                let value = read_i32(chunk) >> layout.shift;
                chunk.copy_from_slice(&value.to_ne_bytes());
            }
        }

        if layout.swap {
            swap(buf, bytes);
        }
    }
}

fn swap(buf: &mut [u8], bytes: usize) {
    for chunk in buf.chunks_exact_mut(bytes) {
        chunk.reverse();
    }
}

#[inline]
fn read_i32(bytes: &[u8]) -> i32 {
    let mut b = [0; 4];
    b.copy_from_slice(&bytes[..4]);
    i32::from_ne_bytes(b)
}

#[inline]
fn read_f32(bytes: &[u8]) -> f32 {
    let mut b = [0; 4];
    b.copy_from_slice(&bytes[..4]);
    f32::from_ne_bytes(b)
}

#[inline]
fn read_f64(bytes: &[u8]) -> f64 {
    let mut b = [0; 8];
    b.copy_from_slice(&bytes[..8]);
    f64::from_ne_bytes(b)
}
