//! The core sample handling used when adapting PCM buffers between a host and
//! an application.
//!
//! This crate has no I/O. It describes the supported [SampleFormat]s, provides
//! the [Sample] trait used for typed access to raw sample bytes, and selects
//! the [Converter] and [Zeroer] functions which move runs of strided samples
//! from one encoding to another.
//!
//! Conversions which reduce precision apply triangular dither through
//! [TriangularDither] unless [StreamFlags::DITHER_OFF] is set, and float to
//! integer conversions clip unless [StreamFlags::CLIP_OFF] is set.
//!
//! ```
//! use pcm_core::{convert, SampleFormat, StreamFlags, TriangularDither};
//!
//! let src = [0.5f32.to_ne_bytes(), (-1.0f32).to_ne_bytes()].concat();
//! let mut dst = [0u8; 4];
//!
//! let converter = convert::select_converter(SampleFormat::F32, SampleFormat::I16, StreamFlags::DITHER_OFF);
//! converter(&mut dst, 1, &src, 1, 2, &mut TriangularDither::new());
//!
//! assert_eq!(i16::from_ne_bytes([dst[0], dst[1]]), 16383);
//! assert_eq!(i16::from_ne_bytes([dst[2], dst[3]]), -32767);
//! ```

#![deny(missing_docs, rustdoc::broken_intra_doc_links)]

mod format;
pub use self::format::{closest_available, FormatSet, SampleFormat};

mod sample;
pub use self::sample::{Sample, I24};

mod flags;
pub use self::flags::{StatusFlags, StreamFlags};

mod dither;
pub use self::dither::TriangularDither;

pub mod convert;
pub use self::convert::{Converter, Zeroer};

pub mod container;
pub use self::container::{ContainerFormat, ContainerLayout};
