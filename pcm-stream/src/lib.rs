//! Adaptation between the buffers an audio host delivers and the buffers an
//! application callback expects.
//!
//! Hosts hand over hardware periods of whatever size, sample format and
//! channel layout the device happens to use. Applications want a fixed
//! number of frames per callback in their own format. The [BufferProcessor]
//! converts and re-blocks between the two, and the [Stream] wraps whatever
//! [StreamInterface] a backend implements, enforcing the rules common to
//! every backend.
//!
//! <br>
//!
//! ## Features
//!
//! * `loopback` (default) - a [reference backend][loopback] which feeds the
//!   output of a stream back into its input.
//!
//! <br>
//!
//! ## Examples
//!
//! ```
//! use pcm_core::{SampleFormat, StatusFlags, StreamFlags};
//! use pcm_stream::{BufferProcessor, ChannelConfig, Flow, TimeInfo};
//!
//! # fn main() -> pcm_stream::Result<()> {
//! let mut processor = BufferProcessor::builder()
//!     .output(ChannelConfig::new(2, SampleFormat::F32, SampleFormat::I16))
//!     .frames_per_user_buffer(64)
//!     .frames_per_host_buffer(256)
//!     .flags(StreamFlags::DITHER_OFF)
//!     .callback(|_, output, _, _, _| {
//!         if let Some(samples) = output.and_then(|o| o.interleaved_mut::<f32>()) {
//!             samples.fill(0.25);
//!         }
//!
//!         Flow::Continue
//!     })
//!     .build()?;
//!
//! let mut host = vec![0u8; 256 * 2 * 2];
//!
//! let mut period = processor.begin_processing(TimeInfo::default(), StatusFlags::NONE);
//! period.set_output_frame_count(0);
//! period.set_interleaved_output_channels(0, &mut host, 0);
//!
//! let mut flow = Flow::Continue;
//! assert_eq!(period.end_processing(&mut flow), 256);
//! assert_eq!(i16::from_ne_bytes([host[0], host[1]]), 8191);
//! # Ok(()) }
//! ```

#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub(crate) mod loom;

#[macro_use]
#[doc(hidden)]
mod macros;

mod error;
pub use self::error::{Error, Result};

pub mod alloc;

pub mod processor;
pub use self::processor::{
    BufferProcessor, Builder, Callback, Channel, ChannelConfig, ChannelMut, Flow,
    HostBufferSizeMode, InputBuffer, OutputBuffer, Period, TimeInfo,
};

mod cpu_load;
pub use self::cpu_load::CpuLoadMeasurer;

pub mod stream;
pub use self::stream::{FinishedCallback, Stream, StreamInfo, StreamInterface, StreamMode};

cfg_loopback! {
    pub mod loopback;
}
