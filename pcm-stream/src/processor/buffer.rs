//! Views over the user buffers handed to a [Callback][super::Callback].

use std::fmt;
use std::iter;
use std::mem;
use std::slice;

use pcm_core::{Sample, SampleFormat};

fn cast<T>(bytes: &[u8], format: SampleFormat) -> Option<&[T]>
where
    T: Sample,
{
    if T::FORMAT != format || bytes.as_ptr() as usize % mem::align_of::<T>() != 0 {
        return None;
    }

    let len = bytes.len() / mem::size_of::<T>();
    // Safety: `Sample` types are plain data of the native encoding of their
    // format, and alignment was checked above.
    Some(unsafe { slice::from_raw_parts(bytes.as_ptr().cast(), len) })
}

fn cast_mut<T>(bytes: &mut [u8], format: SampleFormat) -> Option<&mut [T]>
where
    T: Sample,
{
    if T::FORMAT != format || bytes.as_ptr() as usize % mem::align_of::<T>() != 0 {
        return None;
    }

    let len = bytes.len() / mem::size_of::<T>();
    // Safety: see `cast`.
    Some(unsafe { slice::from_raw_parts_mut(bytes.as_mut_ptr().cast(), len) })
}

/// The range of samples and the stride of a channel in a block.
fn channel_range(
    channel: usize,
    channels: usize,
    frames: usize,
    interleaved: bool,
) -> (usize, usize, usize) {
    if interleaved {
        (channel, frames * channels, channels)
    } else {
        (channel * frames, (channel + 1) * frames, 1)
    }
}

/// A block of user input samples.
pub struct InputBuffer<'a> {
    bytes: &'a [u8],
    channels: usize,
    frames: usize,
    format: SampleFormat,
    interleaved: bool,
}

impl<'a> InputBuffer<'a> {
    pub(crate) fn new(
        bytes: &'a [u8],
        channels: usize,
        frames: usize,
        format: SampleFormat,
        interleaved: bool,
    ) -> Self {
        Self {
            bytes,
            channels,
            frames,
            format,
            interleaved,
        }
    }

    /// The number of channels.
    pub fn channels(&self) -> usize {
        self.channels
    }

    /// The number of frames.
    pub fn frames(&self) -> usize {
        self.frames
    }

    /// The sample format.
    pub fn format(&self) -> SampleFormat {
        self.format
    }

    /// Test if the samples are interleaved. Otherwise channels follow each
    /// other sequentially.
    pub fn is_interleaved(&self) -> bool {
        self.interleaved
    }

    /// The raw bytes of the block.
    pub fn as_bytes(&self) -> &'a [u8] {
        self.bytes
    }

    /// Access interleaved samples as a typed slice.
    ///
    /// Returns `None` unless the block is interleaved and `T` matches its
    /// format.
    pub fn interleaved<T>(&self) -> Option<&'a [T]>
    where
        T: Sample,
    {
        if !self.interleaved {
            return None;
        }

        cast(self.bytes, self.format)
    }

    /// Access a single channel.
    ///
    /// Returns `None` if `T` doesn't match the format or the channel is out
    /// of range.
    pub fn channel<T>(&self, channel: usize) -> Option<Channel<'a, T>>
    where
        T: Sample,
    {
        if channel >= self.channels {
            return None;
        }

        let samples = cast::<T>(self.bytes, self.format)?;
        let (start, end, stride) =
            channel_range(channel, self.channels, self.frames, self.interleaved);

        Some(Channel {
            buf: samples.get(start..end).unwrap_or_default(),
            stride,
        })
    }
}

/// A block of user output samples.
pub struct OutputBuffer<'a> {
    bytes: &'a mut [u8],
    channels: usize,
    frames: usize,
    format: SampleFormat,
    interleaved: bool,
}

impl<'a> OutputBuffer<'a> {
    pub(crate) fn new(
        bytes: &'a mut [u8],
        channels: usize,
        frames: usize,
        format: SampleFormat,
        interleaved: bool,
    ) -> Self {
        Self {
            bytes,
            channels,
            frames,
            format,
            interleaved,
        }
    }

    /// The number of channels.
    pub fn channels(&self) -> usize {
        self.channels
    }

    /// The number of frames.
    pub fn frames(&self) -> usize {
        self.frames
    }

    /// The sample format.
    pub fn format(&self) -> SampleFormat {
        self.format
    }

    /// Test if the samples are interleaved.
    pub fn is_interleaved(&self) -> bool {
        self.interleaved
    }

    /// The raw bytes of the block.
    pub fn as_bytes(&self) -> &[u8] {
        &*self.bytes
    }

    /// The raw bytes of the block, mutably.
    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut *self.bytes
    }

    /// Access interleaved samples as a typed slice.
    pub fn interleaved<T>(&self) -> Option<&[T]>
    where
        T: Sample,
    {
        if !self.interleaved {
            return None;
        }

        cast(&*self.bytes, self.format)
    }

    /// Access interleaved samples as a mutable typed slice.
    ///
    /// # Examples
    ///
    /// ```
    /// use pcm_stream::{BufferProcessor, ChannelConfig, Flow, TimeInfo};
    /// use pcm_core::{SampleFormat, StatusFlags};
    ///
    /// # fn main() -> pcm_stream::Result<()> {
    /// let mut processor = BufferProcessor::builder()
    ///     .output(ChannelConfig::new(1, SampleFormat::F32, SampleFormat::F32))
    ///     .frames_per_host_buffer(4)
    ///     .callback(|_, output, _, _, _| {
    ///         if let Some(samples) = output.and_then(|o| o.interleaved_mut::<f32>()) {
    ///             samples.fill(0.25);
    ///         }
    ///
    ///         Flow::Continue
    ///     })
    ///     .build()?;
    ///
    /// let mut host = [0u8; 16];
    /// let mut period = processor.begin_processing(TimeInfo::default(), StatusFlags::NONE);
    /// period.set_output_frame_count(0);
    /// period.set_interleaved_output_channels(0, &mut host, 0);
    /// assert_eq!(period.end_processing(&mut Flow::Continue), 4);
    ///
    /// assert_eq!(f32::from_ne_bytes([host[12], host[13], host[14], host[15]]), 0.25);
    /// # Ok(()) }
    /// ```
    pub fn interleaved_mut<T>(&mut self) -> Option<&mut [T]>
    where
        T: Sample,
    {
        if !self.interleaved {
            return None;
        }

        cast_mut(&mut *self.bytes, self.format)
    }

    /// Access a single channel.
    pub fn channel<T>(&self, channel: usize) -> Option<Channel<'_, T>>
    where
        T: Sample,
    {
        if channel >= self.channels {
            return None;
        }

        let samples = cast::<T>(&*self.bytes, self.format)?;
        let (start, end, stride) =
            channel_range(channel, self.channels, self.frames, self.interleaved);

        Some(Channel {
            buf: samples.get(start..end).unwrap_or_default(),
            stride,
        })
    }

    /// Mutably access a single channel.
    ///
    /// Returns `None` if `T` doesn't match the format or the channel is out
    /// of range.
    pub fn channel_mut<T>(&mut self, channel: usize) -> Option<ChannelMut<'_, T>>
    where
        T: Sample,
    {
        if channel >= self.channels {
            return None;
        }

        let (start, end, stride) =
            channel_range(channel, self.channels, self.frames, self.interleaved);
        let samples = cast_mut::<T>(&mut *self.bytes, self.format)?;

        Some(ChannelMut {
            buf: samples.get_mut(start..end).unwrap_or_default(),
            stride,
        })
    }

    /// Fill the block with silence.
    pub fn fill_silence(&mut self) {
        pcm_core::convert::select_zeroer(self.format)(&mut *self.bytes, 1, self.frames * self.channels);
    }
}

/// The samples of a single channel, which may be strided.
pub struct Channel<'a, T> {
    buf: &'a [T],
    stride: usize,
}

impl<'a, T> Channel<'a, T>
where
    T: Copy,
{
    /// The number of frames in the channel.
    pub fn frames(&self) -> usize {
        (self.buf.len() + self.stride - 1) / self.stride
    }

    /// Get the sample at the given frame.
    pub fn get(&self, frame: usize) -> Option<T> {
        self.buf.get(frame * self.stride).copied()
    }

    /// Iterate over the samples in the channel.
    pub fn iter(&self) -> iter::Copied<iter::StepBy<slice::Iter<'a, T>>> {
        self.buf.iter().step_by(self.stride).copied()
    }

    /// Copy the channel into `out`, returning the number of samples copied.
    pub fn copy_to_slice(&self, out: &mut [T]) -> usize {
        let mut n = 0;

        for (o, s) in out.iter_mut().zip(self.iter()) {
            *o = s;
            n += 1;
        }

        n
    }
}

impl<T> fmt::Debug for Channel<'_, T>
where
    T: Copy + fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

/// The mutable samples of a single channel, which may be strided.
pub struct ChannelMut<'a, T> {
    buf: &'a mut [T],
    stride: usize,
}

impl<'a, T> ChannelMut<'a, T>
where
    T: Copy,
{
    /// The number of frames in the channel.
    pub fn frames(&self) -> usize {
        (self.buf.len() + self.stride - 1) / self.stride
    }

    /// Iterate over the samples in the channel.
    pub fn iter(&self) -> iter::Copied<iter::StepBy<slice::Iter<'_, T>>> {
        self.buf.iter().step_by(self.stride).copied()
    }

    /// Iterate mutably over the samples in the channel.
    pub fn iter_mut(&mut self) -> iter::StepBy<slice::IterMut<'_, T>> {
        self.buf.iter_mut().step_by(self.stride)
    }

    /// Copy from `data` into the channel, returning the number of samples
    /// copied.
    pub fn copy_from_slice(&mut self, data: &[T]) -> usize {
        let mut n = 0;

        for (o, s) in self.iter_mut().zip(data) {
            *o = *s;
            n += 1;
        }

        n
    }

    /// Set every sample in the channel to `value`.
    pub fn fill(&mut self, value: T) {
        for o in self.iter_mut() {
            *o = value;
        }
    }
}

impl<T> fmt::Debug for ChannelMut<'_, T>
where
    T: Copy + fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}
