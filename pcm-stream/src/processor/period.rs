use std::marker::PhantomData;
use std::ptr::NonNull;

use crate::processor::direction::Direction;
use crate::processor::{BufferProcessor, Flow, TimeInfo};

/// A single host period being processed by a [BufferProcessor].
///
/// Host buffers registered on the period must outlive it. Registrations are
/// forgotten when the period is ended or dropped.
///
/// # Panics
///
/// Registering buffers for a direction the processor wasn't configured with,
/// or for a channel which is out of range, panics.
pub struct Period<'p, 'buf> {
    processor: &'p mut BufferProcessor,
    _marker: PhantomData<&'buf mut [u8]>,
}

impl<'p, 'buf> Period<'p, 'buf> {
    pub(super) fn new(processor: &'p mut BufferProcessor) -> Self {
        Self {
            processor,
            _marker: PhantomData,
        }
    }

    /// The time info for the period, adjusted for the latency of the
    /// processor.
    pub fn time(&self) -> TimeInfo {
        self.processor.time
    }

    /// Set the number of frames in the first input fragment. Zero means the
    /// configured number of frames per host buffer.
    pub fn set_input_frame_count(&mut self, frames: usize) {
        let frames = self.host_frames(frames);
        input(self.processor).fragments[0].frames = frames;
    }

    /// Set the number of frames in the second input fragment, which is used
    /// when the host buffer wraps around.
    pub fn set_second_input_frame_count(&mut self, frames: usize) {
        input(self.processor).fragments[1].frames = frames;
    }

    /// Indicate that no input is available this period. The callback
    /// receives silence in its place.
    pub fn set_no_input(&mut self) {
        input(self.processor).absent = true;
    }

    /// Register the host buffer of a single input channel, where consecutive
    /// samples are `stride` samples apart.
    pub fn set_input_channel(&mut self, channel: usize, data: &'buf [u8], stride: usize) {
        register_input(input(self.processor), 0, channel, data, 0, stride);
    }

    /// Register an interleaved host buffer containing `count` input channels
    /// starting at `first`. A count of zero means every channel.
    pub fn set_interleaved_input_channels(&mut self, first: usize, data: &'buf [u8], count: usize) {
        register_interleaved_input(input(self.processor), 0, first, data, count);
    }

    /// Register the host buffer of a single non-interleaved input channel.
    pub fn set_non_interleaved_input_channel(&mut self, channel: usize, data: &'buf [u8]) {
        register_input(input(self.processor), 0, channel, data, 0, 1);
    }

    /// Register a single input channel of the second fragment.
    pub fn set_second_input_channel(&mut self, channel: usize, data: &'buf [u8], stride: usize) {
        register_input(input(self.processor), 1, channel, data, 0, stride);
    }

    /// Register interleaved input channels of the second fragment.
    pub fn set_second_interleaved_input_channels(
        &mut self,
        first: usize,
        data: &'buf [u8],
        count: usize,
    ) {
        register_interleaved_input(input(self.processor), 1, first, data, count);
    }

    /// Register a single non-interleaved input channel of the second
    /// fragment.
    pub fn set_second_non_interleaved_input_channel(&mut self, channel: usize, data: &'buf [u8]) {
        register_input(input(self.processor), 1, channel, data, 0, 1);
    }

    /// Set the number of frames in the first output fragment. Zero means the
    /// configured number of frames per host buffer.
    pub fn set_output_frame_count(&mut self, frames: usize) {
        let frames = self.host_frames(frames);
        output(self.processor).fragments[0].frames = frames;
    }

    /// Set the number of frames in the second output fragment.
    pub fn set_second_output_frame_count(&mut self, frames: usize) {
        output(self.processor).fragments[1].frames = frames;
    }

    /// Indicate that there's no host output buffer this period. Whatever the
    /// callback produces for it is discarded.
    pub fn set_no_output(&mut self) {
        output(self.processor).absent = true;
    }

    /// Register the host buffer of a single output channel, where
    /// consecutive samples are `stride` samples apart.
    pub fn set_output_channel(&mut self, channel: usize, data: &'buf mut [u8], stride: usize) {
        register_output(output(self.processor), 0, channel, data, 0, stride);
    }

    /// Register an interleaved host buffer containing `count` output
    /// channels starting at `first`. A count of zero means every channel.
    pub fn set_interleaved_output_channels(
        &mut self,
        first: usize,
        data: &'buf mut [u8],
        count: usize,
    ) {
        register_interleaved_output(output(self.processor), 0, first, data, count);
    }

    /// Register the host buffer of a single non-interleaved output channel.
    pub fn set_non_interleaved_output_channel(&mut self, channel: usize, data: &'buf mut [u8]) {
        register_output(output(self.processor), 0, channel, data, 0, 1);
    }

    /// Register a single output channel of the second fragment.
    pub fn set_second_output_channel(
        &mut self,
        channel: usize,
        data: &'buf mut [u8],
        stride: usize,
    ) {
        register_output(output(self.processor), 1, channel, data, 0, stride);
    }

    /// Register interleaved output channels of the second fragment.
    pub fn set_second_interleaved_output_channels(
        &mut self,
        first: usize,
        data: &'buf mut [u8],
        count: usize,
    ) {
        register_interleaved_output(output(self.processor), 1, first, data, count);
    }

    /// Register a single non-interleaved output channel of the second
    /// fragment.
    pub fn set_second_non_interleaved_output_channel(
        &mut self,
        channel: usize,
        data: &'buf mut [u8],
    ) {
        register_output(output(self.processor), 1, channel, data, 0, 1);
    }

    /// Convert everything registered, invoking the callback as needed.
    ///
    /// `flow` carries the result of the last callback invocation in and out.
    /// Pass [Flow::Continue] while the stream runs. Once it's anything else,
    /// the callback is no longer invoked and remaining host output is
    /// silenced after any buffered output has been drained.
    ///
    /// Returns the number of host frames processed.
    pub fn end_processing(mut self, flow: &mut Flow) -> usize {
        self.processor.process(flow)
    }

    /// Convert up to `frames` frames of host input from the first fragment
    /// into `buffer`, which holds a user block of `frames` frames.
    ///
    /// Returns the number of frames copied.
    pub fn copy_input(&mut self, buffer: &mut [u8], frames: usize) -> usize {
        self.copy_input_at(buffer, frames, 0, frames)
    }

    /// Convert up to `frames` frames from `buffer`, which holds a user block
    /// of `frames` frames, into the first output fragment.
    ///
    /// Returns the number of frames copied.
    pub fn copy_output(&mut self, buffer: &[u8], frames: usize) -> usize {
        self.copy_output_at(buffer, frames, 0, frames)
    }

    /// Like [Period::copy_input], but `buffer` holds a user block of `span`
    /// frames which is filled from frame `at`.
    ///
    /// This is how a user block larger than the host buffer is gathered over
    /// several periods. For non-interleaved user buffers each channel lives
    /// at `channel * span` frames into `buffer`, so filling it piecewise
    /// through sub-slices would scatter channels into the wrong place.
    ///
    /// Returns the number of frames copied, which is bounded by the frames
    /// left in the first input fragment.
    pub fn copy_input_at(
        &mut self,
        buffer: &mut [u8],
        span: usize,
        at: usize,
        frames: usize,
    ) -> usize {
        let BufferProcessor { input, dither, .. } = &mut *self.processor;
        require(input, "input").copy_to_user(buffer, at, span, frames, dither)
    }

    /// Like [Period::copy_output], but `buffer` holds a user block of `span`
    /// frames which is read from frame `at`.
    ///
    /// The output counterpart of [Period::copy_input_at].
    ///
    /// Returns the number of frames copied.
    pub fn copy_output_at(
        &mut self,
        buffer: &[u8],
        span: usize,
        at: usize,
        frames: usize,
    ) -> usize {
        let BufferProcessor { output, dither, .. } = &mut *self.processor;
        require(output, "output").copy_from_user(buffer, at, span, frames, dither)
    }

    /// Silence up to `frames` frames of the first output fragment.
    ///
    /// Returns the number of frames silenced.
    pub fn zero_output(&mut self, frames: usize) -> usize {
        let output = output(self.processor);
        let n = usize::min(output.fragments[0].frames, frames);
        output.zero_host(0, n);
        n
    }

    fn host_frames(&self, frames: usize) -> usize {
        if frames == 0 {
            self.processor.frames_per_host_buffer
        } else {
            frames
        }
    }
}

impl Drop for Period<'_, '_> {
    fn drop(&mut self) {
        self.processor.clear_descriptors();
    }
}

fn require<'a>(direction: &'a mut Option<Direction>, what: &str) -> &'a mut Direction {
    match direction {
        Some(direction) => direction,
        None => panic!("buffer processor has no {} channels", what),
    }
}

fn input(processor: &mut BufferProcessor) -> &mut Direction {
    require(&mut processor.input, "input")
}

fn output(processor: &mut BufferProcessor) -> &mut Direction {
    require(&mut processor.output, "output")
}

fn register_input(
    direction: &mut Direction,
    fragment: usize,
    channel: usize,
    data: &[u8],
    offset: usize,
    stride: usize,
) {
    let offset = usize::min(offset, data.len());
    // Input descriptors are only ever read through.
    let ptr = data.as_ptr().wrapping_add(offset) as *mut u8;
    register(direction, fragment, channel, ptr, data.len() - offset, stride);
}

fn register_output(
    direction: &mut Direction,
    fragment: usize,
    channel: usize,
    data: &mut [u8],
    offset: usize,
    stride: usize,
) {
    let offset = usize::min(offset, data.len());
    let ptr = data.as_mut_ptr().wrapping_add(offset);
    register(direction, fragment, channel, ptr, data.len() - offset, stride);
}

fn register(
    direction: &mut Direction,
    fragment: usize,
    channel: usize,
    ptr: *mut u8,
    len: usize,
    stride: usize,
) {
    let desc = direction.fragments[fragment].channels.get_mut(channel);

    if let Some(ptr) = NonNull::new(ptr) {
        desc.set(ptr, len, stride);
    }
}

fn channel_count(direction: &Direction, first: usize, count: usize) -> usize {
    let count = if count == 0 {
        direction.channels.saturating_sub(first)
    } else {
        count
    };

    assert!(
        first + count <= direction.channels,
        "channels {}..{} out of range; channels = {}",
        first,
        first + count,
        direction.channels
    );

    count
}

fn register_interleaved_input(
    direction: &mut Direction,
    fragment: usize,
    first: usize,
    data: &[u8],
    count: usize,
) {
    let count = channel_count(direction, first, count);
    let host_bytes = direction.host_bytes();

    for c in 0..count {
        register_input(direction, fragment, first + c, data, c * host_bytes, count);
    }
}

fn register_interleaved_output(
    direction: &mut Direction,
    fragment: usize,
    first: usize,
    data: &mut [u8],
    count: usize,
) {
    let count = channel_count(direction, first, count);
    let host_bytes = direction.host_bytes();
    let base = data.as_mut_ptr();
    let len = data.len();

    for c in 0..count {
        let offset = usize::min(c * host_bytes, len);
        register(
            direction,
            fragment,
            first + c,
            base.wrapping_add(offset),
            len - offset,
            count,
        );
    }
}
