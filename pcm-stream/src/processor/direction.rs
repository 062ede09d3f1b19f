use std::mem;
use std::slice;

use pcm_core::convert::{self, Converter, Zeroer};
use pcm_core::{SampleFormat, StreamFlags, TriangularDither};

use crate::error::{Error, Result};
use crate::processor::buffer::{InputBuffer, OutputBuffer};
use crate::processor::descriptor::Fragment;
use crate::processor::ChannelConfig;

/// A zero-initialized byte buffer aligned for any [pcm_core::Sample].
pub(crate) struct TempBuffer {
    words: Vec<u64>,
    len: usize,
}

impl TempBuffer {
    pub(crate) fn new(len: usize) -> Result<Self> {
        let count = (len + mem::size_of::<u64>() - 1) / mem::size_of::<u64>();

        let mut words = Vec::new();
        words
            .try_reserve_exact(count)
            .map_err(|_| Error::InsufficientMemory)?;
        words.resize(count, 0);

        Ok(Self { words, len })
    }

    pub(crate) fn bytes(&self) -> &[u8] {
        // Safety: `len` never exceeds the byte size of `words`.
        unsafe { slice::from_raw_parts(self.words.as_ptr().cast(), self.len) }
    }

    pub(crate) fn bytes_mut(&mut self) -> &mut [u8] {
        // Safety: `len` never exceeds the byte size of `words`.
        unsafe { slice::from_raw_parts_mut(self.words.as_mut_ptr().cast(), self.len) }
    }

    pub(crate) fn clear(&mut self) {
        for w in self.words.iter_mut() {
            *w = 0;
        }
    }
}

/// The configuration and state of one direction of a buffer processor.
pub(crate) struct Direction {
    pub(crate) channels: usize,
    pub(crate) user_format: SampleFormat,
    pub(crate) host_format: SampleFormat,
    pub(crate) interleaved: bool,
    pub(crate) converter: Converter,
    pub(crate) host_zeroer: Zeroer,
    pub(crate) user_zeroer: Zeroer,
    pub(crate) temp: TempBuffer,
    /// Frames of silence the temp buffer holds after a reset.
    pub(crate) initial_frames: usize,
    pub(crate) frames_in_temp: usize,
    pub(crate) fragments: [Fragment; 2],
    /// Set when the host supplied no buffer for this period.
    pub(crate) absent: bool,
}

impl Direction {
    /// Set up a direction converting from `src` to `dst` samples.
    pub(crate) fn new(
        config: &ChannelConfig,
        src: SampleFormat,
        dst: SampleFormat,
        flags: StreamFlags,
        frames_per_temp: usize,
        initial_frames: usize,
    ) -> Result<Self> {
        let user_bytes = config.user.bytes();
        let temp = TempBuffer::new(frames_per_temp * config.channels * user_bytes)?;

        Ok(Self {
            channels: config.channels,
            user_format: config.user,
            host_format: config.host,
            interleaved: config.interleaved,
            converter: convert::select_converter(src, dst, flags),
            host_zeroer: convert::select_zeroer(config.host),
            user_zeroer: convert::select_zeroer(config.user),
            temp,
            initial_frames,
            frames_in_temp: initial_frames,
            fragments: [Fragment::new(config.channels), Fragment::new(config.channels)],
            absent: false,
        })
    }

    pub(crate) fn user_bytes(&self) -> usize {
        self.user_format.bytes()
    }

    pub(crate) fn host_bytes(&self) -> usize {
        self.host_format.bytes()
    }

    /// Restore the temp buffer to its initial state.
    pub(crate) fn reset(&mut self) {
        self.frames_in_temp = self.initial_frames;

        if self.initial_frames > 0 {
            self.temp.clear();
        }
    }

    /// Forget every registered host buffer.
    pub(crate) fn clear(&mut self) {
        for fragment in self.fragments.iter_mut() {
            fragment.clear();
        }

        self.absent = false;
    }

    /// Total host frames left across both fragments.
    pub(crate) fn host_frames(&self) -> usize {
        self.fragments[0].frames + self.fragments[1].frames
    }

    /// The first fragment which still has frames.
    pub(crate) fn current_fragment(&self) -> usize {
        if self.fragments[0].frames > 0 {
            0
        } else {
            1
        }
    }

    /// Byte offset and sample stride of `channel` at frame `at` in a user
    /// block of `span` frames.
    fn user_position(&self, channel: usize, at: usize, span: usize) -> (usize, usize) {
        if self.interleaved {
            ((at * self.channels + channel) * self.user_bytes(), self.channels)
        } else {
            ((channel * span + at) * self.user_bytes(), 1)
        }
    }

    /// Convert `frames` host frames from `fragment` into the temp buffer at
    /// frame `at`, laid out as a block of `span` frames.
    pub(crate) fn read_host(
        &mut self,
        fragment: usize,
        at: usize,
        span: usize,
        frames: usize,
        dither: &mut TriangularDither,
    ) {
        let host_bytes = self.host_bytes();

        for c in 0..self.channels {
            let (offset, stride) = self.user_position(c, at, span);
            let dst = self.temp.bytes_mut().get_mut(offset..).unwrap_or_default();
            let desc = self.fragments[fragment].channels.get_mut(c);

            // Safety: descriptors are only registered for the duration of
            // the period which is processing them.
            match unsafe { desc.bytes() } {
                Some(src) if !self.absent => {
                    (self.converter)(dst, stride, src, desc.stride(), frames, dither)
                }
                _ => (self.user_zeroer)(dst, stride, frames),
            }

            desc.advance(frames, host_bytes);
        }

        self.consume(fragment, frames);
    }

    /// Convert `frames` frames from the temp buffer at frame `at`, laid out as
    /// a block of `span` frames, into host `fragment`.
    pub(crate) fn write_host(
        &mut self,
        fragment: usize,
        at: usize,
        span: usize,
        frames: usize,
        dither: &mut TriangularDither,
    ) {
        if !self.absent {
            let host_bytes = self.host_bytes();

            for c in 0..self.channels {
                let (offset, stride) = self.user_position(c, at, span);
                let src = self.temp.bytes().get(offset..).unwrap_or_default();
                let desc = self.fragments[fragment].channels.get_mut(c);

                // Safety: descriptors are only registered for the duration of
                // the period which is processing them.
                if let Some(dst) = unsafe { desc.bytes_mut() } {
                    (self.converter)(dst, desc.stride(), src, stride, frames, dither);
                }

                desc.advance(frames, host_bytes);
            }
        }

        self.consume(fragment, frames);
    }

    /// Write `frames` frames of silence into host `fragment`.
    pub(crate) fn zero_host(&mut self, fragment: usize, frames: usize) {
        if !self.absent {
            let host_bytes = self.host_bytes();

            for c in 0..self.channels {
                let desc = self.fragments[fragment].channels.get_mut(c);

                // Safety: see `write_host`.
                if let Some(dst) = unsafe { desc.bytes_mut() } {
                    (self.host_zeroer)(dst, desc.stride(), frames);
                }

                desc.advance(frames, host_bytes);
            }
        }

        self.consume(fragment, frames);
    }

    /// Step past `frames` host frames in `fragment` without touching them.
    pub(crate) fn skip_host(&mut self, fragment: usize, frames: usize) {
        let host_bytes = self.host_bytes();
        self.fragments[fragment]
            .channels
            .advance(frames, host_bytes);
        self.consume(fragment, frames);
    }

    /// Silence whatever is left of both host fragments.
    pub(crate) fn zero_remaining_host(&mut self) {
        for fragment in 0..2 {
            let frames = self.fragments[fragment].frames;

            if frames > 0 {
                self.zero_host(fragment, frames);
            }
        }
    }

    /// Move buffered output from the temp buffer into the host fragments
    /// until either runs out. `span` is the size of the temp block.
    pub(crate) fn drain_temp(&mut self, span: usize, dither: &mut TriangularDither) {
        while self.frames_in_temp > 0 && self.host_frames() > 0 {
            let fragment = self.current_fragment();
            let frames = usize::min(self.fragments[fragment].frames, self.frames_in_temp);
            self.write_host(fragment, span - self.frames_in_temp, span, frames, dither);
            self.frames_in_temp -= frames;
        }
    }

    /// Convert up to `frames` frames of host input from the first fragment
    /// directly into a caller provided user block of `span` frames, starting
    /// at frame `at`.
    pub(crate) fn copy_to_user(
        &mut self,
        user: &mut [u8],
        at: usize,
        span: usize,
        frames: usize,
        dither: &mut TriangularDither,
    ) -> usize {
        let n = usize::min(self.fragments[0].frames, frames);
        let host_bytes = self.host_bytes();

        for c in 0..self.channels {
            let (offset, stride) = self.user_position(c, at, span);
            let dst = user.get_mut(offset..).unwrap_or_default();
            let desc = self.fragments[0].channels.get_mut(c);

            // Safety: see `read_host`.
            match unsafe { desc.bytes() } {
                Some(src) => (self.converter)(dst, stride, src, desc.stride(), n, dither),
                None => (self.user_zeroer)(dst, stride, n),
            }

            desc.advance(n, host_bytes);
        }

        self.consume(0, n);
        n
    }

    /// Convert up to `frames` frames from a caller provided user block of
    /// `span` frames, starting at frame `at`, directly into the first host
    /// fragment.
    pub(crate) fn copy_from_user(
        &mut self,
        user: &[u8],
        at: usize,
        span: usize,
        frames: usize,
        dither: &mut TriangularDither,
    ) -> usize {
        let n = usize::min(self.fragments[0].frames, frames);
        let host_bytes = self.host_bytes();

        for c in 0..self.channels {
            let (offset, stride) = self.user_position(c, at, span);
            let src = user.get(offset..).unwrap_or_default();
            let desc = self.fragments[0].channels.get_mut(c);

            // Safety: see `write_host`.
            if let Some(dst) = unsafe { desc.bytes_mut() } {
                (self.converter)(dst, desc.stride(), src, stride, n, dither);
            }

            desc.advance(n, host_bytes);
        }

        self.consume(0, n);
        n
    }

    /// The user view of the temp input buffer for `frames` frames.
    pub(crate) fn input_buffer(&self, frames: usize) -> InputBuffer<'_> {
        let len = frames * self.channels * self.user_bytes();
        let bytes = self.temp.bytes().get(..len).unwrap_or_default();
        InputBuffer::new(bytes, self.channels, frames, self.user_format, self.interleaved)
    }

    /// The user view of the temp output buffer for `frames` frames.
    pub(crate) fn output_buffer(&mut self, frames: usize) -> OutputBuffer<'_> {
        let len = frames * self.channels * self.user_bytes();
        let (channels, format, interleaved) = (self.channels, self.user_format, self.interleaved);
        let bytes = self.temp.bytes_mut().get_mut(..len).unwrap_or_default();
        OutputBuffer::new(bytes, channels, frames, format, interleaved)
    }

    fn consume(&mut self, fragment: usize, frames: usize) {
        let count = &mut self.fragments[fragment].frames;
        *count = count.saturating_sub(frames);
    }
}
