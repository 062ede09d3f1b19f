//! Adapting host buffers to application callbacks.
//!
//! A [BufferProcessor] sits between a host, which delivers hardware buffers
//! of whatever size and encoding the device uses, and an application
//! [Callback], which expects buffers of a fixed size in its own sample
//! format and layout. Once per host period the host calls
//! [BufferProcessor::begin_processing], registers its buffers on the returned
//! [Period], and calls [Period::end_processing] which converts, chunks, or
//! accumulates as needed and invokes the callback zero or more times.
//!
//! If the user buffer size is unspecified, or the host buffer size is a fixed
//! multiple of it, buffers are processed in place in chunks. Otherwise the
//! processor adapts through internal temporary buffers, which adds latency
//! reported through [BufferProcessor::input_latency_frames] and
//! [BufferProcessor::output_latency_frames].

use pcm_core::{SampleFormat, StatusFlags, StreamFlags, TriangularDither};

use crate::error::{Error, Result};

mod buffer;
pub use self::buffer::{Channel, ChannelMut, InputBuffer, OutputBuffer};

mod descriptor;

mod direction;
use self::direction::Direction;

mod period;
pub use self::period::Period;

mod process;

#[cfg(test)]
mod tests;

/// Default sample rate.
const DEFAULT_SAMPLE_RATE: f64 = 44100.0;
/// Default number of frames per user buffer, which leaves it unspecified.
const DEFAULT_FRAMES_PER_USER_BUFFER: usize = 0;
/// Default number of frames per host buffer.
const DEFAULT_FRAMES_PER_HOST_BUFFER: usize = 256;
/// Default host buffer size mode.
const DEFAULT_HOST_BUFFER_SIZE_MODE: HostBufferSizeMode = HostBufferSizeMode::Fixed;
/// Temp buffer size used when the host buffer size isn't known up front.
const UNKNOWN_HOST_FRAMES_PER_TEMP: usize = 1024;

/// How the number of frames in host buffers may vary between periods.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostBufferSizeMode {
    /// Every period has exactly the configured number of frames.
    Fixed,
    /// Periods have at most the configured number of frames.
    Bounded,
    /// Nothing is known about the size of periods.
    Unknown,
    /// Like [HostBufferSizeMode::Unknown], but the host accepts that not all
    /// of a period is consumed if it's less than a full user buffer.
    VariablePartialUsageAllowed,
}

/// The intent returned by a callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Keep calling the callback.
    Continue,
    /// Play out everything produced so far, then stop.
    Complete,
    /// Stop as soon as possible, discarding pending output.
    Abort,
}

/// Timestamps in seconds relevant to a callback invocation.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct TimeInfo {
    /// When the first input sample was captured by the device.
    pub input_buffer_adc_time: f64,
    /// When the callback was invoked.
    pub current_time: f64,
    /// When the first output sample will be played by the device.
    pub output_buffer_dac_time: f64,
}

/// The channels and sample formats of one direction.
///
/// # Examples
///
/// ```
/// use pcm_stream::ChannelConfig;
/// use pcm_core::SampleFormat;
///
/// let config = ChannelConfig::new(2, SampleFormat::F32, SampleFormat::I16).sequential();
/// assert_eq!(config.channels(), 2);
/// assert!(!config.is_interleaved());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelConfig {
    channels: usize,
    user: SampleFormat,
    host: SampleFormat,
    interleaved: bool,
}

impl ChannelConfig {
    /// Construct a configuration for `channels` channels where the
    /// application uses `user` samples and the host `host` samples. User
    /// buffers are interleaved.
    pub fn new(channels: usize, user: SampleFormat, host: SampleFormat) -> Self {
        Self {
            channels,
            user,
            host,
            interleaved: true,
        }
    }

    /// Lay out user buffers sequentially, one channel after another.
    pub fn sequential(self) -> Self {
        Self {
            interleaved: false,
            ..self
        }
    }

    /// The number of channels.
    pub fn channels(&self) -> usize {
        self.channels
    }

    /// The user sample format.
    pub fn user_format(&self) -> SampleFormat {
        self.user
    }

    /// The host sample format.
    pub fn host_format(&self) -> SampleFormat {
        self.host
    }

    /// Test if user buffers are interleaved.
    pub fn is_interleaved(&self) -> bool {
        self.interleaved
    }
}

/// An application callback.
///
/// This is implemented for every matching closure, so most users pass a
/// closure to [Builder::callback] instead.
pub trait Callback: Send {
    /// Process `frames` frames.
    ///
    /// `input` is `None` if the stream has no input channels, and `output` is
    /// `None` if it has no output channels.
    fn process(
        &mut self,
        input: Option<&InputBuffer<'_>>,
        output: Option<&mut OutputBuffer<'_>>,
        frames: usize,
        time: &TimeInfo,
        status: StatusFlags,
    ) -> Flow;
}

impl<F> Callback for F
where
    F: Send
        + FnMut(
            Option<&InputBuffer<'_>>,
            Option<&mut OutputBuffer<'_>>,
            usize,
            &TimeInfo,
            StatusFlags,
        ) -> Flow,
{
    fn process(
        &mut self,
        input: Option<&InputBuffer<'_>>,
        output: Option<&mut OutputBuffer<'_>>,
        frames: usize,
        time: &TimeInfo,
        status: StatusFlags,
    ) -> Flow {
        self(input, output, frames, time, status)
    }
}

/// A [BufferProcessor] configuration.
///
/// See [BufferProcessor::builder].
pub struct Builder {
    input: Option<ChannelConfig>,
    output: Option<ChannelConfig>,
    sample_rate: f64,
    flags: StreamFlags,
    frames_per_user_buffer: usize,
    frames_per_host_buffer: usize,
    host_buffer_size_mode: HostBufferSizeMode,
    callback: Option<Box<dyn Callback>>,
}

impl Builder {
    fn new() -> Self {
        Self {
            input: None,
            output: None,
            sample_rate: DEFAULT_SAMPLE_RATE,
            flags: StreamFlags::NONE,
            frames_per_user_buffer: DEFAULT_FRAMES_PER_USER_BUFFER,
            frames_per_host_buffer: DEFAULT_FRAMES_PER_HOST_BUFFER,
            host_buffer_size_mode: DEFAULT_HOST_BUFFER_SIZE_MODE,
            callback: None,
        }
    }

    /// Configure input channels. A configuration with zero channels disables
    /// input.
    pub fn input(self, input: ChannelConfig) -> Self {
        Self {
            input: Some(input).filter(|c| c.channels > 0),
            ..self
        }
    }

    /// Configure output channels. A configuration with zero channels disables
    /// output.
    pub fn output(self, output: ChannelConfig) -> Self {
        Self {
            output: Some(output).filter(|c| c.channels > 0),
            ..self
        }
    }

    /// Configure the sample rate used to advance timestamps.
    pub fn sample_rate(self, sample_rate: f64) -> Self {
        Self {
            sample_rate,
            ..self
        }
    }

    /// Configure stream flags.
    pub fn flags(self, flags: StreamFlags) -> Self {
        Self { flags, ..self }
    }

    /// Configure the number of frames passed to each callback invocation.
    /// Zero leaves it unspecified, so the callback receives whatever is most
    /// efficient.
    pub fn frames_per_user_buffer(self, frames_per_user_buffer: usize) -> Self {
        Self {
            frames_per_user_buffer,
            ..self
        }
    }

    /// Configure the nominal, or maximum, number of frames in host buffers.
    pub fn frames_per_host_buffer(self, frames_per_host_buffer: usize) -> Self {
        Self {
            frames_per_host_buffer,
            ..self
        }
    }

    /// Configure how host buffer sizes may vary.
    pub fn host_buffer_size_mode(self, host_buffer_size_mode: HostBufferSizeMode) -> Self {
        Self {
            host_buffer_size_mode,
            ..self
        }
    }

    /// Configure the callback to use from a closure.
    ///
    /// Without a callback, the processor can only be used with the blocking
    /// [Period::copy_input], [Period::copy_output] and [Period::zero_output].
    pub fn callback<F>(self, callback: F) -> Self
    where
        F: 'static
            + Send
            + FnMut(
                Option<&InputBuffer<'_>>,
                Option<&mut OutputBuffer<'_>>,
                usize,
                &TimeInfo,
                StatusFlags,
            ) -> Flow,
    {
        self.stream_callback(callback)
    }

    /// Configure the callback to use.
    pub fn stream_callback<C>(self, callback: C) -> Self
    where
        C: 'static + Callback,
    {
        Self {
            callback: Some(Box::new(callback)),
            ..self
        }
    }

    /// Validate the configuration and allocate the processor.
    ///
    /// # Errors
    ///
    /// * [Error::InvalidChannelCount] if neither input nor output is
    ///   configured.
    /// * [Error::InvalidSampleRate] if the sample rate isn't positive.
    /// * [Error::InvalidFramesPerBuffer] if a fixed or bounded host buffer
    ///   size is zero.
    /// * [Error::InvalidFlag] if [StreamFlags::NEVER_DROP_INPUT] is set on
    ///   anything but a full duplex callback stream with an unspecified user
    ///   buffer size.
    /// * [Error::InsufficientMemory] if temporary buffers can't be
    ///   allocated.
    pub fn build(self) -> Result<BufferProcessor> {
        if self.input.is_none() && self.output.is_none() {
            return Err(Error::InvalidChannelCount);
        }

        if !self.sample_rate.is_finite() || self.sample_rate <= 0.0 {
            return Err(Error::InvalidSampleRate(self.sample_rate));
        }

        let bounded = matches!(
            self.host_buffer_size_mode,
            HostBufferSizeMode::Fixed | HostBufferSizeMode::Bounded
        );

        if bounded && self.frames_per_host_buffer == 0 {
            return Err(Error::InvalidFramesPerBuffer);
        }

        let full_duplex = self.input.is_some() && self.output.is_some();

        if self.flags.contains(StreamFlags::NEVER_DROP_INPUT)
            && (self.callback.is_none() || !full_duplex || self.frames_per_user_buffer != 0)
        {
            return Err(Error::InvalidFlag);
        }

        let user = self.frames_per_user_buffer;
        let host = self.frames_per_host_buffer;

        let (adapting, frames_per_temp) = if user == 0 {
            let frames = if bounded {
                host
            } else {
                UNKNOWN_HOST_FRAMES_PER_TEMP
            };

            (false, frames)
        } else if self.host_buffer_size_mode == HostBufferSizeMode::Fixed && host % user == 0 {
            (false, user)
        } else {
            (true, user)
        };

        let (initial_input, initial_output) = if !adapting || !full_duplex {
            (0, 0)
        } else if self.host_buffer_size_mode == HostBufferSizeMode::Fixed {
            let shift = frame_shift(host, user);

            if user > host {
                (shift, 0)
            } else {
                (0, shift)
            }
        } else {
            (0, user)
        };

        tracing::debug!(
            adapting,
            frames_per_temp,
            initial_input,
            initial_output,
            "configured buffer processor"
        );

        let input = match &self.input {
            Some(config) => Some(Direction::new(
                config,
                config.host,
                config.user,
                self.flags,
                frames_per_temp,
                initial_input,
            )?),
            None => None,
        };

        let output = match &self.output {
            Some(config) => Some(Direction::new(
                config,
                config.user,
                config.host,
                self.flags,
                frames_per_temp,
                initial_output,
            )?),
            None => None,
        };

        Ok(BufferProcessor {
            input,
            output,
            frames_per_user_buffer: user,
            frames_per_host_buffer: host,
            host_buffer_size_mode: self.host_buffer_size_mode,
            adapting,
            frames_per_temp,
            sample_period: 1.0 / self.sample_rate,
            callback: self.callback,
            dither: TriangularDither::new(),
            time: TimeInfo::default(),
            status: StatusFlags::NONE,
        })
    }
}

/// Converts and re-blocks audio between host buffers and a [Callback].
///
/// See the [module level documentation][self].
pub struct BufferProcessor {
    input: Option<Direction>,
    output: Option<Direction>,
    frames_per_user_buffer: usize,
    frames_per_host_buffer: usize,
    host_buffer_size_mode: HostBufferSizeMode,
    adapting: bool,
    frames_per_temp: usize,
    sample_period: f64,
    callback: Option<Box<dyn Callback>>,
    dither: TriangularDither,
    time: TimeInfo,
    status: StatusFlags,
}

impl BufferProcessor {
    /// Construct a [Builder] with default settings.
    ///
    /// # Examples
    ///
    /// ```
    /// use pcm_stream::{BufferProcessor, ChannelConfig, Flow};
    /// use pcm_core::SampleFormat;
    ///
    /// # fn main() -> pcm_stream::Result<()> {
    /// let processor = BufferProcessor::builder()
    ///     .input(ChannelConfig::new(2, SampleFormat::F32, SampleFormat::I16))
    ///     .output(ChannelConfig::new(2, SampleFormat::F32, SampleFormat::I16))
    ///     .frames_per_user_buffer(100)
    ///     .frames_per_host_buffer(160)
    ///     .callback(|_, _, _, _, _| Flow::Continue)
    ///     .build()?;
    ///
    /// assert!(processor.is_adapting());
    /// assert_eq!(processor.input_latency_frames(), 0);
    /// assert_eq!(processor.output_latency_frames(), 80);
    /// # Ok(()) }
    /// ```
    pub fn builder() -> Builder {
        Builder::new()
    }

    /// Test if the processor adapts through temporary buffers.
    pub fn is_adapting(&self) -> bool {
        self.adapting
    }

    /// The number of frames per callback invocation, or zero if
    /// unspecified.
    pub fn frames_per_user_buffer(&self) -> usize {
        self.frames_per_user_buffer
    }

    /// The nominal number of frames per host buffer.
    pub fn frames_per_host_buffer(&self) -> usize {
        self.frames_per_host_buffer
    }

    /// The configured host buffer size mode.
    pub fn host_buffer_size_mode(&self) -> HostBufferSizeMode {
        self.host_buffer_size_mode
    }

    /// The size of the temporary buffers in frames.
    pub fn frames_per_temp_buffer(&self) -> usize {
        self.frames_per_temp
    }

    /// The number of input channels.
    pub fn input_channels(&self) -> usize {
        self.input.as_ref().map_or(0, |d| d.channels)
    }

    /// The number of output channels.
    pub fn output_channels(&self) -> usize {
        self.output.as_ref().map_or(0, |d| d.channels)
    }

    /// Frames of latency added on the input side by adaptation.
    pub fn input_latency_frames(&self) -> usize {
        self.input.as_ref().map_or(0, |d| d.initial_frames)
    }

    /// Frames of latency added on the output side by adaptation.
    pub fn output_latency_frames(&self) -> usize {
        self.output.as_ref().map_or(0, |d| d.initial_frames)
    }

    /// The timestamps as updated by the last period.
    pub fn time_info(&self) -> TimeInfo {
        self.time
    }

    /// Restore the temporary buffers to their initial state.
    ///
    /// Call this every time the stream transitions to running. It doesn't
    /// allocate.
    pub fn reset(&mut self) {
        for direction in self.input.iter_mut().chain(self.output.iter_mut()) {
            direction.reset();
        }
    }

    /// Test if no output is buffered in the processor.
    ///
    /// A host which wants to play out everything after a callback returned
    /// [Flow::Complete] keeps processing periods until this is `true`.
    pub fn is_output_empty(&self) -> bool {
        self.output.as_ref().map_or(true, |d| d.frames_in_temp == 0)
    }

    /// Begin processing a host period.
    ///
    /// The timestamps refer to the start of the host buffers, and are
    /// adjusted for the latency of the temporary buffers.
    pub fn begin_processing<'buf>(
        &mut self,
        time: TimeInfo,
        status: StatusFlags,
    ) -> Period<'_, 'buf> {
        let mut time = time;

        if let Some(input) = &self.input {
            time.input_buffer_adc_time -= input.frames_in_temp as f64 * self.sample_period;
        }

        time.current_time = 0.0;

        if let Some(output) = &self.output {
            time.output_buffer_dac_time += output.frames_in_temp as f64 * self.sample_period;
        }

        self.time = time;
        self.status = status;
        self.clear_descriptors();
        Period::new(self)
    }

    fn clear_descriptors(&mut self) {
        for direction in self.input.iter_mut().chain(self.output.iter_mut()) {
            direction.clear();
        }
    }
}

/// The largest number of frames a full duplex stream can be out of phase
/// when `host` sized buffers are re-blocked into `user` sized ones.
fn frame_shift(host: usize, user: usize) -> usize {
    let lcm = host / gcd(host, user) * user;
    let mut shift = 0;
    let mut i = host;

    while i < lcm {
        shift = usize::max(shift, i % user);
        i += host;
    }

    shift
}

fn gcd(mut a: usize, mut b: usize) -> usize {
    while b != 0 {
        let t = a % b;
        a = b;
        b = t;
    }

    a
}

/// Invoke the callback on the temp buffers of the given directions.
fn invoke(
    callback: &mut Option<Box<dyn Callback>>,
    input: Option<&Direction>,
    output: Option<&mut Direction>,
    frames: usize,
    time: &TimeInfo,
    status: StatusFlags,
) -> Flow {
    let callback = match callback {
        Some(callback) => callback,
        None => return Flow::Complete,
    };

    let input = input.map(|d| d.input_buffer(frames));
    let mut output = output.map(|d| d.output_buffer(frames));
    callback.process(input.as_ref(), output.as_mut(), frames, time, status)
}
