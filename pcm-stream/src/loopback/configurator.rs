use std::collections::VecDeque;

use pcm_core::{closest_available, SampleFormat, StatusFlags, StreamFlags};

use crate::alloc::AllocationGroup;
use crate::error::{Error, Result};
use crate::loom::sync::Arc;
use crate::loopback::{Config, Engine, Loopback, LoopbackStream, Shared, HOST_FORMATS};
use crate::processor::{BufferProcessor, Builder, ChannelConfig, Flow, InputBuffer, OutputBuffer};
use crate::stream::{FinishedCallback, Stream, StreamInfo, StreamMode};
use crate::{CpuLoadMeasurer, TimeInfo};

/// Default sample rate to use.
const DEFAULT_RATE: f64 = 44100.0;
/// Default number of channels in each direction is 2.
const DEFAULT_CHANNELS: usize = 2;
/// Default user sample format.
const DEFAULT_FORMAT: SampleFormat = SampleFormat::F32;
/// Default number of frames in each hardware period.
const DEFAULT_FRAMES_PER_HOST_BUFFER: usize = 256;
/// Capacity of the blocking loop in hardware periods.
pub(super) const BLOCKING_PERIODS: usize = 4;

/// A loopback stream configuration.
///
/// Without a callback the stream is opened for blocking reads and writes.
///
/// # Examples
///
/// ```
/// use pcm_stream::loopback::Loopback;
/// use pcm_stream::Flow;
///
/// # fn main() -> pcm_stream::Result<()> {
/// let loopback = Loopback::new();
///
/// let mut stream = loopback
///     .configure()
///     .output_channels(1)
///     .input_channels(0)
///     .frames_per_buffer(64)
///     .callback(|_, _, _, _, _| Flow::Complete)
///     .open()?;
///
/// stream.start()?;
/// stream.stop()?;
/// stream.close()?;
/// # Ok(()) }
/// ```
pub struct Configurator<'a> {
    loopback: &'a Loopback,
    builder: Builder,
    mode: StreamMode,
    rate: f64,
    input_channels: usize,
    output_channels: usize,
    format: SampleFormat,
    frames_per_buffer: usize,
    frames_per_host_buffer: usize,
    flags: StreamFlags,
    sequential: bool,
    paced: bool,
}

impl<'a> Configurator<'a> {
    pub(super) fn new(loopback: &'a Loopback) -> Self {
        Self {
            loopback,
            builder: BufferProcessor::builder(),
            mode: StreamMode::Blocking,
            rate: DEFAULT_RATE,
            input_channels: DEFAULT_CHANNELS,
            output_channels: DEFAULT_CHANNELS,
            format: DEFAULT_FORMAT,
            frames_per_buffer: 0,
            frames_per_host_buffer: DEFAULT_FRAMES_PER_HOST_BUFFER,
            flags: StreamFlags::NONE,
            sequential: false,
            paced: false,
        }
    }

    /// Configure the sample rate.
    pub fn rate(self, rate: f64) -> Self {
        Self { rate, ..self }
    }

    /// Configure the number of input channels, zero disables input.
    pub fn input_channels(self, input_channels: usize) -> Self {
        Self {
            input_channels,
            ..self
        }
    }

    /// Configure the number of output channels, zero disables output.
    pub fn output_channels(self, output_channels: usize) -> Self {
        Self {
            output_channels,
            ..self
        }
    }

    /// Configure the sample format used by the application.
    pub fn format(self, format: SampleFormat) -> Self {
        Self { format, ..self }
    }

    /// Configure the number of frames passed to each callback invocation,
    /// zero leaves it up to the stream.
    pub fn frames_per_buffer(self, frames_per_buffer: usize) -> Self {
        Self {
            frames_per_buffer,
            ..self
        }
    }

    /// Configure the number of frames in each hardware period.
    pub fn frames_per_host_buffer(self, frames_per_host_buffer: usize) -> Self {
        Self {
            frames_per_host_buffer,
            ..self
        }
    }

    /// Configure stream flags.
    pub fn flags(self, flags: StreamFlags) -> Self {
        Self { flags, ..self }
    }

    /// Use sequential rather than interleaved user buffers.
    pub fn sequential(self) -> Self {
        Self {
            sequential: true,
            ..self
        }
    }

    /// Sleep for the duration of each period so the stream runs in real
    /// time rather than as fast as possible.
    pub fn paced(self, paced: bool) -> Self {
        Self { paced, ..self }
    }

    /// Process audio with the given callback.
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
        Self {
            builder: self.builder.callback(callback),
            mode: StreamMode::Callback,
            ..self
        }
    }

    /// Open the stream.
    ///
    /// # Errors
    ///
    /// * [Error::DeviceUnavailable] if another stream is open on the device.
    /// * [Error::InvalidSampleRate] if the rate isn't positive.
    /// * [Error::InvalidFramesPerBuffer] if the period size is zero.
    /// * Any error raised when building the [BufferProcessor].
    pub fn open(self) -> Result<Stream> {
        if !self.rate.is_finite() || self.rate <= 0.0 {
            return Err(Error::InvalidSampleRate(self.rate));
        }

        if self.frames_per_host_buffer == 0 {
            return Err(Error::InvalidFramesPerBuffer);
        }

        let host = closest_available(HOST_FORMATS, self.format)
            .ok_or(Error::SampleFormatNotSupported(self.format))?;

        let slot = self.loopback.claim()?;

        let (format, sequential) = (self.format, self.sequential);

        let layout = |channels| {
            let config = ChannelConfig::new(channels, format, host);

            if sequential {
                config.sequential()
            } else {
                config
            }
        };

        let config = Config {
            rate: self.rate,
            frames: self.frames_per_host_buffer,
            input_channels: self.input_channels,
            output_channels: self.output_channels,
            user_format: format,
            host_format: host,
            paced: self.paced,
            prime: self
                .flags
                .contains(StreamFlags::PRIME_OUTPUT_BUFFERS_USING_STREAM_CALLBACK),
        };

        let mut group = AllocationGroup::new();

        let mut tx = group.transaction();
        let block = tx.allocate(config.input_bytes() + config.output_bytes())?;

        let processor = self
            .builder
            .input(layout(self.input_channels))
            .output(layout(self.output_channels))
            .sample_rate(self.rate)
            .flags(self.flags)
            .frames_per_user_buffer(self.frames_per_buffer)
            .frames_per_host_buffer(self.frames_per_host_buffer)
            .build()?;

        tx.commit();

        let mut fifo = VecDeque::new();

        if self.mode == StreamMode::Blocking && config.output_channels > 0 {
            fifo.try_reserve_exact(config.output_bytes() * BLOCKING_PERIODS)
                .map_err(|_| Error::InsufficientMemory)?;
        }

        let period = config.frames as f64;
        let input_latency = match config.input_channels {
            0 => 0.0,
            _ => (processor.input_latency_frames() as f64 + period) / config.rate,
        };
        let output_latency = match config.output_channels {
            0 => 0.0,
            _ => (processor.output_latency_frames() as f64 + period) / config.rate,
        };

        tracing::debug!(
            input_channels = config.input_channels,
            output_channels = config.output_channels,
            host_format = ?config.host_format,
            frames = config.frames,
            mode = ?self.mode,
            "opened loopback stream"
        );

        let info = StreamInfo {
            input_latency,
            output_latency,
            sample_rate: config.rate,
        };

        let finished = FinishedCallback::new();

        let engine = Engine {
            config,
            processor,
            group,
            block,
            cpu: CpuLoadMeasurer::new(config.rate),
        };

        let interface = LoopbackStream {
            mode: self.mode,
            config,
            shared: Arc::new(Shared::new()),
            engine: Some(engine),
            worker: None,
            fifo,
            finished: finished.clone(),
            slot: Some(slot),
        };

        Ok(Stream::new(Box::new(interface), self.mode, info, finished))
    }
}
