//! A reference backend which feeds the output of a stream back into its
//! input.
//!
//! The device has a single slot. Opening a stream claims it until the stream
//! is closed, and supports the [SampleFormat::F32] and [SampleFormat::I16]
//! hardware formats.
//!
//! Streams opened with a callback are processed on a background thread.
//! Streams opened without one are used through blocking reads and writes,
//! where written output becomes readable input one period later.

use std::collections::VecDeque;

use pcm_core::{FormatSet, SampleFormat, StatusFlags};

use crate::alloc::{AllocationGroup, AllocationId};
use crate::error::{Error, Result};
use crate::loom::sync::atomic::{AtomicBool, AtomicU64, AtomicU8, Ordering};
use crate::loom::sync::Arc;
use crate::loom::thread;
use crate::processor::BufferProcessor;
use crate::stream::{FinishedCallback, StreamInterface, StreamMode};
use crate::{CpuLoadMeasurer, TimeInfo};

mod configurator;
pub use self::configurator::Configurator;

mod worker;


/// Formats supported by the loopback hardware.
pub(crate) const HOST_FORMATS: FormatSet =
    FormatSet::single(SampleFormat::F32).with(SampleFormat::I16);

/// The loopback device.
///
/// # Examples
///
/// ```
/// use pcm_stream::loopback::Loopback;
/// use pcm_stream::Error;
///
/// # fn main() -> pcm_stream::Result<()> {
/// let loopback = Loopback::new();
///
/// let mut stream = loopback.configure().open()?;
/// assert!(loopback.is_in_use());
/// assert!(matches!(loopback.configure().open(), Err(Error::DeviceUnavailable)));
///
/// stream.close()?;
/// assert!(!loopback.is_in_use());
/// # Ok(()) }
/// ```
#[derive(Debug, Clone)]
pub struct Loopback {
    slot: Arc<AtomicBool>,
}

impl Loopback {
    /// Construct a new loopback device.
    pub fn new() -> Self {
        Self {
            slot: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Configure a stream to open on the device.
    pub fn configure(&self) -> Configurator<'_> {
        Configurator::new(self)
    }

    /// Test if a stream is currently open on the device.
    pub fn is_in_use(&self) -> bool {
        self.slot.load(Ordering::Acquire)
    }

    /// Claim the device slot.
    pub(crate) fn claim(&self) -> Result<Slot> {
        if self
            .slot
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(Error::DeviceUnavailable);
        }

        Ok(Slot {
            slot: Some(self.slot.clone()),
        })
    }
}

impl Default for Loopback {
    fn default() -> Self {
        Self::new()
    }
}

/// A claim on the device slot which is released when dropped.
pub(crate) struct Slot {
    slot: Option<Arc<AtomicBool>>,
}

impl Slot {
    /// Release the slot. Releasing it more than once does nothing.
    pub(crate) fn release(&mut self) {
        if let Some(slot) = self.slot.take() {
            slot.store(false, Ordering::Release);
        }
    }
}

impl Drop for Slot {
    fn drop(&mut self) {
        self.release();
    }
}

/// The hardware configuration of an open stream.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Config {
    pub(crate) rate: f64,
    /// Frames per hardware period.
    pub(crate) frames: usize,
    pub(crate) input_channels: usize,
    pub(crate) output_channels: usize,
    pub(crate) user_format: SampleFormat,
    pub(crate) host_format: SampleFormat,
    pub(crate) paced: bool,
    pub(crate) prime: bool,
}

impl Config {
    /// Bytes in one frame of hardware input.
    pub(crate) fn input_frame_bytes(&self) -> usize {
        self.input_channels * self.host_format.bytes()
    }

    /// Bytes in one frame of hardware output.
    pub(crate) fn output_frame_bytes(&self) -> usize {
        self.output_channels * self.host_format.bytes()
    }

    /// Bytes in one period of hardware input.
    pub(crate) fn input_bytes(&self) -> usize {
        self.frames * self.input_frame_bytes()
    }

    /// Bytes in one period of hardware output.
    pub(crate) fn output_bytes(&self) -> usize {
        self.frames * self.output_frame_bytes()
    }

    /// Test if output is fed back into input.
    pub(crate) fn looped(&self) -> bool {
        self.input_channels > 0 && self.input_channels == self.output_channels
    }

    /// The duration of one period in seconds.
    pub(crate) fn period(&self) -> f64 {
        self.frames as f64 / self.rate
    }
}

/// Everything used to process a stream, owned by whichever thread is
/// processing it.
pub(crate) struct Engine {
    pub(crate) config: Config,
    pub(crate) processor: BufferProcessor,
    pub(crate) group: AllocationGroup,
    /// Hardware scratch buffers, input followed by output.
    pub(crate) block: AllocationId,
    pub(crate) cpu: CpuLoadMeasurer,
}

impl Engine {
    /// Split the engine into its processor and the hardware input and output
    /// buffers.
    pub(crate) fn split(&mut self) -> (&mut BufferProcessor, &mut [u8], &mut [u8]) {
        let Self {
            config,
            processor,
            group,
            block,
            ..
        } = self;

        let data = group.get_mut(*block).unwrap_or_default();
        let at = usize::min(config.input_bytes(), data.len());
        let (input, output) = data.split_at_mut(at);
        (processor, input, output)
    }

    /// Reset processing state ahead of starting.
    fn reset(&mut self) {
        self.processor.reset();
        self.cpu.reset();

        let (_, input, output) = self.split();
        input.fill(0);
        output.fill(0);
    }
}

const CONTINUE: u8 = 0;
const COMPLETE: u8 = 1;
const ABORT: u8 = 2;

/// State shared between a stream and its worker.
pub(crate) struct Shared {
    /// Set from start until stop.
    running: AtomicBool,
    /// Cleared once the worker stops calling the callback.
    active: AtomicBool,
    /// What the stream asked the worker to do.
    request: AtomicU8,
    /// Stream time as `f64` bits.
    time: AtomicU64,
    /// CPU load as `f64` bits.
    cpu_load: AtomicU64,
}

impl Shared {
    pub(crate) fn new() -> Self {
        Self {
            running: AtomicBool::new(false),
            active: AtomicBool::new(false),
            request: AtomicU8::new(CONTINUE),
            time: AtomicU64::new(0.0f64.to_bits()),
            cpu_load: AtomicU64::new(0.0f64.to_bits()),
        }
    }

    fn set_time(&self, time: f64) {
        self.time.store(time.to_bits(), Ordering::Release);
    }

    fn time(&self) -> f64 {
        f64::from_bits(self.time.load(Ordering::Acquire))
    }

    fn set_cpu_load(&self, load: f64) {
        self.cpu_load.store(load.to_bits(), Ordering::Release);
    }

    fn cpu_load(&self) -> f64 {
        f64::from_bits(self.cpu_load.load(Ordering::Acquire))
    }
}

/// A stream open on the [Loopback] device.
pub(crate) struct LoopbackStream {
    pub(crate) mode: StreamMode,
    pub(crate) config: Config,
    pub(crate) shared: Arc<Shared>,
    /// Not present while a worker owns it.
    pub(crate) engine: Option<Engine>,
    pub(crate) worker: Option<thread::JoinHandle<Engine>>,
    /// Hardware output waiting to be looped back in blocking mode.
    pub(crate) fifo: VecDeque<u8>,
    pub(crate) finished: FinishedCallback,
    pub(crate) slot: Option<Slot>,
}

impl LoopbackStream {
    /// Capacity of the blocking FIFO in frames.
    fn capacity(&self) -> usize {
        self.config.frames * configurator::BLOCKING_PERIODS
    }

    /// Ask the worker to stop and wait for it.
    fn join(&mut self, request: u8) -> Result<()> {
        self.shared.request.store(request, Ordering::Release);

        let result = match self.worker.take() {
            Some(worker) => worker.join(),
            None => return Ok(()),
        };

        self.shared.running.store(false, Ordering::Release);
        self.shared.active.store(false, Ordering::Release);

        match result {
            Ok(engine) => {
                self.engine = Some(engine);
                Ok(())
            }
            Err(..) => {
                tracing::error!("loopback worker panicked");
                Err(Error::DeviceUnavailable)
            }
        }
    }

    fn start_callback(&mut self) -> Result<()> {
        let mut engine = self.engine.take().ok_or(Error::DeviceUnavailable)?;
        engine.reset();

        self.shared.set_time(0.0);
        self.shared.set_cpu_load(0.0);
        self.shared.request.store(CONTINUE, Ordering::Release);
        self.shared.active.store(true, Ordering::Release);
        self.shared.running.store(true, Ordering::Release);

        let worker = thread::spawn({
            let shared = self.shared.clone();
            let finished = self.finished.clone();
            move || worker::run(engine, shared, finished)
        });

        self.worker = Some(worker);
        Ok(())
    }

    fn start_blocking(&mut self) -> Result<()> {
        let config = self.config;
        let engine = self.engine.as_mut().ok_or(Error::DeviceUnavailable)?;
        engine.reset();

        self.fifo.clear();

        // The loop starts out one period behind.
        if config.output_channels > 0 {
            let (processor, _, output) = engine.split();

            let mut period = processor.begin_processing(TimeInfo::default(), StatusFlags::NONE);
            period.set_output_frame_count(config.frames);
            period.set_interleaved_output_channels(0, &mut *output, 0);
            let n = period.zero_output(config.frames);
            drop(period);

            self.fifo.extend(&output[..n * config.output_frame_bytes()]);
        }

        self.shared.set_time(0.0);
        self.shared.active.store(true, Ordering::Release);
        self.shared.running.store(true, Ordering::Release);
        Ok(())
    }

    fn stop_blocking(&mut self) {
        self.shared.running.store(false, Ordering::Release);
        self.shared.active.store(false, Ordering::Release);
        self.finished.call();
    }
}

impl StreamInterface for LoopbackStream {
    fn close(&mut self) -> Result<()> {
        self.engine = None;
        self.fifo = VecDeque::new();

        if let Some(mut slot) = self.slot.take() {
            slot.release();
        }

        tracing::debug!("closed loopback stream");
        Ok(())
    }

    fn start(&mut self) -> Result<()> {
        match self.mode {
            StreamMode::Callback => self.start_callback(),
            StreamMode::Blocking => self.start_blocking(),
        }
    }

    fn stop(&mut self) -> Result<()> {
        match self.mode {
            StreamMode::Callback => self.join(COMPLETE),
            StreamMode::Blocking => {
                self.stop_blocking();
                Ok(())
            }
        }
    }

    fn abort(&mut self) -> Result<()> {
        match self.mode {
            StreamMode::Callback => self.join(ABORT),
            StreamMode::Blocking => {
                self.fifo.clear();
                self.stop_blocking();
                Ok(())
            }
        }
    }

    fn is_stopped(&self) -> bool {
        !self.shared.running.load(Ordering::Acquire)
    }

    fn is_active(&self) -> bool {
        self.shared.active.load(Ordering::Acquire)
    }

    fn time(&self) -> f64 {
        self.shared.time()
    }

    fn cpu_load(&self) -> f64 {
        self.shared.cpu_load()
    }

    fn read(&mut self, buffer: &mut [u8], frames: usize) -> Result<()> {
        if self.mode == StreamMode::Callback {
            return Err(Error::CanNotReadFromACallbackStream);
        }

        let config = self.config;

        if config.input_channels == 0 {
            return Err(Error::CanNotReadFromAnOutputOnlyStream);
        }

        check_len(buffer.len(), frames * config.input_channels, config.user_format)?;

        let engine = self.engine.as_mut().ok_or(Error::DeviceUnavailable)?;
        let frame_bytes = config.input_frame_bytes();
        let mut at = 0;

        while at < frames {
            let n = usize::min(frames - at, config.frames);
            let (processor, input, _) = engine.split();
            let input = &mut input[..n * frame_bytes];

            let mut filled = 0;

            if config.looped() {
                let len = usize::min(self.fifo.len(), input.len());

                for (to, from) in input.iter_mut().zip(self.fifo.drain(..len)) {
                    *to = from;
                }

                filled = len;
            }

            // Underflow reads as silence.
            input[filled..].fill(0);

            let mut period = processor.begin_processing(TimeInfo::default(), StatusFlags::NONE);
            period.set_input_frame_count(n);
            period.set_interleaved_input_channels(0, &*input, 0);
            let copied = period.copy_input_at(buffer, frames, at, n);
            debug_assert_eq!(copied, n);
            drop(period);

            at += n;

            if config.output_channels == 0 {
                self.shared.set_time(self.shared.time() + n as f64 / config.rate);
            }
        }

        Ok(())
    }

    fn write(&mut self, buffer: &[u8], frames: usize) -> Result<()> {
        if self.mode == StreamMode::Callback {
            return Err(Error::CanNotWriteToACallbackStream);
        }

        let config = self.config;

        if config.output_channels == 0 {
            return Err(Error::CanNotWriteToAnInputOnlyStream);
        }

        check_len(buffer.len(), frames * config.output_channels, config.user_format)?;

        let capacity = self.capacity() * config.output_frame_bytes();
        let engine = self.engine.as_mut().ok_or(Error::DeviceUnavailable)?;
        let frame_bytes = config.output_frame_bytes();
        let mut at = 0;

        while at < frames {
            let n = usize::min(frames - at, config.frames);
            let (processor, _, output) = engine.split();
            let output = &mut output[..n * frame_bytes];

            let mut period = processor.begin_processing(TimeInfo::default(), StatusFlags::NONE);
            period.set_output_frame_count(n);
            period.set_interleaved_output_channels(0, &mut *output, 0);
            let copied = period.copy_output_at(buffer, frames, at, n);
            debug_assert_eq!(copied, n);
            drop(period);

            at += n;

            // The oldest output is overwritten when nothing reads it.
            let overflow = (self.fifo.len() + output.len()).saturating_sub(capacity);
            self.fifo.drain(..usize::min(overflow, self.fifo.len()));
            self.fifo.extend(&*output);

            self.shared.set_time(self.shared.time() + n as f64 / config.rate);
        }

        Ok(())
    }

    fn read_available(&self) -> Result<usize> {
        if self.mode == StreamMode::Callback {
            return Err(Error::CanNotReadFromACallbackStream);
        }

        if self.config.input_channels == 0 {
            return Err(Error::CanNotReadFromAnOutputOnlyStream);
        }

        if self.config.looped() {
            Ok(self.fifo.len() / self.config.input_frame_bytes())
        } else {
            Ok(self.capacity())
        }
    }

    fn write_available(&self) -> Result<usize> {
        if self.mode == StreamMode::Callback {
            return Err(Error::CanNotWriteToACallbackStream);
        }

        if self.config.output_channels == 0 {
            return Err(Error::CanNotWriteToAnInputOnlyStream);
        }

        let frames = self.fifo.len() / self.config.output_frame_bytes();
        Ok(self.capacity().saturating_sub(frames))
    }
}

/// Check that a user buffer holds `samples` samples of `format`.
fn check_len(actual: usize, samples: usize, format: SampleFormat) -> Result<()> {
    let expected = samples * format.bytes();

    if actual < expected {
        return Err(Error::BufferTooSmall { expected, actual });
    }

    Ok(())
}
