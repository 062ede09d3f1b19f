use std::time::{Duration, Instant};


const LOWPASS_PREVIOUS: f64 = 0.9;
const LOWPASS_MEASURED: f64 = 0.99999 - LOWPASS_PREVIOUS;

/// Measures how much of the real time available for processing a buffer was
/// spent doing so.
///
/// A load of `1.0` means processing takes exactly as long as the audio it
/// produces lasts, at which point the stream starts dropping out.
///
/// # Examples
///
/// ```
/// use pcm_stream::CpuLoadMeasurer;
///
/// let mut cpu = CpuLoadMeasurer::new(48000.0);
/// cpu.begin();
/// // process 512 frames
/// cpu.end(512);
///
/// assert!(cpu.load() >= 0.0);
/// ```
#[derive(Debug, Clone)]
pub struct CpuLoadMeasurer {
    sample_period: f64,
    started: Option<Instant>,
    average: Option<f64>,
}

impl CpuLoadMeasurer {
    /// Construct a measurer for a stream running at `sample_rate`.
    pub fn new(sample_rate: f64) -> Self {
        Self {
            sample_period: 1.0 / sample_rate,
            started: None,
            average: None,
        }
    }

    /// Mark the start of processing a buffer.
    pub fn begin(&mut self) {
        self.started = Some(Instant::now());
    }

    /// Mark the end of processing a buffer of `frames` frames. Does nothing
    /// unless [CpuLoadMeasurer::begin] was called first.
    pub fn end(&mut self, frames: usize) {
        if let Some(started) = self.started.take() {
            self.record(started.elapsed(), frames);
        }
    }

    /// Forget every measurement.
    pub fn reset(&mut self) {
        self.started = None;
        self.average = None;
    }

    /// The filtered load.
    pub fn load(&self) -> f64 {
        self.average.unwrap_or_default()
    }

    fn record(&mut self, elapsed: Duration, frames: usize) {
        if frames == 0 {
            return;
        }

        let measured = elapsed.as_secs_f64() / (frames as f64 * self.sample_period);

        self.average = Some(match self.average {
            Some(average) => LOWPASS_PREVIOUS * average + LOWPASS_MEASURED * measured,
            None => measured,
        });
    }
}
