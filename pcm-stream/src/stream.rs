//! The interface implemented by backends and the stream object wrapping it.
//!
//! A backend implements [StreamInterface] for each of its open streams. The
//! [Stream] owns the interface object, checks the rules common to every
//! backend, and forwards the rest.

use std::fmt;

use crate::error::{Error, Result};
use crate::loom::sync::{Arc, Mutex};


/// Marks a [Stream] which has been initialized and not yet terminated.
const STREAM_MAGIC: u32 = 0x1827_3645;

/// Operations a backend implements for an open stream.
///
/// The default implementations of the blocking operations are the ones
/// appropriate for callback streams, which don't support them.
pub trait StreamInterface: Send {
    /// Release every resource held by the stream. The stream is stopped when
    /// this is called.
    fn close(&mut self) -> Result<()>;

    /// Start processing.
    fn start(&mut self) -> Result<()>;

    /// Stop processing after buffered output has been played.
    fn stop(&mut self) -> Result<()>;

    /// Stop processing as soon as possible, discarding buffered output.
    fn abort(&mut self) -> Result<()>;

    /// Test if the stream is stopped.
    fn is_stopped(&self) -> bool;

    /// Test if the stream is producing or consuming audio. A stream whose
    /// callback has asked to stop may be running but no longer active.
    fn is_active(&self) -> bool;

    /// The current stream time in seconds.
    fn time(&self) -> f64;

    /// The filtered fraction of available processing time used by the
    /// callback.
    fn cpu_load(&self) -> f64 {
        0.0
    }

    /// Read `frames` frames of input into `buffer`, blocking until they're
    /// available.
    fn read(&mut self, buffer: &mut [u8], frames: usize) -> Result<()> {
        let _ = (buffer, frames);
        Err(Error::CanNotReadFromACallbackStream)
    }

    /// Write `frames` frames of output from `buffer`, blocking until there's
    /// room for them.
    fn write(&mut self, buffer: &[u8], frames: usize) -> Result<()> {
        let _ = (buffer, frames);
        Err(Error::CanNotWriteToACallbackStream)
    }

    /// The number of frames which can be read without blocking.
    fn read_available(&self) -> Result<usize> {
        Err(Error::CanNotReadFromACallbackStream)
    }

    /// The number of frames which can be written without blocking.
    fn write_available(&self) -> Result<usize> {
        Err(Error::CanNotWriteToACallbackStream)
    }
}

/// How audio is exchanged with a stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamMode {
    /// Audio is processed by a callback.
    Callback,
    /// Audio is read and written with blocking calls.
    Blocking,
}

/// Information about an open stream.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StreamInfo {
    /// Input latency in seconds.
    pub input_latency: f64,
    /// Output latency in seconds.
    pub output_latency: f64,
    /// The actual sample rate.
    pub sample_rate: f64,
}

/// A callback which is invoked when a stream stops.
///
/// The handle is shared between a [Stream] and the backend which invokes it.
#[derive(Clone)]
pub struct FinishedCallback {
    inner: Arc<Mutex<Option<Box<dyn FnMut() + Send>>>>,
}

impl FinishedCallback {
    /// Construct an empty callback.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(None)),
        }
    }

    /// Replace the callback, `None` removes it.
    pub fn set(&self, callback: Option<Box<dyn FnMut() + Send>>) {
        *self.inner.lock() = callback;
    }

    /// Invoke the callback if one is set.
    pub fn call(&self) {
        if let Some(callback) = self.inner.lock().as_mut() {
            callback();
        }
    }
}

impl Default for FinishedCallback {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for FinishedCallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FinishedCallback")
            .field("set", &self.inner.lock().is_some())
            .finish()
    }
}

/// An open stream.
///
/// Dropping the stream closes it.
pub struct Stream {
    tag: u32,
    interface: Box<dyn StreamInterface>,
    mode: StreamMode,
    finished: FinishedCallback,
    info: StreamInfo,
}

impl Stream {
    /// Wrap an interface object which was just opened by a backend.
    ///
    /// `finished` is the handle the backend invokes when the stream stops.
    pub fn new(
        interface: Box<dyn StreamInterface>,
        mode: StreamMode,
        info: StreamInfo,
        finished: FinishedCallback,
    ) -> Self {
        Self {
            tag: STREAM_MAGIC,
            interface,
            mode,
            finished,
            info,
        }
    }

    /// Check that the stream hasn't been closed.
    ///
    /// # Errors
    ///
    /// Returns [Error::BadStreamPointer] once the stream is closed.
    pub fn validate(&self) -> Result<()> {
        if self.tag != STREAM_MAGIC {
            return Err(Error::BadStreamPointer);
        }

        Ok(())
    }

    /// Mark the stream as no longer usable.
    fn terminate(&mut self) {
        self.tag = 0;
    }

    /// How audio is exchanged with the stream.
    pub fn mode(&self) -> StreamMode {
        self.mode
    }

    /// Information about the stream.
    pub fn info(&self) -> Result<StreamInfo> {
        self.validate()?;
        Ok(self.info)
    }

    /// Start the stream.
    ///
    /// # Errors
    ///
    /// Returns [Error::StreamIsNotStopped] if the stream is already running.
    pub fn start(&mut self) -> Result<()> {
        self.validate()?;

        if !self.interface.is_stopped() {
            return Err(Error::StreamIsNotStopped);
        }

        self.interface.start()?;
        tracing::trace!("stream started");
        Ok(())
    }

    /// Stop the stream once buffered output has been played.
    ///
    /// # Errors
    ///
    /// Returns [Error::StreamIsStopped] if the stream isn't running.
    pub fn stop(&mut self) -> Result<()> {
        self.validate()?;

        if self.interface.is_stopped() {
            return Err(Error::StreamIsStopped);
        }

        self.interface.stop()?;
        tracing::trace!("stream stopped");
        Ok(())
    }

    /// Stop the stream immediately.
    ///
    /// # Errors
    ///
    /// Returns [Error::StreamIsStopped] if the stream isn't running.
    pub fn abort(&mut self) -> Result<()> {
        self.validate()?;

        if self.interface.is_stopped() {
            return Err(Error::StreamIsStopped);
        }

        self.interface.abort()?;
        tracing::trace!("stream aborted");
        Ok(())
    }

    /// Close the stream, aborting it first if it's running.
    ///
    /// The stream can't be used afterwards.
    pub fn close(&mut self) -> Result<()> {
        self.validate()?;

        if !self.interface.is_stopped() {
            self.interface.abort()?;
        }

        let result = self.interface.close();
        self.terminate();
        tracing::trace!("stream closed");
        result
    }

    /// Test if the stream is stopped.
    pub fn is_stopped(&self) -> Result<bool> {
        self.validate()?;
        Ok(self.interface.is_stopped())
    }

    /// Test if the stream is active.
    pub fn is_active(&self) -> Result<bool> {
        self.validate()?;
        Ok(self.interface.is_active())
    }

    /// The current stream time in seconds.
    pub fn time(&self) -> Result<f64> {
        self.validate()?;
        Ok(self.interface.time())
    }

    /// The filtered CPU load of the stream callback.
    pub fn cpu_load(&self) -> Result<f64> {
        self.validate()?;
        Ok(self.interface.cpu_load())
    }

    /// Set the callback invoked when the stream stops.
    ///
    /// # Errors
    ///
    /// Returns [Error::StreamIsNotStopped] if the stream is running.
    pub fn set_finished_callback<F>(&mut self, callback: Option<F>) -> Result<()>
    where
        F: 'static + Send + FnMut(),
    {
        self.validate()?;

        if !self.interface.is_stopped() {
            return Err(Error::StreamIsNotStopped);
        }

        self.finished
            .set(callback.map(|c| Box::new(c) as Box<dyn FnMut() + Send>));
        Ok(())
    }

    /// Read `frames` frames of input into `buffer`.
    ///
    /// Reading zero frames does nothing.
    ///
    /// # Errors
    ///
    /// Returns [Error::StreamIsStopped] if the stream isn't running, and
    /// whatever the backend reports otherwise.
    pub fn read(&mut self, buffer: &mut [u8], frames: usize) -> Result<()> {
        self.validate()?;

        if frames == 0 {
            return Ok(());
        }

        if self.interface.is_stopped() {
            return Err(Error::StreamIsStopped);
        }

        self.interface.read(buffer, frames)
    }

    /// Write `frames` frames of output from `buffer`.
    ///
    /// Writing zero frames does nothing.
    ///
    /// # Errors
    ///
    /// Returns [Error::StreamIsStopped] if the stream isn't running, and
    /// whatever the backend reports otherwise.
    pub fn write(&mut self, buffer: &[u8], frames: usize) -> Result<()> {
        self.validate()?;

        if frames == 0 {
            return Ok(());
        }

        if self.interface.is_stopped() {
            return Err(Error::StreamIsStopped);
        }

        self.interface.write(buffer, frames)
    }

    /// The number of frames which can be read without blocking.
    pub fn read_available(&self) -> Result<usize> {
        self.validate()?;
        self.interface.read_available()
    }

    /// The number of frames which can be written without blocking.
    pub fn write_available(&self) -> Result<usize> {
        self.validate()?;
        self.interface.write_available()
    }
}

impl fmt::Debug for Stream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stream")
            .field("valid", &(self.tag == STREAM_MAGIC))
            .field("mode", &self.mode)
            .field("info", &self.info)
            .finish()
    }
}

impl Drop for Stream {
    fn drop(&mut self) {
        if self.tag != STREAM_MAGIC {
            return;
        }

        if let Err(e) = self.close() {
            tracing::error!("failed to close stream: {}", e);
        }
    }
}
