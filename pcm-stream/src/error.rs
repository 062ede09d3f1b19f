use pcm_core::SampleFormat;
use thiserror::Error;

/// Errors raised when configuring or operating a stream.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// A stream flag was used in a configuration which doesn't support it.
    #[error("invalid stream flag for this configuration")]
    InvalidFlag,
    /// Neither input nor output channels were configured.
    #[error("invalid channel count")]
    InvalidChannelCount,
    /// The sample rate is not a finite, positive number.
    #[error("invalid sample rate: {0}")]
    InvalidSampleRate(f64),
    /// A fixed or bounded host buffer size of zero frames was configured.
    #[error("invalid number of frames per host buffer")]
    InvalidFramesPerBuffer,
    /// The requested sample format can't be provided.
    #[error("sample format {0} is not supported")]
    SampleFormatNotSupported(SampleFormat),
    /// Memory for a buffer could not be reserved.
    #[error("insufficient memory")]
    InsufficientMemory,
    /// The stream has been closed or was never initialized.
    #[error("bad stream pointer")]
    BadStreamPointer,
    /// A user buffer is smaller than the number of frames it's used for.
    #[error("buffer too small: expected {expected} bytes but got {actual}")]
    BufferTooSmall {
        /// The number of bytes needed.
        expected: usize,
        /// The number of bytes provided.
        actual: usize,
    },
    /// The operation requires a stopped stream.
    #[error("stream is not stopped")]
    StreamIsNotStopped,
    /// The operation requires a running stream.
    #[error("stream is stopped")]
    StreamIsStopped,
    /// Blocking reads are not available on callback streams.
    #[error("can not read from a callback stream")]
    CanNotReadFromACallbackStream,
    /// Blocking writes are not available on callback streams.
    #[error("can not write to a callback stream")]
    CanNotWriteToACallbackStream,
    /// The stream has no input channels.
    #[error("can not read from an output only stream")]
    CanNotReadFromAnOutputOnlyStream,
    /// The stream has no output channels.
    #[error("can not write to an input only stream")]
    CanNotWriteToAnInputOnlyStream,
    /// The device is in use by another stream, or has failed.
    #[error("device unavailable")]
    DeviceUnavailable,
}

/// The re-exported error type.
pub type Result<T, E = Error> = ::std::result::Result<T, E>;
