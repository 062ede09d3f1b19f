use std::ptr::NonNull;
use std::slice;

/// The location and stride of one host channel.
///
/// A descriptor only ever points into memory which is borrowed for the
/// duration of a [Period][super::Period], and is cleared when the period ends.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ChannelDescriptor {
    data: Option<NonNull<u8>>,
    /// Number of bytes available from `data`.
    len: usize,
    /// Distance between consecutive samples of the channel, in samples.
    stride: usize,
}

// Safety: descriptors are only dereferenced by the owner of the processor
// while the period which registered them is alive.
unsafe impl Send for ChannelDescriptor {}

impl ChannelDescriptor {
    const EMPTY: Self = Self {
        data: None,
        len: 0,
        stride: 1,
    };

    pub(crate) fn set(&mut self, data: NonNull<u8>, len: usize, stride: usize) {
        self.data = Some(data);
        self.len = len;
        self.stride = stride;
    }

    pub(crate) fn stride(&self) -> usize {
        self.stride
    }

    /// The registered bytes.
    ///
    /// # Safety
    ///
    /// The memory registered must still be borrowed.
    pub(crate) unsafe fn bytes<'a>(&self) -> Option<&'a [u8]> {
        let data = self.data?;
        Some(slice::from_raw_parts(data.as_ptr(), self.len))
    }

    /// The registered bytes, mutably.
    ///
    /// # Safety
    ///
    /// The memory registered must still be mutably borrowed and no other
    /// reference to it may be live.
    pub(crate) unsafe fn bytes_mut<'a>(&mut self) -> Option<&'a mut [u8]> {
        let data = self.data?;
        Some(slice::from_raw_parts_mut(data.as_ptr(), self.len))
    }

    /// Step past `frames` samples of `bytes` bytes each.
    pub(crate) fn advance(&mut self, frames: usize, bytes: usize) {
        if let Some(data) = self.data {
            let n = usize::min(frames * self.stride * bytes, self.len);
            // Safety: `n` is within the registered region.
            self.data = NonNull::new(unsafe { data.as_ptr().add(n) });
            self.len -= n;
        }
    }
}

/// The channel descriptors for one fragment of host buffer in one direction.
#[derive(Debug)]
pub(crate) struct ChannelDescriptorSet {
    channels: Box<[ChannelDescriptor]>,
}

impl ChannelDescriptorSet {
    pub(crate) fn new(channels: usize) -> Self {
        Self {
            channels: vec![ChannelDescriptor::EMPTY; channels].into(),
        }
    }

    /// Reset every descriptor to unregistered.
    pub(crate) fn clear(&mut self) {
        for c in self.channels.iter_mut() {
            *c = ChannelDescriptor::EMPTY;
        }
    }

    /// Access the descriptor for the given channel.
    ///
    /// # Panics
    ///
    /// Panics if `channel` is out of range.
    pub(crate) fn get_mut(&mut self, channel: usize) -> &mut ChannelDescriptor {
        assert!(
            channel < self.channels.len(),
            "channel {} out of range; channels = {}",
            channel,
            self.channels.len()
        );

        &mut self.channels[channel]
    }

    /// Advance every channel by `frames` samples of `bytes` bytes each.
    pub(crate) fn advance(&mut self, frames: usize, bytes: usize) {
        for c in self.channels.iter_mut() {
            c.advance(frames, bytes);
        }
    }
}

/// One of the two host buffer fragments in a direction, the second of which
/// is used when the host buffer wraps around.
#[derive(Debug)]
pub(crate) struct Fragment {
    pub(crate) frames: usize,
    pub(crate) channels: ChannelDescriptorSet,
}

impl Fragment {
    pub(crate) fn new(channels: usize) -> Self {
        Self {
            frames: 0,
            channels: ChannelDescriptorSet::new(channels),
        }
    }

    pub(crate) fn clear(&mut self) {
        self.frames = 0;
        self.channels.clear();
    }
}
