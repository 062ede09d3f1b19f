use std::fmt;
use std::ops;

// Helper macro to declare a set of bit flags.
macro_rules! flags {
    (
        $(#[$meta:meta])*
        pub struct $name:ident($repr:ty) {
            $(
                $(#[$flag_meta:meta])*
                const $flag:ident = $value:expr;
            )*
        }
    ) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
        pub struct $name($repr);

        impl $name {
            /// No flags set.
            pub const NONE: Self = Self(0);

            $(
                $(#[$flag_meta])*
                pub const $flag: Self = Self($value);
            )*

            /// Test if every flag in `other` is set in `self`.
            pub const fn contains(self, other: Self) -> bool {
                self.0 & other.0 == other.0
            }

            /// Test if no flags are set.
            pub const fn is_empty(self) -> bool {
                self.0 == 0
            }

            /// Return `self` with the flags in `other` added.
            pub const fn with(self, other: Self) -> Self {
                Self(self.0 | other.0)
            }

            /// Return `self` with the flags in `other` removed.
            pub const fn without(self, other: Self) -> Self {
                Self(self.0 & !other.0)
            }

            /// The raw bits of the flags.
            pub const fn bits(self) -> $repr {
                self.0
            }
        }

        impl ops::BitOr for $name {
            type Output = Self;

            fn bitor(self, other: Self) -> Self {
                self.with(other)
            }
        }

        impl ops::BitOrAssign for $name {
            fn bitor_assign(&mut self, other: Self) {
                *self = self.with(other);
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                let mut set = f.debug_set();

                $(
                    if self.contains(Self::$flag) {
                        set.entry(&format_args!(stringify!($flag)));
                    }
                )*

                set.finish()
            }
        }
    };
}

flags! {
    /// Flags which modify how a stream is opened and how its samples are
    /// converted.
    ///
    /// # Examples
    ///
    /// ```
    /// use pcm_core::StreamFlags;
    ///
    /// let flags = StreamFlags::CLIP_OFF | StreamFlags::DITHER_OFF;
    /// assert!(flags.contains(StreamFlags::CLIP_OFF));
    /// assert!(!flags.contains(StreamFlags::NEVER_DROP_INPUT));
    /// ```
    pub struct StreamFlags(u32) {
        /// Do not clip out of range samples when converting from float.
        const CLIP_OFF = 0x1;
        /// Do not dither when reducing sample precision.
        const DITHER_OFF = 0x2;
        /// Deliver every input frame to the callback, even when output can't
        /// keep up. Only valid for full duplex callback streams with an
        /// unspecified user buffer size.
        const NEVER_DROP_INPUT = 0x4;
        /// Fill the initial output buffers by calling the stream callback
        /// rather than with silence.
        const PRIME_OUTPUT_BUFFERS_USING_STREAM_CALLBACK = 0x8;
    }
}

flags! {
    /// Status flags passed to the stream callback describing what happened
    /// since the previous invocation.
    pub struct StatusFlags(u32) {
        /// Input data was missing and has been replaced with silence.
        const INPUT_UNDERFLOW = 0x1;
        /// Input data was discarded because the callback was too slow.
        const INPUT_OVERFLOW = 0x2;
        /// Output could not be delivered in time and silence was inserted.
        const OUTPUT_UNDERFLOW = 0x4;
        /// Output data was discarded.
        const OUTPUT_OVERFLOW = 0x8;
        /// The callback is being called to prime output buffers and the input
        /// is silence.
        const PRIMING_OUTPUT = 0x10;
    }
}
