/// Macro to use for modules constrained to the loopback reference backend.
macro_rules! cfg_loopback {
    ($($item:item)*) => {
        $(
            #[cfg(feature = "loopback")]
            #[cfg_attr(docsrs, doc(
                cfg(feature = "loopback")
            ))]
            $item
        )*
    }
}
