pub(crate) mod sync;
pub(crate) use ::std::thread;
