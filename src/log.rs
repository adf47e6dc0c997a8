//! Crate internal logging. Messages go to `defmt` with the `defmt` feature and to stdout with the
//! `debug-logs` feature. Without either feature the arguments are still type checked but nothing
//! is emitted.
//!
//! Format strings must stay within the subset understood by both `defmt` and `core::fmt`
//! (`{}`, `{:?}`, `{:#x}`).

macro_rules! trace {
    ($($arg:tt)*) => {{
        #[cfg(feature = "defmt")]
        ::defmt::trace!($($arg)*);
        #[cfg(feature = "debug-logs")]
        ::std::println!($($arg)*);
        #[cfg(not(any(feature = "defmt", feature = "debug-logs")))]
        if false {
            let _ = ::core::format_args!($($arg)*);
        }
    }};
}

macro_rules! debug {
    ($($arg:tt)*) => {{
        #[cfg(feature = "defmt")]
        ::defmt::debug!($($arg)*);
        #[cfg(feature = "debug-logs")]
        ::std::println!($($arg)*);
        #[cfg(not(any(feature = "defmt", feature = "debug-logs")))]
        if false {
            let _ = ::core::format_args!($($arg)*);
        }
    }};
}

macro_rules! warning {
    ($($arg:tt)*) => {{
        #[cfg(feature = "defmt")]
        ::defmt::warn!($($arg)*);
        #[cfg(feature = "debug-logs")]
        ::std::println!($($arg)*);
        #[cfg(not(any(feature = "defmt", feature = "debug-logs")))]
        if false {
            let _ = ::core::format_args!($($arg)*);
        }
    }};
}

macro_rules! error {
    ($($arg:tt)*) => {{
        #[cfg(feature = "defmt")]
        ::defmt::error!($($arg)*);
        #[cfg(feature = "debug-logs")]
        ::std::eprintln!($($arg)*);
        #[cfg(not(any(feature = "defmt", feature = "debug-logs")))]
        if false {
            let _ = ::core::format_args!($($arg)*);
        }
    }};
}

pub(crate) use {debug, error, trace, warning};
