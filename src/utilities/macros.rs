//! Convenience macros for the smart light runtime
#![macro_use]

/// Define and export the modules of a specific port, under a single
/// configuration flag.
///
/// # Example
/// ```ignore
/// #[cfg(not(target_arch = "arm"))]
/// port!(native_sim: [clock, flash,]);
/// // Expands into:
/// pub mod native_sim { pub mod clock; pub mod flash; }
/// pub use self::native_sim::clock;
/// pub use self::native_sim::flash;
/// ```
#[macro_export]
macro_rules! port {
    ($outer:ident: [$($inner:ident,)+]) => {
        pub mod $outer {
        $(
            pub mod $inner;
        )+
        }
        $(
            pub use self::$outer::$inner;
        )+
    };
}
