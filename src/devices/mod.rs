//! Complex modules with business logic related to the problem
//! domain, that lay on top of abstract drivers. Devices are
//! generic, while host or board specifics are handled in the
//! `ports` module.

pub mod bank;
pub mod boot_trailer;
pub mod light;
pub mod product_id;
pub mod trailer;
pub mod work_queue;

/// General purpose traits that summarize requirements on devices.
pub mod traits {
    use crate::error;
    use crate::hal::flash;
    use marker_blanket::marker_blanket;

    /// A supported flash must be able to read, program, erase, toggle its
    /// write protection, and report errors to the trailer manager.
    #[marker_blanket]
    pub trait Flash:
        flash::Read<Error: error::Convertible> + flash::Write + flash::Erase + flash::WriteProtect
    {
    }
}
