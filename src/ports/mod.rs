//! Project ports for specific targets. They provide the concrete
//! drivers the generic devices are assembled from.

#[cfg(not(target_arch = "arm"))]
port!(native_sim: [clock, console, flash, gpio, logger, pwm, thread,]);
