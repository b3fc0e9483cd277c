//! Smart light runtime on the host.
//!
//! Binds the file backed flash, confirms the running image, then drives the
//! light from a thread that plays the part of the mesh stack: provisioning
//! completes, a few Generic OnOff Set messages arrive with varying TTLs, and
//! finally an update image is staged in the second bank. The main thread runs
//! the work queue forever.

use meshlight_lib::{
    configuration,
    devices::{
        bank::MemoryMap,
        boot_trailer::TrailerManager,
        light::{LightBulb, ProvisioningBlink},
        product_id::ProductId,
        trailer::ImageStatus,
        work_queue::WorkQueue,
    },
    error::{Error, ReportOnUnwrap},
    ports::{
        clock::SystemClock, console::Console, flash, gpio::LoggingPin, logger::UptimeLogger,
        pwm::LoggingPwm, thread::ThreadYield,
    },
};
use log::{error, info, warn};
use std::{env, thread, time::Duration};

const DEFAULT_FLASH_IMAGE: &str = "meshlight_flash.bin";

/// Generic OnOff Set messages as (on, received TTL, pause before the next one).
const ONOFF_SCRIPT: [(bool, u8, u64); 5] = [
    (true, 3, 3_000),
    (false, 3, 1_000),
    (true, configuration::DEFAULT_TTL, 2_000),
    (true, configuration::DEFAULT_TTL, 1_000),
    (false, 4, 1_000),
];

fn main() {
    let mut console = Console;
    UptimeLogger::install(configuration::LOG_LEVEL).report_unwrap(&mut console);
    info!("Bluetooth Mesh Smart Light Bulb");
    let product = ProductId::configured();
    info!("Device: {}, Serial: {:x}", product.name, product.number);
    info!("Mesh UUID {:02x?}, address {}", product.device_uuid(), product.bt_address());

    let path = env::args().nth(1).unwrap_or_else(|| DEFAULT_FLASH_IMAGE.into());
    let flash = flash::bind(configuration::FLASH_DRIVER_NAME, &path).report_unwrap(&mut console);
    let mut trailers = TrailerManager::new(flash, MemoryMap::configured());
    confirm_running_image(&mut trailers).report_unwrap(&mut console);

    let queue = WorkQueue::new(SystemClock::new(), ThreadYield);
    queue.init();

    let bulb = LightBulb::configured(LoggingPwm::new("white"));
    let bulb_item = bulb.blink_item();
    let indicator = ProvisioningBlink::configured(LoggingPin::new("led0"));
    let indicator_item = indicator.blink_item();

    let producer = queue.clone();
    thread::spawn(move || {
        if let Err(e) = indicator.provisioning_complete(&indicator_item, &producer) {
            error!("Failed to start provisioning blink: {:?}", e);
        }
        for (on, recv_ttl, pause) in ONOFF_SCRIPT {
            match bulb.set_onoff(&bulb_item, &producer, on, recv_ttl) {
                Ok(true) => info!("OnOff Set {} (ttl {}) applied", on, recv_ttl),
                Ok(false) => info!("OnOff Set {} (ttl {}) left state unchanged", on, recv_ttl),
                Err(e) => error!("OnOff Set failed: {:?}", e),
            }
            thread::sleep(Duration::from_millis(pause));
        }
        if let Err(e) = stage_update(&mut trailers) {
            warn!("Update staging abandoned: {:?}", e);
        }
    });

    queue.run_forever();
}

fn confirm_running_image<F>(trailers: &mut TrailerManager<F>) -> Result<(), Error>
where
    F: meshlight_lib::devices::traits::Flash,
{
    let running = trailers.memory_map().running();
    match trailers.read_image_status(running)? {
        ImageStatus::Done => info!("Running image already confirmed"),
        ImageStatus::Ongoing => trailers.confirm_image(running)?,
    }
    Ok(())
}

fn stage_update<F>(trailers: &mut TrailerManager<F>) -> Result<(), Error>
where
    F: meshlight_lib::devices::traits::Flash,
{
    let staging = trailers.memory_map().staging();
    info!("Receiving update image into bank {}", staging.index);
    trailers.erase_bank(staging)?;
    let image: Vec<u8> = (0..=255u8).cycle().take(4096).collect();
    trailers.write_image(staging, 0, &image)?;
    trailers.trigger_update(staging)?;
    let record = trailers.read_trailer(staging)?;
    info!(
        "Bank {} ready for the bootloader (copy_done {:?}, image_ok {:?})",
        staging.index, record.copy_done, record.image_ok
    );
    Ok(())
}
