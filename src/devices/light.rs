//! Smart light application handlers.
//!
//! These are the work items the mesh models feed: the white channel blink
//! pattern driven by Generic OnOff messages, and the provisioning indicator.
//! Both run on the work queue and reschedule themselves while active.

use super::work_queue::{WorkItem, WorkQueue};
use crate::{
    configuration,
    error::{Convertible, Error},
    hal::{
        gpio::OutputPin,
        pwm::Pwm,
        time::{Microseconds, Milliseconds},
    },
};
use log::{debug, error, info, warn};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// PWM period of the light channels (100 Hz).
pub const PWM_PERIOD: Microseconds = Microseconds(1_000_000 / 100);
/// Delay between an OnOff change and the first blink step.
pub const BLINK_START_DELAY: Milliseconds = Milliseconds(10);
/// Blink half period per hop travelled by the OnOff message.
const BLINK_MS_PER_HOP: u32 = 50 * 4;

/// Pulse width for a 0-255 `level`, scaled down by a 0-255 `ceiling`.
pub fn scale_pulse(level: u8, ceiling: u8) -> Microseconds {
    if level == 0 || ceiling == 0 {
        return Microseconds(0);
    }
    Microseconds(PWM_PERIOD.0 / 255 * level as u32 * ceiling as u32 / 255)
}

/// Dimmable white channel.
pub struct WhiteChannel<P: Pwm> {
    pwm: P,
    ceiling: u8,
    level: u8,
}

impl<P: Pwm> WhiteChannel<P>
where
    P::Error: Convertible,
{
    /// A channel assumed dark until first updated.
    pub fn new(pwm: P, ceiling: u8) -> Self { Self { pwm, ceiling, level: 0 } }

    /// Sets the channel to `dimmer` percent (clamped to 100). The PWM is only
    /// touched when the resulting level changes.
    pub fn update(&mut self, dimmer: u8) -> Result<(), Error> {
        let dimmer = dimmer.min(100);
        let level = (255 * dimmer as u32 / 100) as u8;
        if level != self.level {
            let pulse = scale_pulse(level, self.ceiling);
            debug!("White level {}, ceiling {}, pulse {} us", level, self.ceiling, pulse.0);
            self.pwm.set_pulse(PWM_PERIOD, pulse)?;
            self.level = level;
        }
        Ok(())
    }

    pub fn level(&self) -> u8 { self.level }

    pub fn pwm(&self) -> &P { &self.pwm }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
struct Blink {
    count: u32,
    delay: Milliseconds,
}

struct BulbState<P: Pwm> {
    on: bool,
    blink: Blink,
    white: WhiteChannel<P>,
}

/// Generic OnOff server state of the bulb, and the body of its blink work
/// item.
///
/// When switched on by a relayed message, the bulb blinks with a half period
/// proportional to the hops the message travelled; a message received
/// directly turns it steadily on.
pub struct LightBulb<P: Pwm> {
    state: Mutex<BulbState<P>>,
    default_ttl: u8,
}

impl<P> LightBulb<P>
where
    P: Pwm + Send + 'static,
    P::Error: Convertible,
{
    pub fn new(pwm: P, ceiling: u8, default_ttl: u8) -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(BulbState {
                on: false,
                blink: Blink::default(),
                white: WhiteChannel::new(pwm, ceiling),
            }),
            default_ttl,
        })
    }

    /// Bulb using the configured ceiling and default TTL.
    pub fn configured(pwm: P) -> Arc<Self> {
        Self::new(pwm, configuration::PWM_WHITE_CEILING, configuration::DEFAULT_TTL)
    }

    /// Work item running this bulb's blink pattern.
    pub fn blink_item(self: &Arc<Self>) -> Arc<WorkItem> {
        let bulb = self.clone();
        WorkItem::from_fn("pwm_blink", move |item, queue| bulb.blink(item, queue))
    }

    pub fn is_on(&self) -> bool { self.lock().on }

    pub fn blink_delay(&self) -> Milliseconds { self.lock().blink.delay }

    /// Current white level, 0-255.
    pub fn white_level(&self) -> u8 { self.lock().white.level() }

    pub fn with_pwm<R, F: FnOnce(&P) -> R>(&self, f: F) -> R { f(self.lock().white.pwm()) }

    /// Handles a Generic OnOff Set. Returns `false` if the bulb already was
    /// in the requested state, in which case nothing is rescheduled.
    pub fn set_onoff(
        &self,
        item: &Arc<WorkItem>,
        queue: &WorkQueue,
        on: bool,
        recv_ttl: u8,
    ) -> Result<bool, Error> {
        let mut state = self.lock();
        if state.on == on {
            return Ok(false);
        }

        // Re-arming replaces any pending blink step. The state lock is held
        // so the handler cannot observe the change before it is committed.
        queue.submit_delayed(item, BLINK_START_DELAY)?;
        let hops = if on { self.default_ttl.saturating_sub(recv_ttl) } else { 0 };
        state.on = on;
        state.blink = Blink { count: 1, delay: Milliseconds(BLINK_MS_PER_HOP * hops as u32) };
        debug!("Light state changed to {}, blink delay {} ms", on, state.blink.delay.0);
        Ok(true)
    }

    fn blink(&self, item: &Arc<WorkItem>, queue: &WorkQueue) {
        let mut state = self.lock();
        let result = if !state.on {
            state.blink.delay = Milliseconds(0);
            state.white.update(0)
        } else if state.blink.delay.0 == 0 {
            state.white.update(100)
        } else {
            let dimmer = if state.blink.count % 2 == 1 { 100 } else { 0 };
            state.blink.count = state.blink.count.wrapping_add(1);
            let delay = state.blink.delay;
            if let Err(e) = queue.submit_delayed(item, delay) {
                warn!("Blink stopped, failed to reschedule: {:?}", e);
            }
            state.white.update(dimmer)
        };
        if let Err(e) = result {
            error!("Failed to update white PWM: {:?}", e);
        }
    }

    fn lock(&self) -> MutexGuard<'_, BulbState<P>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

struct Indicator<Pin> {
    pin: Pin,
    count: u32,
}

/// Visual feedback once the node is provisioned: a LED toggling forever.
pub struct ProvisioningBlink<Pin: OutputPin> {
    indicator: Mutex<Indicator<Pin>>,
    period: Milliseconds,
}

impl<Pin> ProvisioningBlink<Pin>
where
    Pin: OutputPin + Send + 'static,
{
    pub fn new(pin: Pin, period: Milliseconds) -> Arc<Self> {
        Arc::new(Self { indicator: Mutex::new(Indicator { pin, count: 0 }), period })
    }

    pub fn configured(pin: Pin) -> Arc<Self> {
        Self::new(pin, Milliseconds(configuration::PROVISIONING_BLINK_MS))
    }

    pub fn blink_item(self: &Arc<Self>) -> Arc<WorkItem> {
        let blink = self.clone();
        WorkItem::from_fn("provisioning_blink", move |item, queue| blink.toggle(item, queue))
    }

    /// Starts blinking, one period from now.
    pub fn provisioning_complete(&self, item: &Arc<WorkItem>, queue: &WorkQueue) -> Result<(), Error> {
        info!("Provisioning completed!");
        queue.submit_delayed(item, self.period)
    }

    pub fn with_pin<R, F: FnOnce(&Pin) -> R>(&self, f: F) -> R { f(&self.lock().pin) }

    fn toggle(&self, item: &Arc<WorkItem>, queue: &WorkQueue) {
        let mut indicator = self.lock();
        if indicator.count % 2 == 0 {
            indicator.pin.set_low();
        } else {
            indicator.pin.set_high();
        }
        indicator.count = indicator.count.wrapping_add(1);
        if let Err(e) = queue.submit_delayed(item, self.period) {
            warn!("Provisioning blink stopped: {:?}", e);
        }
    }

    fn lock(&self) -> MutexGuard<'_, Indicator<Pin>> {
        self.indicator.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
