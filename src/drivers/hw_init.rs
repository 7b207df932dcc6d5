//! One-shot button hardware setup and the shared interrupt line.
//!
//! Configures both user-button GPIOs, registers the line handler with raw
//! ESP-IDF sys calls, and provides the two halves of line access:
//!
//! - [`ButtonStatusLine`]: interrupt side (acknowledge, read level)
//! - [`ButtonIrqControl`]: task side (arm, disarm)
//!
//! On the host both halves are backed by a [`SimButtonLine`] that a test or
//! the simulation loop drives by hand.

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;
#[cfg(target_os = "espidf")]
use log::info;

#[cfg(not(target_os = "espidf"))]
use std::sync::Arc;
#[cfg(not(target_os = "espidf"))]
use std::sync::atomic::{AtomicBool, Ordering};

use crate::app::ports::InterruptLinePort;
use crate::drivers::button::{SharedIrqLine, YieldHook};
#[cfg(target_os = "espidf")]
use crate::drivers::button::ButtonIsr;
#[cfg(target_os = "espidf")]
use crate::app::ports::Clock;
#[cfg(target_os = "espidf")]
use crate::pins;

// ── Error type ────────────────────────────────────────────────

/// Errors while configuring or arming the button line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HwInitError {
    GpioConfigFailed(i32),
    IsrInstallFailed(i32),
    IntrEnableFailed(i32),
}

impl core::fmt::Display for HwInitError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::GpioConfigFailed(rc) => write!(f, "GPIO config failed (rc={})", rc),
            Self::IsrInstallFailed(rc) => write!(f, "GPIO line ISR install failed (rc={})", rc),
            Self::IntrEnableFailed(rc) => write!(f, "GPIO interrupt enable failed (rc={})", rc),
        }
    }
}

impl core::error::Error for HwInitError {}

// ── GPIO inputs ───────────────────────────────────────────────

/// Configure both buttons as pulled-up inputs with their edge types set and
/// their interrupts left disarmed.
#[cfg(target_os = "espidf")]
pub fn init_buttons() -> Result<(), HwInitError> {
    let buttons = [
        (pins::USER_BTN1_GPIO, gpio_int_type_t_GPIO_INTR_ANYEDGE),
        (pins::USER_BTN2_GPIO, gpio_int_type_t_GPIO_INTR_NEGEDGE),
    ];

    for (pin, intr_type) in buttons {
        let cfg = gpio_config_t {
            pin_bit_mask: 1u64 << pin,
            mode: gpio_mode_t_GPIO_MODE_INPUT,
            pull_up_en: gpio_pullup_t_GPIO_PULLUP_ENABLE,
            pull_down_en: gpio_pulldown_t_GPIO_PULLDOWN_DISABLE,
            intr_type,
            ..Default::default()
        };
        // SAFETY: called once from main() before any task touches the pins.
        let ret = unsafe { gpio_config(&cfg) };
        if ret != ESP_OK as i32 { return Err(HwInitError::GpioConfigFailed(ret)); }
        // gpio_config arms the interrupt; the publisher arms it on Init.
        unsafe { gpio_intr_disable(pin) };
    }

    info!("hw_init: buttons configured (btn1=GPIO{}, btn2=GPIO{})",
        pins::USER_BTN1_GPIO, pins::USER_BTN2_GPIO);
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn init_buttons() -> Result<(), HwInitError> {
    log::info!("hw_init(sim): button GPIO config skipped");
    Ok(())
}

// ── Interrupt side ────────────────────────────────────────────

/// Register-level view of the shared line, used from the handler.
#[cfg(target_os = "espidf")]
pub struct ButtonStatusLine;

#[cfg(target_os = "espidf")]
impl SharedIrqLine for ButtonStatusLine {
    fn acknowledge(&mut self) -> bool {
        let line_mask = pins::SHARED_LINE_GPIOS
            .iter()
            .fold(0u32, |m, &gpio| m | pins::status_mask(gpio));
        // SAFETY: GPIO_STATUS and its W1TC alias are always-mapped MMIO on the
        // S3; the write only clears bits belonging to this line.
        let status = unsafe {
            let status = core::ptr::read_volatile(pins::GPIO_STATUS_REG as *const u32);
            core::ptr::write_volatile(pins::GPIO_STATUS_W1TC_REG as *mut u32, line_mask);
            status
        };
        status & pins::status_mask(pins::USER_BTN1_GPIO) != 0
    }

    fn is_pressed(&self) -> bool {
        // SAFETY: register read on a configured input; ISR-safe.
        unsafe { gpio_get_level(pins::USER_BTN1_GPIO) == 0 }
    }
}

/// Context-switch request on handler exit.
pub struct IsrYield;

impl YieldHook for IsrYield {
    #[cfg(target_os = "espidf")]
    fn yield_from_isr(&mut self) {
        esp_idf_hal::task::do_yield();
    }

    #[cfg(not(target_os = "espidf"))]
    fn yield_from_isr(&mut self) {
        std::thread::yield_now();
    }
}

#[cfg(target_os = "espidf")]
unsafe extern "C" fn button_line_isr<C: Clock>(arg: *mut core::ffi::c_void) {
    // SAFETY: `arg` is the ButtonIsr leaked in install_button_isr(); this
    // handler is its only user.
    let isr = unsafe { &mut *arg.cast::<ButtonIsr<'static, ButtonStatusLine, C, IsrYield>>() };
    isr.on_interrupt();
}

/// Hand the button handler to the interrupt controller. The handler owns its
/// debounce state from here on.
#[cfg(target_os = "espidf")]
pub fn install_button_isr<C: Clock + 'static>(
    isr: ButtonIsr<'static, ButtonStatusLine, C, IsrYield>,
) -> Result<(), HwInitError> {
    let arg = Box::into_raw(Box::new(isr)).cast::<core::ffi::c_void>();
    let flags = 1i32 << pins::BUTTON_INTR_LEVEL; // ESP_INTR_FLAG_LEVELn
    // SAFETY: the boxed handler is never freed, so `arg` outlives the
    // registration.
    let ret = unsafe {
        gpio_isr_register(Some(button_line_isr::<C>), arg, flags, core::ptr::null_mut())
    };
    if ret != ESP_OK as i32 {
        // SAFETY: registration failed, nothing else holds the pointer.
        drop(unsafe { Box::from_raw(arg.cast::<ButtonIsr<'static, ButtonStatusLine, C, IsrYield>>()) });
        return Err(HwInitError::IsrInstallFailed(ret));
    }
    info!("hw_init: shared button line handler installed (level {})", pins::BUTTON_INTR_LEVEL);
    Ok(())
}

// ── Task side ─────────────────────────────────────────────────

/// Arms and disarms the whole button line.
#[cfg(target_os = "espidf")]
pub struct ButtonIrqControl;

#[cfg(target_os = "espidf")]
impl InterruptLinePort for ButtonIrqControl {
    fn enable(&mut self) -> Result<(), HwInitError> {
        // Drop anything latched while the line was disarmed.
        ButtonStatusLine.acknowledge();
        for gpio in pins::SHARED_LINE_GPIOS {
            // SAFETY: pins were configured by init_buttons().
            let ret = unsafe { gpio_intr_enable(gpio) };
            if ret != ESP_OK as i32 { return Err(HwInitError::IntrEnableFailed(ret)); }
        }
        Ok(())
    }

    fn disable(&mut self) {
        for gpio in pins::SHARED_LINE_GPIOS {
            // SAFETY: as above; disabling an unarmed pin is a no-op.
            unsafe { gpio_intr_disable(gpio) };
        }
    }
}

// ── Host simulation ───────────────────────────────────────────

#[cfg(not(target_os = "espidf"))]
#[derive(Default)]
struct SimLineState {
    armed: AtomicBool,
    btn1_pending: AtomicBool,
    btn2_pending: AtomicBool,
    btn1_down: AtomicBool,
    fail_enable: AtomicBool,
}

/// Host stand-in for the shared button line. Clones share state, so one
/// clone can live in the handler while another drives edges.
#[cfg(not(target_os = "espidf"))]
#[derive(Clone, Default)]
pub struct SimButtonLine {
    state: Arc<SimLineState>,
}

#[cfg(not(target_os = "espidf"))]
impl SimButtonLine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Move the primary button to `pressed`. Returns whether the line
    /// interrupt fires, i.e. whether the handler should run now.
    pub fn drive(&self, pressed: bool) -> bool {
        self.state.btn1_down.store(pressed, Ordering::Release);
        if !self.is_armed() {
            return false;
        }
        self.state.btn1_pending.store(true, Ordering::Release);
        true
    }

    /// Falling edge on the secondary button.
    pub fn drive_sibling(&self) -> bool {
        if !self.is_armed() {
            return false;
        }
        self.state.btn2_pending.store(true, Ordering::Release);
        true
    }

    pub fn is_armed(&self) -> bool {
        self.state.armed.load(Ordering::Acquire)
    }

    /// Whether either button still has a status bit latched.
    pub fn has_pending(&self) -> bool {
        self.state.btn1_pending.load(Ordering::Acquire)
            || self.state.btn2_pending.load(Ordering::Acquire)
    }

    /// Make the next `enable()` fail, as a broken interrupt controller would.
    pub fn fail_next_enable(&self) {
        self.state.fail_enable.store(true, Ordering::Release);
    }

    pub fn control(&self) -> ButtonIrqControl {
        ButtonIrqControl { line: self.clone() }
    }
}

#[cfg(not(target_os = "espidf"))]
impl SharedIrqLine for SimButtonLine {
    fn acknowledge(&mut self) -> bool {
        self.state.btn2_pending.store(false, Ordering::Release);
        self.state.btn1_pending.swap(false, Ordering::AcqRel)
    }

    fn is_pressed(&self) -> bool {
        self.state.btn1_down.load(Ordering::Acquire)
    }
}

#[cfg(not(target_os = "espidf"))]
pub struct ButtonIrqControl {
    line: SimButtonLine,
}

#[cfg(not(target_os = "espidf"))]
impl InterruptLinePort for ButtonIrqControl {
    fn enable(&mut self) -> Result<(), HwInitError> {
        if self.line.state.fail_enable.swap(false, Ordering::AcqRel) {
            return Err(HwInitError::IntrEnableFailed(-1));
        }
        self.line.acknowledge();
        self.line.state.armed.store(true, Ordering::Release);
        Ok(())
    }

    fn disable(&mut self) {
        self.line.state.armed.store(false, Ordering::Release);
    }
}

// ── Fatal stop ────────────────────────────────────────────────

/// Log `reason` and stop this core for good with interrupts masked.
#[cfg(target_os = "espidf")]
pub fn halt(reason: &dyn core::fmt::Display) -> ! {
    log::error!("halt: {}", reason);
    let cs = esp_idf_hal::interrupt::IsrCriticalSection::new();
    let _masked = cs.enter();
    loop {
        core::hint::spin_loop();
    }
}

/// Log `reason` and park the calling thread for good.
#[cfg(not(target_os = "espidf"))]
pub fn halt(reason: &dyn core::fmt::Display) -> ! {
    log::error!("halt(sim): {}", reason);
    loop {
        std::thread::park();
    }
}

#[cfg(all(test, not(target_os = "espidf")))]
mod tests {
    use super::*;

    #[test]
    fn disarmed_line_swallows_edges() {
        let line = SimButtonLine::new();
        assert!(!line.drive(true));
        assert!(!line.has_pending());
        // The level is still tracked.
        assert!(line.is_pressed());
    }

    #[test]
    fn acknowledge_clears_both_buttons() {
        let mut line = SimButtonLine::new();
        line.control().enable().unwrap();

        assert!(line.drive_sibling());
        assert!(!line.acknowledge());
        assert!(!line.has_pending());

        assert!(line.drive(true));
        assert!(line.drive_sibling());
        assert!(line.acknowledge());
        assert!(!line.has_pending());
    }

    #[test]
    fn enable_discards_stale_status() {
        let line = SimButtonLine::new();
        let mut ctl = line.control();
        ctl.enable().unwrap();
        line.drive(true);
        ctl.disable();
        assert!(line.has_pending());

        ctl.enable().unwrap();
        assert!(!line.has_pending());
    }

    #[test]
    fn injected_enable_failure_is_one_shot() {
        let line = SimButtonLine::new();
        let mut ctl = line.control();
        line.fail_next_enable();
        assert_eq!(ctl.enable(), Err(HwInitError::IntrEnableFailed(-1)));
        assert!(!line.is_armed());
        assert!(ctl.enable().is_ok());
        assert!(line.is_armed());
    }

    #[test]
    fn display_includes_return_code() {
        let e = HwInitError::IsrInstallFailed(259);
        assert_eq!(e.to_string(), "GPIO line ISR install failed (rc=259)");
    }
}
