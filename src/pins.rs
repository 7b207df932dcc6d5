//! GPIO / peripheral pin assignments for the TogglePub board.
//!
//! Single source of truth: every driver references this module rather than
//! hard-coding pin numbers.  Change a pin here and it propagates everywhere.

// ---------------------------------------------------------------------------
// User buttons (active-low with pull-up)
// ---------------------------------------------------------------------------

/// Primary user button. A press publishes the next on/off toggle.
pub const USER_BTN1_GPIO: i32 = 0;
/// Secondary user button. Shares the GPIO interrupt with BTN1 but has no
/// function of its own; its status bit still has to be cleared on every
/// interrupt or the line re-triggers immediately.
pub const USER_BTN2_GPIO: i32 = 14;

/// Every button wired to the shared GPIO interrupt line.
pub const SHARED_LINE_GPIOS: [i32; 2] = [USER_BTN1_GPIO, USER_BTN2_GPIO];

/// Interrupt priority level for the shared button line (lowest, level 1).
pub const BUTTON_INTR_LEVEL: u32 = 1;

// ---------------------------------------------------------------------------
// GPIO interrupt status registers (ESP32-S3, bank 0 = GPIO0..31)
// ---------------------------------------------------------------------------

/// Pending-interrupt status for GPIO0..31.
pub const GPIO_STATUS_REG: usize = 0x6000_4044;
/// Write-1-to-clear alias of [`GPIO_STATUS_REG`].
pub const GPIO_STATUS_W1TC_REG: usize = 0x6000_404C;

/// Status-register bit for a bank-0 GPIO.
pub const fn status_mask(gpio: i32) -> u32 {
    1u32 << (gpio as u32)
}
