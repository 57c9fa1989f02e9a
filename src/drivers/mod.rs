//! Output drivers: the status LED and the character display.

pub mod display;
pub mod lcd;
pub mod led_patterns;
pub mod status_led;
