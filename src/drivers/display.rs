//! 20×4 screen manager on top of an [`LcdBackend`].
//!
//! Screens are composed into a line buffer and only rows that differ from
//! what is already on the glass are rewritten, so the weight screen can be
//! refreshed every control cycle without flicker.
//!
//! Status and error screens may carry a timeout.  While one is pending,
//! weight updates are remembered but not drawn; once it elapses the
//! display falls back to the latest weight screen.

use core::fmt::Write as _;

use heapless::String;
use log::{info, warn};

use super::lcd::{LCD_COLS, LCD_ROWS, LcdBackend};
use crate::app::ports::{DisplayPort, Screen};
use crate::error::DisplayError;

pub type Line = String<LCD_COLS>;

const TITLE: &str = "TAVOLO";
const SUBTITLE: &str = "Weight Monitor";
const BOOT_FOOTER: &str = "Initializing...";
const WEIGHT_TITLE: &str = "TAVOLO WEIGHT";
const STATUS_TITLE: &str = "STATUS";
const ERROR_TITLE: &str = "ERROR";
const ERROR_FOOTER: &str = "Check system";
const LINK_UP: &str = "Connected to Edge";
const LINK_DOWN: &str = "Edge Offline";

/// Center `text` in a 20-column line, truncating on the right.
pub fn center_text(text: &str) -> Line {
    let len = text.chars().count().min(LCD_COLS);
    if len == 0 {
        return Line::new();
    }
    let pad = (LCD_COLS - len) / 2;
    let mut line = Line::new();
    for _ in 0..pad {
        let _ = line.push(' ');
    }
    for c in text.chars().take(len) {
        let _ = line.push(c);
    }
    line
}

/// `"123.4 g"` below a kilogram, `"1.23 kg"` from there up.
pub fn format_weight(grams: f32) -> Line {
    let mut line = Line::new();
    let _ = if grams >= 1000.0 {
        write!(line, "{:.2} kg", grams / 1000.0)
    } else {
        write!(line, "{:.1} g", grams)
    };
    line
}

pub struct DisplayManager<B> {
    backend: B,
    available: bool,
    screen: Screen,
    /// Rows as last written to the backend; `None` when unknown.
    shown: [Option<Line>; LCD_ROWS],
    now_ms: u64,
    deadline_ms: Option<u64>,
    weight_g: f32,
    weight_status: Line,
    link_connected: bool,
}

impl<B: LcdBackend> DisplayManager<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            available: false,
            screen: Screen::Boot,
            shown: Default::default(),
            now_ms: 0,
            deadline_ms: None,
            weight_g: 0.0,
            weight_status: Line::new(),
            link_connected: false,
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Rows currently on the glass.
    pub fn lines(&self) -> [&str; LCD_ROWS] {
        core::array::from_fn(|row| self.shown[row].as_ref().map_or("", |l| l.as_str()))
    }

    fn timed_screen_pending(&self) -> bool {
        self.deadline_ms.is_some()
    }

    fn render(&mut self, screen: Screen, lines: [Line; LCD_ROWS]) {
        self.screen = screen;
        if !self.available {
            return;
        }
        for (row, line) in lines.into_iter().enumerate() {
            if self.shown[row].as_ref() == Some(&line) {
                continue;
            }
            match self.backend.write_line(row, &line) {
                Ok(()) => self.shown[row] = Some(line),
                Err(e) => {
                    warn!("LCD row {}: {}", row, e);
                    self.shown[row] = None;
                }
            }
        }
    }

    fn render_weight(&mut self) {
        let mut status = Line::new();
        let _ = write!(status, "Status: {}", self.weight_status);
        let lines = [
            center_text(WEIGHT_TITLE),
            center_text(&format_weight(self.weight_g)),
            center_text(&status),
            center_text(if self.link_connected { LINK_UP } else { LINK_DOWN }),
        ];
        self.render(Screen::Weight, lines);
    }

    fn arm(&mut self, timeout_ms: u32) {
        self.deadline_ms = (timeout_ms > 0).then(|| self.now_ms + u64::from(timeout_ms));
    }
}

impl<B: LcdBackend> DisplayPort for DisplayManager<B> {
    fn begin(&mut self) -> Result<(), DisplayError> {
        self.backend.init()?;
        self.backend.set_backlight(true)?;
        self.available = true;
        self.shown = Default::default();
        info!("LCD initialized ({}x{})", LCD_COLS, LCD_ROWS);
        Ok(())
    }

    fn show_boot(&mut self, device_id: &str) {
        self.deadline_ms = None;
        let lines = [
            center_text(TITLE),
            center_text(SUBTITLE),
            center_text(device_id),
            center_text(BOOT_FOOTER),
        ];
        self.render(Screen::Boot, lines);
    }

    fn show_weight(&mut self, grams: f32, status: &str) {
        self.weight_g = grams;
        self.weight_status.clear();
        for c in status.chars().take(LCD_COLS) {
            let _ = self.weight_status.push(c);
        }
        if self.timed_screen_pending() {
            return;
        }
        self.render_weight();
    }

    fn show_link(&mut self, connected: bool) {
        if connected == self.link_connected {
            return;
        }
        self.link_connected = connected;
        if self.screen == Screen::Weight && !self.timed_screen_pending() {
            self.render_weight();
        }
    }

    fn show_status(&mut self, text: &str, timeout_ms: u32) {
        self.arm(timeout_ms);
        let lines = [
            center_text(STATUS_TITLE),
            Line::new(),
            center_text(text),
            Line::new(),
        ];
        self.render(Screen::Status, lines);
    }

    fn show_error(&mut self, text: &str, timeout_ms: u32) {
        self.arm(timeout_ms);
        let lines = [
            center_text(ERROR_TITLE),
            Line::new(),
            center_text(text),
            center_text(ERROR_FOOTER),
        ];
        self.render(Screen::Error, lines);
    }

    fn update(&mut self, now_ms: u64) {
        self.now_ms = now_ms;
        if self.deadline_ms.is_some_and(|deadline| now_ms >= deadline) {
            self.deadline_ms = None;
            self.render_weight();
        }
    }

    fn screen(&self) -> Screen {
        self.screen
    }
}
