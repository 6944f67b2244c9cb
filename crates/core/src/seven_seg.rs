//! Three-digit time-multiplexed seven-segment display.
//!
//! Only one digit is lit at a time. Timer0 compare A lights the next digit,
//! compare B blanks it; the ratio between the two sets the brightness. The
//! segment port drives the LED cathodes, so a segment is on when its bit is 0.
//!
//! Segment bit layout (bit 7 first):
//!
//! ```text
//!   +== A ==+
//!   F       B        A 0x80   B 0x40   C 0x20   DP 0x10
//!   +== G ==+        D 0x08   E 0x04   G 0x02   F  0x01
//!   E       C
//!   +== D ==+ DP
//! ```

use crate::{SCREEN_HEIGHT, SCREEN_WIDTH};

pub const NUM_DIGITS: usize = 3;

pub const SEG_A: u8 = 0x80;
pub const SEG_B: u8 = 0x40;
pub const SEG_C: u8 = 0x20;
pub const SEG_DP: u8 = 0x10;
pub const SEG_D: u8 = 0x08;
pub const SEG_E: u8 = 0x04;
pub const SEG_G: u8 = 0x02;
pub const SEG_F: u8 = 0x01;

/// Segments lit for `c`. Characters with no sensible rendering are blank.
pub const fn segments(c: char) -> u8 {
    match c {
        '0' | 'O' => 0b1110_1101,
        '1' => 0b0110_0000,
        '2' => 0b1100_1110,
        '3' => 0b1110_1010,
        '4' => 0b0110_0011,
        '5' | 'S' | 's' => 0b1010_1011,
        '6' => 0b1010_1111,
        '7' => 0b1110_0000,
        '8' | 'B' => 0b1110_1111,
        '9' | 'g' => 0b1110_1011,
        '!' => 0b0111_0000,
        '\'' | '`' => 0b0100_0000,
        '-' => 0b0000_0010,
        '.' => 0b0001_0000,
        '=' => 0b1000_0010,
        '?' => 0b1100_0110,
        '[' => 0b1000_1101,
        ']' => 0b1110_1000,
        '_' => 0b0000_1000,
        '|' | 'I' => 0b0000_0101,
        'A' => 0b1110_0111,
        'C' => 0b1000_1101,
        'E' => 0b1000_1111,
        'F' => 0b1000_0111,
        'G' => 0b1010_1101,
        'H' => 0b0110_0111,
        'J' => 0b0110_1100,
        'L' => 0b0000_1101,
        'N' => 0b1110_0101,
        'P' | 'p' => 0b1100_0111,
        'U' => 0b0110_1101,
        'b' => 0b0010_1111,
        'c' => 0b0000_1110,
        'd' => 0b0110_1110,
        'h' => 0b0010_0111,
        'j' => 0b0110_1000,
        'o' => 0b0010_1110,
        'q' => 0b1110_0011,
        'r' => 0b0000_0110,
        't' => 0b0000_1111,
        'u' => 0b0010_1100,
        'y' => 0b0110_1011,
        _ => 0,
    }
}

pub fn is_printable(c: char) -> bool {
    segments(c) != 0
}

/// Best-effort inverse of [`segments`], ignoring the decimal point.
/// Shared patterns decode to the first ASCII character that uses them.
pub fn decode(segs: u8) -> char {
    let segs = segs & !SEG_DP;
    if segs == 0 {
        return ' ';
    }
    (b'!'..=b'~')
        .map(char::from)
        .find(|&c| segments(c) == segs)
        .unwrap_or('?')
}

pub struct SevenSeg {
    /// Digit currently selected by the multiplexer
    current_digit: usize,
    /// Latched port value per digit, active-low. Digit 0 is the rightmost.
    segment_data: [u8; NUM_DIGITS],
    enabled: bool,
    /// Digit select line of the current digit
    digit_lit: bool,
    segment_port: u8,
    /// Multiplex steps taken while enabled
    pub refreshes: u64,
}

impl SevenSeg {
    pub fn new() -> Self {
        SevenSeg {
            current_digit: 0,
            segment_data: [!0; NUM_DIGITS],
            enabled: false,
            digit_lit: false,
            segment_port: 0,
            refreshes: 0,
        }
    }

    /// Latch `c` into `digit` (0 is the rightmost). Out-of-range digits are
    /// ignored.
    pub fn set_digit(&mut self, digit: usize, c: char, with_dot: bool) {
        if digit >= NUM_DIGITS {
            return;
        }
        let mut segs = segments(c);
        if with_dot {
            segs |= SEG_DP;
        }
        self.segment_data[digit] = !segs;
    }

    /// Show a decimal number right-aligned.
    ///
    /// Negative numbers take the leftmost digit for a `-`. Numbers too wide
    /// for the display keep their least significant digits.
    pub fn show_number(&mut self, number: i32, hide_leading_zeros: bool) {
        let mut available = NUM_DIGITS;
        if number < 0 {
            self.set_digit(NUM_DIGITS - 1, '-', false);
            available -= 1;
        }
        let mut n = number.unsigned_abs();
        for i in 0..available {
            let c = if n == 0 && i > 0 && hide_leading_zeros {
                ' '
            } else {
                char::from(b'0' + (n % 10) as u8)
            };
            self.set_digit(i, c, false);
            n /= 10;
        }
    }

    pub fn display_on(&mut self) {
        self.enabled = true;
    }

    /// Blank the display. Latched digits are kept.
    pub fn display_off(&mut self) {
        self.enabled = false;
        self.switch_off_active_digit();
        self.current_digit = 0;
    }

    pub fn is_on(&self) -> bool {
        self.enabled
    }

    /// Timer compare A: move on to the next digit and light it.
    pub fn timer_high(&mut self) {
        if self.enabled {
            self.current_digit = (self.current_digit + 1) % NUM_DIGITS;
            self.digit_lit = true;
            self.segment_port = self.segment_data[self.current_digit];
            self.refreshes += 1;
        }
    }

    /// Timer compare B: blank the lit digit.
    pub fn timer_low(&mut self) {
        if self.enabled {
            self.switch_off_active_digit();
        }
    }

    fn switch_off_active_digit(&mut self) {
        self.digit_lit = false;
        self.segment_port = 0;
    }

    /// Raw segment port value.
    pub fn segment_port(&self) -> u8 {
        self.segment_port
    }

    /// Index of the digit whose select line is active.
    pub fn lit_digit(&self) -> Option<usize> {
        self.digit_lit.then_some(self.current_digit)
    }

    /// Lit segments latched for `digit`, active-high.
    pub fn digit_segments(&self, digit: usize) -> u8 {
        self.segment_data.get(digit).map_or(0, |&d| !d)
    }

    /// Latched contents read left to right, e.g. `"b.04"` or `"120"`.
    pub fn text(&self) -> String {
        let mut s = String::new();
        for digit in (0..NUM_DIGITS).rev() {
            let segs = self.digit_segments(digit);
            s.push(decode(segs));
            if segs & SEG_DP != 0 {
                s.push('.');
            }
        }
        s
    }

    /// Render the latched digits as 0RGB pixels, `SCREEN_WIDTH * SCREEN_HEIGHT`.
    ///
    /// Multiplexing is faster than any frame rate, so every digit is drawn
    /// as if lit whenever the display is on.
    pub fn as_pixel_buffer(&self) -> Vec<u32> {
        let mut pixels = vec![BACKGROUND; SCREEN_WIDTH * SCREEN_HEIGHT];
        for digit in 0..NUM_DIGITS {
            let x0 = MARGIN + (NUM_DIGITS - 1 - digit) * CELL_PITCH;
            let segs = if self.enabled { self.digit_segments(digit) } else { 0 };
            for &(mask, x, y, w, h) in SEGMENT_RECTS.iter() {
                let color = if segs & mask != 0 { SEGMENT_ON } else { SEGMENT_OFF };
                fill_rect(&mut pixels, x0 + x, MARGIN + y, w, h, color);
            }
        }
        pixels
    }
}

impl Default for SevenSeg {
    fn default() -> Self {
        Self::new()
    }
}

// ─── Rendering geometry ─────────────────────────────────────────────────────

const BACKGROUND: u32 = 0x10_10_10;
const SEGMENT_ON: u32 = 0xFF_30_20;
const SEGMENT_OFF: u32 = 0x30_10_10;
const MARGIN: usize = 4;
const CELL_PITCH: usize = 32;

/// (segment, x, y, width, height) within one digit cell
const SEGMENT_RECTS: [(u8, usize, usize, usize, usize); 8] = [
    (SEG_A, 4, 0, 16, 4),
    (SEG_B, 20, 4, 4, 16),
    (SEG_C, 20, 24, 4, 16),
    (SEG_D, 4, 40, 16, 4),
    (SEG_E, 0, 24, 4, 16),
    (SEG_F, 0, 4, 4, 16),
    (SEG_G, 4, 20, 16, 4),
    (SEG_DP, 26, 40, 4, 4),
];

/// Fill a rectangle, clipped to the screen.
pub fn fill_rect(pixels: &mut [u32], x: usize, y: usize, w: usize, h: usize, color: u32) {
    for row in y..(y + h).min(SCREEN_HEIGHT) {
        for col in x..(x + w).min(SCREEN_WIDTH) {
            pixels[row * SCREEN_WIDTH + col] = color;
        }
    }
}
