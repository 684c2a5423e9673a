// SPDX-License-Identifier: MIT
//
// Nickname colors.
//
// Every username gets a stable hue from a 32-bit string hash, rendered at
// fixed saturation and lightness so all names are equally readable on a
// dark background. The hash walks UTF-16 code units the way browsers
// and the web client do, so a name has the same color everywhere.

use pport_term::ansi::{Color, Style};

/// `h = h * 31 + unit` over the first UTF-16 unit of each character,
/// wrapping at 32 bits.
#[must_use]
pub fn hash(name: &str) -> i32 {
    let mut units = [0u16; 2];
    name.chars().fold(0i32, |h, ch| {
        let unit = ch.encode_utf16(&mut units)[0];
        (h << 5).wrapping_sub(h).wrapping_add(i32::from(unit))
    })
}

/// Hue in degrees, `0..360`.
#[must_use]
pub fn hue(name: &str) -> u16 {
    // i64 so that |i32::MIN| does not overflow.
    let h = i64::from(hash(name)).abs() % 360;
    u16::try_from(h).unwrap_or(0)
}

/// HSL (degrees, percent, percent) to 8-bit RGB.
#[must_use]
pub fn hsl_to_rgb(h: u16, s: u8, l: u8) -> (u8, u8, u8) {
    let h = f64::from(h);
    let s = f64::from(s) / 100.0;
    let l = f64::from(l) / 100.0;

    let a = s * l.min(1.0 - l);
    let channel = |n: f64| {
        let k = (n + h / 30.0) % 12.0;
        let v = l - a * (k - 3.0).min(9.0 - k).min(1.0).max(-1.0);
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)] // clamped to 0..=255
        let byte = (255.0 * v).round().clamp(0.0, 255.0) as u8;
        byte
    };

    (channel(0.0), channel(8.0), channel(4.0))
}

/// The 24-bit color for a username.
#[must_use]
pub fn nickname_color(name: &str) -> Color {
    let (r, g, b) = hsl_to_rgb(hue(name), 70, 60);
    Color::Rgb(r, g, b)
}

/// `name` painted in its nickname color.
#[must_use]
pub fn paint_nickname(name: &str) -> String {
    Style::fg(nickname_color(name)).paint(name)
}
