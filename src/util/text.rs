//! Text helpers for model object names.

/// Byte width of a string once encoded as Shift-JIS.
///
/// ASCII and half-width katakana take one byte, everything else two.
pub fn shift_jis_len(s: &str) -> usize {
    s.chars()
        .map(|c| match c as u32 {
            0x00..=0x7f => 1,
            0xff61..=0xff9f => 1,
            _ => 2,
        })
        .sum()
}
