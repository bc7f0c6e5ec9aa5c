//! Text measurement for layout
//!
//! Provides a trait for measuring text during the measure pass. The host
//! supplies a real implementation backed by its font system; without one,
//! [`EstimatedTextMeasurer`] gives deterministic approximate sizes.

use calyx_core::{FontRef, Size};

/// Measures the pixel size of a string in a font
pub trait TextMeasurer {
    fn measure(&self, text: &str, font: &FontRef) -> Size;
}

/// A text measurer that uses estimates
///
/// Width is ~0.55 × font size per character of the longest line, height is
/// 1.2 × font size per line. Results are rounded up to whole pixels.
#[derive(Debug, Clone, Copy, Default)]
pub struct EstimatedTextMeasurer;

impl TextMeasurer for EstimatedTextMeasurer {
    fn measure(&self, text: &str, font: &FontRef) -> Size {
        if text.is_empty() {
            return Size::new(0, (font.size * 1.2).ceil() as i32);
        }
        let lines = text.split('\n');
        let (longest, count) = lines.fold((0usize, 0usize), |(longest, count), line| {
            (longest.max(line.chars().count()), count + 1)
        });

        let width = longest as f32 * font.size * 0.55;
        let height = count as f32 * font.size * 1.2;
        Size::new(width.ceil() as i32, height.ceil() as i32)
    }
}

/// Measures every character as a fixed-size cell; handy for tests
#[derive(Debug, Clone, Copy)]
pub struct MonospaceMeasurer {
    pub char_width: i32,
    pub line_height: i32,
}

impl TextMeasurer for MonospaceMeasurer {
    fn measure(&self, text: &str, _font: &FontRef) -> Size {
        let (longest, count) = text
            .split('\n')
            .fold((0usize, 0usize), |(longest, count), line| {
                (longest.max(line.chars().count()), count + 1)
            });
        Size::new(
            longest as i32 * self.char_width,
            count as i32 * self.line_height,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_estimated_single_line() {
        let font = FontRef::new("any", 10.0);
        let size = EstimatedTextMeasurer.measure("abcd", &font);
        assert_eq!(size, Size::new(22, 12));
    }

    #[test]
    fn test_estimated_multi_line_uses_longest_line() {
        let font = FontRef::new("any", 10.0);
        let size = EstimatedTextMeasurer.measure("ab\nabcd", &font);
        assert_eq!(size, Size::new(22, 24));
    }

    #[test]
    fn test_monospace() {
        let m = MonospaceMeasurer {
            char_width: 8,
            line_height: 16,
        };
        let font = FontRef::new("mono", 12.0);
        assert_eq!(m.measure("hello", &font), Size::new(40, 16));
        assert_eq!(m.measure("", &font), Size::new(0, 16));
    }
}
