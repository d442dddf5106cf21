use std::collections::VecDeque;

use crate::canvas::Color;

/// Maximum number of recent colours kept.
pub const COLOR_HISTORY_LEN: usize = 10;

/// Recent colours shown before the user has picked anything.
pub const INITIAL_HISTORY: [Color; 5] = [
    Color::new(0x00, 0x00, 0x00),
    Color::new(0xFF, 0xFF, 0xFF),
    Color::new(0xFF, 0x57, 0x33),
    Color::new(0x33, 0xFF, 0x57),
    Color::new(0x33, 0x57, 0xFF),
];

/// A named set of swatches.
#[derive(Clone, Copy, Debug)]
pub struct Palette {
    pub name: &'static str,
    pub colors: [Color; 8],
}

const fn hex(v: u32) -> Color {
    Color::new((v >> 16) as u8, (v >> 8) as u8, v as u8)
}

pub const PALETTES: [Palette; 5] = [
    Palette {
        name: "Classic",
        colors: [
            hex(0x000000), hex(0xFFFFFF), hex(0xFF0000), hex(0x00FF00),
            hex(0x0000FF), hex(0xFFFF00), hex(0x00FFFF), hex(0xFF00FF),
        ],
    },
    Palette {
        name: "Pastel",
        colors: [
            hex(0xFFB3BA), hex(0xFFDFBA), hex(0xFFFFBA), hex(0xBAFFC9),
            hex(0xBAE1FF), hex(0xEECBFF), hex(0xD4A5A5), hex(0xC3B1E1),
        ],
    },
    Palette {
        name: "Earth",
        colors: [
            hex(0x6B4423), hex(0x8B5A2B), hex(0xA0522D), hex(0xCD853F),
            hex(0xDEB887), hex(0xF5DEB3), hex(0xFFF8DC), hex(0x556B2F),
        ],
    },
    Palette {
        name: "Retro",
        colors: [
            hex(0x1A1C2C), hex(0x5D275D), hex(0xB13E53), hex(0xEF7D57),
            hex(0xFFCD75), hex(0xA7F070), hex(0x38B764), hex(0x257179),
        ],
    },
    Palette {
        name: "Bone",
        colors: [
            hex(0xF9F6F0), hex(0xEBE5CE), hex(0xD6CFC7), hex(0xBFB5A9),
            hex(0x8C857B), hex(0x57534E), hex(0x292524), hex(0x1C1917),
        ],
    },
];

pub fn palette(name: &str) -> Option<&'static Palette> {
    PALETTES.iter().find(|p| p.name.eq_ignore_ascii_case(name))
}

// ============================================================================
// COLOR HISTORY – most-recently-used first, no duplicates
// ============================================================================

#[derive(Clone, Debug, PartialEq)]
pub struct ColorHistory {
    colors: VecDeque<Color>,
    capacity: usize,
}

impl Default for ColorHistory {
    fn default() -> Self {
        Self::with_colors(&INITIAL_HISTORY, COLOR_HISTORY_LEN)
    }
}

impl ColorHistory {
    pub fn new(capacity: usize) -> Self {
        Self::with_colors(&[], capacity)
    }

    pub fn with_colors(colors: &[Color], capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let mut history = Self {
            colors: VecDeque::with_capacity(capacity + 1),
            capacity,
        };
        for c in colors.iter().rev() {
            history.push(*c);
        }
        history
    }

    /// Move `color` to the front, inserting it if new and dropping the oldest
    /// entry past capacity.
    pub fn push(&mut self, color: Color) {
        if let Some(pos) = self.colors.iter().position(|c| *c == color) {
            self.colors.remove(pos);
        }
        self.colors.push_front(color);
        self.colors.truncate(self.capacity);
    }

    pub fn colors(&self) -> impl Iterator<Item = &Color> {
        self.colors.iter()
    }

    pub fn most_recent(&self) -> Option<Color> {
        self.colors.front().copied()
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }
}
