use crossterm::style::Color;
use supports_color::Stream;

/// Detect if the terminal supports ANSI colors
pub fn supports_colors() -> bool {
    supports_color::on(Stream::Stdout).is_some()
}

/// Detect the level of color support
pub fn color_level() -> ColorLevel {
    match supports_color::on(Stream::Stdout) {
        Some(level) => match level.has_16m {
            true => ColorLevel::TrueColor,
            false => match level.has_256 {
                true => ColorLevel::Color256,
                false => ColorLevel::Color16,
            },
        },
        None => ColorLevel::None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorLevel {
    /// No color support
    None,
    /// 16 basic colors
    Color16,
    /// 256 ANSI colors
    Color256,
    /// True color (24-bit RGB)
    TrueColor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColorPair {
    pub foreground: Color,
    pub background: Color,
}

impl ColorPair {
    pub const fn new(foreground: Color, background: Color) -> Self {
        Self {
            foreground,
            background,
        }
    }
}

/// Every color a window paints with, split by whether it is on the focus chain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColorSet {
    pub normal: ColorPair,
    pub focused: ColorPair,
    pub border: ColorPair,
    pub focused_border: ColorPair,
    pub caption: ColorPair,
    pub focused_caption: ColorPair,
    pub scroll_track: ColorPair,
    pub scroll_thumb: ColorPair,
}

impl ColorSet {
    pub fn for_level(level: ColorLevel) -> Self {
        match level {
            // No color support: everything falls back to the terminal defaults
            ColorLevel::None => {
                let plain = ColorPair::new(Color::Reset, Color::Reset);
                Self {
                    normal: plain,
                    focused: plain,
                    border: plain,
                    focused_border: plain,
                    caption: plain,
                    focused_caption: plain,
                    scroll_track: plain,
                    scroll_thumb: plain,
                }
            }
            ColorLevel::Color16 => Self {
                normal: ColorPair::new(Color::Grey, Color::Black),
                focused: ColorPair::new(Color::White, Color::DarkBlue),
                border: ColorPair::new(Color::DarkGrey, Color::Black),
                focused_border: ColorPair::new(Color::Yellow, Color::Black),
                caption: ColorPair::new(Color::Grey, Color::Black),
                focused_caption: ColorPair::new(Color::Black, Color::Yellow),
                scroll_track: ColorPair::new(Color::DarkGrey, Color::Black),
                scroll_thumb: ColorPair::new(Color::Grey, Color::Black),
            },
            ColorLevel::Color256 | ColorLevel::TrueColor => Self {
                normal: ColorPair::new(Color::AnsiValue(252), Color::AnsiValue(235)),
                focused: ColorPair::new(Color::AnsiValue(231), Color::AnsiValue(24)),
                border: ColorPair::new(Color::AnsiValue(243), Color::AnsiValue(235)),
                focused_border: ColorPair::new(Color::AnsiValue(214), Color::AnsiValue(235)),
                caption: ColorPair::new(Color::AnsiValue(250), Color::AnsiValue(237)),
                focused_caption: ColorPair::new(Color::AnsiValue(16), Color::AnsiValue(214)),
                scroll_track: ColorPair::new(Color::AnsiValue(239), Color::AnsiValue(235)),
                scroll_thumb: ColorPair::new(Color::AnsiValue(248), Color::AnsiValue(235)),
            },
        }
    }

    /// Content colors, picked by focus
    pub fn content(&self, has_focus: bool) -> ColorPair {
        if has_focus { self.focused } else { self.normal }
    }

    pub fn frame(&self, has_focus: bool) -> ColorPair {
        if has_focus {
            self.focused_border
        } else {
            self.border
        }
    }

    pub fn title(&self, has_focus: bool) -> ColorPair {
        if has_focus {
            self.focused_caption
        } else {
            self.caption
        }
    }
}

impl Default for ColorSet {
    fn default() -> Self {
        Self::for_level(ColorLevel::Color16)
    }
}
