use serde::{Deserialize, Serialize};

use crate::color::Color;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Justify {
    Left,
    #[default]
    Center,
    Right,
}

impl Justify {
    /// `left`, `right`, `center`, `centre` or `middle`, any case, surrounding blanks ignored.
    pub fn parse(alignment: &str) -> Option<Self> {
        match alignment.trim().to_ascii_lowercase().as_str() {
            "left" => Some(Justify::Left),
            "right" => Some(Justify::Right),
            "center" | "centre" | "middle" => Some(Justify::Center),
            _ => None,
        }
    }
}

/// Backdrop drawn behind a block of text. Only ever set on the first line of a block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Background {
    pub single_block: bool,
    pub hide_text: bool,
    pub full_bright: bool,
    pub color: Color,
    pub depth_offset: f32,
    pub border_height: f32,
    pub border_width: f32,
}

/// One line handed to the rendering service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextLine {
    pub text: String,
    pub color: Color,
    pub font_size: u32,
    pub full_bright: bool,
    pub scale: f32,
    pub justify: Justify,
    pub background: Option<Background>,
}
