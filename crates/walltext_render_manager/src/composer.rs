use tracing::warn;
use walltext_placement_models::GroupStyle;
use walltext_render_models::{Background, Color, Justify, TextLine};

/// Two non-breaking spaces, added on the aligned side so the text does not touch the backdrop edge.
pub const BACKGROUND_PADDING: &str = "\u{00A0}\u{00A0}";

const BACKGROUND_DEPTH_OFFSET: f32 = -0.5;

/// Splits a leading `{Name}` tag off a raw line.
///
/// The tag is stripped whether the name is known or not; unknown names give white.
/// Untagged lines are returned untouched and white.
pub fn split_color_tag(raw: &str) -> (Color, &str) {
    let Some(rest) = raw.strip_prefix('{') else {
        return (Color::WHITE, raw);
    };
    let Some(end) = rest.find('}') else {
        return (Color::WHITE, raw);
    };
    let name = &rest[..end];
    if name.is_empty() || !name.chars().all(|c| c.is_alphanumeric() || c == '_') {
        return (Color::WHITE, raw);
    }
    let color = Color::from_name(name).unwrap_or(Color::WHITE);
    (color, rest[end + 1..].trim())
}

/// Lines of one group, ready for the rendering service. Same input, same output.
pub fn compose_lines(group_number: i32, style: &GroupStyle) -> Vec<TextLine> {
    let justify = Justify::parse(&style.text_alignment).unwrap_or_else(|| {
        warn!(
            group_number,
            alignment = %style.text_alignment,
            "Unknown text alignment, defaulting to center"
        );
        Justify::Center
    });

    let mut lines: Vec<TextLine> = style
        .lines
        .iter()
        .filter(|raw| !raw.trim().is_empty())
        .map(|raw| {
            let (color, text) = split_color_tag(raw);
            let text = match (style.background_enabled, justify) {
                (true, Justify::Left) => format!("{BACKGROUND_PADDING}{text}"),
                (true, Justify::Right) => format!("{text}{BACKGROUND_PADDING}"),
                _ => text.to_owned(),
            };
            TextLine {
                text,
                color,
                font_size: style.font_size,
                full_bright: true,
                scale: style.text_scale,
                justify,
                background: None,
            }
        })
        .collect();

    if style.background_enabled {
        if let Some(first) = lines.first_mut() {
            first.background = Some(Background {
                single_block: style.background_single_block,
                hide_text: true,
                full_bright: true,
                color: Color::BLACK,
                depth_offset: BACKGROUND_DEPTH_OFFSET,
                border_height: 0.0,
                border_width: style.background_width,
            });
        }
    }
    lines
}
