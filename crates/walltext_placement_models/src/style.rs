use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Content and style of one group of text, read only at runtime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GroupStyle {
    /// Each line may start with a `{ColorName}` tag.
    pub lines: Vec<String>,
    /// left, right or center. Anything else is rendered centered.
    pub text_alignment: String,
    pub font_size: u32,
    pub text_scale: f32,
    pub background_enabled: bool,
    pub background_width: f32,
    pub background_single_block: bool,
    /// Height added to the operator pose when a placement is added.
    pub z_offset: f32,
}

impl Default for GroupStyle {
    fn default() -> Self {
        Self {
            lines: Vec::new(),
            text_alignment: "left".to_owned(),
            font_size: 24,
            text_scale: 0.45,
            background_enabled: false,
            background_width: 0.5,
            background_single_block: true,
            z_offset: 0.0,
        }
    }
}

/// Group number to style. Keys are strings in the configuration file (`[groups.1]`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(
    try_from = "BTreeMap<String, GroupStyle>",
    into = "BTreeMap<String, GroupStyle>"
)]
pub struct GroupStyles(BTreeMap<i32, GroupStyle>);

impl GroupStyles {
    pub fn new(groups: BTreeMap<i32, GroupStyle>) -> Self {
        Self(groups)
    }
    pub fn get(&self, group_number: i32) -> Option<&GroupStyle> {
        self.0.get(&group_number)
    }
    pub fn len(&self) -> usize {
        self.0.len()
    }
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl TryFrom<BTreeMap<String, GroupStyle>> for GroupStyles {
    type Error = String;

    fn try_from(value: BTreeMap<String, GroupStyle>) -> Result<Self, Self::Error> {
        let mut groups = BTreeMap::new();
        for (key, style) in value {
            let group_number: i32 = key
                .trim()
                .parse()
                .map_err(|_| format!("group key {key:?} is not a number"))?;
            groups.insert(group_number, style);
        }
        Ok(Self(groups))
    }
}

impl From<GroupStyles> for BTreeMap<String, GroupStyle> {
    fn from(value: GroupStyles) -> Self {
        value
            .0
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect()
    }
}
