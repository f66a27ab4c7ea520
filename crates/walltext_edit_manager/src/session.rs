use glam::Vec3;
use walltext_core::{pose::format_component, Pose, Result, WallTextError};
use walltext_placement_models::{PlacementId, PlacementRecord};

const ROOT_TITLE: &str = "Wall-Text Placements";
const EDIT_ITEMS: [&str; 2] = ["Change Location", "Change Angle"];

/// One stored placement as the session knows it. The pose is updated optimistically.
#[derive(Debug, Clone, PartialEq)]
pub struct EditSlot {
    pub id: PlacementId,
    pub group_number: i32,
    pub pose: Pose,
}

fn whole(value: f32) -> String {
    let rounded = value.round();
    if rounded == 0.0 {
        "0".to_owned()
    } else {
        format!("{rounded:.0}")
    }
}

impl EditSlot {
    pub fn label(&self) -> String {
        let p = self.pose.position;
        format!(
            "Group {} ({}, {}, {})",
            self.group_number,
            whole(p.x),
            whole(p.y),
            whole(p.z)
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdjustKind {
    Move,
    Rotate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Root,
    Edit { slot: usize },
    Adjust { slot: usize, kind: AdjustKind },
}

/// What an operator sees: a title, a list of items and the highlighted one.
#[derive(Debug, Clone, PartialEq)]
pub struct Menu {
    pub title: String,
    pub items: Vec<String>,
    pub selected: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EditAction {
    /// Another screen is displayed, nothing to persist.
    Navigated,
    /// A placement got a new pose, to be saved and displayed.
    Adjusted {
        id: PlacementId,
        group_number: i32,
        pose: Pose,
    },
}

struct Delta {
    label: String,
    position: Vec3,
    orientation: Vec3,
}

fn deltas(kind: AdjustKind, step: f32) -> Vec<Delta> {
    let s = format_component(step);
    let moved = |label: String, position: Vec3| Delta {
        label,
        position,
        orientation: Vec3::ZERO,
    };
    let rotated = |label: String, orientation: Vec3| Delta {
        label,
        position: Vec3::ZERO,
        orientation,
    };
    match kind {
        AdjustKind::Move => vec![
            moved(format!("(Y - {s})"), Vec3::new(0.0, -step, 0.0)),
            moved(format!("(Y + {s})"), Vec3::new(0.0, step, 0.0)),
            moved(format!("(X + {s})"), Vec3::new(step, 0.0, 0.0)),
            moved(format!("(X - {s})"), Vec3::new(-step, 0.0, 0.0)),
            moved(format!("Move Up (Z + {s})"), Vec3::new(0.0, 0.0, step)),
            moved(format!("Move Down (Z - {s})"), Vec3::new(0.0, 0.0, -step)),
        ],
        AdjustKind::Rotate => vec![
            rotated(format!("Pitch +{s}"), Vec3::new(step, 0.0, 0.0)),
            rotated(format!("Pitch -{s}"), Vec3::new(-step, 0.0, 0.0)),
            rotated(format!("Yaw +{s}"), Vec3::new(0.0, step, 0.0)),
            rotated(format!("Yaw -{s}"), Vec3::new(0.0, -step, 0.0)),
            rotated(format!("Roll +{s}"), Vec3::new(0.0, 0.0, step)),
            rotated(format!("Roll -{s}"), Vec3::new(0.0, 0.0, -step)),
        ],
    }
}

/// Root (every placement of the map) -> Edit (location or angle) -> Adjust (one delta per item).
#[derive(Debug, Clone)]
pub struct EditSession {
    slots: Vec<EditSlot>,
    stack: Vec<Screen>,
    selected: usize,
    step: f32,
}

impl EditSession {
    pub fn new(mut records: Vec<PlacementRecord>, step: f32) -> Result<Self> {
        if records.is_empty() {
            return Err(WallTextError::NotFound(
                "No Wall-Text placements found for this map.".to_owned(),
            ));
        }
        PlacementRecord::sort_for_listing(&mut records);
        let slots = records
            .into_iter()
            .map(|record| EditSlot {
                id: record.id,
                group_number: record.group_number,
                pose: record.pose,
            })
            .collect();
        Ok(Self {
            slots,
            stack: vec![Screen::Root],
            selected: 0,
            step,
        })
    }

    pub fn screen(&self) -> Screen {
        self.stack.last().copied().unwrap_or(Screen::Root)
    }

    pub fn slots(&self) -> &[EditSlot] {
        &self.slots
    }

    pub fn menu(&self) -> Menu {
        let (title, items) = match self.screen() {
            Screen::Root => (
                ROOT_TITLE.to_owned(),
                self.slots.iter().map(EditSlot::label).collect(),
            ),
            Screen::Edit { slot } => {
                let slot = &self.slots[slot];
                (
                    format!("Edit Group {} • Id {}", slot.group_number, slot.id),
                    EDIT_ITEMS.iter().map(|item| item.to_string()).collect(),
                )
            }
            Screen::Adjust { slot, kind } => {
                let slot = &self.slots[slot];
                let verb = match kind {
                    AdjustKind::Move => "Move",
                    AdjustKind::Rotate => "Rotate",
                };
                (
                    format!("{verb} Group {} • Id {}", slot.group_number, slot.id),
                    deltas(kind, self.step).into_iter().map(|d| d.label).collect(),
                )
            }
        };
        Menu {
            title,
            items,
            selected: self.selected,
        }
    }

    fn item_count(&self) -> usize {
        match self.screen() {
            Screen::Root => self.slots.len(),
            Screen::Edit { .. } => EDIT_ITEMS.len(),
            Screen::Adjust { .. } => 6,
        }
    }

    pub fn select(&mut self, index: usize) -> Result<EditAction> {
        if index >= self.item_count() {
            return Err(WallTextError::NotFound(format!(
                "There is no item {index} in this menu."
            )));
        }
        match self.screen() {
            Screen::Root => {
                self.stack.push(Screen::Edit { slot: index });
                self.selected = 0;
                Ok(EditAction::Navigated)
            }
            Screen::Edit { slot } => {
                let kind = if index == 0 {
                    AdjustKind::Move
                } else {
                    AdjustKind::Rotate
                };
                self.stack.push(Screen::Adjust { slot, kind });
                self.selected = 0;
                Ok(EditAction::Navigated)
            }
            Screen::Adjust { slot, kind } => {
                let deltas = deltas(kind, self.step);
                let delta = &deltas[index];
                let slot = &mut self.slots[slot];
                slot.pose = slot.pose.offset(delta.position, delta.orientation);
                self.selected = index;
                Ok(EditAction::Adjusted {
                    id: slot.id,
                    group_number: slot.group_number,
                    pose: slot.pose,
                })
            }
        }
    }

    /// Goes one screen up. Returns false when already at the root, the session is then over.
    pub fn back(&mut self) -> bool {
        if self.stack.len() <= 1 {
            return false;
        }
        let left = self.stack.pop();
        // highlight the item we came from
        self.selected = match (left, self.screen()) {
            (Some(Screen::Edit { slot }), Screen::Root) => slot,
            (Some(Screen::Adjust { kind, .. }), Screen::Edit { .. }) => match kind {
                AdjustKind::Move => 0,
                AdjustKind::Rotate => 1,
            },
            _ => 0,
        };
        true
    }
}
