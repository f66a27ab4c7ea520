use std::{collections::BTreeSet, sync::Arc};

use smol_str::SmolStr;
use tracing::{error, info, info_span, warn};
use walltext_core::{Pose, WallTextError};
use walltext_placement_manager::{run_import, scan_legacy_dir, ImportJob};
use walltext_placement_models::BackendKind;

use super::{console::menu_text, WallText};

/// Where the answers to an operator go.
pub trait Replier: Send + Sync {
    fn reply(&self, message: &str);
}

/// Whoever issued a command: a name to key edit sessions, the pose commands act at and the
/// permissions granted by the host.
#[derive(Clone)]
pub struct Operator {
    pub name: SmolStr,
    pub pose: Pose,
    pub permissions: BTreeSet<SmolStr>,
    replier: Arc<dyn Replier>,
}

impl std::fmt::Debug for Operator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Operator")
            .field("name", &self.name)
            .field("pose", &self.pose)
            .field("permissions", &self.permissions)
            .finish_non_exhaustive()
    }
}

impl Operator {
    pub fn new(name: &str, pose: Pose, replier: Arc<dyn Replier>) -> Self {
        Self {
            name: SmolStr::new(name),
            pose,
            permissions: BTreeSet::new(),
            replier,
        }
    }

    pub fn with_permission(mut self, permission: &str) -> Self {
        self.permissions.insert(SmolStr::new(permission));
        self
    }

    /// An empty requirement lets everyone through.
    pub fn has_permission(&self, permission: &str) -> bool {
        permission.is_empty() || self.permissions.contains(permission)
    }

    pub fn reply(&self, message: &str) {
        self.replier.reply(message);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// raw arguments, expected to hold a group number
    Add(String),
    Remove,
    Move,
    Import,
    Refresh,
    /// zero based item of the open edit menu
    Select(usize),
    Back,
}

impl Command {
    /// Menu navigation only works on a session opened by a permitted command.
    fn needs_permission(&self) -> bool {
        !matches!(self, Command::Select(_) | Command::Back)
    }
}

const NO_PERMISSION: &str = "You do not have permission to use this command.";
const NO_RENDERER: &str = "World text rendering service is not available.";

impl WallText {
    pub fn execute(&mut self, operator: &Operator, command: Command) {
        let _span = info_span!("command", operator = %operator.name, ?command).entered();
        if command.needs_permission() && !operator.has_permission(&self.config.command_permission)
        {
            operator.reply(NO_PERMISSION);
            return;
        }
        match command {
            Command::Add(args) => self.add_command(operator, &args),
            Command::Remove => self.remove_command(operator),
            Command::Move => self.move_command(operator),
            Command::Import => self.import_command(operator),
            Command::Refresh => self.refresh_command(operator),
            Command::Select(index) => self.select_command(operator, index),
            Command::Back => self.back_command(operator),
        }
    }

    fn add_command(&mut self, operator: &Operator, args: &str) {
        let Ok(group_number) = args.trim().parse::<i32>() else {
            operator.reply(&format!(
                "Usage: !{} <groupNumber>",
                self.config.commands.add
            ));
            return;
        };
        let replier = operator.clone();
        let added = self.sync.add_at(
            &self.tick,
            group_number,
            operator.pose,
            move |_: &mut WallText, saved| match saved {
                Ok(pose) => replier.reply(&format!(
                    "Added Group {group_number} at {}.",
                    pose.location_text()
                )),
                Err(e) => replier.reply(&format!(
                    "Group {group_number} is displayed but could not be saved: {e}"
                )),
            },
        );
        match added {
            Ok(handle) => info!(group_number, %handle, "placement spawned"),
            Err(WallTextError::UnknownGroup(group_number)) => operator.reply(&format!(
                "Group {group_number} was not found in the config. Please create it first."
            )),
            Err(WallTextError::RenderingServiceUnavailable) => operator.reply(NO_RENDERER),
            Err(e) => operator.reply(&e.to_string()),
        }
    }

    fn remove_command(&mut self, operator: &Operator) {
        let replier = operator.clone();
        let removed = self.sync.remove_nearest(
            &self.tick,
            operator.pose.position,
            self.config.remove_distance,
            move |_: &mut WallText, nearest, result| match result {
                Ok(true) => replier.reply(&format!(
                    "Removed one placement from Group {}.",
                    nearest.group_number
                )),
                Ok(false) => {
                    warn!(?nearest, "no stored record matched the removed text");
                    replier.reply(&format!(
                        "Removed the text of Group {}, no stored placement matched it.",
                        nearest.group_number
                    ))
                }
                Err(e) => replier.reply(&format!(
                    "The text is gone until the next refresh but could not be deleted from storage: {e}"
                )),
            },
        );
        match removed {
            Ok(nearest) => info!(group_number = nearest.group_number, distance = nearest.distance, "removing placement"),
            Err(WallTextError::RenderingServiceUnavailable) => operator.reply(NO_RENDERER),
            Err(e) => operator.reply(&e.to_string()),
        }
    }

    fn move_command(&mut self, operator: &Operator) {
        let replier = operator.clone();
        let opened = self.edit.open(
            &self.sync,
            &self.tick,
            &operator.name,
            move |_: &mut WallText, menu| match menu {
                Ok(menu) => replier.reply(&menu_text(&menu)),
                Err(e) => replier.reply(&e.to_string()),
            },
        );
        match opened {
            Ok(()) => {}
            Err(WallTextError::UnsupportedByBackend { .. }) => {
                operator.reply("This command is only available when the database is enabled.")
            }
            Err(e) => operator.reply(&e.to_string()),
        }
    }

    fn select_command(&mut self, operator: &Operator, index: usize) {
        match self
            .edit
            .select(&self.sync, &self.tick, &operator.name, index)
        {
            Ok(menu) => operator.reply(&menu_text(&menu)),
            Err(e) => operator.reply(&e.to_string()),
        }
    }

    fn back_command(&mut self, operator: &Operator) {
        match self.edit.back(&operator.name) {
            Some(menu) => operator.reply(&menu_text(&menu)),
            None => operator.reply("Menu closed."),
        }
    }

    /// Scans the json files on the worker pool, then writes every valid entry into the database,
    /// a few per tick.
    fn import_command(&mut self, operator: &Operator) {
        let repository = self.sync.repository();
        if !self.config.enable_database || repository.kind() != BackendKind::Relational {
            operator.reply("Enable the database before importing the json files.");
            return;
        }
        let maps_dir = self.maps_path();
        operator.reply(&format!("Scanning {} folder", maps_dir.display()));
        let inserts_per_tick = self.config.import.inserts_per_tick;
        let replier = operator.clone();
        self.tick.background(
            move || scan_legacy_dir(&maps_dir),
            move |walltext: &mut WallText, scan| {
                let scan = match scan {
                    Ok(scan) => scan,
                    Err(e) => {
                        error!(?e, "legacy scan failed");
                        replier.reply(&e.to_string());
                        return;
                    }
                };
                replier.reply(&format!(
                    "Queued {} placements from {} files",
                    scan.entries.len(),
                    scan.files_scanned
                ));
                if scan.files_skipped > 0 || scan.entries_skipped > 0 {
                    replier.reply(&format!(
                        "Skipped {} unreadable files and {} malformed entries, see the logs",
                        scan.files_skipped, scan.entries_skipped
                    ));
                }
                if scan.entries.is_empty() {
                    replier.reply("Nothing to import");
                    return;
                }
                let job = ImportJob::new(scan.entries, inserts_per_tick);
                run_import(
                    walltext.tick_handle(),
                    repository,
                    job,
                    move |walltext: &mut WallText, job| {
                        info!(
                            inserted = job.inserted(),
                            failed = job.failed(),
                            "import finished"
                        );
                        walltext.refresh_current_map();
                        replier.reply(&format!(
                            "Database import completed! {} placements imported!",
                            job.inserted()
                        ));
                        if job.failed() > 0 {
                            replier.reply(&format!(
                                "{} placements could not be written, see the logs",
                                job.failed()
                            ));
                        }
                    },
                );
            },
        );
    }

    fn refresh_command(&mut self, operator: &Operator) {
        if let Err(e) = self.reload_config() {
            error!(?e, "failed to reload configuration");
            operator.reply(&format!(
                "Configuration could not be reloaded, keeping the previous one: {e}"
            ));
            return;
        }
        self.refresh_current_map();
        operator.reply("Configuration reloaded.");
    }
}
