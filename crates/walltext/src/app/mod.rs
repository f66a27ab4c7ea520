use std::{
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use miette::{Context, Result};
use smol_str::SmolStr;
use tracing::{error, info, info_span, warn};
use walltext_core::task::{TickHandle, TickScheduler};
use walltext_edit_manager::EditManager;
use walltext_placement_manager::{JsonPlacementStore, SqlPlacementStore, MAPS_DIRECTORY_NAME};
use walltext_placement_models::PlacementStore;
use walltext_render_manager::PlacementSync;
use walltext_render_models::{MemoryWorld, WorldTextService};

pub mod commands;
pub mod config;
pub mod console;
mod init;
mod trace;

use config::WallTextConfig;
use init::get_walltext_path;
use trace::WallTextTracing;

/// Everything the tick thread owns. Background continuations get a `&mut WallText`.
#[must_use]
pub struct WallText {
    config: WallTextConfig,
    data_path: PathBuf,
    sync: PlacementSync,
    edit: EditManager,
    tick: TickHandle<WallText>,
}

impl AsMut<PlacementSync> for WallText {
    fn as_mut(&mut self) -> &mut PlacementSync {
        &mut self.sync
    }
}

impl AsMut<EditManager> for WallText {
    fn as_mut(&mut self) -> &mut EditManager {
        &mut self.edit
    }
}

impl WallText {
    fn new(
        data_path: &Path,
        config: WallTextConfig,
        renderer: Option<Box<dyn WorldTextService>>,
        tick: TickHandle<WallText>,
    ) -> Self {
        let json: Arc<dyn PlacementStore> = Arc::new(JsonPlacementStore::new(
            data_path.join(MAPS_DIRECTORY_NAME),
        ));
        let sync = PlacementSync::new(renderer, json, Arc::new(config.groups.clone()));
        let mut walltext = Self {
            edit: EditManager::new(config.edit.step),
            config,
            data_path: data_path.to_path_buf(),
            sync,
            tick,
        };
        walltext.select_backend();
        walltext
    }

    pub fn config(&self) -> &WallTextConfig {
        &self.config
    }
    pub fn data_path(&self) -> &Path {
        &self.data_path
    }
    pub fn maps_path(&self) -> PathBuf {
        self.data_path.join(MAPS_DIRECTORY_NAME)
    }
    pub fn sync(&self) -> &PlacementSync {
        &self.sync
    }
    pub fn edit(&self) -> &EditManager {
        &self.edit
    }
    pub fn tick_handle(&self) -> TickHandle<WallText> {
        self.tick.clone()
    }

    /// Json files when the database is disabled or unusable, sqlite otherwise.
    /// The schema is checked on the worker pool, a failure switches back to the json files.
    fn select_backend(&mut self) {
        let json: Arc<dyn PlacementStore> = Arc::new(JsonPlacementStore::new(self.maps_path()));
        if !self.config.enable_database {
            info!("using json files for placements");
            self.sync.set_repository(json);
            return;
        }
        let sql = match SqlPlacementStore::new(
            self.config.database_path(&self.data_path),
            &self.config.database.table_name,
        ) {
            Ok(sql) => Arc::new(sql),
            Err(e) => {
                error!(?e, "invalid database settings, falling back to json files");
                self.sync.set_repository(json);
                return;
            }
        };
        self.sync.set_repository(sql.clone());
        self.tick.background(
            move || sql.ensure_schema(),
            move |walltext: &mut WallText, result| {
                match result {
                    Ok(()) => info!("database ready"),
                    Err(e) => {
                        error!(
                            ?e,
                            "Error loading wall text from the database, falling back to json files"
                        );
                        walltext.sync.set_repository(json);
                    }
                }
                walltext.refresh_current_map();
            },
        );
    }

    fn refresh_current_map(&mut self) {
        if let Some(map) = self.sync.current_map().map(SmolStr::new) {
            self.sync.refresh(&self.tick, &map);
        }
    }

    /// A new map is loaded: previous sessions are closed and its placements spawned.
    pub fn on_map_start(&mut self, map_name: &str) {
        info!(map_name, "map start");
        self.edit.close_all();
        self.sync.refresh(&self.tick, map_name);
    }

    pub fn on_map_end(&mut self) {
        info!(map_name = ?self.sync.current_map(), "map end");
        self.edit.close_all();
        self.sync.despawn_all();
        self.sync.set_current_map(None);
    }

    /// The host may have reset entity styles, apply ours again.
    pub fn on_round_start(&mut self) {
        self.sync.restyle();
    }

    pub fn unload(&mut self) {
        self.edit.close_all();
        self.sync.despawn_all();
    }

    /// Re-reads `walltext.toml`. The previous configuration stays when the new one is invalid.
    pub fn reload_config(&mut self) -> Result<()> {
        let config = WallTextConfig::load_or_create(&self.data_path)?;
        let backend_changed = config.enable_database != self.config.enable_database
            || config.database != self.config.database;
        self.sync.set_styles(Arc::new(config.groups.clone()));
        self.edit.set_step(config.edit.step);
        self.config = config;
        if backend_changed {
            self.edit.close_all();
            self.select_backend();
        }
        Ok(())
    }
}

/// The tick side of the application: the context and the scheduler that feeds it.
pub struct WallTextHost {
    scheduler: TickScheduler<WallText>,
    walltext: WallText,
}

impl WallTextHost {
    pub fn new(data_path: &Path, renderer: Option<Box<dyn WorldTextService>>) -> Result<Self> {
        let config = WallTextConfig::load_or_create(data_path)
            .wrap_err("failed to load walltext configuration")?;
        let scheduler = TickScheduler::new();
        let walltext = WallText::new(data_path, config, renderer, scheduler.handle());
        Ok(Self {
            scheduler,
            walltext,
        })
    }

    pub fn walltext(&mut self) -> &mut WallText {
        &mut self.walltext
    }

    /// Runs the continuations that came back from the worker pool.
    pub fn tick(&mut self) -> usize {
        self.scheduler.tick(&mut self.walltext)
    }

    pub fn run_until_idle(&mut self, timeout: Duration) -> bool {
        self.scheduler.run_until_idle(&mut self.walltext, timeout)
    }
}

pub fn start_walltext() {
    let walltext_path = match get_walltext_path() {
        Ok(path) => path,
        Err(e) => {
            eprintln!("failed to create walltext dir: {e:?}");
            return;
        }
    };

    let log_file_flush_guard = match WallTextTracing::install_tracing(&walltext_path) {
        Ok(g) => g,
        Err(e) => {
            eprintln!("failed to install tracing: {e:?}");
            return;
        }
    };

    if let Err(e) = rayon::ThreadPoolBuilder::default()
        .panic_handler(|panic_info| {
            error!(?panic_info, "rayon thread paniced.");
        })
        .build_global()
    {
        error!(
            ?e,
            "failed to set panic handler and build global threadpool for rayon"
        );
    }

    let _span = info_span!("walltext", path = ?walltext_path).entered();
    match WallTextHost::new(&walltext_path, Some(Box::new(MemoryWorld::new()))) {
        Ok(mut host) => {
            let stdin = std::io::BufReader::new(std::io::stdin());
            if let Err(e) = console::run_console(&mut host, stdin) {
                error!(?e, "console stopped");
            }
            host.walltext().unload();
        }
        Err(e) => {
            error!(?e, "failed to create WallText App");
            warn!("nothing to run, exiting");
        }
    };
    std::mem::drop(log_file_flush_guard);
}
