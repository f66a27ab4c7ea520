use std::collections::BTreeMap;

use smol_str::SmolStr;
use tracing::{debug, error};
use walltext_core::{task::TickHandle, Result, WallTextError};
use walltext_placement_models::BackendKind;
use walltext_render_manager::PlacementSync;

use crate::session::{EditAction, EditSession, Menu};

/// Open edit sessions, keyed by operator.
///
/// A delta is applied to the session right away and saved on the worker pool. Whatever the save
/// gives, the map is refreshed afterwards so the world shows what storage holds.
#[must_use]
pub struct EditManager {
    sessions: BTreeMap<SmolStr, EditSession>,
    step: f32,
}

impl Default for EditManager {
    fn default() -> Self {
        Self::new(crate::DEFAULT_STEP)
    }
}

impl EditManager {
    pub fn new(step: f32) -> Self {
        Self {
            sessions: BTreeMap::new(),
            step,
        }
    }

    pub fn set_step(&mut self, step: f32) {
        self.step = step;
    }

    pub fn session(&self, operator: &str) -> Option<&EditSession> {
        self.sessions.get(operator)
    }

    pub fn menu(&self, operator: &str) -> Option<Menu> {
        self.sessions.get(operator).map(EditSession::menu)
    }

    /// Stored ids are only meaningful for the map they were read on.
    pub fn close_all(&mut self) {
        self.sessions.clear();
    }

    /// Reads the placements of the current map and opens a session for `operator` on a later tick.
    /// `then` gets the root menu.
    pub fn open<C, F>(
        &self,
        sync: &PlacementSync,
        tick: &TickHandle<C>,
        operator: &str,
        then: F,
    ) -> Result<()>
    where
        C: AsMut<EditManager> + 'static,
        F: FnOnce(&mut C, Result<Menu>) + Send + 'static,
    {
        let repository = sync.repository();
        if repository.kind() != BackendKind::Relational {
            return Err(WallTextError::UnsupportedByBackend {
                backend: repository.kind().name(),
                operation: "move",
            });
        }
        let map = sync
            .current_map()
            .map(SmolStr::new)
            .ok_or_else(|| WallTextError::NotFound("Current map is unknown.".to_owned()))?;
        let operator = SmolStr::new(operator);
        let step = self.step;
        tick.background(
            move || repository.list_for_map(&map),
            move |ctx: &mut C, result| {
                let opened = result
                    .map_err(|e| {
                        error!(?e, "Failed to load placements for the edit menu");
                        e
                    })
                    .and_then(|records| EditSession::new(records, step));
                let menu = opened.map(|session| {
                    let menu = session.menu();
                    let manager: &mut EditManager = ctx.as_mut();
                    manager.sessions.insert(operator, session);
                    menu
                });
                then(ctx, menu)
            },
        );
        Ok(())
    }

    /// Selects an item of the current screen of `operator` and returns the menu to display next.
    pub fn select<C>(
        &mut self,
        sync: &PlacementSync,
        tick: &TickHandle<C>,
        operator: &str,
        index: usize,
    ) -> Result<Menu>
    where
        C: AsMut<PlacementSync> + 'static,
    {
        let session = self.sessions.get_mut(operator).ok_or_else(|| {
            WallTextError::NotFound("There is no open edit menu.".to_owned())
        })?;
        if let EditAction::Adjusted {
            id,
            group_number,
            pose,
        } = session.select(index)?
        {
            debug!(%id, group_number, location = %pose.location_text(), "placement adjusted");
            let repository = sync.repository();
            let map = sync.current_map().map(SmolStr::new);
            let refresh_tick = tick.clone();
            tick.background(
                move || repository.update(id, &pose),
                move |ctx: &mut C, result| {
                    if let Err(e) = result {
                        error!(?e, %id, "Failed to update placement");
                    }
                    // the world may have moved on while the update ran
                    let sync: &mut PlacementSync = ctx.as_mut();
                    match map {
                        Some(map) if sync.current_map() == Some(map.as_str()) => {
                            sync.refresh(&refresh_tick, &map)
                        }
                        _ => debug!(%id, "map changed since the adjustment, no refresh"),
                    }
                },
            );
        }
        Ok(session.menu())
    }

    /// One screen up. `None` once the operator left the root screen, the session is then closed.
    pub fn back(&mut self, operator: &str) -> Option<Menu> {
        let session = self.sessions.get_mut(operator)?;
        if session.back() {
            Some(session.menu())
        } else {
            self.sessions.remove(operator);
            None
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use glam::Vec3;
    use std::{sync::Arc, time::Duration};
    use walltext_core::{task::TickScheduler, Pose};
    use walltext_placement_manager::{JsonPlacementStore, SqlPlacementStore};
    use walltext_placement_models::{
        GroupStyle, GroupStyles, PlacementId, PlacementRecord, PlacementStore,
    };
    use walltext_render_models::MemoryWorld;

    struct Ctx {
        sync: PlacementSync,
        edit: EditManager,
        menus: Vec<Result<Menu>>,
    }

    impl AsMut<PlacementSync> for Ctx {
        fn as_mut(&mut self) -> &mut PlacementSync {
            &mut self.sync
        }
    }
    impl AsMut<EditManager> for Ctx {
        fn as_mut(&mut self) -> &mut EditManager {
            &mut self.edit
        }
    }

    /// Reads work, every update fails.
    struct ReadOnlyStore(SqlPlacementStore);

    impl PlacementStore for ReadOnlyStore {
        fn kind(&self) -> BackendKind {
            self.0.kind()
        }
        fn ensure_schema(&self) -> Result<()> {
            self.0.ensure_schema()
        }
        fn insert(&self, map_name: &str, group_number: i32, pose: &Pose) -> Result<()> {
            self.0.insert(map_name, group_number, pose)
        }
        fn remove(&self, map_name: &str, group_number: i32, pose: &Pose) -> Result<bool> {
            self.0.remove(map_name, group_number, pose)
        }
        fn list_for_map(&self, map_name: &str) -> Result<Vec<PlacementRecord>> {
            self.0.list_for_map(map_name)
        }
        fn update(&self, _id: PlacementId, _pose: &Pose) -> Result<()> {
            Err(WallTextError::PersistenceUnavailable {
                reason: "read only".to_owned(),
            })
        }
    }

    fn context(repository: Arc<dyn PlacementStore>) -> Ctx {
        let mut groups = std::collections::BTreeMap::new();
        groups.insert(
            1,
            GroupStyle {
                lines: vec!["Hello".to_owned()],
                ..Default::default()
            },
        );
        let mut sync = PlacementSync::new(
            Some(Box::new(MemoryWorld::new())),
            repository,
            Arc::new(GroupStyles::new(groups)),
        );
        sync.set_current_map(Some("m"));
        Ctx {
            sync,
            edit: EditManager::default(),
            menus: Vec::new(),
        }
    }

    fn sql_store(dir: &tempfile::TempDir) -> SqlPlacementStore {
        let store = SqlPlacementStore::new(dir.path().join("walltext.db"), "wall_text").unwrap();
        store.ensure_schema().unwrap();
        store
            .insert("m", 1, &Pose::new(Vec3::new(10.0, 20.0, 30.0), Vec3::ZERO))
            .unwrap();
        store
    }

    fn open(scheduler: &mut TickScheduler<Ctx>, ctx: &mut Ctx) {
        let tick = scheduler.handle();
        ctx.edit
            .open(&ctx.sync, &tick, "admin", |ctx: &mut Ctx, menu| {
                ctx.menus.push(menu)
            })
            .unwrap();
        assert!(scheduler.run_until_idle(ctx, Duration::from_secs(10)));
    }

    #[test]
    fn test_json_backend_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(Arc::new(JsonPlacementStore::new(dir.path())));
        let scheduler = TickScheduler::<Ctx>::new();
        let err = ctx
            .edit
            .open(&ctx.sync, &scheduler.handle(), "admin", |_: &mut Ctx, _| {})
            .unwrap_err();
        assert!(matches!(err, WallTextError::UnsupportedByBackend { .. }));
    }

    #[test]
    fn test_deltas_accumulate_even_when_updates_fail() {
        let dir = tempfile::tempdir().unwrap();
        let mut ctx = context(Arc::new(ReadOnlyStore(sql_store(&dir))));
        let mut scheduler = TickScheduler::<Ctx>::new();
        open(&mut scheduler, &mut ctx);
        assert_eq!(ctx.menus.len(), 1);
        assert!(ctx.menus[0].is_ok());

        let tick = scheduler.handle();
        let Ctx { sync, edit, .. } = &mut ctx;
        edit.select(sync, &tick, "admin", 0).unwrap();
        edit.select(sync, &tick, "admin", 0).unwrap();
        let mut menu = None;
        for _ in 0..5 {
            // Move Up (Z + 5)
            menu = Some(edit.select(sync, &tick, "admin", 4).unwrap());
        }
        assert_eq!(menu.unwrap().selected, 4);
        let slot = &edit.session("admin").unwrap().slots()[0];
        assert_eq!(slot.pose.position, Vec3::new(10.0, 20.0, 55.0));

        assert!(scheduler.run_until_idle(&mut ctx, Duration::from_secs(10)));
        // storage kept the old pose and the refresh shows it
        assert_eq!(ctx.sync.live_count(), 1);
        let stored = ctx.sync.repository().list_for_map("m").unwrap();
        assert_eq!(stored[0].pose.position.z, 30.0);
    }

    #[test]
    fn test_delta_is_saved_then_refreshed() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(sql_store(&dir));
        let mut ctx = context(store.clone());
        let mut scheduler = TickScheduler::<Ctx>::new();
        open(&mut scheduler, &mut ctx);

        let tick = scheduler.handle();
        let Ctx { sync, edit, .. } = &mut ctx;
        edit.select(sync, &tick, "admin", 0).unwrap();
        edit.select(sync, &tick, "admin", 1).unwrap();
        // Yaw +5
        let menu = edit.select(sync, &tick, "admin", 2).unwrap();
        assert_eq!(menu.title, format!("Rotate Group 1 • Id {}", store.list_for_map("m").unwrap()[0].id));

        assert!(scheduler.run_until_idle(&mut ctx, Duration::from_secs(10)));
        let stored = store.list_for_map("m").unwrap();
        assert_eq!(stored[0].pose.orientation, Vec3::new(0.0, 5.0, 0.0));
        assert_eq!(ctx.sync.live_count(), 1);
        let nearest = ctx.sync.find_nearest(Vec3::new(10.0, 20.0, 30.0), 1.0).unwrap();
        assert_eq!(nearest.pose.orientation.y, 5.0);
    }

    #[test]
    fn test_map_change_before_update_lands() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(sql_store(&dir));
        store
            .insert("other", 1, &Pose::new(Vec3::new(-5.0, 0.0, 0.0), Vec3::ZERO))
            .unwrap();
        let mut ctx = context(store.clone());
        let mut scheduler = TickScheduler::<Ctx>::new();
        open(&mut scheduler, &mut ctx);

        let tick = scheduler.handle();
        let Ctx { sync, edit, .. } = &mut ctx;
        edit.select(sync, &tick, "admin", 0).unwrap();
        edit.select(sync, &tick, "admin", 0).unwrap();
        // Move Up (Z + 5)
        edit.select(sync, &tick, "admin", 4).unwrap();
        edit.close_all();
        sync.refresh(&tick, "other");

        assert!(scheduler.run_until_idle(&mut ctx, Duration::from_secs(10)));
        assert_eq!(ctx.sync.current_map(), Some("other"));
        assert_eq!(ctx.sync.live_count(), 1);
        let live = ctx.sync.find_nearest(Vec3::new(-5.0, 0.0, 0.0), 0.1);
        assert!(live.is_some());
        // the update itself still went through
        assert_eq!(store.list_for_map("m").unwrap()[0].pose.position.z, 35.0);
    }

    #[test]
    fn test_empty_map_reports_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = SqlPlacementStore::new(dir.path().join("walltext.db"), "wall_text").unwrap();
        store.ensure_schema().unwrap();
        let mut ctx = context(Arc::new(store));
        let mut scheduler = TickScheduler::<Ctx>::new();
        open(&mut scheduler, &mut ctx);
        assert!(matches!(ctx.menus[0], Err(WallTextError::NotFound(_))));
        assert!(ctx.edit.session("admin").is_none());
    }

    #[test]
    fn test_back_closes_session() {
        let dir = tempfile::tempdir().unwrap();
        let mut ctx = context(Arc::new(sql_store(&dir)));
        let mut scheduler = TickScheduler::<Ctx>::new();
        open(&mut scheduler, &mut ctx);
        let tick = scheduler.handle();
        ctx.edit.select(&ctx.sync, &tick, "admin", 0).unwrap();
        assert!(ctx.edit.back("admin").is_some());
        assert!(ctx.edit.back("admin").is_none());
        assert!(ctx.edit.menu("admin").is_none());
        assert!(ctx.edit.select(&ctx.sync, &tick, "admin", 0).is_err());
    }
}
