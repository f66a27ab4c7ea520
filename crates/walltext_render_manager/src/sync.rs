use std::{collections::BTreeMap, sync::Arc};

use glam::Vec3;
use indexmap::IndexMap;
use smol_str::SmolStr;
use tracing::{debug, error, info, info_span, warn};
use walltext_core::{task::TickHandle, Pose, Result, WallTextError};
use walltext_placement_models::{GroupStyles, PlacementRecord, PlacementStore};
use walltext_render_models::{RenderHandle, TextLine, TextPlacement, WorldTextService};

use crate::composer::compose_lines;

/// Pose lift below this is ignored when adding a placement.
const MIN_Z_OFFSET: f32 = 0.001;

/// Result of a proximity scan over the live handles.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NearestMatch {
    pub group_number: i32,
    pub handle: RenderHandle,
    pub pose: Pose,
    pub distance: f32,
}

/// Owns the live representation of the placements of the current map.
///
/// 1. spawns the records of a map once the repository answered
/// 2. keeps the handles of every spawned placement, by group, in spawn order
/// 3. despawns everything when the map goes away or before a refresh
///
/// Lives on the tick thread. Repository calls go to the worker pool and come back through the
/// [`TickHandle`] of a context that gives access to this struct.
#[must_use]
pub struct PlacementSync {
    renderer: Option<Box<dyn WorldTextService>>,
    repository: Arc<dyn PlacementStore>,
    styles: Arc<GroupStyles>,
    live: IndexMap<i32, Vec<RenderHandle>>,
    current_map: Option<SmolStr>,
    /// bumped on every despawn, results of older reads are dropped
    generation: u64,
    unavailable_logged: bool,
}

impl PlacementSync {
    pub fn new(
        renderer: Option<Box<dyn WorldTextService>>,
        repository: Arc<dyn PlacementStore>,
        styles: Arc<GroupStyles>,
    ) -> Self {
        Self {
            renderer,
            repository,
            styles,
            live: IndexMap::new(),
            current_map: None,
            generation: 0,
            unavailable_logged: false,
        }
    }

    pub fn repository(&self) -> Arc<dyn PlacementStore> {
        Arc::clone(&self.repository)
    }
    pub fn set_repository(&mut self, repository: Arc<dyn PlacementStore>) {
        self.repository = repository;
    }
    pub fn styles(&self) -> Arc<GroupStyles> {
        Arc::clone(&self.styles)
    }
    pub fn set_styles(&mut self, styles: Arc<GroupStyles>) {
        self.styles = styles;
    }

    pub fn current_map(&self) -> Option<&str> {
        self.current_map.as_deref()
    }
    pub fn set_current_map(&mut self, map_name: Option<&str>) {
        self.current_map = map_name.map(SmolStr::new);
    }

    pub fn live(&self) -> &IndexMap<i32, Vec<RenderHandle>> {
        &self.live
    }
    pub fn live_count(&self) -> usize {
        self.live.values().map(Vec::len).sum()
    }

    fn renderer(&mut self) -> Result<&mut Box<dyn WorldTextService>> {
        match self.renderer.as_mut() {
            Some(renderer) => Ok(renderer),
            None => {
                if !self.unavailable_logged {
                    self.unavailable_logged = true;
                    error!("World text rendering service is not available, wall text is disabled");
                }
                Err(WallTextError::RenderingServiceUnavailable)
            }
        }
    }

    fn note_render_error(&mut self, e: &WallTextError, what: &str) {
        match e {
            WallTextError::RenderingServiceUnavailable => {
                if !self.unavailable_logged {
                    self.unavailable_logged = true;
                    error!(?e, "World text rendering service is not available");
                }
            }
            _ => error!(?e, "{what} failed"),
        }
    }

    /// Lines of a group from the current configuration. Empty, with a warning, for unknown groups.
    pub fn lines_for(&self, group_number: i32) -> Vec<TextLine> {
        match self.styles.get(group_number) {
            Some(style) if !style.lines.is_empty() => compose_lines(group_number, style),
            _ => {
                warn!("WorldText {group_number} not found in config.");
                Vec::new()
            }
        }
    }

    /// Removes every live handle. Render failures are logged, the live state is cleared anyway.
    pub fn despawn_all(&mut self) {
        self.generation += 1;
        let live = std::mem::take(&mut self.live);
        let nb: usize = live.values().map(Vec::len).sum();
        if nb == 0 {
            return;
        }
        let Ok(renderer) = self.renderer() else {
            return;
        };
        let mut failures = Vec::new();
        for handle in live.into_values().flatten() {
            if let Err(e) = renderer.remove(handle) {
                failures.push(e);
            }
        }
        for e in &failures {
            self.note_render_error(e, "despawn");
        }
        debug!(nb, failed = failures.len(), "despawned all");
    }

    /// Spawns `records` if they were read for the map and generation that are still current.
    /// Returns how many were spawned.
    pub fn spawn_records(
        &mut self,
        generation: u64,
        map_name: &str,
        records: &[PlacementRecord],
    ) -> usize {
        if generation != self.generation || self.current_map() != Some(map_name) {
            debug!(map_name, "discarding placements read for a stale map");
            return 0;
        }
        let _span = info_span!("spawn records", map_name, nb = records.len()).entered();
        let mut lines_by_group: BTreeMap<i32, Vec<TextLine>> = BTreeMap::new();
        let mut spawned = 0;
        for record in records {
            let lines = lines_by_group
                .entry(record.group_number)
                .or_insert_with(|| self.lines_for(record.group_number))
                .clone();
            let result = match self.renderer() {
                Ok(renderer) => renderer.spawn(TextPlacement::Wall, &lines, &record.pose),
                Err(_) => return spawned,
            };
            match result {
                Ok(handle) => {
                    self.live.entry(record.group_number).or_default().push(handle);
                    spawned += 1;
                }
                Err(e) => {
                    let unavailable = matches!(e, WallTextError::RenderingServiceUnavailable);
                    self.note_render_error(&e, "spawn");
                    if unavailable {
                        return spawned;
                    }
                }
            }
        }
        spawned
    }

    /// Marks `map_name` as the current map, reads its records on the worker pool and spawns
    /// them on a later tick.
    pub fn spawn_all<C>(&mut self, tick: &TickHandle<C>, map_name: &str)
    where
        C: AsMut<PlacementSync> + 'static,
    {
        self.current_map = Some(SmolStr::new(map_name));
        let generation = self.generation;
        let repository = self.repository();
        let map = SmolStr::new(map_name);
        let read_map = map.clone();
        tick.background(
            move || repository.list_for_map(&read_map),
            move |ctx: &mut C, result| match result {
                Ok(records) => {
                    let spawned = ctx.as_mut().spawn_records(generation, &map, &records);
                    info!(map_name = %map, spawned, "wall text loaded");
                }
                Err(e) => error!(?e, map_name = %map, "Error loading wall text"),
            },
        );
    }

    /// Despawns everything, then reloads `map_name` from the repository.
    pub fn refresh<C>(&mut self, tick: &TickHandle<C>, map_name: &str)
    where
        C: AsMut<PlacementSync> + 'static,
    {
        self.despawn_all();
        self.spawn_all(tick, map_name);
    }

    /// Closest live placement within `max_distance` (inclusive). Ties keep the first one found,
    /// in group then spawn order.
    pub fn find_nearest(&self, point: Vec3, max_distance: f32) -> Option<NearestMatch> {
        let renderer = self.renderer.as_ref()?;
        let mut best: Option<NearestMatch> = None;
        for (group_number, handles) in &self.live {
            for handle in handles {
                let Some(pose) = renderer.resolve_pose(*handle) else {
                    continue;
                };
                let distance = pose.position.distance(point);
                if distance > max_distance {
                    continue;
                }
                if best.map_or(true, |b| distance < b.distance) {
                    best = Some(NearestMatch {
                        group_number: *group_number,
                        handle: *handle,
                        pose,
                        distance,
                    });
                }
            }
        }
        best
    }

    fn forget_handle(&mut self, group_number: i32, handle: RenderHandle) {
        if let Some(handles) = self.live.get_mut(&group_number) {
            handles.retain(|h| *h != handle);
            if handles.is_empty() {
                self.live.shift_remove(&group_number);
            }
        }
    }

    /// Removes the nearest live placement now, then deletes its record on the worker pool.
    ///
    /// The two steps are not a transaction: `then` receives the outcome of the durable delete
    /// once the live handle is already gone.
    pub fn remove_nearest<C, F>(
        &mut self,
        tick: &TickHandle<C>,
        point: Vec3,
        max_distance: f32,
        then: F,
    ) -> Result<NearestMatch>
    where
        C: 'static,
        F: FnOnce(&mut C, NearestMatch, Result<bool>) + Send + 'static,
    {
        let map = self
            .current_map
            .clone()
            .ok_or_else(|| WallTextError::NotFound("No map is loaded.".to_owned()))?;
        let nearest = self.find_nearest(point, max_distance).ok_or_else(|| {
            WallTextError::NotFound("Move closer to the text you want to remove.".to_owned())
        })?;
        self.renderer()?.remove(nearest.handle)?;
        self.forget_handle(nearest.group_number, nearest.handle);

        let repository = self.repository();
        tick.background(
            move || repository.remove(&map, nearest.group_number, &nearest.pose),
            move |ctx: &mut C, result| {
                if let Err(e) = &result {
                    error!(?e, "failed to delete placement from storage");
                }
                then(ctx, nearest, result)
            },
        );
        Ok(nearest)
    }

    /// Spawns a placement of `group_number` at `pose`, then saves it on the worker pool.
    ///
    /// When the group has a vertical offset the spawned text is lifted and the lifted pose is the
    /// one saved. A failed save leaves the live text in place; `then` receives the saved pose.
    pub fn add_at<C, F>(
        &mut self,
        tick: &TickHandle<C>,
        group_number: i32,
        pose: Pose,
        then: F,
    ) -> Result<RenderHandle>
    where
        C: 'static,
        F: FnOnce(&mut C, Result<Pose>) + Send + 'static,
    {
        let map = self
            .current_map
            .clone()
            .ok_or_else(|| WallTextError::NotFound("No map is loaded.".to_owned()))?;
        let style = self
            .styles
            .get(group_number)
            .filter(|style| !style.lines.is_empty())
            .ok_or(WallTextError::UnknownGroup(group_number))?;
        let lines = compose_lines(group_number, style);
        let z_offset = style.z_offset;

        let renderer = self.renderer()?;
        let handle = renderer.spawn(TextPlacement::Wall, &lines, &pose)?;
        let mut saved = pose;
        if z_offset.abs() > MIN_Z_OFFSET {
            let lifted = pose.lifted(z_offset);
            match renderer.teleport(handle, &lifted) {
                Ok(()) => saved = lifted,
                Err(e) => warn!(?e, %handle, "failed to apply the vertical offset"),
            }
        }
        self.live.entry(group_number).or_default().push(handle);

        let repository = self.repository();
        tick.background(
            move || repository.insert(&map, group_number, &saved).map(|()| saved),
            move |ctx: &mut C, result| {
                if let Err(e) = &result {
                    error!(?e, group_number, "failed to save placement, it stays until the next refresh");
                }
                then(ctx, result)
            },
        );
        Ok(handle)
    }

    /// Applies freshly composed lines to every live handle, in place.
    pub fn restyle(&mut self) {
        let groups: Vec<(i32, Vec<RenderHandle>)> = self
            .live
            .iter()
            .map(|(group, handles)| (*group, handles.clone()))
            .collect();
        let mut failures = Vec::new();
        for (group_number, handles) in groups {
            let lines = self.lines_for(group_number);
            let Ok(renderer) = self.renderer() else {
                return;
            };
            for handle in handles {
                if let Err(e) = renderer.update(handle, &lines) {
                    failures.push(e);
                }
            }
        }
        for e in &failures {
            self.note_render_error(e, "restyle");
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::{collections::BTreeMap, time::Duration};
    use walltext_core::task::TickScheduler;
    use walltext_placement_manager::{JsonPlacementStore, SqlPlacementStore};
    use walltext_placement_models::{BackendKind, GroupStyle, PlacementId};
    use walltext_render_models::MemoryWorld;

    struct Ctx {
        sync: PlacementSync,
        saved: Vec<Result<Pose>>,
        removed: Vec<Result<bool>>,
    }

    impl AsMut<PlacementSync> for Ctx {
        fn as_mut(&mut self) -> &mut PlacementSync {
            &mut self.sync
        }
    }

    /// Every durable operation fails.
    struct BrokenStore;

    impl PlacementStore for BrokenStore {
        fn kind(&self) -> BackendKind {
            BackendKind::Relational
        }
        fn ensure_schema(&self) -> Result<()> {
            Err(self.unavailable())
        }
        fn insert(&self, _: &str, _: i32, _: &Pose) -> Result<()> {
            Err(self.unavailable())
        }
        fn remove(&self, _: &str, _: i32, _: &Pose) -> Result<bool> {
            Err(self.unavailable())
        }
        fn list_for_map(&self, _: &str) -> Result<Vec<PlacementRecord>> {
            Err(self.unavailable())
        }
        fn update(&self, _: PlacementId, _: &Pose) -> Result<()> {
            Err(self.unavailable())
        }
    }

    impl BrokenStore {
        fn unavailable(&self) -> WallTextError {
            WallTextError::PersistenceUnavailable {
                reason: "offline".to_owned(),
            }
        }
    }

    fn styles() -> Arc<GroupStyles> {
        let mut groups = BTreeMap::new();
        groups.insert(
            1,
            GroupStyle {
                lines: vec!["{Red}Hello".to_owned()],
                ..Default::default()
            },
        );
        groups.insert(
            2,
            GroupStyle {
                lines: vec!["Lifted".to_owned()],
                z_offset: 10.0,
                ..Default::default()
            },
        );
        groups.insert(3, GroupStyle::default());
        Arc::new(GroupStyles::new(groups))
    }

    fn at(x: f32, y: f32, z: f32) -> Pose {
        Pose::new(Vec3::new(x, y, z), Vec3::new(0.0, 90.0, 0.0))
    }

    fn setup(
        repository: Arc<dyn PlacementStore>,
    ) -> (TickScheduler<Ctx>, Ctx, MemoryWorld) {
        let world = MemoryWorld::new();
        let ctx = Ctx {
            sync: PlacementSync::new(Some(Box::new(world.clone())), repository, styles()),
            saved: Vec::new(),
            removed: Vec::new(),
        };
        (TickScheduler::new(), ctx, world)
    }

    fn settle(scheduler: &mut TickScheduler<Ctx>, ctx: &mut Ctx) {
        assert!(scheduler.run_until_idle(ctx, Duration::from_secs(10)));
    }

    #[test]
    fn test_spawn_all_then_despawn_all() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonPlacementStore::new(dir.path());
        store.insert("m", 1, &at(0.0, 0.0, 0.0)).unwrap();
        store.insert("m", 2, &at(1.0, 0.0, 0.0)).unwrap();
        store.insert("m", 1, &at(2.0, 0.0, 0.0)).unwrap();
        // unknown group still gets spawned, with no lines
        store.insert("m", 9, &at(3.0, 0.0, 0.0)).unwrap();
        let (mut scheduler, mut ctx, world) = setup(Arc::new(store));

        let tick = scheduler.handle();
        ctx.sync.spawn_all(&tick, "m");
        settle(&mut scheduler, &mut ctx);
        assert_eq!(ctx.sync.live_count(), 4);
        assert_eq!(world.len(), 4);
        assert_eq!(ctx.sync.live().keys().copied().collect::<Vec<_>>(), vec![1, 2, 9]);

        ctx.sync.despawn_all();
        assert!(ctx.sync.live().is_empty());
        assert!(world.is_empty());
    }

    #[test]
    fn test_refresh_matches_repository() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(JsonPlacementStore::new(dir.path()));
        store.insert("m", 1, &at(0.0, 0.0, 0.0)).unwrap();
        let (mut scheduler, mut ctx, world) = setup(store.clone());
        let tick = scheduler.handle();
        ctx.sync.spawn_all(&tick, "m");
        settle(&mut scheduler, &mut ctx);

        store.insert("m", 1, &at(5.0, 0.0, 0.0)).unwrap();
        ctx.sync.refresh(&tick, "m");
        ctx.sync.refresh(&tick, "m");
        settle(&mut scheduler, &mut ctx);
        assert_eq!(ctx.sync.live_count(), 2);
        assert_eq!(world.len(), 2);
    }

    #[test]
    fn test_stale_map_result_is_discarded() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonPlacementStore::new(dir.path());
        store.insert("old", 1, &at(0.0, 0.0, 0.0)).unwrap();
        let (mut scheduler, mut ctx, world) = setup(Arc::new(store));
        let tick = scheduler.handle();
        ctx.sync.spawn_all(&tick, "old");
        // map change before the read came back
        ctx.sync.despawn_all();
        ctx.sync.spawn_all(&tick, "new");
        settle(&mut scheduler, &mut ctx);
        assert_eq!(ctx.sync.live_count(), 0);
        assert!(world.is_empty());
    }

    fn spawn_at_distances(ctx: &mut Ctx) {
        ctx.sync.set_current_map(Some("m"));
        let records: Vec<PlacementRecord> = [(1, 50.0), (1, 120.0), (3, 30.0)]
            .iter()
            .enumerate()
            .map(|(i, (group, x))| PlacementRecord {
                id: PlacementId(i as u64),
                map_name: "m".into(),
                group_number: *group,
                pose: at(*x, 0.0, 0.0),
            })
            .collect();
        let generation = ctx.sync.generation;
        assert_eq!(ctx.sync.spawn_records(generation, "m", &records), 3);
    }

    #[test]
    fn test_find_nearest() {
        let (_scheduler, mut ctx, _world) = setup(Arc::new(BrokenStore));
        spawn_at_distances(&mut ctx);

        let nearest = ctx.sync.find_nearest(Vec3::ZERO, 100.0).unwrap();
        assert_eq!(nearest.distance, 30.0);
        assert_eq!(nearest.group_number, 3);
        assert!(ctx.sync.find_nearest(Vec3::ZERO, 20.0).is_none());
        // inclusive bound
        assert!(ctx.sync.find_nearest(Vec3::ZERO, 30.0).is_some());
    }

    #[test]
    fn test_find_nearest_tie_keeps_first() {
        let (_scheduler, mut ctx, _world) = setup(Arc::new(BrokenStore));
        ctx.sync.set_current_map(Some("m"));
        let records: Vec<PlacementRecord> = [(1, 10.0), (2, -10.0)]
            .iter()
            .enumerate()
            .map(|(i, (group, x))| PlacementRecord {
                id: PlacementId(i as u64),
                map_name: "m".into(),
                group_number: *group,
                pose: at(*x, 0.0, 0.0),
            })
            .collect();
        let generation = ctx.sync.generation;
        ctx.sync.spawn_records(generation, "m", &records);
        assert_eq!(ctx.sync.find_nearest(Vec3::ZERO, 100.0).unwrap().group_number, 1);
    }

    #[test]
    fn test_remove_nearest_is_two_steps() {
        let (mut scheduler, mut ctx, world) = setup(Arc::new(BrokenStore));
        spawn_at_distances(&mut ctx);
        let tick = scheduler.handle();

        let err = ctx
            .sync
            .remove_nearest(&tick, Vec3::ZERO, 20.0, |ctx: &mut Ctx, _, res| {
                ctx.removed.push(res)
            })
            .unwrap_err();
        assert_eq!(err.to_string(), "Move closer to the text you want to remove.");
        assert_eq!(world.len(), 3);

        let removed = ctx
            .sync
            .remove_nearest(&tick, Vec3::ZERO, 100.0, |ctx: &mut Ctx, _, res| {
                ctx.removed.push(res)
            })
            .unwrap();
        assert_eq!(removed.group_number, 3);
        // live side is gone right away, group 3 has no handle left
        assert_eq!(world.len(), 2);
        assert!(!ctx.sync.live().contains_key(&3));
        settle(&mut scheduler, &mut ctx);
        // durable side failed and is only reported
        assert_eq!(ctx.removed.len(), 1);
        assert!(ctx.removed[0].is_err());
        assert_eq!(world.len(), 2);
    }

    #[test]
    fn test_add_applies_vertical_offset_and_saves_lifted_pose() {
        let dir = tempfile::tempdir().unwrap();
        let sql = SqlPlacementStore::new(dir.path().join("walltext.db"), "wall_text").unwrap();
        sql.ensure_schema().unwrap();
        let store = Arc::new(sql);
        let (mut scheduler, mut ctx, world) = setup(store.clone());
        ctx.sync.set_current_map(Some("m"));
        let tick = scheduler.handle();

        let handle = ctx
            .sync
            .add_at(&tick, 2, at(1.0, 2.0, 3.0), |ctx: &mut Ctx, res| ctx.saved.push(res))
            .unwrap();
        assert_eq!(world.entity(handle).unwrap().pose.position.z, 13.0);
        settle(&mut scheduler, &mut ctx);
        assert_eq!(ctx.saved.len(), 1);
        let stored = store.list_for_map("m").unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].pose.position, Vec3::new(1.0, 2.0, 13.0));
    }

    #[test]
    fn test_add_keeps_original_pose_when_teleport_fails() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(JsonPlacementStore::new(dir.path()));
        let (mut scheduler, mut ctx, world) = setup(store.clone());
        world.set_teleport_fails(true);
        ctx.sync.set_current_map(Some("m"));
        let tick = scheduler.handle();
        ctx.sync
            .add_at(&tick, 2, at(1.0, 2.0, 3.0), |ctx: &mut Ctx, res| ctx.saved.push(res))
            .unwrap();
        settle(&mut scheduler, &mut ctx);
        assert_eq!(store.list_for_map("m").unwrap()[0].pose.position.z, 3.0);
    }

    #[test]
    fn test_add_unknown_or_empty_group() {
        let (scheduler, mut ctx, world) = setup(Arc::new(BrokenStore));
        ctx.sync.set_current_map(Some("m"));
        let tick = scheduler.handle();
        for group in [3, 42] {
            let err = ctx
                .sync
                .add_at(&tick, group, at(0.0, 0.0, 0.0), |_: &mut Ctx, _| {})
                .unwrap_err();
            assert_eq!(err.to_string(), format!("group {group} was not found in the config"));
        }
        assert!(world.is_empty());
    }

    #[test]
    fn test_failed_save_keeps_live_text() {
        let (mut scheduler, mut ctx, world) = setup(Arc::new(BrokenStore));
        ctx.sync.set_current_map(Some("m"));
        let tick = scheduler.handle();
        ctx.sync
            .add_at(&tick, 1, at(0.0, 0.0, 0.0), |ctx: &mut Ctx, res| ctx.saved.push(res))
            .unwrap();
        settle(&mut scheduler, &mut ctx);
        assert!(ctx.saved[0].is_err());
        assert_eq!(world.len(), 1);
        assert_eq!(ctx.sync.live_count(), 1);
    }

    #[test]
    fn test_restyle_updates_in_place() {
        let (_scheduler, mut ctx, world) = setup(Arc::new(BrokenStore));
        spawn_at_distances(&mut ctx);
        let before: Vec<RenderHandle> = world.entities().iter().map(|(h, _)| *h).collect();

        let mut groups = BTreeMap::new();
        groups.insert(
            1,
            GroupStyle {
                lines: vec!["{Blue}Changed".to_owned()],
                ..Default::default()
            },
        );
        ctx.sync.set_styles(Arc::new(GroupStyles::new(groups)));
        ctx.sync.restyle();

        let after = world.entities();
        assert_eq!(after.iter().map(|(h, _)| *h).collect::<Vec<_>>(), before);
        let texts: Vec<Vec<String>> = after
            .iter()
            .map(|(_, e)| e.lines.iter().map(|l| l.text.clone()).collect())
            .collect();
        similar_asserts::assert_eq!(
            texts,
            vec![vec!["Changed".to_owned()], vec!["Changed".to_owned()], vec![]]
        );
    }

    #[test]
    fn test_missing_renderer_disables_spawning() {
        let mut sync = PlacementSync::new(None, Arc::new(BrokenStore), styles());
        sync.set_current_map(Some("m"));
        let record = PlacementRecord {
            id: PlacementId(0),
            map_name: "m".into(),
            group_number: 1,
            pose: at(0.0, 0.0, 0.0),
        };
        assert_eq!(sync.spawn_records(0, "m", &[record.clone()]), 0);
        assert_eq!(sync.spawn_records(0, "m", &[record]), 0);
        assert!(sync.find_nearest(Vec3::ZERO, 100.0).is_none());
    }
}
