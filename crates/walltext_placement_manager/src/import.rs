use std::{collections::VecDeque, path::Path, sync::Arc};

use smol_str::SmolStr;
use tracing::{error, info, info_span, warn};
use walltext_core::{task::TickHandle, Result, WallTextError};
use walltext_placement_models::{legacy::map_name_from_file_stem, FileRecord, ImportEntry, PlacementStore};

/// Everything found in a maps directory, before any write.
#[derive(Debug, Default)]
pub struct LegacyScan {
    pub entries: Vec<ImportEntry>,
    pub files_scanned: usize,
    pub files_skipped: usize,
    pub entries_skipped: usize,
}

/// Parses the content of one legacy file.
/// Returns the valid entries and how many were skipped. A file that is not a json list is an error.
pub fn parse_legacy_file(
    map_name: &str,
    file_name: &str,
    content: &str,
) -> Result<(Vec<ImportEntry>, usize)> {
    if content.trim().is_empty() {
        info!(file_name, "0 entries");
        return Ok((Vec::new(), 0));
    }
    let records: Vec<serde_json::Value> =
        serde_json::from_str(content).map_err(|e| WallTextError::malformed(file_name, e))?;
    let total = records.len();
    let mut entries = Vec::with_capacity(total);
    let mut skipped = 0;
    for (index, value) in records.into_iter().enumerate() {
        // entries are decoded one by one so that a single bad one does not cost the whole file
        let origin = format!("{file_name} entry {}", index + 1);
        let validated = serde_json::from_value::<FileRecord>(value)
            .map_err(|e| WallTextError::malformed(origin.as_str(), e))
            .and_then(|record| record.validate(&origin).map(|pose| (record.group_number, pose)));
        match validated {
            Ok((group_number, pose)) => entries.push(ImportEntry {
                map_name: SmolStr::new(map_name),
                group_number,
                pose,
            }),
            Err(e) => {
                skipped += 1;
                warn!(file_name, entry = index + 1, %e, "skipping malformed entry");
            }
        }
    }
    info!(file_name, "queued {} / {}", entries.len(), total);
    Ok((entries, skipped))
}

/// Reads every `*.json` file at the top level of `maps_dir`, in file name order.
pub fn scan_legacy_dir(maps_dir: &Path) -> Result<LegacyScan> {
    let _span = info_span!("legacy scan", ?maps_dir).entered();
    if !maps_dir.is_dir() {
        return Err(WallTextError::NotFound(format!(
            "No maps folder found at {}",
            maps_dir.display()
        )));
    }
    let read_dir = std::fs::read_dir(maps_dir).map_err(|e| {
        error!(?e, "Error reading maps directory");
        WallTextError::Storage(format!("Failed to read {}", maps_dir.display()))
    })?;
    let mut files: Vec<_> = read_dir
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            path.is_file()
                && path
                    .extension()
                    .map(|ext| ext.eq_ignore_ascii_case("json"))
                    .unwrap_or(false)
        })
        .collect();
    files.sort();

    let mut scan = LegacyScan::default();
    for path in files {
        scan.files_scanned += 1;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let map_name = map_name_from_file_stem(&stem);

        let parsed = std::fs::read_to_string(&path)
            .map_err(|e| WallTextError::malformed(file_name.as_str(), e))
            .and_then(|content| parse_legacy_file(map_name, &file_name, &content));
        match parsed {
            Ok((entries, skipped)) => {
                scan.entries.extend(entries);
                scan.entries_skipped += skipped;
            }
            Err(e) => {
                scan.files_skipped += 1;
                error!(?e, file_name, "Failed reading legacy file, skipping");
            }
        }
    }
    Ok(scan)
}

/// Inserts queued entries a few at a time so that a large import never stalls a tick.
#[derive(Debug)]
pub struct ImportJob {
    queue: VecDeque<ImportEntry>,
    inserts_per_tick: usize,
    queued: usize,
    inserted: usize,
    failed: usize,
}

impl ImportJob {
    pub fn new(entries: Vec<ImportEntry>, inserts_per_tick: usize) -> Self {
        Self {
            queued: entries.len(),
            queue: entries.into(),
            inserts_per_tick: inserts_per_tick.max(1),
            inserted: 0,
            failed: 0,
        }
    }

    /// One batch. A failed insert is logged and counted, the batch goes on.
    pub fn pump(&mut self, store: &dyn PlacementStore) -> usize {
        let mut done = 0;
        while done < self.inserts_per_tick {
            let Some(entry) = self.queue.pop_front() else {
                break;
            };
            match store.insert(&entry.map_name, entry.group_number, &entry.pose) {
                Ok(()) => self.inserted += 1,
                Err(e) => {
                    self.failed += 1;
                    error!(
                        ?e,
                        "Import insert failed for {}/Group {}", entry.map_name, entry.group_number
                    );
                }
            }
            done += 1;
        }
        done
    }

    pub fn is_done(&self) -> bool {
        self.queue.is_empty()
    }
    pub fn queued(&self) -> usize {
        self.queued
    }
    pub fn inserted(&self) -> usize {
        self.inserted
    }
    pub fn failed(&self) -> usize {
        self.failed
    }
    pub fn remaining(&self) -> usize {
        self.queue.len()
    }
}

/// Drives `job` to completion: one batch on the worker pool per tick, then `finished` on the tick.
pub fn run_import<Ctx, F>(
    tick: TickHandle<Ctx>,
    store: Arc<dyn PlacementStore>,
    job: ImportJob,
    finished: F,
) where
    Ctx: 'static,
    F: FnOnce(&mut Ctx, ImportJob) + Send + 'static,
{
    if job.is_done() {
        tick.next_tick(move |ctx| finished(ctx, job));
        return;
    }
    let next = tick.clone();
    let worker_store = Arc::clone(&store);
    let mut job = job;
    tick.background(
        move || {
            job.pump(worker_store.as_ref());
            job
        },
        move |_ctx, job| run_import(next, store, job, finished),
    );
}
