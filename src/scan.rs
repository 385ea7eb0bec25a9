//! Parallel discovery of reclaimable disk cruft.
//!
//! Two read-only passes: the catalog pass probes every known cruft location
//! with a bounded worker pool, and the discovery pass streams depth-bounded
//! directory-walk candidates (virtual environments, dependency trees) through
//! a channel into the same pool. Per-item failures are aggregated into the
//! result's error list; one failing item never aborts a pass.

use crossbeam_channel::{bounded, Sender};
use indicatif::{ProgressBar, ProgressStyle};
use rayon::iter::{IntoParallelRefIterator, ParallelBridge, ParallelIterator};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::cache::SizeCache;
use crate::catalog::{
    CruftPattern, PatternCatalog, DEFAULT_SEARCH_DIRS, DEP_TREE_DIR, VENV_MARKER, VENV_NAMES,
};
use crate::error::Result;
use crate::measure::{self, ToolStatus};
use crate::paths;

/// A discovered instance of cruft. Immutable once produced.
#[derive(Debug, Clone, serde::Serialize)]
pub struct CruftItem {
    pub path: PathBuf,
    pub size_bytes: u64,
    pub category: String,
    pub description: String,
    pub safe: bool,
    pub tool: ToolStatus,
}

impl CruftItem {
    pub fn size_human(&self) -> String {
        humansize::format_size(self.size_bytes, humansize::BINARY)
    }
}

/// Ordered results of one scan. Each collection is sorted descending by
/// measured size before being returned.
#[derive(Debug, Default, serde::Serialize)]
pub struct ScanResult {
    /// Instances of cataloged patterns.
    pub items: Vec<CruftItem>,
    /// Discovered virtual environments.
    pub venvs: Vec<CruftItem>,
    /// Discovered dependency trees.
    pub dependency_trees: Vec<CruftItem>,
    /// Non-fatal per-item failures.
    pub errors: Vec<String>,
}

impl ScanResult {
    pub fn all_items(&self) -> impl Iterator<Item = &CruftItem> {
        self.items
            .iter()
            .chain(self.venvs.iter())
            .chain(self.dependency_trees.iter())
    }

    pub fn total_bytes(&self) -> u64 {
        self.all_items().map(|item| item.size_bytes).sum()
    }

    pub fn item_count(&self) -> usize {
        self.items.len() + self.venvs.len() + self.dependency_trees.len()
    }
}

/// Runtime knobs for a scan.
#[derive(Debug, Clone)]
pub struct ScanOptions {
    pub include_venvs: bool,
    pub include_dependency_trees: bool,
    /// Global reporting floor; per-pattern floors can only raise it.
    pub min_size_mb: u64,
    pub workers: usize,
    /// Roots searched by the discovery pass.
    pub search_roots: Vec<PathBuf>,
    pub venv_min_size_mb: u64,
    pub dep_tree_min_size_mb: u64,
    /// Recursion bound for the discovery pass.
    pub max_depth: usize,
    pub size_timeout: Duration,
    pub discovery_size_timeout: Duration,
    pub show_progress: bool,
}

impl ScanOptions {
    pub fn defaults_for_home(home: &Path) -> ScanOptions {
        ScanOptions {
            include_venvs: true,
            include_dependency_trees: true,
            min_size_mb: 100,
            workers: 4,
            search_roots: DEFAULT_SEARCH_DIRS.iter().map(|d| home.join(d)).collect(),
            venv_min_size_mb: 50,
            dep_tree_min_size_mb: 200,
            max_depth: 4,
            size_timeout: measure::SIZE_TIMEOUT,
            discovery_size_timeout: measure::DISCOVERY_SIZE_TIMEOUT,
            show_progress: false,
        }
    }
}

/// Run both passes and return deterministically ordered results. The cache
/// is persisted at the end regardless of per-item failures.
pub fn scan_all(
    catalog: &PatternCatalog,
    cache: &SizeCache,
    home: &Path,
    options: &ScanOptions,
) -> Result<ScanResult> {
    let progress = make_progress(options.show_progress);
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(options.workers.max(1))
        .build()
        .map_err(|err| crate::error::Error::Config(format!("could not build worker pool: {err}")))?;

    let mut result = ScanResult::default();

    progress.set_message("Scanning known cruft locations...");
    scan_catalog(catalog, cache, home, options, &pool, &mut result);

    if options.include_venvs || options.include_dependency_trees {
        progress.set_message("Searching project directories...");
        scan_discovered(cache, options, &pool, &mut result);
    }

    // Descending size order is part of the contract, independent of worker
    // completion order.
    result.items.sort_by(|a, b| b.size_bytes.cmp(&a.size_bytes));
    result.venvs.sort_by(|a, b| b.size_bytes.cmp(&a.size_bytes));
    result
        .dependency_trees
        .sort_by(|a, b| b.size_bytes.cmp(&a.size_bytes));

    cache.save();
    progress.finish_with_message(format!(
        "Scan complete: {} items, {}",
        result.item_count(),
        humansize::format_size(result.total_bytes(), humansize::BINARY)
    ));

    Ok(result)
}

fn scan_catalog(
    catalog: &PatternCatalog,
    cache: &SizeCache,
    home: &Path,
    options: &ScanOptions,
    pool: &rayon::ThreadPool,
    result: &mut ScanResult,
) {
    let outcomes: Vec<Result<Option<CruftItem>>> = pool.install(|| {
        catalog
            .patterns()
            .par_iter()
            .map(|pattern| scan_pattern(pattern, cache, home, options))
            .collect()
    });

    for outcome in outcomes {
        match outcome {
            Ok(Some(item)) => result.items.push(item),
            Ok(None) => {}
            Err(err) => result.errors.push(err.to_string()),
        }
    }
}

/// Probe a single catalog pattern. `Ok(None)` means the location is missing,
/// unmeasurable, or below its effective floor.
fn scan_pattern(
    pattern: &CruftPattern,
    cache: &SizeCache,
    home: &Path,
    options: &ScanOptions,
) -> Result<Option<CruftItem>> {
    let path = pattern.path.resolve(home);
    if !path.exists() {
        return Ok(None);
    }

    let size_bytes = match measure::dir_size(&path, cache, options.size_timeout)? {
        Some(size) => size,
        None => return Ok(None),
    };

    let effective_min = pattern.min_size_mb.max(options.min_size_mb);
    if size_bytes < effective_min * 1024 * 1024 {
        debug!(path = %path.display(), size_bytes, effective_min, "below size floor");
        return Ok(None);
    }

    let tool = match &pattern.check_installed {
        Some(binary) => measure::probe_tool(binary),
        None => ToolStatus::Unknown,
    };

    Ok(Some(CruftItem {
        path,
        size_bytes,
        category: pattern.category.clone(),
        description: pattern.description.clone(),
        safe: pattern.safe,
        tool,
    }))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DiscoveryKind {
    Venv,
    DependencyTree,
}

#[derive(Debug)]
struct Candidate {
    path: PathBuf,
    kind: DiscoveryKind,
}

/// Depth-bounded search for venvs and dependency trees. A producer thread
/// walks the search roots and streams candidates into a bounded channel;
/// workers measure them through the cache in parallel.
fn scan_discovered(
    cache: &SizeCache,
    options: &ScanOptions,
    pool: &rayon::ThreadPool,
    result: &mut ScanResult,
) {
    let (sender, receiver) = bounded::<Candidate>(100);
    let producer_options = options.clone();
    let producer = thread::spawn(move || discover_candidates(&producer_options, sender));

    let outcomes: Vec<(DiscoveryKind, Result<Option<CruftItem>>)> = pool.install(|| {
        receiver
            .into_iter()
            .par_bridge()
            .map(|candidate| {
                let outcome = measure_candidate(&candidate, cache, options);
                (candidate.kind, outcome)
            })
            .collect()
    });

    for (kind, outcome) in outcomes {
        let bucket = match kind {
            DiscoveryKind::Venv => &mut result.venvs,
            DiscoveryKind::DependencyTree => &mut result.dependency_trees,
        };
        match outcome {
            Ok(Some(item)) => bucket.push(item),
            Ok(None) => {}
            Err(err) => result.errors.push(err.to_string()),
        }
    }

    match producer.join() {
        Ok(walk_errors) => result.errors.extend(walk_errors),
        Err(_) => result
            .errors
            .push("discovery walker thread panicked".to_string()),
    }
}

/// Walk every search root, sending venv and dependency-tree candidates.
/// Matched directories are not descended into, which also excludes nested
/// occurrences of a dependency tree inside another instance. De-duplication
/// is by canonical path across the whole search.
fn discover_candidates(options: &ScanOptions, sender: Sender<Candidate>) -> Vec<String> {
    let mut errors = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();

    for root in &options.search_roots {
        if !root.exists() {
            continue;
        }

        let mut walker = WalkDir::new(root)
            .follow_links(false)
            .max_depth(options.max_depth)
            .into_iter();

        while let Some(entry) = walker.next() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    warn!(%err, root = %root.display(), "discovery walk error");
                    errors.push(format!("discovery walk error under {}: {err}", root.display()));
                    continue;
                }
            };
            if !entry.file_type().is_dir() {
                continue;
            }

            let name = entry.file_name().to_string_lossy();
            let kind = if options.include_dependency_trees && name == DEP_TREE_DIR {
                Some(DiscoveryKind::DependencyTree)
            } else if options.include_venvs
                && VENV_NAMES.contains(&name.as_ref())
                && entry.path().join(VENV_MARKER).is_file()
            {
                Some(DiscoveryKind::Venv)
            } else {
                None
            };

            if let Some(kind) = kind {
                walker.skip_current_dir();
                if seen.insert(paths::canonical_key(entry.path())) {
                    let candidate = Candidate {
                        path: entry.path().to_path_buf(),
                        kind,
                    };
                    if sender.send(candidate).is_err() {
                        // Receiver gone; stop walking.
                        return errors;
                    }
                }
            }
        }
    }

    errors
}

fn measure_candidate(
    candidate: &Candidate,
    cache: &SizeCache,
    options: &ScanOptions,
) -> Result<Option<CruftItem>> {
    let size_bytes =
        match measure::dir_size(&candidate.path, cache, options.discovery_size_timeout)? {
            Some(size) => size,
            None => return Ok(None),
        };

    let floor_mb = match candidate.kind {
        DiscoveryKind::Venv => options.venv_min_size_mb,
        DiscoveryKind::DependencyTree => options.dep_tree_min_size_mb,
    };
    if size_bytes < floor_mb * 1024 * 1024 {
        return Ok(None);
    }

    let project = candidate
        .path
        .parent()
        .and_then(|p| p.file_name())
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "unknown project".to_string());

    let (category, description) = match candidate.kind {
        DiscoveryKind::Venv => ("python".to_string(), format!("venv in {project}")),
        DiscoveryKind::DependencyTree => {
            ("node".to_string(), format!("{DEP_TREE_DIR} in {project}"))
        }
    };

    Ok(Some(CruftItem {
        path: candidate.path.clone(),
        size_bytes,
        category,
        description,
        safe: true,
        // The presence of a venv or dependency tree implies its tool.
        tool: ToolStatus::Installed,
    }))
}

fn make_progress(show: bool) -> ProgressBar {
    if !show {
        return ProgressBar::hidden();
    }
    let progress = ProgressBar::new_spinner();
    progress.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {msg}")
            .expect("valid progress template"),
    );
    progress.enable_steady_tick(Duration::from_millis(100));
    progress
}
