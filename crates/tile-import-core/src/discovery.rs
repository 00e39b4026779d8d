//! Discovery engine: validate, count, scan, read metadata, build and persist the catalog.
//!
//! Every terminal failure is reported once on the diagnostics channel under its flag
//! before it is returned; per-file failures are reported and skipped.

use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::{info, instrument};

use crate::catalog::{Catalog, write_catalog};
use crate::config::DiscoveryConfig;
use crate::diagnostics::{Diagnostics, Flag};
use crate::error::{ImportError, Result};
use crate::metadata::{ImageProvider, read_tiles};
use crate::scanner::{candidates, count_files, validate_root};

type PathFilter<'a> = Box<dyn Fn(&Path) -> bool + 'a>;
type Progress<'a> = Box<dyn FnMut(usize, usize) + 'a>;

pub struct Discovery<'a, P: ImageProvider> {
    cfg: &'a DiscoveryConfig,
    provider: &'a P,
    filter: Option<PathFilter<'a>>,
    progress: Option<Progress<'a>>,
}

impl<'a, P: ImageProvider> Discovery<'a, P> {
    pub fn new(cfg: &'a DiscoveryConfig, provider: &'a P) -> Self {
        Self {
            cfg,
            provider,
            filter: None,
            progress: None,
        }
    }

    /// Only files for which `filter` returns true are considered as tiles.
    pub fn with_filter(mut self, filter: impl Fn(&Path) -> bool + 'a) -> Self {
        self.filter = Some(Box::new(filter));
        self
    }

    /// Called with `(done, total)` after each file's metadata pass.
    pub fn with_progress(mut self, progress: impl FnMut(usize, usize) + 'a) -> Self {
        self.progress = Some(Box::new(progress));
        self
    }

    /// Runs every stage up to and including catalog building.
    #[instrument(skip_all, fields(root = %root.display()))]
    pub fn discover<W: Write>(
        &mut self,
        root: &Path,
        diag: &mut Diagnostics<W>,
    ) -> Result<Catalog> {
        if let Err(e) = self.cfg.validate() {
            return Err(report(diag, e));
        }
        if let Err(e) = validate_root(root) {
            return Err(report(diag, e));
        }

        match count_files(root, self.cfg) {
            Ok(count) => {
                diag.emit(Flag::FileCount, count.to_string());
                diag.emit(
                    Flag::ValidPath,
                    format!("Input path valid {}", root.display()),
                );
            }
            Err(ImportError::TooManyFiles { count }) => {
                diag.emit(Flag::FileCount, count.to_string());
                return Err(report(diag, ImportError::TooManyFiles { count }));
            }
            Err(e) => return Err(report(diag, e)),
        }

        let found: Vec<_> = match &self.filter {
            Some(keep) => candidates(root, self.cfg, |p| keep(p)).collect(),
            None => candidates(root, self.cfg, |_| true).collect(),
        };
        let total = found.len();
        diag.emit(Flag::Debug, format!("{total} candidate tiles found."));

        let mut done = 0usize;
        let progress = &mut self.progress;
        let records = read_tiles(self.provider, found, |_, err| {
            if let Some(e) = err {
                diag.emit(e.flag(), e.to_string());
            }
            done += 1;
            if let Some(cb) = progress.as_mut() {
                cb(done, total);
            }
        });

        if records.is_empty() {
            return Err(report(
                diag,
                ImportError::NoTargetFiles {
                    path: root.to_path_buf(),
                },
            ));
        }
        let catalog = Catalog::build(records);
        info!(
            groups = catalog.group_count(),
            tiles = catalog.tile_count(),
            "catalog built"
        );
        Ok(catalog)
    }

    /// Discovers, then writes the artifact into the configured output directory.
    /// The artifact path is reported under [`Flag::DataPath`].
    pub fn run<W: Write>(&mut self, root: &Path, diag: &mut Diagnostics<W>) -> Result<PathBuf> {
        let catalog = self.discover(root, diag)?;
        match write_catalog(&self.cfg.out_dir, &catalog) {
            Ok(path) => {
                diag.emit(Flag::Info, format!("File wrote to: {}", path.display()));
                diag.emit(Flag::DataPath, path.display().to_string());
                Ok(path)
            }
            Err(e) => Err(report(diag, e)),
        }
    }
}

fn report<W: Write>(diag: &mut Diagnostics<W>, e: ImportError) -> ImportError {
    diag.emit(e.flag(), e.to_string());
    e
}
