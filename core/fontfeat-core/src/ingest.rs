//! Ingestion pipeline: walk, open faces, extract features, catalog
//! (made by FontLab https://www.fontlab.com/)

use std::io::Write;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};

use crate::catalog::{CatalogEntry, CatalogStore, EntryInsert};
use crate::config::IngestConfig;
use crate::discovery::PathDiscovery;
use crate::engine::{FaceOpen, FontEngine};
use crate::error::IngestError;
use crate::features::extract_features;
use crate::report::{FaceOutcome, RunReporter, RunSummary};

/// A committed catalog and the counters of the run that built it.
#[derive(Debug, Clone)]
pub struct IngestOutcome {
    pub catalog: PathBuf,
    pub summary: RunSummary,
}

/// Build a catalog with the default read-fonts engine.
#[cfg(feature = "fontations")]
pub fn build_catalog<W: Write>(
    config: &IngestConfig,
    reporter: RunReporter<W>,
) -> Result<IngestOutcome, IngestError> {
    let mut engine = crate::engine::FontationsEngine::new();
    ingest(config, &mut engine, reporter)
}

/// Run one ingestion pass and commit the catalog.
///
/// The catalog path is claimed before anything is scanned. Any directory that
/// cannot be read aborts the run and no catalog is left behind; faces that
/// fail to open and duplicate keys are logged and skipped.
pub fn ingest<E, W>(
    config: &IngestConfig,
    engine: &mut E,
    mut reporter: RunReporter<W>,
) -> Result<IngestOutcome, IngestError>
where
    E: FontEngine,
    W: Write,
{
    let mut store = CatalogStore::open(&config.catalog_path)?;
    store.begin_batch()?;
    info!(
        "cataloging {} root(s) into {}",
        config.roots.len(),
        store.path().display()
    );

    let paths = PathDiscovery::new(config.roots.iter().cloned())
        .follow_symlinks(config.follow_symlinks)
        .walk();

    for path in paths {
        let path = path?;
        reporter.file_scanned();
        catalog_file(engine, &mut store, &mut reporter, &path)?;
    }

    let catalog = store.commit_batch()?;
    let summary = reporter.finish();

    Ok(IngestOutcome { catalog, summary })
}

/// Probe face indices 0, 1, 2… until the engine reports an invalid index.
fn catalog_file<E, W>(
    engine: &mut E,
    store: &mut CatalogStore,
    reporter: &mut RunReporter<W>,
    path: &Path,
) -> Result<(), IngestError>
where
    E: FontEngine,
    W: Write,
{
    // Lossy conversion would fold distinct paths onto one catalog key.
    let Some(filename) = path.to_str().map(str::to_owned) else {
        warn!("skipping {}: path is not valid UTF-8", path.display());
        reporter.non_utf8_path();
        return Ok(());
    };
    let mut index: u32 = 0;

    loop {
        match engine.open_face(path, index) {
            FaceOpen::InvalidIndex => {
                debug!("{filename}: {index} face(s) probed");
                break;
            }
            FaceOpen::Failed(err) => {
                warn!("cannot open {filename}#{index}: {err}");
                reporter.face_open_failed();
            }
            FaceOpen::Opened(opened) => {
                let layout = extract_features(engine, &opened.face);

                let outcome = match layout.catalog_tags() {
                    None => FaceOutcome::Skipped,
                    Some(tags) => {
                        let entry = CatalogEntry {
                            family: opened.family,
                            style: opened.style,
                            filename: filename.clone(),
                            face_index: index,
                        };
                        match store.insert_entry(&entry)? {
                            EntryInsert::Inserted => {
                                FaceOutcome::Cataloged(store.insert_features(&filename, index, tags)?)
                            }
                            EntryInsert::Duplicate => {
                                warn!("{filename}#{index} is already cataloged, skipping");
                                FaceOutcome::Duplicate
                            }
                        }
                    }
                };

                reporter.face(&filename, index, &layout, outcome);
            }
        }

        index = match index.checked_add(1) {
            Some(next) => next,
            None => break,
        };
    }

    Ok(())
}
