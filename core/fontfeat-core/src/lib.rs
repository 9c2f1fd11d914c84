/// fontfeat-core: a catalog of which OpenType features your fonts speak
///
/// Scanning a font library to answer "who supports historical ligatures?"
/// is slow when every question re-reads every binary. This crate does the
/// reading once and writes the answers into a small SQLite catalog that any
/// later tool can query.
///
/// ## The Pipeline
///
/// **Discovery** walks the configured roots and yields every `.ttf`, `.otf`,
/// `.ttc` and `.otc` file, lazily and in order.
///
/// **Face enumeration** opens index 0, 1, 2… of each file until the font
/// engine says the index does not exist. Faces that fail to open are logged
/// and skipped; the probing carries on.
///
/// **Feature extraction** uses the presence of a `GDEF` table as the signal
/// that a face carries OpenType layout, then collects the union of the
/// feature tags declared in `GSUB` and `GPOS`.
///
/// **The catalog** records one row per face with at least one feature and
/// one row per tag, all inside a single batch that lands on disk only when
/// the run completes.
///
/// ## A Sample Run
///
/// ```rust,no_run
/// use fontfeat_core::config::IngestConfig;
/// use fontfeat_core::ingest::build_catalog;
/// use fontfeat_core::report::RunReporter;
///
/// let config = IngestConfig::new(["/usr/share/fonts"]).catalog_path("fonts.db");
/// let outcome = build_catalog(&config, RunReporter::new(std::io::stdout()))?;
///
/// println!(
///     "{} faces cataloged with {} feature rows",
///     outcome.summary.faces_cataloged, outcome.summary.feature_records_written
/// );
/// #
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
///
/// ## The Cast of Characters
///
/// - [`discovery::PathDiscovery`]: the walker
/// - [`engine::FontEngine`]: the seam to the font parser, with
///   [`engine::FontationsEngine`] as the read-fonts implementation
/// - [`features::extract_features`]: the classifier
/// - [`catalog::CatalogStore`] and [`catalog::CatalogReader`]: writing and
///   reading the catalog
/// - [`report::RunReporter`]: progress lines and the closing summary
///
/// ---
///
/// Crafted with care at FontLab https://www.fontlab.com/

pub mod catalog;
pub mod config;
pub mod discovery;
pub mod engine;
pub mod error;
pub mod features;
pub mod ingest;
pub mod output;
pub mod report;
pub mod tags;
