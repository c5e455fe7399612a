use std::collections::HashSet;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use tracing::info;

use crate::checkpoint::{CheckpointState, CheckpointStore};
use crate::crawler::{CrawlStats, ThreadCrawler};
use crate::db::{self, TableStore};
use crate::discovery::{filter_since, ThreadDiscoverer};
use crate::error::CrawlError;
use crate::extract::extract_record;
use crate::models::StructuredRecord;
use crate::parser::HnParser;
use crate::sanitize::sanitize;
use crate::settings::Settings;
use crate::transport::Fetch;

const EXTRACT_CHUNK: usize = 500;
const PREVIEW_ROWS: usize = 5;

fn progress_bar(len: usize) -> ProgressBar {
    let pb = ProgressBar::new(len as u64);
    if let Ok(style) = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
    {
        pb.set_style(style.progress_chars("#>-"));
    }
    pb
}

// ── Crawl ──

/// Discover threads, then crawl every one dated on or after `settings.since`.
///
/// `state` is borrowed so the caller can still save it if this future is
/// dropped on interrupt.
pub async fn run_crawl<F: Fetch>(
    fetcher: &mut F,
    settings: &Settings,
    checkpoint: &CheckpointStore,
    state: &mut CheckpointState,
) -> Result<CrawlStats, CrawlError> {
    info!(
        "Resuming with {} threads already processed",
        state.processed_thread_ids.len()
    );

    let parser = HnParser::new(&settings.base_url);
    let tables = TableStore::new(&settings.data_dir);

    let threads = ThreadDiscoverer::new(&mut *fetcher, &parser, checkpoint, settings)
        .discover(state)
        .await?;

    let targets = filter_since(&threads, settings.since);
    info!(
        "Processing {} of {} threads from {} on",
        targets.len(),
        threads.len(),
        settings.since
    );

    ThreadCrawler::new(fetcher, &parser, &tables, checkpoint, settings)
        .with_progress(progress_bar(targets.len()))
        .crawl(&targets, state)
        .await
}

pub fn merge(settings: &Settings) -> Result<Option<(PathBuf, usize)>> {
    info!("Merging all thread data");
    TableStore::new(&settings.data_dir).merge_and_dedupe()
}

// ── Transform ──

pub struct TransformSummary {
    pub input: PathBuf,
    pub loaded: usize,
    pub sanitized: usize,
    pub extracted: usize,
    pub with_salary: usize,
    /// Output path, unless this was a sample run.
    pub output: Option<PathBuf>,
    pub preview: Vec<StructuredRecord>,
}

impl TransformSummary {
    pub fn print(&self) {
        println!(
            "Loaded {} rows from {:?}, {} left after sanitation.",
            self.loaded, self.input, self.sanitized
        );
        println!(
            "Extracted {} records ({} with salary).",
            self.extracted, self.with_salary
        );
        match &self.output {
            Some(path) => println!("Saved to {:?}", path),
            None => {
                println!("Sample run, nothing written. First rows:");
                for r in &self.preview {
                    println!(
                        "  {} | {} | {} | {} | [{}]",
                        r.id,
                        r.company_name.as_deref().unwrap_or("-"),
                        r.job_category,
                        r.salary_avg
                            .map(|s| format!("{} {}", s, r.currency.map_or("", |c| c.as_str())))
                            .unwrap_or_else(|| "-".into()),
                        r.tech_stack.iter().cloned().collect::<Vec<_>>().join(", ")
                    );
                }
            }
        }
    }
}

/// Sanitize then extract. With `sample`, only the first N sanitized rows are
/// processed and nothing is written.
pub fn run_transform(
    settings: &Settings,
    input: Option<&Path>,
    output: Option<&Path>,
    sample: Option<usize>,
) -> Result<TransformSummary> {
    let input = match input {
        Some(p) => p.to_path_buf(),
        None => TableStore::new(&settings.data_dir)
            .latest_merged()?
            .context("No merged raw dataset found. Run 'crawl' first.")?,
    };
    info!("Loading data from {:?}", input);
    let raw = db::load_raw(&input)?;
    let loaded = raw.len();

    let mut rows = sanitize(raw, settings.min_record_length);
    let sanitized = rows.len();
    if let Some(n) = sample {
        info!("Running on a sample of {} rows", n);
        rows.truncate(n);
    }

    let rules = settings.extraction_rules();
    let pb = progress_bar(rows.len());
    let mut records = Vec::with_capacity(rows.len());
    for chunk in rows.chunks(EXTRACT_CHUNK) {
        let extracted: Vec<StructuredRecord> =
            chunk.par_iter().map(|c| extract_record(c, &rules)).collect();
        records.extend(extracted);
        pb.inc(chunk.len() as u64);
    }
    pb.finish_and_clear();

    let with_salary = records.iter().filter(|r| r.salary_min.is_some()).count();
    let mut summary = TransformSummary {
        input,
        loaded,
        sanitized,
        extracted: records.len(),
        with_salary,
        output: None,
        preview: Vec::new(),
    };

    if sample.is_some() {
        summary.preview = records.into_iter().take(PREVIEW_ROWS).collect();
        return Ok(summary);
    }

    let output = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| settings.structured_path());
    let written = db::save_structured(&output, &records)?;
    info!("Saved {} structured records to {:?}", written, output);
    summary.output = Some(output);
    Ok(summary)
}

// ── Stats ──

pub struct DataStats {
    pub processed_threads: usize,
    pub cached_threads: Option<usize>,
    pub discovery_incomplete: bool,
    pub partitions: usize,
    pub stored_ids: usize,
    pub merged_files: usize,
    pub structured_rows: Option<usize>,
}

impl DataStats {
    pub fn print(&self) {
        println!("Processed threads: {}", self.processed_threads);
        match self.cached_threads {
            Some(n) if self.discovery_incomplete => println!("Cached threads:    {} (discovery incomplete)", n),
            Some(n) => println!("Cached threads:    {}", n),
            None => println!("Cached threads:    -"),
        }
        println!("Thread files:      {}", self.partitions);
        println!("Merged files:      {}", self.merged_files);
        println!("Stored comments:   {}", self.stored_ids);
        match self.structured_rows {
            Some(n) => println!("Structured rows:   {}", n),
            None => println!("Structured rows:   -"),
        }
    }
}

pub fn stats(settings: &Settings) -> Result<DataStats> {
    let state = CheckpointStore::new(settings.checkpoint_path()).load();
    let tables = TableStore::new(&settings.data_dir);

    let mut ids: HashSet<String> = tables
        .load_all_partitions()?
        .into_iter()
        .map(|r| r.id)
        .collect();
    ids.extend(tables.scan_existing_ids()?);

    let structured = settings.structured_path();
    let structured_rows = if structured.exists() {
        Some(db::count_rows(&structured, "jobs")?)
    } else {
        None
    };

    Ok(DataStats {
        processed_threads: state.processed_thread_ids.len(),
        cached_threads: state.cached_thread_list.as_ref().map(Vec::len),
        discovery_incomplete: state.discovery_cursor.is_some(),
        partitions: tables.partition_files()?.len(),
        stored_ids: ids.len(),
        merged_files: tables.merged_files()?.len(),
        structured_rows,
    })
}

// ── Tests ──
