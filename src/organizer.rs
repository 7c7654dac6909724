// src/organizer.rs
//! Batch loop: resolve, plan and materialize one folder at a time

use crate::fetcher::Transport;
use crate::materialize::{self, Materializer};
use crate::planner;
use crate::queue::QueueEntry;
use crate::resolver::{MetadataRecord, Outcome, Resolver};
use crate::summary::RunReport;
use crate::templates;
use anyhow::Result;
use log::{error, info};
use std::path::{Path, PathBuf};

/// What to do with a folder once its metadata is resolved
#[derive(Debug, Clone, Default)]
pub struct Options {
    /// `None` puts books in a sibling `default_output_name` folder
    pub output_dir: Option<PathBuf>,
    pub default_output_name: String,
    pub flatten: bool,
    /// Rendered into `metadata.opf` when set
    pub opf_template: Option<String>,
    pub infotxt: bool,
}

pub struct Organizer<T: Transport> {
    resolver: Resolver<T>,
    materializer: Materializer,
    options: Options,
}

impl<T: Transport> Organizer<T> {
    pub fn new(resolver: Resolver<T>, materializer: Materializer, options: Options) -> Self {
        Self {
            resolver,
            materializer,
            options,
        }
    }

    /// Process the whole queue in order; a failed folder never stops the run
    pub async fn run(&self, queue: &[QueueEntry], report: &mut RunReport) {
        for (i, entry) in queue.iter().enumerate() {
            println!("\n📚 [{}/{}] {}", i + 1, queue.len(), entry.folder.display());
            self.process_folder(entry, report).await;
        }
    }

    pub async fn process_folder(&self, entry: &QueueEntry, report: &mut RunReport) -> MetadataRecord {
        let mut record = self.resolver.resolve(&entry.folder, &entry.url).await;

        match record.outcome() {
            Some(Outcome::Skipped) => {
                report.skip(&record.input_folder);
                return record;
            }
            Some(Outcome::Failed) => {
                let reason = record.failure_reason.clone().unwrap_or_default();
                report.fail(&record.input_folder, reason);
                return record;
            }
            _ => {}
        }

        let root = planner::output_root(
            &entry.folder,
            self.options.output_dir.as_deref(),
            &self.options.default_output_name,
        );
        let dest = planner::plan(&record, &root);

        match self.finish(&record, &entry.folder, &dest) {
            Ok(()) => {
                info!("Organized {} -> {}", entry.folder.display(), dest.display());
                record.final_output = Some(dest.clone());
                report.succeed(&record.input_folder, &dest);
            }
            Err(e) => {
                error!("Failed to organize {}: {:#}", entry.folder.display(), e);
                println!("❌ {:#}", e);
                record.mark_failed(format!("{:#}", e));
                report.fail(&record.input_folder, format!("{:#}", e));
            }
        }

        record
    }

    fn finish(&self, record: &MetadataRecord, source: &Path, dest: &Path) -> Result<()> {
        self.materializer.materialize(source, dest)?;

        if self.options.flatten {
            let (_, title) = planner::segments(record);
            materialize::flatten(dest, &title)?;
        }

        if let Some(template) = &self.options.opf_template {
            templates::write_opf(template, record, dest)?;
        }

        if self.options.infotxt {
            templates::write_info(record, dest)?;
        }

        Ok(())
    }
}
