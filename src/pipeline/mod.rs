mod discover;
mod extract;
mod verify;

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};

use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::Semaphore;
use tracing::{info, warn};

use crate::cache::{CacheStats, FetchCache};
use crate::config::Settings;
use crate::error::{FetchError, UnitError};
use crate::fetch::Fetcher;
use crate::parser::ExtractOptions;
use crate::record::RecordSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Discover,
    Verify,
    Extract,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Discover => "discover",
            Stage::Verify => "verify",
            Stage::Extract => "extract",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitFailure {
    pub url: String,
    pub error: UnitError,
}

/// What one stage consumed, produced and skipped.
#[derive(Debug, Clone)]
pub struct StageReport {
    pub stage: Stage,
    pub inputs: usize,
    pub outputs: usize,
    pub failures: Vec<UnitFailure>,
}

impl StageReport {
    fn new(stage: Stage, inputs: usize) -> Self {
        Self {
            stage,
            inputs,
            outputs: 0,
            failures: Vec::new(),
        }
    }

    fn fail(&mut self, url: &str, error: impl Into<UnitError>) {
        let error = error.into();
        warn!(stage = %self.stage, url, %error, "skipping");
        self.failures.push(UnitFailure {
            url: url.to_string(),
            error,
        });
    }

    fn log(&self) {
        info!(
            stage = %self.stage,
            inputs = self.inputs,
            outputs = self.outputs,
            failures = self.failures.len(),
            "stage finished"
        );
    }
}

/// Discover + Verify result; `verified` is what a checkpoint file holds.
#[derive(Debug, Clone)]
pub struct LinkOutcome {
    pub candidates: Vec<String>,
    pub verified: Vec<String>,
    pub discover: StageReport,
    pub verify: StageReport,
}

#[derive(Debug, Clone)]
pub struct ExtractOutcome {
    pub records: RecordSet,
    pub extract: StageReport,
}

#[derive(Debug, Clone)]
pub struct PipelineOutcome {
    pub links: LinkOutcome,
    pub records: RecordSet,
    pub extract: StageReport,
    pub cache: CacheStats,
}

impl PipelineOutcome {
    pub fn reports(&self) -> [&StageReport; 3] {
        [&self.links.discover, &self.links.verify, &self.extract]
    }
}

/// `Discover -> Verify -> Extract -> Finalize` over an injected cache.
///
/// Each stage resolves every fetch for its full input set before doing its
/// pure work, and the next stage only starts once that is done.
pub struct Pipeline<F> {
    cache: Arc<FetchCache<F>>,
    origin: String,
    concurrency: usize,
    excluded_name: String,
    extract_opts: ExtractOptions,
    progress: bool,
    // Verdict per link already classified in this pipeline.
    checked: Mutex<HashMap<String, bool>>,
}

impl<F: Fetcher + 'static> Pipeline<F> {
    pub fn new(cache: Arc<FetchCache<F>>, settings: &Settings) -> Self {
        Self {
            cache,
            origin: settings.origin().to_string(),
            concurrency: settings.concurrency.max(1),
            excluded_name: settings.excluded_name.clone(),
            extract_opts: ExtractOptions {
                fold_label_accents: settings.fold_label_accents,
            },
            progress: settings.progress,
            checked: Mutex::new(HashMap::new()),
        }
    }

    pub async fn run(&self, seeds: &[String]) -> PipelineOutcome {
        let links = self.collect_links(seeds).await;
        let ExtractOutcome { records, extract } = self.extract_from(&links.verified).await;
        PipelineOutcome {
            links,
            records,
            extract,
            cache: self.cache.stats(),
        }
    }

    pub async fn collect_links(&self, seeds: &[String]) -> LinkOutcome {
        info!(seeds = seeds.len(), "discovering links");
        let (candidates, discover) = discover::run(self, seeds).await;
        discover.log();

        info!(candidates = candidates.len(), "verifying links");
        let (verified, verify) = verify::run(self, &candidates).await;
        verify.log();

        LinkOutcome {
            candidates,
            verified,
            discover,
            verify,
        }
    }

    pub async fn extract_from(&self, links: &[String]) -> ExtractOutcome {
        info!(links = links.len(), "extracting records");
        let (records, extract) = extract::run(self, links).await;
        extract.log();

        let records = RecordSet::finalize(records, &self.excluded_name);
        info!(records = records.len(), "finalized record set");
        ExtractOutcome { records, extract }
    }

    pub fn cache(&self) -> &FetchCache<F> {
        &self.cache
    }

    /// Fetch every URL through the cache, at most `concurrency` at a time.
    /// Results come back in input order.
    async fn fetch_all(&self, urls: &[String], stage: Stage) -> Vec<Result<Arc<str>, FetchError>> {
        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let pb = self.progress_bar(urls.len(), stage);
        let (tx, mut rx) = tokio::sync::mpsc::channel(self.concurrency * 2);

        for (idx, url) in urls.iter().enumerate() {
            let cache = Arc::clone(&self.cache);
            let sem = Arc::clone(&semaphore);
            let tx = tx.clone();
            let url = url.clone();

            tokio::spawn(async move {
                let Ok(_permit) = sem.acquire().await else {
                    return;
                };
                let result = cache.get_or_fetch(&url).await;
                let _ = tx.send((idx, result)).await;
            });
        }

        // rx closes once every task has sent or gone away
        drop(tx);

        let mut slots: Vec<Option<Result<Arc<str>, FetchError>>> = vec![None; urls.len()];
        while let Some((idx, result)) = rx.recv().await {
            slots[idx] = Some(result);
            pb.inc(1);
        }
        pb.finish_and_clear();

        slots
            .into_iter()
            .zip(urls)
            .map(|(slot, url)| {
                slot.unwrap_or_else(|| {
                    Err(FetchError::Transport {
                        url: url.clone(),
                        message: "fetch task ended without a result".to_string(),
                    })
                })
            })
            .collect()
    }

    fn progress_bar(&self, len: usize, stage: Stage) -> ProgressBar {
        if !self.progress {
            return ProgressBar::hidden();
        }
        let pb = ProgressBar::new(len as u64);
        if let Ok(style) = ProgressStyle::default_bar()
            .template("{msg:>8} [{elapsed_precise}] {bar:40} {pos}/{len} ({per_sec}, eta {eta})")
        {
            pb.set_style(style.progress_chars("=> "));
        }
        pb.set_message(stage.to_string());
        pb
    }
}
