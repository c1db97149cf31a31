use indexmap::IndexSet;
use rayon::prelude::*;
use tracing::debug;

use super::{Pipeline, Stage, StageReport};
use crate::error::UnitError;
use crate::fetch::Fetcher;
use crate::parser::{is_character_page, Document};

/// Keep the candidates whose page has a birth label or a biography header.
///
/// Input is de-duplicated before any fetch, and a link classified earlier in
/// this pipeline reuses its verdict instead of being fetched again.
pub(super) async fn run<F: Fetcher + 'static>(
    pipeline: &Pipeline<F>,
    candidates: &[String],
) -> (Vec<String>, StageReport) {
    let unique: IndexSet<&String> = candidates.iter().collect();
    let mut report = StageReport::new(Stage::Verify, unique.len());

    let pending: Vec<String> = {
        let checked = pipeline.checked.lock().unwrap_or_else(|e| e.into_inner());
        unique
            .iter()
            .filter(|url| !checked.contains_key(url.as_str()))
            .map(|url| url.to_string())
            .collect()
    };
    debug!(
        pending = pending.len(),
        known = unique.len() - pending.len(),
        "verifying candidates"
    );

    let fetched = pipeline.fetch_all(&pending, Stage::Verify).await;
    let verdicts: Vec<Result<bool, UnitError>> = fetched
        .par_iter()
        .map(|markup| {
            let markup = markup.as_ref().map_err(|e| UnitError::from(e.clone()))?;
            Ok(is_character_page(&Document::parse(markup)))
        })
        .collect();

    {
        let mut checked = pipeline.checked.lock().unwrap_or_else(|e| e.into_inner());
        for (url, verdict) in pending.iter().zip(verdicts) {
            match verdict {
                Ok(qualifies) => {
                    checked.insert(url.clone(), qualifies);
                }
                Err(e) => report.fail(url, e),
            }
        }
    }

    let checked = pipeline.checked.lock().unwrap_or_else(|e| e.into_inner());
    let verified: Vec<String> = unique
        .into_iter()
        .filter(|url| checked.get(url.as_str()).copied().unwrap_or(false))
        .cloned()
        .collect();

    report.outputs = verified.len();
    (verified, report)
}
