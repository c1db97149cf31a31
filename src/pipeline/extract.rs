use indexmap::IndexSet;
use rayon::prelude::*;

use super::{Pipeline, Stage, StageReport};
use crate::error::UnitError;
use crate::fetch::Fetcher;
use crate::parser::{extract_record, Document};
use crate::record::CharacterRecord;

/// Build one record per verified link. Pages that fail to fetch or have no
/// name heading are skipped and reported.
pub(super) async fn run<F: Fetcher + 'static>(
    pipeline: &Pipeline<F>,
    links: &[String],
) -> (Vec<CharacterRecord>, StageReport) {
    let unique: Vec<String> = links
        .iter()
        .cloned()
        .collect::<IndexSet<_>>()
        .into_iter()
        .collect();
    let mut report = StageReport::new(Stage::Extract, unique.len());

    let fetched = pipeline.fetch_all(&unique, Stage::Extract).await;
    let results: Vec<Result<CharacterRecord, UnitError>> = fetched
        .par_iter()
        .zip(unique.par_iter())
        .map(|(markup, url)| {
            let markup = markup.as_ref().map_err(|e| UnitError::from(e.clone()))?;
            let doc = Document::parse(markup);
            extract_record(&doc, url, &pipeline.extract_opts).map_err(UnitError::from)
        })
        .collect();

    let mut records = Vec::with_capacity(results.len());
    for (url, result) in unique.iter().zip(results) {
        match result {
            Ok(record) => records.push(record),
            Err(e) => report.fail(url, e),
        }
    }

    report.outputs = records.len();
    (records, report)
}
