use indexmap::IndexSet;
use rayon::prelude::*;

use super::{Pipeline, Stage, StageReport};
use crate::error::UnitError;
use crate::fetch::Fetcher;
use crate::parser::{extract_links, Document};

/// Fetch every seed and collect its paragraph links.
///
/// Returns the de-duplicated union in seed order, then first-seen order within
/// a seed.
pub(super) async fn run<F: Fetcher + 'static>(
    pipeline: &Pipeline<F>,
    seeds: &[String],
) -> (Vec<String>, StageReport) {
    let mut report = StageReport::new(Stage::Discover, seeds.len());
    let fetched = pipeline.fetch_all(seeds, Stage::Discover).await;

    let per_seed: Vec<Result<Vec<String>, UnitError>> = fetched
        .par_iter()
        .map(|markup| {
            let markup = markup.as_ref().map_err(|e| UnitError::from(e.clone()))?;
            let doc = Document::parse(markup);
            Ok(extract_links(&doc, &pipeline.origin))
        })
        .collect();

    let mut candidates = IndexSet::new();
    for (seed, links) in seeds.iter().zip(per_seed) {
        match links {
            Ok(links) => {
                tracing::debug!(seed = %seed, links = links.len(), "seed analysed");
                candidates.extend(links);
            }
            Err(e) => report.fail(seed, e),
        }
    }

    report.outputs = candidates.len();
    (candidates.into_iter().collect(), report)
}

#[cfg(test)]
mod tests {
    use super::super::tests::*;
    use super::*;

    #[tokio::test]
    async fn union_of_seeds_is_deduplicated() {
        let other_book = "https://harrypotter.fandom.com/pt-br/wiki/Harry_Potter_e_a_C%C3%A2mara_Secreta";
        let second = r#"<div class="mw-parser-output">
            <p><a href="/pt-br/wiki/Dobby">Dobby</a> avisa <a href="/pt-br/wiki/Gina_Weasley">Gina</a>.</p>
        </div>"#;
        let p = pipeline(wiki().page(other_book, second));

        let (links, report) = run(&p, &[BOOK.to_string(), other_book.to_string()]).await;

        assert_eq!(
            links,
            vec![
                HARRY.to_string(),
                DOBBY.to_string(),
                HOGWARTS.to_string(),
                "https://harrypotter.fandom.com/pt-br/wiki/Gina_Weasley".to_string(),
            ]
        );
        assert_eq!(report.inputs, 2);
        assert_eq!(report.outputs, 4);
        assert!(report.failures.is_empty());
    }
}
