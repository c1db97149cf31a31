use std::borrow::Cow;
use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Selector};

use super::document::text_of;
use super::Document;
use crate::error::ExtractError;
use crate::record::{CharacterRecord, FieldValue};

static TITLE: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("h2.pi-item.pi-item-spacing.pi-title.pi-secondary-background").unwrap()
});
static DATA_LABEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("h3.pi-data-label.pi-secondary-font").unwrap());
static DATA_VALUE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("div.pi-data-value.pi-font").unwrap());
static LIST_ITEM: LazyLock<Selector> = LazyLock::new(|| Selector::parse("li").unwrap());

static CITATION_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\[[^\]]*\]").unwrap());

#[derive(Debug, Clone, Copy, Default)]
pub struct ExtractOptions {
    pub fold_label_accents: bool,
}

/// Map a character page's info-box into a record.
///
/// Labels and values carry no explicit link in the markup, so the i-th label is
/// paired with the i-th value; surplus labels or values are dropped.
pub fn extract_record(
    doc: &Document,
    url: &str,
    opts: &ExtractOptions,
) -> Result<CharacterRecord, ExtractError> {
    let name = doc
        .first(&TITLE)
        .map(|el| clean_text(&text_of(el)))
        .filter(|n| !n.is_empty())
        .ok_or_else(|| ExtractError::MissingName {
            url: url.to_string(),
        })?;

    let mut record = CharacterRecord::new(name, url);

    let labels = doc.select(&DATA_LABEL).map(|el| {
        let label = clean_text(&text_of(el));
        if opts.fold_label_accents {
            fold_accents(&label).into_owned()
        } else {
            label
        }
    });
    let values = doc.select(&DATA_VALUE).map(field_value);

    for (label, value) in labels.zip(values) {
        if label.is_empty() {
            continue;
        }
        record.insert_field(label, value);
    }

    Ok(record)
}

fn field_value(el: ElementRef<'_>) -> FieldValue {
    let mut items = el.select(&LIST_ITEM).peekable();
    if items.peek().is_none() {
        return FieldValue::Text(clean_text(&text_of(el)));
    }
    FieldValue::List(
        items
            .map(|li| clean_text(&text_of(li)))
            .filter(|s| !s.is_empty())
            .collect(),
    )
}

/// Remove bracketed citation markers ("[4]", "[nota 1]") and surrounding whitespace.
pub fn clean_text(s: &str) -> String {
    CITATION_RE.replace_all(s, "").trim().to_string()
}

/// Strip diacritics from the Latin letters that appear in Portuguese labels.
pub fn fold_accents(s: &str) -> Cow<'_, str> {
    if s.is_ascii() {
        return Cow::Borrowed(s);
    }
    Cow::Owned(
        s.chars()
            .map(|c| match c {
                'á' | 'à' | 'â' | 'ã' | 'ä' => 'a',
                'Á' | 'À' | 'Â' | 'Ã' | 'Ä' => 'A',
                'é' | 'è' | 'ê' | 'ë' => 'e',
                'É' | 'È' | 'Ê' | 'Ë' => 'E',
                'í' | 'ì' | 'î' | 'ï' => 'i',
                'Í' | 'Ì' | 'Î' | 'Ï' => 'I',
                'ó' | 'ò' | 'ô' | 'õ' | 'ö' => 'o',
                'Ó' | 'Ò' | 'Ô' | 'Õ' | 'Ö' => 'O',
                'ú' | 'ù' | 'û' | 'ü' => 'u',
                'Ú' | 'Ù' | 'Û' | 'Ü' => 'U',
                'ç' => 'c',
                'Ç' => 'C',
                'ñ' => 'n',
                'Ñ' => 'N',
                other => other,
            })
            .collect(),
    )
}
