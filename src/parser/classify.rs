use std::sync::LazyLock;

use scraper::Selector;

use super::Document;

static DATA_LABEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("h3.pi-data-label.pi-secondary-font").unwrap());
static SECTION_HEADER: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(
        "h2.pi-item.pi-header.pi-secondary-font.pi-item-spacing.pi-secondary-background > center",
    )
    .unwrap()
});

/// Info-box sections whose presence marks a character page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Marker {
    /// Birth-date row label.
    Birth,
    /// "Biographical information" section header.
    Biography,
}

impl Marker {
    pub const ALL: [Marker; 2] = [Marker::Birth, Marker::Biography];

    pub fn label(self) -> &'static str {
        match self {
            Marker::Birth => "Nascimento",
            Marker::Biography => "Informações biográficas",
        }
    }

    fn selector(self) -> &'static Selector {
        match self {
            Marker::Birth => &DATA_LABEL,
            Marker::Biography => &SECTION_HEADER,
        }
    }
}

pub fn has_marker_section(doc: &Document, marker: Marker) -> bool {
    doc.texts(marker.selector()).any(|t| t == marker.label())
}

pub fn is_character_page(doc: &Document) -> bool {
    Marker::ALL.iter().any(|&m| has_marker_section(doc, m))
}
