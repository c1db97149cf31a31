use scraper::{ElementRef, Html, Selector};

/// Parsed, read-only view of one HTML page.
pub struct Document {
    html: Html,
}

impl Document {
    /// html5ever recovers from any input, so parsing itself cannot fail.
    pub fn parse(markup: &str) -> Self {
        Self {
            html: Html::parse_document(markup),
        }
    }

    pub fn select<'a>(&'a self, selector: &'a Selector) -> impl Iterator<Item = ElementRef<'a>> + 'a {
        self.html.select(selector)
    }

    pub fn first<'a>(&'a self, selector: &'a Selector) -> Option<ElementRef<'a>> {
        self.html.select(selector).next()
    }

    /// Trimmed text of every element matching `selector`.
    pub fn texts<'a>(&'a self, selector: &'a Selector) -> impl Iterator<Item = String> + 'a {
        self.select(selector).map(|el| text_of(el).trim().to_string())
    }
}

/// Concatenated descendant text, untrimmed.
pub fn text_of(el: ElementRef<'_>) -> String {
    el.text().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn texts_are_trimmed() {
        let doc = Document::parse("<ul><li> a </li><li>b<b>c</b></li></ul>");
        let li = Selector::parse("li").unwrap();
        assert_eq!(doc.texts(&li).collect::<Vec<_>>(), vec!["a", "bc"]);
    }

    #[test]
    fn garbage_still_parses() {
        let doc = Document::parse("<<<>>> not really html");
        let p = Selector::parse("p").unwrap();
        assert!(doc.first(&p).is_none());
    }
}
