pub mod classify;
pub mod document;
pub mod infobox;
pub mod links;

pub use classify::{has_marker_section, is_character_page, Marker};
pub use document::Document;
pub use infobox::{clean_text, extract_record, ExtractOptions};
pub use links::{extract_links, normalize_link};
