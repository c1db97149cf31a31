use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};
use indexmap::IndexSet;

/// Save verified links, one per line, so extraction can resume without
/// re-crawling.
pub fn save_links(path: &Path, links: &[String]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let file = File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
    let mut w = BufWriter::new(file);
    for link in links {
        writeln!(w, "{}", link)?;
    }
    w.flush()
        .with_context(|| format!("Failed to write {}", path.display()))
}

/// Load a link file; blank lines and `#` comments are skipped, duplicates dropped.
pub fn load_links(path: &Path) -> Result<Vec<String>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read link checkpoint {}", path.display()))?;
    let links: IndexSet<String> = text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .map(str::to_string)
        .collect();
    Ok(links.into_iter().collect())
}
