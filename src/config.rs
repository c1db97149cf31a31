use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

pub const DEFAULT_ORIGIN: &str = "https://harrypotter.fandom.com";

pub const DEFAULT_SEEDS: &[&str] = &[
    "https://harrypotter.fandom.com/pt-br/wiki/Harry_Potter_e_a_Pedra_Filosofal",
    "https://harrypotter.fandom.com/pt-br/wiki/Harry_Potter_e_a_C%C3%A2mara_Secreta",
    "https://harrypotter.fandom.com/pt-br/wiki/Harry_Potter_e_o_Prisioneiro_de_Azkaban",
    "https://harrypotter.fandom.com/pt-br/wiki/Harry_Potter_e_o_C%C3%A1lice_de_Fogo",
    "https://harrypotter.fandom.com/pt-br/wiki/Harry_Potter_e_a_Ordem_da_F%C3%AAnix",
    "https://harrypotter.fandom.com/pt-br/wiki/Harry_Potter_e_o_Enigma_do_Pr%C3%ADncipe",
    "https://harrypotter.fandom.com/pt-br/wiki/Harry_Potter_e_as_Rel%C3%ADquias_da_Morte",
];

/// The author has an info-box on the wiki but is not a character.
pub const DEFAULT_EXCLUDED_NAME: &str = "Joanne Rowling";

const CONFIG_FILE: &str = "wiki_characters";
const ENV_PREFIX: &str = "WIKI";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Origin that path-only links are resolved against.
    pub origin: String,
    /// Book pages the crawl starts from.
    pub seeds: Vec<String>,
    /// Maximum number of requests in flight.
    pub concurrency: usize,
    pub timeout_secs: u64,
    pub user_agent: String,
    pub excluded_name: String,
    pub csv_path: Option<PathBuf>,
    pub csv_delimiter: char,
    pub db_path: Option<PathBuf>,
    pub db_table: String,
    pub checkpoint_path: Option<PathBuf>,
    pub progress: bool,
    /// Fold accented label text ("Informações" -> "Informacoes") before using it as a key.
    pub fold_label_accents: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            origin: DEFAULT_ORIGIN.to_string(),
            seeds: DEFAULT_SEEDS.iter().map(|s| s.to_string()).collect(),
            concurrency: 16,
            timeout_secs: 30,
            user_agent: concat!("wiki_characters/", env!("CARGO_PKG_VERSION")).to_string(),
            excluded_name: DEFAULT_EXCLUDED_NAME.to_string(),
            csv_path: Some(PathBuf::from("personagens.csv")),
            csv_delimiter: ';',
            db_path: Some(PathBuf::from("data/personagens.sqlite")),
            db_table: "personagens".to_string(),
            checkpoint_path: Some(PathBuf::from("href_personagens.txt")),
            progress: true,
            fold_label_accents: false,
        }
    }
}

impl Settings {
    /// Layered load: defaults, then `wiki_characters.{toml,yaml,json}` if present,
    /// then `WIKI_*` environment variables.
    pub fn load() -> Result<Self> {
        Self::load_from(Path::new(CONFIG_FILE))
    }

    pub fn load_from(file: &Path) -> Result<Self> {
        let file_name = file.to_string_lossy();
        let settings = config::Config::builder()
            .add_source(config::File::with_name(&file_name).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("seeds"),
            )
            .build()
            .context("Failed to read configuration")?;

        let settings: Settings = settings
            .try_deserialize()
            .context("Invalid configuration")?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        let origin = url::Url::parse(&self.origin)
            .with_context(|| format!("origin is not a valid URL: {}", self.origin))?;
        if !matches!(origin.scheme(), "http" | "https") {
            anyhow::bail!("origin must be http/https: {}", self.origin);
        }
        if self.concurrency == 0 {
            anyhow::bail!("concurrency must be at least 1");
        }
        if self.db_table.is_empty() {
            anyhow::bail!("db_table must not be empty");
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Origin without a trailing slash, ready to prefix `/path` links.
    pub fn origin(&self) -> &str {
        self.origin.trim_end_matches('/')
    }
}

/// Read seed URLs from a file: one per line, blank lines and `#` comments skipped.
pub fn read_seeds(path: &Path) -> Result<Vec<String>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read seeds file {}", path.display()))?;
    Ok(text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .map(str::to_string)
        .collect())
}
