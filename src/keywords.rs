use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use std::time::Instant;
use tracing::{info, warn};

// Include default keywords at compile time
const DEFAULT_KEYWORDS_BYTES: &[u8] = include_bytes!("../default_cleanup_keywords.txt");

pub const KEYWORD_FILE: &str = "cleanup_keywords.txt";

fn parse_keyword_lines(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect()
}

pub fn default_cleanup_keywords() -> Result<Vec<String>> {
    let default_content = std::str::from_utf8(DEFAULT_KEYWORDS_BYTES)
        .context("Failed to decode embedded default keywords")?;
    Ok(parse_keyword_lines(default_content))
}

/// Resolve the body-cleanup keyword list: explicit file, then
/// `cleanup_keywords.txt` in the working directory, then embedded defaults.
pub fn load_cleanup_keywords(keyword_file_path: Option<&Path>) -> Result<Vec<String>> {
    let start_time = Instant::now();
    info!(
        action = "start",
        component = "keyword_loading",
        "Starting cleanup keyword loading"
    );

    let mut keywords = Vec::new();

    if let Some(path) = keyword_file_path {
        info!(action = "load", component = "keyword_file", file_path = ?path, "Loading keywords from specified file");
        if !path.exists() {
            anyhow::bail!("Keyword file not found: {:?}", path);
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read keyword file {:?}", path))?;
        keywords = parse_keyword_lines(&content);
        if keywords.is_empty() {
            anyhow::bail!("Keyword file {:?} contains no keywords", path);
        }
        info!(action = "loaded", component = "keyword_file", keyword_count = keywords.len(), file_path = ?path, "Loaded keywords from file");
    } else {
        let default_file = Path::new(KEYWORD_FILE);
        if default_file.exists() {
            info!(action = "load", component = "default_keyword_file", file_path = ?default_file, "Loading keywords from default file");
            match fs::read_to_string(default_file) {
                Ok(content) => keywords = parse_keyword_lines(&content),
                Err(e) => {
                    warn!(action = "read", component = "default_keyword_file", error = %e, "Unreadable keyword file")
                }
            }
            info!(action = "loaded", component = "default_keyword_file", keyword_count = keywords.len(), file_path = ?default_file, "Loaded keywords from default file");
        }

        if keywords.is_empty() {
            info!(
                action = "load",
                component = "embedded_keywords",
                "Using embedded default keywords"
            );
            keywords = default_cleanup_keywords()?;
        }
    }

    info!(
        action = "complete",
        component = "keyword_loading",
        keyword_count = keywords.len(),
        duration_ms = start_time.elapsed().as_millis(),
        "Cleanup keywords ready"
    );
    Ok(keywords)
}

pub fn init_default_keywords() -> Result<()> {
    init_default_keywords_at(Path::new(KEYWORD_FILE))
}

pub fn init_default_keywords_at(target: &Path) -> Result<()> {
    if target.exists() {
        anyhow::bail!(
            "{} already exists. Remove it first if you want to reinitialize.",
            target.display()
        );
    }

    let default_content = std::str::from_utf8(DEFAULT_KEYWORDS_BYTES)
        .context("Failed to decode embedded default keywords")?;

    fs::write(target, default_content)?;
    println!("Created {} with default cleanup keywords", target.display());

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_keywords() {
        let keywords = default_cleanup_keywords().unwrap();
        assert_eq!(
            keywords,
            vec!["kind regards", "best regards", "thanks", "thank you", "sincerely"]
        );
    }

    #[test]
    fn test_parse_skips_comments_and_blanks() {
        let parsed = parse_keyword_lines("# header\n\n  cheers  \nregards\n");
        assert_eq!(parsed, vec!["cheers", "regards"]);
    }

    #[test]
    fn test_load_from_explicit_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("kw.txt");
        fs::write(&path, "cheers\n").unwrap();
        assert_eq!(load_cleanup_keywords(Some(&path)).unwrap(), vec!["cheers"]);
    }

    #[test]
    fn test_load_missing_file_fails() {
        let dir = TempDir::new().unwrap();
        assert!(load_cleanup_keywords(Some(&dir.path().join("nope.txt"))).is_err());
    }

    #[test]
    fn test_init_refuses_overwrite() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join(KEYWORD_FILE);
        init_default_keywords_at(&target).unwrap();
        assert!(target.exists());
        assert!(init_default_keywords_at(&target).is_err());
    }
}
