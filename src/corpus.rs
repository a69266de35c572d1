//! Corpus discovery: deterministic filesystem enumeration of source
//! documents under the configured root, filtered by include/exclude globs.

use anyhow::{bail, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use walkdir::WalkDir;

use crate::config::CorpusConfig;
use crate::extract::content_type_for;
use crate::models::SourceDocument;

/// Enumerate all matching documents under the corpus root, reading their
/// full byte content. Output is sorted by relative path so indexing runs
/// are deterministic.
pub fn scan_corpus(config: &CorpusConfig) -> Result<Vec<SourceDocument>> {
    let root = &config.root;
    if !root.exists() {
        bail!("Corpus root does not exist: {}", root.display());
    }

    let include_set = build_globset(&config.include_globs)?;

    let mut default_excludes = vec![
        "**/.git/**".to_string(),
        "**/node_modules/**".to_string(),
        "**/target/**".to_string(),
    ];
    default_excludes.extend(config.exclude_globs.clone());
    let exclude_set = build_globset(&default_excludes)?;

    let mut docs = Vec::new();

    for entry in WalkDir::new(root) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let relative = path.strip_prefix(root).unwrap_or(path);
        let rel_str = relative.to_string_lossy().to_string();

        if exclude_set.is_match(&rel_str) || !include_set.is_match(&rel_str) {
            continue;
        }

        let bytes = std::fs::read(path)?;
        docs.push(SourceDocument {
            path: path.to_path_buf(),
            content_type: content_type_for(&rel_str).to_string(),
            rel_path: rel_str,
            bytes,
        });
    }

    docs.sort_by(|a, b| a.rel_path.cmp(&b.rel_path));
    Ok(docs)
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern)?);
    }
    Ok(builder.build()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn config(root: &std::path::Path) -> CorpusConfig {
        CorpusConfig {
            root: root.to_path_buf(),
            include_globs: vec!["**/*.txt".to_string(), "**/*.pdf".to_string()],
            exclude_globs: vec!["**/skip/**".to_string()],
        }
    }

    #[test]
    fn scan_is_sorted_and_filtered() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join("b.txt"), "beta").unwrap();
        fs::write(tmp.path().join("a.txt"), "alpha").unwrap();
        fs::write(tmp.path().join("c.rs"), "not included").unwrap();
        fs::create_dir_all(tmp.path().join("skip")).unwrap();
        fs::write(tmp.path().join("skip/d.txt"), "excluded").unwrap();

        let docs = scan_corpus(&config(tmp.path())).unwrap();
        let names: Vec<&str> = docs.iter().map(|d| d.rel_path.as_str()).collect();
        assert_eq!(names, vec!["a.txt", "b.txt"]);
        assert_eq!(docs[0].bytes, b"alpha");
        assert_eq!(docs[0].content_type, "text/plain");
    }

    #[test]
    fn missing_root_is_an_error() {
        let cfg = CorpusConfig {
            root: "/does/not/exist".into(),
            include_globs: vec!["**/*.txt".to_string()],
            exclude_globs: vec![],
        };
        assert!(scan_corpus(&cfg).is_err());
    }
}
