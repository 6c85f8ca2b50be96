//! `xmlcache info`: load a document and print a summary.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use owo_colors::OwoColorize;
use xmlcache::{CacheConfig, NodeKind, XmlCache};

pub fn show_info(file: &Path, config: CacheConfig) -> Result<()> {
    let mut cache = XmlCache::new(config);
    cache
        .load(file)
        .with_context(|| format!("cannot read {}", file.display()))?;

    for (label, value) in summarize(&cache) {
        let label = format!("{label:>10}");
        if label.trim() == "warning" {
            println!("{}: {value}", label.yellow());
        } else {
            println!("{}: {value}", label.bold());
        }
    }
    Ok(())
}

/// `(label, value)` pairs in display order.
fn summarize(cache: &XmlCache) -> Vec<(&'static str, String)> {
    let doc = cache.document();
    let mut lines = Vec::new();

    if let Some(path) = cache.path() {
        let suffix = if cache.is_read_only(path) {
            " (read-only)"
        } else {
            ""
        };
        lines.push(("file", format!("{}{suffix}", path.display())));
    }

    let root = doc
        .document_element()
        .and_then(|id| doc.name(id))
        .unwrap_or("-");
    lines.push(("root", root.to_string()));
    lines.push((
        "encoding",
        doc.declared_encoding().unwrap_or("-").to_string(),
    ));
    lines.push((
        "stylesheet",
        cache.xslt_reference().unwrap_or("-").to_string(),
    ));

    let mut counts: BTreeMap<&'static str, usize> = BTreeMap::new();
    for id in doc.descendants(doc.root()) {
        let Some(kind) = doc.kind(id) else { continue };
        if !matches!(kind, NodeKind::Document | NodeKind::Attribute { .. }) {
            *counts.entry(kind.label()).or_default() += 1;
        }
        if matches!(kind, NodeKind::Element { .. }) {
            *counts.entry("attribute").or_default() += doc.attributes(id).len();
        }
    }
    counts.retain(|_, n| *n > 0);
    let counts = counts
        .iter()
        .map(|(label, n)| format!("{n} {label}"))
        .collect::<Vec<_>>()
        .join(", ");
    lines.push(("nodes", counts));

    for warning in cache.warnings() {
        lines.push(("warning", warning.to_string()));
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn value<'a>(lines: &'a [(&'static str, String)], label: &str) -> &'a str {
        lines
            .iter()
            .find(|(l, _)| *l == label)
            .map(|(_, v)| v.as_str())
            .unwrap()
    }

    #[test]
    fn test_summary_lists_root_and_counts() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("a.xml");
        fs::write(
            &file,
            r#"<?xml version="1.0" encoding="utf-8"?><?xml-stylesheet href="v.xsl"?><r k="1"><c/><!--x--></r>"#,
        )
        .unwrap();

        let mut cache = XmlCache::new(CacheConfig::default());
        cache.load(&file).unwrap();
        let lines = summarize(&cache);

        assert_eq!(value(&lines, "root"), "r");
        assert_eq!(value(&lines, "encoding"), "utf-8");
        assert_eq!(value(&lines, "stylesheet"), "v.xsl");
        let nodes = value(&lines, "nodes");
        assert!(nodes.contains("2 element"), "{nodes}");
        assert!(nodes.contains("1 attribute"), "{nodes}");
        assert!(nodes.contains("1 comment"), "{nodes}");
    }

    #[test]
    fn test_summary_of_empty_element() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("b.xml");
        fs::write(&file, "<only/>").unwrap();

        let mut cache = XmlCache::new(CacheConfig::default());
        cache.load(&file).unwrap();
        let lines = summarize(&cache);

        assert_eq!(value(&lines, "encoding"), "-");
        assert_eq!(value(&lines, "stylesheet"), "-");
        assert_eq!(value(&lines, "nodes"), "1 element");
    }
}
