//! Static-asset upload passes.
//!
//! The build output is uploaded in three passes, each an include/exclude glob
//! list paired with the cache-control the pass applies: HTML is never cached,
//! fingerprinted bundler output is immutable, everything else gets a short
//! cache. The deployment tool evaluates the globs at deploy time; the matcher
//! here only exists so `plan` can verify the passes partition a build tree.

use once_cell::sync::Lazy;
use regex::Regex;
use std::fs;
use std::path::Path;

use crate::error::{Result, SynthError};

/// One upload pass: glob lists plus the cache-control it applies
#[derive(Debug, Clone)]
pub struct UploadPass {
    pub name: &'static str,
    pub includes: &'static [&'static str],
    pub excludes: &'static [&'static str],
    pub cache_control: &'static str,
}

/// The three passes, in upload order. Assets go out before HTML so a page is
/// never served ahead of the bundles it references.
pub const UPLOAD_PASSES: &[UploadPass] = &[
    UploadPass {
        name: "hashed-assets",
        includes: &["static/**"],
        excludes: &["**/*.html"],
        cache_control: "public, max-age=31536000, immutable",
    },
    UploadPass {
        name: "unhashed-assets",
        includes: &["**/*"],
        excludes: &["**/*.html", "static/**"],
        cache_control: "public, max-age=3600",
    },
    UploadPass {
        name: "html",
        includes: &["**/*.html"],
        excludes: &[],
        cache_control: "no-cache",
    },
];

/// Minimal glob support (`**/`, `**`, `*`, `?`) for the partition check
pub struct GlobPattern {
    regex: Regex,
}

impl GlobPattern {
    pub fn new(pattern: &str) -> Result<Self> {
        let regex = Regex::new(&glob_to_regex(pattern)).map_err(|e| {
            SynthError::Config(format!("invalid glob pattern '{}': {}", pattern, e))
        })?;
        Ok(Self { regex })
    }

    pub fn matches(&self, path: &str) -> bool {
        self.regex.is_match(path)
    }
}

fn glob_to_regex(pattern: &str) -> String {
    let mut regex = String::from("^");
    let mut chars = pattern.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '*' => {
                if chars.peek() == Some(&'*') {
                    chars.next();
                    if chars.peek() == Some(&'/') {
                        chars.next();
                        // `**/` spans zero or more directories
                        regex.push_str("(?:.*/)?");
                    } else {
                        regex.push_str(".*");
                    }
                } else {
                    regex.push_str("[^/]*");
                }
            }
            '?' => regex.push_str("[^/]"),
            c => regex.push_str(&regex::escape(&c.to_string())),
        }
    }
    regex.push('$');
    regex
}

struct CompiledPass {
    pass: &'static UploadPass,
    includes: Vec<GlobPattern>,
    excludes: Vec<GlobPattern>,
}

impl CompiledPass {
    fn matches(&self, path: &str) -> bool {
        self.includes.iter().any(|p| p.matches(path))
            && !self.excludes.iter().any(|p| p.matches(path))
    }
}

static COMPILED_PASSES: Lazy<Vec<CompiledPass>> = Lazy::new(|| {
    UPLOAD_PASSES
        .iter()
        .map(|pass| CompiledPass {
            pass,
            includes: pass
                .includes
                .iter()
                .map(|p| GlobPattern::new(p).expect("pass include pattern is literal"))
                .collect(),
            excludes: pass
                .excludes
                .iter()
                .map(|p| GlobPattern::new(p).expect("pass exclude pattern is literal"))
                .collect(),
        })
        .collect()
});

/// All passes a relative path falls into, net of excludes
pub fn matching_passes(path: &str) -> Vec<&'static UploadPass> {
    COMPILED_PASSES
        .iter()
        .filter(|compiled| compiled.matches(path))
        .map(|compiled| compiled.pass)
        .collect()
}

/// The single pass a path belongs to, if the path is classified cleanly
pub fn classify(path: &str) -> Option<&'static UploadPass> {
    let matches = matching_passes(path);
    match matches.as_slice() {
        [single] => Some(single),
        _ => None,
    }
}

/// Outcome of checking a build tree against the passes
#[derive(Debug, Default)]
pub struct PartitionReport {
    pub files: usize,
    /// Paths matched by zero or by more than one pass, with the pass names
    pub violations: Vec<(String, Vec<&'static str>)>,
}

impl PartitionReport {
    pub fn is_partition(&self) -> bool {
        self.violations.is_empty()
    }
}

/// Verify that every file under `build_dir` falls into exactly one pass
pub fn verify_partition(build_dir: &Path) -> Result<PartitionReport> {
    let mut files = Vec::new();
    collect_files(build_dir, build_dir, &mut files)?;

    let mut report = PartitionReport {
        files: files.len(),
        violations: Vec::new(),
    };
    for path in files {
        let matches = matching_passes(&path);
        if matches.len() != 1 {
            report
                .violations
                .push((path, matches.iter().map(|p| p.name).collect()));
        }
    }
    Ok(report)
}

fn collect_files(dir: &Path, base: &Path, out: &mut Vec<String>) -> Result<()> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.is_dir() {
            collect_files(&path, base, out)?;
        } else {
            let relative = path
                .strip_prefix(base)
                .map_err(|e| SynthError::Config(format!("path outside build dir: {}", e)))?;
            // Normalized to forward slashes, matching the glob lists
            out.push(
                relative
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy())
                    .collect::<Vec<_>>()
                    .join("/"),
            );
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_html_goes_to_the_html_pass_only() {
        assert_eq!(classify("index.html").unwrap().name, "html");
        assert_eq!(classify("nested/page.html").unwrap().name, "html");
        assert_eq!(classify("static/docs/page.html").unwrap().name, "html");
    }

    #[test]
    fn test_bundler_output_is_immutable() {
        let pass = classify("static/js/main.8f9a2c1d.js").unwrap();
        assert_eq!(pass.name, "hashed-assets");
        assert!(pass.cache_control.contains("immutable"));
    }

    #[test]
    fn test_root_level_files_get_the_short_cache() {
        assert_eq!(classify("favicon.ico").unwrap().name, "unhashed-assets");
        assert_eq!(classify("manifest.json").unwrap().name, "unhashed-assets");
        assert_eq!(classify("images/logo.svg").unwrap().name, "unhashed-assets");
    }

    #[test]
    fn test_every_file_matches_exactly_one_pass() {
        let representative = [
            "index.html",
            "404.html",
            "favicon.ico",
            "manifest.json",
            "robots.txt",
            "images/logo.svg",
            "static/js/main.8f9a2c1d.js",
            "static/css/main.1b2c3d4e.css",
            "static/media/hero.4f5a6b7c.webp",
        ];
        for path in representative {
            assert_eq!(matching_passes(path).len(), 1, "{} not cleanly classified", path);
        }
    }

    #[test]
    fn test_partition_holds_over_a_build_tree() {
        let dir = tempdir().unwrap();
        for (path, contents) in [
            ("index.html", "<html></html>"),
            ("favicon.ico", "icon"),
            ("static/js/main.8f9a2c1d.js", "js"),
            ("static/css/main.1b2c3d4e.css", "css"),
        ] {
            let full = dir.path().join(path);
            fs::create_dir_all(full.parent().unwrap()).unwrap();
            fs::write(full, contents).unwrap();
        }

        let report = verify_partition(dir.path()).unwrap();
        assert_eq!(report.files, 4);
        assert!(report.is_partition(), "violations: {:?}", report.violations);
    }

    #[test]
    fn test_glob_translation_handles_directory_spans() {
        let pattern = GlobPattern::new("**/*.html").unwrap();
        assert!(pattern.matches("index.html"));
        assert!(pattern.matches("a/b/index.html"));
        assert!(!pattern.matches("index.htm"));

        let single = GlobPattern::new("*.html").unwrap();
        assert!(single.matches("index.html"));
        assert!(!single.matches("a/index.html"));
    }
}
