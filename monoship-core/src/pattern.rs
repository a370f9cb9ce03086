//! Glob-style exclusion patterns for package discovery.

use std::path::{Path, PathBuf};

use regex::Regex;

use crate::error::{Error, Result};

/// A single compiled exclusion pattern.
///
/// Supports `**` (any run of path segments), `*` (any run of
/// non-separator characters) and `?` (one character). Everything else is
/// matched literally.
#[derive(Debug, Clone)]
pub struct ExcludePattern {
    source: String,
    regex: Regex,
}

impl ExcludePattern {
    pub fn new(pattern: &str) -> Result<Self> {
        let regex = Regex::new(&glob_to_regex(pattern)).map_err(|e| Error::InvalidPattern {
            pattern: pattern.to_string(),
            message: e.to_string(),
        })?;
        Ok(Self {
            source: pattern.to_string(),
            regex,
        })
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Tests `text` as a whole string and by its final segment.
    pub fn matches(&self, text: &str) -> bool {
        if self.regex.is_match(text) {
            return true;
        }
        match text.trim_end_matches('/').rsplit('/').next() {
            Some(base) if base != text => self.regex.is_match(base),
            _ => false,
        }
    }
}

fn glob_to_regex(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len() * 2 + 2);
    out.push('^');
    let chars: Vec<char> = pattern.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        match chars[i] {
            '*' if chars.get(i + 1) == Some(&'*') => {
                let at_segment_start = i == 0 || chars[i - 1] == '/';
                if at_segment_start && chars.get(i + 2) == Some(&'/') {
                    // `**/` may also match zero segments
                    out.push_str("(?:.*/)?");
                    i += 3;
                } else {
                    out.push_str(".*");
                    i += 2;
                }
            }
            '/' if chars.get(i + 1) == Some(&'*')
                && chars.get(i + 2) == Some(&'*')
                && i + 3 == chars.len() =>
            {
                // trailing `/**` also matches the directory itself
                out.push_str("(?:/.*)?");
                i += 3;
            }
            '*' => {
                out.push_str("[^/]*");
                i += 1;
            }
            '?' => {
                out.push_str("[^/]");
                i += 1;
            }
            c => {
                let mut buf = [0u8; 4];
                out.push_str(&regex::escape(c.encode_utf8(&mut buf)));
                i += 1;
            }
        }
    }
    out.push('$');
    out
}

/// An ordered list of exclusion patterns.
#[derive(Debug, Clone, Default)]
pub struct ExclusionSet {
    patterns: Vec<ExcludePattern>,
}

impl ExclusionSet {
    /// Compiles every pattern, failing on the first invalid one.
    pub fn new<I, S>(patterns: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let patterns = patterns
            .into_iter()
            .map(|p| ExcludePattern::new(p.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { patterns })
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn patterns(&self) -> impl Iterator<Item = &str> {
        self.patterns.iter().map(|p| p.as_str())
    }

    /// Returns the first pattern excluding `candidate`, if any.
    ///
    /// `candidate` is a manifest path. The pattern is tested against the
    /// manifest path and its parent directory, each both as given and
    /// relative to `cwd`.
    pub fn excluding(&self, candidate: &Path, cwd: &Path) -> Option<&str> {
        if self.patterns.is_empty() {
            return None;
        }

        let mut forms: Vec<String> = Vec::with_capacity(4);
        let mut push = |p: &Path| {
            forms.push(normalize(p));
            if let Ok(rel) = p.strip_prefix(cwd) {
                forms.push(normalize(rel));
            }
        };
        let absolute = absolutize(candidate, cwd);
        push(&absolute);
        if let Some(parent) = absolute.parent() {
            push(parent);
        }

        self.patterns
            .iter()
            .find(|pattern| forms.iter().any(|form| pattern.matches(form)))
            .map(|p| p.as_str())
    }

    #[inline]
    pub fn is_excluded(&self, candidate: &Path, cwd: &Path) -> bool {
        self.excluding(candidate, cwd).is_some()
    }
}

fn absolutize(path: &Path, cwd: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        cwd.join(path)
    }
}

fn normalize(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_double_star_matches_zero_segments() {
        let pattern = ExcludePattern::new("**/docs/**").unwrap();
        assert!(pattern.regex.is_match("docs"));
        assert!(pattern.regex.is_match("docs/guide"));
        assert!(pattern.regex.is_match("/repo/packages/docs"));
        assert!(!pattern.regex.is_match("/repo/packages/mydocs"));
    }

    #[test]
    fn test_literal_dot_is_escaped() {
        let pattern = ExcludePattern::new("v1.0").unwrap();
        assert!(pattern.matches("v1.0"));
        assert!(!pattern.matches("v1x0"));
    }
}
