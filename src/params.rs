//! Parameterized paths.
//!
//! Two independent tools live here:
//!
//! - [`ParamParser`] reads `:name` placeholders out of a subscription path,
//!   turning them into wildcards, and later maps a concrete path back to
//!   `name -> key` pairs ([`ParamsInfo`]).
//! - [`PathTemplate`] goes the other way: it fills `$name` slots of a path
//!   from a parameter map.

use std::collections::HashMap;
use std::sync::{OnceLock, RwLock};

use indexmap::IndexMap;
use regex::{NoExpand, Regex};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::path::PathPattern;
use crate::tree::split;

/// Captured parameters, in pattern order.
pub type Params = IndexMap<String, String>;

const REGEX_CACHE_MAX: usize = 64;

static REGEX_CACHE: OnceLock<RwLock<HashMap<String, Regex>>> = OnceLock::new();

/// Compiles `source` once per process. A poisoned cache is bypassed.
fn cached_regex(source: &str) -> Result<Regex, ConfigError> {
    let cache = REGEX_CACHE.get_or_init(|| RwLock::new(HashMap::new()));
    if let Some(re) = cache.read().ok().and_then(|guard| guard.get(source).cloned()) {
        return Ok(re);
    }

    let compiled = Regex::new(source).map_err(|e| ConfigError::InvalidParamMarker {
        reason: e.to_string(),
    })?;

    if let Ok(mut guard) = cache.write() {
        if guard.len() >= REGEX_CACHE_MAX {
            guard.clear();
        }
        guard
            .entry(source.to_string())
            .or_insert_with(|| compiled.clone());
    }
    Ok(compiled)
}

/// Regex source for placeholders: the marker, then a name running until the
/// next delimiter or marker character.
fn placeholder_source(marker: &str, delimiter: &str) -> String {
    let excluded: String = delimiter
        .chars()
        .chain(marker.chars())
        .map(|c| regex::escape(c.encode_utf8(&mut [0; 4])))
        .collect();
    format!("{}([^{excluded}]+)", regex::escape(marker))
}

/// Finds parameter placeholders in paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamParser {
    source: String,
    delimiter: String,
    wildcard: String,
}

impl ParamParser {
    /// Builds a parser for placeholders introduced by `marker`.
    ///
    /// A placeholder name runs until the next delimiter or marker character.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::EmptyMarker`] for an empty marker or delimiter
    /// and [`ConfigError::InvalidParamMarker`] if no placeholder pattern can
    /// be built from them.
    pub fn new(marker: &str, delimiter: &str, wildcard: char) -> Result<Self, ConfigError> {
        if marker.is_empty() {
            return Err(ConfigError::EmptyMarker {
                field: "param".to_string(),
            });
        }
        if delimiter.is_empty() {
            return Err(ConfigError::EmptyMarker {
                field: "delimiter".to_string(),
            });
        }
        let source = placeholder_source(marker, delimiter);
        cached_regex(&source)?;
        Ok(Self {
            source,
            delimiter: delimiter.to_string(),
            wildcard: wildcard.to_string(),
        })
    }

    /// Returns true if `path` contains at least one placeholder.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidParamMarker`] if the placeholder pattern
    /// no longer compiles.
    pub fn has_params(&self, path: &str) -> Result<bool, ConfigError> {
        Ok(cached_regex(&self.source)?.is_match(path))
    }

    /// Replaces placeholders with the wildcard marker and records which
    /// segment each came from. Returns `None` when there are none.
    ///
    /// # Errors
    ///
    /// As [`has_params`](Self::has_params).
    pub fn parse(&self, path: &str) -> Result<Option<ParamsInfo>, ConfigError> {
        let regex = cached_regex(&self.source)?;
        if !regex.is_match(path) {
            return Ok(None);
        }
        let mut params = Vec::new();
        let mut parts = Vec::new();
        for (index, part) in split(path, &self.delimiter).into_iter().enumerate() {
            match regex.captures(part).and_then(|c| c.get(1)) {
                Some(name) => {
                    params.push((index, name.as_str().to_string()));
                    parts.push(regex.replace_all(part, NoExpand(&self.wildcard)).into_owned());
                }
                None => parts.push(part.to_string()),
            }
        }
        Ok(Some(ParamsInfo {
            original: path.to_string(),
            replaced: parts.join(&self.delimiter),
            params,
        }))
    }
}

impl Default for ParamParser {
    /// `:` placeholders in `.`-separated paths, replaced by `*`.
    fn default() -> Self {
        Self {
            source: placeholder_source(":", "."),
            delimiter: ".".to_string(),
            wildcard: "*".to_string(),
        }
    }
}

/// Placeholder positions of one subscription path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamsInfo {
    original: String,
    replaced: String,
    params: Vec<(usize, String)>,
}

impl ParamsInfo {
    /// The path as written, placeholders included.
    #[must_use]
    pub fn original(&self) -> &str {
        &self.original
    }

    /// The path with every placeholder turned into a wildcard.
    #[must_use]
    pub fn replaced(&self) -> &str {
        &self.replaced
    }

    /// `(segment index, name)` pairs, in order.
    #[must_use]
    pub fn params(&self) -> &[(usize, String)] {
        &self.params
    }

    /// Reads parameter values from a concrete path matched by `pattern`.
    ///
    /// Segments after the variable-length one are counted from the end of
    /// `concrete`. Parameters whose segment is missing are left out.
    #[must_use]
    pub fn extract(&self, pattern: &PathPattern, concrete: &[&str]) -> Params {
        let mut result = Params::new();
        for (index, name) in &self.params {
            let position = match pattern.var_index() {
                Some(v) if *index > v => (concrete.len() + index).checked_sub(pattern.len()),
                _ => Some(*index),
            };
            if let Some(key) = position.and_then(|i| concrete.get(i)) {
                result.insert(name.clone(), (*key).to_string());
            }
        }
        result
    }
}

/// Options for [`PathTemplate::compile`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TemplateOptions {
    /// Marks the start of a slot segment.
    pub param_prefix: String,
    /// Marks the end of a slot segment.
    pub param_suffix: String,
    /// Segment separator.
    pub separator: String,
    /// Written for slots with no value.
    pub nil_param: String,
}

impl Default for TemplateOptions {
    fn default() -> Self {
        Self {
            param_prefix: "$".to_string(),
            param_suffix: String::new(),
            separator: "/".to_string(),
            nil_param: "*".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Part {
    Literal(String),
    Slot(String),
}

/// A path with named slots, split once and filled many times.
///
/// ```
/// use kyrostate::{Params, PathTemplate, TemplateOptions};
///
/// let template = PathTemplate::compile("users/$id/posts", &TemplateOptions::default());
/// let mut params = Params::new();
/// params.insert("id".to_string(), "7".to_string());
/// assert_eq!(template.fill(&params), "users/7/posts");
/// assert_eq!(template.fill(&Params::new()), "users/*/posts");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathTemplate {
    parts: Vec<Part>,
    separator: String,
    nil_param: String,
}

impl PathTemplate {
    /// Splits `path` into literal runs and slots.
    #[must_use]
    pub fn compile(path: &str, options: &TemplateOptions) -> Self {
        let mut parts = Vec::new();
        let mut literal: Vec<&str> = Vec::new();
        for part in path.split(options.separator.as_str()) {
            let name = part
                .strip_prefix(options.param_prefix.as_str())
                .and_then(|rest| rest.strip_suffix(options.param_suffix.as_str()));
            match name {
                Some(name) => {
                    if !literal.is_empty() {
                        parts.push(Part::Literal(literal.join(&options.separator)));
                        literal.clear();
                    }
                    parts.push(Part::Slot(name.to_string()));
                }
                None => literal.push(part),
            }
        }
        if !literal.is_empty() {
            parts.push(Part::Literal(literal.join(&options.separator)));
        }
        Self {
            parts,
            separator: options.separator.clone(),
            nil_param: options.nil_param.clone(),
        }
    }

    /// Returns true if the template has no slots.
    #[must_use]
    pub fn is_constant(&self) -> bool {
        self.parts.iter().all(|part| matches!(part, Part::Literal(_)))
    }

    /// Slot names, in order.
    pub fn slots(&self) -> impl Iterator<Item = &str> {
        self.parts.iter().filter_map(|part| match part {
            Part::Slot(name) => Some(name.as_str()),
            Part::Literal(_) => None,
        })
    }

    /// Substitutes slot values, writing the nil marker for missing ones.
    #[must_use]
    pub fn fill(&self, params: &Params) -> String {
        let filled: Vec<&str> = self
            .parts
            .iter()
            .map(|part| match part {
                Part::Literal(text) => text.as_str(),
                Part::Slot(name) => params.get(name).map_or(self.nil_param.as_str(), String::as_str),
            })
            .collect();
        filled.join(&self.separator)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parser() -> ParamParser {
        ParamParser::new(":", ".", '*').unwrap()
    }

    #[test]
    fn test_parse_replaces_placeholders() {
        let info = parser().parse("users.:id.posts.:post").unwrap().unwrap();
        assert_eq!(info.original(), "users.:id.posts.:post");
        assert_eq!(info.replaced(), "users.*.posts.*");
        assert_eq!(
            info.params(),
            [(1, "id".to_string()), (3, "post".to_string())]
        );
    }

    #[test]
    fn test_parse_embedded_placeholder() {
        let info = parser().parse("users.user-:id").unwrap().unwrap();
        assert_eq!(info.replaced(), "users.user-*");
        assert_eq!(info.params(), [(1, "id".to_string())]);
    }

    #[test]
    fn test_parse_without_placeholders() {
        assert!(parser().parse("users.all").unwrap().is_none());
        assert!(!parser().has_params("a.b").unwrap());
        assert!(parser().has_params("a.:b").unwrap());
    }

    #[test]
    fn test_default_matches_explicit() {
        assert_eq!(ParamParser::default(), parser());
        let info = ParamParser::default().parse("a.:x.b").unwrap();
        assert_eq!(info, parser().parse("a.:x.b").unwrap());
    }

    #[test]
    fn test_empty_marker_rejected() {
        let err = ParamParser::new("", ".", '*').unwrap_err();
        assert!(matches!(err, ConfigError::EmptyMarker { .. }));
    }

    #[test]
    fn test_regex_metacharacter_markers() {
        let parser = ParamParser::new("$", "|", '*').unwrap();
        let info = parser.parse("a|$name|c").unwrap().unwrap();
        assert_eq!(info.replaced(), "a|*|c");
        assert_eq!(info.params(), [(1, "name".to_string())]);
    }

    #[test]
    fn test_extract() {
        let info = parser().parse("users.:id.posts.:post").unwrap().unwrap();
        let pattern = PathPattern::parse(info.replaced(), ".").unwrap();
        let params = info.extract(&pattern, &["users", "7", "posts", "42"]);
        assert_eq!(params.get("id").map(String::as_str), Some("7"));
        assert_eq!(params.get("post").map(String::as_str), Some("42"));
        assert_eq!(params.keys().collect::<Vec<_>>(), ["id", "post"]);
    }

    #[test]
    fn test_extract_after_variable_segment() {
        let info = parser().parse("a.**.:leaf").unwrap().unwrap();
        let pattern = PathPattern::parse(info.replaced(), ".").unwrap();
        let params = info.extract(&pattern, &["a", "x", "y", "z"]);
        assert_eq!(params.get("leaf").map(String::as_str), Some("z"));
    }

    #[test]
    fn test_template_fill() {
        let template = PathTemplate::compile("a/b/$x/c/d/$y", &TemplateOptions::default());
        assert!(!template.is_constant());
        assert_eq!(template.slots().collect::<Vec<_>>(), ["x", "y"]);
        let mut params = Params::new();
        params.insert("x".to_string(), "1".to_string());
        assert_eq!(template.fill(&params), "a/b/1/c/d/*");
    }

    #[test]
    fn test_template_constant() {
        let template = PathTemplate::compile("a/b/c", &TemplateOptions::default());
        assert!(template.is_constant());
        assert_eq!(template.fill(&Params::new()), "a/b/c");
    }

    #[test]
    fn test_template_custom_options() {
        let options = TemplateOptions {
            param_prefix: "{".to_string(),
            param_suffix: "}".to_string(),
            separator: ".".to_string(),
            nil_param: "_".to_string(),
        };
        let template = PathTemplate::compile("users.{id}.name", &options);
        let mut params = Params::new();
        params.insert("id".to_string(), "9".to_string());
        assert_eq!(template.fill(&params), "users.9.name");
    }
}
