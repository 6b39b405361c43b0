//! Subtitle path templates.
//!
//! A template describes where a subtitle may live relative to its video,
//! for example `Subs/%fn%.%l%.%fe%`. Supported placeholders:
//!
//! - `%fn%`: video file name without extension
//! - `%l%`: language, any synonym of the language found in the subtitle name
//! - `%fe%`: subtitle file extension without the dot
//! - `%n%`: a run of digits
//! - `%any%`: any run of characters except a path separator
//!
//! Both `/` and `\` are treated as path separators.

use std::fmt::Write as _;
use std::sync::LazyLock;

use anyhow::{Context, Result};
use itertools::Itertools;
use regex::{Regex, RegexBuilder};

use crate::subtitle::language::LanguageGroup;

static RE_PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"%([A-Za-z]+)%").expect("Failed to create regex pattern for template placeholders"));

/// Compiled regex size limit. Templates are short so this is only hit by pathological input.
const REGEX_SIZE_LIMIT: usize = 1 << 20;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Separator,
    FileName,
    Language,
    Extension,
    Number,
    Any,
}

/// Values substituted into a template when matching one candidate.
#[derive(Debug, Clone, Copy)]
pub struct MatchContext<'a> {
    /// Video file name without extension.
    pub video_base_name: &'a str,
    /// Candidate extension without the leading dot.
    pub extension: &'a str,
    /// Language group found in the candidate name, if any.
    pub language: Option<&'a LanguageGroup>,
    /// Detected language code, used when no group matched.
    pub language_code: &'a str,
}

/// A parsed template, ready to be compiled for a specific candidate.
#[derive(Debug, Clone)]
pub struct Template {
    source: String,
    segments: Vec<Segment>,
}

/// Compiled template that tests candidate paths.
#[derive(Debug, Clone)]
pub struct TemplateMatcher {
    regex: Option<Regex>,
}

impl Template {
    /// Parse a template string into literal text, separators, and placeholders.
    ///
    /// # Errors
    /// Returns an error if the template is empty or uses an unknown placeholder.
    pub fn parse(template: &str) -> Result<Self> {
        if template.trim().is_empty() {
            anyhow::bail!("Empty template");
        }

        let mut segments = Vec::new();
        let mut last = 0;
        for capture in RE_PLACEHOLDER.captures_iter(template) {
            let whole = capture.get(0).context("Missing placeholder match")?;
            push_literal(&mut segments, &template[last..whole.start()]);
            let segment = match capture[1].to_lowercase().as_str() {
                "fn" => Segment::FileName,
                "l" => Segment::Language,
                "fe" => Segment::Extension,
                "n" => Segment::Number,
                "any" => Segment::Any,
                other => anyhow::bail!("Unknown placeholder '%{other}%' in template '{template}'"),
            };
            segments.push(segment);
            last = whole.end();
        }
        push_literal(&mut segments, &template[last..]);

        Ok(Self {
            source: template.to_string(),
            segments,
        })
    }

    /// The original template string.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Build the regex pattern for the given candidate context.
    ///
    /// All literal text is escaped, so regex metacharacters in templates
    /// or file names only ever match themselves.
    #[must_use]
    pub fn pattern(&self, context: &MatchContext) -> String {
        let mut pattern = String::from("^");
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => pattern.push_str(&regex::escape(text)),
                Segment::Separator => pattern.push('/'),
                Segment::FileName => pattern.push_str(&regex::escape(context.video_base_name)),
                Segment::Extension => pattern.push_str(&regex::escape(context.extension)),
                Segment::Number => pattern.push_str(r"\d+"),
                Segment::Any => pattern.push_str("[^/]*"),
                Segment::Language => {
                    let alternatives = context.language.map_or_else(
                        || regex::escape(context.language_code),
                        |group| group.tokens().iter().map(|token| regex::escape(token)).join("|"),
                    );
                    let _ = write!(pattern, "(?:{alternatives})");
                }
            }
        }
        pattern.push('$');
        pattern
    }

    /// Compile the template into a case-insensitive matcher.
    ///
    /// # Errors
    /// Returns an error if the resulting regex cannot be built.
    pub fn compile(&self, context: &MatchContext) -> Result<TemplateMatcher> {
        let pattern = self.pattern(context);
        let regex = RegexBuilder::new(&pattern)
            .case_insensitive(true)
            .size_limit(REGEX_SIZE_LIMIT)
            .build()
            .with_context(|| format!("Failed to compile template '{}'", self.source))?;

        Ok(TemplateMatcher { regex: Some(regex) })
    }
}

/// Parse and compile a template string in one step.
///
/// # Errors
/// Returns an error if the template is malformed.
pub fn compile(template: &str, context: &MatchContext) -> Result<TemplateMatcher> {
    Template::parse(template)?.compile(context)
}

impl TemplateMatcher {
    /// A matcher that never matches anything.
    /// Used in place of templates that failed to compile.
    #[must_use]
    pub const fn never() -> Self {
        Self { regex: None }
    }

    /// Check the candidate's path relative to the video directory and its bare file name.
    #[must_use]
    pub fn is_match(&self, relative_path: &str, file_name: &str) -> bool {
        self.regex.as_ref().is_some_and(|regex| {
            regex.is_match(&normalize_separators(relative_path)) || regex.is_match(file_name)
        })
    }
}

/// Convert all path separators to `/`.
#[must_use]
pub fn normalize_separators(path: &str) -> String {
    path.replace('\\', "/")
}

fn push_literal(segments: &mut Vec<Segment>, text: &str) {
    for (index, part) in text.split(['/', '\\']).enumerate() {
        if index > 0 {
            segments.push(Segment::Separator);
        }
        if !part.is_empty() {
            segments.push(Segment::Literal(part.to_string()));
        }
    }
}
