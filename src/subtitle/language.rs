//! Language synonym groups and language detection from file names.

use itertools::Itertools;

/// Language code returned when nothing in the name identifies a language.
pub const UNDETERMINED: &str = "und";

/// Common language names recognized when no configured group matches.
const EXTENDED_LANGUAGE_NAMES: [(&str, &str); 5] = [
    ("english", "eng"),
    ("danish", "dan"),
    ("french", "fra"),
    ("german", "deu"),
    ("spanish", "spa"),
];

/// A set of interchangeable tokens that all denote one language, e.g. `en|eng|english`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LanguageGroup {
    tokens: Vec<String>,
    canonical: String,
}

impl LanguageGroup {
    /// Parse a synonym line like `fr | fra | French`.
    ///
    /// Returns `None` if the line contains no usable tokens.
    #[must_use]
    pub fn parse(line: &str) -> Option<Self> {
        let tokens: Vec<String> = line
            .split('|')
            .map(|token| token.trim().to_lowercase())
            .filter(|token| !token.is_empty())
            .unique()
            .collect();

        let canonical = tokens
            .iter()
            .find(|token| token.chars().count() == 3)
            .or_else(|| tokens.first())?
            .clone();

        Some(Self { tokens, canonical })
    }

    /// The code used for `%l%` in destination names.
    #[must_use]
    pub fn canonical(&self) -> &str {
        &self.canonical
    }

    /// All synonym tokens in configured order.
    #[must_use]
    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    /// Check if the group contains the given lowercase token.
    #[must_use]
    pub fn contains(&self, token: &str) -> bool {
        self.tokens.iter().any(|t| t == token)
    }
}

/// Ordered language groups loaded for one scan.
#[derive(Debug, Clone)]
pub struct LanguageResolver {
    groups: Vec<LanguageGroup>,
    extended_mapping: bool,
}

impl LanguageResolver {
    /// Build groups from synonym lines.
    ///
    /// English is always detectable: if no group contains `en`,
    /// an `en|eng|english` group is appended.
    #[must_use]
    pub fn new(lines: &[String], extended_mapping: bool) -> Self {
        let mut groups: Vec<LanguageGroup> = lines.iter().filter_map(|line| LanguageGroup::parse(line)).collect();

        if !groups.iter().any(|group| group.contains("en")) {
            groups.extend(LanguageGroup::parse("en|eng|english"));
        }

        Self {
            groups,
            extended_mapping,
        }
    }

    #[must_use]
    pub fn groups(&self) -> &[LanguageGroup] {
        &self.groups
    }

    /// Find the first group that contains any token of the file name.
    ///
    /// Groups are checked in configured order, tokens in file name order.
    #[must_use]
    pub fn find_group(&self, file_name: &str) -> Option<&LanguageGroup> {
        let tokens = tokenize(file_name);
        self.groups
            .iter()
            .find(|group| tokens.iter().any(|token| group.contains(token)))
    }

    /// Detect the language code for a file name.
    ///
    /// Returns the canonical code of the matching group,
    /// then the extended name table if enabled, and otherwise [`UNDETERMINED`].
    #[must_use]
    pub fn detect(&self, file_name: &str) -> String {
        if let Some(group) = self.find_group(file_name) {
            return group.canonical().to_string();
        }

        if self.extended_mapping {
            let tokens = tokenize(file_name);
            let extended = tokens.iter().find_map(|token| {
                EXTENDED_LANGUAGE_NAMES
                    .iter()
                    .find(|(name, _)| name == token)
                    .map(|(_, code)| *code)
            });
            if let Some(code) = extended {
                return code.to_string();
            }
        }

        UNDETERMINED.to_string()
    }
}

/// Split a name into lowercase tokens on every run of non-alphanumeric characters.
///
/// ```rust
/// use subtitle_sweep::subtitle::tokenize;
///
/// assert_eq!(tokenize("Show.S01E01 [Eng]-forced.srt"), vec!["show", "s01e01", "eng", "forced", "srt"]);
/// ```
#[must_use]
pub fn tokenize(name: &str) -> Vec<String> {
    name.split(|c: char| !c.is_alphanumeric())
        .filter(|token| !token.is_empty())
        .map(str::to_lowercase)
        .collect()
}
