//! Moniker and relation-name generation.

use std::collections::HashMap;

use crate::models::schema::TableId;

const UNCOUNTABLE: &[&str] = &[
    "data",
    "deer",
    "equipment",
    "fish",
    "information",
    "media",
    "metadata",
    "news",
    "series",
    "sheep",
    "species",
];

const IRREGULAR: &[(&str, &str)] = &[
    ("child", "children"),
    ("foot", "feet"),
    ("goose", "geese"),
    ("man", "men"),
    ("mouse", "mice"),
    ("ox", "oxen"),
    ("person", "people"),
    ("tooth", "teeth"),
    ("woman", "women"),
];

/// Turns table identifiers into monikers and relation names.
///
/// Holds only configuration; every method is a pure function of its
/// arguments and that configuration.
#[derive(Debug, Clone, Default)]
pub struct Namer {
    qualify_with_schema: bool,
    moniker_overrides: HashMap<String, String>,
    inflection_overrides: HashMap<String, String>,
}

impl Namer {
    pub fn new(qualify_with_schema: bool) -> Self {
        Self {
            qualify_with_schema,
            ..Self::default()
        }
    }

    /// Keys are matched case-insensitively against either the local table
    /// name or `schema.table`.
    pub fn with_moniker_overrides(mut self, overrides: &HashMap<String, String>) -> Self {
        self.moniker_overrides = lowercase_keys(overrides);
        self
    }

    pub fn with_inflection_overrides(mut self, overrides: &HashMap<String, String>) -> Self {
        self.inflection_overrides = lowercase_keys(overrides);
        self
    }

    /// `order_items` becomes `OrderItems`; with schema qualification enabled
    /// `sales.order_items` becomes `SalesOrderItems`.
    pub fn moniker_for(&self, table: &TableId) -> String {
        if let Some(moniker) = self
            .moniker_overrides
            .get(&table.key())
            .or_else(|| self.moniker_overrides.get(&table.name.to_lowercase()))
        {
            return moniker.clone();
        }

        let local = camelize(&table.name);
        match &table.schema {
            Some(schema) if self.qualify_with_schema => format!("{}{}", camelize(schema), local),
            _ => local,
        }
    }

    /// Collection accessor name for `raw_name`. Overrides win; otherwise the
    /// name is pluralized with [`pluralize`].
    pub fn relation_name_for(&self, raw_name: &str) -> String {
        let key = raw_name.to_lowercase();
        match self.inflection_overrides.get(&key) {
            Some(name) => name.clone(),
            None => pluralize(&key),
        }
    }
}

fn lowercase_keys(map: &HashMap<String, String>) -> HashMap<String, String> {
    map.iter()
        .map(|(key, value)| (key.to_lowercase(), value.clone()))
        .collect()
}

/// Splits on anything that is not a letter or digit (underscores included)
/// and capitalizes each segment.
pub fn camelize(raw: &str) -> String {
    raw.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|segment| !segment.is_empty())
        .map(capitalize)
        .collect()
}

fn capitalize(segment: &str) -> String {
    let mut chars = segment.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// English pluralization of the last word of `raw` (words separated by
/// underscores or other punctuation).
///
/// This is a suffix heuristic with no notion of plural input. Words ending in
/// `ss`, `us` or `is` are always inflected, so `bonus` -> `bonuses` but also
/// `menus` -> `menuses`. Any other word ending in `s` is assumed to be plural
/// and left alone (`orders` stays `orders`, and so does `gas`). Irregular
/// nouns outside a short built-in list come out wrong
/// (`criterion` -> `criterions`). Callers that need a specific spelling
/// supply an inflection override instead.
pub fn pluralize(raw: &str) -> String {
    let lower = raw.to_lowercase();
    let split = lower
        .char_indices()
        .filter(|(_, c)| !c.is_alphanumeric())
        .map(|(i, c)| i + c.len_utf8())
        .last()
        .unwrap_or(0);
    let (head, noun) = lower.split_at(split);
    if noun.is_empty() {
        return lower;
    }
    format!("{}{}", head, pluralize_word(noun))
}

fn pluralize_word(noun: &str) -> String {
    if UNCOUNTABLE.contains(&noun) {
        return noun.to_string();
    }
    if let Some((_, plural)) = IRREGULAR.iter().find(|(singular, _)| *singular == noun) {
        return plural.to_string();
    }

    if ["ss", "sh", "ch", "x", "z"]
        .iter()
        .any(|suffix| noun.ends_with(suffix))
    {
        return format!("{}es", noun);
    }
    if let Some(stem) = noun.strip_suffix("us") {
        return format!("{}uses", stem);
    }
    if let Some(stem) = noun.strip_suffix("is") {
        if !stem.is_empty() {
            return format!("{}es", stem);
        }
    }
    if noun.ends_with('s') {
        return noun.to_string();
    }
    if let Some(stem) = noun.strip_suffix('y') {
        let after_vowel = stem
            .chars()
            .last()
            .map_or(true, |c| "aeiou".contains(c));
        if !after_vowel {
            return format!("{}ies", stem);
        }
    }
    format!("{}s", noun)
}
