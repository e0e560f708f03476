// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::collections::{BTreeMap, HashMap};

use crate::episode::{Attribute, Episode};
use crate::error::FilterError;

/// Query parameter selecting an exact podcast name
pub const PODCAST_PARAM: &str = "podcast";

/// Query parameter selecting a substring of the episode title
pub const IN_TITLE_PARAM: &str = "in-title";

/// Boolean condition over catalog attributes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    /// Case-sensitive exact match
    Equals { attribute: Attribute, value: String },
    /// Case-sensitive substring match
    Contains { attribute: Attribute, value: String },
    And(Box<Predicate>, Box<Predicate>),
}

impl Predicate {
    pub fn equals(attribute: Attribute, value: impl Into<String>) -> Self {
        Predicate::Equals {
            attribute,
            value: value.into(),
        }
    }

    pub fn contains(attribute: Attribute, value: impl Into<String>) -> Self {
        Predicate::Contains {
            attribute,
            value: value.into(),
        }
    }

    pub fn and(self, other: Predicate) -> Self {
        Predicate::And(Box::new(self), Box::new(other))
    }

    /// Evaluate the predicate against an episode
    pub fn matches(&self, episode: &Episode) -> bool {
        match self {
            Predicate::Equals { attribute, value } => {
                episode.get(*attribute) == Some(value.as_str())
            }
            Predicate::Contains { attribute, value } => episode
                .get(*attribute)
                .is_some_and(|actual| actual.contains(value.as_str())),
            Predicate::And(left, right) => left.matches(episode) && right.matches(episode),
        }
    }

    /// Render as a document store filter expression with placeholder maps
    pub fn to_expression(&self) -> FilterExpression {
        let mut rendered = FilterExpression::default();
        rendered.expression = rendered.render(self);
        rendered
    }
}

/// A filter expression in the store's native syntax
///
/// Attribute names and values never appear inline; they are bound through
/// `#name` and `:vN` placeholders.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterExpression {
    pub expression: String,
    pub names: BTreeMap<String, String>,
    pub values: BTreeMap<String, String>,
}

impl FilterExpression {
    fn render(&mut self, predicate: &Predicate) -> String {
        match predicate {
            Predicate::Equals { attribute, value } => {
                let name = self.bind_name(*attribute);
                let value = self.bind_value(value);
                format!("{name} = {value}")
            }
            Predicate::Contains { attribute, value } => {
                let name = self.bind_name(*attribute);
                let value = self.bind_value(value);
                format!("contains({name}, {value})")
            }
            Predicate::And(left, right) => {
                let left = self.render(left);
                let right = self.render(right);
                format!("({left}) AND ({right})")
            }
        }
    }

    fn bind_name(&mut self, attribute: Attribute) -> String {
        let placeholder = format!("#{}", attribute.name());
        self.names.insert(placeholder.clone(), attribute.name().to_string());
        placeholder
    }

    fn bind_value(&mut self, value: &str) -> String {
        let placeholder = format!(":v{}", self.values.len());
        self.values.insert(placeholder.clone(), value.to_string());
        placeholder
    }
}

/// Build the scan predicate from client query parameters
///
/// Recognized parameters are combined with AND; unrecognized ones are
/// ignored. Returns `None` when no recognized parameter is present.
pub fn build_filter(params: &HashMap<String, String>) -> Result<Option<Predicate>, FilterError> {
    let podcast = recognized(params, PODCAST_PARAM)?
        .map(|value| Predicate::equals(Attribute::Podcast, value));
    let in_title = recognized(params, IN_TITLE_PARAM)?
        .map(|value| Predicate::contains(Attribute::Title, value));

    Ok(match (podcast, in_title) {
        (Some(podcast), Some(in_title)) => Some(podcast.and(in_title)),
        (Some(single), None) | (None, Some(single)) => Some(single),
        (None, None) => None,
    })
}

fn recognized<'a>(
    params: &'a HashMap<String, String>,
    key: &str,
) -> Result<Option<&'a str>, FilterError> {
    match params.get(key) {
        None => Ok(None),
        Some(value) if value.is_empty() => Err(FilterError::UnsupportedFilter {
            key: key.to_string(),
        }),
        Some(value) => Ok(Some(value.as_str())),
    }
}
