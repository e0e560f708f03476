// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::collections::HashMap;

use async_trait::async_trait;
use aws_sdk_dynamodb::Client;
use aws_sdk_dynamodb::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_dynamodb::types::AttributeValue;
use tracing::warn;

use super::{CatalogStore, ContinuationToken, ScanPage, ScanRequest};
use crate::episode::{Attribute, Episode, EpisodeStatus, Projection};
use crate::error::CatalogError;

/// Error codes DynamoDB uses to signal throttling
const THROTTLING_CODES: &[&str] = &[
    "ProvisionedThroughputExceededException",
    "RequestLimitExceeded",
    "ThrottlingException",
];

/// Catalog backed by a DynamoDB table with `id` as partition key
pub struct DynamoCatalog {
    client: Client,
    table_name: String,
}

impl DynamoCatalog {
    pub fn new(client: Client, table_name: impl Into<String>) -> Self {
        Self {
            client,
            table_name: table_name.into(),
        }
    }
}

#[async_trait]
impl CatalogStore for DynamoCatalog {
    async fn get_item(
        &self,
        id: &str,
        projection: Projection,
    ) -> Result<Option<Episode>, CatalogError> {
        let mut request = self
            .client
            .get_item()
            .table_name(&self.table_name)
            .key(Attribute::Id.name(), AttributeValue::S(id.to_string()));

        if let Some(attributes) = projection.attributes() {
            let mut names = HashMap::new();
            request = request
                .projection_expression(projection_expression(attributes, &mut names))
                .set_expression_attribute_names(Some(names));
        }

        let output = request
            .send()
            .await
            .map_err(|err| classify("GetItem", err))?;

        output.item().map(episode_from_item).transpose()
    }

    async fn scan_page(
        &self,
        scan: &ScanRequest,
        start: Option<&ContinuationToken>,
    ) -> Result<ScanPage, CatalogError> {
        let mut request = self.client.scan().table_name(&self.table_name);
        let mut names = HashMap::new();
        let mut values = HashMap::new();

        if let Some(attributes) = scan.projection.attributes() {
            request = request.projection_expression(projection_expression(attributes, &mut names));
        }

        if let Some(predicate) = &scan.predicate {
            let filter = predicate.to_expression();
            names.extend(filter.names);
            values.extend(
                filter
                    .values
                    .into_iter()
                    .map(|(placeholder, value)| (placeholder, AttributeValue::S(value))),
            );
            request = request.filter_expression(filter.expression);
        }

        if !names.is_empty() {
            request = request.set_expression_attribute_names(Some(names));
        }
        if !values.is_empty() {
            request = request.set_expression_attribute_values(Some(values));
        }
        if let Some(token) = start {
            request = request.exclusive_start_key(
                Attribute::Id.name(),
                AttributeValue::S(token.0.clone()),
            );
        }

        let output = request.send().await.map_err(|err| classify("Scan", err))?;

        let items = output
            .items()
            .iter()
            .map(episode_from_item)
            .collect::<Result<Vec<_>, _>>()?;

        let next = output
            .last_evaluated_key()
            .and_then(|key| key.get(Attribute::Id.name()))
            .and_then(|value| value.as_s().ok())
            .map(|id| ContinuationToken(id.clone()));

        Ok(ScanPage { items, next })
    }

    async fn put_item(&self, episode: &Episode) -> Result<(), CatalogError> {
        if episode.id.is_empty() {
            return Err(CatalogError::InvalidItem {
                reason: "episode id is empty".to_string(),
            });
        }

        // Leave whatever status is stored
        if episode.status == Some(EpisodeStatus::Unknown) {
            let replace = replace_keeping_status(episode);
            let mut request = self
                .client
                .update_item()
                .table_name(&self.table_name)
                .key(Attribute::Id.name(), AttributeValue::S(episode.id.clone()))
                .update_expression(replace.expression)
                .set_expression_attribute_names(Some(replace.names));
            if !replace.values.is_empty() {
                request = request.set_expression_attribute_values(Some(replace.values));
            }
            request
                .send()
                .await
                .map_err(|err| classify("UpdateItem", err))?;
            return Ok(());
        }

        self.client
            .put_item()
            .table_name(&self.table_name)
            .set_item(Some(item_from_episode(episode)))
            .send()
            .await
            .map_err(|err| classify("PutItem", err))?;

        Ok(())
    }

    async fn update_status(&self, id: &str, status: EpisodeStatus) -> Result<(), CatalogError> {
        let result = self
            .client
            .update_item()
            .table_name(&self.table_name)
            .key(Attribute::Id.name(), AttributeValue::S(id.to_string()))
            .update_expression("SET #status = :status")
            .condition_expression("attribute_exists(#id)")
            .expression_attribute_names("#status", Attribute::Status.name())
            .expression_attribute_names("#id", Attribute::Id.name())
            .expression_attribute_values(":status", AttributeValue::S(status.as_str().to_string()))
            .send()
            .await;

        match result {
            Ok(_) => Ok(()),
            Err(err)
                if err
                    .as_service_error()
                    .is_some_and(|e| e.is_conditional_check_failed_exception()) =>
            {
                Err(CatalogError::EpisodeNotFound { id: id.to_string() })
            }
            Err(err) => Err(classify("UpdateItem", err)),
        }
    }
}

/// Map an SDK failure onto the catalog taxonomy
fn classify<E, R>(operation: &'static str, err: SdkError<E, R>) -> CatalogError
where
    E: ProvideErrorMetadata + std::error::Error + 'static,
    R: std::fmt::Debug + 'static,
{
    let throttled = err
        .as_service_error()
        .and_then(|e| e.code())
        .is_some_and(is_throttling_code);
    let message = DisplayErrorContext(&err).to_string();

    if throttled {
        warn!(operation, %message, "Catalog request throttled");
        CatalogError::CapacityExceeded { operation, message }
    } else {
        warn!(operation, %message, "Catalog request failed");
        CatalogError::Unavailable { operation, message }
    }
}

fn is_throttling_code(code: &str) -> bool {
    THROTTLING_CODES.contains(&code)
}

/// Render a projection as `#name` placeholders, registering each name
fn projection_expression(attributes: &[Attribute], names: &mut HashMap<String, String>) -> String {
    attributes
        .iter()
        .map(|attribute| {
            let placeholder = format!("#{}", attribute.name());
            names.insert(placeholder.clone(), attribute.name().to_string());
            placeholder
        })
        .collect::<Vec<_>>()
        .join(", ")
}

fn episode_from_item(item: &HashMap<String, AttributeValue>) -> Result<Episode, CatalogError> {
    let mut episode = Episode::default();
    for (name, value) in item {
        let (Some(attribute), Ok(text)) = (Attribute::from_name(name), value.as_s()) else {
            continue;
        };
        episode.set(attribute, text.clone());
    }

    if episode.id.is_empty() {
        return Err(CatalogError::InvalidItem {
            reason: "item has no string id".to_string(),
        });
    }
    Ok(episode)
}

fn item_from_episode(episode: &Episode) -> HashMap<String, AttributeValue> {
    episode
        .attributes()
        .map(|(attribute, value)| {
            (
                attribute.name().to_string(),
                AttributeValue::S(value.to_string()),
            )
        })
        .collect()
}

/// An update expression with the effect of replacing the item, minus `status`
struct ReplaceExpression {
    expression: String,
    names: HashMap<String, String>,
    values: HashMap<String, AttributeValue>,
}

fn replace_keeping_status(episode: &Episode) -> ReplaceExpression {
    let mut names = HashMap::new();
    let mut values = HashMap::new();
    let mut set = Vec::new();
    let mut remove = Vec::new();

    for attribute in Attribute::ALL {
        if matches!(attribute, Attribute::Id | Attribute::Status) {
            continue;
        }
        let name = format!("#{}", attribute.name());
        names.insert(name.clone(), attribute.name().to_string());

        match episode.get(attribute) {
            Some(value) => {
                let placeholder = format!(":{}", attribute.name());
                values.insert(placeholder.clone(), AttributeValue::S(value.to_string()));
                set.push(format!("{name} = {placeholder}"));
            }
            None => remove.push(name),
        }
    }

    let mut clauses = Vec::new();
    if !set.is_empty() {
        clauses.push(format!("SET {}", set.join(", ")));
    }
    if !remove.is_empty() {
        clauses.push(format!("REMOVE {}", remove.join(", ")));
    }

    ReplaceExpression {
        expression: clauses.join(" "),
        names,
        values,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_throttling_codes() {
        assert!(is_throttling_code("ProvisionedThroughputExceededException"));
        assert!(is_throttling_code("ThrottlingException"));
        assert!(!is_throttling_code("ResourceNotFoundException"));
    }

    #[test]
    fn projection_uses_placeholders() {
        let mut names = HashMap::new();
        let expression =
            projection_expression(Projection::List.attributes().unwrap(), &mut names);

        assert_eq!(expression, "#id, #title, #podcast");
        assert_eq!(names.len(), 3);
        assert_eq!(names["#podcast"], "podcast");
    }

    #[test]
    fn converts_items_both_ways() {
        let episode = Episode {
            title: Some("A sample title".to_string()),
            status: Some(EpisodeStatus::Pending),
            media_key: Some("podcasts/e1/raw-media".to_string()),
            ..Episode::new("e1")
        };

        let item = item_from_episode(&episode);
        assert_eq!(item.len(), 4);
        assert_eq!(item["status"], AttributeValue::S("pending".to_string()));

        assert_eq!(episode_from_item(&item).unwrap(), episode);
    }

    #[test]
    fn skips_unknown_and_non_string_attributes() {
        let item = HashMap::from([
            ("id".to_string(), AttributeValue::S("e1".to_string())),
            ("duration".to_string(), AttributeValue::S("3600".to_string())),
            ("title".to_string(), AttributeValue::N("7".to_string())),
        ]);

        let episode = episode_from_item(&item).unwrap();
        assert_eq!(episode, Episode::new("e1"));
    }

    #[test]
    fn item_without_id_is_invalid() {
        let item = HashMap::from([("title".to_string(), AttributeValue::S("x".to_string()))]);
        assert!(matches!(
            episode_from_item(&item),
            Err(CatalogError::InvalidItem { .. })
        ));
    }

    #[test]
    fn unknown_status_is_never_written() {
        let episode = Episode {
            title: Some("A sample title".to_string()),
            status: Some(EpisodeStatus::Unknown),
            media_key: Some("podcasts/e1/raw-media".to_string()),
            ..Episode::new("e1")
        };

        let replace = replace_keeping_status(&episode);

        assert_eq!(
            replace.expression,
            "SET #title = :title, #media_key = :media_key \
             REMOVE #description, #podcast, #published, #media_url, #media_content_type, \
             #transcription_key, #transcription_job_id, #transcribe_metadata_key"
        );
        assert!(!replace.names.contains_key("#status"));
        assert!(!replace.names.contains_key("#id"));
        assert_eq!(replace.names.len(), 10);
        assert_eq!(
            replace.values[":media_key"],
            AttributeValue::S("podcasts/e1/raw-media".to_string())
        );
        assert_eq!(replace.values.len(), 2);
    }
}
