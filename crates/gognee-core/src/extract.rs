//! Two-Stage LLM Extraction
//!
//! Stage 1 pulls typed entities out of a chunk; stage 2 pulls relation
//! triplets constrained to the stage-1 entity set. Both stages are
//! schema-constrained JSON completions, but real endpoints drift from their
//! schema, so responses are normalized (array-valued string fields joined)
//! and validated (empty names dropped, unknown types downgraded, unmatched
//! or ambiguous triplet endpoints skipped) before anything reaches the graph.

use std::collections::HashMap;

use serde::Deserialize;
use serde_json::Value;

use crate::clients::{LlmClient, LlmError};
use crate::graph::{normalize, EntityType, ENTITY_TYPES};

// ============================================================================
// ERROR TYPES
// ============================================================================

/// Extraction error type
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    /// The LLM call itself failed.
    #[error("llm call failed: {0}")]
    Llm(#[from] LlmError),
    /// The completion was not schema-shaped JSON even after normalization.
    #[error("completion parse failed: {0}")]
    Parse(String),
}

// ============================================================================
// EXTRACTION TYPES
// ============================================================================

/// An entity produced by stage 1.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedEntity {
    pub name: String,
    pub entity_type: EntityType,
    pub description: String,
}

/// A relation triplet whose endpoints resolved to known entities.
#[derive(Debug, Clone)]
pub struct ResolvedTriplet {
    pub subject: ExtractedEntity,
    pub relation: String,
    pub object: ExtractedEntity,
}

/// Outcome of stage 2 for one chunk.
#[derive(Debug, Default)]
pub struct RelationExtraction {
    /// Triplets that passed validation, in completion order, deduplicated.
    pub triplets: Vec<ResolvedTriplet>,
    /// Triplets dropped because an endpoint was unknown or ambiguous.
    pub skipped: usize,
}

// ============================================================================
// WIRE FORMAT
// ============================================================================

#[derive(Debug, Deserialize)]
struct EntityPayload {
    #[serde(default)]
    entities: Vec<EntityDto>,
}

#[derive(Debug, Deserialize)]
struct EntityDto {
    #[serde(default)]
    name: String,
    #[serde(rename = "type", default)]
    entity_type: String,
    #[serde(default)]
    description: String,
}

#[derive(Debug, Deserialize)]
struct RelationPayload {
    #[serde(default)]
    triplets: Vec<TripletDto>,
}

#[derive(Debug, Deserialize)]
struct TripletDto {
    #[serde(default)]
    subject: String,
    #[serde(default)]
    relation: String,
    #[serde(default)]
    object: String,
}

// ============================================================================
// PROMPTS & SCHEMAS
// ============================================================================

const ENTITY_PROMPT: &str = "Extract the entities mentioned in the text below. \
For each entity return its name exactly as written, one type tag from the \
allowed set, and a one-sentence description.\n\nAllowed types: {types}\n\n\
Text:\n{text}";

const RELATION_PROMPT: &str = "Extract relations between the entities listed \
below, based only on the text. Return triplets whose subject and object are \
names from the entity list, with a short relation label.\n\n\
Entities: {entities}\n\nText:\n{text}";

fn entity_schema() -> Value {
    let types: Vec<&str> = ENTITY_TYPES.iter().map(|t| t.as_str()).collect();
    serde_json::json!({
        "type": "object",
        "properties": {
            "entities": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "name": { "type": "string" },
                        "type": { "type": "string", "enum": types },
                        "description": { "type": "string" }
                    },
                    "required": ["name", "type"]
                }
            }
        },
        "required": ["entities"]
    })
}

fn relation_schema() -> Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "triplets": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "subject": { "type": "string" },
                        "relation": { "type": "string" },
                        "object": { "type": "string" }
                    },
                    "required": ["subject", "relation", "object"]
                }
            }
        },
        "required": ["triplets"]
    })
}

// ============================================================================
// RESPONSE NORMALIZATION
// ============================================================================

/// Replace any top-level field of `object` whose value is an array of strings
/// with the comma-space join of its elements.
///
/// Some endpoints return `"object": ["A", "B"]` where the schema says string;
/// joining preserves the data instead of failing the whole chunk.
fn coerce_string_arrays(object: &mut Value) {
    let Some(map) = object.as_object_mut() else {
        return;
    };
    for (field, value) in map.iter_mut() {
        let Some(items) = value.as_array() else {
            continue;
        };
        if items.is_empty() || !items.iter().all(|v| v.is_string()) {
            continue;
        }
        let joined = items
            .iter()
            .filter_map(|v| v.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        tracing::warn!(
            field = %field,
            elements = items.len(),
            "coerced array-valued completion field to joined string"
        );
        *value = Value::String(joined);
    }
}

/// Parse a completion into JSON and coerce array-valued string fields inside
/// every element of every top-level array (entities, triplets).
fn parse_normalized(completion: &str) -> Result<Value, ExtractError> {
    let mut value: Value =
        serde_json::from_str(completion).map_err(|e| ExtractError::Parse(e.to_string()))?;

    if let Some(map) = value.as_object_mut() {
        for item in map.values_mut() {
            if let Some(items) = item.as_array_mut() {
                for element in items.iter_mut() {
                    coerce_string_arrays(element);
                }
            }
        }
    }

    Ok(value)
}

// ============================================================================
// EXTRACTOR
// ============================================================================

/// Two-stage entity/relation extractor over an [`LlmClient`].
pub struct Extractor<L> {
    llm: L,
}

impl<L: LlmClient> Extractor<L> {
    /// Create an extractor over the given client.
    pub fn new(llm: L) -> Self {
        Self { llm }
    }

    /// Stage 1: extract typed entities from `text`.
    ///
    /// Entities with empty names are dropped; unknown type tags are
    /// normalized to `Concept`. Duplicate `(name, type)` pairs keep the
    /// first occurrence.
    pub async fn extract_entities(&self, text: &str) -> Result<Vec<ExtractedEntity>, ExtractError> {
        let types = ENTITY_TYPES
            .iter()
            .map(|t| t.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        let prompt = ENTITY_PROMPT
            .replace("{types}", &types)
            .replace("{text}", text);

        let completion = self.llm.complete_with_schema(&prompt, &entity_schema()).await?;
        let value = parse_normalized(&completion)?;
        let payload: EntityPayload =
            serde_json::from_value(value).map_err(|e| ExtractError::Parse(e.to_string()))?;

        let mut seen: HashMap<(String, EntityType), ()> = HashMap::new();
        let mut entities = Vec::new();
        for dto in payload.entities {
            let name = dto.name.trim().to_string();
            if name.is_empty() {
                continue;
            }
            let entity_type = match EntityType::parse_name(&dto.entity_type) {
                Some(t) => t,
                None => {
                    tracing::warn!(
                        entity_type = %dto.entity_type,
                        "unknown entity type from completion; defaulting to Concept"
                    );
                    EntityType::Concept
                }
            };
            if seen.insert((normalize(&name), entity_type), ()).is_some() {
                continue;
            }
            entities.push(ExtractedEntity {
                name,
                entity_type,
                description: dto.description.trim().to_string(),
            });
        }
        Ok(entities)
    }

    /// Stage 2: extract relation triplets constrained to `entities`.
    pub async fn extract_relations(
        &self,
        text: &str,
        entities: &[ExtractedEntity],
    ) -> Result<RelationExtraction, ExtractError> {
        if entities.is_empty() {
            return Ok(RelationExtraction::default());
        }

        let listing = entities
            .iter()
            .map(|e| format!("{} ({})", e.name, e.entity_type))
            .collect::<Vec<_>>()
            .join("; ");
        let prompt = RELATION_PROMPT
            .replace("{entities}", &listing)
            .replace("{text}", text);

        let completion = self.llm.complete_with_schema(&prompt, &relation_schema()).await?;
        let value = parse_normalized(&completion)?;
        let payload: RelationPayload =
            serde_json::from_value(value).map_err(|e| ExtractError::Parse(e.to_string()))?;

        Ok(validate_triplets(payload.triplets, entities))
    }
}

/// Validate and deduplicate raw triplets against the known entity set.
fn validate_triplets(raw: Vec<TripletDto>, entities: &[ExtractedEntity]) -> RelationExtraction {
    // Normalized name -> every entity carrying it. More than one type for a
    // name makes the name ambiguous as a triplet endpoint.
    let mut by_name: HashMap<String, Vec<&ExtractedEntity>> = HashMap::new();
    for entity in entities {
        let key = normalize(&entity.name);
        let matches = by_name.entry(key).or_default();
        if !matches.iter().any(|m| m.entity_type == entity.entity_type) {
            matches.push(entity);
        }
    }

    let mut extraction = RelationExtraction::default();
    let mut seen: HashMap<(String, String, String), ()> = HashMap::new();

    for dto in raw {
        let subject = dto.subject.trim();
        let relation = dto.relation.trim();
        let object = dto.object.trim();
        if subject.is_empty() || relation.is_empty() || object.is_empty() {
            continue;
        }

        let key = (normalize(subject), normalize(relation), normalize(object));
        if seen.insert(key, ()).is_some() {
            continue;
        }

        let Some(resolved_subject) = resolve_endpoint(&by_name, subject, &mut extraction.skipped)
        else {
            continue;
        };
        let Some(resolved_object) = resolve_endpoint(&by_name, object, &mut extraction.skipped)
        else {
            continue;
        };

        extraction.triplets.push(ResolvedTriplet {
            subject: resolved_subject.clone(),
            relation: relation.to_string(),
            object: resolved_object.clone(),
        });
    }

    extraction
}

/// Resolve a triplet endpoint name to exactly one known entity.
fn resolve_endpoint<'a>(
    by_name: &'a HashMap<String, Vec<&'a ExtractedEntity>>,
    name: &str,
    skipped: &mut usize,
) -> Option<&'a ExtractedEntity> {
    match by_name.get(&normalize(name)).map(Vec::as_slice) {
        Some(&[single]) => Some(single),
        Some(multiple) if multiple.len() > 1 => {
            tracing::warn!(candidates = multiple.len(), "ambiguous triplet endpoint; edge skipped");
            *skipped += 1;
            None
        }
        _ => {
            tracing::debug!("triplet endpoint not in entity set; edge skipped");
            *skipped += 1;
            None
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
