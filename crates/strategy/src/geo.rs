//! Built-in geographic strategy
//!
//! Heuristics for location domains: place-phrase capture, coordinate
//! pairs, "near me" detection. Also carries the person-name pattern so
//! it can penalize a place interpretation when the same capitalized
//! span reads as a person's name; the two readings have to be weighed
//! against each other on the same query.

use intent_router_config::DomainConfig;
use intent_router_core::{ParameterSpec, ParameterType, TemplateMatch};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use crate::strategy::{DomainStrategy, PatternMatcher, SemanticExtractor};

static PLACE_PHRASE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(?i:in|near|at|around|from)\s+([A-Z][A-Za-z]+(?:\s[A-Z][A-Za-z]+)?)")
        .expect("place phrase regex")
});
static PERSON_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(?:(?i:mr|mrs|ms|dr)\.?\s+[A-Z][a-z]+|[A-Z][a-z]+\s+[A-Z][a-z]+)\b")
        .expect("person name regex")
});
static NEAR_ME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bnear\s+me\b").expect("near me regex"));
static COORDINATES: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(-?\d{1,3}\.\d+)\s*,\s*(-?\d{1,3}\.\d+)").expect("coordinates regex")
});
static RADIUS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:within\s+)?(\d+(?:\.\d+)?)\s*(?:km|kilometers?|mi|miles?)\b")
        .expect("radius regex")
});

const GEO_ENTITIES: &[&str] = &["location", "city", "place", "store", "branch", "region"];

fn extract_place_mention(query: &str) -> Option<Value> {
    let caps = PLACE_PHRASE.captures(query)?;
    Some(Value::String(caps.get(1)?.as_str().to_string()))
}

fn extract_coordinates(query: &str) -> Option<Value> {
    let caps = COORDINATES.captures(query)?;
    let lat: f64 = caps.get(1)?.as_str().parse().ok()?;
    let lon: f64 = caps.get(2)?.as_str().parse().ok()?;
    Some(serde_json::json!({ "latitude": lat, "longitude": lon }))
}

#[derive(Debug, Default)]
pub struct GeoStrategy;

impl GeoStrategy {
    pub fn new() -> Self {
        Self
    }
}

impl DomainStrategy for GeoStrategy {
    fn name(&self) -> &str {
        "geo"
    }

    fn aliases(&self) -> &[&str] {
        &["location", "locations", "geography", "places"]
    }

    fn calculate_domain_boost(
        &self,
        candidate: &TemplateMatch,
        query: &str,
        domain_config: Option<&DomainConfig>,
    ) -> f64 {
        let mut boost = 0.0;
        let entity = candidate.template.semantic_tags.primary_entity.to_lowercase();
        let entity_matches = GEO_ENTITIES.contains(&entity.as_str());

        if entity_matches {
            if NEAR_ME.is_match(query) || COORDINATES.is_match(query) {
                boost += 0.05;
            }
            if PLACE_PHRASE.is_match(query) {
                boost += 0.04;
                // The captured span may just as well be a person's
                // name; penalize the place reading when both fire.
                if PERSON_NAME.is_match(query) {
                    boost -= 0.06;
                }
            }
        }
        if let Some(config) = domain_config {
            boost += config.boost_for_query(query);
        }
        boost
    }

    fn pattern_matchers(&self) -> Vec<PatternMatcher> {
        vec![
            PatternMatcher::new("place_phrase", &PLACE_PHRASE),
            PatternMatcher::new("person_name", &PERSON_NAME),
            PatternMatcher::new("near_me", &NEAR_ME),
            PatternMatcher::new("coordinates", &COORDINATES),
        ]
    }

    fn extract_domain_parameters(
        &self,
        query: &str,
        param: &ParameterSpec,
        domain_config: Option<&DomainConfig>,
    ) -> Option<Value> {
        let name = param.name.to_lowercase();

        if name == "city" || name == "location" || name == "place" {
            if let Some(field) = domain_config.and_then(|c| c.fields.get(&param.name)) {
                for token in query.split_whitespace() {
                    if let Some(canonical) = field.canonicalize(token) {
                        return Some(Value::String(canonical));
                    }
                }
            }
            return extract_place_mention(query);
        }

        if name == "latitude" || name == "longitude" {
            let caps = COORDINATES.captures(query)?;
            let group = if name == "latitude" { 1 } else { 2 };
            let value: f64 = caps.get(group)?.as_str().parse().ok()?;
            return Some(Value::from(value));
        }

        if name.contains("radius") || name.contains("distance") {
            let caps = RADIUS.captures(query)?;
            let value: f64 = caps.get(1)?.as_str().parse().ok()?;
            return match param.param_type {
                ParameterType::Integer => Some(Value::from(value as i64)),
                _ => Some(Value::from(value)),
            };
        }

        None
    }

    fn semantic_extractors(&self) -> Vec<SemanticExtractor> {
        vec![
            SemanticExtractor {
                name: "place_mention",
                extract: extract_place_mention,
            },
            SemanticExtractor {
                name: "coordinates",
                extract: extract_coordinates,
            },
        ]
    }
}
