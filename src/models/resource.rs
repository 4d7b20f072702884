use serde::{Deserialize, Serialize};

use crate::entities::resource_entity;
pub use crate::entities::{ResourceState, ResourceType, ResourceVisibility};

/// Country restriction declared on a resource. Country codes are ISO-3166 alpha-2.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", content = "countries", rename_all = "snake_case")]
pub enum RegionRestriction {
    /// Readable only from the listed countries.
    OnlyIn(Vec<String>),
    /// Readable everywhere except the listed countries.
    NotIn(Vec<String>),
}

impl RegionRestriction {
    /// An unknown requester country is excluded by an allow-list and allowed by a deny-list.
    pub fn excludes(&self, country: Option<&str>) -> bool {
        let listed = |countries: &[String]| {
            country.is_some_and(|c| countries.iter().any(|x| x.eq_ignore_ascii_case(c)))
        };
        match self {
            RegionRestriction::OnlyIn(countries) => !listed(countries),
            RegionRestriction::NotIn(countries) => listed(countries),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resource {
    pub id: String,
    #[serde(rename = "type")]
    pub resource_type: ResourceType,
    pub slug: String,
    pub created_by_id: Option<String>,
    pub visibility: ResourceVisibility,
    pub state: ResourceState,
    pub region_restriction: Option<RegionRestriction>,
}

impl Resource {
    /// Public and either published or in review.
    pub fn is_publicly_readable(&self) -> bool {
        self.visibility == ResourceVisibility::Public
            && matches!(self.state, ResourceState::Published | ResourceState::Review)
    }
}

impl TryFrom<resource_entity::Model> for Resource {
    type Error = serde_json::Error;

    fn try_from(m: resource_entity::Model) -> Result<Self, Self::Error> {
        let region_restriction = m
            .region_restriction
            .filter(|raw| !raw.is_null())
            .map(serde_json::from_value::<RegionRestriction>)
            .transpose()?;
        Ok(Self {
            id: m.id,
            resource_type: m.resource_type,
            slug: m.slug,
            created_by_id: m.created_by_id,
            visibility: m.visibility,
            state: m.state,
            region_restriction,
        })
    }
}

/// Parent -> child edge. `position` orders siblings under one parent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceLink {
    pub parent_id: String,
    pub child_id: String,
    pub position: f64,
}

/// Flat resource graph as loaded from the store.
#[derive(Debug, Clone, Default)]
pub struct ResourceGraph {
    pub resources: Vec<Resource>,
    pub links: Vec<ResourceLink>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{ResourceState, ResourceType, ResourceVisibility};
    use serde_json::json;

    fn model(region_restriction: Option<serde_json::Value>) -> resource_entity::Model {
        resource_entity::Model {
            id: "w1".to_string(),
            resource_type: ResourceType::Workshop,
            slug: "w1".to_string(),
            created_by_id: None,
            visibility: ResourceVisibility::Public,
            state: ResourceState::Published,
            region_restriction,
            created_at: None,
            updated_at: None,
        }
    }

    #[test]
    fn test_region_restriction_from_model() {
        let r = Resource::try_from(model(Some(json!({"mode": "only_in", "countries": ["US"]}))))
            .unwrap();
        assert_eq!(
            r.region_restriction,
            Some(RegionRestriction::OnlyIn(vec!["US".to_string()]))
        );
        assert!(r.region_restriction.unwrap().excludes(Some("IN")));

        let unrestricted = Resource::try_from(model(None)).unwrap();
        assert_eq!(unrestricted.region_restriction, None);
        let null = Resource::try_from(model(Some(serde_json::Value::Null))).unwrap();
        assert_eq!(null.region_restriction, None);
    }

    #[test]
    fn test_malformed_region_restriction_is_an_error() {
        let bad = model(Some(json!({"mode": "only_in", "countries": "US"})));
        assert!(Resource::try_from(bad).is_err());

        let unknown_mode = model(Some(json!({"mode": "everywhere", "countries": []})));
        assert!(Resource::try_from(unknown_mode).is_err());
    }
}
