use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::Resource;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    /// Matches every action.
    Manage,
    Read,
    Save,
    Publish,
    Archive,
    Unpublish,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum RuleEffect {
    Can,
    Cannot,
}

/// Which resources a rule applies to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SubjectPredicate {
    Any,
    ResourceIds { ids: Vec<String> },
    CreatedBy { user_id: String },
    RegionExcludes { country: Option<String> },
    PublicPublished,
}

impl SubjectPredicate {
    pub fn matches(&self, resource: &Resource) -> bool {
        match self {
            SubjectPredicate::Any => true,
            SubjectPredicate::ResourceIds { ids } => ids.iter().any(|id| id == &resource.id),
            SubjectPredicate::CreatedBy { user_id } => {
                resource.created_by_id.as_deref() == Some(user_id.as_str())
            }
            SubjectPredicate::RegionExcludes { country } => resource
                .region_restriction
                .as_ref()
                .is_some_and(|r| r.excludes(country.as_deref())),
            SubjectPredicate::PublicPublished => resource.is_publicly_readable(),
        }
    }
}

/// Why a rule exists; carried for audit output only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum RuleReason {
    Admin,
    Contributor,
    RegionRestriction,
    Entitlement,
    ParentEntitlement,
    PublicContent,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Rule {
    pub effect: RuleEffect,
    pub actions: Vec<Action>,
    pub subject: SubjectPredicate,
    pub reason: RuleReason,
}

impl Rule {
    pub fn can(actions: Vec<Action>, subject: SubjectPredicate, reason: RuleReason) -> Self {
        Self {
            effect: RuleEffect::Can,
            actions,
            subject,
            reason,
        }
    }

    pub fn cannot(actions: Vec<Action>, subject: SubjectPredicate, reason: RuleReason) -> Self {
        Self {
            effect: RuleEffect::Cannot,
            actions,
            subject,
            reason,
        }
    }

    pub fn applies_to(&self, action: Action, resource: &Resource) -> bool {
        let action_matches = self
            .actions
            .iter()
            .any(|a| *a == Action::Manage || *a == action);
        action_matches && self.subject.matches(resource)
    }
}

/// Who is asking. `user_id` is `None` for anonymous callers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AbilityContext {
    pub user_id: Option<String>,
    pub country: Option<String>,
}

impl AbilityContext {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn user(user_id: impl Into<String>) -> Self {
        Self {
            user_id: Some(user_id.into()),
            country: None,
        }
    }

    pub fn with_country(mut self, country: impl Into<String>) -> Self {
        self.country = Some(country.into());
        self
    }
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct AbilityQuery {
    pub resource_id: Option<String>,
    pub country: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CanReadResponse {
    pub resource_id: String,
    pub can_read: bool,
}
