use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;

use crate::error::AppResult;
use crate::models::{
    AbilityContext, Action, EntitlementSourceType, Purchase, PurchaseStatus, Resource, Rule,
    RuleEffect, RuleReason, SubjectPredicate, UserRole,
};
use crate::repositories::{MembershipStore, PurchaseStore, ResourceStore};
use crate::services::{EntitlementService, ResourceTree};

/// First rule whose actions and subject match decides; no match means denied.
pub fn can(rules: &[Rule], action: Action, resource: &Resource) -> bool {
    rules
        .iter()
        .find(|r| r.applies_to(action, resource))
        .is_some_and(|r| r.effect == RuleEffect::Can)
}

fn public_rule() -> Rule {
    Rule::can(
        vec![Action::Read],
        SubjectPredicate::PublicPublished,
        RuleReason::PublicContent,
    )
}

/// Builds ordered ability rules for a caller and answers read checks.
#[derive(Clone)]
pub struct AuthorizationService {
    resources: Arc<dyn ResourceStore>,
    memberships: Arc<dyn MembershipStore>,
    purchases: Arc<dyn PurchaseStore>,
    entitlements: EntitlementService,
}

impl AuthorizationService {
    pub fn new(
        resources: Arc<dyn ResourceStore>,
        memberships: Arc<dyn MembershipStore>,
        purchases: Arc<dyn PurchaseStore>,
        entitlements: EntitlementService,
    ) -> Self {
        Self {
            resources,
            memberships,
            purchases,
            entitlements,
        }
    }

    /// Rules in evaluation order. With `resource_id`, inherited access is resolved for
    /// that resource only; without it, every descendant of an entitled resource is listed.
    pub async fn get_ability_rules(
        &self,
        ctx: &AbilityContext,
        resource_id: Option<&str>,
    ) -> AppResult<Vec<Rule>> {
        let Some(user_id) = ctx.user_id.as_deref() else {
            return Ok(vec![public_rule()]);
        };

        let mut rules = Vec::new();
        let user = self.memberships.get_user(user_id).await?;
        if user.as_ref().is_some_and(|u| u.has_role(UserRole::Admin)) {
            rules.push(Rule::can(
                vec![Action::Manage],
                SubjectPredicate::Any,
                RuleReason::Admin,
            ));
        }
        if user
            .as_ref()
            .is_some_and(|u| u.has_role(UserRole::Contributor))
        {
            rules.push(Rule::can(
                vec![
                    Action::Manage,
                    Action::Save,
                    Action::Publish,
                    Action::Archive,
                    Action::Unpublish,
                ],
                SubjectPredicate::CreatedBy {
                    user_id: user_id.to_string(),
                },
                RuleReason::Contributor,
            ));
        }

        // 地区限制必须排在权益规则之前
        rules.push(Rule::cannot(
            vec![Action::Read],
            SubjectPredicate::RegionExcludes {
                country: ctx.country.clone(),
            },
            RuleReason::RegionRestriction,
        ));

        let entitled = self
            .entitled_resource_ids(user_id, ctx.country.as_deref())
            .await?;
        if !entitled.is_empty() {
            rules.push(Rule::can(
                vec![Action::Read],
                SubjectPredicate::ResourceIds {
                    ids: entitled.iter().cloned().collect(),
                },
                RuleReason::Entitlement,
            ));

            let inherited = self.inherited_ids(&entitled, resource_id).await?;
            if !inherited.is_empty() {
                rules.push(Rule::can(
                    vec![Action::Read],
                    SubjectPredicate::ResourceIds {
                        ids: inherited.into_iter().collect(),
                    },
                    RuleReason::ParentEntitlement,
                ));
            }
        }

        rules.push(public_rule());
        Ok(rules)
    }

    /// `false` for unknown resources.
    pub async fn can_read(&self, ctx: &AbilityContext, resource_id: &str) -> AppResult<bool> {
        let Some(resource) = self.resources.get_resource(resource_id).await? else {
            return Ok(false);
        };
        let rules = self.get_ability_rules(ctx, Some(resource_id)).await?;
        Ok(can(&rules, Action::Read, &resource))
    }

    /// Content ids from active entitlements whose purchase still grants access.
    async fn entitled_resource_ids(
        &self,
        user_id: &str,
        country: Option<&str>,
    ) -> AppResult<BTreeSet<String>> {
        let entitlements = self.entitlements.list_active_for_user(user_id).await?;
        if entitlements.is_empty() {
            return Ok(BTreeSet::new());
        }
        let purchases: HashMap<String, Purchase> = self
            .purchases
            .get_purchases_for_user(user_id)
            .await?
            .into_iter()
            .map(|p| (p.id.clone(), p))
            .collect();

        let mut ids = BTreeSet::new();
        for e in entitlements {
            if e.source_type == EntitlementSourceType::Purchase
                && let Some(p) = purchases.get(&e.source_id)
            {
                let counts = match p.status {
                    PurchaseStatus::Valid => true,
                    PurchaseStatus::Restricted => match (p.country.as_deref(), country) {
                        (Some(bought_in), Some(here)) => bought_in.eq_ignore_ascii_case(here),
                        _ => false,
                    },
                    PurchaseStatus::Refunded | PurchaseStatus::Disputed => false,
                };
                if !counts {
                    continue;
                }
            }
            ids.extend(e.metadata.content_ids);
        }
        Ok(ids)
    }

    async fn inherited_ids(
        &self,
        entitled: &BTreeSet<String>,
        resource_id: Option<&str>,
    ) -> AppResult<BTreeSet<String>> {
        let tree = ResourceTree::from_graph(self.resources.load_resource_graph().await?)?;
        match resource_id {
            Some(id) => {
                let candidates: HashSet<String> = entitled.iter().cloned().collect();
                let mut out = BTreeSet::new();
                if !entitled.contains(id) && tree.has_ancestor_in(id, &candidates) {
                    out.insert(id.to_string());
                }
                Ok(out)
            }
            None => {
                let mut out = BTreeSet::new();
                for id in entitled {
                    out.extend(tree.get_all_descendant_ids(id)?);
                }
                out.retain(|id| !entitled.contains(id));
                Ok(out)
            }
        }
    }
}
