pub mod coupons;
pub mod entitlements;
pub mod organization_memberships;
pub mod organizations;
pub mod product_resources;
pub mod products;
pub mod purchases;
pub mod resource_links;
pub mod resources;
pub mod users;

pub use coupons as coupon_entity;
pub use entitlements as entitlement_entity;
pub use organization_memberships as organization_membership_entity;
pub use organizations as organization_entity;
pub use product_resources as product_resource_entity;
pub use products as product_entity;
pub use purchases as purchase_entity;
pub use resource_links as resource_link_entity;
pub use resources as resource_entity;
pub use users as user_entity;

pub use entitlements::EntitlementSourceType;
pub use organization_memberships::MembershipRole;
pub use products::ProductType;
pub use purchases::PurchaseStatus;
pub use resources::{ResourceState, ResourceType, ResourceVisibility};
