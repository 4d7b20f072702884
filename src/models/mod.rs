pub mod ability;
pub mod common;
pub mod coupon;
pub mod entitlement;
pub mod organization;
pub mod pricing;
pub mod product;
pub mod purchase;
pub mod redemption;
pub mod resource;

pub use ability::*;
pub use common::*;
pub use coupon::*;
pub use entitlement::*;
pub use organization::*;
pub use pricing::*;
pub use product::*;
pub use purchase::*;
pub use redemption::*;
pub use resource::*;
