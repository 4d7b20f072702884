pub mod authorization_service;
pub mod coupon_validator;
pub mod entitlement_service;
pub mod price_calculator;
pub mod pricing_service;
pub mod resource_tree;
pub mod seat_redemption_service;

pub use authorization_service::*;
pub use coupon_validator::*;
pub use entitlement_service::*;
pub use price_calculator::*;
pub use pricing_service::*;
pub use resource_tree::*;
pub use seat_redemption_service::*;
