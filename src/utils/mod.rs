pub mod country;
pub mod jwt;

pub use country::*;
pub use jwt::*;
