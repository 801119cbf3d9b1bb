pub mod claims;
pub mod clean;
pub mod language;
pub mod validate;
