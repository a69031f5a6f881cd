pub mod groups;
pub mod places;
