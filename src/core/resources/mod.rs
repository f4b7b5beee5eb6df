pub mod catalog;
pub mod recommender;

pub use catalog::{Audience, Category, Resource, RESOURCES};
pub use recommender::{recommend, recommend_with_catalog};
