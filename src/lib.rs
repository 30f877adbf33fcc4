pub mod cli;
pub mod config;
pub mod corpus;
pub mod detection;
pub mod error;
pub mod finder;
pub mod ingredients;
pub mod measurements;
pub mod recommender;

pub use finder::RecipeFinder;
