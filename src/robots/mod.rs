//! Robots handling module
//!
//! The store only applies already-parsed rules; [`parser`] turns a robots.txt
//! body into those rules for the default HTTP collaborator.

mod parser;
mod rules;

pub use parser::ParsedRobots;
pub use rules::{resolve, resolve_canonical, Indexability, RobotsRule, RobotsRules};
