pub mod audit;
pub mod bulk;
pub mod function;
pub mod group;
pub mod individual;
pub mod position;
pub mod profile;
