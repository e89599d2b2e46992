pub mod data;
pub mod tracker;
