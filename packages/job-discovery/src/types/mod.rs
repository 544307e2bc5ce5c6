pub mod config;
pub mod item;
pub mod result;
pub mod verdict;
