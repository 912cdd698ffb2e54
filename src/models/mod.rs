pub mod library;
pub mod node;
pub mod params;
