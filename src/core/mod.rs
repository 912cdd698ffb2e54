pub mod events;
pub mod extension;
pub mod importer;
pub mod progress;
pub mod scanner;
