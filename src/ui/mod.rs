pub mod meter;
pub mod prompt;
pub mod widgets;
