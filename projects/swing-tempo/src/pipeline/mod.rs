// Swing analysis pipeline: frames -> poses -> series -> events -> tempo

pub mod events;
pub mod orchestrator;
pub mod reader;
pub mod series;
pub mod smoothing;
pub mod tempo;
