pub mod matcher;
pub mod scoring;
pub mod sequencer;
