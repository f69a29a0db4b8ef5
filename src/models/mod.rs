pub mod matching;
pub mod rewards;
pub mod ride;
