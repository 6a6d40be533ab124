mod classify;

pub use classify::classify_variation;
