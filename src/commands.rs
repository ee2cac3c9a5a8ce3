pub mod evaluate;
pub mod info;
pub mod leaderboard;
pub mod metadata;
pub mod validate;
