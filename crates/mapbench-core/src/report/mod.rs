pub mod console;
pub mod leaderboard;

pub use console::{render_cache_stats, render_leaderboard};
pub use leaderboard::build_leaderboard;
