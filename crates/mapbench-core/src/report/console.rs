//! Plain-text renderings for terminals.

use std::fmt::Write as _;

use crate::cache::CacheStats;
use crate::model::LeaderboardEntry;

pub fn render_leaderboard(rows: &[LeaderboardEntry]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "MapBench Leaderboard");
    let _ = writeln!(out, "====================");
    let _ = writeln!(
        out,
        "{:<5} {:<30} {:>9} {:>10} {:>10} {:>10} {:>14}",
        "RANK", "MODEL", "OVERALL%", "QUESTIONS", "AVG_TIME", "COST($)", "TOKENS(in/out)"
    );
    let _ = writeln!(
        out,
        "{:-<5} {:-<30} {:-<9} {:-<10} {:-<10} {:-<10} {:-<14}",
        "", "", "", "", "", "", ""
    );

    if rows.is_empty() {
        let _ = writeln!(out, "(no models evaluated)");
        return out;
    }

    for row in rows {
        let avg_time = row
            .avg_execution_time
            .map(|t| format!("{:.2}s", t))
            .unwrap_or_else(|| "-".to_string());
        let _ = writeln!(
            out,
            "{:<5} {:<30} {:>9.2} {:>10} {:>10} {:>10.4} {:>14}",
            row.rank,
            row.model_id,
            row.overall_score,
            row.total_questions,
            avg_time,
            row.total_cost,
            format!("{}/{}", row.total_input_tokens, row.total_output_tokens),
        );
    }
    out
}

pub fn render_cache_stats(stats: &CacheStats) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Cache Statistics");
    let _ = writeln!(out, "================");
    let _ = writeln!(out, "Directory: {}", stats.cache_dir.display());
    let _ = writeln!(out, "Version:   {}", stats.version);
    let _ = writeln!(out, "Entries:   {}", stats.entry_count);
    let _ = writeln!(
        out,
        "Size:      {:.2} MB ({} bytes)",
        stats.total_mb(),
        stats.total_bytes
    );
    if !stats.by_model.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "{:<30} {:>8}", "MODEL", "ENTRIES");
        for (model, count) in &stats.by_model {
            let _ = writeln!(out, "{:<30} {:>8}", model, count);
        }
    }
    out
}
