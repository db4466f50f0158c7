//! Rank command: inspect the candidates of one rules document.

use std::path::Path;

use console::style;

use tournoi_signup::config::Config;
use tournoi_signup::discovery::candidates_from_text;
use tournoi_signup::documents::{PdfToTextExtractor, TextExtractor};
use tournoi_signup::ranking::rank_candidates;
use tournoi_signup::skip_list::SkipList;

/// Extract, filter and rank the URLs of a rules document.
pub async fn cmd_rank(config: &Config, file: &Path) -> anyhow::Result<()> {
    let bytes = tokio::fs::read(file).await?;
    let text = PdfToTextExtractor::new().extract_text(&bytes).await?;

    let skip_list = SkipList::from_config(&config.skip_list);
    let ranked = rank_candidates(candidates_from_text(&text, &skip_list), &text);

    if ranked.is_empty() {
        println!("{} No candidate URL in {}", style("!").yellow(), file.display());
        return Ok(());
    }

    println!(
        "{} {} candidate(s) in {}",
        style("✓").green(),
        ranked.len(),
        file.display()
    );
    for candidate in &ranked {
        println!(
            "  {:>5}  {}",
            style(candidate.score).cyan(),
            candidate.raw_url
        );
    }
    Ok(())
}
