//! Ranking policy: one oracle call per chunk of at most `RANKING_CHUNK_SIZE`
//! candidates, outputs joined in chunk order.

use tracing::debug;

use crate::candidates::models::CandidateProfile;
use crate::llm_client::prompts::ranking_prompt;
use crate::llm_client::{LlmError, RankingOracle};

/// Upper bound on candidates per ranking prompt.
pub const RANKING_CHUNK_SIZE: usize = 10;

/// Scores `profiles` against `job_description`.
///
/// Candidates keep their order; the per-chunk rankings are separated by a
/// blank line. The first failing call aborts the whole ranking.
pub async fn rank_candidates(
    oracle: &dyn RankingOracle,
    profiles: &[CandidateProfile],
    job_description: &str,
) -> Result<String, LlmError> {
    let total_chunks = profiles.len().div_ceil(RANKING_CHUNK_SIZE);
    let mut rankings = Vec::with_capacity(total_chunks);

    for (index, chunk) in profiles.chunks(RANKING_CHUNK_SIZE).enumerate() {
        debug!(
            chunk = index + 1,
            total_chunks,
            candidates = chunk.len(),
            "Ranking chunk"
        );
        let candidate_infos = chunk
            .iter()
            .map(|p| p.info.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");
        let prompt = ranking_prompt(job_description, &candidate_infos);
        rankings.push(oracle.complete(&prompt).await?);
    }

    Ok(rankings.join("\n\n"))
}
