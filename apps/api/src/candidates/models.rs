use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// The structured profile text the oracle produced for one résumé file.
#[derive(Debug, Clone)]
pub struct CandidateProfile {
    pub file_name: String,
    pub info: String,
}

/// A persisted candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct CandidateRecord {
    pub id: Uuid,
    pub session_id: Uuid,
    pub file_name: String,
    pub name: String,
    pub mail: String,
    pub linkedin: String,
    pub education: String,
    pub work_experience: String,
    pub skills: Vec<String>,
    /// Stored as 0; listings assign the position by score.
    pub rank: i32,
    pub score: i32,
    pub created_at: DateTime<Utc>,
}

impl CandidateRecord {
    /// Builds a record from a profile and the ranking text of its batch.
    pub fn from_profile(session_id: Uuid, profile: &CandidateProfile, ranking_text: &str) -> Self {
        let mut record = CandidateRecord {
            id: Uuid::new_v4(),
            session_id,
            file_name: profile.file_name.clone(),
            name: String::new(),
            mail: String::new(),
            linkedin: String::new(),
            education: String::new(),
            work_experience: String::new(),
            skills: Vec::new(),
            rank: 0,
            score: 0,
            created_at: Utc::now(),
        };

        for line in profile.info.lines() {
            let Some((key, value)) = line.split_once(':') else {
                continue;
            };
            let value = value.trim();
            match key.trim().to_lowercase().as_str() {
                "name" => record.name = value.to_string(),
                "mail" | "email" => record.mail = value.to_string(),
                "linkedin id" | "linkedin" => record.linkedin = value.to_string(),
                "education" => record.education = value.to_string(),
                "work experience" => record.work_experience = value.to_string(),
                "skills" => {
                    record.skills = value
                        .split(',')
                        .map(str::trim)
                        .filter(|s| !s.is_empty())
                        .map(String::from)
                        .collect()
                }
                _ => {}
            }
        }

        record.score = score_for(ranking_text, &record.name).unwrap_or(0);
        record
    }
}

/// Finds the score the ranking text gives to `name`.
///
/// The ranking text is a sequence of blank-line separated blocks, each with a
/// `Name:` and a `Score:` line. The first block whose name matches
/// (case-insensitive) wins.
pub fn score_for(ranking_text: &str, name: &str) -> Option<i32> {
    let wanted = name.trim().to_lowercase();
    if wanted.is_empty() {
        return None;
    }

    for block in ranking_text.trim().split("\n\n") {
        let mut block_name = None;
        let mut block_score = None;
        for line in block.lines() {
            let line = line.trim();
            if let Some(value) = strip_prefix_ignore_case(line, "name:") {
                block_name = Some(value.trim().to_lowercase());
            } else if let Some(value) = strip_prefix_ignore_case(line, "score:") {
                block_score = leading_integer(value);
            }
        }
        if block_name.as_deref() == Some(wanted.as_str()) {
            return block_score;
        }
    }
    None
}

fn strip_prefix_ignore_case<'a>(line: &'a str, prefix: &str) -> Option<&'a str> {
    let head = line.get(..prefix.len())?;
    head.eq_ignore_ascii_case(prefix)
        .then(|| &line[prefix.len()..])
}

/// First run of ASCII digits in `value`, e.g. `"85/100"` → 85.
fn leading_integer(value: &str) -> Option<i32> {
    let start = value.find(|c: char| c.is_ascii_digit())?;
    let digits: String = value[start..]
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok()
}

/// Orders records by descending score and assigns 1-based ranks.
/// Ties keep their stored order.
pub fn rank_by_score(mut records: Vec<CandidateRecord>) -> Vec<CandidateRecord> {
    records.sort_by(|a, b| b.score.cmp(&a.score));
    for (position, record) in records.iter_mut().enumerate() {
        record.rank = position as i32 + 1;
    }
    records
}

#[cfg(test)]
mod tests {
    use super::*;

    const PROFILE: &str = "Name: Ada Lovelace\n\
        Mail: ada@example.com\n\
        Linkedin ID: linkedin.com/in/ada\n\
        Education: University of London\n\
        Work Experience: Analyst: Babbage & Co, 1842-1843\n\
        Skills: Mathematics, Rust ,  , Algorithms";

    fn profile(info: &str) -> CandidateProfile {
        CandidateProfile {
            file_name: "ada.pdf".to_string(),
            info: info.to_string(),
        }
    }

    #[test]
    fn test_profile_fields_parsed() {
        let ranking = "Name: Ada Lovelace\nScore: 88\nReason: strong";
        let record = CandidateRecord::from_profile(Uuid::nil(), &profile(PROFILE), ranking);

        assert_eq!(record.file_name, "ada.pdf");
        assert_eq!(record.name, "Ada Lovelace");
        assert_eq!(record.mail, "ada@example.com");
        assert_eq!(record.linkedin, "linkedin.com/in/ada");
        assert_eq!(record.education, "University of London");
        // Only the first colon separates key from value.
        assert_eq!(record.work_experience, "Analyst: Babbage & Co, 1842-1843");
        assert_eq!(record.skills, vec!["Mathematics", "Rust", "Algorithms"]);
        assert_eq!(record.rank, 0);
        assert_eq!(record.score, 88);
    }

    #[test]
    fn test_score_matches_block_by_name() {
        let ranking = "Name: Grace Hopper\nScore: 95\n\nname: ADA LOVELACE\nscore: 72/100";
        assert_eq!(score_for(ranking, "Ada Lovelace"), Some(72));
        assert_eq!(score_for(ranking, "Grace Hopper"), Some(95));
        assert_eq!(score_for(ranking, "Alan Turing"), None);
    }

    #[test]
    fn test_empty_name_never_matches() {
        let ranking = "Score: 50";
        assert_eq!(score_for(ranking, ""), None);
        let record = CandidateRecord::from_profile(Uuid::nil(), &profile("Mail: x@y.z"), ranking);
        assert_eq!(record.score, 0);
    }

    #[test]
    fn test_unparsable_score_defaults_to_zero() {
        let ranking = "Name: Ada Lovelace\nScore: excellent";
        let record = CandidateRecord::from_profile(Uuid::nil(), &profile(PROFILE), ranking);
        assert_eq!(record.score, 0);
    }

    #[test]
    fn test_rank_by_score_orders_and_numbers() {
        let base = CandidateRecord::from_profile(Uuid::nil(), &profile(PROFILE), "");
        let with_score = |file: &str, score: i32| CandidateRecord {
            file_name: file.to_string(),
            score,
            ..base.clone()
        };
        let ranked = rank_by_score(vec![
            with_score("a.pdf", 40),
            with_score("b.pdf", 90),
            with_score("c.pdf", 40),
        ]);

        let order: Vec<_> = ranked
            .iter()
            .map(|r| (r.file_name.as_str(), r.rank))
            .collect();
        assert_eq!(order, vec![("b.pdf", 1), ("a.pdf", 2), ("c.pdf", 3)]);
    }
}
