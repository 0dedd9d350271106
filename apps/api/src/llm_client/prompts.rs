// Prompt templates for the résumé pipeline.
// Placeholders are substituted with `str::replace`.

/// System prompt shared by every call.
pub const RECRUITER_SYSTEM: &str = "You are an experienced technical recruiter. \
    Answer in plain text only. \
    Do NOT use markdown, bullet symbols, or code fences. \
    Do NOT include explanations or apologies.";

/// Turns raw résumé text into the line-oriented profile the candidate parser reads.
pub const EXTRACTION_PROMPT: &str = "\
Extract the following fields from the resume below. Write each field on its own line, \
exactly in this form, leaving the value empty when the resume does not mention it:
Name: <full name>
Mail: <email address>
Linkedin ID: <linkedin profile or handle>
Education: <degrees and institutions, one line>
Work Experience: <roles, companies and durations, one line>
Skills: <comma-separated list of skills>

Resume:
{resume_text}";

/// Scores a group of candidate profiles against the job description.
pub const RANKING_PROMPT: &str = "\
Job description:
{job_desc}

Score every candidate below from 0 to 100 for how well they fit the job description. \
For each candidate write one block, separated from the next block by a blank line, \
in exactly this form:
Name: <candidate name as given>
Score: <integer 0-100>
Reason: <one sentence>

Candidates:
{candidate_infos}";

pub fn extraction_prompt(resume_text: &str) -> String {
    EXTRACTION_PROMPT.replace("{resume_text}", resume_text)
}

pub fn ranking_prompt(job_desc: &str, candidate_infos: &str) -> String {
    RANKING_PROMPT
        .replace("{job_desc}", job_desc)
        .replace("{candidate_infos}", candidate_infos)
}
