// Flow prompt templates.
// Placeholders use `{{{name}}}` and are filled verbatim from the flow input.

pub const RESUME_OPTIMIZATION_PROMPT: &str = r#"You are an expert resume optimizer, specializing in tailoring resumes for Applicant Tracking Systems (ATS). Your goal is to provide actionable suggestions that improve the resume's compatibility and ranking within ATS systems, increasing the likelihood of the candidate being selected for an interview.

Analyze the provided resume in relation to the job description. Focus on missing keywords, formatting that hurts ATS parsing, and sections that need work to match the job requirements.

Job Description: {{{jobDescription}}}

Resume: {{{resume}}}

Give specific, clear and concise suggestions that are easy to apply. Cover:

  *   **Keyword Optimization:** relevant keywords from the job description that are missing from the resume, and where to work them in naturally.
  *   **Formatting Improvements:** changes that improve ATS parsing accuracy, such as standard section headings ("Summary", "Experience", "Education"), no tables or images, and consistent formatting.
  *   **Content Enhancement:** concrete improvements per section, such as quantified achievements, relevant skills and a summary aligned with the role.
  *   **ATS Compatibility:** simple fonts, no headers or footers, and a compatible file format (.docx or .pdf).

Use only experience already present in the resume. Return the suggestions in the `optimizedResumeSuggestions` field as a single string."#;

pub const INTERVIEW_QUESTIONS_PROMPT: &str = r#"You are an expert recruitment consultant. Generate a list of 5 to 7 insightful interview questions for a candidate applying for the role of '{{{jobTitle}}}'.

Base the questions on the job description below so they assess the candidate's suitability, skills and experience. Mix technical, behavioral and situational questions.

Job Description:
{{{jobDescription}}}

Return the questions in the `questions` array, one question per item."#;

/// The chat flow forwards the user's message unchanged.
pub const CHAT_PROMPT: &str = "{{{input}}}";
