//! The flows this service ships with, plus typed helpers for calling them.

use serde::{Deserialize, Serialize};

use super::prompts::{CHAT_PROMPT, INTERVIEW_QUESTIONS_PROMPT, RESUME_OPTIMIZATION_PROMPT};
use super::schema::{Field, Schema};
use super::{FlowDefinition, FlowError, FlowRegistry, Flows};
use crate::llm_client::{HarmBlockThreshold, HarmCategory, ModelConfig};

pub const RESUME_OPTIMIZATION: &str = "resumeOptimization";
pub const INTERVIEW_QUESTIONS: &str = "interviewQuestions";
pub const CHAT: &str = "chat";

/// Minimum characters for both the resume and the job description.
pub const MIN_RESUME_OPTIMIZATION_CHARS: usize = 50;
pub const MIN_QUESTIONS: usize = 5;
pub const MAX_QUESTIONS: usize = 7;

/// Request body for resume optimization. Fields are optional at the type level
/// so an absent field reaches the input schema and is reported as `required`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResumeOptimizationInput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resume: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResumeOptimizationOutput {
    pub optimized_resume_suggestions: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterviewQuestionsInput {
    pub job_title: String,
    pub job_description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterviewQuestions {
    pub questions: Vec<String>,
}

pub fn resume_optimization() -> FlowDefinition {
    FlowDefinition {
        name: RESUME_OPTIMIZATION,
        input_schema: Schema::object(vec![
            Field::string(
                "jobDescription",
                "The job description for which to optimize the resume.",
            )
            .min_length(MIN_RESUME_OPTIMIZATION_CHARS),
            Field::string("resume", "The resume to optimize.")
                .min_length(MIN_RESUME_OPTIMIZATION_CHARS),
        ]),
        output_schema: Schema::object(vec![Field::string(
            "optimizedResumeSuggestions",
            "Suggestions for optimizing the resume for the given job description, tailored for ATS systems.",
        )
        .min_length(1)]),
        prompt_template: RESUME_OPTIMIZATION_PROMPT,
        model_config: ModelConfig::default(),
    }
}

pub fn interview_questions() -> FlowDefinition {
    FlowDefinition {
        name: INTERVIEW_QUESTIONS,
        input_schema: Schema::object(vec![
            Field::string("jobTitle", "The title of the job.").min_length(1),
            Field::string(
                "jobDescription",
                "The job description for which to generate questions.",
            )
            .min_length(1),
        ]),
        output_schema: Schema::object(vec![Field::string_array(
            "questions",
            "A list of 5-7 relevant interview questions based on the job description.",
        )
        .items(MIN_QUESTIONS, MAX_QUESTIONS)]),
        prompt_template: INTERVIEW_QUESTIONS_PROMPT,
        model_config: ModelConfig::default(),
    }
}

pub fn chat() -> FlowDefinition {
    FlowDefinition {
        name: CHAT,
        input_schema: Schema::text("The user's chat message.", Some(1)),
        output_schema: Schema::text("The model's reply.", None),
        prompt_template: CHAT_PROMPT,
        model_config: ModelConfig::default().with_safety(
            HarmCategory::HarmCategoryDangerousContent,
            HarmBlockThreshold::BlockOnlyHigh,
        ),
    }
}

/// Registry holding every built-in flow.
pub fn builtin_registry() -> anyhow::Result<FlowRegistry> {
    let mut registry = FlowRegistry::new();
    registry.register(resume_optimization())?;
    registry.register(interview_questions())?;
    registry.register(chat())?;
    Ok(registry)
}

impl Flows {
    pub async fn optimize_resume(
        &self,
        input: &ResumeOptimizationInput,
    ) -> Result<ResumeOptimizationOutput, FlowError> {
        self.invoke_typed(RESUME_OPTIMIZATION, input).await
    }

    pub async fn generate_interview_questions(
        &self,
        input: &InterviewQuestionsInput,
    ) -> Result<InterviewQuestions, FlowError> {
        self.invoke_typed(INTERVIEW_QUESTIONS, input).await
    }

    pub async fn chat(&self, prompt: &str) -> Result<String, FlowError> {
        self.invoke_typed(CHAT, prompt).await
    }
}
