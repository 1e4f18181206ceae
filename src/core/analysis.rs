//! Prompt composition and reply parsing for posting analysis.

use crate::core::resilient::ResilientClient;
use crate::domain::model::{JobAnalysis, NOT_SPECIFIED};
use crate::domain::ports::{
    AnalysisRequest, CallFailure, GenerateRequest, JobAnalyzer, KeyedBackend,
};
use crate::utils::error::Result;
use async_trait::async_trait;
use regex::Regex;
use serde_json::Value;
use std::path::Path;
use std::sync::LazyLock;

pub const DEFAULT_INSTRUCTION: &str = r#"You extract structured data from IT job postings.
Reply with a single JSON object inside a ```json fenced block and nothing else.
Keys:
- "skills": array of skill names, chosen from the available skill tags when a list is given
- "yoe": required years of experience, or "Not Specified"
- "salary": salary range as written, or "Not Specified"
- "job_expertise": the main area of expertise, e.g. "Backend", "Data Engineering"
- "job_requirements": the requirements section, condensed
- "job_description": the responsibilities section, condensed
- "company_information": one or two sentences about the company
Do not invent data that is not present in the posting."#;

static FENCED_JSON: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"```json\s*([\s\S]*?)\s*```").unwrap());
static QUOTED_JSON: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"'''json\s*([\s\S]*?)\s*'''").unwrap());
static BARE_OBJECT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\{[\s\S]*\}").unwrap());

/// Reads a skill tag list. Markdown headings, rules and table rows are skipped.
pub fn parse_skill_tags(content: &str) -> Vec<String> {
    content
        .lines()
        .map(|line| line.trim().to_lowercase())
        .filter(|line| {
            !line.is_empty()
                && !line.starts_with('#')
                && !line.starts_with("---")
                && !line.starts_with('|')
        })
        .collect()
}

/// Missing files yield an empty list.
pub fn load_skill_tags<P: AsRef<Path>>(path: P) -> Result<Vec<String>> {
    let path = path.as_ref();
    if !path.exists() {
        tracing::info!("No skill tag file at {}", path.display());
        return Ok(Vec::new());
    }
    let tags = parse_skill_tags(&std::fs::read_to_string(path)?);
    tracing::info!("Loaded {} skill tags from {}", tags.len(), path.display());
    Ok(tags)
}

pub fn compose_prompt(request: &AnalysisRequest, skill_tags: &[String]) -> String {
    let title = request.job_title.trim();
    let mut prompt = if title.is_empty() {
        request.content.clone()
    } else {
        format!(
            "Job Title: {}\n\nJob Description:\n{}",
            title, request.content
        )
    };

    if !skill_tags.is_empty() {
        prompt.push_str("\n\nAvailable skill tags:\n");
        for tag in skill_tags {
            prompt.push_str("- ");
            prompt.push_str(tag);
            prompt.push('\n');
        }
    }
    prompt
}

/// Finds the JSON object in a model reply: a ```json fence, then a '''json
/// fence, then the outermost braces.
pub fn extract_json_block(text: &str) -> Option<&str> {
    for fenced in [&*FENCED_JSON, &*QUOTED_JSON] {
        if let Some(inner) = fenced.captures(text).and_then(|c| c.get(1)) {
            return Some(inner.as_str());
        }
    }
    BARE_OBJECT.find(text).map(|m| m.as_str())
}

fn text_field(object: &serde_json::Map<String, Value>, key: &str) -> Option<String> {
    match object.get(key)? {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Null => None,
        Value::Array(items) => Some(
            items
                .iter()
                .map(|v| v.as_str().map(str::to_string).unwrap_or_else(|| v.to_string()))
                .collect::<Vec<_>>()
                .join("\n"),
        ),
        other => Some(other.to_string()),
    }
}

fn skills_field(object: &serde_json::Map<String, Value>) -> Vec<String> {
    let Some(Value::Array(items)) = object.get("skills") else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| match item {
            Value::String(name) => Some(name.trim().to_string()),
            Value::Object(obj) => obj
                .get("name")
                .and_then(Value::as_str)
                .map(|name| name.trim().to_string()),
            _ => None,
        })
        .filter(|name| !name.is_empty())
        .collect()
}

/// Parses a model reply. Missing or malformed JSON gives the empty analysis.
pub fn parse_analysis(text: &str) -> JobAnalysis {
    let Some(block) = extract_json_block(text) else {
        tracing::warn!("No JSON object found in analysis reply");
        return JobAnalysis::default();
    };

    let object = match serde_json::from_str::<Value>(block) {
        Ok(Value::Object(object)) => object,
        Ok(_) => {
            tracing::warn!("Analysis reply JSON is not an object");
            return JobAnalysis::default();
        }
        Err(e) => {
            tracing::warn!("Failed to parse analysis JSON: {}", e);
            tracing::debug!("Rejected JSON: {}", block);
            return JobAnalysis::default();
        }
    };

    JobAnalysis {
        skills: skills_field(&object),
        yoe: text_field(&object, "yoe").unwrap_or_else(|| NOT_SPECIFIED.to_string()),
        salary: text_field(&object, "salary").unwrap_or_else(|| NOT_SPECIFIED.to_string()),
        job_expertise: text_field(&object, "job_expertise").unwrap_or_default(),
        job_requirements: text_field(&object, "job_requirements").unwrap_or_default(),
        job_description: text_field(&object, "job_description").unwrap_or_default(),
        company_information: text_field(&object, "company_information")
            .or_else(|| text_field(&object, "company_infomation"))
            .unwrap_or_default(),
    }
}

/// Analysis over a key-rotating text-generation backend.
pub struct Analyzer<B> {
    client: ResilientClient<B>,
    instruction: String,
    skill_tags: Vec<String>,
}

impl<B> Analyzer<B>
where
    B: KeyedBackend<Request = GenerateRequest, Response = String>,
{
    pub fn new(client: ResilientClient<B>) -> Self {
        Self {
            client,
            instruction: DEFAULT_INSTRUCTION.to_string(),
            skill_tags: Vec::new(),
        }
    }

    pub fn with_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.instruction = instruction.into();
        self
    }

    pub fn with_skill_tags(mut self, skill_tags: Vec<String>) -> Self {
        self.skill_tags = skill_tags;
        self
    }

    pub fn client(&self) -> &ResilientClient<B> {
        &self.client
    }
}

#[async_trait]
impl<B> JobAnalyzer for Analyzer<B>
where
    B: KeyedBackend<Request = GenerateRequest, Response = String>,
{
    async fn analyze(
        &self,
        request: &AnalysisRequest,
    ) -> std::result::Result<JobAnalysis, CallFailure> {
        let generate = GenerateRequest {
            system_instruction: self.instruction.clone(),
            prompt: compose_prompt(request, &self.skill_tags),
        };

        let reply = self.client.try_call(&generate).await?;
        if reply.trim().is_empty() {
            tracing::warn!("Empty analysis reply for '{}'", request.job_title);
            return Ok(JobAnalysis::default());
        }
        Ok(parse_analysis(&reply))
    }
}
