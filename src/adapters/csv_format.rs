//! Fixed-schema CSV encoding of job records.
//!
//! Writing always uses `COLUMNS`. Reading maps legacy headers (`JobID`,
//! `Title`, `Company`, `Posted_Date`, ...) onto the same fields and tolerates a
//! UTF-8 BOM. Cell values are kept verbatim. Skills are written as a JSON
//! array; semicolon-separated lists from older exports are still accepted.
//! Embeddings never appear in CSV.

use crate::core::time_resolver::resolve_posted_date;
use crate::domain::model::JobRecord;
use crate::utils::error::{Result, ScoutError};
use chrono::NaiveDateTime;

pub const COLUMNS: [&str; 17] = [
    "job_id",
    "web_id",
    "job_title",
    "company_name",
    "salary",
    "location",
    "posted_date",
    "link",
    "raw_description",
    "job_expertise",
    "yoe",
    "work_type",
    "job_requirements",
    "job_description",
    "company_id",
    "company_description",
    "skills",
];

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    JobId,
    WebId,
    JobTitle,
    CompanyName,
    Salary,
    Location,
    PostedDate,
    Link,
    RawDescription,
    JobExpertise,
    Yoe,
    WorkType,
    JobRequirements,
    JobDescription,
    CompanyId,
    CompanyDescription,
    Skills,
}

/// Header → field, ignoring case, underscores and spaces.
fn field_for_header(header: &str) -> Option<Field> {
    let key: String = header
        .trim()
        .chars()
        .filter(|c| *c != '_' && *c != ' ')
        .flat_map(char::to_lowercase)
        .collect();

    let field = match key.as_str() {
        "jobid" | "id" => Field::JobId,
        "webid" => Field::WebId,
        "jobtitle" | "title" => Field::JobTitle,
        "companyname" | "company" => Field::CompanyName,
        "salary" => Field::Salary,
        "location" => Field::Location,
        "posteddate" | "posted" | "posttime" => Field::PostedDate,
        "link" | "url" => Field::Link,
        "description" | "rawdescription" | "rawjobdescription" => Field::RawDescription,
        "jobexpertise" | "expertise" => Field::JobExpertise,
        "yoe" | "experience" => Field::Yoe,
        "worktype" => Field::WorkType,
        "jobrequirements" | "requirements" => Field::JobRequirements,
        "jobdescription" => Field::JobDescription,
        "companyid" => Field::CompanyId,
        "companydescription" | "companyinformation" | "companyinfomation" => {
            Field::CompanyDescription
        }
        "skills" => Field::Skills,
        _ => return None,
    };
    Some(field)
}

fn row_values(record: &JobRecord) -> Result<[String; 17]> {
    Ok([
        record.job_id.clone(),
        record.web_id.clone(),
        record.job_title.clone(),
        record.company_name.clone(),
        record.salary.clone(),
        record.location.clone(),
        record
            .posted_date
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_default(),
        record.link.clone(),
        record.raw_description.clone(),
        record.job_expertise.clone(),
        record.yoe.clone(),
        record.work_type.clone(),
        record.job_requirements.clone(),
        record.job_description.clone(),
        record.company_id.clone(),
        record.company_description.clone(),
        serde_json::to_string(&record.skills)?,
    ])
}

/// Encodes records, optionally preceded by the header row.
pub fn write_rows(records: &[JobRecord], with_header: bool) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    if with_header {
        writer.write_record(COLUMNS)?;
    }
    for record in records {
        writer.write_record(row_values(record)?)?;
    }
    writer
        .into_inner()
        .map_err(|e| ScoutError::processing(format!("CSV buffer flush failed: {}", e)))
}

pub fn header_row() -> Result<Vec<u8>> {
    write_rows(&[], true)
}

pub fn strip_bom(data: &[u8]) -> &[u8] {
    data.strip_prefix(UTF8_BOM).unwrap_or(data)
}

fn parse_skills(value: &str) -> Vec<String> {
    let value = value.trim();
    if value.starts_with('[') {
        if let Ok(skills) = serde_json::from_str::<Vec<String>>(value) {
            return skills;
        }
    }
    value
        .split(';')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Decodes records from any supported header layout.
///
/// Relative posted dates ("3 days ago") are resolved against `reference`.
pub fn read_records(data: &[u8], reference: NaiveDateTime) -> Result<Vec<JobRecord>> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(strip_bom(data));

    let columns: Vec<Option<Field>> = reader
        .headers()?
        .iter()
        .map(field_for_header)
        .collect();

    let unmapped = columns.iter().filter(|c| c.is_none()).count();
    if unmapped > 0 {
        tracing::debug!("Ignoring {} unrecognized CSV columns", unmapped);
    }

    let mut records = Vec::new();
    for row in reader.records() {
        let row = row?;
        let mut record = JobRecord::default();

        for (field, value) in columns.iter().zip(row.iter()) {
            let Some(field) = field else { continue };
            match field {
                Field::JobId => record.job_id = value.to_string(),
                Field::WebId => record.web_id = value.to_string(),
                Field::JobTitle => record.job_title = value.to_string(),
                Field::CompanyName => record.company_name = value.to_string(),
                Field::Salary => record.salary = value.to_string(),
                Field::Location => record.location = value.to_string(),
                Field::PostedDate => {
                    let value = value.trim();
                    record.posted_date =
                        (!value.is_empty()).then(|| resolve_posted_date(value, reference))
                }
                Field::Link => record.link = value.to_string(),
                Field::RawDescription => record.raw_description = value.to_string(),
                Field::JobExpertise => record.job_expertise = value.to_string(),
                Field::Yoe => record.yoe = value.to_string(),
                Field::WorkType => record.work_type = value.to_string(),
                Field::JobRequirements => record.job_requirements = value.to_string(),
                Field::JobDescription => record.job_description = value.to_string(),
                Field::CompanyId => record.company_id = value.to_string(),
                Field::CompanyDescription => record.company_description = value.to_string(),
                Field::Skills => record.skills = parse_skills(value),
            }
        }
        records.push(record);
    }

    Ok(records)
}
