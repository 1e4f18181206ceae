use chrono::NaiveDate;
use jobscout::adapters::csv_export::CsvExporter;
use jobscout::adapters::csv_format;
use jobscout::adapters::storage::LocalStorage;
use jobscout::domain::model::JobRecord;
use jobscout::dedup_key;
use tempfile::TempDir;

fn posting(i: usize) -> JobRecord {
    let title = format!("Engineer {}", i);
    let company = if i % 2 == 0 { "Acme, Inc." } else { "Globex" };
    let posted_date = NaiveDate::from_ymd_opt(2024, 1, 1 + i as u32);
    let date = posted_date.map(|d| d.format("%Y-%m-%d").to_string());

    JobRecord {
        job_id: dedup_key(&title, company, date.as_deref()).into_string(),
        web_id: if i % 3 == 0 { String::new() } else { format!("{}", 4000 + i) },
        job_title: title,
        company_name: company.to_string(),
        salary: " Up to $2,500 ".into(),
        location: "Ho Chi Minh City".into(),
        posted_date,
        link: format!("https://example.com/jobs/{}", i),
        raw_description: format!("Full scraped posting text #{}\n", i),
        job_expertise: "Backend".into(),
        yoe: "2+ years".into(),
        work_type: "Full-time".into(),
        job_requirements: "- Rust\n- \"Async\" experience\n".into(),
        job_description: "Build and operate services".into(),
        company_id: "comp_0123456789ab".into(),
        company_description: "Product company".into(),
        skills: vec!["rust".into(), "c#;.net".into(), "tokio".into()],
        ..Default::default()
    }
}

#[tokio::test]
async fn test_exported_postings_read_back_unchanged() {
    let temp_dir = TempDir::new().unwrap();
    let exporter = CsvExporter::new(LocalStorage::new(temp_dir.path().to_string_lossy()));
    let postings: Vec<JobRecord> = (0..12).map(posting).collect();

    exporter.create("jobs.csv").await.unwrap();
    exporter.append("jobs.csv", &postings[..5]).await.unwrap();
    exporter.append("jobs.csv", &postings[5..]).await.unwrap();

    let data = std::fs::read(temp_dir.path().join("jobs.csv")).unwrap();
    let reference = NaiveDate::from_ymd_opt(2024, 6, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap();
    let back = csv_format::read_records(&data, reference).unwrap();

    assert_eq!(back, postings);
}

#[tokio::test]
async fn test_embeddings_are_dropped_on_export() {
    let temp_dir = TempDir::new().unwrap();
    let exporter = CsvExporter::new(LocalStorage::new(temp_dir.path().to_string_lossy()));
    let mut record = posting(1);
    record.description_embedding = vec![0.75; 4];
    record.requirements_embedding = vec![0.5; 4];

    exporter.append("jobs.csv", &[record.clone()]).await.unwrap();

    let data = std::fs::read(temp_dir.path().join("jobs.csv")).unwrap();
    let reference = NaiveDate::from_ymd_opt(2024, 6, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap();
    let back = csv_format::read_records(&data, reference).unwrap();

    record.description_embedding.clear();
    record.requirements_embedding.clear();
    assert_eq!(back, vec![record]);
}
