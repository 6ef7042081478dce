//! End-to-end: CSV exports in a directory → workbook on disk.

use calamine::{open_workbook, Data, Reader, Xlsx};
use contact_dedup::export::{
    MAX_CELL_CHARS, SHEET_BUSINESS, SHEET_LOG, SHEET_MASTER, SHEET_PERSONAL, SHEET_QUALITY,
};
use contact_dedup::{run, Classification, Config};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const GOOGLE_EXPORT: &str = "\
First Name,Last Name,Organization Name,Organization Title,E-mail 1 - Value,Phone 1 - Value
Ann,Lee,Acme,CFO,ann@acme.com,+1 555-121-2000
Pat,Kim,,,pat@gmail.com ::: pat.kim@work.net,
John,Doe,,,,
";

const OUTLOOK_EXPORT: &str = "\
First Name,Last Name,Company,Job Title,E-mail Address,Mobile Phone
Ann,Lee,Acme Corp,,ANN@ACME.COM,
,,,,,+1 (555) 121-2000
Bo,Chen,Globex,,bo@mailinator.com,
";

fn setup(files: &[(&str, &[u8])]) -> (TempDir, Config) {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("input");
    fs::create_dir_all(&input).unwrap();
    for (name, content) in files {
        fs::write(input.join(name), content).unwrap();
    }

    let config = Config {
        input_dir: input,
        output_path: dir.path().join("output").join("contacts_master.xlsx"),
        log_dir: None,
        ..Config::default()
    };
    (dir, config)
}

fn cell_text(cell: Option<&Data>) -> String {
    match cell {
        Some(Data::String(s)) => s.clone(),
        Some(Data::Float(f)) => f.to_string(),
        Some(Data::Int(i)) => i.to_string(),
        _ => String::new(),
    }
}

fn column(path: &Path, sheet: &str, col: usize) -> Vec<String> {
    let mut workbook: Xlsx<_> = open_workbook(path).unwrap();
    let range = workbook.worksheet_range(sheet).unwrap();
    range
        .rows()
        .skip(1)
        .map(|row| cell_text(row.get(col)))
        .collect()
}

fn all_text(path: &Path) -> Vec<String> {
    let mut workbook: Xlsx<_> = open_workbook(path).unwrap();
    let mut text = Vec::new();
    for sheet in workbook.sheet_names() {
        let range = workbook.worksheet_range(&sheet).unwrap();
        text.extend(range.rows().flat_map(|row| row.iter().map(|c| cell_text(Some(c)))));
    }
    text
}

#[test]
fn test_full_run_merges_across_files() {
    let (_dir, config) = setup(&[
        ("1-google.csv", GOOGLE_EXPORT.as_bytes()),
        ("2-outlook.csv", OUTLOOK_EXPORT.as_bytes()),
    ]);

    let (report, export) = run(&config).unwrap();

    // Ann (Google) + ANN (Outlook, email) + phone-only row (phone) → one contact
    assert_eq!(report.stats.ingest.records_rejected, 1);
    assert_eq!(report.resolution.records_in, 5);
    assert_eq!(report.resolution.contacts.len(), 3);

    let ann = report
        .resolution
        .contacts
        .iter()
        .find(|c| c.sources.len() == 3)
        .expect("Ann merged from three rows");
    assert_eq!(ann.email.as_deref(), Some("ann@acme.com"));
    assert_eq!(ann.company.as_deref(), Some("Acme"));
    assert_eq!(ann.classification, Classification::Business);

    let classes: Vec<Classification> = report
        .resolution
        .contacts
        .iter()
        .map(|c| c.classification)
        .collect();
    assert!(classes.contains(&Classification::Personal));
    assert!(classes.contains(&Classification::Other));

    assert!(config.output_path.is_file());
    assert_eq!(export.contact_rows, 3);
}

#[test]
fn test_workbook_sheets_and_rows() {
    let (_dir, config) = setup(&[
        ("1-google.csv", GOOGLE_EXPORT.as_bytes()),
        ("2-outlook.csv", OUTLOOK_EXPORT.as_bytes()),
    ]);

    run(&config).unwrap();

    let workbook: Xlsx<_> = open_workbook(&config.output_path).unwrap();
    assert_eq!(
        workbook.sheet_names(),
        vec![SHEET_MASTER, SHEET_BUSINESS, SHEET_PERSONAL, SHEET_QUALITY, SHEET_LOG]
    );

    let emails = column(&config.output_path, SHEET_MASTER, 2);
    assert_eq!(emails.len(), 3);
    assert!(emails.contains(&"ann@acme.com".to_string()));

    let business = column(&config.output_path, SHEET_BUSINESS, 2);
    assert_eq!(business, vec!["ann@acme.com".to_string()]);

    let personal = column(&config.output_path, SHEET_PERSONAL, 2);
    assert_eq!(personal, vec!["pat@gmail.com".to_string()]);

    let metrics = column(&config.output_path, SHEET_QUALITY, 0);
    assert!(metrics.contains(&"Duplicates Removed".to_string()));

    let events = column(&config.output_path, SHEET_LOG, 1);
    assert!(events.contains(&"row_rejected".to_string()));
    assert!(events.contains(&"contacts_merged".to_string()));
}

#[test]
fn test_unreadable_file_does_not_stop_run() {
    let (_dir, config) = setup(&[
        ("a.csv", &b"Name,Email\nAnn,ann@acme.com\n"[..]),
        ("b.csv", &b"Date,Amount\n2024-01-01,3\n"[..]),
        ("c.csv", &b"Name;E-mail\nJos\xe9;jose@initech.io\n"[..]),
    ]);

    let (report, _) = run(&config).unwrap();

    assert_eq!(report.stats.ingest.files_loaded, 2);
    assert_eq!(report.stats.ingest.files_failed, 1);
    assert!(report
        .resolution
        .contacts
        .iter()
        .any(|c| c.name.as_deref() == Some("José")));
}

#[test]
fn test_no_valid_input_is_an_error() {
    let (_dir, config) = setup(&[("a.csv", &b"Name\nJohn Doe\n"[..])]);

    let err = run(&config).unwrap_err();

    assert!(err.to_string().contains("No valid contact records"));
    assert!(!config.output_path.exists());
}

#[test]
fn test_empty_directory_is_an_error() {
    let (_dir, config) = setup(&[]);

    let err = run(&config).unwrap_err();

    assert!(err.to_string().contains("No CSV files"));
}

#[test]
fn test_secondary_addresses_reach_the_workbook() {
    let export = "\
First Name,E-mail 1 - Value,E-mail 2 - Value,Phone 1 - Value,Phone 2 - Value
Pat,pat@gmail.com ::: pat.kim@work.net,pk@other.org,555 333 4444,555 777 8888
";
    let (_dir, config) = setup(&[("google.csv", export.as_bytes())]);

    run(&config).unwrap();

    let text = all_text(&config.output_path);
    for value in ["pat.kim@work.net", "pk@other.org", "5557778888"] {
        assert!(
            text.iter().any(|cell| cell.contains(value)),
            "{} missing from workbook",
            value
        );
    }
}

#[test]
fn test_shared_switchboard_number_still_exports() {
    let mut export = String::from("Name,Phone\n");
    for i in 0..3000 {
        export.push_str(&format!("Caller {},+1 555 121 2000\n", i));
    }
    let (_dir, config) = setup(&[("switchboard.csv", export.as_bytes())]);

    let (report, summary) = run(&config).unwrap();

    assert_eq!(report.resolution.contacts.len(), 1);
    assert_eq!(report.resolution.contacts[0].source_count(), 3000);
    assert_eq!(summary.contact_rows, 1);

    let sources = column(&config.output_path, SHEET_MASTER, 10);
    assert!(sources[0].chars().count() <= MAX_CELL_CHARS);
    assert!(sources[0].ends_with("more)"));

    let counts = column(&config.output_path, SHEET_MASTER, 9);
    assert_eq!(counts[0], "3000");

    for cell in all_text(&config.output_path) {
        assert!(cell.chars().count() <= MAX_CELL_CHARS);
    }
}
