use camino::Utf8PathBuf;
use chrono::Utc;
use reqstudio_app_core::ports::{ImportPort, PersistencePort, PortError, SettingsRepo};
use reqstudio_app_core::{AppSettings, Section};
use reqstudio_core::{AnalysisResult, Requirement, Workspace};
use reqstudio_persistence::{JsonRequirementImporter, JsonWorkspaceStore, SettingsStore};

fn utf8(dir: &tempfile::TempDir) -> Utf8PathBuf {
    Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("utf-8 temp dir")
}

#[tokio::test]
async fn saved_workspace_loads_back_with_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = utf8(&dir).join("nested").join("demo.json");

    let mut ws = Workspace::new("Demo");
    let mut r = Requirement::new("R-1", "Login").with_description("Users can log in");
    r.analysis = Some(AnalysisResult {
        quality_score: 6,
        issues: vec![],
        suggested_rewrite: None,
        analyzed_at: Utc::now(),
    });
    ws.requirements.push(r);
    ws.saved_at = Some(Utc::now());

    let store = JsonWorkspaceStore::new();
    store.save(&path, &ws).await.unwrap();
    let loaded = store.load(&path).await.unwrap();

    assert_eq!(loaded.file_path.as_ref(), Some(&path));
    assert_eq!(loaded.requirements, ws.requirements);
    assert!(!path.with_extension("json.tmp").exists());
}

#[tokio::test]
async fn missing_workspace_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let err = JsonWorkspaceStore::new()
        .load(&utf8(&dir).join("absent.json"))
        .await
        .unwrap_err();
    assert!(matches!(err, PortError::NotFound(_)));
}

#[tokio::test]
async fn corrupt_workspace_is_a_parse_failure() {
    let dir = tempfile::tempdir().unwrap();
    let path = utf8(&dir).join("broken.json");
    std::fs::write(&path, b"{ not json").unwrap();

    let err = JsonWorkspaceStore::new().load(&path).await.unwrap_err();
    assert!(matches!(err, PortError::Parse { .. }));
}

#[tokio::test]
async fn importer_reads_json_and_rejects_other_formats() {
    let dir = tempfile::tempdir().unwrap();
    let root = utf8(&dir);
    let json = root.join("reqs.json");
    std::fs::write(
        &json,
        br#"{"requirements":[{"item":"R-1","name":"Login"},{"item":"R-2","name":"Logout"}]}"#,
    )
    .unwrap();
    let docx = root.join("reqs.docx");
    std::fs::write(&docx, b"PK").unwrap();

    let importer = JsonRequirementImporter::new();
    let reqs = importer.import(&json).await.unwrap();
    assert_eq!(
        reqs.iter().map(|r| r.item.as_str()).collect::<Vec<_>>(),
        ["R-1", "R-2"]
    );

    let err = importer.import(&docx).await.unwrap_err();
    assert!(matches!(err, PortError::UnsupportedFormat(_)));
}

#[tokio::test]
async fn malformed_import_is_a_generic_import_failure() {
    let dir = tempfile::tempdir().unwrap();
    let path = utf8(&dir).join("bad.json");
    std::fs::write(&path, br#"{"rows": 3}"#).unwrap();

    let err = JsonRequirementImporter::new().import(&path).await.unwrap_err();
    assert!(matches!(err, PortError::Import(_)));
}

#[test]
fn settings_round_trip_through_config_dir() {
    let dir = tempfile::tempdir().unwrap();
    let store = SettingsStore::with_dir(dir.path().join("cfg"));

    let defaults = store.load().unwrap();
    assert_eq!(defaults, AppSettings::default());

    let mut settings = defaults;
    settings.set_last_section(Section::TestFlow);
    settings.record_recent("/w/demo.json".into());
    store.save(&settings).unwrap();

    let loaded = store.load().unwrap();
    assert_eq!(loaded.last_section(), Section::TestFlow);
    assert_eq!(loaded.recent_workspaces, vec![Utf8PathBuf::from("/w/demo.json")]);
}
