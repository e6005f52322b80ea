use axum::{routing::post, Router};
use camino::Utf8PathBuf;
use reqstudio_app_core::Section;
use reqstudio_cli::{commands, CliEnv};
use std::net::SocketAddr;
use tempfile::tempdir;

const REQUIREMENTS: &str = r#"{
  "requirements": [
    { "Item": "REQ-1", "Name": "Login", "Description": "Login works", "Priority": "High" },
    { "Item": "REQ-2", "Name": "Logout", "Description": "The user can log out" }
  ]
}"#;

fn analysis_reply() -> String {
    serde_json::json!({
        "quality_score": 4,
        "issues": [
            { "category": "Ambiguity", "severity": "high", "description": "'works' is not verifiable" }
        ],
        "suggested_rewrite": "The system shall authenticate a user with valid credentials."
    })
    .to_string()
}

fn generation_reply() -> String {
    serde_json::json!({
        "test_cases": [
            { "requirement_item": "REQ-1", "title": "Valid login",
              "steps": [{ "action": "Enter valid credentials", "expected": "Dashboard shown" }] },
            { "requirement_item": "REQ-1", "title": "Wrong password" },
            { "requirement_item": "REQ-2", "title": "Logout from dashboard" }
        ]
    })
    .to_string()
}

/// Stands in for an Ollama server: answers `/api/generate` based on which
/// prompt it receives.
async fn start_mock_llm() -> (SocketAddr, tokio::task::JoinHandle<()>) {
    let app = Router::new().route(
        "/api/generate",
        post(|body: String| async move {
            let request: serde_json::Value = serde_json::from_str(&body).unwrap();
            let prompt = request["prompt"].as_str().unwrap_or_default();
            let reply = if prompt.contains("test cases") {
                generation_reply()
            } else {
                analysis_reply()
            };
            serde_json::json!({ "model": request["model"], "response": reply, "done": true })
                .to_string()
        }),
    );

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (addr, handle)
}

fn utf8(path: std::path::PathBuf) -> Utf8PathBuf {
    Utf8PathBuf::from_path_buf(path).unwrap()
}

#[tokio::test]
async fn project_lifecycle_through_commands() {
    let dir = tempdir().unwrap();
    let root = utf8(dir.path().to_path_buf());
    let env = CliEnv::with_settings_dir(root.join("settings"));
    let project = root.join("demo.json");
    let source = root.join("export.json");
    std::fs::write(&source, REQUIREMENTS).unwrap();

    // Phase 1: create
    commands::cmd_new(&env, "Demo", &project)
        .await
        .expect("create failed");
    assert!(project.exists());
    assert!(
        commands::cmd_new(&env, "Demo", &project).await.is_err(),
        "refuses to overwrite"
    );

    // Phase 2: import
    let ws = commands::cmd_import(&env, &project, &source, None)
        .await
        .expect("import failed");
    assert_eq!(ws.requirements.len(), 2);
    assert_eq!(ws.requirements[0].metadata.get("Priority").map(String::as_str), Some("High"));

    // Re-importing the same file merges instead of duplicating.
    let ws = commands::cmd_import(&env, &project, &source, None).await.unwrap();
    assert_eq!(ws.requirements.len(), 2);

    // Phase 3: show reads back what was saved
    let shown = commands::cmd_show(&env, &project).await.expect("show failed");
    assert_eq!(shown.project_name, "Demo");
    assert_eq!(shown.requirements.len(), 2);
    assert!(shown.saved_at.is_some());

    // Phase 4: navigation with a displayed title selects that requirement
    let report = commands::cmd_navigate(
        &env,
        "requirements",
        Some(&project),
        None,
        Some("REQ-2 - Logout".into()),
    )
    .await
    .expect("navigate failed");
    assert_eq!(report.section, Section::Requirements);
    assert_eq!(report.current_requirement.as_deref(), Some("REQ-2"));
    assert_eq!(report.displayed_title.as_deref(), Some("REQ-2 - Logout"));

    // Unknown names land on the default view without failing.
    let report = commands::cmd_navigate(&env, "nowhere", None, None, None)
        .await
        .unwrap();
    assert_eq!(report.section, Section::Default);
}

#[tokio::test]
async fn import_can_create_missing_project() {
    let dir = tempdir().unwrap();
    let root = utf8(dir.path().to_path_buf());
    let env = CliEnv::with_settings_dir(root.join("settings"));
    let project = root.join("fresh.json");
    let source = root.join("export.json");
    std::fs::write(&source, REQUIREMENTS).unwrap();

    assert!(
        commands::cmd_import(&env, &project, &source, None).await.is_err(),
        "missing project without --create"
    );
    let ws = commands::cmd_import(&env, &project, &source, Some("Fresh"))
        .await
        .unwrap();
    assert_eq!(ws.project_name, "Fresh");
    assert_eq!(ws.requirements.len(), 2);
    assert!(project.exists());
}

#[tokio::test]
async fn duplicate_identifiers_do_not_fail_the_import() {
    let dir = tempdir().unwrap();
    let root = utf8(dir.path().to_path_buf());
    let env = CliEnv::with_settings_dir(root.join("settings"));
    let project = root.join("demo.json");
    let source = root.join("export.json");
    std::fs::write(
        &source,
        r#"[
          { "Item": "R-1", "Name": "Login" },
          { "Item": "R-2", "Name": "Logout" },
          { "Item": "R-2", "Name": "Logout again" }
        ]"#,
    )
    .unwrap();

    let ws = commands::cmd_import(&env, &project, &source, Some("Demo"))
        .await
        .expect("duplicates are skipped, not fatal");
    assert_eq!(ws.requirements.len(), 2);
    assert_eq!(ws.requirements[1].name, "Logout");

    let saved = commands::cmd_show(&env, &project).await.unwrap();
    assert_eq!(saved.requirements.len(), 2);
}

#[tokio::test]
async fn unsupported_import_is_reported() {
    let dir = tempdir().unwrap();
    let root = utf8(dir.path().to_path_buf());
    let env = CliEnv::with_settings_dir(root.join("settings"));
    let project = root.join("demo.json");
    let source = root.join("export.docx");
    std::fs::write(&source, b"PK\x03\x04").unwrap();

    commands::cmd_new(&env, "Demo", &project).await.unwrap();
    let err = commands::cmd_import(&env, &project, &source, None)
        .await
        .unwrap_err();
    assert!(err.to_string().starts_with("Import failed"), "{err}");
}

#[tokio::test]
async fn analysis_and_generation_against_mock_service() {
    let (addr, server) = start_mock_llm().await;
    let dir = tempdir().unwrap();
    let root = utf8(dir.path().to_path_buf());
    let mut env = CliEnv::with_settings_dir(root.join("settings"));
    env.llm_url = Some(format!("http://{addr}"));
    env.model = Some("test-model".into());

    let project = root.join("demo.json");
    let source = root.join("export.json");
    std::fs::write(&source, REQUIREMENTS).unwrap();
    commands::cmd_import(&env, &project, &source, Some("Demo"))
        .await
        .unwrap();

    // Analysis with the rewrite applied
    let analysis = commands::cmd_analyze(&env, &project, "REQ-1", true)
        .await
        .expect("analysis failed");
    assert_eq!(analysis.quality_score, 4);
    assert_eq!(analysis.issues.len(), 1);

    let ws = commands::cmd_show(&env, &project).await.unwrap();
    let req1 = &ws.requirements[0];
    assert_eq!(
        req1.description,
        "The system shall authenticate a user with valid credentials."
    );
    assert!(req1.analysis.is_some(), "analysis is persisted");

    // Generation for every requirement attaches cases by item
    let total = commands::cmd_generate(&env, &project, Vec::new())
        .await
        .expect("generation failed");
    assert_eq!(total, 3);

    let ws = commands::cmd_show(&env, &project).await.unwrap();
    assert_eq!(ws.requirements[0].test_cases.len(), 2);
    assert_eq!(ws.requirements[1].test_cases.len(), 1);
    assert_eq!(ws.requirements[1].test_cases[0].id, "TC-REQ-2-001");

    // Unknown requirement is refused before any request goes out.
    assert!(commands::cmd_analyze(&env, &project, "REQ-9", false)
        .await
        .is_err());

    server.abort();
}

#[tokio::test]
async fn unreachable_service_fails_cleanly() {
    let dir = tempdir().unwrap();
    let root = utf8(dir.path().to_path_buf());
    let mut env = CliEnv::with_settings_dir(root.join("settings"));
    env.llm_url = Some("http://127.0.0.1:1".into());

    let project = root.join("demo.json");
    let source = root.join("export.json");
    std::fs::write(&source, REQUIREMENTS).unwrap();
    commands::cmd_import(&env, &project, &source, Some("Demo"))
        .await
        .unwrap();

    let err = commands::cmd_analyze(&env, &project, "REQ-1", false)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("not reachable"), "{err}");

    // Nothing was lost.
    let ws = commands::cmd_show(&env, &project).await.unwrap();
    assert!(ws.requirements[0].analysis.is_none());
}
