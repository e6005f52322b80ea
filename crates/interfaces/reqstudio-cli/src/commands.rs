use anyhow::{bail, Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use reqstudio_app_core::navigation::{NavigationContext, Section};
use reqstudio_app_core::{AppKernel, ImportOutcome, Severity};
use reqstudio_core::{AnalysisResult, RequirementItem, Workspace};

use crate::CliEnv;

/// Resolved outcome of a navigation request, as the view layer would see it.
#[derive(Debug, Clone)]
pub struct NavigationReport {
    pub section: Section,
    pub header: String,
    pub content: String,
    pub current_requirement: Option<RequirementItem>,
    pub displayed_title: Option<String>,
}

fn print_notifications(kernel: &mut AppKernel) {
    for n in kernel.notifications().all() {
        let tag = match n.severity {
            Severity::Info => "info",
            Severity::Success => "ok",
            Severity::Warning => "warn",
            Severity::Error => "error",
        };
        println!("   [{tag}] {}", n.message);
    }
    kernel.notifications_mut().clear();
}

/// Message of the most recent warning or error, if any.
fn last_problem(kernel: &AppKernel) -> Option<String> {
    kernel
        .notifications()
        .all()
        .filter(|n| n.severity >= Severity::Warning)
        .last()
        .map(|n| n.message.clone())
}

async fn open(kernel: &mut AppKernel, path: &Utf8Path) -> Result<()> {
    kernel.open_project(path, false)?;
    kernel.settle().await;
    if kernel.workspace().file_path().as_deref() != Some(path) {
        let reason = last_problem(kernel).unwrap_or_else(|| "unknown error".into());
        bail!("Could not open {path}: {reason}");
    }
    Ok(())
}

async fn save(kernel: &mut AppKernel) -> Result<()> {
    if !kernel.workspace().is_dirty() {
        return Ok(());
    }
    kernel.save_project(None)?;
    kernel.settle().await;
    if kernel.workspace().is_dirty() {
        let reason = last_problem(kernel).unwrap_or_else(|| "unknown error".into());
        bail!("Save failed: {reason}");
    }
    Ok(())
}

fn finish(env: &CliEnv, kernel: &mut AppKernel) -> Result<()> {
    print_notifications(kernel);
    kernel
        .save_settings()
        .with_context(|| format!("Failed to save settings to {}", env.settings.path().display()))
}

pub fn cmd_sections() {
    println!(":: Sections");
    for section in Section::ALL {
        println!(
            "   {:<18} {:<12} aliases: {}",
            section.label(),
            section.as_str(),
            section.aliases().join(", ")
        );
    }
}

pub async fn cmd_new(env: &CliEnv, name: &str, output: &Utf8Path) -> Result<()> {
    if output.exists() {
        bail!("{output} already exists");
    }
    let mut kernel = env.build_kernel()?;
    kernel.new_project(name, false)?;
    kernel.save_project(Some(output))?;
    kernel.settle().await;
    if kernel.workspace().file_path().as_deref() != Some(output) {
        let reason = last_problem(&kernel).unwrap_or_else(|| "unknown error".into());
        bail!("Could not create {output}: {reason}");
    }
    println!(":: Created project '{name}' at {output}");
    finish(env, &mut kernel)
}

pub async fn cmd_show(env: &CliEnv, workspace: &Utf8Path) -> Result<Workspace> {
    let mut kernel = env.build_kernel()?;
    open(&mut kernel, workspace).await?;
    let snapshot = kernel
        .workspace()
        .snapshot()
        .context("workspace vanished after open")?;

    println!(":: Project: {}", snapshot.project_name);
    println!("   File:         {workspace}");
    if let Some(saved_at) = snapshot.saved_at {
        println!("   Saved:        {}", saved_at.format("%Y-%m-%d %H:%M:%S UTC"));
    }
    println!("   Requirements: {}", snapshot.requirements.len());
    println!("   Analyzed:     {}", snapshot.analyzed_count());
    println!("   Test cases:   {}", snapshot.test_case_count());
    for r in &snapshot.requirements {
        let score = r
            .analysis
            .as_ref()
            .map(|a| format!("{}/10", a.quality_score))
            .unwrap_or_else(|| "-".into());
        println!(
            "   {:<40} quality {:>5}  tests {}",
            r.display_title(),
            score,
            r.test_cases.len()
        );
    }
    kernel.notifications_mut().clear();
    finish(env, &mut kernel)?;
    Ok(snapshot)
}

/// Imports `source` into `workspace` and saves. With `create`, a missing
/// workspace file is started as a new project of that name.
pub async fn cmd_import(
    env: &CliEnv,
    workspace: &Utf8Path,
    source: &Utf8Path,
    create: Option<&str>,
) -> Result<Workspace> {
    let mut kernel = env.build_kernel()?;
    match create {
        Some(name) if !workspace.exists() => {
            kernel.new_project(name, false)?;
            kernel.save_project(Some(workspace))?;
            kernel.settle().await;
        }
        _ => open(&mut kernel, workspace).await?,
    }

    println!(":: Importing {source}");
    kernel.import_requirements(source)?;
    kernel.settle().await;
    let report = match kernel.last_import().cloned() {
        Some(ImportOutcome::Merged(report)) => report,
        Some(ImportOutcome::Failed(reason)) => {
            print_notifications(&mut kernel);
            bail!("Import failed: {reason}");
        }
        None => bail!("Import failed: no result from the importer"),
    };
    println!(
        "   {} added, {} updated, {} duplicate(s) skipped",
        report.added.len(),
        report.updated.len(),
        report.duplicates.len()
    );
    save(&mut kernel).await?;

    let snapshot = kernel
        .workspace()
        .snapshot()
        .context("workspace vanished after import")?;
    println!(
        ":: {} now has {} requirements",
        snapshot.project_name,
        snapshot.requirements.len()
    );
    finish(env, &mut kernel)?;
    Ok(snapshot)
}

/// Resolves a section name the way the side menu would and reports what the
/// view areas end up showing.
pub async fn cmd_navigate(
    env: &CliEnv,
    section: &str,
    workspace: Option<&Utf8Path>,
    requirement: Option<String>,
    title: Option<String>,
) -> Result<NavigationReport> {
    let mut kernel = env.build_kernel()?;
    if let Some(path) = workspace {
        open(&mut kernel, path).await?;
    }

    let context = match (requirement, title) {
        (Some(item), _) => Some(NavigationContext::Requirement { item }),
        (None, Some(title)) => Some(NavigationContext::DisplayedTitle(title)),
        (None, None) => None,
    };
    if Section::recognize(section).is_none() {
        println!(":: '{section}' is not a known section; showing the default view");
    }
    let resolved = kernel.navigate(section, context);

    let config = kernel
        .coordinator()
        .current_configuration()
        .context("no view configuration applied")?;
    let report = NavigationReport {
        section: resolved,
        header: format!("{:?}", config.header),
        content: format!("{:?}", config.content),
        current_requirement: kernel.generation().current_requirement(),
        displayed_title: config.content.displayed_title(),
    };

    println!(":: Section:  {} ({})", report.section, report.section.as_str());
    println!("   Header:   {}", report.header);
    println!("   Content:  {}", report.content);
    if let Some(item) = &report.current_requirement {
        println!("   Selected: {item}");
    }
    kernel.notifications_mut().clear();
    finish(env, &mut kernel)?;
    Ok(report)
}

pub async fn cmd_analyze(
    env: &CliEnv,
    workspace: &Utf8Path,
    item: &str,
    apply_rewrite: bool,
) -> Result<AnalysisResult> {
    let mut kernel = env.build_kernel()?;
    open(&mut kernel, workspace).await?;

    println!(":: Analyzing {item}");
    kernel.analyze_requirement(item)?;
    kernel.settle().await;

    let analysis = kernel
        .workspace()
        .requirements_view()
        .get(item)
        .and_then(|r| r.analysis);
    let Some(analysis) = analysis else {
        let reason = last_problem(&kernel).unwrap_or_else(|| "no result".into());
        print_notifications(&mut kernel);
        bail!("Analysis failed: {reason}");
    };

    println!("   Quality: {}/10", analysis.quality_score);
    for issue in &analysis.issues {
        println!(
            "   - [{:?}] {}: {}",
            issue.severity, issue.category, issue.description
        );
    }
    if let Some(rewrite) = &analysis.suggested_rewrite {
        println!("   Suggested: {rewrite}");
        if apply_rewrite {
            kernel.apply_suggested_rewrite(item)?;
            println!("   Rewrite applied.");
        }
    }

    save(&mut kernel).await?;
    finish(env, &mut kernel)?;
    Ok(analysis)
}

/// Generates test cases for `items` (all requirements when empty) and saves.
/// Returns the number of test cases in the workspace afterwards.
pub async fn cmd_generate(
    env: &CliEnv,
    workspace: &Utf8Path,
    items: Vec<RequirementItem>,
) -> Result<usize> {
    let mut kernel = env.build_kernel()?;
    open(&mut kernel, workspace).await?;

    let targets = if items.is_empty() {
        kernel.workspace().requirements_view().items()
    } else {
        items
    };
    if targets.is_empty() {
        bail!("{workspace} has no requirements");
    }

    println!(":: Generating test cases for {} requirement(s)", targets.len());
    kernel.generate_test_cases(&targets)?;
    kernel.settle().await;
    if let Some(problem) = last_problem(&kernel) {
        print_notifications(&mut kernel);
        bail!("Generation failed: {problem}");
    }
    save(&mut kernel).await?;

    let total = kernel
        .workspace()
        .with_workspace(Workspace::test_case_count)
        .unwrap_or_default();
    println!("   Workspace now holds {total} test cases");
    finish(env, &mut kernel)?;
    Ok(total)
}

pub fn default_output(name: &str) -> Utf8PathBuf {
    let slug: String = name
        .trim()
        .chars()
        .map(|c| if c.is_alphanumeric() { c.to_ascii_lowercase() } else { '-' })
        .collect();
    Utf8PathBuf::from(format!("{}.json", slug.trim_matches('-')))
}
