use camino::Utf8PathBuf;
use clap::{Parser, Subcommand};
use reqstudio_cli::{commands, CliEnv};
use reqstudio_config::DEFAULT_LLM_MODEL;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser)]
#[command(author, version, about)]
struct Cli {
    #[arg(short, long, global = true)]
    verbose: bool,
    /// Base URL of the Ollama server (overrides saved settings)
    #[arg(long, global = true, env = "REQSTUDIO_LLM_URL")]
    llm_url: Option<String>,
    #[arg(long, global = true, env = "REQSTUDIO_MODEL", help = format!("Model name (default {DEFAULT_LLM_MODEL})"))]
    model: Option<String>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List navigable sections and the names they answer to
    Sections,
    /// Create an empty project file
    New {
        name: String,
        #[arg(short, long)]
        output: Option<Utf8PathBuf>,
    },
    /// Summarize a project file
    Show { workspace: Utf8PathBuf },
    /// Merge requirements from a JSON export into a project
    Import {
        workspace: Utf8PathBuf,
        source: Utf8PathBuf,
        #[arg(long, help = "Create the project with this name if the file does not exist")]
        create: Option<String>,
    },
    /// Resolve a section name and show what the view areas display
    Navigate {
        section: String,
        #[arg(short, long)]
        workspace: Option<Utf8PathBuf>,
        #[arg(long, conflicts_with = "title")]
        requirement: Option<String>,
        #[arg(long, help = "Displayed title, e.g. \"REQ-1 - Login\"")]
        title: Option<String>,
    },
    /// Review one requirement's quality
    Analyze {
        workspace: Utf8PathBuf,
        item: String,
        #[arg(long, help = "Replace the description with the suggested rewrite")]
        apply: bool,
    },
    /// Generate test cases (for all requirements unless --item is given)
    Generate {
        workspace: Utf8PathBuf,
        #[arg(short, long = "item", value_delimiter = ',')]
        items: Vec<String>,
    },
}

fn setup_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    let env = CliEnv::new(cli.llm_url, cli.model)?;

    match cli.command {
        Commands::Sections => commands::cmd_sections(),
        Commands::New { name, output } => {
            let output = output.unwrap_or_else(|| commands::default_output(&name));
            commands::cmd_new(&env, &name, &output).await?;
        }
        Commands::Show { workspace } => {
            commands::cmd_show(&env, &workspace).await?;
        }
        Commands::Import {
            workspace,
            source,
            create,
        } => {
            commands::cmd_import(&env, &workspace, &source, create.as_deref()).await?;
        }
        Commands::Navigate {
            section,
            workspace,
            requirement,
            title,
        } => {
            commands::cmd_navigate(&env, &section, workspace.as_deref(), requirement, title)
                .await?;
        }
        Commands::Analyze {
            workspace,
            item,
            apply,
        } => {
            commands::cmd_analyze(&env, &workspace, &item, apply).await?;
        }
        Commands::Generate { workspace, items } => {
            let total = commands::cmd_generate(&env, &workspace, items).await?;
            println!(":: Done ({total} test cases)");
        }
    }

    Ok(())
}
