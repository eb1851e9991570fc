use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

mod commands;

#[derive(Parser)]
#[command(name = "scribe")]
#[command(about = "Generate and maintain code from plain-language instructions", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Workspace root
    #[arg(long, global = true, default_value = ".")]
    root: PathBuf,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Quiet mode: log only warnings/errors (stdout is reserved for output)
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Pretty-print JSON output
    #[arg(long, global = true)]
    pretty: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default .scribe/config.toml
    Init(InitArgs),

    /// Print the effective configuration (API key redacted)
    Config,

    /// Parse an instruction document
    Parse(FileArg),

    /// Classify free-form text with the keyword heuristics
    Intent(TextArgs),

    /// Line diff of a file against its snapshot or another file
    Diff(DiffArgs),

    /// Generate files from an instruction
    Generate(TextArgs),

    /// Ask the service for a structured analysis of an instruction
    Analyze(TextArgs),

    /// Watch the workspace and queue changes until interrupted
    Watch,

    /// Process every pending change
    Trigger,

    /// Show or clear the pending-change queue
    Pending(PendingArgs),

    /// Scoped edits of a single file
    #[command(subcommand)]
    Edit(EditCommand),

    /// Response cache maintenance
    #[command(subcommand)]
    Cache(CacheCommand),

    /// Workspace backups
    #[command(subcommand)]
    Backup(BackupCommand),

    /// Explain a file
    Explain(FileArg),

    /// Rewrite a file to fix an error message
    Fix(FixArgs),
}

#[derive(Args)]
struct InitArgs {
    /// Overwrite an existing config
    #[arg(long)]
    force: bool,
}

#[derive(Args)]
struct FileArg {
    /// Workspace-relative path
    path: String,
}

#[derive(Args)]
struct TextArgs {
    /// Instruction text (read from --file or stdin when omitted)
    text: Vec<String>,

    /// Read the text from a file
    #[arg(long, conflicts_with = "text")]
    file: Option<PathBuf>,
}

#[derive(Args)]
struct DiffArgs {
    /// Workspace-relative path of the new version
    path: String,

    /// Compare against this file instead of the stored snapshot
    #[arg(long)]
    against: Option<PathBuf>,
}

#[derive(Args)]
struct PendingArgs {
    /// Drop every queued record
    #[arg(long)]
    clear: bool,
}

#[derive(Args)]
struct BodyArgs {
    /// Inline replacement text
    #[arg(long, conflicts_with = "body_file")]
    body: Option<String>,

    /// Read the replacement text from a file (stdin when neither is given)
    #[arg(long)]
    body_file: Option<PathBuf>,
}

#[derive(Subcommand)]
enum EditCommand {
    /// List functions and classes
    Elements(FileArg),

    /// Replace a function or class
    Update {
        path: String,
        name: String,
        #[command(flatten)]
        body: BodyArgs,
    },

    /// Append a method to a class (impl/trait block in Rust)
    #[command(name = "add-method")]
    AddMethod {
        path: String,
        type_name: String,
        #[command(flatten)]
        body: BodyArgs,
    },

    /// Insert an import unless it is already present
    #[command(name = "add-import")]
    AddImport { path: String, statement: String },

    /// Rename a function and its call sites
    Rename {
        path: String,
        old_name: String,
        new_name: String,
    },
}

#[derive(Subcommand)]
enum CacheCommand {
    /// Entry count and size on disk
    Stats,
    /// Remove every entry
    Clear,
}

#[derive(Subcommand)]
enum BackupCommand {
    Create {
        #[arg(long)]
        label: Option<String>,
    },
    List,
    Restore {
        id: String,
    },
}

#[derive(Args)]
struct FixArgs {
    path: String,

    /// Error message to fix
    #[arg(long)]
    error: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if cli.quiet {
        builder.filter_level(log::LevelFilter::Warn);
    } else if cli.verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.target(env_logger::Target::Stderr).init();

    let out = commands::Output::new(cli.pretty);
    let root = cli.root;

    match cli.command {
        Commands::Init(args) => commands::init(&root, args.force, &out)?,
        Commands::Config => commands::show_config(&root)?,
        Commands::Parse(args) => commands::parse(&root, &args.path, &out)?,
        Commands::Intent(args) => commands::intent(&root, &read_text(&args)?, &out)?,
        Commands::Diff(args) => commands::diff(&root, &args.path, args.against.as_deref(), &out)?,
        Commands::Generate(args) => commands::generate(&root, &read_text(&args)?, &out).await?,
        Commands::Analyze(args) => commands::analyze(&root, &read_text(&args)?, &out).await?,
        Commands::Watch => commands::watch(&root).await?,
        Commands::Trigger => commands::trigger(&root, &out).await?,
        Commands::Pending(args) => commands::pending(&root, args.clear, &out)?,
        Commands::Edit(edit) => run_edit(&root, edit, &out)?,
        Commands::Cache(CacheCommand::Stats) => commands::cache_stats(&root, &out).await?,
        Commands::Cache(CacheCommand::Clear) => commands::cache_clear(&root, &out).await?,
        Commands::Backup(BackupCommand::Create { label }) => {
            commands::backup_create(&root, label.as_deref(), &out)?
        }
        Commands::Backup(BackupCommand::List) => commands::backup_list(&root, &out)?,
        Commands::Backup(BackupCommand::Restore { id }) => {
            commands::backup_restore(&root, &id, &out)?
        }
        Commands::Explain(args) => commands::explain(&root, &args.path).await?,
        Commands::Fix(args) => commands::fix(&root, &args.path, &args.error, &out).await?,
    }

    Ok(())
}

fn run_edit(root: &std::path::Path, edit: EditCommand, out: &commands::Output) -> Result<()> {
    match edit {
        EditCommand::Elements(args) => commands::elements(root, &args.path, out),
        EditCommand::Update { path, name, body } => {
            commands::update(root, &path, &name, &read_body(&body)?, out)
        }
        EditCommand::AddMethod {
            path,
            type_name,
            body,
        } => commands::add_method(root, &path, &type_name, &read_body(&body)?, out),
        EditCommand::AddImport { path, statement } => {
            commands::add_import(root, &path, &statement, out)
        }
        EditCommand::Rename {
            path,
            old_name,
            new_name,
        } => commands::rename(root, &path, &old_name, &new_name, out),
    }
}

fn read_text(args: &TextArgs) -> Result<String> {
    if let Some(file) = &args.file {
        return commands::read_file(file);
    }
    if !args.text.is_empty() {
        return Ok(args.text.join(" "));
    }
    commands::read_stdin()
}

fn read_body(args: &BodyArgs) -> Result<String> {
    match (&args.body, &args.body_file) {
        (Some(body), _) => Ok(body.clone()),
        (None, Some(file)) => commands::read_file(file),
        (None, None) => commands::read_stdin(),
    }
}
