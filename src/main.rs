use std::path::PathBuf;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand, ValueEnum};
use compact_str::CompactString;

use folder_import::app::FolderImport;
use folder_import::config::settings::Settings;
use folder_import::models::library::{ImportTarget, LibraryId, LibraryKind};
use folder_import::models::params::AttachMode;
use folder_import::store::local::LocalLibrary;
use folder_import::store::memory::MemoryLibrary;
use folder_import::store::{
    AttachmentStore, CollectionStore, ExtensionSelector, FixedSelector, MetadataRecognizer,
};
use folder_import::ui::meter::TerminalMeter;
use folder_import::ui::prompt::StdinSelector;

#[derive(Parser, Debug)]
#[command(name = "folder-import", version, about = "Import a folder tree into a reference library")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Scan a folder and list the extensions found
    Scan {
        path: PathBuf,

        /// Write the scan tree as JSON to this file
        #[arg(long)]
        export_json: Option<PathBuf>,

        #[command(flatten)]
        scan: ScanArgs,
    },
    /// Mirror a folder as collections and attach its files
    Import(ImportArgs),
}

#[derive(Args, Debug)]
struct ScanArgs {
    /// Maximum concurrent directory listings
    #[arg(short = 'c', long)]
    concurrency: Option<usize>,

    /// Follow symbolic links
    #[arg(long)]
    follow_symlinks: bool,
}

#[derive(Args, Debug)]
struct ImportArgs {
    path: PathBuf,

    /// Library directory (default: per-user data directory)
    #[arg(long)]
    library: Option<PathBuf>,

    #[arg(long, default_value_t = 1)]
    library_id: u32,

    #[arg(long, value_enum, default_value_t = KindArg::User)]
    kind: KindArg,

    /// Existing collection to import under, as `A/B/C`
    #[arg(long)]
    into: Option<String>,

    /// Extension to import; repeatable. Prompts when omitted.
    #[arg(long = "ext")]
    extensions: Vec<String>,

    /// Link files at their current location
    #[arg(long, conflicts_with = "copy")]
    link: bool,

    /// Copy files into the library
    #[arg(long)]
    copy: bool,

    /// Do not pause between files
    #[arg(long)]
    no_delay: bool,

    /// Import into a throwaway in-memory library
    #[arg(long)]
    dry_run: bool,

    /// Do not queue imported PDFs for metadata recognition
    #[arg(long)]
    no_recognize: bool,

    #[command(flatten)]
    scan: ScanArgs,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum KindArg {
    User,
    Group,
    Publications,
}

impl From<KindArg> for LibraryKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::User => LibraryKind::User,
            KindArg::Group => LibraryKind::Group,
            KindArg::Publications => LibraryKind::Publications,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing (logs to stderr)
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Scan {
            path,
            export_json,
            scan,
        } => run_scan(path, export_json, scan).await,
        Command::Import(args) => run_import(args).await,
    }
}

type StoreParts = (
    Arc<dyn CollectionStore>,
    Arc<dyn AttachmentStore>,
    Arc<dyn MetadataRecognizer>,
);

fn store_parts<S>(store: Arc<S>) -> StoreParts
where
    S: CollectionStore + AttachmentStore + MetadataRecognizer + 'static,
{
    let collections: Arc<dyn CollectionStore> = store.clone();
    let attachments: Arc<dyn AttachmentStore> = store.clone();
    let recognizer: Arc<dyn MetadataRecognizer> = store;
    (collections, attachments, recognizer)
}

fn build_settings(scan: &ScanArgs) -> Settings {
    let mut settings = Settings::default();
    if let Some(conc) = scan.concurrency {
        settings.max_concurrent_io = conc;
    }
    settings.follow_symlinks = scan.follow_symlinks;
    settings
}

async fn run_scan(path: PathBuf, export_json: Option<PathBuf>, scan: ScanArgs) -> anyhow::Result<()> {
    let settings = build_settings(&scan);
    let path = std::fs::canonicalize(&path)?;

    let store = Arc::new(MemoryLibrary::new());
    let app = FolderImport::new(settings, store.clone(), store);
    let tree = app.scan(path).await?;

    println!("{} files in {} folders", tree.file_count(), tree.dir_count());
    for ext in &tree.extensions {
        println!("  {:<10} {:>6}", ext, tree.count_extension(ext));
    }

    if let Some(export_path) = export_json {
        folder_import::export::json::export_json(&tree, &export_path)?;
        println!("Exported to: {}", export_path.display());
    }
    Ok(())
}

async fn run_import(args: ImportArgs) -> anyhow::Result<()> {
    let mut settings = build_settings(&args.scan);
    if args.no_delay {
        settings.file_delay_ms = 0;
    }
    if let Some(dir) = &args.library {
        settings.library_dir = dir.clone();
    }

    let path = std::fs::canonicalize(&args.path)?;
    let library_id = LibraryId(args.library_id);
    let mode = match (args.link, args.copy) {
        (true, _) => Some(AttachMode::Link),
        (_, true) => Some(AttachMode::Copy),
        _ => None,
    };

    let selector: Arc<dyn ExtensionSelector> = if args.extensions.is_empty() {
        Arc::new(StdinSelector)
    } else {
        Arc::new(FixedSelector(Some(
            args.extensions.iter().map(|e| CompactString::from(e.as_str())).collect(),
        )))
    };

    let (collections, attachments, recognizer, start) = if args.dry_run {
        if args.into.is_some() {
            tracing::warn!("--into is ignored for a dry run");
        }
        let (c, a, r) = store_parts(Arc::new(MemoryLibrary::new()));
        (c, a, r, None)
    } else {
        let store = Arc::new(LocalLibrary::open(&settings.library_dir, settings.settle_delay()).await?);
        let start = match &args.into {
            Some(into) => Some(store.resolve_path(library_id, into).await?),
            None => None,
        };
        let (c, a, r) = store_parts(store);
        (c, a, r, start)
    };

    let target = ImportTarget::new(library_id, args.kind.into()).with_collection(start);
    let mut app = FolderImport::new(settings, collections, attachments)
        .with_display(Arc::new(TerminalMeter::new()));
    if !args.no_recognize {
        app = app.with_recognizer(recognizer);
    }

    match app.run(path, target, mode, selector).await? {
        Some(summary) => {
            println!(
                "Imported {}/{} files ({} copied, {} linked, {} failed, {} shortcuts skipped), {} collections created",
                summary.done,
                summary.total,
                summary.imported,
                summary.linked,
                summary.failed,
                summary.skipped_shortcuts,
                summary.collections_created,
            );
            if !summary.pdfs.is_empty() && !args.no_recognize {
                println!("{} PDFs queued for metadata recognition", summary.pdfs.len());
            }
        }
        None => println!("Nothing imported"),
    }
    Ok(())
}
