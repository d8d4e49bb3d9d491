use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use folio_assist::{AssistConfig, GeminiClient};
use folio_core::{
    AssistAction, AssistSession, AssistState, Book, ChapterId, CharBudget, Document,
    LayoutMeasure, LineBudget, NodePosition, PaginationConfig, Selection, Tone, markdown,
};
use miette::{IntoDiagnostic, Result, WrapErr, miette};

#[derive(Parser)]
#[command(version, about = "Folio - paginate and proofread book chapters", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args)]
struct Layout {
    /// Characters per line
    #[arg(long, env = "FOLIO_COLUMNS", default_value_t = PaginationConfig::default().columns)]
    columns: usize,

    /// Lines per page
    #[arg(long, env = "FOLIO_LINES", default_value_t = PaginationConfig::default().lines_per_page)]
    lines: usize,

    /// Paginate by a flat character budget instead of wrapped lines
    #[arg(long)]
    chars: Option<usize>,
}

impl Layout {
    fn measure(&self) -> Box<dyn LayoutMeasure> {
        match self.chars {
            Some(capacity) => Box::new(CharBudget::new(capacity)),
            None => Box::new(LineBudget::from(PaginationConfig {
                columns: self.columns,
                lines_per_page: self.lines,
            })),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Paginate Markdown chapters and print the page breakdown
    Paginate {
        /// Chapter files, one chapter each, in order
        #[arg(required = true)]
        chapters: Vec<PathBuf>,

        #[command(flatten)]
        layout: Layout,

        /// Write a JSON snapshot of the book
        #[arg(long)]
        json: Option<PathBuf>,

        /// Print each page's stored HTML
        #[arg(long)]
        html: bool,
    },
    /// Proofread a whole chapter and list the issues found
    Proofread {
        chapter: PathBuf,

        #[command(flatten)]
        layout: Layout,

        /// Apply every suggestion and print the corrected chapter
        #[arg(long)]
        apply: bool,
    },
    /// Rewrite one block of a chapter
    Rewrite {
        chapter: PathBuf,

        /// Index of the block to rewrite, counting from 0 across the chapter
        #[arg(long, default_value_t = 0)]
        block: usize,

        #[arg(long, default_value = "professional")]
        tone: Tone,

        /// Extra instructions for the assistant
        #[arg(long)]
        instructions: Option<String>,

        /// Commit the suggestion and print the chapter
        #[arg(long)]
        approve: bool,

        #[command(flatten)]
        layout: Layout,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    init_miette()?;
    init_tracing();

    let cli = Cli::parse();

    match cli.command {
        Commands::Paginate {
            chapters,
            layout,
            json,
            html,
        } => paginate(&chapters, &layout, json.as_deref(), html)?,
        Commands::Proofread {
            chapter,
            layout,
            apply,
        } => proofread(&chapter, &layout, apply).await?,
        Commands::Rewrite {
            chapter,
            block,
            tone,
            instructions,
            approve,
            layout,
        } => rewrite(&chapter, &layout, block, tone, instructions, approve).await?,
    }

    Ok(())
}

fn load_chapter(id: u32, path: &Path, layout: &Layout) -> Result<Document> {
    let src = std::fs::read_to_string(path)
        .into_diagnostic()
        .wrap_err_with(|| format!("reading {}", path.display()))?;
    let title = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| format!("Chapter {id}"));
    let mut doc = Document::from_blocks(ChapterId(id), title, markdown::parse_blocks(&src));
    let report = doc.reconcile(layout.measure().as_ref());
    for warning in report.warnings() {
        tracing::warn!(chapter = %path.display(), ?warning, "page still overflows");
    }
    Ok(doc)
}

fn print_breakdown(doc: &Document) {
    println!(
        "{} ({} pages, {} words)",
        doc.title,
        doc.page_count(),
        doc.word_count()
    );
    for (index, page) in doc.pages().iter().enumerate() {
        println!(
            "  page {:>3}: {:>3} blocks, {:>5} words{}",
            index + 1,
            page.region.len(),
            doc.page_word_count(index).unwrap_or(0),
            if page.locked { " (locked)" } else { "" }
        );
    }
}

fn paginate(paths: &[PathBuf], layout: &Layout, json: Option<&Path>, html: bool) -> Result<()> {
    let chapters = paths
        .iter()
        .zip(1u32..)
        .map(|(path, id)| load_chapter(id, path, layout))
        .collect::<Result<Vec<_>>>()?;
    let book = Book::from_chapters(chapters).ok_or_else(|| miette!("no chapters given"))?;

    for doc in book.chapters() {
        print_breakdown(doc);
        if html {
            for (index, stored) in doc.stored_content().iter().enumerate() {
                println!("--- page {} ---\n{stored}", index + 1);
            }
        }
    }
    println!("total: {} words", book.word_count());

    if let Some(path) = json {
        let snapshot = serde_json::to_string_pretty(&book).into_diagnostic()?;
        std::fs::write(path, snapshot).into_diagnostic()?;
        println!("Snapshot written to: {}", path.display());
    }
    Ok(())
}

async fn proofread(path: &Path, layout: &Layout, apply: bool) -> Result<()> {
    let client = GeminiClient::new(AssistConfig::from_env())?;
    let mut doc = load_chapter(1, path, layout)?;
    let mut session = AssistSession::new();
    session
        .begin(&mut doc, AssistAction::ProofreadChapter, None, None, None)
        .into_diagnostic()?;
    session.run(&mut doc, &client).await;

    match session.state() {
        AssistState::Failed(message) => return Err(miette!("{message}")),
        AssistState::Issues(issues) if issues.is_empty() => {
            println!("No issues found.");
            return Ok(());
        }
        AssistState::Issues(issues) => {
            for (n, issue) in issues.iter().enumerate() {
                println!(
                    "{:>3}. [{}] {:?} -> {:?}  {}",
                    n + 1,
                    issue.kind,
                    issue.original,
                    issue.suggestion,
                    issue.explanation
                );
            }
        }
        _ => return Err(miette!("the assistant returned no issue list")),
    }

    if apply {
        let mut index = 0;
        while index < session.issues().len() {
            if !session.apply_issue(&mut doc, index) {
                index += 1;
            }
        }
        doc.reconcile(layout.measure().as_ref());
        println!("\n{}", doc.plain_text());
        if index > 0 {
            tracing::info!(skipped = index, "some suggestions no longer matched the text");
        }
    }
    Ok(())
}

async fn rewrite(
    path: &Path,
    layout: &Layout,
    block: usize,
    tone: Tone,
    instructions: Option<String>,
    approve: bool,
) -> Result<()> {
    let client = GeminiClient::new(AssistConfig::from_env())?;
    let mut doc = load_chapter(1, path, layout)?;

    let (page, id) = doc
        .pages()
        .iter()
        .enumerate()
        .flat_map(|(page, p)| p.region.nodes().map(move |id| (page, id)))
        .nth(block)
        .ok_or_else(|| miette!("chapter has no block {block}"))?;
    let len = doc.block(id).map(|b| b.char_len()).unwrap_or(0);
    let selection = Selection::new(NodePosition::new(id, 0), NodePosition::new(id, len));

    let mut session = AssistSession::new();
    session
        .begin(
            &mut doc,
            AssistAction::Rewrite,
            Some((page, selection)),
            instructions,
            Some(tone),
        )
        .into_diagnostic()?;
    session.run(&mut doc, &client).await;

    match session.state() {
        AssistState::Failed(message) => return Err(miette!("{message}")),
        AssistState::Preview => {}
        _ => return Err(miette!("the assistant returned no rewrite")),
    }
    println!("{}", doc.page_text(page).unwrap_or_default());

    if approve {
        session.approve(&mut doc);
        let report = doc.reconcile(layout.measure().as_ref());
        println!();
        print_breakdown(&doc);
        tracing::debug!(persisted = ?report.persisted, "rewrite committed");
    } else {
        session.discard(&mut doc);
    }
    Ok(())
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

fn init_miette() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .with_cause_chain()
                .color(true)
                .context_lines(5)
                .tab_width(2)
                .break_words(true)
                .build(),
        )
    }))
    .into_diagnostic()?;
    miette::set_panic_hook();
    Ok(())
}
