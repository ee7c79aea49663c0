use cadre_wrangler::config::AppConfig;
use cadre_wrangler::data_assistant::{DataAssistant, SUGGESTED_QUESTIONS};
use cadre_wrangler::export::{self, DATASET_FILE_NAME, MAPPING_FILE_NAME};
use cadre_wrangler::ingestion::HeaderMode;
use cadre_wrangler::llm::LlmClient;
use cadre_wrangler::preview::{self, ColumnFilter, ViewOptions, DEFAULT_ROW_LIMIT};
use cadre_wrangler::reconcile::TerminalPrompt;
use cadre_wrangler::{MappingTable, Session};

use anyhow::{bail, Context, Result};
use clap::{Args as ClapArgs, Parser, Subcommand, ValueEnum};
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "cadre-wrangler")]
#[command(about = "Clean staff spreadsheets and map designations to cadres")]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum HeaderArg {
    /// One header row
    Single,
    /// Two header rows joined into one name per column
    TwoRow,
}

impl From<HeaderArg> for HeaderMode {
    fn from(arg: HeaderArg) -> Self {
        match arg {
            HeaderArg::Single => HeaderMode::Single,
            HeaderArg::TwoRow => HeaderMode::TwoRow,
        }
    }
}

#[derive(ClapArgs)]
struct InputArgs {
    /// CSV or Excel file to process
    file: PathBuf,

    /// Column holding the designation (or set CADRE_DESIGNATION_COLUMN)
    #[arg(short, long)]
    column: Option<String>,

    /// Start from a saved mappings JSON instead of the seed table
    #[arg(short, long)]
    mappings: Option<PathBuf>,

    /// Header layout (default: single for CSV, two-row for workbooks)
    #[arg(long, value_enum)]
    header_mode: Option<HeaderArg>,
}

#[derive(Subcommand)]
enum Commands {
    /// Clean, classify and reconcile a file, then export the results
    Process {
        #[command(flatten)]
        input: InputArgs,

        /// Where to write the processed workbook
        #[arg(short, long, default_value = DATASET_FILE_NAME)]
        out: PathBuf,

        /// Where to write the updated mappings
        #[arg(long, default_value = MAPPING_FILE_NAME)]
        mappings_out: PathBuf,

        /// Also write the processed data as CSV
        #[arg(long)]
        csv_out: Option<PathBuf>,

        /// Leave unmapped designations as they are instead of prompting
        #[arg(long)]
        no_interactive: bool,
    },
    /// Show a filtered view of a processed file
    Preview {
        #[command(flatten)]
        input: InputArgs,

        /// Case-insensitive text searched in every column
        #[arg(short, long)]
        search: Option<String>,

        /// Column to filter on
        #[arg(long)]
        filter_column: Option<String>,

        /// Accepted values for --filter-column (comma separated)
        #[arg(long, value_delimiter = ',')]
        values: Vec<String>,

        /// Lower bound for a numeric --filter-column
        #[arg(long)]
        min: Option<f64>,

        /// Upper bound for a numeric --filter-column
        #[arg(long)]
        max: Option<f64>,

        /// Columns to display (comma separated)
        #[arg(long, value_delimiter = ',')]
        columns: Vec<String>,

        /// Number of rows to display
        #[arg(short, long, default_value_t = DEFAULT_ROW_LIMIT)]
        rows: usize,

        /// Write the filtered rows to this workbook
        #[arg(long)]
        export: Option<PathBuf>,
    },
    /// Ask a question about a processed file
    Ask {
        #[command(flatten)]
        input: InputArgs,

        /// Question in natural language (omit to list suggestions)
        question: Option<String>,

        /// Also ask for follow-up questions
        #[arg(long)]
        follow_up: bool,

        /// Print the data summary sent with the question
        #[arg(long)]
        show_context: bool,
    },
    /// Export the mapping table
    Mappings {
        /// Saved mappings JSON to start from instead of the seed table
        #[arg(short, long)]
        mappings: Option<PathBuf>,

        /// Output file (stdout when omitted)
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// Interactive session
    Shell {
        /// Saved mappings JSON to start from instead of the seed table
        #[arg(short, long)]
        mappings: Option<PathBuf>,

        /// Column holding the designation
        #[arg(short, long)]
        column: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let config = AppConfig::from_env();

    match args.command {
        Commands::Process {
            input,
            out,
            mappings_out,
            csv_out,
            no_interactive,
        } => {
            let mut session = open_session(&config, &input)?;
            report_upload(&mut session, &input)?;

            if !no_interactive && !session.unresolved()?.is_empty() {
                let outcome = session.reconcile(&mut TerminalPrompt::stdio())?;
                if outcome.added.is_empty() {
                    println!("No new mappings added");
                } else {
                    println!("\nNew mappings added:");
                    for (designation, cadre) in &outcome.added {
                        println!("  - {}: {}", designation, cadre);
                    }
                }
                if !outcome.unresolved.is_empty() {
                    warn!("{} designation(s) left unmapped", outcome.unresolved.len());
                }
            }

            print_distribution(&session)?;

            let bytes = session.export_dataset(None)?;
            write_output(&out, &bytes)?;
            if let Some(csv_path) = csv_out {
                let df = session.dataset().context("no dataset loaded")?;
                write_output(&csv_path, &export::export_dataset_csv(df)?)?;
            }
            let mappings = session.export_mapping()?;
            write_output(&mappings_out, mappings.as_bytes())?;
        }
        Commands::Preview {
            input,
            search,
            filter_column,
            values,
            min,
            max,
            columns,
            rows,
            export,
        } => {
            let mut session = open_session(&config, &input)?;
            report_upload(&mut session, &input)?;

            let filter = match filter_column {
                None => None,
                Some(column) if min.is_some() || max.is_some() => Some(ColumnFilter::Range {
                    column,
                    min: min.unwrap_or(f64::NEG_INFINITY),
                    max: max.unwrap_or(f64::INFINITY),
                }),
                Some(column) if !values.is_empty() => Some(ColumnFilter::Values { column, values }),
                Some(column) => bail!("--filter-column {} needs --values or --min/--max", column),
            };
            let options = ViewOptions {
                columns,
                row_limit: rows,
                search,
                filter,
            };

            let view = session.preview(&options)?;
            println!("{}", preview::render_table(&view.frame, 40)?);
            println!("\n{}", view.caption());

            if let Some(path) = export {
                let bytes = session.export_dataset(Some(&options))?;
                write_output(&path, &bytes)?;
            }
        }
        Commands::Ask {
            input,
            question,
            follow_up,
            show_context,
        } => {
            let Some(question) = question else {
                println!("Suggested questions:");
                for q in SUGGESTED_QUESTIONS {
                    println!("  - {}", q);
                }
                return Ok(());
            };

            let mut session = open_session(&config, &input)?;
            report_upload(&mut session, &input)?;
            let assistant = DataAssistant::new(Box::new(LlmClient::new(config.llm.clone())?), session.roles().clone());

            println!("Analyzing data...");
            let answer = session.ask(&assistant, &question).await?;
            if show_context {
                println!("\nContext sent to AI:\n{}\n", answer.context);
            }
            println!("\n### Analysis Results\n{}", answer.text);

            if follow_up {
                let df = session.dataset().context("no dataset loaded")?;
                let follow = assistant.follow_up_questions(df, &question).await?;
                println!("\n### Suggested Follow-up Questions\n{}", follow.text);
            }
        }
        Commands::Mappings { mappings, out } => {
            let table = load_table(mappings.as_deref())?;
            let json = export::export_mapping(&table)?;
            match out {
                Some(path) => write_output(&path, json.as_bytes())?,
                None => println!("{}", json),
            }
        }
        Commands::Shell { mappings, column } => {
            let table = load_table(mappings.as_deref())?;
            let mut session = Session::with_table(table, &config);
            if let Some(column) = column {
                session.set_designation_column(column);
            }
            run_shell(&mut session, &config).await?;
        }
    }

    Ok(())
}

fn load_table(path: Option<&Path>) -> Result<MappingTable> {
    match path {
        Some(path) => MappingTable::load(path).with_context(|| format!("Failed to load {}", path.display())),
        None => Ok(MappingTable::seeded()?.0),
    }
}

fn open_session(config: &AppConfig, input: &InputArgs) -> Result<Session> {
    let table = load_table(input.mappings.as_deref())?;
    let mut session = Session::with_table(table, config);
    if let Some(column) = &input.column {
        session.set_designation_column(column.clone());
    }
    Ok(session)
}

fn report_upload(session: &mut Session, input: &InputArgs) -> Result<()> {
    let summary = session
        .upload(&input.file, input.header_mode.map(HeaderMode::from))
        .with_context(|| format!("Error processing file {}", input.file.display()))?;

    println!(
        "Loaded {} rows, {} columns ({} duplicates removed, {} empty cells filled)",
        summary.rows,
        summary.columns.len(),
        summary.cleaning.duplicates_removed,
        summary.cleaning.nulls_filled
    );
    if !summary.unresolved.is_empty() {
        println!("Found {} unmapped designation(s)", summary.unresolved.len());
    }
    Ok(())
}

fn print_distribution(session: &Session) -> Result<()> {
    println!("\nCadre distribution:");
    for share in session.cadre_distribution()? {
        println!("  {:<18} {:>6}  {:>5.1}%", share.cadre, share.count, share.percent);
    }
    Ok(())
}

fn write_output(path: &Path, bytes: &[u8]) -> Result<()> {
    std::fs::write(path, bytes).with_context(|| format!("Failed to write {}", path.display()))?;
    info!("Wrote {}", path.display());
    println!("Saved {}", path.display());
    Ok(())
}

const SHELL_HELP: &str = "Commands:
  load <file>        upload and process a CSV or Excel file
  column <name>      set the designation column and reclassify
  status             show rows and unmapped designations
  reconcile          map unmapped designations
  preview [text]     show the first rows, optionally searching for text
  dist               cadre distribution
  ask <question>     ask a question about the data
  export <file>      write the processed workbook
  mappings <file>    write the mapping table
  help               this list
  quit               leave the session";

/// Line-oriented session loop. Failed commands print an error and the
/// session carries on.
async fn run_shell(session: &mut Session, config: &AppConfig) -> Result<()> {
    println!("{}", SHELL_HELP);

    loop {
        print!("\n> ");
        io::stdout().flush()?;

        let mut line = String::new();
        if io::stdin().lock().read_line(&mut line)? == 0 {
            break;
        }
        let line = line.trim();
        let (command, arg) = match line.split_once(' ') {
            Some((c, a)) => (c, a.trim()),
            None => (line, ""),
        };

        let outcome: Result<bool> = async {
            match command {
                "" => {}
                "quit" | "exit" => return Ok(false),
                "help" => println!("{}", SHELL_HELP),
                "load" => {
                    let summary = session.upload(arg, None)?;
                    println!("Loaded {} rows, {} unmapped designation(s)", summary.rows, summary.unresolved.len());
                }
                "column" => {
                    if session.dataset().is_none() {
                        session.set_designation_column(arg);
                        println!("Designation column set to '{}'", arg);
                    } else {
                        session.change_designation_column(arg)?;
                        println!("Reclassified using column '{}'", arg);
                    }
                }
                "status" => {
                    let df = session.dataset().context("no dataset uploaded")?;
                    println!("{} rows, {} columns", df.height(), df.width());
                    for designation in session.unresolved()? {
                        println!("  unmapped: {}", designation);
                    }
                }
                "reconcile" => {
                    let outcome = session.reconcile(&mut TerminalPrompt::stdio())?;
                    println!("{} mapping(s) added, {} left unmapped", outcome.added.len(), outcome.unresolved.len());
                }
                "preview" => {
                    let options = ViewOptions {
                        search: (!arg.is_empty()).then(|| arg.to_string()),
                        row_limit: 20,
                        ..ViewOptions::default()
                    };
                    let view = session.preview(&options)?;
                    println!("{}\n\n{}", preview::render_table(&view.frame, 30)?, view.caption());
                }
                "dist" => print_distribution(session)?,
                "ask" => {
                    let assistant =
                        DataAssistant::new(Box::new(LlmClient::new(config.llm.clone())?), session.roles().clone());
                    println!("Analyzing data...");
                    let answer = session.ask(&assistant, arg).await?;
                    println!("{}", answer.text);
                }
                "export" => {
                    let bytes = session.export_dataset(None)?;
                    write_output(Path::new(arg), &bytes)?;
                }
                "mappings" => {
                    let json = session.export_mapping()?;
                    write_output(Path::new(arg), json.as_bytes())?;
                }
                other => println!("Unknown command '{}' (try 'help')", other),
            }
            Ok(true)
        }
        .await;

        match outcome {
            Ok(true) => {}
            Ok(false) => break,
            Err(e) => {
                error!("{:#}", e);
                println!("Error: {:#}", e);
            }
        }
    }

    Ok(())
}
