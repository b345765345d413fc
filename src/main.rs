// src/main.rs
// =============================================================================
// This is the entry point of the exam converter.
//
// What happens here:
// 1. Parse command-line arguments using clap
// 2. Set up logging and load the configuration
// 3. Dispatch to the appropriate subcommand handler
// 4. Print results
// 5. Exit with proper code (0 = success, 1 = broken images, 2 = error)
// =============================================================================

mod checker;
mod cli;
mod config;
mod error;
mod exam;
mod export;
mod ingest;
mod logging;
mod session;

use anyhow::{bail, Result};
use checker::{
    HttpImageProber, ImageCheck, ImageLinkStatus, ImageStats, LinkValidator, ValidatorSettings,
};
use clap::Parser;
use cli::{Cli, Commands};
use config::Config;
use ingest::{DocumentSet, InputSource};
use serde::Serialize;
use session::Session;
use std::fmt::Display;
use std::io::Write;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

#[tokio::main]
async fn main() {
    let exit_code = match run().await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            2
        }
    };

    std::process::exit(exit_code);
}

async fn run() -> Result<i32> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(n) = cli.concurrency {
        config.probe.max_concurrent = n;
    }
    if let Some(secs) = cli.timeout {
        config.probe.timeout_secs = secs;
    }

    match cli.command {
        Commands::Convert {
            input,
            output_dir,
            stdout,
            skip_image_check,
            name,
        } => {
            if let Some(dir) = output_dir {
                config.export.output_dir = dir;
            }
            let options = ConvertOptions {
                stdout,
                skip_image_check,
                name,
            };
            handle_convert(&config, &input, options).await
        }
        Commands::Check { input, json, name } => {
            handle_check(&config, &input, json, name.as_deref()).await
        }
        Commands::Inspect { input, index } => handle_inspect(&input, index).await,
    }
}

struct ConvertOptions {
    stdout: bool,
    skip_image_check: bool,
    name: Option<String>,
}

fn new_session(config: &Config) -> Result<Session<HttpImageProber>> {
    let prober = HttpImageProber::new(&config.probe)?;
    let settings = ValidatorSettings::from(&config.probe);
    Ok(Session::new(LinkValidator::new(prober, settings)))
}

// Handles the 'convert' subcommand
async fn handle_convert(config: &Config, input: &str, options: ConvertOptions) -> Result<i32> {
    let text = ingest::read_input(&InputSource::from_arg(input)).await?;
    let mut session = new_session(config)?;

    if options.skip_image_check {
        session.load(&text)?;
    } else {
        let run = session.import(&text)?;
        debug!("image check #{} started for {} link(s)", run.generation(), run.total());
        let progress = log_progress(session.validator().subscribe());
        run.wait().await;
        progress.abort();
    }

    let selection = session.selection(options.name.as_deref());
    info!("converting {} of {} exam(s)", selection.len(), session.documents().len());

    if !options.skip_image_check {
        let stats = session.validator().stats_for(&selection);
        // keep stdout clean when the export itself goes there
        if options.stdout {
            print_summary(&mut std::io::stderr(), &stats)?;
        } else {
            print_summary(&mut std::io::stdout(), &stats)?;
        }
        if stats.broken > 0 {
            warn!("{} image link(s) are broken; they are exported unchanged", stats.broken);
        }
    }

    let bytes = session.export(&selection)?;

    if options.stdout {
        std::io::stdout().write_all(&bytes)?;
    } else {
        let path =
            export::write_export(&config.export.output_dir, &config.export.file_name, &bytes)
                .await?;
        println!("✅ Exported {} exam(s) to {}", selection.len(), path.display());
    }

    Ok(0)
}

#[derive(Serialize)]
struct CheckReport {
    summary: ImageStats,
    images: Vec<ImageCheck>,
}

// Handles the 'check' subcommand
async fn handle_check(config: &Config, input: &str, json: bool, name: Option<&str>) -> Result<i32> {
    let text = ingest::read_input(&InputSource::from_arg(input)).await?;
    let mut session = new_session(config)?;

    let run = session.import(&text)?;
    if run.total() == 0 && !json {
        println!("✅ No image questions found to check");
        return Ok(0);
    }

    if !json {
        println!("🌐 Checking {} image link(s)...\n", run.total());
    }
    debug!("image check #{} started", run.generation());
    let progress = log_progress(session.validator().subscribe());
    run.wait().await;
    progress.abort();

    let selection = session.selection(name);
    let report = CheckReport {
        summary: session.validator().stats_for(&selection),
        images: session
            .validator()
            .checks()
            .into_iter()
            .filter(|c| selection.contains(&c.target.key.exam))
            .collect(),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_table(&report.images, session.documents());
        print_summary(&mut std::io::stdout(), &report.summary)?;
    }

    Ok(if report.summary.broken > 0 { 1 } else { 0 })
}

// Handles the 'inspect' subcommand
async fn handle_inspect(input: &str, index: usize) -> Result<i32> {
    let text = ingest::read_input(&InputSource::from_arg(input)).await?;
    let mut documents = DocumentSet::new();
    documents.ingest(&text)?;
    if documents.is_empty() {
        bail!("input contains no exams");
    }

    if !documents.focus(index) {
        bail!(
            "exam index {} is out of range ({} exam(s) loaded)",
            index,
            documents.len()
        );
    }

    if let (Some(exam), Some(position)) = (documents.focused(), documents.focused_index()) {
        print_exam(exam, position, documents.len());
    }
    Ok(0)
}

// Logs progress while the checks run
fn log_progress(mut rx: watch::Receiver<ImageStats>) -> JoinHandle<()> {
    tokio::spawn(async move {
        while rx.changed().await.is_ok() {
            let stats = *rx.borrow_and_update();
            if stats.total == 0 {
                continue;
            }
            let done = stats.working + stats.broken;
            if done > 0 && (done % 10 == 0 || stats.is_complete()) {
                info!("checked {}/{} image link(s), {} broken", done, stats.total, stats.broken);
            }
            if stats.is_complete() {
                break;
            }
        }
    })
}

fn print_summary(out: &mut impl Write, stats: &ImageStats) -> std::io::Result<()> {
    writeln!(out, "📊 Image links:")?;
    writeln!(out, "   ✅ Working: {}", stats.working)?;
    writeln!(out, "   ❌ Broken: {}", stats.broken)?;
    writeln!(out, "   ⏳ Pending: {}", stats.pending)?;
    writeln!(out, "   📋 Total: {}", stats.total)?;
    Ok(())
}

// Prints results as a human-readable table in the terminal
fn print_table(checks: &[ImageCheck], documents: &DocumentSet) {
    println!("{:<28} {:<50} {:<12} {:<30}", "QUESTION", "URL", "STATUS", "MESSAGE");
    println!("{}", "=".repeat(120));

    for check in checks {
        let key = &check.target.key;
        let exam_name = documents
            .exams()
            .get(key.exam)
            .and_then(|e| e.name.as_deref())
            .unwrap_or("untitled");
        let label = match &check.target.id {
            Some(id) => format!("{} #{}", truncate(exam_name, 12), truncate(id, 12)),
            None => format!("{} {}.{}", truncate(exam_name, 12), key.section + 1, key.question + 1),
        };

        let (status, message) = match &check.status {
            ImageLinkStatus::Valid => ("✅ OK", ""),
            ImageLinkStatus::Error { reason } => ("❌ BROKEN", reason.as_str()),
            ImageLinkStatus::Unchecked => ("⏳ PENDING", ""),
        };

        println!(
            "{:<28} {:<50} {:<12} {:<30}",
            label,
            truncate(&check.target.url, 47),
            status,
            message
        );
    }

    println!();
}

fn print_exam(exam: &exam::ImportedExam, index: usize, total: usize) {
    let images: usize = exam
        .sections()
        .iter()
        .map(|s| s.questions().iter().filter(|q| q.is_image()).count())
        .sum();
    let questions = exam.question_count();

    println!(
        "📘 Exam {} of {}: {}",
        index + 1,
        total,
        exam.name.as_deref().unwrap_or("(untitled)")
    );
    println!("   Unit: {}   Stage: {}", or_dash(exam.unit.as_ref()), or_dash(exam.stage.as_ref()));
    println!(
        "   Timer: {} min   Full degree: {}   Tries: {}",
        or_dash(exam.timer.as_ref()),
        or_dash(exam.full_degree.as_ref()),
        or_dash(exam.tries.as_ref())
    );
    println!("   Publish date: {}", or_dash(exam.publish_date.as_ref()));
    println!("   Deadline: {}", or_dash(exam.dead_line.as_ref()));
    println!("   Results published: {}", or_dash(exam.result_publish_date.as_ref()));
    println!(
        "   Sections: {}   Questions: {} ({} image, {} other)",
        exam.sections().len(),
        questions,
        images,
        questions - images
    );

    for (i, section) in exam.sections().iter().enumerate() {
        println!(
            "   [{}] {} - {} question(s)",
            i + 1,
            truncate(section.text.as_deref().unwrap_or(""), 60),
            section.questions().len()
        );
    }
}

fn or_dash<T: Display>(value: Option<T>) -> String {
    value.map_or_else(|| "-".to_string(), |v| v.to_string())
}

// Shortens text for table columns, on char boundaries
fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() > max_chars {
        text.chars().take(max_chars).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}
