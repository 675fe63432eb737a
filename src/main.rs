use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use dicom::core::{Tag, VR};

use dicomancer::app::{App, AppEvent, Outcome};
use dicomancer::error::{summarize_errors, Result};
use dicomancer::message::Message;
use dicomancer::model::loader::load_dicom;
use dicomancer::registry::{extract_flat, parse_tag};
use dicomancer::settings::Settings;
use dicomancer::vr::{self, Severity};

const ERROR_DISPLAY_CAP: usize = 10;

#[derive(Parser, Debug)]
#[command(name = "dicomancer", about = "DICOM metadata viewer and bulk tag editor", version)]
struct Cli {
    /// Load settings from a JSON file
    #[arg(short = 's', long = "settings", value_name = "FILE")]
    settings: Option<PathBuf>,

    /// Do not copy files into the backup folder before overwriting them
    #[arg(long = "no-backup")]
    no_backup: bool,

    /// Number of files parsed in parallel
    #[arg(short = 'j', long = "jobs", value_name = "N")]
    jobs: Option<usize>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print every tag of a file
    Show {
        file: PathBuf,
        /// Include private (odd group) tags
        #[arg(long)]
        private: bool,
    },
    /// Set a tag to the same value in every file below a folder
    Set {
        dir: PathBuf,
        #[arg(value_parser = parse_tag_arg)]
        tag: Tag,
        value: String,
        /// Report what would change without writing files
        #[arg(long)]
        dry_run: bool,
    },
    /// Remove a tag from every file below a folder
    Delete {
        dir: PathBuf,
        #[arg(value_parser = parse_tag_arg)]
        tag: Tag,
        #[arg(long)]
        dry_run: bool,
    },
    /// Check a value against the rules of a VR
    Validate {
        #[arg(value_parser = parse_vr_arg)]
        vr: VR,
        value: String,
    },
}

fn parse_tag_arg(text: &str) -> std::result::Result<Tag, String> {
    parse_tag(text).ok_or_else(|| format!("'{text}' is not a tag (use GGGG,EEEE or a keyword)"))
}

fn parse_vr_arg(text: &str) -> std::result::Result<VR, String> {
    let upper = text.to_ascii_uppercase();
    match upper.as_bytes() {
        [a, b] => VR::from_binary([*a, *b]).ok_or_else(|| format!("unknown VR '{text}'")),
        _ => Err(format!("unknown VR '{text}'")),
    }
}

fn main() -> ExitCode {
    let _ = env_logger::Builder::from_default_env()
        .format_timestamp_secs()
        .try_init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode> {
    let mut settings = match &cli.settings {
        Some(path) => Settings::load(path)?,
        None => Settings::default(),
    };
    if cli.no_backup {
        settings.create_backup_before_save = false;
    }
    if let Some(jobs) = cli.jobs {
        settings.max_concurrent_loads = jobs;
    }
    settings.validate()?;

    match cli.command {
        Command::Show { file, private } => {
            show(&file, private)?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Set {
            dir,
            tag,
            value,
            dry_run,
        } => bulk_edit(settings, dir, Message::ApplyToAll { tag, value }, dry_run),
        Command::Delete { dir, tag, dry_run } => {
            bulk_edit(settings, dir, Message::DeleteFromAll { tag }, dry_run)
        }
        Command::Validate { vr, value } => Ok(validate(vr, &value)),
    }
}

fn show(file: &Path, include_private: bool) -> Result<()> {
    let item = load_dicom(file)?;
    for row in extract_flat(&item.record, include_private) {
        println!(
            "{:indent$}({}) {} {:<32} {}",
            "",
            row.tag_text(),
            row.vr_text(),
            row.name,
            row.value,
            indent = row.depth * 2
        );
    }
    Ok(())
}

fn bulk_edit(settings: Settings, dir: PathBuf, command: Message, dry_run: bool) -> Result<ExitCode> {
    let mut app = App::new(settings);
    app.subscribe(|event| {
        if let AppEvent::Progress(progress) = event {
            log::debug!("[{:>5.1}%] {}", progress.percentage, progress.message);
        }
    });

    if let Outcome::Loaded { loaded, errors } = app.update(Message::LoadFolder(dir))? {
        println!("Loaded {loaded} file(s)");
        if !errors.is_empty() {
            eprintln!("{}", summarize_errors(&errors, ERROR_DISPLAY_CAP));
        }
    }

    let Outcome::Bulk(outcome) = app.update(command)? else {
        return Ok(ExitCode::SUCCESS);
    };
    println!(
        "{}: {} changed, {} skipped, {} failed",
        outcome.action.as_deref().unwrap_or("No changes"),
        outcome.changed,
        outcome.skipped,
        outcome.errors.len()
    );
    if !outcome.errors.is_empty() {
        eprintln!("{}", summarize_errors(&outcome.errors, ERROR_DISPLAY_CAP));
    }

    if dry_run {
        println!("Dry run, no files written");
    } else if let Outcome::Saved(report) = app.update(Message::SaveModified)? {
        println!("Saved {} file(s)", report.saved);
        if !report.errors.is_empty() {
            eprintln!("{}", summarize_errors(&report.errors, ERROR_DISPLAY_CAP));
        }
    }

    if outcome.errors.is_empty() {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}

fn validate(vr: VR, value: &str) -> ExitCode {
    let result = vr::validate(Tag(0, 0), vr, value);
    match result.severity {
        Severity::None => {
            println!("ok");
            ExitCode::SUCCESS
        }
        Severity::Warning => {
            println!("warning: {}", result.message);
            ExitCode::SUCCESS
        }
        Severity::Error => {
            println!("invalid {}: {}", vr.to_string(), result.message);
            ExitCode::FAILURE
        }
    }
}
