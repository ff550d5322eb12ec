use anyhow::{Context, Result};
use chrono::TimeDelta;
use clap::{Args, Parser, Subcommand};
use dialoguer::{Confirm, Input, MultiSelect};
use indicatif::{ProgressBar, ProgressStyle};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use zakar::core::cluster::{DEFAULT_MAX_DISTANCE, DEFAULT_MAX_TIME_DELTA_SECS};
use zakar::report::plan;
use zakar::{
    Analysis, ClusterConfig, EmptyReason, OrganizeOptions, Organizer, ProgressSink, ScanProgress,
    TagError, TagPrompt, analyze, apply_tags,
};

const DEFAULT_INBOX: &str = "01_zakar_inbox";
const DEFAULT_STORAGE: &str = "02_best_shots";
const DEFAULT_REVIEW: &str = "03_review_similar";
const MAX_TIME_DELTA_SECS: i64 = 86_400;
const DEFAULT_EVENT: &str = "2026_winter_retreat";
const PRESET_TAGS: [&str; 8] = [
    "worship",
    "praise",
    "prayer",
    "meal",
    "fellowship",
    "small-group",
    "recreation",
    "service",
];

#[derive(Parser, Debug)]
#[command(name = "zakar", version, about = "Group near-duplicate photos and file the best shots")]
struct Cli {
    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Group photos and show what would be kept, without moving anything
    Scan {
        #[command(flatten)]
        input: InputArgs,
        /// Name folders by date and time slot
        #[arg(long)]
        time_slots: bool,
        /// Print the groups as JSON
        #[arg(long)]
        json: bool,
    },

    /// Group photos, move best shots into the event tree and the rest to review
    Organize {
        #[command(flatten)]
        input: InputArgs,
        /// Event name (asked interactively when omitted)
        #[arg(short, long)]
        event: Option<String>,
        /// Name folders by date and time slot
        #[arg(long, conflicts_with = "no_time_slots")]
        time_slots: bool,
        /// Name folders by date only
        #[arg(long)]
        no_time_slots: bool,
        /// Root of the curated tree
        #[arg(long, value_name = "DIR", default_value = DEFAULT_STORAGE)]
        storage: PathBuf,
        /// Flat folder for near-duplicates
        #[arg(long, value_name = "DIR", default_value = DEFAULT_REVIEW)]
        review: PathBuf,
        /// Ask for tags per folder afterwards
        #[arg(long)]
        tag: bool,
    },

    /// Tag the files of an organized event tree, folder by folder
    Tag {
        /// Event root produced by `organize`
        #[arg(short, long, value_name = "DIR")]
        root: PathBuf,
    },
}

#[derive(Args, Debug)]
struct InputArgs {
    /// Folder of photos (default: `<desktop>/01_zakar_inbox`)
    #[arg(short, long, value_name = "DIR")]
    input: Option<PathBuf>,
    /// Maximum perceptual hash distance within a group
    #[arg(long, default_value_t = DEFAULT_MAX_DISTANCE)]
    max_distance: u32,
    /// Maximum seconds between a photo and its group's first photo (0 to 86400)
    #[arg(
        long,
        default_value_t = DEFAULT_MAX_TIME_DELTA_SECS,
        value_parser = clap::value_parser!(i64).range(0..=MAX_TIME_DELTA_SECS)
    )]
    max_seconds: i64,
}

impl InputArgs {
    fn cluster_config(&self) -> ClusterConfig {
        ClusterConfig {
            max_distance: self.max_distance,
            max_time_delta: TimeDelta::seconds(self.max_seconds),
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    match cli.command {
        Commands::Scan {
            input,
            time_slots,
            json,
        } => {
            let Some(dir) = resolve_inbox(input.input.as_deref())? else {
                return Ok(());
            };
            let Some(groups) = run_analysis(&dir, &input.cluster_config())? else {
                return Ok(());
            };

            let reports = plan(&groups, time_slots)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&reports)?);
                return Ok(());
            }

            println!("Found {} group(s):", reports.len());
            for report in &reports {
                println!("\n✨ Group {} → {}", report.id + 1, report.folder);
                println!("   🏆 Keeping → {}", report.best.path);
                for dup in &report.duplicates {
                    println!("   📦 Review  → {}", dup.path);
                }
            }
            println!("\n⚠️  Scan only; no files were changed.");
        }

        Commands::Organize {
            input,
            event,
            time_slots,
            no_time_slots,
            storage,
            review,
            tag,
        } => {
            let Some(dir) = resolve_inbox(input.input.as_deref())? else {
                return Ok(());
            };

            let event_name = match event {
                Some(name) => name,
                None => Input::<String>::new()
                    .with_prompt("Name of the event to remember")
                    .default(DEFAULT_EVENT.to_string())
                    .interact_text()
                    .context("Failed to read event name")?,
            };
            let event_name = event_name.trim().to_string();
            if event_name.is_empty() {
                println!("No event name given; nothing to do.");
                return Ok(());
            }

            let use_time_slots = if time_slots || no_time_slots {
                time_slots
            } else {
                Confirm::new()
                    .with_prompt("Sort into time-of-day folders too?")
                    .default(true)
                    .interact()
                    .context("Failed to read time-slot choice")?
            };

            let Some(groups) = run_analysis(&dir, &input.cluster_config())? else {
                return Ok(());
            };

            let options = OrganizeOptions {
                storage_root: storage,
                review_root: review,
                event_name,
                use_time_slots,
            };
            let report = benchmark("organizing", || Organizer::new(options.clone()).organize(&groups))
                .with_context(|| format!("Organizing into {} failed", options.event_root().display()))?;

            println!(
                "\n✅ {} best shot(s) → {}",
                report.kept,
                report.event_root.display()
            );
            println!(
                "   📦 {} similar photo(s) → {}",
                report.moved_to_review,
                options.review_root.display()
            );
            if report.skipped_existing > 0 {
                println!(
                    "   ⚠️  {} photo(s) left in place, a file with the same name already existed",
                    report.skipped_existing
                );
            }

            if tag {
                run_tagging(&report.event_root)?;
            }
        }

        Commands::Tag { root } => run_tagging(&root)?,
    }

    Ok(())
}

fn setup_logging(verbosity: u8) {
    let level = match verbosity {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    env_logger::Builder::from_default_env()
        .filter_level(level)
        .init();
}

/// The explicit input folder, or the desktop inbox. A missing default inbox
/// is created and the run stops so the user can fill it.
fn resolve_inbox(explicit: Option<&Path>) -> Result<Option<PathBuf>> {
    if let Some(dir) = explicit {
        return Ok(Some(dir.to_path_buf()));
    }

    let base = dirs::desktop_dir()
        .or_else(dirs::home_dir)
        .context("Could not locate a desktop or home directory")?;
    let inbox = base.join(DEFAULT_INBOX);
    if !inbox.exists() {
        fs::create_dir_all(&inbox)
            .with_context(|| format!("Failed to create directory {:?}", inbox))?;
        println!("📂 Created {}", inbox.display());
        println!("   Put your photos there and run again.");
        return Ok(None);
    }
    Ok(Some(inbox))
}

/// Analyze `dir`; `None` means there was nothing to do and the user was told.
fn run_analysis(dir: &Path, config: &ClusterConfig) -> Result<Option<Vec<zakar::Group>>> {
    println!("▶ Analyzing photos in: {}", dir.display());
    let bar = ConsoleProgress::new();
    let analysis = benchmark("analysis", || analyze(dir, config, Some(&bar)))
        .with_context(|| format!("Failed to analyze {}", dir.display()))?;

    match analysis {
        Analysis::Empty(EmptyReason::NoEligibleFiles) => {
            println!("No photos to analyze in {}.", dir.display());
            Ok(None)
        }
        Analysis::Empty(EmptyReason::NothingReadable { eligible }) => {
            println!("None of the {} photo(s) in {} could be read.", eligible, dir.display());
            Ok(None)
        }
        Analysis::Grouped(groups) => Ok(Some(groups)),
    }
}

fn run_tagging(root: &Path) -> Result<()> {
    println!("\n🏷️  Tagging folders under {}", root.display());
    let mut prompt = ConsoleTagPrompt;
    let report = apply_tags(root, &mut prompt)
        .with_context(|| format!("Tagging {} failed", root.display()))?;
    println!(
        "✅ Tagged {} folder(s), renamed {} file(s)",
        report.folders, report.renamed
    );
    Ok(())
}

/// Progress bar whose length is taken from each report.
struct ConsoleProgress {
    bar: ProgressBar,
}

impl ConsoleProgress {
    fn new() -> Self {
        let bar = ProgressBar::new(0);
        if let Ok(style) =
            ProgressStyle::with_template("{spinner:.green} [{bar:30}] {pos}/{len} {wide_msg}")
        {
            bar.set_style(style.progress_chars("=> "));
        }
        bar.enable_steady_tick(Duration::from_millis(100));
        Self { bar }
    }
}

impl ProgressSink for ConsoleProgress {
    fn report(&self, progress: &ScanProgress) {
        self.bar.set_length(progress.total as u64);
        self.bar.set_position(progress.processed as u64);
        let name = Path::new(&progress.current_file)
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        self.bar.set_message(name);
    }

    fn finish(&self) {
        self.bar.finish_with_message("Analysis complete");
    }
}

struct ConsoleTagPrompt;

impl TagPrompt for ConsoleTagPrompt {
    fn tags_for(&mut self, folder: &Path, files: &[String]) -> Result<String, TagError> {
        let prompt_err = |e: dialoguer::Error| TagError::Prompt {
            folder: folder.to_path_buf(),
            message: e.to_string(),
        };
        let folder_name = folder
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();

        println!("\n📂 Folder: {} ({} file(s))", folder_name, files.len());
        let picked = MultiSelect::new()
            .with_prompt("Pick tags (space to toggle, enter to confirm)")
            .items(&PRESET_TAGS)
            .interact()
            .map_err(prompt_err)?;
        let extra: String = Input::new()
            .with_prompt("More tags, comma separated")
            .allow_empty(true)
            .interact_text()
            .map_err(prompt_err)?;

        let mut tags: Vec<String> = picked.iter().map(|&i| PRESET_TAGS[i].to_string()).collect();
        for tag in extra.split(',').map(str::trim).filter(|t| !t.is_empty()) {
            if !tags.iter().any(|t| t == tag) {
                tags.push(tag.to_string());
            }
        }
        Ok(tags.join(", "))
    }
}

/// Run `f()`, log how long it took (with `label`), and return its result.
fn benchmark<T, F: FnOnce() -> T>(label: &str, f: F) -> T {
    let start = Instant::now();
    let result = f();
    log::info!("⏱ {} took {:.2?}", label, start.elapsed());
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_organize_defaults() {
        let cli = Cli::parse_from(["zakar", "organize", "--input", "inbox", "--event", "camp"]);
        match cli.command {
            Commands::Organize {
                input,
                event,
                time_slots,
                no_time_slots,
                storage,
                review,
                tag,
            } => {
                assert_eq!(input.input, Some(PathBuf::from("inbox")));
                assert_eq!(event.as_deref(), Some("camp"));
                assert!(!time_slots && !no_time_slots && !tag);
                assert_eq!(storage, PathBuf::from(DEFAULT_STORAGE));
                assert_eq!(review, PathBuf::from(DEFAULT_REVIEW));
                assert_eq!(input.cluster_config(), ClusterConfig::default());
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_time_slot_flags_conflict() {
        let result = Cli::try_parse_from([
            "zakar",
            "organize",
            "--time-slots",
            "--no-time-slots",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_scan_thresholds() {
        let cli = Cli::parse_from([
            "zakar",
            "scan",
            "--max-distance",
            "12",
            "--max-seconds",
            "5",
            "--json",
        ]);
        match cli.command {
            Commands::Scan { input, json, .. } => {
                assert!(json);
                let config = input.cluster_config();
                assert_eq!(config.max_distance, 12);
                assert_eq!(config.max_time_delta, TimeDelta::seconds(5));
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_max_seconds_out_of_range_is_rejected() {
        for value in ["9223372036854775807", "86401", "-1"] {
            let result = Cli::try_parse_from(["zakar", "scan", "--max-seconds", value]);
            assert!(result.is_err(), "--max-seconds {value} was accepted");
        }

        let cli = Cli::parse_from(["zakar", "scan", "--max-seconds", "86400"]);
        match cli.command {
            Commands::Scan { input, .. } => {
                assert_eq!(input.cluster_config().max_time_delta, TimeDelta::days(1));
            }
            other => panic!("unexpected command {:?}", other),
        }
    }
}
