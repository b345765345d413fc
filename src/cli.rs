// src/cli.rs
// =============================================================================
// This file defines our command-line interface using the `clap` crate.
//
// Three subcommands:
//   convert  - legacy exam JSON -> converted_exams.json (checks images too)
//   check    - only check the image links and report them
//   inspect  - show the details of one exam in the file
//
// INPUT is a path to a .json file, or "-" to read the document from stdin.
// =============================================================================

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "exam-converter",
    version,
    about = "Convert legacy exam JSON to the normalized exam format and check image links",
    long_about = "exam-converter reads exams in the legacy format (name, sections, questions), \
                  converts them to the normalized format (title, duration, lettered options) \
                  and verifies that every image question points at an image that actually loads."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to a TOML configuration file (default: ./exam-converter.toml if present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Maximum number of image checks in flight (0 = no limit)
    #[arg(long, global = true)]
    pub concurrency: Option<usize>,

    /// Seconds before a single image check is given up as broken (0 = never)
    #[arg(long, global = true)]
    pub timeout: Option<u64>,

    /// Show debug logs
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Convert exams and write converted_exams.json
    ///
    /// Example: exam-converter convert exams.json --output-dir out/
    Convert {
        /// Exam JSON file, or - for stdin
        input: String,

        /// Directory to write the converted file into
        #[arg(long)]
        output_dir: Option<PathBuf>,

        /// Write the converted JSON to stdout instead of a file
        #[arg(long)]
        stdout: bool,

        /// Don't check image links before converting
        #[arg(long)]
        skip_image_check: bool,

        /// Only exams whose name contains this text (case-insensitive)
        #[arg(long)]
        name: Option<String>,
    },

    /// Check every image question's link
    ///
    /// Exits with code 1 if any image is broken.
    Check {
        /// Exam JSON file, or - for stdin
        input: String,

        /// Output results as JSON instead of a table
        #[arg(long)]
        json: bool,

        /// Only exams whose name contains this text (case-insensitive)
        #[arg(long)]
        name: Option<String>,
    },

    /// Show the details of one exam
    Inspect {
        /// Exam JSON file, or - for stdin
        input: String,

        /// Which exam to show, counting from 0
        #[arg(long, default_value_t = 0)]
        index: usize,
    },
}
