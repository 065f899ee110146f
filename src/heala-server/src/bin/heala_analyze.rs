// Copyright (c), Mysten Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

// heala command line client
//
// Drives the document analyzer, triage chat and bundled data lookups from a
// terminal. The model is reached through a running relay (`--relay`) or
// directly with `GEMINI_API_KEY`.
//
// Usage:
//   heala-analyze analyze <image> --kind lab|prescription [--translate <language>]
//   heala-analyze chat <message>
//   heala-analyze hospitals <file> [--lat <lat> --lon <lon>] [--search <q>] [--nearest <n>]
//   heala-analyze records <file> [--search <q>]
//   heala-analyze schedule [--search <q>]

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use heala_server::app::records::{count_label, detail_message, HealthRecord};
use heala_server::app::session::DEFAULT_LANGUAGE;
use heala_server::app::{
    load_hospitals_file, rank_hospitals, recent_prescriptions, select_hospitals, Coordinate,
    DocumentAnalyzer, DocumentKind, FileImageSource, GeminiClient, GeminiConfig, GenerativeModel,
    HealthChat, HealthRecords, MedicineSchedule, Period, RankedHospital, SessionContext,
    TranslateOutcome,
};
use heala_server::config::{ENV_API_KEY, ENV_UPSTREAM_URL};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "heala-analyze")]
#[command(version = "0.1.0")]
#[command(about = "Analyze medical documents and query heala data", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Relay root URL, e.g. http://127.0.0.1:5001 (GEMINI_API_KEY is used otherwise)
    #[arg(long, global = true)]
    relay: Option<String>,

    /// Preferred language; analysis results are translated into it
    #[arg(long, global = true, default_value = DEFAULT_LANGUAGE)]
    language: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Classify and analyze a lab report or prescription image
    Analyze {
        /// Image file (jpeg, png or webp)
        image: PathBuf,

        /// Analyzer to use: lab or prescription
        #[arg(short, long)]
        kind: DocumentKind,

        /// Translate the result into this language instead of --language
        #[arg(short, long)]
        translate: Option<String>,
    },

    /// Ask the triage assistant about a disease or symptom
    Chat {
        /// Message, up to 500 characters
        message: String,
    },

    /// List hospitals by distance
    Hospitals {
        /// Hospital list (JSON)
        file: PathBuf,

        /// Device latitude
        #[arg(long, requires = "lon", allow_negative_numbers = true)]
        lat: Option<f64>,

        /// Device longitude
        #[arg(long, requires = "lat", allow_negative_numbers = true)]
        lon: Option<f64>,

        /// Filter by name or location
        #[arg(short, long)]
        search: Option<String>,

        /// Show only the nearest N hospitals with a known distance
        #[arg(short, long, num_args = 0..=1, default_missing_value = "3")]
        nearest: Option<usize>,
    },

    /// Browse past prescriptions and lab reports
    Records {
        /// Health records (JSON)
        file: PathBuf,

        #[arg(short, long, default_value = "")]
        search: String,
    },

    /// Show today's medicine schedule
    Schedule {
        #[arg(short, long, default_value = "")]
        search: String,
    },
}

fn build_model(relay: Option<&str>) -> Result<Arc<dyn GenerativeModel>> {
    let config = match relay {
        Some(url) => GeminiConfig::relay(url),
        None => {
            let key = std::env::var(ENV_API_KEY)
                .with_context(|| format!("set {ENV_API_KEY} or pass --relay"))?;
            let config = GeminiConfig::direct(key);
            match std::env::var(ENV_UPSTREAM_URL) {
                Ok(url) => config.with_url(url),
                Err(_) => config,
            }
        }
    };
    Ok(Arc::new(GeminiClient::new(config)?))
}

fn print_hospital(h: &RankedHospital) {
    let phone = h.hospital.phone.as_deref().unwrap_or("-");
    println!("{:<40} {:<24} {}", h.hospital.name, h.summary(), phone);
}

fn print_record(record: &HealthRecord) {
    match record {
        HealthRecord::Prescription {
            disease, medicines, ..
        } => {
            println!("  {disease}");
            for m in medicines {
                println!("{}\n", indent(&detail_message(&m.name, &m.details), "    "));
            }
        }
        HealthRecord::LabReport { title, details, .. } => {
            println!("{}\n", indent(&detail_message(title, details), "  "));
        }
    }
}

fn indent(text: &str, prefix: &str) -> String {
    text.lines()
        .map(|line| format!("{prefix}{line}"))
        .collect::<Vec<_>>()
        .join("\n")
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut session = SessionContext::default();
    session.language = cli.language.clone();

    match cli.command {
        Commands::Analyze {
            image,
            kind,
            translate,
        } => {
            let model = build_model(cli.relay.as_deref())?;
            let analyzer = DocumentAnalyzer::new(model, session);
            let source = FileImageSource::new(&image);
            info!("Analyzing {}", source.path().display());

            let Some(mut result) = analyzer.run(kind, &source).await? else {
                bail!("no image selected");
            };
            let text = result.wait_for_reveal().await.unwrap_or_default();
            println!("{text}");

            if !result.is_valid() {
                return Err(match result.result().clone().into_error() {
                    Some(e) => e.into(),
                    None => anyhow!("analysis did not produce a usable result"),
                });
            }

            let target = translate.or_else(|| {
                (!cli.language.eq_ignore_ascii_case(DEFAULT_LANGUAGE)).then_some(cli.language)
            });
            if let Some(language) = target {
                match result.translate(&language).await {
                    TranslateOutcome::Translated(translated) => println!("\n{translated}"),
                    TranslateOutcome::AlreadyActive { notice }
                    | TranslateOutcome::Failed { notice } => eprintln!("{notice}"),
                    TranslateOutcome::Unavailable => eprintln!("Translation is not available"),
                }
            }
        }

        Commands::Chat { message } => {
            let model = build_model(cli.relay.as_deref())?;
            let chat = HealthChat::new(model, session);
            println!("{}", chat.reply(&message).await?);
        }

        Commands::Hospitals {
            file,
            lat,
            lon,
            search,
            nearest: nearest_n,
        } => {
            let hospitals = load_hospitals_file(&file).await?;
            let origin = lat.zip(lon).map(|(lat, lon)| Coordinate::new(lat, lon));
            let ranked = rank_hospitals(hospitals, origin);

            let shown = select_hospitals(&ranked, search.as_deref(), nearest_n);
            if shown.is_empty() {
                if origin.is_none() && nearest_n.is_some() {
                    println!("No location given; pass --lat and --lon.");
                } else {
                    println!("No hospitals found.");
                }
            }
            for h in shown {
                print_hospital(h);
            }
        }

        Commands::Records { file, search } => {
            let records = HealthRecords::load_file(&file).await?;
            let found = records.search(&search);
            for (label, group) in [
                ("Prescription", &found.prescriptions),
                ("Lab Report", &found.lab_reports),
            ] {
                println!("{label} ({})", count_label(group.len()));
                for record in group {
                    print_record(record);
                }
            }
        }

        Commands::Schedule { search } => {
            let schedule = MedicineSchedule::default();
            let matching = schedule.search(&search);
            println!("{} pending", schedule.pending_count());
            for period in Period::ALL {
                let entries: Vec<_> = matching.iter().filter(|e| e.period == period).collect();
                if entries.is_empty() {
                    continue;
                }
                println!("{period}");
                for entry in entries {
                    let mark = if entry.taken { "x" } else { " " };
                    println!("  [{mark}] {:<8} {}", entry.time, entry.medicine_name);
                }
            }

            println!("\nRecent prescriptions");
            for p in recent_prescriptions() {
                println!(
                    "  {:<20} {:<8} {:<12} {} for {} days",
                    p.medicine, p.date, p.doctor, p.dosage, p.days
                );
            }
        }
    }

    Ok(())
}
