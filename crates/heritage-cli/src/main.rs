//! `heritage`: reviewer console for the heritage registry.
//!
//! # Usage
//!
//! ```
//! heritage --url http://localhost:8080 list
//! heritage show 5f0c…            # summary plus highlighted diff
//! heritage decide 5f0c… rejected --feedback "Needs citations"
//! heritage submit --type site --action add --data @fort.json \
//!   --researcher 8d1e… --image fort.jpg
//! ```

mod client;
mod render;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use client::{ApiClient, ApiConfig, NewRequest};
use heritage_core::{
  staging::{Action, EntryKind, Verdict},
  submission::parse_data,
};
use serde::Deserialize;
use uuid::Uuid;

// ─── CLI args ─────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "heritage", about = "Reviewer console for the heritage registry")]
struct Args {
  /// Path to a TOML config file (url).
  #[arg(short, long, value_name = "FILE")]
  config: Option<PathBuf>,

  /// Base URL of the heritage server (default: http://localhost:8080).
  #[arg(long, env = "HERITAGE_URL")]
  url: Option<String>,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// List research requests, newest first.
  List {
    /// Only requests from this research expert.
    #[arg(long, value_name = "USER_ID")]
    researcher: Option<Uuid>,
  },
  /// Show one request with its submitter and highlighted changes.
  Show {
    id:  Uuid,
    /// Also list unchanged fields.
    #[arg(long)]
    all: bool,
  },
  /// Approve, reject, or send a request back for an update.
  Decide {
    id:       Uuid,
    /// One of `approved`, `rejected`, `needs_update`.
    verdict:  Verdict,
    #[arg(long)]
    feedback: Option<String>,
  },
  /// Submit a proposal as a research expert.
  Submit {
    #[arg(long = "type")]
    kind:       EntryKind,
    #[arg(long)]
    action:     Action,
    /// JSON object, or `@path` to read it from a file.
    #[arg(long)]
    data:       String,
    #[arg(long, value_name = "USER_ID")]
    researcher: Uuid,
    #[arg(long = "image", value_name = "FILE")]
    images:     Vec<PathBuf>,
  },
  /// Print a canonical site as JSON.
  Site { site_id: String },
}

// ─── Config file ──────────────────────────────────────────────────────────────

/// Shape of the optional TOML config file.
#[derive(Deserialize, Default)]
struct ConfigFile {
  #[serde(default)]
  url: String,
}

// ─── Entry point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
  let args = Args::parse();

  // Load config file if provided.
  let file_cfg: ConfigFile = if let Some(path) = &args.config {
    let raw = std::fs::read_to_string(path)
      .with_context(|| format!("reading config file {}", path.display()))?;
    toml::from_str(&raw).context("parsing config file")?
  } else {
    ConfigFile::default()
  };

  // CLI flags override config file, which overrides defaults.
  let api_config = ApiConfig {
    base_url: args
      .url
      .or_else(|| (!file_cfg.url.is_empty()).then(|| file_cfg.url.clone()))
      .unwrap_or_else(|| "http://localhost:8080".to_string()),
  };
  let client = ApiClient::new(api_config)?;

  match args.command {
    Command::List { researcher } => {
      let requests = client.list_requests(researcher).await?;
      print!("{}", render::request_table(&requests));
    }

    Command::Show { id, all } => {
      let detail = client.get_request(id).await?;
      let diff = client.get_diff(id).await?;
      print!("{}", render::request_summary(&detail));
      println!();
      print!("{}", render::diff_listing(&diff, all));
    }

    Command::Decide { id, verdict, feedback } => {
      let (message, temp_site) = client.decide(id, verdict, feedback.as_deref()).await?;
      println!("{message}: {} is now {}", temp_site.id, temp_site.status.as_ref());
    }

    Command::Submit {
      kind,
      action,
      data,
      researcher,
      images,
    } => {
      let raw = match data.strip_prefix('@') {
        Some(path) => std::fs::read_to_string(path)
          .with_context(|| format!("reading data file {path}"))?,
        None => data,
      };
      let data = parse_data(&raw)?;
      let (message, temp_site) = client
        .submit(NewRequest {
          kind,
          action,
          data,
          research_expert_id: researcher,
          images,
        })
        .await?;
      println!("{message}: {}", temp_site.id);
    }

    Command::Site { site_id } => {
      let site = client.get_site(&site_id).await?;
      println!("{}", serde_json::to_string_pretty(&site)?);
    }
  }

  Ok(())
}
