// SPDX-FileCopyrightText: 2026 Omnigen Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `omnigen submit`, `status`, and `cancel` command implementations.
//!
//! Each command wires a short-lived orchestrator over the shared SQLite
//! store. `submit --wait` drives the poll queue in-process, so a task can
//! be followed to completion without a running server.

use std::sync::Arc;
use std::time::Duration;

use clap::Args;
use omnigen_config::model::OmnigenConfig;
use omnigen_core::{GenerationRequest, OmnigenError, PollQueue, TaskEvent, TaskRecord, TaskStore};
use omnigen_cost::CostEngine;
use omnigen_orchestrator::{Orchestrator, PollSettings};
use omnigen_registry::builtin_registry;
use omnigen_store::SqliteStore;

/// Arguments for `omnigen submit`.
#[derive(Args, Debug)]
pub struct SubmitArgs {
    /// Provider to submit to, as listed by `omnigen models`.
    pub provider: String,

    /// Model identifier (e.g. gpt-4.1, kling-2.6/text-to-video).
    pub model: String,

    /// Prompt text.
    pub prompt: String,

    /// System prompt for chat-style text models.
    #[arg(long, value_name = "TEXT")]
    pub system_prompt: Option<String>,

    /// Token cap for text generations.
    #[arg(long)]
    pub max_tokens: Option<u32>,

    /// Sampling temperature for text generations.
    #[arg(long)]
    pub temperature: Option<f32>,

    /// Aspect ratio for image and video generations (e.g. 16:9).
    #[arg(long, value_name = "RATIO")]
    pub aspect_ratio: Option<String>,

    /// Clip length in seconds for video generations.
    #[arg(long, value_name = "SECS")]
    pub duration: Option<u32>,

    /// Generate audio along with video.
    #[arg(long)]
    pub sound: bool,

    /// Reference image URL; repeat the flag for multiple images.
    #[arg(long = "image-url", value_name = "URL")]
    pub image_urls: Vec<String>,

    /// What the model should avoid generating.
    #[arg(long, value_name = "TEXT")]
    pub negative_prompt: Option<String>,

    /// Number of outputs to request.
    #[arg(long)]
    pub count: Option<u32>,

    /// Output resolution (e.g. 1080p).
    #[arg(long)]
    pub resolution: Option<String>,

    /// Drive polling in-process until the task reaches a terminal state.
    #[arg(long)]
    pub wait: bool,

    /// Print the final record as JSON.
    #[arg(long)]
    pub json: bool,
}

/// Run the `omnigen submit` command.
pub async fn run_submit(config: &OmnigenConfig, args: SubmitArgs) -> Result<(), OmnigenError> {
    let (store, orchestrator) = open_orchestrator(config).await?;
    let request = build_request(&args);
    let mut record = orchestrator.submit(&args.provider, request).await?;

    if args.wait && !record.status.is_terminal() {
        record = follow_to_terminal(&orchestrator, &record.id, &config.poll).await?;
    }

    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&record).unwrap_or_else(|_| "{}".to_string())
        );
    } else {
        print_record(&record);
        if !record.status.is_terminal() {
            println!("  Follow with: omnigen status {} --refresh", record.id);
            println!();
        }
    }

    store.close().await
}

/// Run the `omnigen status` command.
pub async fn run_status(
    config: &OmnigenConfig,
    task_id: &str,
    refresh: bool,
    json: bool,
) -> Result<(), OmnigenError> {
    let (store, orchestrator) = open_orchestrator(config).await?;
    let view = orchestrator.get_status(task_id, refresh).await?;

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&view).unwrap_or_else(|_| "{}".to_string())
        );
    } else {
        print_record(&view.task);
        print_events(&view.events);
    }

    store.close().await
}

/// Run the `omnigen cancel` command.
pub async fn run_cancel(
    config: &OmnigenConfig,
    task_id: &str,
    json: bool,
) -> Result<(), OmnigenError> {
    let (store, orchestrator) = open_orchestrator(config).await?;
    let record = orchestrator.cancel(task_id).await?;

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&record).unwrap_or_else(|_| "{}".to_string())
        );
    } else {
        print_record(&record);
    }

    store.close().await
}

/// Open the store and wire an orchestrator over the built-in registry.
///
/// The store handle is returned alongside so callers can checkpoint the
/// WAL before the process exits.
async fn open_orchestrator(
    config: &OmnigenConfig,
) -> Result<(Arc<SqliteStore>, Orchestrator), OmnigenError> {
    let store = Arc::new(SqliteStore::open(&config.store).await?);
    let registry = Arc::new(builtin_registry(config));
    let orchestrator = Orchestrator::new(
        registry,
        Arc::clone(&store) as Arc<dyn TaskStore>,
        Arc::clone(&store) as Arc<dyn PollQueue>,
        CostEngine::new(config.billing.credit_markup),
        PollSettings::from_config(&config.poll),
    );
    Ok((store, orchestrator))
}

/// Translate CLI flags into a normalized generation request.
fn build_request(args: &SubmitArgs) -> GenerationRequest {
    let mut request = GenerationRequest::new(&args.model, &args.prompt);
    request.system_prompt = args.system_prompt.clone();
    request.options.max_tokens = args.max_tokens;
    request.options.temperature = args.temperature;
    request.options.aspect_ratio = args.aspect_ratio.clone();
    request.options.duration_secs = args.duration;
    if args.sound {
        request.options.sound = Some(true);
    }
    request.options.image_urls = args.image_urls.clone();
    request.options.negative_prompt = args.negative_prompt.clone();
    request.options.output_count = args.count;
    request.options.resolution = args.resolution.clone();
    request
}

/// Sweep the poll queue until the task settles, sleeping the worker
/// interval between sweeps. Honors each entry's due time, so a provider
/// with a long poll interval is not hammered.
async fn follow_to_terminal(
    orchestrator: &Orchestrator,
    task_id: &str,
    poll: &omnigen_config::model::PollConfig,
) -> Result<TaskRecord, OmnigenError> {
    let interval = Duration::from_secs(poll.worker_interval_secs.max(1));
    loop {
        orchestrator.run_due_polls(poll.batch_size).await?;
        let view = orchestrator.get_status(task_id, false).await?;
        if view.task.status.is_terminal() {
            return Ok(view.task);
        }
        // Nothing scheduled can advance this task any further.
        if orchestrator.pending_polls().await? == 0 {
            return Ok(view.task);
        }
        tokio::time::sleep(interval).await;
    }
}

fn print_record(record: &TaskRecord) {
    println!();
    println!("  omnigen task {}", record.id);
    println!("  {}", "-".repeat(44));
    println!("    {:<12} {}", "Provider:", record.provider);
    println!("    {:<12} {}", "Model:", record.model);
    println!("    {:<12} {}", "Status:", record.status);
    if let Some(external) = &record.external_task_id {
        println!("    {:<12} {}", "External:", external);
    }
    if let Some(url) = &record.result_url {
        println!("    {:<12} {}", "Result:", url);
    }
    for extra in record.result_urls.iter().skip(1) {
        println!("    {:<12} {}", "", extra);
    }
    if let Some(line) = error_line(record) {
        println!("    {:<12} {}", "Error:", line);
    }
    if let Some(line) = cost_line(record) {
        println!("    {:<12} {}", "Cost:", line);
    }
    println!("    {:<12} {}", "Created:", record.created_at);
    if let Some(completed) = &record.completed_at {
        println!("    {:<12} {}", "Completed:", completed);
    }
    println!();
}

fn print_events(events: &[TaskEvent]) {
    if events.is_empty() {
        return;
    }
    println!("  Events:");
    for event in events {
        println!("{}", event_line(event));
    }
    println!();
}

/// One audit-trail line: sequence, kind, timestamp, then whatever the
/// provider reported.
fn event_line(event: &TaskEvent) -> String {
    let kind = event.event_type.to_string();
    let mut line = format!("    {:>3}  {kind:<18} {}", event.seq, event.created_at);
    if let Some(status) = &event.external_status {
        line.push_str(&format!("  {status}"));
    }
    if let Some(error) = &event.error_message {
        line.push_str(&format!("  {error}"));
    }
    line
}

fn cost_line(record: &TaskRecord) -> Option<String> {
    match (record.provider_cost, record.credits_spent) {
        (Some(cost), Some(credits)) => Some(format!("${cost:.4} ({credits:.4} credits)")),
        (Some(cost), None) => Some(format!("${cost:.4}")),
        (None, Some(credits)) => Some(format!("{credits:.4} credits")),
        (None, None) => None,
    }
}

fn error_line(record: &TaskRecord) -> Option<String> {
    match (&record.error_code, &record.error_message) {
        (Some(code), Some(message)) => Some(format!("{code}: {message}")),
        (Some(code), None) => Some(code.clone()),
        (None, Some(message)) => Some(message.clone()),
        (None, None) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use omnigen_core::{EventKind, TaskState};

    fn submit_args() -> SubmitArgs {
        SubmitArgs {
            provider: "kling".to_string(),
            model: "kling-2.6/text-to-video".to_string(),
            prompt: "a fox over a frozen lake".to_string(),
            system_prompt: None,
            max_tokens: None,
            temperature: None,
            aspect_ratio: None,
            duration: None,
            sound: false,
            image_urls: Vec::new(),
            negative_prompt: None,
            count: None,
            resolution: None,
            wait: false,
            json: false,
        }
    }

    fn record() -> TaskRecord {
        TaskRecord {
            id: "01JTEST".to_string(),
            provider: "kling".to_string(),
            model: "kling-2.6/text-to-video".to_string(),
            external_task_id: None,
            status: TaskState::Completed,
            result_url: None,
            result_urls: Vec::new(),
            error_code: None,
            error_message: None,
            credits_spent: None,
            provider_cost: None,
            request_params: None,
            created_at: "2026-01-01T00:00:00Z".to_string(),
            completed_at: None,
        }
    }

    #[test]
    fn build_request_maps_every_flag() {
        let mut args = submit_args();
        args.system_prompt = Some("be terse".to_string());
        args.max_tokens = Some(256);
        args.temperature = Some(0.2);
        args.aspect_ratio = Some("16:9".to_string());
        args.duration = Some(10);
        args.sound = true;
        args.image_urls = vec!["https://cdn.example/ref.png".to_string()];
        args.negative_prompt = Some("blur".to_string());
        args.count = Some(2);
        args.resolution = Some("1080p".to_string());

        let request = build_request(&args);
        assert_eq!(request.model, "kling-2.6/text-to-video");
        assert_eq!(request.prompt, "a fox over a frozen lake");
        assert_eq!(request.system_prompt.as_deref(), Some("be terse"));
        assert_eq!(request.options.max_tokens, Some(256));
        assert_eq!(request.options.temperature, Some(0.2));
        assert_eq!(request.options.aspect_ratio.as_deref(), Some("16:9"));
        assert_eq!(request.options.duration_secs, Some(10));
        assert_eq!(request.options.sound, Some(true));
        assert_eq!(request.options.image_urls.len(), 1);
        assert_eq!(request.options.negative_prompt.as_deref(), Some("blur"));
        assert_eq!(request.options.output_count, Some(2));
        assert_eq!(request.options.resolution.as_deref(), Some("1080p"));
    }

    #[test]
    fn build_request_leaves_sound_unset_without_flag() {
        let request = build_request(&submit_args());
        assert_eq!(request.options.sound, None);
        assert_eq!(request.options.duration_secs, None);
    }

    #[test]
    fn cost_line_formats_both_amounts() {
        let mut rec = record();
        rec.provider_cost = Some(0.5);
        rec.credits_spent = Some(1.0);
        assert_eq!(cost_line(&rec).unwrap(), "$0.5000 (1.0000 credits)");
    }

    #[test]
    fn cost_line_absent_when_unbilled() {
        assert!(cost_line(&record()).is_none());
    }

    #[test]
    fn error_line_joins_code_and_message() {
        let mut rec = record();
        rec.error_code = Some("RATE_LIMIT".to_string());
        rec.error_message = Some("slow down".to_string());
        assert_eq!(error_line(&rec).unwrap(), "RATE_LIMIT: slow down");

        rec.error_message = None;
        assert_eq!(error_line(&rec).unwrap(), "RATE_LIMIT");
    }

    #[test]
    fn event_line_appends_provider_detail() {
        let event = TaskEvent {
            seq: 3,
            task_id: "01JTEST".to_string(),
            event_type: EventKind::Poll,
            external_status: Some("processing".to_string()),
            response_data: None,
            error_message: None,
            created_at: "2026-01-01T00:00:05Z".to_string(),
        };
        let line = event_line(&event);
        assert!(line.contains("poll"), "{line}");
        assert!(line.contains("processing"), "{line}");
        assert!(line.starts_with("      3  "), "{line}");
    }
}
