use crate::output::{local_stamp, print_json, time_ago};
use crate::setup;
use chrono::{DateTime, Utc};
use clap::Args;
use pulse_client::GraphQlClient;
use pulse_core::activity::{collect_activity, ActivityOptions, ActivityReport, ActivitySources};
use pulse_core::executor::QueryExecutor;
use pulse_core::window::TimeWindow;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

#[derive(Args)]
pub struct ActivityArgs {
    /// Start of the window: `now`, `yesterday`, `last week`, `2h`, `3d`, `1w`,
    /// `YYYY-MM-DD`, or an RFC 3339 timestamp (default: yesterday)
    #[arg(long)]
    from: Option<String>,

    /// End of the window, same forms as --from (default: now)
    #[arg(long)]
    to: Option<String>,

    /// Also search the source host for items the tracker scan missed
    #[arg(long)]
    github: bool,

    /// Fetch per-item event timelines
    #[arg(long)]
    detail: bool,

    /// Only show items in this pipeline (case-insensitive, unique prefix ok)
    #[arg(long)]
    pipeline: Option<String>,

    /// Only show items from this repository (`name` or `owner/name`)
    #[arg(long)]
    repo: Option<String>,

    /// Skip the on-disk workspace cache
    #[arg(long)]
    no_cache: bool,
}

pub fn run(config: Option<&Path>, args: ActivityArgs, json: bool) -> anyhow::Result<()> {
    let now = Utc::now();
    // Bad time expressions fail before any config or network access.
    let window = TimeWindow::resolve(args.from.as_deref(), args.to.as_deref(), now)?;

    let (_, config) = setup::load_config(config)?;
    let primary: Arc<dyn QueryExecutor> =
        Arc::new(GraphQlClient::from_config("primary", &config.primary)?);

    let (secondary, secondary_error) = match (&config.secondary, args.github) {
        (Some(cfg), true) => match GraphQlClient::from_config("secondary", cfg) {
            Ok(client) => (Some(Arc::new(client) as Arc<dyn QueryExecutor>), None),
            Err(e) => {
                debug!(error = %e, "secondary client not built");
                (None, Some(e.to_string()))
            }
        },
        _ => (None, None),
    };

    let sources = ActivitySources {
        primary,
        secondary,
        secondary_error,
        cache: setup::open_cache(&config, args.no_cache)?,
    };

    let mut options = ActivityOptions::new(config.workspace.id.clone(), window);
    options.include_secondary = args.github;
    options.detail = args.detail;
    options.pipeline = args.pipeline;
    options.repo = args.repo;
    options.concurrency = config.activity.concurrency.max(1);
    options.page_size = config.activity.page_size;

    debug!(from = %window.from, to = %window.to, "collecting activity");
    let runtime = tokio::runtime::Runtime::new()?;
    let report = runtime.block_on(collect_activity(&sources, &options))?;

    for w in &report.warnings {
        eprintln!("warning: {w}");
    }

    if json {
        print_json(&report)
    } else {
        print!("{}", render(&report, args.detail, now));
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Human output
// ---------------------------------------------------------------------------

fn render(report: &ActivityReport, detail: bool, now: DateTime<Utc>) -> String {
    let mut lines = vec![format!(
        "Activity from {} to {}",
        local_stamp(report.from),
        local_stamp(report.to)
    )];

    if report.items.is_empty() {
        lines.push(String::new());
        lines.push("No activity in this window.".to_string());
        return lines.join("\n") + "\n";
    }

    let mut group: Option<&str> = None;
    for item in &report.items {
        if group != Some(item.placement.as_str()) {
            lines.push(String::new());
            lines.push(item.placement.clone());
            group = Some(item.placement.as_str());
        }

        let kind = if item.is_pr { " (PR)" } else { "" };
        let assignees = if item.assignees.is_empty() {
            String::new()
        } else {
            let names: Vec<&str> = item.assignees.iter().map(String::as_str).collect();
            format!(" [{}]", names.join(", "))
        };
        lines.push(format!(
            "  {}{kind}  {}{assignees}  · {}",
            item.reference,
            item.title,
            time_ago(item.display_updated_at(), now)
        ));

        if let Some(linked) = &item.cross_reference {
            lines.push(format!("      linked: {linked}"));
        }

        if detail {
            for event in &item.events {
                let actor = event
                    .actor
                    .as_deref()
                    .map(|a| format!(" ({a})"))
                    .unwrap_or_default();
                lines.push(format!(
                    "      {}  {:<9} {}{actor}",
                    local_stamp(event.time),
                    event.source.as_str(),
                    event.description
                ));
            }
        }
    }

    lines.push(String::new());
    lines.push(format!(
        "{} item(s) in {} group(s)",
        report.summary.item_count, report.summary.group_count
    ));
    lines.join("\n") + "\n"
}
