//! Todo command handlers.
//!
//! Every invocation spawns a controller, runs one command through it,
//! waits for the collection to settle, then shuts the controller down.

use std::time::Duration;

use tabled::Tabled;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

use syncly_api::{RestClient, TodoClient};
use syncly_config::ClientSettings;
use syncly_core::{
    NewTodo, Snapshot, SyncError, Todo, TodoController, TodoFilter, TodoPatch, todo_sync_options,
};

use crate::cli::{FilterArg, GlobalOpts, OutputFormat, TodosArgs, TodosCommand};
use crate::error::CliError;
use crate::output;

use super::util;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct TodoRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Done")]
    done: String,
    #[tabled(rename = "Title")]
    title: String,
    #[tabled(rename = "Text")]
    text: String,
    #[tabled(rename = "Updated")]
    updated: String,
}

fn todo_row(todo: &Todo, color: bool) -> TodoRow {
    let id = if todo.id.is_local() {
        output::pending_marker(&todo.id.to_string(), color)
    } else {
        todo.id.to_string()
    };
    TodoRow {
        id,
        done: output::done_marker(todo.completed, color),
        title: todo.title.clone(),
        text: todo.text.clone(),
        updated: todo
            .updated_at
            .or(todo.created_at)
            .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_default(),
    }
}

fn to_filter(arg: FilterArg) -> TodoFilter {
    match arg {
        FilterArg::All => TodoFilter::All,
        FilterArg::Visible => TodoFilter::Visible,
        FilterArg::Active => TodoFilter::Active,
        FilterArg::Completed => TodoFilter::Completed,
    }
}

fn render(
    snapshot: &Snapshot<Todo>,
    filter: &TodoFilter,
    global: &GlobalOpts,
) -> Result<String, CliError> {
    let todos: Vec<Todo> = snapshot
        .iter()
        .filter(|todo| filter.matches(todo))
        .map(|todo| Todo::clone(todo))
        .collect();
    let color = output::should_color(&global.color);
    output::render_list(
        &global.output,
        &todos,
        |t| todo_row(t, color),
        |t| t.id.to_string(),
    )
}

// ── Controller lifecycle ────────────────────────────────────────────

fn spawn_controller(settings: &ClientSettings) -> Result<TodoController, CliError> {
    let rest = RestClient::new(settings.base_url.clone(), &settings.transport)?;
    let client = TodoClient::with_path(rest, settings.resource.clone());
    let options = todo_sync_options(client)
        .auto_fetch(settings.auto_fetch)
        .optimistic(settings.optimistic);
    Ok(TodoController::spawn(options))
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    settings: &ClientSettings,
    args: TodosArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let controller = spawn_controller(settings)?;
    let result = run(&controller, args.command, global).await;
    controller.shutdown().await;
    result
}

async fn run(
    controller: &TodoController,
    command: TodosCommand,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match command {
        TodosCommand::List { filter } => {
            let snapshot = controller.refetch().await?;
            let out = render(&snapshot, &to_filter(filter), global)?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        TodosCommand::Add { title, text, done } => {
            if title.trim().is_empty() {
                return Err(CliError::Validation {
                    field: "title".into(),
                    reason: "must not be empty".into(),
                });
            }
            let mut draft = NewTodo::new(title, text);
            draft.completed = done;
            controller.submit_create(draft).await?;
            finish(controller, global).await
        }

        TodosCommand::Toggle { id } => {
            let snapshot = controller.refetch().await?;
            let todo = util::find_todo(&snapshot, &id)?;
            let patch = TodoPatch::new(todo.id.clone()).completed(!todo.completed);
            controller.submit_update(patch).await?;
            finish(controller, global).await
        }

        TodosCommand::Edit { id, title, text } => {
            if title.is_none() && text.is_none() {
                return Err(CliError::Validation {
                    field: "edit".into(),
                    reason: "pass --title and/or --text".into(),
                });
            }
            let snapshot = controller.refetch().await?;
            let todo = util::find_todo(&snapshot, &id)?;
            let mut patch = TodoPatch::new(todo.id.clone());
            patch.title = title;
            patch.text = text;
            controller.submit_update(patch).await?;
            finish(controller, global).await
        }

        TodosCommand::Remove { id } => {
            let snapshot = controller.refetch().await?;
            let todo = util::find_todo(&snapshot, &id)?;
            let prompt = format!("Delete todo '{}'?", todo.title);
            if !util::confirm(&prompt, "todos remove", global.yes)? {
                if !global.quiet {
                    eprintln!("Aborted.");
                }
                return Ok(());
            }
            controller.submit_delete(todo.id.clone().into()).await?;
            finish(controller, global).await
        }

        TodosCommand::Watch { interval, filter } => {
            watch(controller, Duration::from_secs(interval.max(1)), &to_filter(filter), global)
                .await
        }
    }
}

/// Wait for the post-mutation refetch, then print the collection.
async fn finish(controller: &TodoController, global: &GlobalOpts) -> Result<(), CliError> {
    let status = controller.settled().await;
    debug!(last_fetch = ?status.last_fetch, "collection settled");
    if let Some(err) = status.error {
        warn!(error = %err, "refetch after mutation failed; showing local state");
    }
    let out = render(&controller.items(), &TodoFilter::Visible, global)?;
    output::print_output(&out, global.quiet);
    Ok(())
}

// ── Watch ───────────────────────────────────────────────────────────

async fn watch(
    controller: &TodoController,
    interval: Duration,
    filter: &TodoFilter,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let mut mirror = controller.subscribe();
    let mut status = controller.watch_status();
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut last_output: Option<String> = None;
    let mut last_error: Option<SyncError> = None;

    let interrupted = tokio::signal::ctrl_c();
    tokio::pin!(interrupted);

    loop {
        tokio::select! {
            _ = &mut interrupted => break,

            _ = ticker.tick() => {
                // Failures surface through the status channel below.
                drop(controller.refetch());
            }

            changed = mirror.changed() => {
                let Some(snapshot) = changed else { break };
                let out = render(&snapshot, filter, global)?;
                if last_output.as_ref() != Some(&out) {
                    print_frame(&out, global);
                    last_output = Some(out);
                }
            }

            changed = status.changed() => {
                if changed.is_err() {
                    break;
                }
                let error = status.borrow_and_update().error.clone();
                if error != last_error {
                    if let Some(ref err) = error {
                        eprintln!("refresh failed: {err}");
                    }
                    last_error = error;
                }
            }
        }
    }
    Ok(())
}

fn print_frame(out: &str, global: &GlobalOpts) {
    if global.quiet {
        return;
    }
    if matches!(global.output, OutputFormat::Table) {
        eprintln!("── {} ──", chrono::Local::now().format("%H:%M:%S"));
    }
    output::print_output(out, false);
}
