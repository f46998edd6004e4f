//! Todo sync demo
//!
//! Runs several sync clients against one in-process master. Each client
//! adds todos offline, flushes them and resyncs; the master stamps every
//! new todo with its creation time.
//!
//! With `--collide` every client also creates a todo under the same id,
//! so all but the first flush report a remapped id.

use clap::Parser;
use flushout_master::Master;
use flushout_proxy::{LoopbackBackend, SyncClient};
use flushout_testkit::{
    create_todo, create_todo_anywhere, empty_todo_snapshot, sorted_todos, stamp_created_at,
    system_clock, TodoList,
};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Syncs todo lists between clients through a single master.
#[derive(Parser)]
#[command(name = "todo-sync")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Number of clients
    #[arg(short, long, default_value = "2")]
    clients: usize,

    /// Todos each client adds before flushing
    #[arg(short, long, default_value = "2")]
    todos: usize,

    /// Make every client create a todo with the same id
    #[arg(long)]
    collide: bool,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let master = Arc::new(Master::with_interceptor(
        empty_todo_snapshot(),
        stamp_created_at(system_clock),
    ));
    let backend = Arc::new(LoopbackBackend::new(Arc::clone(&master)));

    let mut clients = Vec::with_capacity(cli.clients);
    for _ in 0..cli.clients {
        let mut client = SyncClient::<TodoList, _>::new(Arc::clone(&backend));
        client.connect().await?;
        clients.push(client);
    }

    for (index, client) in clients.iter_mut().enumerate() {
        for n in 0..cli.todos {
            client.apply(create_todo_anywhere(&format!("client {index}: todo {n}")))?;
        }
        if cli.collide {
            client.apply(create_todo("shared", &format!("client {index}: shared")))?;
        }
    }

    for (index, client) in clients.iter_mut().enumerate() {
        let report = client.flush().await?;
        info!(
            client = index,
            sent = report.sent,
            ids_changed = report.outcome.ids_changed,
            resynced = report.resynced,
            command_count = report.command_count,
            "client flushed"
        );
    }

    for client in &mut clients {
        client.resync().await?;
    }

    let todos = sorted_todos(&master.document());
    println!("{} todos after {} commands:", todos.len(), master.command_count());
    for (id, todo) in &todos {
        println!("  {id:<36}  {:<24}  createdAt={}", todo.text, todo.created_at.unwrap_or_default());
    }

    let converged = clients
        .iter()
        .all(|client| client.document().map(sorted_todos).ok().as_ref() == Some(&todos));
    println!("clients converged: {converged}");

    Ok(())
}
