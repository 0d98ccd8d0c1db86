//! Trellis - a terminal database navigator.

use db_trellis::cli::{AddArgs, Cli, Command};
use db_trellis::config::Config;
use db_trellis::connection::{Connection, ConnectionRegistry, Environment};
use db_trellis::db::{BackendKind, ConnectionParams};
use db_trellis::error::{Result, TrellisError};
use db_trellis::logging;
use db_trellis::navigation::NavigationTree;
use db_trellis::output::{render_connections, render_result, render_tree};
use db_trellis::persistence::ConnectionStore;
use db_trellis::query::QueryDispatcher;
use tracing::{debug, info};

/// Statement run by `trellis demo` after printing the tree.
const DEMO_QUERY: &str = "SELECT lane, swimmer, country, time FROM results";

fn main() {
    let cli = Cli::parse_args();

    match &cli.log_file {
        Some(path) => logging::init_file_logging(path),
        None => logging::init_stderr_logging(),
    }

    // One interaction thread: every backend call is awaited in turn.
    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Internal Error: failed to start runtime: {e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = runtime.block_on(run(cli)) {
        eprintln!("{e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config_path();
    debug!("Loading config from: {}", config_path.display());
    let config = Config::load_from_file(&config_path)?;
    let dispatcher = QueryDispatcher::new(config.query.clone());

    match cli.command {
        Command::Format { sql } => {
            println!("{}", dispatcher.format(&sql));
            Ok(())
        }
        Command::Demo => run_demo(&dispatcher).await,
        command => {
            let store = ConnectionStore::open(&config.storage)?;
            let mut registry = store.load_registry()?;
            run_stored(command, &store, &mut registry, &dispatcher).await
        }
    }
}

/// Commands that work on the saved connection list.
async fn run_stored(
    command: Command,
    store: &ConnectionStore,
    registry: &mut ConnectionRegistry,
    dispatcher: &QueryDispatcher,
) -> Result<()> {
    match command {
        Command::List => println!("{}", render_connections(registry)),
        Command::Add(args) => add_connection(args, store, registry).await?,
        Command::Remove { id } => {
            let removed = registry
                .remove(&id)
                .ok_or_else(|| unknown_connection(&id))?;
            store.save_registry(registry)?;
            info!("Removed connection {}", removed.id);
            println!("Removed {}", removed.label());
        }
        Command::Tree { id, depth } => print_tree(registry, &id, depth).await?,
        Command::Query { id, sql } => {
            let connection = lookup(registry, &id)?;
            let result = dispatcher.dispatch(&sql, connection.connector()).await;
            println!("{}", render_result(result.as_ref()));
        }
        Command::Preview { id, schema, object } => {
            let connection = lookup(registry, &id)?;
            let (sql, result) = dispatcher
                .preview(connection.connector(), &schema, &object)
                .await;
            println!("{sql}\n");
            println!("{}", render_result(result.as_ref()));
        }
        Command::Format { .. } | Command::Demo => {}
    }
    Ok(())
}

async fn add_connection(
    args: AddArgs,
    store: &ConnectionStore,
    registry: &mut ConnectionRegistry,
) -> Result<()> {
    if registry.get(&args.id).is_some() {
        return Err(TrellisError::config(format!(
            "Connection '{}' already exists",
            args.id
        )));
    }

    let (backend, params) = args.to_params()?;
    let connection = Connection::open(args.id, args.env, backend, params).await?;
    let label = connection.label();
    registry.add(connection)?;
    store.save_registry(registry)?;

    println!("Added {label}");
    Ok(())
}

async fn print_tree(registry: &mut ConnectionRegistry, id: &str, depth: usize) -> Result<()> {
    let mut tree = NavigationTree::from_registry(registry);
    let node = tree
        .connection_node(id)
        .ok_or_else(|| unknown_connection(id))?;
    tree.expand_to_depth(node, depth, registry).await?;

    if let Some(connection) = tree.node(node) {
        println!("{}", connection.label());
    }
    println!("{}", render_tree(&tree, node));
    Ok(())
}

async fn run_demo(dispatcher: &QueryDispatcher) -> Result<()> {
    let connection = Connection::open(
        "demo",
        Environment::Dev,
        BackendKind::Dummy,
        ConnectionParams::default(),
    )
    .await?;
    let mut registry = ConnectionRegistry::new();
    registry.add(connection)?;

    print_tree(&mut registry, "demo", 3).await?;
    println!();

    let connection = lookup(&registry, "demo")?;
    let sql = dispatcher.format(DEMO_QUERY);
    let result = dispatcher.dispatch(&sql, connection.connector()).await;
    println!("{sql}\n");
    println!("{}", render_result(result.as_ref()));
    Ok(())
}

fn lookup<'a>(registry: &'a ConnectionRegistry, id: &str) -> Result<&'a Connection> {
    registry.get(id).ok_or_else(|| unknown_connection(id))
}

fn unknown_connection(id: &str) -> TrellisError {
    TrellisError::config(format!("Unknown connection '{id}'"))
}
