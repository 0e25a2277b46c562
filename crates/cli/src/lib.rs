use anyhow::{Context as AnyhowContext, Result};
use clap::{Args, Parser, Subcommand};
use routemap_graph::{RouteQuery, ServiceGraph};
use routemap_protocol::{
    query_params_schema, serialize_json, GraphQueryParams, GraphResponse, HealthReport,
};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;

mod bind;
mod http_api;
mod render;
mod source;

fn print_stdout(text: &str) -> Result<()> {
    use std::io::Write;

    let mut stdout = io::stdout().lock();
    if let Err(err) = stdout
        .write_all(text.as_bytes())
        .and_then(|_| stdout.write_all(b"\n"))
        .and_then(|_| stdout.flush())
    {
        if err.kind() == io::ErrorKind::BrokenPipe {
            return Ok(());
        }
        return Err(err.into());
    }
    Ok(())
}

#[derive(Parser)]
#[command(name = "routemap")]
#[command(about = "Filtered call-route discovery over service dependency graphs", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Graph description JSON (overrides ROUTEMAP_GRAPH; default: train-ticket.json)
    #[arg(long, global = true)]
    graph: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Quiet mode: log only warnings/errors (stdout is reserved for output)
    #[arg(long, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the filtered subgraph as JSON (nodes, edges, mermaid)
    Query(QueryArgs),

    /// Print the qualifying routes as JSON arrays of node names
    Routes(FilterArgs),

    /// Print the filtered subgraph as a Mermaid diagram
    Render(RenderArgs),

    /// Print node and edge counts of the loaded graph
    Stats,

    /// Print the JSON schema of the query parameters
    Schema,

    /// Serve the graph API over HTTP (GET /graph, /graph/html, /health)
    #[command(name = "serve-http")]
    ServeHttp(ServeArgs),
}

#[derive(Args, Clone)]
struct FilterArgs {
    /// Only routes starting at publicly exposed services
    #[arg(long)]
    start_public: bool,

    /// Only routes ending at sinks (rds/sqs)
    #[arg(long)]
    end_sink: bool,

    /// Only routes touching at least one vulnerable node
    #[arg(long = "has-vuln")]
    has_vuln_filter: bool,

    /// Maximum number of edges per route
    #[arg(long, default_value_t = 10, allow_negative_numbers = true)]
    cutoff: i64,
}

impl FilterArgs {
    fn params(&self) -> GraphQueryParams {
        GraphQueryParams {
            start_public: self.start_public,
            end_sink: self.end_sink,
            has_vuln_filter: self.has_vuln_filter,
            cutoff: self.cutoff,
        }
    }
}

#[derive(Args)]
struct QueryArgs {
    #[command(flatten)]
    filters: FilterArgs,

    /// Pretty-print the JSON output
    #[arg(long)]
    pretty: bool,
}

#[derive(Args)]
struct RenderArgs {
    #[command(flatten)]
    filters: FilterArgs,

    /// Wrap the diagram in a standalone HTML page
    #[arg(long)]
    html: bool,
}

#[derive(Args)]
struct ServeArgs {
    /// Bind address, e.g. 127.0.0.1:8000
    #[arg(long, default_value = "127.0.0.1:8000")]
    bind: String,

    /// Allow binding to non-loopback addresses
    #[arg(long)]
    public: bool,
}

/// Run one query and render its diagram
pub(crate) fn respond(graph: &ServiceGraph, query: &RouteQuery) -> GraphResponse {
    let outcome = query.execute(graph);
    let diagram = render::mermaid(&outcome.subgraph);
    GraphResponse::new(outcome.subgraph, diagram)
}

pub async fn main_entry() -> Result<()> {
    let cli = Cli::parse();

    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if cli.quiet {
        builder.filter_level(log::LevelFilter::Warn);
    } else if cli.verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.target(env_logger::Target::Stderr).init();

    let graph_path = source::resolve_graph_path(cli.graph);

    match cli.command {
        Commands::Query(args) => {
            let query = args.filters.params().to_query()?;
            let graph = source::load_graph(&graph_path).await?;
            let response = respond(&graph, &query);
            let text = if args.pretty {
                serde_json::to_string_pretty(&response)?
            } else {
                serialize_json(&response)?
            };
            print_stdout(&text)?;
        }
        Commands::Routes(args) => {
            let query = args.params().to_query()?;
            let graph = source::load_graph(&graph_path).await?;
            let outcome = query.execute(&graph);
            let routes = outcome.routes.unwrap_or_default();
            print_stdout(&serialize_json(&routes)?)?;
        }
        Commands::Render(args) => {
            let query = args.filters.params().to_query()?;
            let graph = source::load_graph(&graph_path).await?;
            let response = respond(&graph, &query);
            if args.html {
                print_stdout(&render::html_page(&response.mermaid))?;
            } else {
                print_stdout(response.mermaid.trim_end())?;
            }
        }
        Commands::Stats => {
            let graph = source::load_graph(&graph_path).await?;
            let report = HealthReport {
                status: "ok".to_string(),
                nodes: graph.node_count(),
                edges: graph.edge_count(),
            };
            print_stdout(&serialize_json(&report)?)?;
        }
        Commands::Schema => print_stdout(&query_params_schema()?)?,
        Commands::ServeHttp(args) => serve_http(args, &graph_path).await?,
    }

    Ok(())
}

async fn serve_http(args: ServeArgs, graph_path: &std::path::Path) -> Result<()> {
    let addr = bind::BindPolicy::new(args.public)
        .listen_addr(&args.bind)
        .await?;

    let graph = Arc::new(source::load_graph(graph_path).await?);
    let app = http_api::router(graph);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    println!("Serving graph API on http://{addr}/graph");
    axum::serve(listener, app).await?;
    Ok(())
}
