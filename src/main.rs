use anyhow::Result;
use clap::Parser;
use kgsql::catalog::ConceptIndex;
use kgsql::config::Config;
use kgsql::graph_store::HttpGraphStore;
use kgsql::llm;
use kgsql::orchestrator::{Orchestrator, ProcessOptions};
use kgsql::retrieval::MetadataRetrievalAgent;
use kgsql::session::InMemorySessionStore;
use kgsql::sqlgen::SqlGenerator;
use kgsql::summary::SummaryAgent;
use kgsql::warehouse::{HttpWarehouse, Warehouse};
use std::sync::Arc;
use tracing::info;

#[derive(Parser)]
#[command(name = "kgsql")]
#[command(about = "Concept-first metadata retrieval and SQL generation over a warehouse knowledge graph")]
struct Args {
    /// The business question in natural language
    question: String,

    /// Generate SQL without executing it
    #[arg(long)]
    dry_run: bool,

    /// Skip the natural-language summary of results
    #[arg(long)]
    no_summary: bool,

    /// Session id under which to record this question
    #[arg(long)]
    session: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let config = Config::from_env()?;

    info!("Question: {}", args.question);

    let store = Arc::new(HttpGraphStore::new(
        &config.graph_uri,
        &config.graph_database,
        &config.graph_username,
        &config.graph_password,
    ));
    let model = llm::from_config(&config)?;

    let index = Arc::new(ConceptIndex::load(store.as_ref()).await?);

    let retrieval = MetadataRetrievalAgent::new(store, model.clone(), index);
    let sqlgen = SqlGenerator::new(
        model.clone(),
        config.data_project_id.clone(),
        config.dataset_id.clone(),
    );
    let summarizer = SummaryAgent::new(model);
    let warehouse: Option<Arc<dyn Warehouse>> = config
        .warehouse_endpoint
        .clone()
        .map(|endpoint| {
            Arc::new(HttpWarehouse::new(endpoint, config.warehouse_token.clone()))
                as Arc<dyn Warehouse>
        });

    let orchestrator = Orchestrator::new(
        retrieval,
        sqlgen,
        summarizer,
        warehouse,
        Arc::new(InMemorySessionStore::new()),
    );

    let options = ProcessOptions {
        execute: !args.dry_run,
        include_summary: !args.no_summary,
    };
    let outcome = orchestrator
        .process_question(args.session.as_deref(), &args.question, options)
        .await;

    if let Some(error) = &outcome.error {
        eprintln!("Failed: {}", error);
        std::process::exit(1);
    }

    if let Some(sql) = &outcome.sql {
        println!("\n=== SQL ===\n{}", sql);
    }
    if outcome.rows.is_some() {
        println!("\n=== Rows: {} ===", outcome.row_count);
    }
    if let Some(summary) = &outcome.summary {
        println!("\n=== Summary ===\n{}", summary);
    }

    Ok(())
}
