//! Command implementations for the halberd CLI.

use std::sync::Arc;

use log::info;

use crate::cli::args::*;
use crate::cli::output::*;
use crate::collection::loader::Dataset;
use crate::collection::registry::{CollectionRegistry, CollectionSource};
use crate::config::HalberdConfig;
use crate::error::{HalberdError, Result};
use crate::service::QueryService;

/// Execute a CLI command.
pub fn execute_command(args: HalberdArgs) -> Result<()> {
    let config = HalberdConfig::load(args.config.as_deref())?;
    let registry = Arc::new(load_registry(&args)?);
    let service = QueryService::new(registry, config);

    match &args.command {
        Command::Collections(collections_args) => {
            list_collections(collections_args, &service, &args)
        }
        Command::Schema(schema_args) => show_schema(schema_args, &service, &args),
        Command::Search(search_args) => search(search_args, &service, &args),
        Command::Ask(ask_args) => ask(ask_args, &service, &args),
    }
}

/// Load the dataset named on the command line into a fresh registry.
fn load_registry(args: &HalberdArgs) -> Result<CollectionRegistry> {
    let path = args.data.as_ref().ok_or_else(|| {
        HalberdError::config("no dataset given; pass --data or set HALBERD_DATA")
    })?;
    info!("Loading dataset from {}", path.display());
    Dataset::from_file(path)?.into_registry()
}

/// List collections.
fn list_collections(
    args: &CollectionsArgs,
    service: &QueryService,
    cli_args: &HalberdArgs,
) -> Result<()> {
    let registry = service.registry();
    let mut collections = Vec::new();
    for name in registry.list_collections() {
        let schema = registry.get_schema(&name)?;
        collections.push(CollectionSummary {
            objects: registry.object_count(&name)?,
            description: schema.description.clone(),
            properties: schema.properties.len(),
            vector_spaces: schema.vector_spaces.iter().map(|s| s.name.clone()).collect(),
            name,
        });
    }

    output_result(
        &CollectionsList {
            collections,
            detailed: args.long,
        },
        cli_args,
    )
}

/// Show one collection's schema.
fn show_schema(args: &SchemaArgs, service: &QueryService, cli_args: &HalberdArgs) -> Result<()> {
    let schema = service.registry().get_schema(&args.collection)?;
    output_result(schema.as_ref(), cli_args)
}

/// Search one collection.
fn search(args: &SearchArgs, service: &QueryService, cli_args: &HalberdArgs) -> Result<()> {
    let results = service.search_raw(
        &args.collection,
        &args.query,
        args.search_type.into(),
        &args.params(),
    )?;

    output_result(
        &SearchOutput {
            collection: args.collection.clone(),
            query: args.query.clone(),
            results,
        },
        cli_args,
    )
}

/// Ask a question across collections. Ctrl-C cancels the request.
fn ask(args: &AskArgs, service: &QueryService, cli_args: &HalberdArgs) -> Result<()> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    let answer = runtime.block_on(service.ask_agent_with_cancel(
        &args.collections,
        &args.question,
        args.system_prompt.as_deref(),
        args.timeout,
        async {
            if tokio::signal::ctrl_c().await.is_err() {
                std::future::pending::<()>().await;
            }
        },
    ))?;

    output_result(&answer, cli_args)
}
