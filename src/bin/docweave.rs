//! `docweave`: offline resolution diagnostics for document builds.
//!
//! ```text
//! docweave [--config build.json] [--resources dir-or-jar]... <command>
//! ```

use clap::{Parser, Subcommand};
use docweave::inclusion::find_all_inclusion_files;
use docweave::resolver::{SchemaFlavor, XsltResolutionStrategy};
use docweave::resource::ResourceLocator;
use docweave::traits::{EntityRequest, Resolution};
use docweave::{Configuration, DocweaveError, Environment, FormatOptions, FormatPlanBuilder, ResolverSet};
use log::{LevelFilter, debug};
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(version, about = "Offline resource resolution for document builds", long_about = None)]
struct Args {
    /// Build configuration (JSON).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Resource root (directory or archive). Repeat to add roots in lookup order.
    #[arg(long = "resources", global = true)]
    resources: Vec<PathBuf>,

    /// Preferred schema flavor: dtd, xsd, rng, rnc or sch.
    #[arg(long, global = true, default_value_t = SchemaFlavor::Rng)]
    schema: SchemaFlavor,

    /// Which stylesheet versions resolve locally: inclusive or named.
    #[arg(long = "xslt-strategy", global = true, default_value_t = XsltResolutionStrategy::Named)]
    xslt_strategy: XsltResolutionStrategy,

    /// More logging. Repeat for more detail.
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the plan for producing one format from a source document.
    Plan {
        #[arg(long)]
        format: String,
        #[arg(long = "target-name")]
        target_name: Option<String>,
        #[arg(long)]
        stylesheet: Option<String>,
        source: PathBuf,
    },
    /// Run the document entity chain.
    ResolveEntity {
        #[arg(long = "public-id")]
        public_id: Option<String>,
        #[arg(long = "system-id")]
        system_id: Option<String>,
        #[arg(long)]
        base: Option<String>,
    },
    /// Run the reference chain.
    ResolveUri {
        href: String,
        #[arg(long, default_value = "")]
        base: String,
    },
    /// List every file reachable from a master document.
    Inclusions { master: PathBuf },
}

fn main() -> Result<(), DocweaveError> {
    let args = Args::parse();
    init_logging(args.verbose);

    match &args.command {
        Command::Plan {
            format,
            target_name,
            stylesheet,
            source,
        } => {
            let mut options = FormatOptions::new(format.as_str());
            if let Some(name) = target_name {
                options = options.with_target_final_name(name.as_str());
            }
            if let Some(resource) = stylesheet {
                options = options.with_stylesheet_resource(resource.as_str());
            }
            let plan = FormatPlanBuilder::build(&options)?;
            println!("format:                {}", plan.name());
            println!("stylesheet:            {}", plan.stylesheet_resource());
            println!("docbook stylesheet:    {}", plan.corresponding_docbook_stylesheet_resource());
            println!("target file:           {}", plan.target_file_name(source));
            println!("requires image path:   {}", plan.requires_image_path());
            println!("requires image copies: {}", plan.requires_image_copying());
            println!("chunking:              {}", plan.does_chunking());
        }
        Command::ResolveEntity {
            public_id,
            system_id,
            base,
        } => {
            let resolvers = assemble(&args)?;
            let chain = resolvers.entity_resolver();
            let request = EntityRequest::extended(None, public_id.as_deref(), base.as_deref(), system_id.as_deref());
            let resolution = chain.resolve_entity_extended(&request)?;
            print_resolution(&resolution);
        }
        Command::ResolveUri { href, base } => {
            let resolvers = assemble(&args)?;
            let resolution = resolvers.uri_resolver().resolve_uri(href, base)?;
            print_resolution(&resolution);
        }
        Command::Inclusions { master } => {
            let mut files = BTreeSet::new();
            find_all_inclusion_files(master, &mut files)?;
            for file in files {
                println!("{}", file.display());
            }
        }
    }
    Ok(())
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();
}

fn assemble(args: &Args) -> Result<ResolverSet, DocweaveError> {
    let configuration = match &args.config {
        Some(path) => Configuration::from_path(path)?,
        None => Configuration::default(),
    };
    let mut locator = ResourceLocator::new();
    for root in &args.resources {
        debug!("adding resource root {}", root.display());
        locator.add_path(root)?;
    }
    let environment = Environment::new(Arc::new(locator), "work")
        .with_schema_flavor(args.schema)
        .with_xslt_strategy(args.xslt_strategy);
    Ok(ResolverSet::assemble(&environment, &configuration))
}

fn print_resolution(resolution: &Resolution) {
    match resolution.source() {
        Some(source) => {
            println!("system id: {}", source.system_id.as_deref().unwrap_or("(none)"));
            if let Some(public_id) = &source.public_id {
                println!("public id: {public_id}");
            }
            println!("bytes:     {}", source.data.len());
        }
        None => println!("declined"),
    }
}
