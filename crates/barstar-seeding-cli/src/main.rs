//! Barstar seeder CLI
//!
//! Fills a Barstar database with synthetic rows, table by table, in foreign
//! key order.
//!
//! ## Usage
//!
//! ```bash
//! barstar-seed --database-url sqlite://barstar.db --create-schema
//! barstar-seed -n 5 -t users -t venues
//! barstar-seed --clear --no-generate
//! barstar-seed -c seed.toml -vv
//! ```

use std::path::PathBuf;
use std::process;

use barstar_seeding::prelude::*;
use clap::Parser;
use colored::Colorize;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "barstar-seed")]
#[command(about = "Seed the Barstar database with synthetic data", long_about = None)]
#[command(version)]
struct Cli {
	/// Rows to create per entity [default: 10]
	#[arg(short = 'n', long, value_name = "N")]
	count: Option<usize>,

	/// Only seed these tables or entity names (repeatable)
	#[arg(short, long = "tables", value_name = "NAME", num_args = 1..)]
	tables: Vec<String>,

	/// Delete existing rows before seeding
	#[arg(long)]
	clear: bool,

	/// Do not generate rows (combine with --clear to only clear)
	#[arg(long)]
	no_generate: bool,

	/// Attempts per row before it is skipped [default: 5]
	#[arg(long, value_name = "M")]
	attempts: Option<usize>,

	/// Database URL
	#[arg(long, env = "DATABASE_URL", value_name = "URL")]
	database_url: Option<String>,

	/// Path to a TOML settings file
	#[arg(short, long, value_name = "PATH")]
	config: Option<PathBuf>,

	/// Create the bundled application schema before seeding
	#[arg(long)]
	create_schema: bool,

	/// Verbosity level (can be repeated)
	#[arg(short, long, action = clap::ArgAction::Count)]
	verbosity: u8,
}

impl Cli {
	fn to_cli_args(&self) -> CliArgs {
		CliArgs {
			database_url: self.database_url.clone(),
			count: self.count,
			attempts: self.attempts,
			tables: self.tables.clone(),
			clear: self.clear,
			no_generate: self.no_generate,
			config_file: self.config.clone(),
		}
	}
}

fn log_level(verbosity: u8) -> &'static str {
	match verbosity {
		0 => "warn",
		1 => "info",
		2 => "debug",
		_ => "trace",
	}
}

fn init_tracing(verbosity: u8) {
	let filter = EnvFilter::try_from_default_env()
		.unwrap_or_else(|_| EnvFilter::new(format!("sqlx=warn,{}", log_level(verbosity))));

	tracing_subscriber::fmt()
		.with_env_filter(filter)
		.with_writer(std::io::stderr)
		.without_time()
		.init();
}

#[tokio::main]
async fn main() {
	let cli = Cli::parse();
	init_tracing(cli.verbosity);

	if let Err(e) = run(cli).await {
		eprintln!("{}: {}", "Error".red(), e);
		process::exit(1);
	}
}

async fn run(cli: Cli) -> SeedingResult<()> {
	let args = cli.to_cli_args();
	let mut settings = match args.config_file {
		Some(ref path) => SeedSettings::from_file(path)?,
		None => SeedSettings::default(),
	};
	settings.merge_cli_args(&args);

	let options = settings.seed_options()?;
	tracing::debug!(?options, "Resolved seed options");
	if !options.clear && !options.generate {
		println!("Nothing to do: --no-generate without --clear");
		return Ok(());
	}

	let url = settings.database.resolve_url()?;
	let pool = connect_pool(&url).await?;

	if cli.create_schema {
		migrations::apply(&pool).await?;
	}

	let registry = SqliteSchemaRegistry::new(pool.clone())
		.with_client_defaults(settings.client_defaults.clone());
	let schema = SchemaIntrospector::new(&registry)
		.with_include(settings.tables.include.clone())
		.introspect()
		.await?;

	let gateway = SqliteGateway::acquire(&pool).await?;
	let generate = options.generate;
	let mut seeder = Seeder::new(schema, gateway, FakerProvider::new(), options);
	let report = seeder.run().await?;
	drop(seeder);

	print!("{}", report);
	if generate {
		println!("{}", "Database seeded successfully".green());
	} else {
		println!("{}", "Database cleared successfully".green());
	}

	pool.close().await;
	Ok(())
}
