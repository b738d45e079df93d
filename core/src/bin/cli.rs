//! Administrative command line for the dylive content store

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use comfy_table::Table;

use dylive_core::domain::{ScriptType, TagNode};
use dylive_core::infra::logging::init_tracing;
use dylive_core::ops::scripts::CreateScriptInput;
use dylive_core::ops::search::{
	Pagination, ScriptSearchInput, SearchMode, StatusFilter, TagMatchMode, TagSearchInput,
};
use dylive_core::ops::tags::CreateTagInput;
use dylive_core::{Actor, AppConfig, Core};

#[derive(Parser, Debug)]
#[command(name = "dylive", about = "Manage tags and versioned scripts")]
struct Cli {
	/// Data directory (defaults to the platform data dir)
	#[arg(long, env = "DYLIVE_DATA_DIR")]
	data_dir: Option<PathBuf>,

	/// Acting administrator id recorded as creator/updater
	#[arg(long, env = "DYLIVE_ACTOR", default_value_t = 1)]
	actor: i32,

	#[command(subcommand)]
	command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
	/// Tag management
	#[command(subcommand)]
	Tag(TagCommands),
	/// Script management
	#[command(subcommand)]
	Script(ScriptCommands),
}

#[derive(Subcommand, Debug)]
enum TagCommands {
	/// Create a tag
	Create {
		name: String,
		#[arg(short, long)]
		description: Option<String>,
		#[arg(short, long)]
		parent: Option<i32>,
		#[arg(long, default_value_t = 0)]
		sort_order: i32,
	},
	/// List tags matching a keyword
	List {
		keyword: Option<String>,
		#[arg(long)]
		all: bool,
	},
	/// Print the tag tree
	Tree {
		#[arg(long)]
		all: bool,
	},
	/// Deactivate a tag and all of its descendants
	Deactivate { id: i32 },
	/// Reactivate a single tag
	Activate { id: i32 },
	/// Move a tag under another parent (omit to make it a root)
	Reparent {
		id: i32,
		#[arg(short, long)]
		parent: Option<i32>,
	},
	/// Delete a tag without children
	Delete { id: i32 },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum TypeArg {
	Opening,
	Closing,
	Qa,
	Custom,
}

impl From<TypeArg> for ScriptType {
	fn from(value: TypeArg) -> Self {
		match value {
			TypeArg::Opening => ScriptType::Opening,
			TypeArg::Closing => ScriptType::Closing,
			TypeArg::Qa => ScriptType::Qa,
			TypeArg::Custom => ScriptType::Custom,
		}
	}
}

#[derive(Subcommand, Debug)]
enum ScriptCommands {
	/// Create the first version of a script
	Create {
		title: String,
		content: String,
		#[arg(short = 't', long, value_enum, default_value = "custom")]
		script_type: TypeArg,
		/// Tag ids to attach
		#[arg(long, value_delimiter = ',')]
		tags: Vec<i32>,
	},
	/// Copy a script row as the next version of its title
	NewVersion { id: i32 },
	/// Copy scripts under new titles, starting again at version 1
	#[command(name = "copy")]
	Duplicate {
		#[arg(required = true)]
		ids: Vec<i32>,
		/// Title for the copy; only valid with a single id
		#[arg(long)]
		title: Option<String>,
	},
	/// List every version of a title
	Versions { title: String },
	/// Search scripts
	Search {
		keyword: Option<String>,
		#[arg(long, value_delimiter = ',')]
		tags: Vec<i32>,
		/// Match any listed tag instead of all of them
		#[arg(long)]
		any: bool,
		/// Rank by relevance
		#[arg(long)]
		ranked: bool,
		#[arg(long, default_value_t = 1)]
		page: u64,
		#[arg(long, default_value_t = 20)]
		page_size: u64,
	},
}

#[tokio::main]
async fn main() -> Result<()> {
	let cli = Cli::parse();

	let config = match &cli.data_dir {
		Some(dir) => AppConfig::load_from(dir)?,
		None => AppConfig::load()?,
	};
	init_tracing(&config)?;

	let core = Core::with_config(config)
		.await
		.context("failed to open the content store")?;
	let actor = Actor::admin(cli.actor);

	match cli.command {
		Commands::Tag(cmd) => run_tag(&core, &actor, cmd).await,
		Commands::Script(cmd) => run_script(&core, &actor, cmd).await,
	}
}

async fn run_tag(core: &Core, actor: &Actor, cmd: TagCommands) -> Result<()> {
	match cmd {
		TagCommands::Create {
			name,
			description,
			parent,
			sort_order,
		} => {
			let mut input = CreateTagInput::new(name).with_sort_order(sort_order);
			if let Some(description) = description {
				input = input.with_description(description);
			}
			if let Some(parent) = parent {
				input = input.with_parent(parent);
			}
			let tag = core.tags.create(input, actor).await?;
			println!("Created tag {} ({})", tag.name, tag.id);
		}
		TagCommands::List { keyword, all } => {
			let input = TagSearchInput {
				keyword,
				status: if all { StatusFilter::All } else { StatusFilter::Active },
				pagination: Pagination::new(1, core.config.search.max_page_size),
				..Default::default()
			};
			let page = core.tag_search.search(&input, actor).await?;

			let mut table = Table::new();
			table.set_header(vec!["ID", "Name", "Parent", "Active", "Sort", "Description"]);
			for tag in page.items {
				table.add_row(vec![
					tag.id.to_string(),
					tag.name,
					tag.parent_id.map(|p| p.to_string()).unwrap_or_default(),
					tag.is_active.to_string(),
					tag.sort_order.to_string(),
					tag.description,
				]);
			}
			println!("{table}");
			println!("{} tag(s)", page.total);
		}
		TagCommands::Tree { all } => {
			let forest = core.tags.tree(all, actor).await?;
			for root in &forest {
				print_node(root, 0);
			}
		}
		TagCommands::Deactivate { id } => {
			let ids = core.tags.deactivate(id, actor).await?;
			println!("Deactivated {} tag(s)", ids.len());
		}
		TagCommands::Activate { id } => {
			let tag = core.tags.activate(id, actor).await?;
			println!("Activated {}", tag.name);
		}
		TagCommands::Reparent { id, parent } => {
			let tag = core.tags.reparent(id, parent, actor).await?;
			println!("Moved {} under {:?}", tag.name, tag.parent_id);
		}
		TagCommands::Delete { id } => {
			core.tags.delete(id, actor).await?;
			println!("Deleted tag {id}");
		}
	}
	Ok(())
}

fn print_node(node: &TagNode, depth: usize) {
	let marker = if node.tag.is_active { "" } else { " (inactive)" };
	println!("{}{} [{}]{}", "  ".repeat(depth), node.tag.name, node.tag.id, marker);
	for child in &node.children {
		print_node(child, depth + 1);
	}
}

async fn run_script(core: &Core, actor: &Actor, cmd: ScriptCommands) -> Result<()> {
	match cmd {
		ScriptCommands::Create {
			title,
			content,
			script_type,
			tags,
		} => {
			let input = CreateScriptInput::new(title, content, script_type.into()).with_tags(tags);
			let detail = core.scripts.create(input, actor).await?;
			println!(
				"Created {} v{} ({})",
				detail.script.title, detail.script.version, detail.script.id
			);
		}
		ScriptCommands::NewVersion { id } => {
			let detail = core.scripts.new_version(id, actor).await?;
			println!(
				"Created {} v{} ({})",
				detail.script.title, detail.script.version, detail.script.id
			);
		}
		ScriptCommands::Duplicate { ids, title } => {
			let copies = match (ids.as_slice(), title) {
				([id], title) => vec![core.scripts.copy(*id, title.as_deref(), actor).await?],
				(_, Some(_)) => anyhow::bail!("--title needs exactly one id"),
				(ids, None) => core.scripts.batch_copy(ids, actor).await?,
			};
			for detail in copies {
				println!(
					"Created {} v{} ({})",
					detail.script.title, detail.script.version, detail.script.id
				);
			}
		}
		ScriptCommands::Versions { title } => {
			let versions = core.scripts.list_versions(&title).await?;

			let mut table = Table::new();
			table.set_header(vec!["ID", "Version", "Type", "Active", "Updated"]);
			for script in versions {
				table.add_row(vec![
					script.id.to_string(),
					script.version.to_string(),
					script.kind().label().to_string(),
					script.is_active.to_string(),
					script.updated_at.format("%Y-%m-%d %H:%M:%S").to_string(),
				]);
			}
			println!("{table}");
		}
		ScriptCommands::Search {
			keyword,
			tags,
			any,
			ranked,
			page,
			page_size,
		} => {
			let input = ScriptSearchInput {
				keyword,
				tag_ids: tags,
				tag_match: Some(if any { TagMatchMode::Any } else { TagMatchMode::All }),
				mode: if ranked { SearchMode::Ranked } else { SearchMode::Plain },
				pagination: Pagination::new(page, page_size),
				..Default::default()
			};
			let results = core.script_search.search(&input, actor).await?;

			let mut table = Table::new();
			table.set_header(vec!["ID", "Title", "Version", "Type", "Tags", "Score"]);
			for hit in results.items {
				let tags: Vec<String> = hit.tags.into_iter().map(|t| t.name).collect();
				table.add_row(vec![
					hit.script.id.to_string(),
					hit.script.title.clone(),
					hit.script.version.to_string(),
					hit.script.kind().to_string(),
					tags.join(", "),
					hit.score.map(|s| format!("{s:.2}")).unwrap_or_default(),
				]);
			}
			println!("{table}");
			println!(
				"page {}/{} ({} result(s))",
				results.page, results.total_pages, results.total
			);
		}
	}
	Ok(())
}
