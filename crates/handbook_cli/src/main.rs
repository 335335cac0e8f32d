//! Command-line presentation layer for the handbook directory.
//!
//! # Responsibility
//! - Gate every data command behind the configured API key.
//! - Print service results as JSON on stdout and errors on stderr.

use clap::{Args, Parser, Subcommand};
use handbook_core::db::open_db;
use handbook_core::{
    init_logging, ActivityPatch, ActivityService, ApiKeyGate, BuildingListQuery, BuildingPatch,
    BuildingService, DirectoryConfig, GeoRadius, NewActivity, NewBuilding, NewOrganization,
    OrganizationPatch, OrganizationQuery, OrganizationService, SqliteActivityRepository,
    SqliteBuildingRepository, SqliteOrganizationRepository,
};
use log::{error, info};
use rusqlite::Connection;
use serde::Serialize;
use std::error::Error;
use std::process::ExitCode;

type CliResult<T> = Result<T, Box<dyn Error>>;

#[derive(Parser, Debug)]
#[command(name = "handbook", version, about = "Business directory lookups")]
struct Cli {
    /// Credential checked against HANDBOOK_API_KEY
    #[arg(long, env = "API_KEY", global = true, hide_env_values = true)]
    api_key: Option<String>,

    /// Pretty-print JSON output
    #[arg(long, global = true)]
    pretty: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print core linkage info without touching the database
    Ping,
    /// Activity taxonomy as a nested forest
    Tree,
    /// Flat activity list
    Activities,
    /// Buildings, optionally filtered by address substring
    Buildings {
        #[arg(long)]
        address: Option<String>,
    },
    /// Organizations matching every supplied filter
    Search(SearchArgs),
    /// Single activity operations
    #[command(subcommand)]
    Activity(ActivityCommand),
    /// Single building operations
    #[command(subcommand)]
    Building(BuildingCommand),
    /// Single organization operations
    #[command(subcommand)]
    Organization(OrganizationCommand),
}

#[derive(Args, Debug)]
struct SearchArgs {
    /// Case-insensitive name substring
    #[arg(long)]
    name: Option<String>,

    #[arg(long = "building")]
    building_id: Option<i64>,

    /// Taxonomy branch root; descendants match too
    #[arg(long = "activity")]
    activity_id: Option<i64>,

    #[arg(long, requires_all = ["lon", "radius_km"], allow_negative_numbers = true)]
    lat: Option<f64>,

    #[arg(long, requires_all = ["lat", "radius_km"], allow_negative_numbers = true)]
    lon: Option<f64>,

    #[arg(long, requires_all = ["lat", "lon"])]
    radius_km: Option<f64>,
}

impl SearchArgs {
    fn to_query(&self) -> OrganizationQuery {
        let near = match (self.lat, self.lon, self.radius_km) {
            (Some(lat), Some(lon), Some(radius_km)) => Some(GeoRadius::new(lat, lon, radius_km)),
            _ => None,
        };
        OrganizationQuery {
            name: self.name.clone(),
            building_id: self.building_id,
            activity_id: self.activity_id,
            near,
        }
    }
}

#[derive(Subcommand, Debug)]
enum ActivityCommand {
    Get {
        id: i64,
    },
    Create {
        #[arg(long)]
        name: String,
        /// Parent activity; omit for a root
        #[arg(long = "parent")]
        parent_id: Option<i64>,
    },
    /// Rename and/or move an activity
    Update {
        id: i64,
        #[arg(long)]
        name: Option<String>,
        #[arg(long = "parent", conflicts_with = "root")]
        parent_id: Option<i64>,
        /// Detach the activity into a root
        #[arg(long)]
        root: bool,
    },
    /// Delete an activity and its whole subtree
    Delete {
        id: i64,
    },
}

impl ActivityCommand {
    fn patch(name: &Option<String>, parent_id: Option<i64>, root: bool) -> ActivityPatch {
        let parent_id = if root {
            Some(None)
        } else {
            parent_id.map(Some)
        };
        ActivityPatch {
            name: name.clone(),
            parent_id,
        }
    }
}

#[derive(Subcommand, Debug)]
enum BuildingCommand {
    Get {
        id: i64,
    },
    Create {
        #[arg(long)]
        address: String,
        #[arg(long, allow_negative_numbers = true)]
        lat: f64,
        #[arg(long, allow_negative_numbers = true)]
        lon: f64,
    },
    Update {
        id: i64,
        #[arg(long)]
        address: Option<String>,
        #[arg(long, allow_negative_numbers = true)]
        lat: Option<f64>,
        #[arg(long, allow_negative_numbers = true)]
        lon: Option<f64>,
    },
    /// Fails while organizations still reference the building
    Delete {
        id: i64,
    },
}

#[derive(Subcommand, Debug)]
enum OrganizationCommand {
    Get {
        id: i64,
    },
    Create {
        #[arg(long)]
        name: String,
        #[arg(long = "building")]
        building_id: i64,
        /// Repeatable; order is kept
        #[arg(long = "phone")]
        phones: Vec<String>,
        /// Repeatable activity id
        #[arg(long = "activity")]
        activity_ids: Vec<i64>,
    },
    /// Patch an organization; repeated `--phone`/`--activity` replace the set
    Update {
        id: i64,
        #[arg(long)]
        name: Option<String>,
        #[arg(long = "building")]
        building_id: Option<i64>,
        #[arg(long = "phone", conflicts_with = "clear_phones")]
        phones: Vec<String>,
        #[arg(long)]
        clear_phones: bool,
        #[arg(long = "activity", conflicts_with = "clear_activities")]
        activity_ids: Vec<i64>,
        #[arg(long)]
        clear_activities: bool,
    },
    Delete {
        id: i64,
    },
}

/// Replacement list for a patch: given values, an explicit clear, or untouched.
fn replacement<T: Clone>(values: &[T], clear: bool) -> Option<Vec<T>> {
    if clear {
        Some(Vec::new())
    } else if values.is_empty() {
        None
    } else {
        Some(values.to_vec())
    }
}

#[derive(Serialize)]
struct PingReport {
    ping: &'static str,
    version: &'static str,
}

#[derive(Serialize)]
struct Deleted {
    deleted: i64,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("event=cli_command module=cli status=error error={err}");
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> CliResult<()> {
    if let Command::Ping = cli.command {
        return print_json(
            &PingReport {
                ping: handbook_core::ping(),
                version: handbook_core::core_version(),
            },
            cli.pretty,
        );
    }

    let config = DirectoryConfig::from_env()?;
    if let Some(log_dir) = &config.log_dir {
        init_logging(&config.log_level, log_dir, false)?;
    }

    ApiKeyGate::new(config.require_api_key()?).verify(cli.api_key.as_deref())?;

    let conn = open_db(&config.db_path)?;
    match &cli.command {
        Command::Ping => Ok(()),
        Command::Tree => {
            let service = ActivityService::new(SqliteActivityRepository::try_new(&conn)?);
            print_json(&service.activity_tree()?, cli.pretty)
        }
        Command::Activities => {
            let service = ActivityService::new(SqliteActivityRepository::try_new(&conn)?);
            print_json(&service.list_activities()?, cli.pretty)
        }
        Command::Buildings { address } => {
            let service = BuildingService::new(SqliteBuildingRepository::try_new(&conn)?);
            let query = BuildingListQuery {
                address: address.clone(),
            };
            print_json(&service.list_buildings(&query)?, cli.pretty)
        }
        Command::Search(args) => {
            let found = organization_service(&conn)?.search(&args.to_query())?;
            info!(
                "event=cli_search module=cli status=ok results={}",
                found.len()
            );
            print_json(&found, cli.pretty)
        }
        Command::Activity(command) => run_activity(&conn, command, cli.pretty),
        Command::Building(command) => run_building(&conn, command, cli.pretty),
        Command::Organization(command) => run_organization(&conn, command, cli.pretty),
    }
}

fn run_activity(conn: &Connection, command: &ActivityCommand, pretty: bool) -> CliResult<()> {
    let service = ActivityService::new(SqliteActivityRepository::try_new(conn)?);
    match command {
        ActivityCommand::Get { id } => print_json(&service.get_activity(*id)?, pretty),
        ActivityCommand::Create { name, parent_id } => {
            let input = NewActivity {
                name: name.clone(),
                parent_id: *parent_id,
            };
            print_json(&service.create_activity(&input)?, pretty)
        }
        ActivityCommand::Update {
            id,
            name,
            parent_id,
            root,
        } => {
            let patch = ActivityCommand::patch(name, *parent_id, *root);
            print_json(&service.update_activity(*id, &patch)?, pretty)
        }
        ActivityCommand::Delete { id } => {
            service.delete_activity(*id)?;
            print_json(&Deleted { deleted: *id }, pretty)
        }
    }
}

fn run_building(conn: &Connection, command: &BuildingCommand, pretty: bool) -> CliResult<()> {
    let service = BuildingService::new(SqliteBuildingRepository::try_new(conn)?);
    match command {
        BuildingCommand::Get { id } => print_json(&service.get_building(*id)?, pretty),
        BuildingCommand::Create { address, lat, lon } => {
            let input = NewBuilding {
                address: address.clone(),
                latitude: *lat,
                longitude: *lon,
            };
            print_json(&service.create_building(&input)?, pretty)
        }
        BuildingCommand::Update {
            id,
            address,
            lat,
            lon,
        } => {
            let patch = BuildingPatch {
                address: address.clone(),
                latitude: *lat,
                longitude: *lon,
            };
            print_json(&service.update_building(*id, &patch)?, pretty)
        }
        BuildingCommand::Delete { id } => {
            service.delete_building(*id)?;
            print_json(&Deleted { deleted: *id }, pretty)
        }
    }
}

fn run_organization(
    conn: &Connection,
    command: &OrganizationCommand,
    pretty: bool,
) -> CliResult<()> {
    let service = organization_service(conn)?;
    match command {
        OrganizationCommand::Get { id } => print_json(&service.get_organization(*id)?, pretty),
        OrganizationCommand::Create {
            name,
            building_id,
            phones,
            activity_ids,
        } => {
            let input = NewOrganization {
                name: name.clone(),
                phones: phones.clone(),
                building_id: *building_id,
                activity_ids: activity_ids.clone(),
            };
            print_json(&service.create_organization(&input)?, pretty)
        }
        OrganizationCommand::Update {
            id,
            name,
            building_id,
            phones,
            clear_phones,
            activity_ids,
            clear_activities,
        } => {
            let patch = OrganizationPatch {
                name: name.clone(),
                phones: replacement(phones, *clear_phones),
                building_id: *building_id,
                activity_ids: replacement(activity_ids, *clear_activities),
            };
            print_json(&service.update_organization(*id, &patch)?, pretty)
        }
        OrganizationCommand::Delete { id } => {
            service.delete_organization(*id)?;
            print_json(&Deleted { deleted: *id }, pretty)
        }
    }
}

fn organization_service(
    conn: &Connection,
) -> CliResult<
    OrganizationService<
        SqliteOrganizationRepository<'_>,
        SqliteActivityRepository<'_>,
        SqliteBuildingRepository<'_>,
    >,
> {
    Ok(OrganizationService::new(
        SqliteOrganizationRepository::try_new(conn)?,
        SqliteActivityRepository::try_new(conn)?,
        SqliteBuildingRepository::try_new(conn)?,
    ))
}

fn print_json<T: Serialize + ?Sized>(value: &T, pretty: bool) -> CliResult<()> {
    let rendered = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{rendered}");
    Ok(())
}
