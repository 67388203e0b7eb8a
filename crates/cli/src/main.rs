use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};

use refer_core::account::{hash_password, NewUserRecord};
use refer_core::import::ImportRow;
use refer_core::patient::PatientService;
use refer_core::session::{Identity, Role};
use refer_core::store::{Gateway, MemoryGateway};

#[derive(Parser)]
#[command(name = "ncd")]
#[command(about = "NCD referral network admin CLI")]
struct Cli {
    /// JSON data file shared with the server
    #[arg(long, default_value = "referrals.json")]
    data_file: PathBuf,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Seed a default admin account if the user table is empty
    Seed,
    /// List staff accounts
    ListUsers,
    /// Add a staff account
    AddUser {
        username: String,
        password: String,
        /// admin, hospital or hc
        role: String,
        /// Bound zone for hc accounts
        #[arg(long)]
        location: Option<String>,
        /// Display name
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        position: Option<String>,
    },
    /// List registered patients
    ListPatients,
    /// Bulk-import patients from a JSON file of header-to-cell row maps
    ImportPatients {
        /// Path to the JSON rows file
        file: PathBuf,
    },
}

/// The CLI acts with full admin rights; it runs on the server host.
fn cli_identity() -> Identity {
    Identity::new("cli", Role::Admin, None)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let gateway: Arc<dyn Gateway> = Arc::new(MemoryGateway::with_data_file(&cli.data_file)?);

    match cli.command {
        Some(Commands::Seed) => {
            if gateway.list_users()?.is_empty() {
                gateway.insert_user(NewUserRecord {
                    username: "admin".into(),
                    password_hash: hash_password("admin1234"),
                    role: Role::Admin,
                    location_name: None,
                    name: Some("Administrator".into()),
                    position: None,
                })?;
                println!("Seeded admin account (admin/admin1234); change its password.");
            } else {
                println!("User table is not empty; nothing to do.");
            }
        }
        Some(Commands::ListUsers) => {
            let users = gateway.list_users()?;
            if users.is_empty() {
                println!("No accounts found.");
            } else {
                for user in users {
                    println!(
                        "ID: {}, Username: {}, Role: {}, Zone: {}",
                        user.id,
                        user.username,
                        user.role,
                        user.location_name.as_deref().unwrap_or("-")
                    );
                }
            }
        }
        Some(Commands::AddUser {
            username,
            password,
            role,
            location,
            name,
            position,
        }) => {
            let role: Role = role.parse()?;
            match gateway.insert_user(NewUserRecord {
                username,
                password_hash: hash_password(&password),
                role,
                location_name: location,
                name,
                position,
            }) {
                Ok(user) => println!("Created account {} (id {})", user.username, user.id),
                Err(e) => eprintln!("Error creating account: {}", e),
            }
        }
        Some(Commands::ListPatients) => {
            let service = PatientService::new(gateway);
            let patients = service.list(&cli_identity())?;
            if patients.is_empty() {
                println!("No patients found.");
            } else {
                for patient in patients {
                    println!(
                        "ID: {}, HN: {}, Name: {}, Zone: {}",
                        patient.id,
                        patient.hn,
                        patient.name,
                        patient.hc_zone.as_deref().unwrap_or("-")
                    );
                }
            }
        }
        Some(Commands::ImportPatients { file }) => {
            let raw = std::fs::read_to_string(&file)?;
            let rows: Vec<ImportRow> = serde_json::from_str(&raw)?;

            let service = PatientService::new(gateway);
            match service.import_rows(&cli_identity(), &rows) {
                Ok(summary) => println!(
                    "Imported {} patients, rejected {} rows",
                    summary.created, summary.rejected
                ),
                Err(e) => eprintln!("Error importing patients: {}", e),
            }
        }
        None => {
            println!("Use 'ncd --help' for commands");
        }
    }

    Ok(())
}
