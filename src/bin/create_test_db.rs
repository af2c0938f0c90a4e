use std::error::Error;
use std::path::Path;
use std::process::exit;

use clap::Parser;
use rusqlite::Connection;
use time::{Duration, OffsetDateTime};

use helpinvest::{
    Action, Identity, RiskProfile, TransactionRequest, apply_transaction, get_or_create_user,
    initialize_db, set_risk_profile, validate,
};

/// A utility for creating a test database for helpinvest.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// File path to save the SQLite database to.
    #[arg(long, short)]
    output_path: String,
}

/// The holdings of the demo user, deposited one per day.
const DEMO_DEPOSITS: [(&str, &str, i64); 8] = [
    ("Épargne", "Livret A/LDDS", 22_950),
    ("Épargne", "PEA", 150_000),
    ("Épargne", "PEE/PERCO", 30_000),
    ("Épargne", "LEP", 5_000),
    ("Immobilier", "Immobilier Locatif", 180_000),
    ("Immobilier", "SCPI", 50_000),
    ("Actions", "Cryptomonnaies", 60_000),
    ("Autres", "Métaux/Métaux Précieux", 8_000),
];

/// Create and populate a database for manual testing.
fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    let output_path = Path::new(&args.output_path);

    match output_path.extension() {
        None => {
            eprintln!("Output path must include a file extension (e.g., 'my_database.db').");
            exit(1);
        }
        Some(extension) if extension.is_empty() => {
            eprintln!("Output path must include a file extension (e.g., 'my_database.db').");
            exit(1);
        }
        _ => {}
    }

    if output_path.is_file() {
        eprintln!("File already exists at {output_path:#?}!");
        exit(1);
    }

    println!("Creating database at {output_path:#?}");
    let conn = Connection::open(output_path)?;

    initialize_db(&conn)?;

    println!("Creating test user...");

    let user = get_or_create_user(
        &Identity::new("test-user", "test@example.com").display_name("Test"),
        &conn,
    )?;
    set_risk_profile(user.id, RiskProfile::Dynamique, &conn)?;

    println!("Adding holdings...");

    let start = OffsetDateTime::now_utc() - Duration::days(DEMO_DEPOSITS.len() as i64 + 1);

    for (day, (category, sub_category, amount)) in DEMO_DEPOSITS.into_iter().enumerate() {
        let request =
            TransactionRequest::new(Action::Deposit, category, sub_category, amount as f64);
        let transaction = validate(&request, None)?;
        apply_transaction(user.id, &transaction, start + Duration::days(day as i64), &conn)?;
    }

    let request = TransactionRequest::new(Action::Withdraw, "Épargne", "Livret A/LDDS", 2_950.0);
    let transaction = validate(&request, Some(22_950))?;
    apply_transaction(user.id, &transaction, OffsetDateTime::now_utc(), &conn)?;

    println!("Success!");

    Ok(())
}
