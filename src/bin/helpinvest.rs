use std::{error::Error, fs::File, path::PathBuf, process::exit};

use clap::{Parser, Subcommand};
use rusqlite::Connection;
use serde::Serialize;

use helpinvest::{
    Action, CategorySummary, Error as AppError, HistoryEntry, Identity, PaginationConfig,
    PortfolioSummary, Rejection, RiskProfile, TransactionRequest, User, delete_transaction,
    delete_user, format_amount, format_amount_rounded, format_percentage, get_all_categories,
    get_category_summary, get_history_page, get_or_create_user, get_portfolio_summary,
    get_withdrawable_holdings, import_deposits, initialize_db, parse_amount_input,
    set_risk_profile, setup_logging, submit_transaction,
};

/// Track your savings and investments from the command line.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// File path to the application SQLite database.
    #[arg(long, default_value = "helpinvest.db")]
    db_path: PathBuf,

    /// The email address of the account to use.
    #[arg(long)]
    email: String,

    /// The identity provider's ID for the account, defaults to the email address.
    #[arg(long)]
    uid: Option<String>,

    /// The name to show for a new account.
    #[arg(long)]
    name: Option<String>,

    /// Also write debug logs to this file.
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Print results as JSON.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the categories and sub-categories holdings can be recorded against.
    Categories,
    /// Show the portfolio broken down by category.
    Dashboard,
    /// Show the holdings in one category.
    Category {
        /// The category to show, e.g. "Épargne".
        name: String,
    },
    /// Add money to a holding.
    Deposit {
        /// The category, e.g. "Épargne".
        category: String,
        /// The sub-category, e.g. "PEA".
        sub_category: String,
        /// The whole amount in euros, e.g. "1 500".
        amount: String,
    },
    /// Take money out of a holding.
    Withdraw {
        /// The category, e.g. "Épargne".
        category: String,
        /// The sub-category, e.g. "PEA".
        sub_category: String,
        /// The whole amount in euros, e.g. "1 500".
        amount: String,
    },
    /// Show the transaction history, newest first.
    History {
        /// The page to show, starting from 1.
        #[arg(long)]
        page: Option<u64>,
        /// The number of transactions per page, at most 100.
        #[arg(long)]
        per_page: Option<u64>,
    },
    /// Delete a transaction and reverse its effect on the balance.
    Delete {
        /// The ID of the transaction, as shown in the history.
        id: i64,
    },
    /// Show the risk profile, or change it.
    RiskProfile {
        /// The new profile: prudent, équilibré or dynamique.
        profile: Option<RiskProfile>,
    },
    /// Import deposits from a CSV file with the columns category, sub_category and amount.
    Import {
        /// File path to the CSV file.
        path: PathBuf,
    },
    /// Delete the account together with its holdings and history.
    DeleteAccount {
        /// Confirm the deletion.
        #[arg(long)]
        yes: bool,
    },
}

fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    setup_logging(args.log_file.as_deref())?;

    let conn = Connection::open(&args.db_path)?;
    initialize_db(&conn)?;

    let mut identity = Identity::new(args.uid.as_deref().unwrap_or(&args.email), &args.email);
    if let Some(name) = &args.name {
        identity = identity.display_name(name);
    }
    let user = get_or_create_user(&identity, &conn)?;

    match args.command {
        Command::Categories => {
            let categories = get_all_categories(&conn)?;

            if args.json {
                return print_json(&categories);
            }

            let mut current = "";
            for category in &categories {
                if category.name != current {
                    println!("{}", category.name);
                    current = &category.name;
                }
                println!("  {}", category.sub_category);
            }
        }
        Command::Dashboard => {
            let summary = get_portfolio_summary(user.id, &conn)?;

            if args.json {
                return print_json(&summary);
            }

            print_dashboard(&user, &summary);
        }
        Command::Category { name } => {
            let summary = get_category_summary(user.id, &name, &conn)?;

            if args.json {
                return print_json(&summary);
            }

            match summary {
                Some(summary) => print_category(&summary),
                None => println!("No holdings in {name}."),
            }
        }
        Command::Deposit {
            category,
            sub_category,
            amount,
        } => {
            let request = TransactionRequest::new(
                Action::Deposit,
                &category,
                &sub_category,
                parse_amount_input(&amount),
            );
            submit(&user, &request, args.json, &conn)?;
        }
        Command::Withdraw {
            category,
            sub_category,
            amount,
        } => {
            let request = TransactionRequest::new(
                Action::Withdraw,
                &category,
                &sub_category,
                parse_amount_input(&amount),
            );
            submit(&user, &request, args.json, &conn)?;
        }
        Command::History { page, per_page } => {
            let config = PaginationConfig::default();
            let page = get_history_page(
                user.id,
                config.page(page),
                config.page_size(per_page),
                &conn,
            )?;

            if args.json {
                return print_json(&page);
            }

            if page.items.is_empty() {
                println!("No transactions yet.");
                return Ok(());
            }

            for entry in &page.items {
                print_history_entry(entry);
            }

            let window = page.window;
            println!(
                "\nPage {} of {} ({} transactions)",
                window.page, window.pages, window.total
            );
            if window.has_next {
                println!("Use --page {} to see older transactions.", window.page + 1);
            }
        }
        Command::Delete { id } => match delete_transaction(user.id, id, &conn) {
            Ok(entry) => {
                if args.json {
                    return print_json(&entry);
                }

                println!("Deleted transaction:");
                print_history_entry(&entry);
            }
            Err(AppError::NotFound) => fail(&format!("No transaction with the ID {id}.")),
            Err(error @ (AppError::NegativeBalance(_) | AppError::BalanceOverflow)) => {
                fail(&error.to_string())
            }
            Err(error) => return Err(error.into()),
        },
        Command::RiskProfile { profile } => {
            let user = match profile {
                Some(profile) => set_risk_profile(user.id, profile, &conn)?,
                None => user,
            };

            if args.json {
                return print_json(&user.risk_profile);
            }

            println!("Risk profile: {}", user.risk_profile);
        }
        Command::Import { path } => {
            let report = import_deposits(File::open(&path)?, user.id, &conn)?;

            if args.json {
                return print_json(&report);
            }

            println!("Imported {} deposits.", report.imported.len());
            for row in &report.rejected {
                println!("Skipped line {}: {}", row.line, row.reason);
            }
        }
        Command::DeleteAccount { yes } => {
            if !yes {
                fail("This deletes your holdings and history. Pass --yes to confirm.");
            }

            delete_user(user.id, &conn)?;
            println!("Deleted the account of {}.", user.email);
        }
    }

    Ok(())
}

fn submit(
    user: &User,
    request: &TransactionRequest,
    json: bool,
    conn: &Connection,
) -> Result<(), Box<dyn Error>> {
    let entry = match submit_transaction(user.id, request, conn) {
        Ok(entry) => entry,
        Err(AppError::Rejected(rejection)) => {
            if matches!(rejection, Rejection::InsufficientFunds { .. }) {
                print_withdrawable(user, conn)?;
            }
            fail(&rejection.to_string())
        }
        Err(
            error @ (AppError::InsufficientFunds { .. }
            | AppError::UnknownCategory(_)
            | AppError::BalanceOverflow),
        ) => {
            fail(&error.to_string())
        }
        Err(error) => return Err(error.into()),
    };

    if json {
        return print_json(&entry);
    }

    print_history_entry(&entry);

    Ok(())
}

fn print_withdrawable(user: &User, conn: &Connection) -> Result<(), Box<dyn Error>> {
    let holdings = get_withdrawable_holdings(user.id, conn)?;

    if holdings.is_empty() {
        eprintln!("There is nothing to withdraw.");
        return Ok(());
    }

    eprintln!("Holdings you can withdraw from:");
    for holding in holdings {
        eprintln!(
            "  {} / {}: {}",
            holding.category,
            holding.sub_category,
            format_amount_rounded(holding.balance)
        );
    }

    Ok(())
}

fn print_dashboard(user: &User, summary: &PortfolioSummary) {
    println!("Portfolio of {} ({})", user.username, user.risk_profile);

    if summary.is_empty() {
        println!("No holdings yet, make a deposit to get started.");
        return;
    }

    println!("Total: {}\n", format_amount_rounded(summary.grand_total));

    for (category, slice) in summary.categories.iter().zip(summary.shares()) {
        println!(
            "{}: {} ({})",
            category.category,
            format_amount_rounded(category.total_balance),
            format_percentage(slice.share)
        );

        for row in &category.sub_categories {
            println!("  {}: {}", row.name, format_amount_rounded(row.balance));
        }
    }
}

fn print_category(summary: &CategorySummary) {
    println!(
        "{}: {}\n",
        summary.category,
        format_amount(summary.total_balance)
    );

    for slice in summary.slices() {
        match slice.percentage_label {
            Some(label) => println!("  {}: {} ({label})", slice.label, format_amount(slice.value)),
            None => println!("  {}: {}", slice.label, format_amount(slice.value)),
        }
    }
}

fn print_history_entry(entry: &HistoryEntry) {
    let verb = match entry.action() {
        Action::Deposit => "deposit",
        Action::Withdraw => "withdrawal",
    };

    println!(
        "#{} {} {verb} {} / {}: {}",
        entry.id,
        entry.timestamp.date(),
        entry.category,
        entry.sub_category,
        format_amount(entry.amount)
    );
}

fn print_json<T: Serialize>(value: &T) -> Result<(), Box<dyn Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);

    Ok(())
}

fn fail(message: &str) -> ! {
    eprintln!("{message}");
    exit(1);
}
