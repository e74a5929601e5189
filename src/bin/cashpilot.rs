use std::{error::Error, path::PathBuf, sync::Arc};

use clap::{Parser, Subcommand, ValueEnum};
use serde::Deserialize;
use serde_json::{Map, Value};

use cashpilot::{
    UserID,
    capture::EchartsCapturer,
    config::{DEFAULT_APP_NAME, DEFAULT_CURRENCY_SYMBOL, DEFAULT_TIMEZONE, ReportConfig},
    dashboard::Dashboard,
    identity::Session,
    logging::setup_logging,
    shutdown_signal,
    stores::{
        Collection,
        sqlite::{SQLiteDocumentStore, open_store},
    },
};

/// Track a budget from the command line and export CashPilot reports.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// File path to the application SQLite database.
    #[arg(long, env = "CASHPILOT_DB")]
    db_path: PathBuf,

    /// Also append debug logs to this file.
    #[arg(long)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Load transactions, a budget and monthly income from a JSON file
    Import {
        /// The user the records belong to
        #[arg(long)]
        user: String,

        /// JSON file with `transactions`, `budget` and `monthlyIncome` keys
        file: PathBuf,
    },

    /// Print the dashboard of a user as JSON
    Summary {
        /// The user to show
        #[arg(long)]
        user: String,
    },

    /// Export the transactions of a user as a CSV or PDF report
    Export {
        /// The user to export
        #[arg(long)]
        user: String,

        /// Report format
        #[arg(long, value_enum, default_value_t = Format::Pdf)]
        format: Format,

        /// Directory to write the report to
        #[arg(long, default_value = ".")]
        out_dir: PathBuf,

        /// PNG logo for the PDF header
        #[arg(long)]
        logo: Option<PathBuf>,

        /// Canonical timezone used for the report date, e.g. "Africa/Lagos"
        #[arg(long, env = "CASHPILOT_TIMEZONE", default_value = DEFAULT_TIMEZONE)]
        timezone: String,

        /// Application name used in the title and file name
        #[arg(long, default_value = DEFAULT_APP_NAME)]
        app_name: String,

        /// Currency symbol for PDF amounts
        #[arg(long, default_value = DEFAULT_CURRENCY_SYMBOL)]
        currency_symbol: String,
    },

    /// Delete a transaction and print the updated dashboard
    Delete {
        /// The user who owns the transaction
        #[arg(long)]
        user: String,

        /// ID of the transaction to delete
        id: String,
    },

    /// Print the dashboard every time it changes until interrupted
    Watch {
        /// The user to follow
        #[arg(long)]
        user: String,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Format {
    Csv,
    Pdf,
}

/// The records accepted by `import`.
#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct ImportFile {
    #[serde(default)]
    transactions: Vec<Map<String, Value>>,
    budget: Option<f64>,
    #[serde(default)]
    monthly_income: Vec<Map<String, Value>>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    setup_logging(args.log_file.as_deref())?;

    let store = Arc::new(open_store(&args.db_path)?);

    match args.command {
        Command::Import { user, file } => import(&store, UserID::new(user), file)?,
        Command::Summary { user } => {
            let dashboard = load_dashboard(&store, ReportConfig::default(), user).await?;
            println!("{}", serde_json::to_string_pretty(&dashboard.view())?);
        }
        Command::Export {
            user,
            format,
            out_dir,
            logo,
            timezone,
            app_name,
            currency_symbol,
        } => {
            let config = ReportConfig {
                app_name,
                currency_symbol,
                local_timezone: timezone,
                logo_path: logo,
            };
            let dashboard = load_dashboard(&store, config, user).await?;

            let artifact = match format {
                Format::Csv => dashboard.export_csv()?,
                Format::Pdf => dashboard.export_pdf(&EchartsCapturer::default()).await?,
            };

            let path = out_dir.join(&artifact.file_name);
            std::fs::write(&path, &artifact.bytes)?;
            tracing::info!("wrote {} ({})", path.display(), artifact.media_type);
            println!("{}", path.display());
        }
        Command::Delete { user, id } => {
            let mut dashboard = load_dashboard(&store, ReportConfig::default(), user).await?;

            dashboard.delete_transaction(&id).await?;
            dashboard.process_next_update().await;

            println!("{}", serde_json::to_string_pretty(&dashboard.view())?);
        }
        Command::Watch { user } => {
            let session = Session::signed_in(UserID::new(user));
            let mut dashboard = Dashboard::new(store.clone(), ReportConfig::default());
            let mut views = dashboard.watch_view();

            let print_views = async {
                while views.changed().await.is_ok() {
                    let view = views.borrow_and_update().clone();
                    match serde_json::to_string(&view) {
                        Ok(json) => println!("{json}"),
                        Err(error) => tracing::error!("could not serialize dashboard: {error}"),
                    }
                }
            };

            tokio::select! {
                _ = dashboard.run(&session, shutdown_signal()) => {},
                _ = print_views => {},
            }
        }
    }

    Ok(())
}

fn import(
    store: &SQLiteDocumentStore,
    user: UserID,
    file: PathBuf,
) -> Result<(), Box<dyn Error>> {
    let text = std::fs::read_to_string(&file)?;
    let records: ImportFile = serde_json::from_str(&text)?;
    let owner = Value::String(user.to_string());

    for (collection, documents) in [
        (Collection::Transactions, records.transactions),
        (Collection::MonthlyIncome, records.monthly_income),
    ] {
        let count = documents.len();
        for mut fields in documents {
            fields.insert("userId".to_owned(), owner.clone());
            store.insert(collection, fields)?;
        }
        tracing::info!("imported {count} {collection} for user {user}");
    }

    if let Some(budget) = records.budget {
        store.upsert_budget(&user, budget)?;
        tracing::info!("set budget of user {user} to {budget}");
    }

    Ok(())
}

/// Sign `user` in and wait for all of their data to arrive.
async fn load_dashboard(
    store: &Arc<SQLiteDocumentStore>,
    config: ReportConfig,
    user: String,
) -> Result<Dashboard<SQLiteDocumentStore>, cashpilot::Error> {
    let mut dashboard = Dashboard::new(store.clone(), config);
    dashboard.set_user(Some(UserID::new(user)));
    dashboard.wait_for_initial_sync().await?;

    Ok(dashboard)
}
