use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing::info;

use cafe_sales_lib::commands::{
    self, auth, dashboard, diagnostics, input, menu, records, report, shell, Console,
};
use cafe_sales_lib::config::{AppConfig, ConfigInputs};
use cafe_sales_lib::controller::{Controller, View};
use cafe_sales_lib::models::Temperature;
use cafe_sales_lib::repository::Backend;
use cafe_sales_lib::time_slot::{business_slots, parse_date};

#[derive(Copy, Clone, Debug, ValueEnum)]
enum Temp {
    Hot,
    Ice,
}

impl From<Temp> for Temperature {
    fn from(t: Temp) -> Self {
        match t {
            Temp::Hot => Temperature::Hot,
            Temp::Ice => Temperature::Ice,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "cafe-sales", version, about = "HOT/ICE 음료 판매 기록")]
struct Cli {
    /// local or supabase (default: local)
    #[arg(long, global = true)]
    backend: Option<String>,

    /// Directory for the local database and logs
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[arg(long, global = true)]
    supabase_url: Option<String>,

    #[arg(long, global = true)]
    supabase_anon_key: Option<String>,

    /// First hour of the report's fixed slots
    #[arg(long, global = true)]
    open_hour: Option<u32>,

    /// Hour the report's fixed slots end at (exclusive)
    #[arg(long, global = true)]
    close_hour: Option<u32>,

    /// Day to show, YYYY-MM-DD (default: today)
    #[arg(long, global = true)]
    date: Option<String>,

    /// Write the log file as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show the menu buttons of a category
    Input { category: Option<String> },
    /// Record one sale
    Sell {
        menu_id: String,
        #[arg(value_enum)]
        temperature: Temp,
    },
    /// Hourly totals and top menus
    Dashboard,
    /// Daily report with the sale management table
    Report {
        #[arg(long, default_value_t = 1)]
        page: usize,
        /// Save the day's CSV into this directory
        #[arg(long)]
        csv: Option<PathBuf>,
        /// Print the CSV to stdout instead of the report
        #[arg(long, conflicts_with = "csv")]
        stdout_csv: bool,
        /// Copy the fixed-slot totals to the clipboard
        #[arg(long)]
        copy: bool,
    },
    /// Correct the price of a sale
    Edit { id: i64, price: String },
    /// Delete a sale
    Delete {
        id: i64,
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
    /// Sign in to the hosted backend
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: Option<String>,
    },
    Logout,
    /// Replace the local menu catalog with a JSON menu file
    ImportMenu { file: PathBuf },
    /// Version, build and store health
    About,
    /// Interactive session (default)
    Shell,
}

impl Cli {
    fn config_inputs(&self) -> ConfigInputs {
        ConfigInputs {
            backend: self.backend.clone(),
            data_dir: self.data_dir.clone(),
            supabase_url: self.supabase_url.clone(),
            supabase_anon_key: self.supabase_anon_key.clone(),
            open_hour: self.open_hour,
            close_hour: self.close_hour,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let inputs = ConfigInputs::from_env()
        .context("reading environment")?
        .overridden_by(cli.config_inputs());
    let config = AppConfig::resolve(inputs).context("invalid configuration")?;
    let log_guard = cafe_sales_lib::init_logging(&config.log_dir, cli.log_json);
    info!(
        "Starting Cafe Sales v{} ({:?})",
        env!("CARGO_PKG_VERSION"),
        config.backend
    );

    let backend = Backend::open(&config).context("opening backend")?;
    let slots = business_slots(config.open_hour, config.close_hour);
    let mut controller = Controller::new(backend, slots);
    if let Some(raw) = &cli.date {
        controller.set_date(parse_date(raw)?).await;
    }
    let command = cli.command.unwrap_or(Command::Shell);
    // `login` opens its own session; skip the anonymous one.
    if !matches!(command, Command::Login { .. }) {
        controller.start().await;
    }
    let mut console = Console::new();

    let ok = match command {
        Command::Input { category } => input::show(&mut controller, category.as_deref()),
        Command::Sell {
            menu_id,
            temperature,
        } => input::sell(&mut controller, &menu_id, temperature.into()).await,
        Command::Dashboard => {
            dashboard::show(&controller);
            controller.is_authenticated()
        }
        Command::Report {
            page,
            csv,
            stdout_csv,
            copy,
        } => {
            controller.set_view(View::Report);
            if stdout_csv {
                report::print_csv(&mut controller)
            } else if let Some(dir) = csv {
                report::export_csv(&mut controller, &dir)
            } else if copy {
                report::copy_slots(&controller)
            } else {
                controller.go_to_page(page);
                report::show(&controller);
                controller.is_authenticated()
            }
        }
        Command::Edit { id, price } => records::edit(&mut controller, id, &price).await,
        Command::Delete { id, yes } => {
            if records::confirm_delete(&mut console, yes).await? {
                records::delete(&mut controller, id).await
            } else {
                println!("삭제를 취소했어요.");
                true
            }
        }
        Command::Login { email, password } => {
            auth::login(&mut controller, &mut console, &email, password).await?
        }
        Command::Logout => {
            auth::logout(&mut controller).await;
            true
        }
        Command::ImportMenu { file } => menu::import(&mut controller, &file).await,
        Command::About => {
            diagnostics::show(&controller)?;
            true
        }
        Command::Shell => {
            let export_dir = std::env::current_dir().context("resolving current directory")?;
            shell::run(&mut controller, &mut console, &export_dir).await?;
            true
        }
    };
    commands::flush_notice(&mut controller);

    if !ok {
        drop(log_guard);
        std::process::exit(1);
    }
    Ok(())
}
