use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use serde::Deserialize;

use teller::transaction::Amount;
use teller::{JsonStore, Ledger, LedgerStore, Transaction};

const CONFIG_FILE: &str = "teller.toml";
const DEFAULT_DATA_FILE: &str = "bank_data.json";
const CURRENCIES: [&str; 3] = ["USD", "EUR", "GBP"];

#[derive(Parser, Debug)]
#[clap(version, about, propagate_version = true)]
struct Cli {
    /// Path to the snapshot file to operate on. Defaults to the
    /// `data_file` from teller.toml, or bank_data.json.
    #[clap(short, long, value_parser)]
    file: Option<PathBuf>,

    #[clap(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Register a new user
    Register {
        #[clap(short, long, value_parser)]
        name: String,
        #[clap(short, long, value_parser)]
        phone: String,
        #[clap(long, value_parser)]
        password: String,
    },
    /// Log in as an existing user
    Login(Credentials),
    /// Open a new account for a user
    OpenAccount {
        #[clap(flatten)]
        credentials: Credentials,
        #[clap(short, long, value_parser, default_value = "USD")]
        currency: String,
    },
    /// List a user's accounts and balances
    Accounts(Credentials),
    /// Deposit into an account
    Deposit {
        #[clap(short, long, value_parser)]
        account: String,
        #[clap(short = 'm', long, value_parser)]
        amount: Amount,
    },
    /// Withdraw from an account
    Withdraw {
        #[clap(short, long, value_parser)]
        account: String,
        #[clap(short = 'm', long, value_parser)]
        amount: Amount,
    },
    /// Transfer between two accounts
    Transfer {
        #[clap(short, long, value_parser)]
        from: String,
        #[clap(short, long, value_parser)]
        to: String,
        #[clap(short = 'm', long, value_parser)]
        amount: Amount,
    },
    /// Print an account statement
    Statement {
        #[clap(short, long, value_parser)]
        account: String,
    },
}

impl Commands {
    /// Whether the command can change ledger state. Anything that
    /// authenticates counts: even a failed login moves the lockout
    /// state machine, and that movement must reach the snapshot.
    fn mutates(&self) -> bool {
        !matches!(self, Commands::Statement { .. })
    }
}

#[derive(Args, Debug)]
struct Credentials {
    #[clap(short, long, value_parser)]
    phone: String,
    #[clap(long, value_parser)]
    password: String,
}

#[derive(Debug, Deserialize)]
struct AppConfig {
    data_file: PathBuf,
}

impl AppConfig {
    fn read(filepath: impl AsRef<Path>) -> anyhow::Result<Self> {
        let file_content = fs::read_to_string(filepath)
            .with_context(|| "failed to read config file")?;
        let config = toml::from_str(&file_content)
            .with_context(|| "failed to parse config file")?;
        Ok(config)
    }
}

fn snapshot_path(cli_file: Option<PathBuf>) -> PathBuf {
    if let Some(path) = cli_file {
        return path;
    }
    if Path::new(CONFIG_FILE).exists() {
        match AppConfig::read(CONFIG_FILE) {
            Ok(config) => return config.data_file,
            Err(err) => log::warn!("ignoring {}: {:#}", CONFIG_FILE, err),
        }
    }
    PathBuf::from(DEFAULT_DATA_FILE)
}

fn print_accounts(ledger: &Ledger, phone: &str) {
    let user = match ledger.find_user_by_phone(phone) {
        Some(user) => user,
        None => return,
    };
    if user.accounts().is_empty() {
        println!("You don't have any accounts yet.");
        return;
    }
    for number in user.accounts() {
        if let Some(account) = ledger.get_account(number) {
            let balance = if account.balance() > Amount::ZERO {
                account.balance().to_string().green()
            } else {
                account.balance().to_string().normal()
            };
            println!(
                "Account: {} | Balance: {} {}",
                number, account.currency, balance
            );
        }
    }
}

fn statement_line(transaction: &Transaction, account: &str) -> String {
    let when = transaction.timestamp().format("%Y-%m-%d %H:%M:%S");
    let signed = transaction.signed_amount(account);
    let amount = if signed < Amount::ZERO {
        format!("-{}", transaction.amount()).bright_red()
    } else {
        format!("+{}", transaction.amount()).green()
    };
    match transaction.counterparty(account) {
        Some(other) if signed < Amount::ZERO => {
            format!("[{}] TRANSFER TO {}: {}", when, other, amount)
        }
        Some(other) => format!("[{}] TRANSFER FROM {}: {}", when, other, amount),
        None if signed < Amount::ZERO => format!("[{}] WITHDRAW: {}", when, amount),
        None => format!("[{}] DEPOSIT: {}", when, amount),
    }
}

fn print_statement(ledger: &Ledger, account_number: &str) -> anyhow::Result<()> {
    let account = ledger
        .get_account(account_number)
        .with_context(|| format!("no such account: {}", account_number))?;

    let statement = account.statement();
    if statement.is_empty() {
        println!("No transactions found");
        return Ok(());
    }
    for transaction in statement {
        println!("{}", statement_line(transaction, account_number));
    }
    Ok(())
}

fn run(ledger: &mut Ledger, command: &Commands) -> anyhow::Result<()> {
    match command {
        Commands::Register {
            name,
            phone,
            password,
        } => {
            let user = ledger.register(name, phone, password)?;
            println!("Registration successful! User ID: {}", user.user_id);
        }
        Commands::Login(credentials) => {
            let user = ledger.login(&credentials.phone, &credentials.password)?;
            println!("Welcome back, {}!", user.full_name);
        }
        Commands::OpenAccount {
            credentials,
            currency,
        } => {
            if !CURRENCIES.contains(&currency.as_str()) {
                bail!(
                    "unsupported currency {}, pick one of {}",
                    currency,
                    CURRENCIES.join(", ")
                );
            }
            let user_id = ledger
                .login(&credentials.phone, &credentials.password)?
                .user_id;
            let number = ledger.create_account(user_id, currency)?;
            println!("Account created successfully! Account number: {}", number);
        }
        Commands::Accounts(credentials) => {
            ledger.login(&credentials.phone, &credentials.password)?;
            print_accounts(ledger, &credentials.phone);
        }
        Commands::Deposit { account, amount } => {
            ledger.deposit(account, *amount)?;
            println!("Deposited {} into {}", amount, account);
        }
        Commands::Withdraw { account, amount } => {
            ledger.withdraw(account, *amount)?;
            println!("Withdrew {} from {}", amount, account);
        }
        Commands::Transfer { from, to, amount } => {
            if from == to {
                bail!("cannot transfer an account to itself");
            }
            ledger.transfer(from, to, *amount)?;
            println!("Transferred {} from {} to {}", amount, from, to);
        }
        Commands::Statement { account } => {
            print_statement(ledger, account)?;
        }
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Cli::parse();

    let store = JsonStore::new(snapshot_path(args.file));
    let (mut ledger, load_error) = store.load_or_empty();
    if load_error.is_some() {
        eprintln!("Warning: snapshot was unreadable, starting with an empty ledger");
    }

    // Save before propagating any command failure: a failed login has
    // still advanced the user's lockout state, and the ledger is
    // consistent either way.
    let outcome = run(&mut ledger, &args.command);
    if args.command.mutates() {
        if let Err(err) = store.save(&ledger) {
            match outcome {
                Ok(()) => return Err(err.into()),
                Err(_) => log::warn!("snapshot not saved: {}", err),
            }
        }
    }
    outcome
}
