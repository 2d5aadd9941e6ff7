use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use chess_trainer::session::SessionContext;
use chess_trainer::views::{Action, App};
use chess_trainer::{AppConfig, Backend};
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[clap(name = "chess-trainer", version)]
#[clap(about = "Solve chess puzzles backed by Supabase", long_about = None)]
struct Cli {
    /// Page to open first
    #[clap(long, default_value = "/")]
    route: String,

    /// Keep the signed-in session in this file between runs
    #[clap(long)]
    session_file: Option<PathBuf>,

    /// Log filter used when RUST_LOG is not set
    #[clap(long, default_value = "info")]
    log_level: String,
}

const HELP: &str = "\
Commands:
  /<path> | go <path>              open a page (/, /puzzle, /puzzle/<id>, /profile,
                                   /login, /signup, /profile-test, /puzzle-test)
  signin <email> <password>        sign in with email
  google                           start Google sign-in
  code <code>                      finish Google sign-in with the redirect code
  signup <email> <password> <user> create an account
  signout                          sign out
  move <from> <to> | move e2e4     play a move on the puzzle board
  reset | next                     reset the puzzle or open the next one
  bio <text> | name <text>         edit your profile
  refresh | testbio                profile test page actions
  filter <0-5> | check             puzzle test page actions
  help | quit";

fn init_logging(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    let config = AppConfig::from_env()
        .context("set SUPABASE_URL and SUPABASE_ANON_KEY (a .env file works too)")?
        .with_session_file(cli.session_file);
    let backend = Arc::new(Backend::new(config).context("could not build the HTTP client")?);
    let context = SessionContext::start(backend).await;

    let mut app = App::new(context);
    app.navigate(&cli.route).await;
    println!("{}\n", app.render().await);
    println!("Type `help` for commands.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        match line {
            "" => continue,
            "quit" | "exit" => break,
            "help" => {
                println!("{}", HELP);
                continue;
            }
            _ => {}
        }

        match Action::parse(line) {
            Some(action) => {
                app.dispatch(action).await;
                println!("{}\n", app.render().await);
            }
            None => println!("Unknown command `{}`. Type `help` for commands.", line),
        }
    }

    app.shutdown();
    Ok(())
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("Error: {:#}", err);
        std::process::exit(1);
    }
}
