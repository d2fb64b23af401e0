use std::env;
use std::process;

use anyhow::Result;
use dotenvy::dotenv;
use getopts::Options;
use log::debug;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::filter::LevelFilter;

use loler_cli::{
    backend::Backend,
    render::{not_found_hint, render_report, LoginProgress},
};
use loler_core::{
    config::{load_or, UpstreamConfig, DEFAULT_PLATFORM},
    device_auth::{DeviceAuthDriver, DeviceAuthState},
    memory_lol::split_usernames,
    session::{SessionTokenHolder, SledTokenStore},
    CoreError,
};

fn print_usage(program: &str, opts: Options) {
    let brief = format!("Usage: {} [OPTIONS]", program);
    print!("{}", opts.usage(&brief));
    println!("\nExamples:");
    println!("  {} -s \"jack, elonmusk\"", program);
    println!("  {} --login", program);
    println!("\nEnvironment variables:");
    println!("  BACKEND_URL       loler_server address (default http://127.0.0.1:3000)");
    println!("  MEMORY_LOL_URL    Memory.lol API, used with --direct");
    println!("  GITHUB_URL        GitHub host, used with --direct");
    println!("  GITHUB_CLIENT_ID  OAuth app client id, used with --direct");
    println!("  SLED_URL          Where the session token is kept (default memoryloler_db)");
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(LevelFilter::WARN)
        .init();

    let args: Vec<String> = env::args().collect();
    let program = args[0].clone();

    let mut opts = Options::new();
    opts.optopt("s", "search", "Comma-separated usernames to look up", "NAMES");
    opts.optopt("p", "platform", "Platform to search (default twitter)", "PLATFORM");
    opts.optflag("d", "direct", "Call Memory.lol and GitHub directly instead of the server");
    opts.optflag("l", "login", "Authenticate with GitHub for full history");
    opts.optflag("o", "logout", "Forget the saved token");
    opts.optflag("", "status", "Show whether the saved token is accepted");
    opts.optflag("h", "help", "Show this help message");

    let matches = match opts.parse(&args[1..]) {
        Ok(m) => m,
        Err(f) => {
            eprintln!("Error parsing arguments: {}", f);
            print_usage(&program, opts);
            process::exit(1);
        }
    };

    if matches.opt_present("h") {
        print_usage(&program, opts);
        return Ok(());
    }

    let search_arg = matches.opt_str("s");
    let login_flag = matches.opt_present("l");
    let logout_flag = matches.opt_present("o");
    let status_flag = matches.opt_present("status");

    let modes = [search_arg.is_some(), login_flag, logout_flag, status_flag]
        .iter()
        .filter(|m| **m)
        .count();
    if modes != 1 {
        eprintln!("Error: Choose exactly one of --search, --login, --logout or --status");
        print_usage(&program, opts);
        process::exit(1);
    }

    let backend = if matches.opt_present("d") {
        Backend::direct(&UpstreamConfig::from_env())
    } else {
        Backend::server()
    };
    debug!("Using {} backend", backend.describe());

    let store = SledTokenStore::open(&load_or("SLED_URL", "memoryloler_db"))?;
    let mut holder = SessionTokenHolder::new(store);
    holder.load()?;

    if let Some(names) = search_arg {
        let platform = matches
            .opt_str("p")
            .unwrap_or_else(|| DEFAULT_PLATFORM.to_string());
        let usernames = split_usernames(&names);

        match backend.search(&usernames, &platform, holder.current()).await {
            Ok(report) => print!("{}", render_report(&report)),
            Err(CoreError::UpstreamNotFound) => {
                println!("No data found for {}", usernames.join(", "));
                println!("{}", not_found_hint(holder.is_authenticated()));
                process::exit(1);
            }
            Err(e) => {
                eprintln!("Error: {}", e);
                process::exit(1);
            }
        }
    } else if login_flag {
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                trigger.cancel();
            }
        });

        let mut progress = LoginProgress::default();
        let mut driver = DeviceAuthDriver::new(backend.device_flow());
        let end = driver
            .run(&mut holder, &cancel, |state| {
                if let Some(line) = progress.line(state) {
                    println!("{}", line);
                }
            })
            .await;

        match end {
            DeviceAuthState::Authenticated(_) => {}
            DeviceAuthState::Idle => println!("Login cancelled"),
            _ => process::exit(1),
        }
    } else if logout_flag {
        holder.clear()?;
        println!("Logged out");
    } else if status_flag {
        let Some(token) = holder.current() else {
            println!("Not logged in. Run with --login to authenticate.");
            return Ok(());
        };

        println!("Saved token: {}", token);
        match backend.status(token).await {
            Ok((authenticated, memory_lol_status)) => {
                println!(
                    "Memory.lol access: {}",
                    if authenticated { "accepted" } else { "not accepted" }
                );
                println!("{}", serde_json::to_string_pretty(&memory_lol_status)?);
            }
            Err(e) => {
                eprintln!("Error: {}", e);
                process::exit(1);
            }
        }
    }

    Ok(())
}
