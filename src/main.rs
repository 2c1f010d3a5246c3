use clap::Parser;
use dotenv::dotenv;
use std::env;

mod cli;
mod error;
mod models;
mod handlers;
mod services;
mod utils;

use cli::{Action, Cli};
use handlers::dashboard;
use services::config::{resolve_token, FileRepositoryList};
use services::github::{GitHubClient, DEFAULT_API_URL};
use services::store::CsvMetricsStore;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let store = CsvMetricsStore::new(&cli.data_dir);
    let repos = FileRepositoryList::new(&cli.repos);

    match cli.action() {
        Action::Show => println!("{}", dashboard::show(&store)?),
        Action::Summary => println!("{}", dashboard::summary(&store)?),
        Action::Init => println!("{}", dashboard::init(&repos)?),
        Action::Update => {
            let client = github_client(cli.token)?;
            println!("{}", dashboard::update(&client, &repos, &store, true).await?);
        }
        Action::Auto => {
            println!("GitHub Repository Dashboard");
            println!("{}", "=".repeat(40));

            let client = github_client(cli.token)?;
            let (out, result) = dashboard::auto(&client, &repos, &store).await;
            println!("{}", out);
            result?;
        }
    }

    Ok(())
}

fn github_client(token: Option<String>) -> anyhow::Result<GitHubClient> {
    let base_url = env::var("GITHUB_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string());
    let client = GitHubClient::new(resolve_token(token), &base_url)?;
    Ok(client)
}
