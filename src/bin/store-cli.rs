use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue, COOKIE, SET_COOKIE};
use reqwest::StatusCode;
use serde_json::{json, Value};

#[derive(Parser)]
#[command(name = "store-cli")]
#[command(about = "Management CLI for the storefront backend", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:3000")]
    url: String,

    /// Admin session token (defaults to $STORE_SESSION).
    #[arg(short, long)]
    session: Option<String>,

    /// Session cookie name.
    #[arg(long, default_value = "admin_session")]
    cookie_name: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show service health
    Health,
    /// Sign in and print the session token
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    /// List orders, optionally filtered by status
    Orders {
        #[arg(long)]
        status: Option<String>,
    },
    /// Confirm the manual payment of an order
    ConfirmPayment {
        order_id: i64,
        #[arg(long)]
        notes: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()?;

    let session = cli.session.clone().or_else(|| std::env::var("STORE_SESSION").ok());
    let mut headers = HeaderMap::new();
    if let Some(token) = &session {
        headers.insert(
            COOKIE,
            HeaderValue::from_str(&format!("{}={}", cli.cookie_name, token))?,
        );
    }

    match cli.command {
        Commands::Health => {
            let res = client.get(format!("{}/api/health", cli.url)).send().await?;
            print_response(res).await?;
        }
        Commands::Login { email, password } => {
            let res = client
                .post(format!("{}/api/auth/login", cli.url))
                .json(&json!({ "email": email, "password": password }))
                .send()
                .await?;

            let token = res
                .headers()
                .get_all(SET_COOKIE)
                .iter()
                .filter_map(|v| v.to_str().ok())
                .find_map(|v| session_token(v, &cli.cookie_name));

            match token {
                Some(token) => println!("{token}"),
                None => print_response(res).await?,
            }
        }
        Commands::Orders { status } => {
            let mut request = client.get(format!("{}/admin/orders", cli.url)).headers(headers);
            if let Some(status) = status {
                request = request.query(&[("status", status)]);
            }
            print_response(request.send().await?).await?;
        }
        Commands::ConfirmPayment { order_id, notes } => {
            let res = client
                .post(format!("{}/admin/orders/{}/confirm-payment", cli.url, order_id))
                .headers(headers)
                .json(&json!({ "notes": notes }))
                .send()
                .await?;
            print_response(res).await?;
        }
    }

    Ok(())
}

fn session_token(set_cookie: &str, name: &str) -> Option<String> {
    let first = set_cookie.split(';').next()?;
    let (key, value) = first.split_once('=')?;
    (key.trim() == name && !value.is_empty()).then(|| value.to_string())
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if status == StatusCode::TEMPORARY_REDIRECT {
        eprintln!("Error: session missing or expired, run `store-cli login` first");
        return Ok(());
    }
    if !status.is_success() {
        eprintln!("Error: storefront returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        return Ok(());
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
