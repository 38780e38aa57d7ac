use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use color_eyre::eyre::WrapErr;
use medboard::{
    api::{PageRequest, DEFAULT_PAGE_SIZE},
    model::{Id, PageInfo, Translated, DEFAULT_LANGUAGE},
    AdminClient, ClientConfig, DEFAULT_BASE_URL, DEFAULT_TIMEOUT_SECS,
};
use medboard_reqwest::RefreshCredentialMode;
use medboard_tokens::{LoginRedirect, Password, UntrustedClaims, Username};
use tracing_subscriber::filter::EnvFilter;
use url::Url;

#[derive(Debug, Parser)]
#[command(version, about)]
struct Opts {
    /// The base URL of the backend's REST API
    #[arg(short, long, env = "MEDBOARD_BASE_URL", default_value = DEFAULT_BASE_URL)]
    base_url: Url,

    /// The overall timeout for a single request, in seconds
    #[arg(
        long,
        env = "MEDBOARD_TIMEOUT_SECS",
        default_value_t = DEFAULT_TIMEOUT_SECS,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    timeout_secs: u64,

    /// How the refresh token is presented to the backend
    #[arg(long, env = "MEDBOARD_REFRESH_MODE", value_enum, default_value_t = Mode::Body)]
    refresh_mode: Mode,

    /// The local file used to keep the session between runs
    #[arg(
        short = 'f',
        long,
        env = "MEDBOARD_CREDENTIALS_FILE",
        default_value = ".medboard-credentials.json"
    )]
    credentials_file: PathBuf,

    /// The language used for translated fields
    #[arg(short, long, env = "MEDBOARD_LANGUAGE", default_value = DEFAULT_LANGUAGE)]
    language: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Mode {
    /// The refresh token is kept locally and sent in the request body
    Body,
    /// The refresh token is kept by the backend in an HttpOnly cookie
    Cookie,
}

impl From<Mode> for RefreshCredentialMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Body => Self::Body,
            Mode::Cookie => Self::Cookie,
        }
    }
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Logs in and keeps the session
    Login {
        /// The administrator's login name
        #[arg(short, long, env = "MEDBOARD_USERNAME")]
        username: Username,

        /// The administrator's password
        #[arg(short, long, env = "MEDBOARD_PASSWORD", hide_env_values = true)]
        password: Password,
    },
    /// Ends the session
    Logout,
    /// Shows whether a usable session is held
    Status,
    /// Renews the session now
    Refresh,
    /// Manages medical directions
    #[command(subcommand)]
    Directions(ResourceCommand),
    /// Manages doctors
    #[command(subcommand)]
    Doctors(ResourceCommand),
    /// Moderates patient reviews
    #[command(subcommand)]
    Reviews(ReviewCommand),
}

#[derive(Debug, Subcommand)]
enum ResourceCommand {
    /// Lists one page
    List(PageArgs),
    /// Shows a single entry
    Get { id: Id },
    /// Deletes an entry
    Delete { id: Id },
}

#[derive(Debug, Subcommand)]
enum ReviewCommand {
    /// Lists one page
    List(PageArgs),
    /// Deletes a review
    Delete { id: Id },
}

#[derive(Debug, clap::Args)]
struct PageArgs {
    /// The zero-based page number
    #[arg(long, default_value_t = 0)]
    page: u32,

    /// The number of entries per page
    #[arg(long, default_value_t = DEFAULT_PAGE_SIZE)]
    size: u32,
}

impl From<PageArgs> for PageRequest {
    fn from(args: PageArgs) -> Self {
        PageRequest::new(args.page).with_size(args.size)
    }
}

#[derive(Clone, Copy, Debug)]
struct LoginPrompt;

impl LoginRedirect for LoginPrompt {
    fn redirect_to_login(&self) {
        eprintln!("Your session has expired. Run `medboard login` to sign in again.");
    }
}

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    dotenvy::dotenv().ok();
    color_eyre::install()?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let opts = Opts::parse();

    let config = ClientConfig::new(opts.base_url)
        .with_timeout(std::time::Duration::from_secs(opts.timeout_secs))
        .with_refresh_mode(opts.refresh_mode.into())
        .with_credentials_file(opts.credentials_file);

    let client = AdminClient::builder(config)
        .with_redirect(LoginPrompt)
        .build()
        .await
        .wrap_err("unable to set up the admin client")?;

    let language = opts.language.as_str();
    match opts.command {
        Command::Login { username, password } => {
            client
                .login(username, password)
                .await
                .wrap_err("login failed")?;
            println!("Logged in.");
        }
        Command::Logout => {
            client.logout().await;
            println!("Logged out.");
        }
        Command::Status => print_status(&client).await,
        Command::Refresh => {
            client.refresh().await.wrap_err("unable to renew the session")?;
            println!("Session renewed.");
        }
        Command::Directions(cmd) => match cmd {
            ResourceCommand::List(args) => {
                let page = client.directions().list(args.into()).await?;
                for direction in &page.content {
                    let t = direction.translation(language);
                    println!("{:>6}  {}", direction.id, t.title.as_deref().unwrap_or("-"));
                }
                print_page(&page.page);
            }
            ResourceCommand::Get { id } => {
                let direction = client.directions().get(id).await?;
                println!("{}", serde_json::to_string_pretty(&direction)?);
            }
            ResourceCommand::Delete { id } => {
                client.directions().delete(id).await?;
                println!("Deleted direction {id}.");
            }
        },
        Command::Doctors(cmd) => match cmd {
            ResourceCommand::List(args) => {
                let page = client.doctors().list(args.into()).await?;
                for doctor in &page.content {
                    let t = doctor.translation(language);
                    println!(
                        "{:>6}  {}  {}",
                        doctor.id,
                        doctor.full_name(),
                        t.specialization.as_deref().unwrap_or("-")
                    );
                }
                print_page(&page.page);
            }
            ResourceCommand::Get { id } => {
                let doctor = client.doctors().get(id).await?;
                println!("{}", serde_json::to_string_pretty(&doctor)?);
            }
            ResourceCommand::Delete { id } => {
                client.doctors().delete(id).await?;
                println!("Deleted doctor {id}.");
            }
        },
        Command::Reviews(cmd) => match cmd {
            ReviewCommand::List(args) => {
                let page = client.reviews().list(args.into()).await?;
                for review in &page.content {
                    println!(
                        "{:>6}  {}  {}  {}",
                        review.id,
                        review.created_at.as_deref().unwrap_or("-"),
                        review.name,
                        review.message
                    );
                }
                print_page(&page.page);
            }
            ReviewCommand::Delete { id } => {
                client.reviews().delete(id).await?;
                println!("Deleted review {id}.");
            }
        },
    }

    Ok(())
}

async fn print_status(client: &AdminClient) {
    if !client.is_authenticated().await {
        println!("Not logged in.");
        return;
    }

    let expiry = client
        .store()
        .get()
        .and_then(|c| UntrustedClaims::decode(c.access_token()).ok())
        .and_then(|claims| claims.exp);
    match expiry {
        Some(exp) => println!("Logged in. Access token expires at Unix time {}.", exp.0),
        None => println!("Logged in."),
    }
}

fn print_page(page: &PageInfo) {
    println!(
        "page {} of {} ({} total)",
        page.number + 1,
        page.total_pages.max(1),
        page.total_elements
    );
}
