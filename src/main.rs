//! Main entry point for rup CLI

use anyhow::Context;
use clap::Parser;
use rup::cli::output::{create_progress_callback, OutputFormatter};
use rup::cli::{Args, Command, VerbosityLevel};
use rup::core::{CredentialStore, FileCredentialStore, MemoryCredentialStore, SessionConfig, UploadSession};
use rup::platform::{Endpoints, HttpClientConfig};
use rup::RupError;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    // Parse command line arguments
    let args = Args::parse();
    let verbosity = args.verbosity_level();

    if let Err(e) = init_logging(verbosity) {
        eprintln!("Could not initialize logging: {}", e);
    }

    if let Err(err) = run(args).await {
        let message = match err.downcast_ref::<RupError>().and_then(RupError::code) {
            Some(code) => format!("{:#} (code {})", err, code),
            None => format!("{:#}", err),
        };
        OutputFormatter::new(verbosity).error(&message);
        std::process::exit(1);
    }
}

async fn run(args: Args) -> anyhow::Result<()> {
    if args.command == Command::Logout {
        // --no-save-credentials only affects saving, so logout still clears the file
        file_credential_store(&args)?
            .delete()
            .context("Could not delete saved credentials")?;
        OutputFormatter::new(args.verbosity_level()).success("Saved credentials deleted");
        return Ok(());
    }

    let store = credential_store(&args)?;
    let session = create_session(&args, store)?;

    // Ctrl-C cancels whatever the session is doing
    let interrupt = session.clone();
    let ctrl_c = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling");
            interrupt.cancel();
        }
    });

    let result = match &args.command {
        Command::Login { email, password } => {
            handle_login(&session, &args, email, password.clone()).await
        }
        Command::Upload {
            file,
            email,
            password,
            ..
        } => {
            if let Some(email) = email {
                handle_login(&session, &args, email, password.clone()).await?;
            }
            let metadata = args.command.metadata().unwrap_or_default();
            handle_upload(&session, &args, file, metadata).await
        }
        Command::Logout => Ok(()),
    };

    ctrl_c.abort();
    result
}

/// Build the credential store selected by the arguments
fn credential_store(args: &Args) -> anyhow::Result<Arc<dyn CredentialStore>> {
    if !args.save_credentials() {
        debug!("Credential saving disabled");
        return Ok(Arc::new(MemoryCredentialStore::new()));
    }
    Ok(Arc::new(file_credential_store(args)?))
}

fn file_credential_store(args: &Args) -> anyhow::Result<FileCredentialStore> {
    let path = args
        .credentials_path()
        .context("Cannot locate the home directory; pass --credentials-file")?;
    debug!("Using credentials file {}", path.display());
    Ok(FileCredentialStore::new(path))
}

fn create_session(args: &Args, store: Arc<dyn CredentialStore>) -> anyhow::Result<UploadSession> {
    let config = SessionConfig::new(args.developer_key.clone().unwrap_or_default())
        .with_save_credentials(args.save_credentials());

    let http_config = HttpClientConfig {
        timeout: args.timeout_duration(),
        user_agent: args.user_agent.clone(),
        proxy_url: args.proxy.clone(),
        ..Default::default()
    };

    let endpoints = match &args.api_base {
        Some(base) => Endpoints::with_base(base),
        None => Endpoints::default(),
    };

    UploadSession::with_http_transport(config, http_config, endpoints, store)
        .context("Could not create upload session")
}

/// Handle the login command
async fn handle_login(
    session: &UploadSession,
    args: &Args,
    email: &str,
    password: Option<String>,
) -> anyhow::Result<()> {
    let formatter = OutputFormatter::new(args.verbosity_level());
    let password = match password {
        Some(password) => password,
        None => read_password()?,
    };

    formatter.info(&format!("Logging in as {}", email));
    session.login(email, password).await.context("Login failed")?;
    info!("Login completed");

    formatter.success(&format!("Logged in as {}", email));
    if !args.save_credentials() {
        formatter.warning("Credentials were not saved (--no-save-credentials)");
    }
    Ok(())
}

/// Handle the upload command
async fn handle_upload(
    session: &UploadSession,
    args: &Args,
    file: &Path,
    metadata: rup::VideoMetadata,
) -> anyhow::Result<()> {
    let start_time = Instant::now();
    let mut formatter = OutputFormatter::new(args.verbosity_level());

    let size = tokio::fs::metadata(file).await.map(|m| m.len()).unwrap_or(0);
    formatter.print_upload_start(file, size);

    if !args.no_progress {
        formatter.create_progress_bar(size);
    }
    let formatter = Arc::new(formatter);

    if !args.no_progress {
        session.set_progress_callback(create_progress_callback(formatter.clone()));
        let state_formatter = formatter.clone();
        session.set_state_callback(move |state| state_formatter.update_state(state));
    }

    info!("Starting upload for {}", file.display());
    match session.upload(file, metadata).await {
        Ok(video) => {
            formatter.finish_progress("Upload completed!");
            formatter.print_upload_complete(&video, start_time.elapsed());
            Ok(())
        }
        Err(e) => {
            formatter.abandon_progress();
            Err(e).context("Upload failed")
        }
    }
}

/// Read a password line from stdin
fn read_password() -> anyhow::Result<String> {
    eprint!("Password: ");
    std::io::stderr().flush()?;

    let mut line = String::new();
    std::io::stdin()
        .read_line(&mut line)
        .context("Could not read password")?;

    let password = line.trim_end_matches(['\r', '\n']).to_string();
    if password.is_empty() {
        anyhow::bail!("Empty password");
    }
    Ok(password)
}

/// Initialize logging system
fn init_logging(verbosity: VerbosityLevel) -> anyhow::Result<()> {
    // RUST_LOG wins over the verbosity flags
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(verbosity.default_log_filter()));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_thread_ids(true)
                .with_file(true)
                .with_line_number(true)
                .compact(),
        )
        .try_init()?;

    Ok(())
}
