#![warn(missing_docs)]
//! # facegate binary
//!
//! Command-line shell over the login and registration flows.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use facegate_app::{
    AppError, AuthFlowController, ClientConfig, ConsoleNavigator, FlowDependencies,
    JsonFileStore, Route, SubmitDisposition, app_version, load_photo, telemetry, welcome_view,
};
use facegate_auth::{HttpTransport, ServiceClient};
use facegate_capture::{MediaCaptureController, NativeCamera};
use facegate_core::{FlowKind, FormField};
use facegate_ui::Notification;
use tracing::error;

#[derive(Parser, Debug)]
#[command(author, version = app_version(), about = "Face and pass phrase sign-in client")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Sign in with a pass phrase and photo.
    Login(PhotoArgs),
    /// Enroll a new account.
    Register {
        /// First name.
        #[arg(long)]
        first_name: String,
        /// Last name.
        #[arg(long)]
        last_name: String,
        /// Username.
        #[arg(long)]
        username: String,
        #[command(flatten)]
        photo: PhotoArgs,
    },
    /// Show the welcome view for the last signed-in identity.
    Welcome,
}

#[derive(Args, Debug)]
struct PhotoArgs {
    /// Pass phrase.
    #[arg(long, env = "FACEGATE_PASS_PHRASE", hide_env_values = true)]
    pass_phrase: String,
    /// Photo file to attach.
    #[arg(long, conflicts_with = "camera")]
    photo: Option<PathBuf>,
    /// Capture the photo from the default camera.
    #[arg(long)]
    camera: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    if let Err(error) = telemetry::init_tracing() {
        eprintln!("{error}");
    }

    match run(cli).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(error) => {
            error!(%error, "facegate failed");
            eprintln!("{error}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<bool, AppError> {
    let config = ClientConfig::from_env()?;
    let store = Arc::new(JsonFileStore::new(config.store_path.clone()));

    let (kind, fields, photo) = match cli.command {
        Command::Welcome => {
            return match welcome_view(store.as_ref())? {
                Some(greeting) => {
                    println!("{greeting}");
                    Ok(true)
                }
                None => {
                    println!("Nobody has signed in yet. Continue at {}", Route::Login);
                    Ok(false)
                }
            };
        }
        Command::Login(photo) => (
            FlowKind::Login,
            vec![(FormField::PassPhrase, photo.pass_phrase.clone())],
            photo,
        ),
        Command::Register {
            first_name,
            last_name,
            username,
            photo,
        } => (
            FlowKind::Register,
            vec![
                (FormField::FirstName, first_name),
                (FormField::LastName, last_name),
                (FormField::Username, username),
                (FormField::PassPhrase, photo.pass_phrase.clone()),
            ],
            photo,
        ),
    };

    let client = ServiceClient::new(
        &config.base_url,
        config.require_https,
        Arc::new(HttpTransport::new()?),
    )?
    .with_timeout(config.submit_timeout);
    let capture = MediaCaptureController::new(Arc::new(NativeCamera::default()))
        .with_enabled(config.camera_enabled);

    let flow = AuthFlowController::new(
        kind,
        config.flow_settings(kind),
        FlowDependencies {
            client,
            capture,
            store,
            navigator: Arc::new(ConsoleNavigator),
        },
    );

    for (field, value) in fields {
        flow.set_field(field, value)?;
    }
    if let Some(path) = &photo.photo {
        flow.select_file(load_photo(path).await?)?;
    } else if photo.camera {
        flow.open_camera().await?;
        flow.capture().await?;
    }

    let settled = match flow.submit().await {
        SubmitDisposition::Completed { .. } => {
            if let Notification::Message { text, .. } = flow.notification() {
                println!("{text}");
            }
            flow.follow_redirect().await.is_some()
        }
        SubmitDisposition::Invalid(reason) => {
            eprintln!("{reason}");
            false
        }
        other => {
            eprintln!("submission not sent: {other:?}");
            false
        }
    };

    println!("Other form: {}", Route::alternate(kind));
    flow.teardown();
    Ok(settled)
}
