use anyhow::Result;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

use animal_family::backend::{self, Backend, ImageFile};
use animal_family::bridge::{HostBridge, InitDataBridge, NoHost, Session};
use animal_family::config;
use animal_family::geo::FixedPosition;
use animal_family::model::AnnouncementId;
use animal_family::pages::{
    AdminPage, AnnouncementsPage, CabinetPage, ConsoleAlerts, CreatePage, HomePage, PageContext,
};
use animal_family::view;

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// Path to YAML config file
    #[arg(long, default_value = "config.yaml")]
    config: PathBuf,

    /// Telegram WebApp initData (or a bare user JSON object). Falls back to
    /// TELEGRAM_INIT_DATA; absent means the app is not embedded.
    #[arg(long)]
    init_data: Option<String>,

    /// Telegram themeParams JSON
    #[arg(long)]
    theme: Option<String>,

    /// Write the rendered page here instead of stdout
    #[arg(long)]
    out: Option<PathBuf>,

    #[command(subcommand)]
    page: PageCommand,
}

#[derive(Debug, Subcommand)]
enum PageCommand {
    /// Latest announcements and the city prompt
    Home {
        /// Save this city to your profile
        #[arg(long)]
        city: Option<String>,
    },
    /// All published announcements
    Announcements,
    /// Submit a new announcement for moderation
    Create {
        #[arg(long, default_value = "")]
        title: String,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long)]
        image: Option<PathBuf>,
        #[arg(long, allow_hyphen_values = true)]
        lat: Option<f64>,
        #[arg(long, allow_hyphen_values = true)]
        lng: Option<f64>,
    },
    /// Pet passport; saves when --pet-name is given
    Cabinet {
        #[arg(long)]
        pet_name: Option<String>,
        /// Date of birth, YYYY-MM-DD
        #[arg(long)]
        dob: Option<NaiveDate>,
        #[arg(long)]
        allergies: Option<String>,
        #[arg(long)]
        vaccinations: Option<String>,
        #[arg(long)]
        habits: Option<String>,
        #[arg(long)]
        notes: Option<String>,
        #[arg(long)]
        image: Option<PathBuf>,
    },
    /// Moderation queue
    Admin {
        #[command(subcommand)]
        action: Option<AdminAction>,
    },
}

#[derive(Debug, Subcommand)]
enum AdminAction {
    /// Publish a pending announcement
    Approve { id: String },
    /// Delete a pending announcement
    Reject { id: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();

    let args = Args::parse();
    let cfg = Arc::new(config::load(Some(&args.config))?);
    let backend: Arc<dyn Backend> = backend::shared(&cfg)?;

    let init_data = args
        .init_data
        .clone()
        .or_else(|| std::env::var("TELEGRAM_INIT_DATA").ok());
    let bridge: Box<dyn HostBridge> = match init_data {
        Some(raw) => match InitDataBridge::from_init_data(&raw, args.theme.as_deref()) {
            Ok(bridge) => Box::new(bridge),
            Err(err) => {
                warn!(?err, "host integration failed; running without host");
                Box::new(NoHost)
            }
        },
        None => Box::new(NoHost),
    };

    let mut session = Session::bootstrap(bridge.as_ref(), backend.clone());
    let identity_sync = session.take_background();
    let ctx = PageContext::new(
        backend,
        Arc::new(ConsoleAlerts),
        Arc::new(session),
        cfg.clone(),
    );

    let body = run_page(args.page, &ctx).await?;
    let html = view::document(ctx.session.theme(), &body);
    match &args.out {
        Some(path) => {
            tokio::fs::write(path, html).await?;
            info!(path = %path.display(), "page written");
        }
        None => println!("{}", html),
    }

    if let Some(handle) = identity_sync {
        if let Err(err) = handle.await {
            warn!(?err, "identity sync task aborted");
        }
    }
    Ok(())
}

async fn run_page(page: PageCommand, ctx: &PageContext) -> Result<String> {
    let body = match page {
        PageCommand::Home { city } => {
            let mut home = HomePage::default();
            home.mount(ctx).await;
            if let Some(city) = city {
                home.city_input = city;
                home.save_city(ctx).await;
            }
            home.render(ctx)
        }
        PageCommand::Announcements => {
            let mut list = AnnouncementsPage::default();
            list.mount(ctx).await;
            list.render(ctx)
        }
        PageCommand::Create {
            title,
            description,
            image,
            lat,
            lng,
        } => {
            let mut create = CreatePage::default();
            create.mount(&FixedPosition::from_coords(lat, lng)).await;
            create.form.title = title;
            create.form.description = description;
            create.form.image = load_image(image).await;
            create.submit(ctx).await;
            create.render(ctx)
        }
        PageCommand::Cabinet {
            pet_name,
            dob,
            allergies,
            vaccinations,
            habits,
            notes,
            image,
        } => {
            let mut cabinet = CabinetPage::default();
            cabinet.mount(ctx).await;
            if let Some(name) = pet_name {
                let pet = &mut cabinet.pet;
                pet.pet_name = name;
                pet.date_of_birth = dob.or(pet.date_of_birth);
                pet.allergies = allergies.or(pet.allergies.take());
                pet.vaccinations = vaccinations.or(pet.vaccinations.take());
                pet.habits = habits.or(pet.habits.take());
                pet.additional_info = notes.or(pet.additional_info.take());
                cabinet.image = load_image(image).await;
                cabinet.save(ctx).await;
            }
            cabinet.render(ctx)
        }
        PageCommand::Admin { action } => {
            let mut admin = AdminPage::default();
            admin.mount(ctx).await;
            match action {
                Some(AdminAction::Approve { id }) => {
                    admin.approve(ctx, &AnnouncementId::parse(&id)).await
                }
                Some(AdminAction::Reject { id }) => {
                    admin.reject(ctx, &AnnouncementId::parse(&id)).await
                }
                None => {}
            }
            admin.render(ctx)
        }
    };
    Ok(body)
}

/// A missing or unreadable file is reported and treated as "no image".
async fn load_image(path: Option<PathBuf>) -> Option<ImageFile> {
    let path = path?;
    match ImageFile::from_path(&path).await {
        Ok(file) => Some(file),
        Err(err) => {
            warn!(?err, path = %path.display(), "ignoring image");
            None
        }
    }
}
