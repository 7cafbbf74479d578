// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Strava Coverage command-line client
//!
//! Drives the coverage backend: login, activity import, city detection,
//! coverage summaries, custom areas, comment automation and map data.

use anyhow::{anyhow, Context};
use clap::{Args, Parser, Subcommand};
use geojson::{Feature, GeoJson};
use std::sync::Arc;
use strava_coverage::{
    config::Config,
    models::{maps, City, NewCustomArea},
    routes::{self, LoginHandoff},
    services::{
        drawing::GeoJsonSurface, AreaCoverageJob, AreaDrawingSession, AutomatedWorkflow,
        CitySelector, Clients, DrawEvent, DrawnArea, ImportJob, JobState, JobTracker,
        SettingsStore,
    },
    time_utils::describe_timestamp,
    AppState,
};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "strava-coverage", about = "Explore your Strava coverage of cities")]
struct Cli {
    /// Backend user ID
    #[arg(short, long, global = true, env = "COVERAGE_USER_ID")]
    user: Option<u64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Sign in with Strava through the local callback listener
    Login,
    /// Check that the backend is reachable
    Health,
    /// Import all activities and wait for the import to finish
    Import {
        /// Start the import without waiting for it
        #[arg(long)]
        no_wait: bool,
    },
    /// Import, detect cities and calculate coverage in one go
    Workflow,
    /// Show the coverage summary
    Summary,
    #[command(subcommand)]
    Cities(CitiesCommand),
    #[command(subcommand)]
    Areas(AreasCommand),
    #[command(subcommand)]
    Settings(SettingsCommand),
    #[command(subcommand)]
    Comments(CommentsCommand),
    #[command(subcommand)]
    Maps(MapsCommand),
}

#[derive(Subcommand, Debug)]
enum CitiesCommand {
    /// List stored cities
    List,
    /// Search cities; `--pick N` selects (and if needed creates) result N
    Search {
        query: String,
        #[arg(long)]
        pick: Option<usize>,
    },
    /// Coverage of one city
    Coverage { city_id: u64 },
}

#[derive(Subcommand, Debug)]
enum AreasCommand {
    List,
    /// Create an area from an encoded polyline or a GeoJSON polygon file
    Create(CreateAreaArgs),
    Delete { area_id: u64 },
    /// Calculate coverage for an area
    Calculate {
        area_id: u64,
        #[arg(long)]
        no_wait: bool,
    },
    /// Print all areas as a GeoJSON FeatureCollection
    Export,
}

#[derive(Args, Debug)]
struct CreateAreaArgs {
    /// Area name; defaults to "Custom Area N" for GeoJSON input
    #[arg(long)]
    name: Option<String>,
    /// Outline as an encoded polyline (precision 5)
    #[arg(long, conflicts_with = "geojson")]
    polyline: Option<String>,
    /// Path to a GeoJSON Feature with a Polygon geometry
    #[arg(long)]
    geojson: Option<std::path::PathBuf>,
    /// Start a coverage calculation right away
    #[arg(long)]
    calculate: bool,
}

#[derive(Subcommand, Debug)]
enum SettingsCommand {
    Show,
    Set(SettingsArgs),
}

#[derive(Args, Debug)]
struct SettingsArgs {
    #[arg(long)]
    enabled: Option<bool>,
    #[arg(long)]
    custom_areas: Option<bool>,
    #[arg(long)]
    template: Option<String>,
    #[arg(long)]
    min_increase: Option<f64>,
    #[arg(long)]
    running: Option<bool>,
    #[arg(long)]
    cycling: Option<bool>,
    #[arg(long)]
    walking: Option<bool>,
    #[arg(long)]
    hiking: Option<bool>,
    #[arg(long)]
    ebiking: Option<bool>,
    #[arg(long)]
    skiing: Option<bool>,
}

#[derive(Subcommand, Debug)]
enum CommentsCommand {
    /// Coverage increases that could be commented on
    Increases,
    /// Post comments for pending increases
    Process,
}

#[derive(Subcommand, Debug)]
enum MapsCommand {
    /// Activity tracks by type
    Activities,
    /// Covered streets in one city
    Coverage { city_id: u64 },
    Config,
    Styles,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();

    let cli = Cli::parse();
    let config = Config::from_env().context("Failed to load configuration")?;
    tracing::debug!(api_url = %config.api_url, "Configuration loaded");

    let clients = Clients::new(strava_coverage::services::ApiClient::from_config(&config)?);
    let tracker = JobTracker::new();

    let result = run(&cli, &config, &clients, &tracker).await;
    tracker.shutdown();
    result
}

async fn run(cli: &Cli, config: &Config, clients: &Clients, tracker: &JobTracker) -> anyhow::Result<()> {
    match &cli.command {
        Command::Login => login(config).await,
        Command::Health => {
            let health = clients.api.health().await?;
            println!("{}", serde_json::to_string_pretty(&health)?);
            Ok(())
        }
        Command::Import { no_wait } => import(clients, tracker, config, require_user(cli)?, *no_wait).await,
        Command::Workflow => workflow(clients, tracker, config, require_user(cli)?).await,
        Command::Summary => summary(clients, require_user(cli)?).await,
        Command::Cities(cmd) => cities(clients, cli.user, cmd).await,
        Command::Areas(cmd) => areas(clients, tracker, config, require_user(cli)?, cmd).await,
        Command::Settings(cmd) => settings(clients, require_user(cli)?, cmd).await,
        Command::Comments(cmd) => comments(clients, require_user(cli)?, cmd).await,
        Command::Maps(cmd) => maps_command(clients, require_user(cli)?, cmd).await,
    }
}

fn require_user(cli: &Cli) -> anyhow::Result<u64> {
    cli.user
        .ok_or_else(|| anyhow!("No user given: pass --user or set COVERAGE_USER_ID (run `login` first)"))
}

/// Run the callback listener until the backend redirects back to it.
async fn login(config: &Config) -> anyhow::Result<()> {
    let (handoff, result) = LoginHandoff::new();
    let state = Arc::new(AppState {
        config: config.clone(),
        login: handoff,
    });
    let app = routes::create_router(state);

    let addr = format!("127.0.0.1:{}", config.callback_port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to listen on {}", addr))?;
    tracing::info!(address = %addr, "Callback listener ready");

    println!("Open this URL in your browser to connect Strava:\n\n  {}\n", config.login_url());

    let stop = CancellationToken::new();
    let server = {
        let stop = stop.clone();
        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move { stop.cancelled().await })
                .await
        })
    };

    let outcome = tokio::select! {
        received = result => received.map_err(|_| anyhow!("Callback listener stopped")),
        _ = tokio::signal::ctrl_c() => Err(anyhow!("Login cancelled")),
    };

    stop.cancel();
    if let Ok(Err(e)) = server.await {
        tracing::warn!(error = %e, "Callback listener error");
    }

    let user = outcome??;
    println!("Logged in as {} (user {}, Strava athlete {}).", user.name, user.id, user.strava_id);
    println!("export COVERAGE_USER_ID={}", user.id);
    Ok(())
}

async fn import(
    clients: &Clients,
    tracker: &JobTracker,
    config: &Config,
    user_id: u64,
    no_wait: bool,
) -> anyhow::Result<()> {
    if no_wait {
        clients.imports.start_initial(user_id).await?;
        println!("Import started.");
        return Ok(());
    }

    let job = ImportJob::new(clients.imports.clone(), user_id);
    let handle = tracker
        .start(job, config.import_polling(), |event| {
            if let JobState::Polling {
                snapshot: Some(status),
            } = &event.state
            {
                println!("{}", status.progress_message());
            }
        })
        .await?;

    tokio::select! {
        status = handle.wait() => println!("{}", status?.progress_message()),
        _ = tokio::signal::ctrl_c() => {
            handle.cancel();
            println!("Stopped waiting; the import continues on the server.");
        }
    }
    Ok(())
}

async fn workflow(clients: &Clients, tracker: &JobTracker, config: &Config, user_id: u64) -> anyhow::Result<()> {
    let workflow = AutomatedWorkflow::new(clients.clone(), tracker.clone(), config.import_polling());
    let outcome = workflow
        .run(user_id, |progress| println!("[{:?}] {}", progress.step, progress.message))
        .await?;

    println!(
        "Imported {} activities, found {} cities.",
        outcome.import.imported_count, outcome.cities_found
    );
    print_summary(&outcome.summary);
    Ok(())
}

async fn summary(clients: &Clients, user_id: u64) -> anyhow::Result<()> {
    let (status, summary) = tokio::join!(
        clients.imports.status(user_id),
        clients.coverage.summary(user_id)
    );

    match status {
        Ok(status) => println!(
            "Activities: {} imported, {} processed, {} failed (last import: {}){}",
            status.imported_count,
            status.processed_count,
            status.failed_count,
            describe_timestamp(status.last_import_time.as_deref()),
            if status.in_progress { " - import running" } else { "" }
        ),
        Err(e) if e.is_not_found() => println!("No activities imported yet."),
        Err(e) => return Err(e.into()),
    }

    print_summary(&summary?);
    Ok(())
}

fn print_summary(summary: &strava_coverage::models::CoverageSummary) {
    if summary.is_empty() {
        println!("No coverage calculated yet.");
        return;
    }

    let stats = &summary.global_stats;
    println!(
        "{} cities, {:.1} km covered, average coverage {:.1}%",
        summary.total_cities, stats.total_distance_covered_km, stats.average_coverage_percent
    );
    for city in summary.top_cities(5) {
        println!(
            "  {:<24} {:>2} {:>6.1}%  {:>7.1} / {:.1} km  ({} activities)",
            city.city_name,
            city.country_code,
            city.coverage_percent,
            city.distance_covered_km,
            city.total_distance_km,
            city.activity_count
        );
    }
}

async fn cities(clients: &Clients, user: Option<u64>, cmd: &CitiesCommand) -> anyhow::Result<()> {
    match cmd {
        CitiesCommand::List => {
            for city in clients.cities.list().await? {
                print_city(&city);
            }
        }
        CitiesCommand::Search { query, pick } => {
            let known = clients.cities.list().await.unwrap_or_default();
            let selector = CitySelector::new(clients.cities.clone(), known, |city_id| {
                tracing::info!(city_id, "City selected");
            });

            let found = selector.search(query).await;
            if let Some(error) = &found.error {
                eprintln!("{}", error);
            }

            match pick {
                None => {
                    for (i, city) in found.cities.iter().enumerate() {
                        print!("{:>3}. ", i + 1);
                        print_city(city);
                    }
                }
                Some(n) => {
                    let city = n
                        .checked_sub(1)
                        .and_then(|i| found.cities.get(i))
                        .ok_or_else(|| anyhow!("No search result #{}", n))?;
                    let city_id = selector.select(city).await?;
                    println!("Selected {} (city {})", city.name(), city_id);
                    if let Some(user_id) = user {
                        print_city_coverage(clients, user_id, city_id).await?;
                    }
                }
            }
        }
        CitiesCommand::Coverage { city_id } => {
            let user_id = user.ok_or_else(|| anyhow!("No user given: pass --user"))?;
            print_city_coverage(clients, user_id, *city_id).await?;
        }
    }
    Ok(())
}

fn print_city(city: &City) {
    match city {
        City::Persisted(c) => println!("{:>6}  {} ({})", c.id, c.name, c.country_code),
        City::Candidate(c) => println!(
            "   new  {} ({}) at {:.4}, {:.4}",
            c.name, c.country_code, c.latitude, c.longitude
        ),
    }
}

async fn print_city_coverage(clients: &Clients, user_id: u64, city_id: u64) -> anyhow::Result<()> {
    let report = clients.coverage.city(user_id, city_id).await?;
    println!(
        "Coverage: {:.1}% ({:.1} of {:.1} km, {} activities)",
        report.coverage_percent,
        report.distance_covered_km,
        report.total_distance_km,
        report.activity_count
    );
    Ok(())
}

async fn areas(
    clients: &Clients,
    tracker: &JobTracker,
    config: &Config,
    user_id: u64,
    cmd: &AreasCommand,
) -> anyhow::Result<()> {
    let settings = SettingsStore::new(clients.comments.clone());
    if !settings.custom_areas_enabled(user_id).await {
        println!("Note: custom areas are disabled in your settings (settings set --custom-areas true).");
    }

    match cmd {
        AreasCommand::List => {
            for area in clients.custom_areas.list(user_id).await? {
                println!(
                    "{:>6}  {:<30} {:>3} vertices  {}",
                    area.id,
                    area.name,
                    area.coordinates.len(),
                    area.coverage_label().unwrap_or_else(|| "Coverage: -".to_string())
                );
            }
        }
        AreasCommand::Create(args) => {
            let area = new_area(args)?;
            let created = clients.custom_areas.create(user_id, &area).await?;
            println!("Created area {} ({})", created.id, created.name);
            if args.calculate {
                calculate_area(clients, tracker, config, created.id, false).await?;
            }
        }
        AreasCommand::Delete { area_id } => {
            clients.custom_areas.delete(*area_id).await?;
            println!("Deleted area {}", area_id);
        }
        AreasCommand::Calculate { area_id, no_wait } => {
            calculate_area(clients, tracker, config, *area_id, *no_wait).await?;
        }
        AreasCommand::Export => {
            let areas = clients.custom_areas.list(user_id).await?;
            let drawn: Vec<DrawnArea> = areas.iter().map(DrawnArea::from).collect();

            let mut session = AreaDrawingSession::new(GeoJsonSurface::new());
            session.render(&drawn)?;
            let collection = session
                .surface()
                .map(GeoJsonSurface::to_feature_collection)
                .ok_or_else(|| anyhow!("Map surface already disposed"))?;
            println!("{}", serde_json::to_string(&GeoJson::FeatureCollection(collection))?);
        }
    }
    Ok(())
}

fn new_area(args: &CreateAreaArgs) -> anyhow::Result<NewCustomArea> {
    if let Some(encoded) = &args.polyline {
        let name = args
            .name
            .as_deref()
            .ok_or_else(|| anyhow!("--name is required with --polyline"))?;
        return Ok(NewCustomArea::from_polyline(name, encoded)?);
    }

    let path = args
        .geojson
        .as_ref()
        .ok_or_else(|| anyhow!("Give the outline with --polyline or --geojson"))?;
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let feature = match raw.parse::<GeoJson>()? {
        GeoJson::Feature(feature) => feature,
        GeoJson::Geometry(geometry) => Feature::from(geometry),
        GeoJson::FeatureCollection(fc) => fc
            .features
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("{} has no features", path.display()))?,
    };

    let mut session = AreaDrawingSession::new(GeoJsonSurface::new());
    let drawn = session
        .handle_event(DrawEvent::Created(feature))?
        .ok_or_else(|| anyhow!("No area in {}", path.display()))?;
    let name = args.name.clone().unwrap_or(drawn.name);
    Ok(NewCustomArea::new(&name, drawn.coordinates))
}

async fn calculate_area(
    clients: &Clients,
    tracker: &JobTracker,
    config: &Config,
    area_id: u64,
    no_wait: bool,
) -> anyhow::Result<()> {
    if no_wait {
        clients.custom_areas.calculate_coverage(area_id).await?;
        println!("Coverage calculation started for area {}", area_id);
        return Ok(());
    }

    println!("Calculating coverage for area {}...", area_id);
    let job = AreaCoverageJob::new(clients.custom_areas.clone(), area_id);
    let handle = tracker.start(job, config.area_polling(), |_| {}).await?;
    let area = handle.wait().await?;
    println!(
        "{}: {}",
        area.name,
        area.coverage_label().unwrap_or_else(|| "no coverage".to_string())
    );
    Ok(())
}

async fn settings(clients: &Clients, user_id: u64, cmd: &SettingsCommand) -> anyhow::Result<()> {
    use strava_coverage::models::ActivityGroup;

    let store = SettingsStore::new(clients.comments.clone());
    let settings = match cmd {
        SettingsCommand::Show => store.get(user_id).await?,
        SettingsCommand::Set(args) => {
            store
                .update(user_id, |s| {
                    if let Some(v) = args.enabled {
                        s.enabled = v;
                    }
                    if let Some(v) = args.custom_areas {
                        s.custom_areas_enabled = v;
                    }
                    if let Some(v) = &args.template {
                        s.comment_template = v.clone();
                    }
                    if let Some(v) = args.min_increase {
                        s.min_coverage_increase = v;
                    }
                    let toggles = [
                        (ActivityGroup::Running, args.running),
                        (ActivityGroup::Cycling, args.cycling),
                        (ActivityGroup::Walking, args.walking),
                        (ActivityGroup::Hiking, args.hiking),
                        (ActivityGroup::EBiking, args.ebiking),
                        (ActivityGroup::Skiing, args.skiing),
                    ];
                    for (group, value) in toggles {
                        if let Some(v) = value {
                            s.set_group_enabled(group, v);
                        }
                    }
                })
                .await?
        }
    };

    println!("Auto comments: {}", on_off(settings.enabled));
    for group in [
        ActivityGroup::Running,
        ActivityGroup::Cycling,
        ActivityGroup::Walking,
        ActivityGroup::Hiking,
        ActivityGroup::EBiking,
        ActivityGroup::Skiing,
    ] {
        println!("  {:<28} {}", group.label(), on_off(settings.group_enabled(group)));
    }
    println!("Template: {}", settings.comment_template);
    println!("Example: {}", settings.render_comment("Sheffield", 12.3));
    println!("Minimum increase: {:.1}%", settings.min_coverage_increase);
    println!("Custom areas: {}", on_off(settings.custom_areas_enabled));
    Ok(())
}

fn on_off(value: bool) -> &'static str {
    if value {
        "on"
    } else {
        "off"
    }
}

async fn comments(clients: &Clients, user_id: u64, cmd: &CommentsCommand) -> anyhow::Result<()> {
    match cmd {
        CommentsCommand::Increases => {
            let store = SettingsStore::new(clients.comments.clone());
            let (settings, increases) = tokio::join!(
                store.get(user_id),
                clients.comments.coverage_increases(user_id)
            );
            let settings = settings.ok();

            for increase in increases? {
                let marker = match &settings {
                    Some(s) if s.qualifies(&increase) => "*",
                    _ => " ",
                };
                println!(
                    "{} {}  {:<20} {:>5.1}% -> {:>5.1}% (+{:.1})  {} activity {}",
                    marker,
                    increase.activity_date,
                    increase.city_name,
                    increase.previous_coverage,
                    increase.new_coverage,
                    increase.increase,
                    increase.activity_type,
                    increase.activity_id
                );
            }
        }
        CommentsCommand::Process => {
            let result = clients.comments.process(user_id).await?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
    }
    Ok(())
}

async fn maps_command(clients: &Clients, user_id: u64, cmd: &MapsCommand) -> anyhow::Result<()> {
    match cmd {
        MapsCommand::Activities => {
            let layer = clients.maps.activities(user_id).await?;
            print_layer(&layer);

            if let GeoJson::FeatureCollection(fc) = &layer {
                let mut by_type: std::collections::BTreeMap<String, usize> = Default::default();
                for feature in &fc.features {
                    let kind = feature
                        .property("activity_type")
                        .and_then(|v| v.as_str())
                        .unwrap_or("Unknown");
                    *by_type.entry(kind.to_string()).or_default() += 1;
                }
                for (kind, count) in by_type {
                    println!("  {:<18} {:>5}  {}", kind, count, maps::activity_color(Some(&kind), None));
                }
            }
        }
        MapsCommand::Coverage { city_id } => {
            let layer = clients.maps.coverage(user_id, *city_id).await?;
            print_layer(&layer);
        }
        MapsCommand::Config => {
            println!("{}", serde_json::to_string_pretty(&clients.maps.config().await?)?);
        }
        MapsCommand::Styles => {
            println!("{}", serde_json::to_string_pretty(&clients.maps.styles().await?)?);
        }
    }
    Ok(())
}

fn print_layer(layer: &GeoJson) {
    println!("{} features", maps::feature_count(layer));
    match maps::feature_bounds(layer) {
        Some(bounds) => println!(
            "Bounds: {:.5},{:.5} to {:.5},{:.5} (lat,lng)",
            bounds.min().y,
            bounds.min().x,
            bounds.max().y,
            bounds.max().x
        ),
        None => println!("Bounds: empty"),
    }
}

/// Initialize logging to stderr; JSON when `LOG_FORMAT=json`.
fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("strava_coverage=info,warn"));
    let json = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(false)
                    .with_current_span(true)
                    .flatten_event(true)
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .compact()
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}
