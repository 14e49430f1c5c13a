use std::{path::Path, process, sync::Arc, time::Duration};

use clap::Parser;
use inkcast::{
    application::{
        error::AppError,
        ports::{ConfigWriteStore, GenerationPort},
        request::{OrchestratorOptions, Ports, RequestOrchestrator},
    },
    cache::CacheConfig,
    config::{self, CliArgs, Command, GenerationProvider, RenderArgs, Settings},
    domain::device::DeviceKey,
    infra::{
        context::{OpenMeteoWeather, SystemCalendar},
        error::InfraError,
        generation::{CannedGenerator, ChatCompletionsGenerator},
        http::{self, HttpState},
        store::MemoryConfigStore,
        telemetry,
    },
    presentation::SvgCardRenderer,
};
use tokio::io::AsyncWriteExt;
use tracing::{Dispatch, Level, dispatcher, error, info, warn};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt()
        .with_max_level(Level::ERROR)
        .with_writer(std::io::stderr)
        .finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let cli = CliArgs::parse();
    let settings = config::load(&cli)
        .map_err(|err| AppError::unexpected(format!("failed to load configuration: {err}")))?;

    telemetry::init(&settings.logging)?;

    match cli.command {
        Some(Command::Render(args)) => run_render(settings, args).await,
        Some(Command::Serve(_)) | None => run_serve(settings).await,
    }
}

struct Application {
    orchestrator: Arc<RequestOrchestrator>,
    store: Arc<MemoryConfigStore>,
}

async fn build_application(settings: &Settings) -> Result<Application, AppError> {
    let store = match settings.devices.seed_file.as_deref() {
        Some(path) => MemoryConfigStore::from_seed_file(path).await?,
        None => MemoryConfigStore::new(),
    };
    let store = Arc::new(store);

    let context = &settings.context;
    let mut calendar = SystemCalendar::new(context.timezone);
    if let Some(url) = context.holiday_url.clone() {
        calendar = calendar.with_holidays(url, context.holiday_timeout)?;
    }
    let weather = OpenMeteoWeather::new(
        context.weather_url.clone(),
        context.weather_timeout,
        context.default_city.clone(),
    )?;

    let ports = Ports {
        store: store.clone(),
        generator: build_generator(settings)?,
        renderer: Arc::new(SvgCardRenderer::new()),
        calendar: Arc::new(calendar),
        weather: Arc::new(weather),
    };
    let options = OrchestratorOptions {
        cache: CacheConfig::from(&settings.cache),
        full_voltage: settings.device.full_voltage,
        timezone: context.timezone,
    };

    info!(
        target = "inkcast::bootstrap",
        provider = ?settings.generation.provider,
        timezone = %context.timezone,
        devices = store.device_count(),
        coalesce_batches = settings.cache.coalesce_batches,
        "application assembled"
    );

    Ok(Application {
        orchestrator: Arc::new(RequestOrchestrator::assemble(ports, options)),
        store,
    })
}

fn build_generator(settings: &Settings) -> Result<Arc<dyn GenerationPort>, AppError> {
    let generation = &settings.generation;
    match generation.provider {
        GenerationProvider::Canned => Ok(Arc::new(CannedGenerator::new())),
        GenerationProvider::OpenAi => {
            let api_key = generation
                .api_key
                .clone()
                .ok_or_else(|| AppError::validation("generation.api_key is required"))?;
            let generator = ChatCompletionsGenerator::new(
                &generation.api_base,
                api_key,
                generation.model.clone(),
                generation.timeout,
            )?;
            Ok(Arc::new(generator))
        }
    }
}

async fn run_serve(settings: Settings) -> Result<(), AppError> {
    let app = build_application(&settings).await?;
    let store: Arc<dyn ConfigWriteStore> = app.store;
    let router = http::build_router(HttpState {
        orchestrator: app.orchestrator,
        store,
    });

    let listener = tokio::net::TcpListener::bind(settings.server.addr)
        .await
        .map_err(InfraError::from)?;
    info!(
        target = "inkcast::serve",
        addr = %settings.server.addr,
        "listening"
    );

    let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();
    let server = axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            let _ = stop_tx.send(());
        })
        .into_future();
    tokio::pin!(server);

    tokio::select! {
        result = &mut server => result.map_err(InfraError::from)?,
        () = drain_deadline(stop_rx, settings.server.graceful_shutdown) => {
            warn!(
                target = "inkcast::serve",
                timeout_secs = settings.server.graceful_shutdown.as_secs(),
                "graceful shutdown timed out; dropping open connections"
            );
        }
    }

    info!(target = "inkcast::serve", "server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(
            target = "inkcast::serve",
            error = %err,
            "failed to listen for shutdown signal"
        );
        std::future::pending::<()>().await;
    }
    info!(target = "inkcast::serve", "shutdown signal received");
}

/// Resolves once shutdown has started and `grace` has elapsed since.
async fn drain_deadline(started: tokio::sync::oneshot::Receiver<()>, grace: Duration) {
    if started.await.is_err() {
        std::future::pending::<()>().await;
    }
    tokio::time::sleep(grace).await;
}

async fn run_render(settings: Settings, args: RenderArgs) -> Result<(), AppError> {
    let app = build_application(&settings).await?;
    let device = args.mac.as_deref().and_then(DeviceKey::parse);

    let artifact = app
        .orchestrator
        .build_artifact(args.voltage, device.as_ref(), args.persona.as_deref())
        .await?;

    write_output(&args.output, &artifact.body).await?;
    info!(
        target = "inkcast::render",
        persona = artifact.persona.as_str(),
        bytes = artifact.len(),
        output = %args.output.display(),
        "artifact written"
    );
    Ok(())
}

async fn write_output(path: &Path, body: &[u8]) -> Result<(), InfraError> {
    if path.as_os_str() == "-" {
        let mut stdout = tokio::io::stdout();
        stdout.write_all(body).await?;
        stdout.flush().await?;
        return Ok(());
    }
    tokio::fs::write(path, body).await?;
    Ok(())
}
