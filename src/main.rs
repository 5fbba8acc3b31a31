use anyhow::Result;
use clap::Parser;
use grainometer::camera::{CameraAdapterBuilder, CameraDevice};
use grainometer::submission::{AnalysisResult, GradingService, HttpGradingService};
use grainometer::workflow::{Mode, WorkflowController};
use grainometer::{GrainometerConfig, LocalFile};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(name = "grainometer")]
#[command(about = "Grade a rice sample from a camera snapshot or an image file")]
#[command(version)]
#[command(long_about = "Acquires one rice sample image (from a local file or a camera snapshot), \
submits it to the Grain-O-Meter grading service, and prints the head/broken rice counts and \
the resulting grade.")]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "grainometer.toml", help = "Path to TOML configuration file")]
    config: String,

    /// Image file to grade
    #[arg(short, long, value_name = "PATH", conflicts_with = "camera")]
    file: Option<PathBuf>,

    /// Take a snapshot from the camera instead of reading a file
    #[arg(long, help = "Capture the sample with the camera")]
    camera: bool,

    /// Viewport width used to pick the camera facing
    #[arg(long, value_name = "PIXELS", help = "Viewport width; below the handheld threshold the rear camera is used")]
    viewport_width: Option<u32>,

    /// Check that the grading service is reachable and exit
    #[arg(long, help = "Check that the grading service is reachable and exit")]
    health_check: bool,

    /// Print the result as JSON
    #[arg(long, help = "Print the grading result as JSON")]
    json: bool,

    /// Write the annotated image returned by the service
    #[arg(long, value_name = "PATH", help = "Save the annotated image returned by the service")]
    save_annotated: Option<PathBuf>,

    /// Enable debug logging (most verbose)
    #[arg(short, long, help = "Enable debug level logging")]
    debug: bool,

    /// Enable verbose logging (info level)
    #[arg(short, long, help = "Enable verbose info level logging")]
    verbose: bool,

    /// Enable quiet mode (errors only)
    #[arg(short, long, help = "Enable quiet mode - only log errors")]
    quiet: bool,

    /// Validate configuration and exit
    #[arg(long, help = "Validate configuration file and exit")]
    validate_config: bool,

    /// Print default configuration and exit
    #[arg(long, help = "Print default configuration in TOML format and exit")]
    print_config: bool,

    /// Override log format (json, pretty, compact)
    #[arg(long, value_name = "FORMAT", help = "Log output format: json, pretty, or compact")]
    log_format: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if args.print_config {
        print_default_config()?;
        return Ok(());
    }

    init_logging(&args)?;

    info!("Starting Grain-O-Meter client v{}", env!("CARGO_PKG_VERSION"));

    let mut config = match GrainometerConfig::load_from_file(&args.config) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    if let Some(width) = args.viewport_width {
        config.session.viewport_width = width;
    }

    if let Err(e) = config.validate() {
        error!("Configuration validation failed: {}", e);
        eprintln!("✗ Configuration validation failed: {}", e);
        std::process::exit(1);
    }

    if args.validate_config {
        println!("✓ Configuration is valid");
        return Ok(());
    }

    let service = Arc::new(HttpGradingService::new(&config.service)?);

    if args.health_check {
        if service.health_check().await {
            println!("✓ Grading service is reachable at {}", config.service.url);
            return Ok(());
        }
        eprintln!("✗ Grading service is not reachable at {}", config.service.url);
        std::process::exit(1);
    }

    if args.file.is_none() && !args.camera {
        eprintln!("Nothing to grade: pass --file <PATH> or --camera");
        std::process::exit(2);
    }

    let camera = CameraAdapterBuilder::new()
        .config(config.camera.clone())
        .device(create_camera_device(&config)?)
        .build()?;
    let mut controller = WorkflowController::new(&config, camera, service);

    let exit_code = run(&mut controller, &args).await?;
    controller.shutdown();

    if exit_code != 0 {
        std::process::exit(exit_code);
    }
    Ok(())
}

async fn run(controller: &mut WorkflowController, args: &Args) -> Result<i32> {
    match &args.file {
        Some(path) => controller.choose_file(&LocalFile::new(path)).await?,
        None => {
            controller.start_capture().await?;
            if controller.mode() == Mode::Capturing {
                controller.take_snapshot().await?;
            }
        }
    }

    if controller.mode() != Mode::Previewing {
        report_failure(controller);
        return Ok(1);
    }

    controller.submit().await?;
    controller.wait_for_submission().await?;

    let Some(result) = controller.state().current_result() else {
        report_failure(controller);
        return Ok(1);
    };

    print_result(result, args.json)?;

    if let Some(path) = &args.save_annotated {
        match &result.annotated_image {
            Some(image) => {
                tokio::fs::write(path, image.to_bytes()?).await?;
                info!("Annotated image written to {}", path.display());
            }
            None => warn!("The grading service returned no annotated image"),
        }
    }

    Ok(0)
}

fn report_failure(controller: &WorkflowController) {
    match controller.state().last_error() {
        Some(failure) => eprintln!("✗ {} ({})", failure, failure.kind()),
        None => eprintln!("✗ Workflow stopped in {:?}", controller.mode()),
    }
}

fn print_result(result: &AnalysisResult, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(result)?);
        return Ok(());
    }

    println!("Head rice:   {}", result.head_rice_count);
    println!("Broken rice: {}", result.broken_rice_count);
    if let Some(total) = result.total_grains {
        println!("Total:       {}", total);
    }
    println!("Grade:       {}", result.grade);
    println!("Head rice %: {:.2}", result.head_rice_percentage);
    Ok(())
}

#[cfg(all(feature = "gstreamer", target_os = "linux"))]
fn create_camera_device(config: &GrainometerConfig) -> Result<Box<dyn CameraDevice>> {
    let device = grainometer::camera::GstCameraDevice::new(&config.camera)?;
    Ok(Box::new(device))
}

#[cfg(not(all(feature = "gstreamer", target_os = "linux")))]
fn create_camera_device(_config: &GrainometerConfig) -> Result<Box<dyn CameraDevice>> {
    warn!("Built without GStreamer support; using the synthetic camera");
    Ok(Box::new(grainometer::camera::MockCameraDevice::new()))
}

fn init_logging(args: &Args) -> Result<()> {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

    let log_level = if args.debug {
        "debug"
    } else if args.verbose {
        "info"
    } else if args.quiet {
        "error"
    } else {
        "warn"
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("grainometer={}", log_level)));

    let fmt_layer = match args.log_format.as_deref() {
        Some("json") => fmt::layer()
            .json()
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .with_writer(std::io::stderr)
            .boxed(),
        Some("compact") => fmt::layer()
            .compact()
            .with_target(false)
            .with_writer(std::io::stderr)
            .boxed(),
        Some("pretty") | None => fmt::layer()
            .pretty()
            .with_target(true)
            .with_thread_ids(args.debug)
            .with_file(args.debug)
            .with_line_number(args.debug)
            .with_writer(std::io::stderr)
            .boxed(),
        Some(format) => {
            eprintln!("Warning: Unknown log format '{}', using default", format);
            fmt::layer()
                .with_target(true)
                .with_writer(std::io::stderr)
                .boxed()
        }
    };

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(env_filter)
        .init();

    Ok(())
}

/// Print default configuration in TOML format
fn print_default_config() -> Result<()> {
    println!("# Grain-O-Meter client configuration");
    println!("# Every key can be overridden with GRAINOMETER_<SECTION>__<KEY>");
    println!();
    println!("{}", toml::to_string_pretty(&GrainometerConfig::default())?);
    Ok(())
}
