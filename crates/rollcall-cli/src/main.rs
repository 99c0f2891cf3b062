use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use rollcall_core::enroll::{self, CaptureOutcome, ANOTHER_ANGLE, ANOTHER_IMAGE};
use rollcall_core::session::DOUBLE_RULE;
use rollcall_core::{ingest, recognize};
use rollcall_core::{Console, FaceLocator, FaceStore, FrameSource, SessionError};
use rollcall_cv::cascade::FRONTAL_FACE_CASCADE;
use rollcall_cv::{default_cascade_path, Camera, HaarLocator, LbphMatcher, Window};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod config;
mod console;

use config::Config;
use console::StdConsole;

const ENROLL_WINDOW: &str = "Face Enrollment - Press SPACE to capture, ESC to cancel";
const IMAGE_WINDOW: &str = "Detected Faces - Press any key to continue";
const RECOGNIZE_WINDOW: &str = "Face Recognition";

#[derive(Parser)]
#[command(name = "rollcall", about = "Enroll faces and recognize them from a webcam")]
struct Cli {
    /// Config file (default: $XDG_CONFIG_HOME/rollcall/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Face store directory
    #[arg(long, global = true)]
    faces_dir: Option<PathBuf>,

    /// Camera device index
    #[arg(long, global = true)]
    camera: Option<i32>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Enroll a face from the live camera
    Enroll,
    /// Enroll a face from an image file
    EnrollImage {
        /// Image path; prompted for when omitted
        path: Option<String>,
    },
    /// Recognize enrolled faces from the live camera
    Recognize,
    /// List enrolled people
    List {
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Run camera diagnostics
    Test,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = Config::load(cli.config.as_deref())?;
    config.apply_flags(cli.faces_dir, cli.camera);
    tracing::debug!(?config, "resolved configuration");

    let mut console = StdConsole::stdio();

    match cli.command {
        Commands::Enroll => enroll_live(&config, &mut console),
        Commands::EnrollImage { path } => enroll_image(&config, path, &mut console),
        Commands::Recognize => recognize_live(&config, &mut console),
        Commands::List { json } => list(&config, json),
        Commands::Test => camera_test(&config),
    }
}

fn banner(console: &mut dyn Console, title: &str) {
    console.say(DOUBLE_RULE);
    console.say(title);
    console.say(DOUBLE_RULE);
}

fn load_locator(config: &Config) -> Result<HaarLocator> {
    let path = config
        .cascade_path
        .clone()
        .or_else(default_cascade_path)
        .ok_or_else(|| {
            anyhow!(
                "{FRONTAL_FACE_CASCADE} not found in the standard OpenCV locations; \
                 set ROLLCALL_CASCADE_PATH or cascade_path in the config"
            )
        })?;
    HaarLocator::load(&path).context("loading face detector")
}

fn enroll_live(config: &Config, console: &mut dyn Console) -> Result<()> {
    banner(console, "FACE ENROLLMENT SYSTEM");
    console.say("");
    console.say("Instructions:");
    console.say("- Position your face in front of the camera");
    console.say("- Press SPACE when ready to capture");
    console.say("- Press ESC to cancel");
    console.say("");
    console.say("💡 TIP: For best results, enroll 3-5 images:");
    console.say("   1. Looking straight at camera");
    console.say("   2. Head turned slightly left");
    console.say("   3. Head turned slightly right");
    console.say("   4. Looking slightly up");
    console.say("   5. Looking slightly down");
    console.say("");

    let store = FaceStore::new(&config.faces_dir);
    let mut locator = load_locator(config)?;

    let stored = enroll::repeat_enrollment(console, &ANOTHER_ANGLE, |console| {
        let camera = Camera::open(config.camera_index).map_err(SessionError::source_failed)?;
        let window = Window::new(ENROLL_WINDOW);
        match enroll::capture_live(camera, &mut locator, window, &config.enroll_detection, console)? {
            CaptureOutcome::Captured(face) => enroll::commit_sample(&store, console, &face),
            CaptureOutcome::Cancelled => Ok(None),
        }
    })?;

    console.say(DOUBLE_RULE);
    tracing::info!(stored, "enrollment finished");
    Ok(())
}

fn enroll_image(config: &Config, path: Option<String>, console: &mut dyn Console) -> Result<()> {
    let store = FaceStore::new(&config.faces_dir);
    let mut locator = load_locator(config)?;
    let mut pending = path;

    let stored = enroll::repeat_enrollment(console, &ANOTHER_IMAGE, |console| {
        banner(console, "FACE ENROLLMENT FROM IMAGE");
        console.say("");
        console.say(&format!("Supported formats: {}", ingest::supported_list()));
        console.say("");

        let raw = match pending.take() {
            Some(raw) => raw,
            None => console.ask("Enter the path to the image file (or drag & drop): ")?,
        };
        let path = ingest::clean_path(&raw);

        let window = Window::new(IMAGE_WINDOW);
        match enroll::enroll_still(&store, &path, &mut locator, window, &config.detection, console) {
            Err(SessionError::Ingest(e)) => {
                tracing::debug!(path = %path.display(), error = %e, "image rejected");
                console.say("");
                console.say(&format!("Error: {e}"));
                Ok(None)
            }
            other => other,
        }
    })?;

    console.say(DOUBLE_RULE);
    tracing::info!(stored, "image enrollment finished");
    Ok(())
}

fn recognize_live(config: &Config, console: &mut dyn Console) -> Result<()> {
    banner(console, "FACE RECOGNITION SYSTEM");

    let store = FaceStore::new(&config.faces_dir);
    let matcher = LbphMatcher::new().context("creating LBPH recognizer")?;
    let recognizer = recognize::prepare(&store, matcher, config.match_policy(), console)?;
    let mut locator = load_locator(config)?;

    console.say("");
    console.say("Starting webcam...");
    let camera = Camera::open(config.camera_index)
        .with_context(|| format!("opening camera {}", config.camera_index))?;
    console.say(recognize::RECOGNIZE_BANNER);
    console.say("");

    recognize::recognize_live(
        camera,
        &mut locator,
        &recognizer,
        Window::new(RECOGNIZE_WINDOW),
        &config.detection,
        console,
    )?;

    console.say("✓ Face recognition stopped.");
    console.say(DOUBLE_RULE);
    Ok(())
}

fn list(config: &Config, json: bool) -> Result<()> {
    let store = FaceStore::new(&config.faces_dir);
    let people = store
        .summaries()
        .with_context(|| format!("reading face store {}", config.faces_dir.display()))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&people)?);
        return Ok(());
    }

    if people.is_empty() {
        println!("No faces enrolled in {}", config.faces_dir.display());
        return Ok(());
    }

    println!("{:<24} SAMPLES", "NAME");
    for person in &people {
        println!("{:<24} {}", person.name, person.samples);
    }
    Ok(())
}

fn camera_test(config: &Config) -> Result<()> {
    println!("Running camera diagnostics...");

    let mut camera = Camera::open(config.camera_index)
        .with_context(|| format!("opening camera {}", config.camera_index))?;
    println!("  camera {}: opened ({}x{})", camera.index, camera.width, camera.height);

    let frame = camera.next_frame().context("reading a test frame")?;
    println!("  frame: {}x{}", frame.width(), frame.height());

    let mut locator = load_locator(config)?;
    let faces = locator
        .locate(&frame.gray, &config.detection)
        .context("running face detection")?;
    println!("  faces detected: {}", faces.len());
    for (i, face) in faces.iter().enumerate() {
        println!(
            "    face {}: {}x{} at ({}, {})",
            i + 1,
            face.width,
            face.height,
            face.x,
            face.y
        );
    }

    println!("Camera OK");
    Ok(())
}
