use std::path::Path;
use std::time::Duration;

use clap::Parser;

use ark_video::ark::{ArkClient, ArkError, TaskResponse, TaskStatus, ARK_API_KEY_ENV};
use ark_video::cli::{
    add_audio, handle_image_action, handle_subtitle_action, init_files, load_seed_image,
    run_webhook, trim_video, AddAudio, Args, Command, RunMode,
};
use ark_video::config::VideoConfig;
use ark_video::context::Context;
use ark_video::media::{ensure_tool, FfmpegFrames, FFMPEG};
use ark_video::prompts::{read_batch_prompts, read_prompt_file, PromptRange};
use ark_video::seed_image::SeedImage;
use ark_video::settings::Settings;
use ark_video::shutdown::Shutdown;
use ark_video::workflow::{
    format_size, offer_concat, preview, print_summary, run_batch, run_chain, run_job, video_path,
    JobState,
};

/// How long in-flight work gets to wind down after Ctrl+C.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

fn make_client(settings: &Settings) -> Result<ArkClient, String> {
    let api_key = std::env::var(ARK_API_KEY_ENV).unwrap_or_default();
    ArkClient::with_base_url(api_key, settings.api.base_url.clone()).map_err(|e| match e {
        ArkError::MissingApiKey => "ARK_API_KEY environment variable is not set.\n\n\
            Add your API key to a .env file:\n\
                echo 'ARK_API_KEY=your-api-key-here' >> .env\n\n\
            Or set it as an environment variable:\n\
                export ARK_API_KEY=\"your-api-key-here\""
            .to_string(),
        _ => format!("Failed to create API client: {}", e),
    })
}

/// Write example files when any input of this run is missing.
///
/// Returns true when the run should stop so the user can edit them.
fn ensure_inputs(needed: &[&Path]) -> Result<bool, String> {
    let missing: Vec<&Path> = needed.iter().copied().filter(|p| !p.exists()).collect();
    if missing.is_empty() {
        return Ok(false);
    }
    init_files(Path::new("."))?;
    println!();
    for path in &missing {
        println!("Missing {}.", path.display());
    }
    println!("Edit the example files and run again.");
    Ok(true)
}

fn describe_seed(seed: &SeedImage) -> String {
    match seed {
        SeedImage::Url(url) => format!("remote image {}", url),
        SeedImage::Embedded { width, height, .. } => format!("local image ({}x{})", width, height),
    }
}

fn print_run_header(config: &VideoConfig, seed: Option<&SeedImage>) {
    println!("Settings:");
    println!("{}", config);
    match seed {
        Some(seed) => println!("   Seed image:   {}", describe_seed(seed)),
        None => println!("   Seed image:   none (text only)"),
    }
    println!();
}

/// Interactive flow: one prompt from the prompt file.
async fn run_single(ctx: &Context, args: &Args) -> Result<(), String> {
    if ensure_inputs(&[&args.prompt_file, &args.config])? {
        return Ok(());
    }
    let config = VideoConfig::load(&args.config).map_err(|e| e.to_string())?;
    let prompt = read_prompt_file(&args.prompt_file).map_err(|e| e.to_string())?;
    let seed = load_seed_image(config.image.as_ref()).await?;

    println!("Prompt: \"{}\"", preview(&prompt, 200));
    println!();
    print_run_header(&config, seed.as_ref());

    if !ctx.confirm("Start generation?", true).await {
        println!("Cancelled.");
        return Ok(());
    }

    let dest = video_path(ctx.videos_dir(), "generated_video");
    let outcome = run_job(ctx, &config, 1, &prompt, seed.as_ref(), &dest).await;
    match outcome.state {
        JobState::Succeeded => {
            println!();
            println!("Video ready!");
            Ok(())
        }
        JobState::CallbackPending => {
            println!();
            println!("Submitted. Run `ark-video webhook` to receive the result.");
            Ok(())
        }
        _ => Err(outcome
            .error
            .unwrap_or_else(|| "Generation failed".to_string())),
    }
}

fn load_batch_inputs(
    args: &Args,
    start: Option<usize>,
    end: Option<usize>,
) -> Result<Option<(VideoConfig, Vec<String>, PromptRange)>, String> {
    if ensure_inputs(&[&args.batch_file, &args.config])? {
        return Ok(None);
    }
    let config = VideoConfig::load(&args.config).map_err(|e| e.to_string())?;
    let prompts = read_batch_prompts(&args.batch_file).map_err(|e| e.to_string())?;
    let range = PromptRange::resolve(start, end, prompts.len()).map_err(|e| e.to_string())?;
    Ok(Some((config, prompts, range)))
}

async fn run_batch_mode(
    ctx: &Context,
    args: &Args,
    start: Option<usize>,
    end: Option<usize>,
) -> Result<(), String> {
    let Some((config, prompts, range)) = load_batch_inputs(args, start, end)? else {
        return Ok(());
    };
    let seed = load_seed_image(config.image.as_ref()).await?;

    println!(
        "Batch: prompts {}-{} of {} from {}",
        range.start,
        range.end,
        prompts.len(),
        args.batch_file.display()
    );
    println!();
    print_run_header(&config, seed.as_ref());
    if let Some(url) = &config.callback_url {
        println!("Callback mode: results are delivered to {}", url);
        println!();
    }

    if !ctx
        .confirm(&format!("Start {} jobs?", range.count()), true)
        .await
    {
        println!("Cancelled.");
        return Ok(());
    }

    let report = run_batch(ctx, &config, &prompts, range, seed.as_ref()).await;
    print_summary(&report.results);
    println!();
    println!(
        "Succeeded: {}  Failed: {}  Timed out: {}  Callback pending: {}",
        report.succeeded, report.failed, report.timed_out, report.callback_pending
    );
    if report.interrupted {
        println!("Batch stopped early after {} job(s).", report.results.len());
    }
    match report.write(ctx.videos_dir()) {
        Ok(path) => println!("Report: {}", path.display()),
        Err(e) => eprintln!("Failed to write batch report: {}", e),
    }
    Ok(())
}

async fn run_chain_mode(
    ctx: &Context,
    args: &Args,
    start: Option<usize>,
    end: Option<usize>,
) -> Result<(), String> {
    let Some((config, prompts, range)) = load_batch_inputs(args, start, end)? else {
        return Ok(());
    };
    let seed = load_seed_image(config.image.as_ref()).await?;

    if let Err(e) = ensure_tool(FFMPEG).await {
        eprintln!("Warning: {}", e);
        eprintln!("         Clips will run text-only after the first.");
        println!();
    }

    println!(
        "Chain: prompts {}-{} of {} from {}",
        range.start,
        range.end,
        prompts.len(),
        args.batch_file.display()
    );
    println!();
    print_run_header(&config, seed.as_ref());

    if !ctx
        .confirm(&format!("Start a chain of {} clips?", range.count()), true)
        .await
    {
        println!("Cancelled.");
        return Ok(());
    }

    let report = run_chain(ctx, &config, &prompts, range, seed, &FfmpegFrames).await;
    print_summary(&report.results);
    if report.interrupted {
        println!("Chain stopped early after {} clip(s).", report.results.len());
        return Ok(());
    }
    println!();
    offer_concat(ctx, &report).await;
    Ok(())
}

fn format_unix(secs: i64) -> String {
    chrono::DateTime::from_timestamp(secs, 0)
        .map(|t| {
            t.with_timezone(&chrono::Local)
                .format("%Y-%m-%d %H:%M:%S")
                .to_string()
        })
        .unwrap_or_else(|| secs.to_string())
}

fn print_task(task: &TaskResponse) {
    println!("Task:    {}", task.id);
    println!("Status:  {}", task.task_status());
    if let Some(model) = &task.model {
        println!("Model:   {}", model);
    }
    if let Some(created) = task.created_at {
        println!("Created: {}", format_unix(created));
    }
    if let Some(url) = task.video_url() {
        println!("Video:   {}", url);
    }
    if task.task_status() == TaskStatus::Failed {
        println!("Error:   [{}] {}", task.error_code(), task.error_message());
    }
    if let Some(tokens) = task.completion_tokens() {
        println!("Tokens:  {}", tokens);
    }
}

async fn check_task(ctx: &Context, task_id: &str) -> Result<(), String> {
    let task = ctx
        .client
        .get_task(task_id)
        .await
        .map_err(|e| format!("Failed to fetch task {}: {}", task_id, e))?;
    print_task(&task);

    let status = task.task_status();
    if !status.is_terminal() {
        println!("Task is {}; check again later.", status);
        return Ok(());
    }

    match (status, task.video_url()) {
        (TaskStatus::Succeeded, Some(url)) => {
            println!();
            if !ctx.confirm("Download the video?", true).await {
                return Ok(());
            }
            let dest = video_path(ctx.videos_dir(), "checked_video");
            print!("Downloading... ");
            std::io::Write::flush(&mut std::io::stdout()).ok();
            match ctx.client.download_video(url, &dest).await {
                Ok(bytes) => {
                    println!("done ({})", format_size(bytes));
                    println!("  Saved: {}", dest.display());
                }
                Err(e) => {
                    println!("failed");
                    return Err(e.to_string());
                }
            }
        }
        (TaskStatus::Succeeded, None) => println!("Task succeeded but has no video URL."),
        _ => {}
    }
    Ok(())
}

async fn list_tasks(ctx: &Context, count: u32) -> Result<(), String> {
    let list = ctx
        .client
        .list_tasks(1, count.max(1))
        .await
        .map_err(|e| format!("Failed to list tasks: {}", e))?;

    if list.items.is_empty() {
        println!("No tasks found.");
        return Ok(());
    }

    println!("Recent tasks:");
    for task in &list.items {
        let created = task.created_at.map(format_unix).unwrap_or_default();
        println!(
            "  {:<36} {:<10} {:<19} {}",
            task.id,
            task.task_status(),
            created,
            task.model.as_deref().unwrap_or("")
        );
    }
    if let Some(total) = list.total {
        println!();
        println!("Showing {} of {} tasks", list.items.len(), total);
    }
    Ok(())
}

async fn run(mut args: Args, settings: Settings, shutdown: Shutdown) -> Result<(), String> {
    let run_mode = args.run_mode();
    match args.command.take() {
        Some(Command::Init) => init_files(Path::new(".")),
        Some(Command::Trim {
            input,
            start,
            end,
            output,
        }) => trim_video(&settings, input, start, end, output, args.yes).await,
        Some(Command::AddAudio {
            video,
            audio,
            mode,
            title,
            artist,
            title_size,
            output,
            subtitles,
            language,
        }) => {
            let opts = AddAudio {
                video,
                audio,
                mode,
                title,
                artist,
                title_size,
                output,
                subtitles,
                language,
            };
            add_audio(&settings, opts).await
        }
        Some(Command::Subtitles { action }) => handle_subtitle_action(&settings, action).await,
        Some(Command::Image { action }) => handle_image_action(action, &args.config).await,
        Some(Command::Webhook { host, port }) => run_webhook(&settings, host, port, shutdown).await,
        None => {
            let client = make_client(&settings)?;
            let ctx = Context::new(client, settings, shutdown, args.yes);
            match run_mode {
                RunMode::Single => run_single(&ctx, &args).await,
                RunMode::Batch { start, end } => run_batch_mode(&ctx, &args, start, end).await,
                RunMode::Chain { start, end } => run_chain_mode(&ctx, &args, start, end).await,
                RunMode::Check(task_id) => check_task(&ctx, &task_id).await,
                RunMode::List(count) => list_tasks(&ctx, count).await,
            }
        }
    }
}

fn load_env() {
    // Load .env file, don't override existing env vars
    // dotenv::dotenv() returns Err if .env doesn't exist, which is fine
    let _ = dotenv::dotenv();
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

fn main() {
    // Load .env file before anything else
    load_env();

    let args = Args::parse();
    init_logging(args.verbose);

    let settings = match Settings::load(args.settings.as_deref()) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Error: {}", e);
            return;
        }
    };

    let shutdown = match Shutdown::install_ctrlc() {
        Ok(shutdown) => shutdown,
        Err(e) => {
            log::warn!("Could not install Ctrl+C handler: {}", e);
            Shutdown::never()
        }
    };

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Error: Failed to create async runtime: {}", e);
            return;
        }
    };

    let result = runtime.block_on(async {
        tokio::select! {
            biased;
            result = run(args, settings, shutdown.clone()) => result,
            _ = async {
                shutdown.wait().await;
                tokio::time::sleep(SHUTDOWN_GRACE).await;
            } => Ok(()),
        }
    });

    match result {
        Ok(()) if shutdown.is_triggered() => println!("\nInterrupted by user."),
        Ok(()) => {}
        Err(e) => eprintln!("Error: {}", e),
    }

    // A pending stdin read would otherwise hold the runtime open.
    runtime.shutdown_timeout(Duration::from_millis(500));
}
