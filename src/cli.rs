use crate::{
    format_bytes, format_duration, CacheKey, ChromeDriver, Config, FileCache, Identity,
    OutputFormat, Screenshot, ScreenshotKind, SessionCookie, Thumbnail, ThumbnailError,
    WindowSize,
};
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::fs;
use tracing::{debug, info, warn};

#[derive(Parser)]
#[command(name = "thumbnail-cache")]
#[command(about = "Compute and cache chart and dashboard thumbnails")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(long, help = "Configuration file path")]
    pub config: Option<PathBuf>,

    #[arg(long, help = "Thumbnail cache directory")]
    pub cache_dir: Option<PathBuf>,

    #[arg(long, help = "Chrome executable path")]
    pub chrome_path: Option<String>,

    #[arg(long, help = "Capture timeout in seconds")]
    pub timeout: Option<u64>,

    #[arg(long, help = "Thumbnail format (png, jpeg, webp)")]
    pub format: Option<OutputFormat>,

    #[arg(long, help = "User the page is rendered for")]
    pub username: Option<String>,

    #[arg(
        long = "cookie",
        value_name = "NAME=VALUE",
        help = "Session cookie sent with the page request (repeatable)"
    )]
    pub cookies: Vec<SessionCookie>,

    #[arg(long, help = "Enable verbose logging")]
    pub verbose: bool,

    #[arg(long, help = "Print collected metrics in Prometheus format on exit")]
    pub print_metrics: bool,
}

impl Cli {
    /// Apply command-line overrides on top of a loaded configuration.
    pub fn apply_overrides(&self, config: &mut Config) {
        if let Some(cache_dir) = &self.cache_dir {
            config.cache_dir = cache_dir.clone();
        }
        if let Some(chrome_path) = &self.chrome_path {
            config.driver.chrome_path = Some(chrome_path.clone());
        }
        if let Some(timeout) = self.timeout {
            config.driver.screenshot_timeout = Duration::from_secs(timeout);
        }
        if let Some(format) = self.format {
            config.output_format = format;
        }
    }

    pub fn identity(&self) -> Identity {
        Identity {
            username: self.username.clone(),
            cookies: self.cookies.clone(),
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Return a thumbnail, computing it on a cache miss
    Get {
        #[command(flatten)]
        target: TargetArgs,

        #[arg(long, help = "Thumbnail size, e.g. 400x300")]
        thumb: Option<WindowSize>,

        #[arg(short, long, help = "Output file path")]
        output: Option<PathBuf>,
    },

    /// Compute and cache a thumbnail, skipping cached ones unless forced
    Warm {
        #[command(flatten)]
        target: TargetArgs,

        #[arg(long, help = "Window size, e.g. 1600x1200")]
        window: Option<WindowSize>,

        #[arg(long, help = "Thumbnail size, e.g. 400x300")]
        thumb: Option<WindowSize>,

        #[arg(long, help = "Recompute even if the thumbnail is cached")]
        force: bool,
    },

    /// Read a thumbnail from the cache without computing it
    Cached {
        #[command(flatten)]
        target: TargetArgs,

        #[arg(long, help = "Window size, e.g. 1600x1200")]
        window: Option<WindowSize>,

        #[arg(long, help = "Thumbnail size, e.g. 400x300")]
        thumb: Option<WindowSize>,

        #[arg(short, long, help = "Output file path")]
        output: Option<PathBuf>,
    },

    /// Print the cache key of a thumbnail
    Key {
        #[arg(long, help = "chart or dashboard")]
        kind: ScreenshotKind,

        #[arg(long, help = "Content digest")]
        digest: String,

        #[arg(long, help = "Window size, e.g. 1600x1200")]
        window: Option<WindowSize>,

        #[arg(long, help = "Thumbnail size, e.g. 400x300")]
        thumb: Option<WindowSize>,
    },

    /// Validate configuration
    Validate {
        #[arg(short, long, help = "Configuration file to validate")]
        config: PathBuf,
    },
}

#[derive(Args, Debug, Clone)]
pub struct TargetArgs {
    #[arg(long, help = "chart or dashboard")]
    pub kind: ScreenshotKind,

    #[arg(long, help = "Absolute URL of the chart or dashboard")]
    pub url: String,

    #[arg(long, help = "Content digest")]
    pub digest: String,
}

pub struct CliRunner {
    pub config: Config,
    cache: FileCache,
    driver: Arc<ChromeDriver>,
    identity: Identity,
}

impl CliRunner {
    pub fn new(config: Config, identity: Identity) -> Self {
        let cache = FileCache::new(config.cache_dir.clone());
        let driver = Arc::new(ChromeDriver::new(config.driver.clone()));
        debug!("Thumbnail cache directory: {}", cache.dir().display());

        Self {
            config,
            cache,
            driver,
            identity,
        }
    }

    pub async fn run(&self, command: Commands) -> Result<(), ThumbnailError> {
        match command {
            Commands::Get {
                target,
                thumb,
                output,
            } => self.run_get(&target, thumb, output).await,
            Commands::Warm {
                target,
                window,
                thumb,
                force,
            } => self.run_warm(&target, window, thumb, force).await,
            Commands::Cached {
                target,
                window,
                thumb,
                output,
            } => self.run_cached(&target, window, thumb, output).await,
            Commands::Key {
                kind,
                digest,
                window,
                thumb,
            } => {
                let key = self.derive_key(kind, &digest, window, thumb);
                println!("{key}");
                Ok(())
            }
            Commands::Validate { config } => self.validate_config(&config).await,
        }
    }

    pub async fn run_get(
        &self,
        target: &TargetArgs,
        thumb: Option<WindowSize>,
        output: Option<PathBuf>,
    ) -> Result<(), ThumbnailError> {
        let screenshot = self.screenshot(target)?;
        let cache_key = screenshot.cache_key(None, thumb);
        info!("Getting {} thumbnail: {}", target.kind, cache_key);

        let start_time = Instant::now();
        let thumbnail = screenshot
            .get(&self.identity, &self.cache, thumb)
            .await?
            .ok_or_else(|| ThumbnailError::Unavailable(cache_key.to_string()))?;

        let path = self.write_thumbnail(&cache_key, &thumbnail, output).await?;
        println!("Thumbnail ready:");
        println!("  Key: {cache_key}");
        println!("  Output: {}", path.display());
        println!("  Size: {}", format_bytes(thumbnail.len()));
        println!("  Duration: {}", format_duration(start_time.elapsed()));

        Ok(())
    }

    pub async fn run_warm(
        &self,
        target: &TargetArgs,
        window: Option<WindowSize>,
        thumb: Option<WindowSize>,
        force: bool,
    ) -> Result<(), ThumbnailError> {
        let screenshot = self.screenshot(target)?;
        let cache_key = screenshot.cache_key(window, thumb);

        let start_time = Instant::now();
        let computed = screenshot
            .compute_and_cache(&self.identity, window, thumb, &self.cache, force)
            .await?;

        let Some(thumbnail) = computed else {
            let already_cached = !force
                && screenshot
                    .get_from_cache(&self.cache, window, thumb)
                    .await?
                    .is_some();
            if already_cached {
                println!("Already cached: {cache_key}");
                return Ok(());
            }
            warn!("Thumbnail could not be computed: {}", cache_key);
            return Err(ThumbnailError::Unavailable(cache_key.to_string()));
        };

        println!(
            "Cached {} ({}) in {}",
            cache_key,
            format_bytes(thumbnail.len()),
            format_duration(start_time.elapsed())
        );
        Ok(())
    }

    pub async fn run_cached(
        &self,
        target: &TargetArgs,
        window: Option<WindowSize>,
        thumb: Option<WindowSize>,
        output: Option<PathBuf>,
    ) -> Result<(), ThumbnailError> {
        let screenshot = self.screenshot(target)?;
        let cache_key = screenshot.cache_key(window, thumb);

        let thumbnail = screenshot
            .get_from_cache(&self.cache, window, thumb)
            .await?
            .ok_or_else(|| ThumbnailError::Unavailable(cache_key.to_string()))?;

        let path = self.write_thumbnail(&cache_key, &thumbnail, output).await?;
        println!("Thumbnail saved to: {}", path.display());

        Ok(())
    }

    pub async fn validate_config(&self, config_path: &Path) -> Result<(), ThumbnailError> {
        println!("Validating configuration: {}", config_path.display());

        let config = Config::load(config_path).await?;
        config.validate()?;

        println!("Configuration is valid:");
        println!(
            "  Chart: window {}, thumbnail {}",
            config.chart.window_size, config.chart.thumb_size
        );
        println!(
            "  Dashboard: window {}, thumbnail {}",
            config.dashboard.window_size, config.dashboard.thumb_size
        );
        println!("  Output format: {:?}", config.output_format);
        println!("  Timeout: {:?}", config.driver.screenshot_timeout);
        println!("  Cache directory: {}", config.cache_dir.display());

        Ok(())
    }

    pub fn derive_key(
        &self,
        kind: ScreenshotKind,
        digest: &str,
        window: Option<WindowSize>,
        thumb: Option<WindowSize>,
    ) -> CacheKey {
        let sizes = self.config.sizes(kind);
        CacheKey::derive(
            kind,
            digest,
            window.unwrap_or(sizes.window_size),
            thumb.unwrap_or(sizes.thumb_size),
        )
    }

    fn screenshot(&self, target: &TargetArgs) -> Result<Screenshot, ThumbnailError> {
        let request = self.config.request(target.kind, &target.url, &target.digest)?;
        Ok(Screenshot::from_config(request, self.driver.clone(), &self.config))
    }

    async fn write_thumbnail(
        &self,
        cache_key: &CacheKey,
        thumbnail: &Thumbnail,
        output: Option<PathBuf>,
    ) -> Result<PathBuf, ThumbnailError> {
        let path = output.unwrap_or_else(|| default_output_path(cache_key, thumbnail));

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&path, thumbnail.as_bytes()).await?;
        info!("Thumbnail saved to: {}", path.display());

        Ok(path)
    }
}

/// `<key>.<ext>` in the working directory, with the extension taken from the
/// payload itself. Captures cached without resizing keep the driver's PNG
/// encoding whatever the configured output format.
pub fn default_output_path(cache_key: &CacheKey, thumbnail: &Thumbnail) -> PathBuf {
    let extension = image::guess_format(thumbnail.as_bytes())
        .ok()
        .and_then(|format| format.extensions_str().first().copied())
        .unwrap_or("png");
    PathBuf::from(format!("{cache_key}.{extension}"))
}

pub fn setup_logging(verbose: bool) -> Result<(), Box<dyn std::error::Error>> {
    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .init();

    Ok(())
}
