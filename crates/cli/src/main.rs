//! appcache entry point.
//!
//! Builds a WebKit `ApplicationCache.db` from a directory and/or redirect
//! pairs. Logging goes to stderr; the final summary goes to stdout.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use appcache_core::{AppConfig, CacheStore, DirectoryImporter, ImportSummary, Redirect, RedirectBuilder, StoreStats};
use clap::{CommandFactory, Parser};
use tracing_subscriber::EnvFilter;

/// Creates a WebKit ApplicationCache.db from a directory
#[derive(Parser, Debug)]
#[command(name = "appcache")]
#[command(version, about, long_about = None)]
struct Args {
    /// Directory to cache
    #[arg(short, long, requires = "url")]
    dir: Option<PathBuf>,

    /// URL where cached content will be accessible
    #[arg(short, long, requires = "dir")]
    url: Option<String>,

    /// Add a redirect from SRC to the already cached DST (repeatable)
    #[arg(short, long, value_name = "SRC=DST", value_parser = parse_redirect)]
    redirect: Vec<Redirect>,

    /// Print the run summary as JSON
    #[arg(long)]
    json: bool,

    /// ApplicationCache.db file to create or update
    db: PathBuf,
}

impl Args {
    fn has_work(&self) -> bool {
        self.dir.is_some() || !self.redirect.is_empty()
    }
}

fn parse_redirect(s: &str) -> Result<Redirect, String> {
    s.parse().map_err(|e: appcache_core::Error| e.to_string())
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    if json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}

/// The path is rendered with `display` so non-UTF-8 paths still serialize.
fn json_report(db: &Path, imports: &[ImportSummary], redirects: &[Redirect], stats: &StoreStats) -> serde_json::Value {
    serde_json::json!({
        "db": db.display().to_string(),
        "imports": imports,
        "redirects": redirects,
        "stats": stats,
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = AppConfig::load().context("failed to load configuration")?;

    init_tracing(config.json_logs);

    if !args.has_work() {
        Args::command().print_help()?;
        return Ok(());
    }

    let store = CacheStore::open(&args.db)
        .await
        .with_context(|| format!("failed to open {}", args.db.display()))?;

    let mut imports = Vec::new();
    if let (Some(dir), Some(url)) = (&args.dir, &args.url) {
        tracing::info!(dir = %dir.display(), url = %url, "caching directory");
        let importer = DirectoryImporter::with_options(store.clone(), config.import_options());
        let summary = importer
            .cache_directory(url, dir)
            .await
            .with_context(|| format!("failed to cache directory '{}' to URL '{url}'", dir.display()))?;
        imports.push(summary);
    }

    let redirects = RedirectBuilder::new(store.clone());
    for redirect in &args.redirect {
        tracing::info!(source = %redirect.source, target = %redirect.target, "adding redirect");
        redirects
            .apply(redirect)
            .await
            .with_context(|| format!("failed to add redirect '{redirect}'"))?;
    }

    let stats = store.stats().await.context("failed to read store statistics")?;
    store.close().await.context("failed to close store")?;

    if args.json {
        let report = json_report(&args.db, &imports, &args.redirect, &stats);
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!(
            "done! {} resources in {} cache group(s) written to {}",
            stats.resources,
            stats.cache_groups,
            args.db.display()
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_definition() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_parse_import() {
        let args = Args::try_parse_from(["appcache", "-d", "site", "-u", "http://site.test/", "out.db"]).unwrap();
        assert_eq!(args.dir, Some(PathBuf::from("site")));
        assert_eq!(args.url.as_deref(), Some("http://site.test/"));
        assert_eq!(args.db, PathBuf::from("out.db"));
        assert!(args.has_work());
    }

    #[test]
    fn test_parse_repeated_redirects() {
        let args = Args::try_parse_from([
            "appcache",
            "-r",
            "http://site.test/=http://site.test/index.html",
            "--redirect",
            "http://site.test/old=http://site.test/new",
            "out.db",
        ])
        .unwrap();
        assert_eq!(args.redirect.len(), 2);
        assert_eq!(args.redirect[1].source, "http://site.test/old");
    }

    #[test]
    fn test_malformed_redirect_rejected() {
        let result = Args::try_parse_from(["appcache", "-r", "http://site.test/", "out.db"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_dir_requires_url() {
        let result = Args::try_parse_from(["appcache", "-d", "site", "out.db"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_db_is_required() {
        let result = Args::try_parse_from(["appcache", "-d", "site", "-u", "http://site.test/"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_json_report() {
        let redirects = vec!["http://site.test/=http://site.test/index.html".parse().unwrap()];
        let report = json_report(Path::new("out.db"), &[], &redirects, &StoreStats::default());
        assert_eq!(report["db"], "out.db");
        assert_eq!(report["redirects"][0]["target"], "http://site.test/index.html");
    }

    #[cfg(unix)]
    #[test]
    fn test_json_report_non_utf8_db_path() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let db = Path::new(OsStr::from_bytes(b"out\xff.db"));
        let report = json_report(db, &[], &[], &StoreStats::default());
        assert_eq!(report["db"], "out\u{FFFD}.db");
    }

    #[test]
    fn test_no_work() {
        let args = Args::try_parse_from(["appcache", "out.db"]).unwrap();
        assert!(!args.has_work());
    }
}
