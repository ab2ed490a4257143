//! Command line parsing.
//!
//! Accepts the usual `--config`/`-c`, `--help`, `--version` flags as well as
//! the single-dash spellings `-config`, `-help` and `-version`. Unquoted path
//! arguments split on spaces are joined back together.

use std::path::PathBuf;

use clap::Parser;

use crate::config::DEFAULT_CONFIG_PATH;

/// staticd: a hardened static web server
#[derive(Parser, Debug)]
#[command(name = "staticd", version, about)]
pub struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,

    /// Log level filter (e.g., "staticd=debug,tower_http=info")
    #[arg(short, long)]
    pub log_level: Option<String>,
}

impl Args {
    /// Parse the process arguments. Exits on `--help`, `--version` or errors.
    pub fn from_env() -> Self {
        Self::parse_from(normalize_args(std::env::args()))
    }
}

/// Rewrite single-dash long flags and rejoin space-split values.
///
/// Consecutive non-flag words are concatenated with single spaces, so
/// `-config my site/config.json` reads as one path.
pub fn normalize_args<I>(args: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let mut args = args.into_iter();
    let mut normalized: Vec<String> = args.next().into_iter().collect();
    let mut words: Option<String> = None;

    for arg in args {
        if arg.starts_with('-') {
            normalized.extend(words.take());
            normalized.push(match arg.as_str() {
                "-help" => "--help".to_string(),
                "-version" => "--version".to_string(),
                "-config" => "--config".to_string(),
                _ => arg,
            });
        } else {
            words = Some(match words {
                Some(prev) => format!("{prev} {arg}"),
                None => arg,
            });
        }
    }
    normalized.extend(words);
    normalized
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_legacy_flags_are_rewritten() {
        assert_eq!(
            normalize_args(args(&["staticd", "-config", "site.json"])),
            args(&["staticd", "--config", "site.json"])
        );
        assert_eq!(
            normalize_args(args(&["staticd", "-version"])),
            args(&["staticd", "--version"])
        );
    }

    #[test]
    fn test_split_path_is_joined() {
        assert_eq!(
            normalize_args(args(&["staticd", "-config", "My", "Site/config.json", "-l", "debug"])),
            args(&["staticd", "--config", "My Site/config.json", "-l", "debug"])
        );
    }

    #[test]
    fn test_parse_legacy_config_flag() {
        let parsed = Args::parse_from(normalize_args(args(&["staticd", "-config", "site.json"])));
        assert_eq!(parsed.config, PathBuf::from("site.json"));
        assert_eq!(parsed.log_level, None);
    }

    #[test]
    fn test_default_config_path() {
        let parsed = Args::parse_from(normalize_args(args(&["staticd"])));
        assert_eq!(parsed.config, PathBuf::from(DEFAULT_CONFIG_PATH));
    }

    #[test]
    fn test_help_is_recognized() {
        let err = Args::try_parse_from(normalize_args(args(&["staticd", "-help"]))).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayHelp);
    }
}
