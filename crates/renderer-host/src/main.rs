//! Resolver host CLI entry point.
//!
//! `serve` speaks the renderer protocol on stdin/stdout. The other
//! subcommands run a single lookup and print the reply payload as JSON.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use log::info;
use renderer_host::{HostConfig, HostServer, Resolver};

#[derive(Parser, Debug)]
#[command(name = "renderer-host")]
#[command(about = "Grammar and theme resolver for the notebook code renderer")]
struct Args {
    /// Application root whose resources/app/extensions holds built-in extensions
    /// (default: directory of this executable)
    #[arg(long, global = true)]
    app_root: Option<PathBuf>,

    /// Directory of installed extensions, may be repeated
    /// (default: ~/.vscode/extensions)
    #[arg(long = "extensions-dir", global = true)]
    extensions_dirs: Vec<PathBuf>,

    /// Tokenizer engine binary sent to the client
    #[arg(long, global = true)]
    tokenizer: Option<PathBuf>,

    /// Log level
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Answer renderer requests on stdin/stdout
    Serve,
    /// Print the grammar bundle for a language
    Grammar { language: String },
    /// Print the generated editor theme for a theme name
    Theme { name: String },
    /// List discovered extensions and their grammar and theme contributions
    Extensions,
}

impl Args {
    fn config(&self) -> HostConfig {
        let mut config = HostConfig::from_env();
        if let Some(root) = &self.app_root {
            config.app_root = root.clone();
        }
        if !self.extensions_dirs.is_empty() {
            config.extension_dirs = self.extensions_dirs.clone();
        }
        if let Some(tokenizer) = &self.tokenizer {
            config.tokenizer_path = Some(tokenizer.clone());
        }
        config
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Logs go to stderr; stdout carries frames in serve mode
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&args.log_level))
        .target(env_logger::Target::Stderr)
        .init();

    let config = args.config();
    info!("[renderer-host] Configuration:");
    info!("[renderer-host]   App root: {:?}", config.app_root);
    info!("[renderer-host]   Built-in extensions: {:?}", config.builtin_extensions_dir());
    info!("[renderer-host]   Extension dirs: {:?}", config.extension_dirs);
    info!("[renderer-host]   Tokenizer: {:?}", config.tokenizer_path);

    let resolver = Arc::new(Resolver::from_config(&config).await);

    match args.command {
        Command::Serve => HostServer::new(resolver).serve_stdio().await,
        Command::Grammar { language } => {
            let grammar = resolver.request_tm_language(&language).await;
            println!("{}", serde_json::to_string_pretty(&grammar)?);
            Ok(())
        }
        Command::Theme { name } => {
            let theme = resolver.generate_theme(&name).await;
            println!("{}", serde_json::to_string_pretty(&theme)?);
            Ok(())
        }
        Command::Extensions => {
            for extension in resolver.extensions().extensions() {
                println!("{}  {}", extension.id, extension.root.display());
                let Some(contributions) = extension.manifest.contributions() else {
                    continue;
                };
                for grammar in &contributions.grammars {
                    if let Some(language) = &grammar.language {
                        println!("    grammar  {}", language);
                    }
                }
                for theme in &contributions.themes {
                    let name = theme.label.as_deref().or(theme.id.as_deref());
                    if let Some(name) = name {
                        println!("    theme    {}", name);
                    }
                }
            }
            Ok(())
        }
    }
}
