use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use drill_filesys::{Handler, Handlers, text_handler};
use drill_markdown::{HtmlRenderer, MarkdownOptions, Render};
use serde::Deserialize;
use tracing::debug;

use crate::error::CliError;

/// Looked up in the working directory when `--config` is not given.
pub const DEFAULT_CONFIG: &str = "drill.toml";

/// Contents of `drill.toml`.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub markdown: MarkdownOptions,
    /// Tried in order; the first matching pattern wins. Empty means
    /// [`default_handlers`].
    pub handlers: Vec<HandlerConfig>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HandlerConfig {
    pub pattern: String,
    pub format: Format,
}

/// How a matched file is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    Markdown,
    Text,
}

pub fn default_handlers() -> Vec<HandlerConfig> {
    [
        ("*.md", Format::Markdown),
        ("*.markdown", Format::Markdown),
        ("*.txt", Format::Text),
    ]
    .into_iter()
    .map(|(pattern, format)| HandlerConfig {
        pattern: pattern.to_string(),
        format,
    })
    .collect()
}

impl Config {
    /// Loads `path`, or `drill.toml` from the working directory if no path
    /// is given. A missing default file yields the default configuration.
    pub fn load(path: Option<&Path>) -> Result<Config, CliError> {
        let (path, required) = match path {
            Some(path) => (path.to_path_buf(), true),
            None => (PathBuf::from(DEFAULT_CONFIG), false),
        };
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(err) if !required && err.kind() == io::ErrorKind::NotFound => {
                debug!("no {}, using defaults", DEFAULT_CONFIG);
                return Ok(Config::default());
            }
            Err(source) => return Err(CliError::Read { path, source }),
        };
        let config = Config::parse(&text).map_err(|source| CliError::Config {
            path: path.clone(),
            source,
        })?;
        debug!(path = %path.display(), handlers = config.handlers.len(), "loaded config");
        Ok(config)
    }

    pub fn parse(text: &str) -> Result<Config, toml::de::Error> {
        toml::from_str(text)
    }

    /// The configured handler entries, or the defaults if none are set.
    pub fn handler_configs(&self) -> Vec<HandlerConfig> {
        if self.handlers.is_empty() {
            default_handlers()
        } else {
            self.handlers.clone()
        }
    }

    /// Returns the format of the first handler entry matching `name`.
    pub fn format_for(&self, name: &str) -> Result<Option<Format>, CliError> {
        let handlers = self.handlers(Arc::new(HtmlRenderer))?;
        let configs = self.handler_configs();
        Ok(handlers.position(name).map(|i| configs[i].format))
    }

    /// Builds the handler set. Markdown sections render with `renderer`.
    pub fn handlers(&self, renderer: Arc<dyn Render>) -> Result<Handlers, CliError> {
        let handlers = self.handler_configs().into_iter().map(|c| {
            let func = match c.format {
                Format::Markdown => {
                    drill_markdown::handler_with(self.markdown.clone(), Arc::clone(&renderer))
                }
                Format::Text => text_handler(),
            };
            Handler::new(c.pattern, func)
        });
        Ok(Handlers::new(handlers)?)
    }
}
