//! Command implementations.

use crate::cli::{Cli, Commands};
use kurbo::Size;
use peniko::Color;
use pixboard_core::codec::ObjectBody;
use pixboard_core::raster;
use pixboard_core::share::{self, ShareDocument, ShareError, ShareWorker};
use pixboard_core::{ConfigError, Editor, EditorConfig, EditorError, SerializableColor};
use pixboard_render::{
    ExportOptions, RenderContext, Renderer, RendererError, SkiaCompositor, content_bounds,
};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Padding around fitted content, in screen pixels.
const FIT_PADDING: f64 = 20.0;

/// Application errors.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("Share error: {0}")]
    Share(#[from] ShareError),
    #[error("Editor error: {0}")]
    Editor(#[from] EditorError),
    #[error("Render error: {0}")]
    Render(#[from] RendererError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid color: {0}")]
    InvalidColor(String),
}

/// Shell settings.
#[derive(Debug, Clone, Default)]
pub struct AppConfig {
    pub editor: EditorConfig,
}

impl AppConfig {
    pub fn load(path: Option<&Path>) -> Result<Self, AppError> {
        let editor = match path {
            Some(path) => EditorConfig::load(path)?,
            None => EditorConfig::default(),
        };
        Ok(Self { editor })
    }
}

/// The headless application.
pub struct App {
    config: AppConfig,
}

impl App {
    pub fn new(config: AppConfig) -> Self {
        Self { config }
    }

    /// Entry point for a parsed command line.
    pub fn run(cli: Cli) -> Result<(), AppError> {
        let app = Self::new(AppConfig::load(cli.config.as_deref())?);
        match cli.command {
            Commands::Render {
                input,
                output,
                width,
                height,
                background,
                scale,
            } => {
                let background = parse_color(&background)?;
                let view = width.zip(height);
                app.render(&input, &output, view, background, scale)
            }
            Commands::Minimap {
                input,
                output,
                width,
                height,
            } => app.minimap(&input, &output, width, height),
            Commands::Info { input } => {
                println!("{}", app.info(&input)?);
                Ok(())
            }
            Commands::Share { file, base_url } => {
                println!("{}", app.share(&file, &base_url)?);
                Ok(())
            }
            Commands::Pack { link, output } => {
                let path = app.pack(&link, output)?;
                println!("{}", path.display());
                Ok(())
            }
        }
    }

    /// Load a `.canvas` file, or decode a share link.
    pub fn load_document(&self, input: &str) -> Result<ShareDocument, AppError> {
        let path = Path::new(input);
        if path.exists() {
            log::info!("Reading {}", path.display());
            return Ok(ShareDocument::read_file(path)?);
        }
        Ok(share::parse_share_link(input)?)
    }

    /// Rebuild an editor session from a document.
    fn editor_for(&self, document: &ShareDocument, screen: Size) -> Editor {
        let mut editor = Editor::software(self.config.editor.clone(), screen);
        let report = pollster::block_on(editor.restore(&document.objects));
        for (id, reason) in &report.skipped {
            log::warn!("Object {id} not rendered: {reason}");
        }
        editor
    }

    pub fn render(
        &self,
        input: &str,
        output: &Path,
        view: Option<(u32, u32)>,
        background: Color,
        scale: f64,
    ) -> Result<(), AppError> {
        let document = self.load_document(input)?;
        let png = match view {
            Some((width, height)) => {
                let screen = Size::new(width as f64, height as f64);
                let mut editor = self.editor_for(&document, screen);
                if let Some(bounds) = content_bounds(editor.scene().surface()) {
                    editor.viewport_mut().fit_to_bounds(bounds, FIT_PADDING);
                }
                let mut compositor = SkiaCompositor::new(width, height)?;
                let ctx = RenderContext::new(editor.scene().surface(), editor.viewport())
                    .with_background(background);
                compositor.render(&ctx)?;
                compositor.to_png()?
            }
            None => {
                let editor = self.editor_for(&document, Size::new(800.0, 600.0));
                let options = ExportOptions {
                    scale,
                    background,
                    ..ExportOptions::default()
                };
                pixboard_render::export_png(editor.scene().surface(), &options)?
            }
        };
        std::fs::write(output, png)?;
        log::info!("Wrote {}", output.display());
        Ok(())
    }

    /// Overview of the whole canvas, with the default view outlined.
    pub fn minimap(&self, input: &str, output: &Path, width: u32, height: u32) -> Result<(), AppError> {
        let document = self.load_document(input)?;
        let editor = self.editor_for(&document, Size::new(800.0, 600.0));
        let pixmap = pixboard_render::render_minimap(editor.scene().surface(), editor.viewport(), width, height)?;
        std::fs::write(output, raster::pixmap_to_png(&pixmap).map_err(RendererError::from)?)?;
        log::info!("Wrote {}", output.display());
        Ok(())
    }

    /// Human-readable summary.
    pub fn info(&self, input: &str) -> Result<String, AppError> {
        let document = self.load_document(input)?;
        let mut kinds: BTreeMap<String, usize> = BTreeMap::new();
        let mut rasterized = 0;
        for object in &document.objects {
            *kinds.entry(object.kind().to_string()).or_default() += 1;
            if let ObjectBody::Image(image) = &object.body {
                if image.image_url.starts_with("data:") {
                    rasterized += 1;
                }
            }
        }

        let mut lines = vec![
            format!("version: {}", document.version),
            format!("timestamp: {}", document.timestamp),
            format!("objects: {}", document.objects.len()),
        ];
        lines.extend(kinds.iter().map(|(kind, count)| format!("  {kind}: {count}")));
        if rasterized > 0 {
            lines.push(format!("embedded images: {rasterized}"));
        }
        let editor = self.editor_for(&document, Size::new(800.0, 600.0));
        if let Some(bounds) = content_bounds(editor.scene().surface()) {
            lines.push(format!(
                "bounds: ({:.1}, {:.1}) - ({:.1}, {:.1})",
                bounds.x0, bounds.y0, bounds.x1, bounds.y1
            ));
        }
        Ok(lines.join("\n"))
    }

    /// Share link for a `.canvas` file.
    pub fn share(&self, file: &Path, base_url: &str) -> Result<String, AppError> {
        let document = ShareDocument::read_file(file)?;
        let worker = ShareWorker::spawn()?;
        let payload = worker.encode(document)?.wait()?;
        Ok(share::build_share_link(base_url, &payload)?)
    }

    /// Write the document of a share link to a `.canvas` file.
    pub fn pack(&self, link: &str, output: Option<PathBuf>) -> Result<PathBuf, AppError> {
        let document = share::parse_share_link(link)?;
        let path = output.unwrap_or_else(|| PathBuf::from(document.file_name()));
        document.write_file(&path)?;
        Ok(path)
    }
}

fn parse_color(value: &str) -> Result<Color, AppError> {
    SerializableColor::from_hex(value)
        .map(Color::from)
        .ok_or_else(|| AppError::InvalidColor(value.to_string()))
}
