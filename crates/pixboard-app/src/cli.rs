//! Command-line interface.
//!
//! Usage examples:
//!   pixboard render board.canvas -o board.png
//!   pixboard render 'https://example.com/#data=...' -o view.png --width 1280 --height 800
//!   pixboard minimap board.canvas -o overview.png
//!   pixboard info board.canvas
//!   pixboard share board.canvas --base-url https://example.com/board
//!   pixboard pack 'https://example.com/#data=...' -o board.canvas

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Headless tools for Pixboard canvases.
#[derive(Parser, Debug)]
#[command(name = "pixboard", version, about = "Render, inspect and share Pixboard canvases")]
pub struct Cli {
    /// Editor configuration (JSON). Missing fields use defaults.
    #[arg(long, global = true, value_name = "FILE.json")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Render a canvas to PNG.
    Render {
        /// A `.canvas` file or a share link.
        input: String,

        #[arg(short, long, value_name = "FILE.png")]
        output: PathBuf,

        /// View width in pixels. With --height, renders a view fitted to the
        /// content instead of a crop.
        #[arg(long, requires = "height")]
        width: Option<u32>,

        #[arg(long, requires = "width")]
        height: Option<u32>,

        /// Background color as `#rrggbb` or `#rrggbbaa`.
        #[arg(long, default_value = "#ffffff")]
        background: String,

        /// Resolution multiplier for cropped exports.
        #[arg(long, default_value_t = 1.0)]
        scale: f64,
    },

    /// Render the overview minimap of a canvas.
    Minimap {
        /// A `.canvas` file or a share link.
        input: String,

        #[arg(short, long, value_name = "FILE.png")]
        output: PathBuf,

        #[arg(long, default_value_t = pixboard_render::MINIMAP_WIDTH)]
        width: u32,

        #[arg(long, default_value_t = pixboard_render::MINIMAP_HEIGHT)]
        height: u32,
    },

    /// Print a summary of a canvas.
    Info {
        /// A `.canvas` file or a share link.
        input: String,
    },

    /// Turn a `.canvas` file into a share link.
    Share {
        file: PathBuf,

        #[arg(long, value_name = "URL")]
        base_url: String,
    },

    /// Turn a share link into a `.canvas` file.
    Pack {
        link: String,

        /// Output file; defaults to `canvas_share_<timestamp>.canvas`.
        #[arg(short, long, value_name = "FILE.canvas")]
        output: Option<PathBuf>,
    },
}
