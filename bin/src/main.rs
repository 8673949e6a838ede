#[macro_use]
extern crate log;

mod demo;
mod output;

use clap::Parser;
use lucent3d_core::color::Color;
use lucent3d_core::options::{RenderOptions, SamplingMode};
use lucent3d_render::RaytraceRenderer;
use output::{ConsoleProgressBar, PngTarget};
use std::process::ExitCode;

/// Render the built-in demo scene with the raytrace engine.
#[derive(Parser)]
#[clap(author, version, about, long_about = None)]
struct Options {
    /// Output image width in pixels.
    #[clap(long, short = 'w', value_name = "NUM", default_value_t = 960)]
    width: usize,

    /// Output image height in pixels.
    #[clap(long, value_name = "NUM", default_value_t = 540)]
    height: usize,

    /// Sampling mode: direct (1x1), super (2x2) or ultra (3x3).
    #[clap(long, short = 's', value_name = "MODE", default_value = "direct")]
    sampling: String,

    /// Cast shadow rays.
    #[clap(long)]
    shadows: bool,

    /// Apply the depth-blur post-process.
    #[clap(long = "depth-blur")]
    depth_blur: bool,

    /// Darken pixels by depth.
    #[clap(long = "depth-darkness")]
    depth_darkness: bool,

    /// Number of render worker threads.
    #[clap(long = "threads", short = 't', value_name = "NUM", default_value_t = 1)]
    threads: usize,

    /// Write the rendered image to the given file.
    #[clap(
        long = "outfile",
        short = 'o',
        value_name = "FILE",
        default_value = "demo.png"
    )]
    outfile: String,
}

impl Options {
    fn sampling_mode(&self) -> Result<SamplingMode, String> {
        match self.sampling.as_str() {
            "direct" => Ok(SamplingMode::Direct),
            "super" => Ok(SamplingMode::Super),
            "ultra" => Ok(SamplingMode::Ultra),
            other => Err(format!("unknown sampling mode '{other}'")),
        }
    }

    fn render_options(&self) -> Result<RenderOptions, String> {
        Ok(RenderOptions {
            render_width: self.width,
            render_height: self.height,
            sampling_mode: self.sampling_mode()?,
            shadows_enabled: self.shadows,
            backdrop_enabled: false,
            depth_blur_enabled: self.depth_blur,
            depth_darkness_enabled: self.depth_darkness,
            number_of_render_threads: self.threads,
            scene_background_color: Color::new(0.05, 0.05, 0.08),
        })
    }
}

fn main() -> ExitCode {
    env_logger::init();
    let options = Options::parse();

    let render_options = match options.render_options() {
        Ok(render_options) => render_options,
        Err(e) => {
            error!("{e}");
            return ExitCode::FAILURE;
        }
    };

    let scene = demo::build_demo_scene(&render_options);
    let target = PngTarget::new(options.width, options.height);

    let mut renderer = RaytraceRenderer::new();
    renderer.add_progress_tracker(Box::new(ConsoleProgressBar::new()));
    renderer.render(&scene, &[&target], &render_options);

    if let Err(e) = target.save(&options.outfile) {
        error!("Failed to write '{}': {e}", options.outfile);
        return ExitCode::FAILURE;
    }
    info!("Wrote '{}'", options.outfile);
    ExitCode::SUCCESS
}
