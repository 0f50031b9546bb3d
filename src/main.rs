//! Layer Composer - headless demo
//!
//! Builds a small layer tree from settings, runs it for a fixed number of
//! frames and writes PNG snapshots of the composited output.

use std::path::PathBuf;
use std::process::ExitCode;

use layer_composer::compositor::{layer_ref, scene_ref, Layer, Scene, SceneContent, SolidColor};
use layer_composer::effects::builtin;
use layer_composer::render::{Canvas, Rect};
use layer_composer::settings::ComposerSettings;
use layer_composer::telemetry::init_logging;
use layer_composer::{Composer, ComposeResult, Timeline};

/// A vertical bar sweeping across the viewport once per second
struct MovingBar {
    color: [f32; 4],
    phase: f32,
}

impl SceneContent for MovingBar {
    fn update(&mut self, timeline: &Timeline) {
        self.phase = timeline.now().fract() as f32;
    }

    fn draw(&mut self, canvas: &mut Canvas<'_>, opacity: f32) -> ComposeResult<()> {
        let viewport = canvas.viewport();
        let bar_width = (viewport.width / 8.0).max(1.0);
        let x = viewport.x + (viewport.width - bar_width) * self.phase;
        let [r, g, b, a] = self.color;
        let bar = Rect::new(x, viewport.y, bar_width, viewport.height);
        canvas.fill_rect(bar, [r, g, b, a * opacity])
    }
}

fn run(settings: &ComposerSettings) -> ComposeResult<()> {
    let mut composer = Composer::from_settings(settings)?;
    let (width, height, samples) = (settings.width, settings.height, settings.msaa_samples);

    // Background: two solid scenes to crossfade between
    let background = composer.create_layer(width, height, samples)?;
    {
        let mut background = background.borrow_mut();
        background.add_scene(scene_ref(Scene::new(SolidColor::new([0.1, 0.2, 0.6, 1.0]))));
        let sunset = SolidColor::new([0.7, 0.3, 0.1, 1.0]);
        background.add_scene(scene_ref(Scene::with_opacity(sunset, 0.0)));
    }

    // Foreground: a trailing bar
    let mut foreground = Layer::new(composer.backend(), width, height, samples)?;
    foreground.set_fade(0.85);
    foreground.add_scene(scene_ref(Scene::new(MovingBar {
        color: [1.0, 1.0, 1.0, 1.0],
        phase: 0.0,
    })));

    {
        let mut root = composer.root().borrow_mut();
        root.add_layer(background.clone());
        root.add_layer(layer_ref(foreground));
    }

    for name in &settings.effects {
        match builtin::create_by_name(name, composer.backend())? {
            Some(stage) => composer.add_postprocess(stage)?,
            None => tracing::warn!("Unknown effect '{}', skipping", name),
        }
    }

    background
        .borrow_mut()
        .show_scene(composer.timeline(), 1, settings.crossfade_seconds)?;

    let output = composer.create_output()?;
    let dt = settings.frame_interval();
    let frames = settings.frame_count.max(1);
    for frame in 1..=frames {
        composer.frame(dt)?;
        if frame == frames / 2 || frame == frames {
            composer.present(&output)?;
            let path: PathBuf = settings.output_dir.join(format!("frame_{frame:05}.png"));
            composer.snapshot(&output, &path)?;
            tracing::info!("Saved {}", path.display());
        }
    }

    let frame_stats = composer.profiler().stats();
    tracing::info!(
        "Rendered {} frames: avg {:.3} ms, p95 {:.3} ms",
        composer.frame_index(),
        frame_stats.avg_ms,
        frame_stats.p95_ms
    );
    let render_stats = composer.backend().stats();
    tracing::info!(
        draw_calls = render_stats.draw_calls,
        clears = render_stats.clears,
        effect_passes = render_stats.effect_passes,
        live_targets = render_stats.live_targets,
        "Backend stats"
    );
    Ok(())
}

fn main() -> ExitCode {
    let settings = match std::env::args_os().nth(1) {
        Some(path) => match ComposerSettings::load(&PathBuf::from(path)) {
            Ok(settings) => settings,
            Err(e) => {
                eprintln!("Failed to load settings: {}", e);
                return ExitCode::FAILURE;
            }
        },
        // Logging is not up yet, so report straight to stderr
        None => ComposerSettings::load_or_default().unwrap_or_else(|e| {
            eprintln!("Ignoring unreadable settings, using defaults: {}", e);
            ComposerSettings::default()
        }),
    };

    // Keep the guard alive for the program duration
    let _log_guard = match init_logging(&settings.logging) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {}", e);
            None
        }
    };

    tracing::info!("Layer Composer v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        "Output: {}x{} @ {} fps, backend {:?}",
        settings.width,
        settings.height,
        settings.target_fps,
        settings.backend
    );

    match run(&settings) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("Composer failed: {}", e);
            ExitCode::FAILURE
        }
    }
}
