//! Metronome simulator frontend.
//!
//! Provides three execution modes:
//!
//! - **GUI mode** (default): Scaled window showing the display and status LED,
//!   square-wave audio, keyboard/gamepad buttons, dynamic scale toggle.
//! - **Headless mode** (`--headless`): Runs for a fixed time and prints an
//!   event summary and beat timing report. Can record a trace or check the
//!   run against a recorded one.
//! - **Step mode** (`--step`): Interactive tock-by-tock stepping.

use anyhow::{bail, Context, Result};
use clap::Parser;
use gilrs::{Axis, Button as GilrsButton, Event as GilrsEvent, EventType, Gilrs};
use metronome_core::{
    Button, Event, Metronome, Trace, CLOCK_HZ, MAX_BEATS_PER_MEASURE, MAX_SUBDIVISIONS,
    MIN_BEATS_PER_MEASURE, MIN_SUBDIVISIONS, SCREEN_HEIGHT, SCREEN_WIDTH, SOFT_MAX_TEMPO,
    SOFT_MIN_TEMPO,
};
use minifb::{Key, Scale, ScaleMode, Window, WindowOptions};
use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Audio output sample rate in Hz
const AUDIO_SAMPLE_RATE: u32 = 44100;
/// Square wave amplitude (0.0–1.0)
const AUDIO_VOLUME: f32 = 0.15;
/// Analog stick deadzone
const STICK_DEADZONE: f32 = 0.3;

const WINDOW_TITLE: &str = "Metronome";

#[derive(Parser, Debug)]
#[command(name = "metronome-sim", version, about = "ATmega328P metronome simulator")]
struct Args {
    /// Initial tempo in beats per minute
    #[arg(short, long, default_value_t = 120,
        value_parser = clap::value_parser!(u8).range(SOFT_MIN_TEMPO as i64..=SOFT_MAX_TEMPO as i64))]
    tempo: u8,

    /// Beats per measure (0 = no accent)
    #[arg(short, long, default_value_t = 4,
        value_parser = clap::value_parser!(u8).range(MIN_BEATS_PER_MEASURE as i64..=MAX_BEATS_PER_MEASURE as i64))]
    beats: u8,

    /// Subdivisions per beat
    #[arg(short, long, default_value_t = 1,
        value_parser = clap::value_parser!(u8).range(MIN_SUBDIVISIONS as i64..=MAX_SUBDIVISIONS as i64))]
    subdivisions: u8,

    /// Run without a window
    #[arg(long)]
    headless: bool,

    /// Simulated run time in headless mode
    #[arg(long, default_value_t = 10.0)]
    seconds: f64,

    /// Write the headless run's event trace to this file
    #[arg(long, value_name = "FILE")]
    record: Option<PathBuf>,

    /// Compare the headless run against a recorded trace
    #[arg(long, value_name = "FILE")]
    verify: Option<PathBuf>,

    /// Interactive tock-by-tock stepping
    #[arg(long)]
    step: bool,

    /// Disable audio
    #[arg(long)]
    mute: bool,

    /// Initial window scale
    #[arg(long, default_value_t = 4, value_parser = clap::value_parser!(u8).range(1..=6))]
    scale: u8,

    /// Debug logging and per-run diagnostics
    #[arg(long)]
    debug: bool,
}

// ─── Audio Source ───────────────────────────────────────────────────────────

/// Square wave at whatever frequency the tone generator is currently
/// producing. The frequency is shared with the emulation thread as f32 bits.
struct ToneSource {
    freq: Arc<AtomicU32>,
    sample_rate: u32,
    phase: f32,
}

impl ToneSource {
    fn new(freq: Arc<AtomicU32>, sample_rate: u32) -> Self {
        ToneSource { freq, sample_rate, phase: 0.0 }
    }
}

impl Iterator for ToneSource {
    type Item = f32;
    fn next(&mut self) -> Option<f32> {
        let freq = f32::from_bits(self.freq.load(Ordering::Relaxed));
        if freq <= 0.0 {
            self.phase = 0.0;
            return Some(0.0);
        }
        let s = if self.phase < 0.5 { AUDIO_VOLUME } else { -AUDIO_VOLUME };
        self.phase += freq / self.sample_rate as f32;
        self.phase %= 1.0;
        Some(s)
    }
}

impl rodio::Source for ToneSource {
    fn current_frame_len(&self) -> Option<usize> { None }
    fn channels(&self) -> u16 { 1 }
    fn sample_rate(&self) -> u32 { self.sample_rate }
    fn total_duration(&self) -> Option<Duration> { None }
}

fn setup_audio(freq: Arc<AtomicU32>) -> Option<(rodio::OutputStream, rodio::OutputStreamHandle, rodio::Sink)> {
    match rodio::OutputStream::try_default() {
        Ok((stream, handle)) => match rodio::Sink::try_new(&handle) {
            Ok(sink) => {
                sink.append(ToneSource::new(freq, AUDIO_SAMPLE_RATE));
                Some((stream, handle, sink))
            }
            Err(e) => {
                log::warn!("audio sink: {}", e);
                None
            }
        },
        Err(e) => {
            log::warn!("audio device: {}", e);
            None
        }
    }
}

// ─── Gamepad ────────────────────────────────────────────────────────────────

#[derive(Default)]
struct GamepadState {
    up: bool,
    down: bool,
    cycle: bool,
    start_stop: bool,
    stick_y: f32,
}

impl GamepadState {
    fn eff_up(&self) -> bool { self.up || self.stick_y < -STICK_DEADZONE }
    fn eff_down(&self) -> bool { self.down || self.stick_y > STICK_DEADZONE }
}

fn init_gamepad() -> Option<Gilrs> {
    match Gilrs::new() {
        Ok(gilrs) => {
            let mut found = false;
            for (id, gp) in gilrs.gamepads() {
                log::debug!("gamepad [{}] \"{}\" ({})", id, gp.name(), gp.os_name());
                found = true;
            }
            if !found {
                log::debug!("no gamepad (hot-plug supported)");
            }
            Some(gilrs)
        }
        Err(e) => {
            log::warn!("gamepad: {}", e);
            None
        }
    }
}

fn poll_gamepad(gilrs: &mut Gilrs, state: &mut GamepadState) {
    while let Some(GilrsEvent { event, .. }) = gilrs.next_event() {
        match event {
            EventType::ButtonPressed(b, _) => apply_button(state, b, true),
            EventType::ButtonReleased(b, _) => apply_button(state, b, false),
            EventType::AxisChanged(a, v, _) => apply_axis(state, a, v),
            EventType::Connected => log::debug!("gamepad connected"),
            EventType::Disconnected => {
                log::debug!("gamepad disconnected");
                *state = GamepadState::default();
            }
            _ => {}
        }
    }
}

fn apply_button(state: &mut GamepadState, btn: GilrsButton, pressed: bool) {
    match btn {
        GilrsButton::DPadUp => state.up = pressed,
        GilrsButton::DPadDown => state.down = pressed,
        GilrsButton::South | GilrsButton::Start => state.start_stop = pressed,
        GilrsButton::East | GilrsButton::West | GilrsButton::North | GilrsButton::Select => {
            state.cycle = pressed
        }
        _ => {}
    }
}

fn apply_axis(state: &mut GamepadState, axis: Axis, value: f32) {
    match axis {
        Axis::LeftStickY | Axis::DPadY => state.stick_y = -value,
        _ => {}
    }
}

// ─── Main ───────────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    let args = Args::parse();

    let level = if args.debug { log::LevelFilter::Debug } else { log::LevelFilter::Info };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();

    let mut metronome = Metronome::with_settings(args.tempo, args.beats, args.subdivisions);
    log::info!(
        "tempo {} bpm, {} beats per measure, {} subdivisions per beat",
        args.tempo, args.beats, args.subdivisions
    );

    if args.step {
        run_step_mode(&mut metronome)
    } else if args.headless {
        run_headless(&args, &mut metronome)
    } else {
        run_gui(&args, &mut metronome)
    }
}

// ─── GUI Mode ───────────────────────────────────────────────────────────────

fn open_window(w: usize, h: usize) -> Result<Window> {
    let mut window = Window::new(
        WINDOW_TITLE, w, h,
        WindowOptions {
            scale: Scale::X1,
            scale_mode: ScaleMode::AspectRatioStretch,
            resize: true,
            ..Default::default()
        },
    )
    .with_context(|| format!("creating {}x{} window", w, h))?;
    window.set_target_fps(60);
    Ok(window)
}

fn run_gui(args: &Args, metronome: &mut Metronome) -> Result<()> {
    let mut scale = usize::from(args.scale);
    let mut scaled_w = SCREEN_WIDTH * scale;
    let mut scaled_h = SCREEN_HEIGHT * scale;
    let mut window = open_window(scaled_w, scaled_h)?;

    let freq = Arc::new(AtomicU32::new(0.0f32.to_bits()));
    let mut muted = args.mute;
    let mut _audio = if !muted { setup_audio(freq.clone()) } else { None };

    let mut gilrs = init_gamepad();
    let mut gp = GamepadState::default();
    let start_time = Instant::now();
    let mut last_fps_time = Instant::now();
    let mut fps_frames: u64 = 0;
    let mut scaled_buf = vec![0u32; scaled_w * scaled_h];
    let mut prev_m = false;
    let mut prev_num = [false; 6];

    while window.is_open() && !window.is_key_down(Key::Escape) {
        if let Some(ref mut g) = gilrs {
            poll_gamepad(g, &mut gp);
        }

        // Scale toggle (1-6)
        let num = [
            window.is_key_down(Key::Key1), window.is_key_down(Key::Key2),
            window.is_key_down(Key::Key3), window.is_key_down(Key::Key4),
            window.is_key_down(Key::Key5), window.is_key_down(Key::Key6),
        ];
        for (i, (&down, &was_down)) in num.iter().zip(prev_num.iter()).enumerate() {
            if down && !was_down && scale != i + 1 {
                scale = i + 1;
                scaled_w = SCREEN_WIDTH * scale;
                scaled_h = SCREEN_HEIGHT * scale;
                scaled_buf.resize(scaled_w * scaled_h, 0);
                window = open_window(scaled_w, scaled_h)?;
            }
        }
        prev_num = num;

        // Mute (M)
        let m = window.is_key_down(Key::M);
        if m && !prev_m {
            muted = !muted;
            if muted {
                freq.store(0.0f32.to_bits(), Ordering::Relaxed);
                _audio = None;
            } else {
                _audio = setup_audio(freq.clone());
            }
        }
        prev_m = m;

        // Input
        metronome.set_button(Button::Up, window.is_key_down(Key::Up) || gp.eff_up());
        metronome.set_button(Button::Down, window.is_key_down(Key::Down) || gp.eff_down());
        metronome.set_button(Button::Cycle, window.is_key_down(Key::Tab) || gp.cycle);
        metronome.set_button(Button::StartStop, window.is_key_down(Key::Space) || gp.start_stop);

        metronome.run_frame();
        fps_frames += 1;

        if !muted {
            freq.store(metronome.audio_tone_hz().to_bits(), Ordering::Relaxed);
        }

        // Render
        let pixels = metronome.framebuffer_u32();
        for y in 0..SCREEN_HEIGHT {
            for x in 0..SCREEN_WIDTH {
                let c = pixels[y * SCREEN_WIDTH + x];
                for sy in 0..scale {
                    let base = (y * scale + sy) * scaled_w + x * scale;
                    scaled_buf[base..base + scale].fill(c);
                }
            }
        }
        window
            .update_with_buffer(&scaled_buf, scaled_w, scaled_h)
            .context("updating window")?;

        if last_fps_time.elapsed() >= Duration::from_secs(2) {
            let fps = fps_frames as f64 / last_fps_time.elapsed().as_secs_f64();
            let engine = metronome.engine();
            let state = if engine.is_running() { "" } else { " [STOP]" };
            let ms = if muted { " [MUTE]" } else { "" };
            window.set_title(&format!(
                "{} - {} bpm {}/{}{}{} - {:.0} FPS ({}x)",
                WINDOW_TITLE, engine.tempo(), engine.beats_per_measure(),
                engine.subdivisions_per_beat(), state, ms, fps, scale
            ));
            fps_frames = 0;
            last_fps_time = Instant::now();
        }
    }

    let e = start_time.elapsed().as_secs_f64();
    log::debug!(
        "{} frames in {:.1}s ({:.1} FPS), {} cycles, {} tocks",
        metronome.frame_count, e, metronome.frame_count as f64 / e, metronome.tick(), metronome.tocks
    );
    Ok(())
}

// ─── Step Mode ──────────────────────────────────────────────────────────────

fn print_state(metronome: &Metronome) {
    let engine = metronome.engine();
    let pos = engine.position();
    let period = engine.period();
    println!(
        "tick={:<12} tocks={:<8} {:?} tempo={} beats={} subs={}",
        metronome.tick(), metronome.tocks, engine.state(), engine.tempo(),
        engine.beats_per_measure(), engine.subdivisions_per_beat()
    );
    println!(
        "  beat {} sub {}  tock%beat={} tock%sub={}  period={} (floor {} rem {} tock%tempo {})",
        pos.beat_index, pos.subdivision_index, pos.tock_count_mod_beat,
        pos.tock_count_mod_subdivision, period.current_period(), period.floor,
        period.remainder, period.tock_count_mod_tempo
    );
    println!(
        "  display \"{}\"  led={}  tone={:.1} Hz",
        metronome.display_text(), metronome.led(), metronome.audio_tone_hz()
    );
}

fn run_step_mode(metronome: &mut Metronome) -> Result<()> {
    println!("Step mode: Enter=tock, N<enter>=N tocks, s=start/stop, +/-=tempo, q=quit");
    metronome.start_recording();
    print_state(metronome);

    let stdin = std::io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        print!("tock> ");
        std::io::stdout().flush().context("flushing stdout")?;
        let line = match lines.next() {
            Some(line) => line.context("reading stdin")?,
            None => break,
        };
        let cmd = line.trim();
        match cmd {
            "q" | "quit" => break,
            "s" => {
                metronome.engine_mut().toggle();
                print_state(metronome);
                continue;
            }
            "+" | "-" => {
                metronome.engine_mut().increment_tempo(if cmd == "+" { 1 } else { -1 });
                print_state(metronome);
                continue;
            }
            _ => {}
        }
        let n: usize = if cmd.is_empty() {
            1
        } else {
            match cmd.parse() {
                Ok(n) => n,
                Err(_) => {
                    println!("unknown command {:?}", cmd);
                    continue;
                }
            }
        };
        for _ in 0..n {
            if !metronome.step_tock() {
                println!("stopped (s to start)");
                break;
            }
        }
        for te in metronome.take_trace().events.iter().rev().take(8).rev() {
            println!("  @{:<12} {:?}", te.tick, te.event);
        }
        metronome.start_recording();
        print_state(metronome);
    }
    println!("Total: {} tocks, {} cycles", metronome.tocks, metronome.tick());
    Ok(())
}

// ─── Headless Mode ──────────────────────────────────────────────────────────

fn run_headless(args: &Args, metronome: &mut Metronome) -> Result<()> {
    if args.seconds.is_nan() || args.seconds <= 0.0 {
        bail!("--seconds must be positive, got {}", args.seconds);
    }
    let cycles = (args.seconds * f64::from(CLOCK_HZ)).round() as u64;
    log::debug!("running {} cycles", cycles);

    metronome.start_recording();
    metronome.run_cycles(cycles);
    let trace = metronome.take_trace();

    let mut beats = 0usize;
    let mut subdivisions = 0usize;
    let mut changes = 0usize;
    for te in &trace.events {
        match te.event {
            Event::Beat { .. } => beats += 1,
            Event::Subdivision { .. } => subdivisions += 1,
            _ => changes += 1,
        }
    }
    println!(
        "{:.3} s simulated: {} tocks, {} beats, {} subdivisions, {} setting changes",
        args.seconds, metronome.tocks, beats, subdivisions, changes
    );
    if args.debug {
        for te in trace.events.iter().take(16) {
            println!("  @{:<12} {:?}", te.tick, te.event);
        }
    }

    let report = trace.report();
    println!("Timing report:");
    println!("  beats            {} ({} accented)", report.beats, report.accented_beats);
    println!("  intervals        {}", report.intervals);
    println!("  mean interval    {:.1} cycles", report.mean_interval_cycles);
    println!("  measured tempo   {:.6} bpm", report.measured_bpm);
    println!("  max deviation    {:.1} timer counts", report.max_deviation_counts);

    if let Some(path) = &args.record {
        trace
            .save_to_file(path)
            .with_context(|| format!("recording trace to {}", path.display()))?;
        println!("Recorded {} events to {}", trace.events.len(), path.display());
    }

    if let Some(path) = &args.verify {
        let reference = Trace::load_from_file(path)
            .with_context(|| format!("loading trace {}", path.display()))?;
        let settings = |t: &Trace| (t.clock_hz, t.timer_prescale, t.tempo, t.beats_per_measure, t.subdivisions_per_beat);
        if settings(&reference) != settings(&trace) {
            bail!(
                "{} was recorded at tempo {} / {} beats / {} subdivisions, this run used {} / {} / {}",
                path.display(), reference.tempo, reference.beats_per_measure,
                reference.subdivisions_per_beat, trace.tempo, trace.beats_per_measure,
                trace.subdivisions_per_beat
            );
        }
        match trace.first_divergence(&reference) {
            None => println!("Verified {} events against {}", trace.events.len(), path.display()),
            Some(i) => bail!(
                "trace diverges from {} at event {}: got {:?}, expected {:?}",
                path.display(), i, trace.events.get(i), reference.events.get(i)
            ),
        }
    }
    Ok(())
}
