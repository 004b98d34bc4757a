//! Hover Racer entry point
//!
//! Handles platform-specific initialization and runs the race loop.

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

#[cfg(target_arch = "wasm32")]
mod wasm_game {
    use std::cell::RefCell;
    use std::rc::Rc;
    use wasm_bindgen::prelude::*;
    use web_sys::{Document, KeyboardEvent, WheelEvent};

    use hover_racer::consts::*;
    use hover_racer::format_race_time;
    use hover_racer::settings::RaceSettings;
    use hover_racer::sim::{RaceEvent, RaceState, TickInput, ordinal, tick};

    /// Game instance holding all state
    struct Game {
        state: RaceState,
        accumulator: f32,
        last_time: f64,
        input: TickInput,
    }

    impl Game {
        fn new(state: RaceState) -> Self {
            Self {
                state,
                accumulator: 0.0,
                last_time: 0.0,
                input: TickInput::default(),
            }
        }

        /// Run simulation ticks
        fn update(&mut self, dt_ms: f32) {
            let dt_ms = dt_ms.min(100.0);
            self.accumulator += dt_ms;

            let mut substeps = 0;
            while self.accumulator >= SIM_DT_MS && substeps < MAX_SUBSTEPS {
                tick(&mut self.state, &self.input, SIM_DT_MS);
                self.accumulator -= SIM_DT_MS;
                substeps += 1;

                // Clear one-shot inputs after processing
                self.input.clear_one_shots();
            }
        }

        /// Apply pending race events to the DOM HUD
        fn update_hud(&mut self) {
            let Some(document) = web_sys::window().and_then(|w| w.document()) else {
                return;
            };

            for event in self.state.drain_events() {
                match event {
                    RaceEvent::CountdownChanged { label } => {
                        set_text(&document, "countdown", label.as_deref().unwrap_or(""));
                    }
                    RaceEvent::RaceStarted => log::info!("GO!"),
                    RaceEvent::ThrustChanged { thrust } => {
                        if let Some(el) = document.get_element_by_id("gauge-fill") {
                            let top = format!("{}vh", 50.0 * (1.0 - thrust));
                            let _ = el.set_attribute("style", &format!("top: {top}"));
                        }
                    }
                    RaceEvent::LapChanged { racer: 0, lap } => {
                        let laps = self.state.settings.laps;
                        set_text(&document, "lap", &format!("Lap {}/{}", lap.min(laps), laps));
                    }
                    RaceEvent::RankChanged { rank } => set_text(&document, "rank", &ordinal(rank)),
                    RaceEvent::OutOfBounds { racer: 0 } => set_class(&document, "curtain", "closed"),
                    RaceEvent::Respawned { racer: 0 } => set_class(&document, "curtain", ""),
                    RaceEvent::RaceFinished { rank, time_ms } => {
                        set_text(&document, "finish-rank", &ordinal(rank));
                        set_text(&document, "finish-time", &format_race_time(time_ms));
                        set_class(&document, "finish", "");
                    }
                    _ => {}
                }
            }

            if !self.state.is_finished() {
                set_text(&document, "timer", &format_race_time(self.state.race_time_ms));
            }
        }
    }

    fn set_text(document: &Document, id: &str, text: &str) {
        if let Some(el) = document.get_element_by_id(id) {
            el.set_text_content(Some(text));
        }
    }

    fn set_class(document: &Document, id: &str, class: &str) {
        if let Some(el) = document.get_element_by_id(id) {
            let _ = el.set_attribute("class", class);
        }
    }

    /// `?track=ring&vehicle=speeder_2` overrides the stored selection
    fn apply_query(settings: &mut RaceSettings) {
        let Some(search) = web_sys::window().and_then(|w| w.location().search().ok()) else {
            return;
        };
        let Ok(params) = web_sys::UrlSearchParams::new_with_str(&search) else {
            return;
        };
        if let Some(track) = params.get("track") {
            settings.track = track;
        }
        if let Some(vehicle) = params.get("vehicle") {
            settings.vehicle = vehicle;
        }
    }

    pub fn run() {
        console_error_panic_hook::set_once();
        let _ = console_log::init_with_level(log::Level::Info);

        log::info!("Hover Racer starting...");

        let mut settings = RaceSettings::load();
        apply_query(&mut settings);

        let state = match RaceState::from_settings(settings.clone()) {
            Ok(state) => state,
            Err(e) => {
                log::error!("Race setup failed: {e}");
                return;
            }
        };
        // Persist only selections that loaded
        settings.save();

        let game = Rc::new(RefCell::new(Game::new(state)));
        setup_input_handlers(game.clone());
        request_animation_frame(game);
    }

    fn setup_input_handlers(game: Rc<RefCell<Game>>) {
        let Some(window) = web_sys::window() else {
            return;
        };

        for (kind, pressed) in [("keydown", true), ("keyup", false)] {
            let game = game.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |event: KeyboardEvent| {
                let key = event.key().to_lowercase();
                if game.borrow_mut().input.set_key(&key, pressed) && key.starts_with("arrow") {
                    event.prevent_default();
                }
            });
            let _ = window.add_event_listener_with_callback(kind, closure.as_ref().unchecked_ref());
            closure.forget();
        }

        // Wheel nudges thrust like the arrow keys
        {
            let game = game.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |event: WheelEvent| {
                let key = if event.delta_y() < 0.0 { "arrowup" } else { "arrowdown" };
                game.borrow_mut().input.set_key(key, true);
            });
            let _ = window.add_event_listener_with_callback("wheel", closure.as_ref().unchecked_ref());
            closure.forget();
        }
    }

    fn request_animation_frame(game: Rc<RefCell<Game>>) {
        let Some(window) = web_sys::window() else {
            return;
        };
        let closure = Closure::once(move |time: f64| {
            game_loop(game, time);
        });
        let _ = window.request_animation_frame(closure.as_ref().unchecked_ref());
        closure.forget();
    }

    fn game_loop(game: Rc<RefCell<Game>>, time: f64) {
        {
            let mut g = game.borrow_mut();

            // Calculate delta time
            let dt_ms = if g.last_time > 0.0 {
                (time - g.last_time) as f32
            } else {
                SIM_DT_MS
            };
            g.last_time = time;

            g.update(dt_ms);
            g.update_hud();
        }

        request_animation_frame(game);
    }
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn wasm_main() {
    wasm_game::run();
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    use hover_racer::consts::SIM_DT_MS;
    use hover_racer::settings::RaceSettings;
    use hover_racer::sim::{RaceEvent, RaceState, TickInput, ordinal, tick};

    env_logger::init();
    log::info!("Hover Racer (native) starting...");
    log::info!("Rendering needs the browser build - running a headless race instead");

    let mut settings = RaceSettings::load();
    if let Some(track) = std::env::args().nth(1) {
        settings.track = track;
    }

    let mut state = match RaceState::from_settings(settings) {
        Ok(state) => state,
        Err(e) => {
            log::error!("Race setup failed: {e}");
            std::process::exit(1);
        }
    };

    // Player holds the throttle; CPUs drive themselves
    let input = TickInput {
        throttle: true,
        ..Default::default()
    };
    let max_ticks = (5.0 * 60_000.0 / SIM_DT_MS) as u64;
    while !state.is_finished() && state.time_ticks < max_ticks {
        tick(&mut state, &input, SIM_DT_MS);
        for event in state.drain_events() {
            match event {
                RaceEvent::LapChanged { racer, lap } => log::info!("Racer {racer} on lap {lap}"),
                RaceEvent::OutOfBounds { racer } => log::info!("Racer {racer} fell off"),
                RaceEvent::RaceFinished { rank, time_ms } => println!(
                    "Finished {} in {}",
                    ordinal(rank),
                    hover_racer::format_race_time(time_ms)
                ),
                _ => {}
            }
        }
    }

    if !state.is_finished() {
        println!(
            "Race not finished after {} - player on lap {}, {}",
            hover_racer::format_race_time(state.race_time_ms),
            state.player().progress.laps,
            ordinal(state.rank)
        );
    }
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // WASM entry point is wasm_main, this is just to satisfy the compiler
}
