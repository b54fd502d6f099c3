//! Canvas memory board: DOM/canvas setup, click and hover handling, the
//! preload gate, per-tick countdowns, and rendering.
//!
//! All mutable game state lives in one `GameState` record held in a
//! thread-local slot. Input handlers and the frame loop borrow it mutably
//! for the duration of a single callback; the deck and clock underneath are
//! plain values with no ambient access of their own.

use std::cell::RefCell;

use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::spawn_local;
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement, HtmlImageElement, window};

use crate::TILE_IMAGES;
use crate::preload;
use crate::timestep::{self, LoopHandle, Simulation, StepClock};

pub mod deck;
use deck::{Deck, DeckConfig, Lcg, RevealOutcome, TileState};

/// Simulation tick size: 20 Hz, decoupled from the render cadence.
pub const UPDATE_INTERVAL_MS: f64 = 50.0;

const CANVAS_SIZE: u32 = 640;
const CONCEAL_DELAY_TICKS: u32 = 18; // 900 ms of sim time before a mismatch flips back
const BANNER_TICKS: u32 = 30; // transient banners last 1.5 s of sim time

/// Transient status line shown under the board. `ticks_left = None` pins the
/// banner (used for the win message).
struct Banner {
    text: String,
    ticks_left: Option<u32>,
}

/// Runtime board state.
struct GameState {
    canvas: HtmlCanvasElement,
    ctx: CanvasRenderingContext2d,
    clock: StepClock,
    deck: Deck,
    // Parallel to TILE_IMAGES; None marks a slot whose image failed to load.
    images: Vec<Option<HtmlImageElement>>,
    conceal_in: Option<u32>,
    banner: Option<Banner>,
    attempts: u32,
    hover_tile: Option<(u8, u8)>,
    won: bool,
}

impl Simulation for GameState {
    fn update(&mut self, tick_ms: f64) {
        step(self, tick_ms);
    }
    fn render(&mut self, frame_ms: f64) {
        draw(self, frame_ms);
    }
}

thread_local! {
    static STATE: RefCell<Option<GameState>> = RefCell::new(None);
    static LOOP: RefCell<Option<LoopHandle>> = RefCell::new(None);
}

// --- Startup / shutdown -------------------------------------------------------

/// Wires the DOM, deals a deck, and opens the preload gate: the frame loop
/// only starts once every manifest image has reported in.
pub fn start(config: DeckConfig) -> Result<(), JsValue> {
    stop();

    let win = window().ok_or_else(|| JsValue::from_str("no window"))?;
    let doc = win
        .document()
        .ok_or_else(|| JsValue::from_str("no document"))?;

    // Create / reuse the board canvas. Input listeners attach once, on
    // creation, so a restart does not stack duplicates.
    let canvas: HtmlCanvasElement = if let Some(el) = doc.get_element_by_id("mt-canvas") {
        el.dyn_into()?
    } else {
        let c: HtmlCanvasElement = doc.create_element("canvas")?.dyn_into()?;
        c.set_id("mt-canvas");
        c.set_width(CANVAS_SIZE);
        c.set_height(CANVAS_SIZE);
        c.set_attribute("style", "position:fixed; left:50%; top:45%; transform:translate(-50%,-50%); box-shadow:0 0 32px 0 rgba(0,0,0,0.18); border-radius:18px; border:2px solid #222; background:#181818; z-index:20;").ok();
        doc.body().unwrap().append_child(&c)?;
        register_input_listeners(&c)?;
        c
    };
    let ctx: CanvasRenderingContext2d = canvas.get_context("2d")?.unwrap().dyn_into()?;
    ctx.set_font("28px 'Fira Code', monospace");
    ctx.set_text_align("center");

    ensure_overlays(&doc)?;

    // Deal up front so a bad config fails the call instead of the async task.
    let now = win.performance().unwrap().now();
    let mut rng = Lcg::new(deck_seed(now));
    let deck = Deck::deal(config, TILE_IMAGES.len(), &mut rng)
        .map_err(|e| JsValue::from_str(&e.to_string()))?;

    spawn_local(async move {
        let batch =
            preload::load_batch(TILE_IMAGES, |id| preload::fetch_image(id.to_string())).await;
        if batch.failure_count() > 0 {
            let ids: Vec<&str> = batch.failures().map(|f| f.id.as_str()).collect();
            web_sys::console::warn_1(
                &format!(
                    "{} of {} tile images failed to load (placeholders shown): {}",
                    batch.failure_count(),
                    batch.len(),
                    ids.join(", ")
                )
                .into(),
            );
        }
        let images: Vec<Option<HtmlImageElement>> =
            batch.into_slots().into_iter().map(|slot| slot.ok()).collect();

        let start_ms = window()
            .and_then(|w| w.performance())
            .map(|p| p.now())
            .unwrap_or(0.0);
        let state = GameState {
            canvas,
            ctx,
            clock: StepClock::new(UPDATE_INTERVAL_MS, start_ms),
            deck,
            images,
            conceal_in: None,
            banner: Some(Banner {
                text: "Find the matching tiles".to_string(),
                ticks_left: Some(BANNER_TICKS * 2),
            }),
            attempts: 0,
            hover_tile: None,
            won: false,
        };
        STATE.with(|cell| cell.replace(Some(state)));

        match timestep::start_frame_loop(frame) {
            Ok(handle) => {
                LOOP.with(|cell| cell.replace(Some(handle)));
            }
            Err(_) => web_sys::console::warn_1(&"could not start the frame loop".into()),
        }
    });

    Ok(())
}

/// Cancels the running loop, if any. The board stays on screen frozen;
/// calling `start` again re-deals and restarts with a fresh clock.
pub fn stop() {
    LOOP.with(|cell| {
        if let Some(handle) = cell.borrow_mut().take() {
            handle.stop();
        }
    });
}

fn frame(ts: f64) {
    STATE.with(|cell| {
        if let Some(state) = cell.borrow_mut().as_mut() {
            let mut clock = state.clock;
            clock.advance_frame(state, ts);
            state.clock = clock;
        }
    });
}

fn deck_seed(now_ms: f64) -> u64 {
    #[cfg(feature = "rng")]
    {
        let mut buf = [0u8; 8];
        if getrandom::getrandom(&mut buf).is_ok() {
            return u64::from_le_bytes(buf);
        }
    }
    now_ms.to_bits()
}

// --- DOM wiring ---------------------------------------------------------------

fn ensure_overlays(doc: &web_sys::Document) -> Result<(), JsValue> {
    if doc.get_element_by_id("mt-banner").is_none() {
        if let Some(body) = doc.body() {
            let div = doc.create_element("div")?;
            div.set_id("mt-banner");
            div.set_text_content(Some(""));
            div.set_attribute("style", "position:fixed; bottom:120px; left:50%; transform:translateX(-50%); font-family:'Fira Code', monospace; font-size:20px; padding:4px 12px; background:rgba(0,0,0,0.35); border:1px solid #333; border-radius:6px; color:#ffd166; z-index:30;").ok();
            body.append_child(&div)?;
        }
    }
    if doc.get_element_by_id("mt-score").is_none() {
        if let Some(body) = doc.body() {
            let div = doc.create_element("div")?;
            div.set_id("mt-score");
            div.set_text_content(Some("Sets: 0/0 | Attempts: 0"));
            div.set_attribute("style", "position:fixed; top:10px; left:12px; font-family:'Fira Code', monospace; font-size:15px; padding:4px 8px; background:rgba(0,0,0,0.42); border:1px solid #333; border-radius:6px; color:#ffd166; z-index:45; letter-spacing:0.5px;").ok();
            body.append_child(&div)?;
        }
    }
    Ok(())
}

fn register_input_listeners(canvas: &HtmlCanvasElement) -> Result<(), JsValue> {
    // Click: reveal the tile under the cursor.
    {
        let canvas_click = canvas.clone();
        let closure = Closure::wrap(Box::new(move |evt: web_sys::MouseEvent| {
            let x = evt.offset_x() as f64;
            let y = evt.offset_y() as f64;
            STATE.with(|cell| {
                if let Some(state) = cell.borrow_mut().as_mut() {
                    if let Some((col, row)) = tile_under(state, &canvas_click, x, y) {
                        on_click(state, col, row);
                    }
                }
            });
        }) as Box<dyn FnMut(_)>);
        canvas.add_event_listener_with_callback("click", closure.as_ref().unchecked_ref())?;
        closure.forget();
    }
    // Hover tracking highlights the tile under the cursor.
    {
        let canvas_move = canvas.clone();
        let closure = Closure::wrap(Box::new(move |evt: web_sys::MouseEvent| {
            let x = evt.offset_x() as f64;
            let y = evt.offset_y() as f64;
            STATE.with(|cell| {
                if let Some(state) = cell.borrow_mut().as_mut() {
                    state.hover_tile = tile_under(state, &canvas_move, x, y);
                }
            });
        }) as Box<dyn FnMut(_)>);
        canvas.add_event_listener_with_callback("mousemove", closure.as_ref().unchecked_ref())?;
        closure.forget();
    }
    // Mouse leave clears hover.
    {
        let closure = Closure::wrap(Box::new(move |_evt: web_sys::MouseEvent| {
            STATE.with(|cell| {
                if let Some(state) = cell.borrow_mut().as_mut() {
                    state.hover_tile = None;
                }
            });
        }) as Box<dyn FnMut(_)>);
        canvas.add_event_listener_with_callback("mouseleave", closure.as_ref().unchecked_ref())?;
        closure.forget();
    }
    Ok(())
}

/// Canvas-local pixel coordinates to a grid position, if inside the board.
fn tile_under(
    state: &GameState,
    canvas: &HtmlCanvasElement,
    x: f64,
    y: f64,
) -> Option<(u8, u8)> {
    let config = state.deck.config();
    let cw = canvas.width() as f64 / config.cols as f64;
    let ch = canvas.height() as f64 / config.rows as f64;
    if x >= 0.0 && y >= 0.0 && x < canvas.width() as f64 && y < canvas.height() as f64 {
        Some(((x / cw).floor() as u8, (y / ch).floor() as u8))
    } else {
        None
    }
}

// --- Game logic ---------------------------------------------------------------

fn on_click(state: &mut GameState, col: u8, row: u8) {
    if state.won {
        return;
    }
    let index = state.deck.config().index(col, row);
    match state.deck.reveal(index) {
        RevealOutcome::Ignored | RevealOutcome::Revealed => {}
        RevealOutcome::Matched { .. } => {
            state.attempts += 1;
            if state.deck.all_matched() {
                state.won = true;
                state.banner = Some(Banner {
                    text: format!(
                        "All {} sets found in {} attempts!",
                        state.deck.total_sets(),
                        state.attempts
                    ),
                    ticks_left: None,
                });
            } else {
                state.banner = Some(Banner {
                    text: "It's a match!".to_string(),
                    ticks_left: Some(BANNER_TICKS),
                });
            }
        }
        RevealOutcome::Mismatched => {
            state.attempts += 1;
            state.conceal_in = Some(CONCEAL_DELAY_TICKS);
            state.banner = Some(Banner {
                text: "No match".to_string(),
                ticks_left: Some(BANNER_TICKS),
            });
        }
    }
}

/// One fixed simulation tick: countdowns only, no wall-clock access.
fn step(state: &mut GameState, _tick_ms: f64) {
    if let Some(left) = state.conceal_in {
        if left <= 1 {
            state.deck.conceal_unmatched();
            state.conceal_in = None;
        } else {
            state.conceal_in = Some(left - 1);
        }
    }
    let expired = match state.banner.as_mut() {
        Some(banner) => match banner.ticks_left.as_mut() {
            Some(ticks) if *ticks <= 1 => true,
            Some(ticks) => {
                *ticks -= 1;
                false
            }
            None => false,
        },
        None => false,
    };
    if expired {
        state.banner = None;
    }
}

// --- Rendering ----------------------------------------------------------------

fn draw(state: &mut GameState, frame_ms: f64) {
    let config = state.deck.config();
    let cell_w = state.canvas.width() as f64 / config.cols as f64;
    let cell_h = state.canvas.height() as f64 / config.rows as f64;

    // Backdrop with a slow cosmetic pulse keyed off the frame time.
    let phase = (frame_ms / 2400.0) % 1.0;
    let pulse = ((phase * std::f64::consts::TAU).sin() * 0.5 + 0.5) * 0.25;
    let bg = (15.0 + pulse * 40.0) as i32;
    let color = format!(
        "rgb({},{},{})",
        (bg + 18).clamp(0, 255),
        (bg + 14).clamp(0, 255),
        (bg + 12).clamp(0, 255)
    );
    state.ctx.set_fill_style_str(&color);
    state.ctx.fill_rect(
        0.0,
        0.0,
        state.canvas.width() as f64,
        state.canvas.height() as f64,
    );

    for row in 0..config.rows {
        for col in 0..config.cols {
            let tile = state.deck.tiles()[config.index(col, row)];
            let px = col as f64 * cell_w;
            let py = row as f64 * cell_h;
            match tile.state {
                TileState::Hidden => draw_card_back(&state.ctx, px, py, cell_w, cell_h),
                TileState::Revealed => {
                    draw_face(state, tile.face, px, py, cell_w, cell_h, false)
                }
                TileState::Matched => draw_face(state, tile.face, px, py, cell_w, cell_h, true),
            }
        }
    }

    // Hover highlight on hidden tiles only.
    if !state.won {
        if let Some((hx, hy)) = state.hover_tile {
            if hx < config.cols && hy < config.rows {
                let hidden = matches!(
                    state.deck.tile(config.index(hx, hy)).map(|t| t.state),
                    Some(TileState::Hidden)
                );
                if hidden {
                    let px = hx as f64 * cell_w;
                    let py = hy as f64 * cell_h;
                    state.ctx.set_stroke_style_str("rgba(255,240,150,0.55)");
                    state.ctx.set_line_width(3.0);
                    state
                        .ctx
                        .stroke_rect(px + 1.5, py + 1.5, cell_w - 3.0, cell_h - 3.0);
                }
            }
        }
    }

    if state.won {
        draw_win_overlay(state);
    }

    refresh_overlays(state);
}

fn draw_card_back(ctx: &CanvasRenderingContext2d, px: f64, py: f64, cw: f64, ch: f64) {
    ctx.set_fill_style_str("#26364a");
    ctx.fill_rect(px + 4.0, py + 4.0, cw - 8.0, ch - 8.0);
    ctx.set_stroke_style_str("#445b77");
    ctx.set_line_width(2.0);
    ctx.stroke_rect(px + 4.0, py + 4.0, cw - 8.0, ch - 8.0);
    ctx.set_font("28px 'Fira Code', monospace");
    ctx.set_fill_style_str("rgba(255,255,255,0.35)");
    ctx.fill_text("?", px + cw / 2.0, py + ch / 2.0 + 10.0).ok();
}

fn draw_face(state: &GameState, face: usize, px: f64, py: f64, cw: f64, ch: f64, matched: bool) {
    let ctx = &state.ctx;
    ctx.set_fill_style_str("#e8e4da");
    ctx.fill_rect(px + 4.0, py + 4.0, cw - 8.0, ch - 8.0);

    let inset = 10.0;
    match state.images.get(face).and_then(|slot| slot.as_ref()) {
        Some(img) => {
            ctx.draw_image_with_html_image_element_and_dw_and_dh(
                img,
                px + inset,
                py + inset,
                cw - 2.0 * inset,
                ch - 2.0 * inset,
            )
            .ok();
        }
        None => {
            // Placeholder for a failed image slot: tinted panel + face number.
            let hue = (face * 137) % 360;
            ctx.set_fill_style_str(&format!("hsl({hue}, 55%, 45%)"));
            ctx.fill_rect(px + inset, py + inset, cw - 2.0 * inset, ch - 2.0 * inset);
            ctx.set_font("28px 'Fira Code', monospace");
            ctx.set_fill_style_str("#ffffff");
            ctx.fill_text(&format!("{face}"), px + cw / 2.0, py + ch / 2.0 + 10.0)
                .ok();
        }
    }

    if matched {
        ctx.set_fill_style_str("rgba(24,24,24,0.35)");
        ctx.fill_rect(px + 4.0, py + 4.0, cw - 8.0, ch - 8.0);
        ctx.set_stroke_style_str("rgba(120,220,140,0.8)");
        ctx.set_line_width(3.0);
        ctx.stroke_rect(px + 4.0, py + 4.0, cw - 8.0, ch - 8.0);
    }
}

fn draw_win_overlay(state: &GameState) {
    let ctx = &state.ctx;
    ctx.set_fill_style_str("rgba(0,0,0,0.55)");
    ctx.fill_rect(
        0.0,
        0.0,
        state.canvas.width() as f64,
        state.canvas.height() as f64,
    );
    let cx = state.canvas.width() as f64 / 2.0;
    let cy = state.canvas.height() as f64 / 2.0;
    ctx.set_font("64px 'Fira Code', monospace");
    ctx.set_line_width(6.0);
    ctx.set_stroke_style_str("#000000");
    ctx.set_fill_style_str("#ffffff");
    ctx.stroke_text("ALL MATCHED", cx, cy).ok();
    ctx.fill_text("ALL MATCHED", cx, cy).ok();
    ctx.set_font("20px 'Fira Code', monospace");
    ctx.fill_text("Call start_game() to play again", cx, cy + 44.0)
        .ok();
}

/// Keeps the DOM banner and score overlays in sync with the board.
fn refresh_overlays(state: &GameState) {
    if let Some(win) = window() {
        if let Some(doc) = win.document() {
            if let Some(el) = doc.get_element_by_id("mt-banner") {
                let text = state.banner.as_ref().map(|b| b.text.as_str()).unwrap_or("");
                el.set_text_content(Some(text));
            }
            if let Some(el) = doc.get_element_by_id("mt-score") {
                el.set_text_content(Some(&format!(
                    "Sets: {}/{} | Attempts: {}",
                    state.deck.matched_sets(),
                    state.deck.total_sets(),
                    state.attempts
                )));
            }
        }
    }
}
