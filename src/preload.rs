//! Batched asset preloading.
//!
//! The game manifests a fixed list of tile images that must all have
//! reported (loaded or failed) before the loop starts. `load_batch` joins
//! one independent async fetch per identifier into a single result set whose
//! slots line up with the request list, whatever order the fetches actually
//! finish in. A failed fetch keeps its slot as a marker so indices into the
//! manifest stay valid.

use std::cell::RefCell;
use std::future::Future;
use std::rc::Rc;

use futures::channel::oneshot;
use futures::future::join_all;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::HtmlImageElement;

/// Marker left in a batch slot when one resource could not be fetched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceFailure {
    pub id: String,
    pub reason: String,
}

/// Result of a completed preload batch: one slot per request, in request
/// order.
#[derive(Debug)]
pub struct LoadBatch<T> {
    slots: Vec<Result<T, ResourceFailure>>,
}

impl<T> LoadBatch<T> {
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Result<T, ResourceFailure>> {
        self.slots.get(index)
    }

    pub fn slots(&self) -> &[Result<T, ResourceFailure>] {
        &self.slots
    }

    pub fn into_slots(self) -> Vec<Result<T, ResourceFailure>> {
        self.slots
    }

    pub fn failure_count(&self) -> usize {
        self.slots.iter().filter(|s| s.is_err()).count()
    }

    pub fn failures(&self) -> impl Iterator<Item = &ResourceFailure> {
        self.slots.iter().filter_map(|s| s.as_ref().err())
    }
}

/// Fetches every identifier concurrently and resolves once all of them have
/// reported. Slot order is request order; a duplicate identifier is fetched
/// independently for each occurrence. An empty request list resolves
/// immediately with an empty batch.
///
/// Individual failures never abort the batch; they become per-slot markers
/// and the caller decides what to surface.
pub async fn load_batch<R, T, F, Fut>(requests: &[R], mut fetch: F) -> LoadBatch<T>
where
    R: AsRef<str>,
    F: FnMut(&str) -> Fut,
    Fut: Future<Output = Result<T, String>>,
{
    let pending: Vec<Fut> = requests.iter().map(|id| fetch(id.as_ref())).collect();
    let settled = join_all(pending).await;
    let slots = settled
        .into_iter()
        .zip(requests)
        .map(|(outcome, id)| {
            outcome.map_err(|reason| ResourceFailure {
                id: id.as_ref().to_string(),
                reason,
            })
        })
        .collect();
    LoadBatch { slots }
}

// --- Browser fetch primitive --------------------------------------------------

/// Loads one image by URL, resolving on its `load` or `error` event.
///
/// The element starts fetching as soon as `src` is set; the returned future
/// just waits for whichever event fires first. Listener closures live inside
/// the future and are dropped once it resolves.
pub fn fetch_image(src: String) -> impl Future<Output = Result<HtmlImageElement, String>> {
    async move {
        let img = HtmlImageElement::new()
            .map_err(|_| format!("could not create image element for {src}"))?;

        let (tx, rx) = oneshot::channel::<bool>();
        let tx = Rc::new(RefCell::new(Some(tx)));

        let tx_load = tx.clone();
        let on_load = Closure::wrap(Box::new(move || {
            if let Some(tx) = tx_load.borrow_mut().take() {
                let _ = tx.send(true);
            }
        }) as Box<dyn FnMut()>);
        let tx_error = tx.clone();
        let on_error = Closure::wrap(Box::new(move || {
            if let Some(tx) = tx_error.borrow_mut().take() {
                let _ = tx.send(false);
            }
        }) as Box<dyn FnMut()>);

        img.add_event_listener_with_callback("load", on_load.as_ref().unchecked_ref())
            .map_err(|_| format!("could not attach load listener for {src}"))?;
        img.add_event_listener_with_callback("error", on_error.as_ref().unchecked_ref())
            .map_err(|_| format!("could not attach error listener for {src}"))?;
        img.set_src(&src);

        match rx.await {
            Ok(true) => Ok(img),
            Ok(false) => Err(format!("failed to load {src}")),
            Err(_) => Err(format!("load signal dropped for {src}")),
        }
    }
}
