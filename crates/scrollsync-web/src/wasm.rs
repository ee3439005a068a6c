#![forbid(unsafe_code)]

use core::time::Duration;
use std::cell::RefCell;
use std::rc::{Rc, Weak};

use js_sys::Reflect;
use scrollsync_core::{
    ConfigError, ElementLookup, MirrorConfig, PageConfig, ScrollMirror, ScrollRegion, Side,
    list_items,
};
use tracing::{debug, trace, warn};
use wasm_bindgen::prelude::*;
use web_sys::{Document, Element, Event};

use crate::timing::{duration_from_ms, timeout_ms_until};

thread_local! {
    /// Mirror installed by [`bootstrap`]; lives until the page unloads.
    static PAGE: RefCell<Option<ScrollSyncWeb>> = const { RefCell::new(None) };
}

fn now_ms() -> f64 {
    web_sys::window()
        .and_then(|window| window.performance())
        .map(|perf| perf.now())
        .unwrap_or_else(js_sys::Date::now)
}

fn now() -> Duration {
    duration_from_ms(now_ms())
}

fn config_error(err: ConfigError) -> JsValue {
    JsValue::from_str(&err.to_string())
}

/// A DOM element seen through [`ScrollRegion`].
///
/// `scrollTop` is read and written through `Reflect` so fractional offsets
/// survive on high-DPI layouts; the integer accessors are the fallback.
struct DomRegion {
    element: Element,
}

impl ScrollRegion for DomRegion {
    fn scroll_top(&self) -> f64 {
        Reflect::get(self.element.as_ref(), &JsValue::from_str("scrollTop"))
            .ok()
            .and_then(|value| value.as_f64())
            .unwrap_or(f64::from(self.element.scroll_top()))
    }

    fn set_scroll_top(&mut self, offset: f64) {
        let written = Reflect::set(
            self.element.as_ref(),
            &JsValue::from_str("scrollTop"),
            &JsValue::from_f64(offset),
        );
        if !matches!(written, Ok(true)) {
            self.element.set_scroll_top(offset.round() as i32);
        }
    }
}

struct Shared {
    mirror: ScrollMirror,
    primary: DomRegion,
    secondary: DomRegion,
    timeout: Option<i32>,
    tick: Option<Closure<dyn FnMut()>>,
}

impl Shared {
    fn region(&self, side: Side) -> &DomRegion {
        match side {
            Side::Primary => &self.primary,
            Side::Secondary => &self.secondary,
        }
    }
}

struct ScrollListener {
    target: Element,
    closure: Closure<dyn FnMut(Event)>,
}

/// Scroll mirror bound to two DOM elements.
///
/// Both `scroll` listeners and the timer callback share one mirror through
/// `Rc<RefCell<..>>`; the callbacks hold weak references, so dropping the
/// handle (or calling `destroy`) tears everything down.
#[wasm_bindgen]
pub struct ScrollSyncWeb {
    shared: Rc<RefCell<Shared>>,
    listeners: Vec<ScrollListener>,
}

#[wasm_bindgen]
impl ScrollSyncWeb {
    /// Mirror `primary` and `secondary`.
    ///
    /// `config_json` is an optional JSON mirror configuration; missing fields
    /// take their defaults.
    pub fn attach(
        primary: Element,
        secondary: Element,
        config_json: Option<String>,
    ) -> Result<ScrollSyncWeb, JsValue> {
        let config = match config_json {
            Some(json) => serde_json::from_str::<MirrorConfig>(&json)
                .map_err(|err| config_error(err.into()))?,
            None => MirrorConfig::default(),
        };
        Self::attach_elements(primary, secondary, config)
    }

    /// Current guard state: `"idle"` or `"propagating"`.
    pub fn state(&self) -> String {
        self.shared.borrow().mirror.state().as_str().to_string()
    }

    /// Mirror counters as a JSON object.
    pub fn stats(&self) -> Result<String, JsValue> {
        let stats = self.shared.borrow().mirror.stats();
        serde_json::to_string(&stats).map_err(|err| JsValue::from_str(&err.to_string()))
    }

    /// Explicit teardown for JS callers. Removes the scroll listeners and
    /// cancels the pending timer.
    pub fn destroy(&mut self) {
        for listener in self.listeners.drain(..) {
            if let Err(err) = listener.target.remove_event_listener_with_callback(
                "scroll",
                listener.closure.as_ref().unchecked_ref(),
            ) {
                warn!(?err, "failed to remove scroll listener");
            }
        }
        let mut shared = self.shared.borrow_mut();
        if let (Some(window), Some(handle)) = (web_sys::window(), shared.timeout.take()) {
            window.clear_timeout_with_handle(handle);
        }
        shared.mirror.clear();
        shared.tick = None;
    }
}

impl ScrollSyncWeb {
    fn attach_elements(
        primary: Element,
        secondary: Element,
        config: MirrorConfig,
    ) -> Result<Self, JsValue> {
        let mirror = ScrollMirror::try_new(config).map_err(config_error)?;
        let shared = Rc::new(RefCell::new(Shared {
            mirror,
            primary: DomRegion { element: primary },
            secondary: DomRegion { element: secondary },
            timeout: None,
            tick: None,
        }));

        let weak = Rc::downgrade(&shared);
        let tick = Closure::wrap(Box::new(move || {
            if let Some(shared) = weak.upgrade() {
                on_tick(&shared);
            }
        }) as Box<dyn FnMut()>);
        shared.borrow_mut().tick = Some(tick);

        let mut handle = Self {
            shared,
            listeners: Vec::with_capacity(2),
        };
        for side in Side::ALL {
            let target = handle.shared.borrow().region(side).element.clone();
            let weak: Weak<RefCell<Shared>> = Rc::downgrade(&handle.shared);
            let closure = Closure::wrap(Box::new(move |_event: Event| {
                if let Some(shared) = weak.upgrade() {
                    on_scroll(&shared, side);
                }
            }) as Box<dyn FnMut(Event)>);
            target.add_event_listener_with_callback("scroll", closure.as_ref().unchecked_ref())?;
            handle.listeners.push(ScrollListener { target, closure });
        }

        debug!("scroll mirror attached");
        Ok(handle)
    }
}

impl Drop for ScrollSyncWeb {
    fn drop(&mut self) {
        self.destroy();
    }
}

fn on_scroll(shared: &Rc<RefCell<Shared>>, side: Side) {
    {
        let mut s = shared.borrow_mut();
        let offset = s.region(side).scroll_top();
        s.mirror.notify(side, offset, now());
    }
    rearm(shared);
}

fn on_tick(shared: &Rc<RefCell<Shared>>) {
    {
        let mut s = shared.borrow_mut();
        s.timeout = None;
        let Shared {
            mirror,
            primary,
            secondary,
            ..
        } = &mut *s;
        for write in mirror.poll(now(), primary, secondary) {
            trace!(
                target_side = write.target.as_str(),
                offset = write.offset,
                applied = write.applied,
                "scroll offset mirrored"
            );
        }
    }
    rearm(shared);
}

/// Keep exactly one browser timeout armed for the mirror's next deadline.
fn rearm(shared: &Rc<RefCell<Shared>>) {
    let Some(window) = web_sys::window() else {
        return;
    };
    let mut s = shared.borrow_mut();
    if let Some(handle) = s.timeout.take() {
        window.clear_timeout_with_handle(handle);
    }
    let Some(deadline) = s.mirror.next_deadline() else {
        return;
    };
    let delay = timeout_ms_until(deadline, now());
    let Some(tick) = s.tick.as_ref() else {
        return;
    };
    match window
        .set_timeout_with_callback_and_timeout_and_arguments_0(tick.as_ref().unchecked_ref(), delay)
    {
        Ok(handle) => s.timeout = Some(handle),
        Err(err) => warn!(?err, "failed to arm scroll mirror timer"),
    }
}

/// `document.getElementById` behind [`ElementLookup`].
struct DomLookup<'a>(&'a Document);

impl ElementLookup for DomLookup<'_> {
    type Element = Element;

    fn element_by_id(&self, id: &str) -> Option<Element> {
        self.0.get_element_by_id(id)
    }
}

/// Fill both item containers with the page's list items.
fn populate_lists(
    document: &Document,
    containers: [&Element; 2],
    count: u32,
) -> Result<(), JsValue> {
    for item in list_items(count) {
        for container in containers {
            let li = document.create_element("li")?;
            li.set_text_content(Some(&item.label));
            li.set_attribute("data-index", &item.index_attr())?;
            container.append_child(&li)?;
        }
    }
    Ok(())
}

fn install(document: &Document, config: &PageConfig) {
    let Some(elements) = config.resolve(&DomLookup(document)) else {
        return;
    };

    if let Some((primary, secondary)) = &elements.containers
        && let Err(err) = populate_lists(document, [primary, secondary], config.item_count)
    {
        warn!(?err, "failed to populate lists");
    }

    let mirror = config.mirror.clone();
    match ScrollSyncWeb::attach_elements(elements.primary, elements.secondary, mirror) {
        Ok(handle) => PAGE.with(|page| {
            page.borrow_mut().replace(handle);
        }),
        Err(err) => warn!(?err, "failed to attach scroll mirror"),
    }
}

fn schedule_install(config: PageConfig) {
    let Some(document) = web_sys::window().and_then(|window| window.document()) else {
        debug!("no document; scroll sync not installed");
        return;
    };

    if document.ready_state() != "loading" {
        install(&document, &config);
        return;
    }

    let ready = Closure::once(move |_event: Event| {
        if let Some(document) = web_sys::window().and_then(|window| window.document()) {
            install(&document, &config);
        }
    });
    if let Err(err) = document
        .add_event_listener_with_callback("DOMContentLoaded", ready.as_ref().unchecked_ref())
    {
        warn!(?err, "failed to wait for DOMContentLoaded");
        return;
    }
    // Fires once; the page owns it from here.
    ready.forget();
}

/// Install the mirror on the default page (`main-list` / `side-list`) once the
/// document has been parsed.
#[wasm_bindgen]
pub fn bootstrap() {
    schedule_install(PageConfig::default());
}

/// Like [`bootstrap`], with a JSON page configuration.
#[wasm_bindgen(js_name = bootstrapWithConfig)]
pub fn bootstrap_with_config(json: &str) -> Result<(), JsValue> {
    let config = PageConfig::from_json(json).map_err(config_error)?;
    schedule_install(config);
    Ok(())
}
