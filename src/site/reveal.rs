//! Scroll reveal and metric count-up.
//!
//! Timers are driven by the caller: intersection events and ticks carry the
//! time elapsed since page load, so reveals can be stepped deterministically.

use std::collections::{BTreeSet, HashMap};
use std::sync::OnceLock;
use std::time::Duration;

use tracing::debug;

use crate::dom::{select_all, select_first_within, NodeId, Page, Selector};

pub const REVEAL_CLASS: &str = "reveal";
pub const VISIBLE_CLASS: &str = "reveal-visible";
pub const METRIC_CLASS: &str = "metric";
pub const COUNT_UP_DURATION: Duration = Duration::from_millis(1200);

const DELAY_ATTRIBUTE: &str = "data-reveal-delay";
const ONCE_ATTRIBUTE: &str = "data-reveal-once";
const COUNT_UP_MARKER: &str = "data-countup";
const TRANSITION_DELAY: &str = "transition-delay";

static REVEAL_SELECTOR: OnceLock<Selector> = OnceLock::new();
static STRONG_SELECTOR: OnceLock<Selector> = OnceLock::new();

/// Animation capability; the i18n engine never depends on it.
pub trait AnimationDriver {
    /// Make an element visible.
    fn fade_in<P: Page + ?Sized>(&mut self, page: &mut P, id: NodeId);

    /// Reveal several elements one after another, `step` apart.
    ///
    /// The offset of each element goes into its `transition-delay`, so the
    /// stylesheet plays the reveals in sequence.
    fn stagger<P: Page + ?Sized>(&mut self, page: &mut P, ids: &[NodeId], step: Duration) {
        for (index, &id) in ids.iter().enumerate() {
            let offset = step.saturating_mul(index as u32);
            if offset.is_zero() {
                page.set_style_property(id, TRANSITION_DELAY, None);
            } else {
                let delay = format!("{}ms", offset.as_millis());
                page.set_style_property(id, TRANSITION_DELAY, Some(&delay));
            }
            self.fade_in(page, id);
        }
    }

    /// Smoothly scroll an element into view.
    fn scroll_to<P: Page + ?Sized>(&mut self, page: &mut P, id: NodeId);
}

/// Default driver: toggles the reveal class and records scroll requests.
#[derive(Debug, Default)]
pub struct ClassAnimationDriver {
    scroll_requests: Vec<NodeId>,
}

impl ClassAnimationDriver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn scroll_requests(&self) -> &[NodeId] {
        &self.scroll_requests
    }
}

impl AnimationDriver for ClassAnimationDriver {
    fn fade_in<P: Page + ?Sized>(&mut self, page: &mut P, id: NodeId) {
        page.add_class(id, VISIBLE_CLASS);
    }

    fn scroll_to<P: Page + ?Sized>(&mut self, _page: &mut P, id: NodeId) {
        self.scroll_requests.push(id);
    }
}

/// Parsed metric text such as `+120%` or `3.5x`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CountUpFormat {
    pub target: f64,
    pub plus: bool,
    pub percent: bool,
    pub times: bool,
}

impl CountUpFormat {
    /// Parse the digits of a metric, keeping its `+`, `%` and `x` decorations.
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        let digits: String = text
            .chars()
            .filter(|c| c.is_ascii_digit() || *c == '.')
            .collect();
        let target = leading_float(&digits)?;

        Some(Self {
            target,
            plus: text.contains('+'),
            percent: text.contains('%'),
            times: text.ends_with(['x', 'X']),
        })
    }

    /// Text shown at `progress` (0.0 to 1.0) of the animation.
    pub fn frame(&self, progress: f64) -> String {
        let progress = progress.clamp(0.0, 1.0);
        let value = (self.target * progress * 100.0).floor() / 100.0;
        let number = if value.fract() == 0.0 {
            format!("{:.0}", value)
        } else {
            format!("{:.1}", value)
        };

        let mut text = String::new();
        if self.plus {
            text.push('+');
        }
        text.push_str(&number);
        if self.percent {
            text.push('%');
        }
        if self.times {
            text.push('x');
        }
        text
    }
}

/// Longest prefix of `digits` that reads as a decimal number.
fn leading_float(digits: &str) -> Option<f64> {
    let mut end = 0;
    let mut seen_dot = false;
    for (i, c) in digits.char_indices() {
        if c == '.' {
            if seen_dot {
                break;
            }
            seen_dot = true;
        }
        end = i + c.len_utf8();
    }
    digits[..end].parse().ok()
}

/// A running count-up on a metric's `strong` element.
#[derive(Debug, Clone, Copy)]
pub struct CountUp {
    element: NodeId,
    format: CountUpFormat,
    started_at: Duration,
}

impl CountUp {
    /// Start counting up the first `strong` inside `metric`.
    ///
    /// Returns `None` when there is nothing numeric to animate or the
    /// element has already been animated once.
    pub fn start<P: Page + ?Sized>(page: &mut P, metric: NodeId, now: Duration) -> Option<Self> {
        let strong = STRONG_SELECTOR.get_or_init(|| Selector::parse("strong").unwrap());
        let element = select_first_within(page, metric, strong)?;
        if page.has_attribute(element, COUNT_UP_MARKER) {
            return None;
        }

        let format = CountUpFormat::parse(&page.text_content(element))?;
        page.set_attribute(element, COUNT_UP_MARKER, "1");
        Some(Self {
            element,
            format,
            started_at: now,
        })
    }

    pub fn element(&self) -> NodeId {
        self.element
    }

    /// Render the frame for `now`; returns true once the final value is shown.
    pub fn step<P: Page + ?Sized>(&self, page: &mut P, now: Duration) -> bool {
        let elapsed = now.saturating_sub(self.started_at);
        let progress = elapsed.as_secs_f64() / COUNT_UP_DURATION.as_secs_f64();
        page.set_text_content(self.element, &self.format.frame(progress));
        progress >= 1.0
    }
}

/// Reveals `.reveal` elements as they enter the viewport.
#[derive(Debug, Default)]
pub struct RevealController {
    observed: BTreeSet<NodeId>,
    pending: HashMap<NodeId, Duration>,
    count_ups: Vec<CountUp>,
}

impl RevealController {
    /// Observe every `.reveal` element of the page.
    pub fn attach<P: Page + ?Sized>(page: &P) -> Self {
        let selector = REVEAL_SELECTOR.get_or_init(|| Selector::parse(".reveal").unwrap());
        let observed: BTreeSet<NodeId> = select_all(page, selector).into_iter().collect();
        debug!("Observing {} reveal elements", observed.len());
        Self {
            observed,
            ..Self::default()
        }
    }

    /// Fallback without intersection support: reveal everything now.
    pub fn reveal_all<P: Page + ?Sized, D: AnimationDriver>(&mut self, page: &mut P, driver: &mut D) {
        let ids: Vec<NodeId> = self.observed.iter().copied().collect();
        driver.stagger(page, &ids, Duration::ZERO);
        self.observed.clear();
        self.pending.clear();
    }

    pub fn is_observing(&self, id: NodeId) -> bool {
        self.observed.contains(&id)
    }

    /// Element `id` entered (`intersecting`) or left the viewport at `now`.
    pub fn on_intersection<P: Page + ?Sized>(
        &mut self,
        page: &mut P,
        id: NodeId,
        intersecting: bool,
        now: Duration,
    ) {
        if !self.observed.contains(&id) {
            return;
        }
        let once = page.has_attribute(id, ONCE_ATTRIBUTE);

        if intersecting {
            if page.has_class(id, METRIC_CLASS) {
                if let Some(count_up) = CountUp::start(page, id, now) {
                    self.count_ups.push(count_up);
                }
            }
            let delay = reveal_delay(page.attribute(id, DELAY_ATTRIBUTE));
            self.pending.insert(id, now + delay);
            if once {
                self.observed.remove(&id);
            }
        } else if !once {
            self.pending.remove(&id);
            page.remove_class(id, VISIBLE_CLASS);
        }
    }

    /// Fire due reveals and advance count-ups. Returns the number revealed.
    pub fn tick<P: Page + ?Sized, D: AnimationDriver>(
        &mut self,
        page: &mut P,
        driver: &mut D,
        now: Duration,
    ) -> usize {
        let mut due: Vec<NodeId> = self
            .pending
            .iter()
            .filter(|(_, deadline)| **deadline <= now)
            .map(|(id, _)| *id)
            .collect();
        due.sort_unstable();
        for id in &due {
            self.pending.remove(id);
            driver.fade_in(page, *id);
        }

        self.count_ups.retain(|count_up| !count_up.step(page, now));
        due.len()
    }

    /// Whether any reveal or count-up still needs ticks.
    pub fn is_idle(&self) -> bool {
        self.pending.is_empty() && self.count_ups.is_empty()
    }
}

/// Delay in ms from `data-reveal-delay`; leading digits only, otherwise 0.
fn reveal_delay(value: Option<&str>) -> Duration {
    let digits: String = value
        .unwrap_or_default()
        .trim()
        .chars()
        .take_while(char::is_ascii_digit)
        .collect();
    Duration::from_millis(digits.parse().unwrap_or(0))
}
