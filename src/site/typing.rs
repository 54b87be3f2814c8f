//! Hero typing effect.
//!
//! Hero text is emptied and typed back one character at a time behind a
//! blinking cursor. Like the reveal controller, time is supplied by the
//! caller: `attach` takes the current time and `tick` renders the state for
//! a later one.

use std::sync::OnceLock;
use std::time::Duration;

use tracing::debug;

use crate::dom::{select_all_within, select_first_within, NodeId, Page, Selector};

pub const TYPED_ATTRIBUTE: &str = "data-typed";
pub const SPEED_ATTRIBUTE: &str = "data-typed-speed";
pub const DELAY_ATTRIBUTE: &str = "data-typed-delay";
pub const MUTED_ATTRIBUTE: &str = "data-typed-muted";

pub const LINE_CLASS: &str = "typing-line";
pub const CURSOR_CLASS: &str = "typing-cursor";
pub const MUTED_CLASS: &str = "muted";

/// How long the cursor stays after the last character.
pub const CURSOR_LINGER: Duration = Duration::from_millis(250);

const TARGET_SPEED: Duration = Duration::from_millis(28);
const TARGET_GAP: Duration = Duration::from_millis(350);
const TITLE_LINE_SPEED: Duration = Duration::from_millis(32);
const TITLE_LINE_GAP: Duration = Duration::from_millis(400);
const LEDE_SPEED: Duration = Duration::from_millis(18);
const LEDE_AFTER_LINES: Duration = Duration::from_millis(250);
const HEADING_SPEED: Duration = Duration::from_millis(28);
const LEDE_AFTER_HEADING: Duration = Duration::from_millis(300);

static TARGET_SELECTOR: OnceLock<Selector> = OnceLock::new();
static TITLE_SELECTOR: OnceLock<Selector> = OnceLock::new();
static LINE_SELECTOR: OnceLock<Selector> = OnceLock::new();
static LEDE_SELECTOR: OnceLock<Selector> = OnceLock::new();
static HEADING_SELECTOR: OnceLock<Selector> = OnceLock::new();

/// Pace and cursor style of one typed element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypingOptions {
    /// Time per character
    pub speed: Duration,
    /// Time before the first character, from attach
    pub start_delay: Duration,
    pub show_cursor: bool,
    pub cursor_muted: bool,
}

impl TypingOptions {
    fn new(speed: Duration, start_delay: Duration, cursor_muted: bool) -> Self {
        Self {
            speed,
            start_delay,
            show_cursor: true,
            cursor_muted,
        }
    }
}

/// One element being typed out.
#[derive(Debug, Clone)]
pub struct TypingLine {
    element: NodeId,
    text: Vec<char>,
    options: TypingOptions,
    started_at: Duration,
    cursor: Option<NodeId>,
    shown: usize,
    finished: bool,
}

impl TypingLine {
    /// Empty `element` and get it ready for typing.
    ///
    /// Returns `None` for elements without text.
    pub fn start<P: Page + ?Sized>(
        page: &mut P,
        element: NodeId,
        options: TypingOptions,
        now: Duration,
    ) -> Option<Self> {
        let text: Vec<char> = page.text_content(element).chars().collect();
        if text.is_empty() {
            return None;
        }

        page.set_attribute(element, "aria-live", "polite");
        page.set_attribute(element, "aria-atomic", "true");
        page.set_text_content(element, "");
        page.add_class(element, LINE_CLASS);

        let mut line = Self {
            element,
            text,
            options,
            started_at: now,
            cursor: None,
            shown: 0,
            finished: false,
        };
        line.attach_cursor(page);
        Some(line)
    }

    pub fn element(&self) -> NodeId {
        self.element
    }

    pub fn options(&self) -> &TypingOptions {
        &self.options
    }

    /// Current cursor element, while one is shown.
    pub fn cursor(&self) -> Option<NodeId> {
        self.cursor
    }

    /// Characters typed so far.
    pub fn shown(&self) -> usize {
        self.shown
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Render the line for `now`; returns true once it is complete and the
    /// cursor is gone.
    pub fn tick<P: Page + ?Sized>(&mut self, page: &mut P, now: Duration) -> bool {
        if self.finished {
            return true;
        }
        let elapsed = now.saturating_sub(self.started_at);

        let shown = self.shown_at(elapsed);
        if shown != self.shown {
            self.render(page, shown);
        }

        if elapsed >= self.typed_for() + CURSOR_LINGER {
            if let Some(cursor) = self.cursor.take() {
                page.remove_element(cursor);
            }
            self.finished = true;
        }
        self.finished
    }

    /// Time from attach until the slot after the last character.
    fn typed_for(&self) -> Duration {
        self.options.start_delay + self.options.speed.saturating_mul(self.text.len() as u32)
    }

    /// Character `i` appears at `start_delay + i * speed`.
    fn shown_at(&self, elapsed: Duration) -> usize {
        let Some(typing) = elapsed.checked_sub(self.options.start_delay) else {
            return 0;
        };
        if self.options.speed.is_zero() {
            return self.text.len();
        }
        let slots = typing.as_nanos() / self.options.speed.as_nanos() + 1;
        usize::try_from(slots).map_or(self.text.len(), |slots| slots.min(self.text.len()))
    }

    fn render<P: Page + ?Sized>(&mut self, page: &mut P, shown: usize) {
        let text: String = self.text[..shown].iter().collect();
        // Replacing the text drops the cursor; put a fresh one back after it.
        page.set_text_content(self.element, &text);
        self.cursor = None;
        self.shown = shown;
        self.attach_cursor(page);
    }

    fn attach_cursor<P: Page + ?Sized>(&mut self, page: &mut P) {
        if !self.options.show_cursor {
            return;
        }
        let cursor = page.append_element(self.element, "span");
        page.add_class(cursor, CURSOR_CLASS);
        if self.options.cursor_muted {
            page.add_class(cursor, MUTED_CLASS);
        }
        self.cursor = Some(cursor);
    }
}

/// Every typed line of the page hero.
#[derive(Debug, Default)]
pub struct TypingEffect {
    lines: Vec<TypingLine>,
}

impl TypingEffect {
    /// Find the hero and start typing its text at `now`.
    ///
    /// Nothing is touched when `reduced_motion` is set or the page has no
    /// hero.
    pub fn attach<P: Page + ?Sized>(page: &mut P, reduced_motion: bool, now: Duration) -> Self {
        if reduced_motion {
            debug!("Reduced motion preferred, skipping typing effect");
            return Self::default();
        }
        let Some(hero) = find_hero(page) else {
            return Self::default();
        };

        let lines: Vec<TypingLine> = plan(page, hero)
            .into_iter()
            .filter_map(|(element, options)| TypingLine::start(page, element, options, now))
            .collect();
        debug!("Typing {} hero lines", lines.len());
        Self { lines }
    }

    pub fn lines(&self) -> &[TypingLine] {
        &self.lines
    }

    /// Advance every line to `now`. Returns true once all are finished.
    pub fn tick<P: Page + ?Sized>(&mut self, page: &mut P, now: Duration) -> bool {
        let mut done = true;
        for line in &mut self.lines {
            done &= line.tick(page, now);
        }
        done
    }

    pub fn is_finished(&self) -> bool {
        self.lines.iter().all(TypingLine::is_finished)
    }
}

/// First of `.hero`, `.blog-hero` or `main > .section:first-of-type`, in
/// document order.
fn find_hero<P: Page + ?Sized>(page: &P) -> Option<NodeId> {
    page.elements().into_iter().find(|&id| {
        page.has_class(id, "hero")
            || page.has_class(id, "blog-hero")
            || is_first_main_section(page, id)
    })
}

fn is_first_main_section<P: Page + ?Sized>(page: &P, id: NodeId) -> bool {
    if !page.has_class(id, "section") {
        return false;
    }
    let Some(parent) = page.parent(id).filter(|&p| page.tag_name(p) == "main") else {
        return false;
    };
    let tag = page.tag_name(id);
    page.children(parent)
        .into_iter()
        .find(|&sibling| page.tag_name(sibling) == tag)
        == Some(id)
}

/// Elements to type inside `hero`, with their options.
fn plan<P: Page + ?Sized>(page: &P, hero: NodeId) -> Vec<(NodeId, TypingOptions)> {
    let targets = TARGET_SELECTOR.get_or_init(|| Selector::parse("[data-typed]").unwrap());
    let explicit = select_all_within(page, hero, targets);
    if !explicit.is_empty() {
        return plan_targets(page, &explicit);
    }

    let lede = LEDE_SELECTOR.get_or_init(|| Selector::parse(".lede").unwrap());
    let lede = select_first_within(page, hero, lede);

    let title = TITLE_SELECTOR.get_or_init(|| Selector::parse(".hero-title").unwrap());
    if let Some(title) = select_first_within(page, hero, title) {
        let line = LINE_SELECTOR.get_or_init(|| Selector::parse(".line").unwrap());
        let lines = select_all_within(page, title, line);
        if lines.is_empty() {
            return Vec::new();
        }

        let mut plan = Vec::new();
        let mut total = Duration::ZERO;
        for line in lines {
            plan.push((line, TypingOptions::new(TITLE_LINE_SPEED, total, false)));
            total += typing_time(page, line, TITLE_LINE_SPEED) + TITLE_LINE_GAP;
        }
        if let Some(lede) = lede {
            let start = total + LEDE_AFTER_LINES;
            plan.push((lede, TypingOptions::new(LEDE_SPEED, start, true)));
        }
        return plan;
    }

    let heading = HEADING_SELECTOR.get_or_init(|| Selector::parse("h1").unwrap());
    let heading = select_first_within(page, hero, heading);

    let mut plan = Vec::new();
    let mut lede_start = LEDE_AFTER_HEADING;
    if let Some(heading) = heading {
        plan.push((heading, TypingOptions::new(HEADING_SPEED, Duration::ZERO, false)));
        lede_start += typing_time(page, heading, HEADING_SPEED);
    }
    if let Some(lede) = lede {
        plan.push((lede, TypingOptions::new(LEDE_SPEED, lede_start, true)));
    }
    plan
}

/// `[data-typed]` targets in order, each after the previous one by default.
fn plan_targets<P: Page + ?Sized>(page: &P, targets: &[NodeId]) -> Vec<(NodeId, TypingOptions)> {
    let mut cumulative = Duration::ZERO;
    targets
        .iter()
        .map(|&target| {
            let speed = parse_millis(page.attribute(target, SPEED_ATTRIBUTE)).unwrap_or(TARGET_SPEED);
            let start = parse_millis(page.attribute(target, DELAY_ATTRIBUTE)).unwrap_or(cumulative);
            let muted = page.has_attribute(target, MUTED_ATTRIBUTE);

            cumulative = start + typing_time(page, target, speed) + TARGET_GAP;
            (target, TypingOptions::new(speed, start, muted))
        })
        .collect()
}

fn typing_time<P: Page + ?Sized>(page: &P, id: NodeId, speed: Duration) -> Duration {
    speed.saturating_mul(page.text_content(id).chars().count() as u32)
}

/// Milliseconds from an integer attribute: leading whitespace and sign,
/// then digits, trailing text ignored. Negative values clamp to zero.
fn parse_millis(value: Option<&str>) -> Option<Duration> {
    let value = value?.trim_start();
    let (negative, rest) = match value.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, value.strip_prefix('+').unwrap_or(value)),
    };
    let digits: String = rest.chars().take_while(char::is_ascii_digit).collect();
    let millis: u64 = digits.parse().ok()?;
    Some(if negative {
        Duration::ZERO
    } else {
        Duration::from_millis(millis)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::Document;

    fn ms(value: u64) -> Duration {
        Duration::from_millis(value)
    }

    fn hero_page() -> (Document, NodeId) {
        let mut doc = Document::new();
        let body = doc.body().unwrap();
        let hero = doc.append_with(body, "section", &[("class", "hero")]);
        (doc, hero)
    }

    #[test]
    fn test_parse_millis() {
        assert_eq!(parse_millis(Some("40")), Some(ms(40)));
        assert_eq!(parse_millis(Some(" 15ms")), Some(ms(15)));
        assert_eq!(parse_millis(Some("-20")), Some(Duration::ZERO));
        assert_eq!(parse_millis(Some("fast")), None);
        assert_eq!(parse_millis(Some("")), None);
        assert_eq!(parse_millis(None), None);
    }

    #[test]
    fn test_line_types_one_character_per_step() {
        let (mut doc, hero) = hero_page();
        let title = doc.append_text_element(hero, "h1", &[], "Hey");
        let options = TypingOptions::new(ms(10), ms(100), false);

        let mut line = TypingLine::start(&mut doc, title, options, ms(0)).unwrap();
        assert_eq!(doc.text_content(title), "");
        assert_eq!(doc.attribute(title, "aria-live"), Some("polite"));
        assert_eq!(doc.attribute(title, "aria-atomic"), Some("true"));
        assert!(doc.has_class(title, LINE_CLASS));
        let cursor = line.cursor().unwrap();
        assert!(doc.has_class(cursor, CURSOR_CLASS));
        assert!(!doc.has_class(cursor, MUTED_CLASS));

        assert!(!line.tick(&mut doc, ms(99)));
        assert_eq!(doc.text_content(title), "");

        line.tick(&mut doc, ms(100));
        assert_eq!(doc.text_content(title), "H");
        line.tick(&mut doc, ms(115));
        assert_eq!(doc.text_content(title), "He");

        // All typed at 120ms; the cursor lingers until 130 + 250ms.
        line.tick(&mut doc, ms(120));
        assert_eq!(doc.text_content(title), "Hey");
        assert_eq!(doc.children(title).len(), 1);
        assert!(!line.tick(&mut doc, ms(379)));
        assert!(line.tick(&mut doc, ms(380)));
        assert!(doc.children(title).is_empty());
        assert_eq!(line.cursor(), None);
        assert_eq!(doc.text_content(title), "Hey");
    }

    #[test]
    fn test_empty_elements_are_skipped() {
        let (mut doc, hero) = hero_page();
        let empty = doc.append_with(hero, "h1", &[]);
        let options = TypingOptions::new(ms(10), Duration::ZERO, false);

        assert!(TypingLine::start(&mut doc, empty, options, ms(0)).is_none());
        assert!(!doc.has_attribute(empty, "aria-live"));
    }

    #[test]
    fn test_explicit_targets_run_in_sequence() {
        let (mut doc, hero) = hero_page();
        let first = doc.append_text_element(
            hero,
            "h1",
            &[("data-typed", ""), ("data-typed-speed", "10")],
            "Ship",
        );
        let second = doc.append_text_element(
            hero,
            "p",
            &[("data-typed", ""), ("data-typed-muted", "")],
            "Now",
        );
        let pinned = doc.append_text_element(
            hero,
            "p",
            &[("data-typed", ""), ("data-typed-delay", "50"), ("data-typed-speed", "x")],
            "Go",
        );

        let effect = TypingEffect::attach(&mut doc, false, ms(0));
        let lines = effect.lines();
        assert_eq!(lines.len(), 3);

        assert_eq!(lines[0].element(), first);
        assert_eq!(lines[0].options().speed, ms(10));
        assert_eq!(lines[0].options().start_delay, Duration::ZERO);

        // 4 chars at 10ms, then the 350ms gap.
        assert_eq!(lines[1].element(), second);
        assert_eq!(lines[1].options().speed, ms(28));
        assert_eq!(lines[1].options().start_delay, ms(390));
        assert!(lines[1].options().cursor_muted);
        assert!(doc.has_class(lines[1].cursor().unwrap(), MUTED_CLASS));

        assert_eq!(lines[2].element(), pinned);
        assert_eq!(lines[2].options().start_delay, ms(50));
        assert_eq!(lines[2].options().speed, ms(28));
    }

    #[test]
    fn test_effect_finishes_with_original_text() {
        let (mut doc, hero) = hero_page();
        let title = doc.append_text_element(hero, "h1", &[("data-typed", "")], "Close deals");
        let lede = doc.append_text_element(hero, "p", &[("data-typed", "")], "Faster");

        let mut effect = TypingEffect::attach(&mut doc, false, ms(1000));
        assert!(!effect.tick(&mut doc, ms(1000)));
        assert_eq!(doc.text_content(title), "C");
        assert_eq!(doc.text_content(lede), "");

        assert!(effect.tick(&mut doc, ms(10_000)));
        assert!(effect.is_finished());
        assert_eq!(doc.text_content(title), "Close deals");
        assert_eq!(doc.text_content(lede), "Faster");
        assert!(doc.children(title).is_empty());
    }

    #[test]
    fn test_hero_title_lines_then_lede() {
        let (mut doc, hero) = hero_page();
        let title = doc.append_with(hero, "h1", &[("class", "hero-title")]);
        let first = doc.append_text_element(title, "span", &[("class", "line")], "Sell");
        let second = doc.append_text_element(title, "span", &[("class", "line")], "More");
        let lede = doc.append_text_element(hero, "p", &[("class", "lede")], "Today");

        let effect = TypingEffect::attach(&mut doc, false, ms(0));
        let starts: Vec<(NodeId, Duration, Duration)> = effect
            .lines()
            .iter()
            .map(|line| (line.element(), line.options().start_delay, line.options().speed))
            .collect();

        // Each line takes 4 * 32ms plus a 400ms gap.
        assert_eq!(
            starts,
            vec![
                (first, ms(0), ms(32)),
                (second, ms(528), ms(32)),
                (lede, ms(1306), ms(18)),
            ]
        );
        assert!(effect.lines()[2].options().cursor_muted);
    }

    #[test]
    fn test_hero_title_without_lines_types_nothing() {
        let (mut doc, hero) = hero_page();
        doc.append_text_element(hero, "h1", &[("class", "hero-title")], "Sell more");
        let lede = doc.append_text_element(hero, "p", &[("class", "lede")], "Today");

        let effect = TypingEffect::attach(&mut doc, false, ms(0));
        assert!(effect.lines().is_empty());
        assert_eq!(doc.text_content(lede), "Today");
    }

    #[test]
    fn test_heading_and_lede_fallback() {
        let (mut doc, hero) = hero_page();
        let heading = doc.append_text_element(hero, "h1", &[], "Pipeline");
        let lede = doc.append_text_element(hero, "p", &[("class", "lede")], "Clear");

        let effect = TypingEffect::attach(&mut doc, false, ms(0));
        let lines = effect.lines();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].element(), heading);
        assert_eq!(lines[0].options().speed, ms(28));
        assert_eq!(lines[1].element(), lede);
        assert_eq!(lines[1].options().start_delay, ms(8 * 28 + 300));

        let (mut doc, hero) = hero_page();
        doc.append_text_element(hero, "p", &[("class", "lede")], "Clear");
        let effect = TypingEffect::attach(&mut doc, false, ms(0));
        assert_eq!(effect.lines()[0].options().start_delay, ms(300));
    }

    #[test]
    fn test_reduced_motion_leaves_page_alone() {
        let (mut doc, hero) = hero_page();
        let heading = doc.append_text_element(hero, "h1", &[("data-typed", "")], "Pipeline");

        let effect = TypingEffect::attach(&mut doc, true, ms(0));
        assert!(effect.lines().is_empty());
        assert!(effect.is_finished());
        assert_eq!(doc.text_content(heading), "Pipeline");
        assert!(!doc.has_attribute(heading, "aria-live"));
    }

    #[test]
    fn test_hero_lookup() {
        let mut doc = Document::new();
        let body = doc.body().unwrap();
        let heading = doc.append_text_element(body, "h1", &[], "Not in a hero");
        assert!(TypingEffect::attach(&mut doc, false, ms(0)).lines().is_empty());
        assert_eq!(doc.text_content(heading), "Not in a hero");

        let main = doc.append_with(body, "main", &[]);
        let first = doc.append_with(main, "section", &[("class", "section")]);
        let second = doc.append_with(main, "section", &[("class", "section")]);
        assert_eq!(find_hero(&doc), Some(first));
        assert!(!is_first_main_section(&doc, second));

        let blog = doc.append_with(body, "div", &[("class", "blog-hero")]);
        assert_eq!(find_hero(&doc), Some(first));
        doc.remove_element(first);
        assert_eq!(find_hero(&doc), Some(second));
        doc.remove_element(main);
        assert_eq!(find_hero(&doc), Some(blog));
    }
}
