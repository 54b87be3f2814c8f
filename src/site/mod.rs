//! Site behaviors that run next to the i18n engine.
//!
//! Each behavior is a small handler over a [`Page`](crate::dom::Page); the
//! host feeds it events (clicks, key presses, resizes, scroll offsets,
//! intersection changes) and it mutates classes and attributes.
//!
//! # Architecture
//!
//! - `drawer`: Mobile navigation drawer
//! - `transition`: Fade transitions between internal pages, header state
//! - `reveal`: Scroll reveal, metric count-up, animation capability
//! - `typing`: Hero typing effect
//! - `contact_form`: Contact form validation and notices

pub mod contact_form;
pub mod drawer;
pub mod reveal;
pub mod transition;
pub mod typing;

pub use contact_form::{ContactForm, FieldError, SubmitOutcome};
pub use drawer::Drawer;
pub use reveal::{AnimationDriver, ClassAnimationDriver, CountUp, CountUpFormat, RevealController};
pub use transition::{LinkAction, PageTransitions};
pub use typing::{TypingEffect, TypingLine, TypingOptions};
