//! Contact form validation.
//!
//! Field values live in the `value` attribute of inputs and in the text of
//! the `message` textarea.

use std::sync::OnceLock;
use std::time::Duration;

use regex::Regex;
use tracing::debug;

use crate::dom::{closest, select_first, select_first_within, NodeId, Page, Selector};

pub const REQUIRED_MESSAGE: &str = "This field is required.";
pub const INVALID_EMAIL_MESSAGE: &str = "Enter a valid email address.";
pub const SUCCESS_MESSAGE: &str = "Thanks! Your message has been sent.";

/// How long the success notice stays before [`ContactForm::dismiss_notice`].
pub const NOTICE_LIFETIME: Duration = Duration::from_secs(4);

/// Required fields, in validation order.
const FIELDS: &[(&str, &str)] = &[
    ("name", "input[name=\"name\"]"),
    ("email", "input[name=\"email\"]"),
    ("company", "input[name=\"company\"]"),
    ("message", "textarea[name=\"message\"]"),
];

static FORM_SELECTOR: OnceLock<Selector> = OnceLock::new();
static FIELD_SELECTORS: OnceLock<Vec<(&'static str, Selector)>> = OnceLock::new();
static CONTAINER_SELECTOR: OnceLock<Selector> = OnceLock::new();
static ERROR_SELECTOR: OnceLock<Selector> = OnceLock::new();
static EMAIL_REGEX: OnceLock<Regex> = OnceLock::new();

fn field_selectors() -> &'static [(&'static str, Selector)] {
    FIELD_SELECTORS.get_or_init(|| {
        FIELDS
            .iter()
            .map(|(name, selector)| (*name, Selector::parse(selector).unwrap()))
            .collect()
    })
}

/// Check an address against the `local@domain.tld` shape.
pub fn is_valid_email(value: &str) -> bool {
    let regex = EMAIL_REGEX.get_or_init(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap());
    regex.is_match(value)
}

/// A validation failure for one field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: &'static str,
    pub message: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Errors were rendered next to the offending fields.
    Invalid(Vec<FieldError>),
    /// The form was reset and a notice appended.
    Sent { notice: NodeId },
}

/// The `form[data-validate="contact"]` element of a page.
#[derive(Debug, Clone, Copy)]
pub struct ContactForm {
    form: NodeId,
}

impl ContactForm {
    pub fn attach<P: Page + ?Sized>(page: &P) -> Option<Self> {
        let selector = FORM_SELECTOR
            .get_or_init(|| Selector::parse("form[data-validate=\"contact\"]").unwrap());
        select_first(page, selector).map(|form| Self { form })
    }

    pub fn element(&self) -> NodeId {
        self.form
    }

    /// Validate and either render errors or simulate a successful send.
    pub fn submit<P: Page + ?Sized>(&self, page: &mut P) -> SubmitOutcome {
        let mut errors = Vec::new();
        let mut email_field = None;

        for (name, selector) in field_selectors() {
            let Some(field) = select_first_within(page, self.form, selector) else {
                continue;
            };
            if *name == "email" {
                email_field = Some(field);
            }
            clear_error(page, field);
            if field_value(page, field).trim().is_empty() {
                show_error(page, field, REQUIRED_MESSAGE);
                errors.push(FieldError {
                    field: *name,
                    message: REQUIRED_MESSAGE,
                });
            }
        }

        if let Some(field) = email_field {
            let value = field_value(page, field);
            if !value.is_empty() && !is_valid_email(&value) {
                show_error(page, field, INVALID_EMAIL_MESSAGE);
                errors.retain(|error| error.field != "email");
                errors.push(FieldError {
                    field: "email",
                    message: INVALID_EMAIL_MESSAGE,
                });
            }
        }

        if !errors.is_empty() {
            debug!("Contact form rejected: {} invalid fields", errors.len());
            return SubmitOutcome::Invalid(errors);
        }

        self.reset(page);
        let notice = page.append_element(self.form, "div");
        page.set_attribute(notice, "class", "pill");
        page.set_text_content(notice, SUCCESS_MESSAGE);
        SubmitOutcome::Sent { notice }
    }

    /// Remove the success notice once [`NOTICE_LIFETIME`] has passed.
    pub fn dismiss_notice<P: Page + ?Sized>(&self, page: &mut P, notice: NodeId) {
        if page.parent(notice).is_some() {
            page.remove_element(notice);
        }
    }

    fn reset<P: Page + ?Sized>(&self, page: &mut P) {
        for (_, selector) in field_selectors() {
            if let Some(field) = select_first_within(page, self.form, selector) {
                if page.tag_name(field) == "textarea" {
                    page.set_text_content(field, "");
                } else {
                    page.set_attribute(field, "value", "");
                }
            }
        }
    }
}

fn field_value<P: Page + ?Sized>(page: &P, field: NodeId) -> String {
    if page.tag_name(field) == "textarea" {
        page.text_content(field)
    } else {
        page.attribute(field, "value").unwrap_or_default().to_string()
    }
}

/// The `.field` wrapper of a control, or its parent.
fn error_container<P: Page + ?Sized>(page: &P, field: NodeId) -> Option<NodeId> {
    let selector = CONTAINER_SELECTOR.get_or_init(|| Selector::parse(".field").unwrap());
    closest(page, field, selector).or_else(|| page.parent(field))
}

fn error_selector() -> &'static Selector {
    ERROR_SELECTOR.get_or_init(|| Selector::parse(".error").unwrap())
}

fn show_error<P: Page + ?Sized>(page: &mut P, field: NodeId, message: &str) {
    let Some(container) = error_container(page, field) else {
        return;
    };
    let error = match select_first_within(page, container, error_selector()) {
        Some(error) => error,
        None => {
            let error = page.append_element(container, "div");
            page.set_attribute(error, "class", "error");
            page.set_attribute(error, "role", "alert");
            error
        }
    };
    page.set_text_content(error, message);
    page.set_attribute(field, "aria-invalid", "true");
}

fn clear_error<P: Page + ?Sized>(page: &mut P, field: NodeId) {
    let Some(container) = error_container(page, field) else {
        return;
    };
    if let Some(error) = select_first_within(page, container, error_selector()) {
        page.set_text_content(error, "");
    }
    page.remove_attribute(field, "aria-invalid");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{select_all_within, Document};

    struct Fixture {
        doc: Document,
        form: ContactForm,
        name: NodeId,
        email: NodeId,
        message: NodeId,
    }

    fn page(name: &str, email: &str, company: &str, message: &str) -> Fixture {
        let mut doc = Document::new();
        let body = doc.body().unwrap();
        let form = doc.append_with(body, "form", &[("data-validate", "contact")]);

        let input = |doc: &mut Document, field: &str, value: &str| {
            let wrapper = doc.append_with(form, "div", &[("class", "field")]);
            doc.append_with(wrapper, "input", &[("name", field), ("value", value)])
        };
        let name = input(&mut doc, "name", name);
        let email = input(&mut doc, "email", email);
        input(&mut doc, "company", company);

        // No `.field` wrapper: errors go to the parent element.
        let group = doc.append_with(form, "p", &[]);
        let message = doc.append_text_element(group, "textarea", &[("name", "message")], message);

        let form = ContactForm::attach(&doc).unwrap();
        Fixture {
            doc,
            form,
            name,
            email,
            message,
        }
    }

    fn error_text(doc: &Document, field: NodeId) -> Option<String> {
        let container = error_container(doc, field)?;
        select_first_within(doc, container, error_selector()).map(|error| doc.text_content(error))
    }

    #[test]
    fn test_email_pattern() {
        assert!(is_valid_email("ada@vxn.example"));
        assert!(!is_valid_email("ada@vxn"));
        assert!(!is_valid_email("ada lovelace@vxn.example"));
        assert!(!is_valid_email("@vxn.example"));
    }

    #[test]
    fn test_required_fields() {
        let mut f = page("", "ada@vxn.example", "VXN", "  ");

        let outcome = f.form.submit(&mut f.doc);

        assert_eq!(
            outcome,
            SubmitOutcome::Invalid(vec![
                FieldError { field: "name", message: REQUIRED_MESSAGE },
                FieldError { field: "message", message: REQUIRED_MESSAGE },
            ])
        );
        assert_eq!(error_text(&f.doc, f.name).as_deref(), Some(REQUIRED_MESSAGE));
        assert_eq!(error_text(&f.doc, f.message).as_deref(), Some(REQUIRED_MESSAGE));
        assert_eq!(f.doc.attribute(f.name, "aria-invalid"), Some("true"));
        assert_eq!(f.doc.attribute(f.email, "aria-invalid"), None);

        let group = f.doc.parent(f.message).unwrap();
        let alert = select_first_within(&f.doc, group, error_selector()).unwrap();
        assert_eq!(f.doc.attribute(alert, "role"), Some("alert"));
    }

    #[test]
    fn test_invalid_email() {
        let mut f = page("Ada", "ada@vxn", "VXN", "Hello");

        let outcome = f.form.submit(&mut f.doc);

        assert_eq!(
            outcome,
            SubmitOutcome::Invalid(vec![FieldError {
                field: "email",
                message: INVALID_EMAIL_MESSAGE
            }])
        );
        assert_eq!(error_text(&f.doc, f.email).as_deref(), Some(INVALID_EMAIL_MESSAGE));
    }

    #[test]
    fn test_errors_are_cleared_and_not_duplicated() {
        let mut f = page("", "ada@vxn.example", "VXN", "Hello");
        f.form.submit(&mut f.doc);
        f.form.submit(&mut f.doc);

        let container = error_container(&f.doc, f.name).unwrap();
        assert_eq!(select_all_within(&f.doc, container, error_selector()).len(), 1);

        f.doc.set_attribute(f.name, "value", "Ada");
        let outcome = f.form.submit(&mut f.doc);
        assert!(matches!(outcome, SubmitOutcome::Sent { .. }));
        assert_eq!(error_text(&f.doc, f.name).as_deref(), Some(""));
        assert_eq!(f.doc.attribute(f.name, "aria-invalid"), None);
    }

    #[test]
    fn test_valid_submission_resets_and_notifies() {
        let mut f = page("Ada", "ada@vxn.example", "VXN", "Hello");

        let SubmitOutcome::Sent { notice } = f.form.submit(&mut f.doc) else {
            panic!("expected a successful submission");
        };

        assert_eq!(f.doc.text_content(notice), SUCCESS_MESSAGE);
        assert!(f.doc.has_class(notice, "pill"));
        assert_eq!(f.doc.attribute(f.name, "value"), Some(""));
        assert_eq!(f.doc.text_content(f.message), "");

        f.form.dismiss_notice(&mut f.doc, notice);
        assert_eq!(f.doc.parent(notice), None);
    }
}
