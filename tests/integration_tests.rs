//! Integration tests for the VXN site crate
//!
//! These tests drive the complete language pipeline (store, reconciler,
//! session, preferences) over an in-memory page using the dictionaries the
//! site ships, plus the verification relay over a real socket.

use std::sync::Arc;

use serde_json::{json, Value};
use tempfile::TempDir;
use wiremock::{
    matchers::{body_string_contains, method, path},
    Mock, MockServer, ResponseTemplate,
};

use vxn_site::captcha::RelayState;
use vxn_site::dom::{Document, NodeId, Page};
use vxn_site::i18n::{
    Dictionary, DictionaryValidator, FilePreferences, Language, LanguageSession, PreferenceStore,
    Reconciler, SwitchOutcome, TranslationStore,
};
use vxn_site::server::{create_router, FUNCTION_VERIFY_PATH};
use vxn_site::site::Drawer;

const EN_JSON: &str = include_str!("../assets/i18n/en.json");
const FR_JSON: &str = include_str!("../assets/i18n/fr.json");

// ==================== Test Helpers ====================

/// Serve the shipped dictionaries, each expected to be fetched `fetches` times.
async fn dictionary_host(fetches: u64) -> MockServer {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/assets/i18n/en.json"))
        .respond_with(ResponseTemplate::new(200).set_body_string(EN_JSON))
        .expect(fetches)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/assets/i18n/fr.json"))
        .respond_with(ResponseTemplate::new(200).set_body_string(FR_JSON))
        .expect(fetches)
        .mount(&mock_server)
        .await;

    mock_server
}

/// Handles to the interesting elements of the landing page.
#[derive(Debug, Clone, Copy)]
struct Ids {
    hero_title: NodeId,
    lede: NodeId,
    cta_button: NodeId,
    nav_cta: NodeId,
    metric_label: NodeId,
    name_input: NodeId,
    privacy_link: NodeId,
    rights: NodeId,
    local_note: NodeId,
    mixed: NodeId,
    drawer_fr: NodeId,
    header_en: NodeId,
    header_fr: NodeId,
}

fn landing_page() -> (Document, Ids) {
    let mut doc = Document::new();
    let body = doc.body().unwrap();

    let header = doc.append_with(body, "header", &[("class", "site-header")]);
    let nav = doc.append_with(header, "nav", &[]);
    doc.append_text_element(
        nav,
        "a",
        &[("href", "index.html"), ("data-i18n", "nav.home")],
        "Home",
    );
    let cta = doc.append_with(header, "div", &[("class", "nav-cta")]);
    let nav_cta = doc.append_text_element(
        cta,
        "a",
        &[("class", "btn btn-primary"), ("href", "contact.html")],
        "Request demo",
    );
    let switch = doc.append_with(header, "div", &[("class", "lang-switch")]);
    let header_en = doc.append_text_element(switch, "button", &[("data-lang", "en")], "EN");
    let header_fr = doc.append_text_element(switch, "button", &[("data-lang", "fr")], "FR");
    doc.append_with(header, "button", &[("class", "nav-toggle")]);

    let drawer = doc.append_with(body, "div", &[("class", "mobile-drawer"), ("hidden", "")]);
    let drawer_switch = doc.append_with(drawer, "div", &[("class", "lang-switch")]);
    let drawer_fr =
        doc.append_text_element(drawer_switch, "button", &[("data-lang", "fr")], "FR");

    let hero = doc.append_with(body, "section", &[("class", "hero")]);
    let hero_title = doc.append_text_element(
        hero,
        "h1",
        &[("data-i18n", "hero.title")],
        "The CRM that closes the loop",
    );
    let lede = doc.append_text_element(
        hero,
        "p",
        &[("class", "lede")],
        "VXN brings your pipeline, conversations and forecasts into one fast workspace.",
    );
    let cta_button = doc.append_text_element(hero, "button", &[], "  Request a demo  ");

    let metric = doc.append_with(body, "div", &[("class", "reveal metric")]);
    doc.append_text_element(metric, "strong", &[], "+32%");
    let metric_label = doc.append_text_element(metric, "span", &[], "Higher win rate");

    let form = doc.append_with(body, "form", &[("data-validate", "contact")]);
    let name_input = doc.append_with(
        form,
        "input",
        &[("name", "name"), ("placeholder", "Jane Doe")],
    );

    let local_note = doc.append_text_element(body, "p", &[], "Made in Montréal");
    // Matches `nav.pricing` as a whole but carries an icon element.
    let mixed = doc.append_with(body, "p", &[]);
    doc.append_with(mixed, "span", &[("class", "icon")]);
    doc.append_text(mixed, "Pricing");

    let footer = doc.append_with(body, "footer", &[("class", "site-footer")]);
    let links = doc.append_with(footer, "div", &[("class", "footer-links")]);
    let privacy_link =
        doc.append_text_element(links, "a", &[("href", "privacy.html")], "Privacy");
    doc.append_text_element(links, "a", &[("href", "security.html")], "Security");
    let rights = doc.append_text_element(
        footer,
        "p",
        &[("class", "muted")],
        "© 2025 VXN. All rights reserved.",
    );

    let ids = Ids {
        hero_title,
        lede,
        cta_button,
        nav_cta,
        metric_label,
        name_input,
        privacy_link,
        rights,
        local_note,
        mixed,
        drawer_fr,
        header_en,
        header_fr,
    };
    (doc, ids)
}

fn store(mock_server: &MockServer) -> Arc<TranslationStore> {
    Arc::new(TranslationStore::new(
        reqwest::Client::new(),
        mock_server.uri(),
    ))
}

fn reconciler(store: &Arc<TranslationStore>) -> Reconciler {
    Reconciler::new(Arc::clone(store), Language::ENGLISH)
}

fn assert_english(doc: &Document, ids: &Ids) {
    assert_eq!(doc.document_lang(), Some("en"));
    assert_eq!(doc.text_content(ids.hero_title), "The CRM that closes the loop");
    assert_eq!(
        doc.text_content(ids.lede),
        "VXN brings your pipeline, conversations and forecasts into one fast workspace."
    );
    assert_eq!(doc.text_content(ids.cta_button), "Request a demo");
    assert_eq!(doc.text_content(ids.nav_cta), "Request demo");
    assert_eq!(doc.text_content(ids.metric_label), "Higher win rate");
    assert_eq!(doc.attribute(ids.name_input, "placeholder"), Some("Jane Doe"));
    assert_eq!(doc.text_content(ids.privacy_link), "Privacy");
    assert_eq!(doc.text_content(ids.rights), "© 2025 VXN. All rights reserved.");
}

// ==================== Language Pipeline Tests ====================

#[tokio::test]
async fn test_full_round_trip_with_shipped_dictionaries() {
    let mock_server = dictionary_host(1).await;
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let prefs = FilePreferences::new(temp_dir.path().join("storage.json"));
    let store = store(&mock_server);
    let (doc, ids) = landing_page();
    let session = LanguageSession::new(doc, reconciler(&store), prefs);

    let SwitchOutcome::Applied(initial) = session.init().await else {
        panic!("initial language was not applied");
    };
    assert_eq!(initial.total_changes(), 0, "the page is authored in English");

    let SwitchOutcome::Applied(french) = session.handle_click(ids.header_fr).await else {
        panic!("French was not applied");
    };
    assert!(french.total_changes() > 0);
    session
        .with_page(|doc| {
            assert_eq!(doc.document_lang(), Some("fr"));
            assert_eq!(doc.text_content(ids.hero_title), "Le CRM qui boucle la boucle");
            assert_eq!(
                doc.text_content(ids.lede),
                "VXN réunit votre pipeline, vos échanges et vos prévisions dans un espace de travail rapide."
            );
            assert_eq!(doc.text_content(ids.cta_button), "Demander une démonstration");
            assert_eq!(doc.text_content(ids.nav_cta), "Demander une démo");
            assert_eq!(doc.text_content(ids.metric_label), "Taux de conversion plus élevé");
            assert_eq!(doc.attribute(ids.name_input, "placeholder"), Some("Jeanne Dupont"));
            assert_eq!(doc.text_content(ids.privacy_link), "Confidentialité");
            assert_eq!(doc.text_content(ids.rights), "© 2025 VXN. Tous droits réservés.");

            // Unknown text and elements with children stay as authored.
            assert_eq!(doc.text_content(ids.local_note), "Made in Montréal");
            assert_eq!(doc.text_content(ids.mixed), "Pricing");

            assert!(doc.has_class(ids.header_fr, "active"));
            assert!(doc.has_class(ids.drawer_fr, "active"));
            assert_eq!(doc.attribute(ids.header_en, "aria-pressed"), Some("false"));
        })
        .await;
    assert_eq!(session.preferences().load().unwrap().as_deref(), Some("fr"));

    let SwitchOutcome::Applied(again) = session.switch_language(Language::FRENCH).await else {
        panic!("French was not reapplied");
    };
    assert_eq!(again.total_changes(), 0, "reapplying a language is a no-op");

    session.handle_click(ids.header_en).await;
    let doc = session.into_page();
    assert_english(&doc, &ids);
}

#[tokio::test]
async fn test_saved_preference_applies_on_next_page_load() {
    // Both page loads share one store, so each dictionary is fetched once.
    let mock_server = dictionary_host(1).await;
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let storage = temp_dir.path().join("storage.json");
    let store = store(&mock_server);

    let (doc, ids) = landing_page();
    let first = LanguageSession::new(doc, reconciler(&store), FilePreferences::new(&storage));
    first.init().await;
    first.handle_click(ids.header_fr).await;

    let (doc, ids) = landing_page();
    let second = LanguageSession::new(doc, reconciler(&store), FilePreferences::new(&storage));
    second.init().await;

    assert_eq!(second.active_language().await, Some(Language::FRENCH));
    let doc = second.into_page();
    assert_eq!(doc.text_content(ids.cta_button), "Demander une démonstration");
    assert_eq!(store.metrics().fetches(), 2);
    assert!(store.metrics().cache_hits() > 0);
}

#[tokio::test]
async fn test_missing_french_file_keeps_english_text() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/assets/i18n/en.json"))
        .respond_with(ResponseTemplate::new(200).set_body_string(EN_JSON))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/assets/i18n/fr.json"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let store = store(&mock_server);
    let (doc, ids) = landing_page();
    let session = LanguageSession::new(
        doc,
        reconciler(&store),
        FilePreferences::new(temp_dir.path().join("storage.json")),
    );

    session.switch_language(Language::FRENCH).await;

    let doc = session.into_page();
    assert_eq!(doc.document_lang(), Some("fr"));
    assert_eq!(doc.text_content(ids.hero_title), "The CRM that closes the loop");
    assert_eq!(doc.text_content(ids.cta_button), "  Request a demo  ");
    // The footer string is hard-coded and does not need a dictionary.
    assert_eq!(doc.text_content(ids.rights), "© 2025 VXN. Tous droits réservés.");
}

#[tokio::test]
async fn test_drawer_language_click_switches_and_closes() {
    let mock_server = dictionary_host(1).await;
    let store = store(&mock_server);
    let (mut doc, ids) = landing_page();
    let drawer = Drawer::attach(&mut doc).expect("landing page has a drawer");
    drawer.open(&mut doc);

    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let session = LanguageSession::new(
        doc,
        reconciler(&store),
        FilePreferences::new(temp_dir.path().join("storage.json")),
    );

    let outcome = session.handle_click(ids.drawer_fr).await;
    let closed = session
        .with_page(|doc| drawer.on_drawer_click(doc, ids.drawer_fr))
        .await;

    assert!(matches!(outcome, SwitchOutcome::Applied(_)));
    assert!(closed);
    let doc = session.into_page();
    assert!(!drawer.is_open(&doc));
    assert_eq!(doc.text_content(ids.hero_title), "Le CRM qui boucle la boucle");
}

// ==================== Dictionary Audit Tests ====================

#[test]
fn test_shipped_french_dictionary_covers_english() {
    let en = Dictionary::from_json(EN_JSON).expect("en.json is valid");
    let fr = Dictionary::from_json(FR_JSON).expect("fr.json is valid");

    let report = DictionaryValidator::validate(&en, &fr);
    assert!(!report.has_errors(), "missing keys: {:?}", report.errors);
    assert_eq!(en.len(), fr.len());
}

// ==================== Verification Relay Tests ====================

#[tokio::test]
async fn test_relay_end_to_end() {
    let verifier = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/siteverify"))
        .and(body_string_contains("secret=test-secret"))
        .and(body_string_contains("response=client-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "hostname": "vxn.example"
        })))
        .expect(1)
        .mount(&verifier)
        .await;

    let state = RelayState::new(
        reqwest::Client::new(),
        Some("test-secret".to_string()),
        format!("{}/siteverify", verifier.uri()),
    );
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, create_router(state)).await.unwrap();
    });

    let client = reqwest::Client::new();
    let url = format!("http://{}{}", addr, FUNCTION_VERIFY_PATH);

    let response = client
        .post(&url)
        .json(&json!({ "token": "client-token" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body, json!({ "success": true, "errorCodes": [] }));

    let response = client.post(&url).json(&json!({})).send().await.unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.unwrap();
    assert!(!body.to_string().contains("test-secret"));
}
