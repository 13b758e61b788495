//! End-to-end relay pipeline: event → person lookup → company lookup → note → write-back.

use std::future::Future;

use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use noterelay_enrichment::EnrichmentClient;
use noterelay_shared::{Company, Outcome, Person, RelayResponse, Result, UserItem};
use noterelay_writeback::NotesClient;

use crate::note::compose_note;

/// Person and company lookups.
pub trait Enrichment {
    fn find_person(&self, email: &str) -> impl Future<Output = Result<Person>>;
    fn find_company(&self, domain: &str) -> impl Future<Output = Result<Company>>;
}

/// Stores a note against a user on the customer-engagement platform.
pub trait NoteWriter {
    /// Returns the platform's representation of the created note.
    fn create_note(&self, user_id: &str, body: &str) -> impl Future<Output = Result<Value>>;
}

impl Enrichment for EnrichmentClient {
    async fn find_person(&self, email: &str) -> Result<Person> {
        EnrichmentClient::find_person(self, email).await
    }

    async fn find_company(&self, domain: &str) -> Result<Company> {
        EnrichmentClient::find_company(self, domain).await
    }
}

impl NoteWriter for NotesClient {
    async fn create_note(&self, user_id: &str, body: &str) -> Result<Value> {
        NotesClient::create_note(self, user_id, body).await
    }
}

/// Result of relaying one event.
#[derive(Debug)]
pub struct Relayed {
    /// Body for the webhook caller.
    pub response: RelayResponse,
    /// 200 on success, otherwise the failing step's status code.
    pub status: u16,
}

/// Records gathered so far, echoed in the response whatever the outcome.
#[derive(Default)]
struct Collected {
    person: Option<Person>,
    company: Option<Option<Company>>,
}

/// Relay one webhook event.
///
/// 1. Extract the user from the event
/// 2. Look the person up by email
/// 3. Look the employer up by domain (best effort)
/// 4. Compose the note
/// 5. Write the note back against the user
///
/// Never fails: every error becomes the `error` field of the response.
#[instrument(skip_all)]
pub async fn relay_event<E, W>(event: Value, enrichment: &E, notes: &W) -> Relayed
where
    E: Enrichment,
    W: NoteWriter,
{
    let mut collected = Collected::default();

    let (outcome, status) = match run(&event, enrichment, notes, &mut collected).await {
        Ok(note) => (Outcome::Note(note), 200),
        Err(e) => {
            warn!(error = %e, detail = e.detail().unwrap_or_default(), "relay failed");
            (Outcome::Error(e.to_string()), e.status_code())
        }
    };

    Relayed {
        response: RelayResponse {
            event,
            person: collected.person,
            company: collected.company,
            outcome,
        },
        status,
    }
}

async fn run<E, W>(
    event: &Value,
    enrichment: &E,
    notes: &W,
    collected: &mut Collected,
) -> Result<Value>
where
    E: Enrichment,
    W: NoteWriter,
{
    let user = UserItem::from_event(event)?;
    debug!(user_id = %user.id, "user event accepted");

    let person = match enrichment.find_person(&user.email).await {
        Ok(person) => person,
        Err(e) => {
            // Echo the service's error body, if it sent one.
            collected.person = e
                .upstream_body()
                .and_then(|body| serde_json::from_value(body.clone()).ok());
            return Err(e);
        }
    };
    let person: &Person = collected.person.insert(person);

    let company = match person.employer_domain() {
        Some(domain) => best_effort("company lookup", enrichment.find_company(domain)).await,
        None => None,
    };
    let company = collected.company.insert(company);

    let body = compose_note(person, company.as_ref())?;

    let note = notes.create_note(&user.id, &body).await?;

    info!(
        user_id = %user.id,
        with_company = company.is_some(),
        lines = body.lines().count(),
        "note created"
    );

    Ok(note)
}

/// Await an optional step, turning its failure into `None`.
pub async fn best_effort<T>(step: &str, fut: impl Future<Output = Result<T>>) -> Option<T> {
    match fut.await {
        Ok(value) => Some(value),
        Err(e) => {
            debug!(step, error = %e, detail = e.detail().unwrap_or_default(), "best-effort step skipped");
            None
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::cell::{Cell, RefCell};

    use noterelay_shared::RelayError;
    use serde_json::json;

    use super::*;

    const PERSON_HOST: &str = "person-stream.clearbit.com";
    const NOTES_HOST: &str = "api.intercom.io";

    /// Canned collaborator reply.
    #[derive(Clone)]
    enum Reply<T> {
        Ok(T),
        Transport,
        Invalid,
        ErrorMarker,
    }

    impl<T: Clone> Reply<T> {
        fn get(&self, host: &str) -> Result<T> {
            let host = host.to_string();
            let detail = String::from("canned failure");
            match self {
                Reply::Ok(value) => Ok(value.clone()),
                Reply::Transport => Err(RelayError::Transport { host, detail }),
                Reply::Invalid => Err(RelayError::InvalidResponse { host, detail }),
                Reply::ErrorMarker => Err(RelayError::ErrorResponse {
                    host,
                    body: json!({"error": {"type": "unknown_record", "message": detail}}),
                    detail,
                }),
            }
        }
    }

    struct FakeEnrichment {
        person: Reply<Person>,
        company: Reply<Company>,
        person_calls: Cell<usize>,
        company_calls: Cell<usize>,
    }

    impl FakeEnrichment {
        fn new(person: Reply<Person>, company: Reply<Company>) -> Self {
            Self {
                person,
                company,
                person_calls: Cell::new(0),
                company_calls: Cell::new(0),
            }
        }
    }

    impl Enrichment for FakeEnrichment {
        async fn find_person(&self, _email: &str) -> Result<Person> {
            self.person_calls.set(self.person_calls.get() + 1);
            self.person.get(PERSON_HOST)
        }

        async fn find_company(&self, _domain: &str) -> Result<Company> {
            self.company_calls.set(self.company_calls.get() + 1);
            self.company.get("company-stream.clearbit.com")
        }
    }

    struct FakeNotes {
        reply: Reply<Value>,
        sent: RefCell<Vec<(String, String)>>,
    }

    impl FakeNotes {
        fn ok() -> Self {
            Self::with(Reply::Ok(json!({"type": "note", "id": "n1"})))
        }

        fn with(reply: Reply<Value>) -> Self {
            Self {
                reply,
                sent: RefCell::new(Vec::new()),
            }
        }
    }

    impl NoteWriter for FakeNotes {
        async fn create_note(&self, user_id: &str, body: &str) -> Result<Value> {
            self.sent
                .borrow_mut()
                .push((user_id.to_string(), body.to_string()));
            self.reply.get(NOTES_HOST)
        }
    }

    fn user_event() -> Value {
        json!({
            "type": "notification_event",
            "topic": "user.created",
            "data": {"item": {"type": "user", "id": "u1", "email": "alex@acme.com"}}
        })
    }

    fn acme_person() -> Person {
        serde_json::from_value(json!({
            "id": "p1",
            "email": "alex@acme.com",
            "employment": {"title": "CEO", "name": "Acme", "domain": "acme.com"}
        }))
        .unwrap()
    }

    fn acme_company() -> Company {
        serde_json::from_value(json!({
            "name": "Acme",
            "metrics": {"raised": 5_000_000, "employees": 50}
        }))
        .unwrap()
    }

    fn error_of(relayed: &Relayed) -> &str {
        match &relayed.response.outcome {
            Outcome::Error(message) => message,
            Outcome::Note(note) => panic!("expected error, got note {note}"),
        }
    }

    #[tokio::test]
    async fn full_relay_with_company() {
        let enrichment = FakeEnrichment::new(Reply::Ok(acme_person()), Reply::Ok(acme_company()));
        let notes = FakeNotes::ok();

        let relayed = relay_event(user_event(), &enrichment, &notes).await;

        assert_eq!(relayed.status, 200);
        assert_eq!(
            relayed.response.outcome,
            Outcome::Note(json!({"type": "note", "id": "n1"}))
        );
        assert_eq!(relayed.response.event, user_event());
        assert_eq!(relayed.response.person, Some(acme_person()));
        assert_eq!(relayed.response.company, Some(Some(acme_company())));
        assert_eq!(
            notes.sent.borrow().as_slice(),
            [(
                "u1".to_string(),
                "CEO @ Acme\nRaised $5M, 50 employees".to_string()
            )]
        );
    }

    #[tokio::test]
    async fn unsupported_event_makes_no_calls() {
        let enrichment = FakeEnrichment::new(Reply::Ok(acme_person()), Reply::Ok(acme_company()));
        let notes = FakeNotes::ok();
        let event = json!({"data": {"item": {"type": "company", "id": "c1"}}});

        let relayed = relay_event(event, &enrichment, &notes).await;

        assert_eq!(error_of(&relayed), "Event type is not supported.");
        assert_eq!(relayed.status, 422);
        assert_eq!(enrichment.person_calls.get(), 0);
        assert_eq!(enrichment.company_calls.get(), 0);
        assert!(notes.sent.borrow().is_empty());
        assert!(relayed.response.person.is_none());
    }

    #[tokio::test]
    async fn malformed_events_make_no_calls() {
        let cases = [
            (json!({"data": {}}), "Unexpected JSON format."),
            (json!(null), "Unexpected JSON format."),
            (
                json!({"data": {"item": {"type": "user", "email": "a@b.co"}}}),
                "User object missing fields.",
            ),
        ];

        for (event, expected) in cases {
            let enrichment =
                FakeEnrichment::new(Reply::Ok(acme_person()), Reply::Ok(acme_company()));
            let notes = FakeNotes::ok();

            let relayed = relay_event(event.clone(), &enrichment, &notes).await;

            assert_eq!(error_of(&relayed), expected);
            assert_eq!(relayed.response.event, event);
            assert_eq!(enrichment.person_calls.get(), 0);
            assert!(notes.sent.borrow().is_empty());
        }
    }

    #[tokio::test]
    async fn person_transport_failure_names_host_and_skips_writeback() {
        let enrichment = FakeEnrichment::new(Reply::Transport, Reply::Ok(acme_company()));
        let notes = FakeNotes::ok();

        let relayed = relay_event(user_event(), &enrichment, &notes).await;

        assert_eq!(
            error_of(&relayed),
            "API call failed to person-stream.clearbit.com."
        );
        assert_eq!(relayed.status, 502);
        assert_eq!(enrichment.company_calls.get(), 0);
        assert!(notes.sent.borrow().is_empty());
    }

    #[tokio::test]
    async fn person_lookup_failures_are_distinct() {
        for (reply, expected) in [
            (
                Reply::Invalid,
                "Invalid response from person-stream.clearbit.com.",
            ),
            (
                Reply::ErrorMarker,
                "Error response from person-stream.clearbit.com.",
            ),
        ] {
            let enrichment = FakeEnrichment::new(reply, Reply::Ok(acme_company()));
            let notes = FakeNotes::ok();

            let relayed = relay_event(user_event(), &enrichment, &notes).await;

            assert_eq!(error_of(&relayed), expected);
            assert!(notes.sent.borrow().is_empty());
        }
    }

    #[tokio::test]
    async fn company_failures_are_absorbed() {
        for reply in [Reply::Transport, Reply::Invalid, Reply::ErrorMarker] {
            let enrichment = FakeEnrichment::new(Reply::Ok(acme_person()), reply);
            let notes = FakeNotes::ok();

            let relayed = relay_event(user_event(), &enrichment, &notes).await;

            assert_eq!(relayed.status, 200);
            assert!(!relayed.response.is_error());
            assert_eq!(relayed.response.company, Some(None));
            assert_eq!(enrichment.company_calls.get(), 1);
            assert_eq!(notes.sent.borrow()[0].1, "CEO @ Acme");
        }
    }

    #[tokio::test]
    async fn person_error_body_is_echoed() {
        let enrichment = FakeEnrichment::new(Reply::ErrorMarker, Reply::Ok(acme_company()));
        let notes = FakeNotes::ok();

        let relayed = relay_event(user_event(), &enrichment, &notes).await;

        assert_eq!(
            error_of(&relayed),
            "Error response from person-stream.clearbit.com."
        );
        let echoed = serde_json::to_value(&relayed.response).unwrap();
        assert_eq!(echoed["person"]["error"]["message"], "canned failure");
        assert!(echoed.get("company").is_none());
    }

    #[tokio::test]
    async fn empty_company_record_still_writes_person_note() {
        let enrichment =
            FakeEnrichment::new(Reply::Ok(acme_person()), Reply::Ok(Company::default()));
        let notes = FakeNotes::ok();

        let relayed = relay_event(user_event(), &enrichment, &notes).await;

        assert_eq!(relayed.status, 200);
        assert!(!relayed.response.is_error());
        assert_eq!(relayed.response.company, Some(Some(Company::default())));
        assert_eq!(notes.sent.borrow()[0].1, "CEO @ Acme");
    }

    #[tokio::test]
    async fn no_domain_skips_company_lookup() {
        let person: Person = serde_json::from_value(json!({
            "employment": {"title": null, "name": "Acme", "domain": null}
        }))
        .unwrap();
        let enrichment = FakeEnrichment::new(Reply::Ok(person), Reply::Ok(acme_company()));
        let notes = FakeNotes::ok();

        let relayed = relay_event(user_event(), &enrichment, &notes).await;

        assert!(!relayed.response.is_error());
        assert_eq!(enrichment.company_calls.get(), 0);
        assert_eq!(relayed.response.company, Some(None));
        assert_eq!(notes.sent.borrow()[0].1, "Works @ Acme");
    }

    #[tokio::test]
    async fn unexpected_person_shape_fails_note_generation() {
        let person: Person = serde_json::from_value(json!({"id": "p1"})).unwrap();
        let enrichment = FakeEnrichment::new(Reply::Ok(person.clone()), Reply::Ok(acme_company()));
        let notes = FakeNotes::ok();

        let relayed = relay_event(user_event(), &enrichment, &notes).await;

        assert_eq!(error_of(&relayed), "Failed to generate note for user.");
        assert_eq!(relayed.response.person, Some(person));
        assert!(notes.sent.borrow().is_empty());
    }

    #[tokio::test]
    async fn writeback_failures_surface() {
        for (reply, expected) in [
            (Reply::Transport, "API call failed to api.intercom.io."),
            (Reply::Invalid, "Invalid response from api.intercom.io."),
            (Reply::ErrorMarker, "Error response from api.intercom.io."),
        ] {
            let enrichment =
                FakeEnrichment::new(Reply::Ok(acme_person()), Reply::Ok(acme_company()));
            let notes = FakeNotes::with(reply);

            let relayed = relay_event(user_event(), &enrichment, &notes).await;

            assert_eq!(error_of(&relayed), expected);
            assert_eq!(relayed.response.company, Some(Some(acme_company())));
            assert_eq!(notes.sent.borrow().len(), 1);
        }
    }

    #[tokio::test]
    async fn best_effort_absorbs_errors() {
        let ok = best_effort("ok", async { Ok::<_, RelayError>(7) }).await;
        assert_eq!(ok, Some(7));

        let failed = best_effort("failed", async {
            Err::<u32, _>(RelayError::validation("nope"))
        })
        .await;
        assert_eq!(failed, None);
    }

    #[tokio::test]
    async fn relay_with_real_clients_and_mock_servers() {
        use noterelay_shared::{EnrichmentConfig, WritebackConfig};
        use url::Url;
        use wiremock::matchers::{basic_auth, body_json, method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let clearbit = MockServer::start().await;
        let intercom = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v1/people/email/alex@acme.com"))
            .and(basic_auth("sk_test", ""))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "p1",
                "email": "alex@acme.com",
                "employment": {"title": null, "name": "Acme", "domain": "acme.com"}
            })))
            .mount(&clearbit)
            .await;

        // Company lookup is down; the note still goes out.
        Mock::given(method("GET"))
            .and(path("/v1/companies/domain/acme.com"))
            .respond_with(ResponseTemplate::new(500).set_body_string("Internal Server Error"))
            .expect(1)
            .mount(&clearbit)
            .await;

        Mock::given(method("POST"))
            .and(path("/notes"))
            .and(basic_auth("app_9", "ik_456"))
            .and(body_json(json!({"user": {"id": "u1"}, "body": "Works @ Acme"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"type": "note", "id": "n9"})))
            .expect(1)
            .mount(&intercom)
            .await;

        let http = reqwest::Client::new();
        let enrichment = EnrichmentClient::new(
            http.clone(),
            &EnrichmentConfig {
                person_endpoint: Url::parse(&format!("{}/v1/people/email", clearbit.uri()))
                    .unwrap(),
                company_endpoint: Url::parse(&format!("{}/v1/companies/domain", clearbit.uri()))
                    .unwrap(),
            },
            "sk_test",
        );
        let notes = NotesClient::new(
            http,
            &WritebackConfig {
                notes_endpoint: Url::parse(&format!("{}/notes", intercom.uri())).unwrap(),
            },
            "app_9",
            "ik_456",
        );

        let relayed = relay_event(user_event(), &enrichment, &notes).await;

        assert_eq!(relayed.status, 200);
        assert_eq!(
            relayed.response.outcome,
            Outcome::Note(json!({"type": "note", "id": "n9"}))
        );
        assert_eq!(relayed.response.company, Some(None));
    }
}
