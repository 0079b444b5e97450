// src/export/remote.rs

//! Pushing a collection into a remote repository, one item per record.

use async_trait::async_trait;

use crate::error::{AppError, Result};
use crate::models::{Record, ResultCollection};
use crate::pipeline::pacing::{PacingPolicy, pause};
use crate::utils::html::strip_markup;

/// Session-based item creation in a remote repository.
#[async_trait]
pub trait RepositoryClient: Send + Sync {
    /// Log in; a rejection is [`AppError::Auth`].
    async fn authenticate(&self) -> Result<()>;

    /// Whether the current session is authenticated.
    async fn status(&self) -> Result<bool>;

    /// Create one item in the given collection.
    async fn create_item(&self, collection_id: &str, item: &ItemDraft<'_>) -> Result<()>;

    async fn logout(&self) -> Result<()>;
}

/// Looks up supplemental metadata for a persistent identifier.
#[async_trait]
pub trait IdentifierResolver: Send + Sync {
    /// `Ok(None)` when the identifier is unknown to the resolver.
    async fn resolve(&self, identifier: &str) -> Result<Option<Supplemental>>;
}

/// Metadata found by resolving an identifier.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Supplemental {
    pub abstract_text: Option<String>,
    pub url: Option<String>,
    pub publisher: Option<String>,
    pub issued: Option<String>,
    pub authors: Vec<String>,
}

/// A record on its way to the repository, with whatever was resolved for it.
///
/// The record itself is never modified; resolved values only fill gaps in
/// the outgoing item.
#[derive(Debug, Clone)]
pub struct ItemDraft<'a> {
    pub record: &'a Record,
    pub supplemental: Supplemental,
}

impl<'a> ItemDraft<'a> {
    pub fn new(record: &'a Record) -> Self {
        Self {
            record,
            supplemental: Supplemental::default(),
        }
    }

    pub fn with_supplemental(mut self, supplemental: Supplemental) -> Self {
        self.supplemental = supplemental;
        self
    }

    /// Resolved abstract (markup stripped), else the record's own.
    pub fn abstract_text(&self) -> String {
        self.supplemental
            .abstract_text
            .as_deref()
            .map(|a| strip_markup(a).trim().to_string())
            .filter(|a| !a.is_empty())
            .unwrap_or_else(|| self.record.abstract_text().to_string())
    }

    /// Resolved issue date, else the record's date.
    pub fn issued(&self) -> String {
        self.supplemental
            .issued
            .clone()
            .filter(|d| !d.is_empty())
            .unwrap_or_else(|| self.record.date().to_string())
    }

    /// Record link, else the resolved landing page.
    pub fn uri(&self) -> Option<String> {
        self.record
            .link()
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .or_else(|| self.supplemental.url.clone())
    }

    /// Record authors, else the resolved ones.
    pub fn authors(&self) -> Vec<String> {
        if self.record.authors().is_empty() {
            self.supplemental.authors.clone()
        } else {
            self.record.authors().to_vec()
        }
    }
}

/// One item the repository refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemFailure {
    /// Position of the record in the collection
    pub index: usize,
    pub title: String,
    pub identifier: String,
    pub message: String,
}

/// Outcome of one remote export.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemoteExportReport {
    pub attempted: usize,
    pub succeeded: usize,
    pub failures: Vec<ItemFailure>,
}

impl RemoteExportReport {
    pub fn failed(&self) -> usize {
        self.failures.len()
    }

    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Create one remote item per record, in collection order.
///
/// Authentication problems abort the export. A refused item is recorded in
/// the report and the remaining records are still sent.
pub async fn export_to_repository(
    collection: &ResultCollection,
    client: &dyn RepositoryClient,
    collection_id: &str,
    pacing: &dyn PacingPolicy,
    resolver: Option<&dyn IdentifierResolver>,
) -> Result<RemoteExportReport> {
    if collection_id.trim().is_empty() {
        return Err(AppError::config("no target collection for remote export"));
    }

    client.authenticate().await?;
    if !client.status().await? {
        return Err(AppError::auth("session is not authenticated after login"));
    }

    let total = collection.len();
    let mut report = RemoteExportReport::default();

    for (index, record) in collection.iter().enumerate() {
        let mut draft = ItemDraft::new(record);
        if let Some(resolver) = resolver {
            draft = draft.with_supplemental(supplement(resolver, record).await);
        }

        report.attempted += 1;
        match client.create_item(collection_id, &draft).await {
            Ok(()) => {
                report.succeeded += 1;
                log::info!("[{}/{total}] created item '{}'", index + 1, record.title());
            }
            Err(e) => {
                log::warn!("[{}/{total}] item '{}' was refused: {e}", index + 1, record.title());
                report.failures.push(ItemFailure {
                    index,
                    title: record.title().to_string(),
                    identifier: record.identifier().to_string(),
                    message: e.to_string(),
                });
            }
        }

        pause(pacing, total - index - 1).await;
    }

    if let Err(e) = client.logout().await {
        log::warn!("Logout failed: {e}");
    }

    Ok(report)
}

async fn supplement(resolver: &dyn IdentifierResolver, record: &Record) -> Supplemental {
    if !record.has_identifier() {
        return Supplemental::default();
    }
    match resolver.resolve(record.identifier()).await {
        Ok(Some(found)) => found,
        Ok(None) => {
            log::debug!("Identifier {} not found by resolver", record.identifier());
            Supplemental::default()
        }
        Err(e) => {
            log::warn!("Could not resolve {}: {e}", record.identifier());
            Supplemental::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use crate::pipeline::pacing::NoPacing;

    #[test]
    fn test_draft_prefers_resolved_abstract() {
        let record = Record::builder()
            .abstract_text("own")
            .date("2020")
            .build();
        let draft = ItemDraft::new(&record).with_supplemental(Supplemental {
            abstract_text: Some("<jats:p>Resolved</jats:p>".into()),
            issued: Some("2020-05-01".into()),
            url: Some("https://doi.org/10.1/a".into()),
            ..Supplemental::default()
        });

        assert_eq!(draft.abstract_text(), "Resolved");
        assert_eq!(draft.issued(), "2020-05-01");
        assert_eq!(draft.uri().as_deref(), Some("https://doi.org/10.1/a"));
        assert_eq!(record.abstract_text(), "own");
    }

    #[test]
    fn test_draft_falls_back_to_record() {
        let record = Record::builder()
            .abstract_text("own")
            .authors(vec!["Doe".into()])
            .link(Some("https://a.org".into()))
            .build();
        let draft = ItemDraft::new(&record);
        assert_eq!(draft.abstract_text(), "own");
        assert_eq!(draft.authors(), vec!["Doe"]);
        assert_eq!(draft.uri().as_deref(), Some("https://a.org"));
    }

    struct LockedOut;

    #[async_trait]
    impl RepositoryClient for LockedOut {
        async fn authenticate(&self) -> Result<()> {
            Err(AppError::auth("bad password"))
        }
        async fn status(&self) -> Result<bool> {
            Ok(false)
        }
        async fn create_item(&self, _: &str, _: &ItemDraft<'_>) -> Result<()> {
            panic!("must not create items without a session")
        }
        async fn logout(&self) -> Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_auth_failure_is_fatal() {
        let collection: ResultCollection =
            std::iter::once(Record::builder().title("a").build()).collect();
        let err = export_to_repository(&collection, &LockedOut, "c1", &NoPacing, None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Auth(_)));
    }

    #[tokio::test]
    async fn test_missing_collection_id() {
        let err = export_to_repository(&ResultCollection::new(), &LockedOut, " ", &NoPacing, None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }

    /// Refuses the item at `refuse_index`, accepts the rest.
    struct FlakyRepository {
        refuse_index: usize,
        created: Mutex<Vec<String>>,
        attempts: Mutex<usize>,
        logged_out: Mutex<bool>,
    }

    impl FlakyRepository {
        fn new(refuse_index: usize) -> Self {
            Self {
                refuse_index,
                created: Mutex::new(Vec::new()),
                attempts: Mutex::new(0),
                logged_out: Mutex::new(false),
            }
        }
    }

    #[async_trait]
    impl RepositoryClient for FlakyRepository {
        async fn authenticate(&self) -> Result<()> {
            Ok(())
        }

        async fn status(&self) -> Result<bool> {
            Ok(true)
        }

        async fn create_item(&self, collection_id: &str, item: &ItemDraft<'_>) -> Result<()> {
            assert_eq!(collection_id, "c-1");
            let index = {
                let mut attempts = self.attempts.lock().unwrap();
                *attempts += 1;
                *attempts - 1
            };
            if index == self.refuse_index {
                return Err(AppError::remote(422, "unprocessable"));
            }
            self.created
                .lock()
                .unwrap()
                .push(item.record.title().to_string());
            Ok(())
        }

        async fn logout(&self) -> Result<()> {
            *self.logged_out.lock().unwrap() = true;
            Ok(())
        }
    }

    fn three_records() -> ResultCollection {
        ["one", "two", "three"]
            .iter()
            .enumerate()
            .map(|(i, title)| {
                Record::builder()
                    .title(*title)
                    .identifier(format!("10.1234/{i}"))
                    .build()
            })
            .collect()
    }

    #[tokio::test]
    async fn test_refused_item_does_not_stop_the_rest() {
        let repository = FlakyRepository::new(1);

        let report = export_to_repository(&three_records(), &repository, "c-1", &NoPacing, None)
            .await
            .unwrap();

        assert_eq!(report.attempted, 3);
        assert_eq!(report.succeeded, 2);
        assert_eq!(report.failed(), 1);
        assert!(!report.is_complete());
        assert_eq!(report.failures[0].index, 1);
        assert_eq!(report.failures[0].title, "two");
        assert_eq!(*repository.created.lock().unwrap(), vec!["one", "three"]);
        assert!(*repository.logged_out.lock().unwrap());
    }

    struct Unauthorized;

    #[async_trait]
    impl RepositoryClient for Unauthorized {
        async fn authenticate(&self) -> Result<()> {
            Ok(())
        }

        async fn status(&self) -> Result<bool> {
            Ok(false)
        }

        async fn create_item(&self, _: &str, _: &ItemDraft<'_>) -> Result<()> {
            Err(AppError::remote(401, "no session"))
        }

        async fn logout(&self) -> Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_unauthenticated_session_aborts_remote_export() {
        let collection = three_records();

        let err = export_to_repository(&collection, &Unauthorized, "c-1", &NoPacing, None)
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Auth(_)));
        assert_eq!(collection.len(), 3);
    }

    /// Knows one abstract; everything else is not found.
    struct OneAbstract;

    #[async_trait]
    impl IdentifierResolver for OneAbstract {
        async fn resolve(&self, identifier: &str) -> Result<Option<Supplemental>> {
            if identifier != "10.1234/0" {
                return Ok(None);
            }
            Ok(Some(Supplemental {
                abstract_text: Some("<p>Resolved abstract</p>".into()),
                ..Supplemental::default()
            }))
        }
    }

    /// Remembers the abstract each draft would send.
    #[derive(Default)]
    struct Recording {
        abstracts: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl RepositoryClient for Recording {
        async fn authenticate(&self) -> Result<()> {
            Ok(())
        }

        async fn status(&self) -> Result<bool> {
            Ok(true)
        }

        async fn create_item(&self, _: &str, item: &ItemDraft<'_>) -> Result<()> {
            self.abstracts.lock().unwrap().push(item.abstract_text());
            Ok(())
        }

        async fn logout(&self) -> Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_resolver_enriches_items_but_not_records() {
        let collection = three_records();
        let repository = Recording::default();

        let report = export_to_repository(
            &collection,
            &repository,
            "c-1",
            &NoPacing,
            Some(&OneAbstract),
        )
        .await
        .unwrap();

        assert!(report.is_complete());
        let abstracts = repository.abstracts.lock().unwrap();
        assert_eq!(abstracts[0], "Resolved abstract");
        assert_eq!(abstracts[1], "");
        assert_eq!(collection.records()[0].abstract_text(), "");
    }
}
