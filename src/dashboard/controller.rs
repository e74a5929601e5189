//! The dashboard state machine.

use std::{future::Future, sync::Arc};

use tokio::sync::watch;

use crate::{
    Error, UserID,
    capture::{ChartCapturer, capture_charts},
    charts::{ChartSurface, dashboard_surfaces},
    config::ReportConfig,
    dashboard::view::{DashboardPhase, DashboardView},
    identity::IdentityProvider,
    metrics::{Totals, compute_totals, is_over_budget},
    models::Transaction,
    report::{ExportArtifact, PdfOptions, render_csv, render_pdf},
    stores::{Collection, DocumentStore},
    sync::{LiveSync, SyncUpdate, UserUpdate},
};

/// Which streams have delivered at least one snapshot for the current user.
#[derive(Debug, Default, Clone, Copy)]
struct Received {
    transactions: bool,
    budget: bool,
    monthly_income: bool,
}

impl Received {
    fn all(&self) -> bool {
        self.transactions && self.budget && self.monthly_income
    }
}

enum Event {
    Shutdown,
    IdentityChanged(Result<(), watch::error::RecvError>),
    Update(UserUpdate),
}

/// The live financial overview of one signed in user.
///
/// The dashboard moves from [DashboardPhase::Unauthenticated] to
/// [DashboardPhase::Loading] when a user signs in and to
/// [DashboardPhase::Live] on the first snapshot for that user. Every snapshot
/// replaces the previous one and the totals are recomputed from scratch.
pub struct Dashboard<S> {
    store: Arc<S>,
    sync: LiveSync<S>,
    config: ReportConfig,
    phase: DashboardPhase,
    received: Received,
    transactions: Vec<Transaction>,
    budget: f64,
    monthly_income: f64,
    totals: Totals,
    over_budget: bool,
    views: watch::Sender<DashboardView>,
}

impl<S: DocumentStore> Dashboard<S> {
    /// Create a dashboard with nobody signed in.
    pub fn new(store: Arc<S>, config: ReportConfig) -> Self {
        let (views, _) = watch::channel(DashboardView::signed_out());

        Self {
            sync: LiveSync::new(store.clone()),
            store,
            config,
            phase: DashboardPhase::Unauthenticated,
            received: Received::default(),
            transactions: Vec::new(),
            budget: 0.0,
            monthly_income: 0.0,
            totals: Totals::default(),
            over_budget: false,
            views,
        }
    }

    /// Switch to `user`, or to nobody.
    ///
    /// The previous user's subscriptions are closed and their data cleared
    /// before anything of the new user is loaded.
    pub fn set_user(&mut self, user: Option<UserID>) {
        self.sync.teardown();
        self.clear();

        match user {
            Some(user) => {
                tracing::info!("loading dashboard for user {user}");
                self.phase = DashboardPhase::Loading;
                self.sync.subscribe(user);
            }
            None => {
                tracing::debug!("dashboard signed out");
                self.phase = DashboardPhase::Unauthenticated;
            }
        }

        self.publish();
    }

    fn clear(&mut self) {
        self.received = Received::default();
        self.transactions.clear();
        self.budget = 0.0;
        self.monthly_income = 0.0;
        self.totals = Totals::default();
        self.over_budget = false;
    }

    /// Apply a snapshot update.
    ///
    /// Updates for anyone but the current user are ignored.
    ///
    /// # Returns
    /// Whether the update was applied.
    pub fn apply(&mut self, update: UserUpdate) -> bool {
        if self.sync.user() != Some(&update.user) {
            tracing::debug!("ignoring update for user {}", update.user);
            return false;
        }

        match update.update {
            SyncUpdate::Transactions(transactions) => {
                self.received.transactions = true;
                self.transactions = transactions;
                self.totals = compute_totals(&self.transactions);
            }
            SyncUpdate::Budget(budget) => {
                self.received.budget = true;
                self.budget = budget;
            }
            SyncUpdate::MonthlyIncome(amount) => {
                self.received.monthly_income = true;
                self.monthly_income = amount;
            }
        }

        self.over_budget = is_over_budget(self.totals.expense, self.budget);

        if self.phase == DashboardPhase::Loading {
            tracing::debug!("dashboard is live");
            self.phase = DashboardPhase::Live;
        }

        self.publish();
        true
    }

    /// A receiver that sees a fresh [DashboardView] after every change.
    pub fn watch_view(&self) -> watch::Receiver<DashboardView> {
        self.views.subscribe()
    }

    fn publish(&self) {
        self.views.send_replace(self.view());
    }

    /// Wait for the next snapshot and apply it.
    ///
    /// # Returns
    /// `false` if there are no open subscriptions to wait on.
    pub async fn process_next_update(&mut self) -> bool {
        while let Some(update) = self.sync.next_update().await {
            if self.apply(update) {
                return true;
            }
        }

        false
    }

    /// Wait until every stream has delivered its first snapshot.
    ///
    /// # Errors
    /// Returns [Error::Unauthenticated] if nobody is signed in.
    pub async fn wait_for_initial_sync(&mut self) -> Result<(), Error> {
        if self.sync.user().is_none() {
            return Err(Error::Unauthenticated);
        }

        while !self.received.all() {
            if !self.process_next_update().await {
                tracing::warn!("subscriptions ended before every stream was loaded");
                break;
            }
        }

        Ok(())
    }

    /// Follow `identity` and the store until `shutdown` resolves.
    ///
    /// Sign in and sign out events switch the subscriptions, snapshots are
    /// applied as they arrive. All subscriptions are closed on return.
    pub async fn run<I: IdentityProvider>(&mut self, identity: &I, shutdown: impl Future<Output = ()>) {
        let mut users = identity.watch();
        let mut identity_open = true;
        self.set_user(users.borrow_and_update().clone());

        tokio::pin!(shutdown);

        loop {
            let syncing = self.sync.is_active();

            let event = tokio::select! {
                _ = &mut shutdown => Event::Shutdown,
                changed = users.changed(), if identity_open => Event::IdentityChanged(changed),
                Some(update) = self.sync.next_update(), if syncing => Event::Update(update),
            };

            match event {
                Event::Shutdown => break,
                Event::IdentityChanged(Ok(())) => {
                    let user = users.borrow_and_update().clone();
                    if user.as_ref() != self.sync.user() {
                        self.set_user(user);
                    }
                }
                Event::IdentityChanged(Err(_)) => {
                    tracing::warn!("identity provider closed, keeping the current user");
                    identity_open = false;
                }
                Event::Update(update) => {
                    self.apply(update);
                }
            }
        }

        tracing::debug!("dashboard shutting down");
        self.set_user(None);
    }

    /// Delete the transaction `id`.
    ///
    /// The snapshot is not changed here. The transaction disappears when the
    /// store delivers the next snapshot.
    ///
    /// # Errors
    /// Returns [Error::Unauthenticated] if nobody is signed in, or the store's
    /// error if the delete fails.
    pub async fn delete_transaction(&self, id: &str) -> Result<(), Error> {
        let Some(user) = self.sync.user() else {
            return Err(Error::Unauthenticated);
        };

        tracing::info!("deleting transaction {id} for user {user}");

        self.store
            .delete(Collection::Transactions, id)
            .await
            .inspect_err(|error| tracing::error!("could not delete transaction {id}: {error}"))
    }

    /// Whether there are transactions to export.
    pub fn can_export(&self) -> bool {
        !self.transactions.is_empty()
    }

    /// Export the transactions as CSV.
    ///
    /// # Errors
    /// Returns [Error::NothingToExport] if there are no transactions.
    pub fn export_csv(&self) -> Result<ExportArtifact, Error> {
        self.ensure_exportable()?;

        let today = self.config.today()?;
        let bytes = render_csv(&self.transactions)?;

        tracing::info!("exported {} transactions as CSV", self.transactions.len());

        Ok(ExportArtifact::csv(&self.config.app_name, today, bytes))
    }

    /// Export the transactions, totals and charts as a PDF report.
    ///
    /// Charts that `capturer` cannot capture are left out of the report.
    ///
    /// # Errors
    /// Returns [Error::NothingToExport] if there are no transactions.
    pub async fn export_pdf<C: ChartCapturer>(&self, capturer: &C) -> Result<ExportArtifact, Error> {
        self.ensure_exportable()?;

        let today = self.config.today()?;
        let surfaces = self.chart_surfaces();
        let images = capture_charts(capturer, &surfaces).await;
        let options = PdfOptions::from_config(&self.config, today);
        let bytes = render_pdf(&self.transactions, &self.totals, &images, &options)?;

        tracing::info!("exported {} transactions as PDF", self.transactions.len());

        Ok(ExportArtifact::pdf(&self.config.app_name, today, bytes))
    }

    fn ensure_exportable(&self) -> Result<(), Error> {
        if self.can_export() {
            Ok(())
        } else {
            Err(Error::NothingToExport)
        }
    }

    /// The charts for the current snapshot.
    pub fn chart_surfaces(&self) -> [ChartSurface; 2] {
        dashboard_surfaces(&self.transactions, &self.totals)
    }

    /// The current phase.
    pub fn phase(&self) -> DashboardPhase {
        self.phase
    }

    /// The signed in user.
    pub fn user(&self) -> Option<&UserID> {
        self.sync.user()
    }

    /// The transaction snapshot, newest first.
    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    /// The current totals.
    pub fn totals(&self) -> Totals {
        self.totals
    }

    /// The monthly budget.
    pub fn budget(&self) -> f64 {
        self.budget
    }

    /// The current monthly income.
    pub fn monthly_income(&self) -> f64 {
        self.monthly_income
    }

    /// Whether expenses exceed the budget.
    pub fn is_over_budget(&self) -> bool {
        self.over_budget
    }

    /// A serializable copy of the current state.
    pub fn view(&self) -> DashboardView {
        DashboardView {
            phase: self.phase,
            user: self.sync.user().cloned(),
            totals: self.totals,
            budget: self.budget,
            monthly_income: self.monthly_income,
            over_budget: self.over_budget,
            transaction_count: self.transactions.len(),
            can_export: self.can_export(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{future::Future, sync::Arc, time::Duration};

    use serde_json::json;
    use tokio::sync::oneshot;

    use crate::{
        Error, UserID,
        capture::{CaptureError, ChartCapturer, RasterImage},
        charts::ChartSurface,
        config::ReportConfig,
        dashboard::DashboardPhase,
        identity::Session,
        metrics::Totals,
        stores::{Collection, sqlite::SQLiteDocumentStore},
        sync::{SyncUpdate, UserUpdate},
        test_utils::{ScriptedStore, document, fields, get_test_store},
    };

    use super::Dashboard;

    struct NoCharts;

    impl ChartCapturer for NoCharts {
        fn capture(
            &self,
            surface: &ChartSurface,
        ) -> impl Future<Output = Result<RasterImage, CaptureError>> {
            std::future::ready(Err(CaptureError::NotMounted(surface.kind())))
        }
    }

    fn alice() -> UserID {
        UserID::new("alice")
    }

    fn insert(store: &SQLiteDocumentStore, collection: Collection, value: serde_json::Value) {
        store.insert(collection, fields(value)).unwrap();
    }

    async fn signed_in(store: &Arc<SQLiteDocumentStore>) -> Dashboard<SQLiteDocumentStore> {
        let mut dashboard = Dashboard::new(store.clone(), ReportConfig::default());
        dashboard.set_user(Some(alice()));
        dashboard.wait_for_initial_sync().await.unwrap();
        dashboard
    }

    #[test]
    fn starts_unauthenticated_with_zeroes() {
        let dashboard = Dashboard::new(Arc::new(get_test_store()), ReportConfig::default());

        let view = dashboard.view();

        assert_eq!(view.phase, DashboardPhase::Unauthenticated);
        assert_eq!(view.user, None);
        assert_eq!(view.totals, Totals::default());
        assert!(!view.over_budget);
        assert!(!view.can_export);
    }

    #[tokio::test]
    async fn first_snapshot_makes_dashboard_live() {
        let mut dashboard = Dashboard::new(Arc::new(get_test_store()), ReportConfig::default());

        dashboard.set_user(Some(alice()));
        assert_eq!(dashboard.phase(), DashboardPhase::Loading);

        assert!(dashboard.process_next_update().await);
        assert_eq!(dashboard.phase(), DashboardPhase::Live);
    }

    #[tokio::test]
    async fn subscription_error_keeps_last_snapshot() {
        let store = Arc::new(ScriptedStore::default());
        let mut dashboard = Dashboard::new(store.clone(), ReportConfig::default());
        dashboard.set_user(Some(alice()));
        store.push(
            Collection::Transactions,
            Ok(vec![document(
                "t1",
                json!({"userId": "alice", "type": "income", "amount": 100}),
            )]),
        );
        assert!(dashboard.process_next_update().await);

        store.push(Collection::Transactions, Err(Error::DatabaseLockError));
        let waited =
            tokio::time::timeout(Duration::from_millis(50), dashboard.process_next_update()).await;

        assert!(waited.is_err(), "an error must not count as an update");
        assert_eq!(dashboard.phase(), DashboardPhase::Live);
        assert_eq!(dashboard.totals().income, 100.0);
        assert_eq!(dashboard.transactions().len(), 1);

        store.push(
            Collection::Transactions,
            Ok(vec![
                document("t1", json!({"userId": "alice", "type": "income", "amount": 100})),
                document("t2", json!({"userId": "alice", "type": "income", "amount": 150})),
            ]),
        );
        assert!(dashboard.process_next_update().await);

        assert_eq!(dashboard.totals().income, 250.0);
    }

    #[tokio::test]
    async fn string_amounts_and_budget_alert() {
        let store = Arc::new(get_test_store());
        insert(
            &store,
            Collection::Transactions,
            json!({"userId": "alice", "type": "income", "amount": "1000"}),
        );
        insert(
            &store,
            Collection::Transactions,
            json!({"userId": "alice", "type": "expense", "amount": 500}),
        );
        store.upsert_budget(&alice(), 400.0).unwrap();

        let dashboard = signed_in(&store).await;

        assert_eq!(
            dashboard.totals(),
            Totals {
                income: 1000.0,
                expense: 500.0,
                balance: 500.0
            }
        );
        assert_eq!(dashboard.budget(), 400.0);
        assert!(dashboard.is_over_budget());
    }

    #[tokio::test]
    async fn empty_snapshot_disables_export() {
        let store = Arc::new(get_test_store());
        let dashboard = signed_in(&store).await;

        assert_eq!(dashboard.phase(), DashboardPhase::Live);
        assert_eq!(dashboard.totals(), Totals::default());
        assert!(!dashboard.is_over_budget());
        assert!(!dashboard.can_export());
        assert_eq!(dashboard.export_csv(), Err(Error::NothingToExport));
        assert_eq!(dashboard.export_pdf(&NoCharts).await, Err(Error::NothingToExport));
    }

    #[tokio::test]
    async fn malformed_amount_counts_as_zero() {
        let store = Arc::new(get_test_store());
        insert(
            &store,
            Collection::Transactions,
            json!({"userId": "alice", "type": "expense", "amount": "abc"}),
        );
        insert(
            &store,
            Collection::Transactions,
            json!({"userId": "alice", "type": "expense", "amount": 20}),
        );

        let dashboard = signed_in(&store).await;

        assert_eq!(dashboard.totals().expense, 20.0);
        assert_eq!(dashboard.transactions().len(), 2);
    }

    #[tokio::test]
    async fn monthly_income_is_shown() {
        let store = Arc::new(get_test_store());
        insert(
            &store,
            Collection::MonthlyIncome,
            json!({"userId": "alice", "amount": 3200}),
        );

        let dashboard = signed_in(&store).await;

        assert_eq!(dashboard.monthly_income(), 3200.0);
    }

    #[tokio::test]
    async fn live_updates_recompute_totals() {
        let store = Arc::new(get_test_store());
        let mut dashboard = signed_in(&store).await;

        insert(
            &store,
            Collection::Transactions,
            json!({"userId": "alice", "type": "expense", "amount": 75}),
        );
        store.upsert_budget(&alice(), 50.0).unwrap();
        dashboard.process_next_update().await;
        dashboard.process_next_update().await;

        assert_eq!(dashboard.totals().expense, 75.0);
        assert_eq!(dashboard.totals().balance, -75.0);
        assert!(dashboard.is_over_budget());
    }

    #[tokio::test]
    async fn switching_users_clears_previous_data() {
        let store = Arc::new(get_test_store());
        insert(
            &store,
            Collection::Transactions,
            json!({"userId": "alice", "type": "income", "amount": 10}),
        );
        let mut dashboard = signed_in(&store).await;
        assert_eq!(dashboard.totals().income, 10.0);

        dashboard.set_user(Some(UserID::new("bob")));

        assert_eq!(dashboard.phase(), DashboardPhase::Loading);
        assert_eq!(dashboard.totals(), Totals::default());
        assert!(dashboard.transactions().is_empty());
        assert_eq!(store.listener_count().unwrap(), 3);
    }

    #[tokio::test]
    async fn updates_for_other_users_are_ignored() {
        let store = Arc::new(get_test_store());
        let mut dashboard = signed_in(&store).await;

        let applied = dashboard.apply(UserUpdate {
            user: UserID::new("mallory"),
            update: SyncUpdate::Budget(1.0),
        });

        assert!(!applied);
        assert_eq!(dashboard.budget(), 0.0);
    }

    #[tokio::test]
    async fn sign_out_tears_down() {
        let store = Arc::new(get_test_store());
        let mut dashboard = signed_in(&store).await;

        dashboard.set_user(None);

        assert_eq!(dashboard.phase(), DashboardPhase::Unauthenticated);
        assert_eq!(store.listener_count().unwrap(), 0);
        assert!(!dashboard.process_next_update().await);
    }

    #[tokio::test]
    async fn delete_waits_for_the_store() {
        let store = Arc::new(get_test_store());
        let document = store
            .insert(
                Collection::Transactions,
                fields(json!({"userId": "alice", "type": "expense", "amount": 5})),
            )
            .unwrap();
        let mut dashboard = signed_in(&store).await;

        dashboard.delete_transaction(&document.id).await.unwrap();

        // Nothing is removed until the store delivers the new snapshot.
        assert_eq!(dashboard.transactions().len(), 1);
        dashboard.process_next_update().await;
        assert!(dashboard.transactions().is_empty());
        assert_eq!(dashboard.totals(), Totals::default());
    }

    #[tokio::test]
    async fn failed_delete_is_returned() {
        let store = Arc::new(get_test_store());
        let dashboard = signed_in(&store).await;

        let result = dashboard.delete_transaction("missing").await;

        assert_eq!(result, Err(Error::DeleteMissingDocument));
    }

    #[tokio::test]
    async fn delete_requires_a_user() {
        let dashboard = Dashboard::new(Arc::new(get_test_store()), ReportConfig::default());

        assert_eq!(
            dashboard.delete_transaction("anything").await,
            Err(Error::Unauthenticated)
        );
    }

    #[tokio::test]
    async fn exports_name_files_after_the_app() {
        let store = Arc::new(get_test_store());
        insert(
            &store,
            Collection::Transactions,
            json!({"userId": "alice", "type": "income", "amount": 12, "category": "Gift"}),
        );
        let dashboard = signed_in(&store).await;

        let csv = dashboard.export_csv().unwrap();
        let pdf = dashboard.export_pdf(&NoCharts).await.unwrap();

        assert!(csv.file_name.starts_with("CashPilot-"));
        assert!(csv.file_name.ends_with(".csv"));
        assert!(csv.bytes.starts_with(b"Date,Type,Category,Amount,Note\n"));
        assert!(pdf.file_name.ends_with(".pdf"));
        assert_eq!(pdf.media_type, "application/pdf");
        assert!(pdf.bytes.starts_with(b"%PDF"));
    }

    #[tokio::test]
    async fn views_are_published_on_change() {
        let store = Arc::new(get_test_store());
        let mut dashboard = Dashboard::new(store.clone(), ReportConfig::default());
        let views = dashboard.watch_view();

        dashboard.set_user(Some(alice()));
        assert_eq!(views.borrow().phase, DashboardPhase::Loading);

        insert(
            &store,
            Collection::Transactions,
            json!({"userId": "alice", "type": "income", "amount": 8}),
        );
        dashboard.wait_for_initial_sync().await.unwrap();
        while dashboard.totals().income != 8.0 {
            dashboard.process_next_update().await;
        }

        let view = views.borrow().clone();
        assert_eq!(view.phase, DashboardPhase::Live);
        assert_eq!(view.totals.income, 8.0);
        assert_eq!(view.transaction_count, 1);
    }

    #[tokio::test]
    async fn run_follows_sign_in_and_out() {
        let store = Arc::new(get_test_store());
        let session = Session::new();
        let mut dashboard = Dashboard::new(store.clone(), ReportConfig::default());
        let (stop, stopped) = oneshot::channel::<()>();

        let driver = async {
            let pause = || tokio::time::sleep(Duration::from_millis(20));

            session.sign_in(alice());
            pause().await;
            assert_eq!(store.listener_count().unwrap(), 3);

            session.sign_out();
            pause().await;
            assert_eq!(store.listener_count().unwrap(), 0);

            session.sign_in(UserID::new("bob"));
            pause().await;
            assert_eq!(store.listener_count().unwrap(), 3);

            stop.send(()).unwrap();
        };

        tokio::join!(
            dashboard.run(&session, async {
                stopped.await.ok();
            }),
            driver
        );

        assert_eq!(dashboard.phase(), DashboardPhase::Unauthenticated);
        assert_eq!(store.listener_count().unwrap(), 0);
    }
}
