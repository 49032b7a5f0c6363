//! One sync pass: fetch the Brolexy catalog, then create or update each product in Shopify.
//!
//! Failure policy:
//! - source fetch fails -> the pass aborts (`SyncError::Fetch`)
//! - listing existing Shopify products fails -> the pass aborts (`SyncError::Lookup`)
//! - a single create/update fails -> logged with the product name, the loop continues
use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt;
use std::time::Instant;
use tracing::{debug, error, info, warn};

use crate::config::SyncConfig;
use crate::error::{Result, SyncError};
use crate::providers::brolexy::{FetchOutcome, ProductId, SourceProduct};
use crate::providers::shopify::{
    build_create_payload, build_update_payload, find_variant_by_sku, ExistingMatch,
    ProductEnvelope, TargetProduct,
};

#[async_trait]
pub trait SourceCatalog: Send + Sync {
    async fn fetch_products(&self) -> Result<FetchOutcome>;
}

#[async_trait]
pub trait TargetStore: Send + Sync {
    async fn list_products(&self) -> Result<Vec<TargetProduct>>;

    /// Returns the new product/variant ids when the response carries them.
    async fn create_product(&self, payload: &ProductEnvelope) -> Result<Option<ExistingMatch>>;

    async fn update_product(&self, product_id: i64, payload: &ProductEnvelope) -> Result<()>;

    /// Per-item lookup: list the first page and scan it for `sku`.
    async fn find_by_sku(&self, sku: &str) -> Result<Option<ExistingMatch>> {
        let products = self.list_products().await?;
        Ok(find_variant_by_sku(&products, sku))
    }
}

/// Derived SKU correlating a Brolexy product with its Shopify variant.
pub fn sku_for(prefix: &str, product_id: &ProductId) -> String {
    format!("{prefix}{product_id}")
}

/// SKU -> existing variant, built once per pass from the listed products.
#[derive(Debug, Default)]
pub struct SkuIndex {
    by_sku: HashMap<String, ExistingMatch>,
}

impl SkuIndex {
    /// First occurrence of a SKU wins; later ones are reported and ignored.
    pub fn build(products: &[TargetProduct]) -> Self {
        let mut by_sku = HashMap::new();
        for product in products {
            for variant in &product.variants {
                let Some(sku) = variant.sku.as_deref().filter(|s| !s.is_empty()) else {
                    continue;
                };
                let candidate = ExistingMatch {
                    product_id: product.id,
                    variant_id: variant.id,
                };
                if let Some(kept) = by_sku.get(sku) {
                    warn!(
                        target = "sync",
                        sku,
                        kept = ?kept,
                        ignored = ?candidate,
                        "duplicate sku in shopify; keeping first match"
                    );
                    continue;
                }
                by_sku.insert(sku.to_string(), candidate);
            }
        }
        Self { by_sku }
    }

    pub fn get(&self, sku: &str) -> Option<ExistingMatch> {
        self.by_sku.get(sku).copied()
    }

    pub fn insert(&mut self, sku: String, found: ExistingMatch) {
        self.by_sku.entry(sku).or_insert(found);
    }

    pub fn len(&self) -> usize {
        self.by_sku.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_sku.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncStage {
    Fetching,
    Reconciling { index: usize, total: usize },
    Done,
}

impl fmt::Display for SyncStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncStage::Fetching => f.write_str("fetching"),
            SyncStage::Reconciling { index, total } => {
                write!(f, "reconciling {}/{}", index + 1, total)
            }
            SyncStage::Done => f.write_str("done"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SyncOptions {
    pub sku_prefix: String,
    pub dry_run: bool,
}

impl From<&SyncConfig> for SyncOptions {
    fn from(cfg: &SyncConfig) -> Self {
        Self {
            sku_prefix: cfg.sku_prefix.clone(),
            dry_run: cfg.dry_run,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ItemFailure {
    pub name: String,
    pub sku: String,
    pub error: String,
}

#[derive(Debug, Clone, Default)]
pub struct SyncReport {
    pub fetched: usize,
    pub skipped: usize,
    pub created: usize,
    pub updated: usize,
    /// Dry run only: operations that would have been sent.
    pub planned: usize,
    pub failures: Vec<ItemFailure>,
    pub elapsed_ms: u128,
}

impl SyncReport {
    pub fn failed(&self) -> usize {
        self.failures.len()
    }
}

enum Planned {
    Create,
    Update(ExistingMatch),
}

/// Run one pass against the given source and target.
pub async fn run_pass<S, T>(source: &S, target: &T, opts: &SyncOptions) -> Result<SyncReport>
where
    S: SourceCatalog + ?Sized,
    T: TargetStore + ?Sized,
{
    let started = Instant::now();
    let mut report = SyncReport::default();

    log_stage(&SyncStage::Fetching);
    let fetched = source
        .fetch_products()
        .await
        .map_err(|e| SyncError::Fetch(Box::new(e)))?;
    report.fetched = fetched.products.len();
    report.skipped = fetched.skipped;

    if !fetched.products.is_empty() {
        let existing = target
            .list_products()
            .await
            .map_err(|e| SyncError::Lookup(Box::new(e)))?;
        let mut index = SkuIndex::build(&existing);
        debug!(target = "sync", existing = existing.len(), indexed = index.len(), "sku index built");

        let total = fetched.products.len();
        for (i, product) in fetched.products.iter().enumerate() {
            log_stage(&SyncStage::Reconciling { index: i, total });
            reconcile_item(target, product, &mut index, opts, &mut report).await;
        }
    }

    log_stage(&SyncStage::Done);
    report.elapsed_ms = started.elapsed().as_millis();
    info!(
        target = "sync",
        fetched = report.fetched,
        created = report.created,
        updated = report.updated,
        planned = report.planned,
        failed = report.failed(),
        skipped = report.skipped,
        elapsed_ms = report.elapsed_ms as u64,
        dry_run = opts.dry_run,
        "sync pass complete"
    );
    Ok(report)
}

async fn reconcile_item<T>(
    target: &T,
    product: &SourceProduct,
    index: &mut SkuIndex,
    opts: &SyncOptions,
    report: &mut SyncReport,
) where
    T: TargetStore + ?Sized,
{
    let sku = sku_for(&opts.sku_prefix, &product.product_id);
    let plan = match index.get(&sku) {
        Some(found) => Planned::Update(found),
        None => Planned::Create,
    };

    if opts.dry_run {
        match plan {
            Planned::Create => info!(target = "sync", name = %product.name, %sku, "dry run: would create"),
            Planned::Update(found) => info!(
                target = "sync",
                name = %product.name,
                %sku,
                product_id = found.product_id,
                variant_id = found.variant_id,
                "dry run: would update"
            ),
        }
        report.planned += 1;
        return;
    }

    let result = match plan {
        Planned::Create => {
            let payload = build_create_payload(product, &sku);
            target.create_product(&payload).await.map(|created| {
                if let Some(found) = created {
                    index.insert(sku.clone(), found);
                }
                report.created += 1;
                info!(target = "sync", name = %product.name, %sku, "created");
            })
        }
        Planned::Update(found) => {
            let payload = build_update_payload(product, &found);
            target
                .update_product(found.product_id, &payload)
                .await
                .map(|()| {
                    report.updated += 1;
                    info!(
                        target = "sync",
                        name = %product.name,
                        %sku,
                        product_id = found.product_id,
                        "updated"
                    );
                })
        }
    };

    if let Err(e) = result {
        error!(target = "sync", name = %product.name, %sku, error = %e, "upsert failed; continuing");
        report.failures.push(ItemFailure {
            name: product.name.clone(),
            sku,
            error: e.to_string(),
        });
    }
}

fn log_stage(stage: &SyncStage) {
    debug!(target = "sync", stage = %stage, "stage");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Service;
    use serde_json::json;
    use std::sync::Mutex;

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        List,
        Create(serde_json::Value),
        Update(i64, serde_json::Value),
    }

    struct FakeSource {
        result: Mutex<Option<Result<FetchOutcome>>>,
    }

    impl FakeSource {
        fn ok(products: Vec<SourceProduct>) -> Self {
            Self {
                result: Mutex::new(Some(Ok(FetchOutcome { products, skipped: 0 }))),
            }
        }

        fn failing(status: u16) -> Self {
            Self {
                result: Mutex::new(Some(Err(SyncError::Remote {
                    service: Service::Brolexy,
                    status,
                    body: json!({"error": "denied"}),
                }))),
            }
        }
    }

    #[async_trait]
    impl SourceCatalog for FakeSource {
        async fn fetch_products(&self) -> Result<FetchOutcome> {
            self.result
                .lock()
                .unwrap()
                .take()
                .expect("fetched once per pass")
        }
    }

    #[derive(Default)]
    struct FakeTarget {
        existing: Vec<TargetProduct>,
        fail_titles: Vec<String>,
        fail_listing: bool,
        calls: Mutex<Vec<Call>>,
        next_id: Mutex<i64>,
    }

    impl FakeTarget {
        fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }

        fn writes(&self) -> Vec<Call> {
            self.calls().into_iter().filter(|c| *c != Call::List).collect()
        }

        fn rejected(&self, payload: &ProductEnvelope) -> Option<SyncError> {
            self.fail_titles
                .contains(&payload.product.title)
                .then(|| SyncError::Remote {
                    service: Service::Shopify,
                    status: 422,
                    body: json!({"errors": {"title": ["is invalid"]}}),
                })
        }
    }

    #[async_trait]
    impl TargetStore for FakeTarget {
        async fn list_products(&self) -> Result<Vec<TargetProduct>> {
            self.calls.lock().unwrap().push(Call::List);
            if self.fail_listing {
                return Err(SyncError::Remote {
                    service: Service::Shopify,
                    status: 500,
                    body: json!({"errors": "Internal Server Error"}),
                });
            }
            Ok(self.existing.clone())
        }

        async fn create_product(&self, payload: &ProductEnvelope) -> Result<Option<ExistingMatch>> {
            let body = serde_json::to_value(payload).unwrap();
            self.calls.lock().unwrap().push(Call::Create(body));
            if let Some(e) = self.rejected(payload) {
                return Err(e);
            }
            let mut next = self.next_id.lock().unwrap();
            *next += 1;
            Ok(Some(ExistingMatch {
                product_id: 1000 + *next,
                variant_id: 2000 + *next,
            }))
        }

        async fn update_product(&self, product_id: i64, payload: &ProductEnvelope) -> Result<()> {
            let body = serde_json::to_value(payload).unwrap();
            self.calls.lock().unwrap().push(Call::Update(product_id, body));
            match self.rejected(payload) {
                Some(e) => Err(e),
                None => Ok(()),
            }
        }
    }

    fn product(id: i64, name: &str) -> SourceProduct {
        SourceProduct {
            product_id: ProductId::Number(id),
            name: name.into(),
            category: Some("Tools".into()),
            region: Some("EU".into()),
            price: Some(9.99),
            in_stock: Some(5),
        }
    }

    fn opts() -> SyncOptions {
        SyncOptions {
            sku_prefix: "BRO-".into(),
            dry_run: false,
        }
    }

    fn existing_with_variant(product_id: i64, variant_id: i64, sku: &str) -> TargetProduct {
        serde_json::from_value(json!({
            "id": product_id,
            "title": "old",
            "variants": [{"id": variant_id, "sku": sku, "price": "1.00"}]
        }))
        .unwrap()
    }

    #[test]
    fn sku_from_numeric_and_text_ids() {
        assert_eq!(sku_for("BRO-", &ProductId::Number(42)), "BRO-42");
        assert_eq!(sku_for("BRO-", &ProductId::Text("x9".into())), "BRO-x9");
        assert_eq!(sku_for("", &ProductId::Number(7)), "7");
    }

    #[test]
    fn index_keeps_first_duplicate() {
        let products = vec![
            existing_with_variant(1, 11, "BRO-1"),
            existing_with_variant(2, 22, "BRO-1"),
            existing_with_variant(3, 33, ""),
        ];
        let index = SkuIndex::build(&products);
        assert_eq!(index.len(), 1);
        assert_eq!(index.get("BRO-1"), Some(ExistingMatch { product_id: 1, variant_id: 11 }));
    }

    #[tokio::test]
    async fn empty_catalog_makes_no_target_calls() {
        let source = FakeSource::ok(vec![]);
        let target = FakeTarget::default();
        let report = run_pass(&source, &target, &opts()).await.unwrap();
        assert_eq!(report.fetched, 0);
        assert!(target.calls().is_empty());
    }

    #[tokio::test]
    async fn unmatched_product_is_created_once() {
        let source = FakeSource::ok(vec![product(42, "Widget")]);
        let target = FakeTarget::default();
        let report = run_pass(&source, &target, &opts()).await.unwrap();

        let writes = target.writes();
        assert_eq!(writes.len(), 1);
        let Call::Create(body) = &writes[0] else {
            panic!("expected create, got {writes:?}");
        };
        let variant = &body["product"]["variants"][0];
        assert_eq!(variant["sku"], json!("BRO-42"));
        assert_eq!(variant["price"], json!(9.99));
        assert_eq!(variant["inventory_quantity"], json!(5));
        assert_eq!(report.created, 1);
        assert_eq!(report.updated, 0);
    }

    #[tokio::test]
    async fn matched_product_is_updated_by_variant_id() {
        let source = FakeSource::ok(vec![product(42, "Widget")]);
        let target = FakeTarget {
            existing: vec![existing_with_variant(555, 999, "BRO-42")],
            ..Default::default()
        };
        let report = run_pass(&source, &target, &opts()).await.unwrap();

        let writes = target.writes();
        assert_eq!(writes.len(), 1);
        let Call::Update(product_id, body) = &writes[0] else {
            panic!("expected update, got {writes:?}");
        };
        assert_eq!(*product_id, 555);
        let variant = &body["product"]["variants"][0];
        assert_eq!(variant["id"], json!(999));
        assert!(variant.get("sku").is_none());
        assert_eq!(report.updated, 1);
        assert_eq!(report.created, 0);
    }

    #[tokio::test]
    async fn fetch_failure_aborts_without_target_calls() {
        let source = FakeSource::failing(500);
        let target = FakeTarget::default();
        let err = run_pass(&source, &target, &opts()).await.unwrap_err();
        assert!(matches!(err, SyncError::Fetch(_)));
        assert_eq!(err.status(), Some(500));
        assert!(target.calls().is_empty());
    }

    #[tokio::test]
    async fn one_failed_upsert_does_not_stop_the_rest() {
        let source = FakeSource::ok(vec![
            product(1, "First"),
            product(2, "Broken"),
            product(3, "Third"),
        ]);
        let target = FakeTarget {
            fail_titles: vec!["Broken".into()],
            ..Default::default()
        };
        let report = run_pass(&source, &target, &opts()).await.unwrap();

        assert_eq!(target.writes().len(), 3);
        assert_eq!(report.created, 2);
        assert_eq!(report.failed(), 1);
        assert_eq!(report.failures[0].name, "Broken");
        assert_eq!(report.failures[0].sku, "BRO-2");
        assert!(report.failures[0].error.contains("422"));
    }

    #[tokio::test]
    async fn listing_failure_aborts_before_any_write() {
        let source = FakeSource::ok(vec![product(1, "A"), product(2, "B")]);
        let target = FakeTarget {
            fail_listing: true,
            ..Default::default()
        };
        let err = run_pass(&source, &target, &opts()).await.unwrap_err();

        assert!(matches!(err, SyncError::Lookup(_)));
        assert_eq!(err.status(), Some(500));
        assert_eq!(target.calls(), vec![Call::List]);
        assert!(target.writes().is_empty());
    }

    #[tokio::test]
    async fn rejected_update_does_not_stop_the_next_item() {
        let source = FakeSource::ok(vec![
            product(1, "Broken"),
            product(2, "Second"),
            product(3, "Third"),
        ]);
        let target = FakeTarget {
            existing: vec![
                existing_with_variant(10, 100, "BRO-1"),
                existing_with_variant(20, 200, "BRO-2"),
            ],
            fail_titles: vec!["Broken".into()],
            ..Default::default()
        };
        let report = run_pass(&source, &target, &opts()).await.unwrap();

        let writes = target.writes();
        assert_eq!(writes.len(), 3);
        assert!(matches!(writes[0], Call::Update(10, _)));
        assert!(matches!(writes[1], Call::Update(20, _)));
        assert!(matches!(writes[2], Call::Create(_)));
        assert_eq!((report.updated, report.created), (1, 1));
        assert_eq!(report.failed(), 1);
        assert_eq!(report.failures[0].name, "Broken");
        assert_eq!(report.failures[0].sku, "BRO-1");
        assert!(report.failures[0].error.contains("422"));
    }

    #[tokio::test]
    async fn repeated_source_id_updates_the_product_created_earlier_in_the_pass() {
        let source = FakeSource::ok(vec![product(7, "Seven"), product(7, "Seven v2")]);
        let target = FakeTarget::default();
        let report = run_pass(&source, &target, &opts()).await.unwrap();

        let writes = target.writes();
        assert!(matches!(writes[0], Call::Create(_)));
        assert!(matches!(writes[1], Call::Update(1001, _)));
        assert_eq!((report.created, report.updated), (1, 1));
    }

    #[tokio::test]
    async fn dry_run_plans_without_writing() {
        let source = FakeSource::ok(vec![product(1, "A"), product(2, "B")]);
        let target = FakeTarget {
            existing: vec![existing_with_variant(9, 90, "BRO-2")],
            ..Default::default()
        };
        let opts = SyncOptions {
            dry_run: true,
            ..opts()
        };
        let report = run_pass(&source, &target, &opts).await.unwrap();
        assert_eq!(target.calls(), vec![Call::List]);
        assert_eq!(report.planned, 2);
        assert_eq!(report.created + report.updated, 0);
    }

    #[tokio::test]
    async fn find_by_sku_scans_listing() {
        let target = FakeTarget {
            existing: vec![existing_with_variant(4, 40, "BRO-4")],
            ..Default::default()
        };
        assert_eq!(
            target.find_by_sku("BRO-4").await.unwrap(),
            Some(ExistingMatch { product_id: 4, variant_id: 40 })
        );
        assert_eq!(target.find_by_sku("BRO-5").await.unwrap(), None);
    }
}
