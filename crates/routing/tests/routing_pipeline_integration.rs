//! Integration tests for the composite routing pipeline
//! (GATHER -> SCORE -> SELECT -> ROUTE -> EXECUTE -> FORMAT)
//!
//! These tests verify end-to-end routing across multiple backends
//! using deterministic collaborator stubs.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde_json::json;

use intent_router_config::{DomainConfig, RerankingConfig, RouterSettings, TieBreaker};
use intent_router_core::{AdapterManager, RetrieveOptions, Template};
use intent_router_routing::testing::{
    template_from_yaml, CannedExecutor, FixedScoreStore, KeywordEmbedder, TableJudge,
};
use intent_router_routing::{
    AdapterRegistry, CompositeRetriever, ParameterExtractor, TemplateBackend,
};
use intent_router_strategy::CommerceStrategy;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("intent_router_routing=debug")
        .with_test_writer()
        .try_init();
}

fn customer_template() -> Arc<Template> {
    template_from_yaml(
        r#"
templates:
  - id: find_customer_by_id
    description: "Find a customer record by numeric id"
    nl_examples:
      - "Show me customer 123"
    semantic_tags: { action: find, primary_entity: customer }
    parameters:
      - name: customer_id
        type: integer
        required: true
    query:
      engine: sql
      statement: "SELECT * FROM customers WHERE id = :customer_id"
"#,
    )
}

fn stock_template() -> Arc<Template> {
    template_from_yaml(
        r#"
templates:
  - id: list_stock_levels
    description: "List current inventory stock levels"
    nl_examples:
      - "How much stock do we have"
    query:
      engine: mongo
      statement: "db.stock.find({})"
"#,
    )
}

struct TestBackend {
    retriever: Arc<TemplateBackend>,
    executor: Arc<CannedExecutor>,
}

fn backend_with_store(name: &str, store: FixedScoreStore, rows: Vec<serde_json::Value>) -> TestBackend {
    let executor = Arc::new(CannedExecutor::new(rows));
    let retriever = Arc::new(TemplateBackend::new(name, Arc::new(store), executor.clone()));
    TestBackend {
        retriever,
        executor,
    }
}

fn settings_for(adapters: &[&str]) -> RouterSettings {
    RouterSettings {
        child_adapters: adapters.iter().map(|s| s.to_string()).collect(),
        ..Default::default()
    }
}

fn composite(
    settings: RouterSettings,
    backends: Vec<Arc<TemplateBackend>>,
) -> CompositeRetriever {
    let registry = Arc::new(AdapterRegistry::new());
    for backend in backends {
        registry.register(backend).unwrap();
    }
    CompositeRetriever::new(
        Arc::new(KeywordEmbedder::default()),
        registry as Arc<dyn AdapterManager>,
        Arc::new(settings),
    )
    .unwrap()
}

/// A confident embedding match routes to its backend, extracts the
/// declared parameter from the query, and annotates every item.
#[tokio::test]
async fn test_routes_to_best_backend_and_extracts_parameters() {
    let orders = backend_with_store(
        "orders",
        FixedScoreStore::new(vec![(customer_template(), 0.92)]),
        vec![json!({"id": 123, "name": "Ada Lovelace"})],
    );
    let inventory = backend_with_store(
        "inventory",
        FixedScoreStore::new(vec![(stock_template(), 0.45)]),
        vec![json!({"sku": "X1"})],
    );

    let retriever = composite(
        settings_for(&["orders", "inventory"]),
        vec![orders.retriever.clone(), inventory.retriever.clone()],
    );

    let items = retriever
        .get_relevant_context("Show me customer 123", &RetrieveOptions::default())
        .await
        .unwrap();

    assert_eq!(items.len(), 1);
    let routing = &items[0].metadata.composite_routing;
    assert_eq!(routing.selected_adapter, "orders");
    assert_eq!(routing.template_id, "find_customer_by_id");
    assert!((routing.similarity_score - 0.92).abs() < 1e-9);
    assert_eq!(routing.total_matches_found, 2);
    assert!(!routing.multistage_scoring.enabled);

    // Only the winning backend executed, with the extracted id.
    let calls = orders.executor.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].1.get("customer_id"), Some(&json!(123)));
    assert!(inventory.executor.calls().is_empty());
}

/// Nothing at or above the threshold is a no-match outcome: empty
/// result, no backend executed, no error.
#[tokio::test]
async fn test_high_threshold_yields_no_match() {
    let orders = backend_with_store(
        "orders",
        FixedScoreStore::new(vec![(customer_template(), 0.92)]),
        vec![json!({"id": 123})],
    );

    let mut settings = settings_for(&["orders"]);
    settings.confidence_threshold = 0.95;
    let retriever = composite(settings, vec![orders.retriever.clone()]);

    let items = retriever
        .get_relevant_context("Show me customer 123", &RetrieveOptions::default())
        .await
        .unwrap();
    assert!(items.is_empty());
    assert!(orders.executor.calls().is_empty());

    let report = retriever.test_routing("Show me customer 123").await.unwrap();
    assert_eq!(report.routing_decision.would_route_to, None);
    assert_eq!(
        report.routing_decision.reason.as_deref(),
        Some("no_matches_above_threshold")
    );
    assert_eq!(report.all_matches.len(), 1);
}

/// With reranking active, a strong second-pass judgment overturns the
/// embedding favorite by the weighted combination.
#[tokio::test]
async fn test_rerank_flips_embedding_winner() {
    let orders = backend_with_store(
        "orders",
        FixedScoreStore::new(vec![(customer_template(), 0.80)]),
        vec![json!({"id": 1})],
    );
    let inventory = backend_with_store(
        "inventory",
        FixedScoreStore::new(vec![(stock_template(), 0.78)]),
        vec![json!({"sku": "X1"})],
    );

    let mut settings = settings_for(&["orders", "inventory"]);
    settings.confidence_threshold = 0.4;
    settings.scoring.embedding_weight = 0.4;
    settings.reranking = RerankingConfig {
        enabled: true,
        weight: 0.4,
        ..Default::default()
    };

    let judge = TableJudge::new(HashMap::from([
        ("customer".to_string(), 0.40),
        ("inventory".to_string(), 0.95),
    ]));

    let registry = Arc::new(AdapterRegistry::new());
    registry.register(orders.retriever.clone()).unwrap();
    registry.register(inventory.retriever.clone()).unwrap();
    let retriever = CompositeRetriever::new(
        Arc::new(KeywordEmbedder::default()),
        registry as Arc<dyn AdapterManager>,
        Arc::new(settings),
    )
    .unwrap()
    .with_judge(Arc::new(judge));

    let report = retriever.test_routing("current stock please").await.unwrap();
    assert_eq!(
        report.routing_decision.would_route_to.as_deref(),
        Some("inventory")
    );

    let by_id: HashMap<&str, f64> = report
        .all_matches
        .iter()
        .map(|m| (m.template_id.as_str(), m.combined_score.unwrap()))
        .collect();
    assert!((by_id["find_customer_by_id"] - 0.48).abs() < 1e-9);
    assert!((by_id["list_stock_levels"] - 0.692).abs() < 1e-9);
}

/// A backend that exceeds the search timeout contributes nothing; the
/// query succeeds on the survivors.
#[tokio::test]
async fn test_slow_backend_is_skipped() {
    init_tracing();
    let orders = backend_with_store(
        "orders",
        FixedScoreStore::new(vec![(customer_template(), 0.92)]),
        vec![json!({"id": 123})],
    );
    let slow = backend_with_store(
        "inventory",
        FixedScoreStore::new(vec![(stock_template(), 0.99)])
            .with_delay(Duration::from_secs(5)),
        vec![json!({"sku": "X1"})],
    );

    let mut settings = settings_for(&["orders", "inventory"]);
    settings.search_timeout_secs = 0.2;
    let retriever = composite(settings, vec![orders.retriever.clone(), slow.retriever.clone()]);

    let items = retriever
        .get_relevant_context("Show me customer 123", &RetrieveOptions::default())
        .await
        .unwrap();

    assert_eq!(items.len(), 1);
    let routing = &items[0].metadata.composite_routing;
    assert_eq!(routing.selected_adapter, "orders");
    assert_eq!(routing.total_matches_found, 1);
}

/// A backend that errors during gather is skipped the same way.
#[tokio::test]
async fn test_failing_backend_is_skipped() {
    init_tracing();
    let orders = backend_with_store(
        "orders",
        FixedScoreStore::new(vec![(customer_template(), 0.92)]),
        vec![json!({"id": 123})],
    );
    let broken = backend_with_store("inventory", FixedScoreStore::failing(), Vec::new());

    let retriever = composite(
        settings_for(&["orders", "inventory"]),
        vec![orders.retriever.clone(), broken.retriever.clone()],
    );

    let report = retriever.test_routing("Show me customer 123").await.unwrap();
    assert_eq!(report.all_matches.len(), 1);
    assert_eq!(
        report.routing_decision.would_route_to.as_deref(),
        Some("orders")
    );
}

/// Exact score ties resolve by the configured tie-breaker, never by
/// registration or completion order.
#[tokio::test]
async fn test_tie_break_is_independent_of_registration_order() {
    for reversed in [false, true] {
        let alpha = backend_with_store(
            "alpha",
            FixedScoreStore::new(vec![(customer_template(), 0.9)]),
            vec![json!({"id": 1})],
        );
        let beta = backend_with_store(
            "beta",
            FixedScoreStore::new(vec![(customer_template(), 0.9)]),
            vec![json!({"id": 1})],
        );

        let backends = if reversed {
            vec![beta.retriever.clone(), alpha.retriever.clone()]
        } else {
            vec![alpha.retriever.clone(), beta.retriever.clone()]
        };
        let retriever = composite(settings_for(&["alpha", "beta"]), backends);

        let report = retriever.test_routing("show customer 1").await.unwrap();
        assert_eq!(
            report.routing_decision.would_route_to.as_deref(),
            Some("alpha"),
            "reversed={reversed}"
        );
    }
}

/// The template-id tie-breaker ranks by template id before adapter.
#[tokio::test]
async fn test_template_id_tie_breaker() {
    let zeta = backend_with_store(
        "zeta",
        FixedScoreStore::new(vec![(customer_template(), 0.9)]),
        vec![json!({"id": 1})],
    );
    let alpha = backend_with_store(
        "alpha",
        FixedScoreStore::new(vec![(stock_template(), 0.9)]),
        vec![json!({"sku": "X1"})],
    );

    let mut settings = settings_for(&["alpha", "zeta"]);
    settings.scoring.tie_breaker = TieBreaker::TemplateIdAlphabetical;
    let retriever = composite(settings, vec![alpha.retriever.clone(), zeta.retriever.clone()]);

    // "find_customer_by_id" < "list_stock_levels", so zeta wins even
    // though alpha sorts first by adapter name.
    let report = retriever.test_routing("anything").await.unwrap();
    assert_eq!(
        report.routing_decision.would_route_to.as_deref(),
        Some("zeta")
    );
}

/// Repeated diagnostics against unchanged stores and configuration
/// produce identical reports.
#[tokio::test]
async fn test_routing_diagnostic_is_deterministic() {
    let orders = backend_with_store(
        "orders",
        FixedScoreStore::new(vec![(customer_template(), 0.92)]),
        vec![json!({"id": 123})],
    );
    let inventory = backend_with_store(
        "inventory",
        FixedScoreStore::new(vec![(stock_template(), 0.85)]),
        vec![json!({"sku": "X1"})],
    );

    let retriever = composite(
        settings_for(&["orders", "inventory"]),
        vec![orders.retriever.clone(), inventory.retriever.clone()],
    );

    let first = retriever.test_routing("Show me customer 123").await.unwrap();
    let second = retriever.test_routing("Show me customer 123").await.unwrap();

    assert_eq!(
        serde_json::to_value(&first).unwrap(),
        serde_json::to_value(&second).unwrap()
    );
    assert_eq!(first.all_matches.len(), 2);
    assert_eq!(first.all_matches[0].template_id, "find_customer_by_id");
}

/// Domain vocabulary boosts can lift a borderline candidate over the
/// threshold, and the domain strategy extracts the entity id.
#[tokio::test]
async fn test_domain_boost_and_strategy_extraction() {
    let order_template = template_from_yaml(
        r#"
templates:
  - id: get_order_status
    description: "Get the status of an order by its number"
    semantic_tags: { action: get, primary_entity: order }
    parameters:
      - name: order_id
        type: integer
        required: true
    query:
      engine: sql
      statement: "SELECT status FROM orders WHERE id = :order_id"
"#,
    );
    let executor = Arc::new(CannedExecutor::new(vec![json!({"status": "shipped"})]));
    let backend = Arc::new(
        TemplateBackend::new(
            "orders",
            Arc::new(FixedScoreStore::new(vec![(order_template, 0.68)])),
            executor.clone(),
        )
        .with_extractor(
            ParameterExtractor::new().with_strategy(Arc::new(CommerceStrategy::new())),
        ),
    );

    let domain_config = DomainConfig::from_yaml(
        r#"
domain_name: orders
domain_type: commerce
boost:
  max_boost: 0.1
  terms:
    - term: order
      boost: 0.05
"#,
    )
    .unwrap();

    let registry = Arc::new(AdapterRegistry::new());
    registry.register(backend).unwrap();
    let retriever = CompositeRetriever::new(
        Arc::new(KeywordEmbedder::default()),
        registry as Arc<dyn AdapterManager>,
        Arc::new(settings_for(&["orders"])),
    )
    .unwrap()
    .with_domain_configs(HashMap::from([("orders".to_string(), domain_config)]));

    // 0.68 alone is below the threshold; the entity-id pattern and the
    // configured vocabulary term together push it over.
    let items = retriever
        .get_relevant_context("show order #57", &RetrieveOptions::default())
        .await
        .unwrap();

    assert_eq!(items.len(), 1);
    assert_eq!(
        items[0].metadata.composite_routing.template_id,
        "get_order_status"
    );
    let calls = executor.calls();
    assert_eq!(calls[0].1.get("order_id"), Some(&json!(57)));
}

/// The selection threshold is never violated: every reported decision
/// carries a confidence at or above it.
#[tokio::test]
async fn test_selection_respects_threshold() {
    let orders = backend_with_store(
        "orders",
        FixedScoreStore::new(vec![(customer_template(), 0.71)]),
        vec![json!({"id": 123})],
    );
    let inventory = backend_with_store(
        "inventory",
        FixedScoreStore::new(vec![(stock_template(), 0.69)]),
        vec![json!({"sku": "X1"})],
    );

    let retriever = composite(
        settings_for(&["orders", "inventory"]),
        vec![orders.retriever.clone(), inventory.retriever.clone()],
    );

    let report = retriever.test_routing("anything").await.unwrap();
    let confidence = report.routing_decision.confidence.unwrap();
    assert!(confidence >= 0.7);
    assert_eq!(
        report.routing_decision.would_route_to.as_deref(),
        Some("orders")
    );
}
