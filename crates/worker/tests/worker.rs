//! The assembled worker over the in-memory broker, plus the metrics endpoint.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use ddb_core::{EventType, IndexType};
use ddb_db::models::{
    Household, Meal, Recipe, User, UserDataCollection, ValidIngredient, ValidIngredientState, ValidInstrument,
    ValidMeasurementUnit, ValidPreparation, ValidVessel, Webhook,
};
use ddb_db::{DataManager, DbError};
use ddb_events::delivery::email::{EmailError, Emailer};
use ddb_events::{DataChangeMessage, FilesystemStore, NoopEventReporter, OutboundEmailMessage};
use ddb_messaging::{topics, Broker, MemoryBroker, PublisherProvider};
use ddb_search::{SearchBackend, SearchConfig};
use ddb_worker::config::WorkerConfig;
use ddb_worker::metrics;
use ddb_worker::services::{Collaborators, Worker};
use prometheus::Registry;
use tokio_util::sync::CancellationToken;

/// Knows one verified user and records index marks.
#[derive(Default)]
struct OneUser {
    marked: Mutex<Vec<(IndexType, String)>>,
}

fn user_u1() -> User {
    User {
        id: "U1".into(),
        username: "chef".into(),
        email_address: "chef@example.com".into(),
        email_address_verified_at: Some(Utc::now()),
        ..Default::default()
    }
}

#[async_trait]
impl DataManager for OneUser {
    async fn get_webhooks_for_household_and_event(&self, _: &str, _: EventType) -> Result<Vec<Webhook>, DbError> {
        Ok(Vec::new())
    }
    async fn get_webhook(&self, id: &str, _: &str) -> Result<Webhook, DbError> {
        Err(DbError::not_found("webhook", id))
    }
    async fn get_household(&self, id: &str) -> Result<Household, DbError> {
        Err(DbError::not_found("household", id))
    }
    async fn get_user(&self, id: &str) -> Result<User, DbError> {
        if id == "U1" {
            Ok(user_u1())
        } else {
            Err(DbError::not_found("user", id))
        }
    }
    async fn get_household_members(&self, _: &str) -> Result<Vec<User>, DbError> {
        Ok(Vec::new())
    }
    async fn get_recipe(&self, id: &str) -> Result<Recipe, DbError> {
        Err(DbError::not_found("recipe", id))
    }
    async fn get_meal(&self, id: &str) -> Result<Meal, DbError> {
        Err(DbError::not_found("meal", id))
    }
    async fn get_valid_ingredient(&self, id: &str) -> Result<ValidIngredient, DbError> {
        Err(DbError::not_found("valid_ingredient", id))
    }
    async fn get_valid_instrument(&self, id: &str) -> Result<ValidInstrument, DbError> {
        Err(DbError::not_found("valid_instrument", id))
    }
    async fn get_valid_measurement_unit(&self, id: &str) -> Result<ValidMeasurementUnit, DbError> {
        Err(DbError::not_found("valid_measurement_unit", id))
    }
    async fn get_valid_preparation(&self, id: &str) -> Result<ValidPreparation, DbError> {
        Err(DbError::not_found("valid_preparation", id))
    }
    async fn get_valid_ingredient_state(&self, id: &str) -> Result<ValidIngredientState, DbError> {
        Err(DbError::not_found("valid_ingredient_state", id))
    }
    async fn get_valid_vessel(&self, id: &str) -> Result<ValidVessel, DbError> {
        Err(DbError::not_found("valid_vessel", id))
    }
    async fn get_ids_needing_indexing(&self, _: IndexType) -> Result<Vec<String>, DbError> {
        Ok(Vec::new())
    }
    async fn get_ids_for_index(&self, _: IndexType, _: i64, _: i64) -> Result<Vec<String>, DbError> {
        Ok(Vec::new())
    }
    async fn mark_as_indexed(&self, index_type: IndexType, id: &str) -> Result<(), DbError> {
        self.marked.lock().unwrap().push((index_type, id.to_string()));
        Ok(())
    }
    async fn delete_expired_oauth2_client_tokens(&self) -> Result<u64, DbError> {
        Ok(0)
    }
    async fn aggregate_user_data(&self, user_id: &str) -> Result<UserDataCollection, DbError> {
        Err(DbError::not_found("user", user_id))
    }
}

#[derive(Default)]
struct Outbox {
    sent: Mutex<Vec<OutboundEmailMessage>>,
}

#[async_trait]
impl Emailer for Outbox {
    async fn send(&self, email: &OutboundEmailMessage) -> Result<(), EmailError> {
        self.sent.lock().unwrap().push(email.clone());
        Ok(())
    }
}

fn config() -> WorkerConfig {
    WorkerConfig {
        database_url: "postgres://unused".into(),
        database_max_connections: 1,
        environment: "testing".into(),
        scheduler_interval: Duration::from_secs(3600),
        maintenance_interval: Duration::from_secs(3600),
        branch_timeout: Duration::from_secs(5),
        metrics_addr: "127.0.0.1:0".parse().unwrap(),
        cease_operation: false,
    }
}

async fn wait_for(cond: impl Fn() -> bool) {
    for _ in 0..400 {
        if cond() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not met in time");
}

#[tokio::test]
async fn signup_flows_from_data_change_to_email_and_index() {
    let memory = Arc::new(MemoryBroker::default());
    let broker = Broker {
        publishers: memory.clone(),
        consumers: memory.clone(),
    };
    let data = Arc::new(OneUser::default());
    let outbox = Arc::new(Outbox::default());
    let exports = tempfile::tempdir().unwrap();
    let collaborators = Collaborators {
        search: SearchConfig::new(SearchBackend::Memory, Duration::from_secs(1)).unwrap(),
        reporter: Arc::new(NoopEventReporter),
        emailer: outbox.clone(),
        store: Arc::new(FilesystemStore::new(exports.path())),
    };
    let registry = Registry::new();

    let worker = Worker::assemble(&config(), data.clone(), &broker, collaborators, &registry)
        .await
        .unwrap();
    assert_eq!(worker.topics().len(), topics::ALL.len());

    let cancel = CancellationToken::new();
    let run = tokio::spawn({
        let cancel = cancel.clone();
        async move { worker.run(&broker, cancel).await }
    });

    let mut msg = DataChangeMessage::new(EventType::UserSignedUp).with_user_id("U1");
    msg.email_verification_token = Some("T".into());
    let data_changes = PublisherProvider::provide(memory.as_ref(), topics::DATA_CHANGES).unwrap();
    data_changes.publish(&msg).await.unwrap();

    wait_for(|| outbox.sent.lock().unwrap().len() == 1).await;
    wait_for(|| data.marked.lock().unwrap().len() == 1).await;

    assert_eq!(outbox.sent.lock().unwrap()[0].to_address, "chef@example.com");
    assert_eq!(data.marked.lock().unwrap()[0], (IndexType::Users, "U1".to_string()));

    cancel.cancel();
    tokio::time::timeout(Duration::from_secs(5), run)
        .await
        .expect("worker should drain after cancellation")
        .unwrap()
        .unwrap();
}

#[tokio::test]
async fn metrics_endpoint_exposes_registry() {
    let registry = Registry::new();
    let counter = prometheus::IntCounter::new("ddb_test_total", "test counter").unwrap();
    registry.register(Box::new(counter.clone())).unwrap();
    counter.inc_by(3);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, metrics::router(registry)).await.unwrap();
    });

    let body = reqwest::get(format!("http://{addr}/metrics"))
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(body.contains("ddb_test_total 3"));
}
