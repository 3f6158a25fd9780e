#![allow(dead_code)]

use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

use anyhow::anyhow;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use medimart_orderservice::{
    api::{PaymentProvider, ProviderOrder, ProviderOrderRequest},
    app_state::AppState,
    config::PaymentsConfig,
    domain::{Medicine, Order, OrderStatus, PaymentUpdate, Pharmacy},
    repositories::{OrderRepository, Repositories, memory::InMemoryStore},
    services::notifications::RecordingEmitter,
};
use tokio::sync::Mutex;
use uuid::Uuid;

pub const KEY_ID: &str = "rzp_test_key";
pub const KEY_SECRET: &str = "s";
pub const PROVIDER_ORDER_ID: &str = "o1";

/// Payment provider that answers every order with [`PROVIDER_ORDER_ID`].
#[derive(Default)]
pub struct ScriptedProvider {
    pub unreachable: bool,
    pub requests: Mutex<Vec<ProviderOrderRequest>>,
}

#[async_trait]
impl PaymentProvider for ScriptedProvider {
    async fn create_order(&self, request: ProviderOrderRequest) -> anyhow::Result<ProviderOrder> {
        if self.unreachable {
            return Err(anyhow!("connection refused"));
        }

        let order = ProviderOrder {
            id: PROVIDER_ORDER_ID.to_string(),
            amount: request.amount,
            currency: request.currency.clone(),
        };
        self.requests.lock().await.push(request);
        Ok(order)
    }
}

/// Order storage whose fulfillment writes fail the first `failures` times,
/// before reaching the store.
pub struct FailingFulfillment {
    store: Arc<InMemoryStore>,
    failures: AtomicUsize,
}

impl FailingFulfillment {
    fn attempt(&self) -> anyhow::Result<()> {
        match self
            .failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
        {
            Ok(_) => Err(anyhow!("storage transaction aborted")),
            Err(_) => Ok(()),
        }
    }
}

#[async_trait]
impl OrderRepository for FailingFulfillment {
    async fn insert(&self, order: &Order) -> anyhow::Result<()> {
        OrderRepository::insert(self.store.as_ref(), order).await
    }

    async fn find_for_user(&self, id: Uuid, user_id: Uuid) -> anyhow::Result<Option<Order>> {
        self.store.find_for_user(id, user_id).await
    }

    async fn list_for_user(&self, user_id: Uuid) -> anyhow::Result<Vec<Order>> {
        self.store.list_for_user(user_id).await
    }

    async fn update_status(
        &self,
        id: Uuid,
        status: OrderStatus,
        updated_at: DateTime<Utc>,
    ) -> anyhow::Result<Option<Order>> {
        self.store.update_status(id, status, updated_at).await
    }

    async fn set_provider_order(&self, id: Uuid, provider_order_id: &str) -> anyhow::Result<()> {
        self.store.set_provider_order(id, provider_order_id).await
    }

    async fn record_payment(&self, id: Uuid, update: PaymentUpdate) -> anyhow::Result<()> {
        self.store.record_payment(id, update).await
    }

    async fn fulfill(&self, order: &Order, at: DateTime<Utc>) -> anyhow::Result<bool> {
        self.attempt()?;
        self.store.fulfill(order, at).await
    }

    async fn insert_fulfilled(&self, order: &Order, at: DateTime<Utc>) -> anyhow::Result<()> {
        self.attempt()?;
        self.store.insert_fulfilled(order, at).await
    }
}

pub fn payments_config() -> PaymentsConfig {
    PaymentsConfig {
        key_id: Some(KEY_ID.to_string()),
        key_secret: Some(KEY_SECRET.to_string()),
        api_url: "http://127.0.0.1:9".to_string(),
        currency: "INR".to_string(),
    }
}

pub struct TestApp {
    pub store: Arc<InMemoryStore>,
    pub events: Arc<RecordingEmitter>,
    pub provider: Arc<ScriptedProvider>,
    pub state: AppState,
}

impl TestApp {
    pub fn new() -> Self {
        Self::build(Some(ScriptedProvider::default()), payments_config(), 0)
    }

    /// Fulfilling an order fails `failures` times before it goes through.
    pub fn with_failing_fulfillment(failures: usize) -> Self {
        Self::build(Some(ScriptedProvider::default()), payments_config(), failures)
    }

    /// No provider client and no credentials.
    pub fn without_payments() -> Self {
        let config = PaymentsConfig {
            key_id: None,
            key_secret: None,
            ..payments_config()
        };
        Self::build(None, config, 0)
    }

    pub fn with_unreachable_provider() -> Self {
        let provider = ScriptedProvider {
            unreachable: true,
            ..Default::default()
        };
        Self::build(Some(provider), payments_config(), 0)
    }

    fn build(
        provider: Option<ScriptedProvider>,
        config: PaymentsConfig,
        failing_fulfillments: usize,
    ) -> Self {
        let store = Arc::new(InMemoryStore::new());
        let events = Arc::new(RecordingEmitter::default());
        let provider = Arc::new(provider.unwrap_or_default());
        let client = config
            .credentials()
            .map(|_| provider.clone() as Arc<dyn PaymentProvider>);

        let mut repos = Repositories::from_shared(store.clone());
        if failing_fulfillments > 0 {
            repos.orders = Arc::new(FailingFulfillment {
                store: store.clone(),
                failures: AtomicUsize::new(failing_fulfillments),
            });
        }

        let state = AppState::new(
            repos,
            events.clone(),
            client,
            config,
        );

        Self {
            store,
            events,
            provider,
            state,
        }
    }

    pub async fn pharmacy(&self, minimum_order: f64) -> Pharmacy {
        let pharmacy = Pharmacy {
            id: Uuid::new_v4(),
            name: "City Care Pharmacy".to_string(),
            description: "24x7 pharmacy".to_string(),
            address: "12 MG Road".to_string(),
            phone: "+91 98765 43210".to_string(),
            rating: 4.5,
            image: String::new(),
            is_open: true,
            delivery_time: "30-45 mins".to_string(),
            minimum_order,
            latitude: Some(12.9716),
            longitude: Some(77.5946),
            created_at: Utc::now(),
        };
        self.store.put_pharmacy(pharmacy.clone()).await;
        pharmacy
    }

    pub async fn medicine(&self, pharmacy_id: Uuid, price: f64, stock_quantity: i32) -> Medicine {
        let medicine = Medicine {
            id: Uuid::new_v4(),
            pharmacy_id,
            name: "Paracetamol 500mg".to_string(),
            description: "Pain relief".to_string(),
            price,
            mrp: price,
            discount_percentage: 0.0,
            stock_quantity,
            category: "pain-relief".to_string(),
            image: String::new(),
            prescription_required: false,
            version: 0,
            created_at: Utc::now(),
        };
        self.store.put_medicine(medicine.clone()).await;
        medicine
    }
}
