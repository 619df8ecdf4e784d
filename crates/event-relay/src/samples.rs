//! Sample event payloads for local testing.

use crate::{RelayError, RelayResult};
use chrono::{DateTime, Utc};
use rand::Rng;
use serde::Serialize;
use serde_json::json;
use uuid::Uuid;

/// Event kinds accepted by [`sample_event`].
pub const SAMPLE_EVENT_KINDS: [&str; 3] = ["billing.paid", "payout.done", "payout.failed"];

const LETTERS: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SampleEvent<D> {
    id: String,
    data: D,
    dev_mode: bool,
    event: String,
}

#[derive(Serialize)]
struct BillingPaidData {
    payment: Payment,
    billing: Billing,
}

#[derive(Serialize)]
struct Payment {
    amount: u32,
    fee: u32,
    method: &'static str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Billing {
    id: String,
    external_id: String,
    url: &'static str,
    amount: u32,
    status: &'static str,
}

#[derive(Serialize)]
struct PayoutData {
    transaction: Transaction,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Transaction {
    id: String,
    status: &'static str,
    dev_mode: bool,
    receipt_url: &'static str,
    kind: &'static str,
    amount: u32,
    platform_fee: u32,
    external_id: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

fn letters(len: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..len)
        .map(|_| LETTERS[rng.gen_range(0..LETTERS.len())] as char)
        .collect()
}

fn billing_paid() -> SampleEvent<BillingPaidData> {
    let mut rng = rand::thread_rng();
    let amount = rng.gen_range(100..=1000);

    SampleEvent {
        id: format!("evt_{}", letters(10)),
        data: BillingPaidData {
            payment: Payment {
                amount,
                fee: rng.gen_range(10..=100),
                method: "PIX",
            },
            billing: Billing {
                id: format!("bill_{}", letters(10)),
                external_id: Uuid::new_v4().to_string(),
                url: "https://docs.abacatepay.com/pages/webhooks#billing-paid",
                amount,
                status: "PAID",
            },
        },
        dev_mode: true,
        event: "billing.paid".to_string(),
    }
}

fn payout(done: bool) -> SampleEvent<PayoutData> {
    let (status, event) = if done {
        ("COMPLETE", "payout.done")
    } else {
        ("CANCELLED", "payout.failed")
    };
    let now = Utc::now();

    SampleEvent {
        id: format!("evt_{}", letters(10)),
        data: PayoutData {
            transaction: Transaction {
                id: format!("tran_{}", letters(16)),
                status,
                dev_mode: true,
                receipt_url: "https://abacatepay.com/receipt/mock",
                kind: "WITHDRAW",
                amount: rand::thread_rng().gen_range(1000..=50000),
                platform_fee: 0,
                external_id: Uuid::new_v4().to_string(),
                created_at: now,
                updated_at: now,
            },
        },
        dev_mode: true,
        event: event.to_string(),
    }
}

/// Build a sample payload for `kind`, one of [`SAMPLE_EVENT_KINDS`].
pub fn sample_event(kind: &str) -> RelayResult<serde_json::Value> {
    let value = match kind {
        "billing.paid" => serde_json::to_value(billing_paid())?,
        "payout.done" => serde_json::to_value(payout(true))?,
        "payout.failed" => serde_json::to_value(payout(false))?,
        other => return Err(RelayError::UnknownEvent(other.to_string())),
    };
    Ok(value)
}

/// The envelope emitted by the offline simulator.
pub fn simulated_billing_paid() -> serde_json::Value {
    json!({
        "event": "billing.paid",
        "data": {
            "id": format!("pix_char_{}", Utc::now().timestamp()),
            "externalId": "order_123",
            "amount": 1000,
            "status": "PAID",
        }
    })
}
