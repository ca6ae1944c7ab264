//! Billing — subscription lookup and the two hosted payment sessions.
//!
//! Both session calls hand back a URL the caller must navigate to; a 2xx
//! without one is a [`crate::ConsoleError::ResponseShape`].

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::dispatcher::{NO_BODY, QueryParams};
use crate::normalize::require_url;
use crate::resources::Scoped;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanType {
    Free,
    Starter,
    Team,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BillingInterval {
    Month,
    Year,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subscription {
    pub plan: PlanType,
    pub status: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CheckoutRequest {
    pub plan_name: PlanType,
    pub interval: BillingInterval,
}

pub struct Billing<'a> {
    scoped: Scoped<'a>,
}

impl<'a> Billing<'a> {
    pub(crate) fn new(scoped: Scoped<'a>) -> Self {
        Self { scoped }
    }

    pub async fn subscription(&self) -> crate::Result<Subscription> {
        self.scoped
            .get(&["billing", "get-subscription"], &QueryParams::new())
            .await
    }

    pub async fn create_checkout_session(&self, request: &CheckoutRequest) -> crate::Result<String> {
        let payload: Value = self
            .scoped
            .post(
                &["billing", "create-checkout-session"],
                &QueryParams::new(),
                Some(request),
            )
            .await?;
        require_url(&payload, "checkout session")
    }

    pub async fn create_customer_portal_session(&self) -> crate::Result<String> {
        let payload: Value = self
            .scoped
            .post(
                &["billing", "create-customer-portal-session"],
                &QueryParams::new(),
                NO_BODY,
            )
            .await?;
        require_url(&payload, "customer portal session")
    }
}
