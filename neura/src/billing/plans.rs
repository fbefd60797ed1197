//! Subscription plans and one-time service prices.
//!
//! Prices are integer cents; [`Plan::price`] and [`ServicePrice::price`] expose them as
//! two-decimal [`Decimal`]s.

use rust_decimal::Decimal;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plan {
    pub id: &'static str,
    pub name: &'static str,
    pub price_cents: i64,
    pub requests_per_month: i64,
    pub features: &'static [&'static str],
}

impl Plan {
    pub fn price(&self) -> Decimal {
        Decimal::new(self.price_cents, 2)
    }

    /// Free plans never involve the payment provider
    pub fn is_free(&self) -> bool {
        self.price_cents == 0
    }
}

pub const FREE_PLAN_ID: &str = "free";

/// All plans, cheapest first
pub const PLANS: &[Plan] = &[
    Plan {
        id: FREE_PLAN_ID,
        name: "Free",
        price_cents: 0,
        requests_per_month: 100,
        features: &["Basic API access", "Email support"],
    },
    Plan {
        id: "starter",
        name: "Starter",
        price_cents: 2999,
        requests_per_month: 5000,
        features: &["All AI services", "Priority support", "API documentation"],
    },
    Plan {
        id: "professional",
        name: "Professional",
        price_cents: 9999,
        requests_per_month: 25000,
        features: &["All AI services", "24/7 support", "Custom integrations", "Analytics dashboard"],
    },
    Plan {
        id: "enterprise",
        name: "Enterprise",
        price_cents: 29999,
        requests_per_month: 100000,
        features: &["All AI services", "Dedicated support", "Custom solutions", "SLA guarantee"],
    },
];

pub fn plan(id: &str) -> Option<&'static Plan> {
    PLANS.iter().find(|plan| plan.id == id)
}

pub fn free_plan() -> &'static Plan {
    &PLANS[0]
}

/// A one-time purchasable service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServicePrice {
    pub id: &'static str,
    pub price_cents: i64,
}

impl ServicePrice {
    pub fn price(&self) -> Decimal {
        Decimal::new(self.price_cents, 2)
    }
}

const fn service(id: &'static str, price_cents: i64) -> ServicePrice {
    ServicePrice { id, price_cents }
}

pub const SERVICE_PRICES: &[ServicePrice] = &[
    service("resume_review_basic", 999),
    service("resume_review_detailed", 1999),
    service("resume_review_optimization", 2999),
    service("landing_page_basic", 2999),
    service("landing_page_premium", 4999),
    service("landing_page_complete", 9999),
    service("name_brand_package", 1999),
    service("brand_package", 3999),
    service("complete_identity", 7999),
    service("seo_audit_basic", 2999),
    service("seo_audit_comprehensive", 5999),
    service("seo_audit_monthly", 9999),
    service("logo_basic", 3999),
    service("logo_premium", 7999),
    service("logo_brand_identity", 14999),
];

pub fn service_price(id: &str) -> Option<&'static ServicePrice> {
    SERVICE_PRICES.iter().find(|service| service.id == id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_plan_lookup() {
        let starter = plan("starter").unwrap();
        assert_eq!(starter.name, "Starter");
        assert_eq!(starter.price(), Decimal::from_str("29.99").unwrap());
        assert_eq!(starter.requests_per_month, 5000);

        assert!(plan("platinum").is_none());
        assert!(free_plan().is_free());
        assert_eq!(free_plan().requests_per_month, 100);
    }

    #[test]
    fn test_plans_are_ordered_by_price() {
        let ids: Vec<_> = PLANS.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec!["free", "starter", "professional", "enterprise"]);
        assert!(PLANS.windows(2).all(|w| w[0].price_cents < w[1].price_cents));
    }

    #[test]
    fn test_service_prices() {
        assert_eq!(SERVICE_PRICES.len(), 15);
        assert_eq!(service_price("logo_brand_identity").unwrap().price().to_string(), "149.99");
        assert_eq!(service_price("resume_review_basic").unwrap().price().to_string(), "9.99");
        assert!(service_price("free_lunch").is_none());
    }
}
