//! Coupon records and the rules that decide whether one applies to a cart.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::id::CouponId;

/// How a coupon's `value` is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscountType {
    /// `value` is a percentage of the subtotal.
    Percentage,
    /// `value` is a flat amount.
    Fixed,
}

/// A coupon as stored by the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Coupon {
    pub id: CouponId,
    pub code: String,
    pub discount_type: DiscountType,
    pub value: Decimal,
    #[serde(default)]
    pub min_order_amount: Option<Decimal>,
    /// Upper bound on the discount for percentage coupons.
    #[serde(default)]
    pub max_discount: Option<Decimal>,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    #[serde(default)]
    pub usage_limit: Option<u32>,
    #[serde(default)]
    pub usage_count: u32,
    #[serde(default)]
    pub usage_limit_per_user: Option<u32>,
    pub is_active: bool,
}

/// Why a coupon was refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CouponRejection {
    #[error("coupon is not active")]
    Inactive,
    #[error("coupon is not valid until {0}")]
    NotStarted(DateTime<Utc>),
    #[error("coupon expired on {0}")]
    Expired(DateTime<Utc>),
    #[error("coupon usage limit reached")]
    UsageLimitReached,
    #[error("you have already used this coupon the maximum number of times")]
    PerUserLimitReached,
    #[error("order subtotal must be at least {0}")]
    MinimumNotMet(Decimal),
}

impl CouponRejection {
    /// Machine-readable code sent in the error body.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::Inactive => "COUPON_INACTIVE",
            Self::NotStarted(_) => "COUPON_NOT_STARTED",
            Self::Expired(_) => "COUPON_EXPIRED",
            Self::UsageLimitReached => "COUPON_USAGE_LIMIT",
            Self::PerUserLimitReached => "COUPON_USER_LIMIT",
            Self::MinimumNotMet(_) => "COUPON_MIN_ORDER",
        }
    }
}

impl Coupon {
    /// Check the coupon against a cart subtotal and return the discount.
    ///
    /// `uses_by_user` is how many times the requesting user has already
    /// redeemed this coupon. The returned discount never exceeds `subtotal`.
    ///
    /// # Errors
    ///
    /// Returns the first [`CouponRejection`] that applies, checked in order:
    /// active flag, validity window, global usage, per-user usage, minimum
    /// order amount.
    pub fn evaluate(
        &self,
        subtotal: Decimal,
        now: DateTime<Utc>,
        uses_by_user: u32,
    ) -> Result<Decimal, CouponRejection> {
        if !self.is_active {
            return Err(CouponRejection::Inactive);
        }
        if now < self.start_date {
            return Err(CouponRejection::NotStarted(self.start_date));
        }
        if now > self.end_date {
            return Err(CouponRejection::Expired(self.end_date));
        }
        if self
            .usage_limit
            .is_some_and(|limit| self.usage_count >= limit)
        {
            return Err(CouponRejection::UsageLimitReached);
        }
        if self
            .usage_limit_per_user
            .is_some_and(|limit| uses_by_user >= limit)
        {
            return Err(CouponRejection::PerUserLimitReached);
        }
        if let Some(minimum) = self.min_order_amount
            && subtotal < minimum
        {
            return Err(CouponRejection::MinimumNotMet(minimum));
        }

        let discount = match self.discount_type {
            DiscountType::Percentage => {
                let raw = (subtotal * self.value / Decimal::ONE_HUNDRED).round_dp(2);
                self.max_discount.map_or(raw, |cap| raw.min(cap))
            }
            DiscountType::Fixed => self.value,
        };

        Ok(discount.min(subtotal).max(Decimal::ZERO))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Duration;

    use super::*;

    fn coupon(discount_type: DiscountType, value: i64) -> Coupon {
        let now = Utc::now();
        Coupon {
            id: CouponId::new("cp_1"),
            code: "EID10".to_string(),
            discount_type,
            value: Decimal::from(value),
            min_order_amount: None,
            max_discount: None,
            start_date: now - Duration::days(1),
            end_date: now + Duration::days(1),
            usage_limit: None,
            usage_count: 0,
            usage_limit_per_user: None,
            is_active: true,
        }
    }

    #[test]
    fn test_percentage_discount() {
        let c = coupon(DiscountType::Percentage, 10);
        let discount = c.evaluate(Decimal::from(1500), Utc::now(), 0).unwrap();
        assert_eq!(discount, Decimal::from(150));
    }

    #[test]
    fn test_percentage_discount_respects_cap() {
        let mut c = coupon(DiscountType::Percentage, 50);
        c.max_discount = Some(Decimal::from(200));
        let discount = c.evaluate(Decimal::from(1000), Utc::now(), 0).unwrap();
        assert_eq!(discount, Decimal::from(200));
    }

    #[test]
    fn test_fixed_discount_never_exceeds_subtotal() {
        let c = coupon(DiscountType::Fixed, 300);
        let discount = c.evaluate(Decimal::from(120), Utc::now(), 0).unwrap();
        assert_eq!(discount, Decimal::from(120));
    }

    #[test]
    fn test_validity_window() {
        let c = coupon(DiscountType::Fixed, 50);
        let before = c.start_date - Duration::hours(1);
        let after = c.end_date + Duration::hours(1);

        assert!(matches!(
            c.evaluate(Decimal::from(500), before, 0),
            Err(CouponRejection::NotStarted(_))
        ));
        assert!(matches!(
            c.evaluate(Decimal::from(500), after, 0),
            Err(CouponRejection::Expired(_))
        ));
    }

    #[test]
    fn test_usage_limits() {
        let mut c = coupon(DiscountType::Fixed, 50);
        c.usage_limit = Some(10);
        c.usage_count = 10;
        assert_eq!(
            c.evaluate(Decimal::from(500), Utc::now(), 0),
            Err(CouponRejection::UsageLimitReached)
        );

        c.usage_count = 3;
        c.usage_limit_per_user = Some(1);
        assert_eq!(
            c.evaluate(Decimal::from(500), Utc::now(), 1),
            Err(CouponRejection::PerUserLimitReached)
        );
    }

    #[test]
    fn test_minimum_order_and_inactive() {
        let mut c = coupon(DiscountType::Fixed, 50);
        c.min_order_amount = Some(Decimal::from(1000));
        assert_eq!(
            c.evaluate(Decimal::from(999), Utc::now(), 0),
            Err(CouponRejection::MinimumNotMet(Decimal::from(1000)))
        );

        c.is_active = false;
        assert_eq!(
            c.evaluate(Decimal::from(5000), Utc::now(), 0),
            Err(CouponRejection::Inactive)
        );
    }
}
