use std::fmt;
use std::str::FromStr;

use bigdecimal::{BigDecimal, Zero};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::errors::DomainError;

// ── Actors ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActorRole {
    Customer,
    Operator,
}

impl FromStr for ActorRole {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "customer" => Ok(ActorRole::Customer),
            "operator" | "admin" => Ok(ActorRole::Operator),
            other => Err(DomainError::InvalidInput(format!("unknown role '{other}'"))),
        }
    }
}

/// The authenticated identity acting on an order or the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub id: Uuid,
    pub role: ActorRole,
}

impl Actor {
    pub fn customer(id: Uuid) -> Self {
        Self {
            id,
            role: ActorRole::Customer,
        }
    }

    pub fn operator(id: Uuid) -> Self {
        Self {
            id,
            role: ActorRole::Operator,
        }
    }

    pub fn is_operator(&self) -> bool {
        self.role == ActorRole::Operator
    }
}

// ── Status enums ─────────────────────────────────────────────────────────────

macro_rules! string_enum {
    ($name:ident, $what:literal { $($variant:ident => $text:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = DomainError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    other => Err(DomainError::InvalidInput(format!(
                        concat!("unknown ", $what, " '{}'"),
                        other
                    ))),
                }
            }
        }
    };
}

string_enum!(OrderStatus, "order status" {
    Pending => "pending",
    Confirmed => "confirmed",
    Processing => "processing",
    Shipped => "shipped",
    Delivered => "delivered",
    Cancelled => "cancelled",
});

string_enum!(PaymentStatus, "payment status" {
    Pending => "pending",
    Paid => "paid",
    Failed => "failed",
    Refunded => "refunded",
});

string_enum!(RefundStatus, "refund status" {
    None => "none",
    Requested => "requested",
    Approved => "approved",
    Rejected => "rejected",
    Refunded => "refunded",
});

/// Who may perform a given transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Allowed {
    Anyone,
    OperatorOnly,
}

impl Allowed {
    fn permits(self, role: ActorRole) -> bool {
        match self {
            Allowed::Anyone => true,
            Allowed::OperatorOnly => role == ActorRole::Operator,
        }
    }
}

const ORDER_TRANSITIONS: &[(OrderStatus, OrderStatus, Allowed)] = &[
    (OrderStatus::Pending, OrderStatus::Confirmed, Allowed::OperatorOnly),
    (OrderStatus::Confirmed, OrderStatus::Processing, Allowed::OperatorOnly),
    (OrderStatus::Processing, OrderStatus::Shipped, Allowed::OperatorOnly),
    (OrderStatus::Shipped, OrderStatus::Delivered, Allowed::OperatorOnly),
    (OrderStatus::Pending, OrderStatus::Cancelled, Allowed::Anyone),
    (OrderStatus::Confirmed, OrderStatus::Cancelled, Allowed::Anyone),
    (OrderStatus::Processing, OrderStatus::Cancelled, Allowed::OperatorOnly),
    (OrderStatus::Shipped, OrderStatus::Cancelled, Allowed::OperatorOnly),
];

const REFUND_TRANSITIONS: &[(RefundStatus, RefundStatus, Allowed)] = &[
    (RefundStatus::None, RefundStatus::Requested, Allowed::Anyone),
    (RefundStatus::Requested, RefundStatus::Approved, Allowed::OperatorOnly),
    (RefundStatus::Requested, RefundStatus::Rejected, Allowed::OperatorOnly),
    (RefundStatus::Approved, RefundStatus::Refunded, Allowed::OperatorOnly),
];

const PAYMENT_TRANSITIONS: &[(PaymentStatus, PaymentStatus)] = &[
    (PaymentStatus::Pending, PaymentStatus::Paid),
    (PaymentStatus::Pending, PaymentStatus::Failed),
    (PaymentStatus::Failed, PaymentStatus::Pending),
    (PaymentStatus::Failed, PaymentStatus::Paid),
];

fn lookup<S: Copy + PartialEq>(table: &[(S, S, Allowed)], from: S, to: S) -> Option<Allowed> {
    table
        .iter()
        .find(|(f, t, _)| *f == from && *t == to)
        .map(|(_, _, allowed)| *allowed)
}

impl OrderStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled)
    }

    /// Validates `self -> next` for `role` against the transition table.
    pub fn transition(self, next: OrderStatus, role: ActorRole) -> Result<OrderStatus, DomainError> {
        match lookup(ORDER_TRANSITIONS, self, next) {
            Some(allowed) if allowed.permits(role) => Ok(next),
            _ => Err(DomainError::illegal(self, next)),
        }
    }
}

impl RefundStatus {
    /// Refunds may only be requested on paid orders, whatever the order status.
    pub fn transition(
        self,
        next: RefundStatus,
        role: ActorRole,
        payment: PaymentStatus,
    ) -> Result<RefundStatus, DomainError> {
        if next == RefundStatus::Requested && payment != PaymentStatus::Paid {
            return Err(DomainError::InvalidInput(format!(
                "refund requires a paid order, payment is {payment}"
            )));
        }
        match lookup(REFUND_TRANSITIONS, self, next) {
            Some(allowed) if allowed.permits(role) => Ok(next),
            _ => Err(DomainError::illegal(
                format!("refund {self}"),
                format!("refund {next}"),
            )),
        }
    }
}

impl PaymentStatus {
    /// Manual payment updates; `refunded` is reached only via the refund flow.
    pub fn transition(self, next: PaymentStatus, role: ActorRole) -> Result<PaymentStatus, DomainError> {
        let listed = PAYMENT_TRANSITIONS
            .iter()
            .any(|(f, t)| *f == self && *t == next);
        if listed && role == ActorRole::Operator {
            Ok(next)
        } else {
            Err(DomainError::illegal(
                format!("payment {self}"),
                format!("payment {next}"),
            ))
        }
    }
}

// ── Addresses ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub recipient: String,
    pub line1: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line2: Option<String>,
    pub city: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    pub postal_code: String,
    pub country: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

impl Address {
    pub fn validate(&self, label: &str) -> Result<(), DomainError> {
        let required = [
            ("recipient", &self.recipient),
            ("line1", &self.line1),
            ("city", &self.city),
            ("postal_code", &self.postal_code),
            ("country", &self.country),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(DomainError::InvalidInput(format!(
                    "{label}.{field} must not be empty"
                )));
            }
        }
        Ok(())
    }
}

// ── Order creation ───────────────────────────────────────────────────────────

/// Prices are stored as NUMERIC with two decimal places.
pub const PRICE_SCALE: i64 = 2;

#[derive(Debug, Clone)]
pub struct OrderLineInput {
    pub product_id: Uuid,
    pub quantity: i32,
    pub unit_price: BigDecimal,
}

impl OrderLineInput {
    pub fn total_price(&self) -> BigDecimal {
        &self.unit_price * BigDecimal::from(self.quantity)
    }
}

#[derive(Debug, Clone)]
pub struct NewOrderInput {
    pub user_id: Uuid,
    pub lines: Vec<OrderLineInput>,
    pub shipping_address: Address,
    pub billing_address: Option<Address>,
    pub notes: Option<String>,
    pub payment_status: PaymentStatus,
}

impl NewOrderInput {
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.lines.is_empty() {
            return Err(DomainError::InvalidInput(
                "order must contain at least one item".to_string(),
            ));
        }
        for (i, line) in self.lines.iter().enumerate() {
            if line.quantity <= 0 {
                return Err(DomainError::InvalidInput(format!(
                    "items[{i}].quantity must be positive, got {}",
                    line.quantity
                )));
            }
            if line.unit_price < BigDecimal::zero() {
                return Err(DomainError::InvalidInput(format!(
                    "items[{i}].unit_price must not be negative"
                )));
            }
            if line.unit_price.with_scale(PRICE_SCALE) != line.unit_price {
                return Err(DomainError::InvalidInput(format!(
                    "items[{i}].unit_price must have at most {PRICE_SCALE} decimal places, got {}",
                    line.unit_price
                )));
            }
        }
        self.shipping_address.validate("shipping_address")?;
        if let Some(billing) = &self.billing_address {
            billing.validate("billing_address")?;
        }
        Ok(())
    }

    pub fn total_amount(&self) -> BigDecimal {
        self.lines
            .iter()
            .fold(BigDecimal::zero(), |acc, l| acc + l.total_price())
    }
}

/// `FL-<yyyymmddHHMMSS>-<6 hex>`. Uniqueness is best effort; the store's
/// unique index catches collisions.
pub fn generate_order_number(now: DateTime<Utc>) -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!(
        "FL-{}-{}",
        now.format("%Y%m%d%H%M%S"),
        suffix[..6].to_uppercase()
    )
}

/// Requested status change plus the delivery metadata that travels with it.
#[derive(Debug, Clone)]
pub struct StatusChange {
    pub status: OrderStatus,
    pub description: Option<String>,
    pub tracking_number: Option<String>,
}

impl StatusChange {
    pub fn to(status: OrderStatus) -> Self {
        Self {
            status,
            description: None,
            tracking_number: None,
        }
    }

    pub fn description_or_default(&self) -> String {
        match &self.description {
            Some(d) if !d.trim().is_empty() => d.trim().to_string(),
            _ => default_description(self.status).to_string(),
        }
    }
}

fn default_description(status: OrderStatus) -> &'static str {
    match status {
        OrderStatus::Pending => "Order placed",
        OrderStatus::Confirmed => "Order confirmed",
        OrderStatus::Processing => "Bouquet is being prepared",
        OrderStatus::Shipped => "Order shipped",
        OrderStatus::Delivered => "Order delivered",
        OrderStatus::Cancelled => "Order cancelled",
    }
}

// ── Views ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct OrderItemView {
    pub id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
    pub unit_price: BigDecimal,
    pub total_price: BigDecimal,
}

#[derive(Debug, Clone)]
pub struct TrackingEntry {
    pub id: Uuid,
    pub status: String,
    pub description: String,
    pub actor_id: Uuid,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct OrderView {
    pub id: Uuid,
    pub order_number: String,
    pub user_id: Uuid,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub refund_status: RefundStatus,
    pub total_amount: BigDecimal,
    pub shipping_address: Address,
    pub billing_address: Option<Address>,
    pub notes: Option<String>,
    pub tracking_number: Option<String>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub items: Vec<OrderItemView>,
    pub tracking: Vec<TrackingEntry>,
}

#[derive(Debug, Clone)]
pub struct ListResult {
    pub items: Vec<OrderView>,
    pub total: i64,
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    const ALL: [OrderStatus; 6] = [
        OrderStatus::Pending,
        OrderStatus::Confirmed,
        OrderStatus::Processing,
        OrderStatus::Shipped,
        OrderStatus::Delivered,
        OrderStatus::Cancelled,
    ];

    fn address() -> Address {
        Address {
            recipient: "Ada".to_string(),
            line1: "1 Rose Lane".to_string(),
            line2: None,
            city: "Leeds".to_string(),
            state: None,
            postal_code: "LS1 1AA".to_string(),
            country: "GB".to_string(),
            phone: None,
        }
    }

    fn line(qty: i32, price: &str) -> OrderLineInput {
        OrderLineInput {
            product_id: Uuid::new_v4(),
            quantity: qty,
            unit_price: BigDecimal::from_str(price).expect("valid decimal"),
        }
    }

    fn order(lines: Vec<OrderLineInput>) -> NewOrderInput {
        NewOrderInput {
            user_id: Uuid::new_v4(),
            lines,
            shipping_address: address(),
            billing_address: None,
            notes: None,
            payment_status: PaymentStatus::Pending,
        }
    }

    #[test]
    fn happy_path_walks_to_delivered() {
        let mut s = OrderStatus::Pending;
        for next in [
            OrderStatus::Confirmed,
            OrderStatus::Processing,
            OrderStatus::Shipped,
            OrderStatus::Delivered,
        ] {
            s = s.transition(next, ActorRole::Operator).expect("legal step");
        }
        assert_eq!(s, OrderStatus::Delivered);
    }

    #[test]
    fn terminal_states_reject_every_transition() {
        for from in [OrderStatus::Delivered, OrderStatus::Cancelled] {
            for to in ALL {
                for role in [ActorRole::Customer, ActorRole::Operator] {
                    assert!(
                        matches!(
                            from.transition(to, role),
                            Err(DomainError::IllegalTransition { .. })
                        ),
                        "{from} -> {to} must be illegal"
                    );
                }
            }
        }
    }

    #[test]
    fn customer_may_cancel_only_pending_or_confirmed() {
        assert!(OrderStatus::Pending
            .transition(OrderStatus::Cancelled, ActorRole::Customer)
            .is_ok());
        assert!(OrderStatus::Confirmed
            .transition(OrderStatus::Cancelled, ActorRole::Customer)
            .is_ok());
        for from in [OrderStatus::Processing, OrderStatus::Shipped] {
            assert!(from
                .transition(OrderStatus::Cancelled, ActorRole::Customer)
                .is_err());
        }
    }

    #[test]
    fn operator_may_cancel_any_non_terminal_order() {
        for from in ALL.into_iter().filter(|s| !s.is_terminal()) {
            assert!(from
                .transition(OrderStatus::Cancelled, ActorRole::Operator)
                .is_ok());
        }
    }

    #[test]
    fn customers_cannot_advance_fulfillment() {
        assert!(OrderStatus::Pending
            .transition(OrderStatus::Confirmed, ActorRole::Customer)
            .is_err());
    }

    #[test]
    fn skipping_steps_and_self_transitions_are_illegal() {
        assert!(OrderStatus::Pending
            .transition(OrderStatus::Shipped, ActorRole::Operator)
            .is_err());
        assert!(OrderStatus::Confirmed
            .transition(OrderStatus::Confirmed, ActorRole::Operator)
            .is_err());
    }

    #[test]
    fn refund_flow_is_allowed_after_delivery() {
        let requested = RefundStatus::None
            .transition(RefundStatus::Requested, ActorRole::Customer, PaymentStatus::Paid)
            .unwrap();
        let approved = requested
            .transition(RefundStatus::Approved, ActorRole::Operator, PaymentStatus::Paid)
            .unwrap();
        assert_eq!(
            approved
                .transition(RefundStatus::Refunded, ActorRole::Operator, PaymentStatus::Paid)
                .unwrap(),
            RefundStatus::Refunded
        );
    }

    #[test]
    fn refund_request_needs_payment_and_approval_needs_operator() {
        assert!(matches!(
            RefundStatus::None.transition(
                RefundStatus::Requested,
                ActorRole::Customer,
                PaymentStatus::Pending
            ),
            Err(DomainError::InvalidInput(_))
        ));
        assert!(RefundStatus::Requested
            .transition(RefundStatus::Approved, ActorRole::Customer, PaymentStatus::Paid)
            .is_err());
    }

    #[test]
    fn payment_cannot_move_back_from_paid() {
        assert!(PaymentStatus::Pending
            .transition(PaymentStatus::Paid, ActorRole::Operator)
            .is_ok());
        assert!(PaymentStatus::Paid
            .transition(PaymentStatus::Pending, ActorRole::Operator)
            .is_err());
        assert!(PaymentStatus::Paid
            .transition(PaymentStatus::Refunded, ActorRole::Operator)
            .is_err());
    }

    #[test]
    fn total_is_sum_of_line_totals() {
        let input = order(vec![line(2, "10.00"), line(1, "5.00")]);
        assert_eq!(input.total_amount(), BigDecimal::from_str("25.00").unwrap());
        assert_eq!(
            input.lines[0].total_price(),
            BigDecimal::from_str("20.00").unwrap()
        );
    }

    #[test]
    fn empty_orders_and_bad_lines_are_rejected() {
        assert!(order(vec![]).validate().is_err());
        assert!(order(vec![line(0, "1.00")]).validate().is_err());
        assert!(order(vec![line(1, "-0.01")]).validate().is_err());
        assert!(order(vec![line(1, "0")]).validate().is_ok());
    }

    #[test]
    fn sub_cent_prices_are_rejected_so_totals_match_stored_items() {
        let input = order(vec![line(1, "0.005"), line(1, "0.005"), line(1, "0.005")]);
        match input.validate() {
            Err(DomainError::InvalidInput(msg)) => assert!(msg.contains("items[0].unit_price")),
            other => panic!("expected InvalidInput, got {other:?}"),
        }
        // trailing zeros beyond the cent are harmless
        assert!(order(vec![line(3, "1.500")]).validate().is_ok());
    }

    #[test]
    fn incomplete_shipping_address_is_rejected() {
        let mut input = order(vec![line(1, "1.00")]);
        input.shipping_address.city = " ".to_string();
        match input.validate() {
            Err(DomainError::InvalidInput(msg)) => assert!(msg.contains("shipping_address.city")),
            other => panic!("expected InvalidInput, got {other:?}"),
        }
    }

    #[test]
    fn order_number_has_timestamp_and_suffix() {
        let now = DateTime::parse_from_rfc3339("2026-02-14T09:30:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let number = generate_order_number(now);
        assert!(number.starts_with("FL-20260214093000-"), "{number}");
        assert_eq!(number.len(), "FL-20260214093000-".len() + 6);
        assert_ne!(number, generate_order_number(now));
    }

    #[test]
    fn status_names_round_trip_through_from_str() {
        for s in ALL {
            assert_eq!(OrderStatus::from_str(s.as_str()).unwrap(), s);
        }
        assert!(OrderStatus::from_str("lost").is_err());
    }

    #[test]
    fn blank_description_falls_back_to_default() {
        let change = StatusChange {
            status: OrderStatus::Shipped,
            description: Some("  ".to_string()),
            tracking_number: None,
        };
        assert_eq!(change.description_or_default(), "Order shipped");
    }
}
