use chrono::Utc;
use uuid::Uuid;

use crate::domain::errors::DomainError;
use crate::domain::order::{
    generate_order_number, Actor, ListResult, NewOrderInput, OrderStatus, OrderView,
    PaymentStatus, RefundStatus, StatusChange,
};
use crate::domain::ports::OrderRepository;

/// Attempts at generating a fresh order number before giving up.
pub const ORDER_NUMBER_ATTEMPTS: usize = 3;

/// What the payment gateway reports back for a checkout.
#[derive(Debug, Clone)]
pub enum PaymentOutcome {
    Succeeded(NewOrderInput),
    Failed { user_id: Uuid, reason: String },
}

pub struct OrderService<R> {
    repo: R,
    reserve_stock: bool,
}

impl<R: OrderRepository> OrderService<R> {
    pub fn new(repo: R, reserve_stock: bool) -> Self {
        Self {
            repo,
            reserve_stock,
        }
    }

    pub fn create_order(&self, order: NewOrderInput, actor: &Actor) -> Result<OrderView, DomainError> {
        order.validate()?;

        let mut last_err = None;
        for attempt in 1..=ORDER_NUMBER_ATTEMPTS {
            let order_number = generate_order_number(Utc::now());
            match self
                .repo
                .create(&order, &order_number, actor, self.reserve_stock)
            {
                Ok(view) => {
                    log::info!(
                        "Created order {} ({}) for user {} total {}",
                        view.order_number,
                        view.id,
                        view.user_id,
                        view.total_amount
                    );
                    return Ok(view);
                }
                Err(DomainError::Conflict(msg)) => {
                    log::warn!("Order creation conflict on attempt {attempt}: {msg}");
                    last_err = Some(DomainError::Conflict(msg));
                }
                Err(e) => {
                    log::warn!("Order creation for user {} failed: {e}", order.user_id);
                    return Err(e);
                }
            }
        }
        Err(last_err.unwrap_or_else(|| DomainError::Conflict("order number".to_string())))
    }

    /// Turns a gateway callback into an order. A failed payment writes nothing.
    /// Only the gateway, acting as an operator, may report a payment.
    pub fn handle_payment_callback(
        &self,
        outcome: PaymentOutcome,
        actor: &Actor,
    ) -> Result<OrderView, DomainError> {
        if !actor.is_operator() {
            log::warn!("Payment callback from non-operator {} rejected", actor.id);
            return Err(DomainError::illegal(
                format!("payment {}", PaymentStatus::Pending),
                format!("payment {}", PaymentStatus::Paid),
            ));
        }
        match outcome {
            PaymentOutcome::Succeeded(mut order) => {
                order.payment_status = PaymentStatus::Paid;
                self.create_order(order, actor)
            }
            PaymentOutcome::Failed { user_id, reason } => {
                log::warn!("Payment failed for user {user_id}: {reason}");
                Err(DomainError::InvalidInput(format!("payment failed: {reason}")))
            }
        }
    }

    /// Customers only see their own orders; anything else looks missing.
    pub fn get_order(&self, id: Uuid, actor: &Actor) -> Result<OrderView, DomainError> {
        match self.repo.find_by_id(id)? {
            Some(order) if actor.is_operator() || order.user_id == actor.id => Ok(order),
            _ => Err(DomainError::NotFound("Order")),
        }
    }

    pub fn list_orders(&self, actor: &Actor, page: i64, limit: i64) -> Result<ListResult, DomainError> {
        let page = page.max(1);
        let limit = limit.clamp(1, 100);
        let owner = (!actor.is_operator()).then_some(actor.id);
        self.repo.list(owner, page, limit)
    }

    pub fn transition_status(
        &self,
        id: Uuid,
        actor: &Actor,
        change: StatusChange,
    ) -> Result<OrderView, DomainError> {
        let view = self.repo.update_status(id, actor, &change)?;
        log::info!("Order {} moved to {} by {}", view.order_number, view.status, actor.id);
        Ok(view)
    }

    pub fn cancel_order(
        &self,
        id: Uuid,
        actor: &Actor,
        reason: Option<String>,
    ) -> Result<OrderView, DomainError> {
        self.transition_status(
            id,
            actor,
            StatusChange {
                status: OrderStatus::Cancelled,
                description: reason,
                tracking_number: None,
            },
        )
    }

    pub fn request_refund(
        &self,
        id: Uuid,
        actor: &Actor,
        reason: Option<String>,
    ) -> Result<OrderView, DomainError> {
        self.refund_step(id, actor, RefundStatus::Requested, reason)
    }

    pub fn decide_refund(
        &self,
        id: Uuid,
        actor: &Actor,
        approve: bool,
        note: Option<String>,
    ) -> Result<OrderView, DomainError> {
        let next = if approve {
            RefundStatus::Approved
        } else {
            RefundStatus::Rejected
        };
        self.refund_step(id, actor, next, note)
    }

    pub fn complete_refund(&self, id: Uuid, actor: &Actor) -> Result<OrderView, DomainError> {
        self.refund_step(id, actor, RefundStatus::Refunded, None)
    }

    pub fn update_payment_status(
        &self,
        id: Uuid,
        actor: &Actor,
        status: PaymentStatus,
    ) -> Result<OrderView, DomainError> {
        let view = self.repo.update_payment(id, actor, status)?;
        log::info!("Order {} payment is now {}", view.order_number, view.payment_status);
        Ok(view)
    }

    fn refund_step(
        &self,
        id: Uuid,
        actor: &Actor,
        next: RefundStatus,
        note: Option<String>,
    ) -> Result<OrderView, DomainError> {
        let view = self.repo.update_refund(id, actor, next, note)?;
        log::info!("Order {} refund is now {}", view.order_number, view.refund_status);
        Ok(view)
    }
}
