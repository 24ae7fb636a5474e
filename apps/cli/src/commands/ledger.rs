//! # Ledger Commands
//!
//! Recording sales and expenses, browsing the ledger, and the calculator.
//!
//! ## Sale Flow
//! ```text
//! digical sale --amount 300 --category "Product Sales" \
//!              --payment due --customer 1000 --product 4:2
//!       │
//!       ▼
//! handler = --handler or the active handler
//! description += " [Due: 1000]"
//!       │
//!       ▼
//! TransactionRepository::record_checkout   (one SQLite transaction)
//!   ├── transaction row
//!   ├── due record for customer 1000
//!   └── product 4 left_qty -= 2
//! ```

use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{debug, info};

use super::{respond, CommandResult, Context};
use crate::cli::{ClearTarget, EntryArgs, HistoryCommand, TransactionsArgs};
use crate::error::ApiError;
use digical_core::{
    calculate_incentive, evaluate, Calculation, Checkout, Money, NewCalculation, NewTransaction, PaymentMethod,
    Transaction, TransactionFilter, TransactionType,
};

#[derive(Debug, Serialize)]
struct EntryResponse {
    transaction: Transaction,
    amount: String,
    /// Present for Due payments.
    customer_due: Option<CustomerDue>,
}

#[derive(Debug, Serialize)]
struct CustomerDue {
    customer_id: String,
    outstanding: Money,
    outstanding_formatted: String,
}

#[derive(Debug, Serialize)]
struct CalcResponse {
    result: String,
    value: Decimal,
    incentive: String,
    calculation: Calculation,
}

#[derive(Debug, Serialize)]
struct ClearResponse {
    cleared: &'static str,
    removed: u64,
}

/// `sale` / `expense`.
pub async fn record_entry(ctx: &Context, kind: TransactionType, args: EntryArgs) -> CommandResult {
    let handler_id = match args.handler {
        Some(id) => Some(id),
        None => ctx.db.handlers().active().await?.map(|h| h.id),
    };

    let mut description = args.description.trim().to_string();
    if let (PaymentMethod::Due, Some(customer_id)) = (args.payment, args.customer.as_deref()) {
        let tag = format!("[Due: {}]", customer_id.trim());
        description = if description.is_empty() {
            tag
        } else {
            format!("{} {}", description, tag)
        };
    }

    let mut transaction = match kind {
        TransactionType::Sale => NewTransaction::sale(args.amount, args.category),
        TransactionType::Expense => NewTransaction::expense(args.amount, args.category),
    }
    .with_description(description)
    .with_payment(args.payment)
    .with_handler(handler_id);
    if let Some(date) = args.date {
        transaction = transaction.on(date);
    }

    let checkout = Checkout {
        transaction,
        due_customer: args.customer,
        consumed: args.products,
    };

    let id = ctx.db.transactions().record_checkout(&checkout).await?;
    let transaction = ctx
        .db
        .transactions()
        .get(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Transaction", &id.to_string()))?;

    let customer_due = match (transaction.payment_method, checkout.due_customer) {
        (PaymentMethod::Due, Some(customer_id)) => {
            let outstanding = ctx.db.customers().outstanding_due(&customer_id).await?;
            Some(CustomerDue {
                outstanding_formatted: ctx.config.format_currency(outstanding),
                customer_id,
                outstanding,
            })
        }
        _ => None,
    };

    info!(transaction_id = id, %kind, "Entry recorded");

    respond(EntryResponse {
        amount: ctx.config.format_currency(transaction.amount),
        transaction,
        customer_due,
    })
}

/// `transactions`.
pub async fn transactions(ctx: &Context, args: TransactionsArgs) -> CommandResult {
    let repo = ctx.db.transactions();

    let rows = match args.search {
        Some(keyword) => repo.search(&keyword, args.kind).await?,
        None => {
            let filter = TransactionFilter {
                kind: args.kind,
                start: args.from,
                end: args.to,
                limit: Some(args.limit.unwrap_or(ctx.config.history_limit)),
            };
            repo.list(&filter).await?
        }
    };

    debug!(count = rows.len(), "Transactions fetched");
    respond(rows)
}

/// `calc EXPR`: evaluates and logs with the active handler's incentive.
pub async fn calc(ctx: &Context, expression: &str) -> CommandResult {
    let evaluation = evaluate(expression)?;
    let handler = ctx.db.handlers().active().await?;

    // results beyond the money range earn nothing
    let amount = evaluation.amount().unwrap_or_default();
    let incentive = calculate_incentive(amount, handler.as_ref());

    let calculation = ctx
        .db
        .calculations()
        .record(&NewCalculation {
            expression: evaluation.expression.clone(),
            result: evaluation.display.clone(),
            handler_id: handler.as_ref().map(|h| h.id),
            handler_incentive: incentive,
        })
        .await?;

    respond(CalcResponse {
        result: evaluation.display,
        value: evaluation.value,
        incentive: ctx.config.format_currency(incentive),
        calculation,
    })
}

/// `calculations`.
pub async fn calculations(ctx: &Context, limit: Option<u32>) -> CommandResult {
    let rows = ctx
        .db
        .calculations()
        .list(limit.unwrap_or(ctx.config.history_limit))
        .await?;
    respond(rows)
}

/// `history clear ...`.
pub async fn history(ctx: &Context, command: HistoryCommand) -> CommandResult {
    let HistoryCommand::Clear { target } = command;

    let response = match target {
        ClearTarget::Calculations => ClearResponse {
            cleared: "calculations",
            removed: ctx.db.calculations().clear().await?,
        },
        ClearTarget::Transactions => ClearResponse {
            cleared: "transactions",
            removed: ctx.db.transactions().clear().await?,
        },
    };

    respond(response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support::test_context;
    use crate::error::ErrorCode;
    use digical_core::{Incentive, NewCustomer, NewHandler, Rate};

    fn entry(amount: i64, payment: PaymentMethod, customer: Option<&str>) -> EntryArgs {
        EntryArgs {
            amount: Money::from_major(amount),
            category: "Product Sales".to_string(),
            description: String::new(),
            payment,
            customer: customer.map(str::to_string),
            handler: None,
            date: None,
            products: Vec::new(),
        }
    }

    #[tokio::test]
    async fn test_sale_is_credited_to_active_handler() {
        let ctx = test_context().await;
        let asha = ctx
            .db
            .handlers()
            .create(
                &NewHandler {
                    name: "Asha".to_string(),
                    incentive: Incentive::Percentage(Rate::from_percent(10)),
                },
                true,
            )
            .await
            .unwrap();

        let data = record_entry(&ctx, TransactionType::Sale, entry(500, PaymentMethod::Cash, None))
            .await
            .unwrap();

        assert_eq!(data["transaction"]["handler_id"], asha.id);
        assert_eq!(data["transaction"]["type"], "sale");
        assert_eq!(data["amount"], "₹500.00");
        assert!(data["customer_due"].is_null());
    }

    #[tokio::test]
    async fn test_due_sale_tags_description_and_reports_balance() {
        let ctx = test_context().await;
        let customer = ctx
            .db
            .customers()
            .create(&NewCustomer {
                name: "Ravi".to_string(),
                phone: "9876543210".to_string(),
                email: None,
            })
            .await
            .unwrap();

        let data = record_entry(
            &ctx,
            TransactionType::Sale,
            entry(300, PaymentMethod::Due, Some(&customer.customer_id)),
        )
        .await
        .unwrap();

        assert_eq!(data["transaction"]["description"], "[Due: 1000]");
        assert_eq!(data["customer_due"]["outstanding"], 30000);
        assert_eq!(data["customer_due"]["outstanding_formatted"], "₹300.00");
    }

    #[tokio::test]
    async fn test_due_sale_without_customer_fails() {
        let ctx = test_context().await;
        let err = record_entry(&ctx, TransactionType::Sale, entry(300, PaymentMethod::Due, None))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);
    }

    #[tokio::test]
    async fn test_calc_logs_incentive() {
        let ctx = test_context().await;
        ctx.db
            .handlers()
            .create(
                &NewHandler {
                    name: "Asha".to_string(),
                    incentive: Incentive::Fixed(Money::from_major(15)),
                },
                true,
            )
            .await
            .unwrap();

        let data = calc(&ctx, "100×2").await.unwrap();
        assert_eq!(data["result"], "200");
        assert_eq!(data["incentive"], "₹15.00");
        assert_eq!(data["calculation"]["handler_name"], "Asha");

        let err = calc(&ctx, "1÷0").await.unwrap_err();
        assert_eq!(err.code, ErrorCode::CalculationError);

        let log = calculations(&ctx, None).await.unwrap();
        assert_eq!(log.as_array().map(Vec::len), Some(1));
    }

    #[tokio::test]
    async fn test_clear_history() {
        let ctx = test_context().await;
        calc(&ctx, "1+1").await.unwrap();
        record_entry(&ctx, TransactionType::Expense, entry(20, PaymentMethod::Cash, None))
            .await
            .unwrap();

        let data = history(
            &ctx,
            HistoryCommand::Clear {
                target: ClearTarget::Transactions,
            },
        )
        .await
        .unwrap();
        assert_eq!(data["removed"], 1);

        let rows = transactions(
            &ctx,
            TransactionsArgs {
                kind: None,
                from: None,
                to: None,
                limit: None,
                search: None,
            },
        )
        .await
        .unwrap();
        assert_eq!(rows.as_array().map(Vec::len), Some(0));
    }
}
