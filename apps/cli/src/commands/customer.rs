//! # Customer Commands
//!
//! Customers, their dues, and settlements against them.
//!
//! ## Balance
//! ```text
//! outstanding = Σ due_records.amount − Σ settlements.amount
//!
//! customer settle 1000 --amount 100
//!   outstanding 300 ──► settlement 100 ──► outstanding 200
//!   outstanding 300 ──► settlement 400 ──► SETTLEMENT_EXCEEDS_DUE
//! ```

use serde::Serialize;

use super::{respond, CommandResult, Context};
use crate::cli::{CustomerArgs, CustomerCommand};
use crate::error::ApiError;
use digical_core::{Balance, Customer, DueRecord, Money, NewCustomer, Settlement};

#[derive(Debug, Serialize)]
struct CustomerView {
    #[serde(flatten)]
    customer: Customer,
    outstanding: Money,
    outstanding_formatted: String,
}

#[derive(Debug, Serialize)]
struct SettlementResponse {
    settlement: Settlement,
    outstanding: Money,
    outstanding_formatted: String,
}

#[derive(Debug, Serialize)]
struct Statement {
    customer_id: String,
    dues: Vec<DueRecord>,
    settlements: Vec<Settlement>,
    balance: Balance,
    outstanding: Money,
}

fn new_customer(args: CustomerArgs) -> NewCustomer {
    NewCustomer {
        name: args.name,
        phone: args.phone,
        email: args.email,
    }
}

async fn view(ctx: &Context, customer: Customer) -> Result<CustomerView, ApiError> {
    let outstanding = ctx.db.customers().outstanding_due(&customer.customer_id).await?;
    Ok(CustomerView {
        outstanding_formatted: ctx.config.format_currency(outstanding),
        customer,
        outstanding,
    })
}

async fn require(ctx: &Context, customer_id: &str) -> Result<Customer, ApiError> {
    ctx.db
        .customers()
        .get(customer_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Customer", customer_id.trim()))
}

pub async fn run(ctx: &Context, command: CustomerCommand) -> CommandResult {
    let repo = ctx.db.customers();

    match command {
        CustomerCommand::Add(args) => {
            let customer = repo.create(&new_customer(args)).await?;
            respond(view(ctx, customer).await?)
        }
        CustomerCommand::List { with_dues } => {
            let rows = if with_dues {
                repo.list_with_dues().await?
            } else {
                repo.list_with_balances().await?
            };
            respond(rows)
        }
        CustomerCommand::Show { id, phone } => {
            let customer = match (id, phone) {
                (Some(id), _) => require(ctx, &id).await?,
                (None, Some(phone)) => repo
                    .get_by_phone(&phone)
                    .await?
                    .ok_or_else(|| ApiError::not_found("Customer with phone", phone.trim()))?,
                (None, None) => return Err(ApiError::validation("customer id or --phone is required")),
            };
            respond(view(ctx, customer).await?)
        }
        CustomerCommand::Update { id, customer } => {
            let updated = repo.update(&id, &new_customer(customer)).await?;
            respond(view(ctx, updated).await?)
        }
        CustomerCommand::Settle { id, amount } => {
            let settlement = repo.record_settlement(&id, amount).await?;
            let outstanding = repo.outstanding_due(&id).await?;
            respond(SettlementResponse {
                settlement,
                outstanding,
                outstanding_formatted: ctx.config.format_currency(outstanding),
            })
        }
        CustomerCommand::Dues { id } => {
            let customer = require(ctx, &id).await?;
            let balance = repo.balance(&customer.customer_id).await?;
            respond(Statement {
                dues: repo.dues(&customer.customer_id).await?,
                settlements: repo.settlements(&customer.customer_id).await?,
                outstanding: balance.outstanding(),
                balance,
                customer_id: customer.customer_id,
            })
        }
    }
}
