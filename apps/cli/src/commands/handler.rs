//! # Handler Commands
//!
//! Handler CRUD, the active-handler switch, and accumulated incentive.

use serde::Serialize;
use serde_json::json;

use super::{respond, CommandResult, Context};
use crate::cli::{HandlerCommand, IncentiveArgs};
use crate::error::ApiError;
use digical_core::{Handler, Incentive, NewHandler};

/// Handler plus its running incentive total.
#[derive(Debug, Serialize)]
struct HandlerView {
    #[serde(flatten)]
    handler: Handler,
    total_incentive: String,
}

fn new_handler(args: IncentiveArgs) -> Result<NewHandler, ApiError> {
    Ok(NewHandler {
        incentive: Incentive::parse(args.kind, &args.value)?,
        name: args.name,
    })
}

pub async fn run(ctx: &Context, command: HandlerCommand) -> CommandResult {
    let repo = ctx.db.handlers();

    match command {
        HandlerCommand::Add { handler, activate } => {
            let created = repo.create(&new_handler(handler)?, activate).await?;
            respond(created)
        }
        HandlerCommand::List => {
            let calculations = ctx.db.calculations();
            let mut views = Vec::new();
            for handler in repo.list().await? {
                let total = calculations.total_incentive(handler.id).await?;
                views.push(HandlerView {
                    total_incentive: ctx.config.format_currency(total),
                    handler,
                });
            }
            respond(views)
        }
        HandlerCommand::Activate { id } => {
            repo.set_active(id).await?;
            let active = repo.get(id).await?.ok_or_else(|| ApiError::not_found("Handler", &id.to_string()))?;
            respond(active)
        }
        HandlerCommand::Deactivate => {
            repo.clear_active().await?;
            respond(json!({ "active": null }))
        }
        HandlerCommand::Update { id, handler } => {
            let updated = repo.update(id, &new_handler(handler)?).await?;
            respond(updated)
        }
        HandlerCommand::Delete { id } => {
            repo.delete(id).await?;
            respond(json!({ "deleted": id }))
        }
        HandlerCommand::Performance => respond(ctx.db.calculations().handler_performance().await?),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::ledger;
    use crate::commands::test_support::test_context;
    use crate::error::ErrorCode;
    use digical_core::IncentiveType;

    fn args(name: &str, kind: IncentiveType, value: &str) -> IncentiveArgs {
        IncentiveArgs {
            name: name.to_string(),
            kind,
            value: value.to_string(),
        }
    }

    #[tokio::test]
    async fn test_add_and_switch_active() {
        let ctx = test_context().await;

        let asha = run(
            &ctx,
            HandlerCommand::Add {
                handler: args("Asha", IncentiveType::Percentage, "10"),
                activate: true,
            },
        )
        .await
        .unwrap();
        assert_eq!(asha["is_active"], true);
        assert_eq!(asha["incentive"]["type"], "percentage");

        let ravi = run(
            &ctx,
            HandlerCommand::Add {
                handler: args("Ravi", IncentiveType::Fixed, "15.00"),
                activate: false,
            },
        )
        .await
        .unwrap();
        let ravi_id = ravi["id"].as_i64().unwrap();

        run(&ctx, HandlerCommand::Activate { id: ravi_id }).await.unwrap();

        let active = ctx.db.handlers().active().await.unwrap().unwrap();
        assert_eq!(active.name, "Ravi");
    }

    #[tokio::test]
    async fn test_duplicate_and_bad_value() {
        let ctx = test_context().await;
        let add = |value: &str| HandlerCommand::Add {
            handler: args("Asha", IncentiveType::Percentage, value),
            activate: false,
        };

        run(&ctx, add("5")).await.unwrap();
        assert_eq!(run(&ctx, add("5")).await.unwrap_err().code, ErrorCode::Duplicate);
        assert_eq!(run(&ctx, add("lots")).await.unwrap_err().code, ErrorCode::ValidationError);
    }

    #[tokio::test]
    async fn test_list_shows_earned_incentive() {
        let ctx = test_context().await;
        run(
            &ctx,
            HandlerCommand::Add {
                handler: args("Asha", IncentiveType::Percentage, "10"),
                activate: true,
            },
        )
        .await
        .unwrap();

        ledger::calc(&ctx, "500").await.unwrap();

        let list = run(&ctx, HandlerCommand::List).await.unwrap();
        assert_eq!(list[0]["name"], "Asha");
        assert_eq!(list[0]["total_incentive"], "₹50.00");

        let performance = run(&ctx, HandlerCommand::Performance).await.unwrap();
        assert_eq!(performance[0]["total_incentive"], 5000);
    }

    #[tokio::test]
    async fn test_missing_handler() {
        let ctx = test_context().await;
        let err = run(&ctx, HandlerCommand::Activate { id: 42 }).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);

        let err = run(&ctx, HandlerCommand::Delete { id: 42 }).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);
    }
}
