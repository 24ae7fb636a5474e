//! # Product Commands
//!
//! Stock maintenance. Sales consume stock through `sale --product`.

use serde::Serialize;
use serde_json::json;

use super::{respond, CommandResult, Context};
use crate::cli::ProductCommand;
use digical_core::{NewProduct, Product, ProductUpdate};

#[derive(Debug, Serialize)]
struct ProductView {
    #[serde(flatten)]
    product: Product,
    sold_qty: i64,
    out_of_stock: bool,
    price_formatted: String,
}

impl ProductView {
    fn new(ctx: &Context, product: Product) -> Self {
        ProductView {
            sold_qty: product.sold_qty(),
            out_of_stock: product.is_out_of_stock(),
            price_formatted: ctx.config.format_currency(product.price),
            product,
        }
    }
}

pub async fn run(ctx: &Context, command: ProductCommand) -> CommandResult {
    let repo = ctx.db.products();

    match command {
        ProductCommand::Add {
            name,
            category,
            total,
            left,
            price,
        } => {
            let product = repo
                .create(&NewProduct {
                    name,
                    category,
                    total_qty: total,
                    left_qty: left,
                    price,
                })
                .await?;
            respond(ProductView::new(ctx, product))
        }
        ProductCommand::List => {
            let views: Vec<ProductView> = repo
                .list()
                .await?
                .into_iter()
                .map(|product| ProductView::new(ctx, product))
                .collect();
            respond(views)
        }
        ProductCommand::Update {
            id,
            name,
            category,
            total,
            left,
            price,
        } => {
            let product = repo
                .update(
                    id,
                    &ProductUpdate {
                        name,
                        category,
                        total_qty: total,
                        left_qty: left,
                        price,
                    },
                )
                .await?;
            respond(ProductView::new(ctx, product))
        }
        ProductCommand::Delete { id } => {
            repo.delete(id).await?;
            respond(json!({ "deleted": id }))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support::test_context;
    use crate::error::ErrorCode;
    use digical_core::Money;

    fn pen(total: i64, left: Option<i64>) -> ProductCommand {
        ProductCommand::Add {
            name: "Pen".to_string(),
            category: "Stationery".to_string(),
            total,
            left,
            price: Money::from_major(10),
        }
    }

    #[tokio::test]
    async fn test_add_defaults_left_to_total() {
        let ctx = test_context().await;
        let data = run(&ctx, pen(10, None)).await.unwrap();
        assert_eq!(data["left_qty"], 10);
        assert_eq!(data["sold_qty"], 0);
        assert_eq!(data["price_formatted"], "₹10.00");
    }

    #[tokio::test]
    async fn test_left_above_total_is_rejected() {
        let ctx = test_context().await;
        let err = run(&ctx, pen(5, Some(8))).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);
    }

    #[tokio::test]
    async fn test_update_and_delete() {
        let ctx = test_context().await;
        let id = run(&ctx, pen(10, Some(0))).await.unwrap()["id"].as_i64().unwrap();

        let data = run(
            &ctx,
            ProductCommand::Update {
                id,
                name: "Pen".to_string(),
                category: "Stationery".to_string(),
                total: 20,
                left: 20,
                price: Money::from_major(12),
            },
        )
        .await
        .unwrap();
        assert_eq!(data["left_qty"], 20);
        assert_eq!(data["out_of_stock"], false);

        run(&ctx, ProductCommand::Delete { id }).await.unwrap();
        let err = run(&ctx, ProductCommand::Delete { id }).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);

        let list = run(&ctx, ProductCommand::List).await.unwrap();
        assert_eq!(list.as_array().map(Vec::len), Some(0));
    }
}
