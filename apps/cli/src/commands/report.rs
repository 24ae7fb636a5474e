//! # Report Commands
//!
//! Period summaries, dashboard chart data and the category list.
//!
//! ## Period Selection
//! ```text
//! summary                        today
//! summary --date 2024-01-15      that day
//! summary --week                 monday .. today
//! summary --month 2024-02        2024-02-01 .. 2024-02-29
//! summary --from A --to B        A .. B   (A after B is rejected)
//! ```

use chrono::NaiveDate;
use serde::Serialize;

use super::{respond, CommandResult, Context};
use crate::cli::{CategoryCommand, GraphArgs, GraphKind, SummaryArgs};
use digical_core::{Breakdown, DateRange, Money, SeriesSpec, Summary, ValidationError};

// =============================================================================
// Summary
// =============================================================================

#[derive(Debug, Serialize)]
struct SummaryReport {
    store_name: String,
    period: DateRange,
    #[serde(flatten)]
    summary: Summary,
    payment_methods: Breakdown,
    formatted: FormattedTotals,
}

#[derive(Debug, Serialize)]
struct FormattedTotals {
    total_sales: String,
    total_expenses: String,
    profit: String,
}

fn resolve_period(args: &SummaryArgs, today: NaiveDate) -> Result<DateRange, ValidationError> {
    if let Some(date) = args.date {
        return Ok(DateRange::day(date));
    }
    if args.week {
        return Ok(DateRange::week_to_date(today));
    }
    if let Some((year, month)) = args.month {
        return DateRange::month(year, month);
    }
    match (args.from, args.to) {
        (Some(start), Some(end)) => DateRange::new(start, end),
        _ => Ok(DateRange::day(today)),
    }
}

/// `summary`.
pub async fn summary(ctx: &Context, args: SummaryArgs) -> CommandResult {
    let period = resolve_period(&args, ctx.today())?;
    let summaries = ctx.db.summaries();

    let summary = summaries.range(period).await?;
    let payment_methods = summaries
        .payment_method_breakdown(None, Some(period.start), Some(period.end))
        .await?;

    respond(SummaryReport {
        store_name: ctx.config.store_name.clone(),
        period,
        formatted: FormattedTotals {
            total_sales: ctx.config.format_currency(summary.total_sales),
            total_expenses: ctx.config.format_currency(summary.total_expenses),
            profit: ctx.config.format_currency(summary.profit),
        },
        summary,
        payment_methods,
    })
}

// =============================================================================
// Graphs
// =============================================================================

#[derive(Debug, Serialize)]
struct ProfitPoint {
    date: NaiveDate,
    profit: Money,
}

/// `graph weekly|monthly|profit|categories`.
pub async fn graph(ctx: &Context, args: GraphArgs) -> CommandResult {
    let end = args.date.unwrap_or_else(|| ctx.today());
    let summaries = ctx.db.summaries();

    match args.kind {
        GraphKind::Weekly => respond(summaries.daily_series(end, SeriesSpec::WEEKLY).await?),
        GraphKind::Monthly => respond(summaries.daily_series(end, SeriesSpec::MONTHLY).await?),
        GraphKind::Profit => {
            let points: Vec<ProfitPoint> = summaries
                .daily_series(end, SeriesSpec::MONTHLY)
                .await?
                .into_iter()
                .map(|point| ProfitPoint {
                    date: point.date,
                    profit: point.profit,
                })
                .collect();
            respond(points)
        }
        GraphKind::Categories => respond(summaries.month_to_date_breakdown(args.transaction_type, end).await?),
    }
}

// =============================================================================
// Categories
// =============================================================================

/// `category list|add`.
pub async fn category(ctx: &Context, command: CategoryCommand) -> CommandResult {
    let repo = ctx.db.categories();

    match command {
        CategoryCommand::List { kind } => respond(repo.list(kind).await?),
        CategoryCommand::Add { name, kind } => respond(repo.add(&name, kind).await?),
    }
}
