//! Order tracking commands.

use std::io::Write;
use std::time::Duration;

use apparel_core::{OrderId, OrderStatus, StepState, timeline};

use super::{App, OrderAction};
use crate::error::CliError;

/// Timeline as text, e.g. `[x] pending > [*] confirmed > [ ] shipped > [ ] delivered`.
#[must_use]
pub fn timeline_text(status: OrderStatus) -> String {
    timeline(status).map_or_else(
        || "cancelled".to_string(),
        |steps| {
            steps
                .iter()
                .map(|(step, state)| {
                    let mark = match state {
                        StepState::Done => "[x]",
                        StepState::Current => "[*]",
                        StepState::Upcoming => "[ ]",
                    };
                    format!("{mark} {step}")
                })
                .collect::<Vec<_>>()
                .join(" > ")
        },
    )
}

/// # Errors
///
/// Returns `OrderError::AuthRequired` when signed out, or the backend error.
pub async fn run(app: &mut App, action: OrderAction) -> Result<(), CliError> {
    let tracker = app.storefront.orders();
    tracker.refresh().await?;

    match action {
        OrderAction::List => {
            let lines = tracker.lines().await;
            let out = app.console.out();
            if lines.is_empty() {
                writeln!(out, "No orders yet")?;
            }
            for line in lines {
                let placed = line
                    .created_at
                    .map(|t| t.format("%d %b %Y").to_string())
                    .unwrap_or_default();
                writeln!(
                    out,
                    "{:<26} {:<11} {:<10} {:<30} x{} {}",
                    line.order_id,
                    placed,
                    line.status,
                    line.item.name.as_deref().unwrap_or("(removed product)"),
                    line.item.quantity,
                    line.item.line_total()
                )?;
            }
        }
        OrderAction::Show { order_id } => {
            let id = OrderId::new(order_id);
            let Some(order) = tracker.select(&id).await else {
                return Err(CliError::Usage(format!("No order with id {id}")));
            };
            let out = app.console.out();
            writeln!(out, "Order {}  {}", order.id, order.total_amount)?;
            writeln!(out, "{}", timeline_text(order.status))?;
            for item in &order.items {
                writeln!(
                    out,
                    "  {:<30} x{} {}",
                    item.name.as_deref().unwrap_or("(removed product)"),
                    item.quantity,
                    item.line_total()
                )?;
            }
            if order.can_cancel() {
                writeln!(out, "This order can still be cancelled")?;
            }
            tracker.close().await;
        }
        OrderAction::Cancel { order_id, yes } => {
            let id = OrderId::new(order_id);
            if !yes && !app.console.confirm(&format!("Cancel order {id}?")).await? {
                writeln!(app.console.out(), "Order kept")?;
                return Ok(());
            }
            tracker.cancel(&id).await?;
            writeln!(app.console.out(), "Order {id} cancelled")?;
        }
        OrderAction::Watch { interval } => {
            let interval = interval.map_or(app.storefront.config().poll_interval, Duration::from_secs);
            writeln!(
                app.console.out(),
                "Watching orders every {}s, Ctrl-C to stop",
                interval.as_secs()
            )?;
            let (poller, mut changes) = tracker.watch(interval);
            loop {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => break,
                    change = changes.recv() => {
                        let Some(change) = change else { break };
                        writeln!(
                            app.console.out(),
                            "Order {}: {} -> {}",
                            change.order_id,
                            change.from,
                            change.to
                        )?;
                    }
                }
            }
            poller.stop();
        }
    }
    Ok(())
}
