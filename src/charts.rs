//! Chart definitions for the dashboard.
//!
//! This module builds the two ECharts visualizations shown next to the
//! transaction list:
//! - **Expense Breakdown**: a pie chart of expenses grouped by category
//! - **Income vs Expense**: a bar chart comparing the two totals
//!
//! Charts are wrapped in a [ChartSurface], the handle that
//! [crate::capture] turns into a raster image for PDF export.

use std::fmt::Display;

use charming::{
    Chart,
    component::{Axis, Grid, Legend, Title},
    element::{AxisType, Tooltip, Trigger},
    series::{Pie, bar},
};

use crate::{
    metrics::{Totals, expenses_by_category, income_vs_expense},
    models::Transaction,
};

/// Identifies one of the dashboard charts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChartKind {
    /// Expenses grouped by category.
    ExpenseBreakdown,
    /// Total income next to total expenses.
    IncomeVsExpense,
}

impl ChartKind {
    /// The chart's caption.
    pub fn title(&self) -> &'static str {
        match self {
            ChartKind::ExpenseBreakdown => "Expense Breakdown",
            ChartKind::IncomeVsExpense => "Income vs Expense",
        }
    }
}

impl Display for ChartKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.title())
    }
}

/// A chart as it is shown on the dashboard.
///
/// A surface without a chart has not been mounted yet and cannot be captured.
#[derive(Debug)]
pub struct ChartSurface {
    kind: ChartKind,
    chart: Option<Chart>,
}

impl ChartSurface {
    /// A surface showing `chart`.
    pub fn mounted(kind: ChartKind, chart: Chart) -> Self {
        Self {
            kind,
            chart: Some(chart),
        }
    }

    /// A surface that has not been drawn yet.
    pub fn unmounted(kind: ChartKind) -> Self {
        Self { kind, chart: None }
    }

    /// Which chart this surface shows.
    pub fn kind(&self) -> ChartKind {
        self.kind
    }

    /// The chart, if the surface has been mounted.
    pub fn chart(&self) -> Option<&Chart> {
        self.chart.as_ref()
    }
}

/// Build both dashboard charts for the current snapshot.
pub fn dashboard_surfaces(transactions: &[Transaction], totals: &Totals) -> [ChartSurface; 2] {
    [
        ChartSurface::mounted(
            ChartKind::ExpenseBreakdown,
            expense_breakdown_chart(transactions),
        ),
        ChartSurface::mounted(ChartKind::IncomeVsExpense, income_vs_expense_chart(totals)),
    ]
}

pub(crate) fn expense_breakdown_chart(transactions: &[Transaction]) -> Chart {
    let categories = expenses_by_category(transactions);
    let data: Vec<(f64, &str)> = categories
        .iter()
        .map(|(category, total)| (*total, category.as_str()))
        .collect();

    Chart::new()
        .title(Title::new().text(ChartKind::ExpenseBreakdown.title()))
        .tooltip(Tooltip::new().trigger(Trigger::Item))
        .legend(Legend::new().top("bottom"))
        .series(Pie::new().name("Expenses").data(data))
}

pub(crate) fn income_vs_expense_chart(totals: &Totals) -> Chart {
    let bars = income_vs_expense(totals);
    let labels: Vec<String> = bars.iter().map(|(label, _)| (*label).to_owned()).collect();
    let values: Vec<f64> = bars.iter().map(|(_, value)| *value).collect();

    Chart::new()
        .title(Title::new().text(ChartKind::IncomeVsExpense.title()))
        .tooltip(Tooltip::new().trigger(Trigger::Axis))
        .grid(
            Grid::new()
                .left("3%")
                .right("4%")
                .bottom("3%")
                .contain_label(true),
        )
        .x_axis(Axis::new().type_(AxisType::Category).data(labels))
        .y_axis(Axis::new().type_(AxisType::Value))
        .series(bar::Bar::new().name("Amount").data(values))
}
