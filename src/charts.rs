//! Presentation adapter: turns KPIs and monthly aggregates into plotly-style
//! figure descriptions.
//!
//! The figures serialize to the `{data, layout}` JSON the page hands to the
//! charting library unchanged. Nothing here does I/O.

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

use crate::aggregate::MonthlyAggregate;
use crate::metrics::{KpiBundle, Mean};

pub const NO_DATA: &str = "no data";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Figure {
    pub data: Vec<Trace>,
    pub layout: Layout,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Trace {
    Bar(BarTrace),
    Pie(PieTrace),
    Indicator(IndicatorTrace),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BarTrace {
    pub name: String,
    pub x: Vec<String>,
    pub y: Vec<Option<f64>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PieTrace {
    pub labels: Vec<String>,
    pub values: Vec<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hole: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndicatorTrace {
    pub mode: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delta: Option<Delta>,
    pub title: Title,
    pub domain: Domain,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Delta {
    pub reference: f64,
    pub relative: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Title {
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Domain {
    pub row: usize,
    pub column: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BarMode {
    Stack,
    Group,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Grid {
    pub rows: usize,
    pub columns: usize,
    pub pattern: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Axis {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<Title>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Layout {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<Title>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub barmode: Option<BarMode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grid: Option<Grid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub xaxis: Option<Axis>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub yaxis: Option<Axis>,
}

fn title(text: &str) -> Option<Title> {
    Some(Title { text: text.to_string() })
}

fn category_axis(label: &str) -> Option<Axis> {
    Some(Axis {
        kind: "category".to_string(),
        title: title(label),
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TileUnit {
    Count,
    Days,
}

/// One KPI tile: a value, an optional reference for the delta, and its
/// place in the indicator grid.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndicatorTile {
    pub label: String,
    pub value: Mean,
    pub reference: Option<f64>,
    pub unit: TileUnit,
    pub row: usize,
    pub column: usize,
}

impl IndicatorTile {
    fn new(label: &str, value: Mean, unit: TileUnit, row: usize, column: usize) -> Self {
        Self {
            label: label.to_string(),
            value,
            reference: None,
            unit,
            row,
            column,
        }
    }

    fn with_reference(mut self, reference: Mean) -> Self {
        self.reference = reference.value();
        self
    }

    /// Text shown on the tile; `no data` for an empty window.
    pub fn display_value(&self) -> String {
        match (self.value, self.unit) {
            (Mean::NoData, _) => NO_DATA.to_string(),
            (Mean::Value(v), TileUnit::Count) => format!("{}", v.round()),
            (Mean::Value(v), TileUnit::Days) => format!("{:.1} d", v),
        }
    }

    /// Signed difference against the reference, when both exist.
    pub fn delta(&self) -> Option<f64> {
        Some(self.value.value()? - self.reference?)
    }

    pub fn is_no_data(&self) -> bool {
        self.value.is_no_data()
    }

    fn to_trace(&self) -> IndicatorTrace {
        let domain = Domain {
            row: self.row,
            column: self.column,
        };
        match self.value {
            Mean::Value(value) => IndicatorTrace {
                mode: (if self.reference.is_some() { "number+delta" } else { "number" }).to_string(),
                value: Some(value),
                delta: self.reference.map(|reference| Delta {
                    reference,
                    relative: false,
                }),
                title: Title { text: self.label.clone() },
                domain,
            },
            Mean::NoData => IndicatorTrace {
                mode: "number".to_string(),
                value: None,
                delta: None,
                title: Title {
                    text: format!("{}<br><span style='font-size:0.8em'>{}</span>", self.label, NO_DATA),
                },
                domain,
            },
        }
    }
}

/// Every figure and tile the dashboard page renders.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartBundle {
    pub releases_by_shop: Figure,
    pub monthly_tat: Figure,
    pub status_distribution: Figure,
    pub indicators: Figure,
    pub tiles: Vec<IndicatorTile>,
}

fn count(value: usize) -> Mean {
    Mean::Value(value as f64)
}

pub fn indicator_tiles(kpis: &KpiBundle) -> Vec<IndicatorTile> {
    let s = &kpis.status_counts;
    vec![
        IndicatorTile::new("Running", count(s.running), TileUnit::Count, 0, 0),
        IndicatorTile::new("Open", count(s.open), TileUnit::Count, 0, 1),
        IndicatorTile::new("Open - transfer to shop", count(s.open_transfer_to_shop), TileUnit::Count, 0, 2),
        IndicatorTile::new("Paused", count(s.paused), TileUnit::Count, 1, 0),
        IndicatorTile::new("Paused - other", count(s.paused_other), TileUnit::Count, 1, 1),
        IndicatorTile::new("Mean paused shop TAT", kpis.mean_paused_shop_tat, TileUnit::Days, 1, 2),
        IndicatorTile::new(
            "Historical ack-to-close TAT",
            kpis.historical_ack_to_close_tat,
            TileUnit::Days,
            2,
            0,
        ),
        IndicatorTile::new(
            "Last month ack-to-close TAT",
            kpis.last_month_ack_to_close_tat,
            TileUnit::Days,
            2,
            1,
        )
        .with_reference(kpis.historical_ack_to_close_tat),
        IndicatorTile::new(
            "Current month ack-to-close TAT",
            kpis.current_month_ack_to_close_tat,
            TileUnit::Days,
            2,
            2,
        )
        .with_reference(kpis.last_month_ack_to_close_tat),
    ]
}

pub fn indicators_figure(tiles: &[IndicatorTile]) -> Figure {
    let rows = tiles.iter().map(|t| t.row + 1).max().unwrap_or(1);
    let columns = tiles.iter().map(|t| t.column + 1).max().unwrap_or(1);
    Figure {
        data: tiles.iter().map(|t| Trace::Indicator(t.to_trace())).collect(),
        layout: Layout {
            grid: Some(Grid {
                rows,
                columns,
                pattern: "independent".to_string(),
            }),
            ..Default::default()
        },
    }
}

/// Stacked bars of closed orders per month, one series per shop.
pub fn releases_figure(kpis: &KpiBundle) -> Figure {
    let months: BTreeSet<&str> = kpis
        .releases_by_shop
        .iter()
        .map(|r| r.year_month.as_str())
        .collect();
    let mut by_shop: BTreeMap<&str, BTreeMap<&str, usize>> = BTreeMap::new();
    for release in &kpis.releases_by_shop {
        by_shop
            .entry(release.shop.as_str())
            .or_default()
            .insert(release.year_month.as_str(), release.count);
    }

    let x: Vec<String> = months.iter().map(|m| m.to_string()).collect();
    let data = by_shop
        .into_iter()
        .map(|(shop, counts)| {
            Trace::Bar(BarTrace {
                name: shop.to_string(),
                x: x.clone(),
                y: months
                    .iter()
                    .map(|m| Some(counts.get(m).copied().unwrap_or(0) as f64))
                    .collect(),
            })
        })
        .collect();

    Figure {
        data,
        layout: Layout {
            title: title("Closed orders per month by shop"),
            barmode: Some(BarMode::Stack),
            xaxis: category_axis("Month"),
            yaxis: Some(Axis {
                kind: "linear".to_string(),
                title: title("Orders"),
            }),
            ..Default::default()
        },
    }
}

/// Grouped bars of the three monthly TAT means.
pub fn monthly_tat_figure(monthly: &[MonthlyAggregate]) -> Figure {
    let x: Vec<String> = monthly.iter().map(|m| m.year_month.clone()).collect();
    let series = |name: &str, pick: fn(&MonthlyAggregate) -> Option<f64>| {
        Trace::Bar(BarTrace {
            name: name.to_string(),
            x: x.clone(),
            y: monthly.iter().map(pick).collect(),
        })
    };

    Figure {
        data: vec![
            series("Total TAT", |m| m.mean_tat),
            series("Ack-to-close TAT", |m| m.mean_ack_to_close_tat),
            series("Logistics TAT", |m| m.mean_logistics_tat),
        ],
        layout: Layout {
            title: title("Mean TAT per month"),
            barmode: Some(BarMode::Group),
            xaxis: category_axis("Month"),
            yaxis: Some(Axis {
                kind: "linear".to_string(),
                title: title("Days"),
            }),
            ..Default::default()
        },
    }
}

/// Donut of open orders per status.
pub fn status_figure(kpis: &KpiBundle) -> Figure {
    Figure {
        data: vec![Trace::Pie(PieTrace {
            labels: kpis.status_distribution.iter().map(|s| s.status.clone()).collect(),
            values: kpis.status_distribution.iter().map(|s| s.count as f64).collect(),
            hole: Some(0.4),
        })],
        layout: Layout {
            title: title("Open orders by status"),
            ..Default::default()
        },
    }
}

pub fn build_charts(kpis: &KpiBundle, monthly: &[MonthlyAggregate]) -> ChartBundle {
    let tiles = indicator_tiles(kpis);
    ChartBundle {
        releases_by_shop: releases_figure(kpis),
        monthly_tat: monthly_tat_figure(monthly),
        status_distribution: status_figure(kpis),
        indicators: indicators_figure(&tiles),
        tiles,
    }
}
