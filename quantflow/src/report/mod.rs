use crate::transform::IoType;
use derive_more::Constructor;
use quantflow_frame::{DataFrame, Scalar};
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

/// Schema of one column in a selector or table artifact.
#[derive(Debug, Clone, Eq, PartialEq, Hash, Deserialize, Serialize, Constructor)]
pub struct ColumnSchema {
    pub name: SmolStr,
    pub io_type: IoType,
}

/// A headline metric card.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, Constructor)]
pub struct Card {
    pub category: SmolStr,
    pub label: String,
    pub value: Scalar,
}

/// Render kind of a report chart.
#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Default, Deserialize, Serialize,
)]
pub enum ChartKind {
    #[default]
    Line,
    Bar,
    Histogram,
    Pie,
}

/// One plotted series inside a chart.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, Constructor)]
pub struct ChartSeries {
    pub name: String,
    pub points: Vec<f64>,
}

/// A chart artifact.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, Constructor)]
pub struct Chart {
    pub title: String,
    pub kind: ChartKind,
    pub series: Vec<ChartSeries>,
}

/// A tabular artifact.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, Constructor)]
pub struct TableArtifact {
    pub title: String,
    pub schema: Vec<ColumnSchema>,
    pub frame: DataFrame,
}

/// Repeated-card container.
#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize, Constructor)]
pub struct CardList {
    pub cards: Vec<Card>,
}

/// Repeated-chart container.
#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize, Constructor)]
pub struct ChartList {
    pub charts: Vec<Chart>,
}

/// Repeated-table container.
#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize, Constructor)]
pub struct TableList {
    pub tables: Vec<TableArtifact>,
}

/// The structured report artifact accumulated per asset: cards, charts and tables emitted by
/// reporter transforms.
///
/// Merge semantics follow protocol-buffer `MergeFrom`: repeated fields append in order without
/// deduplication, singular message fields merge recursively, and singular scalar fields are
/// overwritten when set. Because merging appends, re-running a pipeline on the same engine
/// grows repeated-field counts; callers wanting fresh artifacts should construct a fresh
/// orchestrator.
#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
pub struct TearSheet {
    pub title: Option<String>,
    pub cards: Option<CardList>,
    pub charts: Option<ChartList>,
    pub tables: Option<TableList>,
}

impl TearSheet {
    /// True when no field is set and no container holds artifacts; the engine skips caching
    /// empty reports.
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.cards.as_ref().is_none_or(|list| list.cards.is_empty())
            && self
                .charts
                .as_ref()
                .is_none_or(|list| list.charts.is_empty())
            && self
                .tables
                .as_ref()
                .is_none_or(|list| list.tables.is_empty())
    }

    pub fn card_count(&self) -> usize {
        self.cards.as_ref().map_or(0, |list| list.cards.len())
    }

    pub fn chart_count(&self) -> usize {
        self.charts.as_ref().map_or(0, |list| list.charts.len())
    }

    pub fn table_count(&self) -> usize {
        self.tables.as_ref().map_or(0, |list| list.tables.len())
    }

    /// Structural merge of `other` into `self`.
    ///
    /// Order-preserving: artifacts from `other` appear after existing ones.
    pub fn merge_from(&mut self, other: &TearSheet) {
        if let Some(title) = &other.title {
            self.title = Some(title.clone());
        }
        if let Some(other_cards) = &other.cards {
            self.cards
                .get_or_insert_with(CardList::default)
                .cards
                .extend(other_cards.cards.iter().cloned());
        }
        if let Some(other_charts) = &other.charts {
            self.charts
                .get_or_insert_with(ChartList::default)
                .charts
                .extend(other_charts.charts.iter().cloned());
        }
        if let Some(other_tables) = &other.tables {
            self.tables
                .get_or_insert_with(TableList::default)
                .tables
                .extend(other_tables.tables.iter().cloned());
        }
    }
}

/// UI selector artifact: a titled list of column schemas plus the accompanying table.
///
/// Selectors accumulate per asset as a list; they are never merged.
#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize, Constructor)]
pub struct SelectorData {
    pub title: String,
    pub schemas: Vec<ColumnSchema>,
    pub frame: DataFrame,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sheet(cards: usize, charts: usize, tables: usize) -> TearSheet {
        TearSheet {
            title: None,
            cards: Some(CardList::new(
                (0..cards)
                    .map(|i| Card::new("perf".into(), format!("card_{i}"), Scalar::from(i as f64)))
                    .collect(),
            )),
            charts: Some(ChartList::new(
                (0..charts)
                    .map(|i| Chart::new(format!("chart_{i}"), ChartKind::Line, vec![]))
                    .collect(),
            )),
            tables: Some(TableList::new(
                (0..tables)
                    .map(|i| TableArtifact::new(format!("table_{i}"), vec![], DataFrame::empty()))
                    .collect(),
            )),
        }
    }

    #[test]
    fn test_empty_tearsheet_is_empty() {
        assert!(TearSheet::default().is_empty());
        assert!(
            TearSheet {
                cards: Some(CardList::default()),
                ..TearSheet::default()
            }
            .is_empty()
        );
        assert!(!sheet(1, 0, 0).is_empty());
    }

    #[test]
    fn test_merge_appends_repeated_fields_in_order() {
        let mut existing = sheet(2, 1, 0);
        existing.merge_from(&sheet(2, 0, 1));

        assert_eq!(existing.card_count(), 4);
        assert_eq!(existing.chart_count(), 1);
        assert_eq!(existing.table_count(), 1);

        // New artifacts appear after existing ones and are not deduplicated.
        let cards = &existing.cards.as_ref().unwrap().cards;
        assert_eq!(cards[0].label, "card_0");
        assert_eq!(cards[2].label, "card_0");
    }

    #[test]
    fn test_merge_counts_are_associative() {
        let (a, b, c) = (sheet(2, 1, 0), sheet(2, 0, 1), sheet(2, 1, 0));

        let mut left_first = a.clone();
        left_first.merge_from(&b);
        left_first.merge_from(&c);

        let mut right_first = b.clone();
        right_first.merge_from(&c);
        let mut merged = a;
        merged.merge_from(&right_first);

        assert_eq!(left_first.card_count(), 6);
        assert_eq!(left_first.chart_count(), 2);
        assert_eq!(left_first.table_count(), 1);
        assert_eq!(left_first, merged);
    }

    #[test]
    fn test_merge_overwrites_singular_scalar_when_set() {
        let mut existing = TearSheet {
            title: Some("first".into()),
            ..TearSheet::default()
        };

        existing.merge_from(&TearSheet::default());
        assert_eq!(existing.title.as_deref(), Some("first"));

        existing.merge_from(&TearSheet {
            title: Some("second".into()),
            ..TearSheet::default()
        });
        assert_eq!(existing.title.as_deref(), Some("second"));
    }

    #[test]
    fn test_merge_into_unset_container_clones() {
        let mut existing = TearSheet::default();
        existing.merge_from(&sheet(1, 2, 3));

        assert_eq!(existing.card_count(), 1);
        assert_eq!(existing.chart_count(), 2);
        assert_eq!(existing.table_count(), 3);
    }
}
