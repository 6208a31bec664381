//! Tabular views of scoring results and search hits.

use crate::constants::confidence::DECIMAL_PLACES;
use crate::scoring::SearchHit;
use crate::store::ScoringResult;
use serde::{Serialize, Serializer};

/// One table cell.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    /// Rank or identifier; `None` renders empty.
    Int(Option<u64>),
    /// Free text.
    Text(String),
    /// Score; NaN renders empty (or `null` in JSON).
    Score(f64),
}

impl Cell {
    /// Plain-text rendering used by the CSV and table writers.
    pub fn render(&self) -> String {
        match self {
            Self::Int(Some(v)) => v.to_string(),
            Self::Int(None) => String::new(),
            Self::Text(s) => s.clone(),
            Self::Score(v) if v.is_nan() => String::new(),
            Self::Score(v) => format!("{v:.DECIMAL_PLACES$}"),
        }
    }
}

impl Serialize for Cell {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Int(v) => v.serialize(serializer),
            Self::Text(s) => serializer.serialize_str(s),
            Self::Score(v) if v.is_nan() => serializer.serialize_none(),
            Self::Score(v) => serializer.serialize_f64(*v),
        }
    }
}

/// Column names plus rows of cells.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    /// Column names.
    pub columns: Vec<String>,
    /// Rows, each as long as `columns`.
    pub rows: Vec<Vec<Cell>>,
}

impl Table {
    /// Ranked candidates of a cached scoring result.
    pub fn from_scoring_result(result: &ScoringResult) -> Self {
        let mut columns = vec![
            "rank".to_string(),
            "individual".to_string(),
            "name".to_string(),
            "score".to_string(),
        ];
        columns.extend(result.channels.iter().map(|c| format!("{c}_score")));
        columns.push("seek_code".to_string());

        let rows = result
            .rows
            .iter()
            .map(|row| {
                let mut cells = vec![
                    Cell::Int(row.rank.map(|r| r as u64)),
                    Cell::Int(Some(row.individual.0)),
                    Cell::Text(row.name.clone()),
                    Cell::Score(row.combined),
                ];
                cells.extend(
                    result
                        .channels
                        .iter()
                        .map(|c| Cell::Score(result.channel_score(row, *c))),
                );
                cells.push(Cell::Text(row.seek_code.to_string()));
                cells
            })
            .collect();

        Self { columns, rows }
    }

    /// Hits of a code search, ranked in order.
    pub fn from_search_hits(hits: &[SearchHit]) -> Self {
        let columns = ["rank", "individual", "name", "seek_score", "seek_code"]
            .iter()
            .map(ToString::to_string)
            .collect();
        let rows = hits
            .iter()
            .enumerate()
            .map(|(i, hit)| {
                vec![
                    Cell::Int(Some(i as u64 + 1)),
                    Cell::Int(Some(hit.individual.0)),
                    Cell::Text(hit.name.clone()),
                    Cell::Score(hit.score),
                    Cell::Text(hit.seek_code.to_string()),
                ]
            })
            .collect();
        Self { columns, rows }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::inference::EmbeddingClass;
    use crate::seek::TraitCode;
    use crate::store::{Channel, IndividualId, ScoreRow, SightingId};
    use chrono::Utc;

    fn result() -> ScoringResult {
        ScoringResult {
            sighting: SightingId(1),
            computed_at: Utc::now(),
            channels: vec![Channel::Seek, Channel::Embedding(EmbeddingClass::RightEar)],
            rows: vec![ScoreRow {
                rank: Some(1),
                individual: IndividualId(5),
                name: "Tembo".to_string(),
                combined: 0.75,
                scores: vec![0.8, f64::NAN],
                seek_code: TraitCode::unknown(),
            }],
        }
    }

    #[test]
    fn test_scoring_columns_follow_channels() {
        let table = Table::from_scoring_result(&result());
        assert_eq!(
            table.columns,
            vec![
                "rank",
                "individual",
                "name",
                "score",
                "seek_score",
                "right_ear_score",
                "seek_code"
            ]
        );
        let rendered: Vec<String> = table.rows[0].iter().map(Cell::render).collect();
        assert_eq!(
            rendered,
            vec!["1", "5", "Tembo", "0.750", "0.800", "", "??T??E????-????X??S???"]
        );
    }

    #[test]
    fn test_nan_cell_serializes_as_null() {
        assert_eq!(serde_json::to_string(&Cell::Score(f64::NAN)).unwrap(), "null");
        assert_eq!(serde_json::to_string(&Cell::Int(None)).unwrap(), "null");
        assert_eq!(serde_json::to_string(&Cell::Score(0.5)).unwrap(), "0.5");
    }
}
