//! Ranking View
//!
//! Builds display rows from a ranking exactly as received: rank is position
//! plus one and rows are never re-sorted.

use std::fmt;

use super::format::group_thousands;
use crate::model::{RankedEntity, ViewMode};

/// Marker for the top three ranks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Podium {
    Gold,
    Silver,
    Bronze,
}

impl Podium {
    pub fn for_rank(rank: usize) -> Option<Self> {
        match rank {
            1 => Some(Podium::Gold),
            2 => Some(Podium::Silver),
            3 => Some(Podium::Bronze),
            _ => None,
        }
    }

    pub fn medal(&self) -> &'static str {
        match self {
            Podium::Gold => "🥇",
            Podium::Silver => "🥈",
            Podium::Bronze => "🥉",
        }
    }
}

/// One rendered ranking row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankRow {
    pub rank: usize,
    pub id: String,
    pub name: String,
    pub score: u64,
    pub podium: Option<Podium>,
}

/// Display model of a ranking
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RankingView {
    /// Explicit empty state; never a zero-row table
    Empty { mode: ViewMode },
    Ranked { mode: ViewMode, rows: Vec<RankRow> },
}

impl RankingView {
    pub fn build(ranking: &[RankedEntity], mode: ViewMode) -> Self {
        if ranking.is_empty() {
            return RankingView::Empty { mode };
        }

        let rows = ranking
            .iter()
            .enumerate()
            .map(|(index, entity)| {
                let rank = index + 1;
                RankRow {
                    rank,
                    id: entity.id.clone(),
                    name: entity.name.clone(),
                    score: entity.score,
                    podium: Podium::for_rank(rank),
                }
            })
            .collect();

        RankingView::Ranked { mode, rows }
    }

    pub fn mode(&self) -> ViewMode {
        match self {
            RankingView::Empty { mode } | RankingView::Ranked { mode, .. } => *mode,
        }
    }

    pub fn rows(&self) -> &[RankRow] {
        match self {
            RankingView::Empty { .. } => &[],
            RankingView::Ranked { rows, .. } => rows,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, RankingView::Empty { .. })
    }

    pub fn title(&self) -> &'static str {
        match self.mode() {
            ViewMode::Teams => "Team Rankings",
            ViewMode::Users => "User Rankings",
        }
    }

    pub fn subtitle(&self) -> String {
        let noun = match self.mode() {
            ViewMode::Teams => "teams",
            ViewMode::Users => "members",
        };
        format!("{} {} competing", self.rows().len(), noun)
    }

    /// Render with the given thousands separator
    pub fn display<'a>(&'a self, separator: &'a str) -> RankingDisplay<'a> {
        RankingDisplay {
            view: self,
            separator,
        }
    }
}

/// Text rendering of a [`RankingView`]
pub struct RankingDisplay<'a> {
    view: &'a RankingView,
    separator: &'a str,
}

impl fmt::Display for RankingDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.view.title())?;

        let rows = match self.view {
            RankingView::Empty { mode } => {
                writeln!(f)?;
                writeln!(f, "  No Data Available")?;
                return writeln!(f, "  Add some {} to see the leaderboard!", mode.noun());
            }
            RankingView::Ranked { rows, .. } => rows,
        };

        writeln!(f, "{}", self.view.subtitle())?;
        writeln!(f)?;

        let name_width = rows.iter().map(|r| r.name.chars().count()).max().unwrap_or(0);
        for row in rows {
            let marker = row.podium.map(|p| p.medal()).unwrap_or("  ");
            writeln!(
                f,
                "{} {:>3}  {:<width$}  {:>12} pts",
                marker,
                row.rank,
                row.name,
                group_thousands(row.score, self.separator),
                width = name_width
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ranking() -> Vec<RankedEntity> {
        vec![
            RankedEntity::new("c", "Gamma", 5),
            RankedEntity::new("a", "Alpha", 1500),
            RankedEntity::new("b", "Beta", 20),
            RankedEntity::new("d", "Delta", 30),
        ]
    }

    #[test]
    fn test_positional_rank_in_both_modes() {
        let input = ranking();
        for mode in [ViewMode::Teams, ViewMode::Users] {
            let view = RankingView::build(&input, mode);
            let ids: Vec<_> = view.rows().iter().map(|r| r.id.as_str()).collect();
            assert_eq!(ids, vec!["c", "a", "b", "d"]);
            let ranks: Vec<_> = view.rows().iter().map(|r| r.rank).collect();
            assert_eq!(ranks, vec![1, 2, 3, 4]);
        }
    }

    #[test]
    fn test_podium_markers() {
        let view = RankingView::build(&ranking(), ViewMode::Teams);
        let podium: Vec<_> = view.rows().iter().map(|r| r.podium).collect();
        assert_eq!(
            podium,
            vec![
                Some(Podium::Gold),
                Some(Podium::Silver),
                Some(Podium::Bronze),
                None
            ]
        );
    }

    #[test]
    fn test_empty_state() {
        let view = RankingView::build(&[], ViewMode::Users);
        assert!(view.is_empty());

        let text = view.display(",").to_string();
        assert!(text.contains("No Data Available"));
        assert!(text.contains("Add some users to see the leaderboard!"));
    }

    #[test]
    fn test_titles() {
        let teams = RankingView::build(&ranking(), ViewMode::Teams);
        assert_eq!(teams.title(), "Team Rankings");
        assert_eq!(teams.subtitle(), "4 teams competing");

        let users = RankingView::build(&ranking(), ViewMode::Users);
        assert_eq!(users.title(), "User Rankings");
        assert_eq!(users.subtitle(), "4 members competing");
    }

    #[test]
    fn test_render_keeps_score_verbatim() {
        let text = RankingView::build(&ranking(), ViewMode::Teams)
            .display(",")
            .to_string();
        assert!(text.contains("1,500 pts"));
        assert!(text.contains("🥇"));

        let gamma = text.find("Gamma").unwrap();
        let alpha = text.find("Alpha").unwrap();
        assert!(gamma < alpha);
    }

    #[test]
    fn test_render_is_deterministic() {
        let view = RankingView::build(&ranking(), ViewMode::Teams);
        assert_eq!(view.display(",").to_string(), view.display(",").to_string());
        assert_eq!(view, RankingView::build(&ranking(), ViewMode::Teams));
    }
}
