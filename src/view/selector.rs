//! Team Selector
//!
//! A controlled choice over the team list. It holds no selection of its own;
//! the caller passes the current id in and receives the chosen id back.

use std::fmt;

use crate::model::Team;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectorOption {
    /// 1-based position, also the key typed to pick it
    pub position: usize,
    pub id: String,
    pub label: String,
    pub selected: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TeamSelector {
    options: Vec<SelectorOption>,
}

impl TeamSelector {
    /// `None` when there are no teams to choose from
    pub fn build(teams: &[Team], selected: Option<&str>) -> Option<Self> {
        if teams.is_empty() {
            return None;
        }

        let options = teams
            .iter()
            .enumerate()
            .map(|(index, team)| SelectorOption {
                position: index + 1,
                id: team.id.clone(),
                label: label(team),
                selected: selected == Some(team.id.as_str()),
            })
            .collect();

        Some(Self { options })
    }

    pub fn options(&self) -> &[SelectorOption] {
        &self.options
    }

    /// Invoke `on_change` with the id at `position`, if there is one
    pub fn choose<F>(&self, position: usize, on_change: F) -> bool
    where
        F: FnOnce(&str),
    {
        match position
            .checked_sub(1)
            .and_then(|index| self.options.get(index))
        {
            Some(option) => {
                on_change(&option.id);
                true
            }
            None => false,
        }
    }
}

/// Option label, e.g. `Alpha - 10 pts`
pub fn label(team: &Team) -> String {
    format!("{} - {} pts", team.name, team.score)
}

impl fmt::Display for TeamSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for option in &self.options {
            let marker = if option.selected { '>' } else { ' ' };
            writeln!(f, "{} [{}] {}", marker, option.position, option.label)?;
        }
        Ok(())
    }
}
