use serde::{Deserialize, Serialize};

use crate::buildings::{BuildingDirectory, BuildingRecord};
use crate::view::{OptionList, SelectOption, SelectorSide};

use super::subsequence::filter;

pub const LOAD_FAILED_PLACEHOLDER: &str = "-- Unable to load buildings --";

/// Query text and stored selection for one selector.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterState {
    pub query: String,
    pub selected: Option<String>,
}

/// Rebuild an option list, re-selecting `previous` only if it survived.
pub fn render_options(
    list: &[&BuildingRecord],
    previous: Option<&str>,
    placeholder: &str,
) -> OptionList {
    let options: Vec<SelectOption> = list
        .iter()
        .map(|building| SelectOption {
            value: building.id.clone(),
            label: building.label.clone(),
        })
        .collect();
    let selected = previous
        .filter(|id| options.iter().any(|option| option.value == *id))
        .map(str::to_string);

    OptionList {
        placeholder: placeholder.to_string(),
        options,
        selected,
        disabled: false,
    }
}

/// Disabled list shown when the building list could not be loaded.
pub fn failed_options() -> OptionList {
    OptionList {
        placeholder: LOAD_FAILED_PLACEHOLDER.to_string(),
        options: Vec::new(),
        selected: None,
        disabled: true,
    }
}

/// The start/end building selectors of the route panel.
///
/// Each side filters and selects independently.
#[derive(Debug, Clone, Default)]
pub struct RouteSelectors {
    start: FilterState,
    end: FilterState,
}

impl RouteSelectors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self, side: SelectorSide) -> &FilterState {
        match side {
            SelectorSide::Start => &self.start,
            SelectorSide::End => &self.end,
        }
    }

    fn state_mut(&mut self, side: SelectorSide) -> &mut FilterState {
        match side {
            SelectorSide::Start => &mut self.start,
            SelectorSide::End => &mut self.end,
        }
    }

    /// Store new query text for one side and render that side.
    pub fn set_query(
        &mut self,
        side: SelectorSide,
        query: &str,
        buildings: &BuildingDirectory,
    ) -> OptionList {
        self.state_mut(side).query = query.to_string();
        self.render(side, buildings)
    }

    /// Store a selection. The stored id is kept even when a later filter
    /// hides it.
    pub fn select(&mut self, side: SelectorSide, building_id: Option<&str>) {
        self.state_mut(side).selected = building_id.map(str::to_string);
    }

    pub fn render(&self, side: SelectorSide, buildings: &BuildingDirectory) -> OptionList {
        let state = self.state(side);
        let visible = filter(&state.query, buildings.records());
        render_options(&visible, state.selected.as_deref(), side.placeholder())
    }

    /// Both selections, when both sides have one.
    pub fn endpoints(&self) -> Option<(&str, &str)> {
        Some((self.start.selected.as_deref()?, self.end.selected.as_deref()?))
    }

    pub fn reset(&mut self) {
        self.start = FilterState::default();
        self.end = FilterState::default();
    }
}
