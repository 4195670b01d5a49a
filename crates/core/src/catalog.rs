//! Static tool catalog.
//!
//! Maps each tool name to the booking kind and action it serves and to the
//! argument schema used to build its call from conversation parameters.

use serde::Serialize;

use crate::domain::intent::{BookingAction, BookingKind};
use crate::domain::params::ParamName;
use crate::domain::tool::ToolName;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ArgKind {
    Text,
    Count,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct ArgSpec {
    pub name: &'static str,
    pub source: ParamName,
    pub kind: ArgKind,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct ToolSpec {
    pub name: ToolName,
    pub description: &'static str,
    pub kind: BookingKind,
    pub action: BookingAction,
    pub args: &'static [ArgSpec],
}

const FLIGHT_ARGS: &[ArgSpec] = &[
    ArgSpec { name: "origin", source: ParamName::Origin, kind: ArgKind::Text },
    ArgSpec { name: "destination", source: ParamName::Destination, kind: ArgKind::Text },
    ArgSpec { name: "date", source: ParamName::Date, kind: ArgKind::Text },
];

const CATALOG: &[ToolSpec] = &[
    ToolSpec {
        name: ToolName::SearchFlights,
        description: "Search for available flights",
        kind: BookingKind::Flight,
        action: BookingAction::Search,
        args: FLIGHT_ARGS,
    },
    ToolSpec {
        name: ToolName::BookFlight,
        description: "Book a specific flight",
        kind: BookingKind::Flight,
        action: BookingAction::Book,
        args: FLIGHT_ARGS,
    },
    ToolSpec {
        name: ToolName::SearchHotels,
        description: "Search for hotels",
        kind: BookingKind::Hotel,
        action: BookingAction::Search,
        args: &[
            ArgSpec { name: "destination", source: ParamName::City, kind: ArgKind::Text },
            ArgSpec { name: "days", source: ParamName::Days, kind: ArgKind::Count },
        ],
    },
    ToolSpec {
        name: ToolName::BookHotel,
        description: "Book a specific hotel",
        kind: BookingKind::Hotel,
        action: BookingAction::Book,
        args: &[
            ArgSpec { name: "city", source: ParamName::City, kind: ArgKind::Text },
            ArgSpec { name: "days", source: ParamName::Days, kind: ArgKind::Count },
        ],
    },
];

pub fn all() -> &'static [ToolSpec] {
    CATALOG
}

pub fn spec(name: ToolName) -> &'static ToolSpec {
    let index = match name {
        ToolName::SearchFlights => 0,
        ToolName::BookFlight => 1,
        ToolName::SearchHotels => 2,
        ToolName::BookHotel => 3,
    };
    &CATALOG[index]
}

pub fn lookup(kind: BookingKind, action: BookingAction) -> ToolName {
    match (kind, action) {
        (BookingKind::Flight, BookingAction::Search) => ToolName::SearchFlights,
        (BookingKind::Flight, BookingAction::Book) => ToolName::BookFlight,
        (BookingKind::Hotel, BookingAction::Search) => ToolName::SearchHotels,
        (BookingKind::Hotel, BookingAction::Book) => ToolName::BookHotel,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::{all, lookup, spec};
    use crate::domain::intent::{BookingAction, BookingKind};
    use crate::domain::params::ParamName;
    use crate::domain::tool::ToolName;

    #[test]
    fn spec_rows_match_their_names() {
        for tool in all() {
            assert_eq!(spec(tool.name).name, tool.name);
            assert_eq!(lookup(tool.kind, tool.action), tool.name);
        }
    }

    #[test]
    fn every_tool_appears_once() {
        let names = all().iter().map(|spec| spec.name).collect::<HashSet<_>>();
        assert_eq!(names.len(), all().len());
        assert_eq!(names.len(), 4);
    }

    #[test]
    fn lookup_pairs_kind_and_action() {
        assert_eq!(lookup(BookingKind::Flight, BookingAction::Book), ToolName::BookFlight);
        assert_eq!(lookup(BookingKind::Flight, BookingAction::Search), ToolName::SearchFlights);
        assert_eq!(lookup(BookingKind::Hotel, BookingAction::Book), ToolName::BookHotel);
        assert_eq!(lookup(BookingKind::Hotel, BookingAction::Search), ToolName::SearchHotels);
    }

    #[test]
    fn hotel_search_takes_city_as_destination() {
        let search = spec(ToolName::SearchHotels);
        assert_eq!(search.args[0].name, "destination");
        assert_eq!(search.args[0].source, ParamName::City);
    }

    #[test]
    fn tool_args_cover_the_required_set() {
        for tool in all() {
            let sources = tool.args.iter().map(|arg| arg.source).collect::<HashSet<_>>();
            for required in tool.kind.required_params() {
                assert!(sources.contains(required), "{} misses {}", tool.name, required);
            }
        }
    }
}
