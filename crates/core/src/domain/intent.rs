use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::params::ParamName;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    FlightBooking,
    HotelBooking,
    General,
    #[default]
    Unknown,
}

impl Intent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FlightBooking => "flight_booking",
            Self::HotelBooking => "hotel_booking",
            Self::General => "general",
            Self::Unknown => "unknown",
        }
    }

    pub fn booking_kind(&self) -> Option<BookingKind> {
        match self {
            Self::FlightBooking => Some(BookingKind::Flight),
            Self::HotelBooking => Some(BookingKind::Hotel),
            Self::General | Self::Unknown => None,
        }
    }

    pub fn is_booking(&self) -> bool {
        self.booking_kind().is_some()
    }

    /// Parses a label produced by a language model or a config file.
    ///
    /// Accepts both the `flight_booking` style and the legacy `book_flight`
    /// style, surrounding quotes, and trailing punctuation.
    pub fn parse_label(raw: &str) -> Option<Self> {
        let normalized = raw
            .trim()
            .trim_matches(|c: char| c == '"' || c == '\'' || c == '`' || c == '.')
            .to_ascii_lowercase()
            .replace([' ', '-'], "_");

        match normalized.as_str() {
            "flight_booking" | "book_flight" | "flight" | "flights" => Some(Self::FlightBooking),
            "hotel_booking" | "book_hotel" | "hotel" | "hotels" => Some(Self::HotelBooking),
            "general" | "general_conversation" | "none" | "other" => Some(Self::General),
            _ => None,
        }
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingKind {
    Flight,
    Hotel,
}

impl BookingKind {
    pub fn intent(&self) -> Intent {
        match self {
            Self::Flight => Intent::FlightBooking,
            Self::Hotel => Intent::HotelBooking,
        }
    }

    pub fn required_params(&self) -> &'static [ParamName] {
        match self {
            Self::Flight => &[ParamName::Origin, ParamName::Destination, ParamName::Date],
            Self::Hotel => &[ParamName::City, ParamName::Days],
        }
    }

    pub fn noun(&self) -> &'static str {
        match self {
            Self::Flight => "flight",
            Self::Hotel => "hotel",
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingAction {
    Search,
    #[default]
    Book,
}

impl BookingAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Search => "search",
            Self::Book => "book",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{BookingKind, Intent};
    use crate::domain::params::ParamName;

    #[test]
    fn parses_model_labels_in_both_styles() {
        assert_eq!(Intent::parse_label("flight_booking"), Some(Intent::FlightBooking));
        assert_eq!(Intent::parse_label(" book_hotel\n"), Some(Intent::HotelBooking));
        assert_eq!(Intent::parse_label("\"General\"."), Some(Intent::General));
        assert_eq!(Intent::parse_label("plan_vacation"), None);
    }

    #[test]
    fn required_sets_match_booking_kind() {
        assert_eq!(
            BookingKind::Flight.required_params(),
            &[ParamName::Origin, ParamName::Destination, ParamName::Date]
        );
        assert_eq!(BookingKind::Hotel.required_params(), &[ParamName::City, ParamName::Days]);
        assert_eq!(Intent::General.booking_kind(), None);
        assert!(!Intent::Unknown.is_booking());
    }
}
